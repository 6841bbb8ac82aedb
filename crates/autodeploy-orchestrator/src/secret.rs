use autodeploy_core::SecretPlan;
use secrecy::ExposeSecret;
use serde_json::{json, Map, Value};

use crate::client::Orchestrator;
use crate::executor::ToolExecutor;
use crate::tool::ToolError;

/// Opaque Secret manifest for `plan`.
///
/// Values go into `stringData`, so they are stored exactly as given.
pub fn secret_manifest(plan: &SecretPlan) -> Value {
    let target = &plan.target;
    let data: Map<String, Value> = plan
        .data
        .iter()
        .map(|(key, value)| (key.clone(), Value::String(value.expose_secret().to_owned())))
        .collect();

    json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "type": "Opaque",
        "metadata": {
            "name": target.names.secret_name,
            "namespace": target.namespace,
            "labels": {
                "app": target.deploy_name(),
                "track": target.track().as_str(),
            },
        },
        "stringData": data,
    })
}

impl<E: ToolExecutor> Orchestrator<E> {
    /// Replace the application Secret with the current variables.
    ///
    /// The manifest is piped to kubectl, so values never appear in a process
    /// argument list or on disk.
    pub async fn apply_secret(&self, plan: &SecretPlan) -> Result<(), SecretError> {
        let target = &plan.target;
        let name = &target.names.secret_name;
        let manifest = serde_json::to_vec(&secret_manifest(plan))
            .map_err(|e| SecretError::Serialize { source: e })?;

        tracing::info!(secret = %name, keys = plan.data.len(), "replacing application secret");
        self.delete_named(&target.namespace, "secret", name)
            .await
            .map_err(|e| SecretError::Delete {
                name: name.clone(),
                source: e,
            })?;
        self.create_from_stdin(&target.namespace, &manifest)
            .await
            .map_err(|e| SecretError::Create {
                name: name.clone(),
                source: e,
            })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("failed to serialize secret manifest")]
    Serialize { source: serde_json::Error },

    #[error("failed to delete secret {name}")]
    Delete { name: String, source: ToolError },

    #[error("failed to create secret {name}")]
    Create { name: String, source: ToolError },
}
