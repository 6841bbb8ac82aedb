use autodeploy_core::ClusterCredentials;
use secrecy::ExposeSecret;

use crate::client::{args, path_arg, Orchestrator};
use crate::executor::ToolExecutor;
use crate::tool::ToolError;

impl<E: ToolExecutor> Orchestrator<E> {
    /// Register `creds` with kubectl and make it the current context.
    pub async fn authenticate(&self, creds: &ClusterCredentials) -> Result<(), AuthError> {
        let cluster = &creds.cluster_name;
        let user = creds.user_name();
        let ca_file = creds.ca_file();

        if let Some(parent) = ca_file.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AuthError::WriteCa {
                path: ca_file.clone(),
                source: e,
            })?;
        }
        std::fs::write(&ca_file, &creds.ca_pem).map_err(|e| AuthError::WriteCa {
            path: ca_file.clone(),
            source: e,
        })?;

        tracing::info!(selector = %creds.selector, cluster = %cluster, "configuring kubectl");

        let steps = [
            (
                "set-cluster",
                args([
                    "set-cluster",
                    cluster,
                    &format!("--server={}", creds.server_url),
                    &format!("--certificate-authority={}", path_arg(&ca_file)),
                    "--embed-certs=true",
                ]),
            ),
            (
                "set-credentials",
                args([
                    "set-credentials",
                    &user,
                    &format!("--token={}", creds.token.expose_secret()),
                ]),
            ),
            (
                "set-context",
                args([
                    "set-context",
                    cluster,
                    &format!("--cluster={cluster}"),
                    &format!("--user={user}"),
                    &format!("--namespace={}", creds.namespace),
                ]),
            ),
            ("use-context", args(["use-context", cluster])),
        ];

        for (step, cmd) in &steps {
            self.kubectl_config(cmd)
                .await
                .map_err(|e| AuthError::Configure { step: *step, source: e })?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("failed to write cluster CA to {path}")]
    WriteCa {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("kubectl config {step} failed")]
    Configure {
        step: &'static str,
        source: ToolError,
    },
}
