use autodeploy_core::{DatabaseEngine, ReleaseTarget};

use crate::client::Orchestrator;
use crate::executor::ToolExecutor;
use crate::tool::ToolError;

/// Kinds a release (and a database release) may own.
pub const RELEASE_KINDS: &str =
    "deployments,services,ingresses,jobs,pods,statefulsets,configmaps,persistentvolumeclaims";

/// Database charts also keep their credentials in a Secret of their own.
const DATABASE_KINDS: &str = "deployments,services,ingresses,jobs,pods,statefulsets,configmaps,persistentvolumeclaims,secrets";

impl<E: ToolExecutor> Orchestrator<E> {
    /// Delete everything labeled with the release of `target`, then its Secret.
    ///
    /// Missing objects are ignored, so tearing down twice succeeds.
    pub async fn delete_release(
        &self,
        target: &ReleaseTarget,
        include_database: bool,
    ) -> Result<(), TeardownError> {
        let namespace = &target.namespace;
        let deploy_name = target.deploy_name();

        tracing::info!(release = deploy_name, namespace = %namespace, "deleting release");
        let selector = target.names.selector();
        self.delete_labeled(namespace, RELEASE_KINDS, &selector)
            .await
            .map_err(|e| TeardownError::Delete { selector, source: e })?;

        if include_database {
            for engine in [DatabaseEngine::Postgres, DatabaseEngine::Mysql] {
                let selector = format!("release={}", engine.host_for(deploy_name));
                tracing::info!(selector = %selector, "deleting database release");
                self.delete_labeled(namespace, DATABASE_KINDS, &selector)
                    .await
                    .map_err(|e| TeardownError::Delete { selector, source: e })?;
            }
        }

        let secret = &target.names.secret_name;
        self.delete_named(namespace, "secret", secret)
            .await
            .map_err(|e| TeardownError::DeleteSecret {
                name: secret.clone(),
                source: e,
            })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TeardownError {
    #[error("failed to delete resources labeled {selector}")]
    Delete { selector: String, source: ToolError },

    #[error("failed to delete secret {name}")]
    DeleteSecret { name: String, source: ToolError },
}
