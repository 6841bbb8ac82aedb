mod auth;
mod build;
mod database;
mod delete;
mod deploy;
mod doctor;
mod secret;

use std::path::{Path, PathBuf};

use autodeploy_core::{AutodeployConfig, CiEnv};
use autodeploy_orchestrator::WaitPolicy;

pub use auth::auth;
pub use build::build;
pub use database::database;
pub use delete::delete;
pub use deploy::deploy;
pub use doctor::doctor;
pub use secret::secret;

/// Inputs every command starts from: the project, its config, and the CI environment.
pub(crate) struct Workspace {
    pub project_dir: PathBuf,
    pub config: AutodeployConfig,
    pub env: CiEnv,
}

impl Workspace {
    pub fn load(project_dir: &Path) -> anyhow::Result<Self> {
        let config = AutodeployConfig::load(project_dir)?;
        tracing::debug!(project_dir = %project_dir.display(), "loaded workspace");
        Ok(Self {
            project_dir: project_dir.to_path_buf(),
            config,
            env: CiEnv::capture(project_dir),
        })
    }

    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy::from(&self.config.wait)
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.config
            .resolve(&self.project_dir, &self.config.paths.scratch_dir)
    }
}
