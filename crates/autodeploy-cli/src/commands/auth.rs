use std::path::Path;

use autodeploy_core::ClusterCredentials;
use autodeploy_orchestrator::{Orchestrator, Tool};

use super::Workspace;

pub async fn auth(project_dir: &Path, selector: &str) -> anyhow::Result<()> {
    let ws = Workspace::load(project_dir)?;
    // Resolved first: an unknown selector must fail before kubectl is touched.
    let creds = ClusterCredentials::from_env(&ws.env, &ws.config, &ws.project_dir, selector)?;

    let client = Orchestrator::new();
    client.require_tools(&[Tool::Kubectl]).await?;

    println!(
        "Configuring kubectl for cluster '{}' ({})...",
        creds.cluster_name, creds.server_url
    );
    client.authenticate(&creds).await?;

    println!(
        "Using context '{}' in namespace {}",
        creds.cluster_name, creds.namespace
    );
    Ok(())
}
