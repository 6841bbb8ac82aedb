use std::path::Path;

use autodeploy_core::{SecretPlan, Track};
use autodeploy_orchestrator::{Orchestrator, Tool};

use super::Workspace;

pub async fn secret(project_dir: &Path, track: Track) -> anyhow::Result<()> {
    let ws = Workspace::load(project_dir)?;
    let plan = SecretPlan::from_env(&ws.env, &ws.config, track)?;

    let client = Orchestrator::new();
    client.require_tools(&[Tool::Kubectl]).await?;
    client.ensure_namespace(&plan.target.namespace).await?;

    replace(&client, &plan).await
}

pub(super) async fn replace(client: &Orchestrator, plan: &SecretPlan) -> anyhow::Result<()> {
    println!(
        "Replacing secret '{}' ({} key(s))...",
        plan.target.names.secret_name,
        plan.data.len()
    );
    client.apply_secret(plan).await?;
    for key in plan.data.keys() {
        println!("  {key}");
    }
    Ok(())
}
