use std::path::Path;

use autodeploy_core::{DatabasePlan, Track};
use autodeploy_orchestrator::{Orchestrator, Tool};

use super::Workspace;

pub async fn database(project_dir: &Path, track: Track) -> anyhow::Result<()> {
    let ws = Workspace::load(project_dir)?;
    let Some(plan) = DatabasePlan::from_env(&ws.env, &ws.config, &ws.project_dir, track)? else {
        println!("No database enabled (POSTGRES_ENABLED / MYSQL_ENABLED), skipping.");
        return Ok(());
    };

    let client = Orchestrator::new();
    client.require_tools(&[Tool::Kubectl, Tool::Helm]).await?;
    client.ensure_namespace(&plan.target.namespace).await?;

    provision(&client, &plan, &ws).await
}

/// Shared with `deploy`, which provisions the database before the release.
pub(super) async fn provision(
    client: &Orchestrator,
    plan: &DatabasePlan,
    ws: &Workspace,
) -> anyhow::Result<()> {
    println!(
        "Provisioning {} database '{}' ({} {})...",
        plan.engine, plan.release, plan.chart, plan.version
    );
    client.provision_database(plan, ws.wait_policy()).await?;
    println!("  Ready.");
    Ok(())
}
