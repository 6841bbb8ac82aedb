use std::path::Path;

use autodeploy_build::artifact::write_environment_url;
use autodeploy_build::chart::ChartLocation;
use autodeploy_core::{DatabasePlan, ReleasePlan, SecretPlan, Track};
use autodeploy_orchestrator::{Orchestrator, Tool};

use super::Workspace;

/// Execute the full deploy pipeline for one track.
pub async fn deploy(project_dir: &Path, track: Track) -> anyhow::Result<()> {
    let ws = Workspace::load(project_dir)?;

    // Every plan is checked before the first tool runs.
    let release = ReleasePlan::from_env(&ws.env, &ws.config, &ws.project_dir, track.clone())?;
    let secret = SecretPlan::from_env(&ws.env, &ws.config, track.clone())?;
    let database = DatabasePlan::from_env(&ws.env, &ws.config, &ws.project_dir, track)?;

    let client = Orchestrator::new();
    println!("Running pre-flight checks...");
    client.require_tools(&[Tool::Kubectl, Tool::Helm]).await?;

    let namespace = &release.target.namespace;
    println!("Ensuring namespace {namespace}...");
    client.ensure_namespace(namespace).await?;

    super::secret::replace(&client, &secret).await?;

    match &database {
        Some(plan) => super::database::provision(&client, plan, &ws).await?,
        None => println!("No database enabled, skipping."),
    }

    println!(
        "Deploying {} ({})...",
        release.target.deploy_name(),
        release.image
    );
    let report = client.deploy_release(&release, ws.wait_policy()).await?;

    match &report.chart {
        ChartLocation::Local(dir) => println!("  Chart: {}", dir.display()),
        ChartLocation::Remote(chart) => println!("  Chart: {chart}"),
    }
    for job in &report.jobs {
        println!("  Job completed: {job}");
    }

    println!();
    match &report.environment_url {
        Some(url) => {
            write_environment_url(&ws.scratch_dir(), url)?;
            println!("Deployed: {url}");
        }
        None => println!("Deployed: {}", report.deploy_name),
    }

    Ok(())
}
