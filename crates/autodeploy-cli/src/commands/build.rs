use std::path::{Path, PathBuf};

use autodeploy_core::ImagePlan;
use autodeploy_orchestrator::{Orchestrator, Tool};

use super::Workspace;

pub async fn build(project_dir: &Path, dockerfile: Option<PathBuf>) -> anyhow::Result<()> {
    let ws = Workspace::load(project_dir)?;
    let mut plan = ImagePlan::from_env(&ws.env, &ws.config, &ws.project_dir)?;
    if let Some(dockerfile) = dockerfile {
        plan.dockerfile = ws.config.resolve(&ws.project_dir, &dockerfile);
    }

    if !plan.dockerfile.is_file() {
        anyhow::bail!(
            "no Dockerfile at {} — add one or pass --dockerfile",
            plan.dockerfile.display()
        );
    }

    let client = Orchestrator::new();
    client.require_tools(&[Tool::Docker]).await?;

    println!("Building {} from {}...", plan.repository, plan.dockerfile.display());
    let report = client.build_images(&plan).await?;

    println!();
    if report.stages.is_empty() {
        println!("No named stages.");
    } else {
        println!("Stages: {}", report.stages.join(", "));
    }
    println!(
        "Cache: {} pulled, {} unavailable",
        report.cache_hits, report.cache_misses
    );
    println!("Pushed:");
    for image in &report.pushed {
        println!("  {image}");
    }
    Ok(())
}
