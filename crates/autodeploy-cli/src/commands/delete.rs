use std::path::Path;

use autodeploy_core::{ReleaseTarget, Track};
use autodeploy_orchestrator::{Orchestrator, Tool};

use super::Workspace;

/// Delete every resource of a track's release.
pub async fn delete(project_dir: &Path, track: Track, include_database: bool) -> anyhow::Result<()> {
    let ws = Workspace::load(project_dir)?;
    let target = ReleaseTarget::from_env(&ws.env, track)?;

    let client = Orchestrator::new();
    client.require_tools(&[Tool::Kubectl]).await?;

    println!(
        "Deleting release '{}' from namespace {}...",
        target.deploy_name(),
        target.namespace
    );
    client.delete_release(&target, include_database).await?;

    println!();
    println!("Delete complete.");
    if !include_database {
        println!("  Database releases were kept. To delete them: autodeploy delete {} --include-database", target.track());
    }
    Ok(())
}
