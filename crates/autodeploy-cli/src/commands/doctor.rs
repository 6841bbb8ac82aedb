use std::path::Path;

use autodeploy_core::{AutodeployConfig, CONFIG_FILE_NAME};
use autodeploy_orchestrator::{CheckResult, Orchestrator};

pub async fn doctor(project_dir: &Path) -> anyhow::Result<()> {
    let client = Orchestrator::new();
    let mut report = client.doctor().await;

    report.config_file = if !project_dir.join(CONFIG_FILE_NAME).exists() {
        CheckResult::ok("Not found, using defaults")
    } else {
        match AutodeployConfig::load(project_dir) {
            Ok(_) => CheckResult::ok("Found"),
            Err(e) => CheckResult::fail(&format!("{e}")),
        }
    };

    println!();
    println!("{report}");

    if !report.all_passed() {
        anyhow::bail!("some checks failed — see above for details");
    }

    Ok(())
}
