use std::path::{Path, PathBuf};

use autodeploy_build::chart::{
    fetched_chart_dir, find_rendered, locate, prepare_output_dir, release_values,
    remove_rendered, write_values, ChartError, ChartLocation,
};
use autodeploy_core::ReleasePlan;

use crate::client::{path_arg, Orchestrator};
use crate::executor::ToolExecutor;
use crate::tool::ToolError;
use crate::wait::{poll_until, WaitError, WaitPolicy};

/// What a deploy did.
#[derive(Debug)]
pub struct DeployReport {
    pub deploy_name: String,
    pub chart: ChartLocation,
    /// Jobs that ran to completion, in order
    pub jobs: Vec<String>,
    pub environment_url: Option<String>,
}

/// One-off Job rendered by the chart next to the long-running workload.
struct ReleaseJob<'a> {
    name: String,
    template: &'a str,
    command: Option<&'a str>,
}

impl<E: ToolExecutor> Orchestrator<E> {
    /// Deploy the application release described by `plan`.
    ///
    /// Renders the chart, runs the initialize and migrate Jobs to completion
    /// when their commands are set, then applies the remaining manifests and
    /// waits for the Deployment to become available. Job manifests never
    /// reach the general apply.
    pub async fn deploy_release(
        &self,
        plan: &ReleasePlan,
        wait: WaitPolicy,
    ) -> Result<DeployReport, ReleaseError> {
        let target = &plan.target;
        let namespace = &target.namespace;
        let deploy_name = target.deploy_name();

        let chart = locate(&plan.chart);
        let chart_dir = self.resolve_chart(plan, &chart).await?;

        let output_dir = plan.output_dir();
        let values_file = output_dir.with_extension("values.json");
        prepare_output_dir(&output_dir)?;
        write_values(&values_file, &release_values(plan))?;

        tracing::info!(release = deploy_name, chart = %chart_dir.display(), "rendering chart");
        self.render_chart(deploy_name, &path_arg(&chart_dir), namespace, &values_file, &output_dir)
            .await
            .map_err(|e| ReleaseError::Render { source: e })?;

        let jobs = [
            ReleaseJob {
                name: target.names.initialize_job(),
                template: &plan.chart.initialize_template,
                command: plan.initialize_command.as_deref(),
            },
            ReleaseJob {
                name: target.names.migrate_job(),
                template: &plan.chart.migrate_template,
                command: plan.migrate_command.as_deref(),
            },
        ];

        let mut completed = Vec::new();
        for job in &jobs {
            if self.run_job(namespace, &output_dir, job, wait).await? {
                completed.push(job.name.clone());
            }
        }

        tracing::info!(release = deploy_name, "applying manifests");
        self.apply_manifests(namespace, &output_dir, false)
            .await
            .map_err(|e| ReleaseError::Apply { source: e })?;

        let elapsed = poll_until(wait, || self.probe_deployment_available(namespace, deploy_name))
            .await
            .into_result(format!("deployment {deploy_name}"))?;
        tracing::info!(release = deploy_name, elapsed_secs = elapsed.as_secs(), "release available");

        Ok(DeployReport {
            deploy_name: deploy_name.to_owned(),
            chart,
            jobs: completed,
            environment_url: plan.environment_url.clone(),
        })
    }

    /// Local chart directory, or a freshly fetched copy of the remote chart.
    async fn resolve_chart(
        &self,
        plan: &ReleasePlan,
        chart: &ChartLocation,
    ) -> Result<PathBuf, ReleaseError> {
        match chart {
            ChartLocation::Local(dir) => Ok(dir.clone()),
            ChartLocation::Remote(reference) => {
                let untar_dir = plan.scratch_dir.join("charts");
                // helm refuses to untar over an existing chart directory
                prepare_output_dir(&untar_dir)?;
                tracing::info!(chart = %reference, "fetching chart");
                self.fetch_chart(reference, &untar_dir)
                    .await
                    .map_err(|e| ReleaseError::Fetch {
                        chart: reference.clone(),
                        source: e,
                    })?;
                Ok(fetched_chart_dir(&untar_dir)?)
            }
        }
    }

    /// Run `job` to completion if its command is set. Returns whether it ran.
    ///
    /// The rendered manifest is removed either way so the general apply skips it.
    async fn run_job(
        &self,
        namespace: &str,
        output_dir: &Path,
        job: &ReleaseJob<'_>,
        wait: WaitPolicy,
    ) -> Result<bool, ReleaseError> {
        let rendered = find_rendered(output_dir, job.template)?;

        let manifest = match (job.command, rendered) {
            (Some(_), Some(manifest)) => manifest,
            (Some(_), None) => {
                return Err(ReleaseError::MissingJobManifest {
                    job: job.name.clone(),
                    template: job.template.to_owned(),
                });
            }
            (None, Some(manifest)) => {
                tracing::debug!(job = %job.name, "no command set, skipping job");
                remove_rendered(&manifest)?;
                return Ok(false);
            }
            (None, None) => return Ok(false),
        };

        tracing::info!(job = %job.name, "running job");
        let failed = |e: ToolError| ReleaseError::Job {
            job: job.name.clone(),
            source: e,
        };
        // A finished Job is immutable, so the previous run has to go first.
        self.delete_named(namespace, "job", &job.name)
            .await
            .map_err(failed)?;
        self.apply_manifests(namespace, &manifest, false)
            .await
            .map_err(failed)?;

        poll_until(wait, || self.probe_job_complete(namespace, &job.name))
            .await
            .into_result(format!("job {}", job.name))?;

        remove_rendered(&manifest)?;
        Ok(true)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReleaseError {
    #[error(transparent)]
    Chart(#[from] ChartError),

    #[error("helm fetch of {chart} failed")]
    Fetch { chart: String, source: ToolError },

    #[error("helm template failed")]
    Render { source: ToolError },

    #[error("job {job} is enabled but the chart rendered no {template}")]
    MissingJobManifest { job: String, template: String },

    #[error("failed to start job {job}")]
    Job { job: String, source: ToolError },

    #[error("kubectl apply of release manifests failed")]
    Apply { source: ToolError },

    #[error(transparent)]
    Wait(#[from] WaitError),
}
