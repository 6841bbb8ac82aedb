use autodeploy_build::chart::{database_values, prepare_output_dir, write_values, ChartError};
use autodeploy_core::DatabasePlan;

use crate::client::Orchestrator;
use crate::executor::ToolExecutor;
use crate::tool::ToolError;
use crate::wait::{poll_until, WaitError, WaitPolicy};

impl<E: ToolExecutor> Orchestrator<E> {
    /// Render, apply, and wait for the database release of `plan`.
    ///
    /// Re-running converges: rendering replaces the previous output and the
    /// apply is forced.
    pub async fn provision_database(
        &self,
        plan: &DatabasePlan,
        wait: WaitPolicy,
    ) -> Result<(), DatabaseError> {
        let namespace = &plan.target.namespace;
        let output_dir = plan.output_dir();
        let values_file = output_dir.with_extension("values.json");

        tracing::info!(engine = %plan.engine, release = %plan.release, chart = %plan.chart, "provisioning database");

        prepare_output_dir(&output_dir)?;
        write_values(&values_file, &database_values(plan))?;

        self.render_chart(&plan.release, &plan.chart, namespace, &values_file, &output_dir)
            .await
            .map_err(|e| DatabaseError::Render {
                chart: plan.chart.clone(),
                source: e,
            })?;

        self.apply_manifests(namespace, &output_dir, true)
            .await
            .map_err(|e| DatabaseError::Apply { source: e })?;

        let selector = plan.pod_selector();
        let elapsed = poll_until(wait, || self.probe_pods_ready(namespace, &selector))
            .await
            .into_result(format!("{} database {}", plan.engine, plan.release))?;

        tracing::info!(release = %plan.release, elapsed_secs = elapsed.as_secs(), "database ready");
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error(transparent)]
    Chart(#[from] ChartError),

    #[error("helm template of {chart} failed")]
    Render { chart: String, source: ToolError },

    #[error("kubectl apply of database manifests failed")]
    Apply { source: ToolError },

    #[error(transparent)]
    Wait(#[from] WaitError),
}
