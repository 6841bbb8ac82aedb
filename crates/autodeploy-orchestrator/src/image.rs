use autodeploy_build::cache::{CacheError, CacheList};
use autodeploy_build::dockerfile::{read_stages, StageError};
use autodeploy_core::{ImagePlan, ImageRef, RegistryLogin};
use secrecy::ExposeSecret;

use crate::client::{args, Orchestrator};
use crate::executor::ToolExecutor;
use crate::tool::{Tool, ToolError};

/// What a build run produced.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub stages: Vec<String>,
    /// Every pushed reference, stages first, final image last
    pub pushed: Vec<ImageRef>,
    pub cache_hits: usize,
    pub cache_misses: usize,
}

impl<E: ToolExecutor> Orchestrator<E> {
    /// Log in to the registry, passing the password through stdin.
    pub async fn login_registry(&self, login: &RegistryLogin) -> Result<(), ImageError> {
        tracing::info!(registry = %login.registry, user = %login.user, "logging in to registry");
        self.executor
            .exec_with_stdin(
                Tool::Docker,
                &args([
                    "login",
                    "--username",
                    &login.user,
                    "--password-stdin",
                    &login.registry,
                ]),
                login.password.expose_secret().as_bytes(),
            )
            .await
            .map(|_| ())
            .map_err(|e| ImageError::Login {
                registry: login.registry.clone(),
                source: e,
            })
    }

    /// Build and push every named stage in declaration order, then the final image.
    ///
    /// Each build may reuse layers from the branch and cache-branch images
    /// pulled so far and from the stage images already built in this run.
    /// A cache image that cannot be pulled is skipped.
    pub async fn build_images(&self, plan: &ImagePlan) -> Result<BuildReport, ImageError> {
        match &plan.login {
            Some(login) => self.login_registry(login).await?,
            None => tracing::info!("no registry credentials, skipping login"),
        }

        let stages = read_stages(&plan.dockerfile)?;
        CacheList::reset(&plan.cache_file())?;
        let mut report = BuildReport {
            stages: stages.clone(),
            ..BuildReport::default()
        };

        for stage in &stages {
            self.build_one(plan, Some(stage.as_str()), &mut report)
                .await?;
        }
        self.build_one(plan, None, &mut report).await?;

        tracing::info!(
            stages = report.stages.len(),
            pushed = report.pushed.len(),
            cache_hits = report.cache_hits,
            cache_misses = report.cache_misses,
            "build finished"
        );
        Ok(report)
    }

    async fn build_one(
        &self,
        plan: &ImagePlan,
        stage: Option<&str>,
        report: &mut BuildReport,
    ) -> Result<(), ImageError> {
        let mut cache = CacheList::open(&plan.cache_file())?;
        for candidate in plan.cache_candidates(stage) {
            match self.pull_image(&candidate).await {
                Ok(()) => {
                    cache.push(&candidate)?;
                    report.cache_hits += 1;
                }
                Err(e) => {
                    tracing::warn!(image = %candidate, error = %e, "cache image unavailable, building without it");
                    report.cache_misses += 1;
                }
            }
        }

        let tags = plan.tags(stage);
        let name = tags[0].to_string();
        tracing::info!(image = %name, cache_from = cache.refs().len(), "building");
        self.build_image(
            &plan.dockerfile,
            &plan.context,
            stage,
            &cache.cache_from_args(),
            &tags,
        )
        .await
        .map_err(|e| ImageError::Build {
            image: name.clone(),
            source: e,
        })?;

        for tag in &tags {
            self.push_image(tag).await.map_err(|e| ImageError::Push {
                image: tag.to_string(),
                source: e,
            })?;
            report.pushed.push(tag.clone());
        }

        // Later builds rebuild this stage too; let them reuse what was just pushed.
        if stage.is_some() {
            cache.push(&tags[0])?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error(transparent)]
    Stages(#[from] StageError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("registry login to {registry} failed")]
    Login { registry: String, source: ToolError },

    #[error("docker build of {image} failed")]
    Build { image: String, source: ToolError },

    #[error("docker push of {image} failed")]
    Push { image: String, source: ToolError },
}
