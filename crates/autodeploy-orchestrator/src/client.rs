use std::fmt;
use std::path::Path;

use autodeploy_core::ImageRef;

use crate::executor::{RealExecutor, ToolExecutor};
use crate::tool::{Tool, ToolError};
use crate::wait::Probe;

/// Release orchestrator, parameterized over the executor for testability.
///
/// The workflows (`build_images`, `provision_database`, `deploy_release`,
/// `apply_secret`, `authenticate`, `delete_release`) live in their own
/// modules as further `impl` blocks on this type.
pub struct Orchestrator<E: ToolExecutor = RealExecutor> {
    pub(crate) executor: E,
}

impl Orchestrator<RealExecutor> {
    pub fn new() -> Self {
        Self {
            executor: RealExecutor,
        }
    }
}

impl Default for Orchestrator<RealExecutor> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ToolExecutor> Orchestrator<E> {
    pub fn with_executor(executor: E) -> Self {
        Self { executor }
    }

    // ── Preflight ──

    /// Fail fast when a tool a workflow needs is not installed.
    pub async fn require_tools(&self, tools: &[Tool]) -> Result<(), PreflightError> {
        for &tool in tools {
            if let Err(e) = self.tool_version(tool).await {
                tracing::debug!(tool = %tool, error = %e, "tool check failed");
                return Err(PreflightError::ToolMissing {
                    tool,
                    hint: tool.install_hint(),
                });
            }
        }
        Ok(())
    }

    // ── Doctor ──

    /// Run all diagnostic checks without early return.
    pub async fn doctor(&self) -> DoctorReport {
        let mut report = DoctorReport::default();

        for tool in Tool::ALL {
            let result = match self.tool_version(tool).await {
                Ok(version) => CheckResult::ok(&version),
                Err(e) => CheckResult::fail(&e.to_string()),
            };
            match tool {
                Tool::Docker => report.docker = result,
                Tool::Kubectl => report.kubectl = result,
                Tool::Helm => report.helm = result,
            }
        }

        report.context = match self
            .executor
            .exec(Tool::Kubectl, &args(["config", "current-context"]))
            .await
        {
            Ok(c) if !c.trim().is_empty() => CheckResult::ok(c.trim()),
            _ => CheckResult::fail("no current kubectl context, run: autodeploy auth"),
        };

        report
    }

    async fn tool_version(&self, tool: Tool) -> Result<String, ToolError> {
        let cmd = match tool {
            Tool::Docker => args(["version", "--format", "{{.Client.Version}}"]),
            Tool::Kubectl => args(["version", "--client"]),
            Tool::Helm => args(["version", "--short"]),
        };
        let out = self.executor.exec(tool, &cmd).await?;
        let version = match out.lines().next() {
            Some(line) => line.trim().trim_start_matches("Client Version: "),
            None => "",
        };
        Ok(version.to_owned())
    }

    // ── Docker ──

    pub async fn pull_image(&self, image: &ImageRef) -> Result<(), ToolError> {
        self.executor
            .exec_streaming(Tool::Docker, &args(["pull", &image.to_string()]))
            .await
    }

    /// `docker build`, optionally stopping at `target`, tagging every `tags` entry.
    pub async fn build_image(
        &self,
        dockerfile: &Path,
        context: &Path,
        target: Option<&str>,
        cache_from: &[String],
        tags: &[ImageRef],
    ) -> Result<(), ToolError> {
        let mut cmd = args(["build", "--file", &path_arg(dockerfile)]);
        if let Some(target) = target {
            cmd.extend(args(["--target", target]));
        }
        cmd.extend_from_slice(cache_from);
        for tag in tags {
            cmd.extend(args(["--tag", &tag.to_string()]));
        }
        cmd.push(path_arg(context));

        self.executor.exec_streaming(Tool::Docker, &cmd).await
    }

    pub async fn push_image(&self, image: &ImageRef) -> Result<(), ToolError> {
        self.executor
            .exec_streaming(Tool::Docker, &args(["push", &image.to_string()]))
            .await
    }

    // ── Helm ──

    /// `helm fetch <chart> --untar --untardir <dir>`
    pub async fn fetch_chart(&self, chart: &str, untar_dir: &Path) -> Result<(), ToolError> {
        self.executor
            .exec(
                Tool::Helm,
                &args(["fetch", chart, "--untar", "--untardir", &path_arg(untar_dir)]),
            )
            .await
            .map(|_| ())
    }

    /// Render `chart` as release `release` into `output_dir`.
    pub async fn render_chart(
        &self,
        release: &str,
        chart: &str,
        namespace: &str,
        values_file: &Path,
        output_dir: &Path,
    ) -> Result<(), ToolError> {
        self.executor
            .exec(
                Tool::Helm,
                &args([
                    "template",
                    release,
                    chart,
                    "--namespace",
                    namespace,
                    "--values",
                    &path_arg(values_file),
                    "--output-dir",
                    &path_arg(output_dir),
                ]),
            )
            .await
            .map(|_| ())
    }

    // ── kubectl ──

    /// Create `namespace` unless it already exists.
    pub async fn ensure_namespace(&self, namespace: &str) -> Result<(), ToolError> {
        let exists = self
            .executor
            .exec(Tool::Kubectl, &args(["get", "namespace", namespace]))
            .await
            .is_ok();

        if !exists {
            tracing::info!(namespace, "creating namespace");
            self.executor
                .exec(Tool::Kubectl, &args(["create", "namespace", namespace]))
                .await?;
        }
        Ok(())
    }

    /// `kubectl apply` a file or a directory tree.
    pub async fn apply_manifests(
        &self,
        namespace: &str,
        path: &Path,
        force: bool,
    ) -> Result<(), ToolError> {
        let mut cmd = args(["apply", "--namespace", namespace]);
        if force {
            cmd.push("--force".to_owned());
        }
        if path.is_dir() {
            cmd.push("--recursive".to_owned());
        }
        cmd.extend(args(["--filename", &path_arg(path)]));

        self.executor.exec(Tool::Kubectl, &cmd).await.map(|_| ())
    }

    /// `kubectl create` from a manifest piped through stdin.
    pub async fn create_from_stdin(&self, namespace: &str, manifest: &[u8]) -> Result<(), ToolError> {
        self.executor
            .exec_with_stdin(
                Tool::Kubectl,
                &args(["create", "--namespace", namespace, "--filename", "-"]),
                manifest,
            )
            .await
            .map(|_| ())
    }

    /// Delete one named object; a missing object is not an error.
    pub async fn delete_named(&self, namespace: &str, kind: &str, name: &str) -> Result<(), ToolError> {
        self.executor
            .exec(
                Tool::Kubectl,
                &args([
                    "delete",
                    kind,
                    name,
                    "--namespace",
                    namespace,
                    "--ignore-not-found",
                ]),
            )
            .await
            .map(|_| ())
    }

    /// Delete every object of `kinds` (comma-separated) matching `selector`.
    pub async fn delete_labeled(
        &self,
        namespace: &str,
        kinds: &str,
        selector: &str,
    ) -> Result<(), ToolError> {
        self.executor
            .exec(
                Tool::Kubectl,
                &args([
                    "delete",
                    kinds,
                    "--namespace",
                    namespace,
                    "--selector",
                    selector,
                    "--ignore-not-found",
                ]),
            )
            .await
            .map(|_| ())
    }

    pub(crate) async fn kubectl_config(&self, cmd: &[String]) -> Result<(), ToolError> {
        let mut full = args(["config"]);
        full.extend_from_slice(cmd);
        self.executor.exec(Tool::Kubectl, &full).await.map(|_| ())
    }

    async fn jsonpath(&self, namespace: &str, target: &[&str], path: &str) -> Result<String, ToolError> {
        let mut cmd = args(["get"]);
        cmd.extend(target.iter().map(|s| (*s).to_owned()));
        cmd.extend(args([
            "--namespace",
            namespace,
            "--output",
            &format!("jsonpath={path}"),
        ]));
        self.executor.exec(Tool::Kubectl, &cmd).await
    }

    // ── Probes ──

    /// Ready once any pod matching `selector` reports the Ready condition.
    pub async fn probe_pods_ready(&self, namespace: &str, selector: &str) -> Result<Probe, ToolError> {
        let out = self
            .jsonpath(
                namespace,
                &["pods", "--selector", selector],
                r#"{.items[*].status.conditions[?(@.type=="Ready")].status}"#,
            )
            .await?;
        Ok(if out.split_whitespace().any(|s| s == "True") {
            Probe::Ready
        } else {
            Probe::Pending
        })
    }

    /// Ready on the Complete condition, failed on the Failed condition.
    pub async fn probe_job_complete(&self, namespace: &str, job: &str) -> Result<Probe, ToolError> {
        let out = self
            .jsonpath(
                namespace,
                &["job", job],
                r#"{.status.conditions[?(@.status=="True")].type}"#,
            )
            .await?;
        let conditions: Vec<&str> = out.split_whitespace().collect();
        Ok(if conditions.contains(&"Complete") {
            Probe::Ready
        } else if conditions.contains(&"Failed") {
            Probe::Failed(format!("job {job} reported the Failed condition"))
        } else {
            Probe::Pending
        })
    }

    /// Ready once the Deployment reports the Available condition.
    pub async fn probe_deployment_available(
        &self,
        namespace: &str,
        deployment: &str,
    ) -> Result<Probe, ToolError> {
        let out = self
            .jsonpath(
                namespace,
                &["deployment", deployment],
                r#"{.status.conditions[?(@.type=="Available")].status}"#,
            )
            .await?;
        Ok(if out.trim() == "True" {
            Probe::Ready
        } else {
            Probe::Pending
        })
    }
}

// ── Helper ──

pub(crate) fn args<const N: usize>(a: [&str; N]) -> Vec<String> {
    a.iter().map(|s| (*s).to_owned()).collect()
}

pub(crate) fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

// ── Preflight / Doctor types ──

#[derive(Debug, thiserror::Error)]
pub enum PreflightError {
    #[error("{tool} is not installed, see {hint}")]
    ToolMissing { tool: Tool, hint: &'static str },
}

#[derive(Debug, Default)]
pub struct DoctorReport {
    pub docker: CheckResult,
    pub kubectl: CheckResult,
    pub helm: CheckResult,
    pub context: CheckResult,
    pub config_file: CheckResult,
}

impl DoctorReport {
    pub fn all_passed(&self) -> bool {
        self.rows().iter().all(|(_, r)| r.passed)
    }

    fn rows(&self) -> [(&'static str, &CheckResult); 5] {
        [
            ("docker", &self.docker),
            ("kubectl", &self.kubectl),
            ("helm", &self.helm),
            ("kube context", &self.context),
            ("autodeploy.toml", &self.config_file),
        ]
    }
}

impl fmt::Display for DoctorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (label, result) in self.rows() {
            writeln!(f, "  {:<16} {}  {}", label, result.icon(), result.detail)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct CheckResult {
    pub passed: bool,
    pub detail: String,
}

impl CheckResult {
    pub fn ok(detail: &str) -> Self {
        Self {
            passed: true,
            detail: detail.to_owned(),
        }
    }

    pub fn fail(detail: &str) -> Self {
        Self {
            passed: false,
            detail: detail.to_owned(),
        }
    }

    pub fn icon(&self) -> &'static str {
        if self.passed { "OK" } else { "NG" }
    }
}
