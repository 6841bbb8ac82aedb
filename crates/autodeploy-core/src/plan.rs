//! Typed inputs for each workflow.
//!
//! Every plan is built once from the [`CiEnv`] snapshot and the
//! [`AutodeployConfig`], then passed explicitly to the operation that
//! needs it. Required variables are checked here, before any external
//! tool runs.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use secrecy::SecretString;

use crate::config::AutodeployConfig;
use crate::database::{DatabaseDescriptor, DatabaseEngine};
use crate::env::CiEnv;
use crate::naming::{ImageRef, ReleaseNames, Track};

/// Cluster selected when none is given.
pub const DEFAULT_CLUSTER: &str = "production";

const DEFAULT_SERVICE_PORT: u16 = 5000;
const DEFAULT_DATABASE_USER: &str = "user";
const DEFAULT_DATABASE_PASSWORD: &str = "testing-password";

fn scratch_dir(config: &AutodeployConfig, project_dir: &Path) -> PathBuf {
    config.resolve(project_dir, &config.paths.scratch_dir)
}

/// Namespace and names of one track's release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseTarget {
    pub namespace: String,
    pub environment_slug: String,
    pub names: ReleaseNames,
}

impl ReleaseTarget {
    pub fn from_env(env: &CiEnv, track: Track) -> crate::Result<Self> {
        let namespace = env.require("KUBE_NAMESPACE")?.to_owned();
        let environment_slug = env.require("CI_ENVIRONMENT_SLUG")?.to_owned();
        let names = ReleaseNames::new(&environment_slug, track);
        Ok(Self {
            namespace,
            environment_slug,
            names,
        })
    }

    pub fn track(&self) -> &Track {
        &self.names.track
    }

    pub fn deploy_name(&self) -> &str {
        &self.names.deploy_name
    }
}

// ── Image build ──

/// Credentials for `docker login`.
#[derive(Clone)]
pub struct RegistryLogin {
    pub registry: String,
    pub user: String,
    pub password: SecretString,
}

impl fmt::Debug for RegistryLogin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryLogin")
            .field("registry", &self.registry)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ImagePlan {
    /// Registry repository of the final image (`CI_REGISTRY_IMAGE`)
    pub repository: String,
    /// Canonical tag (`CI_COMMIT_SHA`)
    pub commit_tag: String,
    /// Branch tag (`CI_COMMIT_REF_SLUG`)
    pub branch_tag: String,
    pub cache_branch: String,
    pub dockerfile: PathBuf,
    pub context: PathBuf,
    pub scratch_dir: PathBuf,
    pub login: Option<RegistryLogin>,
}

impl ImagePlan {
    pub fn from_env(
        env: &CiEnv,
        config: &AutodeployConfig,
        project_dir: &Path,
    ) -> crate::Result<Self> {
        let repository = env.require("CI_REGISTRY_IMAGE")?.to_owned();
        let commit_tag = env.require("CI_COMMIT_SHA")?.to_owned();
        let branch_tag = env.require("CI_COMMIT_REF_SLUG")?.to_owned();

        let login = match (env.get("CI_REGISTRY_USER"), env.get("CI_REGISTRY_PASSWORD")) {
            (Some(user), Some(password)) => Some(RegistryLogin {
                registry: match env.get("CI_REGISTRY") {
                    Some(registry) => registry.to_owned(),
                    None => registry_host(&repository).to_owned(),
                },
                user: user.to_owned(),
                password: SecretString::from(password),
            }),
            _ => None,
        };

        Ok(Self {
            repository,
            commit_tag,
            branch_tag,
            cache_branch: config.build.cache_branch.clone(),
            dockerfile: config.resolve(project_dir, &config.build.dockerfile),
            context: config.resolve(project_dir, &config.build.context),
            scratch_dir: scratch_dir(config, project_dir),
            login,
        })
    }

    /// Image of a build stage, or the final image when `stage` is `None`.
    fn image(&self, stage: Option<&str>, tag: &str) -> ImageRef {
        match stage {
            Some(stage) => ImageRef::for_stage(&self.repository, stage, tag),
            None => ImageRef::new(self.repository.clone(), tag),
        }
    }

    /// The two tags every build pushes: commit SHA first, then branch slug.
    pub fn tags(&self, stage: Option<&str>) -> [ImageRef; 2] {
        let commit = self.image(stage, &self.commit_tag);
        let branch = commit.with_tag(self.branch_tag.clone());
        [commit, branch]
    }

    /// Prior images worth pulling as layer cache: the cache branch, then this branch.
    pub fn cache_candidates(&self, stage: Option<&str>) -> Vec<ImageRef> {
        let cache_branch = self.image(stage, &self.cache_branch);
        let branch = cache_branch.with_tag(self.branch_tag.clone());
        let mut candidates = vec![cache_branch];
        if self.branch_tag != self.cache_branch {
            candidates.push(branch);
        }
        candidates
    }

    /// Scratch file accumulating `--cache-from` references for this build run.
    pub fn cache_file(&self) -> PathBuf {
        self.scratch_dir.join("cache-from.txt")
    }
}

/// Host part of an image repository (`registry.example.com/group/app` → `registry.example.com`).
fn registry_host(repository: &str) -> &str {
    match repository.split_once('/') {
        Some((host, _)) => host,
        None => repository,
    }
}

// ── Database ──

#[derive(Debug, Clone)]
pub struct DatabasePlan {
    pub target: ReleaseTarget,
    pub engine: DatabaseEngine,
    /// Helm release name of the database; also its service host
    pub release: String,
    pub chart: String,
    pub version: String,
    pub descriptor: DatabaseDescriptor,
    pub scratch_dir: PathBuf,
}

impl DatabasePlan {
    /// `None` when no engine is enabled for this job.
    pub fn from_env(
        env: &CiEnv,
        config: &AutodeployConfig,
        project_dir: &Path,
        track: Track,
    ) -> crate::Result<Option<Self>> {
        let Some(engine) = selected_engine(env) else {
            return Ok(None);
        };
        let target = ReleaseTarget::from_env(env, track)?;
        let descriptor = database_descriptor(env, engine, &target);

        let (chart, default_version) = match engine {
            DatabaseEngine::Postgres => (
                &config.database.postgres_chart,
                &config.database.postgres_version,
            ),
            DatabaseEngine::Mysql => (&config.database.mysql_chart, &config.database.mysql_version),
        };
        let version = env
            .get_or(&format!("{}_VERSION", engine.env_prefix()), default_version)
            .to_owned();

        Ok(Some(Self {
            release: descriptor.host.clone(),
            target,
            engine,
            chart: chart.clone(),
            version,
            descriptor,
            scratch_dir: scratch_dir(config, project_dir),
        }))
    }

    /// Selector of the database pods.
    pub fn pod_selector(&self) -> String {
        format!("release={}", self.release)
    }

    /// Directory receiving the rendered database manifests.
    pub fn output_dir(&self) -> PathBuf {
        self.scratch_dir
            .join(self.target.track().as_str())
            .join(self.engine.name())
    }
}

fn selected_engine(env: &CiEnv) -> Option<DatabaseEngine> {
    DatabaseEngine::select(env.flag("POSTGRES_ENABLED"), env.flag("MYSQL_ENABLED"))
}

fn database_descriptor(
    env: &CiEnv,
    engine: DatabaseEngine,
    target: &ReleaseTarget,
) -> DatabaseDescriptor {
    let prefix = engine.env_prefix();
    let var = |suffix: &str| format!("{prefix}_{suffix}");

    DatabaseDescriptor::new(
        engine,
        engine.host_for(target.deploy_name()),
        env.get_or(&var("USER"), DEFAULT_DATABASE_USER).to_owned(),
        SecretString::from(env.get_or(&var("PASSWORD"), DEFAULT_DATABASE_PASSWORD)),
        env.get_or(&var("DB"), &target.environment_slug).to_owned(),
        env.get("DATABASE_URL").map(SecretString::from),
    )
}

// ── Release ──

/// Where the application chart comes from and which rendered files are Jobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartSource {
    /// Project chart, used when it exists
    pub local_dir: PathBuf,
    /// Chart reference fetched otherwise
    pub default_chart: String,
    pub initialize_template: String,
    pub migrate_template: String,
}

#[derive(Debug, Clone)]
pub struct ReleasePlan {
    pub target: ReleaseTarget,
    pub image: ImageRef,
    pub project_slug: String,
    pub environment_url: Option<String>,
    pub service_port: u16,
    pub initialize_command: Option<String>,
    pub migrate_command: Option<String>,
    pub database: Option<DatabaseDescriptor>,
    /// URL handed to the app: the descriptor's URL, or `DATABASE_URL` for an external database
    pub database_url: Option<SecretString>,
    pub chart: ChartSource,
    pub scratch_dir: PathBuf,
}

impl ReleasePlan {
    pub fn from_env(
        env: &CiEnv,
        config: &AutodeployConfig,
        project_dir: &Path,
        track: Track,
    ) -> crate::Result<Self> {
        let target = ReleaseTarget::from_env(env, track)?;
        let image = ImageRef::new(
            env.require("CI_REGISTRY_IMAGE")?,
            env.require("CI_COMMIT_SHA")?,
        );

        let service_port = match env.get("SERVICE_PORT") {
            Some(port) => port.trim().parse().map_err(|_| crate::Error::InvalidVar {
                name: "SERVICE_PORT".to_owned(),
                reason: "expected a port number (1-65535)",
            })?,
            None => DEFAULT_SERVICE_PORT,
        };
        if service_port == 0 {
            return Err(crate::Error::InvalidVar {
                name: "SERVICE_PORT".to_owned(),
                reason: "expected a port number (1-65535)",
            });
        }

        let database =
            selected_engine(env).map(|engine| database_descriptor(env, engine, &target));
        let database_url = match &database {
            Some(d) => Some(d.url.clone()),
            None => env.get("DATABASE_URL").map(SecretString::from),
        };

        let chart = ChartSource {
            local_dir: config.resolve(project_dir, &config.paths.chart_dir),
            default_chart: env
                .get_or("AUTO_DEVOPS_CHART", &config.chart.default_chart)
                .to_owned(),
            initialize_template: config.chart.initialize_template.clone(),
            migrate_template: config.chart.migrate_template.clone(),
        };

        Ok(Self {
            image,
            project_slug: env.require("CI_PROJECT_PATH_SLUG")?.to_owned(),
            environment_url: env.get("CI_ENVIRONMENT_URL").map(str::to_owned),
            service_port,
            initialize_command: env.get("DB_INITIALIZE").map(str::to_owned),
            migrate_command: env.get("DB_MIGRATE").map(str::to_owned),
            database,
            database_url,
            chart,
            scratch_dir: scratch_dir(config, project_dir),
            target,
        })
    }

    /// Directory receiving the rendered application manifests.
    pub fn output_dir(&self) -> PathBuf {
        self.scratch_dir
            .join(self.target.track().as_str())
            .join("app")
    }
}

// ── Secret ──

/// Key/value pairs projected into the application secret.
#[derive(Clone)]
pub struct SecretPlan {
    pub target: ReleaseTarget,
    pub data: BTreeMap<String, SecretString>,
}

impl fmt::Debug for SecretPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretPlan")
            .field("target", &self.target)
            .field("keys", &self.data.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SecretPlan {
    pub fn from_env(env: &CiEnv, config: &AutodeployConfig, track: Track) -> crate::Result<Self> {
        let target = ReleaseTarget::from_env(env, track)?;
        let mut data = BTreeMap::new();

        for (key, value) in env.with_prefix(&config.secret.prefix) {
            if key.is_empty() {
                tracing::warn!(prefix = %config.secret.prefix, "skipping variable with empty secret key");
                continue;
            }
            if !is_secret_key(key) {
                return Err(crate::Error::InvalidSecretKey {
                    key: key.to_owned(),
                });
            }
            data.insert(key.to_owned(), SecretString::from(value));
        }

        Ok(Self { target, data })
    }
}

fn is_secret_key(key: &str) -> bool {
    key.bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

// ── Cluster ──

/// Credentials for one cluster, registered as a kubectl context.
#[derive(Clone)]
pub struct ClusterCredentials {
    pub selector: String,
    pub cluster_name: String,
    pub server_url: String,
    pub token: SecretString,
    pub ca_pem: String,
    pub namespace: String,
    pub scratch_dir: PathBuf,
}

impl fmt::Debug for ClusterCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterCredentials")
            .field("selector", &self.selector)
            .field("cluster_name", &self.cluster_name)
            .field("server_url", &self.server_url)
            .field("token", &"[REDACTED]")
            .field("namespace", &self.namespace)
            .finish()
    }
}

impl ClusterCredentials {
    /// Variable prefix for a selector: `KUBE_` for production, `KUBE_<SELECTOR>_` otherwise.
    pub fn env_prefix(selector: &str) -> String {
        if selector == DEFAULT_CLUSTER {
            "KUBE_".to_owned()
        } else {
            format!("KUBE_{}_", selector.to_ascii_uppercase().replace('-', "_"))
        }
    }

    /// Resolve the credential set of `selector`.
    ///
    /// Fails with [`Error::UnknownCluster`](crate::Error::UnknownCluster) when
    /// none of its variables are set and
    /// [`Error::IncompleteCluster`](crate::Error::IncompleteCluster) when only
    /// some are.
    pub fn from_env(
        env: &CiEnv,
        config: &AutodeployConfig,
        project_dir: &Path,
        selector: &str,
    ) -> crate::Result<Self> {
        let prefix = Self::env_prefix(selector);
        let names = ["CLUSTER_NAME", "URL", "TOKEN", "CA_PEM"].map(|n| format!("{prefix}{n}"));
        let values = names.clone().map(|n| env.get(&n));

        let missing: Vec<String> = names
            .iter()
            .zip(values.iter())
            .filter(|(_, v)| v.is_none())
            .map(|(n, _)| n.clone())
            .collect();

        if missing.len() == names.len() {
            return Err(crate::Error::UnknownCluster {
                selector: selector.to_owned(),
                prefix,
            });
        }

        let [Some(cluster_name), Some(server_url), Some(token), Some(ca_pem)] = values else {
            return Err(crate::Error::IncompleteCluster {
                selector: selector.to_owned(),
                missing,
            });
        };

        Ok(Self {
            selector: selector.to_owned(),
            cluster_name: cluster_name.to_owned(),
            server_url: server_url.to_owned(),
            token: SecretString::from(token),
            ca_pem: ca_pem.to_owned(),
            namespace: env.require("KUBE_NAMESPACE")?.to_owned(),
            scratch_dir: scratch_dir(config, project_dir),
        })
    }

    /// File the CA certificate is written to.
    pub fn ca_file(&self) -> PathBuf {
        self.scratch_dir.join(format!("{}-ca.pem", self.cluster_name))
    }

    pub fn user_name(&self) -> String {
        format!("{}-deployer", self.cluster_name)
    }
}
