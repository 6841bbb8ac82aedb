use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Name of the optional per-project configuration file.
pub const CONFIG_FILE_NAME: &str = "autodeploy.toml";

/// autodeploy.toml configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AutodeployConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub build: BuildConfig,
    #[serde(default)]
    pub chart: ChartConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub wait: WaitConfig,
    #[serde(default)]
    pub secret: SecretConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Scratch directory for per-job artifacts (CA file, cache list, rendered manifests)
    #[serde(default = "default_scratch_dir")]
    pub scratch_dir: PathBuf,
    /// Project-local Helm chart; used instead of the default chart when present
    #[serde(default = "default_chart_dir")]
    pub chart_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Dockerfile to build
    #[serde(default = "default_dockerfile")]
    pub dockerfile: PathBuf,
    /// Build context passed to `docker build`
    #[serde(default = "default_context")]
    pub context: PathBuf,
    /// Branch whose images are always tried as layer cache
    #[serde(default = "default_cache_branch")]
    pub cache_branch: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Chart fetched when the project has no chart directory.
    /// Overridden by `AUTO_DEVOPS_CHART`.
    #[serde(default = "default_chart")]
    pub default_chart: String,
    /// File name of the rendered initialize Job manifest
    #[serde(default = "default_initialize_template")]
    pub initialize_template: String,
    /// File name of the rendered migrate Job manifest
    #[serde(default = "default_migrate_template")]
    pub migrate_template: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_postgres_chart")]
    pub postgres_chart: String,
    #[serde(default = "default_mysql_chart")]
    pub mysql_chart: String,
    /// Image tag for Postgres; overridden by `POSTGRES_VERSION`
    #[serde(default = "default_postgres_version")]
    pub postgres_version: String,
    /// Image tag for MySQL; overridden by `MYSQL_VERSION`
    #[serde(default = "default_mysql_version")]
    pub mysql_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitConfig {
    /// Upper bound for every readiness/completion wait
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Delay between two readiness probes
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretConfig {
    /// Environment variable prefix projected into the application secret
    #[serde(default = "default_secret_prefix")]
    pub prefix: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            scratch_dir: default_scratch_dir(),
            chart_dir: default_chart_dir(),
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            dockerfile: default_dockerfile(),
            context: default_context(),
            cache_branch: default_cache_branch(),
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            default_chart: default_chart(),
            initialize_template: default_initialize_template(),
            migrate_template: default_migrate_template(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            postgres_chart: default_postgres_chart(),
            mysql_chart: default_mysql_chart(),
            postgres_version: default_postgres_version(),
            mysql_version: default_mysql_version(),
        }
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            interval_secs: default_interval_secs(),
        }
    }
}

impl Default for SecretConfig {
    fn default() -> Self {
        Self {
            prefix: default_secret_prefix(),
        }
    }
}

impl WaitConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Probe interval, never shorter than one second.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

impl AutodeployConfig {
    /// Load from autodeploy.toml at the given path, or return defaults if not found.
    pub fn load(project_dir: &Path) -> crate::Result<Self> {
        let config_path = project_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            let content =
                std::fs::read_to_string(&config_path).map_err(|e| crate::Error::ConfigLoad {
                    path: config_path.clone(),
                    source: e,
                })?;
            let config: Self = toml::from_str(&content).map_err(|e| crate::Error::ConfigParse {
                path: config_path.clone(),
                source: e,
            })?;
            tracing::debug!(path = %config_path.display(), "loaded config file");
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve a configured path against the project directory.
    pub fn resolve(&self, project_dir: &Path, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            project_dir.join(path)
        }
    }
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from(".autodeploy")
}

fn default_chart_dir() -> PathBuf {
    PathBuf::from("chart")
}

fn default_dockerfile() -> PathBuf {
    PathBuf::from("Dockerfile")
}

fn default_context() -> PathBuf {
    PathBuf::from(".")
}

fn default_cache_branch() -> String {
    "master".to_owned()
}

fn default_chart() -> String {
    "gitlab/auto-deploy-app".to_owned()
}

fn default_initialize_template() -> String {
    "initialize-job.yaml".to_owned()
}

fn default_migrate_template() -> String {
    "migrate-job.yaml".to_owned()
}

fn default_postgres_chart() -> String {
    "stable/postgresql".to_owned()
}

fn default_mysql_chart() -> String {
    "stable/mysql".to_owned()
}

fn default_postgres_version() -> String {
    "9.6.2".to_owned()
}

fn default_mysql_version() -> String {
    "5.7.14".to_owned()
}

fn default_timeout_secs() -> u64 {
    600
}

fn default_interval_secs() -> u64 {
    5
}

fn default_secret_prefix() -> String {
    "K8S_SECRET_".to_owned()
}
