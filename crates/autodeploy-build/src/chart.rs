//! Helm chart resolution, values files, and rendered manifest lookup.
//!
//! Overrides are written to a JSON values file (JSON is valid YAML for
//! Helm) instead of `--set` flags, so values containing commas, quotes, or
//! newlines reach the chart untouched.

use std::path::{Path, PathBuf};

use autodeploy_core::{ChartSource, DatabaseEngine, DatabasePlan, ReleasePlan};
use secrecy::ExposeSecret;
use serde_json::{json, Value};

/// Where the application chart comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChartLocation {
    /// Chart shipped with the project
    Local(PathBuf),
    /// Chart reference to fetch (`repo/name`)
    Remote(String),
}

/// Use the project chart when it has a `Chart.yaml`, otherwise the default chart.
pub fn locate(source: &ChartSource) -> ChartLocation {
    if source.local_dir.join("Chart.yaml").is_file() {
        ChartLocation::Local(source.local_dir.clone())
    } else {
        ChartLocation::Remote(source.default_chart.clone())
    }
}

/// The chart `helm fetch --untar` unpacked below `untar_dir`.
///
/// Helm names the directory after the chart itself, not the reference, so a
/// tarball URL like `.../auto-deploy-app-0.2.9.tgz` still lands in
/// `auto-deploy-app/`. `untar_dir` must hold exactly one chart.
pub fn fetched_chart_dir(untar_dir: &Path) -> Result<PathBuf, ChartError> {
    let entries = std::fs::read_dir(untar_dir).map_err(|e| ChartError::Read {
        path: untar_dir.to_path_buf(),
        source: e,
    })?;

    let mut charts = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ChartError::Read {
            path: untar_dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if path.join("Chart.yaml").is_file() {
            charts.push(path);
        }
    }

    match charts.as_slice() {
        [chart] => Ok(chart.clone()),
        _ => Err(ChartError::FetchedChart {
            dir: untar_dir.to_path_buf(),
            found: charts.len(),
        }),
    }
}

/// Empty `dir`, creating it if needed, so no manifest from an earlier render survives.
pub fn prepare_output_dir(dir: &Path) -> Result<(), ChartError> {
    if dir.exists() {
        std::fs::remove_dir_all(dir).map_err(|e| ChartError::Cleanup {
            path: dir.to_path_buf(),
            source: e,
        })?;
    }
    std::fs::create_dir_all(dir).map_err(|e| ChartError::Create {
        path: dir.to_path_buf(),
        source: e,
    })
}

/// Overrides for the application chart.
pub fn release_values(plan: &ReleasePlan) -> Value {
    let target = &plan.target;
    let database = match &plan.database {
        Some(d) => json!({
            "enabled": true,
            "engine": d.engine.name(),
            "host": d.host,
            "user": d.user,
            "password": d.password.expose_secret(),
            "name": d.name,
        }),
        None => json!({ "enabled": false }),
    };

    json!({
        "namespace": target.namespace,
        "releaseOverride": target.deploy_name(),
        "image": {
            "repository": plan.image.repository,
            "tag": plan.image.tag,
            "pullPolicy": "IfNotPresent",
        },
        "gitlab": {
            "app": plan.project_slug,
            "env": target.environment_slug,
        },
        "application": {
            "track": target.track().as_str(),
            "secretName": target.names.secret_name,
            "database_url": plan.database_url.as_ref().map(|u| u.expose_secret().to_owned()),
            "initializeCommand": plan.initialize_command,
            "migrateCommand": plan.migrate_command,
        },
        "database": database,
        "service": {
            "url": plan.environment_url,
            "internalPort": plan.service_port,
        },
    })
}

/// Overrides for the database chart of the selected engine.
pub fn database_values(plan: &DatabasePlan) -> Value {
    let d = &plan.descriptor;
    let mut values = match plan.engine {
        DatabaseEngine::Postgres => json!({
            "postgresUser": d.user,
            "postgresPassword": d.password.expose_secret(),
            "postgresDatabase": d.name,
        }),
        DatabaseEngine::Mysql => json!({
            "mysqlUser": d.user,
            "mysqlPassword": d.password.expose_secret(),
            "mysqlDatabase": d.name,
        }),
    };
    values["imageTag"] = json!(plan.version);
    values["fullnameOverride"] = json!(plan.release);
    values
}

/// Write a values file readable only by the current user.
pub fn write_values(path: &Path, values: &Value) -> Result<(), ChartError> {
    let content = serde_json::to_vec_pretty(values).map_err(|e| ChartError::Serialize {
        path: path.to_path_buf(),
        source: e,
    })?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ChartError::Create {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    use std::io::Write;
    options
        .open(path)
        .and_then(|mut f| f.write_all(&content))
        .map_err(|e| ChartError::Write {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Find a rendered manifest by file name anywhere below `output_dir`.
///
/// `helm template --output-dir` nests files as `<chart>/templates/<file>`,
/// and subcharts one level deeper, so the search is recursive.
pub fn find_rendered(output_dir: &Path, file_name: &str) -> Result<Option<PathBuf>, ChartError> {
    let entries = std::fs::read_dir(output_dir).map_err(|e| ChartError::Read {
        path: output_dir.to_path_buf(),
        source: e,
    })?;

    let mut dirs = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ChartError::Read {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        } else if entry.file_name() == file_name {
            return Ok(Some(path));
        }
    }

    dirs.sort();
    for dir in dirs {
        if let Some(found) = find_rendered(&dir, file_name)? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}

/// Delete a rendered manifest so a later recursive apply skips it.
pub fn remove_rendered(path: &Path) -> Result<(), ChartError> {
    std::fs::remove_file(path).map_err(|e| ChartError::Remove {
        path: path.to_path_buf(),
        source: e,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("failed to clean up output directory {path}")]
    Cleanup {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("failed to create directory {path}")]
    Create {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("failed to serialize values for {path}")]
    Serialize {
        path: std::path::PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to write {path}")]
    Write {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read {path}")]
    Read {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("expected one fetched chart in {dir}, found {found}")]
    FetchedChart {
        dir: std::path::PathBuf,
        found: usize,
    },
    #[error("failed to remove rendered manifest {path}")]
    Remove {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
}
