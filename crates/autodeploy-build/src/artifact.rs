//! Files a deploy leaves in the scratch directory for later pipeline jobs.

use std::path::{Path, PathBuf};

/// Name of the file holding the deployed environment URL.
pub const ENVIRONMENT_URL_FILE: &str = "environment_url.txt";

/// Record `url` as `<scratch_dir>/environment_url.txt`, one line, replacing any previous value.
pub fn write_environment_url(scratch_dir: &Path, url: &str) -> Result<PathBuf, ArtifactError> {
    std::fs::create_dir_all(scratch_dir).map_err(|e| ArtifactError::Create {
        path: scratch_dir.to_path_buf(),
        source: e,
    })?;

    let path = scratch_dir.join(ENVIRONMENT_URL_FILE);
    std::fs::write(&path, format!("{}\n", url.trim())).map_err(|e| ArtifactError::Write {
        path: path.clone(),
        source: e,
    })?;
    tracing::debug!(path = %path.display(), "recorded environment URL");
    Ok(path)
}

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("failed to create directory {path}")]
    Create {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}
