use std::io::Write;
use std::path::{Path, PathBuf};

use autodeploy_core::ImageRef;

/// Image references usable as `--cache-from` for the rest of a build run.
///
/// Backed by a scratch file, one reference per line. Each build of a run
/// reopens the file, so it sees the caches pulled and the stages pushed by
/// the builds before it.
#[derive(Debug)]
pub struct CacheList {
    path: PathBuf,
    refs: Vec<String>,
}

impl CacheList {
    /// Start a new build run, discarding caches recorded by a previous one.
    pub fn reset(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CacheError::Create {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        std::fs::write(path, "").map_err(|e| CacheError::Write {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            refs: Vec::new(),
        })
    }

    /// Reopen the list of the current build run; a missing file is an empty list.
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        let refs = match std::fs::read_to_string(path) {
            Ok(content) => content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_owned)
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(CacheError::Read {
                    path: path.to_path_buf(),
                    source: e,
                });
            }
        };
        Ok(Self {
            path: path.to_path_buf(),
            refs,
        })
    }

    /// Record a pulled image. Returns `false` if it was already listed.
    pub fn push(&mut self, image: &ImageRef) -> Result<bool, CacheError> {
        let reference = image.to_string();
        if self.refs.contains(&reference) {
            return Ok(false);
        }

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| CacheError::Write {
                path: self.path.clone(),
                source: e,
            })?;
        writeln!(file, "{reference}").map_err(|e| CacheError::Write {
            path: self.path.clone(),
            source: e,
        })?;

        self.refs.push(reference);
        Ok(true)
    }

    pub fn refs(&self) -> &[String] {
        &self.refs
    }

    /// `--cache-from <ref>` pairs for `docker build`.
    pub fn cache_from_args(&self) -> Vec<String> {
        self.refs
            .iter()
            .flat_map(|r| ["--cache-from".to_owned(), r.clone()])
            .collect()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("failed to create directory {path}")]
    Create {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read cache list {path}")]
    Read {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write cache list {path}")]
    Write {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
}
