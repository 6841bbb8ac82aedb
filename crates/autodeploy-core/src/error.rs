use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load config from {path}")]
    ConfigLoad {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    // ── CI environment ──
    #[error("missing environment variable: {name}")]
    MissingVar { name: String },

    #[error("invalid value for {name}: {reason}")]
    InvalidVar { name: String, reason: &'static str },

    #[error(
        "invalid track {track:?} — use lowercase letters, digits and '-', starting and ending alphanumeric"
    )]
    InvalidTrack { track: String },

    #[error("invalid secret key {key:?} — keys may only contain letters, digits, '-', '_' and '.'")]
    InvalidSecretKey { key: String },

    // ── Cluster selection ──
    #[error("unknown cluster '{selector}' — no credentials found (expected {prefix}CLUSTER_NAME, {prefix}URL, {prefix}TOKEN, {prefix}CA_PEM)")]
    UnknownCluster { selector: String, prefix: String },

    #[error("incomplete credentials for cluster '{selector}'; missing: {}", missing.join(", "))]
    IncompleteCluster {
        selector: String,
        missing: Vec<String>,
    },
}
