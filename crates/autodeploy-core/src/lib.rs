//! Core types and configuration for autodeploy.
//!
//! This crate defines the `autodeploy.toml` schema ([`AutodeployConfig`]),
//! the CI environment snapshot ([`CiEnv`]), release naming rules, the typed
//! plans each workflow consumes, and shared error types.

pub mod config;
pub mod database;
pub mod env;
pub mod error;
pub mod naming;
pub mod plan;

pub use config::{
    AutodeployConfig, BuildConfig, ChartConfig, DatabaseConfig, PathsConfig, SecretConfig,
    WaitConfig, CONFIG_FILE_NAME,
};
pub use database::{DatabaseDescriptor, DatabaseEngine};
pub use env::CiEnv;
pub use error::{Error, Result};
pub use naming::{
    application_secret_name, deploy_name, ImageRef, ReleaseNames, Track, DEFAULT_TRACK,
};
pub use plan::{
    ChartSource, ClusterCredentials, DatabasePlan, ImagePlan, RegistryLogin, ReleasePlan,
    ReleaseTarget, SecretPlan, DEFAULT_CLUSTER,
};
