//! Orchestration of docker, kubectl, and helm for autodeploy.
//!
//! Every external call goes through [`ToolExecutor`], so the workflows on
//! [`Orchestrator`] can be driven by a mock in tests.

pub mod auth;
pub mod client;
pub mod database;
pub mod executor;
pub mod image;
pub mod release;
pub mod secret;
pub mod teardown;
pub mod tool;
pub mod wait;

pub use auth::AuthError;
pub use client::{CheckResult, DoctorReport, Orchestrator, PreflightError};
pub use database::DatabaseError;
pub use executor::{RealExecutor, ToolExecutor};
pub use image::{BuildReport, ImageError};
pub use release::{DeployReport, ReleaseError};
pub use secret::{secret_manifest, SecretError};
pub use teardown::{TeardownError, RELEASE_KINDS};
pub use tool::{Tool, ToolError};
pub use wait::{poll_until, Probe, WaitError, WaitOutcome, WaitPolicy};
