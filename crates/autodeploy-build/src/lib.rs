//! Build-side helpers for autodeploy.
//!
//! # Image build run
//!
//! ```text
//! autodeploy build
//!   1. Stages   ── discover `FROM ... AS <stage>` targets in the Dockerfile
//!   2. Cache    ── reset the cache-from list in the scratch directory
//!   3. Per stage, then the final image:
//!        pull <cache branch> / <branch> images (misses tolerated)
//!        docker build --cache-from ... [--target <stage>] -t <sha> -t <branch>
//!        docker push both tags
//! ```
//!
//! # Charts
//!
//! The application chart is the project's `chart/` directory when it has a
//! `Chart.yaml`, otherwise the configured default chart is fetched into the
//! scratch directory. Overrides are passed to `helm template` through a
//! values file written by [`chart::write_values`].
//!
//! After a deploy, [`artifact::write_environment_url`] leaves the environment
//! URL in the scratch directory for later pipeline jobs.

pub mod artifact;
pub mod cache;
pub mod chart;
pub mod dockerfile;

pub use artifact::{write_environment_url, ArtifactError, ENVIRONMENT_URL_FILE};
pub use cache::{CacheError, CacheList};
pub use chart::{ChartError, ChartLocation};
pub use dockerfile::{discover_stages, read_stages, StageError};
