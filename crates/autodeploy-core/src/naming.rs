//! Naming rules shared by every workflow.
//!
//! A release for a track is identified by its deploy name:
//!
//! ```text
//! track "stable" → <environment-slug>
//! track "qa"     → <environment-slug>-qa
//! ```
//!
//! The application secret, the database host, and the init/migrate Jobs are
//! all derived from that name.

use std::fmt;
use std::str::FromStr;

/// Track deployed when none is given.
pub const DEFAULT_TRACK: &str = "stable";

/// Longest value Kubernetes accepts for a label.
const MAX_LABEL_LEN: usize = 63;

/// A named deployment variant (e.g. `stable`, `qa`, `canary`).
///
/// Always a valid lowercase DNS-label fragment, since it ends up in
/// resource names and label values.
///
/// # Examples
///
/// ```
/// use autodeploy_core::Track;
///
/// let track: Track = "qa".parse().unwrap();
/// assert_eq!(track.as_str(), "qa");
/// assert!(Track::default().is_stable());
/// assert!("QA".parse::<Track>().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Track(String);

impl Track {
    pub fn new(name: impl Into<String>) -> crate::Result<Self> {
        let name = name.into();
        if is_dns_label(&name) {
            Ok(Self(name))
        } else {
            Err(crate::Error::InvalidTrack { track: name })
        }
    }

    pub fn stable() -> Self {
        Self(DEFAULT_TRACK.to_owned())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_stable(&self) -> bool {
        self.0 == DEFAULT_TRACK
    }
}

impl Default for Track {
    fn default() -> Self {
        Self::stable()
    }
}

impl FromStr for Track {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_dns_label(s: &str) -> bool {
    let bytes = s.as_bytes();
    let (Some(first), Some(last)) = (bytes.first(), bytes.last()) else {
        return false;
    };
    s.len() <= MAX_LABEL_LEN
        && first.is_ascii_alphanumeric()
        && last.is_ascii_alphanumeric()
        && bytes
            .iter()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
}

/// Release name for a track: the environment slug, suffixed unless stable.
pub fn deploy_name(environment_slug: &str, track: &Track) -> String {
    if track.is_stable() {
        environment_slug.to_owned()
    } else {
        format!("{environment_slug}-{track}")
    }
}

/// Name of the Secret holding the projected `K8S_SECRET_*` variables.
pub fn application_secret_name(environment_slug: &str, track: &Track) -> String {
    format!("{}-secret", deploy_name(environment_slug, track))
}

/// Names derived from one track of one environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseNames {
    pub track: Track,
    pub deploy_name: String,
    pub secret_name: String,
}

impl ReleaseNames {
    pub fn new(environment_slug: &str, track: Track) -> Self {
        Self {
            deploy_name: deploy_name(environment_slug, &track),
            secret_name: application_secret_name(environment_slug, &track),
            track,
        }
    }

    pub fn initialize_job(&self) -> String {
        format!("{}-initialize", self.deploy_name)
    }

    pub fn migrate_job(&self) -> String {
        format!("{}-migrate", self.deploy_name)
    }

    /// Label selector matching every resource of this release.
    pub fn selector(&self) -> String {
        format!("release={}", self.deploy_name)
    }
}

/// A container image reference (`repository:tag`).
///
/// Never mutated; each variant (stage, tag) is a new value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRef {
    pub repository: String,
    pub tag: String,
}

impl ImageRef {
    pub fn new(repository: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            tag: tag.into(),
        }
    }

    /// Same repository, different tag.
    pub fn with_tag(&self, tag: impl Into<String>) -> Self {
        Self::new(self.repository.clone(), tag)
    }

    /// Image of a named build stage: `<repository>/<stage>:<tag>`.
    pub fn for_stage(repository: &str, stage: &str, tag: impl Into<String>) -> Self {
        Self::new(format!("{repository}/{stage}"), tag)
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(s: &str) -> Track {
        Track::new(s).unwrap()
    }

    #[test]
    fn stable_deploy_name_is_slug() {
        assert_eq!(deploy_name("review-app", &Track::stable()), "review-app");
    }

    #[test]
    fn other_track_is_suffixed() {
        assert_eq!(deploy_name("production", &track("canary")), "production-canary");
    }

    #[test]
    fn secret_name_follows_deploy_name() {
        assert_eq!(
            application_secret_name("production", &track("qa")),
            "production-qa-secret"
        );
        assert_eq!(
            application_secret_name("production", &Track::stable()),
            "production-secret"
        );
    }

    #[test]
    fn release_names_derive_jobs_and_selector() {
        let names = ReleaseNames::new("staging", track("qa"));
        assert_eq!(names.deploy_name, "staging-qa");
        assert_eq!(names.secret_name, "staging-qa-secret");
        assert_eq!(names.initialize_job(), "staging-qa-initialize");
        assert_eq!(names.migrate_job(), "staging-qa-migrate");
        assert_eq!(names.selector(), "release=staging-qa");
    }

    #[test]
    fn rejects_invalid_tracks() {
        let too_long = "a".repeat(64);
        for bad in ["", "QA", "-qa", "qa-", "q a", "q_a", too_long.as_str()] {
            assert!(Track::new(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn image_ref_display_and_stage() {
        let img = ImageRef::new("registry.example.com/group/app", "abc123");
        assert_eq!(img.to_string(), "registry.example.com/group/app:abc123");
        assert_eq!(
            img.with_tag("main").to_string(),
            "registry.example.com/group/app:main"
        );
        assert_eq!(
            ImageRef::for_stage("registry.example.com/group/app", "builder", "abc123").to_string(),
            "registry.example.com/group/app/builder:abc123"
        );
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn slug() -> impl Strategy<Value = String> {
            "[a-z][a-z0-9-]{0,20}[a-z0-9]"
        }

        proptest! {
            #[test]
            fn non_stable_tracks_are_suffixed(slug in slug(), t in "[a-z][a-z0-9]{0,10}") {
                prop_assume!(t != DEFAULT_TRACK);
                let track = Track::new(t.clone()).unwrap();
                prop_assert_eq!(deploy_name(&slug, &track), format!("{slug}-{t}"));
            }

            #[test]
            fn secret_name_is_deploy_name_plus_suffix(slug in slug(), t in "[a-z][a-z0-9]{0,10}") {
                let track = Track::new(t).unwrap();
                prop_assert_eq!(
                    application_secret_name(&slug, &track),
                    format!("{}-secret", deploy_name(&slug, &track))
                );
            }

            #[test]
            fn valid_tracks_round_trip(t in "[a-z0-9]([a-z0-9-]{0,30}[a-z0-9])?") {
                let track: Track = t.parse().unwrap();
                prop_assert_eq!(track.as_str(), t.as_str());
            }
        }
    }
}
