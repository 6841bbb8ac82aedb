use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound;
use std::path::Path;

/// Immutable snapshot of the CI job's environment variables.
///
/// Captured once per invocation and then threaded through every plan
/// constructor, so no operation reads the process environment on its own.
/// Values may hold credentials; `Debug` prints variable names only.
#[derive(Clone, Default)]
pub struct CiEnv {
    vars: BTreeMap<String, String>,
}

impl fmt::Debug for CiEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CiEnv")
            .field("vars", &self.vars.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl CiEnv {
    /// Capture the process environment, loading `<project_dir>/.env` first when present.
    ///
    /// Variables already set in the process win over the file.
    pub fn capture(project_dir: &Path) -> Self {
        let dotenv_path = project_dir.join(".env");
        let dotenv_loaded = match dotenvy::from_path(&dotenv_path) {
            Ok(()) => true,
            Err(e) if e.not_found() => false,
            Err(e) => {
                tracing::warn!(path = %dotenv_path.display(), error = %e, "ignoring unreadable .env");
                false
            }
        };
        let env = Self::from_vars(std::env::vars_os().filter_map(|(k, v)| {
            // Non-UTF-8 variables cannot carry any setting we read.
            match (k.into_string(), v.into_string()) {
                (Ok(k), Ok(v)) => Some((k, v)),
                _ => None,
            }
        }));
        tracing::debug!(dotenv = dotenv_loaded, vars = env.vars.len(), "captured environment");
        env
    }

    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Value of `name`; empty values count as unset.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn get_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        match self.get(name) {
            Some(value) => value,
            None => default,
        }
    }

    pub fn require(&self, name: &str) -> crate::Result<&str> {
        self.get(name).ok_or_else(|| crate::Error::MissingVar {
            name: name.to_owned(),
        })
    }

    /// Boolean flag; only an explicit truthy value enables it.
    pub fn flag(&self, name: &str) -> bool {
        self.get(name).is_some_and(|v| {
            matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "true" | "1" | "yes" | "on"
            )
        })
    }

    /// Variables starting with `prefix`, as `(stripped_key, value)` pairs in key order.
    ///
    /// Unlike [`get`](Self::get), empty values are kept.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.vars
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(move |(k, _)| k.starts_with(prefix))
            .map(move |(k, v)| (&k[prefix.len()..], v.as_str()))
    }
}
