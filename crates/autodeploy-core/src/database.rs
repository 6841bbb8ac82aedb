use std::fmt;

use secrecy::{ExposeSecret, SecretString};

/// Database engine provisioned next to a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseEngine {
    Postgres,
    Mysql,
}

impl DatabaseEngine {
    /// Pick at most one engine from the enablement flags.
    ///
    /// MySQL wins when both are set; no flag means no database.
    pub fn select(postgres_enabled: bool, mysql_enabled: bool) -> Option<Self> {
        if mysql_enabled {
            Some(Self::Mysql)
        } else if postgres_enabled {
            Some(Self::Postgres)
        } else {
            None
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Mysql => "mysql",
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            Self::Postgres => 5432,
            Self::Mysql => 3306,
        }
    }

    /// Prefix of the environment variables configuring this engine.
    pub(crate) fn env_prefix(self) -> &'static str {
        match self {
            Self::Postgres => "POSTGRES",
            Self::Mysql => "MYSQL",
        }
    }

    /// Service host of this engine for a release: `<deploy_name>-<engine>`.
    pub fn host_for(self, deploy_name: &str) -> String {
        format!("{deploy_name}-{}", self.name())
    }
}

impl fmt::Display for DatabaseEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Connection settings handed to the application chart.
#[derive(Clone)]
pub struct DatabaseDescriptor {
    pub engine: DatabaseEngine,
    pub host: String,
    pub user: String,
    pub password: SecretString,
    pub name: String,
    pub url: SecretString,
}

impl fmt::Debug for DatabaseDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseDescriptor")
            .field("engine", &self.engine)
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("name", &self.name)
            .field("url", &"[REDACTED]")
            .finish()
    }
}

impl DatabaseDescriptor {
    /// Build the descriptor; `url_override` replaces the default URL verbatim.
    pub fn new(
        engine: DatabaseEngine,
        host: String,
        user: String,
        password: SecretString,
        name: String,
        url_override: Option<SecretString>,
    ) -> Self {
        let url = match url_override {
            Some(url) => url,
            None => SecretString::from(default_url(
                engine,
                &user,
                password.expose_secret(),
                &host,
                &name,
            )),
        };
        Self {
            engine,
            host,
            user,
            password,
            name,
            url,
        }
    }
}

/// `<engine>://<user>:<password>@<host>:<port>/<name>`
pub fn default_url(
    engine: DatabaseEngine,
    user: &str,
    password: &str,
    host: &str,
    name: &str,
) -> String {
    format!(
        "{scheme}://{user}:{password}@{host}:{port}/{name}",
        scheme = engine.name(),
        port = engine.default_port(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_is_mutually_exclusive() {
        assert_eq!(DatabaseEngine::select(false, false), None);
        assert_eq!(
            DatabaseEngine::select(true, false),
            Some(DatabaseEngine::Postgres)
        );
        assert_eq!(DatabaseEngine::select(false, true), Some(DatabaseEngine::Mysql));
        assert_eq!(DatabaseEngine::select(true, true), Some(DatabaseEngine::Mysql));
    }

    #[test]
    fn host_is_per_release() {
        assert_eq!(
            DatabaseEngine::Postgres.host_for("review-qa"),
            "review-qa-postgres"
        );
        assert_eq!(DatabaseEngine::Mysql.host_for("review"), "review-mysql");
    }

    #[test]
    fn default_urls() {
        assert_eq!(
            default_url(DatabaseEngine::Postgres, "user", "pw", "db-postgres", "app"),
            "postgres://user:pw@db-postgres:5432/app"
        );
        assert_eq!(
            default_url(DatabaseEngine::Mysql, "root", "pw", "db-mysql", "app"),
            "mysql://root:pw@db-mysql:3306/app"
        );
    }

    #[test]
    fn override_replaces_default_url() {
        let d = DatabaseDescriptor::new(
            DatabaseEngine::Postgres,
            "h".to_owned(),
            "u".to_owned(),
            SecretString::from("p"),
            "n".to_owned(),
            Some(SecretString::from("postgres://elsewhere/db")),
        );
        assert_eq!(d.url.expose_secret(), "postgres://elsewhere/db");
    }

    #[test]
    fn debug_redacts_credentials() {
        let d = DatabaseDescriptor::new(
            DatabaseEngine::Mysql,
            "h".to_owned(),
            "u".to_owned(),
            SecretString::from("hunter2"),
            "n".to_owned(),
            None,
        );
        assert!(!format!("{d:?}").contains("hunter2"));
    }
}
