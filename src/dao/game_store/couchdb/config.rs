const DEFAULT_BASE_URL: &str = "http://localhost:5984";
const DEFAULT_DB: &str = "battleships";

/// Connection settings for the CouchDB backend.
#[derive(Debug, Clone)]
pub struct CouchConfig {
    /// Server root, e.g. `http://localhost:5984`.
    pub base_url: String,
    /// Database holding game and user documents.
    pub database: String,
    /// Basic-auth username and password.
    pub credentials: Option<(String, String)>,
}

impl CouchConfig {
    /// Anonymous access to `database` on `base_url`.
    pub fn new(base_url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            database: database.into(),
            credentials: None,
        }
    }

    /// Attach basic-auth credentials.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    /// Read `COUCH_BASE_URL` and `COUCH_DB` (local server and `battleships` when unset).
    /// Credentials are only used when both `COUCH_USERNAME` and `COUCH_PASSWORD` are set.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("COUCH_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned());
        let database = std::env::var("COUCH_DB").unwrap_or_else(|_| DEFAULT_DB.to_owned());

        let config = Self::new(base_url, database);
        match (
            std::env::var("COUCH_USERNAME").ok(),
            std::env::var("COUCH_PASSWORD").ok(),
        ) {
            (Some(username), Some(password)) => config.with_credentials(username, password),
            _ => config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_are_optional() {
        let config = CouchConfig::new("http://couch:5984", "games");
        assert!(config.credentials.is_none());

        let config = config.with_credentials("admin", "secret");
        assert_eq!(
            config.credentials,
            Some(("admin".to_owned(), "secret".to_owned()))
        );
    }
}
