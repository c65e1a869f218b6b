//! Application-level configuration loading: listening port and storage backend selection.

use std::{env, fmt, fs, io::ErrorKind, path::PathBuf, str::FromStr};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "BATTLESHIPS_BACK_CONFIG_PATH";
const DEFAULT_PORT: u16 = 8080;

/// Storage backend the server persists games into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Volatile in-process store.
    #[default]
    Memory,
    /// MongoDB, configured through `MONGO_URI` / `MONGO_DB`.
    Mongo,
    /// CouchDB, configured through the `COUCH_*` variables.
    Couch,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "mongo" | "mongodb" => Ok(Self::Mongo),
            "couch" | "couchdb" => Ok(Self::Couch),
            other => Err(format!("unknown store backend `{other}`")),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Memory => "memory",
            Self::Mongo => "mongo",
            Self::Couch => "couch",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration resolved at startup.
pub struct AppConfig {
    pub port: u16,
    pub store: StoreBackend,
}

impl AppConfig {
    /// Load the configuration file, then apply environment overrides.
    ///
    /// A missing or unreadable file falls back to the built-in defaults.
    pub fn load() -> Self {
        Self::load_file().with_overrides(|key| env::var(key).ok())
    }

    fn load_file() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        port = config.port,
                        store = %config.store,
                        "loaded config file"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    fn from_json(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }

    /// Apply `PORT`/`SERVER_PORT` and `STORE_BACKEND`; unparsable values are ignored.
    fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("PORT").or_else(|| lookup("SERVER_PORT")) {
            match raw.trim().parse::<u16>() {
                Ok(port) => self.port = port,
                Err(err) => warn!(value = %raw, error = %err, "ignoring invalid port override"),
            }
        }

        if let Some(raw) = lookup("STORE_BACKEND") {
            match raw.parse::<StoreBackend>() {
                Ok(store) => self.store = store,
                Err(err) => warn!(value = %raw, error = %err, "ignoring invalid store override"),
            }
        }

        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            store: StoreBackend::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    port: Option<u16>,
    store: Option<StoreBackend>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        Self {
            port: value.port.unwrap_or(defaults.port),
            store: value.store.unwrap_or(defaults.store),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = AppConfig::from_json(r#"{"store": "couch"}"#).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.store, StoreBackend::Couch);

        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn unknown_backend_in_file_is_an_error() {
        assert!(AppConfig::from_json(r#"{"store": "redis"}"#).is_err());
    }

    #[test]
    fn env_overrides_win_over_file() {
        let config = AppConfig::default().with_overrides(vars(&[
            ("PORT", "9000"),
            ("SERVER_PORT", "9001"),
            ("STORE_BACKEND", "MongoDB"),
        ]));
        assert_eq!(config.port, 9000);
        assert_eq!(config.store, StoreBackend::Mongo);

        let config = AppConfig::default().with_overrides(vars(&[("SERVER_PORT", "9001")]));
        assert_eq!(config.port, 9001);
    }

    #[test]
    fn invalid_overrides_are_ignored() {
        let config = AppConfig::default()
            .with_overrides(vars(&[("PORT", "eighty"), ("STORE_BACKEND", "sqlite")]));
        assert_eq!(config, AppConfig::default());
    }
}
