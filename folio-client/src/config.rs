//! Client configuration: backend location, storage path, timeouts.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use folio_core::constants::{
    DEFAULT_TIMEOUT_SECS, DEVELOPMENT_API_BASE_URL, PRODUCTION_API_BASE_URL,
};
use folio_core::error::{FolioError, Result};

const DEFAULT_STORAGE_PATH: &str = ".folio/storage.json";

/// Which backend to talk to when no explicit URL is given.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// A backend on the local machine
    Development,
    /// The hosted backend
    #[default]
    Production,
}

impl Environment {
    /// Base URL of this environment's backend.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Environment::Development => DEVELOPMENT_API_BASE_URL,
            Environment::Production => PRODUCTION_API_BASE_URL,
        }
    }
}

impl FromStr for Environment {
    type Err = FolioError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" | "local" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(FolioError::ConfigError(format!("unknown environment '{}'", other))),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Environment::Development => "development",
            Environment::Production => "production",
        })
    }
}

/// Client configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Selected environment
    pub environment: Environment,
    /// REST backend base URL
    pub api_base_url: String,
    /// Where session, cache and chat history are persisted
    pub storage_path: PathBuf,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Whether cached resources may be served without a request
    pub enable_cache: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::for_environment(Environment::default())
    }
}

impl ClientConfig {
    /// Default config for `environment`.
    pub fn for_environment(environment: Environment) -> Self {
        Self {
            environment,
            api_base_url: environment.default_base_url().into(),
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
            enable_cache: true,
        }
    }

    /// Reads configuration from the environment (and `.env` if present).
    ///
    /// | Variable             | Meaning                                  |
    /// |----------------------|------------------------------------------|
    /// | `FOLIO_ENV`          | `development` or `production`            |
    /// | `FOLIO_API_BASE_URL` | overrides the environment's backend URL  |
    /// | `FOLIO_STORAGE_PATH` | storage file location                    |
    /// | `FOLIO_TIMEOUT_SECS` | request timeout                          |
    /// | `FOLIO_ENABLE_CACHE` | `false`/`0` to always go to the network  |
    ///
    /// Unparseable values are logged and replaced by defaults.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let environment = match std::env::var("FOLIO_ENV") {
            Ok(raw) => raw.parse().unwrap_or_else(|e| {
                warn!(error = %e, "Ignoring FOLIO_ENV");
                Environment::default()
            }),
            Err(_) => Environment::default(),
        };

        let mut config = Self::for_environment(environment);

        if let Ok(url) = std::env::var("FOLIO_API_BASE_URL") {
            config.api_base_url = url;
        }
        if let Ok(path) = std::env::var("FOLIO_STORAGE_PATH") {
            config.storage_path = PathBuf::from(path);
        }
        if let Ok(raw) = std::env::var("FOLIO_TIMEOUT_SECS") {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => config.timeout_seconds = secs,
                _ => warn!(value = %raw, "Ignoring FOLIO_TIMEOUT_SECS"),
            }
        }
        config.enable_cache = std::env::var("FOLIO_ENABLE_CACHE")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        config
    }

    /// Overrides the backend URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Overrides the storage file location.
    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = path.into();
        self
    }

    /// Overrides the request timeout.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Disables serving fresh cache entries without a request.
    pub fn no_cache(mut self) -> Self {
        self.enable_cache = false;
        self
    }

    /// Checks the URL and timeout.
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.api_base_url).map_err(|e| {
            FolioError::ConfigError(format!("invalid API base URL '{}': {}", self.api_base_url, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FolioError::ConfigError(format!(
                "API base URL must be http(s), got '{}'",
                url.scheme()
            )));
        }
        if self.timeout_seconds == 0 {
            return Err(FolioError::ConfigError("timeout must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_default_is_production() {
        let config = ClientConfig::default();
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.api_base_url, PRODUCTION_API_BASE_URL);
        assert!(config.enable_cache);
        assert!(config.validate().is_ok());
    }

    #[test_case("development", Environment::Development)]
    #[test_case(" DEV ", Environment::Development)]
    #[test_case("prod", Environment::Production)]
    fn test_environment_parsing(raw: &str, expected: Environment) {
        assert_eq!(raw.parse::<Environment>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_environment() {
        assert!(matches!(
            "staging".parse::<Environment>(),
            Err(FolioError::ConfigError(_))
        ));
    }

    #[test]
    fn test_builders() {
        let config = ClientConfig::for_environment(Environment::Development)
            .with_base_url("http://localhost:9000")
            .with_storage_path("/tmp/folio.json")
            .with_timeout(5)
            .no_cache();
        assert_eq!(config.api_base_url, "http://localhost:9000");
        assert_eq!(config.storage_path, PathBuf::from("/tmp/folio.json"));
        assert_eq!(config.timeout_seconds, 5);
        assert!(!config.enable_cache);
    }

    #[test_case("not a url" ; "unparseable")]
    #[test_case("ftp://example.com" ; "wrong scheme")]
    fn test_invalid_base_url(url: &str) {
        let config = ClientConfig::default().with_base_url(url);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        assert!(ClientConfig::default().with_timeout(0).validate().is_err());
    }
}
