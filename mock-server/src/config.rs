//! Environment configuration for the standalone server binary.

use std::env;
use std::path::PathBuf;

use mockhttp_core::{ExpectationSet, SimpleResponseProvider};

use crate::error::ServerError;

const DEFAULT_PORT: u16 = 3000;

/// Settings read from `PORT` and `MOCK_EXPECTATIONS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// JSON expectation set to preload, if any.
    pub expectations: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            expectations: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_vars(env::var("PORT").ok(), env::var_os("MOCK_EXPECTATIONS").map(PathBuf::from))
    }

    fn from_vars(port: Option<String>, expectations: Option<PathBuf>) -> Result<Self, ServerError> {
        let port = match port {
            Some(value) => value
                .parse()
                .map_err(|_| ServerError::InvalidConfig { name: "PORT", value })?,
            None => DEFAULT_PORT,
        };
        Ok(Self { port, expectations })
    }

    /// Provider preloaded from the configured expectation set, or an empty
    /// provider with the default policy.
    pub fn load_provider(&self) -> Result<SimpleResponseProvider, ServerError> {
        let Some(path) = &self.expectations else {
            return Ok(SimpleResponseProvider::new());
        };
        let json = std::fs::read_to_string(path).map_err(|source| ServerError::ReadExpectations {
            path: path.clone(),
            source,
        })?;
        Ok(ExpectationSet::from_json(&json)?.into_provider()?)
    }
}

#[cfg(test)]
mod tests {
    use mockhttp_core::{ExpectedResponseProvider, HttpRequest, Method};

    use super::*;

    #[test]
    fn defaults_when_unset() {
        assert_eq!(ServerConfig::from_vars(None, None).unwrap(), ServerConfig::default());
    }

    #[test]
    fn parses_port() {
        let config = ServerConfig::from_vars(Some("8081".to_string()), None).unwrap();
        assert_eq!(config.port, 8081);
    }

    #[test]
    fn rejects_invalid_port() {
        let err = ServerConfig::from_vars(Some("http".to_string()), None).unwrap_err();
        assert!(matches!(err, ServerError::InvalidConfig { name: "PORT", .. }));
    }

    #[test]
    fn missing_expectation_file_is_reported() {
        let config = ServerConfig {
            expectations: Some(PathBuf::from("/nonexistent/expectations.json")),
            ..ServerConfig::default()
        };
        assert!(matches!(config.load_provider(), Err(ServerError::ReadExpectations { .. })));
    }

    #[test]
    fn loads_shipped_expectation_set() {
        let config = ServerConfig {
            expectations: Some(PathBuf::from(concat!(
                env!("CARGO_MANIFEST_DIR"),
                "/../test-vectors/server.json"
            ))),
            ..ServerConfig::default()
        };
        let provider = config.load_provider().unwrap();
        let ping = HttpRequest::builder(Method::Get).path("/ping").build();
        assert_eq!(provider.response(&ping).unwrap().content(), Some("pong"));
    }
}
