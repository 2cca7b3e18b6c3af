//! Connector configuration and credentials
//!
//! Credentials are an explicit struct loaded once at the boundary and
//! passed to the connector constructors; the library never reads the
//! environment behind the caller's back.

use std::fmt;
use std::str::FromStr;

use crate::error::FlightError;

/// Environment variable holding the engine username.
pub const ENV_USER: &str = "QFETCH_USER";
/// Environment variable holding the engine authentication token.
pub const ENV_TOKEN: &str = "QFETCH_TOKEN";

/// Where queries execute: directly against the engine, or through the
/// managed platform's gateway. Selected explicitly at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentMode {
    Local,
    Platform,
}

impl FromStr for DeploymentMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Self::Local),
            "platform" => Ok(Self::Platform),
            other => Err(format!("unknown deployment mode: {other} (expected local|platform)")),
        }
    }
}

/// Endpoint settings for the remote engine.
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    pub host: String,
    pub port: u16,
    pub use_tls: bool,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 32010,
            use_tls: false,
        }
    }
}

impl ConnectorConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            use_tls: false,
        }
    }

    pub fn with_tls(mut self, use_tls: bool) -> Self {
        self.use_tls = use_tls;
        self
    }

    /// gRPC endpoint URL for this configuration.
    pub fn endpoint_url(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }
}

/// Engine credentials: a username plus an authentication token.
#[derive(Clone)]
pub struct Credentials {
    pub user: String,
    pub token: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            token: token.into(),
        }
    }

    /// Load credentials from `QFETCH_USER` / `QFETCH_TOKEN`.
    pub fn from_env() -> Result<Self, FlightError> {
        let user = std::env::var(ENV_USER)
            .map_err(|_| FlightError::Auth(format!("{ENV_USER} is not set")))?;
        let token = std::env::var(ENV_TOKEN)
            .map_err(|_| FlightError::Auth(format!("{ENV_TOKEN} is not set")))?;
        Ok(Self { user, token })
    }
}

// The token never goes to logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deployment_mode_from_str() {
        assert_eq!("local".parse(), Ok(DeploymentMode::Local));
        assert_eq!("platform".parse(), Ok(DeploymentMode::Platform));
        assert!("staging".parse::<DeploymentMode>().is_err());
    }

    #[test]
    fn test_endpoint_url() {
        let config = ConnectorConfig::new("engine.example.com", 32010);
        assert_eq!(config.endpoint_url(), "http://engine.example.com:32010");

        let config = config.with_tls(true);
        assert_eq!(config.endpoint_url(), "https://engine.example.com:32010");
    }

    #[test]
    fn test_credentials_debug_redacts_token() {
        let credentials = Credentials::new("UI123456", "secret-token");
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("UI123456"));
        assert!(!rendered.contains("secret-token"));
    }
}
