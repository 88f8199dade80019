use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::ClientError;
use crate::sync::ReconcileStrategy;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:3000";
pub const DEFAULT_DATABASE_URL: &str = "sqlite::memory:";
pub const DEFAULT_MOCK_ADDR: &str = "127.0.0.1:3000";

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_url: String,
    pub reconcile: ReconcileStrategy,
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            reconcile: ReconcileStrategy::default(),
            timeout: None,
        }
    }
}

impl ClientConfig {
    pub fn new_from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup. `new_from_env` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("TODO_API_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let reconcile = match lookup("TODO_RECONCILE") {
            Some(value) => value.parse()?,
            None => ReconcileStrategy::default(),
        };

        let timeout = match lookup("TODO_HTTP_TIMEOUT_SECS") {
            Some(value) => {
                let secs = value.trim().parse::<u64>().map_err(|_| {
                    ClientError::Config(format!("TODO_HTTP_TIMEOUT_SECS is not a number: {}", value))
                })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            reconcile,
            timeout,
        })
    }
}

#[derive(Clone, Debug)]
pub struct MockServerConfig {
    pub database_url: String,
    pub addr: SocketAddr,
}

impl MockServerConfig {
    pub fn new_from_env() -> Result<Self, ClientError> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());
        let addr = env::var("MOCK_ADDR")
            .unwrap_or_else(|_| DEFAULT_MOCK_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ClientError::Config(format!("MOCK_ADDR is invalid: {}", e)))?;

        Ok(Self { database_url, addr })
    }
}
