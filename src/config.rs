//! RPC client configuration.
//!
//! The signing secret, default timeout, default role, and metric path
//! exclusions are supplied by the embedding service's bootstrap; this
//! module only defines the configuration surface.

use std::time::Duration;

use reqwest::{Client, ClientBuilder};
use secrecy::SecretString;

/// Default per-call timeout.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(1);

/// Default role asserted by minted tokens when the caller sets none.
pub const DEFAULT_ROLE: &str = "SYSTEM";

/// Transport-level HTTP client settings.
///
/// Per-call timeouts live on the request, not here; this covers connection
/// establishment and pooling only.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Connection timeout (default: 10s)
    pub connect_timeout: Duration,
    /// Pool idle timeout (default: 90s)
    pub pool_idle_timeout: Duration,
    /// Maximum idle connections per host (default: 10)
    pub pool_max_idle_per_host: usize,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 10,
            user_agent: "rpc-common/0.1".to_string(),
        }
    }
}

impl HttpConfig {
    /// Set a custom connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set a custom user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set custom connection pool settings.
    #[must_use]
    pub const fn with_pool_config(mut self, idle_timeout: Duration, max_idle: usize) -> Self {
        self.pool_idle_timeout = idle_timeout;
        self.pool_max_idle_per_host = max_idle;
        self
    }

    /// Build a pooled reqwest client from these settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built (e.g., TLS
    /// initialization fails).
    pub fn build_client(&self) -> Result<Client, reqwest::Error> {
        ClientBuilder::new()
            .connect_timeout(self.connect_timeout)
            .pool_idle_timeout(self.pool_idle_timeout)
            .pool_max_idle_per_host(self.pool_max_idle_per_host)
            .user_agent(&self.user_agent)
            .use_rustls_tls()
            .build()
    }
}

/// Configuration for the RPC dispatcher.
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// Shared secret used to sign outbound identity tokens.
    pub secret: SecretString,
    /// Timeout applied to calls that set none (default: 1s).
    pub default_timeout: Duration,
    /// Role asserted when the caller sets none (default: `SYSTEM`).
    pub default_role: String,
    /// Endpoint paths excluded from metrics recording. Takes effect when
    /// the recorder is built with [`crate::metrics::RpcMetrics::from_config`].
    pub metric_exclusions: Vec<String>,
    /// Transport settings.
    pub http: HttpConfig,
}

impl RpcConfig {
    /// Create a config with the given signing secret and defaults for
    /// everything else.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: SecretString::from(secret.into()),
            default_timeout: DEFAULT_RPC_TIMEOUT,
            default_role: DEFAULT_ROLE.to_string(),
            metric_exclusions: Vec::new(),
            http: HttpConfig::default(),
        }
    }

    /// Set the default per-call timeout.
    #[must_use]
    pub const fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Set the default role for minted tokens.
    #[must_use]
    pub fn with_default_role(mut self, role: impl Into<String>) -> Self {
        self.default_role = role.into();
        self
    }

    /// Set the endpoint paths excluded from metrics recording.
    #[must_use]
    pub fn with_metric_exclusions(mut self, paths: impl IntoIterator<Item = String>) -> Self {
        self.metric_exclusions = paths.into_iter().collect();
        self
    }

    /// Set custom transport settings.
    #[must_use]
    pub fn with_http_config(mut self, http: HttpConfig) -> Self {
        self.http = http;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RpcConfig::new("secret");
        assert_eq!(config.default_timeout, Duration::from_secs(1));
        assert_eq!(config.default_role, "SYSTEM");
        assert!(config.metric_exclusions.is_empty());
    }

    #[test]
    fn test_builders() {
        let config = RpcConfig::new("secret")
            .with_default_timeout(Duration::from_secs(5))
            .with_default_role("ADMIN")
            .with_metric_exclusions(vec!["/health".to_string()]);

        assert_eq!(config.default_timeout, Duration::from_secs(5));
        assert_eq!(config.default_role, "ADMIN");
        assert_eq!(config.metric_exclusions, vec!["/health".to_string()]);
    }

    #[test]
    fn test_http_config_defaults() {
        let http = HttpConfig::default();
        assert_eq!(http.connect_timeout, Duration::from_secs(10));
        assert_eq!(http.pool_max_idle_per_host, 10);
    }

    #[test]
    fn test_build_client() {
        let http = HttpConfig::default().with_user_agent("test-agent");
        assert!(http.build_client().is_ok());
    }
}
