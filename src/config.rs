//! Client configuration.
//!
//! The endpoint URL is parsed once, at construction. An endpoint without a
//! host or path can never authenticate (both feed the signature payload), so
//! it is rejected here instead of surfacing later on the socket.

use std::time::Duration;

use url::Url;

use crate::error::ClientError;

/// API credentials for the signed authentication handshake.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
}

impl Credentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }
}

/// Immutable per-client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Display name used as a log prefix.
    pub name: String,
    /// Full endpoint URL, e.g. `wss://api-aws.huobi.pro/ws/v2`.
    pub endpoint_url: String,
    /// Host component, including an explicit port when the URL carries one.
    /// Signed into every auth request.
    pub host: String,
    /// Path component, signed into every auth request.
    pub path: String,
    pub credentials: Credentials,
}

impl ClientConfig {
    /// Parse and validate the endpoint URL. Fails with
    /// [`ClientError::Config`] when the URL does not yield a non-empty host
    /// and path.
    pub fn new(
        name: impl Into<String>,
        endpoint_url: impl Into<String>,
        credentials: Credentials,
    ) -> Result<Self, ClientError> {
        let endpoint_url = endpoint_url.into();
        let parsed = Url::parse(&endpoint_url)
            .map_err(|e| ClientError::Config(format!("invalid endpoint url: {}", e)))?;

        let host = match (parsed.host_str(), parsed.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(ClientError::Config("endpoint url has no host".to_string()));
            }
        };

        // For ws(s) URLs the parser never yields an empty path (a bare host
        // becomes "/"), but the signature payload depends on it, so check.
        let path = parsed.path().to_string();
        if path.is_empty() {
            return Err(ClientError::Config("endpoint url has no path".to_string()));
        }

        Ok(Self {
            name: name.into(),
            endpoint_url,
            host,
            path,
            credentials,
        })
    }
}

/// Retry policy for the reconnect loop.
///
/// The default keeps the inherited behavior: reconnect immediately, forever.
/// The knobs exist so callers (and tests) can bound the loop or back off a
/// struggling endpoint.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Maximum consecutive reconnect attempts before the client gives up
    /// and stops. `None` means unlimited.
    pub max_attempts: Option<u32>,
    /// Delay between reconnect attempts.
    pub delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: None,
            delay: Duration::ZERO,
        }
    }
}

impl ReconnectPolicy {
    /// True when `attempt` (1-based count of consecutive failures) exceeds
    /// the configured ceiling.
    pub fn exhausted(&self, attempt: u32) -> bool {
        match self.max_attempts {
            Some(max) => attempt > max,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> Credentials {
        Credentials::new("ak", "sk")
    }

    #[test]
    fn test_parses_host_and_path() {
        let config = ClientConfig::new("test", "wss://api-aws.huobi.pro/ws/v2", creds()).unwrap();
        assert_eq!(config.host, "api-aws.huobi.pro");
        assert_eq!(config.path, "/ws/v2");
    }

    #[test]
    fn test_explicit_port_is_part_of_host() {
        let config = ClientConfig::new("test", "wss://localhost:9443/ws/v2", creds()).unwrap();
        assert_eq!(config.host, "localhost:9443");
    }

    #[test]
    fn test_rejects_unparseable_url() {
        let err = ClientConfig::new("test", "not a url", creds()).unwrap_err();
        assert!(matches!(err, ClientError::Config(_)));
    }

    #[test]
    fn test_bare_host_gets_root_path() {
        let config = ClientConfig::new("test", "wss://api-aws.huobi.pro", creds()).unwrap();
        assert_eq!(config.path, "/");
    }

    #[test]
    fn test_default_policy_never_exhausts() {
        let policy = ReconnectPolicy::default();
        assert!(!policy.exhausted(1_000_000));
        assert_eq!(policy.delay, Duration::ZERO);
    }

    #[test]
    fn test_bounded_policy_exhausts() {
        let policy = ReconnectPolicy {
            max_attempts: Some(3),
            delay: Duration::ZERO,
        };
        assert!(!policy.exhausted(3));
        assert!(policy.exhausted(4));
    }
}
