//! Client configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::client::Client;
use crate::error::Result;

/// Configuration for a [`Client`].
///
/// Can be deserialized from application settings; durations are given in
/// milliseconds:
///
/// ```
/// use axis_net::ClientConfig;
///
/// let config: ClientConfig = serde_json::from_str(
///     r#"{ "base_url": "https://api.example.com", "timeout": 5000 }"#,
/// ).unwrap();
/// assert_eq!(config.timeout, Some(std::time::Duration::from_secs(5)));
/// ```
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL joined in front of relative request URLs.
    pub base_url: Option<String>,
    /// Request timeout applied when a request sets none.
    #[serde(deserialize_with = "millis")]
    pub timeout: Option<Duration>,
    /// Connect timeout.
    #[serde(deserialize_with = "millis")]
    pub connect_timeout: Option<Duration>,
    /// Default headers sent with every request.
    pub headers: BTreeMap<String, String>,
    /// User agent string.
    pub user_agent: Option<String>,
    /// Proxy URL.
    pub proxy: Option<String>,
    /// Whether to follow redirects.
    pub follow_redirects: bool,
    /// Maximum number of redirects to follow.
    pub max_redirects: usize,
    /// Whether to enable cookie storage.
    pub cookies_enabled: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: None,
            connect_timeout: Some(Duration::from_secs(10)),
            headers: BTreeMap::new(),
            user_agent: Some(format!("axis/{} (Rust)", env!("CARGO_PKG_VERSION"))),
            proxy: None,
            follow_redirects: true,
            max_redirects: 10,
            cookies_enabled: true,
        }
    }
}

fn millis<'de, D>(deserializer: D) -> std::result::Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
}

/// Builder for creating a [`Client`] with custom configuration.
#[derive(Default)]
pub struct ClientBuilder {
    config: ClientConfig,
}

impl ClientBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = Some(base_url.into());
        self
    }

    /// Set the default request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = Some(timeout);
        self
    }

    /// Add a default header that will be sent with every request.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.headers.insert(name.into(), value.into());
        self
    }

    /// Set the user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(user_agent.into());
        self
    }

    /// Set a proxy URL.
    pub fn proxy(mut self, proxy_url: impl Into<String>) -> Self {
        self.config.proxy = Some(proxy_url.into());
        self
    }

    /// Disable redirect following.
    pub fn no_redirects(mut self) -> Self {
        self.config.follow_redirects = false;
        self
    }

    /// Set the maximum number of redirects to follow.
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.config.max_redirects = max;
        self
    }

    /// Disable cookie storage.
    pub fn no_cookies(mut self) -> Self {
        self.config.cookies_enabled = false;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<Client> {
        Client::new(self.config)
    }
}
