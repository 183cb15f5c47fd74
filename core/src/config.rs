//! Client configuration.
//!
//! # Design
//! `ClientConfig` is plain serde data so callers can keep it in whatever file
//! format they already use; reading that file is their job. The client calls
//! `validate` once at construction and refuses to start on bad input.
//!
//! On the wire the timeout is whole seconds under `timeout_secs`.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identifier sent as `User-Agent` unless overridden.
pub const DEFAULT_USER_AGENT: &str = concat!("storage-core/", env!("CARGO_PKG_VERSION"));

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub auth_user: String,
    pub auth_key: String,
    /// Auth endpoint, e.g. `https://auth.selcdn.ru/`.
    pub api_url: String,
    /// Storage endpoint every data request targets.
    pub storage_url: String,
    #[serde(rename = "timeout_secs", with = "duration_secs", default = "default_timeout")]
    pub timeout: Duration,
    /// Carried for higher layers; the core never reads it.
    #[serde(default)]
    pub return_view: bool,
    /// Verify the server's TLS certificate. Off unless set.
    #[serde(default)]
    pub verify_tls: bool,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Replace `storage_url` with the `X-Storage-Url` the auth response
    /// advertises, when it advertises one.
    #[serde(default)]
    pub adopt_storage_url: bool,
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl ClientConfig {
    /// Configuration with the four required fields and defaults elsewhere.
    pub fn new(auth_user: &str, auth_key: &str, api_url: &str, storage_url: &str) -> Self {
        Self {
            auth_user: auth_user.to_string(),
            auth_key: auth_key.to_string(),
            api_url: api_url.to_string(),
            storage_url: storage_url.to_string(),
            timeout: DEFAULT_TIMEOUT,
            return_view: false,
            verify_tls: false,
            user_agent: default_user_agent(),
            adopt_storage_url: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_verify_tls(mut self, verify_tls: bool) -> Self {
        self.verify_tls = verify_tls;
        self
    }

    /// Reject configuration the client cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.auth_user.is_empty() {
            return Err(Error::Configuration("auth_user is empty".to_string()));
        }
        if self.auth_key.is_empty() {
            return Err(Error::Configuration("auth_key is empty".to_string()));
        }
        check_endpoint("api_url", &self.api_url)?;
        check_endpoint("storage_url", &self.storage_url)?;
        if self.timeout.is_zero() {
            return Err(Error::Configuration("timeout must be non-zero".to_string()));
        }
        if self.user_agent.is_empty() {
            return Err(Error::Configuration("user_agent is empty".to_string()));
        }
        Ok(())
    }
}

fn check_endpoint(field: &str, url: &str) -> Result<()> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match rest {
        Some(host) if !host.is_empty() && !host.starts_with('/') => Ok(()),
        _ => Err(Error::Configuration(format!(
            "{field} must be an http:// or https:// URL, got {url:?}"
        ))),
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("auth_user", &self.auth_user)
            .field("auth_key", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("storage_url", &self.storage_url)
            .field("timeout", &self.timeout)
            .field("return_view", &self.return_view)
            .field("verify_tls", &self.verify_tls)
            .field("user_agent", &self.user_agent)
            .field("adopt_storage_url", &self.adopt_storage_url)
            .finish()
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
