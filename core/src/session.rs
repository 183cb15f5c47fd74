//! Authentication state and the login handshake.
//!
//! # Design
//! A `Session` is the token plus the storage URL requests go to. The token
//! starts empty, is replaced only by a successful login, and is never expired
//! by the client itself. A failed login leaves the session untouched.

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::executor::execute;
use crate::http::{HttpMethod, Transport};

/// User login, sent with the auth request.
pub const HEADER_AUTH_USER: &str = "X-Auth-User";

/// User secret, sent with the auth request.
pub const HEADER_AUTH_KEY: &str = "X-Auth-Key";

/// Session token: returned by auth, sent with every private request.
pub const HEADER_TOKEN: &str = "X-Auth-Token";

/// Storage URL advertised by the auth response.
pub const HEADER_STORAGE_URL: &str = "X-Storage-Url";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
    storage_url: String,
}

impl Session {
    pub fn new(storage_url: &str) -> Self {
        Self {
            token: String::new(),
            storage_url: storage_url.to_string(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn storage_url(&self) -> &str {
        &self.storage_url
    }

    pub fn has_token(&self) -> bool {
        !self.token.is_empty()
    }

    /// Run the auth handshake and, if it yields a token, store it.
    ///
    /// With `adopt_storage_url` set, an `X-Storage-Url` in the same response
    /// replaces the configured storage URL.
    pub fn login<T: Transport + ?Sized>(
        &mut self,
        transport: &T,
        config: &ClientConfig,
    ) -> Result<String> {
        let exchange = execute(
            transport,
            HttpMethod::Get,
            &config.api_url,
            &[],
            vec![
                (HEADER_AUTH_USER.to_string(), config.auth_user.clone()),
                (HEADER_AUTH_KEY.to_string(), config.auth_key.clone()),
            ],
            config.timeout,
        )?;

        let token = match exchange.headers.get_str(HEADER_TOKEN) {
            Some(token) if !token.is_empty() => token.to_string(),
            _ => {
                log::warn!(
                    "auth as {} rejected: HTTP {} without {HEADER_TOKEN}",
                    config.auth_user,
                    exchange.info.status
                );
                return Err(Error::Authentication {
                    header: HEADER_TOKEN,
                    status: exchange.info.status,
                });
            }
        };

        if config.adopt_storage_url {
            let advertised = exchange
                .headers
                .get_str(HEADER_STORAGE_URL)
                .filter(|url| !url.is_empty());
            if let Some(url) = advertised {
                if url != self.storage_url {
                    log::info!("storage url changed to {url}");
                }
                self.storage_url = url.to_string();
            }
        }

        log::info!("authenticated as {}", config.auth_user);
        self.token = token.clone();
        Ok(token)
    }
}
