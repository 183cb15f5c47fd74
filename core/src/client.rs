//! Public and private request dispatch against the storage endpoint.
//!
//! # Design
//! `StorageClient` owns the configuration, a `Transport`, and the `Session`.
//! Public requests go straight to the storage URL. Private requests make sure
//! a valid token is cached first, logging in if needed, then send it as
//! `X-Auth-Token` after the caller's headers.
//!
//! The session lives behind a mutex and a login runs while holding it, so
//! concurrent private calls on a fresh client share one handshake. The lock
//! is released before the target request goes out.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::config::ClientConfig;
use crate::error::Result;
use crate::executor::{execute, Exchange, Payload};
use crate::http::{HttpMethod, Transport};
use crate::session::{Session, HEADER_TOKEN};
use crate::transport::UreqTransport;

type TokenCheck = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Synchronous client for a token-authenticated storage API.
pub struct StorageClient<T: Transport = UreqTransport> {
    config: ClientConfig,
    transport: T,
    session: Mutex<Session>,
    token_check: TokenCheck,
}

impl StorageClient<UreqTransport> {
    /// Validate `config` and build a client on a `ureq` agent.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = UreqTransport::new(&config);
        Ok(Self::assemble(config, transport))
    }
}

impl<T: Transport> StorageClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(config, transport))
    }

    /// `config` must already be validated.
    fn assemble(config: ClientConfig, transport: T) -> Self {
        let session = Session::new(&config.storage_url);
        Self {
            config,
            transport,
            session: Mutex::new(session),
            token_check: Box::new(|token: &str| !token.is_empty()),
        }
    }

    /// Replace the test private requests use to decide whether the cached
    /// token can be sent as is. The default accepts any non-empty token.
    pub fn with_token_check<F>(mut self, check: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.token_check = Box::new(check);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Log in unconditionally and return the new token.
    pub fn auth(&self) -> Result<String> {
        self.session().login(&self.transport, &self.config)
    }

    pub fn has_token(&self) -> bool {
        self.session().has_token()
    }

    pub fn is_token_valid(&self) -> bool {
        let session = self.session();
        (self.token_check)(session.token())
    }

    pub fn storage_url(&self) -> String {
        self.session().storage_url().to_string()
    }

    /// Snapshot of the current session.
    pub fn current_session(&self) -> Session {
        self.session().clone()
    }

    pub fn execute_public(&self, method: HttpMethod, args: &[(&str, &str)]) -> Result<Exchange> {
        let url = self.storage_url();
        execute(&self.transport, method, &url, args, Vec::new(), self.config.timeout)
    }

    /// Like `execute_public`, against `<storage_url>/<path>`.
    pub fn execute_public_at(
        &self,
        path: &str,
        method: HttpMethod,
        args: &[(&str, &str)],
    ) -> Result<Exchange> {
        let url = join_url(&self.storage_url(), path);
        execute(&self.transport, method, &url, args, Vec::new(), self.config.timeout)
    }

    pub fn execute_private(
        &self,
        method: HttpMethod,
        args: &[(&str, &str)],
        extra_headers: &[(&str, &str)],
    ) -> Result<Exchange> {
        let (token, url) = self.ensure_token()?;
        self.send_private(&url, method, args, extra_headers, token)
    }

    /// Like `execute_private`, against `<storage_url>/<path>`.
    pub fn execute_private_at(
        &self,
        path: &str,
        method: HttpMethod,
        args: &[(&str, &str)],
        extra_headers: &[(&str, &str)],
    ) -> Result<Exchange> {
        let (token, url) = self.ensure_token()?;
        self.send_private(&join_url(&url, path), method, args, extra_headers, token)
    }

    /// Unauthenticated request to the storage URL: the body if the response
    /// has one, otherwise its headers.
    pub fn make_public_request(&self, method: HttpMethod, args: &[(&str, &str)]) -> Result<Payload> {
        self.execute_public(method, args).map(Exchange::into_payload)
    }

    pub fn make_public_request_at(
        &self,
        path: &str,
        method: HttpMethod,
        args: &[(&str, &str)],
    ) -> Result<Payload> {
        self.execute_public_at(path, method, args)
            .map(Exchange::into_payload)
    }

    /// Authenticated request to the storage URL, logging in first when no
    /// valid token is cached.
    pub fn make_private_request(
        &self,
        method: HttpMethod,
        args: &[(&str, &str)],
        extra_headers: &[(&str, &str)],
    ) -> Result<Payload> {
        self.execute_private(method, args, extra_headers)
            .map(Exchange::into_payload)
    }

    pub fn make_private_request_at(
        &self,
        path: &str,
        method: HttpMethod,
        args: &[(&str, &str)],
        extra_headers: &[(&str, &str)],
    ) -> Result<Payload> {
        self.execute_private_at(path, method, args, extra_headers)
            .map(Exchange::into_payload)
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Token and storage URL to use for a private request.
    fn ensure_token(&self) -> Result<(String, String)> {
        let mut session = self.session();
        if !(self.token_check)(session.token()) {
            session.login(&self.transport, &self.config)?;
        }
        Ok((session.token().to_string(), session.storage_url().to_string()))
    }

    fn send_private(
        &self,
        url: &str,
        method: HttpMethod,
        args: &[(&str, &str)],
        extra_headers: &[(&str, &str)],
        token: String,
    ) -> Result<Exchange> {
        let mut headers: Vec<(String, String)> = extra_headers
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        headers.push((HEADER_TOKEN.to_string(), token));
        execute(&self.transport, method, url, args, headers, self.config.timeout)
    }
}

fn join_url(base: &str, path: &str) -> String {
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return base.to_string();
    }
    format!("{}/{path}", base.trim_end_matches('/'))
}
