//! `Transport` backed by a blocking `ureq` agent.
//!
//! The agent never follows redirects and hands every status back as data, so
//! the engine sees exactly what the storage endpoint answered. `ureq` stores
//! header names lowercased; they are rendered back in `Title-Case` so that
//! lookups such as `Link` or `X-Auth-Token` work the way they do against the
//! raw wire bytes.

use std::io::ErrorKind;
use std::time::Instant;

use ureq::tls::TlsConfig;
use ureq::{Agent, RequestBuilder};

use crate::config::ClientConfig;
use crate::error::{TransportError, TransportErrorKind};
use crate::http::{HttpMethod, HttpRequest, RawResponse, Transport};

#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    pub fn new(config: &ClientConfig) -> Self {
        if !config.verify_tls {
            log::warn!("TLS certificate verification is disabled");
        }

        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(0)
            .timeout_global(Some(config.timeout))
            .user_agent(config.user_agent.as_str())
            .tls_config(
                TlsConfig::builder()
                    .disable_verification(!config.verify_tls)
                    .build(),
            )
            .build()
            .new_agent();

        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<RawResponse, TransportError> {
        let started = Instant::now();
        let url = request.url.as_str();

        let result = match request.method {
            HttpMethod::Get => prepare(self.agent.get(url), request).call(),
            HttpMethod::Delete => prepare(self.agent.delete(url), request).call(),
            HttpMethod::Post => prepare(self.agent.post(url), request).send_empty(),
            HttpMethod::Put => prepare(self.agent.put(url), request).send_empty(),
            HttpMethod::Patch => prepare(self.agent.patch(url), request).send_empty(),
        };
        let mut response = result.map_err(transport_error)?;

        let status = response.status();
        let mut head = format!(
            "{:?} {} {}\r\n",
            response.version(),
            status.as_u16(),
            status.canonical_reason().unwrap_or_default()
        );
        for (name, value) in response.headers() {
            head.push_str(&title_case(name.as_str()));
            head.push_str(": ");
            head.push_str(&String::from_utf8_lossy(value.as_bytes()));
            head.push_str("\r\n");
        }
        head.push_str("\r\n");

        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()
            .map_err(transport_error)?;

        let header_size = head.len();
        let mut raw = head.into_bytes();
        raw.extend_from_slice(&body);

        Ok(RawResponse {
            status: status.as_u16(),
            effective_url: request.url.clone(),
            raw,
            header_size,
            elapsed: started.elapsed(),
        })
    }
}

fn prepare<B>(mut builder: RequestBuilder<B>, request: &HttpRequest) -> RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder.config().timeout_global(Some(request.timeout)).build()
}

fn transport_error(err: ureq::Error) -> TransportError {
    let kind = match &err {
        ureq::Error::Timeout(_) => TransportErrorKind::Timeout,
        ureq::Error::HostNotFound => TransportErrorKind::Dns,
        ureq::Error::ConnectionFailed => TransportErrorKind::Connect,
        ureq::Error::Io(io) if io.kind() == ErrorKind::ConnectionRefused => {
            TransportErrorKind::Connect
        }
        ureq::Error::Io(io) if io.kind() == ErrorKind::TimedOut => TransportErrorKind::Timeout,
        ureq::Error::BadUri(_) | ureq::Error::Http(_) => TransportErrorKind::InvalidRequest,
        _ => TransportErrorKind::Other,
    };
    TransportError::new(kind, err.to_string())
}

/// `x-auth-token` -> `X-Auth-Token`.
fn title_case(name: &str) -> String {
    name.split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_names_are_title_cased() {
        assert_eq!(title_case("x-auth-token"), "X-Auth-Token");
        assert_eq!(title_case("link"), "Link");
        assert_eq!(title_case("content-length"), "Content-Length");
        assert_eq!(title_case("x-storage-url"), "X-Storage-Url");
    }

    #[test]
    fn irregular_names_lose_their_casing() {
        assert_eq!(title_case("etag"), "Etag");
        assert_eq!(title_case("www-authenticate"), "Www-Authenticate");
    }

    #[test]
    fn agent_builds_with_either_tls_setting() {
        for verify_tls in [false, true] {
            let config = ClientConfig::new("u", "k", "http://127.0.0.1:1/", "http://127.0.0.1:1/")
                .with_verify_tls(verify_tls);
            let transport = UreqTransport::new(&config);
            let request = HttpRequest {
                method: HttpMethod::Get,
                url: "not a url".to_string(),
                headers: Vec::new(),
                body: None,
                timeout: config.timeout,
            };
            let err = transport.execute(&request).unwrap_err();
            assert_eq!(err.kind, TransportErrorKind::InvalidRequest, "verify_tls={verify_tls}");
        }
    }

    #[test]
    fn malformed_url_is_reported_as_transport_error() {
        let config = ClientConfig::new("u", "k", "http://127.0.0.1:1/", "http://127.0.0.1:1/");
        let transport = UreqTransport::new(&config);
        let request = HttpRequest {
            method: HttpMethod::Get,
            url: "not a url".to_string(),
            headers: Vec::new(),
            body: None,
            timeout: config.timeout,
        };
        assert!(transport.execute(&request).is_err());
    }
}
