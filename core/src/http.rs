//! HTTP transport types and the `Transport` seam.
//!
//! # Design
//! Requests and raw responses are plain data. The engine builds an
//! `HttpRequest`, hands it to a `Transport`, and gets back the raw response
//! bytes (header block followed by body) plus the header size the transport
//! measured. Everything after that point (splitting, header decoding, choosing
//! body or headers) happens in the core, so any transport that can produce
//! those bytes plugs in, including scripted ones in tests.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, TransportError};

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Lowercase verb, as accepted by `FromStr`.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Patch => "patch",
            HttpMethod::Delete => "delete",
        }
    }

    /// Uppercase verb, as written on the request line.
    pub fn wire_name(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses the lowercase verbs only; `"GET"` is rejected.
impl FromStr for HttpMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "get" => Ok(HttpMethod::Get),
            "post" => Ok(HttpMethod::Post),
            "put" => Ok(HttpMethod::Put),
            "patch" => Ok(HttpMethod::Patch),
            "delete" => Ok(HttpMethod::Delete),
            other => Err(Error::UnsupportedMethod(other.to_string())),
        }
    }
}

/// An HTTP request described as plain data.
///
/// Also serves as the diagnostic record of what was sent: `url` includes the
/// query string and `body` is always `None` because this engine never builds
/// request bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub timeout: Duration,
}

impl HttpRequest {
    /// Outbound headers rendered as `Name: value` lines.
    pub fn header_block(&self) -> String {
        self.headers
            .iter()
            .map(|(name, value)| format!("{name}: {value}\r\n"))
            .collect()
    }
}

/// The raw outcome of one HTTP transaction.
///
/// `raw` holds the header block (status line first, CRLF-separated, blank line
/// terminated) immediately followed by the body. `header_size` is the length
/// of the header block in bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub effective_url: String,
    pub raw: Vec<u8>,
    pub header_size: usize,
    pub elapsed: Duration,
}

/// Executes HTTP transactions on behalf of the engine.
///
/// Implementations report transport-level failures (no response at all) as
/// `TransportError`. Any response the server actually sent, whatever its
/// status, is returned as `Ok`.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<RawResponse, TransportError>;
}

/// Append `args` to `url` as a form-encoded query string.
///
/// Empty `args` leave `url` untouched. If `url` already carries a query the
/// new pairs are joined with `&`.
pub fn append_query(url: &str, args: &[(&str, &str)]) -> String {
    if args.is_empty() {
        return url.to_string();
    }
    let query = args
        .iter()
        .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&");
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{query}")
}
