//! One HTTP transaction, normalised.
//!
//! `execute` builds the request (query string for `get`), runs it through a
//! `Transport`, splits the raw response at the reported header size and
//! decodes the header block. The result is an `Exchange` describing both
//! sides of the transaction, or an error.

use std::time::Duration;

use crate::error::{Error, Result};
use crate::headers::{parse_headers, HeaderMap};
use crate::http::{append_query, HttpMethod, HttpRequest, Transport};

/// What a `make_*_request` call hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// The response had a body; here it is, undecoded.
    Body(Vec<u8>),
    /// The response had no body; the decoded headers instead.
    Headers(HeaderMap),
}

impl Payload {
    pub fn body(&self) -> Option<&[u8]> {
        match self {
            Payload::Body(body) => Some(body.as_slice()),
            Payload::Headers(_) => None,
        }
    }

    pub fn headers(&self) -> Option<&HeaderMap> {
        match self {
            Payload::Body(_) => None,
            Payload::Headers(headers) => Some(headers),
        }
    }
}

/// Transport-level metadata for a completed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferInfo {
    pub status: u16,
    pub url: String,
    pub header_size: usize,
    pub total_time: Duration,
}

/// Both sides of one completed HTTP transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub request: HttpRequest,
    pub info: TransferInfo,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Exchange {
    /// The body if there is one, otherwise the headers.
    pub fn into_payload(self) -> Payload {
        if self.body.is_empty() {
            Payload::Headers(self.headers)
        } else {
            Payload::Body(self.body)
        }
    }
}

/// Perform one transaction against `url`.
///
/// `args` only reach the wire for `get`, as a query string. For every other
/// method they are dropped: this engine does not build request bodies.
pub fn execute<T: Transport + ?Sized>(
    transport: &T,
    method: HttpMethod,
    url: &str,
    args: &[(&str, &str)],
    headers: Vec<(String, String)>,
    timeout: Duration,
) -> Result<Exchange> {
    let url = match method {
        HttpMethod::Get => append_query(url, args),
        _ => {
            if !args.is_empty() {
                log::debug!("ignoring {} argument(s) for {method} request", args.len());
            }
            url.to_string()
        }
    };

    let request = HttpRequest {
        method,
        url,
        headers,
        body: None,
        timeout,
    };
    log::debug!(
        "{} {} headers=[{}]",
        request.method.wire_name(),
        request.url,
        request
            .headers
            .iter()
            .map(|(name, _)| name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let response = transport.execute(&request).map_err(|err| {
        log::warn!("{} {} failed: {err}", request.method.wire_name(), request.url);
        Error::from(err)
    })?;

    let split = response.header_size.min(response.raw.len());
    let (head, body) = response.raw.split_at(split);
    let headers = parse_headers(&String::from_utf8_lossy(head))?;

    log::debug!(
        "{} {} -> {} ({} header(s), {} body byte(s), {:?})",
        request.method.wire_name(),
        request.url,
        response.status,
        headers.len(),
        body.len(),
        response.elapsed
    );

    Ok(Exchange {
        info: TransferInfo {
            status: response.status,
            url: response.effective_url,
            header_size: response.header_size,
            total_time: response.elapsed,
        },
        headers,
        body: body.to_vec(),
        request,
    })
}
