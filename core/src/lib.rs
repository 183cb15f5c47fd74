//! Synchronous client core for a token-authenticated object-storage API.
//!
//! # Overview
//! Obtains and caches an auth token, then issues public or authenticated
//! requests against the storage endpoint. Callers get the raw response body,
//! or the decoded header map when the response has no body. Response bodies
//! are never interpreted here.
//!
//! # Design
//! - `StorageClient` is the entry point: `auth`, `make_public_request`,
//!   `make_private_request`, `storage_url`.
//! - Every call returns a `Result`; transport failures, rejected logins and
//!   undecodable headers are distinct `Error` variants. Nothing is retried.
//! - The network sits behind the `Transport` trait. `UreqTransport` is the
//!   production implementation; tests script their own.
//! - `execute_*` variants return the whole `Exchange` (request record,
//!   transfer info, headers, body) for callers that need the status code.

pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod headers;
pub mod http;
pub mod session;
pub mod transport;

pub use client::StorageClient;
pub use config::ClientConfig;
pub use error::{Error, ParseError, Result, TransportError, TransportErrorKind};
pub use executor::{Exchange, Payload, TransferInfo};
pub use headers::{parse_headers, HeaderMap, HeaderValue, LinkHeader};
pub use http::{HttpMethod, HttpRequest, RawResponse, Transport};
pub use session::Session;
pub use transport::UreqTransport;
