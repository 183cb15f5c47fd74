//! Error types for the storage client core.
//!
//! # Design
//! Every call returns its outcome directly; nothing is parked in a
//! "last error" field on the client. Transport failures get their own
//! variant so callers can tell "the server answered with nothing" apart from
//! "the server was never reached". None of these are retried internally.

use std::fmt;

use thiserror::Error;

/// Errors returned by `StorageClient` and the transaction executor.
#[derive(Debug, Error)]
pub enum Error {
    /// The HTTP transaction failed below the protocol level.
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    /// The auth handshake completed but the response carried no token.
    #[error("authentication failed: HTTP {status} response carried no {header} header")]
    Authentication { header: &'static str, status: u16 },

    /// The response header block could not be decoded.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The client configuration is unusable.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A method name outside the lowercase `get`/`post`/`put`/`patch`/`delete` set.
    #[error("unsupported HTTP method {0:?}")]
    UnsupportedMethod(String),
}

/// Coarse classification of a transport failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// The request did not complete within the configured timeout.
    Timeout,
    /// The host name could not be resolved.
    Dns,
    /// The TCP or TLS connection could not be established.
    Connect,
    /// The request itself could not be built (bad URL, bad header).
    InvalidRequest,
    /// Anything else: I/O errors mid-transfer, protocol violations.
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportErrorKind::Timeout => "timeout",
            TransportErrorKind::Dns => "dns",
            TransportErrorKind::Connect => "connect",
            TransportErrorKind::InvalidRequest => "invalid request",
            TransportErrorKind::Other => "other",
        };
        f.write_str(name)
    }
}

/// A failed HTTP transaction, as reported by a `Transport`.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Errors from decoding a raw header block.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A header line had no `": "` separator.
    #[error("malformed header line {line:?}")]
    MalformedLine { line: String },
}

pub type Result<T> = std::result::Result<T, Error>;
