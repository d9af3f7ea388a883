//! Error types for the hurl client.
//!
//! # Design
//! The taxonomy is flat. The three transport failures callers most often
//! branch on (timeout, name resolution, connection) get dedicated variants;
//! every other transport failure lands in `TransportError` with a numeric
//! code from [`code`] for diagnostics. A non-2xx HTTP status is never an
//! error: it comes back as an ordinary `HttpResponse`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Numeric transport result codes.
///
/// The numbering follows libcurl's `CURLcode` values so logs and bug reports
/// stay comparable with curl-based tooling.
pub mod code {
    pub const OK: i32 = 0;
    pub const UNSUPPORTED_PROTOCOL: i32 = 1;
    pub const URL_MALFORMAT: i32 = 3;
    pub const COULDNT_RESOLVE_HOST: i32 = 6;
    pub const COULDNT_CONNECT: i32 = 7;
    pub const WEIRD_SERVER_REPLY: i32 = 8;
    pub const WRITE_ERROR: i32 = 23;
    pub const OPERATION_TIMEDOUT: i32 = 28;
    pub const BAD_FUNCTION_ARGUMENT: i32 = 43;
    pub const TOO_MANY_REDIRECTS: i32 = 47;
    pub const SEND_ERROR: i32 = 55;
    pub const RECV_ERROR: i32 = 56;

    /// Human-readable message for a transport code.
    pub fn describe(code: i32) -> &'static str {
        match code {
            OK => "No error",
            UNSUPPORTED_PROTOCOL => "Unsupported protocol",
            URL_MALFORMAT => "URL using bad/illegal format or missing URL",
            COULDNT_RESOLVE_HOST => "Couldn't resolve host name",
            COULDNT_CONNECT => "Couldn't connect to server",
            WEIRD_SERVER_REPLY => "Weird server reply",
            WRITE_ERROR => "Failed writing received data to disk/application",
            OPERATION_TIMEDOUT => "Timeout was reached",
            BAD_FUNCTION_ARGUMENT => "A libcurl function was given a bad argument",
            TOO_MANY_REDIRECTS => "Number of redirects hit maximum amount",
            SEND_ERROR => "Failed sending data to the peer",
            RECV_ERROR => "Failure when receiving data from the peer",
            _ => "Unknown error",
        }
    }
}

/// Errors returned by hurl operations.
#[derive(Debug, Error)]
pub enum HurlError {
    /// The operation exceeded its configured timeout.
    #[error("{}", code::describe(code::OPERATION_TIMEDOUT))]
    Timeout,

    /// The host name could not be resolved.
    #[error("{}", code::describe(code::COULDNT_RESOLVE_HOST))]
    ResolveError,

    /// The TCP or TLS connection could not be established.
    #[error("{}", code::describe(code::COULDNT_CONNECT))]
    ConnectError,

    /// Any other transport failure, carrying its numeric code.
    #[error("{} (code {code})", code::describe(*code))]
    TransportError { code: i32 },

    /// The gzip stream could not be finalized.
    #[error("gzip compression failed: {0}")]
    CompressionError(String),

    /// The gzip stream was truncated or corrupt.
    #[error("gzip decompression failed: {0}")]
    DecompressionError(String),

    /// The download destination could not be opened for writing.
    #[error("could not open {}: {source}", path.display())]
    FileError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A downloaded archive could not be extracted.
    #[error("extraction failed: {0}")]
    ExtractError(String),
}

impl HurlError {
    pub(crate) fn transport(code: i32) -> Self {
        HurlError::TransportError { code }
    }

    /// The transport code behind this error, if it is a transport failure.
    pub fn code(&self) -> Option<i32> {
        match self {
            HurlError::Timeout => Some(code::OPERATION_TIMEDOUT),
            HurlError::ResolveError => Some(code::COULDNT_RESOLVE_HOST),
            HurlError::ConnectError => Some(code::COULDNT_CONNECT),
            HurlError::TransportError { code } => Some(*code),
            _ => None,
        }
    }
}
