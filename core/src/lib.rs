//! Synchronous HTTP client with transparent gzip and cookie-keeping sessions.
//!
//! # Overview
//! Every operation blocks the calling thread until the transfer completes,
//! fails, or times out. There is no internal concurrency and no retrying:
//! errors reach the caller unchanged, and a non-2xx status is an ordinary
//! response rather than an error.
//!
//! # Design
//! - `TransportHandle` owns one transfer context (connection pool, options,
//!   pending headers, cookie jar) and maps transport failures onto
//!   `HurlError`.
//! - `request` runs one GET/POST/download on a handle: gzip request bodies
//!   above 10 KiB, gzip-inflated responses, downloads streamed to disk.
//! - `Client` reuses one handle for a whole session, so cookies persist
//!   between its requests; the free functions use a fresh handle per call.
//! - No process-wide initialization is required before the first request.

pub mod client;
pub mod codec;
pub mod config;
pub mod cookie;
pub mod error;
pub mod extract;
pub mod headers;
pub mod http;
pub mod params;
pub mod request;
pub mod transport;

pub use client::{download, download_tarball, get, get_with_params, post, post_form, Client};
pub use config::ClientConfig;
pub use error::HurlError;
pub use extract::TarballExtractor;
pub use http::{HttpParams, HttpResponse};
pub use transport::TransportHandle;
