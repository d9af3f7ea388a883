//! The transport handle: one reusable HTTP session context.
//!
//! # Design
//! A `TransportHandle` owns a `ureq::Agent` (connection pool), the typed
//! options of the next transfer, the pending outbound header lines, and the
//! cookie jar. `reset` returns options and headers to their defaults but
//! keeps the agent and the jar, so a handle reused across requests keeps
//! live connections and cookies and nothing else.
//!
//! The write sink and the header callback are per-transfer state borrowed
//! from the caller, so they are arguments of [`TransportHandle::perform`]
//! rather than stored options.
//!
//! A handle is single-owner: every mutating operation takes `&mut self`.
//! Dropping the handle releases the agent, the header list and the jar on
//! every path, including unwinding out of a failed transfer.

use std::fmt;
use std::io::{self, ErrorKind, Read, Write};
use std::net::ToSocketAddrs;
use std::time::Duration;

use ureq::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use ureq::http::{HeaderName, HeaderValue, Method, Request, Uri};
use ureq::Agent;

use crate::cookie::CookieJar;
use crate::error::{code, HurlError};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const COPY_CHUNK: usize = 16 * 1024;

/// Typed options of the next transfer. `reset` restores `Default`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferOptions {
    pub url: Option<Uri>,
    /// `None` waits forever.
    pub timeout: Option<Duration>,
    /// When set, the transfer is a POST with this body.
    pub post_fields: Option<Vec<u8>>,
    pub cookie_engine: bool,
}

struct CachedAgent {
    timeout: Option<Duration>,
    agent: Agent,
}

/// A reusable HTTP transfer context.
pub struct TransportHandle {
    agent: Option<CachedAgent>,
    options: TransferOptions,
    headers: Vec<String>,
    cookies: CookieJar,
    response_code: Option<u16>,
}

impl Default for TransportHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TransportHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportHandle")
            .field("options", &self.options)
            .field("headers", &self.headers)
            .field("cookies", &self.cookies.len())
            .field("response_code", &self.response_code)
            .finish_non_exhaustive()
    }
}

impl TransportHandle {
    pub fn new() -> Self {
        Self {
            agent: None,
            options: TransferOptions::default(),
            headers: Vec::new(),
            cookies: CookieJar::new(),
            response_code: None,
        }
    }

    /// Queue a raw outbound header line such as `"Accept-Encoding: gzip"`.
    ///
    /// `"Name:"` with nothing after the colon suppresses that header;
    /// `"Name;"` sends it with an empty value.
    pub fn add_header(&mut self, line: impl Into<String>) {
        self.headers.push(line.into());
    }

    pub fn clear_headers(&mut self) {
        self.headers.clear();
    }

    pub fn pending_headers(&self) -> &[String] {
        &self.headers
    }

    /// Clear pending headers and restore every option to its default.
    ///
    /// Cookies and pooled connections survive.
    pub fn reset(&mut self) {
        self.clear_headers();
        self.options = TransferOptions::default();
        self.response_code = None;
    }

    pub fn options(&self) -> &TransferOptions {
        &self.options
    }

    pub fn set_url(&mut self, url: &str) -> Result<(), HurlError> {
        let uri = url.parse::<Uri>().map_err(|e| {
            tracing::debug!(url = %url, error = %e, "rejected malformed URL");
            HurlError::transport(code::URL_MALFORMAT)
        })?;
        self.options.url = Some(uri);
        Ok(())
    }

    /// Whole-transfer timeout in seconds; 0 disables it.
    pub fn set_timeout(&mut self, seconds: u64) {
        self.options.timeout = (seconds > 0).then(|| Duration::from_secs(seconds));
    }

    pub fn set_post_fields(&mut self, body: Vec<u8>) {
        self.options.post_fields = Some(body);
    }

    /// Send stored cookies and record `Set-Cookie` headers on transfers.
    pub fn enable_cookie_engine(&mut self) {
        self.options.cookie_engine = true;
    }

    /// Feed one cookie-list line to the jar. See [`CookieJar::apply_list_command`].
    pub fn set_cookie_list(&mut self, line: &str) {
        self.cookies.apply_list_command(line);
    }

    /// Status code of the last transfer since the most recent reset.
    pub fn response_code(&self) -> Result<u16, HurlError> {
        self.response_code
            .ok_or(HurlError::transport(code::BAD_FUNCTION_ARGUMENT))
    }

    /// Every stored cookie as a Netscape cookie-file line.
    pub fn cookie_list(&self) -> Vec<String> {
        self.cookies.to_lines()
    }

    /// Run the configured transfer, blocking until it completes.
    ///
    /// Header lines (status line first, blank terminator last) reach
    /// `on_header` before the first body byte is written to `sink`.
    pub fn perform(&mut self, sink: &mut dyn Write, on_header: &mut dyn FnMut(&str)) -> Result<(), HurlError> {
        let uri = self
            .options
            .url
            .clone()
            .ok_or(HurlError::transport(code::URL_MALFORMAT))?;
        let secure = check_scheme(&uri)?;
        let host = lookup_host(&uri)?;

        let method = if self.options.post_fields.is_some() {
            Method::POST
        } else {
            Method::GET
        };
        let mut builder = Request::builder().method(method.clone()).uri(uri.clone());
        let mut has_content_type = false;
        for line in &self.headers {
            match outbound_header(line)? {
                Outbound::Add(name, value) => {
                    has_content_type |= name == CONTENT_TYPE;
                    builder = builder.header(name, value);
                }
                Outbound::Suppress(name) => {
                    has_content_type |= name == CONTENT_TYPE;
                    tracing::trace!(header = %name, "suppressed header");
                }
            }
        }
        if method == Method::POST && !has_content_type {
            builder = builder.header(CONTENT_TYPE, FORM_CONTENT_TYPE);
        }
        if self.options.cookie_engine {
            if let Some(cookies) = self.cookies.header_for(&host, uri.path(), secure) {
                builder = builder.header(COOKIE, cookies);
            }
        }

        let agent = self.agent();
        tracing::debug!(method = %method, url = %uri, "performing transfer");
        let result = match self.options.post_fields.as_deref() {
            Some(fields) => agent.run(builder.body(fields).map_err(bad_request)?),
            None => agent.run(builder.body(()).map_err(bad_request)?),
        };
        let mut response = result.map_err(classify)?;

        let status = response.status();
        self.response_code = Some(status.as_u16());
        on_header(&format!(
            "{:?} {} {}\r\n",
            response.version(),
            status.as_u16(),
            status.canonical_reason().unwrap_or("")
        ));
        for (name, value) in response.headers() {
            on_header(&format!("{}: {}\r\n", name, String::from_utf8_lossy(value.as_bytes())));
        }
        on_header("\r\n");

        if self.options.cookie_engine {
            for value in response.headers().get_all(SET_COOKIE) {
                match value.to_str() {
                    Ok(value) => self.cookies.store_set_cookie(value, &host, uri.path()),
                    Err(_) => tracing::debug!("ignored non-ASCII Set-Cookie"),
                }
            }
        }

        let written = copy_body(response.body_mut().as_reader(), sink)?;
        tracing::debug!(url = %uri, status = status.as_u16(), bytes = written, "transfer complete");
        Ok(())
    }

    /// The pooled agent for the current timeout, rebuilt only when it changes.
    fn agent(&mut self) -> Agent {
        let timeout = self.options.timeout;
        match &self.agent {
            Some(cached) if cached.timeout == timeout => cached.agent.clone(),
            _ => {
                let agent = Agent::config_builder()
                    .http_status_as_error(false)
                    .max_redirects(0)
                    .timeout_global(timeout)
                    .build()
                    .new_agent();
                self.agent = Some(CachedAgent {
                    timeout,
                    agent: agent.clone(),
                });
                agent
            }
        }
    }
}

#[derive(Debug)]
enum Outbound {
    Add(HeaderName, HeaderValue),
    Suppress(HeaderName),
}

fn outbound_header(line: &str) -> Result<Outbound, HurlError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let (name, value, suppress) = match line.split_once(':') {
        Some((name, value)) => {
            let value = value.trim();
            (name, value, value.is_empty())
        }
        None => match line.strip_suffix(';') {
            Some(name) => (name, "", false),
            None => {
                tracing::debug!(line = %line, "header line has no ':'");
                return Err(HurlError::transport(code::BAD_FUNCTION_ARGUMENT));
            }
        },
    };

    let name = HeaderName::from_bytes(name.trim().as_bytes())
        .map_err(|_| HurlError::transport(code::BAD_FUNCTION_ARGUMENT))?;
    if suppress {
        return Ok(Outbound::Suppress(name));
    }
    let value = HeaderValue::from_str(value).map_err(|_| HurlError::transport(code::BAD_FUNCTION_ARGUMENT))?;
    Ok(Outbound::Add(name, value))
}

fn bad_request(err: ureq::http::Error) -> HurlError {
    tracing::debug!(error = %err, "could not build request");
    HurlError::transport(code::BAD_FUNCTION_ARGUMENT)
}

/// Returns whether the scheme is `https`.
fn check_scheme(uri: &Uri) -> Result<bool, HurlError> {
    match uri.scheme_str() {
        Some(s) if s.eq_ignore_ascii_case("https") => Ok(true),
        Some(s) if s.eq_ignore_ascii_case("http") => Ok(false),
        Some(_) => Err(HurlError::transport(code::UNSUPPORTED_PROTOCOL)),
        None => Err(HurlError::transport(code::URL_MALFORMAT)),
    }
}

/// Resolve the URL's host before connecting, so a lookup failure always
/// surfaces as `ResolveError`. Returns the lower-cased host name.
fn lookup_host(uri: &Uri) -> Result<String, HurlError> {
    let host = uri
        .host()
        .filter(|h| !h.is_empty())
        .ok_or(HurlError::transport(code::URL_MALFORMAT))?;
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    let port = uri.port_u16().unwrap_or(match uri.scheme_str() {
        Some(s) if s.eq_ignore_ascii_case("https") => 443,
        _ => 80,
    });

    match (bare, port).to_socket_addrs() {
        Ok(mut addrs) => match addrs.next() {
            Some(_) => Ok(bare.to_ascii_lowercase()),
            None => {
                tracing::debug!(host = %bare, "name lookup returned no addresses");
                Err(HurlError::ResolveError)
            }
        },
        Err(e) => {
            tracing::debug!(host = %bare, error = %e, "name lookup failed");
            Err(HurlError::ResolveError)
        }
    }
}

fn classify(err: ureq::Error) -> HurlError {
    match err {
        ureq::Error::Timeout(_) => HurlError::Timeout,
        ureq::Error::HostNotFound => HurlError::ResolveError,
        ureq::Error::ConnectionFailed => HurlError::ConnectError,
        ureq::Error::Io(e) => classify_io(&e, code::RECV_ERROR),
        ureq::Error::BadUri(_) => HurlError::transport(code::URL_MALFORMAT),
        ureq::Error::TooManyRedirects => HurlError::transport(code::TOO_MANY_REDIRECTS),
        ureq::Error::Protocol(_) => HurlError::transport(code::WEIRD_SERVER_REPLY),
        other => {
            tracing::debug!(error = %other, "transfer failed");
            HurlError::transport(code::RECV_ERROR)
        }
    }
}

fn classify_io(err: &io::Error, fallback: i32) -> HurlError {
    match err.kind() {
        ErrorKind::TimedOut | ErrorKind::WouldBlock => HurlError::Timeout,
        ErrorKind::ConnectionRefused => HurlError::ConnectError,
        _ => {
            tracing::debug!(error = %err, code = fallback, "transfer I/O failed");
            HurlError::transport(fallback)
        }
    }
}

fn copy_body(mut reader: impl Read, sink: &mut dyn Write) -> Result<u64, HurlError> {
    let mut buf = vec![0u8; COPY_CHUNK];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(classify_io(&e, code::RECV_ERROR)),
        };
        sink.write_all(&buf[..n]).map_err(|e| {
            tracing::debug!(error = %e, "sink rejected body data");
            HurlError::transport(code::WRITE_ERROR)
        })?;
        total += n as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_is_idempotent() {
        let mut handle = TransportHandle::new();
        handle.set_url("http://example.com/").unwrap();
        handle.set_timeout(5);
        handle.set_post_fields(b"x".to_vec());
        handle.enable_cookie_engine();
        handle.add_header("Accept-Encoding: gzip");

        handle.reset();
        let once = handle.options().clone();
        assert!(handle.pending_headers().is_empty());

        handle.reset();
        assert_eq!(handle.options(), &once);
        assert_eq!(handle.options(), &TransferOptions::default());
        assert!(handle.pending_headers().is_empty());
    }

    #[test]
    fn reset_keeps_cookies() {
        let mut handle = TransportHandle::new();
        handle.set_cookie_list("example.com\tFALSE\t/\tFALSE\t0\ta\t1");
        handle.reset();
        assert_eq!(handle.cookie_list().len(), 1);
    }

    #[test]
    fn headers_accumulate_until_cleared() {
        let mut handle = TransportHandle::new();
        handle.add_header("A: 1");
        handle.add_header("B: 2");
        assert_eq!(handle.pending_headers(), ["A: 1", "B: 2"]);
        handle.clear_headers();
        handle.clear_headers();
        assert!(handle.pending_headers().is_empty());
    }

    #[test]
    fn zero_timeout_means_none() {
        let mut handle = TransportHandle::new();
        handle.set_timeout(0);
        assert_eq!(handle.options().timeout, None);
        handle.set_timeout(3);
        assert_eq!(handle.options().timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn response_code_requires_a_transfer() {
        let handle = TransportHandle::new();
        let err = handle.response_code().unwrap_err();
        assert_eq!(err.code(), Some(code::BAD_FUNCTION_ARGUMENT));
    }

    #[test]
    fn malformed_url_is_rejected() {
        let mut handle = TransportHandle::new();
        let err = handle.set_url("http://exa mple.com/").unwrap_err();
        assert!(matches!(err, HurlError::TransportError { code: code::URL_MALFORMAT }));
    }

    #[test]
    fn perform_without_url_fails() {
        let mut handle = TransportHandle::new();
        let err = handle.perform(&mut Vec::new(), &mut |_| {}).unwrap_err();
        assert!(matches!(err, HurlError::TransportError { code: code::URL_MALFORMAT }));
    }

    #[test]
    fn unsupported_scheme_fails_before_lookup() {
        let mut handle = TransportHandle::new();
        handle.set_url("ftp://example.com/file").unwrap();
        let err = handle.perform(&mut Vec::new(), &mut |_| {}).unwrap_err();
        assert!(matches!(err, HurlError::TransportError { code: code::UNSUPPORTED_PROTOCOL }));
    }

    #[test]
    fn unresolvable_host_is_resolve_error() {
        let mut handle = TransportHandle::new();
        handle.set_url("http://no-such-host.invalid/").unwrap();
        let err = handle.perform(&mut Vec::new(), &mut |_| {}).unwrap_err();
        assert!(matches!(err, HurlError::ResolveError));
    }

    #[test]
    fn literal_address_resolves() {
        let uri: Uri = "http://127.0.0.1:9/".parse().unwrap();
        assert_eq!(lookup_host(&uri).unwrap(), "127.0.0.1");
        let uri: Uri = "http://no-such-host.invalid/".parse().unwrap();
        assert!(matches!(lookup_host(&uri), Err(HurlError::ResolveError)));
    }

    #[test]
    fn outbound_header_forms() {
        match outbound_header("Accept-Encoding: gzip").unwrap() {
            Outbound::Add(name, value) => {
                assert_eq!(name, "accept-encoding");
                assert_eq!(value, "gzip");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(outbound_header("Expect:").unwrap(), Outbound::Suppress(n) if n == "expect"));
        match outbound_header("X-Empty;").unwrap() {
            Outbound::Add(name, value) => {
                assert_eq!(name, "x-empty");
                assert!(value.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(outbound_header("no separator").is_err());
        assert!(outbound_header("Bad Name: x").is_err());
    }

    #[test]
    fn io_errors_map_to_taxonomy() {
        let timed_out = io::Error::new(ErrorKind::TimedOut, "slow");
        assert!(matches!(classify_io(&timed_out, code::RECV_ERROR), HurlError::Timeout));
        let refused = io::Error::new(ErrorKind::ConnectionRefused, "no");
        assert!(matches!(classify_io(&refused, code::RECV_ERROR), HurlError::ConnectError));
        let reset = io::Error::new(ErrorKind::ConnectionReset, "reset");
        assert!(matches!(
            classify_io(&reset, code::RECV_ERROR),
            HurlError::TransportError { code: code::RECV_ERROR }
        ));
    }

    #[test]
    fn ureq_errors_map_to_taxonomy() {
        assert!(matches!(classify(ureq::Error::HostNotFound), HurlError::ResolveError));
        assert!(matches!(classify(ureq::Error::ConnectionFailed), HurlError::ConnectError));
        assert!(matches!(
            classify(ureq::Error::TooManyRedirects),
            HurlError::TransportError { code: code::TOO_MANY_REDIRECTS }
        ));
    }

    #[test]
    fn copy_body_reports_sink_failure() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(ErrorKind::Other, "disk full"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }
        let err = copy_body(&b"data"[..], &mut Broken).unwrap_err();
        assert!(matches!(err, HurlError::TransportError { code: code::WRITE_ERROR }));

        let mut sink = Vec::new();
        assert_eq!(copy_body(&b"data"[..], &mut sink).unwrap(), 4);
        assert_eq!(sink, b"data");
    }
}
