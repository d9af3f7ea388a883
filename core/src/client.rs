//! Client sessions and one-shot request functions.
//!
//! # Design
//! `Client` owns a single `TransportHandle` and runs every request on it,
//! one at a time. Because the handle's cookie jar survives between
//! requests, cookies set by one response are sent with the next request
//! on the same client. The free functions build a fresh handle per call
//! and therefore never carry cookies from one call to the next.
//!
//! The effective URL of a client request is `base_url + path`, joined as
//! plain strings: no slash is added or removed.

use std::path::Path;

use crate::config::ClientConfig;
use crate::error::HurlError;
use crate::extract::TarballExtractor;
use crate::http::{HttpParams, HttpResponse};
use crate::params;
use crate::request;
use crate::transport::TransportHandle;

/// A session against one service.
///
/// Requests take `&mut self`: a client is never used by two callers at
/// once. Use one client per thread, or wrap it in a lock.
#[derive(Debug)]
pub struct Client {
    handle: TransportHandle,
    base_url: String,
    timeout: u64,
}

impl Client {
    /// `timeout_secs` applies to every request; 0 waits forever.
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            handle: TransportHandle::new(),
            base_url: base_url.into(),
            timeout: timeout_secs,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.base_url.clone(), config.timeout_secs)
    }

    pub fn base(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> u64 {
        self.timeout
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub fn get(&mut self, path: &str) -> Result<HttpResponse, HurlError> {
        let url = self.url(path);
        request::get(&mut self.handle, &url, self.timeout)
    }

    /// GET with `params` as the query string. `path` must not contain one.
    pub fn get_with_params(&mut self, path: &str, params: &HttpParams) -> Result<HttpResponse, HurlError> {
        let url = params::query_url(&self.url(path), params);
        request::get(&mut self.handle, &url, self.timeout)
    }

    /// POST raw `data`, unmodified apart from gzip above the size threshold.
    pub fn post(&mut self, path: &str, data: impl AsRef<[u8]>) -> Result<HttpResponse, HurlError> {
        let url = self.url(path);
        request::post(&mut self.handle, &url, data.as_ref(), self.timeout)
    }

    /// POST `params` as a URL-encoded form body.
    pub fn post_form(&mut self, path: &str, params: &HttpParams) -> Result<HttpResponse, HurlError> {
        let url = self.url(path);
        let body = params::serialize(params);
        request::post(&mut self.handle, &url, body.as_bytes(), self.timeout)
    }

    /// Download into `local_path`, truncating it first.
    pub fn download(&mut self, path: &str, local_path: impl AsRef<Path>) -> Result<HttpResponse, HurlError> {
        let url = self.url(path);
        request::download(&mut self.handle, &url, local_path.as_ref(), self.timeout)
    }

    /// Download a tarball and, if the server answered 200, extract it into
    /// `extract_dir`.
    pub fn download_tarball(
        &mut self,
        path: &str,
        local_path: impl AsRef<Path>,
        extract_dir: impl AsRef<Path>,
        extractor: &dyn TarballExtractor,
    ) -> Result<HttpResponse, HurlError> {
        let response = self.download(path, local_path.as_ref())?;
        extract_if_ok(response, local_path.as_ref(), extract_dir.as_ref(), extractor)
    }

    /// The session's cookies as Netscape cookie-file lines, one per line.
    pub fn cookie(&self) -> String {
        self.handle.cookie_list().join("\n")
    }

    /// Replace the session's cookies with the lines of `data`.
    ///
    /// Accepts the output of [`Client::cookie`] as well as `Set-Cookie:`
    /// lines. Empty lines are skipped and malformed ones ignored.
    pub fn set_cookie(&mut self, data: &str) {
        self.handle.set_cookie_list("ALL");
        self.handle.enable_cookie_engine();
        for line in data.lines().filter(|line| !line.trim().is_empty()) {
            self.handle.set_cookie_list(line);
        }
    }
}

fn extract_if_ok(
    response: HttpResponse,
    archive: &Path,
    extract_dir: &Path,
    extractor: &dyn TarballExtractor,
) -> Result<HttpResponse, HurlError> {
    if response.status == 200 {
        extractor.extract_tarball(archive, extract_dir)?;
    } else {
        tracing::debug!(status = response.status, "download not OK, skipping extraction");
    }
    Ok(response)
}

// ---------------------------------------------------------------------------
// One-shot requests
// ---------------------------------------------------------------------------

pub fn get(url: &str, timeout_secs: u64) -> Result<HttpResponse, HurlError> {
    request::get(&mut TransportHandle::new(), url, timeout_secs)
}

/// GET with `params` as the query string. `url` must not contain one.
pub fn get_with_params(url: &str, params: &HttpParams, timeout_secs: u64) -> Result<HttpResponse, HurlError> {
    request::get(&mut TransportHandle::new(), &params::query_url(url, params), timeout_secs)
}

pub fn post(url: &str, data: impl AsRef<[u8]>, timeout_secs: u64) -> Result<HttpResponse, HurlError> {
    request::post(&mut TransportHandle::new(), url, data.as_ref(), timeout_secs)
}

pub fn post_form(url: &str, params: &HttpParams, timeout_secs: u64) -> Result<HttpResponse, HurlError> {
    let body = params::serialize(params);
    request::post(&mut TransportHandle::new(), url, body.as_bytes(), timeout_secs)
}

pub fn download(url: &str, local_path: impl AsRef<Path>, timeout_secs: u64) -> Result<HttpResponse, HurlError> {
    request::download(&mut TransportHandle::new(), url, local_path.as_ref(), timeout_secs)
}

pub fn download_tarball(
    url: &str,
    local_path: impl AsRef<Path>,
    extract_dir: impl AsRef<Path>,
    extractor: &dyn TarballExtractor,
    timeout_secs: u64,
) -> Result<HttpResponse, HurlError> {
    let response = download(url, local_path.as_ref(), timeout_secs)?;
    extract_if_ok(response, local_path.as_ref(), extract_dir.as_ref(), extractor)
}
