//! Single GET, POST and download operations against a transport handle.
//!
//! # Design
//! Each operation resets the handle, configures it for one request, runs the
//! transfer and assembles an `HttpResponse`. The configured handle is held
//! through a [`Transfer`] guard whose drop clears the pending header list,
//! so no outbound header outlives its request, on success or failure.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::ops::{Deref, DerefMut};
use std::path::Path;

use crate::codec;
use crate::error::{code, HurlError};
use crate::headers;
use crate::http::HttpResponse;
use crate::transport::TransportHandle;

/// Request bodies larger than this are gzip-compressed before sending.
pub const COMPRESSION_THRESHOLD: usize = 10_240;

/// A handle configured for exactly one request.
struct Transfer<'h> {
    handle: &'h mut TransportHandle,
}

impl Deref for Transfer<'_> {
    type Target = TransportHandle;

    fn deref(&self) -> &TransportHandle {
        self.handle
    }
}

impl DerefMut for Transfer<'_> {
    fn deref_mut(&mut self) -> &mut TransportHandle {
        self.handle
    }
}

impl Drop for Transfer<'_> {
    fn drop(&mut self) {
        self.handle.clear_headers();
    }
}

impl Transfer<'_> {
    /// Run the transfer, collecting header lines into a map.
    fn run(&mut self, sink: &mut dyn Write) -> Result<(u16, HashMap<String, String>), HurlError> {
        let mut received = HashMap::new();
        self.perform(sink, &mut |line| headers::record_header_line(&mut received, line))?;
        let status = self.response_code()?;
        Ok((status, received))
    }
}

fn prepare<'h>(
    handle: &'h mut TransportHandle,
    url: &str,
    timeout: u64,
    accept_compression: bool,
) -> Result<Transfer<'h>, HurlError> {
    let mut transfer = Transfer { handle };
    transfer.reset();
    transfer.set_url(url)?;
    transfer.set_timeout(timeout);
    transfer.enable_cookie_engine();
    if accept_compression {
        transfer.add_header("Accept-Encoding: gzip");
    }
    Ok(transfer)
}

/// GET `url`, inflating a gzip body.
pub fn get(handle: &mut TransportHandle, url: &str, timeout: u64) -> Result<HttpResponse, HurlError> {
    let mut transfer = prepare(handle, url, timeout, true)?;
    let mut body = Vec::new();
    let (status, headers) = transfer.run(&mut body)?;
    let body = headers::decode_body(&headers, body)?;
    Ok(HttpResponse { status, body, headers })
}

/// POST `data` to `url` as-is. Bodies over [`COMPRESSION_THRESHOLD`] bytes
/// are sent gzip-compressed with `Content-Encoding: gzip`.
pub fn post(handle: &mut TransportHandle, url: &str, data: &[u8], timeout: u64) -> Result<HttpResponse, HurlError> {
    let mut transfer = prepare(handle, url, timeout, true)?;

    let compressed = data.len() > COMPRESSION_THRESHOLD;
    let payload = if compressed {
        let gz = codec::gzip(data)?;
        tracing::debug!(original = data.len(), compressed = gz.len(), "compressed request body");
        gz
    } else {
        data.to_vec()
    };
    transfer.set_post_fields(payload);
    // Never wait for a 100-continue.
    transfer.add_header("Expect:");
    if compressed {
        transfer.add_header("Content-Encoding: gzip");
    }

    let mut body = Vec::new();
    let (status, headers) = transfer.run(&mut body)?;
    let body = headers::decode_body(&headers, body)?;
    Ok(HttpResponse { status, body, headers })
}

/// GET `url` straight into the file at `local_path`.
///
/// The file is created or truncated before the request is sent, so it is
/// left empty or partially written when the transfer fails or the server
/// answers with an error status. No compression is negotiated and the body
/// is stored exactly as received; the returned response has an empty body.
pub fn download(
    handle: &mut TransportHandle,
    url: &str,
    local_path: &Path,
    timeout: u64,
) -> Result<HttpResponse, HurlError> {
    let file = File::create(local_path).map_err(|source| HurlError::FileError {
        path: local_path.to_path_buf(),
        source,
    })?;
    let mut sink = BufWriter::new(file);

    let mut transfer = prepare(handle, url, timeout, false)?;
    let (status, headers) = transfer.run(&mut sink)?;
    sink.flush().map_err(|e| {
        tracing::debug!(path = %local_path.display(), error = %e, "flushing download failed");
        HurlError::transport(code::WRITE_ERROR)
    })?;

    Ok(HttpResponse {
        status,
        body: Vec::new(),
        headers,
    })
}
