//! Response header collection and content-encoding handling.

use std::collections::HashMap;

use crate::codec;
use crate::error::HurlError;

/// Split a raw header line into a lower-cased name and a trimmed value.
///
/// Lines without a `:` (the status line, the blank terminator) yield `None`.
pub fn parse_header_line(line: &str) -> Option<(String, String)> {
    let (name, value) = line.split_once(':')?;
    Some((name.to_ascii_lowercase(), value.trim().to_string()))
}

/// Record one received header line; a repeated name overwrites the earlier value.
pub fn record_header_line(headers: &mut HashMap<String, String>, line: &str) {
    if let Some((name, value)) = parse_header_line(line) {
        tracing::trace!(header = %name, value = %value, "received header");
        headers.insert(name, value);
    }
}

/// Decode `body` according to the `content-encoding` header.
///
/// Only gzip is understood. Other encodings are passed through untouched.
pub fn decode_body(headers: &HashMap<String, String>, body: Vec<u8>) -> Result<Vec<u8>, HurlError> {
    match headers.get("content-encoding") {
        Some(encoding) if encoding.eq_ignore_ascii_case("gzip") => {
            let decoded = codec::gunzip(&body)?;
            tracing::debug!(
                compressed = body.len(),
                decompressed = decoded.len(),
                "inflated gzip response body"
            );
            Ok(decoded)
        }
        Some(encoding) => {
            tracing::debug!(encoding = %encoding, "unsupported content-encoding, body left as received");
            Ok(body)
        }
        None => Ok(body),
    }
}
