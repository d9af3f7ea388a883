//! gzip framing for request and response bodies.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::HurlError;

/// Initial output buffer for inflation; doubled whenever it fills up.
const INITIAL_INFLATE_BUFFER: usize = 10 * 1024;

/// Compress `data` into a single gzip member.
///
/// The output is deterministic: the header carries no timestamp or file name.
pub fn gzip(data: &[u8]) -> Result<Vec<u8>, HurlError> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2 + 64), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| HurlError::CompressionError(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| HurlError::CompressionError(e.to_string()))
}

/// Inflate a gzip stream.
///
/// Fails unless the stream reaches its logical end (trailer included).
pub fn gunzip(data: &[u8]) -> Result<Vec<u8>, HurlError> {
    if data.is_empty() {
        return Err(HurlError::DecompressionError("empty input".to_string()));
    }

    let mut decoder = GzDecoder::new(data);
    let mut out = vec![0u8; INITIAL_INFLATE_BUFFER];
    let mut filled = 0;
    loop {
        if filled == out.len() {
            out.resize(out.len() * 2, 0);
        }
        match decoder.read(&mut out[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) => return Err(HurlError::DecompressionError(e.to_string())),
        }
    }
    out.truncate(filled);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_small_and_large() {
        let small = b"hello, hurl".to_vec();
        assert_eq!(gunzip(&gzip(&small).unwrap()).unwrap(), small);

        // Forces several doublings of the inflate buffer.
        let large: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        assert_eq!(gunzip(&gzip(&large).unwrap()).unwrap(), large);
    }

    #[test]
    fn roundtrip_empty_input() {
        let compressed = gzip(&[]).unwrap();
        assert!(!compressed.is_empty());
        assert!(gunzip(&compressed).unwrap().is_empty());
    }

    #[test]
    fn output_is_gzip_framed_and_deterministic() {
        let data = vec![b'a'; 4096];
        let first = gzip(&data).unwrap();
        let second = gzip(&data).unwrap();
        assert_eq!(&first[..2], &[0x1f, 0x8b]);
        assert_eq!(first, second);
        assert!(first.len() < data.len());
    }

    #[test]
    fn truncated_stream_is_rejected() {
        let data: Vec<u8> = (0..50_000u32).map(|i| (i * 7 % 256) as u8).collect();
        let compressed = gzip(&data).unwrap();
        let truncated = &compressed[..compressed.len() / 2];
        let err = gunzip(truncated).unwrap_err();
        assert!(matches!(err, HurlError::DecompressionError(_)));
    }

    #[test]
    fn garbage_is_rejected() {
        let err = gunzip(b"definitely not gzip").unwrap_err();
        assert!(matches!(err, HurlError::DecompressionError(_)));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(gunzip(&[]), Err(HurlError::DecompressionError(_))));
    }
}
