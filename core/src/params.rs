//! URL-encoding of query strings and form bodies.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::http::HttpParams;

/// Everything except RFC 3986 unreserved characters is escaped; a space
/// becomes `%20`, never `+`.
const ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Serialize `params` as `key=value` pairs joined by `&`, in key order.
pub fn serialize(params: &HttpParams) -> String {
    params
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                utf8_percent_encode(key, ESCAPE),
                utf8_percent_encode(value, ESCAPE)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Append `params` to `url` as a query string.
///
/// `url` must not already carry a query component; it is not inspected.
pub fn query_url(url: &str, params: &HttpParams) -> String {
    format!("{url}?{}", serialize(params))
}
