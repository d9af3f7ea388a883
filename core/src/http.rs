//! Plain data types exchanged with callers.
//!
//! # Design
//! `HttpResponse` is created fresh for every request, filled in while that
//! request runs, and handed to the caller once the transfer is complete.
//! `HttpParams` is a `BTreeMap` so query strings and form bodies serialize
//! in lexicographic key order and are byte-for-byte reproducible.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

/// Query or form fields, serialized in key order.
pub type HttpParams = BTreeMap<String, String>;

/// The result of an HTTP request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    /// Final HTTP status code; non-2xx statuses are not errors.
    pub status: u16,
    /// Response body, already decompressed when the server sent gzip.
    pub body: Vec<u8>,
    /// Response headers keyed by lower-cased name. Repeated headers keep the
    /// last value received.
    pub headers: HashMap<String, String>,
}

impl HttpResponse {
    /// Look up a header by name, ignoring ASCII case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The body as text, replacing invalid UTF-8 sequences.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}
