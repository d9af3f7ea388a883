use std::{collections::BTreeMap, collections::HashMap, io::Read, io::Write, time::Duration};

use axum::{
    body::Bytes,
    extract::{Path, RawQuery},
    http::{header, HeaderMap, Method, StatusCode},
    response::IntoResponse,
    routing::{any, get, post},
    Form, Json, Router,
};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

/// Cookie handed out by `/set-cookie`.
pub const SESSION_COOKIE: &str = "session=abc123";

/// Plain-text body served gzip-compressed by `/gzip`.
pub const GZIP_TEXT: &str = "Hello from the gzip endpoint! This body travels compressed.";

/// Where `/redirect` points. Following it would store [`SESSION_COOKIE`].
pub const REDIRECT_TARGET: &str = "/set-cookie";

/// How long `/slow` sleeps before answering.
pub const SLOW_DELAY: Duration = Duration::from_secs(3);

/// What `/echo` saw of the request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub query: Option<String>,
    /// Lower-cased header names; repeated headers are joined with ", ".
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

/// What `/upload` saw of a possibly compressed request body.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Upload {
    pub content_encoding: Option<String>,
    pub content_type: Option<String>,
    pub received_len: usize,
    pub decoded_len: usize,
    /// The decoded body, lossily converted to text.
    pub body: String,
}

pub fn app() -> Router {
    Router::new()
        .route("/echo", any(echo))
        .route("/gzip", get(gzip_body))
        .route("/deflate", get(deflate_body))
        .route("/status/{code}", get(status))
        .route("/set-cookie", get(set_cookie))
        .route("/check-cookie", get(check_cookie))
        .route("/slow", get(slow))
        .route("/redirect", get(redirect))
        .route("/upload", post(upload))
        .route("/form", post(form))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn echo(method: Method, RawQuery(query): RawQuery, headers: HeaderMap, body: Bytes) -> Json<Echo> {
    let mut seen: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers.iter() {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        seen.entry(name.as_str().to_string())
            .and_modify(|v| {
                v.push_str(", ");
                v.push_str(&value);
            })
            .or_insert(value);
    }
    Json(Echo {
        method: method.to_string(),
        query,
        headers: seen,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    // Writing into a Vec cannot fail.
    let _ = encoder.write_all(data);
    encoder.finish().unwrap_or_default()
}

async fn gzip_body() -> impl IntoResponse {
    (
        [
            (header::CONTENT_ENCODING, "gzip"),
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
        ],
        gzip(GZIP_TEXT.as_bytes()),
    )
}

/// Declares an encoding clients are not expected to decode.
async fn deflate_body() -> impl IntoResponse {
    ([(header::CONTENT_ENCODING, "deflate")], "opaque deflate payload")
}

async fn status(Path(code): Path<u16>) -> Result<(StatusCode, String), StatusCode> {
    let status = StatusCode::from_u16(code).map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok((status, format!("status {code}")))
}

async fn set_cookie() -> impl IntoResponse {
    ([(header::SET_COOKIE, format!("{SESSION_COOKIE}; Path=/"))], "cookie set")
}

async fn check_cookie(headers: HeaderMap) -> String {
    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn redirect() -> impl IntoResponse {
    (StatusCode::FOUND, [(header::LOCATION, REDIRECT_TARGET)], "moved")
}

async fn slow() -> &'static str {
    tokio::time::sleep(SLOW_DELAY).await;
    "finally"
}

async fn upload(headers: HeaderMap, body: Bytes) -> Result<Json<Upload>, StatusCode> {
    let content_encoding = header_text(&headers, header::CONTENT_ENCODING);
    let content_type = header_text(&headers, header::CONTENT_TYPE);

    let decoded = match content_encoding.as_deref() {
        Some("gzip") => {
            let mut out = Vec::new();
            GzDecoder::new(&body[..])
                .read_to_end(&mut out)
                .map_err(|_| StatusCode::BAD_REQUEST)?;
            out
        }
        _ => body.to_vec(),
    };

    Ok(Json(Upload {
        content_encoding,
        content_type,
        received_len: body.len(),
        decoded_len: decoded.len(),
        body: String::from_utf8_lossy(&decoded).into_owned(),
    }))
}

fn header_text(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
}

async fn form(Form(fields): Form<HashMap<String, String>>) -> Json<HashMap<String, String>> {
    Json(fields)
}
