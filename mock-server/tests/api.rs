use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, Echo, Upload, GZIP_TEXT, REDIRECT_TARGET, SESSION_COOKIE};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

// --- echo ---

#[tokio::test]
async fn echo_reports_method_query_and_headers() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/echo?a=1&b=2")
                .header("X-Custom", "yes")
                .body("payload".to_string())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.method, "POST");
    assert_eq!(echo.query.as_deref(), Some("a=1&b=2"));
    assert_eq!(echo.headers["x-custom"], "yes");
    assert_eq!(echo.body, "payload");
}

#[tokio::test]
async fn echo_without_query() {
    let resp = app().oneshot(get("/echo")).await.unwrap();
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.method, "GET");
    assert!(echo.query.is_none());
}

// --- encodings ---

#[tokio::test]
async fn gzip_endpoint_sends_compressed_body() {
    let resp = app().oneshot(get("/gzip")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[http::header::CONTENT_ENCODING], "gzip");

    let bytes = body_bytes(resp).await;
    assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
    let mut text = String::new();
    std::io::Read::read_to_string(&mut flate2::read::GzDecoder::new(&bytes[..]), &mut text).unwrap();
    assert_eq!(text, GZIP_TEXT);
}

#[tokio::test]
async fn deflate_endpoint_declares_deflate() {
    let resp = app().oneshot(get("/deflate")).await.unwrap();
    assert_eq!(resp.headers()[http::header::CONTENT_ENCODING], "deflate");
}

// --- status ---

#[tokio::test]
async fn status_endpoint_returns_requested_code() {
    let resp = app().oneshot(get("/status/418")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(&body_bytes(resp).await[..], b"status 418");
}

#[tokio::test]
async fn status_endpoint_rejects_invalid_code() {
    let resp = app().oneshot(get("/status/42")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- cookies ---

#[tokio::test]
async fn set_cookie_sends_session_cookie() {
    let resp = app().oneshot(get("/set-cookie")).await.unwrap();
    let cookie = resp.headers()[http::header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with(SESSION_COOKIE));
}

#[tokio::test]
async fn check_cookie_echoes_cookie_header() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/check-cookie")
                .header(http::header::COOKIE, "a=1; b=2")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(&body_bytes(resp).await[..], b"a=1; b=2");
}

#[tokio::test]
async fn check_cookie_is_empty_without_cookies() {
    let resp = app().oneshot(get("/check-cookie")).await.unwrap();
    assert!(body_bytes(resp).await.is_empty());
}

// --- redirect ---

#[tokio::test]
async fn redirect_points_at_target() {
    let resp = app().oneshot(get("/redirect")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(resp.headers()[http::header::LOCATION].to_str().unwrap(), REDIRECT_TARGET);
    assert!(resp.headers().get(http::header::SET_COOKIE).is_none());
}

// --- upload ---

#[tokio::test]
async fn upload_inflates_gzip_bodies() {
    let original = "z".repeat(20_000);
    let compressed = mock_server::gzip(original.as_bytes());
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/upload")
                .header(http::header::CONTENT_ENCODING, "gzip")
                .body(axum::body::Body::from(compressed.clone()))
                .unwrap(),
        )
        .await
        .unwrap();

    let upload: Upload = body_json(resp).await;
    assert_eq!(upload.content_encoding.as_deref(), Some("gzip"));
    assert_eq!(upload.received_len, compressed.len());
    assert_eq!(upload.decoded_len, original.len());
}

#[tokio::test]
async fn upload_rejects_corrupt_gzip() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/upload")
                .header(http::header::CONTENT_ENCODING, "gzip")
                .body("not gzip".to_string())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- form ---

#[tokio::test]
async fn form_decodes_urlencoded_fields() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/form")
                .header(http::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body("name=J%20Doe&x=1".to_string())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let fields: std::collections::HashMap<String, String> = body_json(resp).await;
    assert_eq!(fields["name"], "J Doe");
    assert_eq!(fields["x"], "1");
}
