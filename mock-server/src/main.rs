use tokio::net::TcpListener;

const ENDPOINTS: &[&str] = &[
    "ANY  /echo",
    "GET  /gzip",
    "GET  /deflate",
    "GET  /status/{code}",
    "GET  /set-cookie",
    "GET  /check-cookie",
    "GET  /slow",
    "GET  /redirect",
    "POST /upload",
    "POST /form",
];

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    println!("hurl mock server on http://{addr}");
    for endpoint in ENDPOINTS {
        println!("  {endpoint}");
    }
    mock_server::run(listener).await
}
