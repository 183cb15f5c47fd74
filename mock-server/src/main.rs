use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    env_logger::init();
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    log::info!(
        "listening on {addr} (user {}, key {})",
        mock_server::DEFAULT_USER,
        mock_server::DEFAULT_KEY
    );
    mock_server::run(listener).await
}
