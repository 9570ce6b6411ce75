//! Demo server: OIDC sign-in with refreshing cookie sessions and one
//! protected API call.

use oidc_session::middleware::{AuthConfig, router};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = AuthConfig::from_env()?;
    let listen_addr = std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

    let endpoints = config.provider().discover(&reqwest::Client::new()).await?;
    let app = router(config, endpoints)?;

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    tracing::info!("Listening on {listen_addr}");

    axum::serve(listener, app).await?;
    Ok(())
}
