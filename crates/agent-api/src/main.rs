//! Agent dev server: threads, runs and state over HTTP.

use agent_api::{bootstrap, server};
use std::net::SocketAddr;

#[tokio::main]
async fn main() -> Result<(), bootstrap::BoxError> {
    dotenvy::dotenv().ok();
    bootstrap::init_tracing();

    let state = bootstrap::app_state_from_env()?;
    let app = server::router(state);
    let addr: SocketAddr = std::env::var("AGENT_LISTEN")
        .unwrap_or_else(|_| "127.0.0.1:2024".to_string())
        .parse()?;
    tracing::info!("agent server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(addr).await?,
        app.into_make_service(),
    )
    .await?;
    Ok(())
}
