//! The `roomcast` server binary.

use clap::Parser;
use roomcast::{RoomcastError, RoomcastServer, ServerConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), RoomcastError> {
    let config = ServerConfig::parse();

    let filter = EnvFilter::try_new(&config.log).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let server = RoomcastServer::builder()
        .bind(&config.bind_addr())
        .room_config(config.room_config())
        .build()
        .await?;

    tracing::info!(
        addr = %server.local_addr()?,
        peer_queue = config.peer_queue,
        "listening"
    );

    server.run_until(shutdown_signal()).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "no ctrl-c handler, running until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
