//! `RoomcastServer` builder and serve loop.
//!
//! One listener carries both surfaces: the `/api/...` control plane and
//! the `/<uid>` peer upgrades.

use std::future::Future;
use std::net::SocketAddr;

use axum::Router;
use axum::routing::{get, post};
use roomcast_room::{RoomConfig, RoomRegistry};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::router::{self, UpgradeRouter};
use crate::{RoomcastError, control};

/// Shared state handed to every request handler.
///
/// Cloning is cheap: the registry is reference-counted.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) registry: RoomRegistry,
    pub(crate) router: UpgradeRouter,
}

/// Builds the full HTTP application around `registry`.
pub fn app(registry: RoomRegistry) -> Router {
    let state = AppState {
        router: UpgradeRouter::new(registry.clone()),
        registry,
    };

    Router::new()
        .route(
            "/api/room",
            post(control::create_room).get(control::list_rooms),
        )
        .route(
            "/api/room/data/:uid",
            get(control::get_data).post(control::update_data),
        )
        .route("/api/room/close/:uid", post(control::close_room))
        .route("/api/health", get(control::health))
        .route("/:uid", get(router::upgrade))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Builder for configuring and starting a roomcast server.
///
/// # Example
///
/// ```rust,no_run
/// use roomcast::prelude::*;
///
/// # async fn example() -> Result<(), RoomcastError> {
/// let server = RoomcastServer::builder()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct RoomcastServerBuilder {
    bind_addr: String,
    room_config: RoomConfig,
}

impl RoomcastServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            room_config: RoomConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets the queue sizes used by every room.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Binds the listener. Nothing is served until
    /// [`run`](RoomcastServer::run).
    pub async fn build(self) -> Result<RoomcastServer, RoomcastError> {
        let listener = TcpListener::bind(&self.bind_addr).await?;
        Ok(RoomcastServer {
            listener,
            registry: RoomRegistry::with_config(self.room_config),
        })
    }
}

impl Default for RoomcastServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound roomcast server.
pub struct RoomcastServer {
    listener: TcpListener,
    registry: RoomRegistry,
}

impl RoomcastServer {
    pub fn builder() -> RoomcastServerBuilder {
        RoomcastServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// The registry behind this server, for embedding applications.
    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    /// Serves until the process is terminated.
    pub async fn run(self) -> Result<(), RoomcastError> {
        self.run_until(std::future::pending::<()>()).await
    }

    /// Serves until `shutdown` resolves, then stops accepting and drains
    /// in-flight requests.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), RoomcastError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!(addr = ?self.listener.local_addr().ok(), "roomcast server running");
        axum::serve(self.listener, app(self.registry))
            .with_graceful_shutdown(shutdown)
            .await?;
        tracing::info!("roomcast server stopped");
        Ok(())
    }
}
