//! Fleet Web Server
//!
//! Axum-based WebSocket server broadcasting instance lifecycle events.

pub mod broadcast;
pub mod hub;
pub mod processor;
pub mod routes;
pub mod state;
pub mod websocket;

use std::future::Future;
use std::time::Duration;

use axum::{routing::get, Router};
use fleet_core::instance::InstanceRegistry;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use state::AppState;

/// Server settings resolved by the CLI.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub command_delay: Duration,
    /// Start with the demo instances instead of an empty registry.
    pub seed_demo: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5555,
            command_delay: processor::DEFAULT_COMMAND_DELAY,
            seed_demo: true,
        }
    }
}

impl ServerConfig {
    fn registry(&self) -> InstanceRegistry {
        if self.seed_demo {
            InstanceRegistry::with_demo_instances()
        } else {
            InstanceRegistry::new()
        }
    }
}

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/instances", get(routes::instances::list_instances))
        .with_state(state.clone());

    Router::new()
        .nest("/api", api_routes)
        .route("/ws", get(websocket::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, config: &ServerConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let state = AppState::new(config.registry(), config.command_delay);
    let app = create_router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

/// Run the web server until Ctrl-C.
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    tracing::info!(
        delay_ms = config.command_delay.as_millis() as u64,
        "Web server listening on http://{}",
        listener.local_addr()?
    );

    serve(listener, &config, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to install Ctrl-C handler");
        }
        tracing::info!("Shutting down");
    })
    .await
}
