pub mod api;
pub mod config;
pub mod error;
pub mod generator;
pub mod logic;
pub mod model;
pub mod store;

use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::api::handlers::AppState;
use crate::api::routes::{cors_layer, create_router};
use crate::config::{AppConfig, StorageBackend};
use crate::generator::{IdeaGenerator, WebhookGenerator};
use crate::logic::GenerationOrchestrator;

// Export API types
pub use api::handlers;
pub use api::routes;

// Export error types
pub use error::GenerationError;

// Export all model types
pub use model::*;

// Export store types
pub use store::{MemoryStore, PostgresStore, Store};

/// Assemble the HTTP application around a store and a generation client
pub fn build_app<S: Store + 'static>(
    store: Arc<S>,
    generator: Arc<dyn IdeaGenerator>,
    config: &AppConfig,
) -> Router {
    let orchestrator = GenerationOrchestrator::new(Arc::clone(&store), generator, config.limits);

    create_router::<S>()
        .layer(cors_layer(&config.server.allowed_origins))
        .with_state(AppState::new(store, orchestrator))
}

/// Connect the configured storage backend and serve until the process is stopped
pub async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    let generator: Arc<dyn IdeaGenerator> = Arc::new(WebhookGenerator::from_config(&config.webhook)?);
    log::info!(
        "Generation webhook: {} (timeout {}s)",
        config.webhook.url,
        config.webhook.timeout_secs
    );

    match config.database.backend {
        StorageBackend::Postgres => {
            log::info!("Connecting to PostgreSQL...");
            let database_url = config.database_url()?;
            let postgres_store =
                PostgresStore::new(&database_url, config.database.max_connections.unwrap_or(20))
                    .await?;
            postgres_store.migrate().await?;

            serve(build_app(Arc::new(postgres_store), generator, &config), &config).await
        }
        StorageBackend::Memory => {
            log::warn!("Using in-memory storage; data is lost on shutdown");
            serve(build_app(Arc::new(MemoryStore::new()), generator, &config), &config).await
        }
    }
}

async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    log::info!("Mind map API running on http://{}", bind_address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
