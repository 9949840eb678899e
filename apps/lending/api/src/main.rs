use axum_helpers::server::{create_app, create_router, health_router};
use core_config::tracing::{init_tracing, install_color_eyre};
use database::common::RetryConfig;
use tracing::info;

mod api;
mod config;
mod openapi;
mod state;

use config::{Config, StorageBackend};
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Install color-eyre first for colored error output (before any fallible operations)
    install_color_eyre();

    // Load configuration from environment variables
    let config = Config::from_env()?;

    // Initialize tracing with ErrorLayer for span trace capture
    init_tracing(&config.environment);

    info!(backend = %config.storage, "Selected storage backend");

    let redis = match (&config.storage, &config.redis) {
        (StorageBackend::Redis, Some(redis_config)) => {
            let conn = database::redis::connect_with_retry(redis_config, RetryConfig::new())
                .await
                .map_err(|e| eyre::eyre!("Redis connection failed: {}", e))?;
            info!("Redis connected");
            Some(conn)
        }
        (StorageBackend::Redis, None) => {
            eyre::bail!("Redis backend selected without a Redis configuration")
        }
        (StorageBackend::Memory, _) => None,
    };

    let state = AppState { config, redis };

    // Build router with API routes (pass reference, not ownership!)
    let api_routes = api::routes(&state);

    // create_router adds docs/middleware to our composed routes
    let router = create_router::<openapi::ApiDoc>(api_routes);

    // - /health: liveness check with app name/version
    // - /ready: readiness check against the storage backend
    let app = router
        .merge(health_router(state.config.app))
        .merge(api::ready_router(state.clone()));

    let server_config = state.config.server.clone();
    info!(
        "Starting lending API with graceful shutdown ({:?} timeout)",
        server_config.shutdown_timeout
    );

    create_app(app, &server_config, async move {
        // Redis ConnectionManager closes automatically on drop
        if let Some(redis) = state.redis {
            drop(redis);
            info!("Redis connection closed");
        }
    })
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Lending API shutdown complete");
    Ok(())
}
