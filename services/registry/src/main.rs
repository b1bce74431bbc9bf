//! tagmint registry server.
//!
//! Serves the public tag endpoints: scan redirect, batch creation and
//! write-once claiming.

use anyhow::Result;
use tagmint_registry::{api, config::Config, db::Database, resolve::TagResolver, state::AppState};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Prefer RUST_LOG, fall back to TAGMINT_LOG_LEVEL
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting tagmint registry");
    info!(
        listen_addr = %config.listen_addr,
        provider = %config.codec.provider_id,
        devicehubs = config.devicehubs.len(),
        "Configuration loaded"
    );

    let db = match Database::connect(&config.database).await {
        Ok(db) => db,
        Err(e) => {
            error!(error = %e, "Failed to connect to database");
            return Err(e.into());
        }
    };

    if config.dev_mode {
        info!("Running database migrations (dev mode)");
        if let Err(e) = db.run_migrations().await {
            error!(error = %e, "Failed to run migrations");
            return Err(e.into());
        }
    }

    let resolver = TagResolver::new(config.codec.build_scheme()?);
    let state = AppState::new(db, resolver, config.devicehubs);

    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "Listening for connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Received shutdown signal");
        })
        .await?;

    info!("Registry shutdown complete");
    Ok(())
}
