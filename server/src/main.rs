use anyhow::Result;
use tracing::{info, warn};

use flock_server::{api, config, db};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flock_server=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    dotenvy::dotenv().ok();
    let config = config::Config::from_env()?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Flock Server");

    let db_pool = db::create_pool(&config.database_url, config.db_max_connections).await?;
    db::run_migrations(&db_pool).await?;

    info!(
        max_attempts = config.rsvp_max_attempts,
        timeout_ms = config.rsvp_timeout_ms,
        "Reservation ledger configured"
    );

    let bind_address = config.bind_address.clone();
    let state = api::AppState::new(db_pool, config);
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    info!(address = %bind_address, "Server listening");

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal, cleaning up...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shutdown complete");

    Ok(())
}
