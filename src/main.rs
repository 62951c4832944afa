use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use budget_tracker::config::AppConfig;
use budget_tracker::repositories::memory::MemoryStore;
use budget_tracker::{AppState, Repositories, build_router};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Reads .env as well, so RUST_LOG from there applies below
    let config = AppConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    let repositories = match &config.database_url {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await?;
            info!("connected to database");

            sqlx::migrate!("./migrations").run(&pool).await?;
            info!("migrations completed");

            Repositories::postgres(pool)
        }
        None => {
            warn!("DATABASE_URL not set, using the in-memory store; data is lost on exit");
            Repositories::memory(Arc::new(MemoryStore::new()))
        }
    };

    let app = build_router(AppState::new(repositories, &config));

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(%addr, currency = %config.display_currency.code(), "server running");
    info!("API docs at http://{}/api/docs", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
