use std::sync::Arc;

use anyhow::Context;

use parish_api::app::{app, AppState};
use parish_api::store::{MemoryStore, PgStore};
use parish_api::{config, database};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL etc.
    let _ = dotenvy::dotenv();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();

    tracing_subscriber::fmt::init();
    tracing::info!("Starting Parish API in {:?} mode", config.environment);

    let state = build_state().await?;
    let router = app(state);

    // Allow tests or deployments to override port via env
    let port = std::env::var("PARISH_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Parish API listening on http://{}", bind_addr);

    axum::serve(listener, router).await.context("server")?;
    Ok(())
}

async fn build_state() -> anyhow::Result<AppState> {
    // APP_STORE=memory runs without Postgres, for local work
    if std::env::var("APP_STORE").as_deref() == Ok("memory") {
        tracing::warn!("Using the in-memory store; nothing will be persisted");
        let store = Arc::new(MemoryStore::new());
        return Ok(AppState {
            claims: store.clone(),
            users: store,
        });
    }

    let pool = database::connect().await.context("database connection")?;
    let store = Arc::new(PgStore::new(pool));
    store.migrate().await.context("schema migration")?;
    Ok(AppState {
        claims: store.clone(),
        users: store,
    })
}
