mod api;
mod app_config;
mod chat_store;
mod context;
mod db;
mod page_store;
mod retrieval;
mod router;
mod state;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = app_config::load_config();
    config.log_summary();

    let pool = db::init_pg_pool(&config.postgres).await?;
    let embedder = app_config::build_embedder(&config);
    let llm = app_config::build_llm(&config);

    let data_dir = config.storage.data_dir.clone();
    tokio::fs::create_dir_all(&data_dir).await?;

    let state = Arc::new(AppState {
        pool,
        embedder,
        llm,
        data_dir,
        config: config.clone(),
    });

    let app = router::build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("lesesaal server listening on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
