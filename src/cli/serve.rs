use anyhow::Context;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::runtime::Runtime;
use crate::app::{router, saga_settings, AppState};
use crate::config::AppConfig;
use crate::database::{DatabaseManager, PgMessageRepository};
use crate::deadline::Deadline;
use crate::messages::MessageCache;

pub async fn serve(config: &AppConfig) -> anyhow::Result<()> {
    info!("Starting flight hours API in {:?} mode", config.environment);
    let runtime = Runtime::connect(config).await?;

    let messages = Arc::new(MessageCache::new(Arc::new(PgMessageRepository::new(runtime.pool.clone()))));
    match messages.reload(Deadline::after(config.api.request_timeout())).await {
        Ok(count) => info!("Loaded {} messages", count),
        // Misses still hydrate from the database one code at a time
        Err(e) => warn!("Message catalog not preloaded: {}", e),
    }
    messages.start_auto_refresh(config.messages.refresh_interval()).await;

    let state = AppState::new(
        runtime.store,
        runtime.idp,
        Arc::clone(&messages),
        saga_settings(&config.api, &config.idp),
    );
    let app = router(state, &config.api);

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("Flight hours API listening on http://{}{}", bind_addr, config.api.base_path);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    messages.stop_auto_refresh().await;
    DatabaseManager::close(&runtime.pool).await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
