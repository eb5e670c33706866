use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use cinetrack_browse::{BrowseConfig, Catalog};
use cinetrack_metadata::guard::{DEFAULT_TIMEOUT, GuardedSource};
use cinetrack_metadata::tmdb::{TmdbClient, TmdbConfig};
use cinetrack_server::sessions::{DEFAULT_IDLE_TIMEOUT, SessionManager};
use cinetrack_server::state::AppState;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let api_key = std::env::var("CINETRACK_TMDB_KEY")
        .context("CINETRACK_TMDB_KEY must be set to a TMDB v3 API key")?;
    let mut tmdb = TmdbConfig::new(api_key);
    if let Ok(base_url) = std::env::var("CINETRACK_TMDB_BASE_URL") {
        tmdb.base_url = base_url;
    }

    let timeout = Duration::from_millis(env_or(
        "CINETRACK_UPSTREAM_TIMEOUT_MS",
        DEFAULT_TIMEOUT.as_millis() as u64,
    ));
    let config = BrowseConfig {
        search_limit: env_or("CINETRACK_SEARCH_LIMIT", BrowseConfig::default().search_limit),
        ..Default::default()
    };
    info!(
        upstream = %tmdb.base_url,
        timeout_ms = timeout.as_millis() as u64,
        search_limit = config.search_limit,
        "catalog configured"
    );

    let source = GuardedSource::new(TmdbClient::new(tmdb), timeout);
    let catalog = Arc::new(Catalog::new(Arc::new(source), config));

    // Warm both genre directories; a failure here is retried on first use.
    if let Err(e) = catalog.directory().prime().await {
        warn!(error = %e, "genre directory priming failed");
    }

    let idle = Duration::from_secs(env_or(
        "CINETRACK_SESSION_IDLE_SECS",
        DEFAULT_IDLE_TIMEOUT.as_secs(),
    ));
    let state = AppState::new(catalog, SessionManager::new(idle));

    // Spawn idle session cleanup task
    {
        let sessions = state.sessions.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(30)).await;
                let evicted = sessions.cleanup_idle().await;
                if evicted > 0 {
                    info!(evicted, "idle sessions evicted");
                }
            }
        });
    }

    let app = cinetrack_server::routes::build_router(state);

    let bind_addr =
        std::env::var("CINETRACK_BIND").unwrap_or_else(|_| "0.0.0.0:8097".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .context("failed to bind")?;
    info!(addr = %bind_addr, "server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
