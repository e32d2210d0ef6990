pub mod build;
pub mod catalog;
pub mod commands;
pub mod compat;
pub mod config;
mod error;
pub mod resolver;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

pub use build::{apply_swap, BuildSnapshot, BuildState};
pub use compat::{Issue, IssueType, Severity, ValidationReport, Validator};
pub use error::{EngineError, EngineResult};
pub use resolver::{AlternativeCandidate, CancelToken, ResolveOutcome, Resolver};

use catalog::cache::CachedCatalog;
use commands::AppState;
use config::Settings;

pub async fn run() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::load()?;
    let policy = settings.policy()?;
    let ttl_secs = policy.resolver.cache_ttl_secs;
    let validator = Arc::new(Validator::new(Arc::new(policy)));
    let source = settings.catalog_source()?;

    let catalog = match settings.cache_dir() {
        Some(dir) if ttl_secs > 0 => match std::fs::create_dir_all(&dir) {
            Ok(()) => {
                let db_path = dir.join("catalog_cache.db");
                info!("Caching catalog searches in {:?} for {}s", db_path, ttl_secs);
                CachedCatalog::new(source, db_path, ttl_secs)
            }
            Err(e) => {
                warn!("Cannot create cache directory {:?}: {}, caching disabled", dir, e);
                CachedCatalog::uncached(source)
            }
        },
        _ => CachedCatalog::uncached(source),
    };

    let state = Arc::new(AppState::new(validator, catalog));
    if let Err(e) = state.catalog().purge_expired().await {
        warn!("Failed to purge expired cache entries: {}", e);
    }

    let app = commands::router(state);
    let listener = tokio::net::TcpListener::bind(&settings.bind)
        .await
        .with_context(|| format!("Failed to bind {}", settings.bind))?;
    info!("rigcheck listening on {}", settings.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;
    info!("rigcheck stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
