use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use tracing::info;

use crate::catalog::CatalogClient;
use crate::compat::RuleInfo;
use crate::error::EngineError;

use super::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub rules: usize,
    pub cache_enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurgeReport {
    pub purged: usize,
}

pub async fn health_check<C: CatalogClient>(State(state): State<Arc<AppState<C>>>) -> Json<HealthReport> {
    Json(HealthReport {
        status: "ok",
        rules: state.validator.rules().len(),
        cache_enabled: state.catalog().is_caching(),
    })
}

/// Describe the rule catalog with each rule's preferred replacement target.
pub async fn list_rules<C: CatalogClient>(State(state): State<Arc<AppState<C>>>) -> Json<Vec<RuleInfo>> {
    info!("Listing rules");
    Json(state.validator.describe_rules())
}

/// Drop expired entries from the search cache.
pub async fn purge_cache<C: CatalogClient>(
    State(state): State<Arc<AppState<C>>>,
) -> Result<Json<PurgeReport>, EngineError> {
    info!("Purging expired cache entries");
    let purged = state.catalog().purge_expired().await?;
    Ok(Json(PurgeReport { purged }))
}
