use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::build::{BuildSnapshot, BuildState};
use crate::catalog::types::Category;
use crate::catalog::CatalogClient;
use crate::compat::Issue;
use crate::error::{EngineError, EngineResult};
use crate::resolver::{CancelToken, IssueResolution, ResolveOutcome};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    pub issue: Issue,
    pub build_state: BuildSnapshot,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub build_state: BuildSnapshot,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub results: Vec<IssueResolution>,
    /// The build could not be loaded from the catalog, so it was not
    /// validated; an empty `results` says nothing about its issues.
    pub degraded: bool,
}

/// Hydrate a build for resolution under the resolver timeout.
///
/// `None` when the catalog is unavailable or too slow. Malformed snapshots
/// are still errors.
async fn hydrate_for_resolution<C: CatalogClient>(
    state: &AppState<C>,
    snapshot: &BuildSnapshot,
) -> EngineResult<Option<BuildState>> {
    let timeout = state.validator.policy().resolver.timeout();
    match tokio::time::timeout(timeout, snapshot.hydrate(state.catalog())).await {
        Ok(Ok(build)) => Ok(Some(build)),
        Ok(Err(EngineError::CatalogUnavailable(reason))) => {
            warn!("Catalog unavailable while loading build: {}", reason);
            Ok(None)
        }
        Ok(Err(e)) => Err(e),
        Err(_) => {
            warn!("Loading build timed out after {:?}", timeout);
            Ok(None)
        }
    }
}

/// Find replacement parts for one issue.
///
/// A dropped connection drops this future, which abandons the catalog query.
pub async fn resolve_issue<C: CatalogClient>(
    State(state): State<Arc<AppState<C>>>,
    Json(request): Json<ResolveRequest>,
) -> Result<Json<ResolveOutcome>, EngineError> {
    info!(
        "Resolving {} (target: {:?}, limit: {:?})",
        request.issue.issue_type, request.target, request.limit
    );

    let target = request
        .target
        .as_deref()
        .map(str::parse::<Category>)
        .transpose()?;
    let Some(build) = hydrate_for_resolution(&state, &request.build_state).await? else {
        let target = state.resolver.choose_target(request.issue.issue_type, target)?;
        return Ok(Json(ResolveOutcome::degraded(target)));
    };
    let outcome = state
        .resolver
        .resolve(&request.issue, &build, target, request.limit, &CancelToken::new())
        .await?;
    Ok(Json(outcome))
}

/// Validate a build and resolve every issue it has.
pub async fn resolve_batch<C: CatalogClient>(
    State(state): State<Arc<AppState<C>>>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<BatchResponse>, EngineError> {
    info!("Resolving all issues (limit: {:?})", request.limit);

    let Some(build) = hydrate_for_resolution(&state, &request.build_state).await? else {
        return Ok(Json(BatchResponse {
            results: Vec::new(),
            degraded: true,
        }));
    };
    let results = state
        .resolver
        .resolve_all(&build, request.limit, &CancelToken::new())
        .await?;
    Ok(Json(BatchResponse {
        results,
        degraded: false,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::cache::CachedCatalog;
    use crate::catalog::types::{CatalogHit, CatalogQuery, Component};
    use crate::commands::test_state::state;
    use crate::compat::{default_policy, IssueType, Validator};
    use serde_json::json;

    /// Catalog whose every call fails.
    struct DownCatalog;

    impl CatalogClient for DownCatalog {
        async fn search(&self, _: &CatalogQuery) -> EngineResult<Vec<CatalogHit>> {
            Err(EngineError::CatalogUnavailable("down".to_string()))
        }

        async fn fetch(&self, _: &[String]) -> EngineResult<Vec<Component>> {
            Err(EngineError::CatalogUnavailable("down".to_string()))
        }
    }

    /// Catalog that never answers.
    struct StalledCatalog;

    impl CatalogClient for StalledCatalog {
        async fn search(&self, _: &CatalogQuery) -> EngineResult<Vec<CatalogHit>> {
            std::future::pending().await
        }

        async fn fetch(&self, _: &[String]) -> EngineResult<Vec<Component>> {
            std::future::pending().await
        }
    }

    fn state_over<C: CatalogClient>(catalog: C, timeout_ms: u64) -> Arc<AppState<C>> {
        let mut policy = default_policy();
        policy.resolver.timeout_ms = timeout_ms;
        let validator = Arc::new(Validator::new(Arc::new(policy)));
        Arc::new(AppState::new(validator, CachedCatalog::uncached(catalog)))
    }

    fn mismatch_request(target: Option<&str>) -> ResolveRequest {
        serde_json::from_value(json!({
            "issue": {
                "issue_type": "socket_mismatch",
                "severity": "error",
                "component1": "cpu-am5",
                "component2": "mb-lga",
                "category1": "cpu",
                "category2": "motherboard",
                "message": "socket mismatch",
                "suggestion": null
            },
            "build_state": {"parts": {"cpu": "cpu-am5", "motherboard": "mb-lga"}},
            "target": target,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_resolve_uses_preferred_target() {
        let Json(outcome) = resolve_issue(State(state()), Json(mismatch_request(None)))
            .await
            .unwrap();
        assert_eq!(outcome.target, Category::Motherboard);
        let ids: Vec<&str> = outcome.candidates.iter().map(|c| c.component.id.as_str()).collect();
        assert_eq!(ids, vec!["mb-am5"]);
    }

    #[tokio::test]
    async fn test_resolve_with_explicit_target() {
        let Json(outcome) = resolve_issue(State(state()), Json(mismatch_request(Some("CPU"))))
            .await
            .unwrap();
        assert_eq!(outcome.target, Category::Cpu);
        assert_eq!(outcome.candidates[0].component.id, "cpu-lga");
    }

    #[tokio::test]
    async fn test_resolve_rejects_foreign_target() {
        let err = resolve_issue(State(state()), Json(mismatch_request(Some("gpu"))))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_batch_resolves_each_issue() {
        let request: BatchRequest = serde_json::from_value(json!({
            "build_state": {"parts": {"motherboard": "mb-am5", "ram": "ram-ddr4"}}
        }))
        .unwrap();
        let Json(response) = resolve_batch(State(state()), Json(request)).await.unwrap();
        assert!(!response.degraded);
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].issue.issue_type, IssueType::RamTypeMismatch);
        assert_eq!(response.results[0].outcome.candidates[0].component.id, "ram-ddr5");
    }

    #[tokio::test]
    async fn test_resolve_degrades_when_build_cannot_load() {
        let down = state_over(DownCatalog, 3_000);
        let Json(outcome) = resolve_issue(State(down), Json(mismatch_request(None)))
            .await
            .unwrap();
        assert!(outcome.degraded);
        assert!(outcome.candidates.is_empty());
        assert_eq!(outcome.target, Category::Motherboard);

        let stalled = state_over(StalledCatalog, 20);
        let Json(outcome) = resolve_issue(State(stalled), Json(mismatch_request(Some("cpu"))))
            .await
            .unwrap();
        assert!(outcome.degraded);
        assert_eq!(outcome.target, Category::Cpu);
    }

    #[tokio::test]
    async fn test_resolve_still_rejects_bad_target_when_catalog_down() {
        let down = state_over(DownCatalog, 3_000);
        let err = resolve_issue(State(down), Json(mismatch_request(Some("gpu"))))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_batch_degrades_when_build_cannot_load() {
        let request: BatchRequest = serde_json::from_value(json!({
            "build_state": {"parts": {"motherboard": "mb-am5", "ram": "ram-ddr4"}}
        }))
        .unwrap();
        let Json(response) = resolve_batch(State(state_over(DownCatalog, 3_000)), Json(request))
            .await
            .unwrap();
        assert!(response.degraded);
        assert!(response.results.is_empty());
    }
}
