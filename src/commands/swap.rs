use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use tracing::info;

use crate::build::{apply_swap, BuildSnapshot};
use crate::catalog::types::Category;
use crate::catalog::CatalogClient;
use crate::error::EngineError;

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct SwapRequest {
    pub build_state: BuildSnapshot,
    pub category: String,
    pub component_id: String,
}

/// Put a catalog component into one slot of a build.
///
/// Returns the new build; the caller re-validates when it wants to.
pub async fn swap_component<C: CatalogClient>(
    State(state): State<Arc<AppState<C>>>,
    Json(request): Json<SwapRequest>,
) -> Result<Json<BuildSnapshot>, EngineError> {
    info!("Swapping {} -> {}", request.category, request.component_id);

    let category: Category = request.category.parse()?;
    let build = request.build_state.hydrate(state.catalog()).await?;
    let component = state
        .catalog()
        .fetch(std::slice::from_ref(&request.component_id))
        .await?
        .into_iter()
        .find(|c| c.id == request.component_id)
        .ok_or_else(|| {
            EngineError::Configuration(format!("Unknown component id '{}'", request.component_id))
        })?;

    let swapped = apply_swap(&build, category, component)?;
    Ok(Json(swapped.to_snapshot()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_state::state;
    use serde_json::json;

    fn request(category: &str, id: &str) -> SwapRequest {
        serde_json::from_value(json!({
            "build_state": {"parts": {"cpu": "cpu-am5", "motherboard": "mb-lga"}, "storage": ["ssd-1"]},
            "category": category,
            "component_id": id,
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_swap_replaces_one_slot() {
        let Json(snapshot) = swap_component(State(state()), Json(request("motherboard", "mb-am5")))
            .await
            .unwrap();
        assert_eq!(snapshot.parts["motherboard"], "mb-am5");
        assert_eq!(snapshot.parts["cpu"], "cpu-am5");
        assert_eq!(snapshot.storage, vec!["ssd-1".to_string()]);
    }

    #[tokio::test]
    async fn test_swap_category_mismatch_rejected() {
        let err = swap_component(State(state()), Json(request("motherboard", "cpu-lga")))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_swap_unknown_component_rejected() {
        let err = swap_component(State(state()), Json(request("cpu", "cpu-404")))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_swap_storage_rejected() {
        let err = swap_component(State(state()), Json(request("storage", "ssd-1")))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }
}
