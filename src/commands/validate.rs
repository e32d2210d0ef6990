use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use tracing::info;

use crate::build::BuildSnapshot;
use crate::catalog::CatalogClient;
use crate::compat::ValidationReport;
use crate::error::EngineError;

use super::AppState;

/// Validate a build and report its issues split by severity.
pub async fn validate_build<C: CatalogClient>(
    State(state): State<Arc<AppState<C>>>,
    Json(snapshot): Json<BuildSnapshot>,
) -> Result<Json<ValidationReport>, EngineError> {
    info!("Validating build with {} parts", snapshot.parts.len() + snapshot.storage.len());

    let build = snapshot.hydrate(state.catalog()).await?;
    let report = state.validator.report(&build);
    info!(
        "Validation found {} errors, {} warnings",
        report.errors.len(),
        report.warnings.len()
    );
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_state::state;
    use crate::compat::IssueType;
    use std::collections::BTreeMap;

    fn snapshot(parts: &[(&str, &str)]) -> BuildSnapshot {
        BuildSnapshot {
            parts: parts
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_validate_reports_socket_mismatch() {
        let Json(report) = validate_build(
            State(state()),
            Json(snapshot(&[("cpu", "cpu-am5"), ("motherboard", "mb-lga")])),
        )
        .await
        .unwrap();
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].issue_type, IssueType::SocketMismatch);
    }

    #[tokio::test]
    async fn test_validate_rejects_unknown_category() {
        let err = validate_build(State(state()), Json(snapshot(&[("fan", "fan-1")])))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_validate_rejects_unknown_id() {
        let err = validate_build(State(state()), Json(snapshot(&[("cpu", "cpu-missing")])))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }
}
