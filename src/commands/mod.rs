//! HTTP handlers for the engine API.
//!
//! Every handler takes builds in their id-only wire form, hydrates them
//! through the catalog, and hands typed state to the engine. Engine errors
//! become JSON `{error, message}` bodies.

pub mod health;
pub mod resolve;
pub mod swap;
pub mod validate;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;

use crate::catalog::cache::CachedCatalog;
use crate::catalog::CatalogClient;
use crate::compat::Validator;
use crate::error::EngineError;
use crate::resolver::Resolver;

/// Shared state behind every handler.
pub struct AppState<C> {
    pub validator: Arc<Validator>,
    pub resolver: Resolver<CachedCatalog<C>>,
}

impl<C: CatalogClient> AppState<C> {
    pub fn new(validator: Arc<Validator>, catalog: CachedCatalog<C>) -> Self {
        Self {
            resolver: Resolver::new(catalog, validator.clone()),
            validator,
        }
    }

    pub fn catalog(&self) -> &CachedCatalog<C> {
        self.resolver.catalog()
    }
}

/// Build the API router.
pub fn router<C: CatalogClient + 'static>(state: Arc<AppState<C>>) -> Router {
    Router::new()
        .route("/validate", post(validate::validate_build::<C>))
        .route("/resolve", post(resolve::resolve_issue::<C>))
        .route("/resolve/batch", post(resolve::resolve_batch::<C>))
        .route("/swap", post(swap::swap_component::<C>))
        .route("/rules", get(health::list_rules::<C>))
        .route("/health", get(health::health_check::<C>))
        .route("/cache/purge", post(health::purge_cache::<C>))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = match self {
            EngineError::Configuration(_) => StatusCode::BAD_REQUEST,
            EngineError::CatalogUnavailable(_) | EngineError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            EngineError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: self.kind(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
