//! Read-only access to the external parts catalog.
//!
//! The engine never talks to storage directly: every part it sees comes
//! through a [`CatalogClient`]. Three implementations are provided:
//!
//! 1. [`client::HttpCatalogClient`] - the storefront's search service over HTTP
//! 2. [`file::FileCatalog`] - an in-memory catalog loaded from a JSON file
//! 3. [`cache::CachedCatalog`] - a read-through TTL cache around either

pub mod cache;
pub mod client;
pub mod file;
pub mod types;

use std::future::Future;

use crate::error::EngineResult;

use self::client::HttpCatalogClient;
use self::file::FileCatalog;
use self::types::{CatalogHit, CatalogQuery, Component};

/// Query interface over the parts catalog.
///
/// Failures are reported as `EngineError::CatalogUnavailable`, except for
/// malformed components returned by `fetch`, which are configuration errors.
pub trait CatalogClient: Send + Sync {
    /// Search one category under attribute constraints.
    fn search(&self, query: &CatalogQuery) -> impl Future<Output = EngineResult<Vec<CatalogHit>>> + Send;

    /// Fetch components by id. Unknown ids are absent from the result.
    fn fetch(&self, ids: &[String]) -> impl Future<Output = EngineResult<Vec<Component>>> + Send;
}

/// The catalog backend selected by configuration.
pub enum CatalogSource {
    Http(HttpCatalogClient),
    File(FileCatalog),
}

impl CatalogClient for CatalogSource {
    async fn search(&self, query: &CatalogQuery) -> EngineResult<Vec<CatalogHit>> {
        match self {
            CatalogSource::Http(client) => client.search(query).await,
            CatalogSource::File(catalog) => catalog.search(query).await,
        }
    }

    async fn fetch(&self, ids: &[String]) -> EngineResult<Vec<Component>> {
        match self {
            CatalogSource::Http(client) => client.fetch(ids).await,
            CatalogSource::File(catalog) => catalog.fetch(ids).await,
        }
    }
}
