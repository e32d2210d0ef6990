use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;

use crate::error::{EngineError, EngineResult};

use super::types::{CatalogHit, CatalogQuery, Component, RawComponent};
use super::CatalogClient;

const USER_AGENT: &str = concat!("rigcheck/", env!("CARGO_PKG_VERSION"));

/// Client for the storefront's catalog search service.
///
/// Endpoints, relative to the base URL:
/// - `POST search` with a [`CatalogQuery`] body, answering `{"hits": [...]}`
/// - `POST components` with `{"ids": [...]}`, answering `{"components": [...]}`
pub struct HttpCatalogClient {
    client: reqwest::Client,
    base: Url,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<RawHit>,
}

#[derive(Debug, Deserialize)]
struct RawHit {
    component: RawComponent,
    #[serde(default)]
    relevance: f64,
}

#[derive(Debug, Serialize)]
struct FetchRequest<'a> {
    ids: &'a [String],
}

#[derive(Debug, Deserialize)]
struct FetchResponse {
    #[serde(default)]
    components: Vec<RawComponent>,
}

impl HttpCatalogClient {
    pub fn new(base_url: &str, connect_timeout: Duration, request_timeout: Duration) -> EngineResult<Self> {
        let mut base = Url::parse(base_url).map_err(|e| {
            EngineError::Configuration(format!("Invalid catalog URL '{}': {}", base_url, e))
        })?;
        // Url::join replaces the last path segment unless the base ends in '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|e| EngineError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, path: &str) -> EngineResult<Url> {
        self.base
            .join(path)
            .map_err(|e| EngineError::Configuration(format!("Invalid catalog endpoint '{}': {}", path, e)))
    }

    async fn post_json<B: Serialize + ?Sized, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> EngineResult<R> {
        let url = self.endpoint(path)?;
        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| unavailable(&url, e))?
            .error_for_status()
            .map_err(|e| unavailable(&url, e))?;
        response.json::<R>().await.map_err(|e| unavailable(&url, e))
    }
}

fn unavailable(url: &Url, err: reqwest::Error) -> EngineError {
    let reason = if err.is_timeout() {
        "timed out".to_string()
    } else {
        err.to_string()
    };
    warn!("Catalog request to {} failed: {}", url, reason);
    EngineError::CatalogUnavailable(format!("{}: {}", url, reason))
}

impl CatalogClient for HttpCatalogClient {
    async fn search(&self, query: &CatalogQuery) -> EngineResult<Vec<CatalogHit>> {
        let response: SearchResponse = self.post_json("search", query).await?;
        let total = response.hits.len();

        // A malformed hit can never be a candidate; drop it rather than fail the search.
        let hits: Vec<CatalogHit> = response
            .hits
            .into_iter()
            .filter_map(|raw| {
                let id = raw.component.id.clone();
                match Component::try_from(raw.component) {
                    Ok(component) => Some(CatalogHit {
                        component,
                        relevance: raw.relevance,
                    }),
                    Err(e) => {
                        warn!("Skipping malformed catalog hit '{}': {}", id, e);
                        None
                    }
                }
            })
            .collect();

        info!(
            "Catalog search {} returned {} hits ({} usable)",
            query.signature(),
            total,
            hits.len()
        );
        Ok(hits)
    }

    async fn fetch(&self, ids: &[String]) -> EngineResult<Vec<Component>> {
        let response: FetchResponse = self.post_json("components", &FetchRequest { ids }).await?;
        response
            .components
            .into_iter()
            .map(Component::try_from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> HttpCatalogClient {
        HttpCatalogClient::new(base, Duration::from_secs(1), Duration::from_secs(2)).unwrap()
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let c = client("http://catalog.internal/api/v1");
        assert_eq!(c.endpoint("search").unwrap().as_str(), "http://catalog.internal/api/v1/search");

        let c = client("http://catalog.internal/");
        assert_eq!(c.endpoint("components").unwrap().as_str(), "http://catalog.internal/components");
    }

    #[test]
    fn test_invalid_url_is_configuration_error() {
        let err = HttpCatalogClient::new("not a url", Duration::from_secs(1), Duration::from_secs(1))
            .err()
            .unwrap();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn test_search_response_parsing() {
        let json = r#"{"hits": [
            {"component": {"id": "psu-1", "category": "psu", "attributes": {"wattage_w": 750}}, "relevance": 0.7}
        ]}"#;
        let response: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.hits.len(), 1);
        assert_eq!(response.hits[0].relevance, 0.7);
    }

    #[tokio::test]
    async fn test_unreachable_catalog_is_unavailable() {
        // Port 9 (discard) on localhost is almost never listening.
        let c = client("http://127.0.0.1:9/");
        let err = c.fetch(&["x".to_string()]).await.unwrap_err();
        assert!(matches!(err, EngineError::CatalogUnavailable(_)));
    }
}
