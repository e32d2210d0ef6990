//! In-memory catalog loaded from a JSON file.
//!
//! The file is an array of components in wire form, each with an optional
//! `relevance` score:
//!
//! ```json
//! [{"id": "psu-1", "name": "RM850x", "category": "psu", "price": 129.0,
//!   "relevance": 0.8, "attributes": {"wattage_w": 850}}]
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::error::EngineResult;

use super::types::{CatalogHit, CatalogQuery, Component};
use super::CatalogClient;

#[derive(Debug, Deserialize)]
struct FileEntry {
    #[serde(flatten)]
    component: Component,
    #[serde(default = "default_relevance")]
    relevance: f64,
}

fn default_relevance() -> f64 {
    1.0
}

/// Catalog held entirely in memory; evaluates query predicates itself.
#[derive(Debug, Clone, Default)]
pub struct FileCatalog {
    entries: Vec<CatalogHit>,
}

impl FileCatalog {
    /// Load a catalog from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file {:?}", path))?;
        let catalog = Self::from_json(&content)
            .with_context(|| format!("Invalid catalog file {:?}", path))?;
        info!("Loaded {} catalog entries from {:?}", catalog.len(), path);
        Ok(catalog)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<FileEntry> = serde_json::from_str(json)?;
        Ok(Self {
            entries: entries
                .into_iter()
                .map(|e| CatalogHit {
                    component: e.component,
                    relevance: e.relevance,
                })
                .collect(),
        })
    }

    /// Build a catalog from components, all with the default relevance.
    pub fn from_components(components: Vec<Component>) -> Self {
        Self {
            entries: components
                .into_iter()
                .map(|component| CatalogHit {
                    component,
                    relevance: default_relevance(),
                })
                .collect(),
        }
    }

    pub fn from_hits(entries: Vec<CatalogHit>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Matching entries, best relevance first, ties by id.
    fn matching(&self, query: &CatalogQuery) -> Vec<CatalogHit> {
        let mut hits: Vec<CatalogHit> = self
            .entries
            .iter()
            .filter(|hit| query.accepts(&hit.component))
            .cloned()
            .collect();
        hits.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.component.id.cmp(&b.component.id))
        });
        hits.truncate(query.limit);
        hits
    }
}

impl CatalogClient for FileCatalog {
    async fn search(&self, query: &CatalogQuery) -> EngineResult<Vec<CatalogHit>> {
        Ok(self.matching(query))
    }

    async fn fetch(&self, ids: &[String]) -> EngineResult<Vec<Component>> {
        Ok(self
            .entries
            .iter()
            .filter(|hit| ids.contains(&hit.component.id))
            .map(|hit| hit.component.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::{Category, Predicate};
    use serde_json::json;

    const SAMPLE: &str = r#"[
        {"id": "psu-650", "name": "650W", "category": "psu", "price": 79.0, "relevance": 0.5,
         "attributes": {"wattage_w": 650}},
        {"id": "psu-850", "name": "850W", "category": "psu", "price": 129.0, "relevance": 0.9,
         "attributes": {"wattage_w": 850}},
        {"id": "psu-1000", "name": "1000W", "category": "psu",
         "attributes": {"wattage_w": 1000}},
        {"id": "mb-1", "name": "B650", "category": "motherboard",
         "attributes": {"socket": "AM5", "ram_type": "DDR5", "form_factor": "ATX", "ram_slots": 4}}
    ]"#;

    #[tokio::test]
    async fn test_search_filters_and_orders() {
        let catalog = FileCatalog::from_json(SAMPLE).unwrap();
        assert_eq!(catalog.len(), 4);

        let query = CatalogQuery::new(Category::Psu, 10).with("wattage_w", Predicate::Min(700.0));
        let hits = catalog.search(&query).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.component.id.as_str()).collect();
        // psu-1000 has default relevance 1.0
        assert_eq!(ids, vec!["psu-1000", "psu-850"]);
    }

    #[tokio::test]
    async fn test_search_respects_limit_and_category() {
        let catalog = FileCatalog::from_json(SAMPLE).unwrap();
        let hits = catalog.search(&CatalogQuery::new(Category::Psu, 1)).await.unwrap();
        assert_eq!(hits.len(), 1);

        let boards = catalog
            .search(&CatalogQuery::new(Category::Motherboard, 10).with("socket", Predicate::Eq(json!("am5"))))
            .await
            .unwrap();
        assert_eq!(boards.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_skips_unknown_ids() {
        let catalog = FileCatalog::from_json(SAMPLE).unwrap();
        let found = catalog
            .fetch(&["mb-1".to_string(), "nope".to_string()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "mb-1");
    }

    #[test]
    fn test_malformed_entry_rejected() {
        let bad = r#"[{"id": "cpu-1", "category": "cpu", "attributes": {"socket": "AM5"}}]"#;
        assert!(FileCatalog::from_json(bad).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, SAMPLE).unwrap();
        assert_eq!(FileCatalog::load(&path).unwrap().len(), 4);
    }
}
