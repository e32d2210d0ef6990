use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// Malformed or internally inconsistent build snapshot or configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("Resolution cancelled")]
    Cancelled,

    /// The local search cache could not be read or written.
    #[error("Cache storage error: {0}")]
    Storage(String),
}

impl EngineError {
    /// Stable machine-readable kind for API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Configuration(_) => "configuration_error",
            EngineError::CatalogUnavailable(_) => "catalog_unavailable",
            EngineError::Cancelled => "cancelled",
            EngineError::Storage(_) => "storage_error",
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
