//! Server settings.
//!
//! Read from the TOML file named by `RIGCHECK_CONFIG` (all fields optional),
//! then overridden field by field from `RIGCHECK_*` environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use crate::catalog::client::HttpCatalogClient;
use crate::catalog::file::FileCatalog;
use crate::catalog::CatalogSource;
use crate::compat::{default_policy, load_policy, Policy};

pub const CONFIG_ENV: &str = "RIGCHECK_CONFIG";
const BIND_ENV: &str = "RIGCHECK_BIND";
const CATALOG_URL_ENV: &str = "RIGCHECK_CATALOG_URL";
const CATALOG_FILE_ENV: &str = "RIGCHECK_CATALOG_FILE";
const CACHE_DIR_ENV: &str = "RIGCHECK_CACHE_DIR";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Address the API listens on
    pub bind: String,
    /// Base URL of the catalog search service
    pub catalog_url: Option<String>,
    /// JSON catalog file, used when no URL is set
    pub catalog_file: Option<PathBuf>,
    /// Directory for the search cache database
    pub cache_dir: Option<PathBuf>,
    /// Policy override; the embedded policy is used otherwise
    pub policy_file: Option<PathBuf>,
    pub catalog_connect_timeout_ms: u64,
    pub catalog_request_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            catalog_url: None,
            catalog_file: None,
            cache_dir: None,
            policy_file: None,
            catalog_connect_timeout_ms: 2_000,
            catalog_request_timeout_ms: 5_000,
        }
    }
}

impl Settings {
    /// Load settings from the process environment.
    pub fn load() -> Result<Self> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Load settings with an explicit variable lookup.
    pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut settings = match lookup(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };

        if let Some(bind) = lookup(BIND_ENV) {
            settings.bind = bind;
        }
        if let Some(url) = lookup(CATALOG_URL_ENV) {
            settings.catalog_url = Some(url);
        }
        if let Some(file) = lookup(CATALOG_FILE_ENV) {
            settings.catalog_file = Some(PathBuf::from(file));
        }
        if let Some(dir) = lookup(CACHE_DIR_ENV) {
            settings.cache_dir = Some(PathBuf::from(dir));
        }
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Invalid settings TOML in {:?}", path))
    }

    /// Directory for the search cache: configured, or the user cache dir.
    pub fn cache_dir(&self) -> Option<PathBuf> {
        self.cache_dir
            .clone()
            .or_else(|| dirs::cache_dir().map(|d| d.join("rigcheck")))
    }

    /// The policy in effect, checked for consistency.
    pub fn policy(&self) -> Result<Policy> {
        let policy = match &self.policy_file {
            Some(path) => {
                info!("Loading policy from {:?}", path);
                load_policy(path)?
            }
            None => default_policy(),
        };
        policy.check()?;
        Ok(policy)
    }

    /// The configured catalog backend. A URL wins over a file.
    pub fn catalog_source(&self) -> Result<CatalogSource> {
        match (&self.catalog_url, &self.catalog_file) {
            (Some(url), file) => {
                if file.is_some() {
                    warn!("Both catalog_url and catalog_file are set; using {}", url);
                }
                let client = HttpCatalogClient::new(
                    url,
                    Duration::from_millis(self.catalog_connect_timeout_ms),
                    Duration::from_millis(self.catalog_request_timeout_ms),
                )?;
                info!("Using catalog service at {}", client.base_url());
                Ok(CatalogSource::Http(client))
            }
            (None, Some(path)) => Ok(CatalogSource::File(FileCatalog::load(path)?)),
            (None, None) => bail!(
                "No catalog configured; set {} or {}",
                CATALOG_URL_ENV,
                CATALOG_FILE_ENV
            ),
        }
    }
}
