//! TOML policy loading for the compatibility engine.
//!
//! Provides two loading methods:
//! - `default_policy()` - Loads the policy embedded in the binary
//! - `load_policy(path)` - Loads an override policy from a file path
//!
//! Every numeric threshold a rule uses lives here, so tuning the policy
//! never touches rule logic.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::rules::rule_for;
use super::types::IssueType;
use crate::catalog::types::Category;
use crate::error::{EngineError, EngineResult};

/// Default policy embedded in the binary at compile time.
/// Loaded from `config/policy.toml`.
const DEFAULT_POLICY: &str = include_str!("../../config/policy.toml");

/// Root policy configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub thresholds: Thresholds,
    pub resolver: ResolverSettings,
    /// issue_type -> category to replace by default
    #[serde(default)]
    pub preferred_targets: BTreeMap<String, Category>,
}

/// Rule thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Clearance below which a fitting GPU still gets a tight-fit warning
    pub gpu_clearance_mm: f64,
    /// PSU margin over estimated draw below which we warn
    pub psu_headroom_w: f64,
    /// Fixed allowance added to CPU + GPU TDP
    pub psu_overhead_w: f64,
}

/// Alternative resolver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverSettings {
    /// Candidates returned when the caller does not ask for a count
    pub page_size: usize,
    /// Hard cap on caller-requested counts
    pub max_page_size: usize,
    /// Raw candidates pulled from the catalog before filtering
    pub search_limit: usize,
    /// Per-issue timeout for catalog resolution
    pub timeout_ms: u64,
    /// TTL for cached catalog search results
    pub cache_ttl_secs: i64,
}

impl ResolverSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Effective page size for a caller request, clamped to `1..=max_page_size`.
    pub fn page_limit(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.page_size)
            .clamp(1, self.max_page_size.max(1))
    }
}

impl Policy {
    /// Preferred replacement target for an issue type.
    pub fn preferred_target(&self, issue_type: IssueType) -> Option<Category> {
        self.preferred_targets.get(issue_type.as_str()).copied()
    }

    /// Check the policy for internal consistency.
    ///
    /// Thresholds must be non-negative, the page sizes sane, every key of the
    /// preferred-target table a known issue type, and every target one of
    /// the categories that rule can be resolved through.
    pub fn check(&self) -> EngineResult<()> {
        let t = &self.thresholds;
        for (name, value) in [
            ("gpu_clearance_mm", t.gpu_clearance_mm),
            ("psu_headroom_w", t.psu_headroom_w),
            ("psu_overhead_w", t.psu_overhead_w),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(EngineError::Configuration(format!(
                    "Threshold '{}' must be a non-negative number, got {}",
                    name, value
                )));
            }
        }

        let r = &self.resolver;
        if r.page_size == 0 || r.max_page_size < r.page_size {
            return Err(EngineError::Configuration(format!(
                "Resolver page_size {} must be between 1 and max_page_size {}",
                r.page_size, r.max_page_size
            )));
        }
        if r.search_limit < r.max_page_size {
            return Err(EngineError::Configuration(format!(
                "Resolver search_limit {} is smaller than max_page_size {}",
                r.search_limit, r.max_page_size
            )));
        }

        for (key, target) in &self.preferred_targets {
            let issue_type = IssueType::ALL
                .iter()
                .copied()
                .find(|t| t.as_str() == key)
                .ok_or_else(|| {
                    EngineError::Configuration(format!("Unknown issue type '{}' in preferred_targets", key))
                })?;
            let resolvable = rule_for(issue_type)
                .map(|rule| rule.targets.contains(target))
                .unwrap_or(false);
            if !resolvable {
                return Err(EngineError::Configuration(format!(
                    "Preferred target '{}' for '{}' is not a category that rule can be resolved through",
                    target, key
                )));
            }
        }
        Ok(())
    }
}

/// Load a policy from a TOML file at the given path.
///
/// The file must be complete; it replaces the embedded policy rather than
/// merging with it.
pub fn load_policy(path: &Path) -> Result<Policy> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read policy file {:?}", path))?;
    let policy: Policy = toml::from_str(&content)
        .with_context(|| format!("Invalid policy TOML in {:?}", path))?;
    policy.check()?;
    Ok(policy)
}

/// Get the default policy embedded in the binary.
///
/// # Panics
/// Panics if the embedded TOML is invalid (this would be a compile-time bug).
pub fn default_policy() -> Policy {
    toml::from_str(DEFAULT_POLICY).expect("embedded policy.toml must be valid TOML")
}
