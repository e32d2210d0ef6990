//! Alternative resolver.
//!
//! Given one issue and the build it was found in, pick the category to
//! replace, ask the catalog for parts that fit the rest of the build, and
//! keep only the parts that actually clear the issue once swapped in.
//!
//! The catalog query narrows the search; re-validation decides. A candidate
//! is returned only if, swapped into the build:
//!
//! - the issue's type no longer fires
//! - no error type appears that the build did not already have

mod cancel;
mod constraints;
mod ranking;

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::build::{apply_swap, BuildState};
use crate::catalog::types::{CatalogHit, Category, Component};
use crate::catalog::CatalogClient;
use crate::compat::{rule_for, Issue, IssueType, Severity, Validator};
use crate::error::{EngineError, EngineResult};

pub use cancel::CancelToken;
pub use constraints::derive_query;
pub use ranking::rank;

/// A replacement part for the target category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeCandidate {
    pub component: Component,
    /// Fraction of applicable rule checks on the target that pass with this part
    pub fit_score: f64,
    /// Number of those passing checks
    pub constraints_satisfied: usize,
    /// Catalog relevance score
    pub relevance: f64,
}

/// Result of resolving one issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolveOutcome {
    pub target: Category,
    pub candidates: Vec<AlternativeCandidate>,
    /// The catalog failed or timed out; `candidates` is empty but that says
    /// nothing about whether alternatives exist.
    pub degraded: bool,
}

impl ResolveOutcome {
    pub fn degraded(target: Category) -> Self {
        Self {
            target,
            candidates: Vec::new(),
            degraded: true,
        }
    }
}

/// One entry of a batch resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueResolution {
    pub issue: Issue,
    #[serde(flatten)]
    pub outcome: ResolveOutcome,
}

/// Finds replacement parts through a catalog client.
///
/// Holds no mutable state; concurrent calls are independent.
pub struct Resolver<C> {
    catalog: C,
    validator: Arc<Validator>,
}

impl<C: CatalogClient> Resolver<C> {
    pub fn new(catalog: C, validator: Arc<Validator>) -> Self {
        Self { catalog, validator }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// The category to replace for an issue.
    ///
    /// An explicit target must be one of the categories the issue's rule can
    /// be resolved through. Without one, the policy's preferred target is used.
    pub fn choose_target(&self, issue_type: IssueType, requested: Option<Category>) -> EngineResult<Category> {
        let rule = rule_for(issue_type).ok_or_else(|| {
            EngineError::Configuration(format!("No rule is registered for '{}'", issue_type))
        })?;
        match requested {
            Some(target) if rule.targets.contains(&target) => Ok(target),
            Some(target) => Err(EngineError::Configuration(format!(
                "Cannot resolve '{}' by replacing the {}; choose one of: {}",
                issue_type,
                target.label(),
                rule.targets
                    .iter()
                    .map(Category::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            ))),
            None => self.validator.policy().preferred_target(issue_type).ok_or_else(|| {
                EngineError::Configuration(format!(
                    "No preferred target configured for '{}'; pass a target explicitly",
                    issue_type
                ))
            }),
        }
    }

    /// Find replacements that clear `issue` in `build`.
    ///
    /// Catalog failures and timeouts give a degraded, empty outcome. A
    /// cancelled token gives `EngineError::Cancelled`.
    pub async fn resolve(
        &self,
        issue: &Issue,
        build: &BuildState,
        target: Option<Category>,
        limit: Option<usize>,
        cancel: &CancelToken,
    ) -> EngineResult<ResolveOutcome> {
        let target = self.choose_target(issue.issue_type, target)?;
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let policy = self.validator.policy();
        let settings = &policy.resolver;
        let query = derive_query(
            issue.issue_type,
            target,
            build,
            &policy.thresholds,
            settings.search_limit,
        );
        info!("Resolving {} by replacing {}: {}", issue.issue_type, target, query.signature());

        let search = tokio::time::timeout(settings.timeout(), self.catalog.search(&query));
        let hits = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Resolution of {} cancelled", issue.issue_type);
                return Err(EngineError::Cancelled);
            }
            result = search => match result {
                Ok(Ok(hits)) => hits,
                Ok(Err(EngineError::CatalogUnavailable(reason))) => {
                    warn!("Catalog unavailable while resolving {}: {}", issue.issue_type, reason);
                    return Ok(ResolveOutcome::degraded(target));
                }
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    warn!(
                        "Catalog search for {} timed out after {:?}",
                        issue.issue_type,
                        settings.timeout()
                    );
                    return Ok(ResolveOutcome::degraded(target));
                }
            },
        };

        let total = hits.len();
        let candidates = self.screen(issue, build, target, hits);
        let mut candidates = rank(candidates);
        let kept = candidates.len();
        candidates.truncate(settings.page_limit(limit));
        info!(
            "Resolved {}: {} of {} catalog hits kept, returning {}",
            issue.issue_type,
            kept,
            total,
            candidates.len()
        );

        Ok(ResolveOutcome {
            target,
            candidates,
            degraded: false,
        })
    }

    /// Swap each hit in and keep those that clear the issue without
    /// introducing a new error type.
    fn screen(
        &self,
        issue: &Issue,
        build: &BuildState,
        target: Category,
        hits: Vec<CatalogHit>,
    ) -> Vec<AlternativeCandidate> {
        let baseline_errors: HashSet<IssueType> = self
            .validator
            .validate(build)
            .into_iter()
            .filter(|i| i.severity == Severity::Error)
            .map(|i| i.issue_type)
            .collect();
        let current = build.part(target).map(|c| c.id.clone());

        hits.into_iter()
            .filter_map(|hit| {
                if current.as_deref() == Some(hit.component.id.as_str()) {
                    return None;
                }
                let swapped = match apply_swap(build, target, hit.component.clone()) {
                    Ok(swapped) => swapped,
                    Err(e) => {
                        debug!("Skipping catalog hit '{}': {}", hit.component.id, e);
                        return None;
                    }
                };
                let issues = self.validator.validate(&swapped);
                if issues.iter().any(|i| i.issue_type == issue.issue_type) {
                    return None;
                }
                if issues
                    .iter()
                    .any(|i| i.severity == Severity::Error && !baseline_errors.contains(&i.issue_type))
                {
                    debug!("Skipping '{}': introduces a new error", hit.component.id);
                    return None;
                }

                let (satisfied, applicable) = self.validator.constraints_on(&swapped, target);
                let fit_score = if applicable == 0 {
                    1.0
                } else {
                    satisfied as f64 / applicable as f64
                };
                Some(AlternativeCandidate {
                    component: hit.component,
                    fit_score,
                    constraints_satisfied: satisfied,
                    relevance: hit.relevance,
                })
            })
            .collect()
    }

    /// Validate `build` and resolve every issue concurrently.
    ///
    /// Each issue is resolved under its own timeout; a failure on one issue
    /// degrades that entry only. Cancellation aborts the whole batch.
    pub async fn resolve_all(
        &self,
        build: &BuildState,
        limit: Option<usize>,
        cancel: &CancelToken,
    ) -> EngineResult<Vec<IssueResolution>> {
        let issues = self.validator.validate(build);
        info!("Resolving {} issues in batch", issues.len());

        let outcomes = join_all(
            issues
                .iter()
                .map(|issue| self.resolve(issue, build, None, limit, cancel)),
        )
        .await;

        let mut resolutions = Vec::with_capacity(issues.len());
        for (issue, outcome) in issues.into_iter().zip(outcomes) {
            let outcome = match outcome {
                Ok(outcome) => outcome,
                Err(EngineError::Cancelled) => return Err(EngineError::Cancelled),
                Err(e) => {
                    warn!("Could not resolve {}: {}", issue.issue_type, e);
                    let target = self
                        .validator
                        .policy()
                        .preferred_target(issue.issue_type)
                        .unwrap_or(issue.category1);
                    ResolveOutcome::degraded(target)
                }
            };
            resolutions.push(IssueResolution { issue, outcome });
        }
        Ok(resolutions)
    }
}
