//! Rule evaluation engine for build compatibility.
//!
//! The `Validator` runs every rule in the catalog against a build, drops
//! issues superseded by a more specific one, and sorts the rest into a
//! deterministic order.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::build::BuildState;
use crate::catalog::types::Category;

use super::policy::Policy;
use super::rules::{Rule, RULES};
use super::types::*;

/// `(winner, loser)`: when both fire for the same component pair, only the
/// winner is reported.
const PRECEDENCE: &[(IssueType, IssueType)] =
    &[(IssueType::PsuInsufficientForGpu, IssueType::PsuInsufficient)];

/// The compatibility validator.
///
/// Pure and synchronous; safe to share across sessions behind an `Arc`.
pub struct Validator {
    policy: Arc<Policy>,
    rules: Vec<&'static Rule>,
}

impl Validator {
    /// Create a validator over the full rule catalog.
    pub fn new(policy: Arc<Policy>) -> Self {
        Self::with_rules(policy, RULES.iter().collect())
    }

    /// Create a validator over an explicit rule list.
    pub fn with_rules(policy: Arc<Policy>, rules: Vec<&'static Rule>) -> Self {
        Self { policy, rules }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn rules(&self) -> &[&'static Rule] {
        &self.rules
    }

    /// Evaluate every rule against the build.
    ///
    /// # Returns
    /// Issues sorted by severity (errors first), then issue type, then the
    /// categories involved. Identical builds always give identical lists.
    pub fn validate(&self, build: &BuildState) -> Vec<Issue> {
        let mut issues: Vec<Issue> = self
            .rules
            .iter()
            .filter_map(|rule| rule.evaluate(build, &self.policy.thresholds))
            .collect();

        apply_precedence(&mut issues);
        issues.sort_by(compare_issues);
        issues
    }

    /// Validate and split the result by severity.
    pub fn report(&self, build: &BuildState) -> ValidationReport {
        ValidationReport::from_issues(self.validate(build))
    }

    /// Describe the rule catalog, in issue-type order.
    pub fn describe_rules(&self) -> Vec<RuleInfo> {
        let mut infos: Vec<RuleInfo> = self
            .rules
            .iter()
            .map(|rule| rule.info(self.policy.preferred_target(rule.issue_type)))
            .collect();
        infos.sort_by(|a, b| a.issue_type.as_str().cmp(b.issue_type.as_str()));
        infos
    }

    /// How many applicable rule checks on `target` pass in this build.
    ///
    /// Returns `(satisfied, applicable)`.
    pub fn constraints_on(&self, build: &BuildState, target: Category) -> (usize, usize) {
        let mut satisfied = 0;
        let mut applicable = 0;
        for rule in self.rules.iter().filter(|r| r.applies_to(build, target)) {
            applicable += 1;
            if rule.evaluate(build, &self.policy.thresholds).is_none() {
                satisfied += 1;
            }
        }
        (satisfied, applicable)
    }
}

fn same_pair(a: &Issue, b: &Issue) -> bool {
    a.component1 == b.component1 && a.component2 == b.component2
}

fn apply_precedence(issues: &mut Vec<Issue>) {
    for (winner, loser) in PRECEDENCE {
        let winners: Vec<Issue> = issues
            .iter()
            .filter(|i| i.issue_type == *winner)
            .cloned()
            .collect();
        issues.retain(|i| i.issue_type != *loser || !winners.iter().any(|w| same_pair(w, i)));
    }
}

fn compare_issues(a: &Issue, b: &Issue) -> Ordering {
    a.severity
        .cmp(&b.severity)
        .then_with(|| a.issue_type.as_str().cmp(b.issue_type.as_str()))
        .then_with(|| a.category1.as_str().cmp(b.category1.as_str()))
        .then_with(|| {
            let a2 = a.category2.map(|c| c.as_str()).unwrap_or("");
            let b2 = b.category2.map(|c| c.as_str()).unwrap_or("");
            a2.cmp(b2)
        })
}
