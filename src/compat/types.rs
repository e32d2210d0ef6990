//! Type definitions for the compatibility rule engine.
//!
//! Issues are value objects: they serialize to the wire shape consumed by
//! the storefront and compare by value so re-validation can be checked for
//! equality.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::types::Category;

/// How serious a detected violation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Blocks checkout.
    Error,
    /// Advisory only.
    Warning,
}

/// Closed, versioned enumeration of rule families.
///
/// Adding a rule adds a variant; consumers that ignore unknown strings keep
/// working.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    SocketMismatch,
    RamTypeMismatch,
    TooManyRamModules,
    GpuTooLong,
    GpuTightFit,
    CoolerTooTall,
    FormFactorMismatch,
    MissingPsu,
    PsuInsufficient,
    PsuInsufficientForGpu,
    PsuLowHeadroom,
}

impl IssueType {
    pub const ALL: [IssueType; 11] = [
        IssueType::SocketMismatch,
        IssueType::RamTypeMismatch,
        IssueType::TooManyRamModules,
        IssueType::GpuTooLong,
        IssueType::GpuTightFit,
        IssueType::CoolerTooTall,
        IssueType::FormFactorMismatch,
        IssueType::MissingPsu,
        IssueType::PsuInsufficient,
        IssueType::PsuInsufficientForGpu,
        IssueType::PsuLowHeadroom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::SocketMismatch => "socket_mismatch",
            IssueType::RamTypeMismatch => "ram_type_mismatch",
            IssueType::TooManyRamModules => "too_many_ram_modules",
            IssueType::GpuTooLong => "gpu_too_long",
            IssueType::GpuTightFit => "gpu_tight_fit",
            IssueType::CoolerTooTall => "cooler_too_tall",
            IssueType::FormFactorMismatch => "form_factor_mismatch",
            IssueType::MissingPsu => "missing_psu",
            IssueType::PsuInsufficient => "psu_insufficient",
            IssueType::PsuInsufficientForGpu => "psu_insufficient_for_gpu",
            IssueType::PsuLowHeadroom => "psu_low_headroom",
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected compatibility violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub issue_type: IssueType,
    pub severity: Severity,
    /// Id of the first component involved
    pub component1: String,
    /// Id of the second component, if the violation is between two parts
    pub component2: Option<String>,
    pub category1: Category,
    pub category2: Option<Category>,
    /// Human-readable explanation
    pub message: String,
    /// What the user could do about it
    pub suggestion: Option<String>,
}

/// Validation output split by severity, each half in validator order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
}

impl ValidationReport {
    pub fn from_issues(issues: Vec<Issue>) -> Self {
        let (errors, warnings) = issues
            .into_iter()
            .partition(|i| i.severity == Severity::Error);
        Self { errors, warnings }
    }

    pub fn is_compatible(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Issue> {
        self.errors.iter().chain(self.warnings.iter())
    }
}

/// Description of one rule for the `/rules` listing.
#[derive(Debug, Clone, Serialize)]
pub struct RuleInfo {
    pub issue_type: IssueType,
    pub severity: Severity,
    pub categories: Vec<Category>,
    pub targets: Vec<Category>,
    pub description: &'static str,
    pub preferred_target: Option<Category>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(issue_type: IssueType, severity: Severity) -> Issue {
        Issue {
            issue_type,
            severity,
            component1: "a".to_string(),
            component2: Some("b".to_string()),
            category1: Category::Cpu,
            category2: Some(Category::Motherboard),
            message: "msg".to_string(),
            suggestion: None,
        }
    }

    #[test]
    fn test_issue_wire_shape() {
        let json = serde_json::to_value(issue(IssueType::SocketMismatch, Severity::Error)).unwrap();
        assert_eq!(json["issue_type"], "socket_mismatch");
        assert_eq!(json["severity"], "error");
        assert_eq!(json["component2"], "b");
        assert!(json["suggestion"].is_null());
    }

    #[test]
    fn test_issue_type_strings_match_serde() {
        for t in IssueType::ALL {
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t.as_str()));
        }
    }

    #[test]
    fn test_report_partitions_by_severity() {
        let report = ValidationReport::from_issues(vec![
            issue(IssueType::SocketMismatch, Severity::Error),
            issue(IssueType::GpuTightFit, Severity::Warning),
        ]);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.warnings.len(), 1);
        assert!(!report.is_compatible());
        assert_eq!(report.iter().count(), 2);
    }
}
