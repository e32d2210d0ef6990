//! Build compatibility rule engine.
//!
//! This module decides whether the parts in a build work together and
//! explains every violation it finds.
//!
//! # Architecture
//!
//! - **Rules**: a static catalog, one rule per issue type, built at compile time
//! - **Policy**: numeric thresholds and replacement preferences loaded from TOML
//! - **Validation**: build -> sorted issues, with precedence between overlapping rules
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use rigcheck::compat::{default_policy, Validator};
//!
//! let validator = Validator::new(Arc::new(default_policy()));
//! let report = validator.report(&build);
//!
//! for issue in &report.errors {
//!     println!("{}: {}", issue.issue_type, issue.message);
//! }
//! ```

mod engine;
mod policy;
mod rules;
mod types;

pub use engine::Validator;
pub use policy::{default_policy, load_policy, Policy, ResolverSettings, Thresholds};
pub use rules::{estimated_draw, rule_for, Rule, RULES};
pub use types::*;
