//! Regression baselines.
//!
//! Results are reduced to a canonical JSON form and hashed; the first run for
//! a tool persists that form as the baseline, later runs are compared
//! structurally against it:
//! - `canonical`: canonical form and SHA-256 hash
//! - `compare`: field-aware structural diff with tolerances
//! - `engine`: load/compare/persist with per-tool write locking
//! - `suite`: runs several tools and aggregates a `RegressionReport`

pub mod canonical;
pub mod compare;
pub mod engine;
pub mod suite;

pub use canonical::{canonical_hash, canonicalize};
pub use compare::diff;
pub use engine::RegressionEngine;
pub use suite::{RegressionReport, RegressionSuite, Tool};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub tool: String,
    pub hash: String,
    pub created_at: DateTime<Utc>,
    pub result: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Pass,
    Warning,
    Fail,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Pass => write!(f, "pass"),
            Severity::Warning => write!(f, "warning"),
            Severity::Fail => write!(f, "fail"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pass,
    Warning,
    Fail,
    BaselineCreated,
}

impl From<Severity> for Status {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Pass => Status::Pass,
            Severity::Warning => Status::Warning,
            Severity::Fail => Status::Fail,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Pass => write!(f, "pass"),
            Status::Warning => write!(f, "warning"),
            Status::Fail => write!(f, "fail"),
            Status::BaselineCreated => write!(f, "baseline_created"),
        }
    }
}

/// One human-readable finding, addressed by a JSON path such as `top_plans[0].symbol`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Difference {
    pub path: String,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionComparison {
    pub tool: String,
    pub status: Status,
    pub new_hash: String,
    pub baseline_hash: Option<String>,
    pub differences: Vec<Difference>,
}

/// Worst severity in `differences`; `Pass` when empty.
pub fn worst_severity(differences: &[Difference]) -> Severity {
    differences
        .iter()
        .map(|d| d.severity)
        .max()
        .unwrap_or(Severity::Pass)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToleranceConfig {
    /// Array fields compared by length; deltas within `count_tolerance` pass.
    pub count_fields: Vec<String>,
    pub count_tolerance: usize,
    /// Paths whose change is a failure.
    pub identity_fields: Vec<String>,
    /// Relative drift allowed on numbers before a warning.
    pub numeric_tolerance: f64,
    /// Keys dropped before hashing and comparison.
    pub volatile_fields: Vec<String>,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            count_fields: ["signals", "top_plans", "matches", "qualified_trades"]
                .map(String::from)
                .to_vec(),
            count_tolerance: 2,
            identity_fields: ["winner.symbol", "selected_symbol", "top_plans[0].symbol"]
                .map(String::from)
                .to_vec(),
            numeric_tolerance: 1e-6,
            volatile_fields: ["elapsed_ms", "generated_at"].map(String::from).to_vec(),
        }
    }
}

impl ToleranceConfig {
    pub fn is_count_field(&self, key: &str) -> bool {
        self.count_fields.iter().any(|f| f == key)
    }

    pub fn is_identity_field(&self, path: &str) -> bool {
        self.identity_fields.iter().any(|f| f == path)
    }

    /// True when `path` is an identity field or an ancestor of one.
    pub fn guards_identity(&self, path: &str) -> bool {
        self.identity_fields.iter().any(|f| {
            f == path
                || path.is_empty()
                || f.strip_prefix(path)
                    .is_some_and(|rest| rest.starts_with('.') || rest.starts_with('['))
        })
    }

    pub fn is_volatile(&self, key: &str) -> bool {
        self.volatile_fields.iter().any(|f| f == key)
    }
}
