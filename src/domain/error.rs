//! Domain error types.

use serde::{Deserialize, Serialize};

/// Top-level error type for swingscan.
#[derive(Debug, thiserror::Error)]
pub enum SwingscanError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("insufficient data: have {bars} bars, need {required}")]
    InsufficientData { bars: usize, required: usize },

    #[error("invalid bar sequence: {reason}")]
    InvalidBars { reason: String },

    #[error("fetch failed for {symbol}: {reason}")]
    Fetch { symbol: String, reason: String },

    #[error("timed out after {millis} ms")]
    Timeout { millis: u64 },

    #[error("baseline store error: {reason}")]
    Baseline { reason: String },

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SwingscanError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        SwingscanError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn is_config(&self) -> bool {
        matches!(
            self,
            SwingscanError::ConfigParse { .. }
                | SwingscanError::ConfigMissing { .. }
                | SwingscanError::ConfigInvalid { .. }
        )
    }
}

impl From<&SwingscanError> for std::process::ExitCode {
    fn from(err: &SwingscanError) -> Self {
        let code: u8 = match err {
            SwingscanError::Io(_) | SwingscanError::Serialization(_) => 1,
            SwingscanError::ConfigParse { .. }
            | SwingscanError::ConfigMissing { .. }
            | SwingscanError::ConfigInvalid { .. } => 2,
            SwingscanError::Baseline { .. } => 3,
            SwingscanError::Fetch { .. } | SwingscanError::Timeout { .. } => 4,
            SwingscanError::InsufficientData { .. } | SwingscanError::InvalidBars { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

/// Per-symbol failure recorded in a scan result. Never aborts the scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SymbolError {
    Fetch { reason: String },
    InsufficientData { bars: usize, required: usize },
    InvalidBars { reason: String },
    Timeout,
    Failed { reason: String },
}

impl From<SwingscanError> for SymbolError {
    fn from(err: SwingscanError) -> Self {
        match err {
            SwingscanError::Fetch { reason, .. } => SymbolError::Fetch { reason },
            SwingscanError::InsufficientData { bars, required } => {
                SymbolError::InsufficientData { bars, required }
            }
            SwingscanError::InvalidBars { reason } => SymbolError::InvalidBars { reason },
            SwingscanError::Timeout { .. } => SymbolError::Timeout,
            other => SymbolError::Failed {
                reason: other.to_string(),
            },
        }
    }
}

impl std::fmt::Display for SymbolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SymbolError::Fetch { reason } => write!(f, "fetch error: {reason}"),
            SymbolError::InsufficientData { bars, required } => {
                write!(f, "insufficient data: have {bars} bars, need {required}")
            }
            SymbolError::InvalidBars { reason } => write!(f, "invalid bars: {reason}"),
            SymbolError::Timeout => write!(f, "timeout"),
            SymbolError::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::ExitCode;

    #[test]
    fn config_errors_map_to_exit_code_two() {
        let err = SwingscanError::invalid("risk", "min_rr_ratio", "must be positive");
        assert!(err.is_config());
        assert_eq!(
            format!("{:?}", ExitCode::from(&err)),
            format!("{:?}", ExitCode::from(2))
        );
    }

    #[test]
    fn insufficient_data_message() {
        let err = SwingscanError::InsufficientData {
            bars: 10,
            required: 50,
        };
        assert_eq!(err.to_string(), "insufficient data: have 10 bars, need 50");
        assert!(!err.is_config());
    }

    #[test]
    fn fetch_error_becomes_symbol_fetch() {
        let err = SwingscanError::Fetch {
            symbol: "AAPL".into(),
            reason: "connection reset".into(),
        };
        assert_eq!(
            SymbolError::from(err),
            SymbolError::Fetch {
                reason: "connection reset".into()
            }
        );
    }

    #[test]
    fn timeout_is_distinct_from_fetch() {
        let err = SwingscanError::Timeout { millis: 500 };
        assert_eq!(SymbolError::from(err), SymbolError::Timeout);
    }

    #[test]
    fn symbol_error_serializes_tagged() {
        let json = serde_json::to_string(&SymbolError::Timeout).unwrap();
        assert_eq!(json, r#"{"kind":"timeout"}"#);
        let json = serde_json::to_string(&SymbolError::Fetch {
            reason: "404".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"kind":"fetch","reason":"404"}"#);
    }
}
