//! Regression baseline persistence port.

use crate::domain::error::SwingscanError;
use crate::domain::regression::Baseline;

/// One baseline per tool id. Callers serialize writes per id.
pub trait BaselineStore: Send + Sync {
    fn load(&self, tool: &str) -> Result<Option<Baseline>, SwingscanError>;

    /// Create or overwrite the baseline for `baseline.tool`.
    fn save(&self, baseline: &Baseline) -> Result<(), SwingscanError>;

    /// Tool ids with a stored baseline, sorted.
    fn list(&self) -> Result<Vec<String>, SwingscanError>;
}

/// Tool ids end up in file names; keep them to `[A-Za-z0-9_-]`.
pub fn validate_tool_id(tool: &str) -> Result<(), SwingscanError> {
    if tool.is_empty()
        || !tool
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(SwingscanError::Baseline {
            reason: format!("invalid tool id '{tool}'"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_ids() {
        assert!(validate_tool_id("scan_universe").is_ok());
        assert!(validate_tool_id("analyze-AAPL").is_ok());
        assert!(validate_tool_id("").is_err());
        assert!(validate_tool_id("../etc").is_err());
    }
}
