//! Symbol universe parsing and validation.
//!
//! A universe is an ordered list of distinct, non-empty symbols. Lists come
//! from the `[scan] symbols` key, the `--symbols` flag, or the data port's
//! listing.

use crate::domain::error::SwingscanError;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),
}

impl From<UniverseError> for SwingscanError {
    fn from(err: UniverseError) -> Self {
        SwingscanError::invalid("scan", "symbols", err.to_string())
    }
}

/// Split a comma-separated list into trimmed, upper-cased symbols.
pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    let symbols: Vec<String> = input
        .split(',')
        .map(|token| token.trim().to_uppercase())
        .collect();
    validate_symbols(&symbols)?;
    Ok(symbols)
}

pub fn validate_symbols(symbols: &[String]) -> Result<(), UniverseError> {
    let mut seen = HashSet::new();
    for symbol in symbols {
        if symbol.trim().is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        if !seen.insert(symbol.as_str()) {
            return Err(UniverseError::DuplicateSymbol(symbol.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_symbols_basic() {
        let result = parse_symbols("AAPL,MSFT,NVDA").unwrap();
        assert_eq!(result, vec!["AAPL", "MSFT", "NVDA"]);
    }

    #[test]
    fn test_parse_symbols_trims_and_uppercases() {
        let result = parse_symbols("  aapl , msft ,Nvda").unwrap();
        assert_eq!(result, vec!["AAPL", "MSFT", "NVDA"]);
    }

    #[test]
    fn test_parse_symbols_empty_token() {
        assert_eq!(parse_symbols("AAPL,,MSFT"), Err(UniverseError::EmptyToken));
        assert_eq!(parse_symbols(""), Err(UniverseError::EmptyToken));
    }

    #[test]
    fn test_parse_symbols_duplicate_after_normalizing() {
        let result = parse_symbols("AAPL,msft,aapl");
        assert!(matches!(result, Err(UniverseError::DuplicateSymbol(s)) if s == "AAPL"));
    }

    #[test]
    fn test_validate_symbols_is_config_error() {
        let symbols = vec!["A".to_string(), "A".to_string()];
        let err: SwingscanError = validate_symbols(&symbols).unwrap_err().into();
        assert!(err.is_config());
        assert!(validate_symbols(&[]).is_ok());
    }
}
