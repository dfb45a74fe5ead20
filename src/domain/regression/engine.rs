//! Baseline comparison engine.

use crate::domain::error::SwingscanError;
use crate::domain::regression::canonical::{canonicalize, hash_canonical};
use crate::domain::regression::compare::diff;
use crate::domain::regression::{
    Baseline, RegressionComparison, Status, ToleranceConfig, worst_severity,
};
use crate::ports::baseline_port::{BaselineStore, validate_tool_id};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

pub struct RegressionEngine {
    store: Arc<dyn BaselineStore>,
    tolerance: ToleranceConfig,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RegressionEngine {
    pub fn new(store: Arc<dyn BaselineStore>, tolerance: ToleranceConfig) -> Self {
        Self {
            store,
            tolerance,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn tolerance(&self) -> &ToleranceConfig {
        &self.tolerance
    }

    pub fn store(&self) -> &Arc<dyn BaselineStore> {
        &self.store
    }

    fn lock_for(&self, tool: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(tool.to_string()).or_default().clone()
    }

    /// Canonical SHA-256 of `result` under this engine's volatile-field set.
    pub fn hash<T: Serialize + ?Sized>(&self, result: &T) -> Result<String, SwingscanError> {
        Ok(self.canonical(result)?.1)
    }

    fn canonical<T: Serialize + ?Sized>(
        &self,
        result: &T,
    ) -> Result<(serde_json::Value, String), SwingscanError> {
        let value = serde_json::to_value(result)?;
        let canonical = canonicalize(&value, &self.tolerance.volatile_fields);
        let hash = hash_canonical(&canonical)?;
        Ok((canonical, hash))
    }

    /// Compare `result` against the stored baseline for `tool`, creating the
    /// baseline when none exists. An existing baseline is never overwritten.
    pub fn compare<T: Serialize + ?Sized>(
        &self,
        tool: &str,
        result: &T,
    ) -> Result<RegressionComparison, SwingscanError> {
        validate_tool_id(tool)?;
        let (canonical, new_hash) = self.canonical(result)?;

        let lock = self.lock_for(tool);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let Some(baseline) = self.store.load(tool)? else {
            self.store.save(&Baseline {
                tool: tool.to_string(),
                hash: new_hash.clone(),
                created_at: Utc::now(),
                result: canonical,
            })?;
            tracing::info!(tool, hash = %new_hash, "baseline created");
            return Ok(RegressionComparison {
                tool: tool.to_string(),
                status: Status::BaselineCreated,
                new_hash,
                baseline_hash: None,
                differences: Vec::new(),
            });
        };

        let differences = if baseline.hash == new_hash {
            Vec::new()
        } else {
            // stored results may predate a change to the volatile-field set
            let stored = canonicalize(&baseline.result, &self.tolerance.volatile_fields);
            diff(&stored, &canonical, &self.tolerance)
        };
        let status = Status::from(worst_severity(&differences));

        match status {
            Status::Pass => tracing::info!(tool, "matches baseline"),
            _ => tracing::warn!(
                tool,
                %status,
                differences = differences.len(),
                "regression against baseline"
            ),
        }

        Ok(RegressionComparison {
            tool: tool.to_string(),
            status,
            new_hash,
            baseline_hash: Some(baseline.hash),
            differences,
        })
    }

    /// Overwrite the baseline for `tool` with `result`.
    pub fn refresh<T: Serialize + ?Sized>(
        &self,
        tool: &str,
        result: &T,
    ) -> Result<Baseline, SwingscanError> {
        validate_tool_id(tool)?;
        let (canonical, hash) = self.canonical(result)?;

        let lock = self.lock_for(tool);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let baseline = Baseline {
            tool: tool.to_string(),
            hash,
            created_at: Utc::now(),
            result: canonical,
        };
        self.store.save(&baseline)?;
        tracing::info!(tool, hash = %baseline.hash, "baseline refreshed");
        Ok(baseline)
    }
}
