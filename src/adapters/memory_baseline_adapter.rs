//! In-process baseline store, for tests and dry runs.

use crate::domain::error::SwingscanError;
use crate::domain::regression::Baseline;
use crate::ports::baseline_port::{BaselineStore, validate_tool_id};
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

#[derive(Default)]
pub struct MemoryBaselineStore {
    baselines: Mutex<BTreeMap<String, Baseline>>,
}

impl MemoryBaselineStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BaselineStore for MemoryBaselineStore {
    fn load(&self, tool: &str) -> Result<Option<Baseline>, SwingscanError> {
        validate_tool_id(tool)?;
        let map = self.baselines.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(map.get(tool).cloned())
    }

    fn save(&self, baseline: &Baseline) -> Result<(), SwingscanError> {
        validate_tool_id(&baseline.tool)?;
        let mut map = self.baselines.lock().unwrap_or_else(PoisonError::into_inner);
        map.insert(baseline.tool.clone(), baseline.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>, SwingscanError> {
        let map = self.baselines.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(map.keys().cloned().collect())
    }
}
