//! JSON file baseline store: one `<dir>/<tool>_baseline.json` per tool id.

use crate::domain::error::SwingscanError;
use crate::domain::regression::Baseline;
use crate::ports::baseline_port::{BaselineStore, validate_tool_id};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

const SUFFIX: &str = "_baseline.json";

pub struct FileBaselineStore {
    dir: PathBuf,
}

impl FileBaselineStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn path_for(&self, tool: &str) -> PathBuf {
        self.dir.join(format!("{tool}{SUFFIX}"))
    }
}

impl BaselineStore for FileBaselineStore {
    fn load(&self, tool: &str) -> Result<Option<Baseline>, SwingscanError> {
        validate_tool_id(tool)?;
        let path = self.path_for(tool);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SwingscanError::Baseline {
                    reason: format!("failed to read {}: {e}", path.display()),
                });
            }
        };
        let baseline = serde_json::from_str(&content).map_err(|e| SwingscanError::Baseline {
            reason: format!("corrupt baseline {}: {e}", path.display()),
        })?;
        Ok(Some(baseline))
    }

    fn save(&self, baseline: &Baseline) -> Result<(), SwingscanError> {
        validate_tool_id(&baseline.tool)?;
        fs::create_dir_all(&self.dir).map_err(|e| SwingscanError::Baseline {
            reason: format!("failed to create {}: {e}", self.dir.display()),
        })?;

        // readers never observe a partially written baseline
        let path = self.path_for(&baseline.tool);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(baseline)?;
        fs::write(&tmp, json).map_err(|e| SwingscanError::Baseline {
            reason: format!("failed to write {}: {e}", tmp.display()),
        })?;
        fs::rename(&tmp, &path).map_err(|e| SwingscanError::Baseline {
            reason: format!("failed to replace {}: {e}", path.display()),
        })?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>, SwingscanError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut tools = Vec::new();
        for entry in entries {
            let name = entry?.file_name();
            if let Some(tool) = name.to_string_lossy().strip_suffix(SUFFIX) {
                tools.push(tool.to_string());
            }
        }
        tools.sort();
        Ok(tools)
    }
}
