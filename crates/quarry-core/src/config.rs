//! Engine configuration.
//!
//! Loaded from JSON (or built in code) and validated before a run.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Run projection pushdown before pulling the plan.
    pub optimize: bool,
    /// Stop pulling after this many batches. `None` drains the plan.
    pub max_batches: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            optimize: true,
            max_batches: None,
        }
    }
}

impl EngineConfig {
    /// Parse a JSON document; missing keys take their defaults.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let cfg: EngineConfig =
            serde_json::from_str(s).map_err(|e| Error::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_batches == Some(0) {
            return Err(Error::Config(
                "max_batches must be at least 1 (omit it to drain the plan)".into(),
            ));
        }
        Ok(())
    }
}
