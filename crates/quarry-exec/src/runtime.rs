//! Runtime: optimize (optionally), pull the plan, emit a `RunManifest`.
//!
//! Execution is sequential and synchronous: the root is pulled until it
//! reports end-of-stream or `max_batches` batches have been produced.

use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;

use quarry_core::config::EngineConfig;
use quarry_core::types::Batch;
use quarry_operators::plan::Plan;
use quarry_operators::traits::OpError;
use quarry_planner::rules::optimize;

use crate::manifest::RunManifest;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("invalid config: {0}")]
    Config(String),
    #[error("optimize: {0}")]
    Optimize(#[source] OpError),
    #[error("execute (batch {batch}): {source}")]
    Execute {
        batch: u64,
        #[source]
        source: OpError,
    },
    #[error("hashing error: {0}")]
    Hash(String),
}

impl ExecError {
    /// Get suggestions for common errors.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            ExecError::Optimize(e) | ExecError::Execute { source: e, .. } => e.suggestions(),
            _ => vec![],
        }
    }
}

/// Batches produced by a run plus its manifest.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub batches: Vec<Batch>,
    pub manifest: RunManifest,
}

impl RunOutput {
    pub fn rows(&self) -> usize {
        self.batches.iter().map(Batch::len).sum()
    }
}

pub struct Engine {
    cfg: EngineConfig,
}

impl Engine {
    pub fn new(cfg: EngineConfig) -> Result<Self, ExecError> {
        cfg.validate().map_err(|e| ExecError::Config(e.to_string()))?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    /// Run a copy of `plan`; the caller's plan is neither optimized nor
    /// advanced.
    pub fn run(&self, plan: &Plan) -> Result<RunOutput, ExecError> {
        let plan_hash = plan
            .describe()
            .fingerprint()
            .map_err(|e| ExecError::Hash(e.to_string()))?;

        let mut exec = if self.cfg.optimize {
            optimize(plan).map_err(ExecError::Optimize)?
        } else {
            plan.clone()
        };
        let executed_plan_hash = exec
            .describe()
            .fingerprint()
            .map_err(|e| ExecError::Hash(e.to_string()))?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            optimized = self.cfg.optimize,
            plan = %plan_hash,
            executed = %executed_plan_hash,
            "starting run"
        );

        let mut manifest =
            RunManifest::new(plan_hash, executed_plan_hash, self.cfg.optimize, now_millis());
        let mut batches = Vec::new();
        let mut truncated = false;

        loop {
            if self.cfg.max_batches.map_or(false, |cap| manifest.batches >= cap) {
                truncated = true;
                break;
            }
            let next = exec.execute().map_err(|source| ExecError::Execute {
                batch: manifest.batches,
                source,
            })?;
            let Some(batch) = next else {
                break;
            };
            manifest.record_batch(batch.len());

            #[cfg(feature = "tracing")]
            tracing::trace!(batch = manifest.batches, rows = batch.len(), "pulled batch");

            batches.push(batch);
        }

        let manifest = manifest.finish(now_millis(), truncated);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            batches = manifest.batches,
            rows = manifest.rows,
            truncated = manifest.truncated,
            "run finished"
        );

        Ok(RunOutput { batches, manifest })
    }
}

/// Pull `plan` until end-of-stream and return every batch.
pub fn collect(plan: &mut Plan) -> Result<Vec<Batch>, OpError> {
    let mut out = Vec::new();
    while let Some(batch) = plan.execute()? {
        out.push(batch);
    }
    Ok(out)
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_core::expr::ExprArena;
    use quarry_core::projection::Projection;
    use quarry_operators::scan::Scan;
    use quarry_operators::select::Select;

    fn plan() -> Plan {
        let mut arena = ExprArena::new();
        let data = Batch::from_pairs([("id", vec![1, 2, 3, 4, 5]), ("v", vec![0; 5])]).unwrap();
        let scan = Scan::new(&mut arena, 2, data).unwrap();
        let id = arena.col("id");
        let select = Select::new(Box::new(scan), Projection::new().with("id", id));
        Plan::new(arena, Box::new(select))
    }

    #[test]
    fn run_drains_and_counts() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let p = plan();
        let out = engine.run(&p).unwrap();
        assert_eq!(out.batches.len(), 3);
        assert_eq!(out.manifest.batches, 3);
        assert_eq!(out.manifest.rows, 5);
        assert_eq!(out.rows(), 5);
        assert!(out.manifest.optimized);
        assert!(!out.manifest.truncated);
        assert_ne!(out.manifest.plan_hash, out.manifest.executed_plan_hash);
    }

    #[test]
    fn unoptimized_run_executes_plan_as_given() {
        let cfg = EngineConfig {
            optimize: false,
            max_batches: None,
        };
        let out = Engine::new(cfg).unwrap().run(&plan()).unwrap();
        assert_eq!(out.manifest.plan_hash, out.manifest.executed_plan_hash);
        assert_eq!(out.manifest.rows, 5);
    }

    #[test]
    fn max_batches_truncates() {
        let cfg = EngineConfig {
            optimize: true,
            max_batches: Some(2),
        };
        let out = Engine::new(cfg).unwrap().run(&plan()).unwrap();
        assert_eq!(out.batches.len(), 2);
        assert_eq!(out.manifest.rows, 4);
        assert!(out.manifest.truncated);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cfg = EngineConfig {
            optimize: true,
            max_batches: Some(0),
        };
        assert!(matches!(Engine::new(cfg), Err(ExecError::Config(_))));
    }

    #[test]
    fn collect_drains_plan() {
        let mut p = plan();
        let batches = collect(&mut p).unwrap();
        assert_eq!(batches.iter().map(Batch::len).sum::<usize>(), 5);
        assert!(p.execute().unwrap().is_none());
    }
}
