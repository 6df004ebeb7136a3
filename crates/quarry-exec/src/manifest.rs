//! Run manifest: what was executed and what it produced.

use serde::{Deserialize, Serialize};

use quarry_core::hash::Hash256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunManifest {
    /// Fingerprint of the plan handed to the engine.
    pub plan_hash: Hash256,
    /// Fingerprint of the plan actually pulled (differs after optimization).
    pub executed_plan_hash: Hash256,
    pub optimized: bool,
    pub batches: u64,
    pub rows: u64,
    /// The batch cap stopped the run before end-of-stream was seen.
    pub truncated: bool,
    pub started_ms: u64,
    pub finished_ms: u64,
}

impl RunManifest {
    pub fn new(
        plan_hash: Hash256,
        executed_plan_hash: Hash256,
        optimized: bool,
        started_ms: u64,
    ) -> Self {
        Self {
            plan_hash,
            executed_plan_hash,
            optimized,
            batches: 0,
            rows: 0,
            truncated: false,
            started_ms,
            finished_ms: started_ms,
        }
    }

    pub fn record_batch(&mut self, rows: usize) {
        self.batches += 1;
        self.rows += rows as u64;
    }

    pub fn finish(mut self, finished_ms: u64, truncated: bool) -> Self {
        self.finished_ms = finished_ms.max(self.started_ms);
        self.truncated = truncated;
        self
    }

    pub fn duration_ms(&self) -> u64 {
        self.finished_ms - self.started_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_core::hash::hash_bytes;

    #[test]
    fn counts_and_finish() {
        let h = hash_bytes(b"plan");
        let mut m = RunManifest::new(h, h, false, 100);
        m.record_batch(3);
        m.record_batch(2);
        let m = m.finish(90, true);
        assert_eq!(m.batches, 2);
        assert_eq!(m.rows, 5);
        assert!(m.truncated);
        // Clock skew never yields a negative duration.
        assert_eq!(m.duration_ms(), 0);

        let json = serde_json::to_string(&m).unwrap();
        let back: RunManifest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }
}
