//! `RunManifest`: the provenance record the exec runtime emits for a
//! completed (or failed) run — stable hashes of the plan and TE order plus
//! timing, so two runs of the same plan against the same data are auditable
//! as identical.

use serde::{Deserialize, Serialize};

use crate::hash::Hash256;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub plan_hash: Hash256,
    pub te_hash: Hash256,
    pub started_ms: u128,
    pub finished_ms: Option<u128>,
    pub outputs_digest: Option<Hash256>,
}

impl RunManifest {
    pub fn new(plan_hash: Hash256, te_hash: Hash256, started_ms: u128) -> Self {
        Self {
            plan_hash,
            te_hash,
            started_ms,
            finished_ms: None,
            outputs_digest: None,
        }
    }

    pub fn finish(mut self, finished_ms: u128, outputs_digest: Option<Hash256>) -> Self {
        self.finished_ms = Some(finished_ms);
        self.outputs_digest = outputs_digest;
        self
    }
}
