//! Engine-wide tuning knobs, populated by the CLI/settings layer and
//! consumed as a fixed struct by the exec runtime and operators.
//!
//! The join subsystem does not read this directly; the planner translates
//! the relevant fields (`mem_cap_bytes`, block-size hints) into the
//! `JoinConfig` that `MergeJoin` is constructed with.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Hard ceiling for in-flight memory reservations across the query.
    pub mem_cap_bytes: usize,
    /// Directory spilled runs are written under.
    pub spill_dir: String,
    /// Max number of TE blocks executed concurrently.
    pub max_parallel_tasks: usize,
    /// Target row count for right-side merge-join blocks
    /// (`JoinSpec::max_rows_in_right_block` default).
    pub join_right_block_rows: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mem_cap_bytes: 512 * 1024 * 1024,
            spill_dir: std::env::temp_dir().to_string_lossy().into_owned(),
            max_parallel_tasks: 4,
            join_right_block_rows: 65_536,
        }
    }
}

impl EngineConfig {
    /// Read overrides from `EMSQRT_*` environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(v) = std::env::var("EMSQRT_MEM_CAP_BYTES") {
            if let Ok(n) = v.parse() {
                cfg.mem_cap_bytes = n;
            }
        }
        if let Ok(v) = std::env::var("EMSQRT_SPILL_DIR") {
            cfg.spill_dir = v;
        }
        if let Ok(v) = std::env::var("EMSQRT_MAX_PARALLEL_TASKS") {
            if let Ok(n) = v.parse() {
                cfg.max_parallel_tasks = n;
            }
        }
        if let Ok(v) = std::env::var("EMSQRT_JOIN_RIGHT_BLOCK_ROWS") {
            if let Ok(n) = v.parse() {
                cfg.join_right_block_rows = n;
            }
        }
        cfg
    }
}
