//! Coarse work estimate shared between the planner's cost model and
//! `tree_eval`'s block-size chooser.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WorkEstimate {
    pub total_rows: u64,
    pub total_bytes: u64,
    pub max_fan_in: u32,
}
