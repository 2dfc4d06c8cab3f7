//! Block-size selection: given a memory cap and a coarse work estimate,
//! choose a row count per TE block that keeps any one block's footprint
//! well under the cap.

use serde::{Deserialize, Serialize};

use crate::cost::WorkEstimate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BlockSizeHint {
    pub rows_per_block: u64,
}

const MIN_ROWS_PER_BLOCK: u64 = 1;
const MAX_ROWS_PER_BLOCK: u64 = 1_000_000;

/// Pick a block size so that `max_fan_in` concurrent blocks of this size,
/// at the estimated bytes/row, stay under `mem_cap_bytes`.
pub fn choose_block_size(mem_cap_bytes: usize, est: &WorkEstimate) -> BlockSizeHint {
    let bytes_per_row = if est.total_rows > 0 {
        (est.total_bytes / est.total_rows).max(1)
    } else {
        1
    };
    let fan_in = est.max_fan_in.max(1) as u64;
    let budget_rows = (mem_cap_bytes as u64 / bytes_per_row.max(1)) / fan_in;
    BlockSizeHint {
        rows_per_block: budget_rows.clamp(MIN_ROWS_PER_BLOCK, MAX_ROWS_PER_BLOCK),
    }
}
