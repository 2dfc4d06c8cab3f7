//! Output of `Operator::plan`: the concrete output schema plus a memory
//! footprint model the TE planner uses to size blocks.

use emsqrt_core::prelude::Schema;

/// A linear memory-use model: `overhead_bytes + bytes_per_row * rows`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footprint {
    pub bytes_per_row: u64,
    pub overhead_bytes: u64,
}

impl Footprint {
    pub fn estimate(&self, rows: u64) -> u64 {
        self.overhead_bytes + self.bytes_per_row.saturating_mul(rows)
    }
}

#[derive(Debug, Clone)]
pub struct OpPlan {
    pub out_schema: Schema,
    pub footprint: Footprint,
}

impl OpPlan {
    pub fn new(out_schema: Schema, footprint: Footprint) -> Self {
        Self {
            out_schema,
            footprint,
        }
    }
}
