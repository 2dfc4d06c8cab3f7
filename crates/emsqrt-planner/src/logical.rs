//! Re-export of the shared `LogicalPlan` tree. Kept as its own module so
//! rule passes (`crate::rules`) and the YAML front-end (`crate::dsl::yaml`)
//! depend on `crate::logical` rather than reaching into `emsqrt-core`
//! directly — a thin seam in case the planner ever needs a plan shape that
//! diverges from the shared `dag` representation.

pub use emsqrt_core::dag::{Aggregation, LogicalPlan};
