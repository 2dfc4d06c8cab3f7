#![forbid(unsafe_code)]
//! emsqrt-te: tree-evaluation block planning.
//!
//! Decomposes a `PhysicalPlan` into a `TePlan` — a topologically ordered list
//! of bounded-size `TeBlock`s the exec runtime executes one at a time. This
//! is the "out of scope" query-planning collaborator the merge join
//! subsystem's spec names in §1: it hands the join operator already-sized,
//! already-ordered blocks and otherwise has no contract with it.

pub mod cost;
pub mod frontier;
pub mod schedule;
pub mod tree_eval;

pub use cost::WorkEstimate;
pub use schedule::{choose_block_size, BlockSizeHint};
pub use tree_eval::{plan_te, PlanError, TeBlock, TePlan};
