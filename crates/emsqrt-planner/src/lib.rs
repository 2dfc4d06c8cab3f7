#![forbid(unsafe_code)]
//! emsqrt-planner: logical-plan rewrites, coarse cost estimation, and
//! lowering to the physical program the exec runtime consumes.
//!
//! This crate (together with `emsqrt-te`) is the query-planning collaborator
//! the merge join subsystem's spec treats as out of scope: it decides join
//! kind/strictness/key lists upstream of `emsqrt-operators::join::merge` and
//! hands the core an already-resolved `JoinSpec`-shaped binding.

pub mod cost;
pub mod dsl;
pub mod logical;
pub mod lower;
pub mod physical;
pub mod rules;

pub use cost::{estimate_work, WorkHint};
pub use dsl::yaml::parse_yaml_pipeline;
pub use lower::lower_to_physical;
pub use physical::{OperatorBinding, PhysicalProgram};
