#![forbid(unsafe_code)]
//! emsqrt-operators: TE-friendly operator implementations.
//!
//! Every operator implements `traits::Operator`: `plan()` resolves an output
//! schema and a memory footprint model from input schemas; `eval_block()`
//! evaluates one TE block. `registry` wires string operator keys (as found
//! in a lowered `PhysicalProgram`'s bindings) to concrete instances.
//!
//! `join::merge` is the partial merge join subsystem — the one part of this
//! crate specified in detail rather than sketched; see its module docs.

pub mod agregate;
pub mod filter;
pub mod join;
pub mod map;
pub mod plan;
pub mod project;
pub mod registry;
pub mod sort;
pub mod traits;
