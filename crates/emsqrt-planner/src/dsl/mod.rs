//! Front-ends that produce a `LogicalPlan` from something other than code.

pub mod yaml;
