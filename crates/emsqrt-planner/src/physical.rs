//! Output of `lower_to_physical`: a `PhysicalPlan` tree plus the per-`OpId`
//! binding (operator key + JSON config) the exec runtime uses to
//! instantiate real `Operator` impls from `emsqrt-operators::registry`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use emsqrt_core::dag::PhysicalPlan;
use emsqrt_core::id::OpId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorBinding {
    pub key: String,
    pub config: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicalProgram {
    pub plan: PhysicalPlan,
    pub bindings: BTreeMap<OpId, OperatorBinding>,
}

impl PhysicalProgram {
    pub fn new(plan: PhysicalPlan, bindings: BTreeMap<OpId, OperatorBinding>) -> Self {
        Self { plan, bindings }
    }
}
