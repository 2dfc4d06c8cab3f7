//! Logical and physical plan node types.
//!
//! `LogicalPlan` is what the DSL/planner front-end produces and `rules`
//! rewrites; `PhysicalPlan` is the operator-shaped tree the `lower` pass
//! emits for TE scheduling. Both are plain trees — no mutable shared state,
//! per the re-architecture note in the join subsystem's design notes about
//! avoiding a cyclic analyzed-join/driver graph.

use serde::{Deserialize, Serialize};

use crate::id::OpId;
use crate::schema::Schema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinType {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "inner" => Ok(JoinType::Inner),
            "left" => Ok(JoinType::Left),
            "right" => Ok(JoinType::Right),
            "full" => Ok(JoinType::Full),
            _ => Err(format!("unknown join type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Aggregation {
    Count,
    Sum(String),
    Avg(String),
    Min(String),
    Max(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LogicalPlan {
    Scan {
        source: String,
        schema: Schema,
    },
    Filter {
        input: Box<LogicalPlan>,
        expr: String,
    },
    Map {
        input: Box<LogicalPlan>,
        expr: String,
    },
    Project {
        input: Box<LogicalPlan>,
        columns: Vec<String>,
    },
    Aggregate {
        input: Box<LogicalPlan>,
        group_by: Vec<String>,
        aggs: Vec<Aggregation>,
    },
    Join {
        left: Box<LogicalPlan>,
        right: Box<LogicalPlan>,
        on: Vec<(String, String)>,
        join_type: JoinType,
    },
    Sink {
        input: Box<LogicalPlan>,
        destination: String,
        format: String,
    },
}

/// A physical operator tree: logical nodes after `OpId` assignment, ready for
/// TE block decomposition. Each node carries the `OpId` the exec runtime uses
/// to look up its bound `Operator` instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PhysicalPlan {
    Source {
        op: OpId,
        schema: Schema,
    },
    Unary {
        op: OpId,
        input: Box<PhysicalPlan>,
        schema: Schema,
    },
    Binary {
        op: OpId,
        left: Box<PhysicalPlan>,
        right: Box<PhysicalPlan>,
        schema: Schema,
    },
    Sink {
        op: OpId,
        input: Box<PhysicalPlan>,
    },
}

impl PhysicalPlan {
    pub fn op(&self) -> OpId {
        match self {
            PhysicalPlan::Source { op, .. }
            | PhysicalPlan::Unary { op, .. }
            | PhysicalPlan::Binary { op, .. }
            | PhysicalPlan::Sink { op, .. } => *op,
        }
    }

    /// Sinks have no output schema of their own (they consume their input).
    pub fn schema(&self) -> Option<&Schema> {
        match self {
            PhysicalPlan::Source { schema, .. }
            | PhysicalPlan::Unary { schema, .. }
            | PhysicalPlan::Binary { schema, .. } => Some(schema),
            PhysicalPlan::Sink { .. } => None,
        }
    }
}
