//! Row-oriented in-memory value types.
//!
//! `Scalar`/`Column`/`RowBatch` are the lightweight, allocation-simple
//! counterparts to Arrow arrays. Operators that need vectorized speed convert
//! to Arrow via `arrow.rs` (feature-gated); everything else, including the
//! join subsystem, works directly against these.

use serde::{Deserialize, Serialize};

/// A single cell value. `Null` is a first-class variant rather than an
/// `Option<T>` wrapper so that columns can stay homogeneous in shape while
/// individual cells carry their own nullability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(String),
    Bin(Vec<u8>),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }
}

/// A named sequence of values. All columns within one `RowBatch` share a
/// row count; `Column` itself does not enforce that invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Scalar>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Scalar>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn is_null(&self, row: usize) -> bool {
        self.values[row].is_null()
    }
}

/// A horizontal partition of a table: a set of equal-length named columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowBatch {
    pub columns: Vec<Column>,
}

impl RowBatch {
    pub fn empty() -> Self {
        Self { columns: Vec::new() }
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map(|c| c.values.len()).unwrap_or(0)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Rough byte footprint, used by size limits and memory footprint models.
    pub fn approx_bytes(&self) -> u64 {
        self.columns
            .iter()
            .map(|c| {
                c.values
                    .iter()
                    .map(|v| match v {
                        Scalar::Null => 1,
                        Scalar::Bool(_) => 1,
                        Scalar::I32(_) => 4,
                        Scalar::I64(_) => 8,
                        Scalar::F32(_) => 4,
                        Scalar::F64(_) => 8,
                        Scalar::Str(s) => s.len() as u64 + 8,
                        Scalar::Bin(b) => b.len() as u64 + 8,
                    })
                    .sum::<u64>()
            })
            .sum()
    }
}
