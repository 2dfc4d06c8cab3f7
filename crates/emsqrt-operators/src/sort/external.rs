//! External merge sort: spill bounded sorted runs, then k-way merge them
//! back in sort order. Used for the standalone `sort_external` operator;
//! the merge join subsystem sorts its own (already block-bounded) inputs
//! in-place instead (see `join::merge::sort_block`).

use std::cmp::Ordering;
use std::sync::{Arc, Mutex};

use emsqrt_core::budget::MemoryBudget;
use emsqrt_core::id::SpillId;
use emsqrt_core::types::{Column, RowBatch, Scalar};
use emsqrt_mem::guard::BudgetGuardImpl;
use emsqrt_mem::spill::SegmentMeta;
use emsqrt_mem::SpillManager;

use crate::plan::{Footprint, OpPlan};
use crate::traits::{OpError, Operator};

/// Rows per spilled run. Kept modest so unit tests exercise the spill path
/// without needing huge inputs.
const ROWS_PER_RUN: usize = 4096;

#[derive(Default)]
pub struct ExternalSort {
    /// Sort key column names, ascending, NULLs last.
    pub by: Vec<String>,
    pub spill_mgr: Option<Arc<Mutex<SpillManager>>>,
}

impl Operator for ExternalSort {
    fn name(&self) -> &'static str {
        "sort_external"
    }

    fn memory_need(&self, _rows: u64, _bytes: u64) -> Footprint {
        Footprint {
            bytes_per_row: 2,
            overhead_bytes: 256 * 1024,
        }
    }

    fn plan(&self, input_schemas: &[Schema]) -> Result<OpPlan, OpError> {
        if input_schemas.len() != 1 {
            return Err(OpError::Plan("sort_external expects one input".into()));
        }
        Ok(OpPlan::new(input_schemas[0].clone(), self.memory_need(0, 0)))
    }

    fn eval_block(
        &self,
        inputs: &[RowBatch],
        budget: &dyn MemoryBudget<Guard = BudgetGuardImpl>,
    ) -> Result<RowBatch, OpError> {
        if inputs.len() != 1 {
            return Err(OpError::Exec("sort_external needs one block input".into()));
        }
        if self.by.is_empty() {
            return Err(OpError::Exec("sort keys are empty".into()));
        }
        let input = &inputs[0];
        let key_idx = key_indices(input, &self.by)?;

        let rows = input.num_rows();
        if rows <= ROWS_PER_RUN || self.spill_mgr.is_none() {
            let mut order: Vec<usize> = (0..rows).collect();
            order.sort_by(|&a, &b| cmp_rows(input, a, input, b, &key_idx));
            return Ok(gather(input, &order));
        }

        // Build bounded sorted runs and spill each.
        let spill_mgr = self.spill_mgr.as_ref().unwrap();
        let spill_id = SpillId::new(0);
        let mut run_metas: Vec<SegmentMeta> = Vec::new();
        {
            let mut guard = spill_mgr.lock().unwrap();
            let mut start = 0usize;
            while start < rows {
                let end = (start + ROWS_PER_RUN).min(rows);
                let mut order: Vec<usize> = (start..end).collect();
                order.sort_by(|&a, &b| cmp_rows(input, a, input, b, &key_idx));
                let run = gather(input, &order);
                let run_idx = guard.next_run_index();
                let meta = guard
                    .write_batch(&run, spill_id, run_idx)
                    .map_err(|e| OpError::Exec(format!("failed to spill sort run: {}", e)))?;
                run_metas.push(meta);
                start = end;
            }
        }

        // K-way merge: load every run fully (bounded by ROWS_PER_RUN each)
        // and merge with a simple repeated-min scan. A binary heap would
        // scale better past a handful of runs; this keeps the merge loop
        // legible and the run count here is small by construction.
        let guard = spill_mgr.lock().unwrap();
        let mut runs: Vec<(RowBatch, usize)> = Vec::with_capacity(run_metas.len());
        for meta in &run_metas {
            let batch = guard
                .read_batch(meta, budget)
                .map_err(|e| OpError::Exec(format!("failed to read sort run: {}", e)))?;
            runs.push((batch, 0));
        }
        drop(guard);

        let mut merged_order: Vec<(usize, usize)> = Vec::with_capacity(rows);
        loop {
            let mut best: Option<usize> = None;
            for (run_idx, (batch, pos)) in runs.iter().enumerate() {
                if *pos >= batch.num_rows() {
                    continue;
                }
                best = match best {
                    None => Some(run_idx),
                    Some(b) => {
                        let (bb, bp) = &runs[b];
                        if cmp_rows(batch, *pos, bb, *bp, &key_idx) == Ordering::Less {
                            Some(run_idx)
                        } else {
                            Some(b)
                        }
                    }
                };
            }
            match best {
                None => break,
                Some(run_idx) => {
                    merged_order.push((run_idx, runs[run_idx].1));
                    runs[run_idx].1 += 1;
                }
            }
        }

        let mut out_cols: Vec<Column> = input
            .columns
            .iter()
            .map(|c| Column::new(c.name.clone(), Vec::with_capacity(rows)))
            .collect();
        for (run_idx, row) in merged_order {
            let batch = &runs[run_idx].0;
            for (col_idx, col) in batch.columns.iter().enumerate() {
                out_cols[col_idx].values.push(col.values[row].clone());
            }
        }
        Ok(RowBatch { columns: out_cols })
    }
}

use emsqrt_core::prelude::Schema;

fn key_indices(batch: &RowBatch, names: &[String]) -> Result<Vec<usize>, OpError> {
    names
        .iter()
        .map(|n| {
            batch
                .column_index(n)
                .ok_or_else(|| OpError::Exec(format!("sort key '{}' not found", n)))
        })
        .collect()
}

fn gather(batch: &RowBatch, order: &[usize]) -> RowBatch {
    let columns = batch
        .columns
        .iter()
        .map(|c| Column::new(c.name.clone(), order.iter().map(|&i| c.values[i].clone()).collect()))
        .collect();
    RowBatch { columns }
}

fn cmp_rows(a: &RowBatch, ai: usize, b: &RowBatch, bi: usize, key_idx: &[usize]) -> Ordering {
    for &idx in key_idx {
        let ord = cmp_scalar_nulls_last(&a.columns[idx].values[ai], &b.columns[idx].values[bi]);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Ascending, NULLs last, NULL == NULL (a plain total order for sorting —
/// distinct from the join's null-exclusion comparator in `join::merge`).
fn cmp_scalar_nulls_last(a: &Scalar, b: &Scalar) -> Ordering {
    match (a, b) {
        (Scalar::Null, Scalar::Null) => Ordering::Equal,
        (Scalar::Null, _) => Ordering::Greater,
        (_, Scalar::Null) => Ordering::Less,
        (Scalar::Bool(x), Scalar::Bool(y)) => x.cmp(y),
        (Scalar::I32(x), Scalar::I32(y)) => x.cmp(y),
        (Scalar::I64(x), Scalar::I64(y)) => x.cmp(y),
        (Scalar::F32(x), Scalar::F32(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Scalar::F64(x), Scalar::F64(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Scalar::Str(x), Scalar::Str(y)) => x.cmp(y),
        (Scalar::Bin(x), Scalar::Bin(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}
