//! Partial merge join: sort-merge join over a left block and a right side
//! that is accumulated progressively as many bounded, individually sorted
//! blocks.
//!
//! This is the one part of this crate specified in detail rather than
//! sketched. The right side is built first via repeated [`MergeJoin::add_joined_block`]
//! calls (from one or more producer threads), then frozen by
//! [`MergeJoin::join_block`]'s first invocation (or an explicit totals row).
//! Every subsequent `join_block` call sorts its own left block in place,
//! walks it against the frozen [`RightSideStore`] block by block, and
//! appends the right-side columns named in the join spec.
//!
//! Only LEFT and INNER kinds are supported; RIGHT/FULL and ASOF strictness
//! are out of scope for this subsystem (see [`join::hash`](crate::join::hash)
//! for the join strategy that does cover RIGHT/FULL).

use std::cmp::Ordering;
use std::sync::{Arc, RwLock};

use emsqrt_core::block::{dedup_description, SortColumnDescription, SortDescription};
use emsqrt_core::prelude::{DataType, Field, Schema};
use emsqrt_core::types::{Column, RowBatch, Scalar};

use crate::plan::{Footprint, OpPlan};
use crate::traits::{MemoryBudget, OpError, Operator};

// ---------------------------------------------------------------------
// §4.D JoinConfig / JoinSpec
// ---------------------------------------------------------------------

/// Join kind. RIGHT and FULL are not part of this subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Left,
    Inner,
}

/// ALL emits the full cartesian product within an equal-key group; ANY
/// emits at most one right row per left row. ASOF is not supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strictness {
    All,
    Any,
}

/// What to do when the right side exceeds `SizeLimits` during `add`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowMode {
    Throw,
    Break,
}

#[derive(Debug, Clone, Copy)]
pub struct SizeLimits {
    pub max_rows: usize,
    pub max_bytes: u64,
    pub overflow_mode: OverflowMode,
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self {
            max_rows: usize::MAX,
            max_bytes: u64::MAX,
            overflow_mode: OverflowMode::Throw,
        }
    }
}

/// Immutable join specification, constructed by the planner (out of scope
/// for this subsystem; see module docs). `keys_left`/`keys_right` are
/// parallel and may repeat a column name — duplicates are preserved in the
/// merge description but collapsed in the sort description.
#[derive(Debug, Clone)]
pub struct JoinSpec {
    pub kind: JoinKind,
    pub strictness: Strictness,
    pub keys_left: Vec<String>,
    pub keys_right: Vec<String>,
    pub columns_added_by_join: Vec<(String, DataType)>,
    pub force_nullable_right: bool,
    pub max_rows_in_right_block: usize,
    pub size_limits: SizeLimits,
}

/// Values the driver precomputes once at construction time from `JoinSpec`
/// and the right sample schema, so `join_block` never has to re-derive them.
///
/// `left_sort_description`/`right_sort_description` are deduplicated by
/// column name for sorting (a repeated key column only needs to be sorted
/// by once); `MergeCursor` is built straight from `JoinSpec::keys_left`/
/// `keys_right`, which keep duplicates, so matching still compares a
/// repeated key column as many times as it's listed.
struct JoinConfig {
    left_sort_description: SortDescription,
    right_sort_description: SortDescription,
    right_columns_to_add: Vec<Field>,
    is_all: bool,
    is_left: bool,
}

impl JoinConfig {
    fn build(spec: &JoinSpec, right_sample: &Schema) -> Result<Self, OpError> {
        if spec.max_rows_in_right_block == 0 {
            return Err(OpError::Plan(
                "PARAMETER_OUT_OF_BOUND: max_rows_in_right_block must be positive".into(),
            ));
        }
        if spec.keys_left.len() != spec.keys_right.len() || spec.keys_left.is_empty() {
            return Err(OpError::Plan(
                "UNSUPPORTED_JOIN: keys_left and keys_right must be non-empty and parallel".into(),
            ));
        }

        let left_merge_description: SortDescription = spec
            .keys_left
            .iter()
            .map(|n| SortColumnDescription::asc_nulls_last(n.clone()))
            .collect();
        let right_merge_description: SortDescription = spec
            .keys_right
            .iter()
            .map(|n| SortColumnDescription::asc_nulls_last(n.clone()))
            .collect();

        let force_nullable = spec.force_nullable_right || matches!(spec.kind, JoinKind::Left);
        let right_columns_to_add = spec
            .columns_added_by_join
            .iter()
            .map(|(name, _ty)| {
                let mut field = right_sample
                    .index_of(name)
                    .map(|idx| right_sample.fields[idx].clone())
                    .ok_or_else(|| {
                        OpError::Plan(format!(
                            "LOGICAL_ERROR: columns_added_by_join names '{}', not found in right_sample_schema",
                            name
                        ))
                    })?;
                if force_nullable {
                    field.nullable = true;
                }
                Ok(field)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            left_sort_description: dedup_description(&left_merge_description),
            right_sort_description: dedup_description(&right_merge_description),
            right_columns_to_add,
            is_all: matches!(spec.strictness, Strictness::All),
            is_left: matches!(spec.kind, JoinKind::Left),
        })
    }
}

// ---------------------------------------------------------------------
// §4.A NullAwareCompare
// ---------------------------------------------------------------------

/// Compare two non-NULL scalars. Mismatched variants (should not occur once
/// key types have passed `check_types_of_keys`) compare equal so a single
/// stray mismatch degrades to "no ordering signal" rather than panicking.
fn cmp_non_null(a: &Scalar, b: &Scalar) -> Ordering {
    match (a, b) {
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

/// Ascending, NULLs-last, NULL == NULL. Used for run-length detection
/// within one side and for the min/max intersection test, where NULLs
/// grouping together is the correct sort-order semantics.
fn sort_cmp_cell(a: &Scalar, b: &Scalar) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => cmp_non_null(a, b),
    }
}

/// The join's cross-side comparator: NULLs-last, but a NULL key never
/// equals anything, including another NULL. SQL join semantics treat
/// `NULL = NULL` as UNKNOWN; returning `Greater` rather than `Equal` for
/// the `(null, null)` case is what keeps two NULL keys from forming an
/// equal range.
fn join_cmp_cell(a: &Scalar, b: &Scalar) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Greater,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => cmp_non_null(a, b),
    }
}

// ---------------------------------------------------------------------
// §4.B MergeCursor
// ---------------------------------------------------------------------

/// A range of equal-keyed rows found on both sides by [`MergeCursor::next_equal_range`].
/// Zero-length on either side signals that one cursor ran out while searching.
#[derive(Debug, Clone, Copy, Default)]
pub struct EqualRange {
    pub left_start: usize,
    pub right_start: usize,
    pub left_len: usize,
    pub right_len: usize,
}

/// Positional cursor over one block's key columns. Short-lived: it borrows
/// its block for the duration of a single `join_block` call.
///
/// `has_nullable` is computed once at construction from the schema, not
/// re-derived per comparison, per the "specialize by has_nulls" redesign
/// note — there is only one comparator here either way since this engine's
/// `Scalar` carries its own nullness, but the flag still lets a cursor built
/// over a provably non-nullable key schema skip the NULL branch entirely.
pub struct MergeCursor<'a> {
    pos: usize,
    rows: usize,
    key_columns: Vec<&'a Column>,
    has_nullable: bool,
}

impl<'a> MergeCursor<'a> {
    pub fn new(block: &'a RowBatch, key_names: &[String], schema: &Schema) -> Result<Self, OpError> {
        let key_columns = key_names
            .iter()
            .map(|n| {
                block
                    .column(n)
                    .ok_or_else(|| OpError::Exec(format!("LOGICAL_ERROR: key column '{}' missing from block", n)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let has_nullable = key_names
            .iter()
            .any(|n| schema.index_of(n).map(|i| schema.fields[i].nullable).unwrap_or(true));
        Ok(Self {
            pos: 0,
            rows: block.num_rows(),
            key_columns,
            has_nullable,
        })
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.rows
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn advance(&mut self, n: usize) {
        self.pos += n;
    }

    fn cell_cmp(&self, use_join_semantics: bool, a: &Scalar, b: &Scalar) -> Ordering {
        if !self.has_nullable {
            return cmp_non_null(a, b);
        }
        if use_join_semantics {
            join_cmp_cell(a, b)
        } else {
            sort_cmp_cell(a, b)
        }
    }

    /// Lexicographic compare of row `i` (this cursor's block) against row
    /// `j` (this cursor's block), using plain NULLs-last, NULL==NULL
    /// semantics. Used for run-length detection within one side.
    fn compare_own_rows(&self, i: usize, j: usize) -> Ordering {
        for col in &self.key_columns {
            let ord = self.cell_cmp(false, &col.values[i], &col.values[j]);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Cross-side compare of row `i` of this cursor's block against row `j`
    /// of `other`'s block, using the join-disabling NULL semantics.
    fn compare_cross(&self, other: &MergeCursor<'a>, i: usize, j: usize) -> Ordering {
        for (lc, rc) in self.key_columns.iter().zip(other.key_columns.iter()) {
            let ord = join_cmp_cell(&lc.values[i], &rc.values[j]);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Count consecutive rows starting at `pos` sharing the same key
    /// (plain, non-join-disabling compare — NULLs within one side group
    /// together). Returns 0 at end.
    pub fn equal_run_length(&self) -> usize {
        if self.at_end() {
            return 0;
        }
        let mut len = 1;
        while self.pos + len < self.rows && self.compare_own_rows(self.pos, self.pos + len) == Ordering::Equal {
            len += 1;
        }
        len
    }

    /// Key tuple for row `i`, used for min/max intersection bounds.
    fn key_tuple(&self, i: usize) -> Vec<Scalar> {
        self.key_columns.iter().map(|c| c.values[i].clone()).collect()
    }

    /// First and last row's key tuples, used by `intersect`.
    pub fn min_max_key(&self) -> Option<(Vec<Scalar>, Vec<Scalar>)> {
        if self.rows == 0 {
            return None;
        }
        Some((self.key_tuple(0), self.key_tuple(self.rows - 1)))
    }

    /// `Greater` ("+1"): this cursor's current position lies entirely after
    /// `other_max`. `Less` ("-1"): this cursor's *last* row lies entirely
    /// before `other_min`. `Equal` ("0"): overlap is possible and the block
    /// must be processed.
    pub fn intersect(&self, other_min: &[Scalar], other_max: &[Scalar]) -> Ordering {
        if self.at_end() {
            return Ordering::Equal;
        }
        let cur = self.key_tuple(self.pos);
        if cmp_key_tuples(&cur, other_max) == Ordering::Greater {
            return Ordering::Greater;
        }
        let last = self.key_tuple(self.rows - 1);
        if cmp_key_tuples(&last, other_min) == Ordering::Less {
            return Ordering::Less;
        }
        Ordering::Equal
    }

    /// Advance both cursors until keys match (cross-side, join-disabling
    /// compare) or either runs out. On a match, returns the starting
    /// positions and both sides' equal-run lengths without consuming them —
    /// callers advance explicitly per the spanning rule in §4.E.
    pub fn next_equal_range(left: &mut MergeCursor<'a>, right: &mut MergeCursor<'a>) -> EqualRange {
        loop {
            if left.at_end() || right.at_end() {
                return EqualRange {
                    left_start: left.pos,
                    right_start: right.pos,
                    left_len: 0,
                    right_len: 0,
                };
            }
            match left.compare_cross(right, left.pos, right.pos) {
                Ordering::Less => left.advance(1),
                Ordering::Greater => right.advance(1),
                Ordering::Equal => {
                    return EqualRange {
                        left_start: left.pos,
                        right_start: right.pos,
                        left_len: left.equal_run_length(),
                        right_len: right.equal_run_length(),
                    };
                }
            }
        }
    }
}

fn cmp_key_tuples(a: &[Scalar], b: &[Scalar]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        let ord = sort_cmp_cell(x, y);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Stable ascending sort of `block` by `description`. The external
/// collaborator named `sort_block` in the join subsystem's interface
/// contract (§6); the merge join sorts its own inputs rather than relying
/// on a shared planner-level sort pass, since both sides must be re-sorted
/// to exactly the merge join's own key order regardless of how they arrive.
pub fn sort_block(block: &mut RowBatch, description: &SortDescription) -> Result<(), OpError> {
    let key_idx: Vec<usize> = description
        .iter()
        .map(|d| {
            block
                .column_index(&d.column_name)
                .ok_or_else(|| OpError::Exec(format!("LOGICAL_ERROR: sort key '{}' not found", d.column_name)))
        })
        .collect::<Result<_, _>>()?;

    let rows = block.num_rows();
    let mut order: Vec<usize> = (0..rows).collect();
    order.sort_by(|&a, &b| {
        for &idx in &key_idx {
            let ord = sort_cmp_cell(&block.columns[idx].values[a], &block.columns[idx].values[b]);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });

    for col in block.columns.iter_mut() {
        col.values = order.iter().map(|&i| col.values[i].clone()).collect();
    }
    Ok(())
}

// ---------------------------------------------------------------------
// §4.C RightSideStore
// ---------------------------------------------------------------------

enum StoreState {
    Building { blocks: Vec<RowBatch>, rows: usize, bytes: u64 },
    Finalized(Arc<Vec<RowBatch>>),
}

/// Accumulates right-side blocks (possibly from multiple producer threads),
/// sorting each on arrival, then merges the accumulated blocks into a
/// smaller number of bounded, globally-sorted runs on `finalize`.
///
/// `add` is serialized through the single `RwLock`; `finalize` takes it
/// exclusively once, and all subsequent reads (`finalized_blocks`, called
/// once per concurrent `join_block`) take it shared and clone a cheap `Arc`
/// rather than holding the lock across a block's worth of probing.
pub struct RightSideStore {
    right_sort_description: SortDescription,
    max_rows_in_right_block: usize,
    size_limits: SizeLimits,
    state: RwLock<StoreState>,
}

impl RightSideStore {
    pub fn new(right_sort_description: SortDescription, max_rows_in_right_block: usize, size_limits: SizeLimits) -> Self {
        Self {
            right_sort_description,
            max_rows_in_right_block,
            size_limits,
            state: RwLock::new(StoreState::Building {
                blocks: Vec::new(),
                rows: 0,
                bytes: 0,
            }),
        }
    }

    /// Sorts `block` by the right-key sort description and appends it.
    /// Returns `false` once a BREAK-mode size limit has been reached (the
    /// block, or its tail, was truncated to fit); throws
    /// `SetSizeLimitExceeded` in THROW mode instead.
    pub fn add(&self, mut block: RowBatch) -> Result<bool, OpError> {
        if block.num_rows() == 0 {
            return Ok(true);
        }
        sort_block(&mut block, &self.right_sort_description)?;

        let mut guard = self.state.write().unwrap();
        let (blocks, rows, bytes) = match &mut *guard {
            StoreState::Building { blocks, rows, bytes } => (blocks, rows, bytes),
            StoreState::Finalized(_) => {
                return Err(OpError::Exec(
                    "LOGICAL_ERROR: add_joined_block called after the right side was finalized".into(),
                ));
            }
        };

        let incoming_rows = block.num_rows();
        let incoming_bytes = block.approx_bytes();
        let would_be_rows = *rows + incoming_rows;
        let would_be_bytes = *bytes + incoming_bytes;

        let over_limit = would_be_rows > self.size_limits.max_rows || would_be_bytes > self.size_limits.max_bytes;
        if !over_limit {
            *rows = would_be_rows;
            *bytes = would_be_bytes;
            blocks.push(block);
            return Ok(true);
        }

        match self.size_limits.overflow_mode {
            OverflowMode::Throw => Err(OpError::Exec(format!(
                "SET_SIZE_LIMIT_EXCEEDED: right side would reach {} rows / {} bytes, limit is {} rows / {} bytes",
                would_be_rows, would_be_bytes, self.size_limits.max_rows, self.size_limits.max_bytes
            ))),
            OverflowMode::Break => {
                let remaining_rows = self.size_limits.max_rows.saturating_sub(*rows);
                let remaining_bytes = self.size_limits.max_bytes.saturating_sub(*bytes);
                let keep_rows = if incoming_bytes == 0 || remaining_bytes >= incoming_bytes {
                    remaining_rows
                } else {
                    // Ration rows by the tighter of the two limits; approximate
                    // per-row bytes from this block's own average.
                    let per_row = (incoming_bytes / incoming_rows as u64).max(1);
                    remaining_rows.min((remaining_bytes / per_row) as usize)
                };
                if keep_rows > 0 {
                    truncate_rows(&mut block, keep_rows);
                    *rows += block.num_rows();
                    *bytes += block.approx_bytes();
                    blocks.push(block);
                }
                Ok(false)
            }
        }
    }

    /// Streaming k-way merge of the accumulated blocks into runs of at most
    /// `max_rows_in_right_block` rows each, keeping equal-key runs
    /// contiguous within one output block (a run may push a single block
    /// past the target size; it is never split across two). Idempotent.
    pub fn finalize(&self) -> Result<(), OpError> {
        {
            let guard = self.state.read().unwrap();
            if matches!(&*guard, StoreState::Finalized(_)) {
                return Ok(());
            }
        }
        let mut guard = self.state.write().unwrap();
        let (blocks, _, _) = match &mut *guard {
            StoreState::Building { blocks, rows, bytes } => (std::mem::take(blocks), *rows, *bytes),
            StoreState::Finalized(_) => return Ok(()),
        };
        let merged = merge_sorted_blocks(blocks, &self.right_sort_description, self.max_rows_in_right_block)?;
        *guard = StoreState::Finalized(Arc::new(merged));
        Ok(())
    }

    /// Shared, cheaply-cloned view of the finalized runs. Errors if called
    /// before `finalize`.
    pub fn finalized_blocks(&self) -> Result<Arc<Vec<RowBatch>>, OpError> {
        let guard = self.state.read().unwrap();
        match &*guard {
            StoreState::Finalized(blocks) => Ok(blocks.clone()),
            StoreState::Building { .. } => Err(OpError::Exec(
                "LOGICAL_ERROR: right side probed before finalize".into(),
            )),
        }
    }
}

fn truncate_rows(block: &mut RowBatch, keep_rows: usize) {
    for col in block.columns.iter_mut() {
        col.values.truncate(keep_rows);
    }
}

/// Repeated-min k-way merge of already individually-sorted blocks into
/// fewer, globally-sorted, size-bounded blocks. Mirrors the merge loop in
/// `sort::external`'s run merge, generalized to flush at run boundaries
/// rather than once at the end.
fn merge_sorted_blocks(
    blocks: Vec<RowBatch>,
    description: &SortDescription,
    max_rows_per_block: usize,
) -> Result<Vec<RowBatch>, OpError> {
    let blocks: Vec<RowBatch> = blocks.into_iter().filter(|b| b.num_rows() > 0).collect();
    if blocks.is_empty() {
        return Ok(Vec::new());
    }

    let key_idx: Vec<usize> = description
        .iter()
        .map(|d| {
            blocks[0]
                .column_index(&d.column_name)
                .ok_or_else(|| OpError::Exec(format!("LOGICAL_ERROR: key '{}' not found in right block", d.column_name)))
        })
        .collect::<Result<_, _>>()?;

    let mut cursors: Vec<usize> = vec![0; blocks.len()];
    let template_cols: Vec<String> = blocks[0].columns.iter().map(|c| c.name.clone()).collect();

    let mut out_blocks: Vec<RowBatch> = Vec::new();
    let mut current: Vec<Column> = template_cols.iter().map(|n| Column::new(n.clone(), Vec::new())).collect();
    let mut current_rows = 0usize;
    let mut last_key: Option<Vec<Scalar>> = None;

    loop {
        let mut best: Option<usize> = None;
        for (bi, block) in blocks.iter().enumerate() {
            if cursors[bi] >= block.num_rows() {
                continue;
            }
            best = match best {
                None => Some(bi),
                Some(b) => {
                    let ord = cmp_rows_across(&blocks[b], cursors[b], block, cursors[bi], &key_idx);
                    if ord == Ordering::Greater {
                        Some(bi)
                    } else {
                        Some(b)
                    }
                }
            };
        }
        let bi = match best {
            None => break,
            Some(bi) => bi,
        };

        let row = cursors[bi];
        let key = key_idx.iter().map(|&i| blocks[bi].columns[i].values[row].clone()).collect::<Vec<_>>();

        let run_boundary = match &last_key {
            None => true,
            Some(prev) => cmp_key_tuples(prev, &key) != Ordering::Equal,
        };
        if run_boundary && current_rows >= max_rows_per_block {
            out_blocks.push(RowBatch { columns: std::mem::replace(&mut current, template_cols.iter().map(|n| Column::new(n.clone(), Vec::new())).collect()) });
            current_rows = 0;
        }

        for (ci, name) in template_cols.iter().enumerate() {
            let src_idx = blocks[bi].column_index(name).unwrap();
            current[ci].values.push(blocks[bi].columns[src_idx].values[row].clone());
        }
        current_rows += 1;
        last_key = Some(key);
        cursors[bi] += 1;
    }

    if current_rows > 0 {
        out_blocks.push(RowBatch { columns: current });
    }
    Ok(out_blocks)
}

fn cmp_rows_across(a: &RowBatch, ai: usize, b: &RowBatch, bi: usize, key_idx: &[usize]) -> Ordering {
    for &idx in key_idx {
        let ord = sort_cmp_cell(&a.columns[idx].values[ai], &b.columns[idx].values[bi]);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

// ---------------------------------------------------------------------
// §4.F OutputAssembler
// ---------------------------------------------------------------------

/// Builds the output block's left and right columns. For ANY+LEFT,
/// `rebuild_left` is false: the block's own left columns are already
/// correct (one row in, one row out) and are left untouched, matching the
/// `changeLeftColumns` rule in §4.G/§9 — builders filling the discarded
/// left side would waste work and risk a mismatched column height if that
/// invariant is ever broken.
struct OutputAssembler<'a> {
    rebuild_left: bool,
    left_builders: Vec<Column>,
    right_builders: Vec<Column>,
    right_fields: &'a [Field],
}

impl<'a> OutputAssembler<'a> {
    fn new(left_block: &RowBatch, right_fields: &'a [Field], rebuild_left: bool, reserve: usize) -> Self {
        let left_builders = if rebuild_left {
            left_block
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), Vec::with_capacity(reserve)))
                .collect()
        } else {
            Vec::new()
        };
        let right_builders = right_fields
            .iter()
            .map(|f| Column::new(f.name.clone(), Vec::with_capacity(reserve)))
            .collect();
        Self {
            rebuild_left,
            left_builders,
            right_builders,
            right_fields,
        }
    }

    fn copy_left(&mut self, left_block: &RowBatch, start: usize, n: usize) {
        if !self.rebuild_left || n == 0 {
            return;
        }
        for (i, col) in left_block.columns.iter().enumerate() {
            self.left_builders[i].values.extend(col.values[start..start + n].iter().cloned());
        }
    }

    fn repeat_right(&mut self, right_block: &RowBatch, row: usize, n: usize) {
        if n == 0 {
            return;
        }
        for (builder, field) in self.right_builders.iter_mut().zip(self.right_fields.iter()) {
            let value = right_block.column(&field.name).map(|c| c.values[row].clone()).unwrap_or(Scalar::Null);
            builder.values.extend(std::iter::repeat(value).take(n));
        }
    }

    fn append_null_right(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        for builder in self.right_builders.iter_mut() {
            builder.values.extend(std::iter::repeat(Scalar::Null).take(n));
        }
    }

    fn finish(self) -> (Vec<Column>, Vec<Column>) {
        (self.left_builders, self.right_builders)
    }
}

// ---------------------------------------------------------------------
// §4.E / §4.G KeyRangeMerge + JoinDriver
// ---------------------------------------------------------------------

/// The partial merge join core: a stateful, reusable driver built once per
/// query from a [`JoinSpec`] and the right side's sample schema, then
/// driving `add_joined_block` calls from right-side producers and
/// `join_block` calls from left-side probers. See module docs for the
/// right-side build / left-side probe lifecycle.
pub struct MergeJoin {
    spec: JoinSpec,
    config: JoinConfig,
    right_store: RightSideStore,
    totals: RwLock<Option<RowBatch>>,
}

impl MergeJoin {
    /// Rejects any kind other than LEFT/INNER and any strictness other than
    /// ALL/ANY with `UnsupportedJoin`; rejects `max_rows_in_right_block == 0`
    /// with `ParameterOutOfBound`.
    pub fn new(spec: JoinSpec, right_sample_schema: Schema) -> Result<Self, OpError> {
        let config = JoinConfig::build(&spec, &right_sample_schema)?;
        let right_store = RightSideStore::new(
            config.right_sort_description.clone(),
            spec.max_rows_in_right_block,
            spec.size_limits,
        );
        Ok(Self {
            spec,
            config,
            right_store,
            totals: RwLock::new(None),
        })
    }

    /// Accepts one right-side block. Must not be called once the first
    /// `join_block`/`set_totals` call has frozen the right side.
    pub fn add_joined_block(&self, block: RowBatch) -> Result<bool, OpError> {
        self.right_store.add(block)
    }

    /// Stores the totals row and finalizes the right side as a side effect,
    /// matching the external contract in §6.
    pub fn set_totals(&self, totals_block: RowBatch) -> Result<(), OpError> {
        self.right_store.finalize()?;
        *self.totals.write().unwrap() = Some(totals_block);
        Ok(())
    }

    fn right_key_names(&self) -> &[String] {
        &self.spec.keys_right
    }

    fn left_key_names(&self) -> &[String] {
        &self.spec.keys_left
    }

    /// Mutates `block` in place: sorts it by the left merge key order, then
    /// probes it against every finalized right-side block in store order,
    /// appending the join's right-side columns. For LEFT joins, unmatched
    /// left rows get NULL right columns; for INNER, they are dropped.
    pub fn join_block(&self, block: &mut RowBatch) -> Result<(), OpError> {
        self.join_block_with_stop(block, &|| false)
    }

    /// As `join_block`, but polling `should_stop` between right-block
    /// iterations. A `true` result discards whatever partial output has
    /// been assembled so far and returns a recoverable error — no state in
    /// the store or the input block has been mutated that the caller can't
    /// safely retry, since the right side was frozen before this call began.
    pub fn join_block_with_stop(&self, block: &mut RowBatch, should_stop: &dyn Fn() -> bool) -> Result<(), OpError> {
        self.right_store.finalize()?;

        check_types_of_keys(block, self.left_key_names())?;

        sort_block(block, &self.config.left_sort_description)?;

        let right_blocks = self.right_store.finalized_blocks()?;
        let rebuild_left = !(self.config.is_left && !self.config.is_all);
        let reserve = if self.config.is_left { block.num_rows() } else { 0 };
        let mut assembler = OutputAssembler::new(block, &self.config.right_columns_to_add, rebuild_left, reserve);

        // Build a throwaway schema view of `block`'s keys for nullability
        // detection; the left block's own columns carry the same nullness
        // information `Scalar::Null` already encodes, so treat every key as
        // potentially nullable (see `MergeCursor::new`'s fallback).
        let left_schema = schema_from_batch(block, true);
        let mut left_cursor = MergeCursor::new(block, self.left_key_names(), &left_schema)?;

        let mut left_key_tail = 0usize;

        for right_block in right_blocks.iter() {
            if left_cursor.at_end() {
                break;
            }
            if should_stop() {
                return Err(OpError::Recoverable("merge join cancelled by should_stop probe".into()));
            }

            let right_schema = schema_from_batch(right_block, true);
            if let Some((right_min, right_max)) = {
                let probe = MergeCursor::new(right_block, self.right_key_names(), &right_schema)?;
                probe.min_max_key()
            } {
                match left_cursor.intersect(&right_min, &right_max) {
                    Ordering::Less => break,
                    Ordering::Greater => continue,
                    Ordering::Equal => {}
                }
            } else {
                continue;
            }

            let mut right_cursor = MergeCursor::new(right_block, self.right_key_names(), &right_schema)?;

            loop {
                let left_start_before = left_cursor.pos();
                // `tail` is the equal-run length deferred from a previous
                // right block (spec.md §4.E step 6's spanning rule): those
                // rows already produced real output there and must not be
                // re-emitted as an inequal-left gap here, even though the
                // cursor's own position still sits at their run's start.
                // Consumed (and zeroed) on first use per right block, the
                // same way the original's `left_unequal_position` folds the
                // deferred tail into the next gap-start computation.
                let tail = std::mem::take(&mut left_key_tail);
                let range = MergeCursor::next_equal_range(&mut left_cursor, &mut right_cursor);

                if self.config.is_left {
                    let gap_total = range.left_start - left_start_before;
                    let gap_skip = tail.min(gap_total);
                    let gap_start = left_start_before + gap_skip;
                    let gap = gap_total - gap_skip;
                    assembler.copy_left(block, gap_start, gap);
                    assembler.append_null_right(gap);
                }

                if range.left_len == 0 {
                    // `next_equal_range` only returns a zero-length range when
                    // one side ran out before a match; left_cursor's position
                    // already reflects how far it safely advanced. Move on to
                    // the next right block (or stop, if left itself is done).
                    break;
                }

                if self.config.is_all {
                    for r in range.right_start..range.right_start + range.right_len {
                        assembler.copy_left(block, range.left_start, range.left_len);
                        assembler.repeat_right(right_block, r, range.left_len);
                    }
                } else if self.config.is_left {
                    assembler.repeat_right(right_block, range.right_start, range.left_len);
                } else {
                    assembler.copy_left(block, range.left_start, range.left_len);
                    assembler.repeat_right(right_block, range.right_start, range.left_len);
                }

                right_cursor.advance(range.right_len);

                if self.config.is_all && right_cursor.at_end() {
                    left_key_tail = range.left_len;
                    break;
                }
                left_cursor.advance(range.left_len);
            }
        }

        left_cursor.advance(left_key_tail);
        if self.config.is_left {
            let tail_from = left_cursor.pos();
            let tail_len = block.num_rows().saturating_sub(tail_from);
            assembler.copy_left(block, tail_from, tail_len);
            assembler.append_null_right(tail_len);
        }

        let (left_cols, right_cols) = assembler.finish();
        if rebuild_left {
            block.columns = left_cols;
        }
        for col in right_cols {
            block.columns.push(col);
        }
        Ok(())
    }

    /// Applies the stored totals row (set by `set_totals`) to a totals
    /// block: for each of the join's added columns, broadcasts the right
    /// side's totals value for that column across every row of `block`.
    /// Totals rows never participate in the positional merge itself — there
    /// is exactly one right-side totals row (or none), so there is nothing
    /// to range-match against — but the stored row's actual values are used
    /// rather than discarded; a column falls back to NULL only when no
    /// totals row was ever stored, or that column is absent from it.
    pub fn join_totals(&self, block: &mut RowBatch) -> Result<(), OpError> {
        let n = block.num_rows();
        let totals = self.totals.read().unwrap();
        for (name, _) in &self.spec.columns_added_by_join {
            let value = totals
                .as_ref()
                .and_then(|t| t.column(name))
                .and_then(|c| c.values.first())
                .cloned()
                .unwrap_or(Scalar::Null);
            block.columns.push(Column::new(name.clone(), vec![value; n]));
        }
        Ok(())
    }
}

fn schema_from_batch(batch: &RowBatch, nullable: bool) -> Schema {
    Schema::new(
        batch
            .columns
            .iter()
            .map(|c| Field::new(c.name.clone(), DataType::Utf8, nullable))
            .collect(),
    )
}

/// External collaborator named in §6: verifies left/right key columns are
/// present before probing. This engine's `Scalar` is dynamically typed per
/// cell rather than per column, so there is no per-column `DataType` to
/// cross-check here the way a columnar engine would; what this subsystem
/// can and does check up front is that every left key column the spec
/// names actually exists in the probed block, rather than discovering a
/// typo mid-merge.
fn check_types_of_keys(left_block: &RowBatch, keys_left: &[String]) -> Result<(), OpError> {
    for name in keys_left {
        if left_block.column(name).is_none() {
            return Err(OpError::Exec(format!(
                "TYPE_MISMATCH: left join key '{}' not found in block",
                name
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------
// Operator trait adapter
// ---------------------------------------------------------------------

/// Thin adapter so the TE runtime's generic binary-operator wiring (see
/// `registry::Registry`) can drive a `MergeJoin` the same way it drives
/// `join::hash::HashJoin`: one call materializes the whole right side as a
/// single block, the other probes a single left block against it. The
/// stateful `add_joined_block`/`join_block` API above is the one that
/// actually matches this subsystem's specified lifecycle; this impl exists
/// for single-shot convenience and tests, not for genuine multi-block
/// right-side accumulation.
pub struct MergeJoinOperator {
    pub spec_kind: String,   // "inner" | "left"
    pub strictness: String,  // "all" | "any"
    pub on: Vec<(String, String)>,
}

impl Default for MergeJoinOperator {
    fn default() -> Self {
        Self {
            spec_kind: "inner".to_string(),
            strictness: "all".to_string(),
            on: Vec::new(),
        }
    }
}

impl MergeJoinOperator {
    fn build_spec(&self, right_schema: &Schema) -> Result<JoinSpec, OpError> {
        let kind = match self.spec_kind.to_lowercase().as_str() {
            "inner" => JoinKind::Inner,
            "left" => JoinKind::Left,
            other => return Err(OpError::Plan(format!("UNSUPPORTED_JOIN: join kind '{}' not supported", other))),
        };
        let strictness = match self.strictness.to_lowercase().as_str() {
            "all" => Strictness::All,
            "any" => Strictness::Any,
            other => return Err(OpError::Plan(format!("UNSUPPORTED_JOIN: strictness '{}' not supported", other))),
        };
        let keys_left = self.on.iter().map(|(l, _)| l.clone()).collect();
        let keys_right: Vec<String> = self.on.iter().map(|(_, r)| r.clone()).collect();
        let columns_added_by_join = right_schema
            .fields
            .iter()
            .filter(|f| !keys_right.contains(&f.name))
            .map(|f| (f.name.clone(), f.data_type.clone()))
            .collect();
        Ok(JoinSpec {
            kind,
            strictness,
            keys_left,
            keys_right,
            columns_added_by_join,
            force_nullable_right: false,
            max_rows_in_right_block: 65_536,
            size_limits: SizeLimits::default(),
        })
    }
}

impl Operator for MergeJoinOperator {
    fn name(&self) -> &'static str {
        "join_merge"
    }

    fn memory_need(&self, _rows: u64, _bytes: u64) -> Footprint {
        Footprint {
            bytes_per_row: 1,
            overhead_bytes: 64 * 1024,
        }
    }

    fn plan(&self, input_schemas: &[Schema]) -> Result<OpPlan, OpError> {
        if input_schemas.len() != 2 {
            return Err(OpError::Plan("merge join expects two inputs".into()));
        }
        let left_schema = &input_schemas[0];
        let right_schema = &input_schemas[1];
        let keys_right: Vec<String> = self.on.iter().map(|(_, r)| r.clone()).collect();

        let mut fields = left_schema.fields.clone();
        let force_nullable = self.spec_kind.eq_ignore_ascii_case("left");
        for field in &right_schema.fields {
            if keys_right.contains(&field.name) {
                continue;
            }
            let mut new_field = field.clone();
            if fields.iter().any(|f| f.name == field.name) {
                new_field.name = format!("{}_right", field.name);
            }
            if force_nullable {
                new_field.nullable = true;
            }
            fields.push(new_field);
        }
        Ok(OpPlan::new(Schema::new(fields), self.memory_need(0, 0)))
    }

    fn eval_block(
        &self,
        inputs: &[RowBatch],
        _budget: &dyn MemoryBudget<Guard = emsqrt_mem::guard::BudgetGuardImpl>,
    ) -> Result<RowBatch, OpError> {
        if inputs.len() != 2 {
            return Err(OpError::Exec("merge join needs two block inputs".into()));
        }
        let left = inputs[0].clone();
        let right = inputs[1].clone();

        // Column names that `plan()` advertised as the left side's own,
        // before the join appends anything — used below to replicate
        // `plan()`'s `"{name}_right"` collision suffixing on the actual
        // output columns, since `JoinSpec::columns_added_by_join` itself
        // must carry the right sample's raw names (`MergeJoin` looks
        // columns up in each right block by that exact name).
        let left_field_names: Vec<String> = left.columns.iter().map(|c| c.name.clone()).collect();

        let right_schema = schema_from_batch(&right, true);
        let spec = self.build_spec(&right_schema)?;
        let added_names: Vec<String> = spec.columns_added_by_join.iter().map(|(n, _)| n.clone()).collect();
        let join = MergeJoin::new(spec, right_schema)?;
        join.add_joined_block(right)?;

        let mut out = left;
        join.join_block(&mut out)?;

        for added in &added_names {
            if left_field_names.contains(added) {
                if let Some(col) = out.columns.iter_mut().find(|c| &c.name == added) {
                    col.name = format!("{}_right", added);
                }
            }
        }

        Ok(out)
    }
}
