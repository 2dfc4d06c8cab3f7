//! Sort operators. `external` holds the spill-backed external merge sort
//! used when a single block's sort key set does not fit the memory budget;
//! the merge join subsystem's own in-block sort (`sort_block` in
//! `join::merge`) is deliberately separate and never spills (see
//! `emsqrt-mem::spill` module docs).

pub mod external;
