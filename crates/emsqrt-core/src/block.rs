//! Sort-key descriptions shared by external sort and merge join.

use serde::{Deserialize, Serialize};

/// One column of a multi-column sort order.
///
/// `direction` and `null_direction` follow the ClickHouse convention of `+1`
/// for ascending / nulls-last and `-1` for descending / nulls-first. The
/// merge join subsystem only ever constructs ascending, nulls-last
/// descriptions (see `emsqrt_operators::join::merge::sort_block`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortColumnDescription {
    pub column_name: String,
    pub direction: i8,
    pub null_direction: i8,
}

impl SortColumnDescription {
    pub fn asc_nulls_last(column_name: impl Into<String>) -> Self {
        Self {
            column_name: column_name.into(),
            direction: 1,
            null_direction: 1,
        }
    }
}

/// An ordered list of sort-key columns.
pub type SortDescription = Vec<SortColumnDescription>;

/// Build a `SortDescription` of ascending, nulls-last columns from plain names.
pub fn sort_description_of(names: &[String]) -> SortDescription {
    names
        .iter()
        .map(|n| SortColumnDescription::asc_nulls_last(n.clone()))
        .collect()
}

/// Drop duplicate column names while preserving order, used to turn a
/// "merge description" (which may repeat a key, e.g. joins with duplicated
/// key columns) into a plain sort description.
pub fn dedup_description(desc: &SortDescription) -> SortDescription {
    let mut seen = std::collections::HashSet::new();
    desc.iter()
        .filter(|c| seen.insert(c.column_name.clone()))
        .cloned()
        .collect()
}
