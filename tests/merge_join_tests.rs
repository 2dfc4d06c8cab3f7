//! Merge join operator tests
//!
//! Only LEFT and INNER kinds are exercised here; RIGHT/FULL are served by
//! the grace hash join instead and are out of scope for the merge join
//! subsystem under test.

use emsqrt_core::schema::{DataType, Field, Schema};
use emsqrt_core::types::{Column, RowBatch, Scalar};
use emsqrt_mem::guard::MemoryBudgetImpl;
use emsqrt_operators::join::merge::{
    JoinKind, JoinSpec, MergeJoin, MergeJoinOperator, OverflowMode, SizeLimits, Strictness,
};
use emsqrt_operators::traits::Operator;

fn create_sorted_left_batch() -> RowBatch {
    RowBatch {
        columns: vec![
            Column::new("id", vec![Scalar::I32(1), Scalar::I32(2), Scalar::I32(3), Scalar::I32(4)]),
            Column::new(
                "name",
                vec![
                    Scalar::Str("Alice".to_string()),
                    Scalar::Str("Bob".to_string()),
                    Scalar::Str("Charlie".to_string()),
                    Scalar::Str("David".to_string()),
                ],
            ),
        ],
    }
}

fn create_sorted_right_batch() -> RowBatch {
    RowBatch {
        columns: vec![
            Column::new("id", vec![Scalar::I32(2), Scalar::I32(3), Scalar::I32(5)]),
            Column::new("value", vec![Scalar::F64(10.5), Scalar::F64(20.0), Scalar::F64(30.0)]),
        ],
    }
}

fn right_schema_for(right: &RowBatch, key: &str) -> Schema {
    Schema::new(
        right
            .columns
            .iter()
            .map(|c| {
                let data_type = if c.name == key { DataType::Int32 } else { DataType::Float64 };
                Field::new(c.name.clone(), data_type, true)
            })
            .collect(),
    )
}

fn base_spec(kind: JoinKind, strictness: Strictness, max_rows_in_right_block: usize) -> JoinSpec {
    JoinSpec {
        kind,
        strictness,
        keys_left: vec!["id".to_string()],
        keys_right: vec!["id".to_string()],
        columns_added_by_join: vec![("value".to_string(), DataType::Float64)],
        force_nullable_right: false,
        max_rows_in_right_block,
        size_limits: SizeLimits::default(),
    }
}

#[test]
fn test_merge_join_inner_via_stateful_api() {
    let right = create_sorted_right_batch();
    let right_schema = right_schema_for(&right, "id");
    let join = MergeJoin::new(base_spec(JoinKind::Inner, Strictness::All, 100), right_schema).unwrap();
    join.add_joined_block(right).unwrap();

    let mut left = create_sorted_left_batch();
    join.join_block(&mut left).unwrap();

    // Inner join should produce 2 rows (id=2 and id=3 match).
    assert_eq!(left.num_rows(), 2);
    assert_eq!(left.columns.len(), 3); // id, name, value
}

#[test]
fn test_merge_join_left_via_stateful_api() {
    let right = create_sorted_right_batch();
    let right_schema = right_schema_for(&right, "id");
    let join = MergeJoin::new(base_spec(JoinKind::Left, Strictness::All, 100), right_schema).unwrap();
    join.add_joined_block(right).unwrap();

    let mut left = create_sorted_left_batch();
    join.join_block(&mut left).unwrap();

    // Left join should produce 4 rows: all from left, NULLs for non-matches.
    assert_eq!(left.num_rows(), 4);
    let value_col = left.column("value").unwrap();
    assert!(value_col.values[0].is_null()); // id=1, no right match
    assert!(!value_col.values[1].is_null()); // id=2
    assert!(!value_col.values[2].is_null()); // id=3
    assert!(value_col.values[3].is_null()); // id=4, no right match
}

#[test]
fn test_merge_join_duplicate_keys_inner_all() {
    let left = RowBatch {
        columns: vec![
            Column::new("id", vec![Scalar::I32(1), Scalar::I32(1), Scalar::I32(2)]),
            Column::new("name", vec![Scalar::Str("A".into()), Scalar::Str("B".into()), Scalar::Str("C".into())]),
        ],
    };
    let right = RowBatch {
        columns: vec![
            Column::new("id", vec![Scalar::I32(1), Scalar::I32(2)]),
            Column::new("value", vec![Scalar::F64(10.0), Scalar::F64(20.0)]),
        ],
    };

    let right_schema = right_schema_for(&right, "id");
    let join = MergeJoin::new(base_spec(JoinKind::Inner, Strictness::All, 100), right_schema).unwrap();
    join.add_joined_block(right).unwrap();

    let mut left = left;
    join.join_block(&mut left).unwrap();

    // Cartesian product: 2 left rows * 1 right row for id=1, plus 1 for id=2.
    assert_eq!(left.num_rows(), 3);
}

#[test]
fn test_merge_join_empty_inputs() {
    let left = RowBatch {
        columns: vec![Column::new("id", vec![])],
    };
    let right = RowBatch {
        columns: vec![Column::new("id", vec![]), Column::new("value", vec![])],
    };

    let right_schema = Schema::new(vec![
        Field::new("id", DataType::Int32, true),
        Field::new("value", DataType::Float64, true),
    ]);
    let join = MergeJoin::new(base_spec(JoinKind::Inner, Strictness::All, 100), right_schema).unwrap();
    join.add_joined_block(right).unwrap();

    let mut left = left;
    join.join_block(&mut left).unwrap();

    assert_eq!(left.num_rows(), 0);
}

#[test]
fn test_merge_join_any_strictness_left() {
    let right = RowBatch {
        columns: vec![
            Column::new("id", vec![Scalar::I32(2), Scalar::I32(2)]),
            Column::new("value", vec![Scalar::F64(1.0), Scalar::F64(2.0)]),
        ],
    };
    let right_schema = right_schema_for(&right, "id");
    let join = MergeJoin::new(base_spec(JoinKind::Left, Strictness::Any, 100), right_schema).unwrap();
    join.add_joined_block(right).unwrap();

    let mut left = create_sorted_left_batch();
    join.join_block(&mut left).unwrap();

    // One output row per left row regardless of how many right rows match.
    assert_eq!(left.num_rows(), 4);
}

#[test]
fn test_merge_join_spans_right_blocks() {
    let right_schema = Schema::new(vec![
        Field::new("id", DataType::Int32, true),
        Field::new("value", DataType::Float64, true),
    ]);
    // max_rows_in_right_block = 1 forces the equal-key run for id=2 to span
    // two finalized blocks; correctness depends on the spanning rule.
    let join = MergeJoin::new(base_spec(JoinKind::Inner, Strictness::All, 1), right_schema).unwrap();
    join.add_joined_block(RowBatch {
        columns: vec![Column::new("id", vec![Scalar::I32(2)]), Column::new("value", vec![Scalar::F64(1.0)])],
    })
    .unwrap();
    join.add_joined_block(RowBatch {
        columns: vec![Column::new("id", vec![Scalar::I32(2)]), Column::new("value", vec![Scalar::F64(2.0)])],
    })
    .unwrap();

    let mut left = RowBatch {
        columns: vec![Column::new("id", vec![Scalar::I32(2), Scalar::I32(2)])],
    };
    join.join_block(&mut left).unwrap();

    // 2 left rows x 2 right rows with id=2 = 4 rows.
    assert_eq!(left.num_rows(), 4);
}

#[test]
fn test_merge_join_null_keys_never_match() {
    let right = RowBatch {
        columns: vec![
            Column::new("id", vec![Scalar::Null, Scalar::I32(1)]),
            Column::new("value", vec![Scalar::F64(9.0), Scalar::F64(1.0)]),
        ],
    };
    let right_schema = right_schema_for(&right, "id");
    let join = MergeJoin::new(base_spec(JoinKind::Inner, Strictness::All, 100), right_schema).unwrap();
    join.add_joined_block(right).unwrap();

    let mut left = RowBatch {
        columns: vec![Column::new("id", vec![Scalar::Null, Scalar::I32(1)])],
    };
    join.join_block(&mut left).unwrap();

    assert_eq!(left.num_rows(), 1);
    assert_eq!(left.column("id").unwrap().values[0], Scalar::I32(1));
}

#[test]
fn test_merge_join_size_limit_throw() {
    let right_schema = Schema::new(vec![
        Field::new("id", DataType::Int32, true),
        Field::new("value", DataType::Float64, true),
    ]);
    let mut spec = base_spec(JoinKind::Inner, Strictness::Any, 100);
    spec.size_limits = SizeLimits {
        max_rows: 2,
        max_bytes: u64::MAX,
        overflow_mode: OverflowMode::Throw,
    };
    let join = MergeJoin::new(spec, right_schema).unwrap();
    let big = RowBatch {
        columns: vec![
            Column::new("id", vec![Scalar::I32(1), Scalar::I32(2), Scalar::I32(3)]),
            Column::new("value", vec![Scalar::F64(1.0), Scalar::F64(2.0), Scalar::F64(3.0)]),
        ],
    };
    assert!(join.add_joined_block(big).is_err());
}

#[test]
fn test_merge_join_size_limit_break_truncates() {
    let right_schema = Schema::new(vec![
        Field::new("id", DataType::Int32, true),
        Field::new("value", DataType::Float64, true),
    ]);
    let mut spec = base_spec(JoinKind::Inner, Strictness::Any, 100);
    spec.size_limits = SizeLimits {
        max_rows: 2,
        max_bytes: u64::MAX,
        overflow_mode: OverflowMode::Break,
    };
    let join = MergeJoin::new(spec, right_schema).unwrap();
    let big = RowBatch {
        columns: vec![
            Column::new("id", vec![Scalar::I32(1), Scalar::I32(2), Scalar::I32(3)]),
            Column::new("value", vec![Scalar::F64(1.0), Scalar::F64(2.0), Scalar::F64(3.0)]),
        ],
    };
    let accepted_all = join.add_joined_block(big).unwrap();
    assert!(!accepted_all);

    let mut left = RowBatch {
        columns: vec![Column::new("id", vec![Scalar::I32(3)])],
    };
    join.join_block(&mut left).unwrap();
    // id=3 was truncated away by the BREAK-mode size limit.
    assert_eq!(left.num_rows(), 0);
}

#[test]
fn test_merge_join_operator_adapter() {
    let left = create_sorted_left_batch();
    let right = create_sorted_right_batch();

    let op = MergeJoinOperator {
        spec_kind: "inner".to_string(),
        strictness: "all".to_string(),
        on: vec![("id".to_string(), "id".to_string())],
    };

    let budget = MemoryBudgetImpl::new(10 * 1024 * 1024);
    let result = op.eval_block(&[left, right], &budget).unwrap();

    assert_eq!(result.num_rows(), 2);
}

#[test]
fn test_merge_join_operator_adapter_left() {
    let left = create_sorted_left_batch();
    let right = create_sorted_right_batch();

    let op = MergeJoinOperator {
        spec_kind: "left".to_string(),
        strictness: "all".to_string(),
        on: vec![("id".to_string(), "id".to_string())],
    };

    let budget = MemoryBudgetImpl::new(10 * 1024 * 1024);
    let result = op.eval_block(&[left, right], &budget).unwrap();

    assert_eq!(result.num_rows(), 4);
}

#[test]
fn test_merge_join_operator_adapter_colliding_column_name_matches_plan() {
    // Left and right both have a non-key "name" column; `plan()` must
    // advertise "name_right" for the appended one, and `eval_block`'s
    // actual output must use that same name, not the raw "name".
    let left = RowBatch {
        columns: vec![
            Column::new("id", vec![Scalar::I32(1), Scalar::I32(2)]),
            Column::new("name", vec![Scalar::Str("Alice".to_string()), Scalar::Str("Bob".to_string())]),
        ],
    };
    let right = RowBatch {
        columns: vec![
            Column::new("id", vec![Scalar::I32(1), Scalar::I32(2)]),
            Column::new("name", vec![Scalar::Str("x".to_string()), Scalar::Str("y".to_string())]),
        ],
    };
    let left_schema = Schema::new(vec![
        Field::new("id", DataType::Int32, false),
        Field::new("name", DataType::Utf8, false),
    ]);
    let right_schema = Schema::new(vec![
        Field::new("id", DataType::Int32, false),
        Field::new("name", DataType::Utf8, false),
    ]);

    let op = MergeJoinOperator {
        spec_kind: "inner".to_string(),
        strictness: "all".to_string(),
        on: vec![("id".to_string(), "id".to_string())],
    };

    let planned = op.plan(&[left_schema, right_schema]).unwrap();
    let planned_names: Vec<&str> = planned.out_schema.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(planned_names, vec!["id", "name", "name_right"]);

    let budget = MemoryBudgetImpl::new(10 * 1024 * 1024);
    let result = op.eval_block(&[left, right], &budget).unwrap();
    let actual_names: Vec<&str> = result.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(actual_names, planned_names);
}
