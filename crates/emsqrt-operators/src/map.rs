//! Map operator: one-to-one column rewriting.
//!
//! Accepts either a bare expression (evaluated into a new `_expr` column
//! appended to the input) or an `"<expr> AS <alias>"` form that renames the
//! referenced column in place, which is all the planner currently emits for
//! `LogicalPlan::Map`.

use emsqrt_core::expr::Expr;
use emsqrt_core::prelude::Schema;
use emsqrt_core::schema::Field;
use emsqrt_core::types::RowBatch;

use crate::plan::{Footprint, OpPlan};
use crate::traits::{MemoryBudget, OpError, Operator};

#[derive(Default)]
pub struct Map {
    pub expr: Option<String>,
}

struct ParsedMap {
    source_col: String,
    alias: Option<String>,
}

fn parse_map_expr(expr: &str) -> ParsedMap {
    if let Some(idx) = expr.to_uppercase().find(" AS ") {
        let source_col = expr[..idx].trim().to_string();
        let alias = expr[idx + 4..].trim().to_string();
        ParsedMap {
            source_col,
            alias: Some(alias),
        }
    } else {
        ParsedMap {
            source_col: expr.trim().to_string(),
            alias: None,
        }
    }
}

impl Operator for Map {
    fn name(&self) -> &'static str {
        "map"
    }

    fn memory_need(&self, _rows: u64, _bytes: u64) -> Footprint {
        Footprint {
            bytes_per_row: 1,
            overhead_bytes: 4 * 1024,
        }
    }

    fn plan(&self, input_schemas: &[Schema]) -> Result<OpPlan, OpError> {
        let input = input_schemas
            .get(0)
            .ok_or_else(|| OpError::Plan("map expects one input".into()))?;

        let mut fields: Vec<Field> = input.fields.clone();
        if let Some(expr) = &self.expr {
            let parsed = parse_map_expr(expr);
            if let Some(alias) = &parsed.alias {
                let src = fields
                    .iter()
                    .position(|f| f.name == parsed.source_col)
                    .ok_or_else(|| {
                        OpError::Plan(format!("map: unknown column '{}'", parsed.source_col))
                    })?;
                fields[src].name = alias.clone();
            }
        }

        Ok(OpPlan::new(Schema::new(fields), self.memory_need(0, 0)))
    }

    fn eval_block(
        &self,
        inputs: &[RowBatch],
        _budget: &dyn MemoryBudget<Guard = emsqrt_mem::guard::BudgetGuardImpl>,
    ) -> Result<RowBatch, OpError> {
        let input = inputs
            .get(0)
            .ok_or_else(|| OpError::Exec("map needs one block input".into()))?;

        let Some(expr) = &self.expr else {
            return Ok(input.clone());
        };
        let parsed = parse_map_expr(expr);

        if let Some(alias) = &parsed.alias {
            let mut out = input.clone();
            let col = out
                .columns
                .iter_mut()
                .find(|c| c.name == parsed.source_col)
                .ok_or_else(|| {
                    OpError::Exec(format!("map: unknown column '{}'", parsed.source_col))
                })?;
            col.name = alias.clone();
            return Ok(out);
        }

        // No alias: evaluate the expression per row into a fresh `_expr` column.
        let parsed_expr = Expr::Column(parsed.source_col.clone());
        let mut out = input.clone();
        let mut values = Vec::with_capacity(input.num_rows());
        for row in 0..input.num_rows() {
            values.push(
                parsed_expr
                    .evaluate(input, row)
                    .map_err(OpError::Exec)?,
            );
        }
        out.columns.push(emsqrt_core::types::Column {
            name: "_expr".to_string(),
            values,
        });
        Ok(out)
    }
}
