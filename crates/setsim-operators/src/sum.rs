//! Sum operator: reduces numeric columns to a one-row table, or to one row
//! per distinct key when `group_by` is set.

use serde::{Deserialize, Serialize};
use setsim_core::prelude::{Column, ColumnData, Field, PrimitiveColumn, Scalar, Schema, Table};
use setsim_mem::guard::{acquire, MemoryBudgetImpl};

use crate::kernels::chunk::Parallelism;
use crate::kernels::sum::{grouped_bytes, sum_column, sum_grouped};
use crate::plan::{Footprint, OpPlan};
use crate::traits::{require_column, require_field, single_input, EvalContext, OpError, Operator};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SumOp {
    /// Columns to sum. Empty means every numeric column except the key.
    pub columns: Vec<String>,
    pub group_by: Option<String>,
}

impl SumOp {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn columns<S: AsRef<str>>(columns: &[S]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            group_by: None,
        }
    }

    pub fn grouped<S: AsRef<str>>(key: &str, columns: &[S]) -> Self {
        Self {
            group_by: Some(key.to_string()),
            ..Self::columns(columns)
        }
    }

    /// Resolve the value fields to sum against `schema`.
    ///
    /// An ungrouped sum must find at least one numeric column, and the group
    /// key can never be summed as a value.
    fn value_fields(&self, schema: &Schema) -> Result<Vec<Field>, OpError> {
        if self.columns.is_empty() {
            let fields: Vec<Field> = schema
                .fields
                .iter()
                .filter(|f| f.data_type.is_numeric())
                .filter(|f| self.group_by.as_deref() != Some(f.name.as_str()))
                .cloned()
                .collect();
            if fields.is_empty() && self.group_by.is_none() {
                return Err(OpError::Plan("no numeric columns to sum".into()));
            }
            return Ok(fields);
        }
        if let Some(key) = self.group_by.as_deref() {
            if self.columns.iter().any(|c| c == key) {
                return Err(OpError::Plan(format!(
                    "group key '{key}' cannot also be summed"
                )));
            }
        }
        self.columns
            .iter()
            .map(|name| {
                let field = require_field(schema, name)?;
                if field.data_type.is_numeric() {
                    Ok(field.clone())
                } else {
                    Err(OpError::ColumnType {
                        column: name.clone(),
                        expected: "numeric".into(),
                        found: field.data_type.to_string(),
                    })
                }
            })
            .collect()
    }

    fn output_schema(&self, input: &Schema) -> Result<Schema, OpError> {
        let mut fields = Vec::new();
        if let Some(key) = &self.group_by {
            let field = require_field(input, key)?;
            fields.push(field.clone());
        }
        for f in self.value_fields(input)? {
            fields.push(Field::new(f.name, f.data_type, false));
        }
        Ok(Schema::new(fields))
    }
}

fn scalar_column(name: &str, value: Scalar) -> Result<Column, OpError> {
    let data = match value {
        Scalar::I64(v) => ColumnData::Int64(PrimitiveColumn::new(vec![v])),
        Scalar::U64(v) => ColumnData::UInt64(PrimitiveColumn::new(vec![v])),
        Scalar::F64(v) => ColumnData::Float64(PrimitiveColumn::new(vec![v])),
        other => {
            return Err(OpError::Exec(format!(
                "sum of '{name}' produced non-numeric {other:?}"
            )))
        }
    };
    Ok(Column::new(name, data))
}

impl Operator for SumOp {
    fn name(&self) -> &'static str {
        "sum"
    }

    fn params(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    fn input_columns(&self) -> Vec<String> {
        let mut cols = self.columns.clone();
        if let Some(key) = &self.group_by {
            cols.insert(0, key.clone());
        }
        cols
    }

    fn memory_need(&self, _rows: u64, _bytes: u64) -> Footprint {
        // Ungrouped output is one row; grouped scratch is bounded per row.
        let value_columns = self.columns.len().max(1);
        Footprint {
            bytes_per_row: if self.group_by.is_some() {
                grouped_bytes(1, value_columns) as u64
            } else {
                0
            },
            overhead_bytes: 1024,
        }
    }

    fn plan(&self, input_schemas: &[Schema]) -> Result<OpPlan, OpError> {
        let schema = input_schemas
            .first()
            .ok_or_else(|| OpError::Plan("sum expects one input".into()))?;
        Ok(OpPlan::new(self.output_schema(schema)?, self.memory_need(0, 0)))
    }

    fn eval_block(&self, inputs: &[Table], ctx: &EvalContext<'_>) -> Result<Table, OpError> {
        let input = single_input(inputs, self.name())?;
        let fields = self.value_fields(&input.schema())?;
        let values = fields
            .iter()
            .map(|f| require_column(input, &f.name))
            .collect::<Result<Vec<_>, _>>()?;

        let out = match &self.group_by {
            None => {
                let _guard = acquire(ctx.budget, fields.len() * 8, "sum_out")?;
                let columns = values
                    .iter()
                    .map(|col| {
                        let total = sum_column(&col.data, ctx.parallelism)?;
                        scalar_column(&col.name, total)
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Table::new(columns)?
            }
            Some(key) => {
                let key_col = require_column(input, key)?;
                let _guard = acquire(
                    ctx.budget,
                    grouped_bytes(input.num_rows(), values.len()),
                    "sum_groups",
                )?;
                let data: Vec<&ColumnData> = values.iter().map(|c| &c.data).collect();
                let (keys, sums) = sum_grouped(&key_col.data, &data, ctx.parallelism)
                    .map_err(|e| match e {
                        OpError::ColumnType {
                            expected, found, ..
                        } => OpError::ColumnType {
                            column: key.clone(),
                            expected,
                            found,
                        },
                        other => other,
                    })?;
                let mut columns = vec![Column::new(key.clone(), keys)];
                columns.extend(
                    values
                        .iter()
                        .zip(sums)
                        .map(|(col, data)| Column::new(col.name.clone(), data)),
                );
                Table::new(columns)?
            }
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            columns = fields.len(),
            input_rows = input.num_rows(),
            output_rows = out.num_rows(),
            "sum evaluated"
        );

        Ok(out)
    }
}

fn eval_eager(op: SumOp, table: &Table) -> Result<Table, OpError> {
    let budget = MemoryBudgetImpl::unbounded();
    let parallelism = Parallelism::default();
    let ctx = EvalContext {
        budget: &budget,
        parallelism: &parallelism,
    };
    op.eval_block(std::slice::from_ref(table), &ctx)
}

/// One-row table of column sums. Empty `columns` sums every numeric column;
/// a table without one is a `Plan` error.
pub fn sum_table<S: AsRef<str>>(table: &Table, columns: &[S]) -> Result<Table, OpError> {
    eval_eager(SumOp::columns(columns), table)
}

/// Per-key sums, one row per distinct value of `key` in first-appearance order.
pub fn sum_table_grouped<S: AsRef<str>>(
    table: &Table,
    key: &str,
    columns: &[S],
) -> Result<Table, OpError> {
    eval_eager(SumOp::grouped(key, columns), table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mk_table() -> Table {
        Table::new(vec![
            Column::utf8("k", vec!["x".into(), "y".into(), "x".into()]),
            Column::int64("n", vec![1, 2, 3]),
            Column::new(
                "f",
                ColumnData::Float64(PrimitiveColumn::from_options(vec![
                    Some(0.5),
                    None,
                    Some(1.5),
                ])),
            ),
            Column::list("l", vec![vec![1], vec![2], vec![3]]),
        ])
        .unwrap()
    }

    #[test]
    fn sums_all_numeric_columns_by_default() {
        let out = sum_table::<&str>(&mk_table(), &[]).unwrap();
        assert_eq!(out.num_rows(), 1);
        assert_eq!(out.num_columns(), 2);
        assert_eq!(out.column("n").unwrap().data.scalar_at(0), Scalar::I64(6));
        assert_eq!(out.column("f").unwrap().data.scalar_at(0), Scalar::F64(2.0));
    }

    #[test]
    fn named_list_column_is_rejected() {
        let err = sum_table(&mk_table(), &["l"]).unwrap_err();
        assert!(matches!(err, OpError::ColumnType { ref column, .. } if column == "l"));
    }

    #[test]
    fn grouped_sums_follow_key_order() {
        let out = sum_table_grouped(&mk_table(), "k", &["n"]).unwrap();
        assert_eq!(out.num_rows(), 2);
        assert_eq!(out.column("k").unwrap().data.scalar_at(0), Scalar::Str("x".into()));
        assert_eq!(out.column("n").unwrap().data.scalar_at(0), Scalar::I64(4));
        assert_eq!(out.column("n").unwrap().data.scalar_at(1), Scalar::I64(2));
    }

    #[test]
    fn plan_matches_eval_schema() {
        let table = mk_table();
        let op = SumOp::grouped::<&str>("k", &[]);
        let planned = op.plan(&[table.schema()]).unwrap().output_schema;
        let out = eval_eager(op, &table).unwrap();
        let names: Vec<_> = planned.fields.iter().map(|f| f.name.clone()).collect();
        let got: Vec<_> = out.schema().fields.iter().map(|f| f.name.clone()).collect();
        assert_eq!(names, got);
    }

    #[test]
    fn key_listed_as_value_is_rejected() {
        let err = sum_table_grouped(&mk_table(), "k", &["k", "n"]).unwrap_err();
        assert!(matches!(err, OpError::Plan(ref msg) if msg.contains("'k'")));

        let numeric_key = sum_table_grouped(&mk_table(), "n", &["n"]).unwrap_err();
        assert!(matches!(numeric_key, OpError::Plan(_)));
        let planned = SumOp::grouped("n", &["n"]).plan(&[mk_table().schema()]);
        assert!(matches!(planned, Err(OpError::Plan(_))));
    }

    #[test]
    fn table_without_numeric_columns_is_rejected() {
        let table = Table::new(vec![
            Column::utf8("k", vec!["x".into()]),
            Column::list("l", vec![vec![1]]),
        ])
        .unwrap();
        let err = sum_table::<&str>(&table, &[]).unwrap_err();
        assert!(matches!(err, OpError::Plan(ref msg) if msg.contains("no numeric")));
        assert!(matches!(
            SumOp::all().plan(&[table.schema()]),
            Err(OpError::Plan(_))
        ));

        // Grouping over the same table still yields one row per key.
        let keys_only = sum_table_grouped::<&str>(&table, "k", &[]).unwrap();
        assert_eq!(keys_only.num_rows(), 1);
        assert_eq!(keys_only.num_columns(), 1);
    }

    #[test]
    fn grouped_guard_counts_sparse_scratch() {
        let table = mk_table();
        let need = grouped_bytes(table.num_rows(), 1);
        let budget = MemoryBudgetImpl::new(need - 1);
        let par = Parallelism::sequential();
        let ctx = EvalContext {
            budget: &budget,
            parallelism: &par,
        };
        let err = SumOp::grouped("k", &["n"])
            .eval_block(&[table], &ctx)
            .unwrap_err();
        assert!(matches!(
            err,
            OpError::Budget(setsim_mem::Error::BudgetExceeded { tag: "sum_groups", requested, .. })
                if requested == need
        ));
    }
}
