//! Filter operator with simple predicate evaluation.
//!
//! Supports expressions of the form: "col OP literal" where OP ∈ {==, !=, <, <=, >, >=}

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use setsim_core::prelude::{ColumnData, DataType, Schema, Table};
use setsim_mem::guard::acquire;

use crate::plan::{Footprint, OpPlan};
use crate::traits::{require_column, require_field, single_input, EvalContext, OpError, Operator};

/// One mask byte plus one gathered index per input row.
const BYTES_PER_ROW: usize = std::mem::size_of::<bool>() + std::mem::size_of::<usize>();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    const TOKENS: [(&'static str, CmpOp); 6] = [
        ("==", CmpOp::Eq),
        ("!=", CmpOp::Ne),
        ("<=", CmpOp::Le),
        (">=", CmpOp::Ge),
        ("<", CmpOp::Lt),
        (">", CmpOp::Gt),
    ];

    fn holds(self, ord: Ordering) -> bool {
        match self {
            CmpOp::Eq => ord == Ordering::Equal,
            CmpOp::Ne => ord != Ordering::Equal,
            CmpOp::Lt => ord == Ordering::Less,
            CmpOp::Le => ord != Ordering::Greater,
            CmpOp::Gt => ord == Ordering::Greater,
            CmpOp::Ge => ord != Ordering::Less,
        }
    }
}

/// Parsed "column op literal".
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub column: String,
    pub op: CmpOp,
    pub literal: String,
}

impl Predicate {
    /// Parse a simple predicate like "age > 18" or "name == Alice".
    pub fn parse(expr: &str) -> Result<Self, OpError> {
        for (token, op) in CmpOp::TOKENS {
            if let Some(pos) = expr.find(token) {
                let column = expr[..pos].trim().to_string();
                let literal = expr[pos + token.len()..].trim().to_string();
                if column.is_empty() {
                    break;
                }
                return Ok(Self {
                    column,
                    op,
                    literal,
                });
            }
        }
        Err(OpError::Plan(format!("unparseable predicate: {expr}")))
    }

    fn parse_lit<T: std::str::FromStr>(&self, ty: &str) -> Result<T, OpError> {
        self.literal
            .parse::<T>()
            .map_err(|_| OpError::Exec(format!("cannot parse '{}' as {ty}", self.literal)))
    }

    /// Row mask for `data`; null cells never match.
    fn mask(&self, data: &ColumnData) -> Result<Vec<bool>, OpError> {
        fn cmp_all<T, F>(it: impl Iterator<Item = Option<T>>, op: CmpOp, f: F) -> Vec<bool>
        where
            F: Fn(T) -> Option<Ordering>,
        {
            it.map(|v| v.and_then(&f).is_some_and(|ord| op.holds(ord)))
                .collect()
        }

        Ok(match data {
            ColumnData::Boolean(c) => {
                if !matches!(self.op, CmpOp::Eq | CmpOp::Ne) {
                    return Err(OpError::Exec(format!(
                        "unsupported op {:?} for bool",
                        self.op
                    )));
                }
                let lit: bool = self.parse_lit("bool")?;
                cmp_all(c.iter(), self.op, |v| Some(v.cmp(&lit)))
            }
            ColumnData::Int64(c) => {
                let lit: i64 = self.parse_lit("i64")?;
                cmp_all(c.iter(), self.op, |v| Some(v.cmp(&lit)))
            }
            ColumnData::UInt64(c) => {
                let lit: u64 = self.parse_lit("u64")?;
                cmp_all(c.iter(), self.op, |v| Some(v.cmp(&lit)))
            }
            ColumnData::Float64(c) => {
                let lit: f64 = self.parse_lit("f64")?;
                cmp_all(c.iter(), self.op, |v| v.partial_cmp(&lit))
            }
            ColumnData::Utf8(c) => {
                let lit = self.literal.as_str();
                cmp_all(c.iter(), self.op, |v| Some(v.as_str().cmp(lit)))
            }
            ColumnData::List(_) => {
                return Err(OpError::ColumnType {
                    column: self.column.clone(),
                    expected: "scalar".into(),
                    found: data.data_type().to_string(),
                })
            }
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    /// Simple predicate expression: "column op literal"
    pub expr: Option<String>,
}

impl Filter {
    pub fn new(expr: impl Into<String>) -> Self {
        Self {
            expr: Some(expr.into()),
        }
    }
}

impl Operator for Filter {
    fn name(&self) -> &'static str {
        "filter"
    }

    fn params(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    fn input_columns(&self) -> Vec<String> {
        self.expr
            .as_deref()
            .and_then(|e| Predicate::parse(e).ok())
            .map(|p| vec![p.column])
            .unwrap_or_default()
    }

    fn memory_need(&self, _rows: u64, _bytes: u64) -> Footprint {
        Footprint {
            bytes_per_row: BYTES_PER_ROW as u64,
            overhead_bytes: 0,
        }
    }

    fn plan(&self, input_schemas: &[Schema]) -> Result<OpPlan, OpError> {
        let schema = input_schemas
            .first()
            .ok_or_else(|| OpError::Plan("filter expects one input".into()))?;
        if let Some(expr) = &self.expr {
            let pred = Predicate::parse(expr)?;
            let field = require_field(schema, &pred.column)?;
            if matches!(field.data_type, DataType::List(_)) {
                return Err(OpError::ColumnType {
                    column: pred.column,
                    expected: "scalar".into(),
                    found: field.data_type.to_string(),
                });
            }
        }
        Ok(OpPlan::new(schema.clone(), self.memory_need(0, 0)))
    }

    fn eval_block(&self, inputs: &[Table], ctx: &EvalContext<'_>) -> Result<Table, OpError> {
        let input = single_input(inputs, self.name())?;

        // If no expression, pass through
        let Some(expr) = &self.expr else {
            return Ok(input.clone());
        };

        let pred = Predicate::parse(expr)?;
        let col = require_column(input, &pred.column)?;
        let _guard = acquire(ctx.budget, input.num_rows() * BYTES_PER_ROW, "filter_mask")?;
        let keep = pred.mask(&col.data)?;
        let indices: Vec<usize> = keep
            .iter()
            .enumerate()
            .filter_map(|(i, k)| k.then_some(i))
            .collect();
        Ok(input.take(&indices))
    }
}
