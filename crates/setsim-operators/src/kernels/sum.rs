//! Sum reductions over numeric columns.
//!
//! Rows are cut into fixed `sum_chunk_rows` chunks and partials are combined
//! in chunk order. Chunk boundaries depend only on the row count, so float
//! results are bit-identical for any worker count.

use std::collections::HashMap;

use setsim_core::prelude::{ColumnData, PrimitiveColumn, Scalar};

use crate::kernels::chunk::Parallelism;
use crate::traits::OpError;

trait Summable: Copy + Send + Sync {
    const ZERO: Self;
    fn add(self, other: Self) -> Self;
    fn into_scalar(self) -> Scalar;
    fn into_column(values: Vec<Self>) -> ColumnData;
}

impl Summable for i64 {
    const ZERO: Self = 0;
    fn add(self, other: Self) -> Self {
        self.wrapping_add(other)
    }
    fn into_scalar(self) -> Scalar {
        Scalar::I64(self)
    }
    fn into_column(values: Vec<Self>) -> ColumnData {
        ColumnData::Int64(PrimitiveColumn::new(values))
    }
}

impl Summable for u64 {
    const ZERO: Self = 0;
    fn add(self, other: Self) -> Self {
        self.wrapping_add(other)
    }
    fn into_scalar(self) -> Scalar {
        Scalar::U64(self)
    }
    fn into_column(values: Vec<Self>) -> ColumnData {
        ColumnData::UInt64(PrimitiveColumn::new(values))
    }
}

impl Summable for f64 {
    const ZERO: Self = 0.0;
    fn add(self, other: Self) -> Self {
        self + other
    }
    fn into_scalar(self) -> Scalar {
        Scalar::F64(self)
    }
    fn into_column(values: Vec<Self>) -> ColumnData {
        ColumnData::Float64(PrimitiveColumn::new(values))
    }
}

fn not_numeric(col: &ColumnData) -> OpError {
    OpError::ColumnType {
        column: String::new(),
        expected: "numeric".into(),
        found: col.data_type().to_string(),
    }
}

fn reduce<T: Summable>(col: &PrimitiveColumn<T>, par: &Parallelism) -> T {
    let partials = par.map_chunks(col.len(), par.sum_chunk_rows(), |range| {
        range
            .filter(|&i| col.is_valid(i))
            .fold(T::ZERO, |acc, i| acc.add(col.values()[i]))
    });
    partials.into_iter().fold(T::ZERO, T::add)
}

/// Sum of all non-null values. Empty and all-null columns sum to zero of the
/// column's type.
pub fn sum_column(col: &ColumnData, par: &Parallelism) -> Result<Scalar, OpError> {
    match col {
        ColumnData::Int64(c) => Ok(reduce(c, par).into_scalar()),
        ColumnData::UInt64(c) => Ok(reduce(c, par).into_scalar()),
        ColumnData::Float64(c) => Ok(reduce(c, par).into_scalar()),
        other => Err(not_numeric(other)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum GroupKey {
    Null,
    I64(i64),
    U64(u64),
    Str(String),
}

/// Dense group ids in first-appearance order.
struct Groups {
    keys: Vec<GroupKey>,
    row_group: Vec<usize>,
}

fn assign_groups(keys: &ColumnData) -> Result<Groups, OpError> {
    let key_at = |i: usize| -> GroupKey {
        match keys.scalar_at(i) {
            Scalar::I64(v) => GroupKey::I64(v),
            Scalar::U64(v) => GroupKey::U64(v),
            Scalar::Str(s) => GroupKey::Str(s),
            _ => GroupKey::Null,
        }
    };
    match keys {
        ColumnData::Int64(_) | ColumnData::UInt64(_) | ColumnData::Utf8(_) => {}
        other => {
            return Err(OpError::ColumnType {
                column: String::new(),
                expected: "i64, u64 or utf8 key".into(),
                found: other.data_type().to_string(),
            })
        }
    }

    let mut ids: HashMap<GroupKey, usize> = HashMap::new();
    let mut order = Vec::new();
    let mut row_group = Vec::with_capacity(keys.len());
    for i in 0..keys.len() {
        let key = key_at(i);
        let next = order.len();
        let id = *ids.entry(key.clone()).or_insert_with(|| {
            order.push(key);
            next
        });
        row_group.push(id);
    }
    Ok(Groups {
        keys: order,
        row_group,
    })
}

/// Per-chunk sums for only the groups that occur in that chunk, in the order
/// each group first appears within the chunk.
fn sparse_partials<T: Summable>(
    col: &PrimitiveColumn<T>,
    groups: &Groups,
    par: &Parallelism,
) -> Vec<Vec<(usize, T)>> {
    par.map_chunks(col.len(), par.sum_chunk_rows(), |range| {
        let mut slot: HashMap<usize, usize> = HashMap::new();
        let mut acc: Vec<(usize, T)> = Vec::new();
        for i in range.filter(|&i| col.is_valid(i)) {
            let g = groups.row_group[i];
            let next = acc.len();
            let at = *slot.entry(g).or_insert(next);
            if at == next {
                acc.push((g, T::ZERO));
            }
            acc[at].1 = acc[at].1.add(col.values()[i]);
        }
        acc
    })
}

fn reduce_grouped<T: Summable>(
    col: &PrimitiveColumn<T>,
    groups: &Groups,
    par: &Parallelism,
) -> Vec<T> {
    let mut total = vec![T::ZERO; groups.keys.len()];
    for part in sparse_partials(col, groups, par) {
        for (g, v) in part {
            total[g] = total[g].add(v);
        }
    }
    total
}

/// Upper bound on the scratch and output bytes of [`sum_grouped`] over `rows`
/// rows and `value_columns` value columns, reached when every key is distinct.
/// String key payloads are not counted.
pub fn grouped_bytes(rows: usize, value_columns: usize) -> usize {
    use std::mem::size_of;
    // row -> group id, key map entry, key list entry
    let per_key = size_of::<usize>() + 2 * size_of::<GroupKey>() + size_of::<usize>();
    // sparse partial, its chunk index entry, final total
    let per_value = size_of::<(usize, u64)>() + 2 * size_of::<usize>() + size_of::<u64>();
    rows.saturating_mul(per_key.saturating_add(value_columns.saturating_mul(per_value)))
}

fn key_column(keys: &ColumnData, groups: &[GroupKey]) -> ColumnData {
    match keys {
        ColumnData::UInt64(_) => ColumnData::UInt64(PrimitiveColumn::from_options(
            groups
                .iter()
                .map(|k| match k {
                    GroupKey::U64(v) => Some(*v),
                    _ => None,
                })
                .collect(),
        )),
        ColumnData::Utf8(_) => ColumnData::Utf8(PrimitiveColumn::from_options(
            groups
                .iter()
                .map(|k| match k {
                    GroupKey::Str(s) => Some(s.clone()),
                    _ => None,
                })
                .collect(),
        )),
        _ => ColumnData::Int64(PrimitiveColumn::from_options(
            groups
                .iter()
                .map(|k| match k {
                    GroupKey::I64(v) => Some(*v),
                    _ => None,
                })
                .collect(),
        )),
    }
}

/// Per-key sums of each column in `values`. Returns the distinct keys and one
/// sum column per value column, in first-appearance key order; null keys form
/// a single group.
pub fn sum_grouped(
    keys: &ColumnData,
    values: &[&ColumnData],
    par: &Parallelism,
) -> Result<(ColumnData, Vec<ColumnData>), OpError> {
    if let Some(bad) = values.iter().find(|v| v.len() != keys.len()) {
        return Err(OpError::ShapeMismatch {
            left: keys.len(),
            right: bad.len(),
        });
    }
    let groups = assign_groups(keys)?;
    let sums = values
        .iter()
        .map(|col| match col {
            ColumnData::Int64(c) => Ok(i64::into_column(reduce_grouped(c, &groups, par))),
            ColumnData::UInt64(c) => Ok(u64::into_column(reduce_grouped(c, &groups, par))),
            ColumnData::Float64(c) => Ok(f64::into_column(reduce_grouped(c, &groups, par))),
            other => Err(not_numeric(other)),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((key_column(keys, &groups.keys), sums))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_nulls() {
        let col = ColumnData::Int64(PrimitiveColumn::from_options(vec![
            Some(1),
            None,
            Some(4),
        ]));
        let s = sum_column(&col, &Parallelism::sequential()).unwrap();
        assert_eq!(s, Scalar::I64(5));
    }

    #[test]
    fn empty_and_all_null_sum_to_zero() {
        let empty = ColumnData::Float64(PrimitiveColumn::new(vec![]));
        let nulls = ColumnData::UInt64(PrimitiveColumn::from_options(vec![None, None]));
        let par = Parallelism::sequential();
        assert_eq!(sum_column(&empty, &par).unwrap(), Scalar::F64(0.0));
        assert_eq!(sum_column(&nulls, &par).unwrap(), Scalar::U64(0));
    }

    #[test]
    fn integer_sum_wraps() {
        let col = ColumnData::Int64(PrimitiveColumn::new(vec![i64::MAX, 1]));
        let s = sum_column(&col, &Parallelism::sequential()).unwrap();
        assert_eq!(s, Scalar::I64(i64::MIN));
    }

    #[test]
    fn rejects_strings() {
        let col = ColumnData::Utf8(PrimitiveColumn::new(vec!["a".to_string()]));
        let err = sum_column(&col, &Parallelism::sequential()).unwrap_err();
        assert!(matches!(err, OpError::ColumnType { .. }));
    }

    #[test]
    fn float_sum_identical_across_workers() {
        let values: Vec<f64> = (0..50_000).map(|i| (i as f64).sin() * 1e-3 + 0.1).collect();
        let col = ColumnData::Float64(PrimitiveColumn::new(values));
        let one = sum_column(&col, &Parallelism::sequential().with_sum_chunk_rows(1000)).unwrap();
        let many = sum_column(&col, &Parallelism::new(4).with_sum_chunk_rows(1000)).unwrap();
        match (one, many) {
            (Scalar::F64(a), Scalar::F64(b)) => assert_eq!(a.to_bits(), b.to_bits()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn grouped_in_first_appearance_order() {
        let keys = ColumnData::Int64(PrimitiveColumn::from_options(vec![
            Some(2),
            Some(1),
            None,
            Some(2),
            None,
        ]));
        let values = ColumnData::Int64(PrimitiveColumn::new(vec![10, 20, 30, 40, 50]));
        let par = Parallelism::new(2).with_sum_chunk_rows(2);
        let (k, s) = sum_grouped(&keys, &[&values], &par).unwrap();
        assert_eq!(
            k,
            ColumnData::Int64(PrimitiveColumn::from_options(vec![Some(2), Some(1), None]))
        );
        assert_eq!(s, vec![ColumnData::Int64(PrimitiveColumn::new(vec![50, 20, 80]))]);
    }

    #[test]
    fn distinct_keys_keep_partials_sparse() {
        let rows: usize = 10_000;
        let keys = ColumnData::Int64(PrimitiveColumn::new((0..rows as i64).rev().collect()));
        let values = PrimitiveColumn::new((0..rows as i64).collect::<Vec<_>>());
        let par = Parallelism::new(4).with_sum_chunk_rows(64);

        let groups = assign_groups(&keys).unwrap();
        let partials = sparse_partials(&values, &groups, &par);
        assert_eq!(partials.len(), rows.div_ceil(64));
        // One entry per touched group, never one per group per chunk.
        assert_eq!(partials.iter().map(Vec::len).sum::<usize>(), rows);

        let (k, s) = sum_grouped(&keys, &[&ColumnData::Int64(values.clone())], &par).unwrap();
        assert_eq!(k.len(), rows);
        assert_eq!(s, vec![ColumnData::Int64(values)]);
    }

    #[test]
    fn sparse_combine_matches_sequential_bits() {
        let keys = ColumnData::UInt64(PrimitiveColumn::new((0..5_000u64).map(|i| i % 37).collect()));
        let values = ColumnData::Float64(PrimitiveColumn::new(
            (0..5_000).map(|i| (i as f64).cos() * 1e-2).collect(),
        ));
        let one = sum_grouped(&keys, &[&values], &Parallelism::sequential().with_sum_chunk_rows(100))
            .unwrap();
        let many = sum_grouped(&keys, &[&values], &Parallelism::new(3).with_sum_chunk_rows(100))
            .unwrap();
        let bits = |c: &ColumnData| match c {
            ColumnData::Float64(p) => p.values().iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(one.0, many.0);
        assert_eq!(bits(&one.1[0]), bits(&many.1[0]));
    }

    #[test]
    fn grouped_bytes_grows_with_value_columns() {
        assert_eq!(grouped_bytes(0, 3), 0);
        assert!(grouped_bytes(100, 2) > grouped_bytes(100, 1));
        assert!(grouped_bytes(100, 1) >= 100 * 3 * std::mem::size_of::<u64>());
    }
}
