//! Row-wise Jaccard similarity between two ragged `i64` list columns.
//!
//! Each row's lists are read as sets: duplicates collapse and order is
//! ignored. Two empty lists score `0.0`. A null list on either side makes the
//! row's score null.

use std::collections::HashSet;

use setsim_core::prelude::{Column, ColumnData, ListColumnView, PrimitiveColumn};

use crate::kernels::chunk::Parallelism;
use crate::traits::OpError;

/// Bytes the kernel allocates per row: one score and one validity flag.
pub const BYTES_PER_ROW: usize = std::mem::size_of::<f64>() + std::mem::size_of::<bool>();

/// Output of a similarity kernel: one score per row plus nulls.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityResult {
    pub scores: Vec<f64>,
    pub validity: Option<Vec<bool>>,
}

impl SimilarityResult {
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn into_column(self, name: impl Into<String>) -> Result<Column, OpError> {
        let data = match self.validity {
            Some(validity) => PrimitiveColumn::with_validity(self.scores, validity)?,
            None => PrimitiveColumn::new(self.scores),
        };
        Ok(Column::new(name, ColumnData::Float64(data)))
    }
}

/// Per-chunk scratch space, reused across rows.
#[derive(Default)]
struct Scratch {
    short: HashSet<i64>,
    seen: HashSet<i64>,
}

impl Scratch {
    fn score(&mut self, a: &[i64], b: &[i64]) -> f64 {
        let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
        self.short.clear();
        self.seen.clear();
        self.short.extend(short.iter().copied());
        let short_distinct = self.short.len();

        let mut inter = 0usize;
        for &v in long {
            if self.seen.insert(v) && self.short.remove(&v) {
                inter += 1;
            }
        }
        let union = short_distinct + self.seen.len() - inter;
        if union == 0 {
            0.0
        } else {
            inter as f64 / union as f64
        }
    }
}

/// Jaccard similarity of row `i` of `a` with row `i` of `b`, for every row.
pub fn jaccard(
    a: &ListColumnView<'_>,
    b: &ListColumnView<'_>,
    par: &Parallelism,
) -> Result<SimilarityResult, OpError> {
    if a.len() != b.len() {
        return Err(OpError::ShapeMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    let rows = a.len();
    let mut scores = vec![0.0f64; rows];
    let mut valid = vec![true; rows];
    let chunk_len = par.jaccard_chunk_len(rows);

    par.for_each_chunk_pair_mut(&mut scores, &mut valid, chunk_len, |start, out, flags| {
        let mut scratch = Scratch::default();
        for (k, (score, ok)) in out.iter_mut().zip(flags.iter_mut()).enumerate() {
            let row = start + k;
            if a.is_valid(row) && b.is_valid(row) {
                *score = scratch.score(a.row(row), b.row(row));
            } else {
                *ok = false;
            }
        }
    });

    let validity = valid.contains(&false).then_some(valid);
    Ok(SimilarityResult { scores, validity })
}

#[cfg(test)]
mod tests {
    use super::*;
    use setsim_core::prelude::ListColumn;

    fn run(a: &ListColumn, b: &ListColumn, par: &Parallelism) -> SimilarityResult {
        jaccard(&a.view(), &b.view(), par).expect("jaccard")
    }

    #[test]
    fn worked_example() {
        let a = ListColumn::from_rows(vec![vec![1, 2, 3], vec![5, 5]]);
        let b = ListColumn::from_rows(vec![vec![1, 2, 3, 8], vec![5, 1, 1]]);
        let r = run(&a, &b, &Parallelism::sequential());
        assert_eq!(r.scores, vec![0.75, 0.5]);
        assert!(r.validity.is_none());
    }

    #[test]
    fn empty_rows_score_zero() {
        let a = ListColumn::from_rows(vec![vec![], vec![1]]);
        let b = ListColumn::from_rows(vec![vec![], vec![]]);
        let r = run(&a, &b, &Parallelism::sequential());
        assert_eq!(r.scores, vec![0.0, 0.0]);
    }

    #[test]
    fn duplicates_in_long_list_count_once() {
        let a = ListColumn::from_rows(vec![vec![7]]);
        let b = ListColumn::from_rows(vec![vec![7, 7, 7, 9, 9]]);
        let r = run(&a, &b, &Parallelism::sequential());
        assert_eq!(r.scores, vec![0.5]);
    }

    #[test]
    fn null_rows_propagate() {
        let a = ListColumn::from_options(vec![Some(vec![1]), None, Some(vec![2])]);
        let b = ListColumn::from_rows(vec![vec![1], vec![1], vec![3]]);
        let r = run(&a, &b, &Parallelism::sequential());
        assert_eq!(r.validity, Some(vec![true, false, true]));
        assert_eq!(r.scores, vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let a = ListColumn::from_rows(vec![vec![1]]);
        let b = ListColumn::from_rows(vec![vec![1], vec![2]]);
        let err = jaccard(&a.view(), &b.view(), &Parallelism::sequential()).unwrap_err();
        assert!(matches!(err, OpError::ShapeMismatch { left: 1, right: 2 }));
    }

    #[test]
    fn parallel_matches_sequential() {
        let rows: Vec<Vec<i64>> = (0..500).map(|i| (0..(i % 13)).collect()).collect();
        let other: Vec<Vec<i64>> = (0..500).map(|i| (i % 5..(i % 11) + 3).collect()).collect();
        let a = ListColumn::from_rows(rows);
        let b = ListColumn::from_rows(other);
        let seq = run(&a, &b, &Parallelism::sequential());
        let par = run(&a, &b, &Parallelism::new(4));
        assert_eq!(seq, par);
    }
}
