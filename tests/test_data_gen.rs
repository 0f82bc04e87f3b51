//! Deterministic table generators shared by the integration tests.

#![allow(dead_code)]

use setsim_core::prelude::{Column, ColumnData, ListColumn, PrimitiveColumn, Table};

/// Small LCG so generated data is identical on every run.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed.wrapping_mul(6364136223846793005).wrapping_add(1))
    }

    pub fn next_u64(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    pub fn below(&mut self, n: u64) -> u64 {
        self.next_u64() % n.max(1)
    }
}

/// Ragged list column with lengths in `0..max_len` and values in `0..domain`.
pub fn random_lists(rng: &mut Lcg, rows: usize, max_len: u64, domain: u64) -> ListColumn {
    ListColumn::from_rows((0..rows).map(|_| {
        let len = rng.below(max_len);
        (0..len).map(|_| rng.below(domain) as i64).collect::<Vec<i64>>()
    }))
}

/// Table with list columns `a`, `b`, a key `k` and numeric `n`, `x`.
pub fn mixed_table(seed: u64, rows: usize) -> Table {
    let mut rng = Lcg::new(seed);
    let a = random_lists(&mut rng, rows, 12, 20);
    let b = random_lists(&mut rng, rows, 12, 20);
    let k: Vec<i64> = (0..rows).map(|_| rng.below(5) as i64).collect();
    let n: Vec<Option<i64>> = (0..rows)
        .map(|_| {
            let v = rng.below(1000) as i64 - 500;
            (rng.below(10) != 0).then_some(v)
        })
        .collect();
    let x: Vec<f64> = (0..rows).map(|_| rng.below(1 << 20) as f64 / 1024.0).collect();
    Table::new(vec![
        Column::new("a", ColumnData::List(a)),
        Column::new("b", ColumnData::List(b)),
        Column::int64("k", k),
        Column::new("n", ColumnData::Int64(PrimitiveColumn::from_options(n))),
        Column::float64("x", x),
    ])
    .expect("generated table")
}
