use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use setsim_core::prelude::{ColumnData, ListColumn, PrimitiveColumn};
use setsim_operators::kernels::{jaccard, sum_column};
use setsim_operators::Parallelism;

fn make_lists(rows: usize, seed: i64) -> ListColumn {
    ListColumn::from_rows((0..rows as i64).map(|i| {
        let len = ((i * 7 + seed) % 40) as usize;
        (0..len as i64)
            .map(|j| (i * 31 + j * 17 + seed) % 200)
            .collect::<Vec<i64>>()
    }))
}

fn bench_jaccard(c: &mut Criterion) {
    let a = make_lists(100_000, 1);
    let b = make_lists(100_000, 5);
    let mut group = c.benchmark_group("jaccard");
    for workers in [1usize, 2, 4, 8] {
        let par = Parallelism::new(workers);
        group.bench_with_input(BenchmarkId::from_parameter(workers), &par, |bench, par| {
            bench.iter(|| {
                let _ = jaccard(&a.view(), &b.view(), par).unwrap();
            })
        });
    }
    group.finish();
}

fn bench_sum(c: &mut Criterion) {
    let values: Vec<f64> = (0..1_000_000).map(|i| (i % 1000) as f64 * 0.5).collect();
    let col = ColumnData::Float64(PrimitiveColumn::new(values));
    let par = Parallelism::new(4);
    c.bench_function("sum_f64_1m", |b| {
        b.iter(|| {
            let _ = sum_column(&col, &par).unwrap();
        })
    });
}

criterion_group!(kernels, bench_jaccard, bench_sum);
criterion_main!(kernels);
