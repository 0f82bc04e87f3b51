//! Memory budget enforcement tests

use setsim_core::budget::{BudgetGuard, MemoryBudget};
use setsim_core::prelude::{Column, Table};
use setsim_mem::MemoryBudgetImpl;
use setsim_operators::{EvalContext, JaccardOp, OpError, Operator, Parallelism};
use std::sync::Arc;
use std::thread;

fn list_table(rows: usize) -> Table {
    let a: Vec<Vec<i64>> = (0..rows as i64).map(|i| vec![i, i + 1]).collect();
    let b: Vec<Vec<i64>> = (0..rows as i64).map(|i| vec![i + 1, i + 2]).collect();
    Table::new(vec![Column::list("a", a), Column::list("b", b)]).expect("table")
}

#[test]
fn test_budget_acquire_release() {
    let budget = MemoryBudgetImpl::new(1024 * 1024);
    assert_eq!(budget.used_bytes(), 0);

    let guard = budget
        .try_acquire(100 * 1024, "test")
        .expect("Acquire failed");
    assert_eq!(budget.used_bytes(), 100 * 1024);
    assert_eq!(guard.bytes(), 100 * 1024);

    drop(guard);
    assert_eq!(budget.used_bytes(), 0);
}

#[test]
fn test_kernel_guard_released_after_eval() {
    let budget = MemoryBudgetImpl::new(64 * 1024);
    let par = Parallelism::sequential();
    let ctx = EvalContext {
        budget: &budget,
        parallelism: &par,
    };
    let out = JaccardOp::new("a", "b")
        .eval_block(&[list_table(100)], &ctx)
        .expect("fits in budget");
    assert_eq!(out.num_rows(), 100);
    assert_eq!(budget.used_bytes(), 0);
}

#[test]
fn test_kernel_refused_over_cap() {
    // 100 rows need 800 bytes of f64 scores plus 100 validity bytes.
    let budget = MemoryBudgetImpl::new(899);
    let par = Parallelism::sequential();
    let ctx = EvalContext {
        budget: &budget,
        parallelism: &par,
    };
    let err = JaccardOp::new("a", "b")
        .eval_block(&[list_table(100)], &ctx)
        .unwrap_err();
    match err {
        OpError::Budget(setsim_mem::Error::BudgetExceeded {
            tag, requested, ..
        }) => {
            assert_eq!(tag, "jaccard_out");
            assert_eq!(requested, 900);
        }
        other => panic!("expected budget error, got {other:?}"),
    }
    assert_eq!(budget.used_bytes(), 0);
}

#[test]
fn test_concurrent_acquire() {
    let budget = Arc::new(MemoryBudgetImpl::new(10 * 1024));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let budget = Arc::clone(&budget);
            thread::spawn(move || {
                for _ in 0..100 {
                    if let Some(g) = budget.try_acquire(1024, "worker") {
                        assert!(budget.used_bytes() <= 10 * 1024);
                        drop(g);
                    }
                }
            })
        })
        .collect();
    for h in handles {
        h.join().expect("worker panicked");
    }
    assert_eq!(budget.used_bytes(), 0);
}
