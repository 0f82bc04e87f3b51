//! MemoryBudget + RAII guard implementations.
//!
//! Kernels acquire a guard before allocating an output buffer. Dropping the
//! guard returns the bytes to the budget (panic-safe).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use setsim_core::budget::{BudgetGuard, MemoryBudget};

use crate::error::{Error, Result};

/// Shared inner state for the budget.
struct BudgetInner {
    capacity: usize,
    used: AtomicUsize,
}

impl BudgetInner {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            used: AtomicUsize::new(0),
        }
    }

    fn try_acquire(&self, bytes: usize) -> bool {
        loop {
            let cur = self.used.load(Ordering::Relaxed);
            let next = cur.saturating_add(bytes);
            if next > self.capacity {
                return false;
            }
            if self
                .used
                .compare_exchange(cur, next, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                return true;
            }
        }
    }

    fn release(&self, bytes: usize) {
        self.used.fetch_sub(bytes, Ordering::AcqRel);
    }
}

/// Concrete MemoryBudget implementation used by the engine.
#[derive(Clone)]
pub struct MemoryBudgetImpl {
    inner: Arc<BudgetInner>,
}

impl MemoryBudgetImpl {
    pub fn new(capacity_bytes: usize) -> Self {
        Self {
            inner: Arc::new(BudgetInner::new(capacity_bytes)),
        }
    }

    /// Budget for eager calls, where the caller already owns the table.
    pub fn unbounded() -> Self {
        Self::new(usize::MAX)
    }

    /// Current usage (advisory).
    pub fn used_bytes(&self) -> usize {
        self.inner.used.load(Ordering::Relaxed)
    }

    pub fn capacity_bytes(&self) -> usize {
        self.inner.capacity
    }
}

/// Acquire `bytes` or report how far over the cap the request is.
pub fn acquire<B>(budget: &B, bytes: usize, tag: &'static str) -> Result<B::Guard>
where
    B: MemoryBudget + ?Sized,
{
    budget.try_acquire(bytes, tag).ok_or_else(|| {
        #[cfg(feature = "tracing")]
        tracing::debug!(tag, requested = bytes, "memory budget refused");
        Error::BudgetExceeded {
            tag,
            requested: bytes,
            capacity: budget.capacity_bytes(),
            used: budget.used_bytes(),
        }
    })
}

/// RAII guard that accounts for a number of bytes.
/// Dropping it returns bytes to the budget.
pub struct BudgetGuardImpl {
    inner: Arc<BudgetInner>,
    bytes: usize,
    tag: &'static str,
}

impl Drop for BudgetGuardImpl {
    fn drop(&mut self) {
        if self.bytes > 0 {
            self.inner.release(self.bytes);
            // NOTE: do not log here to keep drop path fast.
            self.bytes = 0;
        }
    }
}

// ----- trait impls -----

impl BudgetGuard for BudgetGuardImpl {
    fn bytes(&self) -> usize {
        self.bytes
    }
    fn tag(&self) -> &'static str {
        self.tag
    }
}

impl MemoryBudget for MemoryBudgetImpl {
    type Guard = BudgetGuardImpl;

    fn try_acquire(&self, bytes: usize, tag: &'static str) -> Option<Self::Guard> {
        if bytes == 0 {
            return Some(BudgetGuardImpl {
                inner: Arc::clone(&self.inner),
                bytes: 0,
                tag,
            });
        }
        if self.inner.try_acquire(bytes) {
            Some(BudgetGuardImpl {
                inner: Arc::clone(&self.inner),
                bytes,
                tag,
            })
        } else {
            None
        }
    }

    fn capacity_bytes(&self) -> usize {
        self.inner.capacity
    }

    fn used_bytes(&self) -> usize {
        self.inner.used.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_releases_on_drop() {
        let budget = MemoryBudgetImpl::new(100);
        {
            let g = budget.try_acquire(60, "test").expect("fits");
            assert_eq!(g.bytes(), 60);
            assert_eq!(budget.used_bytes(), 60);
            assert!(budget.try_acquire(50, "test").is_none());
        }
        assert_eq!(budget.used_bytes(), 0);
        assert!(budget.try_acquire(100, "test").is_some());
    }

    #[test]
    fn acquire_reports_overflow() {
        let budget = MemoryBudgetImpl::new(8);
        let err = acquire(&budget, 16, "jaccard_out").err().expect("over cap");
        match err {
            Error::BudgetExceeded {
                tag,
                requested,
                capacity,
                ..
            } => {
                assert_eq!(tag, "jaccard_out");
                assert_eq!(requested, 16);
                assert_eq!(capacity, 8);
            }
        }
    }

    #[test]
    fn zero_byte_guard_always_succeeds() {
        let budget = MemoryBudgetImpl::new(0);
        assert!(budget.try_acquire(0, "empty").is_some());
    }
}
