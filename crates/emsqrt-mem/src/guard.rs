//! `MemoryBudgetImpl`: a simple atomic-counter budget, and the RAII guard
//! every operator acquires before allocating a large buffer.
//!
//! This is deliberately the simplest thing that can work: one `AtomicUsize`
//! counter and a ceiling. It is not a slab allocator or arena; it exists so
//! that operators (hash join build side, merge join's `RightSideStore`,
//! spill segment reads) fail fast and uniformly when a query would exceed
//! its configured memory cap, rather than each reinventing the check.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use emsqrt_core::budget::{BudgetGuard, MemoryBudget};
use emsqrt_core::error::Error;

#[derive(Clone)]
pub struct MemoryBudgetImpl {
    inner: Arc<Inner>,
}

struct Inner {
    capacity: usize,
    used: AtomicUsize,
}

impl MemoryBudgetImpl {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                capacity,
                used: AtomicUsize::new(0),
            }),
        }
    }
}

/// RAII reservation; releases its bytes from the budget on drop.
pub struct BudgetGuardImpl {
    inner: Arc<Inner>,
    bytes: usize,
}

impl BudgetGuard for BudgetGuardImpl {
    fn bytes(&self) -> usize {
        self.bytes
    }
}

impl Drop for BudgetGuardImpl {
    fn drop(&mut self) {
        self.inner.used.fetch_sub(self.bytes, Ordering::SeqCst);
    }
}

impl MemoryBudget for MemoryBudgetImpl {
    type Guard = BudgetGuardImpl;

    fn acquire(&self, tag: &'static str, bytes: usize) -> Result<Self::Guard, Error> {
        loop {
            let used = self.inner.used.load(Ordering::SeqCst);
            let next = used.saturating_add(bytes);
            if next > self.inner.capacity {
                return Err(Error::Invariant(format!(
                    "memory budget exceeded for tag '{tag}': requested {bytes} bytes, used {used}, capacity {}",
                    self.inner.capacity
                )));
            }
            if self
                .inner
                .used
                .compare_exchange(used, next, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return Ok(BudgetGuardImpl {
                    inner: self.inner.clone(),
                    bytes,
                });
            }
            // Lost the race to another acquirer; retry.
        }
    }

    fn used(&self) -> usize {
        self.inner.used.load(Ordering::SeqCst)
    }

    fn capacity(&self) -> usize {
        self.inner.capacity
    }
}
