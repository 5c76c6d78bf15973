//! Monotonic object-ID allocator (spec.md §4.1).

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::error::StoreError;

/// Allocates contiguous blocks of `u64` IDs starting at 1.
///
/// Backed by a single `AtomicU64`, matching the spec's "single counter
/// document with a conditional-increment primitive" at the concurrency
/// level this crate actually needs: the document-store analogue would
/// be a `mod` with an `inc`, but a bare atomic gives the same
/// guarantee without a round trip through JSON.
pub struct IdAllocator {
    counter: AtomicU64,
}

impl IdAllocator {
    pub fn new() -> Self {
        IdAllocator {
            counter: AtomicU64::new(0),
        }
    }

    /// Allocates `n` contiguous IDs, returning `(first, n)`.
    ///
    /// `allocate(0)` returns the current value unchanged without
    /// incrementing. Negative requests are rejected by the caller
    /// before they ever reach this type (spec.md §4.1); this allocator
    /// only ever sees `n >= 0`.
    pub fn allocate(&self, n: u64) -> (u64, u64) {
        if n == 0 {
            return (self.counter.load(Ordering::SeqCst), 0);
        }
        if n > 1 {
            debug!(count = n, "allocating id batch");
        }
        let first = self.counter.fetch_add(n, Ordering::SeqCst) + 1;
        (first, n)
    }

    /// Validates and allocates from a signed count as the wire carries it.
    pub fn allocate_checked(&self, n: i64) -> Result<(u64, u64), StoreError> {
        if n < 0 {
            return Err(StoreError::InvalidArgument(format!("allocate count must be >= 0, got {n}")));
        }
        Ok(self.allocate(n as u64))
    }

    pub fn current(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.counter.store(0, Ordering::SeqCst);
    }

    /// Restores the counter to a previously observed value (persistence load).
    pub fn restore(&self, value: u64) {
        self.counter.store(value, Ordering::SeqCst);
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_contiguous_blocks_starting_at_one() {
        let a = IdAllocator::new();
        assert_eq!(a.allocate(3), (1, 3));
        assert_eq!(a.allocate(2), (4, 2));
    }

    #[test]
    fn allocate_zero_is_a_no_op_read() {
        let a = IdAllocator::new();
        a.allocate(5);
        assert_eq!(a.allocate(0), (5, 0));
        assert_eq!(a.current(), 5);
    }

    #[test]
    fn negative_allocation_is_rejected() {
        let a = IdAllocator::new();
        assert!(a.allocate_checked(-1).is_err());
    }

    #[test]
    fn reset_restarts_at_one() {
        let a = IdAllocator::new();
        a.allocate(10);
        a.reset();
        assert_eq!(a.allocate(1), (1, 1));
    }
}
