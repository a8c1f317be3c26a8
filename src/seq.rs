//! Monotonic sequence-number allocation (spec §3 invariant 6).
//!
//! Grounded on the teacher's `Revision`/`AtomicRevision` pair
//! (examples/salsa-rs-salsa/src/revision.rs): a `NonZeroU64` generation
//! counter plus an atomic allocator, adapted here to be the single
//! `tableChange`/publication sequence-number source shared by every
//! publication pass.

use std::sync::atomic::{AtomicU64, Ordering};

/// One allocated sequence number. Strictly monotonic across a process
/// lifetime; shared by table-change and per-object publication sequences.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeqNum(u64);

impl SeqNum {
    pub const ZERO: SeqNum = SeqNum(0);

    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SeqNum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Single shared allocator for all sequence numbers in the table.
#[derive(Debug, Default)]
pub struct SeqAllocator {
    next: AtomicU64,
}

impl SeqAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Allocate and return the next sequence number; never returns the same
    /// value twice.
    pub fn next(&self) -> SeqNum {
        let v = self.next.fetch_add(1, Ordering::SeqCst);
        SeqNum(v)
    }

    /// Current high-water mark without allocating.
    pub fn current(&self) -> SeqNum {
        SeqNum(self.next.load(Ordering::SeqCst).saturating_sub(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocations_are_strictly_increasing() {
        let alloc = SeqAllocator::new();
        let a = alloc.next();
        let b = alloc.next();
        let c = alloc.next();
        assert!(a < b && b < c);
    }

    #[test]
    fn no_two_allocations_share_a_value() {
        let alloc = SeqAllocator::new();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..1000 {
            assert!(seen.insert(alloc.next().get()));
        }
    }
}
