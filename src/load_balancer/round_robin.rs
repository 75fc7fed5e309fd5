// src/load_balancer/round_robin.rs
use std::sync::atomic::{AtomicUsize, Ordering};

/// Rotation cursor over a fixed number of slots.
///
/// The stored position always stays in `0..len`. Each advance is a single
/// compare-and-swap from `i` to `(i + 1) % len`.
#[derive(Debug)]
pub struct RoundRobin {
    cursor: AtomicUsize,
    len: usize,
}

impl RoundRobin {
    /// `len` must be non-zero; the pool checks this before building a cursor.
    pub fn new(len: usize) -> Self {
        debug_assert!(len > 0, "round robin over zero slots");
        Self {
            cursor: AtomicUsize::new(0),
            len,
        }
    }

    /// Claim the current slot and move the cursor on by one.
    pub fn advance(&self) -> usize {
        let len = self.len;
        match self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |i| Some((i + 1) % len))
        {
            Ok(previous) | Err(previous) => previous,
        }
    }

    /// Slot the next `advance` will hand out.
    pub fn position(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }
}
