//! Supersession counters for "latest call wins" operations.

use std::sync::atomic::{AtomicU64, Ordering};

/// Ticket returned by [`Generation::begin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// A monotonically increasing counter.
///
/// Each new call of an operation takes a ticket; when its async work
/// finishes it applies its result only if the ticket is still current.
/// Older tickets belong to superseded calls and their results are dropped.
#[derive(Debug, Default)]
pub struct Generation(AtomicU64);

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Supersedes every earlier ticket and returns a fresh one.
    pub fn begin(&self) -> Ticket {
        Ticket(self.0.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Supersedes every outstanding ticket without issuing a new one.
    pub fn invalidate(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.0.load(Ordering::SeqCst) == ticket.0
    }
}
