//! Session-wide grants escalated through the consent prompt.

use std::sync::atomic::{AtomicBool, Ordering};

/// Grants that last for the rest of the process lifetime.
///
/// Starts with nothing granted. Only the consent protocol sets the flags and
/// nothing ever clears them. The flags are independent atomics, so two
/// threads escalating at the same time simply both end up set.
#[derive(Debug, Default)]
pub struct SessionGrants {
    reads: AtomicBool,
    writes: AtomicBool,
}

/// A point-in-time copy of [`SessionGrants`], consumed by the evaluator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GrantState {
    /// Every read is pre-approved.
    pub reads: bool,
    /// Every write is pre-approved.
    pub writes: bool,
}

impl SessionGrants {
    /// Create a session with nothing granted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-approve all later reads.
    pub fn grant_reads(&self) {
        self.reads.store(true, Ordering::Release);
    }

    /// Pre-approve all later writes.
    pub fn grant_writes(&self) {
        self.writes.store(true, Ordering::Release);
    }

    /// Read both flags.
    pub fn snapshot(&self) -> GrantState {
        GrantState {
            reads: self.reads.load(Ordering::Acquire),
            writes: self.writes.load(Ordering::Acquire),
        }
    }
}
