// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-flight gate for agent termination.
//!
//! A count of zero means no termination is in flight and the agent accepts
//! work. [`TerminationLatch::try_begin`] moves the count from zero to one and
//! hands back a guard; dropping the guard counts back down, so the latch is
//! released on every exit path of the termination task and can be armed
//! again for the next cycle.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Default)]
pub struct TerminationLatch {
    count: AtomicUsize,
    released: Notify,
}

impl TerminationLatch {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Arm the latch if no termination is in flight.
    ///
    /// Returns `None` when another termination already holds it; callers
    /// treat that as "coalesced into the running one".
    pub fn try_begin(self: &Arc<Self>) -> Option<TerminationGuard> {
        self.count
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| TerminationGuard { latch: Arc::clone(self) })
    }

    /// Count down; a no-op when already idle.
    pub fn complete(&self) {
        let prev = self.count.fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| c.checked_sub(1));
        if prev == Ok(1) {
            self.released.notify_waiters();
        }
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    pub fn is_busy(&self) -> bool {
        self.count() > 0
    }

    pub fn is_accepting_tasks(&self) -> bool {
        !self.is_busy()
    }

    /// Wait until no termination is in flight.
    pub async fn idle(&self) {
        loop {
            let mut notified = std::pin::pin!(self.released.notified());
            notified.as_mut().enable();
            if !self.is_busy() {
                return;
            }
            notified.await;
        }
    }
}

/// Releases its latch when dropped
#[derive(Debug)]
pub struct TerminationGuard {
    latch: Arc<TerminationLatch>,
}

impl Drop for TerminationGuard {
    fn drop(&mut self) {
        self.latch.complete();
    }
}

#[cfg(test)]
#[path = "latch_tests.rs"]
mod tests;
