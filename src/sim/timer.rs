//! Single-slot cancellable timer
//!
//! The reset delay never blocks: the host advances the clock and polls.
//! Scheduling always replaces the outstanding timer, so at most one reset
//! can ever be pending.

use serde::{Deserialize, Serialize};

/// Identifies one scheduled firing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pending {
    handle: TimerHandle,
    deadline: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ResetTimer {
    next_id: u64,
    pending: Option<Pending>,
}

impl ResetTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule a firing `delay` seconds after `now`, cancelling any
    /// outstanding one first
    pub fn schedule(&mut self, now: f64, delay: f32) -> TimerHandle {
        if let Some(old) = self.pending.take() {
            log::debug!("Reset timer {:?} superseded", old.handle);
        }
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.pending = Some(Pending {
            handle,
            deadline: now + delay as f64,
        });
        handle
    }

    /// Cancel `handle` if it is still the outstanding timer.
    ///
    /// Returns `false` (and does nothing) for fired, cancelled or superseded
    /// handles.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.pending {
            Some(p) if p.handle == handle => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// Cancel whatever is outstanding
    pub fn cancel_pending(&mut self) -> bool {
        self.pending.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<f64> {
        self.pending.map(|p| p.deadline)
    }

    /// Fire the outstanding timer if `now` has reached its deadline
    pub fn poll(&mut self, now: f64) -> Option<TimerHandle> {
        match self.pending {
            Some(p) if now >= p.deadline => {
                self.pending = None;
                Some(p.handle)
            }
            _ => None,
        }
    }
}
