use std::time::Duration;

use foundation::time::Time;

use crate::timer_queue::{TimerId, TimerQueue};

/// Trailing-edge debouncer with latest-wins semantics.
///
/// Every `push` cancels the pending value (if any) and restarts the window,
/// so a burst of changes closer together than `window` yields exactly one
/// value, the last one.
#[derive(Debug)]
pub struct Debouncer<T> {
    window: Duration,
    timers: TimerQueue<T>,
    pending: Option<TimerId>,
    superseded: u64,
}

impl<T> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            timers: TimerQueue::new(),
            pending: None,
            superseded: 0,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Queues `value`, superseding any pending one.
    ///
    /// Returns `true` if a pending value was canceled.
    pub fn push(&mut self, now: Time, value: T) -> bool {
        let canceled = self.cancel();
        if canceled {
            self.superseded += 1;
        }
        self.pending = Some(self.timers.schedule(now.after(self.window), value));
        canceled
    }

    /// Takes the pending value once its window has elapsed.
    pub fn poll(&mut self, now: Time) -> Option<T> {
        let (id, value) = self.timers.pop_due(now)?;
        if self.pending == Some(id) {
            self.pending = None;
        }
        Some(value)
    }

    /// Drops the pending value without delivering it.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(id) => self.timers.cancel(id).is_some(),
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn next_due(&self) -> Option<Time> {
        self.timers.next_due()
    }

    /// Number of values dropped because a newer one replaced them.
    pub fn superseded(&self) -> u64 {
        self.superseded
    }
}
