//! Cancellable one-shot timers polled from the server tick
//!
//! The registry knows nothing about what its payloads mean. Owners keep the
//! returned [`TimerHandle`] and must cancel it in their teardown path; a
//! payload that fires is handed back to the caller, who is expected to look
//! the owner up again before acting on it.

use std::collections::BTreeMap;

/// Opaque handle to a scheduled timer. Handles are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

#[derive(Debug)]
struct PendingTimer<T> {
    due: f64,
    payload: T,
}

#[derive(Debug)]
pub struct TimerRegistry<T> {
    now: f64,
    next_handle: u64,
    pending: BTreeMap<TimerHandle, PendingTimer<T>>,
}

impl<T> TimerRegistry<T> {
    pub fn new() -> Self {
        Self {
            now: 0.0,
            next_handle: 1,
            pending: BTreeMap::new(),
        }
    }

    /// Schedules `payload` to fire once `delay` seconds of ticks have elapsed.
    ///
    /// Negative delays are treated as zero, firing on the next `advance`.
    pub fn schedule(&mut self, delay: f32, payload: T) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;

        let due = self.now + f64::from(delay.max(0.0));
        self.pending.insert(handle, PendingTimer { due, payload });
        handle
    }

    /// Cancels a pending timer, returning its payload if it had not fired yet.
    pub fn cancel(&mut self, handle: TimerHandle) -> Option<T> {
        self.pending.remove(&handle).map(|timer| timer.payload)
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.contains_key(&handle)
    }

    /// Seconds left before the timer fires, or None if it is no longer pending.
    pub fn remaining(&self, handle: TimerHandle) -> Option<f32> {
        self.pending
            .get(&handle)
            .map(|timer| (timer.due - self.now).max(0.0) as f32)
    }

    /// Advances the clock and removes every timer that came due.
    ///
    /// Fired timers are returned ordered by due time, then by scheduling
    /// order for timers due at the same instant.
    pub fn advance(&mut self, dt: f32) -> Vec<(TimerHandle, T)> {
        self.now += f64::from(dt.max(0.0));

        let mut due: Vec<(TimerHandle, f64)> = self
            .pending
            .iter()
            .filter(|(_, timer)| timer.due <= self.now)
            .map(|(handle, timer)| (*handle, timer.due))
            .collect();
        due.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));

        due.into_iter()
            .filter_map(|(handle, _)| {
                self.pending
                    .remove(&handle)
                    .map(|timer| (handle, timer.payload))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<T> Default for TimerRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
