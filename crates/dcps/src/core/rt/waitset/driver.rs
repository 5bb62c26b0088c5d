// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Waitset driver for multi-slot notification.
//!
//! Provides `WaitsetDriver` for registering conditions and blocking until
//! any registered condition becomes true. The blocking primitive is a
//! `parking_lot` condition variable; signals that arrive while nobody waits
//! are kept as pending slots so the next `wait()` returns immediately.

use parking_lot::{Condvar, Mutex};
use std::io;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

/// Default maximum number of waitset slots per driver instance.
pub const WAITSET_DEFAULT_MAX_SLOTS: usize = 256;

/// Errors returned by [`WaitsetDriver::wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitsetWaitError {
    Timeout,
}

/// Trait implemented by waitset signals handed to conditions.
///
/// Conditions retain these handles and call `signal()` when their trigger
/// value becomes true. Each signal is associated with a stable identifier
/// that allows conditions to detach cleanly.
pub trait WaitsetSignal: Send + Sync {
    /// Notify the waitset that the associated slot became active.
    fn signal(&self);

    /// Stable identifier for this signal (per registration).
    fn id(&self) -> u64;
}

/// Driver responsible for slot bookkeeping and blocking.
#[derive(Clone)]
pub struct WaitsetDriver {
    inner: Arc<WaitsetDriverInner>,
}

impl WaitsetDriver {
    /// Create a new waitset driver capable of tracking up to `max_slots`
    /// concurrent registrations.
    pub fn new(max_slots: usize) -> io::Result<Self> {
        if max_slots == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "max_slots must be > 0",
            ));
        }
        Ok(Self::build(max_slots))
    }

    /// Driver with [`WAITSET_DEFAULT_MAX_SLOTS`] slots.
    #[must_use]
    pub fn with_default_capacity() -> Self {
        Self::build(WAITSET_DEFAULT_MAX_SLOTS)
    }

    fn build(max_slots: usize) -> Self {
        Self {
            inner: Arc::new(WaitsetDriverInner {
                state: Mutex::new(DriverState {
                    slots: SlotTable::new(max_slots),
                    pending: Vec::new(),
                    notified: false,
                }),
                cond: Condvar::new(),
                max_slots,
            }),
        }
    }

    /// Register a new slot and obtain the associated [`WaitsetSignal`].
    pub fn register_slot(&self) -> io::Result<WaitsetRegistration> {
        self.inner.register_slot()
    }

    /// Unregister a previously allocated slot. Returns `true` if the slot was
    /// successfully removed.
    pub fn unregister_slot(&self, slot_index: usize, slot_id: u64) -> bool {
        let mut state = self.inner.state.lock();
        state.pending.retain(|&slot| slot != slot_index);
        state.slots.release_slot(slot_index, slot_id)
    }

    /// Block until one or more slots have been signalled or `manual_notify`
    /// was called. `None` blocks without bound.
    ///
    /// Returns the signalled slot indices (empty after a bare manual notify).
    pub fn wait(&self, timeout: Option<Duration>) -> Result<Vec<usize>, WaitsetWaitError> {
        // Overflowing deadlines degrade to an unbounded wait.
        let deadline = timeout.and_then(|t| Instant::now().checked_add(t));
        let mut state = self.inner.state.lock();
        loop {
            if state.notified || !state.pending.is_empty() {
                state.notified = false;
                return Ok(std::mem::take(&mut state.pending));
            }
            match deadline {
                Some(deadline) => {
                    if self.inner.cond.wait_until(&mut state, deadline).timed_out()
                        && !state.notified
                        && state.pending.is_empty()
                    {
                        return Err(WaitsetWaitError::Timeout);
                    }
                }
                None => self.inner.cond.wait(&mut state),
            }
        }
    }

    /// Manually wake the waiter without flipping any slot.
    pub fn manual_notify(&self) {
        let mut state = self.inner.state.lock();
        state.notified = true;
        self.inner.cond.notify_all();
    }
}

struct DriverState {
    slots: SlotTable,
    pending: Vec<usize>,
    notified: bool,
}

struct WaitsetDriverInner {
    state: Mutex<DriverState>,
    cond: Condvar,
    max_slots: usize,
}

impl WaitsetDriverInner {
    fn register_slot(self: &Arc<Self>) -> io::Result<WaitsetRegistration> {
        let (slot_index, slot_id) = self.state.lock().slots.allocate_slot(self.max_slots)?;

        let signal = Arc::new(SignalHandle {
            inner: Arc::downgrade(self),
            slot_index,
            slot_id,
        });

        Ok(WaitsetRegistration {
            slot_index,
            slot_id,
            signal,
        })
    }

    fn signal_slot(&self, slot_index: usize, slot_id: u64) {
        let mut state = self.state.lock();
        if !state.slots.is_live(slot_index, slot_id) {
            log::debug!("[rt] waitset signal for released slot {}", slot_index);
            return;
        }
        if !state.pending.contains(&slot_index) {
            state.pending.push(slot_index);
            self.cond.notify_all();
        }
    }
}

/// Registration details returned by [`WaitsetDriver::register_slot`].
pub struct WaitsetRegistration {
    slot_index: usize,
    slot_id: u64,
    signal: Arc<SignalHandle>,
}

impl WaitsetRegistration {
    /// Erase the concrete type so callers can store `Arc<dyn WaitsetSignal>`.
    pub fn into_trait(self) -> (usize, u64, Arc<dyn WaitsetSignal>) {
        (
            self.slot_index,
            self.slot_id,
            self.signal as Arc<dyn WaitsetSignal>,
        )
    }
}

struct SignalHandle {
    inner: Weak<WaitsetDriverInner>,
    slot_index: usize,
    slot_id: u64,
}

impl WaitsetSignal for SignalHandle {
    fn signal(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.signal_slot(self.slot_index, self.slot_id);
        }
    }

    fn id(&self) -> u64 {
        self.slot_id
    }
}

struct SlotTable {
    entries: Vec<Option<u64>>,
    free: Vec<usize>,
    next_id: u64,
}

impl SlotTable {
    fn new(max_slots: usize) -> Self {
        Self {
            entries: Vec::with_capacity(max_slots.min(16)),
            free: Vec::new(),
            next_id: 1,
        }
    }

    fn allocate_slot(&mut self, max_slots: usize) -> io::Result<(usize, u64)> {
        let slot_index = if let Some(index) = self.free.pop() {
            index
        } else {
            let index = self.entries.len();
            if index >= max_slots {
                return Err(io::Error::other(format!(
                    "waitset capacity exceeded (max {})",
                    max_slots
                )));
            }
            self.entries.push(None);
            index
        };

        let slot_id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1).max(1);
        self.entries[slot_index] = Some(slot_id);

        Ok((slot_index, slot_id))
    }

    fn release_slot(&mut self, slot_index: usize, slot_id: u64) -> bool {
        if self.is_live(slot_index, slot_id) {
            self.entries[slot_index] = None;
            self.free.push(slot_index);
            true
        } else {
            false
        }
    }

    fn is_live(&self, slot_index: usize, slot_id: u64) -> bool {
        matches!(self.entries.get(slot_index), Some(Some(id)) if *id == slot_id)
    }
}

#[cfg(test)]
pub(super) mod internal {
    use super::*;

    pub(crate) fn live_slots(driver: &WaitsetDriver) -> usize {
        driver
            .inner
            .state
            .lock()
            .slots
            .entries
            .iter()
            .filter(|e| e.is_some())
            .count()
    }
}
