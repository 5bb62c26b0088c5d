// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! WaitSet - blocking wait for Condition triggers
//!
//! Backed by the runtime waitset driver (`core::rt::waitset`). Every attached
//! condition gets its own driver slot and signal, so a condition whose
//! trigger value flips to `true` wakes the blocked waiter immediately.
//!
//! State machine: `Idle -> Waiting -> {Triggered, TimedOut}`. The terminal
//! state is reported by [`WaitSet::state`] until the next `wait()`; there is
//! no implicit retry.

use super::condition::Condition;
use super::{Error, Result};
use crate::core::rt::{WaitsetDriver, WaitsetSignal, WaitsetWaitError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Where a WaitSet is in its wait cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitSetState {
    /// No wait in progress (initial state, or after an interrupted wait).
    Idle,
    /// A thread is blocked in `wait()`.
    Waiting,
    /// The last wait returned at least one triggered condition.
    Triggered,
    /// The last wait ran out its timeout.
    TimedOut,
}

/// Result of [`WaitSet::wait`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// Conditions whose trigger value was true when the wait returned.
    Triggered(Vec<Condition>),
    /// Nothing triggered within the timeout.
    TimedOut,
    /// Woken by [`WaitSet::notify`] with nothing triggered.
    Interrupted,
}

impl WaitOutcome {
    /// Triggered conditions (empty for `TimedOut`/`Interrupted`).
    #[must_use]
    pub fn triggered(&self) -> &[Condition] {
        match self {
            WaitOutcome::Triggered(conds) => conds,
            _ => &[],
        }
    }

    #[must_use]
    pub fn is_timed_out(&self) -> bool {
        matches!(self, WaitOutcome::TimedOut)
    }

    /// Whether `condition` is among the triggered ones.
    pub fn contains<C: Into<Condition>>(&self, condition: C) -> bool {
        let condition = condition.into();
        self.triggered().iter().any(|c| *c == condition)
    }
}

struct ConditionEntry {
    condition: Condition,
    slot_index: usize,
    slot_id: u64,
    signal: Arc<dyn WaitsetSignal>,
}

/// WaitSet - wait for multiple conditions
///
/// A WaitSet blocks the calling thread until at least one attached Condition
/// has `trigger_value == true` or the timeout elapses. Only one thread may
/// wait on a given WaitSet at a time.
///
/// Dropping the WaitSet detaches every condition it still holds, after which
/// `DataReader::delete_readcondition` accepts them.
///
/// # Example
///
/// ```rust,no_run
/// use dcps::{GuardCondition, WaitOutcome, WaitSet};
/// use std::time::Duration;
///
/// let waitset = WaitSet::new();
/// let stop = GuardCondition::new();
/// waitset.attach_condition(&stop)?;
///
/// match waitset.wait(Duration::from_secs(10))? {
///     WaitOutcome::Triggered(conds) => println!("{} triggered", conds.len()),
///     WaitOutcome::TimedOut => println!("timeout"),
///     WaitOutcome::Interrupted => {}
/// }
/// waitset.detach_condition(&stop)?;
/// # Ok::<(), dcps::Error>(())
/// ```
pub struct WaitSet {
    driver: WaitsetDriver,
    entries: Mutex<Vec<Option<ConditionEntry>>>,
    state: Mutex<WaitSetState>,
    waiting: AtomicBool,
}

/// Clears the `waiting` flag on every exit path of `wait()`.
struct WaitingGuard<'a>(&'a AtomicBool);

impl Drop for WaitingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl WaitSet {
    /// Create a new WaitSet
    #[must_use]
    pub fn new() -> Self {
        Self {
            driver: WaitsetDriver::with_default_capacity(),
            entries: Mutex::new(Vec::new()),
            state: Mutex::new(WaitSetState::Idle),
            waiting: AtomicBool::new(false),
        }
    }

    /// Attach a Condition to this WaitSet
    ///
    /// Fails with `BadParameter` if the condition is already attached and
    /// with `AlreadyDeleted` for a deleted read/query condition.
    pub fn attach_condition<C: Into<Condition>>(&self, condition: C) -> Result<()> {
        let condition = condition.into();
        if is_deleted(&condition) {
            return Err(Error::AlreadyDeleted);
        }

        let mut entries = self.entries.lock();
        if entries
            .iter()
            .flatten()
            .any(|entry| entry.condition == condition)
        {
            return Err(Error::BadParameter(format!(
                "condition {} already attached",
                condition.id()
            )));
        }

        let registration = self
            .driver
            .register_slot()
            .map_err(|e| Error::ResourceLimitExceeded(e.to_string()))?;
        let (slot_index, slot_id, signal) = registration.into_trait();

        if slot_index >= entries.len() {
            entries.resize_with(slot_index + 1, || None);
        }
        // Hook last: an already-true condition signals its fresh slot.
        condition.hooks().add(&signal, condition.trigger_value());
        entries[slot_index] = Some(ConditionEntry {
            condition,
            slot_index,
            slot_id,
            signal,
        });

        Ok(())
    }

    /// Detach a Condition from this WaitSet
    pub fn detach_condition<C: Into<Condition>>(&self, condition: C) -> Result<()> {
        let condition = condition.into();
        let mut entries = self.entries.lock();

        let entry = entries
            .iter_mut()
            .find(|slot| matches!(slot, Some(entry) if entry.condition == condition))
            .and_then(Option::take)
            .ok_or_else(|| {
                Error::BadParameter(format!("condition {} not attached", condition.id()))
            })?;
        drop(entries);

        entry.condition.hooks().remove(entry.signal.id());
        self.driver.unregister_slot(entry.slot_index, entry.slot_id);
        Ok(())
    }

    /// Get all attached Conditions
    #[must_use]
    pub fn get_conditions(&self) -> Vec<Condition> {
        self.entries
            .lock()
            .iter()
            .flatten()
            .map(|entry| entry.condition.clone())
            .collect()
    }

    /// Current position in the wait state machine.
    #[must_use]
    pub fn state(&self) -> WaitSetState {
        *self.state.lock()
    }

    /// Block until at least one Condition is triggered or `timeout` elapses.
    ///
    /// A timeout too large to represent waits without bound. Returns
    /// `PreconditionNotMet` if another thread is already waiting.
    pub fn wait(&self, timeout: Duration) -> Result<WaitOutcome> {
        if self.waiting.swap(true, Ordering::AcqRel) {
            return Err(Error::PreconditionNotMet(
                "another thread is already waiting on this WaitSet".into(),
            ));
        }
        let _guard = WaitingGuard(&self.waiting);
        self.set_state(WaitSetState::Waiting);
        log::debug!("[waitset] wait timeout={:?}", timeout);

        let triggered = self.collect_triggered(None);
        if !triggered.is_empty() {
            return Ok(self.finish(WaitOutcome::Triggered(triggered)));
        }

        let deadline = Instant::now().checked_add(timeout);
        loop {
            let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
            if remaining == Some(Duration::ZERO) {
                return Ok(self.finish_timeout());
            }

            match self.driver.wait(remaining) {
                Ok(indices) if indices.is_empty() => {
                    // Bare notify(): report anything that raced in, else interrupt.
                    let triggered = self.collect_triggered(None);
                    let outcome = if triggered.is_empty() {
                        WaitOutcome::Interrupted
                    } else {
                        WaitOutcome::Triggered(triggered)
                    };
                    return Ok(self.finish(outcome));
                }
                Ok(indices) => {
                    let triggered = self.collect_triggered(Some(&indices));
                    if !triggered.is_empty() {
                        log::debug!("[waitset] wait returning triggered_len={}", triggered.len());
                        return Ok(self.finish(WaitOutcome::Triggered(triggered)));
                    }
                    // Signalled condition went false again before we looked.
                }
                Err(WaitsetWaitError::Timeout) => return Ok(self.finish_timeout()),
            }
        }
    }

    /// Wake a blocked `wait()` from another thread without triggering any
    /// condition. The waiter returns [`WaitOutcome::Interrupted`].
    pub fn notify(&self) {
        self.driver.manual_notify();
    }

    fn finish_timeout(&self) -> WaitOutcome {
        // Last look so a trigger racing the deadline is not lost.
        let triggered = self.collect_triggered(None);
        if triggered.is_empty() {
            self.finish(WaitOutcome::TimedOut)
        } else {
            self.finish(WaitOutcome::Triggered(triggered))
        }
    }

    fn finish(&self, outcome: WaitOutcome) -> WaitOutcome {
        self.set_state(match outcome {
            WaitOutcome::Triggered(_) => WaitSetState::Triggered,
            WaitOutcome::TimedOut => WaitSetState::TimedOut,
            WaitOutcome::Interrupted => WaitSetState::Idle,
        });
        outcome
    }

    fn set_state(&self, state: WaitSetState) {
        *self.state.lock() = state;
    }

    fn collect_triggered(&self, indices: Option<&[usize]>) -> Vec<Condition> {
        let entries = self.entries.lock();
        let candidates: Vec<Condition> = match indices {
            Some(slots) => slots
                .iter()
                .filter_map(|&slot| entries.get(slot).and_then(Option::as_ref))
                .map(|entry| entry.condition.clone())
                .collect(),
            None => entries
                .iter()
                .flatten()
                .map(|entry| entry.condition.clone())
                .collect(),
        };
        drop(entries);

        // Trigger evaluation may take reader locks; never under `entries`.
        candidates
            .into_iter()
            .filter(Condition::trigger_value)
            .collect()
    }
}

fn is_deleted(condition: &Condition) -> bool {
    match condition {
        Condition::Read(c) => c.is_deleted(),
        Condition::Query(c) => c.as_read_condition().is_deleted(),
        Condition::Status(_) | Condition::Guard(_) => false,
    }
}

impl Default for WaitSet {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WaitSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitSet")
            .field("conditions", &self.get_conditions().len())
            .field("state", &self.state())
            .finish()
    }
}

impl Drop for WaitSet {
    fn drop(&mut self) {
        let mut entries = self.entries.lock();
        for entry in entries.iter_mut().filter_map(Option::take) {
            entry.condition.hooks().remove(entry.signal.id());
            self.driver.unregister_slot(entry.slot_index, entry.slot_id);
        }
    }
}
