// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! DDS Conditions - event notification predicates for WaitSets
//!
//! Conditions are cheap handles (`Clone` shares the underlying state). A
//! WaitSet stores them as the tagged [`Condition`] variant and registers a
//! driver signal with each one; the condition fires that signal whenever its
//! trigger value becomes true.

use super::read_condition::{QueryCondition, ReadCondition};
use crate::core::rt::waitset::WaitsetSignal;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

static NEXT_CONDITION_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_condition_id() -> u64 {
    NEXT_CONDITION_ID.fetch_add(1, Ordering::Relaxed)
}

/// Status mask bits for StatusCondition and listener registration.
///
/// Per DDS v1.4 spec section 2.2.4.1 - Communication Status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusMask(u32);

impl StatusMask {
    /// No status enabled
    pub const NONE: StatusMask = StatusMask(0);

    /// All statuses enabled
    pub const ALL: StatusMask = StatusMask(0x7FF);

    /// Data available to read (DataReader)
    pub const DATA_AVAILABLE: StatusMask = StatusMask(1 << 0);

    /// Sample lost (DataReader)
    pub const SAMPLE_LOST: StatusMask = StatusMask(1 << 1);

    /// Sample rejected (DataReader)
    pub const SAMPLE_REJECTED: StatusMask = StatusMask(1 << 2);

    /// Liveliness changed (DataReader)
    pub const LIVELINESS_CHANGED: StatusMask = StatusMask(1 << 3);

    /// Requested deadline missed (DataReader)
    pub const REQUESTED_DEADLINE_MISSED: StatusMask = StatusMask(1 << 4);

    /// Requested incompatible QoS (DataReader)
    pub const REQUESTED_INCOMPATIBLE_QOS: StatusMask = StatusMask(1 << 5);

    /// Subscription matched (DataReader)
    pub const SUBSCRIPTION_MATCHED: StatusMask = StatusMask(1 << 6);

    /// Liveliness lost (DataWriter)
    pub const LIVELINESS_LOST: StatusMask = StatusMask(1 << 7);

    /// Offered deadline missed (DataWriter)
    pub const OFFERED_DEADLINE_MISSED: StatusMask = StatusMask(1 << 8);

    /// Offered incompatible QoS (DataWriter)
    pub const OFFERED_INCOMPATIBLE_QOS: StatusMask = StatusMask(1 << 9);

    /// Publication matched (DataWriter)
    pub const PUBLICATION_MATCHED: StatusMask = StatusMask(1 << 10);

    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        StatusMask(bits)
    }

    #[must_use]
    pub const fn bits(&self) -> u32 {
        self.0
    }

    /// Check if this mask contains the given status
    #[must_use]
    pub const fn contains(&self, other: StatusMask) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Whether the two masks share at least one bit.
    #[must_use]
    pub const fn intersects(&self, other: StatusMask) -> bool {
        (self.0 & other.0) != 0
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn without(self, other: StatusMask) -> Self {
        StatusMask(self.0 & !other.0)
    }
}

impl std::ops::BitOr for StatusMask {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        StatusMask(self.0 | rhs.0)
    }
}

impl std::ops::BitAnd for StatusMask {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        StatusMask(self.0 & rhs.0)
    }
}

struct WaitsetHook {
    id: u64,
    signal: Weak<dyn WaitsetSignal>,
}

/// Driver signals registered by the WaitSets a condition is attached to.
#[derive(Default)]
pub(crate) struct WaitsetHooks {
    hooks: Mutex<Vec<WaitsetHook>>,
}

impl WaitsetHooks {
    pub(crate) fn add(&self, signal: &Arc<dyn WaitsetSignal>, triggered: bool) {
        let mut hooks = self.hooks.lock();
        hooks.retain(|hook| hook.signal.upgrade().is_some());
        hooks.push(WaitsetHook {
            id: signal.id(),
            signal: Arc::downgrade(signal),
        });
        drop(hooks);

        if triggered {
            signal.signal();
        }
    }

    pub(crate) fn remove(&self, signal_id: u64) {
        self.hooks.lock().retain(|hook| hook.id != signal_id);
    }

    pub(crate) fn notify(&self) {
        self.hooks.lock().retain(|hook| {
            if let Some(signal) = hook.signal.upgrade() {
                signal.signal();
                true
            } else {
                false
            }
        });
    }

    /// Whether a live WaitSet still holds this condition.
    pub(crate) fn is_attached(&self) -> bool {
        self.hooks
            .lock()
            .iter()
            .any(|hook| hook.signal.upgrade().is_some())
    }
}

/// StatusCondition - condition based on Entity communication status
///
/// One per reader/writer. The trigger value is true while any enabled
/// status has changed and not been read back through the matching
/// `get_*_status()` call.
#[derive(Clone)]
pub struct StatusCondition {
    inner: Arc<StatusConditionInner>,
}

struct StatusConditionInner {
    id: u64,
    enabled: Mutex<StatusMask>,
    active: Mutex<StatusMask>,
    hooks: WaitsetHooks,
}

impl StatusCondition {
    /// Create a StatusCondition with every status enabled.
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(StatusConditionInner {
                id: next_condition_id(),
                enabled: Mutex::new(StatusMask::ALL),
                active: Mutex::new(StatusMask::NONE),
                hooks: WaitsetHooks::default(),
            }),
        }
    }

    /// Set which statuses this condition should monitor
    pub fn set_enabled_statuses(&self, mask: StatusMask) {
        *self.inner.enabled.lock() = mask;
        if self.get_trigger_value() {
            self.inner.hooks.notify();
        }
    }

    #[must_use]
    pub fn get_enabled_statuses(&self) -> StatusMask {
        *self.inner.enabled.lock()
    }

    /// Statuses changed since they were last read.
    #[must_use]
    pub fn get_active_statuses(&self) -> StatusMask {
        *self.inner.active.lock()
    }

    #[must_use]
    pub fn get_trigger_value(&self) -> bool {
        self.get_enabled_statuses()
            .intersects(self.get_active_statuses())
    }

    /// Mark `mask` as changed (called by the owning entity).
    pub(crate) fn raise(&self, mask: StatusMask) {
        {
            let mut active = self.inner.active.lock();
            *active = *active | mask;
        }
        if self.get_enabled_statuses().intersects(mask) {
            self.inner.hooks.notify();
        }
    }

    /// Clear `mask` after the application read the status.
    pub(crate) fn clear(&self, mask: StatusMask) {
        let mut active = self.inner.active.lock();
        *active = active.without(mask);
    }

    pub(crate) fn id(&self) -> u64 {
        self.inner.id
    }

    pub(crate) fn hooks(&self) -> &WaitsetHooks {
        &self.inner.hooks
    }
}

impl fmt::Debug for StatusCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusCondition")
            .field("id", &self.inner.id)
            .field("enabled", &self.get_enabled_statuses())
            .field("active", &self.get_active_statuses())
            .finish()
    }
}

/// GuardCondition - manually-triggered condition
///
/// The trigger value is under the control of the application, which makes
/// it the usual way to wake a waiting thread for shutdown.
#[derive(Clone)]
pub struct GuardCondition {
    inner: Arc<GuardConditionInner>,
}

struct GuardConditionInner {
    id: u64,
    trigger_value: AtomicBool,
    hooks: WaitsetHooks,
}

impl GuardCondition {
    /// Create a new GuardCondition with trigger_value = false
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(GuardConditionInner {
                id: next_condition_id(),
                trigger_value: AtomicBool::new(false),
                hooks: WaitsetHooks::default(),
            }),
        }
    }

    /// Set the trigger value; `true` wakes every WaitSet holding it.
    pub fn set_trigger_value(&self, value: bool) {
        self.inner.trigger_value.store(value, Ordering::Release);
        if value {
            self.inner.hooks.notify();
        }
    }

    #[must_use]
    pub fn get_trigger_value(&self) -> bool {
        self.inner.trigger_value.load(Ordering::Acquire)
    }

    pub(crate) fn id(&self) -> u64 {
        self.inner.id
    }

    pub(crate) fn hooks(&self) -> &WaitsetHooks {
        &self.inner.hooks
    }
}

impl Default for GuardCondition {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GuardCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GuardCondition")
            .field("id", &self.inner.id)
            .field("trigger_value", &self.get_trigger_value())
            .finish()
    }
}

/// Any condition a [`WaitSet`](super::WaitSet) can hold.
///
/// Two `Condition`s are equal when they refer to the same underlying
/// condition object.
#[derive(Clone, Debug)]
pub enum Condition {
    Read(ReadCondition),
    Query(QueryCondition),
    Status(StatusCondition),
    Guard(GuardCondition),
}

impl Condition {
    /// Current trigger value of the wrapped condition.
    #[must_use]
    pub fn trigger_value(&self) -> bool {
        match self {
            Condition::Read(c) => c.get_trigger_value(),
            Condition::Query(c) => c.get_trigger_value(),
            Condition::Status(c) => c.get_trigger_value(),
            Condition::Guard(c) => c.get_trigger_value(),
        }
    }

    /// Process-unique identifier of the wrapped condition.
    #[must_use]
    pub fn id(&self) -> u64 {
        match self {
            Condition::Read(c) => c.id(),
            Condition::Query(c) => c.id(),
            Condition::Status(c) => c.id(),
            Condition::Guard(c) => c.id(),
        }
    }

    pub(crate) fn hooks(&self) -> &WaitsetHooks {
        match self {
            Condition::Read(c) => c.hooks(),
            Condition::Query(c) => c.hooks(),
            Condition::Status(c) => c.hooks(),
            Condition::Guard(c) => c.hooks(),
        }
    }
}

impl PartialEq for Condition {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Condition {}

impl From<ReadCondition> for Condition {
    fn from(c: ReadCondition) -> Self {
        Condition::Read(c)
    }
}

impl From<&ReadCondition> for Condition {
    fn from(c: &ReadCondition) -> Self {
        Condition::Read(c.clone())
    }
}

impl From<QueryCondition> for Condition {
    fn from(c: QueryCondition) -> Self {
        Condition::Query(c)
    }
}

impl From<&QueryCondition> for Condition {
    fn from(c: &QueryCondition) -> Self {
        Condition::Query(c.clone())
    }
}

impl From<StatusCondition> for Condition {
    fn from(c: StatusCondition) -> Self {
        Condition::Status(c)
    }
}

impl From<&StatusCondition> for Condition {
    fn from(c: &StatusCondition) -> Self {
        Condition::Status(c.clone())
    }
}

impl From<GuardCondition> for Condition {
    fn from(c: GuardCondition) -> Self {
        Condition::Guard(c)
    }
}

impl From<&GuardCondition> for Condition {
    fn from(c: &GuardCondition) -> Self {
        Condition::Guard(c.clone())
    }
}
