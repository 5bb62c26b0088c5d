// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! ReadCondition and QueryCondition for DataReader event filtering
//!
//! Both are created by a `DataReader` and evaluate their trigger value
//! against that reader's cache on demand: the condition is true while at
//! least one cached sample matches its state masks (and, for a
//! QueryCondition, its content predicate).

use super::condition::{next_condition_id, WaitsetHooks};
use super::reader::{InstanceState, SampleState, ViewState};
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

macro_rules! state_mask {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(u32);

        impl $name {
            /// Create from raw bits
            pub const fn from_bits(bits: u32) -> Self {
                $name(bits)
            }

            /// Get raw bits
            pub const fn bits(&self) -> u32 {
                self.0
            }

            /// Check if contains state
            pub const fn contains(&self, other: $name) -> bool {
                (self.0 & other.0) == other.0
            }
        }

        impl std::ops::BitOr for $name {
            type Output = Self;
            fn bitor(self, rhs: Self) -> Self {
                $name(self.0 | rhs.0)
            }
        }
    };
}

state_mask!(
    /// Sample state mask (DDS v1.4 spec section 2.2.2.5.4)
    SampleStateMask
);
state_mask!(
    /// View state mask (DDS v1.4 spec section 2.2.2.5.4)
    ViewStateMask
);
state_mask!(
    /// Instance state mask (DDS v1.4 spec section 2.2.2.5.4)
    InstanceStateMask
);

impl SampleStateMask {
    /// Sample has been read
    pub const READ: SampleStateMask = SampleStateMask(1 << 0);
    /// Sample has not been read
    pub const NOT_READ: SampleStateMask = SampleStateMask(1 << 1);
    /// Any sample state
    pub const ANY: SampleStateMask = SampleStateMask(Self::READ.0 | Self::NOT_READ.0);
}

impl ViewStateMask {
    /// First sample of an instance (or first after it came back alive)
    pub const NEW: ViewStateMask = ViewStateMask(1 << 0);
    /// Instance already accessed by the application
    pub const NOT_NEW: ViewStateMask = ViewStateMask(1 << 1);
    /// Any view state
    pub const ANY: ViewStateMask = ViewStateMask(Self::NEW.0 | Self::NOT_NEW.0);
}

impl InstanceStateMask {
    /// Instance is alive (writer exists)
    pub const ALIVE: InstanceStateMask = InstanceStateMask(1 << 0);
    /// Instance was disposed
    pub const NOT_ALIVE_DISPOSED: InstanceStateMask = InstanceStateMask(1 << 1);
    /// Instance has no live writer left
    pub const NOT_ALIVE_NO_WRITERS: InstanceStateMask = InstanceStateMask(1 << 2);
    /// Either not-alive state
    pub const NOT_ALIVE: InstanceStateMask =
        InstanceStateMask(Self::NOT_ALIVE_DISPOSED.0 | Self::NOT_ALIVE_NO_WRITERS.0);
    /// Any instance state
    pub const ANY: InstanceStateMask = InstanceStateMask(
        Self::ALIVE.0 | Self::NOT_ALIVE_DISPOSED.0 | Self::NOT_ALIVE_NO_WRITERS.0,
    );
}

/// The three masks a read/take call or a ReadCondition filters on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateMasks {
    pub sample: SampleStateMask,
    pub view: ViewStateMask,
    pub instance: InstanceStateMask,
}

impl StateMasks {
    pub const ANY: StateMasks = StateMasks {
        sample: SampleStateMask::ANY,
        view: ViewStateMask::ANY,
        instance: InstanceStateMask::ANY,
    };

    #[must_use]
    pub fn new(
        sample: SampleStateMask,
        view: ViewStateMask,
        instance: InstanceStateMask,
    ) -> Self {
        Self {
            sample,
            view,
            instance,
        }
    }

    /// Whether a sample in the given states passes all three masks.
    #[must_use]
    pub fn matches(&self, sample: SampleState, view: ViewState, instance: InstanceState) -> bool {
        self.sample.contains(sample.mask())
            && self.view.contains(view.mask())
            && self.instance.contains(instance.mask())
    }
}

/// Type-erased content predicate of a QueryCondition.
pub(crate) type SampleFilter = Arc<dyn Fn(&dyn Any, &[String]) -> bool + Send + Sync>;

/// Reader-side view used by conditions to evaluate their trigger value.
pub(crate) trait ReaderProbe: Send + Sync {
    fn has_matching(&self, masks: StateMasks, query: Option<&QueryParts>) -> bool;
}

pub(crate) struct QueryParts {
    expression: String,
    parameters: Mutex<Vec<String>>,
    filter: SampleFilter,
}

impl QueryParts {
    /// Evaluate the predicate against one payload.
    pub(crate) fn accepts(&self, sample: &dyn Any) -> bool {
        let params = self.parameters.lock();
        (self.filter)(sample, &params)
    }
}

pub(crate) struct ReadConditionInner {
    id: u64,
    masks: StateMasks,
    reader: Weak<dyn ReaderProbe>,
    hooks: WaitsetHooks,
    deleted: AtomicBool,
    query: Option<QueryParts>,
}

/// ReadCondition - condition based on DataReader sample states
///
/// Created with `DataReader::create_readcondition`, released with
/// `DataReader::delete_readcondition` once detached from every WaitSet.
#[derive(Clone)]
pub struct ReadCondition {
    inner: Arc<ReadConditionInner>,
}

impl ReadCondition {
    pub(crate) fn new(masks: StateMasks, reader: Weak<dyn ReaderProbe>) -> Self {
        Self::build(masks, reader, None)
    }

    fn build(masks: StateMasks, reader: Weak<dyn ReaderProbe>, query: Option<QueryParts>) -> Self {
        Self {
            inner: Arc::new(ReadConditionInner {
                id: next_condition_id(),
                masks,
                reader,
                hooks: WaitsetHooks::default(),
                deleted: AtomicBool::new(false),
                query,
            }),
        }
    }

    pub fn get_sample_state_mask(&self) -> SampleStateMask {
        self.inner.masks.sample
    }

    pub fn get_view_state_mask(&self) -> ViewStateMask {
        self.inner.masks.view
    }

    pub fn get_instance_state_mask(&self) -> InstanceStateMask {
        self.inner.masks.instance
    }

    pub fn state_masks(&self) -> StateMasks {
        self.inner.masks
    }

    /// True while the owning reader holds a matching sample.
    ///
    /// Always false once the condition or its reader has been deleted.
    pub fn get_trigger_value(&self) -> bool {
        if self.is_deleted() {
            return false;
        }
        match self.inner.reader.upgrade() {
            Some(reader) => reader.has_matching(self.inner.masks, self.inner.query.as_ref()),
            None => false,
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.inner.id
    }

    pub(crate) fn hooks(&self) -> &WaitsetHooks {
        &self.inner.hooks
    }

    pub(crate) fn query(&self) -> Option<&QueryParts> {
        self.inner.query.as_ref()
    }

    pub(crate) fn is_deleted(&self) -> bool {
        self.inner.deleted.load(Ordering::Acquire)
    }

    pub(crate) fn mark_deleted(&self) {
        self.inner.deleted.store(true, Ordering::Release);
    }

    /// Wake attached WaitSets if the trigger value is currently true.
    pub(crate) fn refresh(&self) {
        if self.get_trigger_value() {
            self.inner.hooks.notify();
        }
    }

    /// Whether `reader` is the reader this condition was created by.
    #[cfg(test)]
    pub(crate) fn belongs_to(&self, reader: &Weak<dyn ReaderProbe>) -> bool {
        Weak::ptr_eq(&self.inner.reader, reader)
    }

    pub(crate) fn same_as(&self, other: &ReadCondition) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ReadCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadCondition")
            .field("id", &self.inner.id)
            .field("masks", &self.inner.masks)
            .field("query", &self.inner.query.as_ref().map(|q| &q.expression))
            .finish()
    }
}

/// QueryCondition - ReadCondition with a content filter
///
/// The expression is kept for introspection; evaluation is done by the
/// predicate supplied at creation, which receives the sample and the
/// current query parameters.
#[derive(Clone, Debug)]
pub struct QueryCondition {
    base: ReadCondition,
}

impl QueryCondition {
    pub(crate) fn new<T, F>(
        masks: StateMasks,
        reader: Weak<dyn ReaderProbe>,
        expression: String,
        parameters: Vec<String>,
        predicate: F,
    ) -> Self
    where
        T: 'static,
        F: Fn(&T, &[String]) -> bool + Send + Sync + 'static,
    {
        let filter: SampleFilter = Arc::new(move |sample: &dyn Any, params: &[String]| {
            sample
                .downcast_ref::<T>()
                .is_some_and(|s| predicate(s, params))
        });
        let parts = QueryParts {
            expression,
            parameters: Mutex::new(parameters),
            filter,
        };
        Self {
            base: ReadCondition::build(masks, reader, Some(parts)),
        }
    }

    pub fn get_query_expression(&self) -> &str {
        self.base
            .query()
            .map(|q| q.expression.as_str())
            .unwrap_or_default()
    }

    pub fn get_query_parameters(&self) -> Vec<String> {
        self.base
            .query()
            .map(|q| q.parameters.lock().clone())
            .unwrap_or_default()
    }

    /// Replace the parameters; attached WaitSets are woken if the condition
    /// now triggers.
    pub fn set_query_parameters(&self, parameters: Vec<String>) {
        if let Some(q) = self.base.query() {
            *q.parameters.lock() = parameters;
        }
        self.base.refresh();
    }

    pub fn get_trigger_value(&self) -> bool {
        self.base.get_trigger_value()
    }

    pub fn state_masks(&self) -> StateMasks {
        self.base.state_masks()
    }

    /// The underlying read condition (shares state with `self`).
    pub fn as_read_condition(&self) -> &ReadCondition {
        &self.base
    }

    pub(crate) fn id(&self) -> u64 {
        self.base.id()
    }

    pub(crate) fn hooks(&self) -> &WaitsetHooks {
        self.base.hooks()
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::ReadCondition {}
    impl Sealed for super::QueryCondition {}
}

/// Conditions accepted by `take_w_condition` / `read_w_condition`.
pub trait SampleCondition: sealed::Sealed {
    #[doc(hidden)]
    fn read_condition(&self) -> &ReadCondition;
}

impl SampleCondition for ReadCondition {
    fn read_condition(&self) -> &ReadCondition {
        self
    }
}

impl SampleCondition for QueryCondition {
    fn read_condition(&self) -> &ReadCondition {
        &self.base
    }
}
