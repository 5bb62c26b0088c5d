// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shared reader state: everything a `DataReader` handle, its matched
//! writers, its conditions and its dispatch thread touch.
//!
//! Lock order: `state` before any condition or listener lock. Conditions
//! and the status condition are notified after `state` is released.

use super::cache::{Change, ChangeKind, ReaderCache};
use super::dispatch::{DispatchTarget, Dispatcher};
use super::liveliness::LivelinessTracker;
use super::loan::{LoanSlot, SampleLoan};
use super::runtime::DataReader;
use super::{InstanceHandle, SampleInfo};
use crate::core::Guid;
use crate::dds::domain_registry::{BindToken, EndpointInfo, EndpointLink};
use crate::dds::listener::{
    DataReaderListener, LivelinessChangedStatus, QosPolicyId, RequestedIncompatibleQosStatus,
    SampleRejectedStatus, SubscriptionMatchedStatus,
};
use crate::dds::qos::DataReaderQos;
use crate::dds::read_condition::{QueryParts, ReadCondition, ReaderProbe, StateMasks};
use crate::dds::{
    Error, InstanceStateMask, Result, SampleStateMask, StatusCondition, StatusMask,
    ViewStateMask, DDS,
};
use crate::qos::time_based_filter::{Admission, TimeBasedFilterCoalescer};
use crate::qos::Reliability;
use parking_lot::{Mutex, MutexGuard};
use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

pub(crate) type ListenerSlot<T> = Option<(Arc<dyn DataReaderListener<T>>, StatusMask)>;

struct ReaderState<T> {
    cache: ReaderCache<T>,
    filters: HashMap<InstanceHandle, TimeBasedFilterCoalescer<Change<T>>>,
    liveliness: LivelinessTracker,
    subscription_matched: SubscriptionMatchedStatus,
    requested_incompatible: RequestedIncompatibleQosStatus,
    sample_rejected: SampleRejectedStatus,
}

impl<T: DDS> ReaderState<T> {
    /// Queue one change in the cache; returns the statuses it raised.
    fn store(&mut self, change: Change<T>) -> StatusMask {
        let instance = change.instance;
        match self.cache.insert(change) {
            Ok(true) => StatusMask::DATA_AVAILABLE,
            Ok(false) => StatusMask::NONE,
            Err(reason) => {
                let status = &mut self.sample_rejected;
                status.total_count += 1;
                status.total_count_change += 1;
                status.last_reason = reason;
                status.last_instance_handle = instance;
                log::debug!("[reader] sample rejected: {:?}", reason);
                StatusMask::SAMPLE_REJECTED
            }
        }
    }

    /// Forget a writer that is gone or no longer alive.
    ///
    /// Samples of that writer still held by a time-based filter are
    /// discarded first: they must never surface after the instance's
    /// NOT_ALIVE_NO_WRITERS slot.
    fn release_writer(&mut self, writer: Guid) -> StatusMask {
        for coalescer in self.filters.values_mut() {
            if coalescer.pending().is_some_and(|c| c.writer == writer) {
                coalescer.discard_pending();
            }
        }
        if self.cache.drop_writer(writer) > 0 {
            StatusMask::DATA_AVAILABLE
        } else {
            StatusMask::NONE
        }
    }

    /// Store the held samples whose separation has elapsed. A sample whose
    /// writer is no longer matched and alive is dropped.
    fn flush_filters(&mut self, now: Instant) -> StatusMask {
        let due: Vec<Change<T>> = self
            .filters
            .values_mut()
            .filter_map(|coalescer| coalescer.flush_due(now))
            .collect();
        let mut raised = StatusMask::NONE;
        for change in due {
            if self.liveliness.is_alive(&change.writer) == Some(true) {
                raised = raised | self.store(change);
            } else {
                log::debug!("[reader] held sample of gone writer {} dropped", change.writer);
            }
        }
        raised
    }

    /// Forget coalescers of instances the cache no longer knows.
    fn prune_filters(&mut self) {
        let cache = &self.cache;
        self.filters
            .retain(|handle, coalescer| coalescer.has_pending() || cache.knows_instance(handle));
    }

    fn next_timer(&self) -> Option<Instant> {
        let flush = self
            .filters
            .values()
            .filter_map(TimeBasedFilterCoalescer::next_flush)
            .min();
        match (self.liveliness.next_deadline(), flush) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }
}

pub(crate) struct ReaderInner<T: DDS> {
    guid: Guid,
    topic_name: Arc<str>,
    qos: DataReaderQos,
    state: Mutex<ReaderState<T>>,
    loans: LoanSlot<T>,
    status_condition: StatusCondition,
    conditions: Mutex<Vec<ReadCondition>>,
    listener: Mutex<ListenerSlot<T>>,
    dispatcher: OnceLock<Dispatcher>,
    binding: Mutex<Option<BindToken>>,
    deleted: AtomicBool,
}

impl<T: DDS> ReaderInner<T> {
    /// Build the reader and start its dispatch thread. Matching happens
    /// later, through [`ReaderInner::bind`].
    pub(crate) fn spawn(
        guid: Guid,
        topic_name: Arc<str>,
        qos: DataReaderQos,
        buffer_capacity: usize,
        listener: ListenerSlot<T>,
    ) -> Result<Arc<Self>> {
        let inner = Arc::new(Self {
            guid,
            topic_name: Arc::clone(&topic_name),
            state: Mutex::new(ReaderState {
                cache: ReaderCache::new(qos.history, qos.resource_limits),
                filters: HashMap::new(),
                liveliness: LivelinessTracker::default(),
                subscription_matched: SubscriptionMatchedStatus::default(),
                requested_incompatible: RequestedIncompatibleQosStatus::default(),
                sample_rejected: SampleRejectedStatus::default(),
            }),
            qos,
            loans: LoanSlot::new(buffer_capacity),
            status_condition: StatusCondition::new(),
            conditions: Mutex::new(Vec::new()),
            listener: Mutex::new(listener),
            dispatcher: OnceLock::new(),
            binding: Mutex::new(None),
            deleted: AtomicBool::new(false),
        });

        let dispatcher =
            Dispatcher::spawn(Arc::downgrade(&inner), format!("dcps-rd-{}", topic_name))?;
        // Freshly created: the cell is empty.
        let _ = inner.dispatcher.set(dispatcher);
        log::debug!("[reader] {} created on '{}'", guid, topic_name);
        Ok(inner)
    }

    pub(crate) fn bind(&self, token: BindToken) {
        *self.binding.lock() = Some(token);
    }

    pub(crate) fn guid(&self) -> Guid {
        self.guid
    }

    pub(crate) fn topic_name(&self) -> &str {
        &self.topic_name
    }

    pub(crate) fn qos(&self) -> &DataReaderQos {
        &self.qos
    }

    pub(crate) fn status_condition(&self) -> &StatusCondition {
        &self.status_condition
    }

    pub(crate) fn loans(&self) -> &LoanSlot<T> {
        &self.loans
    }

    pub(crate) fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::Acquire)
    }

    pub(crate) fn ensure_alive(&self) -> Result<()> {
        if self.is_deleted() {
            Err(Error::AlreadyDeleted)
        } else {
            Ok(())
        }
    }

    pub(crate) fn set_listener(&self, listener: ListenerSlot<T>) {
        *self.listener.lock() = listener;
    }

    // ===================================================================
    // Writer side
    // ===================================================================

    /// Lock the reader for one delivery. The capacity check and the insert
    /// happen under the same lock.
    pub(crate) fn lock_delivery(&self) -> DeliveryGuard<'_, T> {
        DeliveryGuard {
            reader: self,
            state: self.state.lock(),
        }
    }

    /// Whether a write to `instance` must be refused with `WouldBlock`.
    #[cfg(test)]
    pub(crate) fn would_block(&self, instance: &InstanceHandle) -> bool {
        self.lock_delivery().would_block(instance)
    }

    /// Accept one change from a matched writer.
    pub(crate) fn deliver(&self, change: Change<T>) {
        self.lock_delivery().deliver(change);
    }

    /// Apply one change to the locked state. Returns the raised statuses
    /// and whether the dispatch timer must be rearmed.
    fn apply(&self, state: &mut ReaderState<T>, change: Change<T>) -> (StatusMask, bool) {
        let now = Instant::now();
        let filter = self.qos.time_based_filter;
        let mut raised = StatusMask::NONE;
        let mut reschedule = false;
        if state.liveliness.assert_writer(change.writer, now) {
            raised = raised | StatusMask::LIVELINESS_CHANGED;
            reschedule = true;
        }

        let admitted = match change.kind {
            ChangeKind::Write if !filter.is_disabled() => {
                let coalescer = state
                    .filters
                    .entry(change.instance)
                    .or_insert_with(|| TimeBasedFilterCoalescer::new(filter));
                match coalescer.offer(change, now) {
                    Admission::Deliver(change) => Some(change),
                    Admission::Held => {
                        reschedule = true;
                        None
                    }
                }
            }
            ChangeKind::Write => Some(change),
            ChangeKind::Dispose | ChangeKind::Unregister => {
                if let Some(coalescer) = state.filters.get_mut(&change.instance) {
                    coalescer.discard_pending();
                }
                Some(change)
            }
        };
        if let Some(change) = admitted {
            raised = raised | state.store(change);
        }
        (raised, reschedule)
    }

    /// Liveliness assertion without data (assert_liveliness, asserter).
    pub(crate) fn assert_writer(&self, writer: Guid) {
        let revived = self
            .state
            .lock()
            .liveliness
            .assert_writer(writer, Instant::now());
        if revived {
            self.publish(StatusMask::LIVELINESS_CHANGED);
            self.reschedule();
        }
    }

    // ===================================================================
    // Application side
    // ===================================================================

    /// Fill the loan buffer with up to `max` matching samples.
    ///
    /// `consume` selects take (remove) over read (mark READ).
    pub(crate) fn collect(
        &self,
        max: usize,
        masks: StateMasks,
        query: Option<&QueryParts>,
        consume: bool,
    ) -> Result<Option<SampleLoan<'_, T>>> {
        self.ensure_alive()?;
        let mut claim = self.loans.acquire()?;
        if max == 0 {
            return Ok(None);
        }
        {
            let buffer = claim.buffer();
            let limit = max.min(buffer.capacity());
            let mut state = self.state.lock();
            if consume {
                state
                    .cache
                    .take_into(limit, masks, query, |data, info| buffer.push(data, info));
                state.prune_filters();
            } else {
                state
                    .cache
                    .read_into(limit, masks, query, |data, info| buffer.push(data, info));
            }
        }
        self.status_condition.clear(StatusMask::DATA_AVAILABLE);
        Ok(claim.into_loan())
    }

    /// Take one not-yet-read sample, copied out of the cache.
    pub(crate) fn take_next(&self) -> Result<Option<(Option<T>, SampleInfo)>> {
        self.ensure_alive()?;
        let masks = StateMasks::new(
            SampleStateMask::NOT_READ,
            ViewStateMask::ANY,
            InstanceStateMask::ANY,
        );
        let mut out = None;
        {
            let mut state = self.state.lock();
            state
                .cache
                .take_into(1, masks, None, |data, info| out = Some((data, info)));
            state.prune_filters();
        }
        self.status_condition.clear(StatusMask::DATA_AVAILABLE);
        Ok(out)
    }

    // ===================================================================
    // Conditions
    // ===================================================================

    pub(crate) fn add_condition(&self, condition: ReadCondition) {
        self.conditions.lock().push(condition.clone());
        condition.refresh();
    }

    pub(crate) fn owns_condition(&self, condition: &ReadCondition) -> bool {
        self.conditions
            .lock()
            .iter()
            .any(|c| c.same_as(condition))
    }

    /// Drop a condition from the reader. Refused while a WaitSet holds it.
    pub(crate) fn remove_condition(&self, condition: &ReadCondition) -> Result<()> {
        if condition.hooks().is_attached() {
            return Err(Error::PreconditionNotMet(
                "condition still attached to a WaitSet".into(),
            ));
        }
        let mut conditions = self.conditions.lock();
        let Some(pos) = conditions.iter().position(|c| c.same_as(condition)) else {
            return Err(Error::BadParameter(
                "condition was not created by this reader".into(),
            ));
        };
        conditions.remove(pos).mark_deleted();
        Ok(())
    }

    /// Invalidate every condition, attached or not.
    pub(crate) fn drop_conditions(&self) {
        let conditions: Vec<ReadCondition> = self.conditions.lock().drain(..).collect();
        for condition in conditions {
            condition.mark_deleted();
        }
    }

    pub(crate) fn condition_count(&self) -> usize {
        self.conditions.lock().len()
    }

    // ===================================================================
    // Statuses
    // ===================================================================

    pub(crate) fn liveliness_changed_status(&self) -> LivelinessChangedStatus {
        let status = self.state.lock().liveliness.take_status();
        self.status_condition.clear(StatusMask::LIVELINESS_CHANGED);
        status
    }

    pub(crate) fn subscription_matched_status(&self) -> SubscriptionMatchedStatus {
        let status = {
            let mut state = self.state.lock();
            let snapshot = state.subscription_matched;
            state.subscription_matched.total_count_change = 0;
            state.subscription_matched.current_count_change = 0;
            snapshot
        };
        self.status_condition.clear(StatusMask::SUBSCRIPTION_MATCHED);
        status
    }

    pub(crate) fn requested_incompatible_qos_status(&self) -> RequestedIncompatibleQosStatus {
        let status = {
            let mut state = self.state.lock();
            let snapshot = state.requested_incompatible;
            state.requested_incompatible.total_count_change = 0;
            snapshot
        };
        self.status_condition
            .clear(StatusMask::REQUESTED_INCOMPATIBLE_QOS);
        status
    }

    pub(crate) fn sample_rejected_status(&self) -> SampleRejectedStatus {
        let status = {
            let mut state = self.state.lock();
            let snapshot = state.sample_rejected;
            state.sample_rejected.total_count_change = 0;
            snapshot
        };
        self.status_condition.clear(StatusMask::SAMPLE_REJECTED);
        status
    }

    pub(crate) fn matched_writer_count(&self) -> usize {
        self.state.lock().liveliness.matched_count()
    }

    #[cfg(test)]
    pub(crate) fn filter_count(&self) -> usize {
        self.state.lock().filters.len()
    }

    // ===================================================================
    // Teardown
    // ===================================================================

    /// Stop the reader: unmatch, invalidate conditions, stop dispatching.
    ///
    /// Returns `AlreadyDeleted` on the second call.
    pub(crate) fn teardown(&self) -> Result<()> {
        if self.deleted.swap(true, Ordering::AcqRel) {
            return Err(Error::AlreadyDeleted);
        }
        self.drop_conditions();
        // Dropping the token unmatches every writer.
        drop(self.binding.lock().take());
        *self.listener.lock() = None;
        if let Some(dispatcher) = self.dispatcher.get() {
            dispatcher.shutdown();
        }
        log::debug!("[reader] {} deleted", self.guid);
        Ok(())
    }

    // ===================================================================
    // Notification plumbing
    // ===================================================================

    /// Fan raised statuses out to the status condition, read conditions
    /// and the listener.
    fn publish(&self, raised: StatusMask) {
        if raised.is_empty() {
            return;
        }
        self.status_condition.raise(raised);
        if raised.contains(StatusMask::DATA_AVAILABLE) {
            let conditions: Vec<ReadCondition> = self.conditions.lock().clone();
            for condition in conditions {
                condition.refresh();
            }
        }
        let listen = self
            .listener
            .lock()
            .as_ref()
            .map_or(StatusMask::NONE, |(_, mask)| *mask & raised);
        if !listen.is_empty() {
            if let Some(dispatcher) = self.dispatcher.get() {
                dispatcher.notify(listen);
            }
        }
    }

    fn reschedule(&self) {
        if let Some(dispatcher) = self.dispatcher.get() {
            dispatcher.reschedule();
        }
    }
}

/// A reader locked by a writer for one delivery.
pub(crate) struct DeliveryGuard<'a, T: DDS> {
    reader: &'a ReaderInner<T>,
    state: MutexGuard<'a, ReaderState<T>>,
}

impl<T: DDS> DeliveryGuard<'_, T> {
    /// Whether a data sample for `instance` must be refused with `WouldBlock`.
    pub(crate) fn would_block(&self, instance: &InstanceHandle) -> bool {
        !self.reader.is_deleted()
            && self.reader.qos.reliability == Reliability::Reliable
            && self.state.cache.would_reject(instance)
    }

    /// Insert the change, release the lock, then notify.
    pub(crate) fn deliver(self, change: Change<T>) {
        let DeliveryGuard { reader, mut state } = self;
        if reader.is_deleted() {
            return;
        }
        let (raised, reschedule) = reader.apply(&mut state, change);
        drop(state);
        reader.publish(raised);
        if reschedule {
            reader.reschedule();
        }
    }
}

impl<T: DDS> ReaderProbe for ReaderInner<T> {
    fn has_matching(&self, masks: StateMasks, query: Option<&QueryParts>) -> bool {
        !self.is_deleted() && self.state.lock().cache.has_matching(masks, query)
    }
}

impl<T: DDS> DispatchTarget for ReaderInner<T> {
    fn on_status(self: &Arc<Self>, mask: StatusMask) {
        let Some((listener, enabled)) = self.listener.lock().clone() else {
            return;
        };
        let mask = mask & enabled;
        let reader = DataReader::from_inner(Arc::clone(self));

        if mask.contains(StatusMask::SUBSCRIPTION_MATCHED) {
            listener.on_subscription_matched(&reader, self.subscription_matched_status());
        }
        if mask.contains(StatusMask::REQUESTED_INCOMPATIBLE_QOS) {
            listener.on_requested_incompatible_qos(
                &reader,
                self.requested_incompatible_qos_status(),
            );
        }
        if mask.contains(StatusMask::LIVELINESS_CHANGED) {
            listener.on_liveliness_changed(&reader, self.liveliness_changed_status());
        }
        if mask.contains(StatusMask::SAMPLE_REJECTED) {
            listener.on_sample_rejected(&reader, self.sample_rejected_status());
        }
        if mask.contains(StatusMask::DATA_AVAILABLE) && !self.is_deleted() {
            listener.on_data_available(&reader);
        }
    }

    fn on_timer(&self, now: Instant) -> Option<Instant> {
        if self.is_deleted() {
            return None;
        }
        let mut raised = StatusMask::NONE;
        let next = {
            let mut state = self.state.lock();
            let expired = state.liveliness.check(now);
            if !expired.is_empty() {
                raised = raised | StatusMask::LIVELINESS_CHANGED;
            }
            for writer in expired {
                raised = raised | state.release_writer(writer);
            }

            raised = raised | state.flush_filters(now);
            state.next_timer()
        };
        self.publish(raised);
        next
    }
}

impl<T: DDS> EndpointLink for ReaderInner<T> {
    fn peer_matched(&self, writer: &EndpointInfo) {
        {
            let mut state = self.state.lock();
            state
                .liveliness
                .add_writer(writer.guid, &writer.qos.liveliness, Instant::now());
            let status = &mut state.subscription_matched;
            status.total_count += 1;
            status.total_count_change += 1;
            status.current_count += 1;
            status.current_count_change += 1;
            status.last_publication_handle = InstanceHandle::from_guid(writer.guid);
        }
        log::debug!("[reader] {} matched writer {}", self.guid, writer.guid);
        self.publish(StatusMask::SUBSCRIPTION_MATCHED | StatusMask::LIVELINESS_CHANGED);
        self.reschedule();
    }

    fn peer_unmatched(&self, writer: Guid) {
        let mut raised = StatusMask::SUBSCRIPTION_MATCHED;
        {
            let mut state = self.state.lock();
            if state.liveliness.remove_writer(writer) {
                raised = raised | StatusMask::LIVELINESS_CHANGED;
            }
            raised = raised | state.release_writer(writer);
            let status = &mut state.subscription_matched;
            status.current_count = status.current_count.saturating_sub(1);
            status.current_count_change -= 1;
            status.last_publication_handle = InstanceHandle::from_guid(writer);
        }
        log::debug!("[reader] {} unmatched writer {}", self.guid, writer);
        self.publish(raised);
    }

    fn incompatible_peer(&self, writer: Guid, policy: QosPolicyId) {
        {
            let mut state = self.state.lock();
            let status = &mut state.requested_incompatible;
            status.total_count += 1;
            status.total_count_change += 1;
            status.last_policy_id = policy;
        }
        log::warn!(
            "[reader] {} requested QoS incompatible with writer {} ({:?})",
            self.guid,
            writer,
            policy
        );
        self.publish(StatusMask::REQUESTED_INCOMPATIBLE_QOS);
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}
