// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::endpoint::ReaderInner;
use super::loan::{LoanBuffer, SampleInfoSeq, SampleLoan, SampleSeq};
use super::{InstanceHandle, SampleInfo};
use crate::dds::listener::{
    DataReaderListener, LivelinessChangedStatus, RequestedIncompatibleQosStatus,
    SampleRejectedStatus, SubscriptionMatchedStatus,
};
use crate::dds::qos::DataReaderQos;
use crate::dds::read_condition::{QueryCondition, ReadCondition, ReaderProbe, SampleCondition};
use crate::dds::{
    Error, InstanceStateMask, Result, SampleStateMask, StateMasks, StatusCondition, StatusMask,
    ViewStateMask, DDS,
};
use std::fmt;
use std::sync::{Arc, Weak};

/// Typed DDS DataReader.
///
/// Cheap to clone; all clones share one cache, one loan buffer and one
/// dispatch thread. Created by `Subscriber::create_datareader`, released by
/// `Subscriber::delete_datareader`.
pub struct DataReader<T: DDS> {
    inner: Arc<ReaderInner<T>>,
}

impl<T: DDS> Clone for DataReader<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: DDS> DataReader<T> {
    pub(crate) fn from_inner(inner: Arc<ReaderInner<T>>) -> Self {
        Self { inner }
    }

    pub(crate) fn inner(&self) -> &Arc<ReaderInner<T>> {
        &self.inner
    }

    fn probe(&self) -> Weak<dyn ReaderProbe> {
        let weak: Weak<ReaderInner<T>> = Arc::downgrade(&self.inner);
        weak
    }

    // ===================================================================
    // Sample access
    // ===================================================================

    /// Take up to `max_samples` samples matching the masks.
    ///
    /// Returns `Ok(None)` when nothing matches (no-data is not an error).
    /// The returned loan must be dropped (or `return_loan()`ed) before the
    /// next take or read on this reader, which otherwise fails with
    /// `PreconditionNotMet`.
    ///
    /// At most `min(max_samples, buffer capacity)` slots are filled.
    /// Lifecycle transitions appear as slots with `valid_data == false`.
    pub fn take(
        &self,
        max_samples: usize,
        sample_states: SampleStateMask,
        view_states: ViewStateMask,
        instance_states: InstanceStateMask,
    ) -> Result<Option<SampleLoan<'_, T>>> {
        let masks = StateMasks::new(sample_states, view_states, instance_states);
        self.inner.collect(max_samples, masks, None, true)
    }

    /// Like [`take`](Self::take) but leaves the samples in the cache and
    /// marks them READ.
    pub fn read(
        &self,
        max_samples: usize,
        sample_states: SampleStateMask,
        view_states: ViewStateMask,
        instance_states: InstanceStateMask,
    ) -> Result<Option<SampleLoan<'_, T>>> {
        let masks = StateMasks::new(sample_states, view_states, instance_states);
        self.inner.collect(max_samples, masks, None, false)
    }

    /// Take the oldest not-yet-read sample without going through the loan
    /// buffer.
    pub fn take_next_sample(&self) -> Result<Option<(Option<T>, SampleInfo)>> {
        self.inner.take_next()
    }

    /// Take samples selected by a ReadCondition or QueryCondition created
    /// by this reader.
    pub fn take_w_condition<C: SampleCondition>(
        &self,
        condition: &C,
        max_samples: usize,
    ) -> Result<Option<SampleLoan<'_, T>>> {
        let condition = self.check_condition(condition.read_condition())?;
        self.inner
            .collect(max_samples, condition.state_masks(), condition.query(), true)
    }

    /// Read samples selected by a ReadCondition or QueryCondition created
    /// by this reader.
    pub fn read_w_condition<C: SampleCondition>(
        &self,
        condition: &C,
        max_samples: usize,
    ) -> Result<Option<SampleLoan<'_, T>>> {
        let condition = self.check_condition(condition.read_condition())?;
        self.inner
            .collect(max_samples, condition.state_masks(), condition.query(), false)
    }

    fn check_condition<'c>(&self, condition: &'c ReadCondition) -> Result<&'c ReadCondition> {
        if condition.is_deleted() {
            return Err(Error::AlreadyDeleted);
        }
        if !self.inner.owns_condition(condition) {
            return Err(Error::BadParameter(
                "condition belongs to another reader".into(),
            ));
        }
        Ok(condition)
    }

    /// Replace the default loan buffer with caller-allocated sequences.
    ///
    /// Both sequences must have the same capacity. Allowed once, before the
    /// first take or read.
    pub fn install_sample_buffer(&self, samples: SampleSeq<T>, infos: SampleInfoSeq) -> Result<()> {
        self.inner.ensure_alive()?;
        let buffer = LoanBuffer::new(samples, infos)?;
        self.inner.loans().install(buffer)
    }

    /// Whether a loan from this reader is still outstanding.
    #[must_use]
    pub fn has_outstanding_loan(&self) -> bool {
        self.inner.loans().is_loaned()
    }

    // ===================================================================
    // Conditions
    // ===================================================================

    /// Create a ReadCondition triggered while a sample matches the masks.
    pub fn create_readcondition(
        &self,
        sample_states: SampleStateMask,
        view_states: ViewStateMask,
        instance_states: InstanceStateMask,
    ) -> Result<ReadCondition> {
        self.inner.ensure_alive()?;
        let masks = StateMasks::new(sample_states, view_states, instance_states);
        let condition = ReadCondition::new(masks, self.probe());
        self.inner.add_condition(condition.clone());
        Ok(condition)
    }

    /// Create a QueryCondition: a ReadCondition that additionally requires
    /// `predicate(sample, parameters)` to hold.
    ///
    /// `expression` is kept for introspection only.
    pub fn create_querycondition<F>(
        &self,
        sample_states: SampleStateMask,
        view_states: ViewStateMask,
        instance_states: InstanceStateMask,
        expression: &str,
        parameters: Vec<String>,
        predicate: F,
    ) -> Result<QueryCondition>
    where
        F: Fn(&T, &[String]) -> bool + Send + Sync + 'static,
    {
        self.inner.ensure_alive()?;
        let masks = StateMasks::new(sample_states, view_states, instance_states);
        let condition = QueryCondition::new(
            masks,
            self.probe(),
            expression.to_string(),
            parameters,
            predicate,
        );
        self.inner.add_condition(condition.as_read_condition().clone());
        Ok(condition)
    }

    /// Delete a condition created by this reader.
    ///
    /// Fails with `PreconditionNotMet` while the condition is attached to a
    /// WaitSet: detach it first.
    pub fn delete_readcondition<C: SampleCondition>(&self, condition: &C) -> Result<()> {
        let condition = condition.read_condition();
        if condition.is_deleted() {
            return Err(Error::AlreadyDeleted);
        }
        self.inner.remove_condition(condition)
    }

    /// Delete every condition still owned by the reader, attached or not.
    pub fn delete_contained_entities(&self) -> Result<()> {
        self.inner.ensure_alive()?;
        self.inner.drop_conditions();
        Ok(())
    }

    // ===================================================================
    // Statuses
    // ===================================================================

    /// Read the liveliness status; resets its change counters.
    pub fn get_liveliness_changed_status(&self) -> Result<LivelinessChangedStatus> {
        self.inner.ensure_alive()?;
        Ok(self.inner.liveliness_changed_status())
    }

    pub fn get_subscription_matched_status(&self) -> Result<SubscriptionMatchedStatus> {
        self.inner.ensure_alive()?;
        Ok(self.inner.subscription_matched_status())
    }

    pub fn get_requested_incompatible_qos_status(&self) -> Result<RequestedIncompatibleQosStatus> {
        self.inner.ensure_alive()?;
        Ok(self.inner.requested_incompatible_qos_status())
    }

    pub fn get_sample_rejected_status(&self) -> Result<SampleRejectedStatus> {
        self.inner.ensure_alive()?;
        Ok(self.inner.sample_rejected_status())
    }

    /// Status condition of this reader (shared, not a copy).
    #[must_use]
    pub fn get_status_condition(&self) -> StatusCondition {
        self.inner.status_condition().clone()
    }

    /// Replace the listener and its status mask.
    ///
    /// `None` (or an empty mask) silences callbacks; conditions keep working.
    pub fn set_listener(
        &self,
        listener: Option<Arc<dyn DataReaderListener<T>>>,
        mask: StatusMask,
    ) -> Result<()> {
        self.inner.ensure_alive()?;
        self.inner.set_listener(listener.map(|l| (l, mask)));
        Ok(())
    }

    // ===================================================================
    // Introspection
    // ===================================================================

    #[must_use]
    pub fn get_qos(&self) -> DataReaderQos {
        self.inner.qos().clone()
    }

    #[must_use]
    pub fn get_topic_name(&self) -> &str {
        self.inner.topic_name()
    }

    #[must_use]
    pub fn get_instance_handle(&self) -> InstanceHandle {
        InstanceHandle::from_guid(self.inner.guid())
    }

    /// Number of writers currently matched.
    #[must_use]
    pub fn matched_publication_count(&self) -> usize {
        self.inner.matched_writer_count()
    }

    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.inner.is_deleted()
    }
}

impl<T: DDS> fmt::Debug for DataReader<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataReader")
            .field("guid", &self.inner.guid())
            .field("topic", &self.inner.topic_name())
            .field("type", &T::type_name())
            .field("conditions", &self.inner.condition_count())
            .finish()
    }
}
