// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::endpoint::WriterInner;
use crate::dds::listener::{
    DataWriterListener, OfferedIncompatibleQosStatus, PublicationMatchedStatus,
};
use crate::dds::qos::DataWriterQos;
use crate::dds::reader::ChangeKind;
use crate::dds::{InstanceHandle, Result, StatusCondition, StatusMask, DDS};
use std::fmt;
use std::sync::Arc;

/// Typed DDS DataWriter.
///
/// Cheap to clone. Created by `Publisher::create_datawriter`, released by
/// `Publisher::delete_datawriter`.
pub struct DataWriter<T: DDS> {
    inner: Arc<WriterInner<T>>,
}

impl<T: DDS> Clone for DataWriter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: DDS> DataWriter<T> {
    pub(crate) fn from_inner(inner: Arc<WriterInner<T>>) -> Self {
        Self { inner }
    }

    pub(crate) fn inner(&self) -> &Arc<WriterInner<T>> {
        &self.inner
    }

    /// Publish a sample to every matched reader.
    ///
    /// Fails with `WouldBlock` (transient) when a matched RELIABLE reader
    /// has no room for it; no reader receives the sample in that case.
    /// With no matched reader the call succeeds and the sample is only kept
    /// for late joiners if DURABILITY is TRANSIENT_LOCAL.
    ///
    /// A write also asserts the writer's liveliness.
    pub fn write(&self, sample: &T) -> Result<()> {
        self.inner.write(sample)
    }

    /// Mark the instance of `key_holder` NOT_ALIVE_DISPOSED on every
    /// matched reader.
    pub fn dispose(&self, key_holder: &T) -> Result<()> {
        self.inner.lifecycle(ChangeKind::Dispose, key_holder)
    }

    /// Withdraw this writer from the instance of `key_holder`.
    pub fn unregister_instance(&self, key_holder: &T) -> Result<()> {
        self.inner.lifecycle(ChangeKind::Unregister, key_holder)
    }

    /// Manually assert liveliness towards every matched reader.
    ///
    /// AUTOMATIC writers do not need this: their participant asserts them.
    pub fn assert_liveliness(&self) -> Result<()> {
        self.inner.ensure_alive()?;
        self.inner.assert_matched();
        Ok(())
    }

    pub fn get_publication_matched_status(&self) -> Result<PublicationMatchedStatus> {
        self.inner.ensure_alive()?;
        Ok(self.inner.publication_matched_status())
    }

    pub fn get_offered_incompatible_qos_status(&self) -> Result<OfferedIncompatibleQosStatus> {
        self.inner.ensure_alive()?;
        Ok(self.inner.offered_incompatible_qos_status())
    }

    #[must_use]
    pub fn get_status_condition(&self) -> StatusCondition {
        self.inner.status_condition().clone()
    }

    /// Replace the listener. Writer callbacks run on the thread that caused
    /// the event.
    pub fn set_listener(
        &self,
        listener: Option<Arc<dyn DataWriterListener<T>>>,
        mask: StatusMask,
    ) -> Result<()> {
        self.inner.ensure_alive()?;
        self.inner.set_listener(listener.map(|l| (l, mask)));
        Ok(())
    }

    #[must_use]
    pub fn get_qos(&self) -> DataWriterQos {
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

    /// Number of readers currently matched.
    #[must_use]
    pub fn matched_subscription_count(&self) -> usize {
        self.inner.matched_reader_count()
    }

    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.inner.is_deleted()
    }
}

impl<T: DDS> fmt::Debug for DataWriter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataWriter")
            .field("guid", &self.inner.guid())
            .field("topic", &self.inner.topic_name())
            .field("type", &T::type_name())
            .finish()
    }
}
