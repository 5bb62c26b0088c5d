// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shared writer state: matched readers, TRANSIENT_LOCAL history and the
//! writer-side statuses.
//!
//! Writer listeners run inline, on the thread that caused the event
//! (endpoint creation or deletion).

use super::runtime::DataWriter;
use crate::core::Guid;
use crate::dds::domain_registry::{BindToken, EndpointInfo, EndpointLink};
use crate::dds::listener::{
    DataWriterListener, OfferedIncompatibleQosStatus, PublicationMatchedStatus, QosPolicyId,
};
use crate::dds::qos::DataWriterQos;
use crate::dds::reader::endpoint::ReaderInner;
use crate::dds::reader::{Change, ChangeKind};
use crate::dds::{Error, InstanceHandle, Result, StatusCondition, StatusMask, DDS};
use crate::qos::liveliness::Liveliness;
use crate::qos::{Durability, History};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

pub(crate) type WriterListenerSlot<T> = Option<(Arc<dyn DataWriterListener<T>>, StatusMask)>;

/// Type-erased view of a writer used by the participant's liveliness
/// asserter.
pub(crate) trait LivelinessSource: Send + Sync {
    fn liveliness(&self) -> Liveliness;

    fn assert_liveliness(&self);
}

struct MatchedReader<T: DDS> {
    guid: Guid,
    reader: Weak<ReaderInner<T>>,
}

#[derive(Default)]
struct WriterStatus {
    publication_matched: PublicationMatchedStatus,
    offered_incompatible: OfferedIncompatibleQosStatus,
}

pub(crate) struct WriterInner<T: DDS> {
    guid: Guid,
    topic_name: Arc<str>,
    qos: DataWriterQos,
    me: Weak<WriterInner<T>>,
    readers: Mutex<Vec<MatchedReader<T>>>,
    history: Mutex<VecDeque<Change<T>>>,
    status: Mutex<WriterStatus>,
    status_condition: StatusCondition,
    listener: Mutex<WriterListenerSlot<T>>,
    binding: Mutex<Option<BindToken>>,
    deleted: AtomicBool,
}

impl<T: DDS> WriterInner<T> {
    pub(crate) fn new(
        guid: Guid,
        topic_name: Arc<str>,
        qos: DataWriterQos,
        listener: WriterListenerSlot<T>,
    ) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            guid,
            topic_name,
            qos,
            me: me.clone(),
            readers: Mutex::new(Vec::new()),
            history: Mutex::new(VecDeque::new()),
            status: Mutex::new(WriterStatus::default()),
            status_condition: StatusCondition::new(),
            listener: Mutex::new(listener),
            binding: Mutex::new(None),
            deleted: AtomicBool::new(false),
        })
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

    pub(crate) fn qos(&self) -> &DataWriterQos {
        &self.qos
    }

    pub(crate) fn status_condition(&self) -> &StatusCondition {
        &self.status_condition
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

    pub(crate) fn set_listener(&self, listener: WriterListenerSlot<T>) {
        *self.listener.lock() = listener;
    }

    fn live_readers(&self) -> Vec<Arc<ReaderInner<T>>> {
        self.readers
            .lock()
            .iter()
            .filter_map(|m| m.reader.upgrade())
            .collect()
    }

    pub(crate) fn matched_reader_count(&self) -> usize {
        self.readers.lock().len()
    }

    // ===================================================================
    // Data path
    // ===================================================================

    /// Deliver a sample to every matched reader.
    ///
    /// All-or-nothing: if one RELIABLE reader cannot accept the sample,
    /// nobody gets it and the caller sees `WouldBlock`. Every matched reader
    /// stays locked from the capacity check to the insert; locks are taken
    /// in reader GUID order.
    pub(crate) fn write(&self, sample: &T) -> Result<()> {
        self.ensure_alive()?;
        let instance = InstanceHandle::new(sample.compute_key());
        let mut readers = self.live_readers();
        readers.sort_by_key(|r| r.guid());
        let guards: Vec<_> = readers.iter().map(|r| r.lock_delivery()).collect();
        if guards.iter().any(|g| g.would_block(&instance)) {
            log::debug!("[writer] {} blocked by a full reliable reader", self.guid);
            return Err(Error::WouldBlock);
        }
        let change = Change::write(sample.clone(), instance, self.guid);
        self.remember(&change);
        for guard in guards {
            guard.deliver(change.clone());
        }
        Ok(())
    }

    /// Deliver an instance lifecycle change (dispose / unregister).
    pub(crate) fn lifecycle(&self, kind: ChangeKind, sample: &T) -> Result<()> {
        self.ensure_alive()?;
        let instance = InstanceHandle::new(sample.compute_key());
        let change = Change::lifecycle(kind, instance, self.guid);
        self.remember(&change);
        for reader in self.live_readers() {
            reader.deliver(change.clone());
        }
        Ok(())
    }

    /// Keep the change for late-joining TRANSIENT_LOCAL readers.
    fn remember(&self, change: &Change<T>) {
        if self.qos.durability != Durability::TransientLocal {
            return;
        }
        let mut history = self.history.lock();
        history.push_back(change.clone());
        match self.qos.history {
            History::KeepLast(depth) => {
                let in_instance = history
                    .iter()
                    .filter(|c| c.instance == change.instance)
                    .count();
                if in_instance > depth as usize {
                    if let Some(pos) = history.iter().position(|c| c.instance == change.instance) {
                        history.remove(pos);
                    }
                }
            }
            History::KeepAll => {
                while history.len() > self.qos.resource_limits.max_samples {
                    history.pop_front();
                }
            }
        }
    }

    /// Assert liveliness towards every matched reader.
    pub(crate) fn assert_matched(&self) {
        for reader in self.live_readers() {
            reader.assert_writer(self.guid);
        }
    }

    // ===================================================================
    // Statuses
    // ===================================================================

    pub(crate) fn publication_matched_status(&self) -> PublicationMatchedStatus {
        let status = {
            let mut status = self.status.lock();
            let snapshot = status.publication_matched;
            status.publication_matched.total_count_change = 0;
            status.publication_matched.current_count_change = 0;
            snapshot
        };
        self.status_condition.clear(StatusMask::PUBLICATION_MATCHED);
        status
    }

    pub(crate) fn offered_incompatible_qos_status(&self) -> OfferedIncompatibleQosStatus {
        let status = {
            let mut status = self.status.lock();
            let snapshot = status.offered_incompatible;
            status.offered_incompatible.total_count_change = 0;
            snapshot
        };
        self.status_condition
            .clear(StatusMask::OFFERED_INCOMPATIBLE_QOS);
        status
    }

    /// Raise `raised` and run the listener inline if it wants it.
    fn publish(&self, raised: StatusMask) {
        self.status_condition.raise(raised);
        let Some((listener, mask)) = self.listener.lock().clone() else {
            return;
        };
        let wanted = mask & raised;
        if wanted.is_empty() {
            return;
        }
        let Some(me) = self.me.upgrade() else {
            return;
        };
        let writer = DataWriter::from_inner(me);
        if wanted.contains(StatusMask::PUBLICATION_MATCHED) {
            listener.on_publication_matched(&writer, self.publication_matched_status());
        }
        if wanted.contains(StatusMask::OFFERED_INCOMPATIBLE_QOS) {
            listener.on_offered_incompatible_qos(&writer, self.offered_incompatible_qos_status());
        }
    }

    // ===================================================================
    // Teardown
    // ===================================================================

    pub(crate) fn teardown(&self) -> Result<()> {
        if self.deleted.swap(true, Ordering::AcqRel) {
            return Err(Error::AlreadyDeleted);
        }
        *self.listener.lock() = None;
        // Dropping the token unmatches every reader; their instances
        // written only by us lose their writer.
        drop(self.binding.lock().take());
        self.readers.lock().clear();
        self.history.lock().clear();
        log::debug!("[writer] {} deleted", self.guid);
        Ok(())
    }
}

impl<T: DDS> EndpointLink for WriterInner<T> {
    fn peer_matched(&self, reader: &EndpointInfo) {
        let Ok(typed) = Arc::clone(&reader.link)
            .into_any()
            .downcast::<ReaderInner<T>>()
        else {
            log::warn!(
                "[writer] {} cannot bind reader {}: sample type differs",
                self.guid,
                reader.guid
            );
            return;
        };

        self.readers.lock().push(MatchedReader {
            guid: reader.guid,
            reader: Arc::downgrade(&typed),
        });
        {
            let mut status = self.status.lock();
            let matched = &mut status.publication_matched;
            matched.total_count += 1;
            matched.total_count_change += 1;
            matched.current_count += 1;
            matched.current_count_change += 1;
            matched.last_subscription_handle = InstanceHandle::from_guid(reader.guid);
        }

        if self.qos.durability == Durability::TransientLocal
            && reader.qos.durability == Durability::TransientLocal
        {
            let replay: Vec<Change<T>> = self.history.lock().iter().cloned().collect();
            log::debug!(
                "[writer] {} replaying {} samples to {}",
                self.guid,
                replay.len(),
                reader.guid
            );
            for change in replay {
                typed.deliver(change);
            }
        }

        self.publish(StatusMask::PUBLICATION_MATCHED);
    }

    fn peer_unmatched(&self, reader: Guid) {
        {
            let mut readers = self.readers.lock();
            let before = readers.len();
            readers.retain(|m| m.guid != reader);
            if readers.len() == before {
                return;
            }
        }
        {
            let mut status = self.status.lock();
            let matched = &mut status.publication_matched;
            matched.current_count = matched.current_count.saturating_sub(1);
            matched.current_count_change -= 1;
            matched.last_subscription_handle = InstanceHandle::from_guid(reader);
        }
        self.publish(StatusMask::PUBLICATION_MATCHED);
    }

    fn incompatible_peer(&self, reader: Guid, policy: QosPolicyId) {
        {
            let mut status = self.status.lock();
            let offered = &mut status.offered_incompatible;
            offered.total_count += 1;
            offered.total_count_change += 1;
            offered.last_policy_id = policy;
        }
        log::warn!(
            "[writer] {} offered QoS incompatible with reader {} ({:?})",
            self.guid,
            reader,
            policy
        );
        self.publish(StatusMask::OFFERED_INCOMPATIBLE_QOS);
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl<T: DDS> LivelinessSource for WriterInner<T> {
    fn liveliness(&self) -> Liveliness {
        self.qos.liveliness
    }

    fn assert_liveliness(&self) {
        if !self.is_deleted() {
            self.assert_matched();
        }
    }
}
