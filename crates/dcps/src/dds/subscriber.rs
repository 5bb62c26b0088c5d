// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! DDS Subscriber entity - creates and manages DataReader instances
//!
//! Mirror of [`Publisher`](super::Publisher) for the reading side.

use super::domain_registry::{EndpointKind, EndpointLink, EndpointQos, LocalEndpointEntry};
use super::listener::DataReaderListener;
use super::participant::context::{ChildEndpoint, ParticipantContext};
use super::qos::{DataReaderQos, QosRecord, SubscriberQos, TopicQos};
use super::reader::endpoint::ReaderInner;
use super::{DataReader, Error, InstanceHandle, Result, StatusMask, Topic, DDS};
use crate::config::DEFAULT_SAMPLE_BUFFER_CAPACITY;
use crate::core::{EntityKind, Guid};
use parking_lot::Mutex;
use std::any::TypeId as RustTypeId;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub(crate) struct SubscriberInner {
    guid: Guid,
    qos: SubscriberQos,
    ctx: Arc<ParticipantContext>,
    default_reader_qos: Mutex<DataReaderQos>,
    readers: Mutex<Vec<ChildEndpoint>>,
    deleted: AtomicBool,
}

/// DDS Subscriber - intermediate entity between Participant and DataReader
///
/// Its PARTITION applies to every reader it creates. Cheap to clone.
#[derive(Clone)]
pub struct Subscriber {
    inner: Arc<SubscriberInner>,
}

impl Subscriber {
    pub(crate) fn new(ctx: Arc<ParticipantContext>, qos: SubscriberQos) -> Self {
        Self {
            inner: Arc::new(SubscriberInner {
                guid: ctx.next_guid(EntityKind::Subscriber),
                qos,
                ctx,
                default_reader_qos: Mutex::new(DataReaderQos::default()),
                readers: Mutex::new(Vec::new()),
                deleted: AtomicBool::new(false),
            }),
        }
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.inner.deleted.load(Ordering::Acquire) {
            Err(Error::AlreadyDeleted)
        } else {
            Ok(())
        }
    }

    #[must_use]
    pub fn get_qos(&self) -> SubscriberQos {
        self.inner.qos.clone()
    }

    #[must_use]
    pub fn get_instance_handle(&self) -> InstanceHandle {
        InstanceHandle::from_guid(self.inner.guid)
    }

    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.inner.deleted.load(Ordering::Acquire)
    }

    // ===================================================================
    // Default QoS
    // ===================================================================

    /// Default reader QoS, with the runtime `datareader.*` overrides applied.
    pub fn get_default_datareader_qos(&self) -> Result<DataReaderQos> {
        self.ensure_alive()?;
        self.inner.ctx.overlay(&self.inner.default_reader_qos)
    }

    pub fn set_default_datareader_qos(&self, qos: &DataReaderQos) -> Result<()> {
        self.ensure_alive()?;
        qos.validate()?;
        *self.inner.default_reader_qos.lock() = qos.clone();
        Ok(())
    }

    /// Overwrite the topic-scope policies of `reader_qos` with the topic's.
    ///
    /// TIME_BASED_FILTER is reader-only and left untouched.
    pub fn copy_from_topic_qos(
        &self,
        reader_qos: &mut DataReaderQos,
        topic_qos: &TopicQos,
    ) -> Result<()> {
        topic_qos.validate()?;
        reader_qos.copy_from_topic(topic_qos);
        Ok(())
    }

    // ===================================================================
    // Readers
    // ===================================================================

    /// Create a reader on `topic` and start its dispatch thread.
    ///
    /// Matching writers of the domain are bound before this returns;
    /// TRANSIENT_LOCAL writers have replayed their history by then.
    pub fn create_datareader<T: DDS>(
        &self,
        topic: &Topic<T>,
        qos: &DataReaderQos,
        listener: Option<Arc<dyn DataReaderListener<T>>>,
        mask: StatusMask,
    ) -> Result<DataReader<T>> {
        self.ensure_alive()?;
        topic.ensure_alive()?;
        if !self.inner.ctx.owns(topic.inner().guid()) {
            return Err(Error::BadParameter(
                "topic belongs to another participant".into(),
            ));
        }
        qos.validate()?;

        let guid = self.inner.ctx.next_guid(EntityKind::Reader);
        let inner = ReaderInner::<T>::spawn(
            guid,
            Arc::clone(topic.inner().name()),
            qos.clone(),
            DEFAULT_SAMPLE_BUFFER_CAPACITY,
            listener.map(|l| (l, mask)),
        )?;

        let link: Arc<dyn EndpointLink> = inner.clone();
        let token = self.inner.ctx.register(
            topic.inner().match_key(),
            LocalEndpointEntry {
                guid,
                kind: EndpointKind::Reader,
                qos: EndpointQos {
                    reliability: qos.reliability,
                    durability: qos.durability,
                    liveliness: qos.liveliness,
                    partition: self.inner.qos.partition.clone(),
                },
                sample_type: RustTypeId::of::<T>(),
                link: Arc::downgrade(&link),
            },
        );
        inner.bind(token);

        topic.inner().acquire();
        self.inner.readers.lock().push(ChildEndpoint {
            guid,
            topic: Arc::clone(topic.inner()),
            endpoint: inner.clone(),
        });

        log::debug!(
            "[subscriber] reader {} created on '{}' ({} matched)",
            guid,
            topic.get_name(),
            inner.matched_writer_count()
        );
        Ok(DataReader::from_inner(inner))
    }

    /// Delete a reader created by this subscriber.
    ///
    /// Fails with `PreconditionNotMet` while the reader still owns read
    /// conditions or a loan is outstanding.
    pub fn delete_datareader<T: DDS>(&self, reader: &DataReader<T>) -> Result<()> {
        if reader.is_deleted() {
            return Err(Error::AlreadyDeleted);
        }
        let guid = reader.inner().guid();
        let mut readers = self.inner.readers.lock();
        let pos = readers.iter().position(|c| c.guid == guid).ok_or_else(|| {
            Error::BadParameter("reader not created by this subscriber".into())
        })?;
        if reader.inner().condition_count() > 0 {
            return Err(Error::PreconditionNotMet(
                "reader still owns read conditions".into(),
            ));
        }
        if reader.has_outstanding_loan() {
            return Err(Error::PreconditionNotMet(
                "reader has an outstanding loan".into(),
            ));
        }
        let child = readers.remove(pos);
        drop(readers);
        child.delete()
    }

    /// Delete every reader of this subscriber, together with their
    /// conditions.
    pub fn delete_contained_entities(&self) -> Result<()> {
        self.ensure_alive()?;
        self.drain_readers();
        Ok(())
    }

    fn drain_readers(&self) {
        let readers: Vec<ChildEndpoint> = self.inner.readers.lock().drain(..).collect();
        for child in readers {
            let guid = child.guid;
            if let Err(e) = child.delete() {
                log::debug!("[subscriber] reader {} already gone: {}", guid, e);
            }
        }
    }

    pub(crate) fn has_children(&self) -> bool {
        !self.inner.readers.lock().is_empty()
    }

    pub(crate) fn same_as(&self, other: &Subscriber) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Delete the readers and mark the subscriber deleted.
    pub(crate) fn teardown(&self) {
        if !self.inner.deleted.swap(true, Ordering::AcqRel) {
            self.drain_readers();
        }
    }
}

impl fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("guid", &self.inner.guid)
            .field("partition", &self.inner.qos.partition)
            .field("readers", &self.inner.readers.lock().len())
            .finish()
    }
}
