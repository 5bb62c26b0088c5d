// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! DDS Publisher entity - creates and manages DataWriter instances
//!
//! Publisher and Subscriber mirror each other on purpose: same default-QoS
//! handling, same overlay, same child bookkeeping. Keeping them separate
//! keeps writers and readers from being mixed up at the type level.

use super::domain_registry::{EndpointKind, EndpointLink, EndpointQos, LocalEndpointEntry};
use super::listener::DataWriterListener;
use super::participant::context::{ChildEndpoint, ParticipantContext};
use super::qos::{DataWriterQos, PublisherQos, QosRecord, TopicQos};
use super::writer::endpoint::{LivelinessSource, WriterInner};
use super::{DataWriter, Error, InstanceHandle, Result, StatusMask, Topic, DDS};
use crate::core::{EntityKind, Guid};
use parking_lot::Mutex;
use std::any::TypeId as RustTypeId;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

pub(crate) struct PublisherInner {
    guid: Guid,
    qos: PublisherQos,
    ctx: Arc<ParticipantContext>,
    default_writer_qos: Mutex<DataWriterQos>,
    writers: Mutex<Vec<ChildEndpoint>>,
    deleted: AtomicBool,
}

/// DDS Publisher - intermediate entity between Participant and DataWriter
///
/// Its PARTITION applies to every writer it creates. Cheap to clone.
#[derive(Clone)]
pub struct Publisher {
    inner: Arc<PublisherInner>,
}

impl Publisher {
    pub(crate) fn new(ctx: Arc<ParticipantContext>, qos: PublisherQos) -> Self {
        Self {
            inner: Arc::new(PublisherInner {
                guid: ctx.next_guid(EntityKind::Publisher),
                qos,
                ctx,
                default_writer_qos: Mutex::new(DataWriterQos::default()),
                writers: Mutex::new(Vec::new()),
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
    pub fn get_qos(&self) -> PublisherQos {
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

    /// Default writer QoS, with the runtime `datawriter.*` overrides applied.
    pub fn get_default_datawriter_qos(&self) -> Result<DataWriterQos> {
        self.ensure_alive()?;
        self.inner.ctx.overlay(&self.inner.default_writer_qos)
    }

    pub fn set_default_datawriter_qos(&self, qos: &DataWriterQos) -> Result<()> {
        self.ensure_alive()?;
        qos.validate()?;
        *self.inner.default_writer_qos.lock() = qos.clone();
        Ok(())
    }

    /// Overwrite the topic-scope policies of `writer_qos` with the topic's.
    pub fn copy_from_topic_qos(
        &self,
        writer_qos: &mut DataWriterQos,
        topic_qos: &TopicQos,
    ) -> Result<()> {
        topic_qos.validate()?;
        writer_qos.copy_from_topic(topic_qos);
        Ok(())
    }

    // ===================================================================
    // Writers
    // ===================================================================

    /// Create a writer on `topic`. Matching readers of the domain are bound
    /// before this returns.
    pub fn create_datawriter<T: DDS>(
        &self,
        topic: &Topic<T>,
        qos: &DataWriterQos,
        listener: Option<Arc<dyn DataWriterListener<T>>>,
        mask: StatusMask,
    ) -> Result<DataWriter<T>> {
        self.ensure_alive()?;
        topic.ensure_alive()?;
        if !self.inner.ctx.owns(topic.inner().guid()) {
            return Err(Error::BadParameter(
                "topic belongs to another participant".into(),
            ));
        }
        qos.validate()?;

        let guid = self.inner.ctx.next_guid(EntityKind::Writer);
        let inner = WriterInner::<T>::new(
            guid,
            Arc::clone(topic.inner().name()),
            qos.clone(),
            listener.map(|l| (l, mask)),
        );

        let link: Arc<dyn EndpointLink> = inner.clone();
        let token = self.inner.ctx.register(
            topic.inner().match_key(),
            LocalEndpointEntry {
                guid,
                kind: EndpointKind::Writer,
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

        let source: Arc<dyn LivelinessSource> = inner.clone();
        let source: Weak<dyn LivelinessSource> = Arc::downgrade(&source);
        self.inner.ctx.track_writer(source);

        topic.inner().acquire();
        self.inner.writers.lock().push(ChildEndpoint {
            guid,
            topic: Arc::clone(topic.inner()),
            endpoint: inner.clone(),
        });

        log::debug!(
            "[publisher] writer {} created on '{}' ({} matched)",
            guid,
            topic.get_name(),
            inner.matched_reader_count()
        );
        Ok(DataWriter::from_inner(inner))
    }

    /// Delete a writer created by this publisher.
    pub fn delete_datawriter<T: DDS>(&self, writer: &DataWriter<T>) -> Result<()> {
        if writer.is_deleted() {
            return Err(Error::AlreadyDeleted);
        }
        let guid = writer.inner().guid();
        let child = {
            let mut writers = self.inner.writers.lock();
            let pos = writers.iter().position(|c| c.guid == guid).ok_or_else(|| {
                Error::BadParameter("writer not created by this publisher".into())
            })?;
            writers.remove(pos)
        };
        child.delete()
    }

    /// Delete every writer of this publisher.
    pub fn delete_contained_entities(&self) -> Result<()> {
        self.ensure_alive()?;
        self.drain_writers();
        Ok(())
    }

    fn drain_writers(&self) {
        let writers: Vec<ChildEndpoint> = self.inner.writers.lock().drain(..).collect();
        for child in writers {
            let guid = child.guid;
            if let Err(e) = child.delete() {
                log::debug!("[publisher] writer {} already gone: {}", guid, e);
            }
        }
    }

    pub(crate) fn has_children(&self) -> bool {
        !self.inner.writers.lock().is_empty()
    }

    pub(crate) fn same_as(&self, other: &Publisher) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Delete the writers and mark the publisher deleted.
    pub(crate) fn teardown(&self) {
        if !self.inner.deleted.swap(true, Ordering::AcqRel) {
            self.drain_writers();
        }
    }
}

impl fmt::Debug for Publisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("guid", &self.inner.guid)
            .field("partition", &self.inner.qos.partition)
            .field("writers", &self.inner.writers.lock().len())
            .finish()
    }
}
