// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::asserter;
use super::context::ParticipantContext;
use crate::config::RuntimeConfig;
use crate::core::EntityKind;
use crate::dds::domain_registry::DomainId;
use crate::dds::qos::{DomainParticipantQos, PublisherQos, QosRecord, SubscriberQos, TopicQos};
use crate::dds::topic::TopicInner;
use crate::dds::{Error, InstanceHandle, Publisher, Result, Subscriber, Topic, DDS};
use crate::qos::liveliness::LivelinessKind;
use parking_lot::Mutex;
use std::any::TypeId as RustTypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

struct ParticipantInner {
    ctx: Arc<ParticipantContext>,
    qos: DomainParticipantQos,
    types: Mutex<HashMap<String, RustTypeId>>,
    topics: Mutex<Vec<Arc<TopicInner>>>,
    publishers: Mutex<Vec<Publisher>>,
    subscribers: Mutex<Vec<Subscriber>>,
    default_topic_qos: Mutex<TopicQos>,
    default_publisher_qos: Mutex<PublisherQos>,
    default_subscriber_qos: Mutex<SubscriberQos>,
    asserter: Mutex<Option<JoinHandle<()>>>,
    deleted: AtomicBool,
}

impl Drop for ParticipantInner {
    fn drop(&mut self) {
        self.ctx.stop_asserter();
    }
}

/// DDS DomainParticipant: root of the entity graph of one domain.
///
/// Created by [`DomainParticipantFactory::create_participant`](super::DomainParticipantFactory::create_participant).
/// Cheap to clone.
#[derive(Clone)]
pub struct DomainParticipant {
    inner: Arc<ParticipantInner>,
}

impl DomainParticipant {
    pub(crate) fn new(
        domain_id: DomainId,
        qos: DomainParticipantQos,
        config: RuntimeConfig,
    ) -> Result<Self> {
        let ctx = Arc::new(ParticipantContext::new(domain_id, config));
        let handle = asserter::spawn(&ctx)?;
        Ok(Self {
            inner: Arc::new(ParticipantInner {
                ctx,
                qos,
                types: Mutex::new(HashMap::new()),
                topics: Mutex::new(Vec::new()),
                publishers: Mutex::new(Vec::new()),
                subscribers: Mutex::new(Vec::new()),
                default_topic_qos: Mutex::new(TopicQos::default()),
                default_publisher_qos: Mutex::new(PublisherQos::default()),
                default_subscriber_qos: Mutex::new(SubscriberQos::default()),
                asserter: Mutex::new(Some(handle)),
                deleted: AtomicBool::new(false),
            }),
        })
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.is_deleted() {
            Err(Error::AlreadyDeleted)
        } else {
            Ok(())
        }
    }

    #[must_use]
    pub fn get_domain_id(&self) -> DomainId {
        self.inner.ctx.domain_id()
    }

    #[must_use]
    pub fn get_qos(&self) -> DomainParticipantQos {
        self.inner.qos.clone()
    }

    #[must_use]
    pub fn get_instance_handle(&self) -> InstanceHandle {
        InstanceHandle::from_guid(self.inner.ctx.guid())
    }

    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.inner.deleted.load(Ordering::Acquire)
    }

    // ===================================================================
    // Type support
    // ===================================================================

    /// Bind `type_name` to the Rust type `T`.
    ///
    /// Registering the same pair again is a no-op; binding the name to a
    /// different type fails with `TypeMismatch`.
    pub fn register_type<T: DDS>(&self, type_name: &str) -> Result<()> {
        self.ensure_alive()?;
        if type_name.is_empty() {
            return Err(Error::BadParameter("empty type name".into()));
        }
        let mut types = self.inner.types.lock();
        match types.get(type_name) {
            Some(bound) if *bound == RustTypeId::of::<T>() => Ok(()),
            Some(_) => Err(Error::TypeMismatch(type_name.to_string())),
            None => {
                types.insert(type_name.to_string(), RustTypeId::of::<T>());
                log::debug!("[participant] registered type '{}'", type_name);
                Ok(())
            }
        }
    }

    // ===================================================================
    // Topics
    // ===================================================================

    pub fn get_default_topic_qos(&self) -> Result<TopicQos> {
        self.ensure_alive()?;
        self.inner.ctx.overlay(&self.inner.default_topic_qos)
    }

    pub fn set_default_topic_qos(&self, qos: &TopicQos) -> Result<()> {
        self.ensure_alive()?;
        qos.validate()?;
        *self.inner.default_topic_qos.lock() = qos.clone();
        Ok(())
    }

    /// Create a topic bound to a registered type.
    ///
    /// Errors: `TypeNotRegistered`, `TypeMismatch` when `type_name` is bound
    /// to another Rust type, `PreconditionNotMet` when the name is taken.
    pub fn create_topic<T: DDS>(
        &self,
        topic_name: &str,
        type_name: &str,
        qos: &TopicQos,
    ) -> Result<Topic<T>> {
        self.ensure_alive()?;
        if topic_name.is_empty() {
            return Err(Error::BadParameter("empty topic name".into()));
        }
        qos.validate()?;
        match self.inner.types.lock().get(type_name) {
            None => return Err(Error::TypeNotRegistered(type_name.to_string())),
            Some(bound) if *bound != RustTypeId::of::<T>() => {
                return Err(Error::TypeMismatch(type_name.to_string()))
            }
            Some(_) => {}
        }

        let mut topics = self.inner.topics.lock();
        if topics.iter().any(|t| &**t.name() == topic_name) {
            return Err(Error::PreconditionNotMet(format!(
                "topic '{}' already exists",
                topic_name
            )));
        }
        let inner = Arc::new(TopicInner::new(
            self.inner.ctx.next_guid(EntityKind::Topic),
            topic_name,
            type_name,
            RustTypeId::of::<T>(),
            qos.clone(),
        ));
        topics.push(Arc::clone(&inner));
        log::debug!("[participant] topic '{}' ({})", topic_name, type_name);
        Ok(Topic::from_inner(inner))
    }

    /// Look up a topic of this participant by name and sample type.
    #[must_use]
    pub fn find_topic<T: DDS>(&self, topic_name: &str) -> Option<Topic<T>> {
        self.inner
            .topics
            .lock()
            .iter()
            .find(|t| &**t.name() == topic_name && t.sample_type() == RustTypeId::of::<T>())
            .map(|t| Topic::from_inner(Arc::clone(t)))
    }

    /// Delete a topic no writer or reader uses any more.
    pub fn delete_topic<T: DDS>(&self, topic: &Topic<T>) -> Result<()> {
        topic.ensure_alive()?;
        let mut topics = self.inner.topics.lock();
        let pos = topics
            .iter()
            .position(|t| Arc::ptr_eq(t, topic.inner()))
            .ok_or_else(|| Error::BadParameter("topic not created by this participant".into()))?;
        if topic.inner().user_count() > 0 {
            return Err(Error::PreconditionNotMet(format!(
                "topic '{}' still has {} endpoints",
                topic.get_name(),
                topic.inner().user_count()
            )));
        }
        topics.remove(pos).mark_deleted();
        Ok(())
    }

    // ===================================================================
    // Publishers / Subscribers
    // ===================================================================

    pub fn get_default_publisher_qos(&self) -> Result<PublisherQos> {
        self.ensure_alive()?;
        self.inner.ctx.overlay(&self.inner.default_publisher_qos)
    }

    pub fn set_default_publisher_qos(&self, qos: &PublisherQos) -> Result<()> {
        self.ensure_alive()?;
        qos.validate()?;
        *self.inner.default_publisher_qos.lock() = qos.clone();
        Ok(())
    }

    pub fn create_publisher(&self, qos: &PublisherQos) -> Result<Publisher> {
        self.ensure_alive()?;
        qos.validate()?;
        let publisher = Publisher::new(Arc::clone(&self.inner.ctx), qos.clone());
        self.inner.publishers.lock().push(publisher.clone());
        Ok(publisher)
    }

    /// Delete an empty publisher (`PreconditionNotMet` while it has writers).
    pub fn delete_publisher(&self, publisher: &Publisher) -> Result<()> {
        if publisher.is_deleted() {
            return Err(Error::AlreadyDeleted);
        }
        let mut publishers = self.inner.publishers.lock();
        let pos = publishers
            .iter()
            .position(|p| p.same_as(publisher))
            .ok_or_else(|| {
                Error::BadParameter("publisher not created by this participant".into())
            })?;
        if publisher.has_children() {
            return Err(Error::PreconditionNotMet(
                "publisher still owns writers".into(),
            ));
        }
        publishers.remove(pos).teardown();
        Ok(())
    }

    pub fn get_default_subscriber_qos(&self) -> Result<SubscriberQos> {
        self.ensure_alive()?;
        self.inner.ctx.overlay(&self.inner.default_subscriber_qos)
    }

    pub fn set_default_subscriber_qos(&self, qos: &SubscriberQos) -> Result<()> {
        self.ensure_alive()?;
        qos.validate()?;
        *self.inner.default_subscriber_qos.lock() = qos.clone();
        Ok(())
    }

    pub fn create_subscriber(&self, qos: &SubscriberQos) -> Result<Subscriber> {
        self.ensure_alive()?;
        qos.validate()?;
        let subscriber = Subscriber::new(Arc::clone(&self.inner.ctx), qos.clone());
        self.inner.subscribers.lock().push(subscriber.clone());
        Ok(subscriber)
    }

    /// Delete an empty subscriber (`PreconditionNotMet` while it has readers).
    pub fn delete_subscriber(&self, subscriber: &Subscriber) -> Result<()> {
        if subscriber.is_deleted() {
            return Err(Error::AlreadyDeleted);
        }
        let mut subscribers = self.inner.subscribers.lock();
        let pos = subscribers
            .iter()
            .position(|s| s.same_as(subscriber))
            .ok_or_else(|| {
                Error::BadParameter("subscriber not created by this participant".into())
            })?;
        if subscriber.has_children() {
            return Err(Error::PreconditionNotMet(
                "subscriber still owns readers".into(),
            ));
        }
        subscribers.remove(pos).teardown();
        Ok(())
    }

    // ===================================================================
    // Graph
    // ===================================================================

    /// Delete publishers (and writers), subscribers (and readers with their
    /// conditions), then topics.
    pub fn delete_contained_entities(&self) -> Result<()> {
        self.ensure_alive()?;
        self.drain();
        Ok(())
    }

    fn drain(&self) {
        let publishers: Vec<Publisher> = self.inner.publishers.lock().drain(..).collect();
        for publisher in &publishers {
            publisher.teardown();
        }
        let subscribers: Vec<Subscriber> = self.inner.subscribers.lock().drain(..).collect();
        for subscriber in &subscribers {
            subscriber.teardown();
        }
        for topic in self.inner.topics.lock().drain(..) {
            topic.mark_deleted();
        }
        log::debug!(
            "[participant] {} cleared ({} publishers, {} subscribers)",
            self.inner.ctx.guid(),
            publishers.len(),
            subscribers.len()
        );
    }

    /// Whether the participant still owns topics, publishers or subscribers.
    #[must_use]
    pub fn has_contained_entities(&self) -> bool {
        !self.inner.topics.lock().is_empty()
            || !self.inner.publishers.lock().is_empty()
            || !self.inner.subscribers.lock().is_empty()
    }

    /// Assert every MANUAL_BY_PARTICIPANT writer of this participant.
    pub fn assert_liveliness(&self) -> Result<()> {
        self.ensure_alive()?;
        let asserted = self
            .inner
            .ctx
            .assert_writers(LivelinessKind::ManualByParticipant);
        log::trace!("[participant] asserted {} writers", asserted);
        Ok(())
    }

    pub(crate) fn same_as(&self, other: &DomainParticipant) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Stop the asserter and mark the participant deleted; with `cascade`
    /// the contained entities go first.
    pub(crate) fn teardown(&self, cascade: bool) {
        if cascade && !self.is_deleted() {
            self.drain();
        }
        if self.inner.deleted.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.ctx.stop_asserter();
        if let Some(handle) = self.inner.asserter.lock().take() {
            if handle.join().is_err() {
                log::error!("[participant] liveliness asserter panicked");
            }
        }
        log::debug!("[participant] {} deleted", self.inner.ctx.guid());
    }
}

impl fmt::Debug for DomainParticipant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomainParticipant")
            .field("guid", &self.inner.ctx.guid())
            .field("domain_id", &self.inner.ctx.domain_id())
            .field("topics", &self.inner.topics.lock().len())
            .finish()
    }
}
