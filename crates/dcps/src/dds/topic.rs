// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! DDS Topic: a (name, type name) pair endpoints bind to.

use super::domain_registry::MatchKey;
use super::qos::{QosRecord, TopicQos};
use super::{Error, Result, DDS};
use crate::core::Guid;
use parking_lot::Mutex;
use std::any::TypeId as RustTypeId;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Untyped topic state, shared by every `Topic<T>` handle and held by the
/// participant.
pub(crate) struct TopicInner {
    guid: Guid,
    name: Arc<str>,
    type_name: String,
    sample_type: RustTypeId,
    qos: Mutex<TopicQos>,
    /// Writers and readers bound to the topic.
    users: AtomicUsize,
    deleted: AtomicBool,
}

impl TopicInner {
    pub(crate) fn new(
        guid: Guid,
        name: &str,
        type_name: &str,
        sample_type: RustTypeId,
        qos: TopicQos,
    ) -> Self {
        Self {
            guid,
            name: Arc::from(name),
            type_name: type_name.to_string(),
            sample_type,
            qos: Mutex::new(qos),
            users: AtomicUsize::new(0),
            deleted: AtomicBool::new(false),
        }
    }

    pub(crate) fn name(&self) -> &Arc<str> {
        &self.name
    }

    pub(crate) fn sample_type(&self) -> RustTypeId {
        self.sample_type
    }

    pub(crate) fn guid(&self) -> Guid {
        self.guid
    }

    pub(crate) fn match_key(&self) -> MatchKey {
        MatchKey::from_names(&self.name, &self.type_name)
    }

    pub(crate) fn acquire(&self) {
        self.users.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn release(&self) {
        let _ = self
            .users
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    pub(crate) fn user_count(&self) -> usize {
        self.users.load(Ordering::Acquire)
    }

    pub(crate) fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::Acquire)
    }

    pub(crate) fn mark_deleted(&self) {
        self.deleted.store(true, Ordering::Release);
    }
}

/// Typed DDS Topic.
///
/// The topic QoS is only a template: endpoints copy it once at creation
/// (`copy_from_topic_qos`), later `set_qos` calls never reach them.
pub struct Topic<T: DDS> {
    inner: Arc<TopicInner>,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: DDS> Clone for Topic<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _phantom: PhantomData,
        }
    }
}

impl<T: DDS> Topic<T> {
    pub(crate) fn from_inner(inner: Arc<TopicInner>) -> Self {
        Self {
            inner,
            _phantom: PhantomData,
        }
    }

    pub(crate) fn inner(&self) -> &Arc<TopicInner> {
        &self.inner
    }

    /// Fails with `AlreadyDeleted` once the topic was deleted.
    pub(crate) fn ensure_alive(&self) -> Result<()> {
        if self.inner.is_deleted() {
            Err(Error::AlreadyDeleted)
        } else {
            Ok(())
        }
    }

    #[must_use]
    pub fn get_name(&self) -> &str {
        &self.inner.name
    }

    #[must_use]
    pub fn get_type_name(&self) -> &str {
        &self.inner.type_name
    }

    #[must_use]
    pub fn get_qos(&self) -> TopicQos {
        self.inner.qos.lock().clone()
    }

    /// Replace the topic QoS (validated). Existing endpoints keep theirs.
    pub fn set_qos(&self, qos: &TopicQos) -> Result<()> {
        self.ensure_alive()?;
        qos.validate()?;
        *self.inner.qos.lock() = qos.clone();
        Ok(())
    }

    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.inner.is_deleted()
    }
}

impl<T: DDS> fmt::Debug for Topic<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Topic")
            .field("name", &self.inner.name)
            .field("type_name", &self.inner.type_name)
            .field("users", &self.inner.user_count())
            .finish()
    }
}
