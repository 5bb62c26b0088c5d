// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! State a participant shares with its publishers and subscribers.

use crate::config::RuntimeConfig;
use crate::core::{EntityKind, Guid};
use crate::dds::domain_registry::{
    BindToken, DomainId, DomainRegistry, DomainState, LocalEndpointEntry, MatchKey,
};
use crate::dds::qos::QosRecord;
use crate::dds::reader::endpoint::ReaderInner;
use crate::dds::topic::TopicInner;
use crate::dds::writer::endpoint::{LivelinessSource, WriterInner};
use crate::dds::{Result, DDS};
use crate::qos::liveliness::LivelinessKind;
use crossbeam::channel::Sender;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// Endpoint owned by a publisher or subscriber, seen without its sample
/// type.
pub(crate) trait ContainedEndpoint: Send + Sync {
    fn teardown(&self) -> Result<()>;
}

impl<T: DDS> ContainedEndpoint for WriterInner<T> {
    fn teardown(&self) -> Result<()> {
        WriterInner::teardown(self)
    }
}

impl<T: DDS> ContainedEndpoint for ReaderInner<T> {
    fn teardown(&self) -> Result<()> {
        ReaderInner::teardown(self)
    }
}

/// Bookkeeping entry of a publisher's writer or a subscriber's reader.
pub(crate) struct ChildEndpoint {
    pub guid: Guid,
    pub topic: Arc<TopicInner>,
    pub endpoint: Arc<dyn ContainedEndpoint>,
}

impl ChildEndpoint {
    /// Delete the endpoint and release its topic.
    pub(crate) fn delete(self) -> Result<()> {
        self.topic.release();
        self.endpoint.teardown()
    }
}

pub(crate) struct ParticipantContext {
    domain_id: DomainId,
    domain: Arc<DomainState>,
    prefix: [u8; 12],
    next_key: AtomicU32,
    config: RuntimeConfig,
    writers: Mutex<Vec<Weak<dyn LivelinessSource>>>,
    /// Wakes the asserter thread; dropping it stops the thread.
    asserter: Mutex<Option<Sender<()>>>,
}

impl ParticipantContext {
    pub(crate) fn new(domain_id: DomainId, config: RuntimeConfig) -> Self {
        Self {
            domain_id,
            domain: DomainRegistry::global().get_or_create(domain_id),
            prefix: Guid::new_participant_prefix(),
            next_key: AtomicU32::new(1),
            config,
            writers: Mutex::new(Vec::new()),
            asserter: Mutex::new(None),
        }
    }

    pub(crate) fn domain_id(&self) -> DomainId {
        self.domain_id
    }

    pub(crate) fn guid(&self) -> Guid {
        Guid::new(self.prefix, 0, EntityKind::Participant)
    }

    pub(crate) fn next_guid(&self, kind: EntityKind) -> Guid {
        let key = self.next_key.fetch_add(1, Ordering::Relaxed);
        Guid::new(self.prefix, key, kind)
    }

    /// Whether `guid` names an entity of this participant.
    pub(crate) fn owns(&self, guid: Guid) -> bool {
        guid.prefix == self.prefix
    }

    pub(crate) fn register(&self, key: MatchKey, entry: LocalEndpointEntry) -> BindToken {
        self.domain.register(key, entry)
    }

    /// Stored default with the runtime overrides of its entity kind on top.
    pub(crate) fn overlay<R: QosRecord + Clone>(&self, stored: &Mutex<R>) -> Result<R> {
        let mut qos = stored.lock().clone();
        self.config.apply_to(&mut qos)?;
        Ok(qos)
    }

    // ===================================================================
    // Writer liveliness
    // ===================================================================

    pub(crate) fn set_asserter(&self, wake: Sender<()>) {
        *self.asserter.lock() = Some(wake);
    }

    pub(crate) fn stop_asserter(&self) {
        self.asserter.lock().take();
    }

    pub(crate) fn track_writer(&self, writer: Weak<dyn LivelinessSource>) {
        self.writers.lock().push(writer);
        if let Some(wake) = self.asserter.lock().as_ref() {
            let _ = wake.try_send(());
        }
    }

    fn live_writers(&self) -> Vec<Arc<dyn LivelinessSource>> {
        let mut writers = self.writers.lock();
        writers.retain(|w| w.strong_count() > 0);
        writers.iter().filter_map(Weak::upgrade).collect()
    }

    /// Assert every writer of the given liveliness kind.
    pub(crate) fn assert_writers(&self, kind: LivelinessKind) -> usize {
        let writers: Vec<_> = self
            .live_writers()
            .into_iter()
            .filter(|w| w.liveliness().kind == kind)
            .collect();
        for writer in &writers {
            writer.assert_liveliness();
        }
        writers.len()
    }

    /// Shortest assert period among AUTOMATIC writers.
    pub(crate) fn automatic_period(&self) -> Option<Duration> {
        self.live_writers()
            .iter()
            .map(|w| w.liveliness())
            .filter(|l| l.kind == LivelinessKind::Automatic)
            .filter_map(|l| l.assert_period())
            .min()
    }
}
