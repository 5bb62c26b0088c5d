// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::DomainParticipant;
use crate::config::{RuntimeConfig, MAX_DOMAIN_ID};
use crate::dds::domain_registry::DomainId;
use crate::dds::qos::{DomainParticipantQos, QosRecord};
use crate::dds::{Error, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

static FACTORY: OnceLock<DomainParticipantFactory> = OnceLock::new();

/// Process-wide participant factory.
///
/// # Example
///
/// ```rust,no_run
/// use dcps::{DomainParticipantFactory, Error};
///
/// let factory = DomainParticipantFactory::get_instance().ok_or(Error::NotEnabled)?;
/// let participant = factory.create_participant(0, &factory.get_default_participant_qos()?)?;
/// // ...
/// factory.delete_participant(&participant)?;
/// # Ok::<(), Error>(())
/// ```
pub struct DomainParticipantFactory {
    default_qos: Mutex<DomainParticipantQos>,
    config: RuntimeConfig,
    participants: Mutex<Vec<DomainParticipant>>,
    enabled: AtomicBool,
}

impl DomainParticipantFactory {
    /// The factory singleton, or `None` once [`shutdown`](Self::shutdown)
    /// has run.
    #[must_use]
    pub fn get_instance() -> Option<&'static DomainParticipantFactory> {
        let factory = FACTORY.get_or_init(|| DomainParticipantFactory {
            default_qos: Mutex::new(DomainParticipantQos::default()),
            config: RuntimeConfig::new(),
            participants: Mutex::new(Vec::new()),
            enabled: AtomicBool::new(true),
        });
        factory.enabled.load(Ordering::Acquire).then_some(factory)
    }

    fn ensure_enabled(&self) -> Result<()> {
        if self.enabled.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(Error::NotEnabled)
        }
    }

    /// Runtime QoS overrides and loop timing shared by every participant.
    #[must_use]
    pub fn runtime_config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn get_default_participant_qos(&self) -> Result<DomainParticipantQos> {
        self.ensure_enabled()?;
        let mut qos = self.default_qos.lock().clone();
        self.config.apply_to(&mut qos)?;
        Ok(qos)
    }

    pub fn set_default_participant_qos(&self, qos: &DomainParticipantQos) -> Result<()> {
        self.ensure_enabled()?;
        qos.validate()?;
        *self.default_qos.lock() = qos.clone();
        Ok(())
    }

    /// Join `domain_id` (0-232).
    pub fn create_participant(
        &self,
        domain_id: DomainId,
        qos: &DomainParticipantQos,
    ) -> Result<DomainParticipant> {
        self.ensure_enabled()?;
        if domain_id > MAX_DOMAIN_ID {
            return Err(Error::InvalidDomainId(domain_id));
        }
        qos.validate()?;
        let participant = DomainParticipant::new(domain_id, qos.clone(), self.config.clone())?;
        self.participants.lock().push(participant.clone());
        log::info!("[factory] participant created on domain {}", domain_id);
        Ok(participant)
    }

    /// Delete a participant that no longer owns entities.
    pub fn delete_participant(&self, participant: &DomainParticipant) -> Result<()> {
        if participant.is_deleted() {
            return Err(Error::AlreadyDeleted);
        }
        if participant.has_contained_entities() {
            return Err(Error::PreconditionNotMet(
                "participant still owns entities".into(),
            ));
        }
        let removed = {
            let mut participants = self.participants.lock();
            let pos = participants
                .iter()
                .position(|p| p.same_as(participant))
                .ok_or_else(|| Error::BadParameter("unknown participant".into()))?;
            participants.remove(pos)
        };
        removed.teardown(false);
        Ok(())
    }

    /// First live participant of `domain_id`.
    #[must_use]
    pub fn lookup_participant(&self, domain_id: DomainId) -> Option<DomainParticipant> {
        self.participants
            .lock()
            .iter()
            .find(|p| p.get_domain_id() == domain_id)
            .cloned()
    }

    /// Delete every participant (cascading) and disable the factory.
    ///
    /// Afterwards [`get_instance`](Self::get_instance) returns `None` and
    /// every factory operation fails with `NotEnabled`.
    pub fn shutdown(&self) {
        if !self.enabled.swap(false, Ordering::AcqRel) {
            return;
        }
        let participants: Vec<DomainParticipant> = self.participants.lock().drain(..).collect();
        let count = participants.len();
        for participant in participants {
            participant.teardown(true);
        }
        log::info!("[factory] shut down ({} participants deleted)", count);
    }
}
