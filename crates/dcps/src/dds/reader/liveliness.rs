// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-reader liveliness accounting.
//!
//! One [`LivelinessMonitor`] per matched writer, driven by the writer's
//! offered lease. Every transition updates `alive_count` / `not_alive_count`
//! so that their sum always equals the number of matched writers.

use crate::core::Guid;
use crate::dds::listener::LivelinessChangedStatus;
use crate::dds::reader::InstanceHandle;
use crate::qos::liveliness::{Liveliness, LivelinessMonitor, LivenessTransition};
use std::collections::HashMap;
use std::time::Instant;

#[derive(Default)]
pub(crate) struct LivelinessTracker {
    writers: HashMap<Guid, LivelinessMonitor>,
    status: LivelinessChangedStatus,
}

impl LivelinessTracker {
    /// Start tracking a newly matched writer; it counts as alive.
    pub(crate) fn add_writer(&mut self, writer: Guid, offered: &Liveliness, now: Instant) -> bool {
        if self.writers.contains_key(&writer) {
            return false;
        }
        let mut monitor = LivelinessMonitor::from_policy(offered);
        monitor.assert_at(now);
        self.writers.insert(writer, monitor);
        self.status.alive_count += 1;
        self.status.alive_count_change += 1;
        self.status.last_publication_handle = InstanceHandle::from_guid(writer);
        true
    }

    /// Stop tracking an unmatched writer.
    pub(crate) fn remove_writer(&mut self, writer: Guid) -> bool {
        let Some(monitor) = self.writers.remove(&writer) else {
            return false;
        };
        if monitor.is_alive() {
            self.status.alive_count = self.status.alive_count.saturating_sub(1);
            self.status.alive_count_change -= 1;
        } else {
            self.status.not_alive_count = self.status.not_alive_count.saturating_sub(1);
            self.status.not_alive_count_change -= 1;
        }
        self.status.last_publication_handle = InstanceHandle::from_guid(writer);
        true
    }

    /// Record an assertion. Returns `true` if the writer came back alive.
    pub(crate) fn assert_writer(&mut self, writer: Guid, now: Instant) -> bool {
        let Some(monitor) = self.writers.get_mut(&writer) else {
            return false;
        };
        if monitor.assert_at(now) != Some(LivenessTransition::BecameAlive) {
            return false;
        }
        self.status.not_alive_count = self.status.not_alive_count.saturating_sub(1);
        self.status.not_alive_count_change -= 1;
        self.status.alive_count += 1;
        self.status.alive_count_change += 1;
        self.status.last_publication_handle = InstanceHandle::from_guid(writer);
        true
    }

    /// Expire leases. Returns the writers that just lost liveliness.
    pub(crate) fn check(&mut self, now: Instant) -> Vec<Guid> {
        let mut expired = Vec::new();
        for (guid, monitor) in &mut self.writers {
            if monitor.check_at(now) == Some(LivenessTransition::BecameNotAlive) {
                expired.push(*guid);
            }
        }
        for guid in &expired {
            self.status.alive_count = self.status.alive_count.saturating_sub(1);
            self.status.alive_count_change -= 1;
            self.status.not_alive_count += 1;
            self.status.not_alive_count_change += 1;
            self.status.last_publication_handle = InstanceHandle::from_guid(*guid);
            log::debug!("[reader] writer {} lost liveliness", guid);
        }
        expired
    }

    /// Earliest lease expiry among alive writers.
    pub(crate) fn next_deadline(&self) -> Option<Instant> {
        self.writers
            .values()
            .filter(|m| m.is_alive())
            .filter_map(LivelinessMonitor::expires_at)
            .min()
    }

    pub(crate) fn is_alive(&self, writer: &Guid) -> Option<bool> {
        self.writers.get(writer).map(LivelinessMonitor::is_alive)
    }

    pub(crate) fn matched_count(&self) -> usize {
        self.writers.len()
    }

    #[cfg(test)]
    pub(crate) fn status(&self) -> LivelinessChangedStatus {
        self.status
    }

    /// Snapshot and reset the change counters.
    pub(crate) fn take_status(&mut self) -> LivelinessChangedStatus {
        let snapshot = self.status;
        self.status.alive_count_change = 0;
        self.status.not_alive_count_change = 0;
        snapshot
    }
}
