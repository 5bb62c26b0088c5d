// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Global configuration - single source of truth for defaults.
//!
//! # Architecture
//!
//! - **Level 1 (Static)**: compile-time constants (domain range, buffer and
//!   loop defaults, QoS option names and values)
//! - **Level 2 (Dynamic)**: `RuntimeConfig` holding QoS overrides applied on
//!   top of the per-entity defaults, plus swappable loop timing
//!
//! # Example
//!
//! ```
//! use dcps::config::RuntimeConfig;
//! use dcps::dds::qos::{DataReaderQos, QosRecord};
//!
//! let config = RuntimeConfig::new();
//! config.set_qos("datareader.history.depth", "8")?;
//! assert!(config.set_qos("datareader.deadline.period", "1s").is_err());
//!
//! let mut qos = DataReaderQos::default();
//! assert_eq!(config.apply_to(&mut qos)?, 1);
//! # Ok::<(), dcps::Error>(())
//! ```

use crate::dds::qos::{
    DataReaderQos, DataWriterQos, DomainParticipantQos, PublisherQos, QosRecord, SubscriberQos,
    TopicQos,
};
use crate::dds::{Error, Result};
use arc_swap::ArcSwap;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

// =======================================================================
// Entity limits
// =======================================================================

/// Maximum domain ID (inclusive).
pub const MAX_DOMAIN_ID: u32 = 232;

/// Default capacity of a reader's loaned sample buffer.
///
/// Used when the first `take()` happens before
/// `DataReader::install_sample_buffer` was called.
pub const DEFAULT_SAMPLE_BUFFER_CAPACITY: usize = 8;

/// Idle tick of a reader dispatch thread when no timer is armed.
pub const DISPATCH_IDLE_TICK: Duration = Duration::from_millis(500);

/// Idle tick of the participant liveliness asserter.
pub const ASSERTER_IDLE_TICK: Duration = Duration::from_millis(200);

// =======================================================================
// Loop timing defaults
// =======================================================================

/// Retry interval of a polling subscriber that got no data.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Sleep between two writes of a publish loop.
pub const DEFAULT_PUBLISH_PERIOD: Duration = Duration::from_millis(500);

/// Bound of one `WaitSet::wait()` in the sample programs.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(10);

/// First backoff after a transient write failure.
pub const DEFAULT_BACKOFF_INITIAL: Duration = Duration::from_millis(50);

/// Backoff ceiling.
pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// Consecutive transient failures tolerated before giving up.
pub const DEFAULT_BACKOFF_ATTEMPTS: u32 = 8;

// =======================================================================
// QoS Constants (Type-Safe Keys & Values)
// =======================================================================

/// QoS option names and values.
///
/// - Names: `policy.attribute` (e.g. `reliability.kind`); runtime keys
///   prefix them with the entity kind (`datareader.reliability.kind`)
/// - Values: UPPERCASE DDS names (e.g. `RELIABLE`, `KEEP_LAST`)
pub mod qos {
    // === Participant ===
    pub const USER_DATA_VALUE: &str = "user_data.value";

    // === Reliability QoS ===
    pub const RELIABILITY_KIND: &str = "reliability.kind";

    // === Durability QoS ===
    pub const DURABILITY_KIND: &str = "durability.kind";

    // === History QoS ===
    pub const HISTORY_KIND: &str = "history.kind";
    pub const HISTORY_DEPTH: &str = "history.depth";

    // === Liveliness QoS ===
    pub const LIVELINESS_KIND: &str = "liveliness.kind";
    pub const LIVELINESS_LEASE_DURATION: &str = "liveliness.lease_duration";

    // === Partition QoS ===
    pub const PARTITION_NAME: &str = "partition.name";

    // === Time Based Filter QoS ===
    pub const TIME_BASED_FILTER_MINIMUM_SEPARATION: &str = "time_based_filter.minimum_separation";

    // === Resource Limits QoS ===
    pub const RESOURCE_LIMITS_MAX_SAMPLES: &str = "resource_limits.max_samples";
    pub const RESOURCE_LIMITS_MAX_INSTANCES: &str = "resource_limits.max_instances";
    pub const RESOURCE_LIMITS_MAX_SAMPLES_PER_INSTANCE: &str =
        "resource_limits.max_samples_per_instance";

    // ===================================================================
    // QoS Values
    // ===================================================================

    // Reliability
    pub const RELIABLE: &str = "RELIABLE";
    pub const BEST_EFFORT: &str = "BEST_EFFORT";

    // Durability
    pub const VOLATILE: &str = "VOLATILE";
    pub const TRANSIENT_LOCAL: &str = "TRANSIENT_LOCAL";

    // History
    pub const KEEP_LAST: &str = "KEEP_LAST";
    pub const KEEP_ALL: &str = "KEEP_ALL";

    // Liveliness
    pub const AUTOMATIC: &str = "AUTOMATIC";
    pub const MANUAL_BY_PARTICIPANT: &str = "MANUAL_BY_PARTICIPANT";
    pub const MANUAL_BY_TOPIC: &str = "MANUAL_BY_TOPIC";

    // Special values
    pub const INFINITE: &str = "INFINITE";
    pub const UNLIMITED: &str = "UNLIMITED";
}

// =======================================================================
// Loop timing (Dynamic)
// =======================================================================

/// Exponential backoff applied to transient write failures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryBackoff {
    pub initial: Duration,
    pub max: Duration,
    /// Consecutive transient failures before the error is surfaced.
    pub max_attempts: u32,
}

impl Default for RetryBackoff {
    fn default() -> Self {
        Self {
            initial: DEFAULT_BACKOFF_INITIAL,
            max: DEFAULT_BACKOFF_MAX,
            max_attempts: DEFAULT_BACKOFF_ATTEMPTS,
        }
    }
}

impl RetryBackoff {
    /// Delay before retry number `attempt` (1-based), doubling up to `max`.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(31);
        self.initial
            .checked_mul(1u32 << shift)
            .unwrap_or(self.max)
            .min(self.max)
    }
}

/// Timing knobs for the polling, publishing and waiting loops.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoopTiming {
    pub poll_interval: Duration,
    pub publish_period: Duration,
    pub wait_timeout: Duration,
    pub retry_backoff: RetryBackoff,
}

impl Default for LoopTiming {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            publish_period: DEFAULT_PUBLISH_PERIOD,
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            retry_backoff: RetryBackoff::default(),
        }
    }
}

// =======================================================================
// Runtime Configuration (Dynamic, Lock-Free)
// =======================================================================

/// Shared runtime configuration (thread-safe, lock-free).
///
/// - `DashMap`: QoS overrides keyed by `"<entity>.<option>"`, validated on
///   insertion against the option table of the entity kind
/// - `ArcSwap`: loop timing, swapped atomically
///
/// The participant factory owns one instance; every `get_default_*_qos()`
/// call applies its overrides on top of the built-in defaults.
#[derive(Clone)]
pub struct RuntimeConfig {
    qos_config: Arc<DashMap<Arc<str>, Arc<str>>>,
    timing: Arc<ArcSwap<LoopTiming>>,
}

impl RuntimeConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            qos_config: Arc::new(DashMap::new()),
            timing: Arc::new(ArcSwap::from_pointee(LoopTiming::default())),
        }
    }

    // ===================================================================
    // QoS overrides
    // ===================================================================

    /// Store an override such as `"datareader.liveliness.kind" = "MANUAL_BY_TOPIC"`.
    ///
    /// Fails with `UnknownQosOption` for an unknown entity or option and with
    /// `InvalidQos` for a malformed value; nothing is stored on failure.
    pub fn set_qos(&self, key: &str, value: &str) -> Result<()> {
        let (entity, option) = key.split_once('.').ok_or_else(|| Error::UnknownQosOption {
            entity: "runtime",
            option: key.to_string(),
        })?;

        match entity {
            "participant" => check_option::<DomainParticipantQos>(option, value)?,
            "topic" => check_option::<TopicQos>(option, value)?,
            "publisher" => check_option::<PublisherQos>(option, value)?,
            "subscriber" => check_option::<SubscriberQos>(option, value)?,
            "datawriter" => check_option::<DataWriterQos>(option, value)?,
            "datareader" => check_option::<DataReaderQos>(option, value)?,
            _ => {
                return Err(Error::UnknownQosOption {
                    entity: "runtime",
                    option: key.to_string(),
                })
            }
        }

        log::debug!("[config] set {} = {}", key, value);
        self.qos_config.insert(Arc::from(key), Arc::from(value));
        Ok(())
    }

    #[must_use]
    pub fn get_qos(&self, key: &str) -> Option<Arc<str>> {
        self.qos_config.get(key).map(|v| Arc::clone(&v))
    }

    pub fn remove_qos(&self, key: &str) -> Option<Arc<str>> {
        self.qos_config.remove(key).map(|(_, v)| v)
    }

    /// Apply every override of `R`'s entity kind to `record`.
    ///
    /// Options are applied in lexicographic order so that, for instance,
    /// `history.depth` is applied before `history.kind`. Returns the number
    /// of options applied.
    pub fn apply_to<R: QosRecord>(&self, record: &mut R) -> Result<usize> {
        let prefix = format!("{}.", R::ENTITY);
        let mut entries = self.search_qos_prefix(&prefix);
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        for (key, value) in &entries {
            record.set_option(&key[prefix.len()..], value)?;
        }
        Ok(entries.len())
    }

    /// Search overrides by key prefix.
    #[must_use]
    pub fn search_qos_prefix(&self, prefix: &str) -> Vec<(Arc<str>, Arc<str>)> {
        self.qos_config
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| (Arc::clone(entry.key()), Arc::clone(entry.value())))
            .collect()
    }

    /// Set several overrides; stops at the first invalid entry.
    pub fn set_qos_bulk<'a, I>(&self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (key, value) in entries {
            self.set_qos(key, value)?;
        }
        Ok(())
    }

    pub fn clear_qos(&self) {
        self.qos_config.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.qos_config.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.qos_config.is_empty()
    }

    // ===================================================================
    // Loop timing (Atomic)
    // ===================================================================

    #[must_use]
    pub fn loop_timing(&self) -> LoopTiming {
        **self.timing.load()
    }

    pub fn set_loop_timing(&self, timing: LoopTiming) {
        self.timing.store(Arc::new(timing));
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn check_option<R: QosRecord + Default>(option: &str, value: &str) -> Result<()> {
    R::default().set_option(option, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qos::liveliness::LivelinessKind;
    use crate::qos::History;

    #[test]
    fn test_set_qos_validates_entity_and_option() {
        let config = RuntimeConfig::new();
        assert!(config
            .set_qos("datareader.liveliness.kind", "MANUAL_BY_TOPIC")
            .is_ok());
        assert!(matches!(
            config.set_qos("datareader.deadline.period", "1s"),
            Err(Error::UnknownQosOption { entity: "datareader", .. })
        ));
        assert!(matches!(
            config.set_qos("gizmo.history.depth", "1"),
            Err(Error::UnknownQosOption { entity: "runtime", .. })
        ));
        assert!(matches!(
            config.set_qos("noentity", "1"),
            Err(Error::UnknownQosOption { .. })
        ));
        assert!(matches!(
            config.set_qos("topic.history.depth", "zero"),
            Err(Error::InvalidQos(_))
        ));
        assert_eq!(config.len(), 1);
    }

    #[test]
    fn test_apply_to_only_touches_matching_entity() {
        let config = RuntimeConfig::new();
        config
            .set_qos_bulk([
                ("datareader.history.kind", "KEEP_LAST"),
                ("datareader.history.depth", "6"),
                ("datareader.liveliness.kind", "MANUAL_BY_TOPIC"),
                ("datawriter.history.depth", "2"),
            ])
            .expect("bulk");

        let mut reader = DataReaderQos::default();
        assert_eq!(config.apply_to(&mut reader).expect("apply"), 3);
        assert_eq!(reader.history, History::KeepLast(6));
        assert_eq!(reader.liveliness.kind, LivelinessKind::ManualByTopic);

        let mut topic = TopicQos::default();
        assert_eq!(config.apply_to(&mut topic).expect("apply"), 0);
        assert_eq!(topic, TopicQos::default());
    }

    #[test]
    fn test_search_and_remove() {
        let config = RuntimeConfig::new();
        config.set_qos("publisher.partition.name", "a,b").expect("set");
        config.set_qos("subscriber.partition.name", "a").expect("set");
        assert_eq!(config.search_qos_prefix("publisher.").len(), 1);
        assert_eq!(
            config.get_qos("subscriber.partition.name").as_deref(),
            Some("a")
        );
        assert!(config.remove_qos("subscriber.partition.name").is_some());
        assert_eq!(config.len(), 1);
        config.clear_qos();
        assert!(config.is_empty());
    }

    #[test]
    fn test_loop_timing_swap() {
        let config = RuntimeConfig::new();
        assert_eq!(config.loop_timing(), LoopTiming::default());
        assert_eq!(config.loop_timing().poll_interval, Duration::from_secs(1));

        let timing = LoopTiming {
            publish_period: Duration::from_millis(20),
            ..LoopTiming::default()
        };
        let shared = config.clone();
        shared.set_loop_timing(timing);
        assert_eq!(config.loop_timing().publish_period, Duration::from_millis(20));
    }

    #[test]
    fn test_backoff_doubles_up_to_max() {
        let backoff = RetryBackoff::default();
        assert_eq!(backoff.delay(1), Duration::from_millis(50));
        assert_eq!(backoff.delay(2), Duration::from_millis(100));
        assert_eq!(backoff.delay(3), Duration::from_millis(200));
        assert_eq!(backoff.delay(10), Duration::from_secs(1));
        assert_eq!(backoff.delay(u32::MAX), Duration::from_secs(1));
    }
}
