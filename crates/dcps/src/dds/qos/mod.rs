// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-entity QoS records.
//!
//! Every entity kind has its own record with a default value, scoped
//! mutation through typed fields or named options, and an explicit
//! `finalize()` that validates and releases the record once it has been
//! consumed by a creation call.
//!
//! | Option | Participant | Topic | Pub/Sub | Writer | Reader |
//! |--------|:-:|:-:|:-:|:-:|:-:|
//! | `user_data.value` | x | | | | |
//! | `liveliness.kind`, `liveliness.lease_duration` | | x | | x | x |
//! | `reliability.kind`, `durability.kind` | | x | | x | x |
//! | `history.kind`, `history.depth` | | x | | x | x |
//! | `resource_limits.*` | | x | | x | x |
//! | `time_based_filter.minimum_separation` | | | | | x |
//! | `partition.name` | | | x | | |
//!
//! ```
//! use dcps::dds::qos::{DataReaderQos, QosRecord};
//! use dcps::qos::liveliness::LivelinessKind;
//!
//! let mut qos = DataReaderQos::default();
//! qos.set_option("liveliness.kind", "MANUAL_BY_TOPIC")?;
//! qos.set_option("liveliness.lease_duration", "2s")?;
//! assert_eq!(qos.liveliness.kind, LivelinessKind::ManualByTopic);
//! assert!(qos.set_option("deadline.period", "1s").is_err());
//! qos.finalize()?;
//! # Ok::<(), dcps::Error>(())
//! ```

#[cfg(feature = "qos-loaders")]
pub mod loaders;
mod options;

pub(crate) use options::{format_duration, parse_duration};

use crate::config::qos as names;
use crate::dds::{Error, Result};
use crate::qos::liveliness::{Liveliness, LivelinessKind};
use crate::qos::partition::Partition;
use crate::qos::time_based_filter::TimeBasedFilter;
use crate::qos::{Durability, History, Reliability, ResourceLimits, UserData};
use options::{
    format_count, format_durability, format_reliability, parse_count, parse_depth,
    parse_durability, parse_reliability,
};

pub use crate::qos::{DURATION_INFINITE, LENGTH_UNLIMITED};

/// Common contract of the per-entity QoS records.
pub trait QosRecord: Sized {
    /// Entity kind prefix used in runtime option keys (`"datareader"`, ...).
    const ENTITY: &'static str;

    /// Option names this record accepts.
    fn recognized_options() -> &'static [&'static str];

    /// Set one option by name. Unknown names fail with
    /// [`Error::UnknownQosOption`], malformed values with [`Error::InvalidQos`].
    fn set_option(&mut self, name: &str, value: &str) -> Result<()>;

    /// Render one option by name.
    fn get_option(&self, name: &str) -> Result<String>;

    /// Check internal consistency.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    /// Release the record after use; reports an inconsistent record.
    fn finalize(self) -> Result<()> {
        self.validate()
    }
}

fn unknown(entity: &'static str, option: &str) -> Error {
    Error::UnknownQosOption {
        entity,
        option: option.to_string(),
    }
}

const ENDPOINT_OPTIONS: &[&str] = &[
    names::LIVELINESS_KIND,
    names::LIVELINESS_LEASE_DURATION,
    names::RELIABILITY_KIND,
    names::DURABILITY_KIND,
    names::HISTORY_KIND,
    names::HISTORY_DEPTH,
    names::RESOURCE_LIMITS_MAX_SAMPLES,
    names::RESOURCE_LIMITS_MAX_INSTANCES,
    names::RESOURCE_LIMITS_MAX_SAMPLES_PER_INSTANCE,
];

const READER_OPTIONS: &[&str] = &[
    names::LIVELINESS_KIND,
    names::LIVELINESS_LEASE_DURATION,
    names::RELIABILITY_KIND,
    names::DURABILITY_KIND,
    names::HISTORY_KIND,
    names::HISTORY_DEPTH,
    names::RESOURCE_LIMITS_MAX_SAMPLES,
    names::RESOURCE_LIMITS_MAX_INSTANCES,
    names::RESOURCE_LIMITS_MAX_SAMPLES_PER_INSTANCE,
    names::TIME_BASED_FILTER_MINIMUM_SEPARATION,
];

const GROUP_OPTIONS: &[&str] = &[names::PARTITION_NAME];

const PARTICIPANT_OPTIONS: &[&str] = &[names::USER_DATA_VALUE];

/// Policies shared between the topic scope and the endpoint scope.
///
/// These are exactly the fields `copy_from_topic_qos` overlays.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct SharedPolicies {
    pub liveliness: Liveliness,
    pub reliability: Reliability,
    pub durability: Durability,
    pub history: History,
    pub resource_limits: ResourceLimits,
}

impl SharedPolicies {
    fn set(&mut self, name: &str, value: &str) -> Result<bool> {
        match name {
            names::LIVELINESS_KIND => {
                self.liveliness.kind = value
                    .parse::<LivelinessKind>()
                    .map_err(Error::InvalidQos)?;
            }
            names::LIVELINESS_LEASE_DURATION => {
                self.liveliness.lease_duration = parse_duration(name, value)?;
            }
            names::RELIABILITY_KIND => self.reliability = parse_reliability(name, value)?,
            names::DURABILITY_KIND => self.durability = parse_durability(name, value)?,
            names::HISTORY_KIND => {
                self.history = match value.trim().to_ascii_uppercase().as_str() {
                    names::KEEP_ALL => History::KeepAll,
                    names::KEEP_LAST => match self.history {
                        History::KeepLast(depth) => History::KeepLast(depth),
                        History::KeepAll => History::KeepLast(1),
                    },
                    _ => {
                        return Err(Error::InvalidQos(format!(
                            "bad value '{}' for {}",
                            value, name
                        )))
                    }
                };
            }
            names::HISTORY_DEPTH => self.history = History::KeepLast(parse_depth(name, value)?),
            names::RESOURCE_LIMITS_MAX_SAMPLES => {
                self.resource_limits.max_samples = parse_count(name, value)?;
            }
            names::RESOURCE_LIMITS_MAX_INSTANCES => {
                self.resource_limits.max_instances = parse_count(name, value)?;
            }
            names::RESOURCE_LIMITS_MAX_SAMPLES_PER_INSTANCE => {
                self.resource_limits.max_samples_per_instance = parse_count(name, value)?;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn get(&self, name: &str) -> Option<String> {
        let value = match name {
            names::LIVELINESS_KIND => self.liveliness.kind.to_string(),
            names::LIVELINESS_LEASE_DURATION => format_duration(self.liveliness.lease_duration),
            names::RELIABILITY_KIND => format_reliability(self.reliability).to_string(),
            names::DURABILITY_KIND => format_durability(self.durability).to_string(),
            names::HISTORY_KIND => match self.history {
                History::KeepLast(_) => names::KEEP_LAST.to_string(),
                History::KeepAll => names::KEEP_ALL.to_string(),
            },
            names::HISTORY_DEPTH => match self.history {
                History::KeepLast(depth) => depth.to_string(),
                History::KeepAll => format_count(LENGTH_UNLIMITED),
            },
            names::RESOURCE_LIMITS_MAX_SAMPLES => format_count(self.resource_limits.max_samples),
            names::RESOURCE_LIMITS_MAX_INSTANCES => {
                format_count(self.resource_limits.max_instances)
            }
            names::RESOURCE_LIMITS_MAX_SAMPLES_PER_INSTANCE => {
                format_count(self.resource_limits.max_samples_per_instance)
            }
            _ => return None,
        };
        Some(value)
    }

    fn validate(&self) -> Result<()> {
        if self.liveliness.lease_duration.is_zero() {
            return Err(Error::InvalidQos(
                "liveliness.lease_duration must be > 0".to_string(),
            ));
        }
        self.resource_limits
            .validate(self.history)
            .map_err(Error::InvalidQos)
    }
}

/// DomainParticipant QoS.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DomainParticipantQos {
    pub user_data: UserData,
}

impl QosRecord for DomainParticipantQos {
    const ENTITY: &'static str = "participant";

    fn recognized_options() -> &'static [&'static str] {
        PARTICIPANT_OPTIONS
    }

    fn set_option(&mut self, name: &str, value: &str) -> Result<()> {
        match name {
            names::USER_DATA_VALUE => {
                self.user_data.value = value.as_bytes().to_vec();
                Ok(())
            }
            _ => Err(unknown(Self::ENTITY, name)),
        }
    }

    fn get_option(&self, name: &str) -> Result<String> {
        match name {
            names::USER_DATA_VALUE => Ok(String::from_utf8_lossy(&self.user_data.value).into_owned()),
            _ => Err(unknown(Self::ENTITY, name)),
        }
    }
}

/// Topic QoS.
///
/// Defaults: BEST_EFFORT, VOLATILE, KEEP_LAST(1), AUTOMATIC liveliness with
/// an infinite lease.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TopicQos {
    pub liveliness: Liveliness,
    pub reliability: Reliability,
    pub durability: Durability,
    pub history: History,
    pub resource_limits: ResourceLimits,
}

impl TopicQos {
    fn shared(&self) -> SharedPolicies {
        SharedPolicies {
            liveliness: self.liveliness,
            reliability: self.reliability,
            durability: self.durability,
            history: self.history,
            resource_limits: self.resource_limits,
        }
    }

    fn store(&mut self, shared: SharedPolicies) {
        self.liveliness = shared.liveliness;
        self.reliability = shared.reliability;
        self.durability = shared.durability;
        self.history = shared.history;
        self.resource_limits = shared.resource_limits;
    }
}

/// Publisher QoS.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PublisherQos {
    pub partition: Partition,
}

/// Subscriber QoS.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubscriberQos {
    pub partition: Partition,
}

/// DataWriter QoS.
///
/// Differs from the topic default in offering RELIABLE delivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataWriterQos {
    pub liveliness: Liveliness,
    pub reliability: Reliability,
    pub durability: Durability,
    pub history: History,
    pub resource_limits: ResourceLimits,
}

impl Default for DataWriterQos {
    fn default() -> Self {
        Self {
            liveliness: Liveliness::default(),
            reliability: Reliability::Reliable,
            durability: Durability::default(),
            history: History::default(),
            resource_limits: ResourceLimits::default(),
        }
    }
}

/// DataReader QoS.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DataReaderQos {
    pub liveliness: Liveliness,
    pub reliability: Reliability,
    pub durability: Durability,
    pub history: History,
    pub resource_limits: ResourceLimits,
    pub time_based_filter: TimeBasedFilter,
}

// Endpoint records share the topic-scope field set; the helpers below move
// those fields through `SharedPolicies` so the option table lives in one
// place.
macro_rules! shared_fields {
    ($ty:ty) => {
        impl $ty {
            fn shared(&self) -> SharedPolicies {
                SharedPolicies {
                    liveliness: self.liveliness,
                    reliability: self.reliability,
                    durability: self.durability,
                    history: self.history,
                    resource_limits: self.resource_limits,
                }
            }

            fn store(&mut self, shared: SharedPolicies) {
                self.liveliness = shared.liveliness;
                self.reliability = shared.reliability;
                self.durability = shared.durability;
                self.history = shared.history;
                self.resource_limits = shared.resource_limits;
            }

            /// Overlay the topic-scope policies (liveliness, reliability,
            /// durability, history, resource limits). Endpoint-only fields
            /// are left untouched. One-shot copy, not a live link.
            pub fn copy_from_topic(&mut self, topic: &TopicQos) {
                self.store(topic.shared());
            }
        }
    };
}

shared_fields!(DataWriterQos);
shared_fields!(DataReaderQos);

impl QosRecord for TopicQos {
    const ENTITY: &'static str = "topic";

    fn recognized_options() -> &'static [&'static str] {
        ENDPOINT_OPTIONS
    }

    fn set_option(&mut self, name: &str, value: &str) -> Result<()> {
        let mut shared = self.shared();
        if shared.set(name, value)? {
            self.store(shared);
            Ok(())
        } else {
            Err(unknown(Self::ENTITY, name))
        }
    }

    fn get_option(&self, name: &str) -> Result<String> {
        self.shared()
            .get(name)
            .ok_or_else(|| unknown(Self::ENTITY, name))
    }

    fn validate(&self) -> Result<()> {
        self.shared().validate()
    }
}

impl QosRecord for DataWriterQos {
    const ENTITY: &'static str = "datawriter";

    fn recognized_options() -> &'static [&'static str] {
        ENDPOINT_OPTIONS
    }

    fn set_option(&mut self, name: &str, value: &str) -> Result<()> {
        let mut shared = self.shared();
        if shared.set(name, value)? {
            self.store(shared);
            Ok(())
        } else {
            Err(unknown(Self::ENTITY, name))
        }
    }

    fn get_option(&self, name: &str) -> Result<String> {
        self.shared()
            .get(name)
            .ok_or_else(|| unknown(Self::ENTITY, name))
    }

    fn validate(&self) -> Result<()> {
        self.shared().validate()
    }
}

impl QosRecord for DataReaderQos {
    const ENTITY: &'static str = "datareader";

    fn recognized_options() -> &'static [&'static str] {
        READER_OPTIONS
    }

    fn set_option(&mut self, name: &str, value: &str) -> Result<()> {
        if name == names::TIME_BASED_FILTER_MINIMUM_SEPARATION {
            let separation = parse_duration(name, value)?;
            if separation == DURATION_INFINITE {
                return Err(Error::InvalidQos(format!(
                    "{} cannot be infinite",
                    name
                )));
            }
            self.time_based_filter = TimeBasedFilter::new(separation);
            return Ok(());
        }
        let mut shared = self.shared();
        if shared.set(name, value)? {
            self.store(shared);
            Ok(())
        } else {
            Err(unknown(Self::ENTITY, name))
        }
    }

    fn get_option(&self, name: &str) -> Result<String> {
        if name == names::TIME_BASED_FILTER_MINIMUM_SEPARATION {
            return Ok(format_duration(self.time_based_filter.minimum_separation));
        }
        self.shared()
            .get(name)
            .ok_or_else(|| unknown(Self::ENTITY, name))
    }

    fn validate(&self) -> Result<()> {
        self.shared().validate()
    }
}

macro_rules! group_record {
    ($ty:ty, $entity:literal) => {
        impl QosRecord for $ty {
            const ENTITY: &'static str = $entity;

            fn recognized_options() -> &'static [&'static str] {
                GROUP_OPTIONS
            }

            fn set_option(&mut self, name: &str, value: &str) -> Result<()> {
                match name {
                    names::PARTITION_NAME => {
                        self.partition = Partition::from_list(value);
                        Ok(())
                    }
                    _ => Err(unknown(Self::ENTITY, name)),
                }
            }

            fn get_option(&self, name: &str) -> Result<String> {
                match name {
                    names::PARTITION_NAME => Ok(self.partition.to_list()),
                    _ => Err(unknown(Self::ENTITY, name)),
                }
            }
        }
    };
}

group_record!(PublisherQos, "publisher");
group_record!(SubscriberQos, "subscriber");
