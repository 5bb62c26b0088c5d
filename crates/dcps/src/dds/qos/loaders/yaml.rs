// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! YAML QoS profile loader.
//!
//! # Example YAML
//!
//! ```yaml
//! # workers_qos.yaml
//! default_profile: liveliness_reader
//! profiles:
//!   liveliness_reader:
//!     reliability: RELIABLE
//!     liveliness:
//!       kind: MANUAL_BY_TOPIC
//!       lease_duration: { sec: 2, nanosec: 0 }
//!     time_based_filter:
//!       minimum_separation_ms: 250
//!
//!   telemetry:
//!     reliability: BEST_EFFORT
//!     history:
//!       kind: KEEP_LAST
//!       depth: 4
//! ```
//!
//! A profile only overrides what it names; everything else keeps the value
//! of the record it is applied to. Values go through the same option codec
//! as `QosRecord::set_option`, so a profile accepts exactly what the option
//! table accepts.

use crate::config::qos as names;
use crate::dds::qos::{format_duration, DataReaderQos, DataWriterQos, QosRecord, TopicQos};
use crate::dds::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// YAML QoS profile loader.
pub struct YamlLoader;

/// Root YAML document structure.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct YamlQosDocument {
    /// Named QoS profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, YamlQosProfile>,

    /// Profile used by [`YamlLoader::get_default_profile`].
    #[serde(default)]
    pub default_profile: Option<String>,
}

/// A single QoS profile in YAML format.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct YamlQosProfile {
    /// RELIABLE or BEST_EFFORT
    pub reliability: Option<String>,
    /// VOLATILE or TRANSIENT_LOCAL
    pub durability: Option<String>,
    pub history: Option<YamlHistory>,
    pub liveliness: Option<YamlLiveliness>,
    /// Reader only; ignored when building topic or writer QoS.
    pub time_based_filter: Option<YamlTimeBasedFilter>,
    pub resource_limits: Option<YamlResourceLimits>,
}

/// `{ sec, nanosec }` duration, as DDS writes it.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct YamlDuration {
    pub sec: u64,
    #[serde(default)]
    pub nanosec: u32,
}

impl YamlDuration {
    fn to_duration(self, field: &str) -> Result<Duration> {
        if self.nanosec >= 1_000_000_000 {
            return Err(Error::InvalidQos(format!(
                "{}.nanosec must be below 1e9 (got {})",
                field, self.nanosec
            )));
        }
        Ok(Duration::new(self.sec, self.nanosec))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct YamlHistory {
    /// KEEP_LAST or KEEP_ALL
    pub kind: String,
    /// Depth for KEEP_LAST
    #[serde(default = "default_history_depth")]
    pub depth: u32,
}

fn default_history_depth() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct YamlLiveliness {
    /// AUTOMATIC, MANUAL_BY_PARTICIPANT, or MANUAL_BY_TOPIC
    pub kind: String,
    #[serde(default)]
    pub lease_duration_ms: Option<u64>,
    #[serde(default)]
    pub lease_duration: Option<YamlDuration>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct YamlTimeBasedFilter {
    #[serde(default)]
    pub minimum_separation_ms: Option<u64>,
    #[serde(default)]
    pub minimum_separation: Option<YamlDuration>,
}

/// Resource limits; `-1` means UNLIMITED.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct YamlResourceLimits {
    pub max_samples: Option<i64>,
    pub max_instances: Option<i64>,
    pub max_samples_per_instance: Option<i64>,
}

/// Pick the single duration a field was written with.
fn one_duration(
    field: &str,
    millis: Option<u64>,
    split: Option<YamlDuration>,
) -> Result<Option<Duration>> {
    match (millis, split) {
        (Some(_), Some(_)) => Err(Error::InvalidQos(format!(
            "{}: give either the _ms form or the {{sec, nanosec}} form",
            field
        ))),
        (Some(ms), None) => Ok(Some(Duration::from_millis(ms))),
        (None, Some(d)) => d.to_duration(field).map(Some),
        (None, None) => Ok(None),
    }
}

fn count(value: i64) -> String {
    if value < 0 {
        names::UNLIMITED.to_string()
    } else {
        value.to_string()
    }
}

impl YamlQosProfile {
    /// Topic-scope options named by the profile, in application order.
    fn shared_options(&self) -> Result<Vec<(&'static str, String)>> {
        let mut options = Vec::new();
        if let Some(ref kind) = self.reliability {
            options.push((names::RELIABILITY_KIND, kind.clone()));
        }
        if let Some(ref kind) = self.durability {
            options.push((names::DURABILITY_KIND, kind.clone()));
        }
        if let Some(ref history) = self.history {
            options.push((names::HISTORY_KIND, history.kind.clone()));
            if history.kind.trim().eq_ignore_ascii_case(names::KEEP_LAST) {
                options.push((names::HISTORY_DEPTH, history.depth.to_string()));
            }
        }
        if let Some(ref liveliness) = self.liveliness {
            options.push((names::LIVELINESS_KIND, liveliness.kind.clone()));
            let lease = one_duration(
                "liveliness.lease_duration",
                liveliness.lease_duration_ms,
                liveliness.lease_duration,
            )?;
            if let Some(lease) = lease {
                options.push((names::LIVELINESS_LEASE_DURATION, format_duration(lease)));
            }
        }
        if let Some(ref limits) = self.resource_limits {
            if let Some(n) = limits.max_samples {
                options.push((names::RESOURCE_LIMITS_MAX_SAMPLES, count(n)));
            }
            if let Some(n) = limits.max_instances {
                options.push((names::RESOURCE_LIMITS_MAX_INSTANCES, count(n)));
            }
            if let Some(n) = limits.max_samples_per_instance {
                options.push((names::RESOURCE_LIMITS_MAX_SAMPLES_PER_INSTANCE, count(n)));
            }
        }
        Ok(options)
    }

    fn apply<R: QosRecord>(options: &[(&'static str, String)], record: &mut R) -> Result<()> {
        for (name, value) in options {
            record.set_option(name, value)?;
        }
        record.validate()
    }

    pub fn apply_to_topic(&self, qos: &mut TopicQos) -> Result<()> {
        Self::apply(&self.shared_options()?, qos)
    }

    pub fn apply_to_writer(&self, qos: &mut DataWriterQos) -> Result<()> {
        Self::apply(&self.shared_options()?, qos)
    }

    pub fn apply_to_reader(&self, qos: &mut DataReaderQos) -> Result<()> {
        let mut options = self.shared_options()?;
        if let Some(ref tbf) = self.time_based_filter {
            let separation = one_duration(
                "time_based_filter.minimum_separation",
                tbf.minimum_separation_ms,
                tbf.minimum_separation,
            )?;
            if let Some(separation) = separation {
                options.push((
                    names::TIME_BASED_FILTER_MINIMUM_SEPARATION,
                    format_duration(separation),
                ));
            }
        }
        Self::apply(&options, qos)
    }

    /// Profile applied to the default topic QoS.
    pub fn topic_qos(&self) -> Result<TopicQos> {
        let mut qos = TopicQos::default();
        self.apply_to_topic(&mut qos)?;
        Ok(qos)
    }

    /// Profile applied to the default writer QoS.
    pub fn writer_qos(&self) -> Result<DataWriterQos> {
        let mut qos = DataWriterQos::default();
        self.apply_to_writer(&mut qos)?;
        Ok(qos)
    }

    /// Profile applied to the default reader QoS.
    pub fn reader_qos(&self) -> Result<DataReaderQos> {
        let mut qos = DataReaderQos::default();
        self.apply_to_reader(&mut qos)?;
        Ok(qos)
    }
}

impl YamlLoader {
    /// Load a QoS document from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<YamlQosDocument> {
        let path = path.as_ref();
        let yaml_content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::ConfigFileNotFound(path.display().to_string())
            } else {
                Error::IoError(e)
            }
        })?;
        log::debug!("[qos] loading profiles from {}", path.display());
        Self::parse_yaml(&yaml_content)
    }

    /// Parse a QoS document. Unknown keys are rejected.
    pub fn parse_yaml(yaml_content: &str) -> Result<YamlQosDocument> {
        serde_yaml::from_str(yaml_content)
            .map_err(|e| Error::InvalidQos(format!("Failed to parse YAML: {}", e)))
    }

    pub fn get_profile<'a>(doc: &'a YamlQosDocument, name: &str) -> Result<&'a YamlQosProfile> {
        doc.profiles
            .get(name)
            .ok_or_else(|| Error::InvalidQos(format!("Profile '{}' not found", name)))
    }

    /// The `default_profile`, else the only profile of the document.
    pub fn get_default_profile(doc: &YamlQosDocument) -> Result<&YamlQosProfile> {
        if let Some(ref default_name) = doc.default_profile {
            return Self::get_profile(doc, default_name);
        }
        match doc.profiles.len() {
            1 => doc
                .profiles
                .values()
                .next()
                .ok_or_else(|| Error::InvalidQos("empty QoS document".into())),
            0 => Err(Error::InvalidQos("no QoS profile defined".into())),
            n => Err(Error::InvalidQos(format!(
                "{} profiles and no default_profile",
                n
            ))),
        }
    }
}
