// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! QoS (Quality of Service) policies shared by every entity record.
//!
//! The per-entity records (`TopicQos`, `DataReaderQos`, ...) live in
//! [`crate::dds::qos`]; this module holds the policies they are built from.
//!
//! # Examples
//!
//! ```no_run
//! use dcps::qos::{History, Reliability, ResourceLimits};
//!
//! let history = History::KeepLast(4);
//! let limits = ResourceLimits {
//!     max_samples: 64,
//!     ..Default::default()
//! };
//! assert!(Reliability::Reliable > Reliability::BestEffort);
//! # let _ = (history, limits);
//! ```

/// Liveliness QoS policy - writer aliveness assertions.
pub mod liveliness;
/// Partition QoS policy - logical data separation.
pub mod partition;
/// Time-based filter QoS policy - minimum sample separation.
pub mod time_based_filter;

use std::time::Duration;

/// Duration value standing for "never expires".
pub const DURATION_INFINITE: Duration = Duration::MAX;

/// Resource limit value standing for "no limit".
pub const LENGTH_UNLIMITED: usize = usize::MAX;

/// Reliability policy
///
/// Ordered so that `offered >= requested` expresses compatibility.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub enum Reliability {
    /// Fire-and-forget: samples a full reader cannot take are rejected.
    #[default]
    BestEffort,
    /// Writers see `WouldBlock` instead of silently losing samples.
    Reliable,
}

/// History policy
///
/// Determines how many samples to keep per instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum History {
    /// Keep last N samples per instance (bounded queue, drops oldest).
    KeepLast(u32),
    /// Keep all samples within `ResourceLimits`.
    KeepAll,
}

impl Default for History {
    fn default() -> Self {
        Self::KeepLast(1)
    }
}

impl History {
    /// Per-instance depth, `None` for KEEP_ALL.
    #[must_use]
    pub fn depth(&self) -> Option<usize> {
        match self {
            History::KeepLast(depth) => Some(*depth as usize),
            History::KeepAll => None,
        }
    }
}

/// Durability policy
///
/// Ordered so that `offered >= requested` expresses compatibility.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub enum Durability {
    /// Samples written before a reader matched are never delivered to it.
    #[default]
    Volatile,
    /// Writer keeps its last `history` samples and replays them to late
    /// joiners.
    TransientLocal,
}

/// Resource limits for readers and writers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResourceLimits {
    /// Maximum total samples across all instances
    pub max_samples: usize,
    /// Maximum instances
    pub max_instances: usize,
    /// Maximum samples per instance
    pub max_samples_per_instance: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_samples: LENGTH_UNLIMITED,
            max_instances: LENGTH_UNLIMITED,
            max_samples_per_instance: LENGTH_UNLIMITED,
        }
    }
}

impl ResourceLimits {
    /// Check internal consistency against a history setting.
    pub fn validate(&self, history: History) -> Result<(), String> {
        if self.max_samples == 0 || self.max_instances == 0 || self.max_samples_per_instance == 0
        {
            return Err("resource limits must be > 0".to_string());
        }
        if self.max_samples_per_instance > self.max_samples {
            return Err(format!(
                "max_samples_per_instance ({}) exceeds max_samples ({})",
                self.max_samples_per_instance, self.max_samples
            ));
        }
        if let History::KeepLast(depth) = history {
            if depth == 0 {
                return Err("History::KeepLast(n) requires n > 0".to_string());
            }
            if (depth as usize) > self.max_samples_per_instance {
                return Err(format!(
                    "history depth ({}) exceeds max_samples_per_instance ({})",
                    depth, self.max_samples_per_instance
                ));
            }
        }
        Ok(())
    }
}

/// USER_DATA QoS policy: opaque bytes attached to a participant.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserData {
    pub value: Vec<u8>,
}
