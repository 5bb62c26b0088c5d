// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! DDS Listener Traits
//!
//! Listeners provide callback-based notification for DDS entity events.
//! This is an alternative to the polling-based StatusCondition/WaitSet pattern;
//! both are fed by the same events and can be used together on one reader.
//!
//! # Usage
//!
//! ```rust,no_run
//! use dcps::prelude::*;
//!
//! #[derive(Clone)]
//! struct Temperature { celsius: f32 }
//! impl DDS for Temperature {
//!     fn type_name() -> &'static str { "Temperature" }
//! }
//!
//! struct Printer;
//!
//! impl DataReaderListener<Temperature> for Printer {
//!     fn on_data_available(&self, reader: &DataReader<Temperature>) {
//!         let Ok(Some(loan)) = reader.take(8, SampleStateMask::ANY, ViewStateMask::ANY, InstanceStateMask::ANY) else {
//!             return;
//!         };
//!         for sample in loan.iter() {
//!             if let Some(t) = sample.data() {
//!                 println!("{}", t.celsius);
//!             }
//!         }
//!     }
//! }
//! ```
//!
//! # Thread Safety
//!
//! Reader callbacks run on the reader's dispatch thread, one at a time.
//! Writer callbacks run inline on the thread that caused the match. Both
//! must be `Send + Sync` and should return quickly.
//!
//! # DDS Specification
//!
//! See DDS v1.4 Section 2.2.4 - Listeners, Conditions, and Wait-sets.

use super::reader::{DataReader, InstanceHandle};
use super::writer::DataWriter;
use super::DDS;
use std::fmt;

/// Identifier of a QoS policy, as reported by the incompatible-QoS statuses.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct QosPolicyId(pub u32);

impl QosPolicyId {
    pub const INVALID: QosPolicyId = QosPolicyId(0);
    pub const DURABILITY: QosPolicyId = QosPolicyId(2);
    pub const LIVELINESS: QosPolicyId = QosPolicyId(8);
    pub const TIME_BASED_FILTER: QosPolicyId = QosPolicyId(9);
    pub const PARTITION: QosPolicyId = QosPolicyId(10);
    pub const RELIABILITY: QosPolicyId = QosPolicyId(11);
    pub const HISTORY: QosPolicyId = QosPolicyId(13);
    pub const RESOURCE_LIMITS: QosPolicyId = QosPolicyId(14);

    /// Policy name as used in DDS documentation.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match *self {
            Self::DURABILITY => "DURABILITY",
            Self::LIVELINESS => "LIVELINESS",
            Self::TIME_BASED_FILTER => "TIME_BASED_FILTER",
            Self::PARTITION => "PARTITION",
            Self::RELIABILITY => "RELIABILITY",
            Self::HISTORY => "HISTORY",
            Self::RESOURCE_LIMITS => "RESOURCE_LIMITS",
            _ => "INVALID",
        }
    }
}

impl fmt::Debug for QosPolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.0)
    }
}

/// Status information for subscription matching events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscriptionMatchedStatus {
    /// Total cumulative count of matched publications.
    pub total_count: u32,
    /// Change in total_count since the status was last read.
    pub total_count_change: i32,
    /// Current number of matched publications.
    pub current_count: u32,
    /// Change in current_count since the status was last read.
    pub current_count_change: i32,
    /// Handle of the last matched/unmatched publication.
    pub last_publication_handle: InstanceHandle,
}

/// Status information for publication matching events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublicationMatchedStatus {
    /// Total cumulative count of matched subscriptions.
    pub total_count: u32,
    /// Change in total_count since the status was last read.
    pub total_count_change: i32,
    /// Current number of matched subscriptions.
    pub current_count: u32,
    /// Change in current_count since the status was last read.
    pub current_count_change: i32,
    /// Handle of the last matched/unmatched subscription.
    pub last_subscription_handle: InstanceHandle,
}

/// Status information for liveliness changes.
///
/// `alive_count + not_alive_count` always equals the number of matched
/// writers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LivelinessChangedStatus {
    /// Number of matched publications currently asserting liveliness.
    pub alive_count: u32,
    /// Number of matched publications that have lost liveliness.
    pub not_alive_count: u32,
    /// Change in alive_count since the status was last read.
    pub alive_count_change: i32,
    /// Change in not_alive_count since the status was last read.
    pub not_alive_count_change: i32,
    /// Handle of the last publication whose liveliness changed.
    pub last_publication_handle: InstanceHandle,
}

/// Status information for incompatible QoS on the reader side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestedIncompatibleQosStatus {
    /// Total cumulative count of incompatible writers found.
    pub total_count: u32,
    /// Change in total_count since the status was last read.
    pub total_count_change: i32,
    /// Policy that failed in the last incompatible match.
    pub last_policy_id: QosPolicyId,
}

/// Status information for incompatible QoS on the writer side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OfferedIncompatibleQosStatus {
    /// Total cumulative count of incompatible readers found.
    pub total_count: u32,
    /// Change in total_count since the status was last read.
    pub total_count_change: i32,
    /// Policy that failed in the last incompatible match.
    pub last_policy_id: QosPolicyId,
}

/// Reason why a sample was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleRejectedReason {
    /// Sample was not rejected.
    #[default]
    NotRejected,
    /// Sample rejected due to resource limits (max_samples).
    ResourceLimit,
    /// Sample rejected due to instance limits (max_instances).
    InstanceLimit,
    /// Sample rejected due to samples-per-instance limit.
    SamplesPerInstanceLimit,
}

/// Status information for sample rejected events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleRejectedStatus {
    /// Total cumulative count of rejected samples.
    pub total_count: u32,
    /// Change in total_count since the status was last read.
    pub total_count_change: i32,
    /// Reason for the last rejection.
    pub last_reason: SampleRejectedReason,
    /// Instance of the last rejected sample.
    pub last_instance_handle: InstanceHandle,
}

/// Listener for DataReader events.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about. Callbacks receive the reader so they
/// can `take()` from it; statuses are handed over already read, which
/// resets their `*_change` counters.
pub trait DataReaderListener<T: DDS>: Send + Sync {
    /// Called when new samples (or lifecycle changes) are available.
    fn on_data_available(&self, reader: &DataReader<T>) {
        let _ = reader;
    }

    /// Called when liveliness of a matched writer changes.
    fn on_liveliness_changed(&self, reader: &DataReader<T>, status: LivelinessChangedStatus) {
        let _ = (reader, status);
    }

    /// Called when the reader matches or unmatches with a writer.
    fn on_subscription_matched(&self, reader: &DataReader<T>, status: SubscriptionMatchedStatus) {
        let _ = (reader, status);
    }

    /// Called when a writer on the same topic offers incompatible QoS.
    fn on_requested_incompatible_qos(
        &self,
        reader: &DataReader<T>,
        status: RequestedIncompatibleQosStatus,
    ) {
        let _ = (reader, status);
    }

    /// Called when samples are rejected due to resource limits.
    fn on_sample_rejected(&self, reader: &DataReader<T>, status: SampleRejectedStatus) {
        let _ = (reader, status);
    }
}

/// Listener for DataWriter events.
///
/// All methods have default no-op implementations.
pub trait DataWriterListener<T: DDS>: Send + Sync {
    /// Called when the writer matches or unmatches with a reader.
    fn on_publication_matched(&self, writer: &DataWriter<T>, status: PublicationMatchedStatus) {
        let _ = (writer, status);
    }

    /// Called when a reader on the same topic requests incompatible QoS.
    fn on_offered_incompatible_qos(
        &self,
        writer: &DataWriter<T>,
        status: OfferedIncompatibleQosStatus,
    ) {
        let _ = (writer, status);
    }
}

/// Closure-based listener for simple data callbacks.
///
/// Use this when you only need `on_data_available`.
///
/// ```rust,no_run
/// # use dcps::prelude::*;
/// # use dcps::dds::ClosureListener;
/// # #[derive(Clone)] struct Temperature { celsius: f32 }
/// # impl DDS for Temperature { fn type_name() -> &'static str { "Temperature" } }
/// let listener = ClosureListener::new(|reader: &DataReader<Temperature>| {
///     let _ = reader.take(8, SampleStateMask::ANY, ViewStateMask::ANY, InstanceStateMask::ANY);
/// });
/// ```
pub struct ClosureListener<T: DDS, F: Fn(&DataReader<T>) + Send + Sync> {
    callback: F,
    _phantom: core::marker::PhantomData<fn(&T)>,
}

impl<T: DDS, F: Fn(&DataReader<T>) + Send + Sync> ClosureListener<T, F> {
    /// Create a new closure-based listener.
    pub fn new(callback: F) -> Self {
        Self {
            callback,
            _phantom: core::marker::PhantomData,
        }
    }
}

impl<T: DDS, F: Fn(&DataReader<T>) + Send + Sync> DataReaderListener<T> for ClosureListener<T, F> {
    fn on_data_available(&self, reader: &DataReader<T>) {
        (self.callback)(reader);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_id_names() {
        assert_eq!(QosPolicyId::RELIABILITY.name(), "RELIABILITY");
        assert_eq!(QosPolicyId::LIVELINESS.0, 8);
        assert_eq!(QosPolicyId::default(), QosPolicyId::INVALID);
        assert_eq!(format!("{:?}", QosPolicyId::DURABILITY), "DURABILITY(2)");
    }

    #[test]
    fn test_status_defaults() {
        let status = SubscriptionMatchedStatus::default();
        assert_eq!(status.total_count, 0);
        assert_eq!(status.current_count, 0);
        assert!(status.last_publication_handle.is_nil());

        let liveliness = LivelinessChangedStatus::default();
        assert_eq!(liveliness.alive_count + liveliness.not_alive_count, 0);

        assert_eq!(
            SampleRejectedStatus::default().last_reason,
            SampleRejectedReason::NotRejected
        );
    }
}
