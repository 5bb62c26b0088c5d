// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use std::time::{Duration, Instant};

/// TIME_BASED_FILTER QoS policy.
///
/// Requested by a reader: per instance, at most one sample is surfaced per
/// `minimum_separation`. The default (zero) separation surfaces every
/// sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeBasedFilter {
    pub minimum_separation: Duration,
}

impl TimeBasedFilter {
    #[must_use]
    pub fn new(minimum_separation: Duration) -> Self {
        Self { minimum_separation }
    }

    /// No throttling.
    #[must_use]
    pub fn zero() -> Self {
        Self::default()
    }

    /// ```
    /// use dcps::qos::time_based_filter::TimeBasedFilter;
    ///
    /// let filter = TimeBasedFilter::from_millis(250);
    /// assert_eq!(filter.minimum_separation.as_millis(), 250);
    /// ```
    #[must_use]
    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.minimum_separation.is_zero()
    }

    /// Whether a sample may be surfaced at `now`, given the instant the
    /// instance last surfaced one.
    #[must_use]
    pub fn admits(&self, last_delivered: Option<Instant>, now: Instant) -> bool {
        match last_delivered {
            Some(last) if !self.is_disabled() => {
                now.saturating_duration_since(last) >= self.minimum_separation
            }
            _ => true,
        }
    }

    /// First instant after `last_delivered` at which a sample is admitted.
    ///
    /// `None` when the separation overflows the clock.
    #[must_use]
    pub fn window_end(&self, last_delivered: Instant) -> Option<Instant> {
        last_delivered.checked_add(self.minimum_separation)
    }
}
