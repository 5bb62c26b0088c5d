// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::TimeBasedFilter;
use std::time::Instant;

/// Outcome of offering a sample to a [`TimeBasedFilterCoalescer`].
#[derive(Debug, PartialEq, Eq)]
pub enum Admission<S> {
    /// Deliver now.
    Deliver(S),
    /// Held as the pending sample; surfaced by a later `flush_due`.
    Held,
}

/// Per-instance enforcement of a [`TimeBasedFilter`].
///
/// At most one sample is pending. A newer sample replaces it, so the value
/// surfaced at the next eligible instant is always the latest one written
/// and delivery order follows write order.
#[derive(Debug)]
pub struct TimeBasedFilterCoalescer<S> {
    filter: TimeBasedFilter,
    last_delivered: Option<Instant>,
    pending: Option<S>,
}

impl<S> TimeBasedFilterCoalescer<S> {
    #[must_use]
    pub fn new(filter: TimeBasedFilter) -> Self {
        Self {
            filter,
            last_delivered: None,
            pending: None,
        }
    }

    /// Offer a freshly received sample.
    pub fn offer(&mut self, sample: S, now: Instant) -> Admission<S> {
        if self.is_eligible(now) {
            // A pending sample is older than this one: coalesced away.
            self.pending = None;
            self.last_delivered = Some(now);
            Admission::Deliver(sample)
        } else {
            self.pending = Some(sample);
            Admission::Held
        }
    }

    /// Release the pending sample once its separation has elapsed.
    pub fn flush_due(&mut self, now: Instant) -> Option<S> {
        if self.pending.is_some() && self.is_eligible(now) {
            self.last_delivered = Some(now);
            self.pending.take()
        } else {
            None
        }
    }

    /// Instant at which the pending sample becomes deliverable.
    #[must_use]
    pub fn next_flush(&self) -> Option<Instant> {
        self.pending.as_ref()?;
        match self.last_delivered {
            Some(last) => self.filter.window_end(last),
            None => Some(Instant::now()),
        }
    }

    /// The sample currently held back, if any.
    #[must_use]
    pub fn pending(&self) -> Option<&S> {
        self.pending.as_ref()
    }

    /// Drop the pending sample, if any. Returns whether one was dropped.
    pub fn discard_pending(&mut self) -> bool {
        self.pending.take().is_some()
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Forget the delivery history so the next sample passes immediately.
    pub fn reset(&mut self) {
        self.last_delivered = None;
        self.pending = None;
    }

    fn is_eligible(&self, now: Instant) -> bool {
        self.filter.admits(self.last_delivered, now)
    }
}
