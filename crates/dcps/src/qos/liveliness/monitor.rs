// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::{Liveliness, LivelinessKind};
use std::time::{Duration, Instant};

/// Alive/not-alive flip reported by a [`LivelinessMonitor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivenessTransition {
    BecameAlive,
    BecameNotAlive,
}

/// Liveliness monitor tracking one remote writer's lease.
///
/// The `*_at` variants take the current instant explicitly so a single
/// timer pass can evaluate many monitors against the same clock reading.
#[derive(Debug)]
pub struct LivelinessMonitor {
    kind: LivelinessKind,
    lease_duration: Duration,
    last_assert: Instant,
    alive: bool,
}

impl LivelinessMonitor {
    #[must_use]
    pub fn new(kind: LivelinessKind, lease_duration: Duration) -> Self {
        Self {
            kind,
            lease_duration,
            last_assert: Instant::now(),
            alive: true,
        }
    }

    #[must_use]
    pub fn from_policy(policy: &Liveliness) -> Self {
        Self::new(policy.kind, policy.lease_duration)
    }

    /// Record an assertion; reports a transition if the writer was not alive.
    pub fn assert(&mut self) -> Option<LivenessTransition> {
        self.assert_at(Instant::now())
    }

    pub fn assert_at(&mut self, now: Instant) -> Option<LivenessTransition> {
        self.last_assert = now;
        if self.alive {
            None
        } else {
            self.alive = true;
            Some(LivenessTransition::BecameAlive)
        }
    }

    /// Expire the lease if it elapsed; reports the alive -> not-alive flip
    /// exactly once.
    pub fn check(&mut self) -> Option<LivenessTransition> {
        self.check_at(Instant::now())
    }

    pub fn check_at(&mut self, now: Instant) -> Option<LivenessTransition> {
        if !self.alive {
            return None;
        }
        match self.expires_at() {
            Some(deadline) if now >= deadline => {
                self.alive = false;
                Some(LivenessTransition::BecameNotAlive)
            }
            _ => None,
        }
    }

    /// Last state recorded by `assert`/`check`.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    #[must_use]
    pub fn kind(&self) -> LivelinessKind {
        self.kind
    }

    /// Instant at which the current lease runs out, `None` when infinite.
    #[must_use]
    pub fn expires_at(&self) -> Option<Instant> {
        self.last_assert.checked_add(self.lease_duration)
    }

    #[must_use]
    pub fn time_until_expiry(&self) -> Option<Duration> {
        self.expires_at()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    #[must_use]
    pub fn time_since_last_assert(&self) -> Duration {
        self.last_assert.elapsed()
    }
}
