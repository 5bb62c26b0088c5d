// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Cancellable periodic publishing.
//!
//! [`PublishLoop`] writes one sample per period until a [`StopToken`] is
//! stopped, retrying transient failures with exponential backoff. The stop
//! token wakes every sleep immediately, so a Ctrl-C handler that calls
//! [`StopToken::stop`] ends the loop within one write.

use super::runtime::DataWriter;
use crate::config::{LoopTiming, RetryBackoff};
use crate::dds::{Result, DDS};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct StopState {
    stopped: Mutex<bool>,
    wake: Condvar,
}

/// Shared cancellation flag with an interruptible sleep.
#[derive(Clone)]
pub struct StopToken {
    state: Arc<StopState>,
}

impl Default for StopToken {
    fn default() -> Self {
        Self::new()
    }
}

impl StopToken {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Arc::new(StopState {
                stopped: Mutex::new(false),
                wake: Condvar::new(),
            }),
        }
    }

    /// Request a stop and wake every sleeper. Idempotent.
    pub fn stop(&self) {
        *self.state.stopped.lock() = true;
        self.state.wake.notify_all();
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        *self.state.stopped.lock()
    }

    /// Sleep up to `timeout`, returning early on [`stop`](Self::stop).
    ///
    /// Returns whether the token is stopped.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut stopped = self.state.stopped.lock();
        while !*stopped {
            match deadline {
                Some(deadline) => {
                    if self.state.wake.wait_until(&mut stopped, deadline).timed_out() {
                        break;
                    }
                }
                None => self.state.wake.wait(&mut stopped),
            }
        }
        *stopped
    }
}

/// Outcome of [`PublishLoop::run`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoopReport {
    /// Samples accepted by the writer.
    pub published: u64,
    /// Transient failures that were retried.
    pub retries: u64,
    /// Whether the loop ended because its token was stopped.
    pub stopped: bool,
}

/// Periodic publisher driving a [`DataWriter`].
#[derive(Clone, Copy, Debug)]
pub struct PublishLoop {
    pub period: Duration,
    pub backoff: RetryBackoff,
    /// Stop after this many samples (`None` runs until stopped).
    pub limit: Option<u64>,
}

impl PublishLoop {
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            backoff: RetryBackoff::default(),
            limit: None,
        }
    }

    /// Period and backoff taken from the runtime loop timing.
    #[must_use]
    pub fn from_timing(timing: &LoopTiming) -> Self {
        Self {
            period: timing.publish_period,
            backoff: timing.retry_backoff,
            limit: None,
        }
    }

    #[must_use]
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn with_backoff(mut self, backoff: RetryBackoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Publish `next_sample(n)` every period until stopped.
    ///
    /// `on_published` runs after each accepted write. A transient error
    /// (`WouldBlock`, `Timeout`) is retried with backoff; once
    /// `backoff.max_attempts` consecutive retries failed, or on any other
    /// error, the loop stops and returns it.
    pub fn run<T, N, P>(
        &self,
        writer: &DataWriter<T>,
        stop: &StopToken,
        mut next_sample: N,
        mut on_published: P,
    ) -> Result<LoopReport>
    where
        T: DDS,
        N: FnMut(u64) -> T,
        P: FnMut(&T),
    {
        let mut report = LoopReport::default();

        while !stop.is_stopped() {
            if self.limit.is_some_and(|limit| report.published >= limit) {
                break;
            }

            let sample = next_sample(report.published);
            let mut attempt = 0u32;
            loop {
                match writer.write(&sample) {
                    Ok(()) => {
                        report.published += 1;
                        on_published(&sample);
                        break;
                    }
                    Err(e) if e.is_transient() && attempt < self.backoff.max_attempts => {
                        attempt += 1;
                        report.retries += 1;
                        let delay = self.backoff.delay(attempt);
                        log::debug!(
                            "[publish-loop] {} on {} (attempt {}), retrying in {:?}",
                            e,
                            writer.get_topic_name(),
                            attempt,
                            delay
                        );
                        if stop.wait_timeout(delay) {
                            report.stopped = true;
                            return Ok(report);
                        }
                    }
                    Err(e) => {
                        log::warn!(
                            "[publish-loop] giving up on {} after {} retries: {}",
                            writer.get_topic_name(),
                            attempt,
                            e
                        );
                        return Err(e);
                    }
                }
            }

            if self.limit.is_some_and(|limit| report.published >= limit) {
                break;
            }
            if stop.wait_timeout(self.period) {
                break;
            }
        }

        report.stopped = stop.is_stopped();
        Ok(report)
    }
}
