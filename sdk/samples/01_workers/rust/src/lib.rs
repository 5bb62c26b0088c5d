// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # Workers samples
//!
//! A publisher and three subscribers exchanging `Worker::Msg` records on the
//! `"Workers"` topic. Each subscriber shows one notification strategy:
//!
//! | Program | Strategy |
//! |---------|----------|
//! | `workers_pub` | periodic publish loop, Ctrl-C to stop |
//! | `workers_sub_waitset` | ReadCondition on a WaitSet |
//! | `workers_sub_listener` | `on_data_available` callback |
//! | `workers_sub_liveliness` | liveliness listener + polling take |
//!
//! Every program runs the same [`bootstrap`] ceremony and exits with the
//! code of the first stage that failed.

pub mod bootstrap;
pub mod cli;
pub mod worker;

pub use bootstrap::{
    BootstrapError, EndpointOptions, PublisherSide, QosFile, Stage, SubscriberSide,
    SAMPLE_CAPACITY,
};
pub use worker::{Worker, TOPIC_NAME, TYPE_NAME};

use dcps::config::LoopTiming;
use dcps::prelude::*;
use std::time::Duration;
use thiserror::Error;

/// Pause before the factory shuts down, leaving in-flight callbacks time to
/// finish.
pub const SHUTDOWN_LINGER: Duration = Duration::from_millis(1500);

/// Failure that ends a Workers program.
#[derive(Debug, Error)]
pub enum WorkersError {
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    #[error("publish loop stopped: {0}")]
    Publish(#[source] dcps::Error),
}

impl WorkersError {
    /// Process exit code for this failure.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            WorkersError::Bootstrap(e) => e.exit_code(),
            WorkersError::Publish(_) => Stage::Publish.exit_code(),
        }
    }
}

/// Initialise `env_logger`; `RUST_LOG` overrides the `warn` default.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        .try_init();
}

/// Loop timing from the factory's runtime configuration, or the built-in
/// defaults once the factory is gone.
#[must_use]
pub fn loop_timing() -> LoopTiming {
    DomainParticipantFactory::get_instance()
        .map(|factory| factory.runtime_config().loop_timing())
        .unwrap_or_default()
}

/// A millisecond flag when given, `fallback` otherwise.
#[must_use]
pub fn millis_or(flag: Option<u64>, fallback: Duration) -> Duration {
    flag.map_or(fallback, Duration::from_millis)
}

/// Sleep for `linger`, then shut the participant factory down.
pub fn shutdown(linger: Duration) {
    std::thread::sleep(linger);
    match DomainParticipantFactory::get_instance() {
        Some(factory) => factory.shutdown(),
        None => log::debug!("[workers] factory already shut down"),
    }
}

/// Take up to [`SAMPLE_CAPACITY`] samples of any state and print them.
///
/// Lifecycle slots carry no payload; they print `invalid data!` when
/// `report_invalid` is set and are skipped otherwise. Returns the number of
/// slots taken, `0` when nothing was available.
pub fn take_and_print(reader: &DataReader<Worker>, report_invalid: bool) -> dcps::Result<usize> {
    let Some(loan) = reader.take(
        SAMPLE_CAPACITY,
        SampleStateMask::ANY,
        ViewStateMask::ANY,
        InstanceStateMask::ANY,
    )?
    else {
        return Ok(0);
    };

    for sample in loan.iter() {
        match sample.data() {
            Some(worker) => println!("{}", worker),
            None if report_invalid => println!("invalid data!"),
            None => {}
        }
    }
    let taken = loan.len();
    loan.return_loan();
    Ok(taken)
}

/// Route Ctrl-C to `on_interrupt`.
///
/// A handler that cannot be installed is logged; the program then only
/// stops on its own terms.
pub fn on_ctrl_c<F>(on_interrupt: F)
where
    F: FnMut() + Send + 'static,
{
    if let Err(e) = ctrlc::set_handler(on_interrupt) {
        log::warn!("[workers] Ctrl-C handler not installed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_overrides_timing_default() {
        let fallback = Duration::from_secs(10);
        assert_eq!(millis_or(None, fallback), fallback);
        assert_eq!(millis_or(Some(250), fallback), Duration::from_millis(250));
    }
}
