// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # Workers Sample: Liveliness Subscriber
//!
//! Requests MANUAL_BY_TOPIC liveliness with a 2 s lease. The listener only
//! reports liveliness changes; samples are taken by polling from the main
//! thread, sleeping between empty takes.
//!
//! ## Running the Sample
//!
//! ```bash
//! # Terminal 1
//! cargo run --bin workers_sub_liveliness
//!
//! # Terminal 2 - the writer must offer at least MANUAL_BY_TOPIC
//! cargo run --bin workers_pub -- --liveliness manual-by-topic --lease-ms 2000
//! ```
//!
//! Stop the publisher and, one lease later, the listener prints
//! `liveness changed! 0 1`.

use clap::Parser;
use dcps::qos::liveliness::Liveliness;
use dcps::{DataReader, DataReaderListener, LivelinessChangedStatus, StatusMask, StopToken};
use dcps_samples_workers::cli::{CommonArgs, FilterArgs};
use dcps_samples_workers::{
    loop_timing, millis_or, on_ctrl_c, shutdown, take_and_print, SubscriberSide, Worker,
    WorkersError, SHUTDOWN_LINGER,
};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "workers_sub_liveliness")]
#[command(version, about = "Report writer liveliness while polling Worker samples")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    filter: FilterArgs,

    /// MANUAL_BY_TOPIC lease duration in milliseconds
    #[arg(long, default_value_t = 2000)]
    lease_ms: u64,

    /// Sleep between empty takes in milliseconds [default: runtime poll interval, 1000]
    #[arg(long)]
    poll_ms: Option<u64>,
}

struct LivelinessReporter;

impl DataReaderListener<Worker> for LivelinessReporter {
    fn on_liveliness_changed(&self, _reader: &DataReader<Worker>, status: LivelinessChangedStatus) {
        println!(
            "liveness changed! {} {}",
            status.alive_count, status.not_alive_count
        );
    }
}

fn run(args: &Args) -> Result<(), WorkersError> {
    let mut options = args.common.endpoint_options();
    options.liveliness = Some(Liveliness::manual_topic_millis(args.lease_ms));
    options.time_based_filter = args.filter.policy();
    let side = SubscriberSide::bootstrap(
        &options,
        Some(Arc::new(LivelinessReporter)),
        StatusMask::LIVELINESS_CHANGED,
    )?;

    let stop = StopToken::new();
    let handler_stop = stop.clone();
    on_ctrl_c(move || handler_stop.stop());

    let poll = millis_or(args.poll_ms, loop_timing().poll_interval);
    while !stop.is_stopped() {
        match take_and_print(&side.reader, true) {
            Ok(0) => {
                stop.wait_timeout(poll);
            }
            Ok(_) => {}
            Err(e) => {
                log::warn!("[workers_sub_liveliness] take: {}", e);
                stop.wait_timeout(poll);
            }
        }
    }

    side.close();
    shutdown(SHUTDOWN_LINGER);
    Ok(())
}

fn main() {
    dcps_samples_workers::init_logging();
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("workers_sub_liveliness: {}", e);
        std::process::exit(e.exit_code());
    }
}
