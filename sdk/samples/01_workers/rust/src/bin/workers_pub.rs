// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # Workers Sample: Publisher
//!
//! Publishes `{name: "ldh", birth: 900811, team: N}` on the `"Workers"`
//! topic, one sample per period, with `team` growing by one per write.
//!
//! ## Running the Sample
//!
//! ```bash
//! # Plain publisher, 500 ms period
//! cargo run --bin workers_pub
//!
//! # Offer MANUAL_BY_TOPIC liveliness to workers_sub_liveliness
//! cargo run --bin workers_pub -- --liveliness manual-by-topic --lease-ms 2000
//! ```
//!
//! Ctrl-C stops the loop; the writer and participant are then deleted and
//! the factory shuts down.

use clap::Parser;
use dcps::{PublishLoop, StopToken};
use dcps_samples_workers::cli::{CommonArgs, LivelinessArgs};
use dcps_samples_workers::{
    loop_timing, millis_or, on_ctrl_c, shutdown, PublisherSide, Worker, WorkersError,
    SHUTDOWN_LINGER,
};

#[derive(Parser, Debug)]
#[command(name = "workers_pub")]
#[command(version, about = "Publish Worker samples on the Workers topic")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    liveliness: LivelinessArgs,

    /// Publish period in milliseconds [default: runtime publish period, 500]
    #[arg(short, long)]
    period_ms: Option<u64>,

    /// Stop after this many samples (0 = until Ctrl-C)
    #[arg(short, long, default_value_t = 0)]
    count: u64,
}

fn run(args: &Args) -> Result<(), WorkersError> {
    let mut options = args.common.endpoint_options();
    options.liveliness = args.liveliness.policy();
    let side = PublisherSide::bootstrap(&options)?;

    let stop = StopToken::new();
    let handler_stop = stop.clone();
    on_ctrl_c(move || handler_stop.stop());

    let mut publish = PublishLoop::from_timing(&loop_timing());
    publish.period = millis_or(args.period_ms, publish.period);
    if args.count > 0 {
        publish = publish.with_limit(args.count);
    }

    let outcome = publish.run(&side.writer, &stop, Worker::nth, |worker| {
        println!("pub {}", worker.team);
    });

    match &outcome {
        Ok(report) => log::info!(
            "[workers_pub] published {} samples ({} retries, stopped: {})",
            report.published,
            report.retries,
            report.stopped
        ),
        Err(e) => log::error!("[workers_pub] {}", e),
    }

    side.close();
    shutdown(SHUTDOWN_LINGER);
    outcome.map(|_| ()).map_err(WorkersError::Publish)
}

fn main() {
    dcps_samples_workers::init_logging();
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("workers_pub: {}", e);
        std::process::exit(e.exit_code());
    }
}
