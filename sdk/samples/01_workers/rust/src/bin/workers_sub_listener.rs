// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # Workers Sample: Listener Subscriber
//!
//! Samples are taken and printed from `on_data_available`, on the reader's
//! dispatch thread. The main thread only waits for Enter or Ctrl-C.
//!
//! ## Running the Sample
//!
//! ```bash
//! # Terminal 1
//! cargo run --bin workers_sub_listener
//!
//! # Terminal 2
//! cargo run --bin workers_pub
//! ```

use clap::Parser;
use dcps::{DataReader, DataReaderListener, StatusMask, StopToken};
use dcps_samples_workers::cli::{CommonArgs, FilterArgs};
use dcps_samples_workers::{
    on_ctrl_c, shutdown, take_and_print, SubscriberSide, Worker, WorkersError, SHUTDOWN_LINGER,
};
use std::io::BufRead;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "workers_sub_listener")]
#[command(version, about = "Receive Worker samples through a DataReader listener")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    filter: FilterArgs,
}

struct PrintingListener;

impl DataReaderListener<Worker> for PrintingListener {
    fn on_data_available(&self, reader: &DataReader<Worker>) {
        if let Err(e) = take_and_print(reader, false) {
            log::warn!("[workers_sub_listener] take: {}", e);
        }
    }
}

fn run(args: &Args) -> Result<(), WorkersError> {
    let mut options = args.common.endpoint_options();
    options.time_based_filter = args.filter.policy();
    let side = SubscriberSide::bootstrap(
        &options,
        Some(Arc::new(PrintingListener)),
        StatusMask::DATA_AVAILABLE,
    )?;

    let stop = StopToken::new();
    let handler_stop = stop.clone();
    on_ctrl_c(move || handler_stop.stop());

    // Enter also stops; the reader thread is left behind on exit.
    let enter_stop = stop.clone();
    let spawned = thread::Builder::new()
        .name("workers-stdin".into())
        .spawn(move || {
            let mut line = String::new();
            if let Err(e) = std::io::stdin().lock().read_line(&mut line) {
                log::debug!("[workers_sub_listener] stdin: {}", e);
            }
            enter_stop.stop();
        });
    if let Err(e) = spawned {
        log::warn!("[workers_sub_listener] stdin watcher not started: {}", e);
    }

    println!("Press Enter to exit");
    while !stop.wait_timeout(Duration::from_secs(3600)) {}

    side.close();
    shutdown(SHUTDOWN_LINGER);
    Ok(())
}

fn main() {
    dcps_samples_workers::init_logging();
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("workers_sub_listener: {}", e);
        std::process::exit(e.exit_code());
    }
}
