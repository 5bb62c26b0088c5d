// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # Workers Sample: WaitSet Subscriber
//!
//! Blocks on a WaitSet holding one ReadCondition (any sample, view and
//! instance state) and drains the reader each time the condition triggers.
//!
//! ## Running the Sample
//!
//! ```bash
//! # Terminal 1 - one wait of up to 10 s
//! cargo run --bin workers_sub_waitset
//!
//! # Terminal 1 - keep waiting, 5 cycles of 3 s
//! cargo run --bin workers_sub_waitset -- --cycles 5 --timeout-ms 3000
//!
//! # Terminal 2
//! cargo run --bin workers_pub
//! ```
//!
//! ## Teardown Order
//!
//! ```text
//! detach condition -> delete condition -> drop WaitSet -> linger -> shutdown
//! ```

use clap::Parser;
use dcps::{
    GuardCondition, InstanceStateMask, SampleStateMask, StatusMask, ViewStateMask, WaitOutcome,
    WaitSet,
};
use dcps_samples_workers::cli::{CommonArgs, FilterArgs};
use dcps_samples_workers::{
    loop_timing, millis_or, on_ctrl_c, shutdown, take_and_print, SubscriberSide, WorkersError,
    SHUTDOWN_LINGER,
};

#[derive(Parser, Debug)]
#[command(name = "workers_sub_waitset")]
#[command(version, about = "Receive Worker samples through a WaitSet")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    filter: FilterArgs,

    /// WaitSet timeout per cycle in milliseconds [default: runtime wait timeout, 10000]
    #[arg(short, long)]
    timeout_ms: Option<u64>,

    /// Number of wait cycles (0 = until Ctrl-C)
    #[arg(long, default_value_t = 1)]
    cycles: u64,
}

fn run(args: &Args) -> Result<(), WorkersError> {
    let mut options = args.common.endpoint_options();
    options.time_based_filter = args.filter.policy();
    let side = SubscriberSide::bootstrap(&options, None, StatusMask::NONE)?;

    let waitset = WaitSet::new();
    let condition = match side.reader.create_readcondition(
        SampleStateMask::ANY,
        ViewStateMask::ANY,
        InstanceStateMask::ANY,
    ) {
        Ok(condition) => Some(condition),
        Err(e) => {
            log::error!("[workers_sub_waitset] create_readcondition: {}", e);
            None
        }
    };

    if let Some(condition) = &condition {
        match waitset.attach_condition(condition) {
            Ok(()) => wait_cycles(args, &side, &waitset),
            Err(e) => log::error!("[workers_sub_waitset] attach_condition: {}", e),
        }
    }

    if let Some(condition) = condition {
        if let Err(e) = waitset.detach_condition(&condition) {
            log::debug!("[workers_sub_waitset] detach_condition: {}", e);
        }
        if let Err(e) = side.reader.delete_readcondition(&condition) {
            log::warn!("[workers_sub_waitset] delete_readcondition: {}", e);
        }
    }
    drop(waitset);

    side.close();
    shutdown(SHUTDOWN_LINGER);
    Ok(())
}

fn wait_cycles(args: &Args, side: &SubscriberSide, waitset: &WaitSet) {
    let timeout = millis_or(args.timeout_ms, loop_timing().wait_timeout);

    // Ctrl-C wakes the current wait through a guard condition.
    let interrupt = GuardCondition::new();
    if let Err(e) = waitset.attach_condition(&interrupt) {
        log::warn!("[workers_sub_waitset] interrupt not attached: {}", e);
    }
    let handler_interrupt = interrupt.clone();
    on_ctrl_c(move || handler_interrupt.set_trigger_value(true));

    let mut cycle = 0u64;
    while args.cycles == 0 || cycle < args.cycles {
        cycle += 1;
        match waitset.wait(timeout) {
            Ok(outcome) if outcome.contains(&interrupt) => break,
            Ok(WaitOutcome::Triggered(_)) => {
                if let Err(e) = take_and_print(&side.reader, false) {
                    log::warn!("[workers_sub_waitset] take: {}", e);
                }
            }
            Ok(WaitOutcome::TimedOut) => {
                log::info!("[workers_sub_waitset] no data within {:?}", timeout);
            }
            Ok(WaitOutcome::Interrupted) => break,
            Err(e) => {
                log::error!("[workers_sub_waitset] wait: {}", e);
                break;
            }
        }
    }

    if let Err(e) = waitset.detach_condition(&interrupt) {
        log::debug!("[workers_sub_waitset] detach interrupt: {}", e);
    }
}

fn main() {
    dcps_samples_workers::init_logging();
    let args = Args::parse();

    if let Err(e) = run(&args) {
        eprintln!("workers_sub_waitset: {}", e);
        std::process::exit(e.exit_code());
    }
}
