// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Background thread asserting AUTOMATIC writers.
//!
//! The thread sleeps for the shortest assert period (a third of the lease)
//! among the participant's AUTOMATIC writers, capped by
//! [`ASSERTER_IDLE_TICK`] so writers created later are picked up. It exits
//! when the participant context goes away or its wake channel is dropped.

use super::context::ParticipantContext;
use crate::config::ASSERTER_IDLE_TICK;
use crate::qos::liveliness::LivelinessKind;
use crossbeam::channel::{self, RecvTimeoutError};
use std::io;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

pub(crate) fn spawn(ctx: &Arc<ParticipantContext>) -> io::Result<JoinHandle<()>> {
    let (wake_tx, wake_rx) = channel::bounded::<()>(1);
    let weak: Weak<ParticipantContext> = Arc::downgrade(ctx);
    let handle = thread::Builder::new()
        .name(format!("dcps-live-{}", ctx.domain_id()))
        .spawn(move || {
            let mut tick = ASSERTER_IDLE_TICK;
            loop {
                match wake_rx.recv_timeout(tick) {
                    Ok(()) | Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }
                let Some(ctx) = weak.upgrade() else {
                    break;
                };
                let asserted = ctx.assert_writers(LivelinessKind::Automatic);
                tick = ctx
                    .automatic_period()
                    .map_or(ASSERTER_IDLE_TICK, |p| p.min(ASSERTER_IDLE_TICK));
                log::trace!("[asserter] asserted {} writers, next in {:?}", asserted, tick);
            }
            log::debug!("[asserter] stopped");
        })?;
    ctx.set_asserter(wake_tx);
    Ok(handle)
}
