// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-reader dispatch thread.
//!
//! Serializes listener callbacks of one reader and drives its timers
//! (liveliness lease expiry, time-based-filter flushes). Events are status
//! bits accumulated in an atomic mask; the channel only carries wake-ups, so
//! a burst of arrivals costs one callback, not one per sample.
//!
//! The thread holds a `Weak` to its reader and exits when the reader is
//! dropped or deleted.

use crate::config::DISPATCH_IDLE_TICK;
use crate::dds::StatusMask;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Work the dispatch thread performs on behalf of its reader.
pub(crate) trait DispatchTarget: Send + Sync + 'static {
    /// Invoke listener callbacks for the statuses in `mask`.
    fn on_status(self: &Arc<Self>, mask: StatusMask);

    /// Run due timers; returns the next instant a timer needs to run.
    fn on_timer(&self, now: Instant) -> Option<Instant>;
}

enum DispatchMsg {
    Wake,
    Shutdown,
}

pub(crate) struct Dispatcher {
    tx: Sender<DispatchMsg>,
    pending: Arc<AtomicU32>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Dispatcher {
    pub(crate) fn spawn<H: DispatchTarget>(target: Weak<H>, name: String) -> io::Result<Self> {
        let (tx, rx) = channel::unbounded();
        let pending = Arc::new(AtomicU32::new(0));
        let thread_pending = Arc::clone(&pending);
        let handle = thread::Builder::new()
            .name(name)
            .spawn(move || run(target, rx, thread_pending))?;

        Ok(Self {
            tx,
            pending,
            thread: Mutex::new(Some(handle)),
        })
    }

    /// Queue listener dispatch for `mask`.
    pub(crate) fn notify(&self, mask: StatusMask) {
        let prev = self.pending.fetch_or(mask.bits(), Ordering::AcqRel);
        if prev & mask.bits() != mask.bits() {
            let _ = self.tx.send(DispatchMsg::Wake);
        }
    }

    /// Ask the thread to recompute its next timer deadline.
    pub(crate) fn reschedule(&self) {
        let _ = self.tx.send(DispatchMsg::Wake);
    }

    /// Stop the thread. Joins it unless called from the thread itself
    /// (a listener deleting its own reader).
    pub(crate) fn shutdown(&self) {
        let _ = self.tx.send(DispatchMsg::Shutdown);
        let Some(handle) = self.thread.lock().take() else {
            return;
        };
        if handle.thread().id() == thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            log::error!("[reader] dispatch thread panicked");
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        // Detach; the thread sees the closed channel on its next receive.
        let _ = self.tx.send(DispatchMsg::Shutdown);
    }
}

fn run<H: DispatchTarget>(target: Weak<H>, rx: Receiver<DispatchMsg>, pending: Arc<AtomicU32>) {
    let mut next_timer: Option<Instant> = None;
    loop {
        let idle = Instant::now() + DISPATCH_IDLE_TICK;
        let deadline = next_timer.map_or(idle, |t| t.min(idle));
        match rx.recv_deadline(deadline) {
            Ok(DispatchMsg::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
            Ok(DispatchMsg::Wake) | Err(RecvTimeoutError::Timeout) => {}
        }

        let Some(target) = target.upgrade() else {
            break;
        };

        let bits = pending.swap(0, Ordering::AcqRel);
        if bits != 0 {
            let mask = StatusMask::from_bits(bits);
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| target.on_status(mask)));
            if outcome.is_err() {
                log::error!("[reader] listener panicked while handling {:?}", mask);
            }
        }
        next_timer = target.on_timer(Instant::now());
    }
    log::debug!("[reader] dispatch thread exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        statuses: Mutex<Vec<StatusMask>>,
        timer_runs: AtomicUsize,
        fire_at: Mutex<Option<Instant>>,
    }

    impl DispatchTarget for Recorder {
        fn on_status(self: &Arc<Self>, mask: StatusMask) {
            self.statuses.lock().push(mask);
        }

        fn on_timer(&self, now: Instant) -> Option<Instant> {
            let mut fire_at = self.fire_at.lock();
            if matches!(*fire_at, Some(t) if now >= t) {
                *fire_at = None;
                self.timer_runs.fetch_add(1, Ordering::SeqCst);
            }
            *fire_at
        }
    }

    fn eventually(mut f: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if f() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn status_bits_reach_target() {
        let target = Arc::new(Recorder::default());
        let dispatcher =
            Dispatcher::spawn(Arc::downgrade(&target), "test-dispatch".into()).expect("spawn");

        dispatcher.notify(StatusMask::DATA_AVAILABLE);
        assert!(eventually(|| !target.statuses.lock().is_empty()));
        assert!(target.statuses.lock()[0].contains(StatusMask::DATA_AVAILABLE));
        dispatcher.shutdown();
    }

    #[test]
    fn timer_fires_at_requested_instant() {
        let target = Arc::new(Recorder::default());
        *target.fire_at.lock() = Some(Instant::now() + Duration::from_millis(50));
        let dispatcher =
            Dispatcher::spawn(Arc::downgrade(&target), "test-timer".into()).expect("spawn");
        dispatcher.reschedule();

        assert!(eventually(|| target.timer_runs.load(Ordering::SeqCst) == 1));
        dispatcher.shutdown();
    }

    #[test]
    fn thread_exits_when_target_dropped() {
        let target = Arc::new(Recorder::default());
        let dispatcher =
            Dispatcher::spawn(Arc::downgrade(&target), "test-exit".into()).expect("spawn");
        drop(target);
        dispatcher.reschedule();
        // Join returns once the thread noticed the reader is gone.
        dispatcher.shutdown();
        assert!(dispatcher.thread.lock().is_none());
    }
}
