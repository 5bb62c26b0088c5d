// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # DDS DataWriter
//!
//! The [`DataWriter`] publishes typed samples to the readers of the same
//! process that matched it.
//!
//! ## Overview
//!
//! A DataWriter:
//! - Hands each matched reader a clone of every sample (no serialization)
//! - Refuses a write with `WouldBlock` while a RELIABLE reader is full
//! - Keeps a history for late-joining readers (TRANSIENT_LOCAL)
//! - Asserts its liveliness on every write
//!
//! ## Example
//!
//! ```rust,no_run
//! use dcps::prelude::*;
//! # #[derive(Clone)] struct Worker { team: i32 }
//! # impl DDS for Worker { fn type_name() -> &'static str { "Worker::Msg" } }
//!
//! fn publish(writer: &DataWriter<Worker>, stop: &StopToken) -> dcps::Result<()> {
//!     let report = PublishLoop::new(std::time::Duration::from_millis(500))
//!         .run(writer, stop, |n| Worker { team: n as i32 }, |w| println!("pub team {}", w.team))?;
//!     println!("published {}", report.published);
//!     Ok(())
//! }
//! ```
//!
//! ## Delivery Path
//!
//! ```text
//! write() -+-> any RELIABLE reader full? --> Err(WouldBlock)
//!          |
//!          +-> TRANSIENT_LOCAL history (late joiners)
//!          +-> ReaderInner::deliver() for each matched reader
//! ```
//!
//! ## See Also
//!
//! - [`DataReader`](crate::DataReader) - The subscribing counterpart
//! - [DDS Spec Sec.2.2.2.4](https://www.omg.org/spec/DDS/1.4/) - DataWriter

pub(crate) mod endpoint;
mod publish_loop;
mod runtime;

pub use publish_loop::{LoopReport, PublishLoop, StopToken};
pub use runtime::DataWriter;
