// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # DDS DataReader
//!
//! The [`DataReader`] receives samples published on a topic by matched
//! writers of the same process and domain.
//!
//! ## Overview
//!
//! A DataReader:
//! - Keeps samples in a per-reader cache governed by HISTORY and
//!   RESOURCE_LIMITS, with per-instance view and instance state
//! - Hands samples out through a fixed-capacity loan buffer
//! - Reports changes to a [`DataReaderListener`](crate::DataReaderListener)
//!   on its own dispatch thread, and to attached WaitSets through its
//!   status condition and read conditions
//! - Tracks the liveliness of every matched writer
//!
//! ## Example
//!
//! ```rust,no_run
//! use dcps::prelude::*;
//! # #[derive(Clone)] struct Worker { team: i32 }
//! # impl DDS for Worker { fn type_name() -> &'static str { "Worker::Msg" } }
//!
//! fn drain(reader: &DataReader<Worker>) -> dcps::Result<()> {
//!     // The loan is returned when it goes out of scope.
//!     if let Some(loan) = reader.take(8, SampleStateMask::ANY, ViewStateMask::ANY, InstanceStateMask::ANY)? {
//!         for sample in loan.iter() {
//!             match sample.data() {
//!                 Some(worker) => println!("team: {}", worker.team),
//!                 None => println!("{:?}", sample.info().instance_state),
//!             }
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## See Also
//!
//! - [`DataWriter`](crate::DataWriter) - The publishing counterpart
//! - [DDS Spec Sec.2.2.2.5](https://www.omg.org/spec/DDS/1.4/) - DataReader

mod cache;
mod dispatch;
pub(crate) mod endpoint;
mod liveliness;
mod loan;
mod runtime;
#[cfg(test)]
mod tests;

pub(crate) use cache::{Change, ChangeKind};
pub use cache::{InstanceHandle, InstanceState, SampleInfo, SampleState, ViewState};
pub use loan::{LoanedSample, SampleInfoSeq, SampleLoan, SampleSeq};
pub use runtime::DataReader;
