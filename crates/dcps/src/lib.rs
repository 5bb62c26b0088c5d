// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # dcps - in-process DDS data-delivery and notification core
//!
//! Participants create topics, publishers and subscribers bind writers and
//! readers to those topics, and samples flow from writer to reader under QoS
//! control. The interesting part lives on the reader side: a fixed-capacity,
//! loaned sample buffer, two notification strategies (listener callbacks and
//! WaitSet/Condition blocking) and the liveliness accounting that reports
//! writer health.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dcps::prelude::*;
//!
//! #[derive(Clone)]
//! struct Temperature { celsius: f32 }
//!
//! impl DDS for Temperature {
//!     fn type_name() -> &'static str { "Temperature" }
//! }
//!
//! fn main() -> dcps::Result<()> {
//!     let factory = DomainParticipantFactory::get_instance().ok_or(dcps::Error::NotEnabled)?;
//!     let qos = factory.get_default_participant_qos()?;
//!     let participant = factory.create_participant(0, &qos)?;
//!     participant.register_type::<Temperature>("Temperature")?;
//!
//!     let topic_qos = participant.get_default_topic_qos()?;
//!     let topic = participant.create_topic::<Temperature>("sensors", "Temperature", &topic_qos)?;
//!
//!     let subscriber = participant.create_subscriber(&participant.get_default_subscriber_qos()?)?;
//!     let mut reader_qos = subscriber.get_default_datareader_qos()?;
//!     subscriber.copy_from_topic_qos(&mut reader_qos, &topic_qos)?;
//!     let reader = subscriber.create_datareader(&topic, &reader_qos, None, StatusMask::NONE)?;
//!
//!     if let Some(loan) = reader.take(8, SampleStateMask::ANY, ViewStateMask::ANY, InstanceStateMask::ANY)? {
//!         for sample in loan.iter() {
//!             if let Some(t) = sample.data() {
//!                 println!("{}", t.celsius);
//!             }
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                         Application Layer                          |
//! |   Participant -> Publisher/Subscriber -> DataWriter/DataReader     |
//! +---------------------------------------------------------------------+
//! |                      Delivery / Notification                        |
//! |   Loaned sample buffer | Listener dispatch | WaitSet + Conditions   |
//! +---------------------------------------------------------------------+
//! |                        QoS / Liveliness                             |
//! |   Policy records | Liveliness tracker | Time-based filter           |
//! +---------------------------------------------------------------------+
//! |                    In-process matching registry                     |
//! +---------------------------------------------------------------------+
//! ```
//!
//! There is no wire transport: writers and readers match when they live in
//! the same process, share a domain id and agree on (topic, type name).

/// Runtime configuration: defaults, loop timing and the QoS option store.
pub mod config;
/// Internal runtime primitives (waitset driver, identifiers).
pub mod core;
/// Core DDS API (start here).
pub mod dds;
/// Quality of Service policies.
pub mod qos;

pub use dds::{
    prelude, Condition, DataReader, DataReaderListener, DataWriter, DataWriterListener,
    DomainParticipant, DomainParticipantFactory, Error, GuardCondition, InstanceHandle,
    InstanceStateMask, LivelinessChangedStatus, Publisher, PublishLoop, QueryCondition,
    ReadCondition, Result, SampleInfo, SampleLoan, SampleStateMask, StatusCondition, StatusMask,
    StopToken, Subscriber, Topic, TypeSupport, ViewStateMask, WaitOutcome, WaitSet, DDS,
};
