// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types from the DDS API.
//!
//! # Example
//!
//! ```rust,no_run
//! use dcps::dds::prelude::*;
//!
//! let factory = DomainParticipantFactory::get_instance().ok_or(Error::NotEnabled)?;
//! let participant = factory.create_participant(0, &factory.get_default_participant_qos()?)?;
//! # Ok::<(), dcps::Error>(())
//! ```

pub use super::qos::{DataReaderQos, DataWriterQos, QosRecord, TopicQos};
pub use super::{
    Condition, DataReader, DataReaderListener, DataWriter, DataWriterListener, DomainParticipant,
    DomainParticipantFactory, Error, GuardCondition, InstanceStateMask, LivelinessChangedStatus,
    PublishLoop, Publisher, ReadCondition, Result, SampleInfo, SampleStateMask, StatusCondition,
    StatusMask, StopToken, Subscriber, Topic, TypeSupport, ViewStateMask, WaitOutcome, WaitSet,
    DDS,
};
