// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # DDS Participant
//!
//! The [`DomainParticipant`] is the root of the entity graph of one domain
//! and the factory of topics, publishers and subscribers.
//!
//! ## Overview
//!
//! A participant:
//! - Joins a domain through the process-wide [`DomainParticipantFactory`]
//! - Binds type names to Rust sample types
//! - Creates topics, publishers and subscribers, and deletes them in
//!   reverse order
//! - Asserts the liveliness of its AUTOMATIC writers from a background
//!   thread, and of MANUAL_BY_PARTICIPANT writers on request
//!
//! ## Architecture
//!
//! ```text
//! +-----------------------------------------------------+
//! |                 DomainParticipant                   |
//! |  +-------------+  +-------------+  +-------------+ |
//! |  |  Publisher  |  | Subscriber  |  |   Topics    | |
//! |  |  +-------+  |  |  +-------+  |  |             | |
//! |  |  |Writer |  |  |  |Reader |  |  |             | |
//! |  |  +-------+  |  |  +-------+  |  |             | |
//! |  +-------------+  +-------------+  +-------------+ |
//! +-----------------------------------------------------+
//! |  ParticipantContext: GUIDs | domain | asserter      |
//! +-----------------------------------------------------+
//! ```
//!
//! ## See Also
//!
//! - [`DataWriter`](crate::DataWriter) - Publish data samples
//! - [`DataReader`](crate::DataReader) - Subscribe to data samples

mod asserter;
pub(crate) mod context;
mod factory;
mod runtime;
#[cfg(test)]
mod tests;
mod type_support;

pub use factory::DomainParticipantFactory;
pub use runtime::DomainParticipant;
pub use type_support::TypeSupport;
