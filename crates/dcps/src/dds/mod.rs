// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # DDS Core API
//!
//! Entity graph, sample delivery and notification primitives.
//!
//! ## Entity Hierarchy
//!
//! ```text
//! DomainParticipantFactory
//! +-- DomainParticipant
//!     +-- Topic<T>
//!     +-- Publisher
//!     |   +-- DataWriter<T>  ------> Topic<T>
//!     +-- Subscriber
//!         +-- DataReader<T>  <------ Topic<T>
//!             +-- ReadCondition / QueryCondition
//! ```
//!
//! Every creation step returns a `Result` and can fail on its own. Children
//! are registered with their parent, so `delete_contained_entities()` and
//! `DomainParticipantFactory::shutdown()` tear the graph down in reverse
//! order.
//!
//! ## Notification
//!
//! A reader reports changes through two independent channels fed by the same
//! events:
//!
//! - a [`DataReaderListener`] invoked on the reader's dispatch thread;
//! - [`Condition`]s attached to a [`WaitSet`] and polled with `wait()`.

mod condition;
mod domain_registry;
/// Listener traits and communication status records.
pub mod listener;
mod participant;
/// Prelude module for convenient imports.
pub mod prelude;
mod publisher;
/// Per-entity QoS records and loaders.
pub mod qos;
mod read_condition;
mod reader;
mod subscriber;
mod topic;
mod waitset;
mod writer;

pub use condition::{Condition, GuardCondition, StatusCondition, StatusMask};
pub use domain_registry::{DomainId, MatchKey, TypeId};
pub use listener::{
    ClosureListener, DataReaderListener, DataWriterListener, LivelinessChangedStatus,
    OfferedIncompatibleQosStatus, PublicationMatchedStatus, QosPolicyId,
    RequestedIncompatibleQosStatus, SampleRejectedReason, SampleRejectedStatus,
    SubscriptionMatchedStatus,
};
pub use participant::{DomainParticipant, DomainParticipantFactory, TypeSupport};
pub use publisher::Publisher;
pub use read_condition::{
    InstanceStateMask, QueryCondition, ReadCondition, SampleCondition, SampleStateMask,
    StateMasks, ViewStateMask,
};
pub use reader::{
    DataReader, InstanceHandle, InstanceState, LoanedSample, SampleInfo, SampleInfoSeq,
    SampleLoan, SampleSeq, SampleState, ViewState,
};
pub use subscriber::Subscriber;
pub use topic::Topic;
pub use waitset::{WaitOutcome, WaitSet, WaitSetState};
pub use writer::{DataWriter, LoopReport, PublishLoop, StopToken};

/// Errors returned by DDS operations.
///
/// `NoData` and wait timeouts are deliberately absent: `take()` reports an
/// empty result as `Ok(None)` and `WaitSet::wait()` as
/// `Ok(WaitOutcome::TimedOut)`.
///
/// # Example
///
/// ```rust,no_run
/// use dcps::{DomainParticipantFactory, Error};
///
/// let factory = DomainParticipantFactory::get_instance().ok_or(Error::NotEnabled)?;
/// let qos = factory.get_default_participant_qos()?;
/// match factory.create_participant(999, &qos) {
///     Err(Error::InvalidDomainId(id)) => println!("Bad domain: {}", id),
///     Err(e) => println!("Other error: {}", e),
///     Ok(_) => println!("Success"),
/// }
/// # Ok::<(), dcps::Error>(())
/// ```
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Generic configuration error (prefer specific variants below).
    Config,
    /// QoS policy value is invalid or inconsistent.
    InvalidQos(String),
    /// Option name not recognized for this entity kind.
    UnknownQosOption {
        /// Entity kind the option was applied to.
        entity: &'static str,
        /// The rejected option name.
        option: String,
    },
    /// Configuration file not found at specified path.
    ConfigFileNotFound(String),

    // ========================================================================
    // Entity Errors
    // ========================================================================
    /// Domain ID out of range (0-232).
    InvalidDomainId(u32),
    /// Entity used after it was deleted.
    AlreadyDeleted,
    /// Factory shut down or entity not enabled.
    NotEnabled,
    /// Argument rejected (empty name, foreign entity, zero capacity, ...).
    BadParameter(String),
    /// Operation not allowed in the current state (outstanding loan,
    /// attached condition, entity still owning children, ...).
    PreconditionNotMet(String),
    /// Type name not registered with the participant.
    TypeNotRegistered(String),
    /// Type name already bound to a different Rust type.
    TypeMismatch(String),
    /// Invalid state for the requested operation.
    InvalidState(String),

    // ========================================================================
    // Data Errors
    // ========================================================================
    /// QoS policies are incompatible between endpoints.
    QosIncompatible,

    // ========================================================================
    // Resource Errors
    // ========================================================================
    /// Matched reader is full; retrying later may succeed.
    WouldBlock,
    /// Resource limit exceeded (history depth, buffer capacity, ...).
    ResourceLimitExceeded(String),
    /// Allocation of a fixed-capacity buffer failed.
    OutOfMemory,
    /// Blocking operation exceeded its bound.
    Timeout,

    // ========================================================================
    // Other Errors
    // ========================================================================
    /// Requested feature or operation is not supported.
    Unsupported,
    /// I/O error with underlying cause.
    IoError(std::io::Error),
}

impl Error {
    /// Whether retrying the same operation later may succeed.
    ///
    /// Writer loops back off and retry on transient errors and surface every
    /// other error to the caller.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::WouldBlock | Error::Timeout)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // Configuration
            Error::Config => write!(f, "Configuration error"),
            Error::InvalidQos(msg) => write!(f, "Invalid QoS: {}", msg),
            Error::UnknownQosOption { entity, option } => {
                write!(f, "Unknown QoS option '{}' for {}", option, entity)
            }
            Error::ConfigFileNotFound(path) => write!(f, "Config file not found: {}", path),
            // Entity
            Error::InvalidDomainId(id) => write!(f, "Invalid domain_id: {} (must be 0-232)", id),
            Error::AlreadyDeleted => write!(f, "Entity already deleted"),
            Error::NotEnabled => write!(f, "Entity not enabled"),
            Error::BadParameter(msg) => write!(f, "Bad parameter: {}", msg),
            Error::PreconditionNotMet(msg) => write!(f, "Precondition not met: {}", msg),
            Error::TypeNotRegistered(name) => write!(f, "Type not registered: {}", name),
            Error::TypeMismatch(name) => write!(f, "Type mismatch for '{}'", name),
            Error::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            // Data
            Error::QosIncompatible => write!(f, "QoS incompatible"),
            // Resource
            Error::WouldBlock => write!(f, "Operation would block"),
            Error::ResourceLimitExceeded(msg) => write!(f, "Resource limit exceeded: {}", msg),
            Error::OutOfMemory => write!(f, "Out of memory"),
            Error::Timeout => write!(f, "Timeout"),
            // Other
            Error::Unsupported => write!(f, "Unsupported operation"),
            Error::IoError(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::IoError(e)
    }
}

/// Convenient alias for API results using the public `Error` type.
pub type Result<T> = core::result::Result<T, Error>;

/// Contract for topic payload types.
///
/// The core never serializes samples; each matched reader receives a clone.
pub trait DDS: Clone + Send + Sync + 'static {
    /// Type schema name used for topic matching (e.g. `"Worker::Msg"`).
    fn type_name() -> &'static str;

    /// Compute instance key hash from key fields (16 bytes).
    ///
    /// Returns zeroed hash (no key fields) by default, which puts every
    /// sample of the topic in a single instance.
    fn compute_key(&self) -> [u8; 16] {
        [0u8; 16]
    }

    /// Returns true if this type has key fields.
    #[must_use]
    fn has_key() -> bool {
        false
    }
}
