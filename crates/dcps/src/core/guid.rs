// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Entity identifiers.
//!
//! A `Guid` is 16 bytes: a 12-byte prefix shared by every entity of one
//! participant, followed by a 4-byte entity id whose last byte encodes the
//! entity kind.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

static NEXT_PARTICIPANT: AtomicU32 = AtomicU32::new(1);

/// Kind byte stored in the last octet of the entity id.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum EntityKind {
    Participant = 0xc1,
    Topic = 0x0a,
    Publisher = 0x08,
    Subscriber = 0x09,
    Writer = 0x03,
    Reader = 0x04,
}

/// Globally unique entity identifier.
///
/// # Display Format
/// Hex with dots: "00.00.1f.a0.00.00.00.01.00.00.00.00.00.00.01.03"
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Guid {
    pub prefix: [u8; 12],
    pub entity_id: [u8; 4],
}

impl Guid {
    /// Allocate a fresh participant prefix (process id + local counter).
    pub fn new_participant_prefix() -> [u8; 12] {
        let mut prefix = [0u8; 12];
        prefix[0..4].copy_from_slice(&std::process::id().to_be_bytes());
        let counter = NEXT_PARTICIPANT.fetch_add(1, Ordering::Relaxed);
        prefix[4..8].copy_from_slice(&counter.to_be_bytes());
        prefix
    }

    /// Build the GUID of entity number `key` of kind `kind` under `prefix`.
    pub fn new(prefix: [u8; 12], key: u32, kind: EntityKind) -> Self {
        let key_bytes = key.to_be_bytes();
        Self {
            prefix,
            entity_id: [key_bytes[1], key_bytes[2], key_bytes[3], kind as u8],
        }
    }

    /// Convert GUID to 16-byte array
    pub fn as_bytes(&self) -> [u8; 16] {
        let mut bytes = [0u8; 16];
        bytes[0..12].copy_from_slice(&self.prefix);
        bytes[12..16].copy_from_slice(&self.entity_id);
        bytes
    }

    /// All-zero GUID (nil handle).
    pub fn zero() -> Self {
        Self {
            prefix: [0; 12],
            entity_id: [0; 4],
        }
    }

    pub fn is_zero(&self) -> bool {
        self.prefix.iter().all(|&b| b == 0) && self.entity_id.iter().all(|&b| b == 0)
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.prefix.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        for byte in &self.entity_id {
            write!(f, ".{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({})", self)
    }
}
