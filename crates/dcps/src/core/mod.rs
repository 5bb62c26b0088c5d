// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # Core Runtime Components
//!
//! Low-level infrastructure shared by the DDS layer.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `guid` | Entity identifiers |
//! | `rt` | Runtime primitives (waitset driver) |
//!
//! Most users should use the high-level [`crate::dds`] API instead of
//! interacting with core modules directly.

/// Entity identifiers (participant prefix + entity id).
pub mod guid;
/// Runtime primitives shared across entities.
pub mod rt;

pub use guid::{EntityKind, Guid};
