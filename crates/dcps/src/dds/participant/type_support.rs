// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::DomainParticipant;
use crate::dds::{Error, Result, DDS};
use std::marker::PhantomData;

/// Type support of a sample type: its schema name and registration.
pub struct TypeSupport<T: DDS>(PhantomData<fn() -> T>);

impl<T: DDS> TypeSupport<T> {
    /// Schema name declared by `T` (fails for an empty name).
    pub fn get_type_name() -> Result<&'static str> {
        let name = T::type_name();
        if name.is_empty() {
            return Err(Error::BadParameter(format!(
                "{} declares an empty type name",
                std::any::type_name::<T>()
            )));
        }
        Ok(name)
    }

    /// Register `T` with `participant` under `type_name`.
    pub fn register_type(participant: &DomainParticipant, type_name: &str) -> Result<()> {
        participant.register_type::<T>(type_name)
    }
}
