// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Waitset driver for condition notification.
//!
//! Provides `WaitsetDriver`, the blocking primitive behind
//! [`crate::dds::WaitSet`].

mod driver;

pub use driver::{
    WaitsetDriver, WaitsetRegistration, WaitsetSignal, WaitsetWaitError, WAITSET_DEFAULT_MAX_SLOTS,
};
