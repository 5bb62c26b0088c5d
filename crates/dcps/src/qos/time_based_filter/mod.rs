// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! TIME_BASED_FILTER QoS policy (DDS v1.4 Sec.2.2.3.14).
//!
//! Controls the minimum separation between samples delivered to a
//! `DataReader`, per instance. Samples arriving faster than the minimum
//! separation are coalesced: only the most recent one is kept and surfaced
//! once the separation has elapsed.

mod coalescer;
mod policy;

pub use coalescer::{Admission, TimeBasedFilterCoalescer};
pub use policy::TimeBasedFilter;
