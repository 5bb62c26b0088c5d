// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! String codec for QoS option values.
//!
//! Values are upper-case DDS names (`RELIABLE`, `KEEP_LAST`, ...), plain
//! integers, or durations written as `INFINITE`, `<n>ms`, `<n>s` or
//! `<sec>.<frac>` (decimal seconds, nanosecond resolution).

use crate::config::qos as names;
use crate::dds::{Error, Result};
use crate::qos::{Durability, Reliability, DURATION_INFINITE, LENGTH_UNLIMITED};
use std::time::Duration;

fn invalid(option: &str, value: &str) -> Error {
    Error::InvalidQos(format!("bad value '{}' for {}", value, option))
}

pub(crate) fn parse_duration(option: &str, value: &str) -> Result<Duration> {
    let v = value.trim();
    if v.eq_ignore_ascii_case(names::INFINITE) {
        return Ok(DURATION_INFINITE);
    }
    if let Some(ms) = v.strip_suffix("ms") {
        return ms
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| invalid(option, value));
    }
    if let Some(secs) = v.strip_suffix('s') {
        return secs
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| invalid(option, value));
    }
    let (sec_text, frac_text) = v.split_once('.').unwrap_or((v, ""));
    let secs = sec_text
        .parse::<u64>()
        .map_err(|_| invalid(option, value))?;
    if frac_text.len() > 9 || !frac_text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(option, value));
    }
    let nanos = if frac_text.is_empty() {
        0
    } else {
        let padded = format!("{:0<9}", frac_text);
        padded
            .parse::<u32>()
            .map_err(|_| invalid(option, value))?
    };
    Ok(Duration::new(secs, nanos))
}

pub(crate) fn format_duration(d: Duration) -> String {
    if d == DURATION_INFINITE {
        names::INFINITE.to_string()
    } else {
        format!("{}.{:09}", d.as_secs(), d.subsec_nanos())
    }
}

pub(crate) fn parse_count(option: &str, value: &str) -> Result<usize> {
    let v = value.trim();
    if v.eq_ignore_ascii_case(names::UNLIMITED) || v == "-1" {
        return Ok(LENGTH_UNLIMITED);
    }
    match v.parse::<usize>() {
        Ok(0) | Err(_) => Err(invalid(option, value)),
        Ok(n) => Ok(n),
    }
}

pub(crate) fn format_count(n: usize) -> String {
    if n == LENGTH_UNLIMITED {
        names::UNLIMITED.to_string()
    } else {
        n.to_string()
    }
}

pub(crate) fn parse_depth(option: &str, value: &str) -> Result<u32> {
    match value.trim().parse::<u32>() {
        Ok(0) | Err(_) => Err(invalid(option, value)),
        Ok(n) => Ok(n),
    }
}

pub(crate) fn parse_reliability(option: &str, value: &str) -> Result<Reliability> {
    match value.trim().to_ascii_uppercase().as_str() {
        names::RELIABLE => Ok(Reliability::Reliable),
        names::BEST_EFFORT => Ok(Reliability::BestEffort),
        _ => Err(invalid(option, value)),
    }
}

pub(crate) fn format_reliability(r: Reliability) -> &'static str {
    match r {
        Reliability::Reliable => names::RELIABLE,
        Reliability::BestEffort => names::BEST_EFFORT,
    }
}

pub(crate) fn parse_durability(option: &str, value: &str) -> Result<Durability> {
    match value.trim().to_ascii_uppercase().as_str() {
        names::VOLATILE => Ok(Durability::Volatile),
        names::TRANSIENT_LOCAL => Ok(Durability::TransientLocal),
        _ => Err(invalid(option, value)),
    }
}

pub(crate) fn format_durability(d: Durability) -> &'static str {
    match d {
        Durability::Volatile => names::VOLATILE,
        Durability::TransientLocal => names::TRANSIENT_LOCAL,
    }
}
