// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The `Worker::Msg` sample type.
//!
//! ```idl
//! module Worker {
//!     struct Msg {
//!         string name;
//!         long birth;
//!         long team;
//!     };
//! };
//! ```

use dcps::DDS;
use std::fmt;

/// Topic every Workers program publishes to or subscribes from.
pub const TOPIC_NAME: &str = "Workers";

/// Schema name registered with the participant.
pub const TYPE_NAME: &str = "Worker::Msg";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Worker {
    pub name: String,
    pub birth: i32,
    pub team: i32,
}

impl Worker {
    #[must_use]
    pub fn new(name: impl Into<String>, birth: i32, team: i32) -> Self {
        Self {
            name: name.into(),
            birth,
            team,
        }
    }

    /// The record the publisher starts from; `team` grows by one per write.
    #[must_use]
    pub fn first() -> Self {
        Self::new("ldh", 900811, 1)
    }

    /// Same worker, moved `n` teams on.
    #[must_use]
    pub fn nth(n: u64) -> Self {
        let mut worker = Self::first();
        worker.team = worker.team.wrapping_add(n as i32);
        worker
    }
}

impl DDS for Worker {
    fn type_name() -> &'static str {
        TYPE_NAME
    }
}

impl fmt::Display for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Data received!\nname: {}\nbirth: {}\nteam: {}",
            self.name, self.birth, self.team
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_worker() {
        let w = Worker::first();
        assert_eq!(w.name, "ldh");
        assert_eq!(w.birth, 900811);
        assert_eq!(w.team, 1);
        assert_eq!(Worker::nth(2).team, 3);
    }

    #[test]
    fn test_display_matches_console_format() {
        assert_eq!(
            Worker::first().to_string(),
            "Data received!\nname: ldh\nbirth: 900811\nteam: 1"
        );
    }

    #[test]
    fn test_type_name() {
        assert_eq!(<Worker as DDS>::type_name(), "Worker::Msg");
        assert!(!Worker::has_key());
    }
}
