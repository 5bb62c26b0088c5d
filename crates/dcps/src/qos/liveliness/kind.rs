// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use std::fmt;
use std::str::FromStr;

/// LIVELINESS QoS kinds, ordered from weakest to strongest commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LivelinessKind {
    /// DDS infrastructure automatically asserts liveliness.
    #[default]
    Automatic,
    /// Application must assert per participant.
    ManualByParticipant,
    /// Application must assert per writer/topic.
    ManualByTopic,
}

impl LivelinessKind {
    /// Canonical upper-case name used in option strings and profiles.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            LivelinessKind::Automatic => "AUTOMATIC",
            LivelinessKind::ManualByParticipant => "MANUAL_BY_PARTICIPANT",
            LivelinessKind::ManualByTopic => "MANUAL_BY_TOPIC",
        }
    }
}

impl fmt::Display for LivelinessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LivelinessKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AUTOMATIC" => Ok(LivelinessKind::Automatic),
            "MANUAL_BY_PARTICIPANT" => Ok(LivelinessKind::ManualByParticipant),
            "MANUAL_BY_TOPIC" => Ok(LivelinessKind::ManualByTopic),
            other => Err(format!("unknown liveliness kind '{}'", other)),
        }
    }
}
