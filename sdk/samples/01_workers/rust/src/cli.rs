// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Command-line flags shared by the Workers programs.

use crate::bootstrap::{EndpointOptions, QosFile};
use clap::{Args, ValueEnum};
use dcps::qos::liveliness::{Liveliness, LivelinessKind};
use dcps::qos::time_based_filter::TimeBasedFilter;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// Domain ID (0-232)
    #[arg(short, long, default_value_t = 0)]
    pub domain: u32,

    /// YAML QoS profile file applied to the writer or reader
    #[arg(long)]
    pub qos_file: Option<PathBuf>,

    /// Profile name inside --qos-file (defaults to the file's default profile)
    #[arg(long, requires = "qos_file")]
    pub profile: Option<String>,
}

impl CommonArgs {
    #[must_use]
    pub fn endpoint_options(&self) -> EndpointOptions {
        EndpointOptions {
            domain_id: self.domain,
            qos_file: self.qos_file.clone().map(|path| QosFile {
                path,
                profile: self.profile.clone(),
            }),
            ..EndpointOptions::default()
        }
    }
}

/// LIVELINESS kind as spelled on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LivelinessArg {
    Automatic,
    ManualByParticipant,
    ManualByTopic,
}

impl From<LivelinessArg> for LivelinessKind {
    fn from(arg: LivelinessArg) -> Self {
        match arg {
            LivelinessArg::Automatic => LivelinessKind::Automatic,
            LivelinessArg::ManualByParticipant => LivelinessKind::ManualByParticipant,
            LivelinessArg::ManualByTopic => LivelinessKind::ManualByTopic,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct LivelinessArgs {
    /// LIVELINESS kind offered or requested
    #[arg(long, value_enum)]
    pub liveliness: Option<LivelinessArg>,

    /// Lease duration in milliseconds (with --liveliness)
    #[arg(long, default_value_t = 2000)]
    pub lease_ms: u64,
}

impl LivelinessArgs {
    #[must_use]
    pub fn policy(&self) -> Option<Liveliness> {
        self.liveliness.map(|kind| {
            Liveliness::new(kind.into(), Duration::from_millis(self.lease_ms))
        })
    }
}

#[derive(Args, Debug, Clone)]
pub struct FilterArgs {
    /// TIME_BASED_FILTER minimum separation in milliseconds
    #[arg(long)]
    pub time_based_filter_ms: Option<u64>,
}

impl FilterArgs {
    #[must_use]
    pub fn policy(&self) -> Option<TimeBasedFilter> {
        self.time_based_filter_ms.map(TimeBasedFilter::from_millis)
    }
}
