// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! QoS profile loaders.
//!
//! Named profiles are read from YAML files and converted into topic, writer
//! or reader QoS records.
//!
//! # Example
//!
//! ```rust,no_run
//! use dcps::dds::qos::loaders::YamlLoader;
//!
//! let doc = YamlLoader::load_from_file("workers_qos.yaml")?;
//! let reader_qos = YamlLoader::get_profile(&doc, "liveliness_reader")?.reader_qos()?;
//! # Ok::<(), dcps::Error>(())
//! ```

pub mod yaml;

pub use yaml::{YamlLoader, YamlQosDocument, YamlQosProfile};
