// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! PARTITION QoS policy (DDS v1.4 Sec.2.2.3.13)
//!
//! Set on publishers and subscribers. A writer and a reader only match when
//! the partitions of their groups intersect, or when both groups stay in the
//! default (empty) partition.
//!
//! ```
//! use dcps::qos::partition::Partition;
//!
//! let writer = Partition::new(vec!["sensor".to_string(), "actuator".to_string()]);
//! let reader = Partition::single("actuator");
//! assert!(writer.is_compatible_with(&reader));
//! assert!(!Partition::default().is_compatible_with(&reader));
//! ```

/// PARTITION QoS policy. Empty list means the default partition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Partition {
    /// Case-sensitive partition names.
    pub names: Vec<String>,
}

impl Partition {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn single(name: &str) -> Self {
        Self {
            names: vec![name.to_string()],
        }
    }

    /// Parse a comma-separated list; blanks are dropped.
    pub fn from_list(list: &str) -> Self {
        Self {
            names: list
                .split(',')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }

    /// Comma-separated rendering, inverse of [`Partition::from_list`].
    pub fn to_list(&self) -> String {
        self.names.join(",")
    }

    /// Check if this is the default partition (empty list)
    pub fn is_default(&self) -> bool {
        self.names.is_empty()
    }

    /// Offered vs requested compatibility: intersection, or both default.
    pub fn is_compatible_with(&self, requested: &Partition) -> bool {
        if self.is_default() && requested.is_default() {
            return true;
        }
        if self.is_default() || requested.is_default() {
            return false;
        }
        self.names
            .iter()
            .any(|writer_partition| requested.names.contains(writer_partition))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_default_matches_default_only() {
        let default = Partition::default();
        assert!(default.is_default());
        assert!(default.is_compatible_with(&Partition::new(vec![])));
        assert!(!default.is_compatible_with(&Partition::single("sensor")));
        assert!(!Partition::single("sensor").is_compatible_with(&default));
    }

    #[test]
    fn test_partition_disjoint() {
        let writer = Partition::single("sensor");
        let reader = Partition::single("actuator");
        assert!(!writer.is_compatible_with(&reader));
    }

    #[test]
    fn test_partition_list_parsing() {
        let p = Partition::from_list(" a, b ,,c ");
        assert_eq!(p.names, vec!["a", "b", "c"]);
        assert_eq!(p.to_list(), "a,b,c");
        assert!(Partition::from_list("").is_default());
    }
}
