// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::{Liveliness, LivelinessKind, LivelinessMonitor, LivenessTransition};
use crate::qos::DURATION_INFINITE;
use std::thread;
use std::time::{Duration, Instant};

#[test]
fn test_liveliness_constructors() {
    let automatic = Liveliness::automatic(Duration::from_secs(5));
    assert_eq!(automatic.kind, LivelinessKind::Automatic);
    assert_eq!(automatic.lease_duration, Duration::from_secs(5));

    let manual_participant = Liveliness::manual_by_participant(Duration::from_secs(10));
    assert_eq!(manual_participant.kind, LivelinessKind::ManualByParticipant);

    let manual_topic = Liveliness::manual_by_topic(Duration::from_secs(15));
    assert_eq!(manual_topic.kind, LivelinessKind::ManualByTopic);

    let infinite = Liveliness::infinite();
    assert!(infinite.is_infinite());
    assert_eq!(infinite.assert_period(), None);
}

#[test]
fn test_liveliness_compatibility() {
    let writer = Liveliness::automatic(Duration::from_secs(1));
    let reader = Liveliness::automatic(Duration::from_secs(2));
    assert!(writer.is_compatible_with(&reader));

    let slower_writer = Liveliness::automatic(Duration::from_secs(3));
    assert!(!slower_writer.is_compatible_with(&reader));

    // Weaker offered kind never satisfies a stronger request.
    let manual = Liveliness::manual_by_participant(Duration::from_secs(2));
    assert!(!writer.is_compatible_with(&manual));

    // Stronger offered kind satisfies a weaker request.
    let by_topic = Liveliness::manual_by_topic(Duration::from_secs(1));
    assert!(by_topic.is_compatible_with(&reader));
    assert!(by_topic.is_compatible_with(&Liveliness::infinite()));
}

#[test]
fn test_kind_parse_and_display() {
    for kind in [
        LivelinessKind::Automatic,
        LivelinessKind::ManualByParticipant,
        LivelinessKind::ManualByTopic,
    ] {
        assert_eq!(kind.to_string().parse::<LivelinessKind>(), Ok(kind));
    }
    assert_eq!(
        "manual_by_topic".parse::<LivelinessKind>(),
        Ok(LivelinessKind::ManualByTopic)
    );
    assert!("sometimes".parse::<LivelinessKind>().is_err());
}

#[test]
fn test_liveliness_monitor_basic() {
    let mut monitor = LivelinessMonitor::new(LivelinessKind::Automatic, Duration::from_millis(100));
    assert!(monitor.is_alive());
    thread::sleep(Duration::from_millis(20));
    assert_eq!(monitor.check(), None);
    assert_eq!(monitor.assert(), None);
    assert!(monitor.is_alive());
}

#[test]
fn test_liveliness_monitor_timeout_fires_once() {
    let mut monitor = LivelinessMonitor::new(LivelinessKind::Automatic, Duration::from_millis(50));
    let later = Instant::now() + Duration::from_millis(60);
    assert_eq!(
        monitor.check_at(later),
        Some(LivenessTransition::BecameNotAlive)
    );
    assert_eq!(monitor.check_at(later), None);
    assert!(!monitor.is_alive());

    assert_eq!(
        monitor.assert_at(later),
        Some(LivenessTransition::BecameAlive)
    );
    assert!(monitor.is_alive());
}

#[test]
fn test_liveliness_monitor_infinite() {
    let mut monitor = LivelinessMonitor::new(LivelinessKind::Automatic, DURATION_INFINITE);
    thread::sleep(Duration::from_millis(10));
    assert_eq!(monitor.check(), None);
    assert!(monitor.is_alive());
    assert_eq!(monitor.time_until_expiry(), None);
    assert_eq!(monitor.expires_at(), None);
}
