// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

// Participants here are built directly, without the factory singleton, and
// each test joins its own domain so matching never crosses tests.

use super::*;
use crate::config::RuntimeConfig;
use crate::dds::qos::{
    DataReaderQos, DataWriterQos, DomainParticipantQos, PublisherQos, QosRecord, SubscriberQos,
    TopicQos,
};
use crate::dds::{
    DataReader, DataWriter, Error, InstanceStateMask, Publisher, SampleStateMask, StatusMask,
    Subscriber, Topic, ViewStateMask, DDS,
};
use crate::qos::liveliness::Liveliness;
use crate::qos::partition::Partition;
use crate::qos::{History, Reliability};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Clone, Debug, PartialEq)]
struct Beat {
    n: u32,
}

impl DDS for Beat {
    fn type_name() -> &'static str {
        "Test::Beat"
    }
}

#[derive(Clone, Debug)]
struct Imposter;

impl DDS for Imposter {
    fn type_name() -> &'static str {
        "Test::Beat"
    }
}

#[derive(Clone, Debug)]
struct Nameless;

impl DDS for Nameless {
    fn type_name() -> &'static str {
        ""
    }
}

fn participant(domain_id: u32) -> DomainParticipant {
    participant_with(domain_id, RuntimeConfig::new())
}

fn participant_with(domain_id: u32, config: RuntimeConfig) -> DomainParticipant {
    DomainParticipant::new(domain_id, DomainParticipantQos::default(), config)
        .expect("participant")
}

struct Graph {
    participant: DomainParticipant,
    topic: Topic<Beat>,
    publisher: Publisher,
    subscriber: Subscriber,
}

fn graph(domain_id: u32, topic_name: &str) -> Graph {
    let participant = participant(domain_id);
    participant.register_type::<Beat>("Test::Beat").expect("register");
    let topic = participant
        .create_topic::<Beat>(topic_name, "Test::Beat", &TopicQos::default())
        .expect("topic");
    let publisher = participant
        .create_publisher(&PublisherQos::default())
        .expect("publisher");
    let subscriber = participant
        .create_subscriber(&SubscriberQos::default())
        .expect("subscriber");
    Graph {
        participant,
        topic,
        publisher,
        subscriber,
    }
}

fn eventually(mut f: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        if f() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

fn take_all(reader: &DataReader<Beat>) -> Vec<u32> {
    match reader
        .take(8, SampleStateMask::ANY, ViewStateMask::ANY, InstanceStateMask::ANY)
        .expect("take")
    {
        Some(loan) => loan.iter().filter_map(|s| s.data().map(|b| b.n)).collect(),
        None => Vec::new(),
    }
}

#[test]
fn register_type_binds_name_once() {
    let p = participant(201);
    assert!(matches!(
        p.register_type::<Beat>(""),
        Err(Error::BadParameter(_))
    ));
    p.register_type::<Beat>("Test::Beat").expect("register");
    p.register_type::<Beat>("Test::Beat").expect("same pair again");
    assert!(matches!(
        p.register_type::<Imposter>("Test::Beat"),
        Err(Error::TypeMismatch(_))
    ));
    p.teardown(true);
}

#[test]
fn type_support_names_and_registers() {
    assert_eq!(TypeSupport::<Beat>::get_type_name().expect("name"), "Test::Beat");
    assert!(matches!(
        TypeSupport::<Nameless>::get_type_name(),
        Err(Error::BadParameter(_))
    ));

    let p = participant(202);
    TypeSupport::<Beat>::register_type(&p, "Test::Beat").expect("register");
    p.create_topic::<Beat>("TypeSupportTopic", "Test::Beat", &TopicQos::default())
        .expect("topic");
    p.teardown(true);
}

#[test]
fn create_topic_checks_type_and_name() {
    let p = participant(203);
    assert!(matches!(
        p.create_topic::<Beat>("Beats", "Test::Beat", &TopicQos::default()),
        Err(Error::TypeNotRegistered(_))
    ));
    p.register_type::<Beat>("Test::Beat").expect("register");
    assert!(matches!(
        p.create_topic::<Imposter>("Beats", "Test::Beat", &TopicQos::default()),
        Err(Error::TypeMismatch(_))
    ));
    assert!(matches!(
        p.create_topic::<Beat>("", "Test::Beat", &TopicQos::default()),
        Err(Error::BadParameter(_))
    ));

    let topic = p
        .create_topic::<Beat>("Beats", "Test::Beat", &TopicQos::default())
        .expect("topic");
    assert_eq!(topic.get_name(), "Beats");
    assert_eq!(topic.get_type_name(), "Test::Beat");
    assert!(matches!(
        p.create_topic::<Beat>("Beats", "Test::Beat", &TopicQos::default()),
        Err(Error::PreconditionNotMet(_))
    ));

    assert!(p.find_topic::<Beat>("Beats").is_some());
    assert!(p.find_topic::<Imposter>("Beats").is_none());
    assert!(p.find_topic::<Beat>("Other").is_none());
    p.teardown(true);
}

#[test]
fn invalid_topic_qos_is_rejected() {
    let p = participant(204);
    p.register_type::<Beat>("Test::Beat").expect("register");
    let mut qos = TopicQos::default();
    qos.history = History::KeepLast(0);
    assert!(matches!(
        p.create_topic::<Beat>("Bad", "Test::Beat", &qos),
        Err(Error::InvalidQos(_))
    ));
    assert!(matches!(
        p.set_default_topic_qos(&qos),
        Err(Error::InvalidQos(_))
    ));
    p.teardown(true);
}

#[test]
fn writer_sample_reaches_reader() {
    let g = graph(205, "Heartbeat");
    let reader = g
        .subscriber
        .create_datareader(&g.topic, &DataReaderQos::default(), None, StatusMask::NONE)
        .expect("reader");
    let writer = g
        .publisher
        .create_datawriter(&g.topic, &DataWriterQos::default(), None, StatusMask::NONE)
        .expect("writer");

    assert_eq!(writer.matched_subscription_count(), 1);
    assert_eq!(reader.matched_publication_count(), 1);
    writer.write(&Beat { n: 42 }).expect("write");
    assert_eq!(take_all(&reader), vec![42]);
    g.participant.teardown(true);
}

#[test]
fn disjoint_partitions_never_match() {
    let p = participant(206);
    p.register_type::<Beat>("Test::Beat").expect("register");
    let topic = p
        .create_topic::<Beat>("Partitioned", "Test::Beat", &TopicQos::default())
        .expect("topic");
    let publisher = p
        .create_publisher(&PublisherQos {
            partition: Partition::single("east"),
        })
        .expect("publisher");
    let subscriber = p
        .create_subscriber(&SubscriberQos {
            partition: Partition::single("west"),
        })
        .expect("subscriber");

    let reader = subscriber
        .create_datareader(&topic, &DataReaderQos::default(), None, StatusMask::NONE)
        .expect("reader");
    let writer = publisher
        .create_datawriter(&topic, &DataWriterQos::default(), None, StatusMask::NONE)
        .expect("writer");
    writer.write(&Beat { n: 1 }).expect("write");

    assert_eq!(writer.matched_subscription_count(), 0);
    assert!(take_all(&reader).is_empty());
    assert_eq!(
        reader
            .get_requested_incompatible_qos_status()
            .expect("status")
            .total_count,
        0
    );
    p.teardown(true);
}

#[test]
fn incompatible_reliability_is_reported_both_ways() {
    let g = graph(207, "Strict");
    let reader_qos = DataReaderQos {
        reliability: Reliability::Reliable,
        ..DataReaderQos::default()
    };
    let writer_qos = DataWriterQos {
        reliability: Reliability::BestEffort,
        ..DataWriterQos::default()
    };
    let reader = g
        .subscriber
        .create_datareader(&g.topic, &reader_qos, None, StatusMask::NONE)
        .expect("reader");
    let writer = g
        .publisher
        .create_datawriter(&g.topic, &writer_qos, None, StatusMask::NONE)
        .expect("writer");

    assert_eq!(writer.matched_subscription_count(), 0);
    let offered = writer.get_offered_incompatible_qos_status().expect("status");
    let requested = reader.get_requested_incompatible_qos_status().expect("status");
    assert_eq!(offered.total_count, 1);
    assert_eq!(requested.total_count, 1);
    assert_eq!(offered.last_policy_id, requested.last_policy_id);
    g.participant.teardown(true);
}

#[test]
fn deletion_respects_ownership_and_order() {
    let g = graph(208, "Owned");
    let writer = g
        .publisher
        .create_datawriter(&g.topic, &DataWriterQos::default(), None, StatusMask::NONE)
        .expect("writer");
    let reader = g
        .subscriber
        .create_datareader(&g.topic, &DataReaderQos::default(), None, StatusMask::NONE)
        .expect("reader");

    assert!(matches!(
        g.participant.delete_topic(&g.topic),
        Err(Error::PreconditionNotMet(_))
    ));
    assert!(matches!(
        g.participant.delete_publisher(&g.publisher),
        Err(Error::PreconditionNotMet(_))
    ));

    let other = g
        .participant
        .create_publisher(&PublisherQos::default())
        .expect("publisher");
    assert!(matches!(
        other.delete_datawriter(&writer),
        Err(Error::BadParameter(_))
    ));

    let cond = reader
        .create_readcondition(SampleStateMask::ANY, ViewStateMask::ANY, InstanceStateMask::ANY)
        .expect("cond");
    assert!(matches!(
        g.subscriber.delete_datareader(&reader),
        Err(Error::PreconditionNotMet(_))
    ));
    reader.delete_readcondition(&cond).expect("delete cond");

    g.publisher.delete_datawriter(&writer).expect("delete writer");
    assert!(matches!(
        g.publisher.delete_datawriter(&writer),
        Err(Error::AlreadyDeleted)
    ));
    g.subscriber.delete_datareader(&reader).expect("delete reader");
    g.participant.delete_topic(&g.topic).expect("delete topic");
    assert!(matches!(
        g.participant.delete_topic(&g.topic),
        Err(Error::AlreadyDeleted)
    ));
    g.participant.delete_publisher(&g.publisher).expect("publisher");
    g.participant.delete_publisher(&other).expect("other publisher");
    g.participant.delete_subscriber(&g.subscriber).expect("subscriber");
    assert!(!g.participant.has_contained_entities());
    g.participant.teardown(false);
}

#[test]
fn foreign_topic_is_rejected() {
    let a = graph(209, "ForeignA");
    let b = participant(209);
    let publisher = b.create_publisher(&PublisherQos::default()).expect("publisher");
    assert!(matches!(
        publisher.create_datawriter(&a.topic, &DataWriterQos::default(), None, StatusMask::NONE),
        Err(Error::BadParameter(_))
    ));
    a.participant.teardown(true);
    b.teardown(true);
}

#[test]
fn delete_contained_entities_clears_graph() {
    let g = graph(210, "Cascade");
    let writer: DataWriter<Beat> = g
        .publisher
        .create_datawriter(&g.topic, &DataWriterQos::default(), None, StatusMask::NONE)
        .expect("writer");
    let reader = g
        .subscriber
        .create_datareader(&g.topic, &DataReaderQos::default(), None, StatusMask::NONE)
        .expect("reader");
    let cond = reader
        .create_readcondition(SampleStateMask::ANY, ViewStateMask::ANY, InstanceStateMask::ANY)
        .expect("cond");

    g.participant.delete_contained_entities().expect("cascade");
    assert!(!g.participant.has_contained_entities());
    assert!(writer.is_deleted());
    assert!(reader.is_deleted());
    assert!(g.publisher.is_deleted());
    assert!(g.subscriber.is_deleted());
    assert!(g.topic.is_deleted());
    assert!(!cond.get_trigger_value());
    assert!(matches!(
        writer.write(&Beat { n: 0 }),
        Err(Error::AlreadyDeleted)
    ));

    // The participant itself stays usable.
    g.participant
        .create_publisher(&PublisherQos::default())
        .expect("publisher after cascade");
    g.participant.teardown(true);
}

#[test]
fn runtime_overrides_shape_defaults() {
    let config = RuntimeConfig::new();
    config
        .set_qos("datawriter.history.depth", "5")
        .expect("override");
    config
        .set_qos("publisher.partition.name", "blue")
        .expect("override");
    let p = participant_with(211, config.clone());

    let publisher_qos = p.get_default_publisher_qos().expect("qos");
    assert_eq!(publisher_qos.partition, Partition::single("blue"));
    let publisher = p.create_publisher(&publisher_qos).expect("publisher");
    assert_eq!(
        publisher.get_default_datawriter_qos().expect("qos").history,
        History::KeepLast(5)
    );

    // Overrides sit on top of the stored default, not inside it.
    config.remove_qos("datawriter.history.depth");
    assert_eq!(
        publisher.get_default_datawriter_qos().expect("qos").history,
        History::KeepLast(1)
    );
    p.teardown(true);
}

#[test]
fn copy_from_topic_qos_overlays_shared_policies() {
    let g = graph(212, "Overlay");
    let mut topic_qos = TopicQos::default();
    topic_qos.reliability = Reliability::Reliable;
    topic_qos.history = History::KeepLast(3);
    let mut reader_qos = g.subscriber.get_default_datareader_qos().expect("qos");
    g.subscriber
        .copy_from_topic_qos(&mut reader_qos, &topic_qos)
        .expect("copy");
    assert_eq!(reader_qos.reliability, Reliability::Reliable);
    assert_eq!(reader_qos.history, History::KeepLast(3));
    reader_qos.finalize().expect("finalize");
    g.participant.teardown(true);
}

#[test]
fn automatic_writers_stay_alive() {
    let g = graph(213, "AutoLive");
    let writer_qos = DataWriterQos {
        liveliness: Liveliness::automatic_millis(150),
        ..DataWriterQos::default()
    };
    let reader_qos = DataReaderQos {
        liveliness: Liveliness::automatic_millis(150),
        ..DataReaderQos::default()
    };
    let reader = g
        .subscriber
        .create_datareader(&g.topic, &reader_qos, None, StatusMask::NONE)
        .expect("reader");
    let _writer = g
        .publisher
        .create_datawriter(&g.topic, &writer_qos, None, StatusMask::NONE)
        .expect("writer");

    thread::sleep(Duration::from_millis(600));
    let status = reader.get_liveliness_changed_status().expect("status");
    assert_eq!(status.alive_count, 1);
    assert_eq!(status.not_alive_count, 0);
    g.participant.teardown(true);
}

#[test]
fn manual_by_participant_needs_participant_assertions() {
    let g = graph(214, "ManualLive");
    let qos = DataWriterQos {
        liveliness: Liveliness::manual_by_participant(Duration::from_millis(200)),
        ..DataWriterQos::default()
    };
    let reader_qos = DataReaderQos {
        liveliness: Liveliness::manual_by_participant(Duration::from_millis(200)),
        ..DataReaderQos::default()
    };
    let reader = g
        .subscriber
        .create_datareader(&g.topic, &reader_qos, None, StatusMask::NONE)
        .expect("reader");
    let _writer = g
        .publisher
        .create_datawriter(&g.topic, &qos, None, StatusMask::NONE)
        .expect("writer");

    let until = Instant::now() + Duration::from_millis(500);
    while Instant::now() < until {
        g.participant.assert_liveliness().expect("assert");
        thread::sleep(Duration::from_millis(40));
    }
    assert_eq!(
        reader.get_liveliness_changed_status().expect("status").not_alive_count,
        0
    );

    assert!(eventually(|| {
        reader
            .get_liveliness_changed_status()
            .map(|s| s.not_alive_count == 1)
            .unwrap_or(false)
    }));
    g.participant.teardown(true);
}

#[test]
fn teardown_disables_participant() {
    let p = participant(215);
    p.register_type::<Beat>("Test::Beat").expect("register");
    p.teardown(true);
    assert!(p.is_deleted());
    assert!(matches!(
        p.create_publisher(&PublisherQos::default()),
        Err(Error::AlreadyDeleted)
    ));
    assert!(matches!(
        p.register_type::<Beat>("Test::Beat"),
        Err(Error::AlreadyDeleted)
    ));
    assert!(matches!(p.assert_liveliness(), Err(Error::AlreadyDeleted)));
    // Second teardown is a no-op.
    p.teardown(true);
}
