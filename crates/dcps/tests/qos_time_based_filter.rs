// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! TIME_BASED_FILTER QoS policy integration tests
//!
//! A reader with a minimum separation sees at most one sample per instance
//! per window; the newest value of a burst is delivered once the window
//! closes. A held sample never outlives the writer that wrote it.

use dcps::dds::InstanceState;
use dcps::prelude::*;
use dcps::qos::liveliness::Liveliness;
use dcps::qos::time_based_filter::TimeBasedFilter;
use dcps::qos::History;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
struct Gauge {
    channel: u8,
    level: u32,
}

impl DDS for Gauge {
    fn type_name() -> &'static str {
        "QosTimeBasedFilter::Gauge"
    }

    fn compute_key(&self) -> [u8; 16] {
        let mut key = [0u8; 16];
        key[0] = self.channel;
        key
    }

    fn has_key() -> bool {
        true
    }
}

struct Bench {
    participant: DomainParticipant,
    publisher: Publisher,
    writer: DataWriter<Gauge>,
    reader: DataReader<Gauge>,
}

fn bench(domain_id: u32, topic_name: &str, separation: &str) -> Bench {
    bench_with(domain_id, topic_name, separation, None)
}

fn bench_with(
    domain_id: u32,
    topic_name: &str,
    separation: &str,
    offered: Option<Liveliness>,
) -> Bench {
    let factory = DomainParticipantFactory::get_instance().expect("factory");
    let participant = factory
        .create_participant(domain_id, &factory.get_default_participant_qos().expect("qos"))
        .expect("participant");
    participant
        .register_type::<Gauge>(Gauge::type_name())
        .expect("register");
    let topic = participant
        .create_topic::<Gauge>(
            topic_name,
            Gauge::type_name(),
            &participant.get_default_topic_qos().expect("qos"),
        )
        .expect("topic");

    let subscriber = participant
        .create_subscriber(&participant.get_default_subscriber_qos().expect("qos"))
        .expect("subscriber");
    let mut reader_qos = subscriber.get_default_datareader_qos().expect("qos");
    reader_qos.history = History::KeepLast(8);
    reader_qos
        .set_option("time_based_filter.minimum_separation", separation)
        .expect("separation");
    let reader = subscriber
        .create_datareader(&topic, &reader_qos, None, StatusMask::NONE)
        .expect("reader");

    let publisher = participant
        .create_publisher(&participant.get_default_publisher_qos().expect("qos"))
        .expect("publisher");
    let mut writer_qos = publisher.get_default_datawriter_qos().expect("qos");
    if let Some(liveliness) = offered {
        writer_qos.liveliness = liveliness;
    }
    let writer = publisher
        .create_datawriter(&topic, &writer_qos, None, StatusMask::NONE)
        .expect("writer");

    Bench {
        participant,
        publisher,
        writer,
        reader,
    }
}

impl Bench {
    fn write(&self, channel: u8, level: u32) {
        self.writer.write(&Gauge { channel, level }).expect("write");
    }

    fn take(&self) -> Vec<(u8, u32)> {
        match self
            .reader
            .take(8, SampleStateMask::ANY, ViewStateMask::ANY, InstanceStateMask::ANY)
            .expect("take")
        {
            Some(loan) => loan
                .iter()
                .filter_map(|s| s.data().map(|g| (g.channel, g.level)))
                .collect(),
            None => Vec::new(),
        }
    }

    fn take_within(&self, timeout: Duration) -> Vec<(u8, u32)> {
        let deadline = Instant::now() + timeout;
        loop {
            let got = self.take();
            if !got.is_empty() || Instant::now() >= deadline {
                return got;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    /// Every slot taken as (level or None, instance state).
    fn take_slots(&self) -> Vec<(Option<u32>, InstanceState)> {
        match self
            .reader
            .take(8, SampleStateMask::ANY, ViewStateMask::ANY, InstanceStateMask::ANY)
            .expect("take")
        {
            Some(loan) => loan
                .iter()
                .map(|s| (s.data().map(|g| g.level), s.info().instance_state))
                .collect(),
            None => Vec::new(),
        }
    }

    fn close(self) {
        let factory = DomainParticipantFactory::get_instance().expect("factory");
        self.participant
            .delete_contained_entities()
            .expect("delete contained");
        factory
            .delete_participant(&self.participant)
            .expect("delete participant");
    }
}

#[test]
fn test_time_based_filter_policy_values() {
    let filter = TimeBasedFilter::from_millis(100);
    assert_eq!(filter.minimum_separation, Duration::from_millis(100));
    assert!(!filter.is_disabled());
    assert!(TimeBasedFilter::zero().is_disabled());
    assert_eq!(TimeBasedFilter::default(), TimeBasedFilter::zero());
}

#[test]
fn test_time_based_filter_option_forms() {
    let mut qos = DataReaderQos::default();
    qos.set_option("time_based_filter.minimum_separation", "250ms")
        .expect("ms form");
    assert_eq!(
        qos.time_based_filter.minimum_separation,
        Duration::from_millis(250)
    );
    qos.set_option("time_based_filter.minimum_separation", "0.5")
        .expect("decimal form");
    assert_eq!(
        qos.time_based_filter.minimum_separation,
        Duration::from_millis(500)
    );
    assert_eq!(
        qos.get_option("time_based_filter.minimum_separation")
            .expect("get"),
        "0.500000000"
    );
    assert!(qos
        .set_option("time_based_filter.minimum_separation", "soon")
        .is_err());

    // Writers have no time-based filter.
    let mut writer_qos = DataWriterQos::default();
    assert!(writer_qos
        .set_option("time_based_filter.minimum_separation", "1s")
        .is_err());
}

#[test]
fn test_burst_coalesces_to_latest_value() {
    let b = bench(130, "TimeBasedFilterBurst", "150ms");
    for level in 1..=5 {
        b.write(1, level);
    }

    // First sample passes, the rest of the burst is held.
    assert_eq!(b.take(), vec![(1, 1)]);
    assert_eq!(b.take_within(Duration::from_secs(2)), vec![(1, 5)]);
    assert!(b.take().is_empty());
    b.close();
}

#[test]
fn test_separation_applies_per_instance() {
    let b = bench(131, "TimeBasedFilterInstances", "200ms");
    b.write(1, 10);
    b.write(2, 20);
    b.write(1, 11);

    let mut first = b.take();
    first.sort_unstable();
    assert_eq!(first, vec![(1, 10), (2, 20)]);
    assert_eq!(b.take_within(Duration::from_secs(2)), vec![(1, 11)]);
    b.close();
}

#[test]
fn test_spaced_writes_all_delivered() {
    let b = bench(132, "TimeBasedFilterSpaced", "40ms");
    let mut delivered = Vec::new();
    for level in 0..3 {
        b.write(4, level);
        thread::sleep(Duration::from_millis(80));
        delivered.extend(b.take().into_iter().map(|(_, l)| l));
    }
    assert_eq!(delivered, vec![0, 1, 2]);
    b.close();
}

#[test]
fn test_dispose_discards_held_sample() {
    let b = bench(133, "TimeBasedFilterDispose", "150ms");
    b.write(7, 1);
    b.write(7, 2);
    assert_eq!(b.take(), vec![(7, 1)]);

    b.writer.dispose(&Gauge { channel: 7, level: 0 }).expect("dispose");
    thread::sleep(Duration::from_millis(250));

    let loan = b
        .reader
        .take(8, SampleStateMask::ANY, ViewStateMask::ANY, InstanceStateMask::ANY)
        .expect("take")
        .expect("dispose notice");
    assert_eq!(loan.len(), 1);
    assert!(loan.iter().all(|s| !s.is_valid()));
    drop(loan);
    b.close();
}

#[test]
fn test_deleted_writer_drops_held_sample() {
    let b = bench(134, "TimeBasedFilterWriterGone", "200ms");
    b.write(3, 1);
    b.write(3, 2);
    b.publisher.delete_datawriter(&b.writer).expect("delete writer");
    thread::sleep(Duration::from_millis(400));

    // The held value 2 is gone; the lifecycle slot closes the history.
    assert_eq!(
        b.take_slots(),
        vec![
            (Some(1), InstanceState::NotAliveNoWriters),
            (None, InstanceState::NotAliveNoWriters),
        ]
    );
    assert_eq!(b.reader.matched_publication_count(), 0);
    thread::sleep(Duration::from_millis(100));
    assert!(b.take_slots().is_empty());
    b.close();
}

#[test]
fn test_lost_liveliness_drops_held_sample() {
    let b = bench_with(
        135,
        "TimeBasedFilterLeaseExpiry",
        "300ms",
        Some(Liveliness::manual_topic_millis(100)),
    );
    b.write(5, 1);
    b.write(5, 2);
    assert_eq!(b.take_slots(), vec![(Some(1), InstanceState::Alive)]);

    // The lease runs out before the filter window closes.
    thread::sleep(Duration::from_millis(500));
    assert_eq!(
        b.take_slots(),
        vec![(None, InstanceState::NotAliveNoWriters)]
    );
    let status = b.reader.get_liveliness_changed_status().expect("status");
    assert_eq!(status.not_alive_count, 1);

    // A later write revives the instance in order.
    b.write(5, 3);
    assert_eq!(
        b.take_within(Duration::from_secs(2)),
        vec![(5, 3)]
    );
    b.close();
}
