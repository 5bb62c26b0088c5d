// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Workers ceremony integration tests
//!
//! Publisher and subscriber sides bootstrapped in one process, exchanging
//! `Worker::Msg` records through the in-process registry. Every test uses
//! its own domain id; the factory is never shut down here.

use dcps::dds::listener::QosPolicyId;
use dcps::dds::{SampleInfoSeq, SampleSeq};
use dcps::prelude::*;
use dcps::qos::liveliness::{Liveliness, LivelinessKind};
use dcps::qos::{Durability, History, Reliability};
use dcps_samples_workers::{
    take_and_print, EndpointOptions, PublisherSide, QosFile, Stage, SubscriberSide, Worker,
    SAMPLE_CAPACITY, TOPIC_NAME,
};
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn factory() -> &'static DomainParticipantFactory {
    DomainParticipantFactory::get_instance().expect("factory")
}

fn teams(reader: &DataReader<Worker>) -> Vec<i32> {
    match reader
        .take(SAMPLE_CAPACITY, SampleStateMask::ANY, ViewStateMask::ANY, InstanceStateMask::ANY)
        .expect("take")
    {
        Some(loan) => loan.iter().filter_map(|s| s.data().map(|w| w.team)).collect(),
        None => Vec::new(),
    }
}

#[test]
fn test_waitset_subscriber_receives_teams_in_order() {
    let sub = SubscriberSide::bootstrap(&EndpointOptions::on_domain(200), None, StatusMask::NONE)
        .expect("subscriber side");
    let publisher = PublisherSide::bootstrap(&EndpointOptions::on_domain(200)).expect("publisher side");
    assert_eq!(publisher.topic.get_name(), TOPIC_NAME);
    assert_eq!(sub.topic.get_type_name(), "Worker::Msg");
    assert_eq!(publisher.writer.matched_subscription_count(), 1);

    let cond = sub
        .reader
        .create_readcondition(SampleStateMask::ANY, ViewStateMask::ANY, InstanceStateMask::ANY)
        .expect("condition");
    let waitset = WaitSet::new();
    waitset.attach_condition(&cond).expect("attach");

    let writer = publisher.writer.clone();
    let stop = StopToken::new();
    let loop_stop = stop.clone();
    let producer = thread::spawn(move || {
        PublishLoop::new(Duration::from_millis(100))
            .with_limit(2)
            .run(&writer, &loop_stop, Worker::nth, |_| {})
    });

    let mut seen = Vec::new();
    let deadline = Instant::now() + Duration::from_secs(10);
    while seen.len() < 2 && Instant::now() < deadline {
        match waitset.wait(Duration::from_secs(10)).expect("wait") {
            WaitOutcome::Triggered(_) => {
                let loan = sub
                    .reader
                    .take_w_condition(&cond, SAMPLE_CAPACITY)
                    .expect("take")
                    .expect("triggered condition has data");
                for sample in loan.iter() {
                    let worker = sample.data().expect("valid sample");
                    assert_eq!(worker.name, "ldh");
                    assert_eq!(worker.birth, 900811);
                    seen.push(worker.team);
                }
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }
    let report = producer.join().expect("producer thread").expect("publish loop");
    assert_eq!(report.published, 2);
    assert!(!report.stopped);
    assert_eq!(seen, vec![1, 2]);

    waitset.detach_condition(&cond).expect("detach");
    sub.reader.delete_readcondition(&cond).expect("delete condition");
    drop(waitset);
    stop.stop();
    publisher.close();
    sub.close();
    assert!(factory().lookup_participant(200).is_none());
}

#[test]
fn test_subscriber_owns_fixed_buffer() {
    let sub = SubscriberSide::bootstrap(&EndpointOptions::on_domain(201), None, StatusMask::NONE)
        .expect("subscriber side");

    // Stages 16 and 17 already installed the buffer.
    let again = sub.reader.install_sample_buffer(
        SampleSeq::with_capacity(SAMPLE_CAPACITY).expect("samples"),
        SampleInfoSeq::with_capacity(SAMPLE_CAPACITY).expect("infos"),
    );
    assert!(matches!(again, Err(Error::PreconditionNotMet(_))));
    assert_eq!(take_and_print(&sub.reader, true).expect("take"), 0);
    sub.close();
}

/// Collects liveliness transitions reported to the reader.
#[derive(Default)]
struct LivelinessLog {
    events: Mutex<Vec<(u32, u32)>>,
}

impl DataReaderListener<Worker> for LivelinessLog {
    fn on_liveliness_changed(&self, _reader: &DataReader<Worker>, status: LivelinessChangedStatus) {
        self.events
            .lock()
            .push((status.alive_count, status.not_alive_count));
    }
}

#[test]
fn test_liveliness_subscriber_sees_writer_go_quiet() {
    let lease = Liveliness::manual_topic_millis(200);
    let log = Arc::new(LivelinessLog::default());
    let mut sub_options = EndpointOptions::on_domain(202);
    sub_options.liveliness = Some(lease);
    let sub = SubscriberSide::bootstrap(
        &sub_options,
        Some(log.clone()),
        StatusMask::LIVELINESS_CHANGED,
    )
    .expect("subscriber side");

    let mut pub_options = EndpointOptions::on_domain(202);
    pub_options.liveliness = Some(lease);
    let publisher = PublisherSide::bootstrap(&pub_options).expect("publisher side");
    assert_eq!(
        publisher.writer.get_qos().liveliness.kind,
        LivelinessKind::ManualByTopic
    );

    publisher.writer.write(&Worker::first()).expect("write");
    assert_eq!(teams(&sub.reader), vec![1]);

    // No more writes: the lease runs out once.
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline && !log.events.lock().contains(&(0, 1)) {
        thread::sleep(Duration::from_millis(20));
    }
    assert!(log.events.lock().contains(&(0, 1)));
    let status = sub.reader.get_liveliness_changed_status().expect("status");
    assert_eq!(status.alive_count + status.not_alive_count, 1);

    publisher.close();
    sub.close();
}

#[test]
fn test_default_publisher_fails_liveliness_request() {
    let mut sub_options = EndpointOptions::on_domain(203);
    sub_options.liveliness = Some(Liveliness::manual_topic_millis(2000));
    let sub = SubscriberSide::bootstrap(&sub_options, None, StatusMask::NONE)
        .expect("subscriber side");
    let publisher = PublisherSide::bootstrap(&EndpointOptions::on_domain(203)).expect("publisher side");

    assert_eq!(publisher.writer.matched_subscription_count(), 0);
    let requested = sub
        .reader
        .get_requested_incompatible_qos_status()
        .expect("status");
    assert_eq!(requested.last_policy_id, QosPolicyId::LIVELINESS);

    publisher.close();
    sub.close();
}

#[test]
fn test_qos_file_profile_applied_after_overlay() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(include_bytes!("../qos/workers_qos.yaml"))
        .expect("write yaml");
    file.flush().expect("flush");

    let mut options = EndpointOptions::on_domain(204);
    options.qos_file = Some(QosFile {
        path: file.path().to_path_buf(),
        profile: Some("late_joiner".into()),
    });
    let publisher = PublisherSide::bootstrap(&options).expect("publisher side");
    for _ in 0..3 {
        publisher.writer.write(&Worker::first()).expect("write");
    }

    let sub = SubscriberSide::bootstrap(&options, None, StatusMask::NONE).expect("subscriber side");
    let qos = sub.reader.get_qos();
    assert_eq!(qos.reliability, Reliability::Reliable);
    assert_eq!(qos.durability, Durability::TransientLocal);
    assert_eq!(qos.history, History::KeepLast(8));
    assert_eq!(teams(&sub.reader), vec![1, 1, 1]);

    // The default profile is MANUAL_BY_TOPIC with a 2 s lease.
    let mut default_options = EndpointOptions::on_domain(204);
    default_options.qos_file = Some(QosFile {
        path: file.path().to_path_buf(),
        profile: None,
    });
    let manual = SubscriberSide::bootstrap(&default_options, None, StatusMask::NONE)
        .expect("subscriber side");
    let liveliness = manual.reader.get_qos().liveliness;
    assert_eq!(liveliness.kind, LivelinessKind::ManualByTopic);
    assert_eq!(liveliness.lease_duration, Duration::from_secs(2));

    manual.close();
    sub.close();
    publisher.close();
}

#[test]
fn test_missing_qos_file_fails_overlay_stage() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut options = EndpointOptions::on_domain(205);
    options.qos_file = Some(QosFile {
        path: dir.path().join("absent.yaml"),
        profile: None,
    });

    let err = SubscriberSide::bootstrap(&options, None, StatusMask::NONE)
        .err()
        .expect("missing file");
    assert_eq!(err.stage, Stage::TopicQosOverlay);
    assert_eq!(err.exit_code(), 12);
    assert!(matches!(err.source, Error::ConfigFileNotFound(_)));

    // The half-built participant was released.
    assert!(factory().lookup_participant(205).is_none());
}

#[test]
fn test_bad_domain_fails_participant_stage() {
    let err = PublisherSide::bootstrap(&EndpointOptions::on_domain(500))
        .err()
        .expect("bad domain");
    assert_eq!(err.stage, Stage::Participant);
    assert_eq!(err.exit_code(), 3);
    assert!(matches!(err.source, Error::InvalidDomainId(500)));
}

#[test]
fn test_stopped_token_publishes_nothing() {
    let publisher = PublisherSide::bootstrap(&EndpointOptions::on_domain(206)).expect("publisher side");
    let stop = StopToken::new();
    stop.stop();

    let mut printed = 0;
    let report = PublishLoop::new(Duration::from_millis(10))
        .run(&publisher.writer, &stop, Worker::nth, |_| printed += 1)
        .expect("publish loop");
    assert_eq!(report.published, 0);
    assert!(report.stopped);
    assert_eq!(printed, 0);
    publisher.close();
}

#[test]
fn test_loop_timing_follows_runtime_config() {
    let config = factory().runtime_config();
    let original = config.loop_timing();
    assert_eq!(dcps_samples_workers::loop_timing(), original);

    let mut timing = original;
    timing.publish_period = Duration::from_millis(20);
    timing.wait_timeout = Duration::from_millis(300);
    config.set_loop_timing(timing);
    let seen = dcps_samples_workers::loop_timing();
    config.set_loop_timing(original);

    assert_eq!(seen.publish_period, Duration::from_millis(20));
    assert_eq!(seen.wait_timeout, Duration::from_millis(300));
    assert_eq!(PublishLoop::from_timing(&seen).period, Duration::from_millis(20));
}
