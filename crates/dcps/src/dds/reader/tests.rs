// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::cache::{Change, ChangeKind};
use super::endpoint::{ListenerSlot, ReaderInner};
use super::*;
use crate::core::{EntityKind, Guid};
use crate::dds::domain_registry::{EndpointInfo, EndpointLink, EndpointQos};
use crate::dds::listener::{QosPolicyId, SampleRejectedReason};
use crate::dds::qos::DataReaderQos;
use crate::dds::{
    ClosureListener, DataReaderListener, Error, InstanceStateMask, SampleStateMask, StatusMask,
    ViewStateMask, DDS,
};
use crate::qos::liveliness::Liveliness;
use crate::qos::partition::Partition;
use crate::qos::time_based_filter::TimeBasedFilter;
use crate::qos::{Durability, History, Reliability, ResourceLimits};
use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Clone, Debug, PartialEq)]
struct Reading {
    sensor: u8,
    value: u32,
}

impl DDS for Reading {
    fn type_name() -> &'static str {
        "Test::Reading"
    }

    fn compute_key(&self) -> [u8; 16] {
        let mut key = [0u8; 16];
        key[0] = self.sensor;
        key
    }

    fn has_key() -> bool {
        true
    }
}

struct NullLink;

impl EndpointLink for NullLink {
    fn peer_matched(&self, _peer: &EndpointInfo) {}

    fn peer_unmatched(&self, _peer: Guid) {}

    fn incompatible_peer(&self, _peer: Guid, _policy: QosPolicyId) {}

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

const ANY: (SampleStateMask, ViewStateMask, InstanceStateMask) = (
    SampleStateMask::ANY,
    ViewStateMask::ANY,
    InstanceStateMask::ANY,
);

fn writer_guid(n: u32) -> Guid {
    Guid::new([4; 12], n, EntityKind::Writer)
}

fn spawn(qos: DataReaderQos) -> Arc<ReaderInner<Reading>> {
    spawn_with(qos, 8, None)
}

fn spawn_with(
    qos: DataReaderQos,
    capacity: usize,
    listener: ListenerSlot<Reading>,
) -> Arc<ReaderInner<Reading>> {
    let guid = Guid::new([3; 12], 1, EntityKind::Reader);
    ReaderInner::spawn(guid, Arc::from("Readings"), qos, capacity, listener).expect("spawn reader")
}

fn write(reader: &ReaderInner<Reading>, writer: Guid, sensor: u8, value: u32) {
    let sample = Reading { sensor, value };
    let instance = InstanceHandle::new(sample.compute_key());
    reader.deliver(Change::write(sample, instance, writer));
}

fn instance_of(sensor: u8) -> InstanceHandle {
    InstanceHandle::new(Reading { sensor, value: 0 }.compute_key())
}

fn match_writer(reader: &ReaderInner<Reading>, writer: Guid, liveliness: Liveliness) {
    let info = EndpointInfo {
        guid: writer,
        qos: EndpointQos {
            reliability: Reliability::Reliable,
            durability: Durability::Volatile,
            liveliness,
            partition: Partition::default(),
        },
        link: Arc::new(NullLink),
    };
    reader.peer_matched(&info);
}

fn eventually(mut f: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        if f() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    false
}

fn values(loan: &SampleLoan<'_, Reading>) -> Vec<u32> {
    loan.iter().filter_map(|s| s.data().map(|r| r.value)).collect()
}

#[test]
fn take_drains_cache_in_arrival_order() {
    let inner = spawn(DataReaderQos {
        history: History::KeepLast(4),
        ..DataReaderQos::default()
    });
    let reader = DataReader::from_inner(Arc::clone(&inner));
    let writer = writer_guid(1);
    for value in 1..=3 {
        write(&inner, writer, 1, value);
    }

    let loan = reader.take(8, ANY.0, ANY.1, ANY.2).expect("take").expect("data");
    assert_eq!(values(&loan), vec![1, 2, 3]);
    assert!(loan.iter().all(|s| s.info().valid_data));
    loan.return_loan();

    assert!(reader.take(8, ANY.0, ANY.1, ANY.2).expect("take").is_none());
}

#[test]
fn read_marks_samples_read() {
    let inner = spawn(DataReaderQos::default());
    let reader = DataReader::from_inner(Arc::clone(&inner));
    write(&inner, writer_guid(1), 1, 10);

    {
        let loan = reader.read(8, ANY.0, ANY.1, ANY.2).expect("read").expect("data");
        assert_eq!(loan.infos()[0].sample_state, SampleState::NotRead);
        assert_eq!(loan.infos()[0].view_state, ViewState::New);
    }

    let unread = reader
        .read(8, SampleStateMask::NOT_READ, ViewStateMask::ANY, InstanceStateMask::ANY)
        .expect("read");
    assert!(unread.is_none());

    let loan = reader
        .take(8, SampleStateMask::READ, ViewStateMask::NOT_NEW, InstanceStateMask::ALIVE)
        .expect("take")
        .expect("read sample still cached");
    assert_eq!(loan.infos()[0].sample_state, SampleState::Read);
}

#[test]
fn max_samples_zero_returns_nothing() {
    let inner = spawn(DataReaderQos::default());
    let reader = DataReader::from_inner(Arc::clone(&inner));
    write(&inner, writer_guid(1), 1, 10);
    assert!(reader.take(0, ANY.0, ANY.1, ANY.2).expect("take").is_none());
    assert!(reader.take(1, ANY.0, ANY.1, ANY.2).expect("take").is_some());
}

#[test]
fn zero_max_take_still_needs_the_loan() {
    let inner = spawn(DataReaderQos::default());
    let reader = DataReader::from_inner(Arc::clone(&inner));
    write(&inner, writer_guid(1), 1, 10);

    let loan = reader.take(1, ANY.0, ANY.1, ANY.2).expect("take").expect("data");
    assert!(matches!(
        reader.take(0, ANY.0, ANY.1, ANY.2),
        Err(Error::PreconditionNotMet(_))
    ));
    assert!(matches!(
        reader.read(0, ANY.0, ANY.1, ANY.2),
        Err(Error::PreconditionNotMet(_))
    ));
    drop(loan);
    assert!(reader.take(0, ANY.0, ANY.1, ANY.2).expect("take").is_none());
}

#[test]
fn outstanding_loan_blocks_next_take() {
    let inner = spawn(DataReaderQos {
        history: History::KeepLast(4),
        ..DataReaderQos::default()
    });
    let reader = DataReader::from_inner(Arc::clone(&inner));
    write(&inner, writer_guid(1), 1, 1);
    write(&inner, writer_guid(1), 1, 2);

    let loan = reader.take(1, ANY.0, ANY.1, ANY.2).expect("take").expect("data");
    assert!(reader.has_outstanding_loan());
    assert!(matches!(
        reader.take(1, ANY.0, ANY.1, ANY.2),
        Err(Error::PreconditionNotMet(_))
    ));
    assert!(matches!(
        reader.read(1, ANY.0, ANY.1, ANY.2),
        Err(Error::PreconditionNotMet(_))
    ));

    // take_next_sample copies out of the cache and ignores the loan.
    let (data, info) = reader.take_next_sample().expect("take_next").expect("sample");
    assert_eq!(data.map(|r| r.value), Some(2));
    assert!(info.valid_data);

    drop(loan);
    assert!(!reader.has_outstanding_loan());
    assert!(reader.take(1, ANY.0, ANY.1, ANY.2).expect("take").is_none());
}

#[test]
fn installed_buffer_bounds_each_take() {
    let inner = spawn(DataReaderQos {
        history: History::KeepLast(8),
        ..DataReaderQos::default()
    });
    let reader = DataReader::from_inner(Arc::clone(&inner));

    let mismatch = reader.install_sample_buffer(
        SampleSeq::with_capacity(2).expect("seq"),
        SampleInfoSeq::with_capacity(3).expect("seq"),
    );
    assert!(matches!(mismatch, Err(Error::BadParameter(_))));

    reader
        .install_sample_buffer(
            SampleSeq::with_capacity(2).expect("seq"),
            SampleInfoSeq::with_capacity(2).expect("seq"),
        )
        .expect("install");
    assert!(matches!(
        reader.install_sample_buffer(
            SampleSeq::with_capacity(2).expect("seq"),
            SampleInfoSeq::with_capacity(2).expect("seq"),
        ),
        Err(Error::PreconditionNotMet(_))
    ));

    for value in 0..5 {
        write(&inner, writer_guid(1), 1, value);
    }
    let loan = reader.take(100, ANY.0, ANY.1, ANY.2).expect("take").expect("data");
    assert_eq!(loan.len(), 2);
    assert_eq!(values(&loan), vec![0, 1]);
}

#[test]
fn dispose_reaches_reader_as_invalid_sample() {
    let inner = spawn(DataReaderQos::default());
    let reader = DataReader::from_inner(Arc::clone(&inner));
    let writer = writer_guid(1);
    write(&inner, writer, 7, 1);
    reader.take(8, ANY.0, ANY.1, ANY.2).expect("take");

    inner.deliver(Change::lifecycle(ChangeKind::Dispose, instance_of(7), writer));
    let loan = reader
        .take(8, ANY.0, ANY.1, InstanceStateMask::NOT_ALIVE)
        .expect("take")
        .expect("dispose sample");
    let sample = loan.get(0).expect("slot");
    assert!(!sample.is_valid());
    assert!(sample.data().is_none());
    assert_eq!(sample.info().instance_state, InstanceState::NotAliveDisposed);
}

#[test]
fn unmatch_marks_instances_no_writers() {
    let inner = spawn(DataReaderQos::default());
    let reader = DataReader::from_inner(Arc::clone(&inner));
    let writer = writer_guid(2);
    match_writer(&inner, writer, Liveliness::default());
    write(&inner, writer, 3, 1);
    reader.take(8, ANY.0, ANY.1, ANY.2).expect("take");

    inner.peer_unmatched(writer);
    let loan = reader.take(8, ANY.0, ANY.1, ANY.2).expect("take").expect("lifecycle");
    assert_eq!(loan.infos()[0].instance_state, InstanceState::NotAliveNoWriters);
    assert_eq!(reader.matched_publication_count(), 0);
}

#[test]
fn read_condition_follows_cache() {
    let inner = spawn(DataReaderQos::default());
    let reader = DataReader::from_inner(Arc::clone(&inner));
    let cond = reader
        .create_readcondition(
            SampleStateMask::NOT_READ,
            ViewStateMask::ANY,
            InstanceStateMask::ALIVE,
        )
        .expect("condition");
    assert!(!cond.get_trigger_value());

    write(&inner, writer_guid(1), 1, 5);
    assert!(cond.get_trigger_value());

    let loan = reader.take_w_condition(&cond, 8).expect("take").expect("data");
    assert_eq!(values(&loan), vec![5]);
    drop(loan);
    assert!(!cond.get_trigger_value());

    reader.delete_readcondition(&cond).expect("delete");
    assert!(matches!(
        reader.delete_readcondition(&cond),
        Err(Error::AlreadyDeleted)
    ));
    assert!(matches!(
        reader.take_w_condition(&cond, 8),
        Err(Error::AlreadyDeleted)
    ));
}

#[test]
fn foreign_condition_is_rejected() {
    let a = DataReader::from_inner(spawn(DataReaderQos::default()));
    let b = DataReader::from_inner(spawn(DataReaderQos::default()));
    let cond = a
        .create_readcondition(ANY.0, ANY.1, ANY.2)
        .expect("condition");
    assert!(matches!(
        b.take_w_condition(&cond, 1),
        Err(Error::BadParameter(_))
    ));
    assert!(matches!(
        b.delete_readcondition(&cond),
        Err(Error::BadParameter(_))
    ));
}

#[test]
fn query_condition_selects_by_content() {
    let inner = spawn(DataReaderQos {
        history: History::KeepLast(8),
        ..DataReaderQos::default()
    });
    let reader = DataReader::from_inner(Arc::clone(&inner));
    let query = reader
        .create_querycondition(
            ANY.0,
            ANY.1,
            ANY.2,
            "value >= %0",
            vec!["3".to_string()],
            |r: &Reading, params: &[String]| {
                params
                    .first()
                    .and_then(|p| p.parse::<u32>().ok())
                    .is_some_and(|min| r.value >= min)
            },
        )
        .expect("query");

    write(&inner, writer_guid(1), 1, 1);
    assert!(!query.get_trigger_value());
    write(&inner, writer_guid(1), 1, 4);
    assert!(query.get_trigger_value());

    {
        let loan = reader.read_w_condition(&query, 8).expect("read").expect("data");
        assert_eq!(values(&loan), vec![4]);
    }
    query.set_query_parameters(vec!["0".to_string()]);
    let loan = reader.take_w_condition(&query, 8).expect("take").expect("data");
    assert_eq!(values(&loan), vec![1, 4]);
}

#[test]
fn delete_contained_entities_invalidates_conditions() {
    let inner = spawn(DataReaderQos::default());
    let reader = DataReader::from_inner(Arc::clone(&inner));
    let cond = reader.create_readcondition(ANY.0, ANY.1, ANY.2).expect("cond");
    write(&inner, writer_guid(1), 1, 1);
    assert!(cond.get_trigger_value());

    reader.delete_contained_entities().expect("delete");
    assert!(!cond.get_trigger_value());
    assert!(format!("{:?}", reader).contains("conditions: 0"));
}

#[test]
fn matched_status_counts_and_resets() {
    let inner = spawn(DataReaderQos::default());
    let reader = DataReader::from_inner(Arc::clone(&inner));
    let status_cond = reader.get_status_condition();
    status_cond.set_enabled_statuses(StatusMask::SUBSCRIPTION_MATCHED);

    match_writer(&inner, writer_guid(5), Liveliness::default());
    assert!(status_cond.get_trigger_value());

    let status = reader.get_subscription_matched_status().expect("status");
    assert_eq!(status.total_count, 1);
    assert_eq!(status.current_count, 1);
    assert_eq!(status.current_count_change, 1);
    assert_eq!(
        status.last_publication_handle,
        InstanceHandle::from_guid(writer_guid(5))
    );
    assert!(!status_cond.get_trigger_value());

    let again = reader.get_subscription_matched_status().expect("status");
    assert_eq!(again.total_count_change, 0);
    assert_eq!(again.current_count_change, 0);
}

#[test]
fn incompatible_writer_is_counted() {
    let inner = spawn(DataReaderQos::default());
    let reader = DataReader::from_inner(Arc::clone(&inner));
    inner.incompatible_peer(writer_guid(9), QosPolicyId::RELIABILITY);

    let status = reader.get_requested_incompatible_qos_status().expect("status");
    assert_eq!(status.total_count, 1);
    assert_eq!(status.last_policy_id, QosPolicyId::RELIABILITY);
}

#[test]
fn keep_all_limit_rejects_and_blocks_reliable_writers() {
    let inner = spawn(DataReaderQos {
        reliability: Reliability::Reliable,
        history: History::KeepAll,
        resource_limits: ResourceLimits {
            max_samples: 1,
            max_instances: 1,
            max_samples_per_instance: 1,
        },
        ..DataReaderQos::default()
    });
    let reader = DataReader::from_inner(Arc::clone(&inner));
    assert!(!inner.would_block(&instance_of(1)));
    write(&inner, writer_guid(1), 1, 1);
    assert!(inner.would_block(&instance_of(1)));

    // Delivered anyway (a best-effort path): rejected and counted.
    write(&inner, writer_guid(1), 1, 2);
    let status = reader.get_sample_rejected_status().expect("status");
    assert_eq!(status.total_count, 1);
    assert_ne!(status.last_reason, SampleRejectedReason::NotRejected);

    reader.take(8, ANY.0, ANY.1, ANY.2).expect("take");
    assert!(!inner.would_block(&instance_of(1)));
}

#[test]
fn best_effort_reader_never_blocks() {
    let inner = spawn(DataReaderQos {
        history: History::KeepAll,
        resource_limits: ResourceLimits {
            max_samples: 1,
            max_instances: 1,
            max_samples_per_instance: 1,
        },
        ..DataReaderQos::default()
    });
    write(&inner, writer_guid(1), 1, 1);
    assert!(!inner.would_block(&instance_of(1)));
}

#[test]
fn time_based_filter_coalesces_bursts() {
    let inner = spawn(DataReaderQos {
        time_based_filter: TimeBasedFilter::from_millis(100),
        ..DataReaderQos::default()
    });
    let reader = DataReader::from_inner(Arc::clone(&inner));
    let writer = writer_guid(1);
    match_writer(&inner, writer, Liveliness::infinite());
    for value in 1..=5 {
        write(&inner, writer, 1, value);
    }

    let first = reader.take(8, ANY.0, ANY.1, ANY.2).expect("take").expect("first");
    assert_eq!(values(&first), vec![1]);
    drop(first);

    // The newest held sample is flushed once the separation elapsed.
    let mut flushed = Vec::new();
    assert!(eventually(|| {
        if let Ok(Some(loan)) = reader.take(8, ANY.0, ANY.1, ANY.2) {
            flushed.extend(values(&loan));
        }
        !flushed.is_empty()
    }));
    assert_eq!(flushed, vec![5]);
}

#[test]
fn time_based_filter_keeps_instances_apart() {
    let inner = spawn(DataReaderQos {
        time_based_filter: TimeBasedFilter::from_millis(500),
        ..DataReaderQos::default()
    });
    let reader = DataReader::from_inner(Arc::clone(&inner));
    write(&inner, writer_guid(1), 1, 10);
    write(&inner, writer_guid(1), 2, 20);

    let loan = reader.take(8, ANY.0, ANY.1, ANY.2).expect("take").expect("data");
    let mut got = values(&loan);
    got.sort_unstable();
    assert_eq!(got, vec![10, 20]);
}

#[test]
fn lease_expiry_and_revival() {
    let inner = spawn(DataReaderQos::default());
    let reader = DataReader::from_inner(Arc::clone(&inner));
    let writer = writer_guid(3);
    match_writer(&inner, writer, Liveliness::manual_topic_millis(150));

    let status = reader.get_liveliness_changed_status().expect("status");
    assert_eq!(status.alive_count, 1);
    assert_eq!(status.not_alive_count, 0);

    let mut lost = None;
    assert!(eventually(|| {
        let s = reader.get_liveliness_changed_status().expect("status");
        if s.not_alive_count == 1 {
            lost = Some(s);
        }
        lost.is_some()
    }));
    let lost = lost.expect("lost status");
    assert_eq!(lost.alive_count, 0);
    assert_eq!(lost.alive_count + lost.not_alive_count, 1);

    inner.assert_writer(writer);
    let back = reader.get_liveliness_changed_status().expect("status");
    assert_eq!(back.alive_count, 1);
    assert_eq!(back.not_alive_count, 0);
    assert_eq!(back.alive_count_change, 1);
    assert_eq!(back.not_alive_count_change, -1);
}

#[test]
fn lost_writer_releases_its_instances() {
    let inner = spawn(DataReaderQos::default());
    let reader = DataReader::from_inner(Arc::clone(&inner));
    let writer = writer_guid(4);
    match_writer(&inner, writer, Liveliness::manual_topic_millis(60));
    write(&inner, writer, 1, 1);
    reader.take(8, ANY.0, ANY.1, ANY.2).expect("take");

    let mut state = None;
    assert!(eventually(|| {
        if let Ok(Some(loan)) = reader.take(8, ANY.0, ANY.1, ANY.2) {
            state = loan.infos().first().map(|i| i.instance_state);
        }
        state.is_some()
    }));
    assert_eq!(state, Some(InstanceState::NotAliveNoWriters));
}

#[test]
fn listener_runs_on_dispatch_thread() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let caller = thread::current().id();
    let listener = ClosureListener::new(move |reader: &DataReader<Reading>| {
        assert_ne!(thread::current().id(), caller);
        if let Ok(Some(loan)) = reader.take(8, ANY.0, ANY.1, ANY.2) {
            counter.fetch_add(loan.len(), Ordering::SeqCst);
        }
    });
    let listener: Arc<dyn DataReaderListener<Reading>> = Arc::new(listener);
    let inner = spawn_with(
        DataReaderQos::default(),
        8,
        Some((listener, StatusMask::DATA_AVAILABLE)),
    );

    write(&inner, writer_guid(1), 1, 1);
    assert!(eventually(|| hits.load(Ordering::SeqCst) == 1));
}

#[test]
fn silenced_listener_leaves_samples_cached() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let listener: Arc<dyn DataReaderListener<Reading>> =
        Arc::new(ClosureListener::new(move |_: &DataReader<Reading>| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
    let inner = spawn_with(DataReaderQos::default(), 8, Some((listener, StatusMask::NONE)));
    let reader = DataReader::from_inner(Arc::clone(&inner));

    write(&inner, writer_guid(1), 1, 1);
    thread::sleep(Duration::from_millis(50));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert!(reader.take(8, ANY.0, ANY.1, ANY.2).expect("take").is_some());
}

#[test]
fn teardown_is_one_shot() {
    let inner = spawn(DataReaderQos::default());
    let reader = DataReader::from_inner(Arc::clone(&inner));
    let cond = reader.create_readcondition(ANY.0, ANY.1, ANY.2).expect("cond");
    write(&inner, writer_guid(1), 1, 1);

    inner.teardown().expect("first teardown");
    assert!(matches!(inner.teardown(), Err(Error::AlreadyDeleted)));
    assert!(reader.is_deleted());
    assert!(!cond.get_trigger_value());
    assert!(matches!(
        reader.take(1, ANY.0, ANY.1, ANY.2),
        Err(Error::AlreadyDeleted)
    ));
    assert!(matches!(
        reader.get_sample_rejected_status(),
        Err(Error::AlreadyDeleted)
    ));

    // Deliveries after teardown are dropped.
    write(&inner, writer_guid(1), 1, 2);
    assert!(!cond.get_trigger_value());
}

#[test]
fn unmatched_writer_never_flushes_held_sample() {
    let inner = spawn(DataReaderQos {
        time_based_filter: TimeBasedFilter::from_millis(100),
        ..DataReaderQos::default()
    });
    let reader = DataReader::from_inner(Arc::clone(&inner));
    let writer = writer_guid(6);
    match_writer(&inner, writer, Liveliness::infinite());
    write(&inner, writer, 1, 1);
    write(&inner, writer, 1, 2);
    inner.peer_unmatched(writer);
    thread::sleep(Duration::from_millis(250));

    let loan = reader.take(8, ANY.0, ANY.1, ANY.2).expect("take").expect("data");
    let slots: Vec<(Option<u32>, InstanceState)> = loan
        .iter()
        .map(|s| (s.data().map(|r| r.value), s.info().instance_state))
        .collect();
    assert_eq!(
        slots,
        vec![
            (Some(1), InstanceState::NotAliveNoWriters),
            (None, InstanceState::NotAliveNoWriters),
        ]
    );
    assert_eq!(inner.matched_writer_count(), 0);
}

#[test]
fn purged_instances_drop_their_filters() {
    let inner = spawn(DataReaderQos {
        time_based_filter: TimeBasedFilter::from_millis(50),
        ..DataReaderQos::default()
    });
    let reader = DataReader::from_inner(Arc::clone(&inner));
    let writer = writer_guid(7);
    match_writer(&inner, writer, Liveliness::infinite());
    for sensor in 1..=4 {
        write(&inner, writer, sensor, u32::from(sensor));
    }
    assert_eq!(inner.filter_count(), 4);

    inner.peer_unmatched(writer);
    reader.take(8, ANY.0, ANY.1, ANY.2).expect("take");
    assert_eq!(inner.filter_count(), 0);
}

#[test]
fn racing_writers_see_would_block_not_rejection() {
    let inner = spawn(DataReaderQos {
        reliability: Reliability::Reliable,
        history: History::KeepAll,
        resource_limits: ResourceLimits {
            max_samples: 1,
            max_instances: 1,
            max_samples_per_instance: 1,
        },
        ..DataReaderQos::default()
    });
    let reader = DataReader::from_inner(Arc::clone(&inner));

    // Check and insert under one lock, as a writer does.
    let accepted: Vec<bool> = (1..=8u32)
        .map(|n| {
            let inner = Arc::clone(&inner);
            thread::spawn(move || {
                let sample = Reading { sensor: 1, value: n };
                let instance = InstanceHandle::new(sample.compute_key());
                let guard = inner.lock_delivery();
                if guard.would_block(&instance) {
                    false
                } else {
                    guard.deliver(Change::write(sample, instance, writer_guid(n)));
                    true
                }
            })
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|h| h.join().expect("writer thread"))
        .collect();

    assert_eq!(accepted.iter().filter(|a| **a).count(), 1);
    let status = reader.get_sample_rejected_status().expect("status");
    assert_eq!(status.total_count, 0);
}
