// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Sample cache for DataReader with read/take semantics.
//!
//! Samples are kept in arrival order together with the per-instance state
//! (view state, instance state, registered writers). Sample state is per
//! sample; view and instance state are per instance and are evaluated when
//! a sample is handed out.
//!
//! ```text
//! samples:   [S0 a][S1 b][S2 a][S3 a(dispose)]
//! instances: a -> {NOT_ALIVE_DISPOSED, NOT_NEW, writers: {w1}}
//!            b -> {ALIVE, NEW, writers: {w1, w2}}
//!
//! read()  -> copies matching samples, marks them READ
//! take()  -> moves matching samples out of the cache
//! ```

use crate::core::Guid;
use crate::dds::listener::SampleRejectedReason;
use crate::dds::read_condition::{
    InstanceStateMask, QueryParts, SampleStateMask, StateMasks, ViewStateMask,
};
use crate::qos::{History, ResourceLimits};
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::time::SystemTime;

/// Sample state per DDS spec (NOT_READ vs READ).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleState {
    /// Sample has not been read yet.
    NotRead,
    /// Sample has been accessed via `read()`.
    Read,
}

impl SampleState {
    pub(crate) fn mask(self) -> SampleStateMask {
        match self {
            SampleState::NotRead => SampleStateMask::NOT_READ,
            SampleState::Read => SampleStateMask::READ,
        }
    }
}

/// View state per DDS spec (NEW vs NOT_NEW), tracked per instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    /// First time the application sees this instance (or this generation of it).
    New,
    /// The instance was already accessed.
    NotNew,
}

impl ViewState {
    pub(crate) fn mask(self) -> ViewStateMask {
        match self {
            ViewState::New => ViewStateMask::NEW,
            ViewState::NotNew => ViewStateMask::NOT_NEW,
        }
    }
}

/// Instance state per DDS spec, tracked per instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    /// At least one live writer has the instance registered.
    Alive,
    /// A writer disposed the instance.
    NotAliveDisposed,
    /// Every writer unregistered, was unmatched, or lost liveliness.
    NotAliveNoWriters,
}

impl InstanceState {
    pub(crate) fn mask(self) -> InstanceStateMask {
        match self {
            InstanceState::Alive => InstanceStateMask::ALIVE,
            InstanceState::NotAliveDisposed => InstanceStateMask::NOT_ALIVE_DISPOSED,
            InstanceState::NotAliveNoWriters => InstanceStateMask::NOT_ALIVE_NO_WRITERS,
        }
    }

    #[must_use]
    pub fn is_alive(self) -> bool {
        self == InstanceState::Alive
    }
}

/// Instance handle for keyed topics (16-byte key hash).
///
/// Keyless topics put every sample in the nil instance. Publication
/// handles use the same representation, filled with the writer GUID.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InstanceHandle([u8; 16]);

impl InstanceHandle {
    /// Nil handle (keyless instance, or "no publication yet").
    pub const NIL: InstanceHandle = InstanceHandle([0u8; 16]);

    /// Create a new instance handle from a key hash.
    #[must_use]
    pub const fn new(key_hash: [u8; 16]) -> Self {
        Self(key_hash)
    }

    /// Handle naming an endpoint.
    #[must_use]
    pub fn from_guid(guid: Guid) -> Self {
        Self(guid.as_bytes())
    }

    #[must_use]
    pub fn is_nil(&self) -> bool {
        self.0 == [0u8; 16]
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Debug for InstanceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstanceHandle(")?;
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, ")")
    }
}

/// Metadata accompanying each loaned sample slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleInfo {
    pub sample_state: SampleState,
    pub view_state: ViewState,
    pub instance_state: InstanceState,
    /// `false` marks an instance lifecycle transition with no payload.
    pub valid_data: bool,
    pub instance_handle: InstanceHandle,
    /// Writer that produced the sample.
    pub publication_handle: InstanceHandle,
    pub source_timestamp: SystemTime,
    pub disposed_generation_count: u32,
    pub no_writers_generation_count: u32,
}

/// What a writer did to an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChangeKind {
    Write,
    Dispose,
    Unregister,
}

/// One change travelling from a writer to a reader cache.
#[derive(Debug, Clone)]
pub(crate) struct Change<T> {
    pub kind: ChangeKind,
    pub data: Option<T>,
    pub instance: InstanceHandle,
    pub writer: Guid,
    pub source_timestamp: SystemTime,
}

impl<T> Change<T> {
    pub(crate) fn write(data: T, instance: InstanceHandle, writer: Guid) -> Self {
        Self {
            kind: ChangeKind::Write,
            data: Some(data),
            instance,
            writer,
            source_timestamp: SystemTime::now(),
        }
    }

    pub(crate) fn lifecycle(kind: ChangeKind, instance: InstanceHandle, writer: Guid) -> Self {
        Self {
            kind,
            data: None,
            instance,
            writer,
            source_timestamp: SystemTime::now(),
        }
    }
}

struct CachedSample<T> {
    data: Option<T>,
    instance: InstanceHandle,
    publication_handle: InstanceHandle,
    source_timestamp: SystemTime,
    state: SampleState,
    disposed_generation_count: u32,
    no_writers_generation_count: u32,
}

struct InstanceRecord {
    state: InstanceState,
    view: ViewState,
    writers: HashSet<Guid>,
    disposed_generation_count: u32,
    no_writers_generation_count: u32,
}

impl InstanceRecord {
    fn new() -> Self {
        Self {
            state: InstanceState::Alive,
            view: ViewState::New,
            writers: HashSet::new(),
            disposed_generation_count: 0,
            no_writers_generation_count: 0,
        }
    }

    /// Bring a not-alive instance back; counts a new generation.
    fn revive(&mut self) {
        match self.state {
            InstanceState::Alive => return,
            InstanceState::NotAliveDisposed => self.disposed_generation_count += 1,
            InstanceState::NotAliveNoWriters => self.no_writers_generation_count += 1,
        }
        self.state = InstanceState::Alive;
        self.view = ViewState::New;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Admit {
    Append,
    EvictOldest,
}

/// Per-reader history and instance table.
pub(crate) struct ReaderCache<T> {
    samples: VecDeque<CachedSample<T>>,
    instances: HashMap<InstanceHandle, InstanceRecord>,
    history: History,
    limits: ResourceLimits,
}

impl<T: 'static> ReaderCache<T> {
    pub(crate) fn new(history: History, limits: ResourceLimits) -> Self {
        Self {
            samples: VecDeque::new(),
            instances: HashMap::new(),
            history,
            limits,
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.samples.len()
    }

    #[cfg(test)]
    pub(crate) fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub(crate) fn knows_instance(&self, instance: &InstanceHandle) -> bool {
        self.instances.contains_key(instance)
    }

    #[cfg(test)]
    pub(crate) fn instance_state(&self, instance: &InstanceHandle) -> Option<InstanceState> {
        self.instances.get(instance).map(|rec| rec.state)
    }

    /// Whether a data sample for `instance` would be rejected right now.
    pub(crate) fn would_reject(&self, instance: &InstanceHandle) -> bool {
        self.check_capacity(instance).is_err()
    }

    fn count_for(&self, instance: &InstanceHandle) -> usize {
        self.samples
            .iter()
            .filter(|s| s.instance == *instance)
            .count()
    }

    fn check_capacity(&self, instance: &InstanceHandle) -> Result<Admit, SampleRejectedReason> {
        if !self.instances.contains_key(instance)
            && self.instances.len() >= self.limits.max_instances
        {
            return Err(SampleRejectedReason::InstanceLimit);
        }

        let in_instance = self.count_for(instance);
        match self.history {
            History::KeepLast(depth) => {
                let per_instance = (depth as usize).min(self.limits.max_samples_per_instance);
                if in_instance >= per_instance || self.samples.len() >= self.limits.max_samples {
                    if in_instance > 0 {
                        Ok(Admit::EvictOldest)
                    } else {
                        Err(SampleRejectedReason::ResourceLimit)
                    }
                } else {
                    Ok(Admit::Append)
                }
            }
            History::KeepAll => {
                if in_instance >= self.limits.max_samples_per_instance {
                    Err(SampleRejectedReason::SamplesPerInstanceLimit)
                } else if self.samples.len() >= self.limits.max_samples {
                    Err(SampleRejectedReason::ResourceLimit)
                } else {
                    Ok(Admit::Append)
                }
            }
        }
    }

    fn evict_oldest(&mut self, instance: &InstanceHandle) {
        if let Some(pos) = self.samples.iter().position(|s| s.instance == *instance) {
            self.samples.remove(pos);
        }
    }

    /// Apply one change. Returns whether a sample was queued.
    ///
    /// Data samples may be rejected by resource limits. Lifecycle samples
    /// are never rejected; under KEEP_LAST they still evict the instance's
    /// oldest sample.
    pub(crate) fn insert(&mut self, change: Change<T>) -> Result<bool, SampleRejectedReason> {
        let Change {
            kind,
            data,
            instance,
            writer,
            source_timestamp,
        } = change;

        match kind {
            ChangeKind::Write => {
                let admit = self.check_capacity(&instance)?;
                let record = self
                    .instances
                    .entry(instance)
                    .or_insert_with(InstanceRecord::new);
                record.revive();
                record.writers.insert(writer);
                if admit == Admit::EvictOldest {
                    self.evict_oldest(&instance);
                }
                self.push(instance, data, writer, source_timestamp);
                Ok(true)
            }
            ChangeKind::Dispose => {
                let record = self
                    .instances
                    .entry(instance)
                    .or_insert_with(InstanceRecord::new);
                if record.state == InstanceState::NotAliveDisposed {
                    return Ok(false);
                }
                record.state = InstanceState::NotAliveDisposed;
                self.push_lifecycle(instance, writer, source_timestamp);
                Ok(true)
            }
            ChangeKind::Unregister => Ok(self.release_writer(instance, writer, source_timestamp)),
        }
    }

    /// Forget `writer` on every instance it registered (unmatch or lost
    /// liveliness). Returns the number of instances that became
    /// NOT_ALIVE_NO_WRITERS.
    pub(crate) fn drop_writer(&mut self, writer: Guid) -> usize {
        let owned: Vec<InstanceHandle> = self
            .instances
            .iter()
            .filter(|(_, rec)| rec.writers.contains(&writer))
            .map(|(handle, _)| *handle)
            .collect();

        let now = SystemTime::now();
        owned
            .into_iter()
            .filter(|instance| self.release_writer(*instance, writer, now))
            .count()
    }

    fn release_writer(&mut self, instance: InstanceHandle, writer: Guid, at: SystemTime) -> bool {
        let Some(record) = self.instances.get_mut(&instance) else {
            return false;
        };
        record.writers.remove(&writer);
        if !record.writers.is_empty() || record.state != InstanceState::Alive {
            return false;
        }
        record.state = InstanceState::NotAliveNoWriters;
        self.push_lifecycle(instance, writer, at);
        true
    }

    fn push_lifecycle(&mut self, instance: InstanceHandle, writer: Guid, at: SystemTime) {
        if let History::KeepLast(depth) = self.history {
            if self.count_for(&instance) >= depth as usize {
                self.evict_oldest(&instance);
            }
        }
        self.push(instance, None, writer, at);
    }

    fn push(&mut self, instance: InstanceHandle, data: Option<T>, writer: Guid, at: SystemTime) {
        let (disposed, no_writers) = self
            .instances
            .get(&instance)
            .map(|r| (r.disposed_generation_count, r.no_writers_generation_count))
            .unwrap_or_default();
        self.samples.push_back(CachedSample {
            data,
            instance,
            publication_handle: InstanceHandle::from_guid(writer),
            source_timestamp: at,
            state: SampleState::NotRead,
            disposed_generation_count: disposed,
            no_writers_generation_count: no_writers,
        });
    }

    fn matches(&self, sample: &CachedSample<T>, masks: StateMasks, query: Option<&QueryParts>) -> bool {
        let Some(record) = self.instances.get(&sample.instance) else {
            return false;
        };
        if !masks.matches(sample.state, record.view, record.state) {
            return false;
        }
        match query {
            Some(q) => sample.data.as_ref().is_some_and(|d| q.accepts(d)),
            None => true,
        }
    }

    /// Whether any cached sample passes `masks` (and `query`).
    pub(crate) fn has_matching(&self, masks: StateMasks, query: Option<&QueryParts>) -> bool {
        self.samples.iter().any(|s| self.matches(s, masks, query))
    }

    fn select(&self, max: usize, masks: StateMasks, query: Option<&QueryParts>) -> Vec<usize> {
        self.samples
            .iter()
            .enumerate()
            .filter(|(_, s)| self.matches(s, masks, query))
            .map(|(i, _)| i)
            .take(max)
            .collect()
    }

    fn info_for(&self, sample: &CachedSample<T>) -> SampleInfo {
        let (view, state) = self
            .instances
            .get(&sample.instance)
            .map(|r| (r.view, r.state))
            .unwrap_or((ViewState::NotNew, InstanceState::NotAliveNoWriters));
        SampleInfo {
            sample_state: sample.state,
            view_state: view,
            instance_state: state,
            valid_data: sample.data.is_some(),
            instance_handle: sample.instance,
            publication_handle: sample.publication_handle,
            source_timestamp: sample.source_timestamp,
            disposed_generation_count: sample.disposed_generation_count,
            no_writers_generation_count: sample.no_writers_generation_count,
        }
    }

    /// Move up to `max` matching samples into `sink`, oldest first.
    /// Returns how many were taken.
    pub(crate) fn take_into<F>(
        &mut self,
        max: usize,
        masks: StateMasks,
        query: Option<&QueryParts>,
        mut sink: F,
    ) -> usize
    where
        F: FnMut(Option<T>, SampleInfo),
    {
        let selected = self.select(max, masks, query);
        let infos: Vec<SampleInfo> = selected
            .iter()
            .map(|&i| self.info_for(&self.samples[i]))
            .collect();

        // Remove back to front so earlier indices stay valid.
        let mut taken: Vec<Option<T>> = selected
            .iter()
            .rev()
            .filter_map(|&i| self.samples.remove(i))
            .map(|s| s.data)
            .collect();
        taken.reverse();

        for (data, info) in taken.into_iter().zip(infos) {
            self.mark_viewed(&info.instance_handle);
            sink(data, info);
        }
        self.purge_instances();
        selected.len()
    }

    /// Copy up to `max` matching samples into `sink` and mark them READ.
    pub(crate) fn read_into<F>(
        &mut self,
        max: usize,
        masks: StateMasks,
        query: Option<&QueryParts>,
        mut sink: F,
    ) -> usize
    where
        T: Clone,
        F: FnMut(Option<T>, SampleInfo),
    {
        let selected = self.select(max, masks, query);
        let mut viewed = Vec::with_capacity(selected.len());
        for &i in &selected {
            let info = self.info_for(&self.samples[i]);
            let sample = &mut self.samples[i];
            sample.state = SampleState::Read;
            viewed.push(info.instance_handle);
            sink(sample.data.clone(), info);
        }
        for instance in viewed {
            self.mark_viewed(&instance);
        }
        selected.len()
    }

    fn mark_viewed(&mut self, instance: &InstanceHandle) {
        if let Some(record) = self.instances.get_mut(instance) {
            record.view = ViewState::NotNew;
        }
    }

    /// Drop not-alive instances that have no samples and no writers left.
    fn purge_instances(&mut self) {
        let samples = &self.samples;
        self.instances.retain(|handle, rec| {
            rec.state.is_alive()
                || !rec.writers.is_empty()
                || samples.iter().any(|s| s.instance == *handle)
        });
    }
}
