// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Domain Registry for Intra-Process Matching
//!
//! Writers and readers living in the same process, on the same domain id,
//! with the same (topic, type_id) are matched here. Matching is the only way
//! samples travel: there is no wire transport.
//!
//! # Architecture
//!
//! ```text
//! DomainRegistry (static global)
//! +-- domains: Mutex<HashMap<DomainId, Weak<DomainState>>>
//!
//! DomainState (one per domain, per process)
//! +-- domain_id: u32
//! +-- endpoints: RwLock<HashMap<MatchKey, Vec<LocalEndpointEntry>>>
//! +-- [strong ref held by every Participant of the domain]
//!
//! MatchKey
//! +-- topic_name: Arc<str>
//! +-- type_id: TypeId  (MD5-14 of the type name)
//! ```
//!
//! # Matching Flow
//!
//! 1. Endpoint created -> registers in DomainState, gets a BindToken
//! 2. Every opposite endpoint under the same key is checked for QoS
//!    compatibility; both sides are told (matched or incompatible)
//! 3. BindToken dropped -> unregisters, matched peers are told
//!
//! Peers are notified after the endpoint lock is released, reader side
//! first, so a writer replaying history finds the reader ready.

use crate::core::Guid;
use crate::dds::listener::QosPolicyId;
use crate::qos::liveliness::Liveliness;
use crate::qos::partition::Partition;
use crate::qos::{Durability, Reliability};
use parking_lot::{Mutex, RwLock};
use std::any::{Any, TypeId as RustTypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, Weak};

/// Domain ID type (0-232 per DDS spec)
pub type DomainId = u32;

/// Type identifier for matching endpoints
///
/// MD5 hash of the type name, truncated to 14 bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId([u8; 14]);

impl TypeId {
    /// Create TypeId from type name using MD5
    pub fn from_type_name(type_name: &str) -> Self {
        use md5::{Digest, Md5};
        let mut hasher = Md5::new();
        hasher.update(type_name.as_bytes());
        let result = hasher.finalize();
        let mut bytes = [0u8; 14];
        bytes.copy_from_slice(&result[..14]);
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 14] {
        &self.0
    }
}

impl std::fmt::Debug for TypeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TypeId(")?;
        for byte in &self.0[..4] {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, "...)")
    }
}

/// Match key for endpoint lookup
///
/// Two endpoints can match only if they have the same (topic_name, type_id).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct MatchKey {
    pub topic_name: Arc<str>,
    pub type_id: TypeId,
}

impl MatchKey {
    /// Create match key from topic and type names
    pub fn from_names(topic_name: &str, type_name: &str) -> Self {
        Self {
            topic_name: Arc::from(topic_name),
            type_id: TypeId::from_type_name(type_name),
        }
    }
}

impl std::fmt::Debug for MatchKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchKey")
            .field("topic", &self.topic_name)
            .field("type_id", &self.type_id)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EndpointKind {
    Reader,
    Writer,
}

/// The policies that decide whether a writer and a reader match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EndpointQos {
    pub reliability: Reliability,
    pub durability: Durability,
    pub liveliness: Liveliness,
    pub partition: Partition,
}

/// Outcome of checking an offered (writer) QoS against a requested one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Compatibility {
    Compatible,
    /// Partitions do not intersect: the pair is silently ignored.
    Unrelated,
    Incompatible(QosPolicyId),
}

pub(crate) fn check_compatibility(offered: &EndpointQos, requested: &EndpointQos) -> Compatibility {
    if !offered.partition.is_compatible_with(&requested.partition) {
        return Compatibility::Unrelated;
    }
    if offered.reliability < requested.reliability {
        return Compatibility::Incompatible(QosPolicyId::RELIABILITY);
    }
    if offered.durability < requested.durability {
        return Compatibility::Incompatible(QosPolicyId::DURABILITY);
    }
    if !offered.liveliness.is_compatible_with(&requested.liveliness) {
        return Compatibility::Incompatible(QosPolicyId::LIVELINESS);
    }
    Compatibility::Compatible
}

/// A live endpoint as seen by its peers.
pub(crate) struct EndpointInfo {
    pub guid: Guid,
    pub qos: EndpointQos,
    pub link: Arc<dyn EndpointLink>,
}

/// Callbacks the registry uses to tell an endpoint about its peers.
///
/// Called without any registry lock held.
pub(crate) trait EndpointLink: Send + Sync {
    fn peer_matched(&self, peer: &EndpointInfo);

    fn peer_unmatched(&self, peer: Guid);

    fn incompatible_peer(&self, peer: Guid, policy: QosPolicyId);

    /// Concrete endpoint, for the typed writer -> reader binding.
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Local endpoint entry in the registry
pub(crate) struct LocalEndpointEntry {
    pub guid: Guid,
    pub kind: EndpointKind,
    pub qos: EndpointQos,
    /// Rust type of the samples; same-named types from different crates
    /// never match.
    pub sample_type: RustTypeId,
    pub link: Weak<dyn EndpointLink>,
}

impl LocalEndpointEntry {
    fn info(&self) -> Option<EndpointInfo> {
        Some(EndpointInfo {
            guid: self.guid,
            qos: self.qos.clone(),
            link: self.link.upgrade()?,
        })
    }
}

impl std::fmt::Debug for LocalEndpointEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalEndpointEntry")
            .field("guid", &self.guid)
            .field("kind", &self.kind)
            .field("qos", &self.qos)
            .field("alive", &(self.link.strong_count() > 0))
            .finish()
    }
}

/// Token returned when registering an endpoint
///
/// When dropped, unregisters the endpoint and unmatches its peers.
pub(crate) struct BindToken {
    domain: Weak<DomainState>,
    key: MatchKey,
    guid: Guid,
}

impl Drop for BindToken {
    fn drop(&mut self) {
        if let Some(domain) = self.domain.upgrade() {
            domain.unregister(&self.key, self.guid);
        }
    }
}

impl std::fmt::Debug for BindToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindToken")
            .field("key", &self.key)
            .field("guid", &self.guid)
            .finish()
    }
}

enum PeerEvent {
    Matched,
    Incompatible(QosPolicyId),
}

/// Domain state - holds all endpoints for a single domain
pub(crate) struct DomainState {
    pub domain_id: DomainId,
    endpoints: RwLock<HashMap<MatchKey, Vec<LocalEndpointEntry>>>,
}

impl DomainState {
    pub(crate) fn new(domain_id: DomainId) -> Self {
        Self {
            domain_id,
            endpoints: RwLock::new(HashMap::new()),
        }
    }

    /// Register an endpoint and match it against the opposite side.
    pub(crate) fn register(self: &Arc<Self>, key: MatchKey, entry: LocalEndpointEntry) -> BindToken {
        let guid = entry.guid;
        let my_kind = entry.kind;
        let Some(me) = entry.info() else {
            // Endpoint already gone; nothing to match.
            return BindToken {
                domain: Arc::downgrade(self),
                key,
                guid,
            };
        };

        let mut events = Vec::new();
        {
            let mut endpoints = self.endpoints.write();
            let entries = endpoints.entry(key.clone()).or_default();
            for existing in entries.iter().filter(|e| e.kind != entry.kind) {
                if existing.sample_type != entry.sample_type {
                    log::warn!(
                        "[DomainRegistry] {} and {} share topic '{}' with different sample types",
                        guid,
                        existing.guid,
                        key.topic_name
                    );
                    continue;
                }
                let Some(peer) = existing.info() else {
                    continue;
                };
                let (offered, requested) = match entry.kind {
                    EndpointKind::Writer => (&me.qos, &peer.qos),
                    EndpointKind::Reader => (&peer.qos, &me.qos),
                };
                match check_compatibility(offered, requested) {
                    Compatibility::Compatible => events.push((peer, PeerEvent::Matched)),
                    Compatibility::Incompatible(policy) => {
                        log::debug!(
                            "[DomainRegistry] {} incompatible with {} on {:?}",
                            guid,
                            peer.guid,
                            policy
                        );
                        events.push((peer, PeerEvent::Incompatible(policy)));
                    }
                    Compatibility::Unrelated => {}
                }
            }
            entries.push(entry);
        }

        for (peer, event) in events {
            let (reader, writer) = match my_kind {
                EndpointKind::Writer => (&peer, &me),
                EndpointKind::Reader => (&me, &peer),
            };
            match event {
                PeerEvent::Matched => {
                    log::debug!(
                        "[DomainRegistry] Matched reader {} with writer {} on '{}'",
                        reader.guid,
                        writer.guid,
                        key.topic_name
                    );
                    reader.link.peer_matched(writer);
                    writer.link.peer_matched(reader);
                }
                PeerEvent::Incompatible(policy) => {
                    reader.link.incompatible_peer(writer.guid, policy);
                    writer.link.incompatible_peer(reader.guid, policy);
                }
            }
        }

        BindToken {
            domain: Arc::downgrade(self),
            key,
            guid,
        }
    }

    /// Unregister an endpoint (called by BindToken::drop)
    fn unregister(&self, key: &MatchKey, guid: Guid) {
        let mut unmatched = Vec::new();
        {
            let mut endpoints = self.endpoints.write();
            let Some(entries) = endpoints.get_mut(key) else {
                return;
            };
            let Some(pos) = entries.iter().position(|e| e.guid == guid) else {
                return;
            };
            let gone = entries.remove(pos);
            for peer in entries.iter().filter(|e| e.kind != gone.kind) {
                if peer.sample_type != gone.sample_type {
                    continue;
                }
                let (offered, requested) = match gone.kind {
                    EndpointKind::Writer => (&gone.qos, &peer.qos),
                    EndpointKind::Reader => (&peer.qos, &gone.qos),
                };
                if check_compatibility(offered, requested) == Compatibility::Compatible {
                    if let Some(link) = peer.link.upgrade() {
                        unmatched.push(link);
                    }
                }
            }
            if entries.is_empty() {
                endpoints.remove(key);
            }
        }

        for link in unmatched {
            link.peer_unmatched(guid);
        }
        log::debug!(
            "[DomainRegistry] Unregistered endpoint {} from topic '{}'",
            guid,
            key.topic_name
        );
    }

    /// Get count of endpoints
    pub(crate) fn endpoint_count(&self) -> usize {
        self.endpoints.read().values().map(Vec::len).sum()
    }

    /// Get count of endpoints for a specific key
    #[cfg(test)]
    pub(crate) fn endpoint_count_for_key(&self, key: &MatchKey) -> usize {
        self.endpoints.read().get(key).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for DomainState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainState")
            .field("domain_id", &self.domain_id)
            .field("endpoint_count", &self.endpoint_count())
            .finish()
    }
}

/// Global domain registry (singleton)
pub(crate) struct DomainRegistry {
    domains: Mutex<HashMap<DomainId, Weak<DomainState>>>,
}

impl DomainRegistry {
    /// Get the global registry instance
    pub(crate) fn global() -> &'static DomainRegistry {
        static REGISTRY: OnceLock<DomainRegistry> = OnceLock::new();
        REGISTRY.get_or_init(|| DomainRegistry {
            domains: Mutex::new(HashMap::new()),
        })
    }

    /// Get or create domain state for a domain ID
    ///
    /// The caller (Participant) holds the returned Arc to keep the domain
    /// alive.
    pub(crate) fn get_or_create(&self, domain_id: DomainId) -> Arc<DomainState> {
        let mut domains = self.domains.lock();
        if let Some(strong) = domains.get(&domain_id).and_then(Weak::upgrade) {
            return strong;
        }
        domains.retain(|_, weak| weak.strong_count() > 0);

        let state = Arc::new(DomainState::new(domain_id));
        domains.insert(domain_id, Arc::downgrade(&state));
        log::info!(
            "[DomainRegistry] Created domain state for domain_id={}",
            domain_id
        );
        state
    }

    #[cfg(test)]
    pub(crate) fn get(&self, domain_id: DomainId) -> Option<Arc<DomainState>> {
        self.domains.lock().get(&domain_id).and_then(Weak::upgrade)
    }
}
