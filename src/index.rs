//! `IndexTables`: coarse-locked, denormalized lookup structures that let
//! readers resolve an `ObjectId` to its tracker's publisher without touching
//! the dispatcher thread (spec §4.1 "reads never queue behind the dispatcher").
//!
//! Writes only ever come from the dispatcher thread (single writer), so a
//! single `parking_lot::RwLock` is adequate: readers are many and cheap,
//! writers are rare and already serialized upstream by the action queue.

use crate::id::ObjectId;
use crate::object::Object;
use crate::observer::Publisher;
use crate::tracker::TrackerId;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;

struct Inner {
    by_full_name: FxHashMap<String, TrackerId>,
    by_uuid: FxHashMap<String, TrackerId>,
    publishers: FxHashMap<TrackerId, Arc<Publisher<Object>>>,
    types: FxHashMap<TrackerId, String>,
}

impl Inner {
    fn new() -> Self {
        Self {
            by_full_name: FxHashMap::default(),
            by_uuid: FxHashMap::default(),
            publishers: FxHashMap::default(),
            types: FxHashMap::default(),
        }
    }
}

/// Shared between the dispatcher (sole writer) and any number of reader
/// handles (`TableUpdater` clones).
pub struct IndexTables {
    inner: RwLock<Inner>,
}

impl IndexTables {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::new()),
        }
    }

    pub fn insert(
        &self,
        id: &ObjectId,
        tracker_id: TrackerId,
        publisher: Arc<Publisher<Object>>,
    ) {
        let mut inner = self.inner.write();
        inner.by_full_name.insert(id.full_name(), tracker_id);
        if let Some(uuid) = &id.uuid {
            inner.by_uuid.insert(uuid.clone(), tracker_id);
        }
        inner.types.insert(tracker_id, id.object_type.clone());
        inner.publishers.insert(tracker_id, publisher);
    }

    pub fn remove(&self, id: &ObjectId, tracker_id: TrackerId) {
        let mut inner = self.inner.write();
        inner.by_full_name.remove(&id.full_name());
        if let Some(uuid) = &id.uuid {
            inner.by_uuid.remove(uuid);
        }
        inner.types.remove(&tracker_id);
        inner.publishers.remove(&tracker_id);
    }

    /// Resolve by `(type, name)` first, falling back to a bare uuid lookup
    /// when the id carries one and the name-based lookup misses (spec §3
    /// "partial id resolution").
    pub fn resolve(&self, id: &ObjectId) -> Option<TrackerId> {
        let inner = self.inner.read();
        if let Some(found) = inner.by_full_name.get(&id.full_name()) {
            return Some(*found);
        }
        id.uuid.as_ref().and_then(|uuid| inner.by_uuid.get(uuid).copied())
    }

    pub fn publisher(&self, tracker_id: TrackerId) -> Option<Arc<Publisher<Object>>> {
        self.inner.read().publishers.get(&tracker_id).cloned()
    }

    pub fn object_type(&self, tracker_id: TrackerId) -> Option<String> {
        self.inner.read().types.get(&tracker_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().by_full_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every currently-published object, optionally filtered to
    /// one type (spec §4.4 `GetObjects`).
    pub fn snapshot_objects(&self, object_type: Option<&str>) -> Vec<Arc<Object>> {
        let inner = self.inner.read();
        inner
            .publishers
            .iter()
            .filter(|(tracker_id, _)| {
                object_type
                    .map(|t| inner.types.get(tracker_id).map(|s| s.as_str()) == Some(t))
                    .unwrap_or(true)
            })
            .filter_map(|(_, publisher)| publisher.current())
            .collect()
    }

    pub fn object_count(&self, object_type: Option<&str>) -> usize {
        self.snapshot_objects(object_type).len()
    }
}

impl Default for IndexTables {
    fn default() -> Self {
        Self::new()
    }
}
