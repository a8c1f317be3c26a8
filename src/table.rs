//! `TypeTable`: per-type tracker storage, owned exclusively by the dispatcher
//! thread (spec §3 "Table" / §4.1 single-writer model).

use crate::id::ObjectId;
use crate::tracker::{Tracker, TrackerId};
use rustc_hash::{FxHashMap, FxHashSet};

pub struct TypeTable {
    pub object_type: String,
    trackers: FxHashMap<TrackerId, Tracker>,
    by_full_name: FxHashMap<String, TrackerId>,
    /// Trackers touched since the last publication drain (spec §4.3 pass 1).
    pub dirty: FxHashSet<TrackerId>,
}

impl TypeTable {
    pub fn new(object_type: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            trackers: FxHashMap::default(),
            by_full_name: FxHashMap::default(),
            dirty: FxHashSet::default(),
        }
    }

    /// Insert a tracker whose `id` was already allocated by the engine's
    /// global tracker-id counter (trackers are addressed across type-set
    /// boundaries, so ids cannot be table-local).
    pub fn insert(&mut self, tracker: Tracker) -> TrackerId {
        let id = tracker.id;
        self.by_full_name.insert(tracker.object_id.full_name(), id);
        self.dirty.insert(id);
        self.trackers.insert(id, tracker);
        id
    }

    pub fn remove(&mut self, tracker_id: TrackerId) -> Option<Tracker> {
        self.dirty.remove(&tracker_id);
        let removed = self.trackers.remove(&tracker_id)?;
        self.by_full_name.remove(&removed.object_id.full_name());
        Some(removed)
    }

    pub fn get(&self, tracker_id: TrackerId) -> Option<&Tracker> {
        self.trackers.get(&tracker_id)
    }

    pub fn get_mut(&mut self, tracker_id: TrackerId) -> Option<&mut Tracker> {
        self.trackers.get_mut(&tracker_id)
    }

    pub fn find(&self, id: &ObjectId) -> Option<TrackerId> {
        self.by_full_name.get(&id.full_name()).copied()
    }

    pub fn mark_dirty(&mut self, tracker_id: TrackerId) {
        self.dirty.insert(tracker_id);
    }

    pub fn drain_dirty(&mut self) -> Vec<TrackerId> {
        self.dirty.drain().collect()
    }

    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TrackerId, &Tracker)> {
        self.trackers.iter()
    }
}
