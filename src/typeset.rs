//! `TypeSet`: a configured group of `TypeTable`s that persist together and
//! publish together into one reference set (spec §3, §4.3, §4.4).

use crate::object::Object;
use crate::table::TypeTable;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// One entry in a reference set: the object clone plus the sequence number
/// it was added under (spec §4.3 "reference-set deltas").
#[derive(Clone)]
pub struct ReferenceItem {
    pub seq: u64,
    pub object: Arc<Object>,
}

/// Externally observable, atomically-updated remove+add sequence (spec §4.3,
/// glossary "Reference set").
#[derive(Default)]
pub struct ReferenceSet {
    items: Vec<ReferenceItem>,
    next_seq: AtomicU64,
}

impl ReferenceSet {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            next_seq: AtomicU64::new(1),
        }
    }

    /// Remove every entry whose `seq` is in `seqs`, then add `new_items`
    /// under freshly allocated sequence numbers, returning those numbers in
    /// the same order as `new_items` so the caller can back-fill them into
    /// the originating trackers (spec §4.3).
    pub fn apply_delta(&mut self, mut remove_seqs: Vec<u64>, new_items: Vec<Arc<Object>>) -> Vec<u64> {
        remove_seqs.sort_unstable();
        if !remove_seqs.is_empty() {
            self.items.retain(|item| remove_seqs.binary_search(&item.seq).is_err());
        }
        let mut added_seqs = Vec::with_capacity(new_items.len());
        for object in new_items {
            let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
            self.items.push(ReferenceItem { seq, object });
            added_seqs.push(seq);
        }
        added_seqs
    }

    pub fn snapshot(&self) -> Vec<Arc<Object>> {
        self.items.iter().map(|item| item.object.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Append-only mirror of every publication ever produced by a type-set's
/// trackers, except `IsFinal` publications (spec §9 open question (b)).
#[derive(Default)]
pub struct HistorySet {
    items: Vec<Arc<Object>>,
}

impl HistorySet {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn append(&mut self, objects: impl IntoIterator<Item = Arc<Object>>) {
        self.items.extend(objects);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// Per-type-set persist state machine (spec §4.6).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PersistState {
    Clean,
    Dirty,
    Writing,
}

pub struct TypeSet {
    pub name: String,
    pub tables: HashMap<String, TypeTable>,
    pub reference_set: ReferenceSet,
    pub history_set: HistorySet,

    pub persist_state: PersistState,
    pub hold_off: std::time::Duration,
    pub hold_off_deadline: Option<Instant>,
    pub last_published_seq: u64,
    pub last_succeeded_save_seq: u64,

    /// Reference-set sequence numbers of trackers dropped since the last
    /// drain, awaiting the next `ReferenceSet::apply_delta` call (spec §4.3
    /// "reference-set deltas" for a removal: the tracker is gone from its
    /// table before the drain runs, so its old slot has to be remembered
    /// here instead of being found by walking the dirty set).
    pub pending_removed_ref_seqs: Vec<u64>,
    /// Count of trackers dropped since the last drain that never had a
    /// reference-set slot to begin with (removed before their first
    /// publication), still counted toward `TableSeqNums.removed_items`.
    pub pending_removed_count: u64,
}

impl TypeSet {
    pub fn new(name: impl Into<String>, hold_off: std::time::Duration) -> Self {
        Self {
            name: name.into(),
            tables: HashMap::new(),
            reference_set: ReferenceSet::new(),
            history_set: HistorySet::new(),
            persist_state: PersistState::Clean,
            hold_off,
            hold_off_deadline: None,
            last_published_seq: 0,
            last_succeeded_save_seq: 0,
            pending_removed_ref_seqs: Vec::new(),
            pending_removed_count: 0,
        }
    }

    /// Record a dropped tracker's former reference-set slot (if it had one)
    /// so the next drain excludes it, and mark the set dirty so that drain
    /// actually runs even if nothing else changed.
    pub fn note_removed(&mut self, ref_set_seq: Option<u64>, table_change_seq: u64) {
        if let Some(seq) = ref_set_seq {
            self.pending_removed_ref_seqs.push(seq);
        }
        self.pending_removed_count += 1;
        self.mark_dirty(table_change_seq);
    }

    pub fn table_mut(&mut self, object_type: &str) -> &mut TypeTable {
        self.tables
            .entry(object_type.to_string())
            .or_insert_with(|| TypeTable::new(object_type))
    }

    pub fn owns_type(&self, object_type: &str) -> bool {
        self.tables.contains_key(object_type)
    }

    pub fn mark_dirty(&mut self, seq: u64) {
        self.last_published_seq = seq;
        if self.persist_state == PersistState::Clean {
            self.persist_state = PersistState::Dirty;
        }
        self.hold_off_deadline.get_or_insert_with(|| Instant::now() + self.hold_off);
    }

    pub fn needs_save(&self) -> bool {
        self.last_published_seq != self.last_succeeded_save_seq
    }

    pub fn hold_off_elapsed(&self) -> bool {
        self.hold_off_deadline.map(|deadline| Instant::now() >= deadline).unwrap_or(false)
    }

    pub fn record_save_success(&mut self, seq: u64) {
        self.last_succeeded_save_seq = seq;
        self.persist_state = if self.needs_save() {
            PersistState::Dirty
        } else {
            self.hold_off_deadline = None;
            PersistState::Clean
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::AttributeMap;
    use crate::flags::Flags;
    use crate::id::ObjectId;
    use crate::link::Link;

    fn object(name: &str) -> Arc<Object> {
        Arc::new(Object {
            id: ObjectId::new("Subst", name),
            flags: Flags::empty(),
            attributes: AttributeMap::new(),
            links_out: Vec::<Link>::new(),
            links_in: Vec::<Link>::new(),
        })
    }

    #[test]
    fn apply_delta_adds_under_fresh_seqs() {
        let mut rs = ReferenceSet::new();
        let added = rs.apply_delta(vec![], vec![object("a"), object("b")]);
        assert_eq!(added.len(), 2);
        assert!(added[0] < added[1]);
        assert_eq!(rs.len(), 2);
    }

    #[test]
    fn apply_delta_removes_then_adds_atomically() {
        let mut rs = ReferenceSet::new();
        let first = rs.apply_delta(vec![], vec![object("a")]);
        let added = rs.apply_delta(first, vec![object("b")]);
        assert_eq!(rs.len(), 1);
        assert_eq!(added.len(), 1);
    }

    #[test]
    fn type_set_tracks_dirty_until_save_catches_up() {
        let mut ts = TypeSet::new("Default", std::time::Duration::from_millis(100));
        ts.mark_dirty(5);
        assert!(ts.needs_save());
        ts.record_save_success(5);
        assert!(!ts.needs_save());
        assert_eq!(ts.persist_state, PersistState::Clean);
    }
}
