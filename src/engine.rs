//! The dispatcher-owned mutable core: `EngineState` applies update items,
//! drains the dirty set into publications, and schedules persistence
//! (spec §4.2–§4.4). Exactly one thread — the dispatcher — ever calls
//! `EngineState` methods; everything else reaches the table through
//! [`crate::index::IndexTables`] or a [`Publisher`](crate::observer::Publisher).

use crate::attrs::merge_attributes;
use crate::error::{EngineError, ResultCode};
use crate::flags::Flags;
use crate::id::ObjectId;
use crate::index::IndexTables;
use crate::link::Link;
use crate::object::Object;
use crate::observer::Publisher;
use crate::seq::SeqAllocator;
use crate::table::TypeTable;
use crate::tracker::{Tracker, TrackerId};
use crate::typeset::TypeSet;
use crate::update_item::UpdateItem;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Summary published after every dirty-set drain (spec §4.3 "Summary publication").
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableSeqNums {
    pub table_change: u64,
    pub added_types: u64,
    pub added_items: u64,
    pub removed_items: u64,
}

pub struct EngineState {
    pub config: crate::config::EngineConfig,
    pub index: Arc<IndexTables>,
    pub seq: Arc<SeqAllocator>,
    pub type_sets: HashMap<String, TypeSet>,
    /// Where to find a tracker given only its id: which type-set and which
    /// object type's table within it.
    locations: HashMap<TrackerId, (String, String)>,
    next_tracker_id: AtomicU64,
    pub online: bool,
    /// Guarded slot for [`TableSeqNums`], published only when it changes.
    pub seq_nums_publisher: Arc<Publisher<TableSeqNums>>,
    last_seq_nums: TableSeqNums,
}

impl EngineState {
    pub fn new(config: crate::config::EngineConfig, index: Arc<IndexTables>) -> Self {
        let mut type_sets = HashMap::new();
        for ts_config in &config.type_sets {
            type_sets.insert(ts_config.name.clone(), TypeSet::new(ts_config.name.clone(), ts_config.hold_off()));
        }
        type_sets
            .entry(config.default_type_set.clone())
            .or_insert_with(|| TypeSet::new(config.default_type_set.clone(), std::time::Duration::from_millis(100)));

        Self {
            config,
            index,
            seq: Arc::new(SeqAllocator::new()),
            type_sets,
            locations: HashMap::new(),
            next_tracker_id: AtomicU64::new(1),
            online: true,
            seq_nums_publisher: Arc::new(Publisher::new()),
            last_seq_nums: TableSeqNums::default(),
        }
    }

    fn type_set_name_for(&self, object_type: &str) -> String {
        self.config.type_set_for(object_type).to_string()
    }

    fn table_mut(&mut self, object_type: &str) -> &mut TypeTable {
        let ts_name = self.type_set_name_for(object_type);
        self.type_sets
            .entry(ts_name.clone())
            .or_insert_with(|| TypeSet::new(ts_name, std::time::Duration::from_millis(100)))
            .table_mut(object_type)
    }

    fn table_for_tracker(&mut self, tracker_id: TrackerId) -> Option<&mut TypeTable> {
        let (ts_name, object_type) = self.locations.get(&tracker_id)?.clone();
        self.type_sets.get_mut(&ts_name)?.tables.get_mut(&object_type)
    }

    fn find_tracker_id(&self, id: &ObjectId) -> Option<TrackerId> {
        self.index.resolve(id)
    }

    fn mark_touched(&mut self, tracker_id: TrackerId) {
        if let Some(table) = self.table_for_tracker(tracker_id) {
            table.mark_dirty(tracker_id);
            if let Some(tracker) = table.get_mut(tracker_id) {
                tracker.mark_touched();
            }
        }
    }

    /// Runs every [`UpdateItem`] in order, stopping early on the first error
    /// (spec §4.2: "if any ec is non-empty ... subsequent items ... are
    /// skipped" [§7 category 1]), then always drains publication.
    pub fn perform_updates(&mut self, items: &mut [UpdateItem]) -> ResultCode {
        if !self.online {
            return EngineError::NotOnline("ActionQueue".to_string()).into_result_code();
        }

        let mut result = ResultCode::success();
        for item in items.iter_mut() {
            if let UpdateItem::SyncPublication = item {
                self.drain_and_publish();
                continue;
            }
            let outcome = self.apply_item(item);
            if !outcome.is_success() {
                result = outcome;
                break;
            }
        }
        self.drain_and_publish();
        result
    }

    fn apply_item(&mut self, item: &mut UpdateItem) -> ResultCode {
        match item {
            UpdateItem::AddObject {
                id,
                attributes,
                flags,
                if_needed,
                merge_behavior,
                publisher_out,
            } => {
                let outcome = self.add_object(id, attributes, *flags, *if_needed, *merge_behavior);
                match outcome {
                    Ok(publisher) => {
                        *publisher_out = Some(publisher);
                        ResultCode::success()
                    }
                    Err(code) => code,
                }
            }
            UpdateItem::RemoveObject { id, linked_removal_filter } => {
                self.remove_object(id, linked_removal_filter.as_deref())
            }
            UpdateItem::AddLink {
                link,
                auto_unlink_from_prior,
                if_needed,
            } => self.add_link(link, *auto_unlink_from_prior, *if_needed),
            UpdateItem::RemoveLink { link } => self.remove_link(link),
            UpdateItem::SetAttributes {
                ids,
                attributes,
                merge_behavior,
            } => self.set_attributes(ids, attributes, *merge_behavior),
            UpdateItem::TestAndSetAttributes {
                id,
                test_attributes,
                attributes,
                merge_behavior,
                fail_if_not_met,
                test_conditions_met,
            } => {
                let (code, met) = self.test_and_set_attributes(id, test_attributes, attributes, *merge_behavior, *fail_if_not_met);
                *test_conditions_met = Some(met);
                code
            }
            UpdateItem::SyncPublication => {
                self.drain_and_publish();
                ResultCode::success()
            }
            UpdateItem::SyncPersist { object_type, .. } => {
                self.drain_and_publish();
                if let Some(object_type) = object_type {
                    let ts_name = self.type_set_name_for(object_type);
                    let current_seq = self.seq.current().get();
                    if let Some(ts) = self.type_sets.get_mut(&ts_name) {
                        ts.mark_dirty(ts.last_published_seq.max(current_seq));
                    }
                }
                ResultCode::success()
            }
            UpdateItem::SyncExternal { fail_if_no_factory, .. } => {
                self.drain_and_publish();
                if *fail_if_no_factory {
                    ResultCode("SyncExternal.Failed.NoFactory".to_string())
                } else {
                    ResultCode::success()
                }
            }
        }
    }

    fn add_object(
        &mut self,
        id: &ObjectId,
        attributes: &crate::attrs::AttributeMap,
        flags: Flags,
        if_needed: bool,
        merge_behavior: crate::attrs::MergeBehavior,
    ) -> Result<Arc<Publisher<Object>>, ResultCode> {
        if !id.is_valid() {
            return Err(ResultCode(format!("Cannot add object '{id}': invalid ObjectID")));
        }

        if let Some(existing_id) = self.find_tracker_id(id) {
            if !if_needed {
                return Err(ResultCode::object_already_exists(id));
            }
            let table = self.table_for_tracker(existing_id).expect("indexed tracker must exist in its table");
            let tracker = table.get_mut(existing_id).expect("indexed tracker must exist in its table");
            merge_attributes(&mut tracker.attributes, attributes, merge_behavior);
            tracker.flags = tracker.flags.with_client_flags(flags);
            if id.uuid.is_some() && tracker.object_id.uuid.is_none() {
                tracker.object_id.uuid = id.uuid.clone();
            }
            let publisher = tracker.publisher.clone();
            self.mark_touched(existing_id);
            return Ok(publisher);
        }

        let tracker_id = TrackerId(self.next_tracker_id.fetch_add(1, Ordering::SeqCst));
        let mut tracker = Tracker::new(tracker_id, id.clone(), Flags::empty().with_client_flags(flags), attributes.clone());
        let publisher = tracker.publisher.clone();
        tracker.rebuild_link_views();

        let ts_name = self.type_set_name_for(&id.object_type);
        self.table_mut(&id.object_type).insert(tracker);
        self.locations.insert(tracker_id, (ts_name.clone(), id.object_type.clone()));
        self.index.insert(id, tracker_id, publisher.clone());
        let current_seq = self.seq.current().get();
        if let Some(ts) = self.type_sets.get_mut(&ts_name) {
            ts.mark_dirty(current_seq);
        }

        Ok(publisher)
    }

    /// Worklist-driven cascade (spec §4.2 `RemoveObject`).
    fn remove_object(&mut self, id: &ObjectId, filter: Option<&(dyn Fn(&Link) -> bool + Send + Sync)>) -> ResultCode {
        let Some(root_id) = self.find_tracker_id(id) else {
            return ResultCode::object_not_found(id);
        };

        let mut worklist = vec![root_id];
        let mut seen = std::collections::HashSet::new();

        while let Some(tracker_id) = worklist.pop() {
            if !seen.insert(tracker_id) {
                continue;
            }
            let Some((links_out, links_in, object_id)) = self.finalize_and_detach(tracker_id) else {
                continue;
            };

            for edge in &links_out {
                if let Some(peer_id) = self.index.resolve(&edge.to_id) {
                    self.remove_in_edge(peer_id, &object_id, &edge.key);
                    self.mark_touched(peer_id);
                }
            }
            for edge in &links_in {
                if let Some(peer_id) = self.index.resolve(&edge.from_id) {
                    self.remove_out_edge(peer_id, &edge.key);
                    self.mark_touched(peer_id);
                }
            }

            if let Some(filter) = filter {
                for edge in &links_out {
                    if !filter(edge) {
                        continue;
                    }
                    let Some(peer_id) = self.index.resolve(&edge.to_id) else { continue };
                    if self.eligible_for_cascade(peer_id, edge, filter) {
                        worklist.push(peer_id);
                    }
                }
            }

            self.note_pending_removal(tracker_id);
            self.drop_tracker(tracker_id, &object_id);
        }

        ResultCode::success()
    }

    /// Record a tracker's reference-set slot (if any) before it is dropped
    /// from its table, so the next `drain_and_publish` excludes it from the
    /// reference set and counts it toward `TableSeqNums.removed_items`
    /// (spec §4.3). Must run before [`EngineState::drop_tracker`].
    fn note_pending_removal(&mut self, tracker_id: TrackerId) {
        let ref_set_seq = self
            .table_for_tracker(tracker_id)
            .and_then(|table| table.get(tracker_id))
            .and_then(|tracker| tracker.ref_set_seq);
        let Some(ts_name) = self.locations.get(&tracker_id).map(|(ts, _)| ts.clone()) else {
            return;
        };
        let table_change_seq = self.seq.current().get();
        if let Some(ts) = self.type_sets.get_mut(&ts_name) {
            ts.note_removed(ref_set_seq, table_change_seq);
        }
    }

    /// Marks the tracker `IsFinal`, snapshots and clears its link
    /// dictionaries, and publishes the final snapshot immediately so
    /// observers see `IsFinal=true` (spec §3 invariant 5).
    fn finalize_and_detach(&mut self, tracker_id: TrackerId) -> Option<(Vec<Link>, Vec<Link>, ObjectId)> {
        let table = self.table_for_tracker(tracker_id)?;
        let tracker = table.get_mut(tracker_id)?;
        tracker.flags |= Flags::IS_FINAL;
        let links_out: Vec<Link> = tracker.links_out.values().cloned().collect();
        let links_in: Vec<Link> = tracker.links_in.values().cloned().collect();
        tracker.links_out.clear();
        tracker.links_in.clear();
        tracker.rebuild_out = true;
        tracker.rebuild_in = true;
        let object_id = tracker.object_id.clone();

        let seq = self.seq.next();
        let table = self.table_for_tracker(tracker_id)?;
        let tracker = table.get_mut(tracker_id)?;
        tracker.rebuild_link_views();
        let snapshot = Arc::new(tracker.snapshot());
        tracker.last_published_seq = seq;
        tracker.last_published = Some(snapshot.clone());
        tracker.publisher.publish(snapshot, seq.get());

        Some((links_out, links_in, object_id))
    }

    fn eligible_for_cascade(&mut self, peer_id: TrackerId, removed_edge: &Link, filter: &(dyn Fn(&Link) -> bool + Send + Sync)) -> bool {
        let Some(table) = self.table_for_tracker(peer_id) else { return false };
        let Some(tracker) = table.get(peer_id) else { return false };
        if tracker.flags.intersects(Flags::PINNED | Flags::CREATE_IVA) {
            return false;
        }
        !tracker
            .links_in
            .values()
            .any(|edge| edge.key == removed_edge.key && filter(edge))
    }

    fn drop_tracker(&mut self, tracker_id: TrackerId, object_id: &ObjectId) {
        if let Some(table) = self.table_for_tracker(tracker_id) {
            table.remove(tracker_id);
        }
        self.locations.remove(&tracker_id);
        self.index.remove(object_id, tracker_id);
    }

    fn remove_in_edge(&mut self, tracker_id: TrackerId, from_id: &ObjectId, key: &str) {
        if let Some(table) = self.table_for_tracker(tracker_id) {
            if let Some(tracker) = table.get_mut(tracker_id) {
                tracker.links_in.shift_remove(&(from_id.full_name(), key.to_string()));
                tracker.rebuild_in = true;
            }
        }
    }

    fn remove_out_edge(&mut self, tracker_id: TrackerId, key: &str) {
        if let Some(table) = self.table_for_tracker(tracker_id) {
            if let Some(tracker) = table.get_mut(tracker_id) {
                tracker.links_out.shift_remove(key);
                tracker.rebuild_out = true;
            }
        }
    }

    fn add_link(&mut self, link: &Link, auto_unlink_from_prior: bool, if_needed: bool) -> ResultCode {
        let Some(from_id) = self.find_tracker_id(&link.from_id) else {
            return ResultCode::link_source_not_found(link);
        };
        let Some(to_id) = self.find_tracker_id(&link.to_id) else {
            return ResultCode::link_target_not_found(link);
        };

        if let Some(table) = self.table_for_tracker(from_id) {
            if let Some(tracker) = table.get(from_id) {
                if let Some(existing) = tracker.links_out.get(&link.key) {
                    let same_target = existing.to_id == link.to_id;
                    if same_target && if_needed {
                        return ResultCode::success();
                    }
                    if !same_target || !if_needed {
                        return ResultCode::link_key_in_use(&link.key, existing);
                    }
                }
            }
        }

        if auto_unlink_from_prior {
            let prior = self
                .table_for_tracker(to_id)
                .and_then(|table| table.get(to_id))
                .and_then(|tracker| {
                    tracker
                        .links_in
                        .values()
                        .find(|edge| edge.key == link.key && edge.from_id != link.from_id)
                        .cloned()
                });
            if let Some(prior) = prior {
                if let Some(prior_from) = self.find_tracker_id(&prior.from_id) {
                    self.remove_out_edge(prior_from, &prior.key);
                    self.mark_touched(prior_from);
                }
                self.remove_in_edge(to_id, &prior.from_id, &prior.key);
            }
        }

        if let Some(table) = self.table_for_tracker(from_id) {
            if let Some(tracker) = table.get_mut(from_id) {
                tracker.links_out.insert(link.key.clone(), link.clone());
                tracker.rebuild_out = true;
            }
        }
        if let Some(table) = self.table_for_tracker(to_id) {
            if let Some(tracker) = table.get_mut(to_id) {
                tracker.links_in.insert((link.from_id.full_name(), link.key.clone()), link.mirror());
                tracker.rebuild_in = true;
            }
        }

        self.mark_touched(from_id);
        self.mark_touched(to_id);
        ResultCode::success()
    }

    fn remove_link(&mut self, link: &Link) -> ResultCode {
        let Some(from_id) = self.find_tracker_id(&link.from_id) else {
            return ResultCode::link_source_not_found(link);
        };
        let Some(to_id) = self.find_tracker_id(&link.to_id) else {
            return ResultCode::link_target_not_found(link);
        };

        let matched = self
            .table_for_tracker(from_id)
            .and_then(|table| table.get(from_id))
            .and_then(|tracker| tracker.links_out.get(&link.key))
            .map(|existing| existing.to_id == link.to_id)
            .unwrap_or(false);
        if !matched {
            return ResultCode(format!("No matching link found for '{}->{}:{}'", link.from_id, link.to_id, link.key));
        }

        self.remove_out_edge(from_id, &link.key);
        self.remove_in_edge(to_id, &link.from_id, &link.key);
        self.mark_touched(from_id);
        self.mark_touched(to_id);
        ResultCode::success()
    }

    fn set_attributes(&mut self, ids: &[ObjectId], attributes: &crate::attrs::AttributeMap, behavior: crate::attrs::MergeBehavior) -> ResultCode {
        for id in ids {
            let Some(tracker_id) = self.find_tracker_id(id) else {
                return ResultCode::object_not_found(id);
            };
            if let Some(table) = self.table_for_tracker(tracker_id) {
                if let Some(tracker) = table.get_mut(tracker_id) {
                    merge_attributes(&mut tracker.attributes, attributes, behavior);
                }
            }
            self.mark_touched(tracker_id);
        }
        ResultCode::success()
    }

    fn test_and_set_attributes(
        &mut self,
        id: &ObjectId,
        test_attributes: &crate::attrs::AttributeMap,
        attributes: &crate::attrs::AttributeMap,
        behavior: crate::attrs::MergeBehavior,
        fail_if_not_met: bool,
    ) -> (ResultCode, bool) {
        let Some(tracker_id) = self.find_tracker_id(id) else {
            return (ResultCode::object_not_found(id), false);
        };
        let met = self
            .table_for_tracker(tracker_id)
            .and_then(|table| table.get(tracker_id))
            .map(|tracker| test_attributes.iter().all(|(k, v)| tracker.attributes.get(k) == Some(v)))
            .unwrap_or(false);

        if !met {
            return if fail_if_not_met {
                (ResultCode(format!("TestAndSetAttributes: conditions not met for '{id}'")), false)
            } else {
                (ResultCode::success(), false)
            };
        }

        if let Some(table) = self.table_for_tracker(tracker_id) {
            if let Some(tracker) = table.get_mut(tracker_id) {
                merge_attributes(&mut tracker.attributes, attributes, behavior);
            }
        }
        self.mark_touched(tracker_id);
        (ResultCode::success(), true)
    }

    /// Three-pass dirty-set drain (spec §4.3) plus reference-set delta and
    /// `TableSeqNums` summary publication.
    pub fn drain_and_publish(&mut self) {
        let type_set_names: Vec<String> = self.type_sets.keys().cloned().collect();
        let mut added_items = 0u64;
        let mut removed_items = 0u64;

        for ts_name in &type_set_names {
            let mut per_set_published: Vec<(TrackerId, Arc<Object>, bool, u64)> = Vec::new();
            let (dirty, mut remove_seqs, removed_count_in_set): (Vec<TrackerId>, Vec<u64>, u64) = {
                let Some(ts) = self.type_sets.get_mut(ts_name) else { continue };
                let dirty = ts.tables.values_mut().flat_map(|table| table.drain_dirty()).collect();
                let remove_seqs = std::mem::take(&mut ts.pending_removed_ref_seqs);
                let removed_count = std::mem::take(&mut ts.pending_removed_count);
                (dirty, remove_seqs, removed_count)
            };
            if dirty.is_empty() && remove_seqs.is_empty() && removed_count_in_set == 0 {
                continue;
            }
            removed_items += removed_count_in_set;

            // Pass 1: link rebuild.
            for &tracker_id in &dirty {
                if let Some(table) = self.table_for_tracker(tracker_id) {
                    if let Some(tracker) = table.get_mut(tracker_id) {
                        tracker.rebuild_link_views();
                    }
                }
            }

            // Pass 2: primary publication. The sequence number is allocated
            // before the tracker borrow starts so it never overlaps a
            // separate borrow of `self`.
            for &tracker_id in &dirty {
                let seq = self.seq.next();
                let Some(table) = self.table_for_tracker(tracker_id) else { continue };
                let Some(tracker) = table.get_mut(tracker_id) else { continue };
                let snapshot = Arc::new(tracker.snapshot());
                tracker.last_published_seq = seq;
                let is_final = tracker.is_final();
                tracker.last_published = Some(snapshot.clone());
                tracker.publisher.publish(snapshot.clone(), seq.get());
                per_set_published.push((tracker_id, snapshot, is_final, seq.get()));
            }

            // Pass 3: through-link propagation.
            let mut queue: Vec<(TrackerId, u64)> = per_set_published.iter().map(|(id, _, _, seq)| (*id, *seq)).collect();
            let mut visited_at: HashMap<TrackerId, u64> = HashMap::new();
            while let Some((tracker_id, seq)) = queue.pop() {
                let links_in: SmallVec<[Link; 4]> = self
                    .table_for_tracker(tracker_id)
                    .and_then(|table| table.get(tracker_id))
                    .map(|tracker| tracker.links_in_built.clone())
                    .unwrap_or_default();
                for edge in links_in {
                    let Some(upstream_id) = self.index.resolve(&edge.from_id) else { continue };
                    let already_at = *visited_at.get(&upstream_id).unwrap_or(&0);
                    let current = self
                        .table_for_tracker(upstream_id)
                        .and_then(|table| table.get(upstream_id))
                        .map(|tracker| (tracker.last_published_seq.get(), tracker.last_published.clone()));
                    let Some((last_seq, Some(last))) = current else { continue };
                    if last_seq >= seq || already_at >= seq {
                        continue;
                    }
                    let next_seq = self.seq.next();
                    if let Some(table) = self.table_for_tracker(upstream_id) {
                        if let Some(upstream) = table.get_mut(upstream_id) {
                            upstream.last_published_seq = next_seq;
                            upstream.publisher.publish(last, next_seq.get());
                        }
                    }
                    visited_at.insert(upstream_id, next_seq.get());
                    queue.push((upstream_id, next_seq.get()));
                }
            }

            // Reference-set delta. `remove_seqs` already carries the slots
            // of trackers dropped since the last drain (spec §4.3); trackers
            // still present but re-touched contribute their own old slot too.
            let mut add_objects = Vec::new();
            let mut backfill: Vec<(TrackerId, usize)> = Vec::new();
            for (tracker_id, object, is_final, _) in &per_set_published {
                let old_seq = self
                    .table_for_tracker(*tracker_id)
                    .and_then(|table| table.get(*tracker_id))
                    .and_then(|tracker| tracker.ref_set_seq);
                if let Some(old_seq) = old_seq {
                    remove_seqs.push(old_seq);
                }
                if !is_final {
                    backfill.push((*tracker_id, add_objects.len()));
                    add_objects.push(object.clone());
                } else {
                    removed_items += 1;
                }
            }
            let added_items_in_set = add_objects.len() as u64;
            let history_items: Vec<Arc<Object>> = per_set_published
                .iter()
                .filter(|(_, _, is_final, _)| !is_final)
                .map(|(_, object, _, _)| object.clone())
                .collect();

            let backfill_locations: Vec<(TrackerId, usize, Option<String>)> = backfill
                .into_iter()
                .map(|(tracker_id, index)| {
                    let object_type = self.locations.get(&tracker_id).map(|(_, t)| t.clone());
                    (tracker_id, index, object_type)
                })
                .collect();

            if let Some(ts) = self.type_sets.get_mut(ts_name) {
                let new_seqs = ts.reference_set.apply_delta(remove_seqs, add_objects);
                for (tracker_id, index, object_type) in backfill_locations {
                    let Some(object_type) = object_type else { continue };
                    if let Some(tracker) = ts.tables.get_mut(&object_type).and_then(|t| t.get_mut(tracker_id)) {
                        tracker.ref_set_seq = new_seqs.get(index).copied();
                    }
                }
                ts.history_set.append(history_items);
                added_items += added_items_in_set;
                let table_change_seq = self.seq.current().get();
                ts.mark_dirty(table_change_seq);
            }
        }

        let summary = TableSeqNums {
            table_change: self.seq.current().get(),
            added_types: type_set_names.len() as u64,
            added_items,
            removed_items,
        };
        if summary != self.last_seq_nums {
            let seq = self.seq.current().get();
            self.last_seq_nums = summary.clone();
            self.seq_nums_publisher.publish(Arc::new(summary), seq);
        }
    }

    /// Load every configured, adapter-backed type-set once at part start
    /// (spec §4.4 "Load"). Rehydrated trackers are materialized into the
    /// table for their *currently configured* type (not necessarily the
    /// type-set the file was written under — this is the spec's documented
    /// migration allowance). A second pass resolves mirror `linksIn`
    /// entries now that every object is indexed, then the reconstructed
    /// dirty set is published.
    pub fn load(&mut self, scheduler: &crate::persistence::PersistenceScheduler) {
        let ts_names: Vec<String> = self.type_sets.keys().cloned().collect();
        let mut loaded_ids: Vec<(TrackerId, ObjectId)> = Vec::new();

        for ts_name in &ts_names {
            let Some(contents) = scheduler.load(ts_name) else { continue };
            for (id, mut tracker) in crate::persistence::scheduler::trackers_from_contents(&contents) {
                let tracker_id = TrackerId(self.next_tracker_id.fetch_add(1, Ordering::SeqCst));
                tracker.id = tracker_id;
                let publisher = tracker.publisher.clone();
                let object_type = id.object_type.clone();
                let resolved_ts = self.type_set_name_for(&object_type);
                self.table_mut(&object_type).insert(tracker);
                self.locations.insert(tracker_id, (resolved_ts, object_type));
                self.index.insert(&id, tracker_id, publisher);
                loaded_ids.push((tracker_id, id));
            }
        }

        // Second pass: resolve `toID` against the now-complete index and
        // install mirror edges.
        for (tracker_id, _) in &loaded_ids {
            let edges: Vec<Link> = self
                .table_for_tracker(*tracker_id)
                .and_then(|table| table.get(*tracker_id))
                .map(|tracker| tracker.links_out.values().cloned().collect())
                .unwrap_or_default();
            for edge in edges {
                if let Some(peer_id) = self.index.resolve(&edge.to_id) {
                    if let Some(table) = self.table_for_tracker(peer_id) {
                        if let Some(peer) = table.get_mut(peer_id) {
                            peer.links_in.insert((edge.from_id.full_name(), edge.key.clone()), edge.mirror());
                            peer.rebuild_in = true;
                        }
                    }
                } else {
                    tracing::warn!(link = %format!("{}->{}:{}", edge.from_id, edge.to_id, edge.key), "unresolved link target on persist load");
                }
            }
            self.mark_touched(*tracker_id);
        }

        self.drain_and_publish();
    }
}
