//! Persistence scheduler: per-type-set hold-off timing, a single background
//! storage worker thread, and load/save conversion to the persisted format
//! (spec §4.4).
//!
//! Grounded on the teacher's `StorageHandle` lifecycle (`src/storage.rs`): a
//! long-lived worker thread owned for the life of the engine, fed through a
//! channel, torn down with an explicit shutdown that flushes in-flight work.

use super::adapter::StorageAdapter;
use super::format::{FileContents, PersistedLink, PersistedObject, PersistedTypeTable};
use crate::id::ObjectId;
use crate::link::Link;
use crate::object::Object;
use crate::tracker::Tracker;
use crate::typeset::{PersistState, TypeSet};
use std::collections::HashMap;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;

struct SaveRequest {
    type_set_name: String,
    target_seq: u64,
    contents: FileContents,
    adapter: Arc<dyn StorageAdapter>,
}

struct SaveResult {
    type_set_name: String,
    target_seq: u64,
    outcome: Result<(), String>,
}

pub fn object_to_persisted(object: &Object) -> PersistedObject {
    PersistedObject {
        name: object.id.name.clone(),
        uuid: object.id.uuid.clone(),
        object_type: Some(object.id.object_type.clone()),
        flags: object.flags,
        attributes: object.attributes.clone(),
        links_out: object.links_out.iter().map(link_to_persisted).collect(),
        links_in: None,
    }
}

fn link_to_persisted(link: &Link) -> PersistedLink {
    PersistedLink {
        to_type: link.to_id.object_type.clone(),
        to_name: link.to_id.name.clone(),
        to_uuid: link.to_id.uuid.clone(),
        key: link.key.clone(),
        from_type: None,
        from_name: None,
    }
}

/// Build a [`FileContents`] from each type table's last-published
/// instances (spec §4.4 "prepare file contents").
pub fn prepare_file_contents(type_set: &TypeSet, version_seq: u64) -> FileContents {
    let type_table_set = type_set
        .tables
        .values()
        .map(|table| PersistedTypeTable {
            object_type: table.object_type.clone(),
            object_instance_set: table
                .iter()
                .filter_map(|(_, tracker)| tracker.last_published.as_ref().map(|obj| object_to_persisted(obj)))
                .collect(),
        })
        .collect();
    FileContents {
        persisted_version_seq: version_seq,
        type_table_set,
    }
}

/// Rehydrate trackers (without resolving links yet — that's a second pass
/// once every type-set has loaded) from persisted file contents.
pub fn trackers_from_contents(contents: &FileContents) -> Vec<(ObjectId, Tracker)> {
    let mut out = Vec::new();
    for table in &contents.type_table_set {
        for persisted in &table.object_instance_set {
            let object_type = persisted.object_type.clone().unwrap_or_else(|| table.object_type.clone());
            let id = match &persisted.uuid {
                Some(uuid) => ObjectId::with_uuid(object_type, persisted.name.clone(), uuid.clone()),
                None => ObjectId::new(object_type, persisted.name.clone()),
            };
            let mut tracker = Tracker::new(
                crate::tracker::TrackerId(0), // engine re-assigns the real id on insert
                id.clone(),
                persisted.flags,
                persisted.attributes.clone(),
            );
            for link in &persisted.links_out {
                let to_id = match &link.to_uuid {
                    Some(uuid) => ObjectId::with_uuid(link.to_type.clone(), link.to_name.clone(), uuid.clone()),
                    None => ObjectId::new(link.to_type.clone(), link.to_name.clone()),
                };
                let edge = Link::new(id.clone(), to_id, link.key.clone());
                tracker.links_out.insert(edge.key.clone(), edge);
            }
            out.push((id, tracker));
        }
    }
    out
}

pub struct PersistenceScheduler {
    adapters: HashMap<String, Arc<dyn StorageAdapter>>,
    in_flight: std::collections::HashSet<String>,
    request_tx: Sender<SaveRequest>,
    result_rx: Receiver<SaveResult>,
    worker: Option<std::thread::JoinHandle<()>>,
}

impl PersistenceScheduler {
    pub fn new() -> Self {
        let (request_tx, request_rx) = std::sync::mpsc::channel::<SaveRequest>();
        let (result_tx, result_rx) = std::sync::mpsc::channel::<SaveResult>();

        let worker = std::thread::Builder::new()
            .name("objgraph-persist".to_string())
            .spawn(move || {
                for request in request_rx {
                    let outcome = request.adapter.save(&request.contents).map_err(|e| e.to_string());
                    if outcome.is_err() {
                        tracing::error!(type_set = %request.type_set_name, error = ?outcome, "persist save failed");
                    }
                    let _ = result_tx.send(SaveResult {
                        type_set_name: request.type_set_name,
                        target_seq: request.target_seq,
                        outcome,
                    });
                }
            })
            .expect("spawn persistence worker thread");

        Self {
            adapters: HashMap::new(),
            in_flight: std::collections::HashSet::new(),
            request_tx,
            result_rx,
            worker: Some(worker),
        }
    }

    pub fn register(&mut self, type_set_name: impl Into<String>, adapter: Arc<dyn StorageAdapter>) {
        self.adapters.insert(type_set_name.into(), adapter);
    }

    /// Drain worker results, applying them to each type-set's persist state
    /// (spec §4.4: "If a prior write completed: record success seq ... or
    /// log the failure").
    pub fn poll_completed(&mut self, type_sets: &mut HashMap<String, TypeSet>) {
        while let Ok(result) = self.result_rx.try_recv() {
            self.in_flight.remove(&result.type_set_name);
            if let Some(ts) = type_sets.get_mut(&result.type_set_name) {
                match result.outcome {
                    Ok(()) => ts.record_save_success(result.target_seq),
                    Err(_) => ts.persist_state = PersistState::Dirty,
                }
            }
        }
    }

    /// For every dirty type-set past hold-off with a registered adapter and
    /// no write in flight, start one (spec §4.4).
    pub fn maybe_start_saves(&mut self, type_sets: &mut HashMap<String, TypeSet>) {
        for (name, ts) in type_sets.iter_mut() {
            if self.in_flight.contains(name) {
                continue;
            }
            if !ts.needs_save() || !ts.hold_off_elapsed() {
                continue;
            }
            let Some(adapter) = self.adapters.get(name) else { continue };
            ts.persist_state = PersistState::Writing;
            let target_seq = ts.last_published_seq;
            let contents = prepare_file_contents(ts, target_seq);
            self.in_flight.insert(name.clone());
            let _ = self.request_tx.send(SaveRequest {
                type_set_name: name.clone(),
                target_seq,
                contents,
                adapter: adapter.clone(),
            });
        }
    }

    /// Flush every dirty, adapter-backed type-set synchronously (spec §4.4
    /// "On part stop: flush any remaining dirty writes synchronously").
    pub fn flush_sync(&mut self, type_sets: &mut HashMap<String, TypeSet>) {
        for (name, ts) in type_sets.iter_mut() {
            if !ts.needs_save() {
                continue;
            }
            let Some(adapter) = self.adapters.get(name) else { continue };
            let target_seq = ts.last_published_seq;
            let contents = prepare_file_contents(ts, target_seq);
            match adapter.save(&contents) {
                Ok(()) => ts.record_save_success(target_seq),
                Err(e) => tracing::error!(type_set = %name, error = %e, "synchronous flush failed"),
            }
        }
    }

    pub fn load(&self, type_set_name: &str) -> Option<FileContents> {
        let adapter = self.adapters.get(type_set_name)?;
        match adapter.load() {
            Ok(contents) => Some(contents),
            Err(e) => {
                tracing::error!(type_set = %type_set_name, error = %e, "persist load failed");
                None
            }
        }
    }

    pub fn shutdown(mut self, type_sets: &mut HashMap<String, TypeSet>) {
        self.flush_sync(type_sets);
        let worker = self.worker.take();
        drop(self.request_tx);
        if let Some(handle) = worker {
            let _ = handle.join();
        }
    }
}

impl Default for PersistenceScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flags::Flags;

    #[test]
    fn prepare_file_contents_includes_only_published_trackers() {
        let mut ts = TypeSet::new("Default", std::time::Duration::from_millis(100));
        let table = ts.table_mut("Subst");
        let mut tracker = Tracker::new(crate::tracker::TrackerId(1), ObjectId::new("Subst", "S001"), Flags::empty(), crate::attrs::AttributeMap::new());
        tracker.rebuild_link_views();
        tracker.last_published = Some(Arc::new(tracker.snapshot()));
        table.insert(tracker);
        let contents = prepare_file_contents(&ts, 1);
        assert_eq!(contents.type_table_set.len(), 1);
        assert_eq!(contents.type_table_set[0].object_instance_set.len(), 1);
    }

    #[test]
    fn trackers_from_contents_rebuilds_links_out() {
        let contents = FileContents {
            persisted_version_seq: 1,
            type_table_set: vec![PersistedTypeTable {
                object_type: "Subst".to_string(),
                object_instance_set: vec![PersistedObject {
                    name: "S001".to_string(),
                    uuid: None,
                    object_type: Some("Subst".to_string()),
                    flags: Flags::empty(),
                    attributes: crate::attrs::AttributeMap::new(),
                    links_out: vec![PersistedLink {
                        to_type: "SubstLoc".to_string(),
                        to_name: "LP1".to_string(),
                        to_uuid: None,
                        key: "Contains".to_string(),
                        from_type: None,
                        from_name: None,
                    }],
                    links_in: None,
                }],
            }],
        };
        let trackers = trackers_from_contents(&contents);
        assert_eq!(trackers.len(), 1);
        assert_eq!(trackers[0].1.links_out.len(), 1);
    }
}
