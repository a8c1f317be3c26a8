//! The single dispatcher worker thread (spec §4.1, §5): owns the
//! [`EngineState`] exclusively, pulls actions off the [`ActionQueue`], and
//! services cancellation and persistence scheduling on every tick.
//!
//! Grounded on the teacher's long-lived worker-thread ownership pattern
//! (`StorageHandle` in `src/storage.rs`): a `JoinHandle` plus a shutdown
//! flag, started at construction and joined at teardown.

#[cfg(test)]
use crate::action::ActionState;
use crate::engine::EngineState;
use crate::error::ResultCode;
use crate::persistence::PersistenceScheduler;
use crate::queue::ActionQueue;
use crate::update_item::UpdateItem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct Dispatcher {
    queue: Arc<ActionQueue>,
    shutdown: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<(EngineState, PersistenceScheduler)>>,
}

impl Dispatcher {
    /// Spawn the worker thread. `engine`/`scheduler` are moved onto it and
    /// only ever touched there.
    pub fn spawn(queue: Arc<ActionQueue>, mut engine: EngineState, scheduler: PersistenceScheduler, poll_interval: Duration) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let worker_queue = queue.clone();
        let worker_shutdown = shutdown.clone();

        engine.load(&scheduler);

        let handle = std::thread::Builder::new()
            .name("objgraph-dispatcher".to_string())
            .spawn(move || run(worker_queue, worker_shutdown, engine, scheduler, poll_interval))
            .expect("spawn dispatcher thread");

        Self {
            queue,
            shutdown,
            handle: Some(handle),
        }
    }

    pub fn action_queue(&self) -> &Arc<ActionQueue> {
        &self.queue
    }

    /// Stop the dispatcher: disables the queue, signals the loop to exit,
    /// and blocks until the worker thread (and its persistence worker) have
    /// flushed and joined (spec §4.4 "On part stop").
    pub fn shutdown(mut self) {
        self.queue.disable();
        self.shutdown.store(true, Ordering::SeqCst);
        self.queue.note_cancel_request(); // wake a blocked get_next_action, if any
        if let Some(handle) = self.handle.take() {
            let (mut engine, scheduler) = handle.join().expect("dispatcher thread panicked");
            scheduler.shutdown(&mut engine.type_sets);
        }
    }
}

/// A `SyncPersist` whose action has already run but is held, uncompleted,
/// until its targeted type-sets finish saving (spec §4.2 "the action is
/// held until `lastSucceededSaveSeqNum >= capturedSeqNum`"). Checked once
/// per dispatcher tick alongside everything else, so outstanding syncs never
/// stall the queue (spec §5 lists exactly two suspension points, and a
/// `SyncPersist` wait is not one of them).
struct PendingSync {
    action: Arc<crate::action::Action>,
    targets: Vec<(String, u64)>,
    deadline: Option<Instant>,
    fail_on_timeout: bool,
}

fn run(queue: Arc<ActionQueue>, shutdown: Arc<AtomicBool>, mut engine: EngineState, mut scheduler: PersistenceScheduler, poll_interval: Duration) -> (EngineState, PersistenceScheduler) {
    let mut pending_syncs: Vec<PendingSync> = Vec::new();

    while !shutdown.load(Ordering::SeqCst) {
        queue.service_cancel_requests();
        scheduler.poll_completed(&mut engine.type_sets);
        scheduler.maybe_start_saves(&mut engine.type_sets);
        service_pending_syncs(&mut pending_syncs, &engine);

        match queue.try_get_next_action() {
            Some(action) => {
                action.mark_issued();
                let mut items = std::mem::take(&mut *action.items.lock());
                let result = engine.perform_updates(&mut items);
                let pending_sync = sync_persist_wait(&items);
                *action.items.lock() = items;

                if result.is_success() {
                    if let Some((type_set_names, wait, fail_on_timeout)) = pending_sync {
                        let targets = sync_targets(&engine, &type_set_names);
                        pending_syncs.push(PendingSync {
                            action,
                            targets,
                            deadline: wait.map(|d| Instant::now() + d),
                            fail_on_timeout,
                        });
                        continue;
                    }
                }
                action.complete(result);
            }
            None => {
                std::thread::sleep(poll_interval);
            }
        }
    }

    // Resolve every outstanding sync against final state rather than
    // abandoning its action mid-wait.
    service_pending_syncs(&mut pending_syncs, &engine);
    for pending in pending_syncs {
        if pending.fail_on_timeout {
            pending.action.complete(ResultCode("SyncPersist.Failed.Timeout".to_string()));
        } else {
            pending.action.complete(ResultCode::success());
        }
    }
    (engine, scheduler)
}

/// Complete every pending sync whose targets have caught up or whose
/// deadline has passed; leaves the rest queued for the next tick.
fn service_pending_syncs(pending: &mut Vec<PendingSync>, engine: &EngineState) {
    let now = Instant::now();
    pending.retain(|p| {
        let satisfied = p
            .targets
            .iter()
            .all(|(name, target_seq)| engine.type_sets.get(name).map(|ts| ts.last_succeeded_save_seq >= *target_seq).unwrap_or(true));
        if satisfied {
            p.action.complete(ResultCode::success());
            return false;
        }
        if p.deadline.map(|deadline| now >= deadline).unwrap_or(false) {
            if p.fail_on_timeout {
                p.action.complete(ResultCode("SyncPersist.Failed.Timeout".to_string()));
            } else {
                p.action.complete(ResultCode::success());
            }
            return false;
        }
        true
    });
}

/// Extract the target type-sets and wait policy from any `SyncPersist` item
/// in the action (spec §4.2).
fn sync_persist_wait(items: &[UpdateItem]) -> Option<(Vec<String>, Option<Duration>, bool)> {
    for item in items {
        if let UpdateItem::SyncPersist { object_type, wait_time_limit, fail_on_timeout } = item {
            let names = object_type.clone().into_iter().collect();
            return Some((names, *wait_time_limit, *fail_on_timeout));
        }
    }
    None
}

/// The `(type-set name, lastPublishedSeqNum)` pairs a `SyncPersist` must
/// wait to see reflected in `lastSucceededSaveSeqNum`, one per named type,
/// or every known type-set when none was named.
fn sync_targets(engine: &EngineState, type_set_names: &[String]) -> Vec<(String, u64)> {
    if type_set_names.is_empty() {
        engine.type_sets.iter().map(|(name, ts)| (name.clone(), ts.last_published_seq)).collect()
    } else {
        type_set_names
            .iter()
            .map(|object_type| {
                let name = engine.config.type_set_for(object_type).to_string();
                let seq = engine.type_sets.get(&name).map(|ts| ts.last_published_seq).unwrap_or(0);
                (name, seq)
            })
            .collect()
    }
}
