//! An in-memory, transactional, persistent object-graph table: typed
//! objects connected by bidirectional links, grouped into type-sets that
//! schedule their own persistence, driven by a single dispatcher thread that
//! applies client-submitted actions and republishes the dirty set.
//!
//! Reads ([`TableUpdater::get_objects`], [`TableUpdater::get_publisher`])
//! never queue behind the dispatcher: they resolve directly against
//! [`IndexTables`], which the dispatcher keeps in sync on every add/remove.
//! Writes are submitted as [`Action`]s through a bounded [`ActionQueue`] and
//! applied, in order, by the one thread that owns [`EngineState`].

mod action;
mod attrs;
mod config;
mod dispatcher;
mod engine;
mod error;
mod flags;
mod id;
mod index;
mod link;
mod object;
mod observer;
pub mod persistence;
mod queue;
mod seq;
mod table;
mod table_updater;
mod tracker;
mod typeset;
mod update_item;

pub use action::{Action, ActionState};
pub use attrs::{AttrValue, AttributeMap, MergeBehavior};
pub use config::{EngineConfig, TypeSetConfig};
pub use dispatcher::Dispatcher;
pub use engine::{EngineState, TableSeqNums};
pub use error::{EngineError, ResultCode};
pub use flags::Flags;
pub use id::ObjectId;
pub use index::IndexTables;
pub use link::{Link, UNNAMED_LINK_KEY};
pub use object::Object;
pub use observer::{ObserverWithExtractor, Publisher};
pub use queue::{ActionQueue, MIN_CAPACITY};
pub use seq::{SeqAllocator, SeqNum};
pub use table_updater::{LogConfigSelect, TableUpdater};
pub use update_item::{LinkedRemovalFilter, UpdateItem};

use std::sync::Arc;
use std::time::Duration;

/// Wires up the table: an `IndexTables`/`ActionQueue` pair shared with the
/// dispatcher thread it spawns, and the [`TableUpdater`] handle clients use.
///
/// Runs a single part instance for the table's lifetime; `shutdown` flushes
/// persistence and joins the dispatcher thread (spec §4.4 "On part stop").
pub struct ObjectGraphTable {
    dispatcher: Dispatcher,
    updater: TableUpdater,
}

impl ObjectGraphTable {
    /// Start the table: spawns the dispatcher thread, which itself performs
    /// the one-time `Load` from every configured, adapter-backed type-set
    /// before accepting actions (spec §4.4 "executed once at part start").
    pub fn start(config: EngineConfig, scheduler: persistence::PersistenceScheduler) -> Self {
        let index = Arc::new(IndexTables::new());
        let queue = Arc::new(ActionQueue::new("ObjectGraphTable", config.queue_capacity));
        let poll_interval = config.persist_poll_interval();
        let engine = EngineState::new(config, index.clone());
        let seq_nums_publisher = engine.seq_nums_publisher.clone();

        let dispatcher = Dispatcher::spawn(queue.clone(), engine, scheduler, poll_interval);
        let updater = TableUpdater::new(index, queue, seq_nums_publisher);

        Self { dispatcher, updater }
    }

    pub fn updater(&self) -> TableUpdater {
        self.updater.clone()
    }

    /// Stop the table: disables the queue, signals the dispatcher loop to
    /// exit, and blocks until it (and the persistence worker it owns) have
    /// flushed and joined.
    pub fn shutdown(self) {
        self.dispatcher.shutdown();
    }
}

/// Poll interval the dispatcher falls back to sleeping for when the action
/// queue is empty (overridden by [`EngineConfig::persist_poll_ms`]).
pub const DEFAULT_DISPATCHER_POLL: Duration = Duration::from_millis(20);

pub mod prelude {
    pub use crate::{
        AttrValue, AttributeMap, EngineConfig, Flags, Link, MergeBehavior, Object, ObjectGraphTable, ObjectId, ResultCode, TableUpdater,
        UpdateItem,
    };
}
