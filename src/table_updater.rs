//! `TableUpdater`: the client-facing handle (spec §4.6 "Client API").
//!
//! Cloning a `TableUpdater` is cheap (an `Arc` bundle); every clone shares
//! the same [`IndexTables`] for reads and the same [`ActionQueue`] for
//! submitting work. Reads never queue behind the dispatcher thread.

use crate::action::Action;
use crate::attrs::{AttributeMap, MergeBehavior};
use crate::engine::TableSeqNums;
use crate::flags::Flags;
use crate::id::ObjectId;
use crate::index::IndexTables;
use crate::link::Link;
use crate::object::Object;
use crate::observer::Publisher;
use crate::queue::ActionQueue;
use crate::update_item::UpdateItem;
use std::sync::Arc;

/// Picks a named action-logging profile (spec §4.6). Profiles themselves are
/// a host-application concern; the table only threads the selector through
/// so a caller's tracing layer can filter on it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogConfigSelect(pub Option<String>);

impl LogConfigSelect {
    pub fn none() -> Self {
        LogConfigSelect(None)
    }

    pub fn named(name: impl Into<String>) -> Self {
        LogConfigSelect(Some(name.into()))
    }
}

/// Shared read/submit handle into the table. This is what client code
/// actually holds; it never touches [`crate::engine::EngineState`] directly.
#[derive(Clone)]
pub struct TableUpdater {
    index: Arc<IndexTables>,
    queue: Arc<ActionQueue>,
    seq_nums_publisher: Arc<Publisher<TableSeqNums>>,
}

impl TableUpdater {
    pub fn new(index: Arc<IndexTables>, queue: Arc<ActionQueue>, seq_nums_publisher: Arc<Publisher<TableSeqNums>>) -> Self {
        Self {
            index,
            queue,
            seq_nums_publisher,
        }
    }

    /// Slot delivering the table-wide [`TableSeqNums`] summary.
    pub fn seq_nums_publisher(&self) -> &Arc<Publisher<TableSeqNums>> {
        &self.seq_nums_publisher
    }

    /// Snapshot of every currently-published, non-final object, optionally
    /// filtered by type and/or an arbitrary instance predicate.
    pub fn get_objects(&self, type_filter: Option<&str>, instance_filter: Option<&dyn Fn(&Object) -> bool>) -> Vec<Arc<Object>> {
        self.index
            .snapshot_objects(type_filter)
            .into_iter()
            .filter(|obj| !obj.is_final())
            .filter(|obj| instance_filter.map(|f| f(obj)).unwrap_or(true))
            .collect()
    }

    pub fn get_object_count(&self, type_filter: Option<&str>, instance_filter: Option<&dyn Fn(&Object) -> bool>) -> usize {
        self.get_objects(type_filter, instance_filter).len()
    }

    /// The publisher slot for a given id, if a tracker for it currently exists.
    pub fn get_publisher(&self, id: &ObjectId) -> Option<Arc<Publisher<Object>>> {
        let tracker_id = self.index.resolve(id)?;
        self.index.publisher(tracker_id)
    }

    /// Submit a single update item as a new action (spec §4.6).
    pub fn update(&self, item: UpdateItem, log_config_select: LogConfigSelect) -> Arc<Action> {
        self.update_many(vec![item], log_config_select)
    }

    /// Submit an ordered batch of update items as one action.
    pub fn update_many(&self, items: Vec<UpdateItem>, log_config_select: LogConfigSelect) -> Arc<Action> {
        if let Some(profile) = &log_config_select.0 {
            tracing::debug!(profile = %profile, item_count = items.len(), "submitting action");
        }
        let action = Action::new(items);
        action.start();
        self.queue.enqueue(action.clone());
        action
    }

    /// Convenience: add an object and run it to completion, returning its
    /// publisher on success.
    pub fn add_object_and_wait(
        &self,
        id: ObjectId,
        attributes: AttributeMap,
        flags: Flags,
        timeout: Option<std::time::Duration>,
    ) -> Result<Arc<Publisher<Object>>, crate::error::ResultCode> {
        let action = self.update(UpdateItem::add_object(id.clone(), attributes, flags), LogConfigSelect::none());
        action.wait(timeout);
        let code = action.result_code();
        if !code.is_success() {
            return Err(code);
        }
        self.get_publisher(&id).ok_or(code)
    }

    pub fn set_attributes_and_wait(
        &self,
        id: ObjectId,
        attributes: AttributeMap,
        merge_behavior: MergeBehavior,
        timeout: Option<std::time::Duration>,
    ) -> Result<(), crate::error::ResultCode> {
        let action = self.update(UpdateItem::set_attributes(id, attributes, merge_behavior), LogConfigSelect::none());
        action.wait(timeout);
        let code = action.result_code();
        if code.is_success() {
            Ok(())
        } else {
            Err(code)
        }
    }

    pub fn add_link_and_wait(&self, link: Link, timeout: Option<std::time::Duration>) -> Result<(), crate::error::ResultCode> {
        let action = self.update(UpdateItem::add_link(link), LogConfigSelect::none());
        action.wait(timeout);
        let code = action.result_code();
        if code.is_success() {
            Ok(())
        } else {
            Err(code)
        }
    }

    pub fn remove_object_and_wait(&self, id: ObjectId, timeout: Option<std::time::Duration>) -> Result<(), crate::error::ResultCode> {
        let action = self.update(UpdateItem::remove_object(id), LogConfigSelect::none());
        action.wait(timeout);
        let code = action.result_code();
        if code.is_success() {
            Ok(())
        } else {
            Err(code)
        }
    }
}
