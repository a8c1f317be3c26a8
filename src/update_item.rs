//! Tagged update-item variants dispatched by the executor (spec §4.2, §6).

use crate::attrs::{AttributeMap, MergeBehavior};
use crate::flags::Flags;
use crate::id::ObjectId;
use crate::link::Link;
use crate::object::Object;
use crate::observer::Publisher;
use std::sync::Arc;
use std::time::Duration;

/// A predicate over a candidate cascade-removal edge (spec §4.2 `RemoveObject`).
pub type LinkedRemovalFilter = Arc<dyn Fn(&Link) -> bool + Send + Sync>;

pub enum UpdateItem {
    AddObject {
        id: ObjectId,
        attributes: AttributeMap,
        flags: Flags,
        if_needed: bool,
        merge_behavior: MergeBehavior,
        /// Filled in by the executor with the tracker's publisher.
        publisher_out: Option<Arc<Publisher<Object>>>,
    },
    RemoveObject {
        id: ObjectId,
        linked_removal_filter: Option<LinkedRemovalFilter>,
    },
    AddLink {
        link: Link,
        auto_unlink_from_prior: bool,
        if_needed: bool,
    },
    RemoveLink {
        link: Link,
    },
    SetAttributes {
        ids: Vec<ObjectId>,
        attributes: AttributeMap,
        merge_behavior: MergeBehavior,
    },
    TestAndSetAttributes {
        id: ObjectId,
        test_attributes: AttributeMap,
        attributes: AttributeMap,
        merge_behavior: MergeBehavior,
        fail_if_not_met: bool,
        /// Filled in by the executor.
        test_conditions_met: Option<bool>,
    },
    SyncPublication,
    SyncPersist {
        object_type: Option<String>,
        wait_time_limit: Option<Duration>,
        fail_on_timeout: bool,
    },
    SyncExternal {
        sync_publication_first: bool,
        wait_time_limit: Duration,
        fail_on_timeout: bool,
        fail_if_factory_offline: bool,
        fail_if_no_factory: bool,
        request_cancel_on_timeout: bool,
    },
}

impl UpdateItem {
    pub fn add_object(id: ObjectId, attributes: AttributeMap, flags: Flags) -> Self {
        UpdateItem::AddObject {
            id,
            attributes,
            flags,
            if_needed: false,
            merge_behavior: MergeBehavior::AddAndUpdate,
            publisher_out: None,
        }
    }

    pub fn remove_object(id: ObjectId) -> Self {
        UpdateItem::RemoveObject {
            id,
            linked_removal_filter: None,
        }
    }

    pub fn add_link(link: Link) -> Self {
        UpdateItem::AddLink {
            link,
            auto_unlink_from_prior: false,
            if_needed: false,
        }
    }

    pub fn set_attributes(id: ObjectId, attributes: AttributeMap, merge_behavior: MergeBehavior) -> Self {
        UpdateItem::SetAttributes {
            ids: vec![id],
            attributes,
            merge_behavior,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            UpdateItem::AddObject { .. } => "AddObject",
            UpdateItem::RemoveObject { .. } => "RemoveObject",
            UpdateItem::AddLink { .. } => "AddLink",
            UpdateItem::RemoveLink { .. } => "RemoveLink",
            UpdateItem::SetAttributes { .. } => "SetAttributes",
            UpdateItem::TestAndSetAttributes { .. } => "TestAndSetAttributes",
            UpdateItem::SyncPublication => "SyncPublication",
            UpdateItem::SyncPersist { .. } => "SyncPersist",
            UpdateItem::SyncExternal { .. } => "SyncExternal",
        }
    }
}
