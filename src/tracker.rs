//! Tracker: per-object internal mutable state (spec §3 "Tracker (internal)").

use crate::attrs::AttributeMap;
use crate::flags::Flags;
use crate::id::ObjectId;
use crate::link::Link;
use crate::object::Object;
use crate::observer::Publisher;
use crate::seq::SeqNum;
use indexmap::IndexMap;
use smallvec::SmallVec;
use std::sync::Arc;

/// Most objects carry a handful of links; inlining a few avoids a heap
/// allocation per rebuild for the common case (teacher's own `Update` impl
/// for `SmallVec` in `src/update.rs` is the same small-collection idiom).
type LinkList = SmallVec<[Link; 4]>;

/// Opaque, dispatcher-assigned identity for a tracker. Never reused within a
/// process lifetime.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackerId(pub u64);

/// Key into a tracker's `links_in` dictionary: the mirror edge is addressed
/// by the source's full name plus the link key (spec §4.2 AddLink/RemoveLink).
pub type LinkInKey = (String, String);

pub struct Tracker {
    pub id: TrackerId,
    pub object_id: ObjectId,
    pub flags: Flags,
    pub attributes: AttributeMap,

    /// Keyed by link key; at most one outgoing edge per key (invariant 2).
    pub links_out: IndexMap<String, Link>,
    /// Keyed by `(from_full_name, key)`.
    pub links_in: IndexMap<LinkInKey, Link>,

    pub touched: bool,
    pub rebuild_out: bool,
    pub rebuild_in: bool,

    /// Immutable ordered views rebuilt from the dictionaries above during
    /// the publication engine's link-rebuild pass (spec §4.3 pass 1).
    pub links_out_built: LinkList,
    pub links_in_built: LinkList,

    pub last_published: Option<Arc<Object>>,
    pub last_published_seq: SeqNum,
    pub publisher: Arc<Publisher<Object>>,

    /// Name of the external value-interconnect slot, when `CREATE_IVA` is set.
    pub iva_slot_name: Option<String>,

    /// The sequence number at which this tracker's clone currently sits in
    /// its type-set's reference set, if any (spec §4.3 "reference-set deltas").
    pub ref_set_seq: Option<u64>,
}

impl Tracker {
    pub fn new(id: TrackerId, object_id: ObjectId, flags: Flags, attributes: AttributeMap) -> Self {
        Self {
            id,
            object_id,
            flags,
            attributes,
            links_out: IndexMap::new(),
            links_in: IndexMap::new(),
            touched: true,
            rebuild_out: true,
            rebuild_in: true,
            links_out_built: LinkList::new(),
            links_in_built: LinkList::new(),
            last_published: None,
            last_published_seq: SeqNum::ZERO,
            publisher: Arc::new(Publisher::new()),
            iva_slot_name: None,
            ref_set_seq: None,
        }
    }

    pub fn mark_touched(&mut self) {
        self.touched = true;
    }

    pub fn is_final(&self) -> bool {
        self.flags.contains(Flags::IS_FINAL)
    }

    pub fn rebuild_link_views(&mut self) {
        if self.rebuild_out {
            self.links_out_built = self.links_out.values().cloned().collect();
            self.rebuild_out = false;
        }
        if self.rebuild_in {
            self.links_in_built = self.links_in.values().cloned().collect();
            self.rebuild_in = false;
        }
    }

    /// Build the immutable snapshot that primary publication installs.
    pub fn snapshot(&self) -> Object {
        Object {
            id: self.object_id.clone(),
            flags: self.flags,
            attributes: self.attributes.clone(),
            links_out: self.links_out_built.to_vec(),
            links_in: self.links_in_built.to_vec(),
        }
    }
}
