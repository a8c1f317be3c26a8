//! The immutable, externally-visible `Object` snapshot (spec §3).

use crate::attrs::AttributeMap;
use crate::flags::Flags;
use crate::id::ObjectId;
use crate::link::Link;
use serde::{Deserialize, Serialize};

/// A published, immutable snapshot of one object's state.
///
/// Once published an `Object` instance is never mutated; a tracker's next
/// publication produces a brand-new instance (spec §3 invariant 4).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Object {
    pub id: ObjectId,
    pub flags: Flags,
    pub attributes: AttributeMap,
    pub links_out: Vec<Link>,
    pub links_in: Vec<Link>,
}

impl Object {
    pub fn is_final(&self) -> bool {
        self.flags.contains(Flags::IS_FINAL)
    }
}
