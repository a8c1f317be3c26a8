//! Directional, keyed links between objects (spec §3).

use crate::id::ObjectId;
use serde::{Deserialize, Serialize};

/// Key substituted for a null/empty client-supplied link key.
pub const UNNAMED_LINK_KEY: &str = "__unnamed__";

/// A directional, keyed edge `from -> to`. Stored twice: once as a
/// `linksOut` entry on `from`, once as its mirror `linksIn` entry on `to`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub from_id: ObjectId,
    pub to_id: ObjectId,
    pub key: String,
}

impl Link {
    pub fn new(from_id: ObjectId, to_id: ObjectId, key: impl Into<String>) -> Self {
        let key = key.into();
        let key = if key.is_empty() {
            UNNAMED_LINK_KEY.to_string()
        } else {
            key
        };
        Self { from_id, to_id, key }
    }

    /// The mirror edge installed in the target's `linksIn`.
    pub fn mirror(&self) -> Link {
        Link {
            from_id: self.from_id.clone(),
            to_id: self.to_id.clone(),
            key: self.key.clone(),
        }
    }
}
