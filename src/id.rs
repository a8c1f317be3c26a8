//! Object identity: the `(type, name, uuid?)` triple described in spec §3.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Immutable identity triple for an object in the table.
///
/// Equality: `type` and `name` must match; if both sides carry a UUID, the
/// UUIDs must match too. A UUID present on only one side does not
/// disqualify a match.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ObjectId {
    pub object_type: String,
    pub name: String,
    pub uuid: Option<String>,
}

impl ObjectId {
    pub fn new(object_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            name: name.into(),
            uuid: None,
        }
    }

    pub fn with_uuid(
        object_type: impl Into<String>,
        name: impl Into<String>,
        uuid: impl Into<String>,
    ) -> Self {
        Self {
            object_type: object_type.into(),
            name: name.into(),
            uuid: Some(uuid.into()),
        }
    }

    /// The empty id: all fields empty, used to mean "no target".
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.object_type.is_empty() && self.name.is_empty() && self.uuid.is_none()
    }

    pub fn is_valid(&self) -> bool {
        !self.object_type.is_empty() && !self.name.is_empty()
    }

    /// `"type:name"`, the key into the `(type, name)` index.
    pub fn full_name(&self) -> String {
        format!("{}:{}", self.object_type, self.name)
    }
}

impl PartialEq for ObjectId {
    fn eq(&self, other: &Self) -> bool {
        if self.object_type != other.object_type || self.name != other.name {
            return false;
        }
        match (&self.uuid, &other.uuid) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        }
    }
}

impl Eq for ObjectId {}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.uuid {
            Some(uuid) => write!(f, "{}:{}[{}]", self.object_type, self.name, uuid),
            None => write!(f, "{}:{}", self.object_type, self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_ignores_one_sided_uuid() {
        let a = ObjectId::new("Subst", "S001");
        let b = ObjectId::with_uuid("Subst", "S001", "abc-123");
        assert_eq!(a, b);
    }

    #[test]
    fn equality_requires_matching_uuid_when_both_present() {
        let a = ObjectId::with_uuid("Subst", "S001", "abc-123");
        let b = ObjectId::with_uuid("Subst", "S001", "xyz-789");
        assert_ne!(a, b);
    }

    #[test]
    fn empty_id_has_empty_fields() {
        let id = ObjectId::empty();
        assert!(id.is_empty());
        assert!(!id.is_valid());
    }

    #[test]
    fn full_name_format() {
        let id = ObjectId::new("SubstLoc", "LP1");
        assert_eq!(id.full_name(), "SubstLoc:LP1");
    }
}
