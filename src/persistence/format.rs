//! The persisted logical format (spec §6): one file per type-set.

use crate::attrs::AttributeMap;
use crate::flags::Flags;
use serde::{Deserialize, Serialize};

/// A link as it appears in a persisted/serialized object. `from_name`/
/// `from_type` are omitted for per-type-set persistence (implicit from
/// context) and populated only for remote/wire serialization (spec §6).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistedLink {
    pub to_type: String,
    pub to_name: String,
    pub to_uuid: Option<String>,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_name: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistedObject {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    pub flags: Flags,
    pub attributes: AttributeMap,
    pub links_out: Vec<PersistedLink>,
    /// Only emitted for remote/wire serialization; persist load rebuilds it
    /// from `links_out` (spec §6).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links_in: Option<Vec<PersistedLink>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistedTypeTable {
    #[serde(rename = "type")]
    pub object_type: String,
    pub object_instance_set: Vec<PersistedObject>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileContents {
    pub persisted_version_seq: u64,
    pub type_table_set: Vec<PersistedTypeTable>,
}
