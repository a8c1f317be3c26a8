//! Engine configuration (ambient stack addition; spec.md treats
//! configuration parsing as an out-of-scope collaborator but a runnable
//! crate still needs a typed configuration surface).

use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_queue_capacity() -> usize {
    crate::queue::MIN_CAPACITY
}

fn default_hold_off_ms() -> u64 {
    100
}

fn default_persist_poll_ms() -> u64 {
    20
}

/// Configuration for one [`crate::typeset::TypeSet`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TypeSetConfig {
    pub name: String,
    pub object_types: Vec<String>,
    #[serde(default = "default_hold_off_ms")]
    pub hold_off_ms: u64,
    /// File path used by the reference `FileStorageAdapter`; `None` means
    /// the type-set is never persisted.
    #[serde(default)]
    pub storage_path: Option<std::path::PathBuf>,
}

impl TypeSetConfig {
    pub fn hold_off(&self) -> Duration {
        Duration::from_millis(self.hold_off_ms)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_persist_poll_ms")]
    pub persist_poll_ms: u64,
    #[serde(default)]
    pub type_sets: Vec<TypeSetConfig>,
    /// Type-set name that unknown/unmapped object types fall back to for
    /// `SyncPersist` (spec §9 open question (a)).
    #[serde(default = "default_type_set_name")]
    pub default_type_set: String,
}

fn default_type_set_name() -> String {
    "Default".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            persist_poll_ms: default_persist_poll_ms(),
            type_sets: Vec::new(),
            default_type_set: default_type_set_name(),
        }
    }
}

impl EngineConfig {
    pub fn persist_poll_interval(&self) -> Duration {
        Duration::from_millis(self.persist_poll_ms)
    }

    /// Resolve the type-set name an object type belongs to, falling back to
    /// `default_type_set` when no configured set claims it (spec §9).
    pub fn type_set_for(&self, object_type: &str) -> &str {
        self.type_sets
            .iter()
            .find(|ts| ts.object_types.iter().any(|t| t == object_type))
            .map(|ts| ts.name.as_str())
            .unwrap_or(&self.default_type_set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmapped_type_falls_back_to_default_set() {
        let config = EngineConfig::default();
        assert_eq!(config.type_set_for("Whatever"), "Default");
    }

    #[test]
    fn mapped_type_resolves_to_its_set() {
        let mut config = EngineConfig::default();
        config.type_sets.push(TypeSetConfig {
            name: "Substrates".to_string(),
            object_types: vec!["Subst".to_string(), "SubstLoc".to_string()],
            hold_off_ms: 100,
            storage_path: None,
        });
        assert_eq!(config.type_set_for("Subst"), "Substrates");
        assert_eq!(config.type_set_for("Unrelated"), "Default");
    }
}
