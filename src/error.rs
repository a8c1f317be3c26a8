//! Engine error categories (spec §7), and the string `ResultCode` wire
//! contract clients actually observe (spec §6).

use thiserror::Error;

/// Internal error categories. Never propagated to the dispatcher loop as a
/// panic or unwind: every path that can produce one of these converts it to
/// a [`ResultCode`] on the completing action (spec §7 policy).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("Internal: {0}")]
    InvariantViolation(String),

    #[error("BaseState is not Online (queue={0})")]
    NotOnline(String),

    #[error("persist failed: {0}")]
    PersistFailure(String),

    #[error("external sync failed: {0}")]
    ExternalSyncFailure(String),
}

impl EngineError {
    /// Render as the `ResultCode` a client-facing `Action` completes with.
    pub fn into_result_code(self) -> ResultCode {
        ResultCode(self.to_string())
    }
}

/// A stable, string-coded completion result (spec §6: "Result codes
/// (string)"). Empty string means success.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResultCode(pub String);

impl ResultCode {
    pub fn success() -> Self {
        ResultCode(String::new())
    }

    pub fn is_success(&self) -> bool {
        self.0.is_empty()
    }

    pub fn enqueue_failed(queue_name: &str, reason: &str) -> Self {
        ResultCode(format!("{queue_name}.Enqueue.Failed.{reason}"))
    }

    pub fn queue_disabled(queue_name: &str) -> Self {
        ResultCode(format!("{queue_name}.DisableQueue.ActionHasBeenCanceled"))
    }

    pub fn queue_full(queue_name: &str) -> Self {
        ResultCode(format!("{queue_name}.Enqueue.Failed.QueueFull"))
    }

    pub fn canceled_while_queued() -> Self {
        ResultCode("Action.CanceledWhileQueued".to_string())
    }

    pub fn object_already_exists(id: &crate::id::ObjectId) -> Self {
        ResultCode(format!("Cannot add object '{id}': object already exists"))
    }

    pub fn object_not_found(id: &crate::id::ObjectId) -> Self {
        ResultCode(format!("No object found for ObjectID '{id}'"))
    }

    pub fn link_key_in_use(key: &str, existing_link: &crate::link::Link) -> Self {
        ResultCode(format!(
            "Link key '{key}' already in use as '{}->{}:{}'",
            existing_link.from_id, existing_link.to_id, existing_link.key
        ))
    }

    pub fn link_source_not_found(link: &crate::link::Link) -> Self {
        ResultCode(format!(
            "Source/From object not found for link '{}->{}:{}'",
            link.from_id, link.to_id, link.key
        ))
    }

    pub fn link_target_not_found(link: &crate::link::Link) -> Self {
        ResultCode(format!(
            "Target/To object not found for link '{}->{}:{}'",
            link.from_id, link.to_id, link.key
        ))
    }
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<EngineError> for ResultCode {
    fn from(e: EngineError) -> Self {
        e.into_result_code()
    }
}
