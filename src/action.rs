//! Client-submitted actions and their state machine (spec §4.1, §4.6).
//!
//! Grounded on the teacher's `Handle`/`Coordinate` rendezvous pair
//! (`src/handle.rs`): a `Mutex` guarding shared state plus a `Condvar` a
//! waiter parks on until the mutex-guarded predicate changes.

use crate::error::ResultCode;
use crate::update_item::UpdateItem;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionState {
    Created,
    Started,
    Queued,
    ImmediatelyCompleted,
    Issued,
    Completed,
    Canceled,
}

impl ActionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ActionState::Completed | ActionState::Canceled | ActionState::ImmediatelyCompleted)
    }
}

struct Shared {
    state: ActionState,
    result_code: ResultCode,
}

/// One client-submitted unit of work: an ordered batch of [`UpdateItem`]s
/// that applies atomically (spec §4.1's per-action state machine).
pub struct Action {
    pub items: Mutex<Vec<UpdateItem>>,
    cancel_requested: AtomicBool,
    shared: Mutex<Shared>,
    completed: Condvar,
}

impl Action {
    pub fn new(items: Vec<UpdateItem>) -> Arc<Action> {
        Arc::new(Action {
            items: Mutex::new(items),
            cancel_requested: AtomicBool::new(false),
            shared: Mutex::new(Shared {
                state: ActionState::Created,
                result_code: ResultCode::success(),
            }),
            completed: Condvar::new(),
        })
    }

    pub fn start(&self) {
        let mut shared = self.shared.lock();
        if shared.state == ActionState::Created {
            shared.state = ActionState::Started;
        }
    }

    pub fn state(&self) -> ActionState {
        self.shared.lock().state
    }

    pub fn mark_queued(&self) {
        let mut shared = self.shared.lock();
        if shared.state == ActionState::Started {
            shared.state = ActionState::Queued;
        }
    }

    pub fn mark_issued(&self) {
        let mut shared = self.shared.lock();
        if matches!(shared.state, ActionState::Started | ActionState::Queued) {
            shared.state = ActionState::Issued;
        }
    }

    /// Complete with `code`; empty means success. Wakes any waiter parked in
    /// [`Action::wait`].
    pub fn complete(&self, code: ResultCode) {
        let mut shared = self.shared.lock();
        if shared.state.is_terminal() {
            return;
        }
        shared.result_code = code;
        shared.state = if shared.state == ActionState::Started {
            ActionState::ImmediatelyCompleted
        } else {
            ActionState::Completed
        };
        self.completed.notify_all();
    }

    pub fn request_cancel(&self) {
        self.cancel_requested.store(true, Ordering::SeqCst);
    }

    pub fn cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::SeqCst)
    }

    /// Complete with [`ResultCode::canceled_while_queued`] unless already terminal.
    pub fn cancel(&self) {
        let mut shared = self.shared.lock();
        if shared.state.is_terminal() {
            return;
        }
        shared.result_code = ResultCode::canceled_while_queued();
        shared.state = ActionState::Canceled;
        self.completed.notify_all();
    }

    pub fn result_code(&self) -> ResultCode {
        self.shared.lock().result_code.clone()
    }

    pub fn is_complete(&self) -> bool {
        self.shared.lock().state.is_terminal()
    }

    /// Block until the action reaches a terminal state, or until `timeout`
    /// elapses (returns the state reached either way).
    pub fn wait(&self, timeout: Option<std::time::Duration>) -> ActionState {
        let mut shared = self.shared.lock();
        match timeout {
            None => {
                while !shared.state.is_terminal() {
                    self.completed.wait(&mut shared);
                }
            }
            Some(timeout) => {
                let mut remaining = timeout;
                while !shared.state.is_terminal() {
                    let start = std::time::Instant::now();
                    let result = self.completed.wait_for(&mut shared, remaining);
                    if result.timed_out() {
                        break;
                    }
                    remaining = remaining.saturating_sub(start.elapsed());
                }
            }
        }
        shared.state
    }
}
