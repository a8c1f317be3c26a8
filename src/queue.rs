//! Bounded action queue with a size floor of ten (spec §4.1).
//!
//! Grounded on the teacher's `Mutex` + `Condvar` rendezvous
//! (`examples/salsa-rs-salsa/src/handle.rs`): enqueue signals one waiter
//! parked in `get_next_action`, rather than spinning or polling.

use crate::action::Action;
use crate::error::ResultCode;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub const MIN_CAPACITY: usize = 10;

struct Inner {
    slots: VecDeque<Option<Arc<Action>>>,
    disabled: bool,
}

/// A bounded FIFO of [`Action`]s. `enqueue` never blocks: a full queue or a
/// disabled queue completes the submitted action in place with a result
/// code, and `enqueue` itself still reports success (spec §4.1).
pub struct ActionQueue {
    name: String,
    capacity: usize,
    inner: Mutex<Inner>,
    not_empty: Condvar,
    /// Bumped whenever a queued action's cancel flag flips; compared against
    /// `last_swept` to decide whether `service_cancel_requests` has work.
    cancel_counter: AtomicU64,
    last_swept: AtomicU64,
}

impl ActionQueue {
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            capacity: capacity.max(MIN_CAPACITY),
            inner: Mutex::new(Inner {
                slots: VecDeque::new(),
                disabled: false,
            }),
            not_empty: Condvar::new(),
            cancel_counter: AtomicU64::new(0),
            last_swept: AtomicU64::new(0),
        }
    }

    /// Enqueue `action`, which must already be `Started`. Always returns
    /// `Ok(())`; failure is reflected by completing `action` with an error
    /// result code instead (spec §4.1).
    pub fn enqueue(&self, action: Arc<Action>) {
        use crate::action::ActionState;

        if action.state() != ActionState::Started {
            action.complete(ResultCode::enqueue_failed(&self.name, "ActionNotStarted"));
            return;
        }

        let mut inner = self.inner.lock();
        if inner.disabled {
            action.complete(ResultCode::queue_disabled(&self.name));
            return;
        }
        if inner.slots.len() >= self.capacity {
            action.complete(ResultCode::queue_full(&self.name));
            return;
        }
        action.mark_queued();
        inner.slots.push_back(Some(action));
        drop(inner);
        self.not_empty.notify_one();
    }

    /// Pull the next non-null slot, blocking until one is available. Tolerates
    /// `None` slots left behind by [`ActionQueue::service_cancel_requests`].
    pub fn get_next_action(&self) -> Arc<Action> {
        let mut inner = self.inner.lock();
        loop {
            while let Some(slot) = inner.slots.pop_front() {
                if let Some(action) = slot {
                    return action;
                }
            }
            self.not_empty.wait(&mut inner);
        }
    }

    /// Non-blocking variant used by a dispatcher loop that also needs to
    /// service persistence and cancellation on every tick.
    pub fn try_get_next_action(&self) -> Option<Arc<Action>> {
        let mut inner = self.inner.lock();
        while let Some(slot) = inner.slots.pop_front() {
            if let Some(action) = slot {
                return Some(action);
            }
        }
        None
    }

    pub fn note_cancel_request(&self) {
        self.cancel_counter.fetch_add(1, Ordering::SeqCst);
        self.not_empty.notify_one();
    }

    /// Sweep queued slots, completing any canceled action with
    /// [`ResultCode::canceled_while_queued`] and leaving a `None` in its
    /// place. Skipped when the cancel counter hasn't moved since the last
    /// sweep (spec §4.1).
    pub fn service_cancel_requests(&self) {
        let current = self.cancel_counter.load(Ordering::SeqCst);
        if current == self.last_swept.load(Ordering::SeqCst) {
            return;
        }
        let inner = self.inner.lock();
        for slot in inner.slots.iter() {
            if let Some(action) = slot {
                if action.cancel_requested() {
                    action.cancel();
                }
            }
        }
        drop(inner);
        self.last_swept.store(current, Ordering::SeqCst);
    }

    /// Disable the queue: every currently-queued action completes with
    /// [`ResultCode::queue_disabled`]; subsequent enqueues do too.
    pub fn disable(&self) {
        let mut inner = self.inner.lock();
        inner.disabled = true;
        for slot in inner.slots.drain(..) {
            if let Some(action) = slot {
                action.complete(ResultCode::queue_disabled(&self.name));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
