//! Boundary properties of the action queue itself (spec §8 "Boundary"),
//! exercised directly against the public `ActionQueue`/`Action` API without
//! a running dispatcher.

use objgraph::{Action, ActionQueue, ActionState, MIN_CAPACITY};

fn started() -> std::sync::Arc<Action> {
    let action = Action::new(vec![]);
    action.start();
    action
}

#[test]
fn full_queue_completes_overflow_but_enqueue_itself_succeeds() {
    let queue = ActionQueue::new("Boundary", MIN_CAPACITY);
    for _ in 0..MIN_CAPACITY {
        queue.enqueue(started());
    }
    let overflow = started();
    queue.enqueue(overflow.clone());

    assert!(overflow.is_complete());
    assert_eq!(overflow.state(), ActionState::ImmediatelyCompleted);
    assert!(!overflow.result_code().is_success());
    assert_eq!(queue.len(), MIN_CAPACITY);
}

#[test]
fn cancel_at_head_is_observed_by_the_next_sweep() {
    let queue = ActionQueue::new("Boundary", MIN_CAPACITY);
    let head = started();
    let tail = started();
    queue.enqueue(head.clone());
    queue.enqueue(tail.clone());

    head.request_cancel();
    queue.note_cancel_request();
    queue.service_cancel_requests();

    assert!(head.is_complete());
    assert_eq!(head.state(), ActionState::Canceled);
    assert!(!tail.is_complete());

    let fetched = queue.get_next_action();
    assert!(std::sync::Arc::ptr_eq(&fetched, &tail));
}

#[test]
fn capacity_below_the_floor_is_raised_to_ten() {
    let queue = ActionQueue::new("Boundary", 1);
    for _ in 0..MIN_CAPACITY {
        queue.enqueue(started());
    }
    // The 11th action still overflows a floored-at-ten queue.
    let overflow = started();
    queue.enqueue(overflow.clone());
    assert!(overflow.is_complete());
}

#[test]
fn disabling_completes_every_queued_action() {
    let queue = ActionQueue::new("Boundary", MIN_CAPACITY);
    let a = started();
    let b = started();
    queue.enqueue(a.clone());
    queue.enqueue(b.clone());

    queue.disable();

    assert!(a.is_complete());
    assert!(b.is_complete());

    let after = started();
    queue.enqueue(after.clone());
    assert!(after.is_complete());
}
