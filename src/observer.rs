//! Observer primitives (spec §4.5): a sequenced, lock-free-to-read
//! notification slot, and an observer that extracts and caches a derived
//! `Info` from the slot's contents.
//!
//! Grounded on the teacher's atomic-publish style (revision bump +
//! swapped-in value, `src/revision.rs`) and its `Mutex`+`Condvar`
//! rendezvous pattern for waiters (`src/handle.rs`): publication here swaps
//! an `Arc<T>` under a short-held lock and bumps an independent atomic
//! sequence counter, so readers never block a writer and never observe a
//! torn value. `ObserverWithExtractor`'s last-seen marker uses
//! `crossbeam_utils::atomic::AtomicCell`, the same scalar-cell idiom the
//! teacher uses for its own hot fields (`src/derived/memo.rs`,
//! `src/derived/lru.rs`).

use crossbeam_utils::atomic::AtomicCell;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A sequenced slot holding the most recently published value of `T`.
///
/// Subscribers compare a locally-held sequence number against
/// [`Publisher::sequence`] to decide whether to re-read
/// [`Publisher::current`].
pub struct Publisher<T> {
    value: Mutex<Option<Arc<T>>>,
    sequence: AtomicU64,
}

impl<T> Default for Publisher<T> {
    fn default() -> Self {
        Self {
            value: Mutex::new(None),
            sequence: AtomicU64::new(0),
        }
    }
}

impl<T> Publisher<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a new value under sequence number `seq`. `seq` must be
    /// strictly greater than any previously published sequence for this
    /// slot; the engine's [`crate::seq::SeqAllocator`] guarantees this.
    pub fn publish(&self, value: Arc<T>, seq: u64) {
        *self.value.lock() = Some(value);
        self.sequence.store(seq, Ordering::Release);
    }

    /// Current value, or `None` if nothing has ever been published.
    pub fn current(&self) -> Option<Arc<T>> {
        self.value.lock().clone()
    }

    pub fn sequence(&self) -> u64 {
        self.sequence.load(Ordering::Acquire)
    }
}

impl<T> std::fmt::Debug for Publisher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("sequence", &self.sequence())
            .finish()
    }
}

/// Wraps a [`Publisher<T>`] with a user-supplied extractor `T -> I`, caching
/// the derived `Info` and invoking side-effect callbacks whenever the slot
/// changes (spec §4.5).
pub struct ObserverWithExtractor<T, I> {
    publisher: Arc<Publisher<T>>,
    extract: Box<dyn Fn(&T) -> I + Send + Sync>,
    last_seen_seq: AtomicCell<u64>,
    cached: Mutex<Option<I>>,
    callbacks: Mutex<Vec<Box<dyn Fn(&I) + Send + Sync>>>,
}

impl<T, I: Clone> ObserverWithExtractor<T, I> {
    pub fn new(publisher: Arc<Publisher<T>>, extract: impl Fn(&T) -> I + Send + Sync + 'static) -> Self {
        Self {
            publisher,
            extract: Box::new(extract),
            last_seen_seq: AtomicCell::new(0),
            cached: Mutex::new(None),
            callbacks: Mutex::new(Vec::new()),
        }
    }

    pub fn add_callback(&self, callback: impl Fn(&I) + Send + Sync + 'static) {
        self.callbacks.lock().push(Box::new(callback));
    }

    /// Re-read the publisher if it has advanced, update the cache, and
    /// invoke every registered callback. Call once per `Update` tick.
    pub fn update(&self) {
        let current_seq = self.publisher.sequence();
        if current_seq == self.last_seen_seq.load() {
            return;
        }
        self.last_seen_seq.store(current_seq);

        let Some(value) = self.publisher.current() else {
            return;
        };
        let info = (self.extract)(&value);
        *self.cached.lock() = Some(info.clone());
        for callback in self.callbacks.lock().iter() {
            callback(&info);
        }
    }

    pub fn cached(&self) -> Option<I> {
        self.cached.lock().clone()
    }
}
