//! Change notification for the full note list.
//!
//! # Responsibility
//! - Hold the latest published note list snapshot.
//! - Push every new snapshot to registered callbacks and watch streams.
//!
//! # Invariants
//! - A callback registered after the first publication receives the current
//!   snapshot before `subscribe` returns.
//! - Snapshot replacement and callback delivery happen under one registry
//!   lock, so a subscriber never misses or double-receives a publication.
//! - Once `Subscription::unsubscribe` (or drop) returns, the callback is not
//!   running and will not run again.
//! - A callback may drop or unsubscribe any `Subscription` during a
//!   delivery; the removal is applied once the delivery pass ends and the
//!   removed callback is skipped for the rest of that pass.
//! - Callbacks must not subscribe or flush from inside a delivery.

use crate::model::note::Note;
use log::{debug, error};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};
use tokio::sync::watch;

/// Shared immutable snapshot of every note, ordered by id.
pub type NoteList = Arc<Vec<Note>>;

type Observer = Box<dyn FnMut(&[Note]) + Send + 'static>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    observers: BTreeMap<u64, Observer>,
}

/// Fan-out point between the writer and its observers.
pub struct NotesFeed {
    registry: Mutex<Registry>,
    /// Thread currently running callbacks under the registry lock.
    delivering: Mutex<Option<ThreadId>>,
    /// Removals requested by callbacks while a delivery pass is running.
    deferred: Mutex<Vec<u64>>,
    latest: watch::Sender<Option<NoteList>>,
}

impl NotesFeed {
    pub(crate) fn new() -> Arc<Self> {
        let (latest, _) = watch::channel(None);
        Arc::new(Self {
            registry: Mutex::new(Registry::default()),
            delivering: Mutex::new(None),
            deferred: Mutex::new(Vec::new()),
            latest,
        })
    }

    /// Latest published snapshot, `None` until the store has loaded.
    pub fn current(&self) -> Option<NoteList> {
        self.latest.borrow().clone()
    }

    /// Opens a new watch stream over published snapshots.
    pub fn watch(&self) -> NotesWatch {
        NotesWatch {
            rx: self.latest.subscribe(),
            primed: false,
        }
    }

    /// Registers a callback for every published snapshot.
    ///
    /// A callback that panics on its immediate delivery is never registered
    /// and the returned `Subscription` is inactive.
    pub fn subscribe<F>(self: &Arc<Self>, callback: F) -> Subscription
    where
        F: FnMut(&[Note]) + Send + 'static,
    {
        let mut observer: Observer = Box::new(callback);
        let mut registry = self.registry.lock();
        let id = registry.next_id;
        registry.next_id += 1;

        if let Some(notes) = self.current() {
            let delivered = self.deliver_locked(&mut registry, |_| {
                catch_unwind(AssertUnwindSafe(|| observer(notes.as_slice()))).is_ok()
            });
            if !delivered {
                error!(
                    "event=observer_deliver module=store status=error observer_id={} error_code=observer_panicked",
                    id
                );
                return Subscription {
                    feed: Arc::downgrade(self),
                    id,
                    active: false,
                };
            }
        }

        registry.observers.insert(id, observer);
        debug!(
            "event=observer_subscribe module=store status=ok observer_id={} observers={}",
            id,
            registry.observers.len()
        );

        Subscription {
            feed: Arc::downgrade(self),
            id,
            active: true,
        }
    }

    /// Number of registered callbacks.
    pub fn observer_count(&self) -> usize {
        self.registry.lock().observers.len()
    }

    /// Replaces the snapshot and delivers it to every callback.
    ///
    /// A callback that panics is removed; the remaining callbacks and watch
    /// streams still receive the snapshot.
    pub(crate) fn publish(&self, notes: Vec<Note>) {
        let snapshot: NoteList = Arc::new(notes);
        let mut registry = self.registry.lock();
        self.latest.send_replace(Some(Arc::clone(&snapshot)));

        let panicked = self.deliver_locked(&mut registry, |registry| {
            let mut panicked = Vec::new();
            for (id, observer) in registry.observers.iter_mut() {
                if self.deferred.lock().contains(id) {
                    continue;
                }
                let delivered = catch_unwind(AssertUnwindSafe(|| observer(snapshot.as_slice())));
                if delivered.is_err() {
                    panicked.push(*id);
                }
            }
            panicked
        });
        for id in panicked {
            registry.observers.remove(&id);
            error!(
                "event=observer_deliver module=store status=error observer_id={} error_code=observer_panicked",
                id
            );
        }
    }

    /// Runs `deliver` with the calling thread marked as delivering, then
    /// applies removals that callbacks requested meanwhile.
    fn deliver_locked<R>(
        &self,
        registry: &mut Registry,
        deliver: impl FnOnce(&mut Registry) -> R,
    ) -> R {
        *self.delivering.lock() = Some(thread::current().id());
        let result = deliver(registry);
        *self.delivering.lock() = None;

        let deferred: Vec<u64> = self.deferred.lock().drain(..).collect();
        for id in deferred {
            let removed = registry.observers.remove(&id).is_some();
            debug!(
                "event=observer_unsubscribe module=store status=ok observer_id={} removed={} deferred=true",
                id, removed
            );
        }
        result
    }

    fn unsubscribe(&self, id: u64) {
        // The registry lock is already held by this thread inside a callback.
        if *self.delivering.lock() == Some(thread::current().id()) {
            self.deferred.lock().push(id);
            return;
        }
        let removed = self.registry.lock().observers.remove(&id).is_some();
        debug!(
            "event=observer_unsubscribe module=store status=ok observer_id={} removed={}",
            id, removed
        );
    }
}

/// Handle for one registered callback. Dropping it deregisters the callback.
#[must_use = "dropping a Subscription immediately stops deliveries"]
pub struct Subscription {
    feed: Weak<NotesFeed>,
    id: u64,
    active: bool,
}

impl Subscription {
    /// Whether the callback is still registered with a live feed.
    pub fn is_active(&self) -> bool {
        self.active && self.feed.strong_count() > 0
    }

    /// Stops deliveries to this callback.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Some(feed) = self.feed.upgrade() {
            feed.unsubscribe(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}

/// Async stream of note list snapshots.
///
/// Intermediate snapshots may be skipped when the consumer is slower than
/// the writer; the latest one is always delivered.
pub struct NotesWatch {
    rx: watch::Receiver<Option<NoteList>>,
    primed: bool,
}

impl NotesWatch {
    /// Latest published snapshot without waiting.
    pub fn current(&self) -> Option<NoteList> {
        self.rx.borrow().clone()
    }

    /// Waits for the next snapshot.
    ///
    /// The first call yields the current snapshot if one was already
    /// published. Returns `None` once the store has shut down.
    pub async fn next(&mut self) -> Option<NoteList> {
        if !self.primed {
            self.primed = true;
            let latest = self.rx.borrow_and_update().clone();
            if latest.is_some() {
                return latest;
            }
        }

        loop {
            if self.rx.changed().await.is_err() {
                return None;
            }
            let latest = self.rx.borrow_and_update().clone();
            if latest.is_some() {
                return latest;
            }
        }
    }
}
