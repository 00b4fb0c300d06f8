//! Subscription management.
//!
//! `SubscriberList` stores callbacks for one event type and delivers events to
//! them in registration order. `Subscription` is an RAII guard that detaches a
//! listener from whatever it was attached to when cancelled or dropped.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Unique identifier for a subscription.
pub type SubscriptionId = u64;

/// Callback type for event delivery.
pub type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// A thread-safe list of subscribers for events of type `E`.
///
/// Emission takes a snapshot of the callbacks under the lock and releases it
/// before calling any of them, so callbacks may subscribe or unsubscribe. A
/// callback removed during an emission still receives that emission; one added
/// during an emission does not.
pub struct SubscriberList<E> {
    /// Active subscriptions in registration order
    subscribers: Mutex<Vec<(SubscriptionId, Callback<E>)>>,
    /// Next subscription ID to assign
    next_id: AtomicU64,
}

impl<E> Default for SubscriberList<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for SubscriberList<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberList")
            .field("len", &self.len())
            .finish()
    }
}

impl<E> SubscriberList<E> {
    /// Creates an empty subscriber list.
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Subscribes to events with the given callback.
    ///
    /// Returns the subscription ID that can be used to unsubscribe.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.subscribe_arc(Arc::new(callback))
    }

    /// Subscribes an already shared callback.
    pub fn subscribe_arc(&self, callback: Callback<E>) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.lock().push((id, callback));
        id
    }

    /// Unsubscribes by ID.
    ///
    /// Returns true if the subscription was found and removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(sub_id, _)| *sub_id != id);
        subscribers.len() < before
    }

    /// Delivers `event` to every subscriber.
    pub fn emit(&self, event: &E) {
        let snapshot: Vec<Callback<E>> = {
            let subscribers = self.subscribers.lock();
            subscribers.iter().map(|(_, cb)| Arc::clone(cb)).collect()
        };
        for callback in snapshot {
            callback(event);
        }
    }

    /// Delivers each event in order, taking one snapshot for the whole batch.
    pub fn emit_all(&self, events: &[E]) {
        if events.is_empty() {
            return;
        }
        let snapshot: Vec<Callback<E>> = {
            let subscribers = self.subscribers.lock();
            subscribers.iter().map(|(_, cb)| Arc::clone(cb)).collect()
        };
        for event in events {
            for callback in &snapshot {
                callback(event);
            }
        }
    }

    /// Returns the number of subscriptions.
    #[inline]
    pub fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Returns true if there are no subscriptions.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.subscribers.lock().is_empty()
    }

    /// Returns all subscription IDs in registration order.
    pub fn subscription_ids(&self) -> Vec<SubscriptionId> {
        self.subscribers.lock().iter().map(|(id, _)| *id).collect()
    }

    /// Clears all subscriptions.
    pub fn clear(&self) {
        self.subscribers.lock().clear();
    }
}

/// RAII handle for an attached listener.
///
/// The detach action runs exactly once: on [`Subscription::cancel`] or when the
/// handle is dropped, whichever comes first.
#[must_use = "dropping a Subscription detaches the listener immediately"]
pub struct Subscription {
    detach: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Creates a subscription that runs `detach` when cancelled.
    pub fn new<F>(detach: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            detach: Some(Box::new(detach)),
        }
    }

    /// Creates a subscription with nothing to detach.
    pub fn empty() -> Self {
        Self { detach: None }
    }

    /// Creates a subscription that removes `id` from `list` when cancelled.
    ///
    /// Holds the list weakly so a dropped list does not outlive its owner.
    pub fn from_list<E: 'static>(list: &Arc<SubscriberList<E>>, id: SubscriptionId) -> Self
    where
        E: Send,
    {
        let weak = Arc::downgrade(list);
        Self::new(move || {
            if let Some(list) = weak.upgrade() {
                list.unsubscribe(id);
            }
        })
    }

    /// Returns true until the detach action has run.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.detach.is_some()
    }

    /// Detaches the listener now.
    pub fn cancel(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
