//! Contracts for the collaborators a view consumes.
//!
//! - [`Source`]: the ordered sequence a view mirrors, optionally observable.
//! - [`Trigger`]: an extra push stream whose emissions force a refresh.
//! - [`Scheduler`]: defers buffer flushes by a configured duration.

use crate::change::ChangeEvent;
use crate::error::Result;
use crate::subscription::Subscription;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

/// Listener that receives source mutations.
pub type SourceListener<T> = Arc<dyn Fn(&ChangeEvent<T>) + Send + Sync>;

/// An ordered sequence that a view can mirror.
///
/// Implementations must be safe to snapshot from any thread while other
/// threads mutate them.
pub trait Source<T>: Send + Sync {
    /// Returns a consistent copy of the current contents.
    fn snapshot(&self) -> Result<Vec<T>>;

    /// Attaches `listener` to the change stream.
    ///
    /// Returns `None` if this source cannot push changes; views over such a
    /// source only pick up mutations on an explicit refresh.
    fn subscribe(&self, listener: SourceListener<T>) -> Option<Subscription> {
        let _ = listener;
        None
    }

    /// Releases the source. Called by a view that owns its source when the
    /// view is disposed.
    fn dispose(&self) {}
}

/// A plain locked vector: snapshot-only, mutations are not observed.
impl<T: Clone + Send + Sync> Source<T> for RwLock<Vec<T>> {
    fn snapshot(&self) -> Result<Vec<T>> {
        Ok(self.read().clone())
    }
}

/// Callback invoked on every trigger emission.
pub type TriggerCallback = Arc<dyn Fn() + Send + Sync>;

/// An additional push stream whose emissions are treated as `Reset` events.
pub trait Trigger: Send + Sync {
    /// Attaches `callback`; it runs once per emission until the returned
    /// subscription is dropped.
    fn subscribe(&self, callback: TriggerCallback) -> Subscription;
}

/// Deferred action handed to a [`Scheduler`].
pub type Action = Box<dyn FnOnce() + Send + 'static>;

/// Runs actions after a delay.
pub trait Scheduler: Send + Sync {
    /// Runs `action` once `delay` has elapsed.
    ///
    /// A zero `delay` must run `action` synchronously, before returning.
    fn schedule(&self, delay: Duration, action: Action);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locked_vec_source_snapshot() {
        let source = RwLock::new(vec![1, 2, 3]);
        assert_eq!(source.snapshot().unwrap(), vec![1, 2, 3]);

        source.write().push(4);
        assert_eq!(source.snapshot().unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_locked_vec_source_is_not_observable() {
        let source = RwLock::new(vec![1]);
        let listener: SourceListener<i32> = Arc::new(|_| {});
        assert!(source.subscribe(listener).is_none());
    }
}
