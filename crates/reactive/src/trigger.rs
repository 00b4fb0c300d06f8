//! Programmatic refresh trigger.

use std::sync::Arc;
use syncview_core::{SubscriberList, Subscription, Trigger, TriggerCallback};

/// A [`Trigger`] that emits when [`ManualTrigger::fire`] is called.
///
/// Clones share the same listeners.
#[derive(Clone, Debug, Default)]
pub struct ManualTrigger {
    listeners: Arc<SubscriberList<()>>,
}

impl ManualTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifies every attached listener once.
    pub fn fire(&self) {
        self.listeners.emit(&());
    }

    #[inline]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Trigger for ManualTrigger {
    fn subscribe(&self, callback: TriggerCallback) -> Subscription {
        let id = self.listeners.subscribe(move |_| callback());
        Subscription::from_list(&self.listeners, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_fire_reaches_listeners() {
        let trigger = ManualTrigger::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);

        let sub = trigger.subscribe(Arc::new(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        }));
        trigger.fire();
        trigger.clone().fire();
        assert_eq!(count.load(Ordering::SeqCst), 2);

        drop(sub);
        trigger.fire();
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(trigger.listener_count(), 0);
    }
}
