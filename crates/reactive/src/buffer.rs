//! Time-windowed change accumulator.
//!
//! Every view owns one `ChangeBuffer`. Source listeners push into it from any
//! thread; the view drains it when the buffer window closes.

use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::time::Duration;
use syncview_core::ChangeEvent;

/// Queue of pending source changes plus the window they are held for.
pub struct ChangeBuffer<T> {
    events: Mutex<Vec<ChangeEvent<T>>>,
    duration: Mutex<Duration>,
}

impl<T> Default for ChangeBuffer<T> {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

impl<T> fmt::Debug for ChangeBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeBuffer")
            .field("len", &self.len())
            .field("duration", &self.duration())
            .finish()
    }
}

impl<T> ChangeBuffer<T> {
    /// Creates an empty buffer holding changes for `duration`.
    pub fn new(duration: Duration) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            duration: Mutex::new(duration),
        }
    }

    /// Appends a change. Blocks while a drain is in progress.
    pub fn push(&self, event: ChangeEvent<T>) -> &Self {
        self.events.lock().push(event);
        self
    }

    /// Appends a change if `admit` holds. `admit` runs under the buffer lock,
    /// so it cannot interleave with a drain.
    pub fn push_if<F>(&self, event: ChangeEvent<T>, admit: F) -> bool
    where
        F: FnOnce() -> bool,
    {
        let mut events = self.events.lock();
        if !admit() {
            return false;
        }
        events.push(event);
        true
    }

    /// Opens a drain transaction over the queued changes.
    ///
    /// The buffer stays locked until the transaction is dropped, which
    /// clears whatever it still holds.
    pub fn drain(&self) -> DrainTransaction<'_, T> {
        DrainTransaction {
            guard: self.events.lock(),
        }
    }

    #[inline]
    pub fn duration(&self) -> Duration {
        *self.duration.lock()
    }

    /// Changes the window. Already buffered changes are kept.
    pub fn set_duration(&self, duration: Duration) {
        *self.duration.lock() = duration;
    }

    #[inline]
    pub fn is_zero_duration(&self) -> bool {
        self.duration().is_zero()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

/// Exclusive access to the queued changes of a [`ChangeBuffer`].
pub struct DrainTransaction<'a, T> {
    guard: MutexGuard<'a, Vec<ChangeEvent<T>>>,
}

impl<T> DrainTransaction<'_, T> {
    /// Moves the queued changes out, leaving the buffer empty.
    pub fn take(mut self) -> Vec<ChangeEvent<T>> {
        std::mem::take(&mut *self.guard)
    }
}

impl<T> Deref for DrainTransaction<'_, T> {
    type Target = Vec<ChangeEvent<T>>;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<T> DerefMut for DrainTransaction<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}

impl<T> Drop for DrainTransaction<'_, T> {
    fn drop(&mut self) {
        self.guard.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_push_and_take() {
        let buffer = ChangeBuffer::new(Duration::ZERO);
        buffer.push(ChangeEvent::add(1, 0)).push(ChangeEvent::add(2, 1));
        assert_eq!(buffer.len(), 2);

        let events = buffer.drain().take();
        assert_eq!(events, vec![ChangeEvent::add(1, 0), ChangeEvent::add(2, 1)]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_drop_clears_queue() {
        let buffer = ChangeBuffer::new(Duration::ZERO);
        buffer.push(ChangeEvent::add(1, 0));
        {
            let tx = buffer.drain();
            assert_eq!(tx.len(), 1);
        }
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_transaction_is_mutable() {
        let buffer = ChangeBuffer::new(Duration::ZERO);
        buffer.push(ChangeEvent::add(1, 0));
        let mut tx = buffer.drain();
        tx.push(ChangeEvent::<i32>::Reset);
        assert_eq!(tx.take().len(), 2);
    }

    #[test]
    fn test_push_if() {
        let buffer = ChangeBuffer::new(Duration::ZERO);
        assert!(buffer.push_if(ChangeEvent::add(1, 0), || true));
        assert!(!buffer.push_if(ChangeEvent::add(2, 1), || false));
        assert_eq!(buffer.drain().take(), vec![ChangeEvent::add(1, 0)]);
    }

    #[test]
    fn test_set_duration_keeps_events() {
        let buffer = ChangeBuffer::new(Duration::from_millis(100));
        buffer.push(ChangeEvent::add(1, 0));
        assert!(!buffer.is_zero_duration());

        buffer.set_duration(Duration::ZERO);
        assert!(buffer.is_zero_duration());
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_concurrent_push_during_drain() {
        let buffer = Arc::new(ChangeBuffer::new(Duration::ZERO));
        let mut drained = Vec::new();

        let producers: Vec<_> = (0..4)
            .map(|t| {
                let buffer = Arc::clone(&buffer);
                thread::spawn(move || {
                    for i in 0..250 {
                        buffer.push(ChangeEvent::add(t * 1000 + i, 0));
                    }
                })
            })
            .collect();

        while producers.iter().any(|p| !p.is_finished()) {
            drained.extend(buffer.drain().take());
        }
        for p in producers {
            p.join().unwrap();
        }
        drained.extend(buffer.drain().take());

        // Nothing lost, nothing delivered twice
        let mut items: Vec<i32> = drained
            .iter()
            .flat_map(|e| e.items().cloned().collect::<Vec<_>>())
            .collect();
        items.sort_unstable();
        items.dedup();
        assert_eq!(drained.len(), 1000);
        assert_eq!(items.len(), 1000);
    }
}
