//! Observable list source.
//!
//! `ObservableList` is the reference [`Source`] implementation: a shared
//! vector that announces every mutation as a [`ChangeEvent`].
//!
//! Storage is updated under the write lock and listeners run after it is
//! released, so a listener may snapshot or even mutate the list. Mutation
//! and emission together are serialized by a reentrant lock: listeners
//! observe changes in the order they were applied, and a listener mutating
//! the list on its own thread does not deadlock.
//!
//! Listeners therefore run while that lock is held, and so do the
//! subscribers of a zero-window view over the list. Such a callback must not
//! block on another thread that mutates the same list, for example by
//! handing it the mutation and joining it: that thread waits for the lock
//! and neither makes progress. Two lists whose listeners mutate each other
//! from different threads deadlock the same way.

use parking_lot::{ReentrantMutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use syncview_core::{
    ChangeEvent, Error, Result, Source, SourceListener, SubscriberList, Subscription,
};

/// A thread-safe, observable vector. Clones share storage and listeners.
pub struct ObservableList<T> {
    items: Arc<RwLock<Vec<T>>>,
    listeners: Arc<SubscriberList<ChangeEvent<T>>>,
    emit_order: Arc<ReentrantMutex<()>>,
    disposed: Arc<AtomicBool>,
}

impl<T> Clone for ObservableList<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
            listeners: Arc::clone(&self.listeners),
            emit_order: Arc::clone(&self.emit_order),
            disposed: Arc::clone(&self.disposed),
        }
    }
}

impl<T> Default for ObservableList<T> {
    fn default() -> Self {
        Self::from_vec(Vec::new())
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableList")
            .field("items", &*self.items.read())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<T> ObservableList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            items: Arc::new(RwLock::new(items)),
            listeners: Arc::new(SubscriberList::new()),
            emit_order: Arc::new(ReentrantMutex::new(())),
            disposed: Arc::new(AtomicBool::new(false)),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    #[inline]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Applies `mutate` under the write lock, then emits the change it
    /// returns once the lock is released.
    fn mutate<F>(&self, mutate: F)
    where
        F: FnOnce(&mut Vec<T>) -> ChangeEvent<T>,
    {
        let _order = self.emit_order.lock();
        let event = mutate(&mut self.items.write());
        self.emit(&event);
    }

    /// Like [`ObservableList::mutate`] for changes that can be rejected. A
    /// rejected change leaves the list untouched and emits nothing.
    fn try_mutate<R, F>(&self, mutate: F) -> Result<R>
    where
        F: FnOnce(&mut Vec<T>) -> Result<(R, ChangeEvent<T>)>,
    {
        let _order = self.emit_order.lock();
        let (result, event) = mutate(&mut self.items.write())?;
        self.emit(&event);
        Ok(result)
    }

    fn emit(&self, event: &ChangeEvent<T>) {
        if !self.is_disposed() {
            self.listeners.emit(event);
        }
    }
}

impl<T: Clone> ObservableList<T> {
    /// Appends `item` at the end.
    pub fn push(&self, item: T) {
        self.mutate(|items| {
            items.push(item.clone());
            ChangeEvent::add(item, items.len() - 1)
        });
    }

    /// Inserts `item` at `index`, shifting later elements.
    pub fn insert(&self, index: usize, item: T) -> Result<()> {
        self.try_mutate(|items| {
            if index > items.len() {
                return Err(Error::invalid_argument("index"));
            }
            items.insert(index, item.clone());
            Ok(((), ChangeEvent::add(item, index)))
        })
    }

    /// Removes and returns the element at `index`.
    pub fn remove_at(&self, index: usize) -> Result<T> {
        self.try_mutate(|items| {
            if index >= items.len() {
                return Err(Error::invalid_argument("index"));
            }
            let item = items.remove(index);
            Ok((item.clone(), ChangeEvent::remove(item, index)))
        })
    }

    /// Replaces the element at `index`, returning the previous one.
    pub fn set(&self, index: usize, item: T) -> Result<T> {
        self.try_mutate(|items| {
            let slot = items
                .get_mut(index)
                .ok_or_else(|| Error::invalid_argument("index"))?;
            let old = std::mem::replace(slot, item.clone());
            Ok((old.clone(), ChangeEvent::replace(old, item, index)))
        })
    }

    /// Moves the element at `from` so that it ends up at `to`.
    pub fn move_item(&self, from: usize, to: usize) -> Result<()> {
        self.try_mutate(|items| {
            if from >= items.len() || to >= items.len() {
                return Err(Error::invalid_argument("index"));
            }
            let item = items.remove(from);
            items.insert(to, item.clone());
            Ok(((), ChangeEvent::moved(item, from, to)))
        })
    }

    /// Removes every element and emits `Reset`.
    pub fn clear(&self) {
        self.mutate(|items| {
            items.clear();
            ChangeEvent::Reset
        });
    }

    /// Replaces the whole contents and emits `Reset`.
    pub fn reset_with(&self, contents: Vec<T>) {
        self.mutate(|items| {
            *items = contents;
            ChangeEvent::Reset
        });
    }

    /// Returns a copy of the current contents.
    pub fn to_vec(&self) -> Vec<T> {
        self.items.read().clone()
    }
}

impl<T> Source<T> for ObservableList<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn snapshot(&self) -> Result<Vec<T>> {
        Ok(self.to_vec())
    }

    fn subscribe(&self, listener: SourceListener<T>) -> Option<Subscription> {
        if self.is_disposed() {
            return Some(Subscription::empty());
        }
        let id = self.listeners.subscribe(move |event| listener(event));
        Some(Subscription::from_list(&self.listeners, id))
    }

    fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            self.listeners.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn record(list: &ObservableList<i32>) -> (Arc<Mutex<Vec<ChangeEvent<i32>>>>, Subscription) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_clone = Arc::clone(&log);
        let sub = Source::subscribe(
            list,
            Arc::new(move |e: &ChangeEvent<i32>| log_clone.lock().push(e.clone())),
        )
        .unwrap();
        (log, sub)
    }

    #[test]
    fn test_mutations_emit_events() {
        let list = ObservableList::from_vec(vec![1, 2, 3]);
        let (log, _sub) = record(&list);

        list.push(4);
        list.insert(0, 0).unwrap();
        assert_eq!(list.remove_at(1).unwrap(), 1);
        assert_eq!(list.set(0, 9).unwrap(), 0);
        list.move_item(0, 3).unwrap();

        assert_eq!(list.to_vec(), vec![2, 3, 4, 9]);
        assert_eq!(
            *log.lock(),
            vec![
                ChangeEvent::add(4, 3),
                ChangeEvent::add(0, 0),
                ChangeEvent::remove(1, 1),
                ChangeEvent::replace(0, 9, 0),
                ChangeEvent::moved(9, 0, 3),
            ]
        );
    }

    #[test]
    fn test_clear_and_reset_emit_reset() {
        let list = ObservableList::from_vec(vec![1, 2]);
        let (log, _sub) = record(&list);

        list.clear();
        list.reset_with(vec![5]);

        assert_eq!(list.to_vec(), vec![5]);
        assert_eq!(*log.lock(), vec![ChangeEvent::Reset, ChangeEvent::Reset]);
    }

    #[test]
    fn test_out_of_range_is_rejected_silently() {
        let list = ObservableList::from_vec(vec![1]);
        let (log, _sub) = record(&list);

        assert!(list.insert(5, 0).is_err());
        assert!(list.remove_at(1).is_err());
        assert!(list.set(3, 0).is_err());
        assert!(list.move_item(0, 1).is_err());

        assert_eq!(list.to_vec(), vec![1]);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_rejected_change_keeps_later_events_in_order() {
        let list = ObservableList::from_vec(vec![1]);
        let (log, _sub) = record(&list);

        list.push(2);
        assert!(list.remove_at(7).is_err());
        list.clear();
        list.push(3);
        list.reset_with(vec![4, 5]);

        assert_eq!(list.to_vec(), vec![4, 5]);
        assert_eq!(
            *log.lock(),
            vec![
                ChangeEvent::add(2, 1),
                ChangeEvent::Reset,
                ChangeEvent::add(3, 0),
                ChangeEvent::Reset,
            ]
        );
    }

    #[test]
    fn test_listener_can_read_list() {
        let list = ObservableList::from_vec(vec![1]);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let reader = list.clone();
        let _sub = Source::subscribe(
            &list,
            Arc::new(move |_: &ChangeEvent<i32>| seen_clone.lock().push(reader.len())),
        );

        list.push(2);
        assert_eq!(*seen.lock(), vec![2]);
    }

    #[test]
    fn test_listener_can_mutate_list_reentrantly() {
        let list = ObservableList::from_vec(Vec::<i32>::new());
        let writer = list.clone();
        let _sub = Source::subscribe(
            &list,
            Arc::new(move |e: &ChangeEvent<i32>| {
                if let ChangeEvent::Add { item, .. } = e {
                    if *item < 3 {
                        writer.push(item + 1);
                    }
                }
            }),
        );

        list.push(0);
        assert_eq!(list.to_vec(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_dispose_silences_list() {
        let list = ObservableList::from_vec(vec![1]);
        let (log, _sub) = record(&list);

        Source::dispose(&list);
        list.push(2);

        assert!(list.is_disposed());
        assert_eq!(list.listener_count(), 0);
        assert_eq!(list.to_vec(), vec![1, 2]);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_dropping_subscription_detaches() {
        let list = ObservableList::from_vec(vec![1]);
        let (log, sub) = record(&list);
        drop(sub);
        list.push(2);
        assert!(log.lock().is_empty());
    }
}
