//! Live views over a source collection.
//!
//! A [`View`] mirrors a [`Source`] through a transform strategy and
//! re-announces source mutations to its own subscribers as
//! [`Notification`]s.
//!
//! # Lifecycle
//!
//! A view is populated when it is built, then follows its source until
//! [`View::dispose`]. Disposal is terminal: every later operation except
//! `dispose` and `is_disposed` fails with [`Error::Disposed`].
//!
//! # Locking
//!
//! Each view has three locks, always taken in this order:
//!
//! 1. `delivery`, a reentrant lock held from the start of a refresh until
//!    its notifications have been delivered;
//! 2. `gate`, around the synchronizer and source state;
//! 3. the buffer lock, inside [`ChangeBuffer`].
//!
//! Notifications are delivered after the gate is released. A subscriber can
//! therefore read the view, or mutate the source on its own thread, while
//! deliveries from different flushes never interleave. Transform callbacks
//! run under the gate and must not call back into the view.

use crate::buffer::ChangeBuffer;
use parking_lot::{Mutex, ReentrantMutex};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use syncview_core::{
    notifications_for, ChangeEvent, Error, Notification, Result, Scheduler, Source,
    SourceListener, SubscriberList, Subscription, SubscriptionId, Trigger,
};
use syncview_incremental::{Filter, Identity, Map, Synchronizer, Transform};
use tracing::{debug, trace, warn};

/// A view that mirrors its source unchanged.
pub type BufferedView<T> = View<T, Identity>;

/// A view that shows the source elements matching a predicate.
pub type FilteredView<T> = View<T, Filter<T>>;

/// A view that shows one mapped element per source element.
pub type MappedView<S, V> = View<S, Map<S, V>>;

/// A derived, read-only collection kept in step with a source.
///
/// Cloning a `View` yields another handle to the same view.
pub struct View<S, X: Transform<S>> {
    inner: Arc<ViewInner<S, X>>,
}

impl<S, X: Transform<S>> Clone for View<S, X> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ViewInner<S, X: Transform<S>> {
    delivery: ReentrantMutex<()>,
    gate: Mutex<ViewState<S, X>>,
    buffer: ChangeBuffer<S>,
    subscribers: SubscriberList<Notification<X::Output>>,
    scheduler: Arc<dyn Scheduler>,
    /// Bumped on every source swap; listeners of older sources are ignored.
    generation: AtomicU64,
    flush_pending: AtomicBool,
    disposed: AtomicBool,
    leave_open: bool,
}

struct ViewState<S, X: Transform<S>> {
    sync: Synchronizer<S, X>,
    source: Arc<dyn Source<S>>,
    source_sub: Option<Subscription>,
    triggers: Vec<Subscription>,
    /// Set when a refresh failed: its events are gone, so the tracker may
    /// no longer match the source until a recompute succeeds.
    stale: bool,
}

impl<S, X> ViewState<S, X>
where
    S: Clone + PartialEq + Send + Sync + 'static,
    X: Transform<S>,
{
    fn reconcile(&mut self, events: Vec<ChangeEvent<S>>) -> Result<Vec<ChangeEvent<X::Output>>> {
        let events = if self.stale {
            trace!(dropped = events.len(), "previous refresh failed, recompute");
            Vec::new()
        } else {
            events
        };
        let source = &self.source;
        let result = self.sync.refresh(events, || source.snapshot());
        self.stale = result.is_err();
        result
    }
}

impl<S, X> View<S, X>
where
    S: Clone + PartialEq + Send + Sync + 'static,
    X: Transform<S>,
{
    /// Populates from `source`, then attaches to the source and triggers.
    pub(crate) fn new(
        source: Arc<dyn Source<S>>,
        transform: X,
        scheduler: Arc<dyn Scheduler>,
        triggers: Vec<Arc<dyn Trigger>>,
        buffer_duration: Duration,
        leave_open: bool,
    ) -> Result<Self> {
        let mut sync = Synchronizer::new(transform);
        sync.populate(source.snapshot()?)?;
        let populated = sync.len();

        let inner = Arc::new(ViewInner {
            delivery: ReentrantMutex::new(()),
            gate: Mutex::new(ViewState {
                sync,
                source: Arc::clone(&source),
                source_sub: None,
                triggers: Vec::with_capacity(triggers.len()),
                stale: false,
            }),
            buffer: ChangeBuffer::new(buffer_duration),
            subscribers: SubscriberList::new(),
            scheduler,
            generation: AtomicU64::new(0),
            flush_pending: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
            leave_open,
        });

        let source_sub = source.subscribe(inner.source_listener(0));
        let trigger_subs: Vec<Subscription> = triggers
            .iter()
            .map(|trigger| trigger.subscribe(inner.trigger_callback()))
            .collect();
        {
            let mut state = inner.gate.lock();
            state.source_sub = source_sub;
            state.triggers = trigger_subs;
        }

        debug!(
            len = populated,
            triggers = triggers.len(),
            buffer_ms = buffer_duration.as_millis() as u64,
            "view built"
        );
        Ok(Self { inner })
    }

    /// Returns true once the view has been disposed.
    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_disposed() {
            Err(Error::Disposed)
        } else {
            Ok(())
        }
    }

    /// Returns a copy of the view elements in order.
    pub fn snapshot(&self) -> Result<Vec<X::Output>> {
        self.ensure_live()?;
        Ok(self.inner.gate.lock().sync.values())
    }

    pub fn len(&self) -> Result<usize> {
        self.ensure_live()?;
        Ok(self.inner.gate.lock().sync.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.ensure_live()?;
        Ok(self.inner.gate.lock().sync.is_empty())
    }

    /// Returns the element at `index`, if any.
    pub fn get(&self, index: usize) -> Result<Option<X::Output>> {
        self.ensure_live()?;
        Ok(self.inner.gate.lock().sync.get(index).cloned())
    }

    /// Registers `callback` for every notification this view emits.
    pub fn subscribe<F>(&self, callback: F) -> Result<SubscriptionId>
    where
        F: Fn(&Notification<X::Output>) + Send + Sync + 'static,
    {
        self.ensure_live()?;
        Ok(self.inner.subscribers.subscribe(callback))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<bool> {
        self.ensure_live()?;
        Ok(self.inner.subscribers.unsubscribe(id))
    }

    pub fn subscriber_count(&self) -> Result<usize> {
        self.ensure_live()?;
        Ok(self.inner.subscribers.len())
    }

    pub fn buffer_duration(&self) -> Result<Duration> {
        self.ensure_live()?;
        Ok(self.inner.buffer.duration())
    }

    /// Changes the buffer window. Takes effect from the next scheduled
    /// flush; changes already buffered are kept.
    pub fn set_buffer_duration(&self, duration: Duration) -> Result<()> {
        self.ensure_live()?;
        self.inner.buffer.set_duration(duration);
        Ok(())
    }

    /// Applies the buffered changes now. An empty buffer is a no-op unless
    /// an earlier refresh failed, in which case the view recomputes and
    /// reports the outcome.
    pub fn flush(&self) -> Result<()> {
        self.ensure_live()?;
        self.inner.flush_buffered()
    }

    /// Discards the buffered changes and recomputes from the source.
    ///
    /// Emits one `Reset` if the contents changed and nothing otherwise.
    pub fn refresh(&self) -> Result<()> {
        let inner = &self.inner;
        let _delivery = inner.delivery.lock();
        let notifications = {
            let mut guard = inner.gate.lock();
            self.ensure_live()?;
            let state = &mut *guard;
            let discarded = inner.buffer.drain().take().len();
            let changes = state.reconcile(Vec::new())?;
            debug!(discarded, changes = changes.len(), "view refreshed");
            notifications_for(changes)
        };
        inner.subscribers.emit_all(&notifications);
        Ok(())
    }

    /// Replaces the source and recomputes.
    ///
    /// The previous source is detached but not disposed. Changes it buffered,
    /// or still delivers from other threads, are dropped.
    pub fn set_source(&self, source: Arc<dyn Source<S>>) -> Result<()> {
        let inner = &self.inner;
        let _delivery = inner.delivery.lock();
        let notifications = {
            let mut guard = inner.gate.lock();
            self.ensure_live()?;
            let state = &mut *guard;

            if let Some(mut old) = state.source_sub.take() {
                old.cancel();
            }
            let generation = {
                let discarded = inner.buffer.drain();
                trace!(discarded = discarded.len(), "dropping changes of the previous source");
                inner.generation.fetch_add(1, Ordering::AcqRel) + 1
            };

            state.source = source;
            state.source_sub = state.source.subscribe(inner.source_listener(generation));

            let changes = state.reconcile(Vec::new())?;
            debug!(generation, len = state.sync.len(), "view source replaced");
            notifications_for(changes)
        };
        inner.subscribers.emit_all(&notifications);
        Ok(())
    }

    /// Detaches from the source and triggers, releases every element and
    /// drops all subscribers. Disposes the source unless the view was built
    /// with `leave_open`. Calling it again does nothing.
    pub fn dispose(&self) {
        let inner = &self.inner;
        let _delivery = inner.delivery.lock();
        let mut state = inner.gate.lock();
        if inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Some(mut sub) = state.source_sub.take() {
            sub.cancel();
        }
        state.triggers.clear();
        drop(inner.buffer.drain());
        let released = state.sync.clear();
        inner.subscribers.clear();
        if !inner.leave_open {
            state.source.dispose();
        }
        debug!(released, leave_open = inner.leave_open, "view disposed");
    }
}

impl<S, X> fmt::Debug for View<S, X>
where
    X: Transform<S>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("disposed", &self.inner.disposed.load(Ordering::Acquire))
            .field("subscribers", &self.inner.subscribers.len())
            .field("buffered", &self.inner.buffer.len())
            .finish_non_exhaustive()
    }
}

impl<S, X> ViewInner<S, X>
where
    S: Clone + PartialEq + Send + Sync + 'static,
    X: Transform<S>,
{
    #[inline]
    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn source_listener(self: &Arc<Self>, generation: u64) -> SourceListener<S> {
        let weak: Weak<Self> = Arc::downgrade(self);
        Arc::new(move |event: &ChangeEvent<S>| {
            if let Some(inner) = weak.upgrade() {
                inner.on_source_change(generation, event.clone());
            }
        })
    }

    fn trigger_callback(self: &Arc<Self>) -> Arc<dyn Fn() + Send + Sync> {
        let weak: Weak<Self> = Arc::downgrade(self);
        Arc::new(move || {
            if let Some(inner) = weak.upgrade() {
                if !inner.is_disposed() {
                    inner.buffer.push(ChangeEvent::Reset);
                    inner.schedule_flush();
                }
            }
        })
    }

    fn on_source_change(self: &Arc<Self>, generation: u64, event: ChangeEvent<S>) {
        if self.is_disposed() {
            return;
        }
        let current = || self.generation.load(Ordering::Acquire) == generation;
        if !self.buffer.push_if(event, current) {
            trace!(generation, "change from a replaced source ignored");
            return;
        }
        self.schedule_flush();
    }

    /// Flushes now for a zero window, otherwise arms one deferred flush.
    fn schedule_flush(self: &Arc<Self>) {
        let delay = self.buffer.duration();
        if delay.is_zero() {
            self.background_flush();
            return;
        }
        if self.flush_pending.swap(true, Ordering::AcqRel) {
            return;
        }
        let weak = Arc::downgrade(self);
        self.scheduler.schedule(
            delay,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.background_flush();
                }
            }),
        );
    }

    /// Flush with no caller to report to. A failure leaves the view stale;
    /// the next flush or refresh recomputes and returns the error again.
    fn background_flush(&self) {
        if let Err(error) = self.flush_buffered() {
            warn!(%error, "view flush failed");
        }
    }

    fn flush_buffered(&self) -> Result<()> {
        let _delivery = self.delivery.lock();
        self.flush_pending.store(false, Ordering::Release);
        let notifications = {
            let mut guard = self.gate.lock();
            if self.is_disposed() {
                return Ok(());
            }
            let events = self.buffer.drain().take();
            if events.is_empty() && !guard.stale {
                return Ok(());
            }
            let count = events.len();
            let changes = guard.reconcile(events)?;
            debug!(events = count, changes = changes.len(), "view flushed");
            notifications_for(changes)
        };
        self.subscribers.emit_all(&notifications);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list::ObservableList;
    use crate::scheduler::{ImmediateScheduler, ManualScheduler};
    use crate::trigger::ManualTrigger;
    use syncview_incremental::FnMapper;

    type Log<T> = Arc<Mutex<Vec<Notification<T>>>>;

    fn identity_view(list: &ObservableList<i32>) -> BufferedView<i32> {
        View::new(
            Arc::new(list.clone()),
            Identity,
            Arc::new(ImmediateScheduler),
            Vec::new(),
            Duration::ZERO,
            false,
        )
        .unwrap()
    }

    fn record<S, X>(view: &View<S, X>) -> Log<X::Output>
    where
        S: Clone + PartialEq + Send + Sync + 'static,
        X: Transform<S>,
    {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_clone = Arc::clone(&log);
        view.subscribe(move |n| log_clone.lock().push(n.clone()))
            .unwrap();
        log
    }

    #[test]
    fn test_populates_on_build() {
        let list = ObservableList::from_vec(vec![1, 2, 3]);
        let view = identity_view(&list);

        assert_eq!(view.snapshot().unwrap(), vec![1, 2, 3]);
        assert_eq!(view.len().unwrap(), 3);
        assert_eq!(view.get(1).unwrap(), Some(2));
        assert_eq!(view.get(3).unwrap(), None);
        assert_eq!(list.listener_count(), 1);
    }

    #[test]
    fn test_zero_window_forwards_single_change() {
        let list = ObservableList::from_vec(vec![1, 2, 3]);
        let view = identity_view(&list);
        let log = record(&view);

        list.push(4);

        assert_eq!(view.snapshot().unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(
            *log.lock(),
            vec![
                Notification::CountChanged,
                Notification::IndexerChanged,
                Notification::Collection(ChangeEvent::add(4, 3)),
            ]
        );
    }

    #[test]
    fn test_buffered_changes_wait_for_scheduler() {
        let list = ObservableList::from_vec(vec![1]);
        let scheduler = Arc::new(ManualScheduler::new());
        let view = View::new(
            Arc::new(list.clone()),
            Identity,
            scheduler.clone(),
            Vec::new(),
            Duration::from_millis(50),
            false,
        )
        .unwrap();

        list.push(2);
        list.push(3);
        assert_eq!(view.snapshot().unwrap(), vec![1]);
        assert_eq!(scheduler.pending(), 1);

        scheduler.advance(Duration::from_millis(50));
        assert_eq!(view.snapshot().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_flush_applies_buffer_early() {
        let list = ObservableList::from_vec(vec![1]);
        let scheduler = Arc::new(ManualScheduler::new());
        let view = View::new(
            Arc::new(list.clone()),
            Identity,
            scheduler.clone(),
            Vec::new(),
            Duration::from_millis(50),
            false,
        )
        .unwrap();
        let log = record(&view);

        list.push(2);
        view.flush().unwrap();
        assert_eq!(view.snapshot().unwrap(), vec![1, 2]);
        assert_eq!(log.lock().len(), 3);

        // The timer finds an empty buffer
        scheduler.advance(Duration::from_millis(50));
        assert_eq!(log.lock().len(), 3);
    }

    #[test]
    fn test_trigger_forces_recompute() {
        let source = Arc::new(parking_lot::RwLock::new(vec![1, 2]));
        let trigger = ManualTrigger::new();
        let view: BufferedView<i32> = View::new(
            source.clone(),
            Identity,
            Arc::new(ImmediateScheduler),
            vec![Arc::new(trigger.clone()) as Arc<dyn Trigger>],
            Duration::ZERO,
            false,
        )
        .unwrap();
        let log = record(&view);

        source.write().push(3);
        assert_eq!(view.snapshot().unwrap(), vec![1, 2]);

        trigger.fire();
        assert_eq!(view.snapshot().unwrap(), vec![1, 2, 3]);
        assert_eq!(
            log.lock().last(),
            Some(&Notification::Collection(ChangeEvent::Reset))
        );

        // Nothing changed: nothing emitted
        trigger.fire();
        assert_eq!(log.lock().len(), 3);
    }

    #[test]
    fn test_refresh_without_change_is_silent() {
        let list = ObservableList::from_vec(vec![1, 2]);
        let view = identity_view(&list);
        let log = record(&view);

        view.refresh().unwrap();
        view.refresh().unwrap();
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_set_source_detaches_previous() {
        let first = ObservableList::from_vec(vec![1, 2]);
        let second = ObservableList::from_vec(vec![7]);
        let view = identity_view(&first);
        let log = record(&view);

        view.set_source(Arc::new(second.clone())).unwrap();
        assert_eq!(view.snapshot().unwrap(), vec![7]);
        assert_eq!(first.listener_count(), 0);
        assert!(!first.is_disposed());
        assert_eq!(
            log.lock().last(),
            Some(&Notification::Collection(ChangeEvent::Reset))
        );

        first.push(3);
        assert_eq!(view.snapshot().unwrap(), vec![7]);

        second.push(8);
        assert_eq!(view.snapshot().unwrap(), vec![7, 8]);
    }

    #[test]
    fn test_mapping_view_patches() {
        let list = ObservableList::from_vec(vec![10, 20]);
        let mapper = FnMapper::new(|s: &i32, i| format!("{i}:{s}"))
            .with_update(|v: &String, i| {
                let (_, value) = v.split_once(':')?;
                Some(format!("{i}:{value}"))
            });
        let view: MappedView<i32, String> = View::new(
            Arc::new(list.clone()),
            Map::new(mapper),
            Arc::new(ImmediateScheduler),
            Vec::new(),
            Duration::ZERO,
            false,
        )
        .unwrap();

        list.insert(0, 5).unwrap();
        assert_eq!(view.snapshot().unwrap(), vec!["0:5", "1:10", "2:20"]);

        list.remove_at(1).unwrap();
        assert_eq!(view.snapshot().unwrap(), vec!["0:5", "1:20"]);
    }

    #[test]
    fn test_failed_flush_recovers_on_next_change() {
        let list = ObservableList::from_vec(vec![10, 20]);
        let mapper =
            FnMapper::try_new(|s: &i32, _| if *s < 0 { Err("negative".into()) } else { Ok(*s) });
        let view: MappedView<i32, i32> = View::new(
            Arc::new(list.clone()),
            Map::new(mapper),
            Arc::new(ImmediateScheduler),
            Vec::new(),
            Duration::ZERO,
            false,
        )
        .unwrap();
        let log = record(&view);

        // Both changes fail to map while -1 is in the source
        list.insert(0, -1).unwrap();
        list.insert(1, 5).unwrap();
        assert_eq!(view.snapshot().unwrap(), vec![10, 20]);
        assert!(log.lock().is_empty());

        // The lost changes are not forgotten
        assert!(matches!(view.flush(), Err(Error::Transform { .. })));
        assert!(view.refresh().is_err());

        list.set(0, 1).unwrap();
        assert_eq!(view.snapshot().unwrap(), vec![1, 5, 10, 20]);
        assert_eq!(
            log.lock().last(),
            Some(&Notification::Collection(ChangeEvent::Reset))
        );

        view.flush().unwrap();
        assert_eq!(log.lock().len(), 3);
    }

    #[test]
    fn test_dispose_is_terminal_and_idempotent() {
        let list = ObservableList::from_vec(vec![1]);
        let view = identity_view(&list);
        let log = record(&view);

        view.dispose();
        view.dispose();

        assert!(view.is_disposed());
        assert!(list.is_disposed());
        assert!(view.snapshot().unwrap_err().is_disposed());
        assert!(view.len().unwrap_err().is_disposed());
        assert!(view.get(0).unwrap_err().is_disposed());
        assert!(view.refresh().unwrap_err().is_disposed());
        assert!(view.flush().unwrap_err().is_disposed());
        assert!(view.subscribe(|_| {}).unwrap_err().is_disposed());
        assert!(view.set_buffer_duration(Duration::ZERO).unwrap_err().is_disposed());
        assert!(view
            .set_source(Arc::new(ObservableList::from_vec(vec![2])))
            .unwrap_err()
            .is_disposed());

        list.push(2);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_dropped_view_detaches_from_source() {
        let list = ObservableList::from_vec(vec![1]);
        let view = identity_view(&list);
        assert_eq!(list.listener_count(), 1);

        drop(view);
        assert_eq!(list.listener_count(), 0);
        list.push(2);
    }
}
