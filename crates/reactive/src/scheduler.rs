//! Scheduler implementations.
//!
//! - [`ImmediateScheduler`]: runs everything inline after sleeping out the delay.
//! - [`ManualScheduler`]: virtual clock advanced by the caller.
//! - [`ThreadScheduler`]: one sleeping thread per delayed action.

use parking_lot::Mutex;
use std::fmt;
use std::thread;
use std::time::Duration;
use syncview_core::{Action, Scheduler};

/// Runs every action on the calling thread, blocking it for the delay first.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImmediateScheduler;

impl Scheduler for ImmediateScheduler {
    fn schedule(&self, delay: Duration, action: Action) {
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        action();
    }
}

/// Deterministic scheduler driven by [`ManualScheduler::advance`].
///
/// Actions due at the same instant run in the order they were scheduled.
#[derive(Default)]
pub struct ManualScheduler {
    state: Mutex<ManualState>,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_seq: u64,
    queue: Vec<Pending>,
}

struct Pending {
    due: Duration,
    seq: u64,
    action: Action,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    /// Number of actions waiting for the clock.
    pub fn pending(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Moves the clock forward by `by`, running every action that falls due.
    ///
    /// Actions run without the internal lock held, so they may schedule
    /// further actions; those run too if they fall inside the window.
    pub fn advance(&self, by: Duration) {
        let target = self.state.lock().now + by;
        loop {
            let next = {
                let mut state = self.state.lock();
                let earliest = state
                    .queue
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| p.due <= target)
                    .min_by_key(|(_, p)| (p.due, p.seq))
                    .map(|(i, _)| i);
                match earliest {
                    Some(i) => {
                        let pending = state.queue.swap_remove(i);
                        state.now = state.now.max(pending.due);
                        Some(pending.action)
                    }
                    None => {
                        state.now = target;
                        None
                    }
                }
            };
            match next {
                Some(action) => action(),
                None => break,
            }
        }
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, action: Action) {
        if delay.is_zero() {
            action();
            return;
        }
        let mut state = self.state.lock();
        let due = state.now + delay;
        let seq = state.next_seq;
        state.next_seq += 1;
        state.queue.push(Pending { due, seq, action });
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ManualScheduler")
            .field("now", &state.now)
            .field("pending", &state.queue.len())
            .finish()
    }
}

/// Runs each delayed action on its own thread after sleeping.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadScheduler;

impl Scheduler for ThreadScheduler {
    fn schedule(&self, delay: Duration, action: Action) {
        if delay.is_zero() {
            action();
            return;
        }
        thread::spawn(move || {
            thread::sleep(delay);
            action();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc, Arc};

    fn push_to(log: &Arc<Mutex<Vec<u32>>>, value: u32) -> Action {
        let log = Arc::clone(log);
        Box::new(move || log.lock().push(value))
    }

    #[test]
    fn test_immediate_waits_out_delay() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let started = std::time::Instant::now();
        ImmediateScheduler.schedule(Duration::from_millis(5), push_to(&log, 1));
        assert!(started.elapsed() >= Duration::from_millis(5));
        assert_eq!(*log.lock(), vec![1]);

        ImmediateScheduler.schedule(Duration::ZERO, push_to(&log, 2));
        assert_eq!(*log.lock(), vec![1, 2]);
    }

    #[test]
    fn test_manual_zero_delay_is_synchronous() {
        let scheduler = ManualScheduler::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        scheduler.schedule(Duration::ZERO, push_to(&log, 1));
        assert_eq!(*log.lock(), vec![1]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_manual_runs_in_due_order() {
        let scheduler = ManualScheduler::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        scheduler.schedule(Duration::from_millis(30), push_to(&log, 3));
        scheduler.schedule(Duration::from_millis(10), push_to(&log, 1));
        scheduler.schedule(Duration::from_millis(10), push_to(&log, 2));
        assert_eq!(scheduler.pending(), 3);

        scheduler.advance(Duration::from_millis(20));
        assert_eq!(*log.lock(), vec![1, 2]);
        assert_eq!(scheduler.now(), Duration::from_millis(20));

        scheduler.advance(Duration::from_millis(10));
        assert_eq!(*log.lock(), vec![1, 2, 3]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn test_manual_action_can_reschedule() {
        let scheduler = Arc::new(ManualScheduler::new());
        let count = Arc::new(AtomicUsize::new(0));

        let inner_scheduler = Arc::clone(&scheduler);
        let inner_count = Arc::clone(&count);
        scheduler.schedule(
            Duration::from_millis(10),
            Box::new(move || {
                inner_count.fetch_add(1, Ordering::SeqCst);
                let count = Arc::clone(&inner_count);
                inner_scheduler.schedule(
                    Duration::from_millis(10),
                    Box::new(move || {
                        count.fetch_add(1, Ordering::SeqCst);
                    }),
                );
            }),
        );

        scheduler.advance(Duration::from_millis(15));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending(), 1);

        scheduler.advance(Duration::from_millis(5));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_thread_scheduler_runs_later() {
        let (tx, rx) = mpsc::channel();
        ThreadScheduler.schedule(
            Duration::from_millis(5),
            Box::new(move || {
                let _ = tx.send(7);
            }),
        );
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 7);
    }
}
