//! Notification protocol for view subscribers.
//!
//! Each structural change is announced together with two auxiliary signals:
//! `CountChanged` when the length may have moved and `IndexerChanged` when the
//! positional contents moved. Batches of more than one change collapse into a
//! single `Reset`, so subscribers never observe a half-applied batch.

use crate::change::ChangeEvent;

/// A notification delivered to view subscribers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification<T> {
    /// The number of elements may have changed.
    CountChanged,
    /// The element at one or more positions changed.
    IndexerChanged,
    /// A structural change of the view.
    Collection(ChangeEvent<T>),
}

impl<T> Notification<T> {
    /// Returns the structural change carried by this notification, if any.
    #[inline]
    pub fn as_change(&self) -> Option<&ChangeEvent<T>> {
        match self {
            Notification::Collection(change) => Some(change),
            _ => None,
        }
    }
}

/// Expands a single change into its notification sequence.
pub fn notifications_for_change<T>(change: ChangeEvent<T>) -> Vec<Notification<T>> {
    let mut out = Vec::with_capacity(3);
    if change.changes_count() {
        out.push(Notification::CountChanged);
    }
    out.push(Notification::IndexerChanged);
    out.push(Notification::Collection(change));
    out
}

/// Expands the changes produced by one refresh into notifications.
///
/// One change is announced as itself; several collapse into one `Reset`.
pub fn notifications_for<T>(mut changes: Vec<ChangeEvent<T>>) -> Vec<Notification<T>> {
    match changes.len() {
        0 => Vec::new(),
        1 => match changes.pop() {
            Some(change) => notifications_for_change(change),
            None => Vec::new(),
        },
        _ => notifications_for_change(ChangeEvent::Reset),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_remove_signal_count() {
        let n = notifications_for(vec![ChangeEvent::add(4, 3)]);
        assert_eq!(
            n,
            vec![
                Notification::CountChanged,
                Notification::IndexerChanged,
                Notification::Collection(ChangeEvent::add(4, 3)),
            ]
        );

        let n = notifications_for(vec![ChangeEvent::remove(4, 3)]);
        assert_eq!(n.len(), 3);
        assert_eq!(n[0], Notification::CountChanged);
    }

    #[test]
    fn test_replace_and_move_skip_count() {
        let n = notifications_for(vec![ChangeEvent::replace(1, 2, 0)]);
        assert_eq!(
            n,
            vec![
                Notification::IndexerChanged,
                Notification::Collection(ChangeEvent::replace(1, 2, 0)),
            ]
        );

        let n = notifications_for(vec![ChangeEvent::moved(1, 0, 2)]);
        assert_eq!(n.len(), 2);
        assert_eq!(n[0], Notification::IndexerChanged);
    }

    #[test]
    fn test_reset_signals_both() {
        let n = notifications_for(vec![ChangeEvent::<i32>::Reset]);
        assert_eq!(
            n,
            vec![
                Notification::CountChanged,
                Notification::IndexerChanged,
                Notification::Collection(ChangeEvent::Reset),
            ]
        );
    }

    #[test]
    fn test_batch_collapses_to_reset() {
        let n = notifications_for(vec![
            ChangeEvent::add(1, 0),
            ChangeEvent::replace(2, 3, 1),
        ]);
        assert_eq!(n.len(), 3);
        assert_eq!(n[2].as_change(), Some(&ChangeEvent::Reset));
    }

    #[test]
    fn test_empty_is_silent() {
        assert!(notifications_for::<i32>(Vec::new()).is_empty());
    }
}
