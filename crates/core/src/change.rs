//! Structural change events for ordered sequences.
//!
//! A `ChangeEvent` describes exactly one mutation of a sequence. Index fields
//! are 0-based positions in the sequence at the time the mutation happened.
//! A burst of mutations is represented as one event per mutation; there is no
//! multi-item variant.

use core::fmt;

/// A single structural mutation of an ordered sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChangeEvent<T> {
    /// `item` was inserted at `index`.
    Add { item: T, index: usize },
    /// `item` was removed from `index`.
    Remove { item: T, index: usize },
    /// The element at `index` changed from `old` to `new`.
    Replace { old: T, new: T, index: usize },
    /// `item` moved from `from` to `to`.
    Move { item: T, from: usize, to: usize },
    /// The sequence changed in a way that is not described item by item.
    Reset,
}

/// Fieldless tag of a [`ChangeEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Add,
    Remove,
    Replace,
    Move,
    Reset,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChangeKind::Add => "add",
            ChangeKind::Remove => "remove",
            ChangeKind::Replace => "replace",
            ChangeKind::Move => "move",
            ChangeKind::Reset => "reset",
        };
        f.write_str(name)
    }
}

impl<T> ChangeEvent<T> {
    /// Creates an add event.
    #[inline]
    pub fn add(item: T, index: usize) -> Self {
        ChangeEvent::Add { item, index }
    }

    /// Creates a remove event.
    #[inline]
    pub fn remove(item: T, index: usize) -> Self {
        ChangeEvent::Remove { item, index }
    }

    /// Creates a replace event.
    #[inline]
    pub fn replace(old: T, new: T, index: usize) -> Self {
        ChangeEvent::Replace { old, new, index }
    }

    /// Creates a move event.
    #[inline]
    pub fn moved(item: T, from: usize, to: usize) -> Self {
        ChangeEvent::Move { item, from, to }
    }

    /// Returns the kind of this event.
    pub fn kind(&self) -> ChangeKind {
        match self {
            ChangeEvent::Add { .. } => ChangeKind::Add,
            ChangeEvent::Remove { .. } => ChangeKind::Remove,
            ChangeEvent::Replace { .. } => ChangeKind::Replace,
            ChangeEvent::Move { .. } => ChangeKind::Move,
            ChangeEvent::Reset => ChangeKind::Reset,
        }
    }

    /// Returns true for `Reset`.
    #[inline]
    pub fn is_reset(&self) -> bool {
        matches!(self, ChangeEvent::Reset)
    }

    /// Returns true if the event changes the length of the sequence.
    ///
    /// `Reset` counts as length-changing since its effect is unknown.
    #[inline]
    pub fn changes_count(&self) -> bool {
        matches!(
            self,
            ChangeEvent::Add { .. } | ChangeEvent::Remove { .. } | ChangeEvent::Reset
        )
    }

    /// Iterates over the items this event touches. Empty for `Reset`.
    pub fn items(&self) -> impl Iterator<Item = &T> {
        let (first, second) = match self {
            ChangeEvent::Add { item, .. }
            | ChangeEvent::Remove { item, .. }
            | ChangeEvent::Move { item, .. } => (Some(item), None),
            ChangeEvent::Replace { old, new, .. } => (Some(old), Some(new)),
            ChangeEvent::Reset => (None, None),
        };
        first.into_iter().chain(second)
    }

    /// Converts the item payloads, keeping the indices.
    ///
    /// `f` receives each item together with the index it occupies after the
    /// event (the destination index for `Move`).
    pub fn try_map<U, E, F>(self, mut f: F) -> Result<ChangeEvent<U>, E>
    where
        F: FnMut(T, usize) -> Result<U, E>,
    {
        Ok(match self {
            ChangeEvent::Add { item, index } => ChangeEvent::Add {
                item: f(item, index)?,
                index,
            },
            ChangeEvent::Remove { item, index } => ChangeEvent::Remove {
                item: f(item, index)?,
                index,
            },
            ChangeEvent::Replace { old, new, index } => ChangeEvent::Replace {
                old: f(old, index)?,
                new: f(new, index)?,
                index,
            },
            ChangeEvent::Move { item, from, to } => ChangeEvent::Move {
                item: f(item, to)?,
                from,
                to,
            },
            ChangeEvent::Reset => ChangeEvent::Reset,
        })
    }
}

impl<T: Clone + PartialEq> ChangeEvent<T> {
    /// Replays this event against `seq`.
    ///
    /// Returns false, leaving `seq` untouched, when the event does not fit:
    /// an index is out of range or the item at the index is not the one the
    /// event names. `Reset` never fits since it carries no content.
    pub fn apply_to(&self, seq: &mut Vec<T>) -> bool {
        match self {
            ChangeEvent::Add { item, index } => {
                if *index > seq.len() {
                    return false;
                }
                seq.insert(*index, item.clone());
                true
            }
            ChangeEvent::Remove { item, index } => {
                if seq.get(*index) != Some(item) {
                    return false;
                }
                seq.remove(*index);
                true
            }
            ChangeEvent::Replace { old, new, index } => match seq.get_mut(*index) {
                Some(slot) if slot == old => {
                    *slot = new.clone();
                    true
                }
                _ => false,
            },
            ChangeEvent::Move { item, from, to } => {
                if seq.get(*from) != Some(item) || *to >= seq.len() {
                    return false;
                }
                let moved = seq.remove(*from);
                seq.insert(*to, moved);
                true
            }
            ChangeEvent::Reset => false,
        }
    }
}
