//! Diff-and-patch synchronizer.
//!
//! The synchronizer owns the tracker of a view and reconciles it against the
//! source, either by recomputing it from a snapshot or, for a single buffered
//! change on an incremental transform, by patching it in place.
//!
//! # Refresh paths
//!
//! | buffered changes | transform mode | path |
//! |------------------|----------------|------|
//! | all irrelevant to the filter | any | skipped |
//! | none, `Reset`, or more than one | any | recompute |
//! | one | `Forward` | recompute, forward the change if it describes the result |
//! | one | `Recompute` | recompute |
//! | one | `Incremental` | patch, recompute if the change does not fit |
//!
//! Patching with an index-aware mapper walks every position whose index
//! shifted, so one patch costs O(affected range). Bursts collapse into a
//! single recompute, which bounds the worst case.
//!
//! Every callback runs before the tracker is touched: a failing `create` or
//! `update` leaves the tracker exactly as it was.

use crate::tracker::{Entry, Tracker};
use crate::transform::{PatchMode, Transform};
use std::ops::RangeInclusive;
use syncview_core::{ChangeEvent, Result};
use tracing::trace;

/// Reconciles a materialized view with its source.
pub struct Synchronizer<S, X: Transform<S>> {
    transform: X,
    tracker: Tracker<S, X::Output>,
}

impl<S, X> Synchronizer<S, X>
where
    S: Clone + PartialEq + Send + Sync + 'static,
    X: Transform<S>,
{
    /// Creates an unpopulated synchronizer.
    pub fn new(transform: X) -> Self {
        Self {
            transform,
            tracker: Tracker::new(),
        }
    }

    #[inline]
    pub fn transform(&self) -> &X {
        &self.transform
    }

    #[inline]
    pub fn tracker(&self) -> &Tracker<S, X::Output> {
        &self.tracker
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tracker.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tracker.is_empty()
    }

    /// Returns the view element at `index`.
    pub fn get(&self, index: usize) -> Option<&X::Output> {
        self.tracker.get(index).map(|e| &e.value)
    }

    /// Clones the view elements in order.
    pub fn values(&self) -> Vec<X::Output> {
        self.tracker.values()
    }

    /// Initial population from `snapshot`. Emits nothing.
    pub fn populate(&mut self, snapshot: Vec<S>) -> Result<()> {
        self.recompute(snapshot).map(|_| ())
    }

    /// Reconciles the tracker with the buffered `events`.
    ///
    /// `snapshot` is only called when the chosen path needs the current
    /// source contents. Returns the view-level changes, primary change first.
    pub fn refresh<F>(
        &mut self,
        mut events: Vec<ChangeEvent<S>>,
        snapshot: F,
    ) -> Result<Vec<ChangeEvent<X::Output>>>
    where
        F: FnOnce() -> Result<Vec<S>>,
    {
        if !events.is_empty() && events.iter().all(|e| self.transform.is_irrelevant(e)) {
            trace!(events = events.len(), "changes are invisible through the filter, skipping");
            return Ok(Vec::new());
        }

        let event = match events.len() {
            1 => events.pop(),
            _ => None,
        };
        let event = match event {
            Some(event) if !event.is_reset() => event,
            _ => {
                trace!(events = events.len(), "recompute");
                return Ok(self.recompute(snapshot()?)?.into_iter().collect());
            }
        };

        match self.transform.mode() {
            PatchMode::Forward => self.forward(event, snapshot()?),
            PatchMode::Recompute => Ok(self.recompute(snapshot()?)?.into_iter().collect()),
            PatchMode::Incremental => match self.patch(&event)? {
                Some(changes) => Ok(changes),
                None => {
                    trace!(kind = %event.kind(), "change does not fit the tracker, recompute");
                    Ok(self.recompute(snapshot()?)?.into_iter().collect())
                }
            },
        }
    }

    /// Releases every materialized element and empties the tracker.
    pub fn clear(&mut self) -> usize {
        let entries = self.tracker.take_all();
        let count = entries.len();
        self.release_all(entries);
        count
    }

    // -----------------------------------------------------------------------
    // Recompute path
    // -----------------------------------------------------------------------

    fn recompute(&mut self, snapshot: Vec<S>) -> Result<Option<ChangeEvent<X::Output>>> {
        let admitted: Vec<S> = snapshot
            .into_iter()
            .filter(|item| self.transform.admits(item))
            .collect();
        self.recompute_admitted(admitted)
    }

    fn recompute_admitted(&mut self, admitted: Vec<S>) -> Result<Option<ChangeEvent<X::Output>>> {
        if self.tracker.sources_eq(&admitted) {
            return Ok(None);
        }
        let entries = self.materialize(admitted)?;
        let old = self.tracker.swap_all(entries);
        self.release_all(old);
        Ok(Some(ChangeEvent::Reset))
    }

    fn materialize(&self, admitted: Vec<S>) -> Result<Vec<Entry<S, X::Output>>> {
        let mut entries = Vec::with_capacity(admitted.len());
        for (index, item) in admitted.into_iter().enumerate() {
            match self.transform.create(&item, index) {
                Ok(value) => entries.push(Entry::new(item, value)),
                Err(e) => {
                    self.release_all(entries);
                    return Err(e);
                }
            }
        }
        Ok(entries)
    }

    /// Recomputes, then reports `event` itself when replaying it on the old
    /// tracker yields exactly the new contents. Otherwise reports `Reset`.
    fn forward(
        &mut self,
        event: ChangeEvent<S>,
        snapshot: Vec<S>,
    ) -> Result<Vec<ChangeEvent<X::Output>>> {
        let admitted: Vec<S> = snapshot
            .into_iter()
            .filter(|item| self.transform.admits(item))
            .collect();

        let mut replayed: Vec<S> = self.tracker.sources().cloned().collect();
        let forwarded = if event.apply_to(&mut replayed) && replayed == admitted {
            Some(event.try_map(|item, index| self.transform.create(&item, index))?)
        } else {
            None
        };

        Ok(match (self.recompute_admitted(admitted)?, forwarded) {
            (None, _) => Vec::new(),
            (Some(_), Some(change)) => vec![change],
            (Some(reset), None) => vec![reset],
        })
    }

    // -----------------------------------------------------------------------
    // Patch path
    // -----------------------------------------------------------------------

    /// Applies one change in place. Returns `Ok(None)` if it does not fit the
    /// tracker.
    fn patch(&mut self, event: &ChangeEvent<S>) -> Result<Option<Vec<ChangeEvent<X::Output>>>> {
        let len = self.tracker.len();
        match event {
            ChangeEvent::Add { item, index } => {
                let index = *index;
                if index > len {
                    return Ok(None);
                }
                let value = self.transform.create(item, index)?;
                // Everything at or after `index` shifts right by one.
                let updates = match self.range_updates(index..len, |j| j + 1) {
                    Ok(updates) => updates,
                    Err(e) => {
                        self.transform.release(item, &value);
                        return Err(e);
                    }
                };

                self.tracker
                    .insert(index, Entry::new(item.clone(), value.clone()));
                let mut changes = vec![ChangeEvent::add(value, index)];
                changes.extend(self.apply_updates(updates));
                Ok(Some(changes))
            }
            ChangeEvent::Remove { item, index } => {
                let index = *index;
                if !self.source_at_is(index, item) {
                    return Ok(None);
                }
                // Everything after `index` shifts left by one.
                let updates = self.range_updates(index + 1..len, |j| j - 1)?;

                let removed = self.tracker.remove(index);
                let mut changes = vec![ChangeEvent::remove(removed.value.clone(), index)];
                changes.extend(self.apply_updates(updates));
                self.transform.release(&removed.source, &removed.value);
                Ok(Some(changes))
            }
            ChangeEvent::Replace { old, new, index } => {
                let index = *index;
                if !self.source_at_is(index, old) {
                    return Ok(None);
                }
                let value = self.transform.create(new, index)?;

                let displaced = self
                    .tracker
                    .replace(index, Entry::new(new.clone(), value.clone()));
                self.transform.release(&displaced.source, &displaced.value);
                Ok(Some(vec![ChangeEvent::replace(displaced.value, value, index)]))
            }
            ChangeEvent::Move { item, from, to } => {
                let (from, to) = (*from, *to);
                if !self.source_at_is(from, item) || to >= len {
                    return Ok(None);
                }
                if from == to {
                    return Ok(Some(Vec::new()));
                }
                let updates = self.move_updates(from, to)?;

                self.tracker.move_entry(from, to);
                let moved = self.tracker.entries()[to].value.clone();
                let mut changes = vec![ChangeEvent::moved(moved, from, to)];
                changes.extend(self.apply_updates(updates));
                Ok(Some(changes))
            }
            ChangeEvent::Reset => Ok(None),
        }
    }

    fn source_at_is(&self, index: usize, item: &S) -> bool {
        self.tracker.get(index).map(|e| &e.source == item).unwrap_or(false)
    }

    /// Asks the transform to refresh each element in `current` positions,
    /// which will end up at `new_index(position)`. Returns the replacements
    /// keyed by their new position.
    fn range_updates<I, F>(&self, current: I, new_index: F) -> Result<Vec<(usize, X::Output)>>
    where
        I: IntoIterator<Item = usize>,
        F: Fn(usize) -> usize,
    {
        if !self.transform.can_update_index() {
            return Ok(Vec::new());
        }
        let entries = self.tracker.entries();
        let mut updates = Vec::new();
        for position in current {
            let target = new_index(position);
            if let Some(value) = self.transform.update(&entries[position].value, target)? {
                updates.push((target, value));
            }
        }
        Ok(updates)
    }

    /// Range update for a move: every position in `[min, max]` gets the
    /// element that will land there.
    fn move_updates(&self, from: usize, to: usize) -> Result<Vec<(usize, X::Output)>> {
        if !self.transform.can_update_index() {
            return Ok(Vec::new());
        }
        let range: RangeInclusive<usize> = from.min(to)..=from.max(to);
        let entries = self.tracker.entries();
        let mut updates = Vec::new();
        for target in range {
            let origin = if target == to {
                from
            } else if from < to {
                target + 1
            } else {
                target - 1
            };
            if let Some(value) = self.transform.update(&entries[origin].value, target)? {
                updates.push((target, value));
            }
        }
        Ok(updates)
    }

    fn apply_updates(&mut self, updates: Vec<(usize, X::Output)>) -> Vec<ChangeEvent<X::Output>> {
        updates
            .into_iter()
            .map(|(position, value)| {
                let old = self.tracker.replace_value(position, value.clone());
                ChangeEvent::replace(old, value, position)
            })
            .collect()
    }

    fn release_all(&self, entries: Vec<Entry<S, X::Output>>) {
        for entry in entries {
            self.transform.release(&entry.source, &entry.value);
        }
    }
}
