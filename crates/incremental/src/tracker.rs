//! Materialized state of a view.
//!
//! The tracker keeps, for every visible position, the source element it was
//! derived from and the materialized view element. Keeping the source lets the
//! synchronizer hand both to `Mapper::remove` and detect recomputes that would
//! not change anything observable.

/// One materialized position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry<S, O> {
    /// The source element this entry was derived from
    pub source: S,
    /// The materialized view element
    pub value: O,
}

impl<S, O> Entry<S, O> {
    #[inline]
    pub fn new(source: S, value: O) -> Self {
        Self { source, value }
    }
}

/// Ordered sequence of materialized entries.
#[derive(Clone, Debug)]
pub struct Tracker<S, O> {
    entries: Vec<Entry<S, O>>,
}

impl<S, O> Default for Tracker<S, O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, O> Tracker<S, O> {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Entry<S, O>> {
        self.entries.get(index)
    }

    #[inline]
    pub fn entries(&self) -> &[Entry<S, O>] {
        &self.entries
    }

    /// Iterates over the source elements in view order.
    pub fn sources(&self) -> impl Iterator<Item = &S> {
        self.entries.iter().map(|e| &e.source)
    }

    /// Returns true if the tracked sources are exactly `other`, in order.
    pub fn sources_eq(&self, other: &[S]) -> bool
    where
        S: PartialEq,
    {
        self.entries.len() == other.len() && self.sources().zip(other).all(|(a, b)| a == b)
    }

    pub fn insert(&mut self, index: usize, entry: Entry<S, O>) {
        self.entries.insert(index, entry);
    }

    pub fn remove(&mut self, index: usize) -> Entry<S, O> {
        self.entries.remove(index)
    }

    /// Swaps the entry at `index`, returning the displaced one.
    pub fn replace(&mut self, index: usize, entry: Entry<S, O>) -> Entry<S, O> {
        std::mem::replace(&mut self.entries[index], entry)
    }

    /// Swaps only the view element at `index`, returning the displaced one.
    pub fn replace_value(&mut self, index: usize, value: O) -> O {
        std::mem::replace(&mut self.entries[index].value, value)
    }

    /// Moves the entry at `from` so that it ends up at `to`.
    pub fn move_entry(&mut self, from: usize, to: usize) {
        let entry = self.entries.remove(from);
        self.entries.insert(to, entry);
    }

    /// Replaces the backing storage wholesale, returning the old entries.
    pub fn swap_all(&mut self, entries: Vec<Entry<S, O>>) -> Vec<Entry<S, O>> {
        std::mem::replace(&mut self.entries, entries)
    }

    /// Empties the tracker, returning its entries.
    pub fn take_all(&mut self) -> Vec<Entry<S, O>> {
        std::mem::take(&mut self.entries)
    }
}

impl<S, O: Clone> Tracker<S, O> {
    /// Clones the view elements in order.
    pub fn values(&self) -> Vec<O> {
        self.entries.iter().map(|e| e.value.clone()).collect()
    }
}
