//! Transform strategies applied by the synchronizer.
//!
//! A view is parameterized by one of three strategies:
//!
//! - [`Identity`]: the view mirrors the source as is
//! - [`Filter`]: the view shows the source elements that satisfy a predicate
//! - [`Map`]: the view shows one mapper-created element per source element
//!
//! The strategy also tells the synchronizer which refresh path it supports
//! through [`PatchMode`].

use crate::mapper::Mapper;
use std::fmt;
use std::sync::Arc;
use syncview_core::{ChangeEvent, Error, Result};

/// How a single buffered change is applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatchMode {
    /// Recompute, then forward the source change when it describes the result.
    Forward,
    /// Always recompute; a single change becomes a `Reset`.
    Recompute,
    /// Translate the change into tracker mutations without recomputing.
    Incremental,
}

/// Element transform strategy.
pub trait Transform<S>: Send + Sync + 'static {
    /// The materialized view element type.
    type Output: Clone + Send + Sync + 'static;

    /// The refresh path this strategy supports.
    fn mode(&self) -> PatchMode;

    /// Whether `item` is visible in the view.
    fn admits(&self, item: &S) -> bool {
        let _ = item;
        true
    }

    /// Materializes the view element for `item` at view position `index`.
    fn create(&self, item: &S, index: usize) -> Result<Self::Output>;

    /// Refreshes `current` after its view position changed to `index`.
    fn update(&self, current: &Self::Output, index: usize) -> Result<Option<Self::Output>> {
        let _ = (current, index);
        Ok(None)
    }

    /// Releases `value`, which is leaving the view.
    fn release(&self, item: &S, value: &Self::Output) {
        let _ = (item, value);
    }

    /// Whether view elements depend on their position.
    fn can_update_index(&self) -> bool {
        false
    }

    /// Returns true if `event` cannot have changed the visible view.
    ///
    /// A change touching only elements the view does not admit, on both sides,
    /// is irrelevant. `Reset` never is.
    fn is_irrelevant(&self, event: &ChangeEvent<S>) -> bool {
        match event {
            ChangeEvent::Add { item, .. }
            | ChangeEvent::Remove { item, .. }
            | ChangeEvent::Move { item, .. } => !self.admits(item),
            ChangeEvent::Replace { old, new, .. } => !self.admits(old) && !self.admits(new),
            ChangeEvent::Reset => false,
        }
    }
}

/// Pass-through strategy.
#[derive(Clone, Copy, Debug, Default)]
pub struct Identity;

impl<S> Transform<S> for Identity
where
    S: Clone + Send + Sync + 'static,
{
    type Output = S;

    fn mode(&self) -> PatchMode {
        PatchMode::Forward
    }

    fn create(&self, item: &S, _index: usize) -> Result<S> {
        Ok(item.clone())
    }
}

/// Predicate type used by [`Filter`].
pub type Predicate<S> = dyn Fn(&S) -> bool + Send + Sync;

/// Filtering strategy.
pub struct Filter<S> {
    predicate: Arc<Predicate<S>>,
}

impl<S> Filter<S> {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&S) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    /// Wraps an already shared predicate.
    pub fn from_arc(predicate: Arc<Predicate<S>>) -> Self {
        Self { predicate }
    }
}

impl<S> Clone for Filter<S> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<S> fmt::Debug for Filter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter").finish_non_exhaustive()
    }
}

impl<S> Transform<S> for Filter<S>
where
    S: Clone + Send + Sync + 'static,
{
    type Output = S;

    fn mode(&self) -> PatchMode {
        PatchMode::Recompute
    }

    fn admits(&self, item: &S) -> bool {
        (self.predicate)(item)
    }

    fn create(&self, item: &S, _index: usize) -> Result<S> {
        Ok(item.clone())
    }
}

/// Mapping strategy backed by a [`Mapper`].
pub struct Map<S, V> {
    mapper: Arc<dyn Mapper<S, V>>,
}

impl<S, V> Map<S, V> {
    pub fn new<M>(mapper: M) -> Self
    where
        M: Mapper<S, V> + 'static,
    {
        Self {
            mapper: Arc::new(mapper),
        }
    }

    /// Wraps an already shared mapper.
    pub fn from_arc(mapper: Arc<dyn Mapper<S, V>>) -> Self {
        Self { mapper }
    }

    #[inline]
    pub fn mapper(&self) -> &Arc<dyn Mapper<S, V>> {
        &self.mapper
    }
}

impl<S, V> Clone for Map<S, V> {
    fn clone(&self) -> Self {
        Self {
            mapper: Arc::clone(&self.mapper),
        }
    }
}

impl<S, V> fmt::Debug for Map<S, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Map")
            .field("can_update_index", &self.mapper.can_update_index())
            .finish()
    }
}

impl<S, V> Transform<S> for Map<S, V>
where
    S: Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    type Output = V;

    fn mode(&self) -> PatchMode {
        PatchMode::Incremental
    }

    fn create(&self, item: &S, index: usize) -> Result<V> {
        self.mapper
            .create(item, index)
            .map_err(|e| Error::transform(index, e))
    }

    fn update(&self, current: &V, index: usize) -> Result<Option<V>> {
        self.mapper
            .update(current, index)
            .map_err(|e| Error::transform(index, e))
    }

    fn release(&self, item: &S, value: &V) {
        self.mapper.remove(item, value);
    }

    fn can_update_index(&self) -> bool {
        self.mapper.can_update_index()
    }
}
