//! Mapper contract for mapping views.
//!
//! A mapper materializes a view element from a source element and owns the
//! lifecycle of that element: it may refresh it when its position changes and
//! is told exactly once when it leaves the view.

use std::fmt;
use std::sync::Arc;
use syncview_core::BoxError;

/// Per-element transform with create/update/remove lifecycle hooks.
pub trait Mapper<S, V>: Send + Sync {
    /// Materializes the view element for `source` at `index`.
    fn create(&self, source: &S, index: usize) -> Result<V, BoxError>;

    /// Refreshes `current` after its position changed to `index`.
    ///
    /// Returns `Ok(None)` when `current` is still valid; no replace event is
    /// emitted in that case. Only called when [`Mapper::can_update_index`]
    /// returns true.
    fn update(&self, current: &V, index: usize) -> Result<Option<V>, BoxError> {
        let _ = (current, index);
        Ok(None)
    }

    /// Called once for every element that leaves the view.
    fn remove(&self, source: &S, view: &V) {
        let _ = (source, view);
    }

    /// Whether materialized elements depend on their index.
    fn can_update_index(&self) -> bool {
        false
    }
}

type CreateFn<S, V> = dyn Fn(&S, usize) -> Result<V, BoxError> + Send + Sync;
type UpdateFn<V> = dyn Fn(&V, usize) -> Result<Option<V>, BoxError> + Send + Sync;
type RemoveFn<S, V> = dyn Fn(&S, &V) + Send + Sync;

/// A [`Mapper`] assembled from closures.
///
/// # Example
///
/// ```ignore
/// let mapper = FnMapper::new(|s: &i32, i| (i, *s * 10))
///     .with_update(|v: &(usize, i32), i| (v.0 != i).then(|| (i, v.1)))
///     .with_remove(|_, v| println!("released {v:?}"));
/// ```
pub struct FnMapper<S, V> {
    create: Arc<CreateFn<S, V>>,
    update: Option<Arc<UpdateFn<V>>>,
    remove: Option<Arc<RemoveFn<S, V>>>,
}

impl<S, V> Clone for FnMapper<S, V> {
    fn clone(&self) -> Self {
        Self {
            create: Arc::clone(&self.create),
            update: self.update.clone(),
            remove: self.remove.clone(),
        }
    }
}

impl<S, V> fmt::Debug for FnMapper<S, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMapper")
            .field("update", &self.update.is_some())
            .field("remove", &self.remove.is_some())
            .finish()
    }
}

impl<S: 'static, V: 'static> FnMapper<S, V> {
    /// Creates a mapper from an infallible creation function.
    pub fn new<F>(create: F) -> Self
    where
        F: Fn(&S, usize) -> V + Send + Sync + 'static,
    {
        Self::try_new(move |s, i| Ok(create(s, i)))
    }

    /// Creates a mapper from a fallible creation function.
    pub fn try_new<F>(create: F) -> Self
    where
        F: Fn(&S, usize) -> Result<V, BoxError> + Send + Sync + 'static,
    {
        Self {
            create: Arc::new(create),
            update: None,
            remove: None,
        }
    }

    /// Adds an index-aware update function. Return `None` to keep the element.
    pub fn with_update<F>(self, update: F) -> Self
    where
        F: Fn(&V, usize) -> Option<V> + Send + Sync + 'static,
    {
        self.with_try_update(move |v, i| Ok(update(v, i)))
    }

    /// Adds a fallible index-aware update function.
    pub fn with_try_update<F>(mut self, update: F) -> Self
    where
        F: Fn(&V, usize) -> Result<Option<V>, BoxError> + Send + Sync + 'static,
    {
        self.update = Some(Arc::new(update));
        self
    }

    /// Adds a removal callback.
    pub fn with_remove<F>(mut self, remove: F) -> Self
    where
        F: Fn(&S, &V) + Send + Sync + 'static,
    {
        self.remove = Some(Arc::new(remove));
        self
    }
}

impl<S, V> Mapper<S, V> for FnMapper<S, V> {
    fn create(&self, source: &S, index: usize) -> Result<V, BoxError> {
        (self.create)(source, index)
    }

    fn update(&self, current: &V, index: usize) -> Result<Option<V>, BoxError> {
        match &self.update {
            Some(update) => update(current, index),
            None => Ok(None),
        }
    }

    fn remove(&self, source: &S, view: &V) {
        if let Some(remove) = &self.remove {
            remove(source, view);
        }
    }

    fn can_update_index(&self) -> bool {
        self.update.is_some()
    }
}
