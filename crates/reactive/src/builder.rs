//! View configuration and construction.
//!
//! ```ignore
//! use std::time::Duration;
//! use syncview_reactive::{ObservableList, ViewBuilder};
//!
//! let list = ObservableList::from_vec(vec![1, 2, 3]);
//! let view = ViewBuilder::new()
//!     .source(list.clone())
//!     .buffer_duration(Duration::from_millis(100))
//!     .build_filtered(|x: &i32| x % 2 == 1)?;
//! ```

use crate::scheduler::ThreadScheduler;
use crate::view::{BufferedView, FilteredView, MappedView, View};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use syncview_core::{Error, Result, Scheduler, Source, Trigger};
use syncview_incremental::{Filter, Identity, Map, Mapper, Predicate, Transform};

/// Per-view settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ViewConfig {
    /// How long source changes are held before being applied. Zero applies
    /// every change on the thread that made it.
    pub buffer_duration: Duration,
    /// Keep the source alive when the view is disposed.
    pub leave_open: bool,
}

impl ViewConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer_duration(mut self, duration: Duration) -> Self {
        self.buffer_duration = duration;
        self
    }

    pub fn leave_open(mut self, leave_open: bool) -> Self {
        self.leave_open = leave_open;
        self
    }
}

/// Collects a source, scheduler, triggers and config, then builds a view.
pub struct ViewBuilder<S> {
    source: Option<Arc<dyn Source<S>>>,
    scheduler: Option<Arc<dyn Scheduler>>,
    triggers: Vec<Arc<dyn Trigger>>,
    config: ViewConfig,
}

impl<S> Default for ViewBuilder<S> {
    fn default() -> Self {
        Self {
            source: None,
            scheduler: None,
            triggers: Vec::new(),
            config: ViewConfig::default(),
        }
    }
}

impl<S> fmt::Debug for ViewBuilder<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewBuilder")
            .field("has_source", &self.source.is_some())
            .field("has_scheduler", &self.scheduler.is_some())
            .field("triggers", &self.triggers.len())
            .field("config", &self.config)
            .finish()
    }
}

impl<S> ViewBuilder<S>
where
    S: Clone + PartialEq + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the source the view mirrors.
    pub fn source<T>(self, source: T) -> Self
    where
        T: Source<S> + 'static,
    {
        self.source_arc(Arc::new(source))
    }

    /// Sets an already shared source.
    pub fn source_arc(mut self, source: Arc<dyn Source<S>>) -> Self {
        self.source = Some(source);
        self
    }

    /// Sets the scheduler used for buffered flushes. Defaults to
    /// [`ThreadScheduler`], which flushes on a background thread.
    pub fn scheduler<T>(self, scheduler: T) -> Self
    where
        T: Scheduler + 'static,
    {
        self.scheduler_arc(Arc::new(scheduler))
    }

    pub fn scheduler_arc(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Adds a trigger; each emission forces a refresh.
    pub fn trigger<T>(self, trigger: T) -> Self
    where
        T: Trigger + 'static,
    {
        self.trigger_arc(Arc::new(trigger))
    }

    pub fn trigger_arc(mut self, trigger: Arc<dyn Trigger>) -> Self {
        self.triggers.push(trigger);
        self
    }

    pub fn config(mut self, config: ViewConfig) -> Self {
        self.config = config;
        self
    }

    pub fn buffer_duration(mut self, duration: Duration) -> Self {
        self.config.buffer_duration = duration;
        self
    }

    pub fn leave_open(mut self, leave_open: bool) -> Self {
        self.config.leave_open = leave_open;
        self
    }

    /// Builds a view applying `transform`.
    pub fn build_with<X>(self, transform: X) -> Result<View<S, X>>
    where
        X: Transform<S>,
    {
        let source = self.source.ok_or_else(|| Error::invalid_argument("source"))?;
        let scheduler = self
            .scheduler
            .unwrap_or_else(|| Arc::new(ThreadScheduler) as Arc<dyn Scheduler>);
        View::new(
            source,
            transform,
            scheduler,
            self.triggers,
            self.config.buffer_duration,
            self.config.leave_open,
        )
    }

    /// Builds a view mirroring the source unchanged.
    pub fn build(self) -> Result<BufferedView<S>> {
        self.build_with(Identity)
    }

    /// Builds a view showing the source elements that satisfy `predicate`.
    pub fn build_filtered<F>(self, predicate: F) -> Result<FilteredView<S>>
    where
        F: Fn(&S) -> bool + Send + Sync + 'static,
    {
        self.build_with(Filter::new(predicate))
    }

    /// Like [`ViewBuilder::build_filtered`] for an optional shared predicate.
    pub fn build_filtered_arc(
        self,
        predicate: Option<Arc<Predicate<S>>>,
    ) -> Result<FilteredView<S>> {
        let predicate = predicate.ok_or_else(|| Error::invalid_argument("predicate"))?;
        self.build_with(Filter::from_arc(predicate))
    }

    /// Builds a view showing one `mapper`-created element per source element.
    pub fn build_mapped<V, M>(self, mapper: M) -> Result<MappedView<S, V>>
    where
        V: Clone + Send + Sync + 'static,
        M: Mapper<S, V> + 'static,
    {
        self.build_with(Map::new(mapper))
    }

    /// Like [`ViewBuilder::build_mapped`] for an optional shared mapper.
    pub fn build_mapped_arc<V>(
        self,
        mapper: Option<Arc<dyn Mapper<S, V>>>,
    ) -> Result<MappedView<S, V>>
    where
        V: Clone + Send + Sync + 'static,
    {
        let mapper = mapper.ok_or_else(|| Error::invalid_argument("mapper"))?;
        self.build_with(Map::from_arc(mapper))
    }
}
