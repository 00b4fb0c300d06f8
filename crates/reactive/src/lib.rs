//! syncview reactive - live views over observable collections.
//!
//! This crate ties the synchronizer to a source and to subscribers. A view
//! listens to its source, buffers the changes for a configurable window and
//! re-announces them, translated through its transform, as notifications.
//!
//! # Core Concepts
//!
//! - `View`: a derived, read-only collection (`BufferedView`, `FilteredView`,
//!   `MappedView`)
//! - `ViewBuilder` / `ViewConfig`: construction and per-view settings
//! - `ChangeBuffer`: the time-windowed queue of pending source changes
//! - `ObservableList`: a shared vector that announces its mutations
//! - `ManualTrigger`: forces a refresh on demand
//! - `ImmediateScheduler`, `ManualScheduler`, `ThreadScheduler`: flush timing
//!
//! # Example
//!
//! ```ignore
//! use syncview_reactive::{Notification, ObservableList, ViewBuilder};
//!
//! let list = ObservableList::from_vec(vec![1, 2, 3]);
//! let view = ViewBuilder::new().source(list.clone()).build()?;
//!
//! view.subscribe(|n| {
//!     if let Notification::Collection(change) = n {
//!         println!("{:?}", change);
//!     }
//! })?;
//!
//! list.push(4); // prints Add { item: 4, index: 3 }
//! ```

pub mod buffer;
pub mod builder;
pub mod list;
pub mod scheduler;
pub mod trigger;
pub mod view;

pub use buffer::{ChangeBuffer, DrainTransaction};
pub use builder::{ViewBuilder, ViewConfig};
pub use list::ObservableList;
pub use scheduler::{ImmediateScheduler, ManualScheduler, ThreadScheduler};
pub use trigger::ManualTrigger;
pub use view::{BufferedView, FilteredView, MappedView, View};

// Re-export commonly used types from dependencies
pub use syncview_core::{
    ChangeEvent, Error, Notification, Result, Scheduler, Source, Subscription, SubscriptionId,
    Trigger,
};
pub use syncview_incremental::{Filter, FnMapper, Identity, Map, Mapper, Transform};
