//! syncview incremental - keeps a materialized view in step with its source.
//!
//! This crate implements the reconciliation engine behind syncview views. A
//! `Synchronizer` owns the materialized elements of one view and, given the
//! changes buffered since the last refresh, either patches them in place or
//! recomputes them from a snapshot of the source.
//!
//! # Core Concepts
//!
//! - `Tracker`: the materialized `(source, value)` entries, in view order
//! - `Transform`: the element strategy (`Identity`, `Filter`, `Map`)
//! - `Mapper`: create/update/remove hooks used by `Map`
//! - `Synchronizer`: chooses between the patch and recompute paths
//!
//! # Example
//!
//! ```ignore
//! use syncview_core::ChangeEvent;
//! use syncview_incremental::{FnMapper, Map, Synchronizer};
//!
//! let mapper = FnMapper::new(|s: &i32, i| format!("{i}:{s}"));
//! let mut sync = Synchronizer::new(Map::new(mapper));
//! sync.populate(vec![10, 20])?;
//!
//! let changes = sync.refresh(vec![ChangeEvent::add(30, 2)], || Ok(vec![10, 20, 30]))?;
//! assert_eq!(changes, vec![ChangeEvent::add("2:30".to_string(), 2)]);
//! ```

pub mod mapper;
pub mod synchronizer;
pub mod tracker;
pub mod transform;

pub use mapper::{FnMapper, Mapper};
pub use synchronizer::Synchronizer;
pub use tracker::{Entry, Tracker};
pub use transform::{Filter, Identity, Map, PatchMode, Predicate, Transform};

// Re-export commonly used types from dependencies
pub use syncview_core::{BoxError, ChangeEvent, Error, Result};
