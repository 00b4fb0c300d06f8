//! syncview core - change events and collaborator contracts.
//!
//! This crate defines the vocabulary shared by the synchronizer and the
//! reactive views built on top of it.
//!
//! # Core Concepts
//!
//! - `ChangeEvent`: one structural mutation of an ordered sequence
//! - `Notification`: what a view announces to its subscribers
//! - `SubscriberList` / `Subscription`: listener registry and RAII detach handle
//! - `Source`, `Trigger`, `Scheduler`: contracts for external collaborators
//!
//! # Example
//!
//! ```ignore
//! use syncview_core::{notifications_for, ChangeEvent, Notification};
//!
//! let n = notifications_for(vec![ChangeEvent::add(4, 3)]);
//! assert_eq!(n[0], Notification::CountChanged);
//! assert_eq!(n[1], Notification::IndexerChanged);
//! ```

pub mod change;
pub mod error;
pub mod notify;
pub mod source;
pub mod subscription;

pub use change::{ChangeEvent, ChangeKind};
pub use error::{BoxError, Error, Result};
pub use notify::{notifications_for, notifications_for_change, Notification};
pub use source::{Action, Scheduler, Source, SourceListener, Trigger, TriggerCallback};
pub use subscription::{Callback, SubscriberList, Subscription, SubscriptionId};
