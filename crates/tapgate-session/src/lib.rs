//! Card session coordination for Tapgate.
//!
//! This crate sits between the reader layer and storage: a
//! [`SessionCoordinator`] drives a poller over one reader, resolves each
//! detection against the enrollment cache and the database, writes the
//! audit trail, and emits typed [`CoordinatorEvent`]s for consumers.
//!
//! - [`coordinator`] - the coordinator itself and its pipeline task
//! - [`events`] - the outbound event type
//! - [`cache`] - the manually-invalidated enrollment cache
//! - [`attendance`] - the badge-in/badge-out toggle
//! - [`options`] - per-session behavioral switches

pub mod attendance;
pub mod cache;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod options;

pub use cache::EnrollmentCache;
pub use coordinator::{SessionCoordinator, SessionStatus};
pub use error::{Result, SessionError};
pub use events::CoordinatorEvent;
pub use options::SessionOptions;
