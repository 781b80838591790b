//! Core types for the Tapgate card-session coordinator.
//!
//! This crate holds the pieces shared by every other Tapgate crate: the
//! decoded activation frame produced by a reader driver, the card type
//! classification rules, and the detection record that flows from the poller
//! through the session pipeline.

pub mod card;
pub mod constants;
pub mod error;

pub use card::{ActivationData, CardDetection, CardKind, manufacturer_for_uid};
pub use error::{CoreError, Result};

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
