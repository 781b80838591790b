//! Reader access for the Tapgate card-session coordinator.
//!
//! This crate wraps the vendor card-reader driver behind the [`ReaderDriver`]
//! trait and builds the polling/detection state machine on top of it:
//!
//! - [`driver`] - the driver contract, capability probing and enum dispatch
//! - [`simulated`] - the fallback driver used when no hardware binding is
//!   available
//! - [`mock`] - a scriptable driver for tests
//! - [`poller`] - presence/absence state machine, de-duplication, interval
//!   polling and single-shot scans
//!
//! All device traits use native `async fn` methods (Edition 2024 RPITIT),
//! so dynamic dispatch goes through the [`driver::AnyReaderDriver`] enum
//! rather than trait objects.

pub mod driver;
pub mod error;
pub mod mock;
pub mod poller;
pub mod simulated;

pub use driver::{AnyReaderDriver, DriverProbe, ReaderDriver, probe_driver};
pub use error::{ReaderError, Result};
pub use poller::{
    CardPoller, ConnectionKind, PollerConfig, PollerEvent, PollerHandle, PollerState, scan_once,
};
pub use simulated::SimulatedDriver;
