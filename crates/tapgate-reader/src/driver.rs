//! Reader driver contract and capability detection.
//!
//! The vendor driver for the XT-N424 WR is an external capability: a native
//! library that may be missing, busy, or absent on the current platform.
//! This module defines the [`ReaderDriver`] trait the rest of the system is
//! written against, an explicit [`probe_driver`] capability check performed
//! at startup, and the [`AnyReaderDriver`] enum used for dispatch where a
//! concrete driver type is not known at compile time.

use crate::error::{ReaderError, Result};
use crate::mock::MockDriver;
use crate::simulated::SimulatedDriver;
use std::future::Future;
use tapgate_core::ActivationData;

/// Contract for a card reader driver.
///
/// Mirrors the vendor library's entry points: an HID-style direct connection,
/// a named-interface fallback, an interface reset, and ISO 14443-A card
/// activation. Implementations map vendor status codes to
/// [`ReaderError::Driver`](crate::ReaderError::Driver).
///
/// Methods are spelled as `impl Future + Send` rather than `async fn` so the
/// polling task can be spawned onto the runtime for any driver type;
/// implementations still write plain `async fn`. The trait is not
/// object-safe: use generics, or [`AnyReaderDriver`] for enum dispatch.
pub trait ReaderDriver: Send {
    /// Open the reader over its HID interface.
    fn open_reader(
        &mut self,
        vendor_id: u16,
        product_id: u16,
        flags: u8,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Close the HID connection.
    fn close_reader(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Open the reader through a named interface (PC/SC style fallback).
    fn open_named_interface(&mut self, name: &str) -> impl Future<Output = Result<()>> + Send;

    /// Close the named-interface connection.
    fn close_named_interface(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Reset the contactless interface.
    fn reset_interface(&mut self, timeout_ms: u8) -> impl Future<Output = Result<()>> + Send;

    /// Try to activate a card in the field.
    ///
    /// Returns `Ok(None)` when no card is present, `Ok(Some(frame))` with
    /// the raw activation data when one is, and an error only for
    /// driver-level failures.
    fn activate_card(
        &mut self,
        mode: u8,
        req_code: u8,
    ) -> impl Future<Output = Result<Option<ActivationData>>> + Send;
}

/// Result of probing for the vendor driver binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverProbe {
    /// The vendor binding can be loaded on this host.
    Available,

    /// No binding; callers should fall back to [`SimulatedDriver`].
    Unavailable {
        /// Why the binding is not usable.
        reason: String,
    },
}

impl DriverProbe {
    /// Check whether real hardware can be driven.
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available)
    }

    /// Turn an unavailable probe into its error, for callers that require
    /// real hardware instead of falling back.
    pub fn require(self) -> Result<()> {
        match self {
            Self::Available => Ok(()),
            Self::Unavailable { reason } => Err(ReaderError::unavailable(reason)),
        }
    }
}

/// Probe for the vendor driver binding.
///
/// This is a deliberate capability-detection step rather than a catch-around
/// a dynamic load: the binding only exists behind the `hardware-vendor`
/// feature on Windows, so everywhere else the probe reports `Unavailable`
/// and the caller switches to the simulated driver.
pub fn probe_driver() -> DriverProbe {
    #[cfg(all(target_os = "windows", feature = "hardware-vendor"))]
    {
        DriverProbe::Available
    }

    #[cfg(not(all(target_os = "windows", feature = "hardware-vendor")))]
    {
        let reason = if cfg!(target_os = "windows") {
            "vendor driver support not compiled in (hardware-vendor feature disabled)"
        } else {
            "vendor driver is only available on Windows"
        };
        DriverProbe::Unavailable {
            reason: reason.to_string(),
        }
    }
}

/// Enum wrapper for reader driver dispatch.
///
/// The driver trait's methods return opaque futures and are not object-safe,
/// so heterogeneous call sites dispatch over this enum instead of
/// `Box<dyn ReaderDriver>`.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyReaderDriver {
    /// Simulated driver (no hardware required).
    Simulated(SimulatedDriver),

    /// Scriptable driver for tests.
    Mock(MockDriver),
    // Planned variant once the vendor binding lands:
    // - Vendor(VendorDriver) behind the hardware-vendor feature
}

impl ReaderDriver for AnyReaderDriver {
    async fn open_reader(&mut self, vendor_id: u16, product_id: u16, flags: u8) -> Result<()> {
        match self {
            Self::Simulated(d) => d.open_reader(vendor_id, product_id, flags).await,
            Self::Mock(d) => d.open_reader(vendor_id, product_id, flags).await,
        }
    }

    async fn close_reader(&mut self) -> Result<()> {
        match self {
            Self::Simulated(d) => d.close_reader().await,
            Self::Mock(d) => d.close_reader().await,
        }
    }

    async fn open_named_interface(&mut self, name: &str) -> Result<()> {
        match self {
            Self::Simulated(d) => d.open_named_interface(name).await,
            Self::Mock(d) => d.open_named_interface(name).await,
        }
    }

    async fn close_named_interface(&mut self) -> Result<()> {
        match self {
            Self::Simulated(d) => d.close_named_interface().await,
            Self::Mock(d) => d.close_named_interface().await,
        }
    }

    async fn reset_interface(&mut self, timeout_ms: u8) -> Result<()> {
        match self {
            Self::Simulated(d) => d.reset_interface(timeout_ms).await,
            Self::Mock(d) => d.reset_interface(timeout_ms).await,
        }
    }

    async fn activate_card(&mut self, mode: u8, req_code: u8) -> Result<Option<ActivationData>> {
        match self {
            Self::Simulated(d) => d.activate_card(mode, req_code).await,
            Self::Mock(d) => d.activate_card(mode, req_code).await,
        }
    }
}
