//! Simulated reader driver.
//!
//! When the vendor binding is unavailable (non-Windows host, missing DLL)
//! the system must still be usable end-to-end: card verification, issuance
//! flows and the attendance pipeline are exercised against this driver
//! instead of hardware. Its responses are structurally identical to real
//! ones - downstream code never branches on real-vs-simulated; only the
//! HTTP layer tags simulated scans with a note.

use crate::driver::ReaderDriver;
use crate::error::{ReaderError, Result};
use std::time::Duration;
use tapgate_core::constants::{SIMULATED_DELAY_MS, SIMULATED_UIDS};
use tapgate_core::{ActivationData, CoreError};

/// Simulated card reader.
///
/// Cycles through a fixed pool of plausible NTAG424 UIDs. Each card is
/// reported for two consecutive activation calls and then leaves the field
/// for one, so consumers see realistic presence, de-duplication and removal
/// transitions.
#[derive(Debug)]
pub struct SimulatedDriver {
    delay: Duration,
    calls: u64,
    pool_index: usize,
    open: bool,
}

impl SimulatedDriver {
    /// Create a simulated driver with the standard fixed delay.
    pub fn new() -> Self {
        Self::with_delay(Duration::from_millis(SIMULATED_DELAY_MS))
    }

    /// Create a simulated driver with a custom activation delay.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            calls: 0,
            pool_index: 0,
            open: false,
        }
    }

    fn current_activation(&self) -> Result<ActivationData> {
        let uid_hex = SIMULATED_UIDS[self.pool_index % SIMULATED_UIDS.len()];
        let bytes = decode_hex(uid_hex)
            .ok_or_else(|| ReaderError::from(CoreError::InvalidUid(uid_hex.to_string())))?;
        // NTAG424 answers ATQ 0x0044 (low byte first) with SAK 0x00.
        Ok(ActivationData::from_uid_bytes(&bytes, [0x44, 0x00], 0x00)?)
    }
}

impl Default for SimulatedDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl ReaderDriver for SimulatedDriver {
    async fn open_reader(&mut self, _vendor_id: u16, _product_id: u16, _flags: u8) -> Result<()> {
        self.open = true;
        Ok(())
    }

    async fn close_reader(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }

    async fn open_named_interface(&mut self, _name: &str) -> Result<()> {
        self.open = true;
        Ok(())
    }

    async fn close_named_interface(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }

    async fn reset_interface(&mut self, _timeout_ms: u8) -> Result<()> {
        Ok(())
    }

    async fn activate_card(&mut self, _mode: u8, _req_code: u8) -> Result<Option<ActivationData>> {
        if !self.open {
            return Err(ReaderError::NotConnected);
        }

        tokio::time::sleep(self.delay).await;

        let phase = self.calls % 3;
        self.calls += 1;

        // Two presence reads, one empty read, then the next pool card.
        if phase == 2 {
            self.pool_index = (self.pool_index + 1) % SIMULATED_UIDS.len();
            return Ok(None);
        }

        self.current_activation().map(Some)
    }
}

fn decode_hex(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
        .collect()
}
