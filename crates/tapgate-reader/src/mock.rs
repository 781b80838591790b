//! Scriptable mock driver for testing.
//!
//! The mock is controlled through a [`MockDriverHandle`]: tests enqueue one
//! outcome per activation call (a card, an empty field, or a driver
//! failure) and can make either connection strategy fail to exercise the
//! poller's fallback logic. An exhausted script reads as an empty field.

use crate::driver::ReaderDriver;
use crate::error::{ReaderError, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use tapgate_core::ActivationData;

/// One scripted outcome of an `activate_card` call.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// A card is in the field.
    Card(ActivationData),

    /// The field is empty.
    Empty,

    /// The driver fails with the given status code.
    Fail(i32),
}

/// Scriptable reader driver.
#[derive(Debug)]
pub struct MockDriver {
    script: Arc<Mutex<VecDeque<MockResponse>>>,
    hid_available: bool,
    named_available: bool,
    connected: bool,
}

impl MockDriver {
    /// Create a mock driver and the handle that scripts it.
    pub fn new() -> (Self, MockDriverHandle) {
        Self::with_interfaces(true, true)
    }

    /// Create a mock driver with controllable connection strategies.
    ///
    /// `hid_available` and `named_available` decide whether `open_reader`
    /// and `open_named_interface` succeed.
    pub fn with_interfaces(hid_available: bool, named_available: bool) -> (Self, MockDriverHandle) {
        let script = Arc::new(Mutex::new(VecDeque::new()));
        let driver = Self {
            script: Arc::clone(&script),
            hid_available,
            named_available,
            connected: false,
        };
        (driver, MockDriverHandle { script })
    }

    /// Whether a connection is currently open.
    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

impl ReaderDriver for MockDriver {
    async fn open_reader(&mut self, _vendor_id: u16, _product_id: u16, _flags: u8) -> Result<()> {
        if !self.hid_available {
            return Err(ReaderError::driver("open_reader", -1));
        }
        self.connected = true;
        Ok(())
    }

    async fn close_reader(&mut self) -> Result<()> {
        self.connected = false;
        Ok(())
    }

    async fn open_named_interface(&mut self, _name: &str) -> Result<()> {
        if !self.named_available {
            return Err(ReaderError::driver("open_named_interface", -1));
        }
        self.connected = true;
        Ok(())
    }

    async fn close_named_interface(&mut self) -> Result<()> {
        self.connected = false;
        Ok(())
    }

    async fn reset_interface(&mut self, _timeout_ms: u8) -> Result<()> {
        Ok(())
    }

    async fn activate_card(&mut self, _mode: u8, _req_code: u8) -> Result<Option<ActivationData>> {
        if !self.connected {
            return Err(ReaderError::NotConnected);
        }

        let next = self
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        match next {
            Some(MockResponse::Card(data)) => Ok(Some(data)),
            Some(MockResponse::Empty) | None => Ok(None),
            Some(MockResponse::Fail(code)) => Err(ReaderError::driver("activate_card", code)),
        }
    }
}

/// Handle for scripting a [`MockDriver`].
///
/// Clonable; pushes are visible to the driver immediately, so tests can feed
/// cards while a polling task is running.
#[derive(Debug, Clone)]
pub struct MockDriverHandle {
    script: Arc<Mutex<VecDeque<MockResponse>>>,
}

impl MockDriverHandle {
    /// Enqueue a card presence with the given UID bytes.
    pub fn push_card(&self, uid: &[u8]) {
        self.push_card_with(uid, [0x44, 0x00], 0x00);
    }

    /// Enqueue a card presence with explicit ATQ and SAK.
    pub fn push_card_with(&self, uid: &[u8], atq: [u8; 2], sak: u8) {
        let data = ActivationData::from_uid_bytes(uid, atq, sak)
            .expect("mock card UID must be 1-10 bytes");
        self.push(MockResponse::Card(data));
    }

    /// Enqueue an empty-field read.
    pub fn push_empty(&self) {
        self.push(MockResponse::Empty);
    }

    /// Enqueue a driver failure.
    pub fn push_failure(&self, code: i32) {
        self.push(MockResponse::Fail(code));
    }

    /// Enqueue a raw response.
    pub fn push(&self, response: MockResponse) {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(response);
    }

    /// Number of scripted responses not yet consumed.
    pub fn pending(&self) -> usize {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
