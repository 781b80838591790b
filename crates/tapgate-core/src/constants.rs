//! Shared constants for reader access and the simulated fallback.
//!
//! The vendor/product identifiers and activation parameters match the
//! XT-N424 WR desktop reader this system was built around. They are
//! centralized here so the poller, the scan endpoint and the tests all
//! agree on the same values.

/// USB vendor ID of the reader's HID interface (ST Microelectronics).
pub const DEFAULT_VENDOR_ID: u16 = 0x0483;

/// USB product ID of the reader's HID interface.
pub const DEFAULT_PRODUCT_ID: u16 = 0x5750;

/// Named interface tried when the direct HID connection fails.
pub const FALLBACK_INTERFACE_NAME: &str = "ACS ACR122U PICC Interface";

/// Activation mode: activate a card if one is present in the field.
pub const ACTIVATE_MODE_IF_PRESENT: u8 = 0x00;

/// ISO 14443-A WUPA (wake-up) request code used on every poll tick.
pub const REQ_CODE_WUPA: u8 = 0x52;

/// Interface reset timeout passed to the driver on connect, in milliseconds.
pub const RESET_TIMEOUT_MS: u8 = 1;

/// Default interval between poll ticks, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 300;

/// Faster interval used by on-demand single-shot scans.
pub const SCAN_POLL_INTERVAL_MS: u64 = 200;

/// Default window for an on-demand scan before it times out.
pub const DEFAULT_SCAN_TIMEOUT_MS: u64 = 10_000;

/// Fixed delay before the simulated reader reports a detection.
pub const SIMULATED_DELAY_MS: u64 = 2_000;

/// Reader model name reported in access events and scan responses.
pub const READER_TYPE: &str = "XT-N424-WR";

/// Pool of plausible 7-byte NTAG424 UIDs served by the simulated reader.
pub const SIMULATED_UIDS: [&str; 5] = [
    "04A1B2C3D4E5F6",
    "041A2B3C4D5E6F",
    "04ABCDEF123456",
    "04DEADBEEFCAFE",
    "04BADCAFFEEDFA",
];
