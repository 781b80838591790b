//! Card presence polling and detection.
//!
//! This module builds the presence/absence state machine on top of a
//! [`ReaderDriver`]: connecting with HID-then-named fallback, periodic
//! activation attempts, de-duplication of a card resting on the antenna,
//! and removal tracking. Continuous polling runs in a spawned task that
//! emits [`PollerEvent`]s over an mpsc channel; [`scan_once`] performs a
//! single bounded wait for the next card.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──connect()──► Connected ──start_polling()──► Polling
//!                         │                             │
//!                         └──────── stop() ◄────────────┘
//!                                     │
//!                                  Stopped
//! ```

use crate::driver::ReaderDriver;
use crate::error::{ReaderError, Result};
use std::time::Duration;
use tapgate_core::CardDetection;
use tapgate_core::constants::{
    ACTIVATE_MODE_IF_PRESENT, DEFAULT_POLL_INTERVAL_MS, DEFAULT_PRODUCT_ID,
    DEFAULT_SCAN_TIMEOUT_MS, DEFAULT_VENDOR_ID, FALLBACK_INTERFACE_NAME, REQ_CODE_WUPA,
    RESET_TIMEOUT_MS, SCAN_POLL_INTERVAL_MS,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Configuration for the card poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    /// USB vendor ID for the direct HID connection.
    pub vendor_id: u16,

    /// USB product ID for the direct HID connection.
    pub product_id: u16,

    /// Interface name used when the HID connection fails.
    pub fallback_interface: String,

    /// Interval between activation attempts.
    pub poll_interval: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            vendor_id: DEFAULT_VENDOR_ID,
            product_id: DEFAULT_PRODUCT_ID,
            fallback_interface: FALLBACK_INTERFACE_NAME.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

/// Lifecycle state of a [`CardPoller`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    /// Created, not connected.
    Idle,

    /// Connected to the reader, not polling.
    Connected,

    /// Continuous polling task is running.
    Polling,

    /// Polling has been stopped; the reader may still be connected.
    Stopped,
}

/// Which connection strategy succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionKind {
    /// Direct HID connection by vendor/product ID.
    Hid,

    /// Named-interface fallback.
    Named,
}

/// Event emitted by the polling loop.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum PollerEvent {
    /// A new card entered the field.
    ///
    /// Emitted once per presentation: while the same card rests on the
    /// antenna, subsequent reads are suppressed.
    CardDetected(CardDetection),

    /// The card left the field.
    CardRemoved {
        /// UID of the card that was removed.
        uid: String,
    },

    /// A driver-level error during one activation attempt.
    ///
    /// Polling continues after this event; only stopping the poller ends
    /// the stream.
    Error {
        /// Description of the failure.
        message: String,
    },
}

/// Polling/detection state machine over a reader driver.
///
/// Owns the driver for its whole lifecycle. Continuous polling consumes the
/// poller ([`start_polling`](Self::start_polling)) and hands it back through
/// [`PollerHandle::stop`], so the driver can be cleanly disconnected after
/// the task ends.
#[derive(Debug)]
pub struct CardPoller<D: ReaderDriver> {
    driver: D,
    config: PollerConfig,
    state: PollerState,
    connection: Option<ConnectionKind>,
    last_uid: Option<String>,
}

impl<D: ReaderDriver> CardPoller<D> {
    /// Create a poller over the given driver.
    pub fn new(driver: D, config: PollerConfig) -> Self {
        Self {
            driver,
            config,
            state: PollerState::Idle,
            connection: None,
            last_uid: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PollerState {
        self.state
    }

    /// Which connection strategy is active, if any.
    pub fn connection(&self) -> Option<ConnectionKind> {
        self.connection
    }

    /// Consume the poller, returning the driver.
    pub fn into_driver(self) -> D {
        self.driver
    }

    /// Connect to the reader.
    ///
    /// Tries the direct HID connection first, then the named-interface
    /// fallback. Fails with [`ReaderError::ConnectionFailed`] only when
    /// both strategies fail. A failing interface reset after connecting is
    /// logged and ignored; the reader usually recovers on the first
    /// activation.
    pub async fn connect(&mut self) -> Result<ConnectionKind> {
        let kind = match self
            .driver
            .open_reader(self.config.vendor_id, self.config.product_id, 0)
            .await
        {
            Ok(()) => ConnectionKind::Hid,
            Err(hid_err) => {
                debug!(error = %hid_err, "HID connection failed, trying named interface");
                match self
                    .driver
                    .open_named_interface(&self.config.fallback_interface)
                    .await
                {
                    Ok(()) => ConnectionKind::Named,
                    Err(named_err) => {
                        warn!(
                            hid_error = %hid_err,
                            named_error = %named_err,
                            "all connection strategies failed"
                        );
                        return Err(ReaderError::ConnectionFailed { attempts: 2 });
                    }
                }
            }
        };

        if let Err(e) = self.driver.reset_interface(RESET_TIMEOUT_MS).await {
            warn!(error = %e, "interface reset failed, continuing");
        }

        self.connection = Some(kind);
        self.state = PollerState::Connected;
        Ok(kind)
    }

    /// Disconnect from the reader.
    pub async fn disconnect(&mut self) -> Result<()> {
        match self.connection.take() {
            Some(ConnectionKind::Hid) => self.driver.close_reader().await?,
            Some(ConnectionKind::Named) => self.driver.close_named_interface().await?,
            None => {}
        }
        self.state = PollerState::Idle;
        self.last_uid = None;
        Ok(())
    }

    /// Perform one activation attempt and fold it into the presence state.
    ///
    /// Returns at most one event:
    /// - a card read with a UID differing from the last one yields
    ///   [`PollerEvent::CardDetected`]
    /// - a card read with the same UID as the last one yields nothing
    /// - an empty field after a tracked card yields [`PollerEvent::CardRemoved`]
    /// - a driver error yields [`PollerEvent::Error`] and keeps the
    ///   presence state untouched
    pub async fn tick(&mut self) -> Option<PollerEvent> {
        match self
            .driver
            .activate_card(ACTIVATE_MODE_IF_PRESENT, REQ_CODE_WUPA)
            .await
        {
            Ok(Some(frame)) => {
                let detection = match CardDetection::from_activation(&frame) {
                    Ok(d) => d,
                    Err(e) => {
                        return Some(PollerEvent::Error {
                            message: e.to_string(),
                        });
                    }
                };
                if self.last_uid.as_deref() == Some(detection.uid.as_str()) {
                    return None;
                }
                self.last_uid = Some(detection.uid.clone());
                debug!(uid = %detection.uid, kind = %detection.kind, "card detected");
                Some(PollerEvent::CardDetected(detection))
            }
            Ok(None) => self.last_uid.take().map(|uid| {
                debug!(%uid, "card removed");
                PollerEvent::CardRemoved { uid }
            }),
            Err(e) => Some(PollerEvent::Error {
                message: e.to_string(),
            }),
        }
    }

    /// Start continuous polling in a background task.
    ///
    /// Consumes the poller; events arrive on the returned receiver until
    /// [`PollerHandle::stop`] is called or the receiver is dropped. The
    /// poller must be connected.
    pub fn start_polling(mut self) -> Result<(PollerHandle<D>, mpsc::Receiver<PollerEvent>)>
    where
        D: 'static,
    {
        if self.state != PollerState::Connected {
            return Err(ReaderError::NotConnected);
        }
        self.state = PollerState::Polling;

        let (event_tx, event_rx) = mpsc::channel(32);
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let poll_interval = self.config.poll_interval;

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(poll_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = interval.tick() => {
                        if let Some(event) = self.tick().await
                            && event_tx.send(event).await.is_err()
                        {
                            // Consumer went away; stop polling.
                            break;
                        }
                    }
                }
            }

            self.state = PollerState::Stopped;
            self
        });

        Ok((
            PollerHandle {
                shutdown: shutdown_tx,
                task,
            },
            event_rx,
        ))
    }
}

/// Handle for a running polling task.
pub struct PollerHandle<D: ReaderDriver> {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<CardPoller<D>>,
}

impl<D: ReaderDriver> PollerHandle<D> {
    /// Stop the polling task and recover the poller.
    ///
    /// The returned poller is in [`PollerState::Stopped`] and still
    /// connected; call [`CardPoller::disconnect`] to release the reader.
    pub async fn stop(self) -> Result<CardPoller<D>> {
        let _ = self.shutdown.send(true);
        self.task.await.map_err(|_| ReaderError::ChannelClosed)
    }
}

/// Wait for a single card with a bounded timeout.
///
/// Connects, polls at the faster scan cadence until a card is read, and
/// disconnects on every exit path. De-duplication state is fresh for each
/// call, so a card already resting on the antenna is reported immediately.
/// Fails with [`ReaderError::ScanTimeout`] when no card appears in time.
pub async fn scan_once<D: ReaderDriver>(
    driver: D,
    config: PollerConfig,
    timeout: Option<Duration>,
) -> (D, Result<CardDetection>) {
    let timeout = timeout.unwrap_or(Duration::from_millis(DEFAULT_SCAN_TIMEOUT_MS));
    let mut poller = CardPoller::new(driver, config);

    if let Err(e) = poller.connect().await {
        return (poller.into_driver(), Err(e));
    }

    let result = tokio::time::timeout(timeout, async {
        let mut interval =
            tokio::time::interval(Duration::from_millis(SCAN_POLL_INTERVAL_MS));
        loop {
            interval.tick().await;
            match poller.tick().await {
                Some(PollerEvent::CardDetected(detection)) => return detection,
                Some(PollerEvent::Error { message }) => {
                    debug!(%message, "activation error during scan, retrying");
                }
                Some(PollerEvent::CardRemoved { .. }) | None => {}
            }
        }
    })
    .await;

    if let Err(e) = poller.disconnect().await {
        warn!(error = %e, "disconnect after scan failed");
    }

    let outcome = result.map_err(|_| ReaderError::ScanTimeout {
        timeout_ms: timeout.as_millis() as u64,
    });
    (poller.into_driver(), outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockDriver;
    use tapgate_core::CardKind;

    fn fast_config() -> PollerConfig {
        PollerConfig {
            poll_interval: Duration::from_millis(1),
            ..PollerConfig::default()
        }
    }

    const UID_A: [u8; 7] = [0x04, 0xA1, 0xB2, 0xC3, 0xD4, 0xE5, 0xF6];
    const UID_B: [u8; 7] = [0x04, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66];

    #[tokio::test]
    async fn test_connect_prefers_hid() {
        let (driver, _handle) = MockDriver::new();
        let mut poller = CardPoller::new(driver, fast_config());

        let kind = poller.connect().await.unwrap();
        assert_eq!(kind, ConnectionKind::Hid);
        assert_eq!(poller.state(), PollerState::Connected);
    }

    #[tokio::test]
    async fn test_connect_falls_back_to_named_interface() {
        let (driver, _handle) = MockDriver::with_interfaces(false, true);
        let mut poller = CardPoller::new(driver, fast_config());

        let kind = poller.connect().await.unwrap();
        assert_eq!(kind, ConnectionKind::Named);
    }

    #[tokio::test]
    async fn test_connect_fails_after_both_strategies() {
        let (driver, _handle) = MockDriver::with_interfaces(false, false);
        let mut poller = CardPoller::new(driver, fast_config());

        match poller.connect().await {
            Err(ReaderError::ConnectionFailed { attempts: 2 }) => {}
            other => panic!("expected ConnectionFailed, got {:?}", other),
        }
        assert_eq!(poller.state(), PollerState::Idle);
    }

    #[tokio::test]
    async fn test_tick_deduplicates_resting_card() {
        let (driver, handle) = MockDriver::new();
        let mut poller = CardPoller::new(driver, fast_config());
        poller.connect().await.unwrap();

        // Same card on the antenna across three reads.
        handle.push_card(&UID_A);
        handle.push_card(&UID_A);
        handle.push_card(&UID_A);

        let first = poller.tick().await;
        assert!(matches!(first, Some(PollerEvent::CardDetected(_))));
        assert!(poller.tick().await.is_none());
        assert!(poller.tick().await.is_none());
    }

    #[tokio::test]
    async fn test_tick_pairs_detection_with_removal() {
        let (driver, handle) = MockDriver::new();
        let mut poller = CardPoller::new(driver, fast_config());
        poller.connect().await.unwrap();

        handle.push_card(&UID_A);
        handle.push_empty();
        handle.push_empty();

        let detected = match poller.tick().await {
            Some(PollerEvent::CardDetected(d)) => d,
            other => panic!("expected detection, got {:?}", other),
        };
        assert_eq!(detected.kind, CardKind::Ntag424);

        match poller.tick().await {
            Some(PollerEvent::CardRemoved { uid }) => assert_eq!(uid, detected.uid),
            other => panic!("expected removal, got {:?}", other),
        }

        // Field stays empty: no further events.
        assert!(poller.tick().await.is_none());
    }

    #[tokio::test]
    async fn test_tick_reports_each_distinct_card() {
        let (driver, handle) = MockDriver::new();
        let mut poller = CardPoller::new(driver, fast_config());
        poller.connect().await.unwrap();

        handle.push_card(&UID_A);
        handle.push_card(&UID_B);

        let a = poller.tick().await;
        let b = poller.tick().await;
        match (a, b) {
            (
                Some(PollerEvent::CardDetected(first)),
                Some(PollerEvent::CardDetected(second)),
            ) => assert_ne!(first.uid, second.uid),
            other => panic!("expected two detections, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_tick_survives_driver_errors() {
        let (driver, handle) = MockDriver::new();
        let mut poller = CardPoller::new(driver, fast_config());
        poller.connect().await.unwrap();

        handle.push_failure(-4);
        handle.push_card(&UID_A);

        assert!(matches!(
            poller.tick().await,
            Some(PollerEvent::Error { .. })
        ));
        // The error did not poison the state machine.
        assert!(matches!(
            poller.tick().await,
            Some(PollerEvent::CardDetected(_))
        ));
    }

    #[tokio::test]
    async fn test_start_polling_requires_connection() {
        let (driver, _handle) = MockDriver::new();
        let poller = CardPoller::new(driver, fast_config());

        assert!(matches!(
            poller.start_polling(),
            Err(ReaderError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_polling_task_emits_and_stops() {
        let (driver, handle) = MockDriver::new();
        let mut poller = CardPoller::new(driver, fast_config());
        poller.connect().await.unwrap();

        handle.push_card(&UID_A);

        let (poller_handle, mut events) = poller.start_polling().unwrap();

        match events.recv().await {
            Some(PollerEvent::CardDetected(d)) => assert_eq!(d.uid_length, 7),
            other => panic!("expected detection, got {:?}", other),
        }

        let mut poller = poller_handle.stop().await.unwrap();
        assert_eq!(poller.state(), PollerState::Stopped);
        poller.disconnect().await.unwrap();
        assert_eq!(poller.state(), PollerState::Idle);
    }

    #[tokio::test]
    async fn test_scan_once_returns_first_card() {
        let (driver, handle) = MockDriver::new();
        handle.push_empty();
        handle.push_card(&UID_A);

        let (driver, result) = scan_once(
            driver,
            fast_config(),
            Some(Duration::from_millis(500)),
        )
        .await;

        let detection = result.unwrap();
        assert_eq!(detection.kind, CardKind::Ntag424);
        // scan_once disconnects on exit.
        assert!(!driver.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_once_times_out() {
        let (driver, _handle) = MockDriver::new();

        // Mock with no scripted cards reads as a permanently empty field.
        let (driver, result) = scan_once(
            driver,
            fast_config(),
            Some(Duration::from_millis(50)),
        )
        .await;

        match result {
            Err(ReaderError::ScanTimeout { timeout_ms: 50 }) => {}
            other => panic!("expected timeout, got {:?}", other),
        }
        assert!(!driver.is_connected());
    }
}
