//! Card session coordinator.
//!
//! A [`SessionCoordinator`] owns one reader driver and one database handle
//! and turns raw poller events into the domain pipeline: card resolution,
//! enrollment lookup through the cache, the audit trail, attendance and
//! wallet side-effects. One pipeline task drains the poller channel, so
//! detections are processed strictly one at a time.
//!
//! State is per-instance; two coordinators over the same database share
//! nothing but the rows.

use crate::attendance;
use crate::cache::EnrollmentCache;
use crate::error::{Result, SessionError};
use crate::events::CoordinatorEvent;
use crate::options::SessionOptions;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tapgate_core::CardDetection;
use tapgate_core::constants::READER_TYPE;
use tapgate_reader::{CardPoller, PollerConfig, PollerEvent, PollerHandle, ReaderDriver};
use tapgate_storage::{
    AccessEventRepository, AccessResult, CardRepository, Database, Enrollment,
    EnrollmentRepository, NewAccessEvent, NewEnrollment, SqliteAccessEventRepository,
    SqliteAttendanceRepository, SqliteCardRepository, SqliteEnrollmentRepository,
    SqliteUserRepository, SqliteWalletRepository, StorageError, User, UserRepository,
    WalletRepository,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Infallible snapshot of a coordinator's state.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionStatus {
    /// Whether the poll loop and pipeline are running.
    pub is_running: bool,

    /// Whether the reader is currently connected.
    pub reader_connected: bool,

    /// Institution the session is scoped to, once initialized.
    pub institution_id: Option<i64>,

    /// Number of cached active enrollments.
    pub cache_size: usize,

    /// The options this session was built with.
    pub options: SessionOptions,
}

struct RunningSession<D: ReaderDriver + 'static> {
    poller: PollerHandle<D>,
    pipeline: JoinHandle<()>,
}

/// Coordinates one reader, one institution and the detection pipeline.
pub struct SessionCoordinator<D: ReaderDriver + 'static> {
    db: Database,
    options: SessionOptions,
    events: mpsc::Sender<CoordinatorEvent>,
    cache: Arc<Mutex<EnrollmentCache>>,
    operator: Option<User>,
    institution_id: Option<i64>,
    driver: Option<D>,
    running: Option<RunningSession<D>>,
}

impl<D: ReaderDriver + 'static> SessionCoordinator<D> {
    /// Create a coordinator and the channel its events arrive on.
    pub fn new(
        db: Database,
        driver: D,
        options: SessionOptions,
    ) -> (Self, mpsc::Receiver<CoordinatorEvent>) {
        let (events, event_rx) = mpsc::channel(64);
        let coordinator = Self {
            db,
            options,
            events,
            cache: Arc::new(Mutex::new(EnrollmentCache::new())),
            operator: None,
            institution_id: None,
            driver: Some(driver),
            running: None,
        };
        (coordinator, event_rx)
    }

    /// Resolve the operator and the institution this session is scoped to.
    ///
    /// # Errors
    ///
    /// [`SessionError::InstitutionNotFound`] when the operator does not
    /// exist or has no institution.
    pub async fn initialize(&mut self, auth_id: &str) -> Result<()> {
        let users = SqliteUserRepository::new(self.db.pool().clone());
        let operator = users.find_by_auth_id(auth_id).await?.ok_or_else(|| {
            SessionError::InstitutionNotFound {
                auth_id: auth_id.to_string(),
            }
        })?;

        let institution_id =
            operator
                .institution_id
                .ok_or_else(|| SessionError::InstitutionNotFound {
                    auth_id: auth_id.to_string(),
                })?;

        info!(auth_id, institution_id, "session initialized");
        self.operator = Some(operator);
        self.institution_id = Some(institution_id);
        Ok(())
    }

    /// Start the poll loop and the pipeline task.
    ///
    /// Connection failure is fail-fast: the driver is recovered and the
    /// coordinator stays stopped, so `start()` can be retried.
    pub async fn start(&mut self) -> Result<()> {
        if self.running.is_some() {
            return Err(SessionError::AlreadyRunning);
        }
        let institution_id = self.institution_id.ok_or(SessionError::NotInitialized)?;
        let driver = self.driver.take().ok_or(SessionError::NotInitialized)?;

        let config = PollerConfig {
            poll_interval: Duration::from_millis(self.options.polling_interval_ms),
            ..PollerConfig::default()
        };
        let mut poller = CardPoller::new(driver, config);

        let kind = match poller.connect().await {
            Ok(kind) => kind,
            Err(e) => {
                self.driver = Some(poller.into_driver());
                return Err(e.into());
            }
        };

        if let Err(e) = self.refresh_cache().await {
            let _ = poller.disconnect().await;
            self.driver = Some(poller.into_driver());
            return Err(e);
        }

        self.emit(CoordinatorEvent::ReaderConnected(kind)).await;

        let (poller_handle, poller_events) = match poller.start_polling() {
            Ok(parts) => parts,
            Err(e) => return Err(e.into()),
        };

        let pipeline = Pipeline {
            db: self.db.clone(),
            cache: Arc::clone(&self.cache),
            options: self.options.clone(),
            institution_id,
            events: self.events.clone(),
        };
        let pipeline_task = tokio::spawn(pipeline.run(poller_events));

        self.running = Some(RunningSession {
            poller: poller_handle,
            pipeline: pipeline_task,
        });

        self.emit(CoordinatorEvent::Started).await;
        info!(institution_id, "session started");
        Ok(())
    }

    /// Stop polling, drain the pipeline and disconnect the reader.
    ///
    /// Safe to call when not running. An in-flight pipeline run finishes
    /// before the reader is released.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };

        let mut poller = running.poller.stop().await?;
        if running.pipeline.await.is_err() {
            warn!("pipeline task panicked during shutdown");
        }
        poller.disconnect().await?;
        self.driver = Some(poller.into_driver());

        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();

        self.emit(CoordinatorEvent::ReaderDisconnected).await;
        self.emit(CoordinatorEvent::Stopped).await;
        info!("session stopped");
        Ok(())
    }

    /// Enroll a previously seen card for a user.
    ///
    /// The card must already have a record (a reader has seen it at least
    /// once). The new enrollment supersedes any active one, and the card's
    /// cache entry is invalidated so the next badge re-reads the database.
    pub async fn enroll_card(
        &self,
        card_uid: &str,
        user_id: i64,
        access_level: &str,
        reason: Option<&str>,
    ) -> Result<Enrollment> {
        let institution_id = self.institution_id.ok_or(SessionError::NotInitialized)?;

        let cards = SqliteCardRepository::new(self.db.pool().clone());
        let card = cards
            .find_by_uid(card_uid)
            .await?
            .ok_or_else(|| SessionError::CardNotFound {
                card_uid: card_uid.to_string(),
            })?;

        let enrollments = SqliteEnrollmentRepository::new(self.db.pool().clone());
        let enrollment = enrollments
            .create(&NewEnrollment {
                card_id: card.id,
                user_id,
                institution_id,
                access_level: access_level.to_string(),
                enrolled_by: self.operator.as_ref().map(|u| u.id),
                enrollment_reason: reason.map(str::to_string),
            })
            .await?;

        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .invalidate(card.id);

        info!(card_uid, user_id, enrollment_id = enrollment.id, "card enrolled");
        self.emit(CoordinatorEvent::CardEnrolled {
            card,
            enrollment: enrollment.clone(),
        })
        .await;

        Ok(enrollment)
    }

    /// Rebuild the cache from all active enrollments of the institution.
    ///
    /// This is the only bulk invalidation: the cache has no TTL, and
    /// enrollment changes made outside this coordinator stay invisible
    /// until this is called.
    pub async fn refresh_cache(&self) -> Result<()> {
        let institution_id = self.institution_id.ok_or(SessionError::NotInitialized)?;

        let enrollments = SqliteEnrollmentRepository::new(self.db.pool().clone());
        let active = enrollments.find_active_by_institution(institution_id).await?;
        let count = active.len();

        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace_all(active);

        debug!(institution_id, count, "enrollment cache refreshed");
        Ok(())
    }

    /// Snapshot of the coordinator's state. Never fails.
    pub fn get_status(&self) -> SessionStatus {
        SessionStatus {
            is_running: self.running.is_some(),
            reader_connected: self.running.is_some(),
            institution_id: self.institution_id,
            cache_size: self
                .cache
                .lock()
                .map(|c| c.len())
                .unwrap_or(0),
            options: self.options.clone(),
        }
    }

    async fn emit(&self, event: CoordinatorEvent) {
        let _ = self.events.send(event).await;
    }
}

/// State shared with the single pipeline task.
struct Pipeline {
    db: Database,
    cache: Arc<Mutex<EnrollmentCache>>,
    options: SessionOptions,
    institution_id: i64,
    events: mpsc::Sender<CoordinatorEvent>,
}

impl Pipeline {
    /// Drain poller events until the channel closes.
    async fn run(self, mut poller_events: mpsc::Receiver<PollerEvent>) {
        while let Some(event) = poller_events.recv().await {
            match event {
                PollerEvent::CardDetected(detection) => self.process(detection).await,
                PollerEvent::CardRemoved { uid } => {
                    self.send(CoordinatorEvent::CardRemoved { uid }).await;
                }
                PollerEvent::Error { message } => {
                    warn!(%message, "reader error during polling");
                    self.send(CoordinatorEvent::Error { message }).await;
                }
                _ => {}
            }
        }
    }

    /// Process one detection end to end.
    ///
    /// Exactly one access event is appended per call: granted or denied on
    /// the normal path, or a best-effort error event when the pipeline
    /// fails before the audit write happened.
    async fn process(&self, detection: CardDetection) {
        let started = Instant::now();
        self.send(CoordinatorEvent::CardDetected(detection.clone()))
            .await;

        let mut audit_logged = false;
        if let Err(e) = self
            .handle_detection(&detection, started, &mut audit_logged)
            .await
        {
            warn!(uid = %detection.uid, error = %e, "detection pipeline failed");
            if !audit_logged {
                self.log_error_event(&detection, &e, started).await;
            }
            self.send(CoordinatorEvent::CardProcessingError {
                uid: detection.uid.clone(),
                message: e.to_string(),
            })
            .await;
        }
    }

    async fn handle_detection(
        &self,
        detection: &CardDetection,
        started: Instant,
        audit_logged: &mut bool,
    ) -> Result<()> {
        let cards = SqliteCardRepository::new(self.db.pool().clone());
        let (card, first_seen) = cards.find_or_create(detection).await?;
        if first_seen {
            info!(uid = %detection.uid, kind = %detection.kind, "first sighting of card");
        }

        let cached = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(card.id)
            .cloned();
        let enrollment = match cached {
            Some(enrollment) => Some(enrollment),
            None => {
                let enrollments = SqliteEnrollmentRepository::new(self.db.pool().clone());
                let found = enrollments
                    .find_active_by_card(card.id, self.institution_id)
                    .await?;
                if let Some(ref enrollment) = found {
                    self.cache
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .insert(enrollment.clone());
                }
                found
            }
        };

        let access_events = SqliteAccessEventRepository::new(self.db.pool().clone());

        match enrollment {
            Some(enrollment) => {
                let users = SqliteUserRepository::new(self.db.pool().clone());
                let user = users.find_by_id(enrollment.user_id).await?.ok_or_else(|| {
                    StorageError::not_found("User", "id", enrollment.user_id)
                })?;

                let access_event = access_events
                    .log(&NewAccessEvent {
                        card_id: Some(card.id),
                        enrollment_id: Some(enrollment.id),
                        user_id: Some(user.id),
                        institution_id: Some(self.institution_id),
                        result: AccessResult::Granted,
                        denial_reason: None,
                        reader_type: READER_TYPE.to_string(),
                        detected_at: detection.detected_at,
                        processing_time_ms: started.elapsed().as_millis() as i64,
                        technical_details: Some(detection.technical_json().to_string()),
                    })
                    .await?;
                *audit_logged = true;

                self.send(CoordinatorEvent::EnrolledCardDetected {
                    detection: detection.clone(),
                    user: user.clone(),
                    enrollment: enrollment.clone(),
                    access_event: access_event.clone(),
                })
                .await;

                if self.options.attendance_mode {
                    let attendance_repo =
                        SqliteAttendanceRepository::new(self.db.pool().clone());
                    let record = attendance::toggle(
                        &attendance_repo,
                        user.id,
                        detection.detected_at,
                        Some(access_event.id),
                        Some(&detection.uid),
                    )
                    .await?;
                    self.send(CoordinatorEvent::AttendanceRecorded {
                        record,
                        user: user.clone(),
                    })
                    .await;
                }

                if self.options.wallet_enabled {
                    // Wallet problems never fail an otherwise granted badge.
                    let wallets = SqliteWalletRepository::new(self.db.pool().clone());
                    match wallets.find_by_enrollment(enrollment.id).await {
                        Ok(Some(wallet)) => {
                            self.send(CoordinatorEvent::WalletAccessed { wallet, user })
                                .await;
                        }
                        Ok(None) => {
                            debug!(enrollment_id = enrollment.id, "enrollment has no wallet");
                        }
                        Err(e) => warn!(error = %e, "wallet lookup failed"),
                    }
                }
            }
            None => {
                let access_event = access_events
                    .log(&NewAccessEvent {
                        card_id: Some(card.id),
                        enrollment_id: None,
                        user_id: None,
                        institution_id: Some(self.institution_id),
                        result: AccessResult::Denied,
                        denial_reason: Some("card_not_enrolled".to_string()),
                        reader_type: READER_TYPE.to_string(),
                        detected_at: detection.detected_at,
                        processing_time_ms: started.elapsed().as_millis() as i64,
                        technical_details: Some(detection.technical_json().to_string()),
                    })
                    .await?;
                *audit_logged = true;

                self.send(CoordinatorEvent::UnknownCardDetected {
                    detection: detection.clone(),
                    card: card.clone(),
                    access_event,
                })
                .await;

                if self.options.auto_enrollment {
                    self.send(CoordinatorEvent::AutoEnrollmentRequested {
                        detection: detection.clone(),
                        card,
                    })
                    .await;
                }
            }
        }

        Ok(())
    }

    /// Append the error-result fallback audit event.
    async fn log_error_event(
        &self,
        detection: &CardDetection,
        error: &SessionError,
        started: Instant,
    ) {
        let access_events = SqliteAccessEventRepository::new(self.db.pool().clone());
        let result = access_events
            .log(&NewAccessEvent {
                card_id: None,
                enrollment_id: None,
                user_id: None,
                institution_id: Some(self.institution_id),
                result: AccessResult::Error,
                denial_reason: Some(error.to_string()),
                reader_type: READER_TYPE.to_string(),
                detected_at: detection.detected_at,
                processing_time_ms: started.elapsed().as_millis() as i64,
                technical_details: Some(detection.technical_json().to_string()),
            })
            .await;

        if let Err(e) = result {
            warn!(error = %e, "failed to append error access event");
        }
    }

    async fn send(&self, event: CoordinatorEvent) {
        let _ = self.events.send(event).await;
    }
}
