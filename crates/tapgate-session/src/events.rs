//! Typed outbound events from the coordinator.

use tapgate_core::CardDetection;
use tapgate_reader::ConnectionKind;
use tapgate_storage::{AccessEvent, AttendanceRecord, Card, Enrollment, User, Wallet};

/// Event emitted by a [`SessionCoordinator`](crate::SessionCoordinator).
///
/// Consumers receive these over the mpsc channel returned by
/// `SessionCoordinator::new`. Event payloads carry the full stored rows,
/// so subscribers never have to query the database to render them.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum CoordinatorEvent {
    /// The session started and the poll loop is running.
    Started,

    /// The session stopped; no more detections will be processed.
    Stopped,

    /// The reader connected, with the strategy that succeeded.
    ReaderConnected(ConnectionKind),

    /// The reader was disconnected.
    ReaderDisconnected,

    /// A card entered the field. Always emitted before the pipeline
    /// outcome events for the same detection.
    CardDetected(CardDetection),

    /// The card left the field.
    CardRemoved {
        /// UID of the removed card.
        uid: String,
    },

    /// Pipeline outcome: the card has an active enrollment.
    EnrolledCardDetected {
        detection: CardDetection,
        user: User,
        enrollment: Enrollment,
        access_event: AccessEvent,
    },

    /// Pipeline outcome: the card is not enrolled here.
    UnknownCardDetected {
        detection: CardDetection,
        card: Card,
        access_event: AccessEvent,
    },

    /// An unknown card was seen while auto-enrollment is on; someone must
    /// still confirm the enrollment explicitly.
    AutoEnrollmentRequested {
        detection: CardDetection,
        card: Card,
    },

    /// An attendance record was written for an enrolled badge.
    AttendanceRecorded {
        record: AttendanceRecord,
        user: User,
    },

    /// The wallet attached to the active enrollment was resolved.
    WalletAccessed { wallet: Wallet, user: User },

    /// A card was enrolled through the coordinator.
    CardEnrolled { card: Card, enrollment: Enrollment },

    /// A reader-level error during polling. The session keeps running.
    Error { message: String },

    /// The pipeline failed for one detection. An error-result access event
    /// was appended; the session keeps running.
    CardProcessingError { uid: String, message: String },
}
