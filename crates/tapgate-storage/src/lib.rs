//! Storage layer for the Tapgate card-session coordinator.
//!
//! SQLite-backed persistence for users, cards, enrollments, the access
//! event audit trail, attendance records and campus wallets.
//!
//! # Architecture
//!
//! The storage layer uses a repository pattern:
//!
//! - [`Database`] - connection pool manager with automatic migrations
//! - [`CardRepository`], [`EnrollmentRepository`], [`AccessEventRepository`],
//!   [`AttendanceRepository`], [`UserRepository`], [`WalletRepository`] -
//!   data access traits with SQLite implementations
//!
//! All data access goes through the repository traits so the session layer
//! can be exercised against an in-memory database in tests.
//!
//! # Key invariants
//!
//! - Cards are append-only; a UID maps to the same row forever.
//! - At most one `active` enrollment per card per institution, enforced by
//!   a partial unique index and transactional supersede-on-create.
//! - Access events are append-only, one per processed detection.
//! - Wallet balance changes and their ledger entries commit atomically.
//!
//! # Examples
//!
//! ```no_run
//! use tapgate_storage::{Database, DatabaseConfig};
//! use tapgate_storage::repositories::{CardRepository, SqliteCardRepository};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Database::new(DatabaseConfig::new("tapgate.db")).await?;
//!
//! let cards = SqliteCardRepository::new(db.pool().clone());
//! if let Some(card) = cards.find_by_uid("04A1B2C3D4E5F6").await? {
//!     println!("{} first seen {}", card.card_type, card.first_seen_at);
//! }
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error;
pub mod models;
pub mod repositories;

pub use connection::{Database, DatabaseConfig};
pub use error::{StorageError, StorageResult};
pub use models::{
    AccessEvent, AccessResult, AttendanceRecord, Card, Enrollment, EnrollmentStatus,
    NewAccessEvent, NewEnrollment, RecordType, TransactionType, User, Wallet, WalletTransaction,
};
pub use repositories::{
    AccessEventRepository, AttendanceRepository, CardRepository, EnrollmentRepository,
    SqliteAccessEventRepository, SqliteAttendanceRepository, SqliteCardRepository,
    SqliteEnrollmentRepository, SqliteUserRepository, SqliteWalletRepository, UserRepository,
    WalletRepository,
};
