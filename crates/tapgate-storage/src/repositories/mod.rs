pub mod access_event;
pub mod attendance;
pub mod card;
pub mod enrollment;
pub mod user;
pub mod wallet;

pub use access_event::{AccessEventRepository, SqliteAccessEventRepository};
pub use attendance::{AttendanceRepository, SqliteAttendanceRepository};
pub use card::{CardRepository, SqliteCardRepository};
pub use enrollment::{EnrollmentRepository, SqliteEnrollmentRepository};
pub use user::{SqliteUserRepository, UserRepository};
pub use wallet::{SqliteWalletRepository, WalletRepository};
