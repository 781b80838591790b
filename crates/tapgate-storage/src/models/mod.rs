pub mod access_event;
pub mod attendance;
pub mod card;
pub mod enrollment;
pub mod user;
pub mod wallet;

pub use access_event::{AccessEvent, AccessResult, NewAccessEvent};
pub use attendance::{AttendanceRecord, RecordType};
pub use card::Card;
pub use enrollment::{Enrollment, EnrollmentStatus, NewEnrollment};
pub use user::User;
pub use wallet::{TransactionType, Wallet, WalletTransaction};
