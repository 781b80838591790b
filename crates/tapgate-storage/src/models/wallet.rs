use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Campus wallet attached to an enrollment.
///
/// Provisioned automatically when an enrollment is created. Balances are
/// integer cents; every change is mirrored by a [`WalletTransaction`] row
/// carrying the before/after balance.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Wallet {
    /// Auto-increment primary key
    pub id: i64,

    /// Enrollment this wallet belongs to (one wallet per enrollment)
    pub enrollment_id: i64,

    /// Human-facing wallet number (unique)
    pub wallet_number: String,

    /// Current balance in cents
    pub balance_cents: i64,

    /// Lifecycle state (`active` for all wallets today)
    pub status: String,

    /// Record creation timestamp
    pub created_at: DateTime<Utc>,

    /// Record last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Direction of a wallet transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money leaving the wallet.
    Debit,

    /// Money entering the wallet.
    Credit,
}

impl TransactionType {
    /// Parse the database column value.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "debit" => Some(Self::Debit),
            "credit" => Some(Self::Credit),
            _ => None,
        }
    }

    /// Column value stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debit => "debit",
            Self::Credit => "credit",
        }
    }
}

/// Ledger entry for one wallet balance change.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WalletTransaction {
    /// Auto-increment primary key
    pub id: i64,

    /// Wallet affected
    pub wallet_id: i64,

    /// Direction (`debit` or `credit`)
    pub transaction_type: String,

    /// Amount moved, in cents (always positive)
    pub amount_cents: i64,

    /// Balance before the change
    pub balance_before: i64,

    /// Balance after the change
    pub balance_after: i64,

    /// Free-form description
    pub description: Option<String>,

    /// Record creation timestamp
    pub created_at: DateTime<Utc>,
}

impl WalletTransaction {
    /// Typed view of the `transaction_type` column.
    pub fn get_transaction_type(&self) -> Option<TransactionType> {
        TransactionType::parse(&self.transaction_type)
    }
}
