use thiserror::Error;

use crate::traits::CashLedgerError;

const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// Errors from setting up the SQLite backend (connecting, migrating). Query errors are reported as
/// [`CashLedgerError`] directly.
#[derive(Debug, Error)]
pub enum SqliteDatabaseError {
    #[error("Database connection error: {0}")]
    DriverError(#[from] sqlx::Error),
    #[error("Database migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),
}

impl From<SqliteDatabaseError> for CashLedgerError {
    fn from(e: SqliteDatabaseError) -> Self {
        match e {
            SqliteDatabaseError::DriverError(e) => e.into(),
            SqliteDatabaseError::MigrationError(e) => CashLedgerError::DatabaseError(e.to_string()),
        }
    }
}

/// Lock contention and pool exhaustion abort the transaction without writing anything, so they are reported as
/// retryable. Everything else is a plain database error.
impl From<sqlx::Error> for CashLedgerError {
    fn from(e: sqlx::Error) -> Self {
        if is_transient(&e) {
            CashLedgerError::TransactionAborted(e.to_string())
        } else {
            CashLedgerError::DatabaseError(e.to_string())
        }
    }
}

fn is_transient(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::PoolTimedOut => true,
        sqlx::Error::Database(db) => db
            .code()
            .and_then(|code| code.parse::<i32>().ok())
            // Extended result codes keep the primary code in the low byte
            .map(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
            .unwrap_or(false),
        _ => false,
    }
}
