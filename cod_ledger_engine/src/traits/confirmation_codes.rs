use chrono::{DateTime, Utc};

use crate::{
    db_types::{Order, OrderId},
    traits::CashLedgerError,
};

/// Storage for the delivery-confirmation code carried on each order.
///
/// Like the status transitions, each method is a conditional update that returns `Ok(None)` when its precondition
/// does not hold.
#[allow(async_fn_in_trait)]
pub trait ConfirmationCodeManagement {
    /// Replaces any previous code. Resets the resend count and the verified flag. Only applies to orders that are
    /// confirmed, ready or picked up.
    async fn issue_confirmation_code(
        &self,
        id: OrderId,
        code: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>, CashLedgerError>;

    /// Increments the resend count of an outstanding, unverified code that is unexpired at `now`, as long as fewer
    /// than `max_resends` resends have happened.
    async fn record_confirmation_resend(
        &self,
        id: OrderId,
        max_resends: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>, CashLedgerError>;

    /// Flags the code as verified if `code` matches and is unexpired at `now`.
    async fn mark_confirmation_verified(
        &self,
        id: OrderId,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>, CashLedgerError>;
}
