use thiserror::Error;

use crate::db_types::{CollectionId, CourierId, OrderId, OrderStatusType, SubmissionStatus};

/// Every failure the engine reports. Backends convert their driver errors into this type, and the server maps each
/// variant onto an HTTP status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CashLedgerError {
    #[error("Invalid request: {0}")]
    ValidationError(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Courier {0} does not exist")]
    CourierNotFound(CourierId),
    #[error("Cash collection {0} does not exist")]
    CollectionNotFound(CollectionId),
    #[error("Order {order} is not assigned to {courier}")]
    NotAssignedCourier { order: OrderId, courier: CourierId },
    #[error("An order cannot move from {from} to {to}")]
    InvalidOrderTransition { from: OrderStatusType, to: OrderStatusType },
    #[error("Cash collection {id} is {from} and cannot become {to}")]
    InvalidCollectionTransition { id: CollectionId, from: SubmissionStatus, to: SubmissionStatus },
    #[error("The confirmation code does not match")]
    ConfirmationCodeMismatch,
    #[error("The confirmation code has expired. Send a new one")]
    ConfirmationCodeExpired,
    #[error("No confirmation code has been issued for this order")]
    NoConfirmationCode,
    #[error("The confirmation code has already been resent {0} times")]
    ResendLimitReached(i64),
    #[error("Order {0} cannot be delivered until the customer's confirmation code is verified")]
    DeliveryNotConfirmed(OrderId),
    #[error("Order {0} has not been delivered yet")]
    OrderNotDelivered(OrderId),
    #[error("There are no pending collections to submit")]
    NoPendingCollections,
    #[error("Cash for this order has already been recorded as collection {0}")]
    AlreadyRecorded(CollectionId),
    #[error("The transaction was aborted and nothing was saved. Try again. {0}")]
    TransactionAborted(String),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl CashLedgerError {
    /// Transient errors left no trace in the database, so the whole operation can be attempted again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransactionAborted(_))
    }
}
