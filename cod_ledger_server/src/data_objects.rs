use chrono::{DateTime, Utc};
use cod_common::Cents;
use cod_ledger_engine::{
    db_types::{CollectionId, OrderId, OrderStatusType, Pagination, SubmissionStatus},
    ledger_objects::DeliveryOutcome,
    traits::{CollectionOutcome, CollectionSelection},
};
use serde::{Deserialize, Serialize};

use crate::errors::ServerError;

//----------------------------------------------   Courier requests  ----------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectCashRequest {
    pub order_id: OrderId,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitCashRequest {
    #[serde(default)]
    pub collection_ids: Option<Vec<CollectionId>>,
    #[serde(default)]
    pub submitted_amount: Option<Cents>,
    #[serde(default)]
    pub deposit_proof: Option<String>,
}

impl SubmitCashRequest {
    pub fn selection(&self) -> CollectionSelection {
        CollectionSelection::from_ids(self.collection_ids.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusUpdate {
    pub status: OrderStatusType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyCodeRequest {
    pub code: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryQuery {
    pub status: Option<SubmissionStatus>,
    pub offset: Option<i64>,
    pub count: Option<i64>,
}

impl HistoryQuery {
    pub fn pagination(&self) -> Pagination {
        Pagination { offset: self.offset, count: self.count }
    }
}

//----------------------------------------------   Operator requests  ---------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileRequest {
    #[serde(default)]
    pub actual_amount: Option<Cents>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: Option<SubmissionStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkReconcileRequest {
    pub collection_ids: Vec<CollectionId>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DateRangeQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl DateRangeQuery {
    /// Both ends, or neither.
    pub fn range(&self) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>, ServerError> {
        match (self.from, self.to) {
            (Some(from), Some(to)) => Ok(Some((from, to))),
            (None, None) => Ok(None),
            _ => Err(ServerError::InvalidRequestQuery("Supply both 'from' and 'to', or neither".to_string())),
        }
    }

    pub fn required_range(&self) -> Result<(DateTime<Utc>, DateTime<Utc>), ServerError> {
        self.range()?.ok_or_else(|| ServerError::InvalidRequestQuery("'from' and 'to' are required".to_string()))
    }
}

//----------------------------------------------   Responses  ----------------------------------------------------------

/// The ledger side of a collect call. `ledger` is one of `created`, `already_recorded` or `not_applicable`.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionResponse {
    pub message: &'static str,
    #[serde(flatten)]
    pub outcome: CollectionOutcome,
}

impl From<CollectionOutcome> for CollectionResponse {
    fn from(outcome: CollectionOutcome) -> Self {
        let message = match outcome {
            CollectionOutcome::NotApplicable => "No cash to collect for this order",
            CollectionOutcome::Created(_) => "Cash collection recorded",
            CollectionOutcome::AlreadyRecorded(_) => "Cash collection was already recorded",
        };
        Self { message, outcome }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryResponse {
    pub message: &'static str,
    #[serde(flatten)]
    pub outcome: DeliveryOutcome,
}

impl From<DeliveryOutcome> for DeliveryResponse {
    fn from(outcome: DeliveryOutcome) -> Self {
        Self { message: outcome.ledger_message(), outcome }
    }
}
