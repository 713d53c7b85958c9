use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use cod_common::Cents;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(String);

/// Generates a transparent integer identifier type with `Display`, `FromStr` and `From<i64>` implementations.
macro_rules! db_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
        #[sqlx(transparent)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl FromStr for $name {
            type Err = ConversionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<i64>().map(Self).map_err(|e| ConversionError(format!("{s}: {e}")))
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}{}", $prefix, self.0)
            }
        }

        impl $name {
            pub fn value(&self) -> i64 {
                self.0
            }
        }
    };
}

db_id!(OrderId, "#");
db_id!(CourierId, "courier#");
db_id!(CollectionId, "collection#");
db_id!(OperatorId, "operator#");

/// Generates `Display` and `FromStr` for a snake_case string enum, keeping the text form used in the database, the
/// JSON payloads and the log lines identical.
macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($text),)+
                }
            }
        }

        impl FromStr for $name {
            type Err = ConversionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($text => Ok(Self::$variant),)+
                    s => Err(ConversionError(format!("'{s}' is not a valid {}", stringify!($name)))),
                }
            }
        }
    };
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatusType {
    /// The customer has placed the order.
    Placed,
    /// The restaurant accepted the order. Couriers pick orders up from this state.
    Confirmed,
    /// The food is ready for collection.
    Ready,
    /// The assigned courier has the order.
    PickedUp,
    /// The customer received the order. Terminal.
    Delivered,
    /// Terminal.
    Cancelled,
}

string_enum!(OrderStatusType {
    Placed => "placed",
    Confirmed => "confirmed",
    Ready => "ready",
    PickedUp => "picked_up",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

impl OrderStatusType {
    /// The transitions a courier may drive. Everything else belongs to the placement and restaurant services.
    pub fn courier_can_transition_to(self, to: OrderStatusType) -> bool {
        use OrderStatusType::*;
        matches!((self, to), (Confirmed, PickedUp) | (PickedUp, Delivered))
    }

    /// A confirmation code can be issued until the order is delivered or cancelled.
    pub fn accepts_confirmation_code(self) -> bool {
        use OrderStatusType::*;
        matches!(self, Confirmed | Ready | PickedUp)
    }
}

//--------------------------------------    PaymentMethod      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    CashOnDelivery,
    Card,
    Wallet,
}

string_enum!(PaymentMethod {
    CashOnDelivery => "cash_on_delivery",
    Card => "card",
    Wallet => "wallet",
});

//--------------------------------------  DeliveryConfirmation ---------------------------------------------------------
/// The delivery-confirmation code state carried on every order.
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize)]
pub struct DeliveryConfirmation {
    /// Never serialized. The code reaches the customer through the `ConfirmationCodeIssued` event only.
    #[sqlx(rename = "confirmation_code")]
    #[serde(skip_serializing)]
    pub code: Option<String>,
    #[sqlx(rename = "confirmation_expires_at")]
    pub expires_at: Option<DateTime<Utc>>,
    #[sqlx(rename = "confirmation_resend_count")]
    pub resend_count: i64,
    #[sqlx(rename = "confirmation_verified")]
    pub verified: bool,
    #[sqlx(rename = "confirmation_verified_at")]
    pub verified_at: Option<DateTime<Utc>>,
}

impl DeliveryConfirmation {
    pub fn is_issued(&self) -> bool {
        self.code.is_some()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|t| t <= now).unwrap_or(true)
    }

    /// The gate for the `delivered` transition: verified and not yet expired at `now`.
    pub fn permits_delivery(&self, now: DateTime<Utc>) -> bool {
        self.verified && !self.is_expired(now)
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub status: OrderStatusType,
    pub payment_method: PaymentMethod,
    pub total_amount: Cents,
    pub delivery_fee: Cents,
    pub courier_id: Option<CourierId>,
    pub customer_ref: Option<String>,
    pub restaurant_ref: Option<String>,
    pub delivery_zone: Option<String>,
    #[sqlx(flatten)]
    pub confirmation: DeliveryConfirmation,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_assigned_to(&self, courier: CourierId) -> bool {
        self.courier_id == Some(courier)
    }

    /// True when delivering this order puts cash into the courier's custody.
    pub fn requires_cash_collection(&self) -> bool {
        self.payment_method == PaymentMethod::CashOnDelivery && self.total_amount.is_positive()
    }
}

//--------------------------------------        NewOrder       ---------------------------------------------------------
/// An order as written by the placement service.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub status: OrderStatusType,
    pub payment_method: PaymentMethod,
    pub total_amount: Cents,
    pub delivery_fee: Cents,
    pub courier_id: Option<CourierId>,
    pub customer_ref: Option<String>,
    pub restaurant_ref: Option<String>,
    pub delivery_zone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    pub fn new<S: Into<String>>(order_number: S, payment_method: PaymentMethod, total_amount: Cents) -> Self {
        Self {
            order_number: order_number.into(),
            status: OrderStatusType::Placed,
            payment_method,
            total_amount,
            delivery_fee: Cents::default(),
            courier_id: None,
            customer_ref: None,
            restaurant_ref: None,
            delivery_zone: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status = status;
        self
    }

    pub fn with_courier(mut self, courier: CourierId) -> Self {
        self.courier_id = Some(courier);
        self
    }

    pub fn with_delivery_fee(mut self, fee: Cents) -> Self {
        self.delivery_fee = fee;
        self
    }

    pub fn with_parties<S: Into<String>>(mut self, customer: S, restaurant: S, zone: S) -> Self {
        self.customer_ref = Some(customer.into());
        self.restaurant_ref = Some(restaurant.into());
        self.delivery_zone = Some(zone.into());
        self
    }
}

//--------------------------------------     TrackingEvent     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct TrackingEvent {
    pub id: i64,
    pub order_id: OrderId,
    pub status: OrderStatusType,
    pub actor_courier_id: Option<CourierId>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------    CourierStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CourierStatus {
    Active,
    Inactive,
    Suspended,
    OnDuty,
    OffDuty,
}

string_enum!(CourierStatus {
    Active => "active",
    Inactive => "inactive",
    Suspended => "suspended",
    OnDuty => "on_duty",
    OffDuty => "off_duty",
});

//--------------------------------------   CourierBalances     ---------------------------------------------------------
/// The four cash figures kept per courier. On [`Courier`] they are a cached projection. When computed by
/// `LedgerReporting::compute_courier_balances` they are the truth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CourierBalances {
    pub cash_in_hand: Cents,
    pub total_cash_collected: Cents,
    pub total_cash_submitted: Cents,
    pub pending_cash_submission: Cents,
}

//--------------------------------------        Courier        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct Courier {
    pub id: CourierId,
    pub name: String,
    pub status: CourierStatus,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub balances: CourierBalances,
    pub balances_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCourier {
    pub name: String,
    pub status: CourierStatus,
}

impl NewCourier {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into(), status: CourierStatus::Active }
    }

    pub fn with_status(mut self, status: CourierStatus) -> Self {
        self.status = status;
        self
    }
}

//--------------------------------------   SubmissionStatus    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Submitted,
    Reconciled,
    Discrepancy,
}

string_enum!(SubmissionStatus {
    Pending => "pending",
    Submitted => "submitted",
    Reconciled => "reconciled",
    Discrepancy => "discrepancy",
});

impl SubmissionStatus {
    pub const ALL: [SubmissionStatus; 4] = [Self::Pending, Self::Submitted, Self::Reconciled, Self::Discrepancy];

    /// `pending -> submitted -> reconciled | discrepancy`. Nothing leaves a terminal state and nothing skips
    /// `submitted`.
    pub fn can_transition_to(self, to: SubmissionStatus) -> bool {
        use SubmissionStatus::*;
        matches!((self, to), (Pending, Submitted) | (Submitted, Reconciled) | (Submitted, Discrepancy))
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Reconciled | Self::Discrepancy)
    }
}

//--------------------------------------      Discrepancy      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discrepancy {
    pub expected: Cents,
    pub actual: Cents,
    pub reason: String,
}

impl Discrepancy {
    /// The signed cash difference, `actual - expected`. Negative when the courier handed over less than expected.
    pub fn delta(&self) -> Cents {
        self.actual - self.expected
    }
}

//--------------------------------------    CashCollection     ---------------------------------------------------------
/// One ledger row: the cash owed for one cash-on-delivery order.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct CashCollection {
    pub id: CollectionId,
    pub courier_id: CourierId,
    pub order_id: OrderId,
    pub order_number: String,
    pub amount: Cents,
    pub collected_at: DateTime<Utc>,
    pub submission_status: SubmissionStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub submitted_amount: Option<Cents>,
    pub deposit_proof: Option<String>,
    pub reconciled_at: Option<DateTime<Utc>>,
    pub reconciled_by: Option<OperatorId>,
    pub reconciliation_notes: Option<String>,
    pub discrepancy_expected: Option<Cents>,
    pub discrepancy_actual: Option<Cents>,
    pub discrepancy_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CashCollection {
    /// The amount reconciliation compares against: what was declared at submission, or the collected amount.
    pub fn expected_amount(&self) -> Cents {
        self.submitted_amount.unwrap_or(self.amount)
    }

    pub fn discrepancy(&self) -> Option<Discrepancy> {
        match (self.discrepancy_expected, self.discrepancy_actual) {
            (Some(expected), Some(actual)) => {
                Some(Discrepancy { expected, actual, reason: self.discrepancy_reason.clone().unwrap_or_default() })
            },
            _ => None,
        }
    }
}

//--------------------------------------    DeliveryRecord     ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct DeliveryRecord {
    pub id: i64,
    pub order_id: OrderId,
    pub order_number: String,
    pub courier_id: CourierId,
    pub customer_ref: Option<String>,
    pub restaurant_ref: Option<String>,
    pub delivery_zone: Option<String>,
    pub payment_method: PaymentMethod,
    pub total_amount: Cents,
    pub delivery_fee: Cents,
    pub cash_collection_id: Option<CollectionId>,
    pub delivered_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// The snapshot taken of a delivered order.
#[derive(Debug, Clone)]
pub struct NewDeliveryRecord {
    pub order_id: OrderId,
    pub order_number: String,
    pub courier_id: CourierId,
    pub customer_ref: Option<String>,
    pub restaurant_ref: Option<String>,
    pub delivery_zone: Option<String>,
    pub payment_method: PaymentMethod,
    pub total_amount: Cents,
    pub delivery_fee: Cents,
    pub cash_collection_id: Option<CollectionId>,
    pub delivered_at: DateTime<Utc>,
}

impl NewDeliveryRecord {
    /// Returns `None` when the order has not been delivered by a courier.
    pub fn from_order(order: &Order, collection: Option<CollectionId>) -> Option<Self> {
        let courier_id = order.courier_id?;
        let delivered_at = order.delivered_at?;
        Some(Self {
            order_id: order.id,
            order_number: order.order_number.clone(),
            courier_id,
            customer_ref: order.customer_ref.clone(),
            restaurant_ref: order.restaurant_ref.clone(),
            delivery_zone: order.delivery_zone.clone(),
            payment_method: order.payment_method,
            total_amount: order.total_amount,
            delivery_fee: order.delivery_fee,
            cash_collection_id: collection,
            delivered_at,
        })
    }
}

//--------------------------------------          Role         ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Courier,
    Operator,
}

string_enum!(Role {
    Courier => "courier",
    Operator => "operator",
});

//--------------------------------------       Pagination      ---------------------------------------------------------
pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub offset: Option<i64>,
    pub count: Option<i64>,
}

impl Pagination {
    pub fn new(offset: i64, count: i64) -> Self {
        Self { offset: Some(offset), count: Some(count) }
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    pub fn count(&self) -> i64 {
        self.count.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }
}
