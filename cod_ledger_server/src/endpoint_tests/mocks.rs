use chrono::{DateTime, Utc};
use cod_common::Cents;
use cod_ledger_engine::{
    db_types::{
        CashCollection,
        CollectionId,
        Courier,
        CourierBalances,
        CourierId,
        DeliveryRecord,
        NewCourier,
        NewDeliveryRecord,
        NewOrder,
        OperatorId,
        Order,
        OrderId,
        Pagination,
        TrackingEvent,
    },
    helpers::SubmissionAllocation,
    traits::{
        CollectionOutcome,
        CollectionQueryFilter,
        CollectionSelection,
        CollectionTotals,
        CourierStatusTotal,
        NewCashCollection,
        ReconciliationUpdate,
        StatusTotal,
        SubmissionResult,
    },
    CashLedgerDatabase,
    CashLedgerError,
    ConfirmationCodeManagement,
    LedgerReporting,
    OrderManagement,
};
use mockall::mock;

mock! {
    pub Backend {}
    impl OrderManagement for Backend {
        async fn insert_order(&self, order: NewOrder) -> Result<Order, CashLedgerError>;
        async fn fetch_order(&self, id: OrderId) -> Result<Option<Order>, CashLedgerError>;
        async fn fetch_order_by_number(&self, order_number: &str) -> Result<Option<Order>, CashLedgerError>;
        async fn assign_courier(&self, id: OrderId, courier: CourierId) -> Result<Option<Order>, CashLedgerError>;
        async fn mark_picked_up(&self, id: OrderId, courier: CourierId, at: DateTime<Utc>) -> Result<Option<Order>, CashLedgerError>;
        async fn mark_delivered(&self, id: OrderId, courier: CourierId, at: DateTime<Utc>) -> Result<Option<(Order, CollectionOutcome)>, CashLedgerError>;
        async fn fetch_tracking_events(&self, id: OrderId) -> Result<Vec<TrackingEvent>, CashLedgerError>;
        async fn insert_delivery_record(&self, record: NewDeliveryRecord) -> Result<DeliveryRecord, CashLedgerError>;
        async fn fetch_delivery_record(&self, id: OrderId) -> Result<Option<DeliveryRecord>, CashLedgerError>;
    }
    impl ConfirmationCodeManagement for Backend {
        async fn issue_confirmation_code(&self, id: OrderId, code: &str, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Result<Option<Order>, CashLedgerError>;
        async fn record_confirmation_resend(&self, id: OrderId, max_resends: i64, now: DateTime<Utc>) -> Result<Option<Order>, CashLedgerError>;
        async fn mark_confirmation_verified(&self, id: OrderId, code: &str, now: DateTime<Utc>) -> Result<Option<Order>, CashLedgerError>;
    }
    impl CashLedgerDatabase for Backend {
        async fn insert_courier(&self, courier: NewCourier) -> Result<Courier, CashLedgerError>;
        async fn fetch_courier(&self, id: CourierId) -> Result<Option<Courier>, CashLedgerError>;
        async fn fetch_collection(&self, id: CollectionId) -> Result<Option<CashCollection>, CashLedgerError>;
        async fn fetch_collection_for_order(&self, order: OrderId) -> Result<Option<CashCollection>, CashLedgerError>;
        async fn collect_cash(&self, collection: NewCashCollection) -> Result<CollectionOutcome, CashLedgerError>;
        async fn submit_collections(&self, courier: CourierId, selection: &CollectionSelection, submitted_amount: Option<Cents>, deposit_proof: Option<String>, allocation: SubmissionAllocation, at: DateTime<Utc>) -> Result<SubmissionResult, CashLedgerError>;
        async fn apply_reconciliation(&self, id: CollectionId, update: &ReconciliationUpdate) -> Result<Option<CashCollection>, CashLedgerError>;
        async fn bulk_reconcile(&self, ids: &[CollectionId], operator: OperatorId, notes: Option<String>, at: DateTime<Utc>) -> Result<Vec<CashCollection>, CashLedgerError>;
        async fn fetch_orders_missing_collection(&self) -> Result<Vec<Order>, CashLedgerError>;
    }
    impl LedgerReporting for Backend {
        async fn compute_courier_balances(&self, courier: CourierId) -> Result<CourierBalances, CashLedgerError>;
        async fn refresh_courier_balances(&self, courier: CourierId, at: DateTime<Utc>) -> Result<CourierBalances, CashLedgerError>;
        async fn fetch_couriers(&self) -> Result<Vec<Courier>, CashLedgerError>;
        async fn fetch_collections(&self, filter: &CollectionQueryFilter, pagination: Pagination) -> Result<Vec<CashCollection>, CashLedgerError>;
        async fn collection_totals(&self, filter: &CollectionQueryFilter) -> Result<CollectionTotals, CashLedgerError>;
        async fn status_totals(&self, filter: &CollectionQueryFilter) -> Result<Vec<StatusTotal>, CashLedgerError>;
        async fn courier_status_totals(&self, filter: &CollectionQueryFilter) -> Result<Vec<CourierStatusTotal>, CashLedgerError>;
    }
}
