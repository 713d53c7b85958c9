use std::str::FromStr;

use chrono::Utc;
use cod_common::Cents;
use cod_ledger_engine::{
    db_types::{CashCollection, NewOrder, OperatorId, OrderStatusType, Pagination, PaymentMethod, SubmissionStatus},
    traits::{CollectionOutcome, CollectionQueryFilter, CollectionSelection, NewCashCollection},
    CashLedgerDatabase,
    LedgerReporting,
    OrderManagement,
};
use cucumber::{given, then, when};

use crate::cucumber::LedgerWorld;

const OPERATOR: OperatorId = OperatorId(1);

fn cents(s: &str) -> Cents {
    Cents::from_str(s).unwrap_or_else(|e| panic!("{s} is not an amount. {e}"))
}

fn list(s: &str) -> Vec<String> {
    s.split(',').map(|v| v.trim().to_string()).filter(|v| !v.is_empty()).collect()
}

async fn new_order(world: &mut LedgerWorld, number: String, method: PaymentMethod, amount: String, courier: String) {
    let courier = world.courier(&courier);
    let order = NewOrder::new(number.as_str(), method, cents(&amount))
        .with_status(OrderStatusType::Confirmed)
        .with_courier(courier)
        .with_parties("customer-1", "restaurant-1", "zone-a");
    let system = world.system_mut();
    let order = system.db.insert_order(order).await.expect("Error inserting order");
    system.orders.insert(number, order.id);
}

#[given(expr = "a cash-on-delivery order {word} for {word} assigned to {word}")]
async fn cash_order(world: &mut LedgerWorld, number: String, amount: String, courier: String) {
    new_order(world, number, PaymentMethod::CashOnDelivery, amount, courier).await;
}

#[given(expr = "a card order {word} for {word} assigned to {word}")]
async fn card_order(world: &mut LedgerWorld, number: String, amount: String, courier: String) {
    new_order(world, number, PaymentMethod::Card, amount, courier).await;
}

#[given(expr = "{word} delivered cash orders {string} worth {string}")]
async fn delivered_cash_orders(world: &mut LedgerWorld, courier: String, numbers: String, amounts: String) {
    let courier_id = world.courier(&courier);
    let numbers = list(&numbers);
    let amounts = list(&amounts);
    assert_eq!(numbers.len(), amounts.len(), "Each order needs an amount");
    for (number, amount) in numbers.into_iter().zip(amounts) {
        let order = NewOrder::new(number.as_str(), PaymentMethod::CashOnDelivery, cents(&amount))
            .with_status(OrderStatusType::Delivered)
            .with_courier(courier_id);
        let system = world.system_mut();
        let order = system.db.insert_order(order).await.expect("Error inserting order");
        let outcome = system
            .ledger
            .collect(NewCashCollection::for_order(&order, courier_id, Utc::now()))
            .await
            .expect("Error collecting cash");
        assert!(outcome.is_created());
        system.orders.insert(number, order.id);
    }
}

#[when(expr = "{word} picks up order {word}")]
async fn pick_up(world: &mut LedgerWorld, courier: String, number: String) {
    let (courier, order) = (world.courier(&courier), world.order(&number));
    let result = world.system().delivery.update_order_status(order, courier, OrderStatusType::PickedUp).await;
    world.record(result);
}

#[when(expr = "{word} sends the confirmation code for order {word}")]
async fn send_code(world: &mut LedgerWorld, courier: String, number: String) {
    let (courier, order) = (world.courier(&courier), world.order(&number));
    let result = world.system().delivery.send_confirmation_code(order, courier).await;
    world.record(result);
}

#[when(expr = "the customer gives {word} the correct code for order {word}")]
async fn verify_correct_code(world: &mut LedgerWorld, courier: String, number: String) {
    let (courier, order_id) = (world.courier(&courier), world.order(&number));
    let order = world.system().db.fetch_order(order_id).await.expect("Error fetching order").expect("No order");
    let code = order.confirmation.code.expect("No code was issued");
    let result = world.system().delivery.verify_confirmation_code(order_id, courier, &code).await;
    world.record(result);
}

#[when(expr = "the customer gives {word} the code {string} for order {word}")]
async fn verify_code(world: &mut LedgerWorld, courier: String, code: String, number: String) {
    let (courier, order) = (world.courier(&courier), world.order(&number));
    let result = world.system().delivery.verify_confirmation_code(order, courier, &code).await;
    world.record(result);
}

#[when(expr = "{word} delivers order {word}")]
async fn deliver(world: &mut LedgerWorld, courier: String, number: String) {
    let (courier, order) = (world.courier(&courier), world.order(&number));
    let result = world.system().delivery.update_order_status(order, courier, OrderStatusType::Delivered).await;
    if let Some(outcome) = world.record(result) {
        world.last_outcome = Some(outcome.collection);
    }
}

#[when(expr = "{word} records the cash for order {word}")]
async fn collect(world: &mut LedgerWorld, courier: String, number: String) {
    let (courier, order) = (world.courier(&courier), world.order(&number));
    let result = world.system().ledger.collect_for_order(order, courier).await;
    if let Some(outcome) = world.record(result) {
        world.last_outcome = Some(outcome);
    }
}

#[when(expr = "{word} submits all pending cash declaring {word}")]
async fn submit_declared(world: &mut LedgerWorld, courier: String, amount: String) {
    let courier = world.courier(&courier);
    let result =
        world.system().ledger.submit(courier, CollectionSelection::AllPending, Some(cents(&amount)), None).await;
    world.record(result);
}

#[when(expr = "{word} submits all pending cash")]
async fn submit_all(world: &mut LedgerWorld, courier: String) {
    let courier = world.courier(&courier);
    let result = world.system().ledger.submit(courier, CollectionSelection::AllPending, None, None).await;
    world.record(result);
}

async fn collection_for(world: &LedgerWorld, number: &str) -> CashCollection {
    let order = world.order(number);
    world
        .system()
        .db
        .fetch_collection_for_order(order)
        .await
        .expect("Error fetching collection")
        .unwrap_or_else(|| panic!("Order {number} has no cash collection"))
}

#[when(expr = "the operator reconciles the collection for order {word} receiving {word}")]
async fn reconcile(world: &mut LedgerWorld, number: String, actual: String) {
    let collection = collection_for(world, &number).await;
    let result =
        world.system().ledger.reconcile(collection.id, OPERATOR, Some(cents(&actual)), None, None).await;
    world.record(result);
}

#[when(expr = "the operator reconciles the collection for order {word}")]
async fn reconcile_default(world: &mut LedgerWorld, number: String) {
    let collection = collection_for(world, &number).await;
    let result = world.system().ledger.reconcile(collection.id, OPERATOR, None, None, None).await;
    world.record(result);
}

#[then(expr = "the last request failed with {word}")]
async fn check_error(world: &mut LedgerWorld, variant: String) {
    let err = world.last_error.as_ref().expect("The last request succeeded");
    let text = format!("{err:?}");
    assert!(text.starts_with(&variant), "Expected {variant}, got {text}");
}

#[then("the last request succeeded")]
async fn check_success(world: &mut LedgerWorld) {
    assert!(world.last_error.is_none(), "Request failed: {:?}", world.last_error);
}

#[then(expr = "order {word} is {word}")]
async fn check_order_status(world: &mut LedgerWorld, number: String, status: String) {
    let order = world.system().db.fetch_order(world.order(&number)).await.expect("Error fetching order");
    let order = order.expect("No such order");
    assert_eq!(order.status.to_string(), status);
}

#[then(expr = "order {word} has no cash collection")]
async fn check_no_collection(world: &mut LedgerWorld, number: String) {
    let order = world.order(&number);
    let collection = world.system().db.fetch_collection_for_order(order).await.expect("Error fetching collection");
    assert!(collection.is_none(), "Unexpected collection {collection:?}");
}

#[then(expr = "the collection for order {word} is {word} for {word}")]
async fn check_collection(world: &mut LedgerWorld, number: String, status: String, amount: String) {
    let collection = collection_for(world, &number).await;
    assert_eq!(collection.submission_status.to_string(), status);
    assert_eq!(collection.amount, cents(&amount));
}

#[then(expr = "the collection for order {word} is {word}")]
async fn check_collection_status(world: &mut LedgerWorld, number: String, status: String) {
    let collection = collection_for(world, &number).await;
    assert_eq!(collection.submission_status.to_string(), status);
}

#[then(expr = "the collection for order {word} has a discrepancy of {word} expected and {word} received")]
async fn check_discrepancy(world: &mut LedgerWorld, number: String, expected: String, actual: String) {
    let collection = collection_for(world, &number).await;
    assert_eq!(collection.submission_status, SubmissionStatus::Discrepancy);
    let discrepancy = collection.discrepancy().expect("No discrepancy recorded");
    assert_eq!(discrepancy.expected, cents(&expected));
    assert_eq!(discrepancy.actual, cents(&actual));
    assert!(!discrepancy.reason.is_empty());
}

#[then(expr = "the ledger reports the cash as {word}")]
async fn check_outcome(world: &mut LedgerWorld, outcome: String) {
    let last = world.last_outcome.as_ref().expect("No ledger outcome recorded");
    let matches = match outcome.as_str() {
        "created" => matches!(last, CollectionOutcome::Created(_)),
        "recorded" => matches!(last, CollectionOutcome::AlreadyRecorded(_)),
        "not_applicable" => matches!(last, CollectionOutcome::NotApplicable),
        other => panic!("Unknown outcome {other}"),
    };
    assert!(matches, "Expected {outcome}, got {last:?}");
}

#[then(expr = "the collections of {word} are {word} with submitted amounts {string}")]
async fn check_submitted(world: &mut LedgerWorld, courier: String, status: String, amounts: String) {
    let courier = world.courier(&courier);
    let filter = CollectionQueryFilter::default().with_courier(courier);
    let mut rows =
        world.system().db.fetch_collections(&filter, Pagination::new(0, 100)).await.expect("Error fetching history");
    // History is newest first
    rows.reverse();
    let expected = list(&amounts).iter().map(|a| Some(cents(a))).collect::<Vec<_>>();
    let actual = rows.iter().map(|c| c.submitted_amount).collect::<Vec<_>>();
    assert_eq!(actual, expected);
    assert!(rows.iter().all(|c| c.submission_status.to_string() == status));
}

#[then(expr = "{word} has {word} cash in hand")]
async fn check_cash_in_hand(world: &mut LedgerWorld, courier: String, amount: String) {
    let courier = world.courier(&courier);
    let record = world.system().db.fetch_courier(courier).await.expect("Error fetching courier").expect("No courier");
    assert_eq!(record.balances.cash_in_hand, cents(&amount));
    let truth = world.system().db.compute_courier_balances(courier).await.expect("Error computing balances");
    assert_eq!(record.balances, truth, "Cached balances have drifted from the ledger");
}

#[then(expr = "{word} has {word} awaiting submission")]
async fn check_pending(world: &mut LedgerWorld, courier: String, amount: String) {
    let courier = world.courier(&courier);
    let record = world.system().db.fetch_courier(courier).await.expect("Error fetching courier").expect("No courier");
    assert_eq!(record.balances.pending_cash_submission, cents(&amount));
}

#[then(expr = "{word} has submitted {word} in total")]
async fn check_total_submitted(world: &mut LedgerWorld, courier: String, amount: String) {
    let courier = world.courier(&courier);
    let record = world.system().db.fetch_courier(courier).await.expect("Error fetching courier").expect("No courier");
    assert_eq!(record.balances.total_cash_submitted, cents(&amount));
}

#[then(expr = "{word} has collected {word} in total")]
async fn check_total_collected(world: &mut LedgerWorld, courier: String, amount: String) {
    let courier = world.courier(&courier);
    let record = world.system().db.fetch_courier(courier).await.expect("Error fetching courier").expect("No courier");
    assert_eq!(record.balances.total_cash_collected, cents(&amount));
}

#[then(expr = "order {word} has {int} tracking events")]
async fn check_tracking(world: &mut LedgerWorld, number: String, count: usize) {
    let events = world.system().db.fetch_tracking_events(world.order(&number)).await.expect("Error fetching events");
    assert_eq!(events.len(), count);
}

#[then(expr = "order {word} has a delivery record")]
async fn check_delivery_record(world: &mut LedgerWorld, number: String) {
    let order = world.order(&number);
    let record = world.system().db.fetch_delivery_record(order).await.expect("Error fetching record");
    let record = record.expect("No delivery record");
    let collection = world.system().db.fetch_collection_for_order(order).await.expect("Error fetching collection");
    assert_eq!(record.cash_collection_id, collection.map(|c| c.id));
}
