use std::time::Duration;

use chrono::Utc;
use cucumber::{given, then, when};
use harvest_match_engine::{
    db_types::{DemandRequest, DemandStatus, NewDemandRequest, NewSupplyBatch, SupplyBatch},
    AllocationLedger,
    LedgerTransaction,
    MatchingError,
};
use hm_common::Quantity;

use crate::cucumber::MatchingWorld;

#[given(expr = "batch {word} offers {float} {word} of {word} {word} from seller {word}")]
async fn publish_batch(
    world: &mut MatchingWorld,
    name: String,
    qty: f64,
    unit: String,
    product: String,
    variant: String,
    seller: String,
) {
    let batch = NewSupplyBatch::new(seller, product, variant, unit, Quantity::from(qty));
    let batch = world.api().db().insert_batch(batch).await.expect("Error inserting batch");
    world.batches.insert(name, batch.id);
}

#[given(expr = "{word} requests {float} {word} of {word} {word} as {word}")]
async fn place_request(
    world: &mut MatchingWorld,
    consumer: String,
    qty: f64,
    unit: String,
    product: String,
    variant: String,
    name: String,
) {
    let request = NewDemandRequest::new(consumer, product, variant, unit, Quantity::from(qty));
    insert_request(world, name, request).await;
}

#[given(expr = "{word} requests {float} {word} of {word} {word} as {word} with conversion factor {float}")]
async fn place_request_with_factor(
    world: &mut MatchingWorld,
    consumer: String,
    qty: f64,
    unit: String,
    product: String,
    variant: String,
    name: String,
    factor: f64,
) {
    let request =
        NewDemandRequest::new(consumer, product, variant, unit, Quantity::from(qty)).with_conversion_factor(factor);
    insert_request(world, name, request).await;
}

async fn insert_request(world: &mut MatchingWorld, name: String, request: NewDemandRequest) {
    // Requests must have distinct creation times for the FIFO assertions to mean anything
    tokio::time::sleep(Duration::from_millis(2)).await;
    let request = world.api().db().insert_request(request).await.expect("Error inserting request");
    world.requests.insert(name, request.id);
}

#[given(expr = "request {word} was already reserved against batch {word} for {float}")]
async fn reserve_elsewhere(world: &mut MatchingWorld, request: String, batch: String, qty: f64) {
    let request_id = world.request_id(&request);
    let batch_id = world.batch_id(&batch);
    let mut tx = world.api().db().begin().await.expect("Error starting transaction");
    tx.reserve_request(request_id, batch_id, Quantity::from(qty), Utc::now()).await.expect("Error reserving request");
    tx.commit().await.expect("Error committing transaction");
}

#[when(expr = "I run matching for batch {word}")]
async fn run_matching(world: &mut MatchingWorld, name: String) {
    let batch_id = world.batch_id(&name);
    let result = world.api().run_matching(batch_id).await;
    world.last_result = Some(result);
}

#[when("I run matching for a batch that does not exist")]
async fn run_matching_missing_batch(world: &mut MatchingWorld) {
    let batch_id = harvest_match_engine::db_types::BatchId(999_999);
    let result = world.api().run_matching(batch_id).await;
    world.last_result = Some(result);
}

#[when(expr = "I pause for {int}ms")]
async fn pause(_world: &mut MatchingWorld, ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[then(expr = "the matching run reserved {int} requests")]
async fn check_reserved_count(world: &mut MatchingWorld, count: usize) {
    let result = world.last_result.as_ref().expect("No matching run yet");
    let result = result.as_ref().expect("The matching run failed");
    assert_eq!(result.reserved_count(), count, "Unexpected number of reservations. {result}");
}

#[then(expr = "the matching run skipped {int} malformed requests")]
async fn check_skipped_count(world: &mut MatchingWorld, count: usize) {
    let result = world.last_result.as_ref().expect("No matching run yet");
    let result = result.as_ref().expect("The matching run failed");
    assert_eq!(result.skipped.len(), count);
}

#[then("the matching run failed because the batch does not exist")]
async fn check_batch_not_found(world: &mut MatchingWorld) {
    let result = world.last_result.as_ref().expect("No matching run yet");
    assert!(matches!(result, Err(MatchingError::BatchNotFound(_))), "Expected BatchNotFound, got {result:?}");
}

async fn fetch_request(world: &MatchingWorld, name: &str) -> DemandRequest {
    let id = world.request_id(name);
    world.api().db().fetch_request(id).await.expect("Error fetching request").expect("Request does not exist")
}

async fn fetch_batch(world: &MatchingWorld, name: &str) -> SupplyBatch {
    let id = world.batch_id(name);
    world.api().db().fetch_batch(id).await.expect("Error fetching batch").expect("Batch does not exist")
}

#[then(expr = "request {word} is {word} reserved with {float} from batch {word}")]
async fn check_reserved(world: &mut MatchingWorld, name: String, kind: String, qty: f64, batch: String) {
    let request = fetch_request(world, &name).await;
    assert_eq!(request.status, DemandStatus::Reserved, "{name} is not reserved");
    assert_eq!(request.batch_id, Some(world.batch_id(&batch)));
    assert!(request.matched_at.is_some());
    let allocated = request.allocated_quantity.expect("No allocated quantity");
    assert!(allocated.approx_eq(Quantity::from(qty)), "{name} has {allocated} allocated, expected {qty}");
    let full = allocated.approx_eq(request.required_quantity());
    match kind.as_str() {
        "fully" => assert!(full, "{name} was expected to be fully allocated"),
        "partially" => assert!(!full, "{name} was expected to be partially allocated"),
        _ => panic!("Unknown reservation kind {kind}"),
    }
}

#[then(expr = "request {word} is still pending")]
async fn check_pending(world: &mut MatchingWorld, name: String) {
    let request = fetch_request(world, &name).await;
    assert_eq!(request.status, DemandStatus::Pending, "{name} is not pending");
    assert!(request.batch_id.is_none());
    assert!(request.allocated_quantity.is_none());
    assert!(request.matched_at.is_none());
}

#[then(expr = "request {word} is still reserved against batch {word}")]
async fn check_still_reserved(world: &mut MatchingWorld, name: String, batch: String) {
    let request = fetch_request(world, &name).await;
    assert_eq!(request.status, DemandStatus::Reserved);
    assert_eq!(request.batch_id, Some(world.batch_id(&batch)));
}

#[then(expr = "batch {word} has {float} available and {float} allocated")]
async fn check_batch_totals(world: &mut MatchingWorld, name: String, available: f64, allocated: f64) {
    let batch = fetch_batch(world, &name).await;
    assert!(
        batch.available_quantity.approx_eq(Quantity::from(available)),
        "{name} has {} available, expected {available}",
        batch.available_quantity
    );
    assert!(
        batch.allocated_quantity.approx_eq(Quantity::from(allocated)),
        "{name} has {} allocated, expected {allocated}",
        batch.allocated_quantity
    );
    assert!(batch.is_balanced(), "{name} no longer balances");
}

#[then(expr = "batch {word} is marked as matched")]
async fn check_batch_matched(world: &mut MatchingWorld, name: String) {
    let batch = fetch_batch(world, &name).await;
    assert!(batch.is_matched(), "{name} has no matching completion time");
}

#[then(expr = "batch {word} has not been matched")]
async fn check_batch_not_matched(world: &mut MatchingWorld, name: String) {
    let batch = fetch_batch(world, &name).await;
    assert!(!batch.is_matched(), "{name} has a matching completion time");
}

#[then(expr = "{int} match notifications were sent")]
async fn check_notification_count(world: &mut MatchingWorld, count: usize) {
    // Handlers run asynchronously. Give them a moment, then make sure no stragglers arrive.
    for _ in 0..50 {
        if world.notifications().len() >= count {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(world.notifications().len(), count);
}

#[then(expr = "{word} was notified of {float} {word} of {word} {word} from {word}")]
async fn check_notification(
    world: &mut MatchingWorld,
    consumer: String,
    qty: f64,
    unit: String,
    product: String,
    variant: String,
    seller: String,
) {
    let notifications = world.notifications();
    let found = notifications.iter().any(|n| {
        n.consumer_id == consumer &&
            n.allocated_quantity.approx_eq(Quantity::from(qty)) &&
            n.unit == unit &&
            n.product_id == product &&
            n.variant == variant &&
            n.seller_id == seller
    });
    assert!(found, "No notification for {consumer}. Got {notifications:?}");
}

#[then(expr = "the notification for {word} is marked as partial")]
async fn check_partial_notification(world: &mut MatchingWorld, consumer: String) {
    let notifications = world.notifications();
    let n = notifications.iter().find(|n| n.consumer_id == consumer).expect("No notification found");
    assert!(n.partial, "Notification for {consumer} is not marked as partial");
}
