use std::{
    future::Future,
    pin::Pin,
    sync::{atomic::AtomicI32, Arc, Mutex},
};

use chrono::{DateTime, TimeZone, Utc};
use harvest_match_engine::{
    db_types::{NewDemandRequest, NewSupplyBatch},
    events::{EventHandlers, EventHooks, MatchEvent},
    test_utils::prepare_env::new_test_ledger,
    AllocationLedger,
    MatchingApi,
    SqliteDatabase,
};
use hm_common::Quantity;
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};
use tokio::runtime::Runtime;

async fn setup(hooks: EventHooks) -> MatchingApi<SqliteDatabase> {
    let db = new_test_ledger(1).await;
    let handlers = EventHandlers::new(10, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;
    MatchingApi::new(db, producers)
}

async fn tear_down(mut api: MatchingApi<SqliteDatabase>) {
    if let Err(e) = api.db_mut().close().await {
        error!("🚀️ Failed to close database: {e}");
    }
    Sqlite::drop_database(api.db().url()).await.unwrap();
}

#[derive(Default, Clone)]
struct HookCalled {
    called: Arc<AtomicI32>,
    events: Arc<Mutex<Vec<MatchEvent>>>,
}

impl HookCalled {
    pub fn called(&self, event: MatchEvent) {
        let _ = self.called.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        self.events.lock().unwrap().push(event);
    }

    pub fn count(&self) -> i32 {
        self.called.load(std::sync::atomic::Ordering::Relaxed)
    }
}

fn harvested_on() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 14, 6, 30, 0).unwrap()
}

fn hooks_for(event: &HookCalled) -> EventHooks {
    let event_copy = event.clone();
    let mut hooks = EventHooks::default();
    hooks.on_request_reserved(move |ev| {
        info!("🪝️ {} reserved {}", ev.request.id, ev.allocated);
        event_copy.called(ev);
        Box::pin(async {}) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    hooks
}

async fn wait_for_events(event: &HookCalled, expected: i32) {
    for _ in 0..50 {
        if event.count() >= expected {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
}

#[test]
fn on_request_reserved() {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let rt = Runtime::new().unwrap();
    let event = HookCalled::default();
    let hooks = hooks_for(&event);
    let event_copy = event.clone();
    let request_ids = rt.block_on(async move {
        let api = setup(hooks).await;
        let batch = NewSupplyBatch::new("greenacre", "tomato", "heirloom", "kg", Quantity::from(5.0))
            .with_harvest_date(harvested_on());
        let batch = api.db().insert_batch(batch).await.expect("Error inserting batch");
        assert_eq!(batch.harvest_date, harvested_on());
        let mut ids = Vec::new();
        for (consumer, qty) in [("alice", 2.0), ("bob", 4.0), ("carol", 1.0)] {
            let request = NewDemandRequest::new(consumer, "tomato", "heirloom", "kg", Quantity::from(qty));
            let request = api.db().insert_request(request).await.expect("Error inserting request");
            ids.push(request.id);
        }
        let result = api.run_matching(batch.id).await.expect("Error running matching");
        assert_eq!(result.reserved_count(), 2);
        wait_for_events(&event_copy, 2).await;
        tear_down(api).await;
        ids
    });
    assert_eq!(event.count(), 2);
    let events = event.events.lock().unwrap();
    let alice = events.iter().find(|e| e.request.consumer_id == "alice").expect("alice was not notified");
    let note = alice.notification();
    assert_eq!(note.request_id, request_ids[0]);
    assert_eq!(note.consumer_id, "alice");
    assert_eq!(note.product_id, "tomato");
    assert_eq!(note.variant, "heirloom");
    assert_eq!(note.harvest_date, harvested_on());
    assert!(!note.partial);
    assert_eq!(note.allocated_quantity, Quantity::from(2.0));
    assert_eq!(note.seller_id, "greenacre");
    assert_eq!(note.unit, "kg");
    let bob = events.iter().find(|e| e.request.consumer_id == "bob").expect("bob was not notified");
    let note = bob.notification();
    assert_eq!(note.request_id, request_ids[1]);
    assert_eq!(note.harvest_date, harvested_on());
    assert!(note.partial);
    assert_eq!(note.allocated_quantity, Quantity::from(3.0));
    assert_eq!(note.batch_id, bob.batch.id);
    assert_eq!(Some(note.matched_at), bob.request.matched_at);
    assert!(events.iter().all(|e| e.request.consumer_id != "carol"));
    info!("🪝️ test complete");
}

#[test]
fn no_events_for_an_empty_run() {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let rt = Runtime::new().unwrap();
    let event = HookCalled::default();
    let hooks = hooks_for(&event);
    rt.block_on(async move {
        let api = setup(hooks).await;
        let batch = NewSupplyBatch::new("greenacre", "tomato", "premium", "kg", Quantity::from(10.0));
        let batch = api.db().insert_batch(batch).await.expect("Error inserting batch");
        let request = NewDemandRequest::new("alice", "tomato", "regular", "kg", Quantity::from(1.0));
        let _ = api.db().insert_request(request).await.expect("Error inserting request");
        let result = api.run_matching(batch.id).await.expect("Error running matching");
        assert!(result.is_empty());
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        tear_down(api).await;
    });
    assert_eq!(event.count(), 0);
}

#[test]
fn notification_serializes_for_delivery() {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let rt = Runtime::new().unwrap();
    let event = HookCalled::default();
    let hooks = hooks_for(&event);
    let event_copy = event.clone();
    rt.block_on(async move {
        let api = setup(hooks).await;
        let batch = NewSupplyBatch::new("orchard", "apple", "gala", "kg", Quantity::from(3.0));
        let batch = api.db().insert_batch(batch).await.expect("Error inserting batch");
        let request = NewDemandRequest::new("dave", "apple", "gala", "kg", Quantity::from(1.5));
        let _ = api.db().insert_request(request).await.expect("Error inserting request");
        let _ = api.run_matching(batch.id).await.expect("Error running matching");
        wait_for_events(&event_copy, 1).await;
        tear_down(api).await;
    });
    let events = event.events.lock().unwrap();
    assert_eq!(events.len(), 1);
    let json = serde_json::to_value(events[0].notification()).unwrap();
    assert_eq!(json["consumer_id"], "dave");
    assert_eq!(json["product_id"], "apple");
    assert_eq!(json["allocated_quantity"], 1.5);
    assert_eq!(json["partial"], false);
}
