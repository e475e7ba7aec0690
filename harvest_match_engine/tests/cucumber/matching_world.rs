use std::{
    collections::HashMap,
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex},
};

use cucumber::World;
use harvest_match_engine::{
    db_types::{BatchId, RequestId},
    events::{EventHandlers, EventHooks, MatchNotification},
    matching_objects::MatchingResult,
    test_utils::prepare_env::{create_database, random_db_path, run_migrations},
    AllocationLedger,
    MatchingApi,
    MatchingError,
    SqliteDatabase,
};
use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};

#[derive(Default, Debug, World)]
pub struct MatchingWorld {
    pub system: Option<MatchingSystem>,
    /// Batches and requests by the names used in the feature files
    pub batches: HashMap<String, BatchId>,
    pub requests: HashMap<String, RequestId>,
    pub last_result: Option<Result<MatchingResult, MatchingError>>,
}

#[derive(Debug)]
pub struct MatchingSystem {
    pub db_path: String,
    pub api: MatchingApi<SqliteDatabase>,
    pub notifications: Arc<Mutex<Vec<MatchNotification>>>,
}

impl MatchingWorld {
    pub fn api(&self) -> &MatchingApi<SqliteDatabase> {
        &self.system.as_ref().expect("MatchingApi not initialised").api
    }

    pub fn batch_id(&self, name: &str) -> BatchId {
        *self.batches.get(name).unwrap_or_else(|| panic!("No batch called {name}"))
    }

    pub fn request_id(&self, name: &str) -> RequestId {
        *self.requests.get(name).unwrap_or_else(|| panic!("No request called {name}"))
    }

    pub fn notifications(&self) -> Vec<MatchNotification> {
        let system = self.system.as_ref().expect("MatchingApi not initialised");
        system.notifications.lock().unwrap().clone()
    }
}

impl MatchingSystem {
    pub async fn new() -> Self {
        let url = prepare_test_env().await;
        let db = SqliteDatabase::new_with_url(&url, 1).await.expect("Error creating connection to database");
        debug!("Created database: {url}");
        let notifications = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&notifications);
        let mut hooks = EventHooks::default();
        hooks.on_request_reserved(move |ev| {
            let sink = Arc::clone(&sink);
            Box::pin(async move {
                sink.lock().unwrap().push(ev.notification());
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
        let handlers = EventHandlers::new(25, hooks);
        let producers = handlers.producers();
        handlers.start_handlers().await;
        let api = MatchingApi::new(db, producers);
        Self { db_path: url, api, notifications }
    }

    pub async fn tear_down(mut self) {
        debug!("🚀️ Removing database: {}", self.db_path);
        if let Err(e) = self.api.db_mut().close().await {
            error!("🚀️ Failed to close database: {e}");
        }
        if let Err(e) = Sqlite::drop_database(&self.db_path).await {
            error!("🚀️ Failed to remove database {}: {e}", self.db_path);
        }
    }
}

pub async fn prepare_test_env() -> String {
    let path = random_db_path();
    create_database(&path).await;
    run_migrations(&path).await;
    path
}
