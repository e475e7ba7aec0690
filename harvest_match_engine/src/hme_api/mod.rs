//! # Harvest match engine public API
//!
//! * [`matching_api`] is the transaction coordinator. It runs the selector and allocator against a batch inside one
//!   ledger transaction and publishes match events once the transaction has committed.
//! * [`matching_objects`] holds the types passed in and out of the API.
//!
//! # API usage
//!
//! An API instance is created by supplying a ledger backend and the event producers for any hooks you want called.
//!
//! ```rust,ignore
//! use harvest_match_engine::{events::EventProducers, MatchingApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/harvest_match.db", 5).await?;
//! let api = MatchingApi::new(db, EventProducers::default());
//! let result = api.run_matching(batch_id).await?;
//! println!("{} requests reserved", result.reserved_count());
//! ```
mod batch_locks;

pub mod matching_api;
pub mod matching_objects;

pub use batch_locks::{BatchLockGuard, BatchLocks};
