//! Harvest Match Engine
//!
//! The harvest match engine assigns published supply batches of produce to pending demand requests, oldest request
//! first, and tells every matched consumer about their reservation.
//!
//! The library is divided into three main sections:
//! 1. The allocation ledger (`traits` and `sqlite`). The ledger stores batches and requests and hands out the
//!    transactions a matching run executes in. SQLite is the supported backend. Specific backends need to implement
//!    [`AllocationLedger`] and [`LedgerTransaction`]. The data types stored in the ledger are defined in the
//!    [`mod@db_types`] module and are public.
//! 2. The matching rules ([`mod@matching`]). The selector decides which requests a batch can serve and in which
//!    order, and the allocator decides how much each of them receives. Both are pure functions of their inputs.
//! 3. The public API ([`MatchingApi`]). This coordinates a complete matching run for a batch: lock, select, allocate,
//!    write, commit, notify.
//!
//! Consumers learn about their reservations through events. A simple Actor framework is used so that you can hook
//! into [`events::MatchEvent`] and deliver notifications however you like. Events are only published after the
//! matching transaction has committed.
pub mod db_types;
pub mod events;
pub mod matching;

mod hme_api;
mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use hme_api::{matching_api::MatchingApi, matching_objects, BatchLockGuard, BatchLocks};
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteDatabase, SqliteLedgerTransaction};
pub use traits::{AllocationLedger, BatchSettlement, LedgerTransaction, MatchingError};
