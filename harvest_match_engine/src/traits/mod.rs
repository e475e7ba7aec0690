//! # Ledger backends
//!
//! This module defines the contracts a storage backend must satisfy to act as the allocation ledger for the matching
//! engine.
//!
//! * [`AllocationLedger`] covers intake of batches and requests, read-only queries, and opening a transaction.
//! * [`LedgerTransaction`] is the explicit transaction handle. Every read and write of a matching run goes through it,
//!   and nothing is visible to other readers until [`LedgerTransaction::commit`] succeeds. Dropping a handle without
//!   committing rolls the transaction back.
//!
//! Field names and storage technology are the backend's concern. The engine only needs atomic read-modify-write
//! access scoped to one batch at a time.
mod allocation_ledger;
mod data_objects;
mod ledger_transaction;

pub use allocation_ledger::{AllocationLedger, MatchingError};
pub use data_objects::BatchSettlement;
pub use ledger_transaction::LedgerTransaction;
