//! # Matching
//!
//! The pure, in-memory half of a matching run. Nothing in here touches the ledger.
//!
//! * [`selector`] picks the requests that compete for a batch and puts them in FIFO order.
//! * [`allocator`] walks that queue once and decides how much of the batch each request receives.
//!
//! The transaction coordinator ([`crate::MatchingApi`]) loads a snapshot, feeds it through both steps and persists the
//! resulting [`AllocationPlan`] in one transaction.
pub mod allocator;
pub mod selector;

pub use allocator::{allocate, AllocationDecision, AllocationKind, AllocationPlan};
pub use selector::{fifo_order, is_eligible, select_eligible};
