use chrono::{DateTime, Utc};
use hm_common::Quantity;

use crate::{
    db_types::{BatchId, DemandRequest, RequestId, SupplyBatch},
    traits::{BatchSettlement, MatchingError},
};

/// An open ledger transaction, scoped to a single matching run.
///
/// Implementations must give the holder exclusive write access to the batch from [`lock_batch`] until the handle is
/// committed or rolled back, and must discard every write if the handle is dropped before [`commit`] succeeds.
///
/// [`lock_batch`]: LedgerTransaction::lock_batch
/// [`commit`]: LedgerTransaction::commit
#[allow(async_fn_in_trait)]
pub trait LedgerTransaction {
    /// Takes the write lock for the batch and returns its current state.
    ///
    /// Returns [`MatchingError::BatchNotFound`] if there is no such batch.
    async fn lock_batch(&mut self, batch_id: BatchId) -> Result<SupplyBatch, MatchingError>;

    /// Loads the pending, unlinked requests for the batch's product, variant and unit, oldest first.
    async fn fetch_eligible_requests(&mut self, batch: &SupplyBatch) -> Result<Vec<DemandRequest>, MatchingError>;

    /// Marks the request as reserved against `batch_id`.
    ///
    /// The write only applies to a request that is still pending with no batch linked. Otherwise the result is
    /// [`MatchingError::Conflict`] (or [`MatchingError::RequestNotFound`] if the request has gone).
    async fn reserve_request(
        &mut self,
        request_id: RequestId,
        batch_id: BatchId,
        allocated: Quantity,
        matched_at: DateTime<Utc>,
    ) -> Result<DemandRequest, MatchingError>;

    /// Writes the batch's new quantity totals and its matching-completed timestamp.
    ///
    /// The write only applies if the stored `available_quantity` still equals `settlement.expected_available`.
    /// Otherwise the result is [`MatchingError::Conflict`].
    async fn settle_batch(&mut self, settlement: &BatchSettlement) -> Result<SupplyBatch, MatchingError>;

    async fn commit(self) -> Result<(), MatchingError>;

    async fn rollback(self) -> Result<(), MatchingError>;
}
