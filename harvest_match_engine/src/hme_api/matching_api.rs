use std::{fmt::Debug, time::Duration};

use chrono::Utc;
use log::*;

use crate::{
    db_types::{BatchId, SupplyBatch},
    events::EventProducers,
    hme_api::{
        matching_objects::{MatchingResult, Reservation},
        BatchLocks,
    },
    matching::{allocate, select_eligible},
    traits::{AllocationLedger, BatchSettlement, LedgerTransaction, MatchingError},
};

/// `MatchingApi` is the transaction coordinator for the matching engine.
///
/// A matching run for a batch
/// 1. takes the in-process lock for the batch and opens a ledger transaction,
/// 2. locks and loads the batch, loads its eligible requests, and computes an allocation plan in memory,
/// 3. writes every reservation and the batch's new totals,
/// 4. commits, or rolls everything back if any step failed,
/// 5. publishes one [`crate::events::MatchEvent`] per reservation, after the commit.
///
/// Runs against the same batch are serialised. Runs against different batches proceed concurrently. Clones of an
/// instance share their batch locks.
#[derive(Clone)]
pub struct MatchingApi<B> {
    db: B,
    producers: EventProducers,
    locks: BatchLocks,
}

impl<B> Debug for MatchingApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MatchingApi")
    }
}

impl<B> MatchingApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, locks: BatchLocks::new() }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}

impl<B> MatchingApi<B>
where B: AllocationLedger
{
    /// Matches the batch against all of its currently eligible demand, oldest request first.
    ///
    /// This call is safe to repeat. Requests that are already reserved are never selected again, and the batch's
    /// available quantity is re-read at the start of every run. A repeat run with no new demand changes nothing.
    ///
    /// On error, nothing has been written to the ledger and no events have been published.
    pub async fn run_matching(&self, batch_id: BatchId) -> Result<MatchingResult, MatchingError> {
        let _lock = self.locks.acquire(batch_id).await;
        trace!("🔄️ Acquired matching lock for {batch_id}");
        let (tx, result) = self.stage_run(batch_id).await?;
        let result = commit_run(tx, result).await?;
        self.notify(&result).await;
        Ok(result)
    }

    /// As [`Self::run_matching`], but gives up if the run has not been staged within `limit`. An abandoned run is
    /// rolled back.
    ///
    /// The deadline covers waiting for the batch lock and everything up to the commit. The commit itself is not bounded,
    /// so a run that commits is always reported as a success.
    pub async fn run_matching_with_timeout(
        &self,
        batch_id: BatchId,
        limit: Duration,
    ) -> Result<MatchingResult, MatchingError> {
        let staged = tokio::time::timeout(limit, async {
            let lock = self.locks.acquire(batch_id).await;
            trace!("🔄️ Acquired matching lock for {batch_id}");
            self.stage_run(batch_id).await.map(|staged| (lock, staged))
        })
        .await;
        let (_lock, (tx, result)) = match staged {
            Ok(staged) => staged?,
            Err(_) => {
                error!("🔄️ Matching run for {batch_id} was not ready to commit within {}ms. Abandoned.", limit.as_millis());
                return Err(MatchingError::Timeout);
            },
        };
        let result = commit_run(tx, result).await?;
        self.notify(&result).await;
        Ok(result)
    }

    /// Opens a transaction and makes every write for the run, leaving it ready to commit. On error the transaction has
    /// already been rolled back. Dropping the returned transaction also discards it.
    async fn stage_run(&self, batch_id: BatchId) -> Result<(B::Transaction, MatchingResult), MatchingError> {
        let mut tx = self.db.begin().await.map_err(|e| {
            error!("🔄️ Could not start a matching transaction for {batch_id}. {e}");
            e
        })?;
        match match_in_transaction(&mut tx, batch_id).await {
            Ok(result) => Ok((tx, result)),
            Err(e) => {
                error!("🔄️ Matching run for {batch_id} failed. Rolling back. {e}");
                if let Err(rb) = tx.rollback().await {
                    warn!("🔄️ Explicit rollback for {batch_id} failed: {rb}. The transaction is discarded regardless.");
                }
                Err(e)
            },
        }
    }

    async fn notify(&self, result: &MatchingResult) {
        if result.is_empty() || self.producers.is_empty() {
            return;
        }
        debug!("🔄️ Notifying {} match event subscribers for {}", result.reserved_count(), result.batch.id);
        self.producers.publish_match_events(result.match_events()).await;
    }
}

async fn commit_run<T: LedgerTransaction>(tx: T, result: MatchingResult) -> Result<MatchingResult, MatchingError> {
    tx.commit().await.map_err(|e| {
        error!("🔄️ Could not commit matching run for {}. {e}", result.batch.id);
        e
    })?;
    info!("🔄️ Matching run committed. {result}");
    Ok(result)
}

/// Everything between `begin` and `commit`. Any error returned from here means the transaction must be discarded.
async fn match_in_transaction<T: LedgerTransaction>(
    tx: &mut T,
    batch_id: BatchId,
) -> Result<MatchingResult, MatchingError> {
    let batch = tx.lock_batch(batch_id).await?;
    check_batch(&batch)?;
    let candidates = tx.fetch_eligible_requests(&batch).await?;
    let eligible = select_eligible(&batch, candidates);
    debug!("🔄️ {batch_id} has {} available for {} eligible requests", batch.available_quantity, eligible.len());
    let plan = allocate(batch.available_quantity, &eligible);
    if plan.is_empty() && batch.is_matched() {
        debug!("🔄️ Nothing to allocate for {batch_id}, which has been matched before. Leaving it untouched.");
        return Ok(MatchingResult { batch, reservations: vec![], skipped: plan.skipped });
    }
    let now = Utc::now();
    let settlement = BatchSettlement {
        batch_id,
        expected_available: batch.available_quantity,
        allocated: batch.allocated_quantity + plan.consumed(),
        available: plan.remaining,
        completed_at: now,
    };
    let mut reservations = Vec::with_capacity(plan.decisions.len());
    for decision in plan.decisions {
        let request = tx.reserve_request(decision.request.id, batch_id, decision.allocated, now).await?;
        trace!("🔄️ {} reserved {} against {batch_id} ({:?})", request.id, decision.allocated, decision.kind);
        reservations.push(Reservation { request, allocated: decision.allocated, kind: decision.kind });
    }
    let batch = tx.settle_batch(&settlement).await?;
    check_batch(&batch)?;
    Ok(MatchingResult { batch, reservations, skipped: plan.skipped })
}

fn check_batch(batch: &SupplyBatch) -> Result<(), MatchingError> {
    if !batch.available_quantity.is_finite() || batch.available_quantity.value() < 0.0 || !batch.is_balanced() {
        return Err(MatchingError::InvalidData(format!(
            "{} quantities do not add up. total: {}, allocated: {}, available: {}",
            batch.id, batch.total_quantity, batch.allocated_quantity, batch.available_quantity
        )));
    }
    Ok(())
}
