use std::time::Duration;

use harvest_match_engine::{
    db_types::{BatchId, SupplyBatch},
    AllocationLedger,
    MatchingApi,
    MatchingError,
    SqliteDatabase,
};
use log::*;
use tokio::{sync::watch, task::JoinHandle};

/// Tallies for one pass of the worker over a set of batches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassSummary {
    pub batches_matched: usize,
    pub requests_reserved: usize,
    /// Failures that are expected to clear up on their own. These batches are picked up again on the next pass.
    pub retriable_failures: usize,
    pub failures: usize,
}

impl PassSummary {
    pub fn batches_attempted(&self) -> usize {
        self.batches_matched + self.retriable_failures + self.failures
    }
}

/// Starts the matching worker. It polls for unmatched batches until `shutdown` flips to `true` or its sender is
/// dropped. A pass that is under way when the signal arrives is finished first. The API, and with it the event
/// producers, is dropped when the returned task completes.
pub fn start_matching_worker(
    api: MatchingApi<SqliteDatabase>,
    poll_interval: Duration,
    match_timeout: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(poll_interval);
        info!("🕰️ Matching worker started. Polling every {}s", poll_interval.as_secs());
        loop {
            tokio::select! {
                _ = timer.tick() => {},
                _ = shutdown.changed() => {
                    info!("🕰️ Matching worker stopping");
                    break;
                },
            }
            trace!("🕰️ Scanning for unmatched batches");
            match match_unmatched_batches(&api, match_timeout).await {
                Ok(summary) if summary.batches_attempted() > 0 => {
                    info!(
                        "🕰️ {} batches matched, {} requests reserved. {} batches will be retried",
                        summary.batches_matched, summary.requests_reserved, summary.retriable_failures
                    );
                },
                Ok(_) => trace!("🕰️ No unmatched batches"),
                Err(e) => {
                    error!("🕰️ Could not fetch unmatched batches: {e}");
                },
            }
        }
    })
}

/// Runs the engine once against every batch that has never been matched, oldest first.
pub async fn match_unmatched_batches<B: AllocationLedger>(
    api: &MatchingApi<B>,
    match_timeout: Duration,
) -> Result<PassSummary, MatchingError> {
    let batches = api.db().fetch_unmatched_batches().await?;
    if !batches.is_empty() {
        debug!("🕰️ {} unmatched batches found: {}", batches.len(), batch_list(&batches));
    }
    let ids = batches.into_iter().map(|b| b.id).collect::<Vec<_>>();
    Ok(match_batches(api, &ids, match_timeout).await)
}

/// Runs the engine once against each of the given batches, in order. A failing batch does not stop the others.
pub async fn match_batches<B: AllocationLedger>(
    api: &MatchingApi<B>,
    batch_ids: &[BatchId],
    match_timeout: Duration,
) -> PassSummary {
    let mut summary = PassSummary::default();
    for &batch_id in batch_ids {
        match api.run_matching_with_timeout(batch_id, match_timeout).await {
            Ok(result) => {
                debug!("🕰️ {result}");
                summary.batches_matched += 1;
                summary.requests_reserved += result.reserved_count();
            },
            Err(e) if e.is_retriable() => {
                warn!("🕰️ Matching {batch_id} failed, but can be retried. {e}");
                summary.retriable_failures += 1;
            },
            Err(e) => {
                error!("🕰️ Matching {batch_id} failed. {e}");
                summary.failures += 1;
            },
        }
    }
    summary
}

fn batch_list(batches: &[SupplyBatch]) -> String {
    batches
        .iter()
        .map(|b| format!("[{}] {}/{} {} {}", b.id, b.product_id, b.variant, b.available_quantity, b.unit))
        .collect::<Vec<String>>()
        .join(", ")
}
