use std::cmp::Ordering;

use log::*;

use crate::db_types::{DemandRequest, SupplyBatch};

/// A request may compete for a batch when it asks for the same product, variant and unit, is still pending, and has
/// not been linked to any batch yet.
pub fn is_eligible(batch: &SupplyBatch, request: &DemandRequest) -> bool {
    request.is_for(batch) && request.is_open()
}

/// FIFO order: oldest request first, with the request id breaking ties between identical creation times.
pub fn fifo_order(a: &DemandRequest, b: &DemandRequest) -> Ordering {
    a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id))
}

/// Filters `candidates` down to the requests that are eligible for `batch`, and sorts them into FIFO order.
///
/// An empty result simply means there is no demand for this batch.
pub fn select_eligible(batch: &SupplyBatch, candidates: Vec<DemandRequest>) -> Vec<DemandRequest> {
    let total = candidates.len();
    let mut eligible = candidates.into_iter().filter(|r| is_eligible(batch, r)).collect::<Vec<_>>();
    eligible.sort_by(fifo_order);
    if eligible.len() < total {
        debug!("🔄️ {} of {total} candidate requests are not eligible for {}", total - eligible.len(), batch.id);
    }
    eligible
}
