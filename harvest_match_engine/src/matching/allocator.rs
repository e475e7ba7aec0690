use hm_common::Quantity;
use log::*;
use serde::{Deserialize, Serialize};

use crate::db_types::{DemandRequest, RequestId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocationKind {
    /// The request received everything it asked for.
    Full,
    /// The batch ran out part way through the request. The request is still reserved against the batch.
    Partial,
}

/// The outcome for a single request that moves to `reserved`.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationDecision {
    pub request: DemandRequest,
    pub allocated: Quantity,
    pub kind: AllocationKind,
}

/// The result of one pass of the allocator over a batch's eligible requests.
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationPlan {
    pub available_before: Quantity,
    /// What is left in the batch after the pass. Becomes the batch's new `available_quantity`.
    pub remaining: Quantity,
    /// Requests that receive an allocation, in the order they were served.
    pub decisions: Vec<AllocationDecision>,
    /// Malformed requests that were passed over. They stay pending.
    pub skipped: Vec<RequestId>,
}

impl AllocationPlan {
    fn new(available_before: Quantity) -> Self {
        Self { available_before, remaining: available_before, decisions: vec![], skipped: vec![] }
    }

    /// The quantity taken out of the batch by this plan.
    pub fn consumed(&self) -> Quantity {
        self.available_before - self.remaining
    }

    pub fn is_empty(&self) -> bool {
        self.decisions.is_empty()
    }
}

/// Allocates `available` to the `eligible` requests, which must already be in FIFO order.
///
/// One pass, no backtracking. Each request is served in full while the batch can cover it. The first request the batch
/// cannot cover receives whatever is left and ends the pass. Requests after that are not looked at.
///
/// A requirement within [`hm_common::QUANTITY_EPSILON`] of the remaining supply counts as a full allocation and
/// receives exactly the remaining supply.
pub fn allocate(available: Quantity, eligible: &[DemandRequest]) -> AllocationPlan {
    let mut plan = AllocationPlan::new(available);
    if plan.remaining.is_exhausted() {
        debug!("🔄️ Nothing available to allocate ({available}).");
        return plan;
    }
    for request in eligible {
        if plan.remaining.is_exhausted() {
            break;
        }
        if !request.is_well_formed() {
            warn!(
                "🔄️ {} has an invalid quantity ({} x {}). It is skipped and left pending.",
                request.id, request.requested_quantity, request.conversion_factor
            );
            plan.skipped.push(request.id);
            continue;
        }
        let required = request.required_quantity();
        if required.fits_within(plan.remaining) {
            let allocated = required.min(plan.remaining);
            plan.remaining -= allocated;
            trace!("🔄️ {} allocated in full: {allocated}. {} remaining", request.id, plan.remaining);
            plan.decisions.push(AllocationDecision { request: request.clone(), allocated, kind: AllocationKind::Full });
        } else {
            let allocated = plan.remaining;
            plan.remaining = Quantity::zero();
            trace!("🔄️ {} allocated in part: {allocated} of {required}. Supply exhausted", request.id);
            plan.decisions.push(AllocationDecision {
                request: request.clone(),
                allocated,
                kind: AllocationKind::Partial,
            });
            break;
        }
    }
    plan
}
