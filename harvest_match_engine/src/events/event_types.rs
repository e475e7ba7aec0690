use chrono::{DateTime, Utc};
use hm_common::Quantity;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{BatchId, DemandRequest, RequestId, SupplyBatch},
    matching::AllocationKind,
};

/// Published once for every request reserved by a committed matching run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEvent {
    pub request: DemandRequest,
    pub batch: SupplyBatch,
    pub allocated: Quantity,
    pub kind: AllocationKind,
    pub matched_at: DateTime<Utc>,
}

impl MatchEvent {
    pub fn new(
        request: DemandRequest,
        batch: SupplyBatch,
        allocated: Quantity,
        kind: AllocationKind,
        matched_at: DateTime<Utc>,
    ) -> Self {
        Self { request, batch, allocated, kind, matched_at }
    }

    /// The payload handed to whatever messaging system tells the consumer and seller about the match.
    pub fn notification(&self) -> MatchNotification {
        MatchNotification {
            request_id: self.request.id,
            consumer_id: self.request.consumer_id.clone(),
            seller_id: self.batch.seller_id.clone(),
            product_id: self.batch.product_id.clone(),
            variant: self.batch.variant.clone(),
            unit: self.batch.unit.clone(),
            allocated_quantity: self.allocated,
            partial: self.kind == AllocationKind::Partial,
            batch_id: self.batch.id,
            harvest_date: self.batch.harvest_date,
            matched_at: self.matched_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchNotification {
    pub request_id: RequestId,
    pub consumer_id: String,
    pub seller_id: String,
    pub product_id: String,
    pub variant: String,
    pub unit: String,
    pub allocated_quantity: Quantity,
    pub partial: bool,
    pub batch_id: BatchId,
    pub harvest_date: DateTime<Utc>,
    pub matched_at: DateTime<Utc>,
}
