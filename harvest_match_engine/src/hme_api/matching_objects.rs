use std::fmt::Display;

use chrono::{DateTime, Utc};
use hm_common::Quantity;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{BatchId, DemandRequest, DemandStatus, RequestId, SupplyBatch},
    events::MatchEvent,
    matching::AllocationKind,
};

//--------------------------------------   DemandQueryFilter   ---------------------------------------------------------
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DemandQueryFilter {
    pub product_id: Option<String>,
    pub variant: Option<String>,
    pub unit: Option<String>,
    pub consumer_id: Option<String>,
    pub batch_id: Option<BatchId>,
    pub statuses: Vec<DemandStatus>,
}

impl DemandQueryFilter {
    pub fn with_product_id<S: Into<String>>(mut self, product_id: S) -> Self {
        self.product_id = Some(product_id.into());
        self
    }

    pub fn with_variant<S: Into<String>>(mut self, variant: S) -> Self {
        self.variant = Some(variant.into());
        self
    }

    pub fn with_unit<S: Into<String>>(mut self, unit: S) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_consumer_id<S: Into<String>>(mut self, consumer_id: S) -> Self {
        self.consumer_id = Some(consumer_id.into());
        self
    }

    pub fn with_batch_id(mut self, batch_id: BatchId) -> Self {
        self.batch_id = Some(batch_id);
        self
    }

    pub fn with_status(mut self, status: DemandStatus) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.product_id.is_none() &&
            self.variant.is_none() &&
            self.unit.is_none() &&
            self.consumer_id.is_none() &&
            self.batch_id.is_none() &&
            self.statuses.is_empty()
    }
}

//--------------------------------------      Reservation      ---------------------------------------------------------
/// A request that moved to `reserved` during a matching run, as it was written to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub request: DemandRequest,
    pub allocated: Quantity,
    pub kind: AllocationKind,
}

//--------------------------------------    MatchingResult     ---------------------------------------------------------
/// The committed outcome of one matching run against a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingResult {
    /// The batch after the run
    pub batch: SupplyBatch,
    /// Reservations in the order the requests were served
    pub reservations: Vec<Reservation>,
    /// Malformed requests that were passed over and left pending
    pub skipped: Vec<RequestId>,
}

impl MatchingResult {
    pub fn reserved_count(&self) -> usize {
        self.reservations.len()
    }

    pub fn total_allocated(&self) -> Quantity {
        self.reservations.iter().map(|r| r.allocated).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.reservations.is_empty()
    }

    /// One event per reservation, stamped with the time the reservation was made.
    pub fn match_events(&self) -> Vec<MatchEvent> {
        self.reservations
            .iter()
            .map(|r| {
                let matched_at = r.request.matched_at.unwrap_or_else(|| self.completed_at());
                MatchEvent::new(r.request.clone(), self.batch.clone(), r.allocated, r.kind, matched_at)
            })
            .collect()
    }

    fn completed_at(&self) -> DateTime<Utc> {
        self.batch.matching_completed_at.unwrap_or(self.batch.updated_at)
    }
}

impl Display for MatchingResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} requests reserved for a total of {}. {} available, {} allocated.",
            self.batch.id,
            self.reserved_count(),
            self.total_allocated(),
            self.batch.available_quantity,
            self.batch.allocated_quantity,
        )?;
        if !self.skipped.is_empty() {
            write!(f, " {} malformed requests skipped.", self.skipped.len())?;
        }
        Ok(())
    }
}
