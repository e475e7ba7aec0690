use chrono::{DateTime, Utc};
use hm_common::Quantity;
use serde::{Deserialize, Serialize};

use crate::db_types::BatchId;

/// The new quantity totals for a batch at the end of a matching run.
///
/// `expected_available` is the batch's `available_quantity` as it was read at the start of the run. The backend must
/// refuse the update if the stored value no longer matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSettlement {
    pub batch_id: BatchId,
    pub expected_available: Quantity,
    pub allocated: Quantity,
    pub available: Quantity,
    pub completed_at: DateTime<Utc>,
}
