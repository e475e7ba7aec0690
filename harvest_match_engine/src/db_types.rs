//! Record types stored in the allocation ledger.
use std::fmt::Display;

use chrono::{DateTime, Utc};
use hm_common::Quantity;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

//--------------------------------------        BatchId        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct BatchId(pub i64);

impl From<i64> for BatchId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "batch#{}", self.0)
    }
}

impl BatchId {
    pub fn value(&self) -> i64 {
        self.0
    }
}

//--------------------------------------       RequestId       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct RequestId(pub i64);

impl From<i64> for RequestId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "request#{}", self.0)
    }
}

impl RequestId {
    pub fn value(&self) -> i64 {
        self.0
    }
}

//--------------------------------------     DemandStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DemandStatus {
    /// The request is waiting for supply.
    Pending,
    /// The request has been matched against a batch. The engine never touches it again.
    Reserved,
}

impl Display for DemandStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DemandStatus::Pending => write!(f, "pending"),
            DemandStatus::Reserved => write!(f, "reserved"),
        }
    }
}

//--------------------------------------      SupplyBatch      ---------------------------------------------------------
/// A harvested lot published by a seller.
///
/// After every matching run `available_quantity + allocated_quantity == total_quantity`.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct SupplyBatch {
    pub id: BatchId,
    pub seller_id: String,
    pub product_id: String,
    pub variant: String,
    pub unit: String,
    pub total_quantity: Quantity,
    pub allocated_quantity: Quantity,
    pub available_quantity: Quantity,
    pub harvest_date: DateTime<Utc>,
    /// Set the first time the matching engine runs against this batch.
    pub matching_completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SupplyBatch {
    pub fn is_matched(&self) -> bool {
        self.matching_completed_at.is_some()
    }

    /// True when the quantity fields add up.
    pub fn is_balanced(&self) -> bool {
        (self.available_quantity + self.allocated_quantity).approx_eq(self.total_quantity)
    }
}

//--------------------------------------     NewSupplyBatch    ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewSupplyBatch {
    pub seller_id: String,
    pub product_id: String,
    pub variant: String,
    pub unit: String,
    /// The quantity produced. All of it is available when the batch is published.
    pub total_quantity: Quantity,
    pub harvest_date: DateTime<Utc>,
}

impl NewSupplyBatch {
    pub fn new<S: Into<String>>(seller_id: S, product_id: S, variant: S, unit: S, total_quantity: Quantity) -> Self {
        Self {
            seller_id: seller_id.into(),
            product_id: product_id.into(),
            variant: variant.into(),
            unit: unit.into(),
            total_quantity,
            harvest_date: Utc::now(),
        }
    }

    pub fn with_harvest_date(mut self, harvest_date: DateTime<Utc>) -> Self {
        self.harvest_date = harvest_date;
        self
    }
}

//--------------------------------------     DemandRequest     ---------------------------------------------------------
/// An outstanding pre-order for a product, variant and unit.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct DemandRequest {
    pub id: RequestId,
    pub consumer_id: String,
    pub product_id: String,
    pub variant: String,
    pub unit: String,
    /// Quantity asked for, in request units
    pub requested_quantity: Quantity,
    /// Multiplier from request units to the unit of the batch's quantity fields
    pub conversion_factor: f64,
    pub status: DemandStatus,
    pub allocated_quantity: Option<Quantity>,
    pub batch_id: Option<BatchId>,
    pub matched_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DemandRequest {
    /// The quantity needed from a batch to satisfy this request in full.
    pub fn required_quantity(&self) -> Quantity {
        self.requested_quantity * self.conversion_factor
    }

    /// A request is open for matching while it is pending and not linked to any batch.
    pub fn is_open(&self) -> bool {
        self.status == DemandStatus::Pending && self.batch_id.is_none()
    }

    pub fn is_for(&self, batch: &SupplyBatch) -> bool {
        self.product_id == batch.product_id && self.variant == batch.variant && self.unit == batch.unit
    }

    /// False when the quantity or conversion factor is non-finite or not positive. Such requests are never allocated.
    pub fn is_well_formed(&self) -> bool {
        self.requested_quantity.is_positive() && self.conversion_factor.is_finite() && self.conversion_factor > 0.0
    }
}

//--------------------------------------   NewDemandRequest    ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewDemandRequest {
    pub consumer_id: String,
    pub product_id: String,
    pub variant: String,
    pub unit: String,
    pub requested_quantity: Quantity,
    pub conversion_factor: f64,
    /// When the request was placed. Used as the FIFO key.
    pub created_at: DateTime<Utc>,
}

impl NewDemandRequest {
    pub fn new<S: Into<String>>(consumer_id: S, product_id: S, variant: S, unit: S, requested_quantity: Quantity) -> Self {
        Self {
            consumer_id: consumer_id.into(),
            product_id: product_id.into(),
            variant: variant.into(),
            unit: unit.into(),
            requested_quantity,
            conversion_factor: 1.0,
            created_at: Utc::now(),
        }
    }

    pub fn with_conversion_factor(mut self, conversion_factor: f64) -> Self {
        self.conversion_factor = conversion_factor;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}
