use std::borrow::Cow;

use hm_common::QuantityError;
use thiserror::Error;

use crate::{
    db_types::{BatchId, DemandRequest, NewDemandRequest, NewSupplyBatch, RequestId, SupplyBatch},
    hme_api::matching_objects::DemandQueryFilter,
    traits::LedgerTransaction,
};

/// Storage for supply batches and demand requests.
///
/// Batches and requests are created by intake processes outside the engine. The matching engine itself only mutates
/// records through a [`LedgerTransaction`] obtained from [`AllocationLedger::begin`].
#[allow(async_fn_in_trait)]
pub trait AllocationLedger: Clone {
    type Transaction: LedgerTransaction;

    /// The URL of the database
    fn url(&self) -> &str;

    /// Opens a new transaction. All the reads and writes of a single matching run happen inside one of these.
    async fn begin(&self) -> Result<Self::Transaction, MatchingError>;

    /// Publishes a new batch. The whole of `total_quantity` is available and nothing is allocated.
    async fn insert_batch(&self, batch: NewSupplyBatch) -> Result<SupplyBatch, MatchingError>;

    /// Records a new request with `pending` status.
    async fn insert_request(&self, request: NewDemandRequest) -> Result<DemandRequest, MatchingError>;

    async fn fetch_batch(&self, batch_id: BatchId) -> Result<Option<SupplyBatch>, MatchingError>;

    async fn fetch_request(&self, request_id: RequestId) -> Result<Option<DemandRequest>, MatchingError>;

    /// Fetches the requests matching the filter, in FIFO order.
    async fn search_requests(&self, query: DemandQueryFilter) -> Result<Vec<DemandRequest>, MatchingError>;

    /// Batches that the matching engine has never run against, oldest first.
    async fn fetch_unmatched_batches(&self) -> Result<Vec<SupplyBatch>, MatchingError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), MatchingError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum MatchingError {
    #[error("We have an internal database engine (configuration/uptime etc.) error: {0}")]
    DatabaseError(String),
    #[error("The requested batch {0} does not exist")]
    BatchNotFound(BatchId),
    #[error("The requested demand request {0} does not exist")]
    RequestNotFound(RequestId),
    #[error("A concurrent update got there first. {0}")]
    Conflict(String),
    #[error("Unexpected data in the ledger. {0}")]
    InvalidData(String),
    #[error("The matching run did not complete in time")]
    Timeout,
}

impl MatchingError {
    /// Whether a caller can expect a fresh attempt against the current ledger state to succeed.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::BatchNotFound(_) | Self::RequestNotFound(_) | Self::Conflict(_) | Self::Timeout)
    }
}

impl From<sqlx::Error> for MatchingError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if is_lock_contention(db.code()) => MatchingError::Conflict(e.to_string()),
            sqlx::Error::ColumnDecode { .. } |
            sqlx::Error::Decode(_) |
            sqlx::Error::ColumnNotFound(_) |
            sqlx::Error::TypeNotFound { .. } => MatchingError::InvalidData(e.to_string()),
            _ => MatchingError::DatabaseError(e.to_string()),
        }
    }
}

impl From<QuantityError> for MatchingError {
    fn from(e: QuantityError) -> Self {
        MatchingError::InvalidData(e.to_string())
    }
}

/// SQLite reports BUSY (5) and LOCKED (6), possibly as extended codes, when another connection holds the lock.
fn is_lock_contention(code: Option<Cow<'_, str>>) -> bool {
    code.and_then(|c| c.parse::<i32>().ok()).map(|c| matches!(c & 0xff, 5 | 6)).unwrap_or(false)
}
