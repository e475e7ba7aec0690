//! `SqliteDatabase` is a concrete implementation of an allocation ledger backend.
//!
//! Matching transactions take the SQLite write lock as their first statement (see [`db::batches::lock_batch`]), so
//! two runs against the ledger never interleave their writes. Every write a run makes is additionally guarded on the
//! row still being in the state the run read.
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use hm_common::Quantity;
use log::*;
use sqlx::{Sqlite, SqlitePool, Transaction};

use super::db::{batches, db_url, new_pool, requests};
use crate::{
    db_types::{BatchId, DemandRequest, NewDemandRequest, NewSupplyBatch, RequestId, SupplyBatch},
    hme_api::matching_objects::DemandQueryFilter,
    traits::{AllocationLedger, BatchSettlement, LedgerTransaction, MatchingError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl AllocationLedger for SqliteDatabase {
    type Transaction = SqliteLedgerTransaction;

    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn begin(&self) -> Result<Self::Transaction, MatchingError> {
        let tx = self.pool.begin().await?;
        Ok(SqliteLedgerTransaction { tx })
    }

    async fn insert_batch(&self, batch: NewSupplyBatch) -> Result<SupplyBatch, MatchingError> {
        Quantity::try_positive(batch.total_quantity.value()).map_err(|e| {
            warn!("🗃️ Rejected a batch from {} with total quantity {}. {e}", batch.seller_id, batch.total_quantity);
            e
        })?;
        let mut conn = self.pool.acquire().await?;
        let batch = batches::insert_batch(batch, &mut conn).await?;
        Ok(batch)
    }

    async fn insert_request(&self, request: NewDemandRequest) -> Result<DemandRequest, MatchingError> {
        let mut conn = self.pool.acquire().await?;
        let request = requests::insert_request(request, &mut conn).await?;
        if !request.is_well_formed() {
            warn!(
                "🗃️ {} was recorded with an unusable quantity ({} x {}). Matching will skip it.",
                request.id, request.requested_quantity, request.conversion_factor
            );
        }
        Ok(request)
    }

    async fn fetch_batch(&self, batch_id: BatchId) -> Result<Option<SupplyBatch>, MatchingError> {
        let mut conn = self.pool.acquire().await?;
        let batch = batches::fetch_batch(batch_id, &mut conn).await?;
        Ok(batch)
    }

    async fn fetch_request(&self, request_id: RequestId) -> Result<Option<DemandRequest>, MatchingError> {
        let mut conn = self.pool.acquire().await?;
        let request = requests::fetch_request(request_id, &mut conn).await?;
        Ok(request)
    }

    async fn search_requests(&self, query: DemandQueryFilter) -> Result<Vec<DemandRequest>, MatchingError> {
        let mut conn = self.pool.acquire().await?;
        let result = requests::search_requests(query, &mut conn).await?;
        Ok(result)
    }

    async fn fetch_unmatched_batches(&self) -> Result<Vec<SupplyBatch>, MatchingError> {
        let mut conn = self.pool.acquire().await?;
        let result = batches::fetch_unmatched_batches(&mut conn).await?;
        Ok(result)
    }

    async fn close(&mut self) -> Result<(), MatchingError> {
        self.pool.close().await;
        Ok(())
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, MatchingError> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, MatchingError> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date.
    pub async fn migrate(&self) -> Result<(), MatchingError> {
        sqlx::migrate!("./src/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| MatchingError::DatabaseError(format!("Migration failed. {e}")))?;
        info!("🗃️ Database migrations are up to date");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// A matching transaction on the SQLite ledger. Dropping it without calling [`LedgerTransaction::commit`] rolls it
/// back.
pub struct SqliteLedgerTransaction {
    tx: Transaction<'static, Sqlite>,
}

impl Debug for SqliteLedgerTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SqliteLedgerTransaction")
    }
}

impl LedgerTransaction for SqliteLedgerTransaction {
    async fn lock_batch(&mut self, batch_id: BatchId) -> Result<SupplyBatch, MatchingError> {
        batches::lock_batch(batch_id, &mut self.tx).await?.ok_or(MatchingError::BatchNotFound(batch_id))
    }

    async fn fetch_eligible_requests(&mut self, batch: &SupplyBatch) -> Result<Vec<DemandRequest>, MatchingError> {
        let requests = requests::fetch_eligible_requests(batch, &mut self.tx).await?;
        trace!("🗃️ {} pending requests found for {}", requests.len(), batch.id);
        Ok(requests)
    }

    async fn reserve_request(
        &mut self,
        request_id: RequestId,
        batch_id: BatchId,
        allocated: Quantity,
        matched_at: DateTime<Utc>,
    ) -> Result<DemandRequest, MatchingError> {
        match requests::reserve_request(request_id, batch_id, allocated, matched_at, &mut self.tx).await? {
            Some(request) => Ok(request),
            None => match requests::fetch_request(request_id, &mut self.tx).await? {
                None => Err(MatchingError::RequestNotFound(request_id)),
                Some(r) => Err(MatchingError::Conflict(format!(
                    "{request_id} is no longer open for matching (status {}, batch {:?})",
                    r.status, r.batch_id
                ))),
            },
        }
    }

    async fn settle_batch(&mut self, settlement: &BatchSettlement) -> Result<SupplyBatch, MatchingError> {
        let batch_id = settlement.batch_id;
        match batches::settle_batch(settlement, &mut self.tx).await? {
            Some(batch) => Ok(batch),
            None => match batches::fetch_batch(batch_id, &mut self.tx).await? {
                None => Err(MatchingError::BatchNotFound(batch_id)),
                Some(b) => Err(MatchingError::Conflict(format!(
                    "{batch_id} changed during matching. Expected {} available, found {}",
                    settlement.expected_available, b.available_quantity
                ))),
            },
        }
    }

    async fn commit(self) -> Result<(), MatchingError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<(), MatchingError> {
        self.tx.rollback().await?;
        Ok(())
    }
}
