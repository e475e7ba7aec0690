use chrono::Utc;
use log::*;
use sqlx::SqliteConnection;

use crate::{
    db_types::{BatchId, NewSupplyBatch, SupplyBatch},
    traits::BatchSettlement,
};

/// Inserts a newly published batch. The full quantity is available and nothing is allocated yet.
///
/// This is not atomic on its own. Pass `&mut *tx` to run it inside a transaction.
pub async fn insert_batch(batch: NewSupplyBatch, conn: &mut SqliteConnection) -> Result<SupplyBatch, sqlx::Error> {
    let now = Utc::now();
    let batch: SupplyBatch = sqlx::query_as(
        r#"
            INSERT INTO supply_batches (
                seller_id,
                product_id,
                variant,
                unit,
                total_quantity,
                allocated_quantity,
                available_quantity,
                harvest_date,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, 0, $5, $6, $7, $7)
            RETURNING *;
        "#,
    )
    .bind(batch.seller_id)
    .bind(batch.product_id)
    .bind(batch.variant)
    .bind(batch.unit)
    .bind(batch.total_quantity.value())
    .bind(batch.harvest_date)
    .bind(now)
    .fetch_one(conn)
    .await?;
    debug!(
        "🗃️ {} inserted: {} {} of {}/{}",
        batch.id, batch.total_quantity, batch.unit, batch.product_id, batch.variant
    );
    Ok(batch)
}

pub async fn fetch_batch(id: BatchId, conn: &mut SqliteConnection) -> Result<Option<SupplyBatch>, sqlx::Error> {
    let batch =
        sqlx::query_as("SELECT * FROM supply_batches WHERE id = $1").bind(id.value()).fetch_optional(conn).await?;
    Ok(batch)
}

/// Takes the database write lock by touching the batch row, and returns the row as it stands.
///
/// Inside a transaction, no other connection can write to the ledger until this transaction ends.
pub async fn lock_batch(id: BatchId, conn: &mut SqliteConnection) -> Result<Option<SupplyBatch>, sqlx::Error> {
    let batch = sqlx::query_as("UPDATE supply_batches SET updated_at = updated_at WHERE id = $1 RETURNING *")
        .bind(id.value())
        .fetch_optional(conn)
        .await?;
    trace!("🗃️ Lock taken on {id}");
    Ok(batch)
}

/// Writes the new totals, guarded on `available_quantity` being unchanged since it was read. Returns `None` if the
/// guard did not match (or the batch does not exist).
pub async fn settle_batch(
    settlement: &BatchSettlement,
    conn: &mut SqliteConnection,
) -> Result<Option<SupplyBatch>, sqlx::Error> {
    let batch = sqlx::query_as(
        r#"
            UPDATE supply_batches SET
                allocated_quantity = $1,
                available_quantity = $2,
                matching_completed_at = $3,
                updated_at = $3
            WHERE id = $4 AND available_quantity = $5
            RETURNING *;
        "#,
    )
    .bind(settlement.allocated.value())
    .bind(settlement.available.value())
    .bind(settlement.completed_at)
    .bind(settlement.batch_id.value())
    .bind(settlement.expected_available.value())
    .fetch_optional(conn)
    .await?;
    Ok(batch)
}

/// Batches the matching engine has never run against, oldest first.
pub async fn fetch_unmatched_batches(conn: &mut SqliteConnection) -> Result<Vec<SupplyBatch>, sqlx::Error> {
    let batches = sqlx::query_as(
        "SELECT * FROM supply_batches WHERE matching_completed_at IS NULL ORDER BY created_at ASC, id ASC",
    )
    .fetch_all(conn)
    .await?;
    Ok(batches)
}
