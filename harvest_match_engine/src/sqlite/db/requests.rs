use chrono::{DateTime, Utc};
use hm_common::Quantity;
use log::*;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{BatchId, DemandRequest, NewDemandRequest, RequestId, SupplyBatch},
    hme_api::matching_objects::DemandQueryFilter,
};

/// Records a new request with `pending` status.
pub async fn insert_request(
    request: NewDemandRequest,
    conn: &mut SqliteConnection,
) -> Result<DemandRequest, sqlx::Error> {
    let request: DemandRequest = sqlx::query_as(
        r#"
            INSERT INTO demand_requests (
                consumer_id,
                product_id,
                variant,
                unit,
                requested_quantity,
                conversion_factor,
                status,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7, $7)
            RETURNING *;
        "#,
    )
    .bind(request.consumer_id)
    .bind(request.product_id)
    .bind(request.variant)
    .bind(request.unit)
    .bind(request.requested_quantity.value())
    .bind(request.conversion_factor)
    .bind(request.created_at)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ {} inserted for consumer {}", request.id, request.consumer_id);
    Ok(request)
}

pub async fn fetch_request(id: RequestId, conn: &mut SqliteConnection) -> Result<Option<DemandRequest>, sqlx::Error> {
    let request =
        sqlx::query_as("SELECT * FROM demand_requests WHERE id = $1").bind(id.value()).fetch_optional(conn).await?;
    Ok(request)
}

/// Pending requests with no batch linked, for the batch's product, variant and unit. Oldest first, then by id.
pub async fn fetch_eligible_requests(
    batch: &SupplyBatch,
    conn: &mut SqliteConnection,
) -> Result<Vec<DemandRequest>, sqlx::Error> {
    let requests = sqlx::query_as(
        r#"
            SELECT * FROM demand_requests
            WHERE product_id = $1 AND variant = $2 AND unit = $3 AND status = 'pending' AND batch_id IS NULL
            ORDER BY created_at ASC, id ASC;
        "#,
    )
    .bind(batch.product_id.as_str())
    .bind(batch.variant.as_str())
    .bind(batch.unit.as_str())
    .fetch_all(conn)
    .await?;
    Ok(requests)
}

/// Moves a pending request to `reserved`. Returns `None` if the request is not pending any more, is already linked to
/// a batch, or does not exist.
pub async fn reserve_request(
    id: RequestId,
    batch_id: BatchId,
    allocated: Quantity,
    matched_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<DemandRequest>, sqlx::Error> {
    let request = sqlx::query_as(
        r#"
            UPDATE demand_requests SET
                status = 'reserved',
                allocated_quantity = $1,
                batch_id = $2,
                matched_at = $3,
                updated_at = $3
            WHERE id = $4 AND status = 'pending' AND batch_id IS NULL
            RETURNING *;
        "#,
    )
    .bind(allocated.value())
    .bind(batch_id.value())
    .bind(matched_at)
    .bind(id.value())
    .fetch_optional(conn)
    .await?;
    Ok(request)
}

/// Fetches requests according to the criteria in the `DemandQueryFilter`, in FIFO order.
pub async fn search_requests(
    query: DemandQueryFilter,
    conn: &mut SqliteConnection,
) -> Result<Vec<DemandRequest>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM demand_requests ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(product_id) = query.product_id {
        where_clause.push("product_id = ");
        where_clause.push_bind_unseparated(product_id);
    }
    if let Some(variant) = query.variant {
        where_clause.push("variant = ");
        where_clause.push_bind_unseparated(variant);
    }
    if let Some(unit) = query.unit {
        where_clause.push("unit = ");
        where_clause.push_bind_unseparated(unit);
    }
    if let Some(consumer_id) = query.consumer_id {
        where_clause.push("consumer_id = ");
        where_clause.push_bind_unseparated(consumer_id);
    }
    if let Some(batch_id) = query.batch_id {
        where_clause.push("batch_id = ");
        where_clause.push_bind_unseparated(batch_id.value());
    }
    if !query.statuses.is_empty() {
        where_clause.push("status IN (");
        for (i, status) in query.statuses.iter().enumerate() {
            if i > 0 {
                where_clause.push_unseparated(", ");
            }
            where_clause.push_bind_unseparated(status.to_string());
        }
        where_clause.push_unseparated(")");
    }
    builder.push(" ORDER BY created_at ASC, id ASC");
    trace!("🗃️ Executing query: {}", builder.sql());
    let requests = builder.build_query_as::<DemandRequest>().fetch_all(conn).await?;
    trace!("🗃️ Result of search_requests: {}", requests.len());
    Ok(requests)
}
