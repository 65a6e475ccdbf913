//! Flow checkpoint repository functions.
//!
//! One document per live flow, keyed by `flow_id`. The executor upserts the
//! flow state after every pointer advance and deletes the row when the flow
//! reaches a terminal state.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{models::FlowCheckpointRow, DbError};

/// Upsert the state document for `flow_id` (idempotent by key).
pub async fn upsert_flow(
    pool: &PgPool,
    flow_id: Uuid,
    state: serde_json::Value,
) -> Result<(), DbError> {
    sqlx::query(
        r#"
        INSERT INTO flow_checkpoints (flow_id, state, updated_at)
        VALUES ($1, $2, $3)
        ON CONFLICT (flow_id) DO UPDATE SET state = $2, updated_at = $3
        "#,
    )
    .bind(flow_id)
    .bind(state)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

/// Fetch a single checkpoint by flow id.
pub async fn get_flow(pool: &PgPool, flow_id: Uuid) -> Result<FlowCheckpointRow, DbError> {
    let row = sqlx::query_as::<_, FlowCheckpointRow>(
        r#"SELECT flow_id, state, updated_at FROM flow_checkpoints WHERE flow_id = $1"#,
    )
    .bind(flow_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Return every persisted flow, oldest first, for recovery on boot.
pub async fn list_flows(pool: &PgPool) -> Result<Vec<FlowCheckpointRow>, DbError> {
    let rows = sqlx::query_as::<_, FlowCheckpointRow>(
        r#"SELECT flow_id, state, updated_at FROM flow_checkpoints ORDER BY updated_at ASC"#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Delete the checkpoint of a finished or stopped flow.
///
/// Deleting an absent row is not an error: stop and retire can race.
pub async fn delete_flow(pool: &PgPool, flow_id: Uuid) -> Result<(), DbError> {
    sqlx::query(r#"DELETE FROM flow_checkpoints WHERE flow_id = $1"#)
        .bind(flow_id)
        .execute(pool)
        .await?;

    Ok(())
}
