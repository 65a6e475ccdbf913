//! Trace repository functions.
//!
//! The per-flow sequence number is assigned store-side: the insert bumps a
//! `flow_sequences` counter row and writes the trace in the same
//! transaction, so concurrent traces for one flow can never collide. The
//! `UNIQUE(flow_id, current_sequence)` constraint is the backstop.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    models::{FlowSequenceRow, TraceRow},
    DbError,
};

/// Insert one trace, assigning the next sequence number for its flow.
///
/// Returns the stored row, including the assigned `trace_id` and
/// `current_sequence`.
#[allow(clippy::too_many_arguments)]
pub async fn insert_trace(
    pool: &PgPool,
    flow_id: Uuid,
    flow_lvl: i32,
    node_name: &str,
    runner_id: Uuid,
    code: &str,
    status: &str,
    inputs: serde_json::Value,
    logs: serde_json::Value,
    outputs: serde_json::Value,
) -> Result<TraceRow, DbError> {
    let trace_id = Uuid::new_v4();
    let now = Utc::now();

    let mut tx = pool.begin().await?;

    // Atomic increment-and-read of the per-flow counter.
    let (sequence,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO flow_sequences (flow_id, last_sequence)
        VALUES ($1, 1)
        ON CONFLICT (flow_id)
        DO UPDATE SET last_sequence = flow_sequences.last_sequence + 1
        RETURNING last_sequence
        "#,
    )
    .bind(flow_id)
    .fetch_one(&mut *tx)
    .await?;

    let row = sqlx::query_as::<_, TraceRow>(
        r#"
        INSERT INTO traces
            (trace_id, flow_id, flow_lvl, current_sequence, node_name,
             runner_id, code, status, inputs, logs, outputs, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING trace_id, flow_id, flow_lvl, current_sequence, node_name,
                  runner_id, code, status, inputs, logs, outputs, created_at
        "#,
    )
    .bind(trace_id)
    .bind(flow_id)
    .bind(flow_lvl)
    .bind(sequence)
    .bind(node_name)
    .bind(runner_id)
    .bind(code)
    .bind(status)
    .bind(inputs)
    .bind(logs)
    .bind(outputs)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(row)
}

/// All traces recorded under one dispatch id.
pub async fn get_by_runner_id(pool: &PgPool, runner_id: Uuid) -> Result<Vec<TraceRow>, DbError> {
    let rows = sqlx::query_as::<_, TraceRow>(
        r#"
        SELECT trace_id, flow_id, flow_lvl, current_sequence, node_name,
               runner_id, code, status, inputs, logs, outputs, created_at
        FROM traces WHERE runner_id = $1 ORDER BY created_at ASC
        "#,
    )
    .bind(runner_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// All traces of one flow, ascending by sequence — the execution path.
pub async fn get_by_flow_id(pool: &PgPool, flow_id: Uuid) -> Result<Vec<TraceRow>, DbError> {
    let rows = sqlx::query_as::<_, TraceRow>(
        r#"
        SELECT trace_id, flow_id, flow_lvl, current_sequence, node_name,
               runner_id, code, status, inputs, logs, outputs, created_at
        FROM traces WHERE flow_id = $1 ORDER BY current_sequence ASC
        "#,
    )
    .bind(flow_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// The most recent traces across every flow (newest first).
pub async fn get_recent(pool: &PgPool, limit: i64) -> Result<Vec<TraceRow>, DbError> {
    let rows = sqlx::query_as::<_, TraceRow>(
        r#"
        SELECT trace_id, flow_id, flow_lvl, current_sequence, node_name,
               runner_id, code, status, inputs, logs, outputs, created_at
        FROM traces ORDER BY created_at DESC LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Every tracked flow with its step count.
pub async fn list_flow_sequences(pool: &PgPool) -> Result<Vec<FlowSequenceRow>, DbError> {
    let rows = sqlx::query_as::<_, FlowSequenceRow>(
        r#"SELECT flow_id, last_sequence FROM flow_sequences ORDER BY flow_id"#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Delete a trace record by its primary key.
///
/// Returns `DbError::NotFound` if no row was deleted.
pub async fn delete_trace(pool: &PgPool, trace_id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query(r#"DELETE FROM traces WHERE trace_id = $1"#)
        .bind(trace_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}
