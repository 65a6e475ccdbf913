//! Secret store HTTP surface — a small key-value server.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use db::DbPool;

#[derive(Clone)]
pub struct SecretStoreState {
    pub pool: DbPool,
}

pub fn router(state: SecretStoreState) -> Router {
    Router::new()
        .route("/set", post(set_value))
        .route("/get/:key", get(get_value))
        .route("/delete/:key", delete(delete_value))
        .route("/keys", get(list_keys))
        .with_state(state)
}

#[derive(Deserialize, Serialize)]
pub struct KvItem {
    pub key: String,
    pub value: String,
}

async fn set_value(
    State(state): State<SecretStoreState>,
    Json(item): Json<KvItem>,
) -> Result<Json<Value>, StatusCode> {
    match db::repository::secrets::set_secret(&state.pool, &item.key, &item.value).await {
        Ok(()) => {
            tracing::info!(key = %item.key, "secret set");
            Ok(Json(serde_json::json!({"ok": true, "key": item.key, "value": item.value})))
        }
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

async fn get_value(
    Path(key): Path<String>,
    State(state): State<SecretStoreState>,
) -> Result<Json<KvItem>, StatusCode> {
    match db::repository::secrets::get_secret(&state.pool, &key).await {
        Ok(row) => Ok(Json(KvItem { key: row.key, value: row.value })),
        Err(db::DbError::NotFound) => {
            tracing::warn!(%key, "secret not found");
            Err(StatusCode::NOT_FOUND)
        }
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

async fn delete_value(
    Path(key): Path<String>,
    State(state): State<SecretStoreState>,
) -> Result<Json<Value>, StatusCode> {
    match db::repository::secrets::delete_secret(&state.pool, &key).await {
        Ok(()) => Ok(Json(serde_json::json!({"ok": true, "deleted": key}))),
        Err(db::DbError::NotFound) => Err(StatusCode::NOT_FOUND),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

async fn list_keys(State(state): State<SecretStoreState>) -> Result<Json<Value>, StatusCode> {
    match db::repository::secrets::list_keys(&state.pool).await {
        Ok(keys) => Ok(Json(serde_json::json!({"keys": keys}))),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}
