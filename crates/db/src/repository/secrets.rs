//! Secret key-value repository functions.

use sqlx::PgPool;

use crate::{models::SecretRow, DbError};

/// Insert or overwrite the value stored under `key`.
pub async fn set_secret(pool: &PgPool, key: &str, value: &str) -> Result<(), DbError> {
    sqlx::query(
        r#"
        INSERT INTO secrets (key, value) VALUES ($1, $2)
        ON CONFLICT (key) DO UPDATE SET value = $2
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;

    Ok(())
}

/// Fetch the value stored under `key`.
pub async fn get_secret(pool: &PgPool, key: &str) -> Result<SecretRow, DbError> {
    let row = sqlx::query_as::<_, SecretRow>(r#"SELECT key, value FROM secrets WHERE key = $1"#)
        .bind(key)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Remove a secret. `DbError::NotFound` if the key was absent.
pub async fn delete_secret(pool: &PgPool, key: &str) -> Result<(), DbError> {
    let result = sqlx::query(r#"DELETE FROM secrets WHERE key = $1"#)
        .bind(key)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }

    Ok(())
}

/// All stored keys, values omitted.
pub async fn list_keys(pool: &PgPool) -> Result<Vec<String>, DbError> {
    let rows: Vec<(String,)> = sqlx::query_as(r#"SELECT key FROM secrets ORDER BY key"#)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(|(k,)| k).collect())
}
