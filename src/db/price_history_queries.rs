use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::error;

use crate::models::PriceRecord;

/// Create the PriceHistory table if it does not exist yet.
///
/// The layout matches databases written by earlier versions of the tracker,
/// so an existing `prices.db` is picked up as-is.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS PriceHistory (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            product_name TEXT,
            price REAL,
            date TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn fetch_latest(
    pool: &SqlitePool,
    product_name: &str,
) -> Result<Option<PriceRecord>, sqlx::Error> {
    sqlx::query_as::<_, PriceRecord>(
        r#"
        SELECT id, product_name, price, date
        FROM PriceHistory
        WHERE product_name = ?
        ORDER BY date DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(product_name)
    .fetch_optional(pool)
    .await
}

/// All records for a product, oldest first.
pub async fn fetch_all(
    pool: &SqlitePool,
    product_name: &str,
) -> Result<Vec<PriceRecord>, sqlx::Error> {
    sqlx::query_as::<_, PriceRecord>(
        r#"
        SELECT id, product_name, price, date
        FROM PriceHistory
        WHERE product_name = ?
        ORDER BY date ASC, id ASC
        "#,
    )
    .bind(product_name)
    .fetch_all(pool)
    .await
}

pub async fn insert(
    pool: &SqlitePool,
    product_name: &str,
    price: Option<f64>,
    observed_at: DateTime<Utc>,
) -> Result<PriceRecord, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO PriceHistory (product_name, price, date)
        VALUES (?, ?, ?)
        "#,
    )
    .bind(product_name)
    .bind(price)
    .bind(observed_at)
    .execute(pool)
    .await
    .map_err(|e| {
        error!("Failed to insert price for {} (price: {:?}): {}", product_name, price, e);
        e
    })?;

    Ok(PriceRecord {
        id: result.last_insert_rowid(),
        product_name: product_name.to_string(),
        price,
        observed_at,
    })
}
