use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::db::price_history_queries;
use crate::models::PriceRecord;

/// Append-only price history, one SQLite database per process.
///
/// Access is strictly sequential, so the pool never holds more than one
/// connection.
#[derive(Clone)]
pub struct PriceStore {
    pool: SqlitePool,
}

impl PriceStore {
    /// Open the database at `database_url`, creating the file if needed.
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// A private in-memory database. The single connection is never recycled,
    /// otherwise the data would vanish with it.
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Ok(Self { pool })
    }

    pub async fn ensure_schema(&self) -> Result<(), sqlx::Error> {
        price_history_queries::ensure_schema(&self.pool).await
    }

    /// Price of the most recent record, `None` for unknown products.
    ///
    /// A stored NULL price also comes back as `None`; use
    /// [`PriceStore::get_last_record`] to tell the two apart.
    pub async fn get_last_price(&self, product_name: &str) -> Result<Option<f64>, sqlx::Error> {
        Ok(self
            .get_last_record(product_name)
            .await?
            .and_then(|record| record.price))
    }

    pub async fn get_last_record(&self, product_name: &str) -> Result<Option<PriceRecord>, sqlx::Error> {
        price_history_queries::fetch_latest(&self.pool, product_name).await
    }

    pub async fn history(&self, product_name: &str) -> Result<Vec<PriceRecord>, sqlx::Error> {
        price_history_queries::fetch_all(&self.pool, product_name).await
    }

    pub async fn append(
        &self,
        product_name: &str,
        price: Option<f64>,
        observed_at: DateTime<Utc>,
    ) -> Result<PriceRecord, sqlx::Error> {
        price_history_queries::insert(&self.pool, product_name, price, observed_at).await
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
