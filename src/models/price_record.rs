use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// One row of the PriceHistory table. Rows are only ever inserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct PriceRecord {
    pub id: i64,
    pub product_name: String,
    pub price: Option<f64>,        // NULL when the page had no parsable price
    #[sqlx(rename = "date")]
    #[serde(rename = "date")]
    pub observed_at: DateTime<Utc>,
}
