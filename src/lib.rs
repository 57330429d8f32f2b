//! Watches a single product page and alerts when its price drops.
//!
//! Each scheduled cycle fetches the page, extracts a (name, price) reading,
//! compares it with the last price in an append-only SQLite history, stores
//! the reading when it changed, and sends SMS/email alerts when the new price
//! is below the configured threshold.

pub mod config;
pub mod db;
pub mod errors;
pub mod external;
pub mod jobs;
pub mod logging;
pub mod models;
pub mod services;
pub mod store;
