//! Background jobs run by the job scheduler service.
//!
//! - `price_check_job` - fetches the product page and records/alerts on price changes

pub mod price_check_job;
