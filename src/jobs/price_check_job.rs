use tracing::{error, info};

use crate::config::AppConfig;
use crate::errors::{AppError, CycleError};
use crate::models::{AlertOutcome, CycleOutcome};
use crate::services::job_scheduler_service::{JobContext, JobResult};
use crate::services::price_change_service;
use crate::store::PriceStore;

/// Create the price history table. Called once at startup.
pub async fn prepare_store(config: &AppConfig) -> Result<(), AppError> {
    let store = PriceStore::connect(&config.database_url).await?;
    let result = store.ensure_schema().await;
    store.close().await;
    result?;

    info!("🗄️  Price store ready at {}", config.database_url);
    Ok(())
}

/// Entry point for the scheduled price check.
///
/// The store is opened for the duration of the cycle only.
pub async fn run_price_check(ctx: JobContext) -> Result<JobResult, AppError> {
    info!("Checking price at {}", ctx.config.product_url);

    let store = PriceStore::connect(&ctx.config.database_url)
        .await
        .map_err(CycleError::Store)?;

    let result = price_change_service::run_cycle(
        ctx.source.as_ref(),
        &store,
        ctx.notifier.as_ref(),
        &ctx.config.alert,
    )
    .await;

    store.close().await;

    let outcome = result.map_err(|e| {
        error!("Price check cycle aborted: {}", e);
        e
    })?;

    Ok(job_result(&outcome))
}

fn job_result(outcome: &CycleOutcome) -> JobResult {
    match outcome {
        CycleOutcome::Unchanged { .. } => JobResult {
            items_processed: 0,
            items_failed: 0,
        },
        CycleOutcome::Recorded { alert, .. } => JobResult {
            items_processed: 1,
            items_failed: match alert {
                AlertOutcome::Attempted { failed, .. } => *failed as i32,
                AlertOutcome::NotRequested => 0,
            },
        },
    }
}
