use std::sync::Arc;

use anyhow::Context;
use pricewatch::config::AppConfig;
use pricewatch::external::product_page::ProductPageSource;
use pricewatch::jobs::price_check_job;
use pricewatch::logging::{init_logging, LoggingConfig};
use pricewatch::services::job_scheduler_service::{JobContext, JobSchedulerService};
use pricewatch::services::notification_service::{LogNotifier, NotificationService, Notifier};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    let logging = LoggingConfig::from_env().context("Invalid logging configuration")?;
    init_logging(logging).map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    let config = Arc::new(AppConfig::from_env().context("Invalid configuration")?);
    tracing::info!(
        "🛒 Watching {} (alert below {}{})",
        config.product_url,
        config.alert.currency,
        config.alert.threshold
    );

    price_check_job::prepare_store(&config)
        .await
        .context("Failed to prepare price store")?;

    let source = Arc::new(
        ProductPageSource::new(config.product_url.clone(), config.http_timeout)
            .context("Failed to create HTTP client")?,
    );

    let notifier: Arc<dyn Notifier> = if config.notifications_enabled {
        Arc::new(NotificationService::from_config(&config).context("Failed to set up notifications")?)
    } else {
        tracing::info!("🔕 Notifications disabled, alerts will only be logged");
        Arc::new(LogNotifier)
    };

    let context = JobContext::new(config.clone(), source, notifier);
    let mut scheduler = JobSchedulerService::new(context).await?;

    if config.schedule.run_on_startup {
        scheduler.run_now().await;
    }

    scheduler.start().await?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    scheduler.stop().await?;
    Ok(())
}
