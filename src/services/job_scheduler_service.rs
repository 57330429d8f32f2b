use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::{AppConfig, ScheduleTimezone};
use crate::errors::AppError;
use crate::external::reading_source::ReadingSource;
use crate::jobs::price_check_job;
use crate::services::notification_service::Notifier;

pub const PRICE_CHECK_JOB: &str = "price_check";

// Context passed to job functions
#[derive(Clone)]
pub struct JobContext {
    pub config: Arc<AppConfig>,
    pub source: Arc<dyn ReadingSource>,
    pub notifier: Arc<dyn Notifier>,
    /// Held for the whole cycle; a tick that finds it taken is skipped.
    pub cycle_lock: Arc<Mutex<()>>,
}

impl JobContext {
    pub fn new(
        config: Arc<AppConfig>,
        source: Arc<dyn ReadingSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            source,
            notifier,
            cycle_lock: Arc::new(Mutex::new(())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    pub items_processed: i32,
    pub items_failed: i32,
}

#[derive(Debug, PartialEq, Eq)]
pub enum JobRunStatus {
    Completed(JobResult),
    Failed(String),
    Skipped,
}

pub struct JobSchedulerService {
    scheduler: JobScheduler,
    context: JobContext,
}

impl JobSchedulerService {
    pub async fn new(context: JobContext) -> Result<Self, AppError> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| AppError::External(format!("Failed to create scheduler: {}", e)))?;

        Ok(Self { scheduler, context })
    }

    /// Register the price check and start ticking.
    pub async fn start(&mut self) -> Result<(), AppError> {
        info!("🚀 Starting job scheduler...");

        let schedule_config = self.context.config.schedule.clone();
        if schedule_config.test_mode {
            info!("⚠️  JOB SCHEDULER IN TEST MODE - price check will run every minute!");
        }

        let description = if schedule_config.test_mode {
            "Every minute (TEST MODE)"
        } else {
            "Daily price check"
        };

        self.schedule_job(
            schedule_config.effective_cron(),
            schedule_config.timezone,
            PRICE_CHECK_JOB,
            description,
            price_check_job::run_price_check,
        )
        .await?;

        self.scheduler
            .start()
            .await
            .map_err(|e| AppError::External(format!("Failed to start scheduler: {}", e)))?;

        info!("✅ Job scheduler started");
        Ok(())
    }

    /// Run the price check once, outside the schedule.
    pub async fn run_now(&self) -> JobRunStatus {
        execute_job_with_tracking(
            PRICE_CHECK_JOB,
            self.context.clone(),
            Arc::new(price_check_job::run_price_check),
        )
        .await
    }

    /// Stop the scheduler gracefully
    pub async fn stop(&mut self) -> Result<(), AppError> {
        info!("🛑 Stopping job scheduler...");
        self.scheduler
            .shutdown()
            .await
            .map_err(|e| AppError::External(format!("Failed to stop scheduler: {}", e)))?;
        info!("✅ Job scheduler stopped");
        Ok(())
    }

    /// Helper to schedule a job with tracking
    async fn schedule_job<F, Fut>(
        &mut self,
        schedule: &str,
        timezone: ScheduleTimezone,
        job_name: &'static str,
        description: &str,
        job_fn: F,
    ) -> Result<(), AppError>
    where
        F: Fn(JobContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<JobResult, AppError>> + Send + 'static,
    {
        let run = job_runner(job_name, self.context.clone(), Arc::new(job_fn));

        let job = match timezone {
            ScheduleTimezone::Local => Job::new_async_tz(schedule, chrono::Local, run),
            ScheduleTimezone::Utc => Job::new_async(schedule, run),
        }
        .map_err(|e| AppError::External(format!("Failed to create job {}: {}", job_name, e)))?;

        self.scheduler
            .add(job)
            .await
            .map_err(|e| AppError::External(format!("Failed to add job {}: {}", job_name, e)))?;

        info!(
            "📅 Scheduled: {} - {} [cron: {}, {:?} time]",
            job_name, description, schedule, timezone
        );
        Ok(())
    }
}

/// Callback handed to the cron scheduler for every tick.
fn job_runner<F, Fut>(
    job_name: &'static str,
    context: JobContext,
    job_fn: Arc<F>,
) -> impl FnMut(Uuid, JobScheduler) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync + 'static
where
    F: Fn(JobContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<JobResult, AppError>> + Send + 'static,
{
    move |_uuid: Uuid, _l: JobScheduler| -> Pin<Box<dyn Future<Output = ()> + Send>> {
        let context = context.clone();
        let job_fn = job_fn.clone();
        Box::pin(async move {
            execute_job_with_tracking(job_name, context, job_fn).await;
        })
    }
}

/// Run one job invocation: skip if a cycle is in flight, log the result,
/// never propagate the error. The next tick simply tries again.
pub async fn execute_job_with_tracking<F, Fut>(
    job_name: &str,
    context: JobContext,
    job_fn: Arc<F>,
) -> JobRunStatus
where
    F: Fn(JobContext) -> Fut,
    Fut: Future<Output = Result<JobResult, AppError>>,
{
    let lock = context.cycle_lock.clone();
    let _guard = match lock.try_lock() {
        Ok(guard) => guard,
        Err(_) => {
            warn!("⏭️  Skipping {}: previous run still in progress", job_name);
            return JobRunStatus::Skipped;
        }
    };

    info!("🏃 Starting job: {}", job_name);
    let started_at = Utc::now();

    let result = job_fn(context).await;

    let duration_ms = (Utc::now() - started_at).num_milliseconds();

    match result {
        Ok(job_result) => {
            info!(
                "✅ Job completed: {} (processed: {}, failed: {}, duration: {}ms)",
                job_name, job_result.items_processed, job_result.items_failed, duration_ms
            );
            JobRunStatus::Completed(job_result)
        }
        Err(e) => {
            error!("❌ Job failed: {} - {} (duration: {}ms)", job_name, e, duration_ms);
            JobRunStatus::Failed(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CycleError;
    use crate::external::reading_source::SourceError;
    use crate::models::{Channel, Reading};
    use crate::services::notification_service::{LogNotifier, NotifyError};
    use async_trait::async_trait;

    struct StaticSource;

    #[async_trait]
    impl ReadingSource for StaticSource {
        async fn fetch(&self) -> Result<Reading, SourceError> {
            Ok(Reading::new("Widget", Some(12.0)))
        }
    }

    struct SilentNotifier;

    #[async_trait]
    impl Notifier for SilentNotifier {
        async fn notify(&self, _: Channel, _: &str, _: &str) -> Result<(), NotifyError> {
            Ok(())
        }
    }

    fn context(cron: &str) -> JobContext {
        context_in(cron, "local")
    }

    fn context_in(cron: &str, timezone: &str) -> JobContext {
        let config = AppConfig::from_lookup(|key| match key {
            "NOTIFY_CHANNELS" => Some(String::new()),
            "PRICE_CHECK_CRON" => Some(cron.to_string()),
            "PRICE_CHECK_TIMEZONE" => Some(timezone.to_string()),
            _ => None,
        })
        .unwrap();
        JobContext::new(Arc::new(config), Arc::new(StaticSource), Arc::new(LogNotifier))
    }

    #[tokio::test]
    async fn test_overlapping_run_is_skipped() {
        let ctx = context("0 0 2 * * *");
        let _held = ctx.cycle_lock.lock().await;

        let status = execute_job_with_tracking("test", ctx.clone(), Arc::new(|_ctx: JobContext| async {
            Ok::<_, AppError>(JobResult { items_processed: 1, items_failed: 0 })
        }))
        .await;

        assert_eq!(status, JobRunStatus::Skipped);
    }

    #[tokio::test]
    async fn test_failed_job_is_reported_not_raised() {
        let ctx = context("0 0 2 * * *");

        let status = execute_job_with_tracking("test", ctx.clone(), Arc::new(|_ctx: JobContext| async {
            Err::<JobResult, _>(AppError::Cycle(CycleError::MissingProductName))
        }))
        .await;

        assert!(matches!(status, JobRunStatus::Failed(msg) if msg.contains("product name missing")));
        // Lock released after the run.
        assert!(ctx.cycle_lock.try_lock().is_ok());
    }

    #[tokio::test]
    async fn test_completed_job_returns_result() {
        let ctx = JobContext {
            notifier: Arc::new(SilentNotifier),
            ..context("0 0 2 * * *")
        };

        let status = execute_job_with_tracking("test", ctx, Arc::new(|_ctx: JobContext| async {
            Ok::<_, AppError>(JobResult { items_processed: 1, items_failed: 0 })
        }))
        .await;

        assert_eq!(
            status,
            JobRunStatus::Completed(JobResult { items_processed: 1, items_failed: 0 })
        );
    }

    #[tokio::test]
    async fn test_invalid_cron_is_rejected() {
        let mut service = JobSchedulerService::new(context("not a cron")).await.unwrap();
        assert!(matches!(service.start().await, Err(AppError::External(_))));
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        for timezone in ["local", "utc"] {
            let mut service = JobSchedulerService::new(context_in("0 0 2 * * *", timezone)).await.unwrap();
            service.start().await.unwrap();
            service.stop().await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_invalid_cron_is_rejected_in_local_time() {
        let mut service = JobSchedulerService::new(context_in("61 * * * * *", "local")).await.unwrap();
        assert!(matches!(service.start().await, Err(AppError::External(_))));
    }
}
