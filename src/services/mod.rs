pub mod job_scheduler_service;
pub mod notification_service;
pub mod price_change_service;
