//! Runtime configuration.
//!
//! Everything is read from the environment once at startup (a `.env` file is
//! loaded first by `main`). The resulting [`AppConfig`] is shared by `Arc` with
//! the job and the notifier; nothing reads the environment after startup.

use std::time::Duration;

use crate::errors::ConfigError;
use crate::models::{AlertRecipient, Channel};

pub const DEFAULT_PRODUCT_URL: &str = "https://a.co/d/8pIHcvR";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://prices.db";
pub const DEFAULT_ALERT_THRESHOLD: f64 = 15.0;
pub const DEFAULT_CURRENCY: &str = "CAD";
// sec min hour day month weekday
pub const DEFAULT_CRON: &str = "0 0 2 * * *";
pub const TEST_MODE_CRON: &str = "0 */1 * * * *";
pub const DEFAULT_SMTP_HOST: &str = "smtp.mail.yahoo.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub product_url: String,
    pub database_url: String,
    pub http_timeout: Duration,
    pub schedule: ScheduleConfig,
    pub alert: AlertConfig,
    /// When false, alerts are logged instead of sent.
    pub notifications_enabled: bool,
    pub twilio: Option<TwilioConfig>,
    pub smtp: Option<SmtpConfig>,
}

/// Clock the cron expression is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleTimezone {
    Local,
    Utc,
}

#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub cron: String,
    pub timezone: ScheduleTimezone,
    pub test_mode: bool,
    pub run_on_startup: bool,
}

impl ScheduleConfig {
    /// Cron expression actually registered with the scheduler.
    pub fn effective_cron(&self) -> &str {
        if self.test_mode {
            TEST_MODE_CRON
        } else {
            &self.cron
        }
    }
}

#[derive(Debug, Clone)]
pub struct AlertConfig {
    pub threshold: f64,
    pub currency: String,
    pub recipients: Vec<AlertRecipient>,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_ALERT_THRESHOLD,
            currency: DEFAULT_CURRENCY.to_string(),
            recipients: Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

// Keep the token out of logs.
impl std::fmt::Debug for TwilioConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioConfig")
            .field("account_sid", &self.account_sid)
            .field("from_number", &self.from_number)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let product_url = get("PRODUCT_URL").unwrap_or_else(|| DEFAULT_PRODUCT_URL.to_string());
        url::Url::parse(&product_url).map_err(|e| ConfigError::Invalid {
            name: "PRODUCT_URL",
            reason: e.to_string(),
        })?;

        let database_url = get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let threshold = match get("ALERT_THRESHOLD") {
            Some(raw) => parse_threshold(&raw)?,
            None => DEFAULT_ALERT_THRESHOLD,
        };

        let http_timeout_secs = match get("HTTP_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|e| ConfigError::Invalid {
                name: "HTTP_TIMEOUT_SECS",
                reason: e.to_string(),
            })?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        let schedule = ScheduleConfig {
            cron: get("PRICE_CHECK_CRON").unwrap_or_else(|| DEFAULT_CRON.to_string()),
            timezone: parse_timezone(get("PRICE_CHECK_TIMEZONE"))?,
            test_mode: parse_flag(get("JOB_SCHEDULER_TEST_MODE"), "JOB_SCHEDULER_TEST_MODE", false)?,
            run_on_startup: parse_flag(get("RUN_ON_STARTUP"), "RUN_ON_STARTUP", false)?,
        };

        let notifications_enabled =
            parse_flag(get("NOTIFICATIONS_ENABLED"), "NOTIFICATIONS_ENABLED", true)?;

        // An explicitly empty list disables alert delivery entirely.
        let channels = parse_channels(&lookup("NOTIFY_CHANNELS").unwrap_or_else(|| "sms".to_string()))?;

        let mut recipients = Vec::new();
        let mut twilio = None;
        let mut smtp = None;

        for channel in channels {
            match channel {
                Channel::Sms => {
                    let destination = get("SMS_TO_NUMBER").ok_or(ConfigError::Missing("SMS_TO_NUMBER"))?;
                    recipients.push(AlertRecipient { channel, destination });

                    if notifications_enabled {
                        twilio = Some(TwilioConfig {
                            account_sid: get("TWILIO_ACCOUNT_SID")
                                .ok_or(ConfigError::Missing("TWILIO_ACCOUNT_SID"))?,
                            auth_token: get("TWILIO_ACCOUNT_TOKEN")
                                .ok_or(ConfigError::Missing("TWILIO_ACCOUNT_TOKEN"))?,
                            from_number: get("TWILIO_FROM_NUMBER")
                                .ok_or(ConfigError::Missing("TWILIO_FROM_NUMBER"))?,
                        });
                    }
                }
                Channel::Email => {
                    let destination = get("ALERT_EMAIL_TO").ok_or(ConfigError::Missing("ALERT_EMAIL_TO"))?;
                    recipients.push(AlertRecipient { channel, destination });

                    if notifications_enabled {
                        let port = match get("SMTP_PORT") {
                            Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
                                name: "SMTP_PORT",
                                reason: e.to_string(),
                            })?,
                            None => DEFAULT_SMTP_PORT,
                        };
                        smtp = Some(SmtpConfig {
                            host: get("SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
                            port,
                            username: get("EMAIL_USER").ok_or(ConfigError::Missing("EMAIL_USER"))?,
                            password: get("EMAIL_PASSWORD").ok_or(ConfigError::Missing("EMAIL_PASSWORD"))?,
                        });
                    }
                }
            }
        }

        Ok(Self {
            product_url,
            database_url,
            http_timeout: Duration::from_secs(http_timeout_secs),
            schedule,
            alert: AlertConfig {
                threshold,
                currency: get("PRICE_CURRENCY").unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
                recipients,
            },
            notifications_enabled,
            twilio,
            smtp,
        })
    }
}

fn parse_threshold(raw: &str) -> Result<f64, ConfigError> {
    let value = raw.parse::<f64>().map_err(|e| ConfigError::Invalid {
        name: "ALERT_THRESHOLD",
        reason: e.to_string(),
    })?;
    if !value.is_finite() {
        return Err(ConfigError::Invalid {
            name: "ALERT_THRESHOLD",
            reason: "must be a finite number".to_string(),
        });
    }
    Ok(value)
}

fn parse_flag(raw: Option<String>, name: &'static str, default: bool) -> Result<bool, ConfigError> {
    match raw {
        None => Ok(default),
        Some(v) => v.to_lowercase().parse::<bool>().map_err(|_| ConfigError::Invalid {
            name,
            reason: format!("expected true or false, got '{}'", v),
        }),
    }
}

fn parse_timezone(raw: Option<String>) -> Result<ScheduleTimezone, ConfigError> {
    match raw.map(|v| v.to_lowercase()).as_deref() {
        None | Some("local") => Ok(ScheduleTimezone::Local),
        Some("utc") => Ok(ScheduleTimezone::Utc),
        Some(other) => Err(ConfigError::Invalid {
            name: "PRICE_CHECK_TIMEZONE",
            reason: format!("expected local or utc, got '{}'", other),
        }),
    }
}

fn parse_channels(raw: &str) -> Result<Vec<Channel>, ConfigError> {
    let mut channels = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let channel = part.parse::<Channel>().map_err(|reason| ConfigError::Invalid {
            name: "NOTIFY_CHANNELS",
            reason,
        })?;
        if !channels.contains(&channel) {
            channels.push(channel);
        }
    }
    Ok(channels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_in_dry_run() {
        let config = config_from(&[
            ("NOTIFICATIONS_ENABLED", "false"),
            ("SMS_TO_NUMBER", "+15550000000"),
        ])
        .unwrap();

        assert_eq!(config.product_url, DEFAULT_PRODUCT_URL);
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(config.alert.threshold, 15.0);
        assert_eq!(config.alert.currency, "CAD");
        assert_eq!(config.schedule.effective_cron(), "0 0 2 * * *");
        assert_eq!(config.schedule.timezone, ScheduleTimezone::Local);
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.alert.recipients.len(), 1);
        assert_eq!(config.alert.recipients[0].channel, Channel::Sms);
        assert!(config.twilio.is_none());
    }

    #[test]
    fn test_sms_requires_twilio_credentials_when_enabled() {
        let err = config_from(&[("SMS_TO_NUMBER", "+15550000000")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("TWILIO_ACCOUNT_SID")));
    }

    #[test]
    fn test_full_sms_and_email_config() {
        let config = config_from(&[
            ("NOTIFY_CHANNELS", "sms, email"),
            ("SMS_TO_NUMBER", "+15550000000"),
            ("TWILIO_ACCOUNT_SID", "AC123"),
            ("TWILIO_ACCOUNT_TOKEN", "secret"),
            ("TWILIO_FROM_NUMBER", "+15551111111"),
            ("ALERT_EMAIL_TO", "me@example.com"),
            ("EMAIL_USER", "bot@example.com"),
            ("EMAIL_PASSWORD", "app-password"),
            ("SMTP_PORT", "2525"),
            ("ALERT_THRESHOLD", "19.99"),
        ])
        .unwrap();

        assert_eq!(config.alert.recipients.len(), 2);
        assert_eq!(config.alert.threshold, 19.99);
        let smtp = config.smtp.unwrap();
        assert_eq!(smtp.host, DEFAULT_SMTP_HOST);
        assert_eq!(smtp.port, 2525);
        assert_eq!(config.twilio.unwrap().from_number, "+15551111111");
    }

    #[test]
    fn test_secrets_not_in_debug_output() {
        let config = config_from(&[
            ("SMS_TO_NUMBER", "+15550000000"),
            ("TWILIO_ACCOUNT_SID", "AC123"),
            ("TWILIO_ACCOUNT_TOKEN", "supersecret"),
            ("TWILIO_FROM_NUMBER", "+15551111111"),
        ])
        .unwrap();
        assert!(!format!("{:?}", config).contains("supersecret"));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            config_from(&[("ALERT_THRESHOLD", "cheap"), ("NOTIFY_CHANNELS", "")]),
            Err(ConfigError::Invalid { name: "ALERT_THRESHOLD", .. })
        ));
        assert!(matches!(
            config_from(&[("ALERT_THRESHOLD", "NaN"), ("NOTIFY_CHANNELS", "")]),
            Err(ConfigError::Invalid { name: "ALERT_THRESHOLD", .. })
        ));
        assert!(matches!(
            config_from(&[("NOTIFY_CHANNELS", "pager")]),
            Err(ConfigError::Invalid { name: "NOTIFY_CHANNELS", .. })
        ));
        assert!(matches!(
            config_from(&[("PRODUCT_URL", "not a url"), ("NOTIFY_CHANNELS", "")]),
            Err(ConfigError::Invalid { name: "PRODUCT_URL", .. })
        ));
    }

    #[test]
    fn test_test_mode_overrides_cron() {
        let config = config_from(&[
            ("NOTIFY_CHANNELS", ""),
            ("PRICE_CHECK_CRON", "0 30 6 * * *"),
            ("JOB_SCHEDULER_TEST_MODE", "TRUE"),
        ])
        .unwrap();
        assert!(config.alert.recipients.is_empty());
        assert_eq!(config.schedule.effective_cron(), TEST_MODE_CRON);
    }

    #[test]
    fn test_schedule_timezone() {
        let config = config_from(&[("NOTIFY_CHANNELS", ""), ("PRICE_CHECK_TIMEZONE", "UTC")]).unwrap();
        assert_eq!(config.schedule.timezone, ScheduleTimezone::Utc);

        assert!(matches!(
            config_from(&[("NOTIFY_CHANNELS", ""), ("PRICE_CHECK_TIMEZONE", "Mars/Olympus")]),
            Err(ConfigError::Invalid { name: "PRICE_CHECK_TIMEZONE", .. })
        ));
    }
}
