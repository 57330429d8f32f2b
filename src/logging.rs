//! Tracing setup: an env-filtered fmt layer, plus Loki shipping when the
//! `loki` feature is built and `LOKI_ENABLED=true`.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::errors::ConfigError;

pub const DEFAULT_LOG_FILTER: &str = "info,sqlx=warn";

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Filter directives, same syntax as RUST_LOG.
    pub filter: String,
    /// Loki push endpoint; `None` keeps logs on the console only.
    pub loki_url: Option<url::Url>,
    /// `service` label on every record shipped to Loki.
    pub service_name: String,
    /// `environment` label on every record shipped to Loki.
    pub environment: String,
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let loki_enabled = lookup("LOKI_ENABLED")
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let loki_url = if loki_enabled {
            let raw = lookup("LOKI_URL").ok_or(ConfigError::Missing("LOKI_URL"))?;
            let url = url::Url::parse(raw.trim()).map_err(|e| ConfigError::Invalid {
                name: "LOKI_URL",
                reason: e.to_string(),
            })?;
            Some(url)
        } else {
            None
        };

        Ok(Self {
            filter: lookup("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            loki_url,
            service_name: lookup("SERVICE_NAME").unwrap_or_else(|| "pricewatch".to_string()),
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
        })
    }
}

pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    match config.loki_url.clone() {
        #[cfg(feature = "loki")]
        Some(url) => {
            let (loki_layer, task) = tracing_loki::builder()
                .label("service", &config.service_name)?
                .label("environment", &config.environment)?
                .build_url(url.clone())?;

            // Ships buffered records in the background
            tokio::spawn(task);

            tracing_subscriber::registry()
                .with(EnvFilter::new(&config.filter))
                .with(tracing_subscriber::fmt::layer())
                .with(loki_layer)
                .try_init()?;

            tracing::info!(
                "📊 {} logging initialized ({}), shipping to Loki at {}",
                config.service_name,
                config.environment,
                url
            );
        }
        #[cfg(not(feature = "loki"))]
        Some(url) => {
            init_console(&config)?;
            tracing::warn!("LOKI_URL {} ignored: built without the loki feature", url);
        }
        None => init_console(&config)?,
    }

    Ok(())
}

fn init_console(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(EnvFilter::new(&config.filter))
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    tracing::info!(
        "📊 {} logging initialized ({})",
        config.service_name,
        config.environment
    );
    Ok(())
}
