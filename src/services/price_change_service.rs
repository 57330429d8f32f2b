//! Price-change detection: the decision at the heart of every cycle.
//!
//! A cycle reads the product page, compares the price with the last one on
//! record, appends a new record when it differs, and alerts when the new price
//! is below the configured threshold.

use chrono::Utc;
use tracing::{error, info, warn};

use crate::config::AlertConfig;
use crate::errors::CycleError;
use crate::external::reading_source::ReadingSource;
use crate::models::{AlertOutcome, CycleOutcome, PriceRecord, Reading};
use crate::services::notification_service::{format_alert_message, Notifier};
use crate::store::PriceStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Unchanged,
    Changed { notify: bool },
}

/// Compare a fresh price with the last stored record.
///
/// No prior record always counts as a change. Otherwise prices compare with
/// exact `Option<f64>` equality: no tolerance, and an absent price equals only
/// another absent price. An absent price never triggers an alert.
pub fn evaluate(last: Option<&PriceRecord>, price: Option<f64>, threshold: f64) -> Decision {
    let changed = match last {
        None => true,
        Some(record) => record.price != price,
    };

    if !changed {
        return Decision::Unchanged;
    }

    Decision::Changed {
        notify: price.is_some_and(|p| p < threshold),
    }
}

/// Run one full fetch, compare, store, notify sequence.
///
/// Fetch and store failures abort the cycle and are returned. Notification
/// failures are logged per recipient; the record stays persisted.
pub async fn run_cycle(
    source: &dyn ReadingSource,
    store: &PriceStore,
    notifier: &dyn Notifier,
    alert: &AlertConfig,
) -> Result<CycleOutcome, CycleError> {
    let reading = source.fetch().await?;
    process_reading(reading, store, notifier, alert).await
}

pub async fn process_reading(
    reading: Reading,
    store: &PriceStore,
    notifier: &dyn Notifier,
    alert: &AlertConfig,
) -> Result<CycleOutcome, CycleError> {
    let product_name = reading.product_name.ok_or(CycleError::MissingProductName)?;
    let price = reading.price;

    if price.is_none() {
        warn!("No price found on page for {}", product_name);
    }

    let last = store.get_last_record(&product_name).await?;

    match evaluate(last.as_ref(), price, alert.threshold) {
        Decision::Unchanged => {
            info!("Price has not changed for {} ({:?})", product_name, price);
            Ok(CycleOutcome::Unchanged { product_name, price })
        }
        Decision::Changed { notify } => {
            let record = store.append(&product_name, price, Utc::now()).await?;
            info!(
                "💾 Price stored for {}: {:?} -> {:?} (record #{})",
                product_name,
                last.as_ref().and_then(|r| r.price),
                price,
                record.id
            );

            let alert_outcome = match (notify, price) {
                (true, Some(current)) => send_alerts(notifier, alert, &product_name, current).await,
                _ => {
                    info!("Product: {}, Price: {:?}", product_name, price);
                    AlertOutcome::NotRequested
                }
            };

            Ok(CycleOutcome::Recorded {
                record,
                alert: alert_outcome,
            })
        }
    }
}

async fn send_alerts(
    notifier: &dyn Notifier,
    alert: &AlertConfig,
    product_name: &str,
    price: f64,
) -> AlertOutcome {
    let message = format_alert_message(product_name, &alert.currency, price);

    if alert.recipients.is_empty() {
        warn!("Price {} is below threshold {} but no recipients are configured", price, alert.threshold);
    }

    let mut delivered = 0;
    let mut failed = 0;

    for recipient in &alert.recipients {
        match notifier.notify(recipient.channel, &recipient.destination, &message).await {
            Ok(()) => {
                info!("🔔 {} alert sent to {}", recipient.channel, recipient.destination);
                delivered += 1;
            }
            Err(e) => {
                error!("❌ Failed to send {} alert to {}: {}", recipient.channel, recipient.destination, e);
                failed += 1;
            }
        }
    }

    AlertOutcome::Attempted { delivered, failed }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(price: Option<f64>) -> PriceRecord {
        PriceRecord {
            id: 1,
            product_name: "Widget".to_string(),
            price,
            observed_at: Utc::now(),
        }
    }

    #[test]
    fn test_first_observation_is_a_change() {
        assert_eq!(evaluate(None, Some(12.0), 15.0), Decision::Changed { notify: true });
        assert_eq!(evaluate(None, Some(20.0), 15.0), Decision::Changed { notify: false });
        assert_eq!(evaluate(None, None, 15.0), Decision::Changed { notify: false });
    }

    #[test]
    fn test_same_price_is_unchanged() {
        assert_eq!(evaluate(Some(&record(Some(12.0))), Some(12.0), 15.0), Decision::Unchanged);
        assert_eq!(evaluate(Some(&record(None)), None, 15.0), Decision::Unchanged);
    }

    #[test]
    fn test_threshold_is_strict() {
        let last = record(Some(20.0));
        assert_eq!(evaluate(Some(&last), Some(15.0), 15.0), Decision::Changed { notify: false });
        assert_eq!(evaluate(Some(&last), Some(14.99), 15.0), Decision::Changed { notify: true });
    }

    #[test]
    fn test_absent_price_never_notifies() {
        assert_eq!(
            evaluate(Some(&record(Some(12.0))), None, 15.0),
            Decision::Changed { notify: false }
        );
        assert_eq!(
            evaluate(Some(&record(None)), Some(3.0), 15.0),
            Decision::Changed { notify: true }
        );
    }

    #[test]
    fn test_exact_float_equality() {
        // 0.1 + 0.2 != 0.3 in binary floating point, so this reads as a change.
        let last = record(Some(0.1 + 0.2));
        assert_eq!(evaluate(Some(&last), Some(0.3), 15.0), Decision::Changed { notify: true });
    }
}
