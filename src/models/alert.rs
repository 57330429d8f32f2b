use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::PriceRecord;

// ==============================================================================
// Notification Channels
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Sms,
    Email,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Sms => write!(f, "sms"),
            Channel::Email => write!(f, "email"),
        }
    }
}

impl FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sms" => Ok(Channel::Sms),
            "email" => Ok(Channel::Email),
            other => Err(format!("unknown notification channel '{}'", other)),
        }
    }
}

/// Where an alert goes: a phone number for SMS, an address for email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRecipient {
    pub channel: Channel,
    pub destination: String,
}

// ==============================================================================
// Cycle Outcome
// ==============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum AlertOutcome {
    /// Price absent or not below the threshold.
    NotRequested,
    /// One delivery attempt per recipient.
    Attempted { delivered: usize, failed: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Unchanged {
        product_name: String,
        price: Option<f64>,
    },
    Recorded {
        record: PriceRecord,
        alert: AlertOutcome,
    },
}

impl CycleOutcome {
    pub fn was_recorded(&self) -> bool {
        matches!(self, CycleOutcome::Recorded { .. })
    }
}
