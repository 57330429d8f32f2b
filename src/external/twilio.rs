use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::config::TwilioConfig;
use crate::services::notification_service::NotifyError;

const TWILIO_API_BASE: &str = "https://api.twilio.com/2010-04-01";

/// Minimal client for the Twilio Messages API.
pub struct TwilioClient {
    client: reqwest::Client,
    config: TwilioConfig,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct TwilioMessageResponse {
    sid: String,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TwilioErrorResponse {
    code: Option<u32>,
    message: String,
}

impl TwilioClient {
    pub fn new(config: TwilioConfig, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            config,
            base_url: TWILIO_API_BASE.to_string(),
        })
    }

    /// Point the client at another API host (used against local stubs).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/Accounts/{}/Messages.json",
            self.base_url.trim_end_matches('/'),
            self.config.account_sid
        )
    }

    /// Send one SMS and return the message SID.
    pub async fn send_sms(&self, to: &str, body: &str) -> Result<String, NotifyError> {
        let resp = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&[
                ("To", to),
                ("From", self.config.from_number.as_str()),
                ("Body", body),
            ])
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        if !status.is_success() {
            let reason = match serde_json::from_str::<TwilioErrorResponse>(&text) {
                Ok(err) => match err.code {
                    Some(code) => format!("HTTP {} (Twilio error {}): {}", status, code, err.message),
                    None => format!("HTTP {}: {}", status, err.message),
                },
                Err(_) => format!("HTTP {}", status),
            };
            return Err(NotifyError::Rejected(reason));
        }

        let message: TwilioMessageResponse = serde_json::from_str(&text)
            .map_err(|e| NotifyError::Transport(format!("unexpected Twilio response: {}", e)))?;

        info!(
            "📱 SMS sent! SID: {} (status: {})",
            message.sid,
            message.status.as_deref().unwrap_or("unknown")
        );
        Ok(message.sid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> TwilioConfig {
        TwilioConfig {
            account_sid: "AC123".to_string(),
            auth_token: "token".to_string(),
            from_number: "+15551111111".to_string(),
        }
    }

    #[test]
    fn test_messages_url() {
        let client = TwilioClient::new(config(), Duration::from_secs(5)).unwrap();
        assert_eq!(
            client.messages_url(),
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );

        let client = client.with_base_url("http://localhost:4010/");
        assert_eq!(client.messages_url(), "http://localhost:4010/Accounts/AC123/Messages.json");
    }

    #[test]
    fn test_error_body_shape() {
        let body = r#"{"code": 21211, "message": "The 'To' number is not valid.", "status": 400}"#;
        let err: TwilioErrorResponse = serde_json::from_str(body).unwrap();
        assert_eq!(err.code, Some(21211));
        assert!(err.message.contains("not valid"));
    }

    #[tokio::test]
    async fn test_unreachable_api_is_transport_error() {
        let client = TwilioClient::new(config(), Duration::from_secs(2))
            .unwrap()
            .with_base_url("http://127.0.0.1:9");

        let result = client.send_sms("+15550000000", "hello").await;
        assert!(matches!(result, Err(NotifyError::Transport(_))));
    }
}
