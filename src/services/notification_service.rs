use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;
use tracing::info;

use crate::config::{AppConfig, SmtpConfig};
use crate::external::twilio::TwilioClient;
use crate::models::Channel;

pub const EMAIL_SUBJECT: &str = "Price Alert";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("{0} channel is not configured")]
    ChannelNotConfigured(Channel),
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("rejected by provider: {0}")]
    Rejected(String),
}

/// Delivers one message to one destination. Failures are reported, not retried.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, channel: Channel, destination: &str, message: &str) -> Result<(), NotifyError>;
}

// ==============================================================================
// Message Formatting
// ==============================================================================

pub fn format_alert_message(product_name: &str, currency: &str, price: f64) -> String {
    format!(
        "The price for the {} has decreased to {}{:.2}!",
        product_name, currency, price
    )
}

fn build_email_html(message: &str) -> String {
    format!(
        r#"
<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif;">
    <h2 style="color: #2e7d32;">📉 {}</h2>
    <p>{}</p>
</body>
</html>
"#,
        EMAIL_SUBJECT,
        escape_html(message)
    )
}

// Product names come straight from the scraped page.
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ==============================================================================
// Live Notifier
// ==============================================================================

/// Sends SMS through Twilio and email over SMTP.
///
/// Built once at startup; a channel without credentials stays `None` and
/// reports [`NotifyError::ChannelNotConfigured`].
pub struct NotificationService {
    sms: Option<TwilioClient>,
    email: Option<EmailSender>,
}

impl NotificationService {
    pub fn new(sms: Option<TwilioClient>, email: Option<EmailSender>) -> Self {
        Self { sms, email }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, NotifyError> {
        let sms = config
            .twilio
            .clone()
            .map(|twilio| TwilioClient::new(twilio, config.http_timeout))
            .transpose()?;
        let email = config
            .smtp
            .as_ref()
            .map(|smtp| EmailSender::new(smtp, config.http_timeout))
            .transpose()?;

        Ok(Self::new(sms, email))
    }
}

#[async_trait]
impl Notifier for NotificationService {
    async fn notify(&self, channel: Channel, destination: &str, message: &str) -> Result<(), NotifyError> {
        match channel {
            Channel::Sms => {
                let sms = self.sms.as_ref().ok_or(NotifyError::ChannelNotConfigured(channel))?;
                sms.send_sms(destination, message).await.map(|_| ())
            }
            Channel::Email => {
                let email = self.email.as_ref().ok_or(NotifyError::ChannelNotConfigured(channel))?;
                email.send(destination, message).await
            }
        }
    }
}

/// SMTP sender with STARTTLS and login credentials.
pub struct EmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailSender {
    pub fn new(config: &SmtpConfig, timeout: Duration) -> Result<Self, NotifyError> {
        let from: Mailbox = config
            .username
            .parse()
            .map_err(|e| NotifyError::InvalidAddress(format!("{}: {}", config.username, e)))?;

        let creds = Credentials::new(config.username.clone(), config.password.clone());

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| NotifyError::Transport(format!("Failed to create SMTP transport: {}", e)))?
            .port(config.port)
            .credentials(creds)
            .timeout(Some(timeout))
            .build();

        Ok(Self { mailer, from })
    }

    pub async fn send(&self, to_email: &str, message: &str) -> Result<(), NotifyError> {
        let email = build_email(self.from.clone(), to_email, message)?;

        self.mailer
            .send(email)
            .await
            .map_err(|e| NotifyError::Transport(format!("SMTP send failed: {}", e)))?;

        info!("📧 Email sent successfully to {}", to_email);
        Ok(())
    }
}

fn build_email(from: Mailbox, to_email: &str, message: &str) -> Result<Message, NotifyError> {
    let to: Mailbox = to_email
        .parse()
        .map_err(|e| NotifyError::InvalidAddress(format!("{}: {}", to_email, e)))?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(EMAIL_SUBJECT)
        .multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_PLAIN)
                        .body(message.to_string()),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(ContentType::TEXT_HTML)
                        .body(build_email_html(message)),
                ),
        )
        .map_err(|e| NotifyError::Transport(format!("Failed to build email: {}", e)))
}

// ==============================================================================
// Dry-Run Notifier
// ==============================================================================

/// Logs what would be sent. Used when NOTIFICATIONS_ENABLED=false.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, channel: Channel, destination: &str, message: &str) -> Result<(), NotifyError> {
        info!("🔕 {} notification would be sent to {}: {}", channel, destination, message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_alert_message() {
        assert_eq!(
            format_alert_message("Widget", "CAD", 12.0),
            "The price for the Widget has decreased to CAD12.00!"
        );
        assert_eq!(
            format_alert_message("Gizmo", "$", 9.999),
            "The price for the Gizmo has decreased to $10.00!"
        );
    }

    #[test]
    fn test_email_html_escapes_product_name() {
        let message = format_alert_message("<b>Widget</b> & \"Stand\"", "CAD", 9.0);
        let html = build_email_html(&message);

        assert!(html.contains("&lt;b&gt;Widget&lt;/b&gt; &amp; &quot;Stand&quot;"));
        assert!(!html.contains("<b>Widget"));
    }

    #[test]
    fn test_build_email_rejects_bad_recipient() {
        let from: Mailbox = "bot@example.com".parse().unwrap();
        let result = build_email(from, "not-an-address", "hi");
        assert!(matches!(result, Err(NotifyError::InvalidAddress(_))));
    }

    #[test]
    fn test_build_email_headers() {
        let from: Mailbox = "bot@example.com".parse().unwrap();
        let email = build_email(from, "me@example.com", "The price dropped").unwrap();
        let raw = String::from_utf8(email.formatted()).unwrap();

        assert!(raw.contains("Subject: Price Alert"));
        assert!(raw.contains("To: me@example.com"));
        assert!(raw.contains("The price dropped"));
    }

    #[tokio::test]
    async fn test_unconfigured_channel_fails() {
        let service = NotificationService::new(None, None);

        let sms = service.notify(Channel::Sms, "+15550000000", "hi").await;
        assert!(matches!(sms, Err(NotifyError::ChannelNotConfigured(Channel::Sms))));

        let email = service.notify(Channel::Email, "me@example.com", "hi").await;
        assert!(matches!(email, Err(NotifyError::ChannelNotConfigured(Channel::Email))));
    }

    #[tokio::test]
    async fn test_log_notifier_always_succeeds() {
        assert!(LogNotifier.notify(Channel::Email, "me@example.com", "hi").await.is_ok());
    }
}
