use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::external::page_parser;
use crate::external::reading_source::{ReadingSource, SourceError};
use crate::models::Reading;

// Product pages refuse obviously scripted clients.
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Fetches one fixed product page over HTTP and parses it.
pub struct ProductPageSource {
    client: reqwest::Client,
    url: String,
}

impl ProductPageSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Client(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ReadingSource for ProductPageSource {
    async fn fetch(&self) -> Result<Reading, SourceError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(SourceError::BadStatus(resp.status().as_u16()));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        info!("🌐 Fetched product page {} ({} bytes)", self.url, body.len());

        let reading = page_parser::parse_reading(&body);
        debug!("Parsed reading: {:?}", reading);
        Ok(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_page_is_network_error() {
        // Port 9 (discard) on localhost is closed on any sane test machine.
        let source = ProductPageSource::new("http://127.0.0.1:9/product", Duration::from_secs(2)).unwrap();

        let result = source.fetch().await;
        assert!(matches!(result, Err(SourceError::Network(_))));
    }
}
