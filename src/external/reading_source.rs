use async_trait::async_trait;
use thiserror::Error;

use crate::models::Reading;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("network error: {0}")]
    Network(String),

    #[error("page returned HTTP {0}")]
    BadStatus(u16),

    #[error("client setup failed: {0}")]
    Client(String),
}

/// Anything that can produce a reading for the watched product.
///
/// Missing fields on an otherwise reachable page are not errors; they come
/// back as `None` inside the [`Reading`].
#[async_trait]
pub trait ReadingSource: Send + Sync {
    async fn fetch(&self) -> Result<Reading, SourceError>;
}
