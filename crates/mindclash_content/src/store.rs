//! # Content Store
//!
//! The seam to the external quiz content API. The store only exposes
//! per-id lookups (plus a bulk listing for editorial tooling); rate
//! limiting is this subsystem's job, not the store's.

use async_trait::async_trait;

use mindclash_core::Throttled;

use crate::model::Concept;

/// Errors from content fetching and assembly.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ContentError {
    /// The HTTP call failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The store signaled throttling. Retried by the limiter.
    #[error("content store rate limited: {0}")]
    RateLimited(String),

    /// The concept does not exist.
    #[error("concept {0} not found")]
    NotFound(u16),

    /// The response body did not parse.
    #[error("malformed content payload: {0}")]
    BadPayload(String),

    /// Not a single concept of the room's selection could be retrieved.
    #[error("no quiz content could be retrieved")]
    Empty,
}

impl Throttled for ContentError {
    fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited(_))
    }
}

/// Read access to quiz content.
#[async_trait]
pub trait ConceptStore: Send + Sync {
    /// Fetches one concept by id.
    async fn fetch_concept(&self, id: u16) -> Result<Concept, ContentError>;

    /// Fetches the full concept catalogue.
    async fn fetch_all(&self) -> Result<Vec<Concept>, ContentError>;
}

/// Production store over the content HTTP API.
pub struct HttpConceptStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpConceptStore {
    /// Creates a store against the given base URL (no trailing slash).
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response, ContentError> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ContentError::Transport(e.to_string()))?;

        match response.status().as_u16() {
            429 | 503 => Err(ContentError::RateLimited(format!("http {}", response.status()))),
            _ if response.status().is_success() => Ok(response),
            _ => Err(ContentError::Transport(format!("http {}", response.status()))),
        }
    }
}

#[async_trait]
impl ConceptStore for HttpConceptStore {
    async fn fetch_concept(&self, id: u16) -> Result<Concept, ContentError> {
        let url = format!("{}/concept/{id}", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ContentError::Transport(e.to_string()))?;

        match response.status().as_u16() {
            404 => Err(ContentError::NotFound(id)),
            429 | 503 => Err(ContentError::RateLimited(format!("http {}", response.status()))),
            _ if response.status().is_success() => response
                .json::<Concept>()
                .await
                .map_err(|e| ContentError::BadPayload(e.to_string())),
            _ => Err(ContentError::Transport(format!("http {}", response.status()))),
        }
    }

    async fn fetch_all(&self) -> Result<Vec<Concept>, ContentError> {
        self.get("/concept")
            .await?
            .json::<Vec<Concept>>()
            .await
            .map_err(|e| ContentError::BadPayload(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throttle_classification() {
        assert!(ContentError::RateLimited("http 503".to_string()).is_rate_limited());
        assert!(!ContentError::NotFound(9).is_rate_limited());
        assert!(!ContentError::Transport("reset".to_string()).is_rate_limited());
        assert!(!ContentError::Empty.is_rate_limited());
    }
}
