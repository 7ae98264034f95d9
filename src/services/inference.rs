//! Contract with the external generative-text provider.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::domain::ImageReference;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("inference provider unreachable: {0}")]
    Network(String),

    #[error("inference call timed out after {0:?}")]
    Timeout(Duration),

    #[error("inference call cancelled")]
    Cancelled,

    #[error("inference provider rate limit or quota exceeded")]
    RateLimited,

    #[error("inference provider rejected credentials (status {0})")]
    Unauthorized(u16),

    #[error("inference provider rejected the request (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("inference provider failed (status {status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("inference provider returned an empty response")]
    EmptyResponse,

    #[error("inference provider returned an unreadable response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Whether resubmitting the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout(_) | Self::RateLimited | Self::Upstream { .. }
        )
    }
}

/// Prompt in, text out. Implementations must be safe to call concurrently.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;

    async fn complete_multimodal(
        &self,
        prompt: &str,
        image: &ImageReference,
    ) -> Result<String, ProviderError>;

    async fn health_check(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}
