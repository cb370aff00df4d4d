//! External text-generation provider seam
//!
//! The provider is an injected collaborator: it receives a rendered
//! [`Prompt`] and returns either free text or an already-structured JSON
//! value, together with the token counts it billed.

use fortune_core::FortuneType;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Rendered prompt for one generation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    /// Fortune type being generated
    pub fortune_type: FortuneType,
    /// Attempt number (0 for the first generation)
    pub attempt: u32,
    /// System instructions including the response schema
    pub system: String,
    /// User message rendered from the fortune type's template
    pub user: String,
}

/// Response content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "content", rename_all = "snake_case")]
pub enum CompletionBody {
    /// Free text, expected to contain a JSON object
    Text(String),
    /// Structured JSON returned directly
    Structured(Value),
}

/// Provider response with billing data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    /// Content
    pub body: CompletionBody,
    /// Model identifier
    pub model: String,
    /// Prompt tokens billed
    pub prompt_tokens: u64,
    /// Completion tokens billed
    pub completion_tokens: u64,
}

impl Completion {
    /// Text completion without usage
    #[inline]
    #[must_use]
    pub fn text(model: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            body: CompletionBody::Text(text.into()),
            model: model.into(),
            prompt_tokens: 0,
            completion_tokens: 0,
        }
    }

    /// Structured completion without usage
    #[inline]
    #[must_use]
    pub fn structured(model: impl Into<String>, value: Value) -> Self {
        Self {
            body: CompletionBody::Structured(value),
            model: model.into(),
            prompt_tokens: 0,
            completion_tokens: 0,
        }
    }

    /// With billed token counts
    #[inline]
    #[must_use]
    pub fn with_usage(mut self, prompt_tokens: u64, completion_tokens: u64) -> Self {
        self.prompt_tokens = prompt_tokens;
        self.completion_tokens = completion_tokens;
        self
    }
}

/// Provider failures; always recovered by the fallback path
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// Endpoint unreachable or connection failed
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// Provider throttled the call
    #[error("provider rate limited")]
    RateLimited,

    /// Provider rejected the request
    #[error("provider rejected request ({status}): {message}")]
    Rejected {
        /// Status code reported by the provider
        status: u16,
        /// Error message
        message: String,
    },

    /// Provider reported its own deadline expiry
    #[error("provider timed out")]
    Timeout,
}

/// Text-generation provider
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TextProvider: Send + Sync {
    /// Complete a prompt
    ///
    /// # Errors
    /// Any provider-side failure; the gateway treats every error alike
    async fn complete(&self, prompt: &Prompt) -> Result<Completion, ProviderError>;
}
