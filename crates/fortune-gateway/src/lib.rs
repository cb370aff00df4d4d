//! Fortune Gateway - provider-backed generation with deterministic fallback
//!
//! Provides:
//! - [`TextProvider`]: the external text-generation seam
//! - [`PromptBuilder`]: catalog-driven prompt rendering
//! - [`validate_response`]: schema validation and score clamping
//! - [`GenerationGateway`]: provider first, rule-based fallback second,
//!   with provenance and token usage on every outcome
//!
//! # Example
//!
//! ```rust,ignore
//! let gateway = GenerationGateway::from_config(&config)
//!     .with_provider(Arc::new(my_provider));
//! let outcome = gateway.generate(&request, 0).await?;
//! if outcome.provenance.is_fallback() {
//!     tracing::info!("served deterministic content");
//! }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod gateway;
pub mod prompt;
pub mod provider;
pub mod schema;

pub use gateway::{GenerationGateway, GenerationOutcome};
pub use prompt::PromptBuilder;
pub use provider::{Completion, CompletionBody, Prompt, ProviderError, TextProvider};
pub use schema::{extract_json, validate_response, SchemaError};
