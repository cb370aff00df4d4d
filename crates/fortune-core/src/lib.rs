//! Fortune Core - data model for the fortune generation pipeline
//!
//! Provides:
//! - Fortune types, requests and the `(user, fortune_type, date)` key
//! - The fortune-type catalog (fields, score bounds, required attributes)
//! - Typed payloads unified under a tagged union
//! - Committed records with provenance metadata
//! - Package definitions
//! - Token usage accounting, configuration and the error taxonomy
//!
//! # Example
//!
//! ```rust,ignore
//! use fortune_core::{Attributes, FortuneRequest, FortuneType, validate_request};
//!
//! let request = FortuneRequest::new("user-1", FortuneType::BloodType, date)
//!     .with_attributes(Attributes::new().with("blood_type", "A형"));
//! validate_request(&request)?;
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod attributes;
pub mod catalog;
pub mod config;
pub mod error;
pub mod package;
pub mod payload;
pub mod record;
pub mod types;
pub mod usage;

pub use attributes::{normalize_blood_type, Attributes};
pub use catalog::{spec_for, validate_request, FieldKind, FieldSpec, FortuneSpec, ScoreBound};
pub use config::FortuneConfig;
pub use error::{ConfigError, FortuneError, GenerationError, StoreError, ValidationError};
pub use package::{PackageDefinition, PackageRegistry};
pub use payload::{FortunePayload, LuckyValue};
pub use record::{FallbackReason, FortuneRecord, Provenance, StoredRecord};
pub use types::{FortuneRequest, FortuneType, RecordKey, UserId};
pub use usage::{Pricing, TokenUsage};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
