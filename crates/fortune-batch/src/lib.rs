//! Fortune Batch - multi-type packages over the daily cache
//!
//! Provides:
//! - [`BatchOrchestrator`]: concurrent fan-out of one package
//! - [`BatchResult`]: per-type outcomes in package order plus usage total
//! - [`BatchItemError`]: typed per-type failures, never fatal to the batch
//! - [`PackageSummary`]: aggregate reading over the successful types
//!
//! # Example
//!
//! ```rust,ignore
//! let orchestrator = BatchOrchestrator::from_config(controller, &config);
//! let request = BatchRequest::new("user-1", TRADITIONAL_PACKAGE).with_attributes(attrs);
//! let batch = orchestrator.generate_batch(&request).await?;
//! for (fortune_type, item) in &batch.results {
//!     // ...
//! }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod orchestrator;
pub mod result;
pub mod summary;

pub use orchestrator::{BatchOrchestrator, BatchRequest};
pub use result::{BatchItem, BatchItemError, BatchResult};
pub use summary::PackageSummary;
