//! Fortune Cache - per-day idempotent records with bounded regeneration
//!
//! Provides:
//! - [`RecordStore`]: the persistence seam with conditional writes
//! - [`InMemoryStore`]: DashMap-backed store with atomic conditional writes
//! - [`CachedStore`]: moka read-through layer over any store
//! - [`Clock`]: "today" resolution ([`SystemClock`], [`FixedClock`])
//! - [`DailyCacheController`]: fetch-or-create and quota-bounded regeneration
//!
//! # Example
//!
//! ```rust,ignore
//! let controller = DailyCacheController::from_config(store, gateway, &config);
//! match controller.fetch_or_create(&request).await? {
//!     FetchOutcome::Ready(fetched) => render(fetched.record),
//!     FetchOutcome::LimitExceeded(limit) => notify(limit),
//! }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod cached;
pub mod clock;
pub mod controller;
pub mod memory;
pub mod store;

pub use cached::{CacheStats, CachedStore};
pub use clock::{Clock, FixedClock, SystemClock};
pub use controller::{
    ControllerStats, DailyCacheController, FetchOutcome, Fetched, RecordSource,
    RegenerationLimitExceeded, StatsSnapshot,
};
pub use memory::InMemoryStore;
pub use store::{PutOutcome, RecordStore};
