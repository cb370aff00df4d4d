//! Optional on-disk snapshot of the in-memory store
//!
//! Lets consecutive CLI invocations share one day's records.

use anyhow::{Context, Result};
use fortune_cache::InMemoryStore;
use fortune_core::FortuneRecord;
use std::path::Path;

/// Load a snapshot; a missing file is an empty store
pub(crate) fn load(path: &Path) -> Result<InMemoryStore> {
    if !path.exists() {
        return Ok(InMemoryStore::new());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading state file {}", path.display()))?;
    let records: Vec<FortuneRecord> = serde_json::from_str(&text)
        .with_context(|| format!("parsing state file {}", path.display()))?;
    tracing::debug!(path = %path.display(), records = records.len(), "Loaded state");
    Ok(InMemoryStore::from_records(records))
}

/// Write every record in `store` to `path`
pub(crate) fn save(path: &Path, store: &InMemoryStore) -> Result<()> {
    let records = store.snapshot();
    let text = serde_json::to_string_pretty(&records)?;
    std::fs::write(path, text)
        .with_context(|| format!("writing state file {}", path.display()))?;
    tracing::debug!(path = %path.display(), records = records.len(), "Saved state");
    Ok(())
}
