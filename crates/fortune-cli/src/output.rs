//! JSON views printed to stdout

use fortune_batch::{BatchItemError, BatchResult};
use fortune_cache::FetchOutcome;
use fortune_core::{FortuneRecord, PackageDefinition};
use serde_json::{json, Value};

/// View of a single-type call
pub(crate) fn fetch_view(outcome: &FetchOutcome) -> Value {
    match outcome {
        FetchOutcome::Ready(fetched) => json!({
            "status": "ok",
            "source": fetched.source,
            "record": record_view(&fetched.record),
            "token_usage": fetched.usage,
        }),
        FetchOutcome::LimitExceeded(limit) => json!({
            "status": "limit_exceeded",
            "message": limit.to_string(),
            "key": limit.key,
            "generation_count": limit.generation_count,
            "quota": limit.quota,
        }),
    }
}

/// Persisted shape plus provenance
pub(crate) fn record_view(record: &FortuneRecord) -> Value {
    json!({
        "stored": record.to_stored(),
        "provenance": record.provenance(),
    })
}

/// View of a batch; entries keep package order
pub(crate) fn batch_view(batch: &BatchResult) -> Value {
    let results: serde_json::Map<String, Value> = batch
        .results
        .iter()
        .map(|(fortune_type, item)| {
            let entry = match item {
                Ok(record) => json!({ "ok": record_view(record) }),
                Err(e) => json!({ "error": error_view(e) }),
            };
            (fortune_type.to_string(), entry)
        })
        .collect();

    json!({
        "batch_id": batch.batch_id.to_string(),
        "user_id": batch.user_id,
        "package_id": batch.package_id,
        "date": batch.date,
        "results": results,
        "package_summary": batch.package_summary,
        "token_usage": batch.token_usage,
        "elapsed_ms": batch.elapsed_ms,
    })
}

fn error_view(error: &BatchItemError) -> Value {
    json!({
        "kind": error.kind(),
        "message": error.to_string(),
    })
}

/// View of the package registry
pub(crate) fn packages_view<'a>(
    packages: impl IntoIterator<Item = &'a PackageDefinition>,
) -> Value {
    json!(packages.into_iter().collect::<Vec<_>>())
}
