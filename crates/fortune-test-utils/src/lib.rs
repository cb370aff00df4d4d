//! Testing utilities for the fortune workspace
//!
//! Shared providers, stores, fallbacks and fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::NaiveDate;
use fortune_cache::{DailyCacheController, FixedClock, InMemoryStore, PutOutcome, RecordStore};
use fortune_core::{
    Attributes, FortuneConfig, FortunePayload, FortuneRecord, FortuneRequest, FortuneType,
    GenerationError, RecordKey, StoreError,
};
use fortune_engine::{FallbackGenerator, RuleBasedFallback};
use fortune_gateway::{Completion, GenerationGateway, Prompt, ProviderError, TextProvider};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const TEST_MODEL: &str = "test-model";

pub fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
}

/// Attributes satisfying every fortune type's requirements
pub fn full_attributes() -> Attributes {
    Attributes::new()
        .with("birth_date", "1990-06-15")
        .with("blood_type", "A형")
        .with("gender", "female")
        .with("occupation", "engineer")
        .with("experience_years", 12)
        .with("dream_content", "맑은 물에서 용이 솟아올랐다")
}

pub fn request(user: &str, fortune_type: FortuneType) -> FortuneRequest {
    FortuneRequest::new(user, fortune_type, test_date()).with_attributes(full_attributes())
}

pub fn blood_type_request() -> FortuneRequest {
    FortuneRequest::new("user-1", FortuneType::BloodType, test_date()).with_attributes(
        Attributes::new()
            .with("birth_date", "1990-06-15")
            .with("blood_type", "A형"),
    )
}

/// Schema-valid provider body for `fortune_type`
pub fn valid_body(fortune_type: FortuneType) -> Value {
    let payload = RuleBasedFallback::new()
        .generate(&request("provider-fixture", fortune_type), 0)
        .unwrap();
    Value::Object(payload.fields())
}

pub fn valid_completion(fortune_type: FortuneType) -> Completion {
    Completion::structured(TEST_MODEL, valid_body(fortune_type)).with_usage(400, 200)
}

pub fn fallback_gateway() -> GenerationGateway {
    GenerationGateway::from_config(&FortuneConfig::default())
}

pub fn gateway_with(provider: Arc<dyn TextProvider>) -> GenerationGateway {
    fallback_gateway().with_provider(provider)
}

pub fn controller(
    store: Arc<dyn RecordStore>,
    gateway: GenerationGateway,
) -> DailyCacheController {
    DailyCacheController::new(store, gateway)
        .with_clock(Arc::new(FixedClock::at_date(test_date())))
}

pub fn fallback_controller() -> (DailyCacheController, Arc<InMemoryStore>) {
    let store = Arc::new(InMemoryStore::new());
    (controller(store.clone(), fallback_gateway()), store)
}

/// Replays scripted responses in order; the last one repeats
#[derive(Debug)]
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<Completion, ProviderError>>>,
    last: Mutex<Option<Result<Completion, ProviderError>>>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<Prompt>>,
}

impl ScriptedProvider {
    pub fn new(script: impl IntoIterator<Item = Result<Completion, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always answers with a schema-valid body for the prompt's fortune type
    pub fn valid() -> Self {
        Self::new([])
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::new([Err(error)])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl TextProvider for ScriptedProvider {
    async fn complete(&self, prompt: &Prompt) -> Result<Completion, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.clone());
        let next = self.script.lock().pop_front();
        let mut last = self.last.lock();
        if let Some(next) = next {
            *last = Some(next);
        }
        last.clone()
            .unwrap_or_else(|| Ok(valid_completion(prompt.fortune_type)))
    }
}

/// Sleeps before answering; optionally only for some fortune types
#[derive(Debug)]
pub struct SlowProvider {
    delay: Duration,
    only: Option<HashSet<FortuneType>>,
    calls: AtomicUsize,
}

impl SlowProvider {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            only: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn only_for(delay: Duration, types: impl IntoIterator<Item = FortuneType>) -> Self {
        Self {
            delay,
            only: Some(types.into_iter().collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextProvider for SlowProvider {
    async fn complete(&self, prompt: &Prompt) -> Result<Completion, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let slow = self
            .only
            .as_ref()
            .map_or(true, |types| types.contains(&prompt.fortune_type));
        if slow {
            tokio::time::sleep(self.delay).await;
        }
        Ok(valid_completion(prompt.fortune_type))
    }
}

/// Fallback that fails for selected fortune types
#[derive(Debug)]
pub struct SelectiveFailingFallback {
    failing: HashSet<FortuneType>,
    inner: RuleBasedFallback,
}

impl SelectiveFailingFallback {
    pub fn new(failing: impl IntoIterator<Item = FortuneType>) -> Self {
        Self {
            failing: failing.into_iter().collect(),
            inner: RuleBasedFallback::new(),
        }
    }
}

impl FallbackGenerator for SelectiveFailingFallback {
    fn generate(
        &self,
        request: &FortuneRequest,
        attempt: u32,
    ) -> Result<FortunePayload, GenerationError> {
        if self.failing.contains(&request.fortune_type) {
            return Err(GenerationError::FallbackFailed {
                fortune_type: request.fortune_type,
                reason: "injected failure".to_string(),
            });
        }
        self.inner.generate(request, attempt)
    }
}

/// Store that is always unreachable
#[derive(Debug, Default)]
pub struct UnavailableStore;

#[async_trait]
impl RecordStore for UnavailableStore {
    async fn get(&self, _key: &RecordKey) -> Result<Option<FortuneRecord>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn put_if_absent(&self, _record: FortuneRecord) -> Result<PutOutcome, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn put(&self, _record: FortuneRecord) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

/// Delays every read and write to widen race windows
#[derive(Debug)]
pub struct DelayedStore<S> {
    inner: S,
    delay: Duration,
}

impl<S> DelayedStore<S> {
    pub fn new(inner: S, delay: Duration) -> Self {
        Self { inner, delay }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: RecordStore> RecordStore for DelayedStore<S> {
    async fn get(&self, key: &RecordKey) -> Result<Option<FortuneRecord>, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.get(key).await
    }

    async fn put_if_absent(&self, record: FortuneRecord) -> Result<PutOutcome, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.put_if_absent(record).await
    }

    async fn put(&self, record: FortuneRecord) -> Result<(), StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.put(record).await
    }

    async fn compare_and_put(
        &self,
        expected_generation: u32,
        record: FortuneRecord,
    ) -> Result<PutOutcome, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.compare_and_put(expected_generation, record).await
    }
}

/// Commits immediately but holds back the first committed
/// `compare_and_put` acknowledgement for `delay`
#[derive(Debug)]
pub struct SlowAckStore<S> {
    inner: S,
    delay: Duration,
    armed: AtomicBool,
}

impl<S> SlowAckStore<S> {
    pub fn new(inner: S, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            armed: AtomicBool::new(true),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: RecordStore> RecordStore for SlowAckStore<S> {
    async fn get(&self, key: &RecordKey) -> Result<Option<FortuneRecord>, StoreError> {
        self.inner.get(key).await
    }

    async fn put_if_absent(&self, record: FortuneRecord) -> Result<PutOutcome, StoreError> {
        self.inner.put_if_absent(record).await
    }

    async fn put(&self, record: FortuneRecord) -> Result<(), StoreError> {
        self.inner.put(record).await
    }

    async fn compare_and_put(
        &self,
        expected_generation: u32,
        record: FortuneRecord,
    ) -> Result<PutOutcome, StoreError> {
        let outcome = self.inner.compare_and_put(expected_generation, record).await?;
        if outcome.is_committed() && self.armed.swap(false, Ordering::SeqCst) {
            tokio::time::sleep(self.delay).await;
        }
        Ok(outcome)
    }
}
