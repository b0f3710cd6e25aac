/*!
 * Test Helpers and Utilities
 *
 * In-memory storage and progress fakes for exercising reconciliation without
 * touching a filesystem or a bucket. Tests can seed objects, inject failures
 * and inspect every call that was made.
 */

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::models::{ImageRef, LocalFile};
use crate::notification::{Outcome, ProgressSink};
use crate::storage::{join_public_url, StorageGateway};

pub const TEST_PUBLIC_BASE_URL: &str = "https://storage.test/public";
pub const TEST_BUCKET: &str = "problem-images";

/// A storage call as observed by [`InMemoryStorageGateway`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageCall {
    Upload(String),
    Move(String, String),
    Remove(String),
    PublicUrl(String),
}

/// Call that should fail when it is made
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectedFailure {
    Upload(String),
    MoveFrom(String),
    Remove(String),
    PublicUrl(String),
}

#[derive(Default)]
struct State {
    objects: BTreeMap<String, Vec<u8>>,
    calls: Vec<StorageCall>,
    failures: Vec<InjectedFailure>,
}

/// Object store kept in a map. Moves onto an existing name fail, as they do
/// on real object stores, so rename collisions surface as errors.
pub struct InMemoryStorageGateway {
    bucket: String,
    state: Mutex<State>,
}

impl Default for InMemoryStorageGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStorageGateway {
    pub fn new() -> Self {
        Self {
            bucket: TEST_BUCKET.to_string(),
            state: Mutex::new(State::default()),
        }
    }

    /// Gateway pre-populated with one object per name
    pub fn with_objects<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let gateway = Self::new();
        for name in names {
            let name = name.into();
            let data = name.as_bytes().to_vec();
            gateway.insert(name, data);
        }
        gateway
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn insert(&self, name: impl Into<String>, data: Vec<u8>) {
        self.lock().objects.insert(name.into(), data);
    }

    pub fn fail_on(&self, failure: InjectedFailure) {
        self.lock().failures.push(failure);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().objects.contains_key(name)
    }

    pub fn read(&self, name: &str) -> Option<Vec<u8>> {
        self.lock().objects.get(name).cloned()
    }

    /// Object names, sorted
    pub fn object_names(&self) -> Vec<String> {
        self.lock().objects.keys().cloned().collect()
    }

    pub fn calls(&self) -> Vec<StorageCall> {
        self.lock().calls.clone()
    }

    /// Calls excluding URL lookups, which never mutate anything
    pub fn mutating_calls(&self) -> Vec<StorageCall> {
        self.calls()
            .into_iter()
            .filter(|call| !matches!(call, StorageCall::PublicUrl(_)))
            .collect()
    }

    pub fn url_for(&self, name: &str) -> String {
        join_public_url(TEST_PUBLIC_BASE_URL, &self.bucket, name)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A panicking test must not poison the others sharing this gateway
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_failure(state: &State, failure: InjectedFailure) -> Result<()> {
        if state.failures.contains(&failure) {
            return Err(anyhow!("injected failure: {:?}", failure));
        }
        Ok(())
    }
}

#[async_trait]
impl StorageGateway for InMemoryStorageGateway {
    async fn upload(&self, file: &LocalFile, name: &str) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(StorageCall::Upload(name.to_string()));
        Self::check_failure(&state, InjectedFailure::Upload(name.to_string()))?;
        state.objects.insert(name.to_string(), file.data.to_vec());
        Ok(())
    }

    async fn move_object(&self, from: &str, to: &str) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(StorageCall::Move(from.to_string(), to.to_string()));
        Self::check_failure(&state, InjectedFailure::MoveFrom(from.to_string()))?;

        if state.objects.contains_key(to) {
            return Err(anyhow!("The resource already exists: {}", to));
        }
        let data = state
            .objects
            .remove(from)
            .ok_or_else(|| anyhow!("Object not found: {}", from))?;
        state.objects.insert(to.to_string(), data);
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<()> {
        let mut state = self.lock();
        state.calls.push(StorageCall::Remove(name.to_string()));
        Self::check_failure(&state, InjectedFailure::Remove(name.to_string()))?;
        state.objects.remove(name);
        Ok(())
    }

    async fn public_url(&self, name: &str) -> Result<String> {
        let mut state = self.lock();
        state.calls.push(StorageCall::PublicUrl(name.to_string()));
        Self::check_failure(&state, InjectedFailure::PublicUrl(name.to_string()))?;
        Ok(join_public_url(TEST_PUBLIC_BASE_URL, &self.bucket, name))
    }

    fn storage_type(&self) -> &'static str {
        "memory"
    }

    async fn initialize(&self) -> Result<()> {
        Ok(())
    }
}

/// Progress sink that keeps everything it is told
#[derive(Default)]
pub struct RecordingProgressSink {
    messages: Mutex<Vec<String>>,
    outcome: Mutex<Option<Outcome>>,
}

impl RecordingProgressSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl ProgressSink for RecordingProgressSink {
    fn progress(&self, message: &str) {
        self.messages
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(message.to_string());
    }

    fn finish(&self, outcome: Outcome) {
        *self.outcome.lock().unwrap_or_else(|p| p.into_inner()) = Some(outcome);
    }
}

/// Persisted image whose id and name are `name`, served from the test base URL
pub fn persisted_image(gateway: &InMemoryStorageGateway, name: &str) -> ImageRef {
    ImageRef::persisted(name, name, gateway.url_for(name))
}

/// New image attached from a file called `file_name`
pub fn new_image(id: &str, file_name: &str, data: &[u8]) -> ImageRef {
    let file = LocalFile::new(file_name, data.to_vec());
    ImageRef::local(id, format!("data:image/png;base64,{}", id), file)
}
