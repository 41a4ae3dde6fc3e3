//! In-memory stand-ins for the object store and parameter store.
//!
//! Both record every call so tests can assert which remote requests a
//! resolution made.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use crate::config::ParameterStore;
use crate::error::{ConfigError, StoreError};
use crate::s3::{DerivedObject, ObjectStore, StoredObject};

const TEST_LAST_MODIFIED: &str = "Wed, 21 Oct 2015 07:28:00 GMT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutRecord {
    pub bucket: String,
    pub key: String,
    pub object: DerivedObject,
}

#[derive(Default)]
struct StoreState {
    // (bucket, key) -> object
    objects: HashMap<(String, String), StoredObject>,
    gets: Vec<(String, String)>,
    puts: Vec<PutRecord>,
    fail_gets: bool,
    fail_puts: bool,
}

#[derive(Default)]
pub struct MemoryObjectStore {
    state: Mutex<StoreState>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object with a deterministic etag and last-modified
    pub fn insert(&self, bucket: &str, key: &str, body: Vec<u8>) {
        let etag = format!("\"{:08x}\"", body.len());
        self.insert_object(
            bucket,
            key,
            StoredObject {
                body,
                etag: Some(etag),
                last_modified: Some(TEST_LAST_MODIFIED.to_string()),
            },
        );
    }

    pub fn insert_object(&self, bucket: &str, key: &str, object: StoredObject) {
        self.lock()
            .objects
            .insert((bucket.to_string(), key.to_string()), object);
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.lock()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Make every get fail with a transient error
    pub fn fail_gets(&self) {
        self.lock().fail_gets = true;
    }

    /// Make every put fail with a transient error
    pub fn fail_puts(&self) {
        self.lock().fail_puts = true;
    }

    pub fn gets(&self) -> Vec<(String, String)> {
        self.lock().gets.clone()
    }

    pub fn puts(&self) -> Vec<PutRecord> {
        self.lock().puts.clone()
    }

    pub fn call_count(&self) -> usize {
        let state = self.lock();
        state.gets.len() + state.puts.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get(&self, bucket: &str, key: &str) -> Result<StoredObject, StoreError> {
        let mut state = self.lock();
        state.gets.push((bucket.to_string(), key.to_string()));

        if state.fail_gets {
            return Err(StoreError::Transient("simulated get failure".to_string()));
        }

        state
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    async fn put(&self, bucket: &str, key: &str, object: DerivedObject) -> Result<(), StoreError> {
        let mut state = self.lock();
        state.puts.push(PutRecord {
            bucket: bucket.to_string(),
            key: key.to_string(),
            object: object.clone(),
        });

        if state.fail_puts {
            return Err(StoreError::Transient("simulated put failure".to_string()));
        }

        let etag = format!("\"{:08x}\"", object.body.len());
        state.objects.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body: object.body,
                etag: Some(etag),
                last_modified: Some(TEST_LAST_MODIFIED.to_string()),
            },
        );
        Ok(())
    }
}

/// Parameter store holding a single fixed value (or nothing)
pub struct StaticParameterStore {
    value: Option<String>,
    requested: Mutex<Vec<String>>,
}

impl StaticParameterStore {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn missing() -> Self {
        Self {
            value: None,
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn requested_names(&self) -> Vec<String> {
        self.requested
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl ParameterStore for StaticParameterStore {
    async fn fetch_value(&self, name: &str) -> Result<String, ConfigError> {
        self.requested
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(name.to_string());

        self.value
            .clone()
            .ok_or_else(|| ConfigError::MissingValue(name.to_string()))
    }
}
