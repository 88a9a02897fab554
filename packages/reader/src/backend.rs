//! Backend contract consumed by list customizers.
//!
//! The reader never talks to storage itself. Customizers are constructed
//! with a [`CrudService`] and translate its records into builder fields.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::BackendError;
use crate::types::{NodeRecord, Value};

/// Read contract of a data backend.
#[async_trait]
pub trait CrudService: Send + Sync {
    /// Read every record currently present, in backend order.
    async fn read_all(&self) -> Result<Vec<NodeRecord>, BackendError>;

    /// Read one record by key.
    ///
    /// Fails with `BackendError::NotFound` if the key does not exist.
    async fn read_one(&self, key: &Value) -> Result<NodeRecord, BackendError>;
}

/// Thread-safe in-memory backend.
///
/// Keeps records in insertion order. Outages, latency and vanishing keys
/// can be switched on to exercise failure handling.
#[derive(Debug, Default)]
pub struct InMemoryCrudService {
    records: RwLock<Vec<NodeRecord>>,
    unavailable: AtomicBool,
    latency: RwLock<Option<Duration>>,
    vanished: RwLock<HashSet<Value>>,
}

impl InMemoryCrudService {
    /// Create an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend holding the given records.
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = NodeRecord>) -> Self {
        let service = Self::new();
        for record in records {
            service.insert(record);
        }
        service
    }

    /// Insert or replace a record, keeping the position of a replaced one.
    pub fn insert(&self, record: NodeRecord) {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        match records.iter_mut().find(|existing| existing.key == record.key) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }

    /// Remove a record, returning it if present.
    pub fn remove(&self, key: &Value) -> Option<NodeRecord> {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let position = records.iter().position(|record| &record.key == key)?;
        Some(records.remove(position))
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the backend stores no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make every call fail with `BackendError::Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Delay every call by the given duration.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.write().unwrap_or_else(PoisonError::into_inner) = latency;
    }

    /// Keep listing `key` in `read_all` but fail `read_one` for it, as if a
    /// concurrent writer deleted it between the two calls.
    pub fn vanish_on_read_one(&self, key: impl Into<Value>) {
        self.vanished
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into());
    }

    async fn simulate(&self) -> Result<(), BackendError> {
        let latency = *self.latency.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(delay) = latency {
            tokio::time::sleep(delay).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable(
                "in-memory backend switched off".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl CrudService for InMemoryCrudService {
    async fn read_all(&self) -> Result<Vec<NodeRecord>, BackendError> {
        self.simulate().await?;
        Ok(self
            .records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn read_one(&self, key: &Value) -> Result<NodeRecord, BackendError> {
        self.simulate().await?;
        if self
            .vanished
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
        {
            return Err(BackendError::NotFound(key.clone()));
        }
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|record| &record.key == key)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(key.clone()))
    }
}
