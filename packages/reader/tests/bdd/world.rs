//! World struct for Cucumber BDD tests
//!
//! Holds the backend, the registrations and the outcome of the last read.

use std::sync::Arc;

use async_trait::async_trait;
use cucumber::World;
use statetree_reader::{
    BackendError, CrudService, Field, InMemoryCrudService, ListReaderCustomizer, NodeBuilder,
    ReadContext, ReadOrchestrator, ReadReport, Reader, ReaderConfig, ReaderError,
    ReaderRegistryBuilder, Record, RecordBuilder, SchemaPath, Value,
};

/// Test world that holds state across steps in a Cucumber scenario.
#[derive(Debug, World)]
#[world(init = Self::new)]
pub struct StateTreeWorld {
    /// Backend behind the element list
    pub service: Arc<InMemoryCrudService>,
    /// Registrations made so far
    pub registry: ReaderRegistryBuilder,
    /// Read configuration for the scenario
    pub config: ReaderConfig,
    /// Last registration error
    pub registration_error: Option<ReaderError>,
    /// Last read outcome (if successful)
    pub report: Option<ReadReport>,
    /// Last read error
    pub error: Option<ReaderError>,
}

impl Default for StateTreeWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl StateTreeWorld {
    pub fn new() -> Self {
        Self {
            service: Arc::new(InMemoryCrudService::new()),
            registry: ReaderRegistryBuilder::new(),
            config: ReaderConfig::default(),
            registration_error: None,
            report: None,
            error: None,
        }
    }

    /// Apply a registration, remembering its error.
    pub fn record_registration(&mut self, result: statetree_reader::Result<()>) {
        if let Err(err) = result {
            self.registration_error = Some(err);
        }
    }

    /// A list reader over the scenario backend.
    pub fn element_reader(&self) -> Reader {
        Reader::list(ElementList {
            service: Arc::clone(&self.service),
        })
    }

    /// Freeze the registrations and read the subtree at `path`.
    pub async fn read(&mut self, path: &SchemaPath) {
        let registry = std::mem::take(&mut self.registry);
        let result = match registry.build() {
            Ok(registry) => {
                let reader = ReadOrchestrator::new(Arc::new(registry), self.config.clone());
                reader.read_subtree_with_report(path).await
            }
            Err(err) => Err(err),
        };
        match result {
            Ok(report) => {
                self.report = Some(report);
                self.error = None;
            }
            Err(err) => {
                self.report = None;
                self.error = Some(err);
            }
        }
    }

    pub fn record(&self) -> &Record {
        match &self.report {
            Some(report) => &report.record,
            None => panic!("Expected a successful read, got error: {:?}", self.error),
        }
    }
}

/// Variant name of a reader error, as used in feature files.
pub fn error_kind(err: &ReaderError) -> &'static str {
    match err {
        ReaderError::DuplicatePath(_) => "DuplicatePath",
        ReaderError::UnknownAnchor { .. } => "UnknownAnchor",
        ReaderError::AnchorNotSibling { .. } => "AnchorNotSibling",
        ReaderError::OrderCycle { .. } => "OrderCycle",
        ReaderError::MissingParent { .. } => "MissingParent",
        ReaderError::InvalidPath { .. } => "InvalidPath",
        ReaderError::UnregisteredPath(_) => "UnregisteredPath",
        ReaderError::BackendUnavailable { .. } => "BackendUnavailable",
        ReaderError::BackendTimeout { .. } => "BackendTimeout",
        ReaderError::NotFound { .. } => "NotFound",
        ReaderError::MalformedRecord { .. } => "MalformedRecord",
        ReaderError::DuplicateKey { .. } => "DuplicateKey",
        ReaderError::Cancelled(_) => "Cancelled",
        ReaderError::Config(_) => "Config",
    }
}

/// Element list whose instances carry `id` and `description`.
struct ElementList {
    service: Arc<InMemoryCrudService>,
}

#[async_trait]
impl ListReaderCustomizer for ElementList {
    type Builder = RecordBuilder;

    async fn list_keys(
        &self,
        _id: &SchemaPath,
        _ctx: &ReadContext,
    ) -> Result<Vec<Value>, BackendError> {
        let records = self.service.read_all().await?;
        Ok(records.into_iter().map(|r| r.key).collect())
    }

    fn new_builder(&self, id: &SchemaPath) -> RecordBuilder {
        RecordBuilder::new(id.name())
    }

    async fn hydrate(
        &self,
        _id: &SchemaPath,
        key: &Value,
        builder: &mut RecordBuilder,
        _ctx: &ReadContext,
    ) -> Result<(), BackendError> {
        let record = self.service.read_one(key).await?;
        builder.set_key(record.key.clone());
        builder.set("id", record.key);
        for (name, value) in record.fields {
            builder.set(name, value);
        }
        Ok(())
    }

    fn merge(&self, parent: &mut dyn NodeBuilder, read_data: Vec<Record>) {
        parent.merge_field("element", Field::List(read_data));
    }
}
