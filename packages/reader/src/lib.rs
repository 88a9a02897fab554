//! Statetree Reader
//!
//! Hierarchical read composition for a state tree whose nodes are served by
//! independently registered read handlers ("customizers").
//! This library provides functionality for:
//! - Registering list and structural customizers at schema paths, with
//!   sibling ordering constraints checked at registration time
//! - Assembling the subtree under any path by listing, hydrating and
//!   merging nodes depth-first
//! - Strict or best-effort failure handling, per-call timeouts and
//!   cancellation
//!
//! # Example
//!
//! ```ignore
//! use statetree_reader::{ReadOrchestrator, ReaderConfig, ReaderRegistryBuilder, SchemaPath};
//! use std::sync::Arc;
//!
//! let root = SchemaPath::root("sample-plugin-state");
//! let mut builder = ReaderRegistryBuilder::new();
//! builder.add_structural(root.clone())?;
//! builder.add_list(root.child("element"), ElementStateCustomizer::new(service))?;
//!
//! let reader = ReadOrchestrator::new(Arc::new(builder.build()?), ReaderConfig::default());
//! let state = reader.read_subtree(&root).await?;
//! ```

pub mod backend;
pub mod builder;
pub mod config;
pub mod context;
pub mod customizer;
pub mod error;
pub mod orchestrator;
pub mod path;
pub mod registry;
pub mod types;

// Re-export commonly used items
pub use backend::{CrudService, InMemoryCrudService};
pub use builder::{Mergeable, NodeBuilder, RecordBuilder};
pub use config::{
    DuplicateKeyPolicy, FailurePolicy, MissingInstancePolicy, ReaderConfig, DEFAULT_CALL_TIMEOUT,
};
pub use context::ReadContext;
pub use customizer::{
    ContainerCustomizer, ListReaderCustomizer, Reader, StructuralReaderCustomizer,
};
pub use error::{BackendError, ReaderError, Result};
pub use orchestrator::{ReadOrchestrator, ReadReport};
pub use path::{SchemaPath, Segment};
pub use registry::{Placement, ReaderFactory, ReaderRegistry, ReaderRegistryBuilder};
pub use types::{Field, NodeRecord, Record, Value};

// Token type accepted by `ReadOrchestrator::read_subtree_cancellable`.
pub use tokio_util::sync::CancellationToken;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
