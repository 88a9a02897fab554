//! Error types for the state tree reader.
//!
//! Registration-time errors (`DuplicatePath`, `UnknownAnchor`,
//! `AnchorNotSibling`, `OrderCycle`, `MissingParent`) are fatal to startup.
//! Read-time errors carry the path of the node that failed.

use std::time::Duration;

use thiserror::Error;

use crate::path::SchemaPath;
use crate::types::Value;

/// Error returned by a backend behind a customizer.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BackendError {
    /// The data source cannot answer.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The requested key does not exist (anymore).
    #[error("no record with key {0}")]
    NotFound(Value),

    /// The record exists but cannot be decoded into the node's shape.
    #[error("malformed record: {0}")]
    Malformed(String),
}

/// Main error type for registry and read operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ReaderError {
    /// A reader is already registered at this path.
    #[error("a reader is already registered at {0}")]
    DuplicatePath(SchemaPath),

    /// An ordering constraint references a path that was never registered.
    #[error("cannot order {path} relative to unregistered anchor {anchor}")]
    UnknownAnchor { path: SchemaPath, anchor: SchemaPath },

    /// An ordering constraint references a path under a different parent.
    #[error("cannot order {path} relative to {anchor}: not siblings")]
    AnchorNotSibling { path: SchemaPath, anchor: SchemaPath },

    /// Ordering constraints between siblings form a cycle.
    #[error("ordering constraints under {parent} form a cycle through {}", format_paths(.members))]
    OrderCycle {
        parent: SchemaPath,
        members: Vec<SchemaPath>,
    },

    /// A registered path has no registered parent.
    #[error("reader at {path} has no registered parent {parent}")]
    MissingParent { path: SchemaPath, parent: SchemaPath },

    /// A path could not be parsed or is not valid where it was used.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// No reader is registered at the requested path.
    #[error("no reader registered at {0}")]
    UnregisteredPath(SchemaPath),

    /// The backend behind a customizer could not answer.
    #[error("backend unavailable while reading {path}: {reason}")]
    BackendUnavailable { path: SchemaPath, reason: String },

    /// A backend call exceeded the configured per-call timeout.
    #[error("backend call for {path} timed out after {timeout:?}")]
    BackendTimeout { path: SchemaPath, timeout: Duration },

    /// A key vanished between listing and hydration.
    #[error("{path}: no record with key {key}")]
    NotFound { path: SchemaPath, key: Value },

    /// A backend record could not be decoded.
    #[error("malformed record at {path}: {reason}")]
    MalformedRecord { path: SchemaPath, reason: String },

    /// `list_keys` returned the same key twice.
    #[error("{path}: duplicate key {key} returned by list_keys")]
    DuplicateKey { path: SchemaPath, key: Value },

    /// The read was cancelled by the caller.
    #[error("read of {0} was cancelled")]
    Cancelled(SchemaPath),

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ReaderError {
    /// Tag a backend failure with the path of the node being read.
    pub fn from_backend(path: &SchemaPath, err: BackendError) -> Self {
        match err {
            BackendError::Unavailable(reason) => ReaderError::BackendUnavailable {
                path: path.clone(),
                reason,
            },
            BackendError::NotFound(key) => ReaderError::NotFound {
                path: path.clone(),
                key,
            },
            BackendError::Malformed(reason) => ReaderError::MalformedRecord {
                path: path.clone(),
                reason,
            },
        }
    }

    /// Whether this error can only occur while registering readers.
    #[must_use]
    pub fn is_registration_error(&self) -> bool {
        matches!(
            self,
            ReaderError::DuplicatePath(_)
                | ReaderError::UnknownAnchor { .. }
                | ReaderError::AnchorNotSibling { .. }
                | ReaderError::OrderCycle { .. }
                | ReaderError::MissingParent { .. }
        )
    }

    /// The path the error is tagged with, if any.
    pub fn path(&self) -> Option<&SchemaPath> {
        match self {
            ReaderError::DuplicatePath(path)
            | ReaderError::UnregisteredPath(path)
            | ReaderError::Cancelled(path)
            | ReaderError::UnknownAnchor { path, .. }
            | ReaderError::AnchorNotSibling { path, .. }
            | ReaderError::MissingParent { path, .. }
            | ReaderError::BackendUnavailable { path, .. }
            | ReaderError::BackendTimeout { path, .. }
            | ReaderError::NotFound { path, .. }
            | ReaderError::MalformedRecord { path, .. }
            | ReaderError::DuplicateKey { path, .. } => Some(path),
            ReaderError::OrderCycle { parent, .. } => Some(parent),
            ReaderError::InvalidPath { .. } | ReaderError::Config(_) => None,
        }
    }
}

fn format_paths(paths: &[SchemaPath]) -> String {
    paths
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias for reader operations.
pub type Result<T> = std::result::Result<T, ReaderError>;
