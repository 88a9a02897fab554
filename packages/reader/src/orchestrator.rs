//! Read orchestrator that assembles a subtree from the registry.
//!
//! The orchestrator walks the registered tree depth-first. List nodes are
//! listed and every instance hydrated; structural nodes only group their
//! children. Each finished child is frozen and merged into its parent's
//! builder through the child's customizer, post-order, so a parent is only
//! frozen once all of its children are complete.
//!
//! Sibling subtrees run one after another by default. With
//! `parallel_siblings` they run as separate tokio tasks, each with its own
//! builders; their results are merged in registry order once all of them
//! have finished.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::builder::{NodeBuilder, RecordBuilder};
use crate::config::{DuplicateKeyPolicy, FailurePolicy, MissingInstancePolicy, ReaderConfig};
use crate::context::ReadContext;
use crate::customizer::{ErasedList, ErasedStructural, ReaderKind, Reader};
use crate::error::{BackendError, ReaderError, Result};
use crate::path::SchemaPath;
use crate::registry::ReaderRegistry;
use crate::types::{Field, Record, Value};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Outcome of a read, including what was tolerated along the way.
#[derive(Debug, Clone)]
pub struct ReadReport {
    /// The assembled record.
    pub record: Record,
    /// Failures replaced by empty values in best-effort mode.
    pub failures: Vec<ReaderError>,
    /// Instances dropped because their key vanished mid-read.
    pub dropped: Vec<SchemaPath>,
}

#[derive(Debug, Default)]
struct Diagnostics {
    failures: Vec<ReaderError>,
    dropped: Vec<SchemaPath>,
}

impl Diagnostics {
    fn absorb(&mut self, other: Diagnostics) {
        self.failures.extend(other.failures);
        self.dropped.extend(other.dropped);
    }
}

/// Assembles records from a [`ReaderRegistry`].
///
/// Cheap to clone; clones share the registry and configuration.
#[derive(Debug, Clone)]
pub struct ReadOrchestrator {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    registry: Arc<ReaderRegistry>,
    config: ReaderConfig,
}

impl ReadOrchestrator {
    /// Create an orchestrator over a built registry.
    #[must_use]
    pub fn new(registry: Arc<ReaderRegistry>, config: ReaderConfig) -> Self {
        Self {
            inner: Arc::new(Inner { registry, config }),
        }
    }

    /// The registry this orchestrator reads from.
    pub fn registry(&self) -> &ReaderRegistry {
        &self.inner.registry
    }

    /// The active configuration.
    pub fn config(&self) -> &ReaderConfig {
        &self.inner.config
    }

    /// Read the subtree rooted at `path`.
    ///
    /// - structural path: the container with all its descendants
    /// - keyed list path: that single instance
    /// - keyless list path: the parent node holding only this list
    ///
    /// # Errors
    ///
    /// `UnregisteredPath` if nothing is registered at `path`; otherwise the
    /// first read failure in strict mode.
    pub async fn read_subtree(&self, path: &SchemaPath) -> Result<Record> {
        self.read_subtree_with_report(path)
            .await
            .map(|report| report.record)
    }

    /// Read the subtree rooted at `path`, returning the tolerated failures too.
    ///
    /// # Errors
    ///
    /// Same as [`read_subtree`](Self::read_subtree).
    #[tracing::instrument(skip(self, path), fields(path = %path))]
    pub async fn read_subtree_with_report(&self, path: &SchemaPath) -> Result<ReadReport> {
        let inner = &self.inner;
        let ctx = ReadContext::new(inner.config.call_timeout);
        let mut diag = Diagnostics::default();

        tracing::debug!(read_id = %ctx.read_id(), "starting subtree read");

        let record = match inner.reader(path)?.kind() {
            ReaderKind::Structural(structural) => {
                if path.key().is_some() {
                    return Err(ReaderError::InvalidPath {
                        path: path.to_string(),
                        reason: "structural nodes cannot be keyed".to_string(),
                    });
                }
                inner
                    .read_container(path, &**structural, &ctx, &mut diag)
                    .await?
            }
            ReaderKind::List(list) => match path.key() {
                Some(key) => {
                    inner
                        .read_instance(path, &**list, key, &ctx, &mut diag)
                        .await?
                }
                None => {
                    let instances = match inner
                        .read_instances(path, &**list, &ctx, &mut diag)
                        .await
                    {
                        Ok(instances) => instances,
                        Err(err) if !inner.strict() => {
                            tracing::warn!(path = %path, error = %err, "list read failed, substituting empty list");
                            diag.failures.push(err);
                            Vec::new()
                        }
                        Err(err) => return Err(err),
                    };
                    let mut carrier = match path.parent() {
                        Some(parent) => {
                            let mut builder = RecordBuilder::new(parent.name());
                            if let Some(key) = parent.key() {
                                builder.set_key(key.clone());
                            }
                            builder
                        }
                        None => RecordBuilder::new(path.name()),
                    };
                    list.merge(&mut carrier, instances);
                    carrier.build()
                }
            },
        };

        tracing::info!(
            read_id = %ctx.read_id(),
            failures = diag.failures.len(),
            dropped = diag.dropped.len(),
            "subtree read completed"
        );

        Ok(ReadReport {
            record,
            failures: diag.failures,
            dropped: diag.dropped,
        })
    }

    /// Read every instance of the list node at `path`.
    ///
    /// # Errors
    ///
    /// `UnregisteredPath`, `InvalidPath` if `path` is not a keyless list
    /// path, or the first read failure in strict mode.
    pub async fn read_list(&self, path: &SchemaPath) -> Result<Vec<Record>> {
        let inner = &self.inner;
        let ctx = ReadContext::new(inner.config.call_timeout);
        let mut diag = Diagnostics::default();

        match inner.reader(path)?.kind() {
            ReaderKind::List(list) if path.key().is_none() => {
                inner
                    .read_instances(path, &**list, &ctx, &mut diag)
                    .await
            }
            _ => Err(ReaderError::InvalidPath {
                path: path.to_string(),
                reason: "expected a keyless list path".to_string(),
            }),
        }
    }

    /// Read the subtree rooted at `path`, giving up when `token` fires.
    ///
    /// Cancelling abandons in-flight backend calls and discards every
    /// builder that was not frozen yet.
    ///
    /// # Errors
    ///
    /// `Cancelled` if the token fired first, otherwise as
    /// [`read_subtree`](Self::read_subtree).
    pub async fn read_subtree_cancellable(
        &self,
        path: &SchemaPath,
        token: CancellationToken,
    ) -> Result<Record> {
        tokio::select! {
            biased;

            _ = token.cancelled() => {
                tracing::warn!(path = %path, "subtree read cancelled");
                Err(ReaderError::Cancelled(path.clone()))
            }
            result = self.read_subtree(path) => result,
        }
    }
}

impl Inner {
    fn reader(&self, path: &SchemaPath) -> Result<&Reader> {
        self.registry
            .get(path)
            .ok_or_else(|| ReaderError::UnregisteredPath(path.schema()))
    }

    fn strict(&self) -> bool {
        self.config.failure_policy == FailurePolicy::Strict
    }

    /// Read one child node and return it in the shape its parent merges.
    fn read_branch<'a>(
        self: &'a Arc<Self>,
        path: &'a SchemaPath,
        ctx: &'a ReadContext,
        diag: &'a mut Diagnostics,
    ) -> BoxFuture<'a, Result<Field>> {
        Box::pin(async move {
            match self.reader(path)?.kind() {
                ReaderKind::Structural(structural) => {
                    let record = self
                        .read_container(path, &**structural, ctx, diag)
                        .await?;
                    Ok(Field::Container(record))
                }
                ReaderKind::List(list) => {
                    let records = self.read_instances(path, &**list, ctx, diag).await?;
                    Ok(Field::List(records))
                }
            }
        })
    }

    async fn read_container(
        self: &Arc<Self>,
        path: &SchemaPath,
        structural: &dyn ErasedStructural,
        ctx: &ReadContext,
        diag: &mut Diagnostics,
    ) -> Result<Record> {
        tracing::debug!(path = %path, "reading container");
        let mut builder = structural.new_builder(path);
        self.read_children(path, &mut *builder, ctx, diag).await?;
        Ok(builder.freeze())
    }

    async fn read_instances(
        self: &Arc<Self>,
        path: &SchemaPath,
        list: &dyn ErasedList,
        ctx: &ReadContext,
        diag: &mut Diagnostics,
    ) -> Result<Vec<Record>> {
        let keys = call(path, ctx, list.list_keys(path, ctx)).await?;
        let mut keys = self.dedupe_keys(path, keys)?;
        if self.config.sort_keys {
            keys.sort();
        }

        tracing::debug!(path = %path, keys = keys.len(), "reading list");

        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            let id = path.keyed(key.clone());
            let mut builder = match call(&id, ctx, list.read_instance(&id, &key, ctx)).await {
                Ok(builder) => builder,
                Err(ReaderError::NotFound { .. })
                    if self.config.missing_instance == MissingInstancePolicy::Skip =>
                {
                    tracing::warn!(path = %id, "instance vanished before it was read, skipping");
                    diag.dropped.push(id);
                    continue;
                }
                Err(err) if !self.strict() => {
                    tracing::warn!(path = %id, error = %err, "instance read failed, skipping");
                    diag.failures.push(err);
                    continue;
                }
                Err(err) => return Err(err),
            };
            self.read_children(&id, &mut *builder, ctx, diag).await?;
            records.push(builder.freeze());
        }

        Ok(records)
    }

    /// Read the single instance addressed by the keyed path `id`.
    async fn read_instance(
        self: &Arc<Self>,
        id: &SchemaPath,
        list: &dyn ErasedList,
        key: &Value,
        ctx: &ReadContext,
        diag: &mut Diagnostics,
    ) -> Result<Record> {
        let mut builder = call(id, ctx, list.read_instance(id, key, ctx)).await?;
        self.read_children(id, &mut *builder, ctx, diag).await?;
        Ok(builder.freeze())
    }

    /// Read all children of the node at `path` and merge them into `builder`.
    async fn read_children(
        self: &Arc<Self>,
        path: &SchemaPath,
        builder: &mut dyn NodeBuilder,
        ctx: &ReadContext,
        diag: &mut Diagnostics,
    ) -> Result<()> {
        let child_paths: Vec<SchemaPath> = self
            .registry
            .children_of(path)
            .iter()
            .map(|child| path.child(child.name()))
            .collect();

        if child_paths.is_empty() {
            return Ok(());
        }

        let results = if self.config.parallel_siblings && child_paths.len() > 1 {
            self.read_parallel(path, child_paths, ctx, diag).await?
        } else {
            let mut results = Vec::with_capacity(child_paths.len());
            for child in child_paths {
                let result = self.read_branch(&child, ctx, diag).await;
                match result {
                    Err(err) if self.strict() => return Err(err),
                    result => results.push((child, result)),
                }
            }
            results
        };

        for (child, result) in results {
            let reader = self.reader(&child)?;
            match result {
                Ok(branch) => reader.merge_into(builder, branch),
                Err(err) => {
                    tracing::warn!(path = %child, error = %err, "subtree read failed, substituting empty value");
                    if !reader.is_structural() {
                        reader.merge_into(builder, Field::List(Vec::new()));
                    }
                    diag.failures.push(err);
                }
            }
        }

        Ok(())
    }

    async fn read_parallel(
        self: &Arc<Self>,
        path: &SchemaPath,
        child_paths: Vec<SchemaPath>,
        ctx: &ReadContext,
        diag: &mut Diagnostics,
    ) -> Result<Vec<(SchemaPath, Result<Field>)>> {
        let mut set = JoinSet::new();
        for (index, child) in child_paths.iter().enumerate() {
            let inner = Arc::clone(self);
            let child = child.clone();
            let ctx = ctx.clone();
            set.spawn(async move {
                let mut child_diag = Diagnostics::default();
                let result = inner.read_branch(&child, &ctx, &mut child_diag).await;
                (index, result, child_diag)
            });
        }

        let mut slots: Vec<Option<Result<Field>>> = child_paths.iter().map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            let (index, result, child_diag) = match joined {
                Ok(done) => done,
                Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                Err(_) => return Err(ReaderError::Cancelled(path.clone())),
            };
            diag.absorb(child_diag);
            match result {
                // Dropping the set aborts the siblings still running.
                Err(err) if self.strict() => return Err(err),
                result => slots[index] = Some(result),
            }
        }

        Ok(child_paths
            .into_iter()
            .zip(slots)
            .filter_map(|(child, slot)| slot.map(|result| (child, result)))
            .collect())
    }

    fn dedupe_keys(&self, path: &SchemaPath, keys: Vec<Value>) -> Result<Vec<Value>> {
        let mut seen = HashSet::with_capacity(keys.len());
        let mut unique = Vec::with_capacity(keys.len());
        for key in keys {
            if seen.contains(&key) {
                match self.config.duplicate_keys {
                    DuplicateKeyPolicy::FirstWins => {
                        tracing::warn!(path = %path, key = %key, "duplicate key from list_keys, keeping first");
                        continue;
                    }
                    DuplicateKeyPolicy::Reject => {
                        return Err(ReaderError::DuplicateKey {
                            path: path.clone(),
                            key,
                        });
                    }
                }
            }
            seen.insert(key.clone());
            unique.push(key);
        }
        Ok(unique)
    }
}

/// Run one backend call under the per-call timeout.
async fn call<T>(
    path: &SchemaPath,
    ctx: &ReadContext,
    fut: impl Future<Output = std::result::Result<T, BackendError>>,
) -> Result<T> {
    match tokio::time::timeout(ctx.call_timeout(), fut).await {
        Ok(result) => result.map_err(|err| ReaderError::from_backend(path, err)),
        Err(_) => Err(ReaderError::BackendTimeout {
            path: path.clone(),
            timeout: ctx.call_timeout(),
        }),
    }
}
