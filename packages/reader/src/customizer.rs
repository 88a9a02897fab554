//! Node customizer traits.
//!
//! A customizer is the pluggable read handler for one schema node. List
//! customizers own a collection of keyed instances; structural customizers
//! own no data and only group their children.
//!
//! Each customizer is parameterized over its own builder type. The registry
//! stores customizers behind [`Reader`], which creates and hydrates that
//! builder itself and hands it back as a `Box<dyn NodeBuilder>`, so the
//! orchestrator never needs to know concrete builder types.

use async_trait::async_trait;

use crate::builder::{NodeBuilder, RecordBuilder};
use crate::context::ReadContext;
use crate::error::BackendError;
use crate::path::SchemaPath;
use crate::types::{Field, Record, Value};

/// Read handler for a list node.
#[async_trait]
pub trait ListReaderCustomizer: Send + Sync + 'static {
    /// Builder type for one instance of this list.
    type Builder: NodeBuilder + 'static;

    /// Return every key currently present for the list at `id`.
    ///
    /// `id` carries the keys of all ancestor instances.
    async fn list_keys(
        &self,
        id: &SchemaPath,
        ctx: &ReadContext,
    ) -> Result<Vec<Value>, BackendError>;

    /// Return a fresh, empty builder for the instance at `id`.
    fn new_builder(&self, id: &SchemaPath) -> Self::Builder;

    /// Fill `builder` with the fields of the instance identified by `key`.
    ///
    /// Fails with `BackendError::NotFound` if the key vanished since
    /// [`list_keys`](Self::list_keys) returned it.
    async fn hydrate(
        &self,
        id: &SchemaPath,
        key: &Value,
        builder: &mut Self::Builder,
        ctx: &ReadContext,
    ) -> Result<(), BackendError>;

    /// Attach the finished instances to the parent's builder.
    fn merge(&self, parent: &mut dyn NodeBuilder, read_data: Vec<Record>);
}

/// Read handler for a node that owns no data.
pub trait StructuralReaderCustomizer: Send + Sync + 'static {
    /// Builder type of the container.
    type Builder: NodeBuilder + 'static;

    /// Return a fresh, empty builder for the container at `id`.
    fn new_builder(&self, id: &SchemaPath) -> Self::Builder;

    /// Attach the finished container to the parent's builder.
    fn merge(&self, parent: &mut dyn NodeBuilder, read_value: Record);
}

/// Stock structural customizer.
///
/// Builds a [`RecordBuilder`] named after the node and merges it into the
/// parent as a container field of the same name.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainerCustomizer;

impl StructuralReaderCustomizer for ContainerCustomizer {
    type Builder = RecordBuilder;

    fn new_builder(&self, id: &SchemaPath) -> RecordBuilder {
        RecordBuilder::new(id.name())
    }

    fn merge(&self, parent: &mut dyn NodeBuilder, read_value: Record) {
        let name = read_value.node().to_string();
        parent.merge_field(&name, Field::Container(read_value));
    }
}

#[async_trait]
pub(crate) trait ErasedList: Send + Sync {
    async fn list_keys(
        &self,
        id: &SchemaPath,
        ctx: &ReadContext,
    ) -> Result<Vec<Value>, BackendError>;

    async fn read_instance(
        &self,
        id: &SchemaPath,
        key: &Value,
        ctx: &ReadContext,
    ) -> Result<Box<dyn NodeBuilder>, BackendError>;

    fn merge(&self, parent: &mut dyn NodeBuilder, read_data: Vec<Record>);
}

struct ListAdapter<C>(C);

#[async_trait]
impl<C: ListReaderCustomizer> ErasedList for ListAdapter<C> {
    async fn list_keys(
        &self,
        id: &SchemaPath,
        ctx: &ReadContext,
    ) -> Result<Vec<Value>, BackendError> {
        self.0.list_keys(id, ctx).await
    }

    async fn read_instance(
        &self,
        id: &SchemaPath,
        key: &Value,
        ctx: &ReadContext,
    ) -> Result<Box<dyn NodeBuilder>, BackendError> {
        let mut builder = self.0.new_builder(id);
        self.0.hydrate(id, key, &mut builder, ctx).await?;
        Ok(Box::new(builder))
    }

    fn merge(&self, parent: &mut dyn NodeBuilder, read_data: Vec<Record>) {
        self.0.merge(parent, read_data);
    }
}

pub(crate) trait ErasedStructural: Send + Sync {
    fn new_builder(&self, id: &SchemaPath) -> Box<dyn NodeBuilder>;

    fn merge(&self, parent: &mut dyn NodeBuilder, read_value: Record);
}

struct StructuralAdapter<C>(C);

impl<C: StructuralReaderCustomizer> ErasedStructural for StructuralAdapter<C> {
    fn new_builder(&self, id: &SchemaPath) -> Box<dyn NodeBuilder> {
        Box::new(self.0.new_builder(id))
    }

    fn merge(&self, parent: &mut dyn NodeBuilder, read_value: Record) {
        self.0.merge(parent, read_value);
    }
}

pub(crate) enum ReaderKind {
    Structural(Box<dyn ErasedStructural>),
    List(Box<dyn ErasedList>),
}

/// A registered customizer, erased over its builder type.
pub struct Reader {
    kind: ReaderKind,
}

impl Reader {
    /// Wrap a structural customizer.
    #[must_use]
    pub fn structural(customizer: impl StructuralReaderCustomizer) -> Self {
        Self {
            kind: ReaderKind::Structural(Box::new(StructuralAdapter(customizer))),
        }
    }

    /// A structural reader using [`ContainerCustomizer`].
    #[must_use]
    pub fn container() -> Self {
        Self::structural(ContainerCustomizer)
    }

    /// Wrap a list customizer.
    #[must_use]
    pub fn list(customizer: impl ListReaderCustomizer) -> Self {
        Self {
            kind: ReaderKind::List(Box::new(ListAdapter(customizer))),
        }
    }

    /// Whether this reader owns no data.
    pub fn is_structural(&self) -> bool {
        matches!(self.kind, ReaderKind::Structural(_))
    }

    pub(crate) fn kind(&self) -> &ReaderKind {
        &self.kind
    }

    /// Merge a finished branch into the parent's builder.
    pub(crate) fn merge_into(&self, parent: &mut dyn NodeBuilder, branch: Field) {
        match (&self.kind, branch) {
            (ReaderKind::Structural(structural), Field::Container(record)) => {
                structural.merge(parent, record);
            }
            (ReaderKind::List(list), Field::List(records)) => list.merge(parent, records),
            (_, branch) => {
                tracing::warn!(?branch, "branch does not match reader kind, not merged");
            }
        }
    }
}

impl std::fmt::Debug for Reader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = if self.is_structural() { "structural" } else { "list" };
        f.debug_struct("Reader").field("kind", &kind).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NodeRecord;
    use std::time::Duration;

    struct FixedList {
        records: Vec<NodeRecord>,
    }

    #[async_trait]
    impl ListReaderCustomizer for FixedList {
        type Builder = RecordBuilder;

        async fn list_keys(
            &self,
            _id: &SchemaPath,
            _ctx: &ReadContext,
        ) -> Result<Vec<Value>, BackendError> {
            Ok(self.records.iter().map(|r| r.key.clone()).collect())
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
            let record = self
                .records
                .iter()
                .find(|r| &r.key == key)
                .ok_or_else(|| BackendError::NotFound(key.clone()))?;
            builder.set_key(key.clone());
            for (name, value) in &record.fields {
                builder.set(name.clone(), value.clone());
            }
            Ok(())
        }

        fn merge(&self, parent: &mut dyn NodeBuilder, read_data: Vec<Record>) {
            parent.merge_field("items", Field::List(read_data));
        }
    }

    #[tokio::test]
    async fn test_list_adapter_hydrates_own_builder() {
        let reader = Reader::list(FixedList {
            records: vec![NodeRecord::new(1).with_field("name", "one")],
        });
        let ReaderKind::List(list) = reader.kind() else {
            panic!("expected list reader");
        };

        let ctx = ReadContext::new(Duration::from_secs(1));
        let id = SchemaPath::root("items").keyed(1);
        let record = list
            .read_instance(&id, &Value::Int(1), &ctx)
            .await
            .unwrap()
            .freeze();

        assert_eq!(record.key(), Some(&Value::Int(1)));
        assert_eq!(record.leaf("name"), Some(&Value::from("one")));

        let Err(err) = list.read_instance(&id, &Value::Int(9), &ctx).await else {
            panic!("expected a missing instance");
        };
        assert_eq!(err, BackendError::NotFound(Value::Int(9)));
    }

    #[test]
    fn test_container_customizer_merges_by_node_name() {
        let reader = Reader::container();
        assert!(reader.is_structural());
        let ReaderKind::Structural(structural) = reader.kind() else {
            panic!("expected structural reader");
        };

        let child = structural
            .new_builder(&SchemaPath::root("state").child("settings"))
            .freeze();
        let mut parent = RecordBuilder::new("state");
        structural.merge(&mut parent, child.clone());

        assert_eq!(parent.build().container("settings"), Some(&child));
    }
}
