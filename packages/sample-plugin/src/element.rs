//! The `element` list of the sample plugin state.
//!
//! Each element is identified by its integer `id` and carries a free-form
//! description. Elements live in a [`CrudService`] and are read through
//! [`ElementStateCustomizer`], which hydrates a typed [`ElementBuilder`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use statetree_reader::{
    BackendError, CrudService, Field, ListReaderCustomizer, Mergeable, NodeBuilder, NodeRecord,
    ReadContext, Record, RecordBuilder, SchemaPath, Value,
};

use crate::error::{Result, SampleError};

/// Name of the element list node.
pub const ELEMENT_NODE: &str = "element";

/// One element of the sample plugin state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub id: i64,
    #[serde(default)]
    pub description: String,
}

impl Element {
    pub fn new(id: i64, description: impl Into<String>) -> Self {
        Self {
            id,
            description: description.into(),
        }
    }
}

impl From<&Element> for NodeRecord {
    fn from(element: &Element) -> Self {
        NodeRecord::new(element.id).with_field("description", element.description.as_str())
    }
}

impl TryFrom<&NodeRecord> for Element {
    type Error = SampleError;

    fn try_from(record: &NodeRecord) -> Result<Self> {
        let id = record
            .key
            .as_int()
            .ok_or_else(|| SampleError::InvalidElement(format!("non-integer id {}", record.key)))?;
        let description = match record.field("description") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => {
                return Err(SampleError::InvalidElement(format!(
                    "element {id}: description must be a string, got {other}"
                )))
            }
        };
        Ok(Self { id, description })
    }
}

/// Typed builder for one element instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementBuilder {
    id: Option<i64>,
    description: Option<String>,
}

impl ElementBuilder {
    pub fn id(&mut self, id: i64) -> &mut Self {
        self.id = Some(id);
        self
    }

    pub fn description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into());
        self
    }

    /// Fill every field from an element.
    pub fn from_element(&mut self, element: Element) -> &mut Self {
        self.id(element.id).description(element.description)
    }
}

impl Mergeable for ElementBuilder {
    fn merge_field(&mut self, name: &str, value: Field) {
        match (name, value) {
            ("id", Field::Leaf(Value::Int(id))) => {
                self.id = Some(id);
            }
            ("description", Field::Leaf(Value::String(description))) => {
                self.description = Some(description);
            }
            (name, value) => {
                tracing::warn!(field = name, ?value, "element has no such field, ignored");
            }
        }
    }
}

impl NodeBuilder for ElementBuilder {
    fn freeze(self: Box<Self>) -> Record {
        let mut record = RecordBuilder::new(ELEMENT_NODE);
        if let Some(id) = self.id {
            record.set_key(id);
            record.set("id", id);
        }
        if let Some(description) = self.description {
            record.set("description", description);
        }
        record.build()
    }
}

/// List customizer reading elements from a [`CrudService`].
#[derive(Clone)]
pub struct ElementStateCustomizer {
    service: Arc<dyn CrudService>,
}

impl ElementStateCustomizer {
    pub fn new(service: Arc<dyn CrudService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl ListReaderCustomizer for ElementStateCustomizer {
    type Builder = ElementBuilder;

    async fn list_keys(
        &self,
        id: &SchemaPath,
        _ctx: &ReadContext,
    ) -> std::result::Result<Vec<Value>, BackendError> {
        let records = self.service.read_all().await?;
        tracing::debug!(path = %id, count = records.len(), "listed elements");
        Ok(records.into_iter().map(|record| record.key).collect())
    }

    fn new_builder(&self, _id: &SchemaPath) -> ElementBuilder {
        ElementBuilder::default()
    }

    async fn hydrate(
        &self,
        id: &SchemaPath,
        key: &Value,
        builder: &mut ElementBuilder,
        _ctx: &ReadContext,
    ) -> std::result::Result<(), BackendError> {
        let record = self.service.read_one(key).await?;
        let element = Element::try_from(&record).map_err(|err| {
            tracing::warn!(path = %id, error = %err, "element record rejected");
            BackendError::Malformed(err.to_string())
        })?;
        builder.from_element(element);
        Ok(())
    }

    fn merge(&self, parent: &mut dyn NodeBuilder, read_data: Vec<Record>) {
        parent.merge_field(ELEMENT_NODE, Field::List(read_data));
    }
}
