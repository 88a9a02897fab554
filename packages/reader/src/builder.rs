//! Builder contracts.
//!
//! A builder accumulates the fields of one node instance during a single
//! read pass and is frozen into a [`Record`] exactly once. Customizers only
//! ever see a parent builder through the narrow [`NodeBuilder`] capability,
//! so no customizer needs to know the concrete builder type of its parent.

use crate::types::{Field, Record, Value};

/// Capability to receive merged child data.
pub trait Mergeable: Send {
    /// Set a field, overwriting any previous value under the same name.
    ///
    /// Implementations must be idempotent: merging the same value twice
    /// leaves the builder as if it was merged once.
    fn merge_field(&mut self, name: &str, value: Field);
}

/// A mutable per-node accumulator that can be frozen into a [`Record`].
pub trait NodeBuilder: Mergeable {
    /// Freeze the builder into an immutable record.
    fn freeze(self: Box<Self>) -> Record;
}

/// Generic builder storing fields in accumulation order.
///
/// Setting an existing field replaces its value but keeps its original
/// position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordBuilder {
    node: String,
    key: Option<Value>,
    fields: Vec<(String, Field)>,
}

impl RecordBuilder {
    /// Create an empty builder for a node.
    #[must_use]
    pub fn new(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            key: None,
            fields: Vec::new(),
        }
    }

    /// Set the identity key.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<Value>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Set the identity key in place.
    pub fn set_key(&mut self, key: impl Into<Value>) {
        self.key = Some(key.into());
    }

    /// Set a leaf field.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.set_field(name.into(), Field::Leaf(value.into()));
    }

    /// Set any field.
    pub fn set_field(&mut self, name: String, value: Field) {
        match self.fields.iter_mut().find(|(field, _)| *field == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Current value of a field.
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Freeze into a record without boxing.
    #[must_use]
    pub fn build(self) -> Record {
        Record::from_parts(self.node, self.key, self.fields)
    }
}

impl Mergeable for RecordBuilder {
    fn merge_field(&mut self, name: &str, value: Field) {
        self.set_field(name.to_string(), value);
    }
}

impl NodeBuilder for RecordBuilder {
    fn freeze(self: Box<Self>) -> Record {
        (*self).build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_set_overwrites_in_place() {
        let mut builder = RecordBuilder::new("element");
        builder.set("id", 1);
        builder.set("description", "a");
        builder.set("id", 2);

        let record = builder.build();
        assert_eq!(record.field_names(), vec!["id", "description"]);
        assert_eq!(record.leaf("id"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_merge_twice_is_idempotent() {
        let children = vec![RecordBuilder::new("element").with_key(1).build()];

        let mut once = RecordBuilder::new("state");
        once.merge_field("element", Field::List(children.clone()));

        let mut twice = RecordBuilder::new("state");
        twice.merge_field("element", Field::List(children.clone()));
        twice.merge_field("element", Field::List(children));

        assert_eq!(Box::new(once).freeze(), Box::new(twice).freeze());
    }

    #[test]
    fn test_freeze_keeps_key() {
        let builder: Box<dyn NodeBuilder> = Box::new(RecordBuilder::new("element").with_key("x"));
        let record = builder.freeze();
        assert_eq!(record.node(), "element");
        assert_eq!(record.key(), Some(&Value::from("x")));
        assert!(record.is_empty());
    }
}
