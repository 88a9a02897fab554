//! Core value types for the state tree.
//!
//! [`Value`] is a leaf value (also used as a list key), [`Field`] is what a
//! builder slot holds, [`Record`] is a frozen node and [`NodeRecord`] is the
//! raw handle a backend hands to customizers.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Leaf value of the state tree.
///
/// Values have a total order and a hash so they can serve as list keys:
/// floats compare with [`f64::total_cmp`] and hash by bit pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Null/absent value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value
    String(String),
}

impl Value {
    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get value as boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get value as i64
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get value as f64
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get value as string reference
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Rank of the variant, used to order values of different kinds.
    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) => 2,
            Value::Float(_) => 3,
            Value::String(_) => 4,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::String(s) => s.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::String(s) => write!(f, "{s:?}"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

/// Content of one named slot in a builder or record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Field {
    /// A plain leaf value.
    Leaf(Value),
    /// A nested container produced by a structural child.
    Container(Record),
    /// The instances of a list child.
    List(Vec<Record>),
}

impl From<Value> for Field {
    fn from(value: Value) -> Self {
        Field::Leaf(value)
    }
}

/// Frozen, immutable node of the assembled tree.
///
/// Fields keep the order in which they were first accumulated.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    node: String,
    key: Option<Value>,
    fields: Vec<(String, Field)>,
}

impl Record {
    pub(crate) fn from_parts(
        node: String,
        key: Option<Value>,
        fields: Vec<(String, Field)>,
    ) -> Self {
        Self { node, key, fields }
    }

    /// Schema node name this record was built for.
    pub fn node(&self) -> &str {
        &self.node
    }

    /// Identity key, for list instances.
    pub fn key(&self) -> Option<&Value> {
        self.key.as_ref()
    }

    /// Look up a field by name.
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Look up a leaf field.
    pub fn leaf(&self, name: &str) -> Option<&Value> {
        match self.get(name)? {
            Field::Leaf(value) => Some(value),
            _ => None,
        }
    }

    /// Look up a nested container.
    pub fn container(&self, name: &str) -> Option<&Record> {
        match self.get(name)? {
            Field::Container(record) => Some(record),
            _ => None,
        }
    }

    /// Look up a list field.
    pub fn list(&self, name: &str) -> Option<&[Record]> {
        match self.get(name)? {
            Field::List(records) => Some(records),
            _ => None,
        }
    }

    /// Field names in accumulation order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Iterate over all fields in accumulation order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(name, field)| (name.as_str(), field))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record carries no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, field) in &self.fields {
            map.serialize_entry(name, field)?;
        }
        map.end()
    }
}

/// Raw entity handle produced by a backend.
///
/// Identity is the key: equality and ordering ignore the fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Identity key.
    pub key: Value,
    /// The entity's own fields.
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
}

impl NodeRecord {
    /// Create a record handle with no fields.
    #[must_use]
    pub fn new(key: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Add a field.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Get a field value.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

impl PartialEq for NodeRecord {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for NodeRecord {}

impl PartialOrd for NodeRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NodeRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}
