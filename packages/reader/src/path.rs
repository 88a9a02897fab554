//! Schema paths addressing nodes of the state tree.
//!
//! A path is an ordered list of node names from the root. Any segment may
//! carry a key when it addresses one instance of a list node.
//!
//! # Supported Formats
//!
//! - `/state` - root container
//! - `/state/element` - list node (registration path)
//! - `/state/element[1]` - one instance of the list
//! - `/state/element["a b"]/detail` - string keys are quoted
//!
//! # Examples
//!
//! ```
//! use statetree_reader::SchemaPath;
//!
//! let path: SchemaPath = "/state/element[1]".parse().unwrap();
//! assert_eq!(path.name(), "element");
//! assert_eq!(path.schema(), SchemaPath::root("state").child("element"));
//! assert_eq!(path.to_string(), "/state/element[1]");
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{ReaderError, Result};
use crate::types::Value;

/// One step of a schema path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Segment {
    name: String,
    key: Option<Value>,
}

impl Segment {
    /// Node name of this step.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Instance key, if this step addresses one list instance.
    pub fn key(&self) -> Option<&Value> {
        self.key.as_ref()
    }
}

/// Immutable identifier of a location in the tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaPath {
    segments: Vec<Segment>,
}

impl SchemaPath {
    /// Create a single-segment root path.
    #[must_use]
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            segments: vec![Segment {
                name: name.into(),
                key: None,
            }],
        }
    }

    /// Extend the path by one child node.
    #[must_use]
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment {
            name: name.into(),
            key: None,
        });
        Self { segments }
    }

    /// Attach a key to the last segment, replacing any existing key.
    #[must_use]
    pub fn keyed(&self, key: impl Into<Value>) -> Self {
        let mut segments = self.segments.clone();
        if let Some(last) = segments.last_mut() {
            last.key = Some(key.into());
        }
        Self { segments }
    }

    /// Path of the parent node, or `None` for a root path.
    pub fn parent(&self) -> Option<SchemaPath> {
        if self.segments.len() <= 1 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Name of the addressed node.
    pub fn name(&self) -> &str {
        self.segments
            .last()
            .map(|segment| segment.name.as_str())
            .unwrap_or_default()
    }

    /// Key of the addressed node, if it is a list instance.
    pub fn key(&self) -> Option<&Value> {
        self.segments.last().and_then(|segment| segment.key.as_ref())
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// The segments from root to node.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Whether any segment carries a key.
    pub fn is_keyed(&self) -> bool {
        self.segments.iter().any(|segment| segment.key.is_some())
    }

    /// The registration path: the same nodes with every key removed.
    #[must_use]
    pub fn schema(&self) -> SchemaPath {
        Self {
            segments: self
                .segments
                .iter()
                .map(|segment| Segment {
                    name: segment.name.clone(),
                    key: None,
                })
                .collect(),
        }
    }

    /// Whether `other` is a direct child of this path.
    pub fn is_parent_of(&self, other: &SchemaPath) -> bool {
        other.segments.len() == self.segments.len() + 1
            && other.segments.starts_with(&self.segments)
    }

    /// Parse a path from its text form.
    ///
    /// # Errors
    ///
    /// Returns `ReaderError::InvalidPath` if the text is not a valid path.
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = |reason: &str| ReaderError::InvalidPath {
            path: text.to_string(),
            reason: reason.to_string(),
        };

        let rest = text
            .strip_prefix('/')
            .ok_or_else(|| invalid("must start with '/'"))?;

        let mut segments = Vec::new();
        let mut chars = rest.chars().peekable();

        loop {
            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if c == '/' || c == '[' {
                    break;
                }
                if c == ']' || c == '"' {
                    return Err(invalid("unexpected character in node name"));
                }
                name.push(c);
                chars.next();
            }
            if name.is_empty() {
                return Err(invalid("empty node name"));
            }

            let mut key = None;
            if chars.peek() == Some(&'[') {
                chars.next();
                let mut raw = String::new();
                let mut in_string = false;
                let mut escaped = false;
                let mut closed = false;
                for c in chars.by_ref() {
                    if in_string {
                        raw.push(c);
                        if escaped {
                            escaped = false;
                        } else if c == '\\' {
                            escaped = true;
                        } else if c == '"' {
                            in_string = false;
                        }
                        continue;
                    }
                    match c {
                        ']' => {
                            closed = true;
                            break;
                        }
                        '"' => {
                            in_string = true;
                            raw.push(c);
                        }
                        _ => raw.push(c),
                    }
                }
                if !closed {
                    return Err(invalid("unbalanced '['"));
                }
                key = Some(parse_key(&raw).ok_or_else(|| invalid("invalid key"))?);
            }

            segments.push(Segment { name, key });

            match chars.next() {
                None => break,
                Some('/') => continue,
                Some(_) => return Err(invalid("expected '/' after key")),
            }
        }

        Ok(Self { segments })
    }
}

fn parse_key(raw: &str) -> Option<Value> {
    let raw = raw.trim();
    if let Some(inner) = raw.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
        let mut out = String::new();
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            if c != '\\' {
                out.push(c);
                continue;
            }
            // Inverse of the escapes `Value`'s Display writes.
            let escaped = match chars.next()? {
                'n' => '\n',
                't' => '\t',
                'r' => '\r',
                '0' => '\0',
                'u' => {
                    if chars.next()? != '{' {
                        return None;
                    }
                    let hex: String = chars.by_ref().take_while(|&h| h != '}').collect();
                    char::from_u32(u32::from_str_radix(&hex, 16).ok()?)?
                }
                other => other,
            };
            out.push(escaped);
        }
        return Some(Value::String(out));
    }
    match raw {
        "" => None,
        "null" => Some(Value::Null),
        "true" => Some(Value::Bool(true)),
        "false" => Some(Value::Bool(false)),
        _ => raw
            .parse::<i64>()
            .map(Value::Int)
            .ok()
            .or_else(|| raw.parse::<f64>().ok().map(Value::Float)),
    }
}

impl fmt::Display for SchemaPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "/{}", segment.name)?;
            if let Some(key) = &segment.key {
                write!(f, "[{key}]")?;
            }
        }
        Ok(())
    }
}

impl FromStr for SchemaPath {
    type Err = ReaderError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
