//! Seed data for the in-memory element backend.

use std::collections::HashSet;
use std::path::Path;

use statetree_reader::{InMemoryCrudService, NodeRecord};

use crate::element::Element;
use crate::error::{Result, SampleError};

/// Parse a YAML list of elements.
///
/// # Errors
///
/// Fails on malformed YAML or when two elements share an id.
pub fn parse_elements(yaml: &str) -> Result<Vec<Element>> {
    let elements: Option<Vec<Element>> = serde_yaml_ng::from_str(yaml)?;
    let elements = elements.unwrap_or_default();

    let mut seen = HashSet::new();
    for element in &elements {
        if !seen.insert(element.id) {
            return Err(SampleError::InvalidElement(format!(
                "duplicate id {}",
                element.id
            )));
        }
    }
    Ok(elements)
}

/// Load a YAML list of elements from a file.
///
/// # Errors
///
/// Fails if the file cannot be read or parsed.
pub fn load_elements(path: &Path) -> Result<Vec<Element>> {
    let content = std::fs::read_to_string(path)?;
    let elements = parse_elements(&content)?;
    tracing::debug!(path = %path.display(), count = elements.len(), "loaded seed elements");
    Ok(elements)
}

/// Build an in-memory backend holding the elements in the given order.
pub fn seed_service(elements: &[Element]) -> InMemoryCrudService {
    InMemoryCrudService::with_records(elements.iter().map(NodeRecord::from))
}
