//! Statetree Sample Plugin
//!
//! A sample integration of the statetree reader: one `element` list under
//! the `sample-plugin-state` container, backed by an in-memory CRUD service.
//! This library provides:
//! - The `Element` model and its typed builder
//! - The element list customizer and the plugin's reader factory
//! - YAML seed loading and the `statetree-sample` CLI
//!
//! # Example
//!
//! ```ignore
//! use statetree_sample_plugin::{root_path, ModuleStateReaderFactory};
//! use statetree_reader::{InMemoryCrudService, ReadOrchestrator, ReaderConfig, ReaderRegistryBuilder};
//! use std::sync::Arc;
//!
//! let mut builder = ReaderRegistryBuilder::new();
//! builder.add_factory(&ModuleStateReaderFactory::new(Arc::new(InMemoryCrudService::new())))?;
//! let reader = ReadOrchestrator::new(Arc::new(builder.build()?), ReaderConfig::default());
//! let state = reader.read_subtree(&root_path()).await?;
//! ```

pub mod cli;
pub mod data;
pub mod element;
pub mod error;
pub mod factory;

// Re-export commonly used items
pub use data::{load_elements, parse_elements, seed_service};
pub use element::{Element, ElementBuilder, ElementStateCustomizer, ELEMENT_NODE};
pub use error::{Result, SampleError};
pub use factory::{element_path, root_path, ModuleStateReaderFactory, ROOT_NODE};

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use statetree_reader::{ReadOrchestrator, ReaderConfig, ReaderRegistryBuilder, Value};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_concrete_element_scenario() {
        let service = Arc::new(seed_service(&[Element::new(1, "a"), Element::new(2, "b")]));
        let mut builder = ReaderRegistryBuilder::new();
        builder
            .add_factory(&ModuleStateReaderFactory::new(service))
            .unwrap();
        let reader = ReadOrchestrator::new(Arc::new(builder.build().unwrap()), ReaderConfig::default());

        let state = reader.read_subtree(&root_path()).await.unwrap();
        assert_eq!(state.node(), ROOT_NODE);

        let elements = state.list(ELEMENT_NODE).unwrap();
        let got: Vec<(Option<&Value>, Option<&Value>)> = elements
            .iter()
            .map(|e| (e.leaf("id"), e.leaf("description")))
            .collect();
        assert_eq!(
            got,
            vec![
                (Some(&Value::Int(1)), Some(&Value::from("a"))),
                (Some(&Value::Int(2)), Some(&Value::from("b"))),
            ]
        );
    }

    #[tokio::test]
    async fn test_race_drops_vanished_element() {
        let service = Arc::new(seed_service(&[Element::new(1, "a"), Element::new(2, "b")]));
        service.vanish_on_read_one(2);
        let mut builder = ReaderRegistryBuilder::new();
        builder
            .add_factory(&ModuleStateReaderFactory::new(service))
            .unwrap();
        let reader = ReadOrchestrator::new(Arc::new(builder.build().unwrap()), ReaderConfig::default());

        let state = reader.read_subtree(&root_path()).await.unwrap();
        let elements = state.list(ELEMENT_NODE).unwrap();
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].key(), Some(&Value::Int(1)));
    }
}
