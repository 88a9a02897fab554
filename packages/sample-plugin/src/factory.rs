//! Registration of the sample plugin readers.

use std::sync::Arc;

use statetree_reader::{CrudService, ReaderFactory, ReaderRegistryBuilder, Result, SchemaPath};

use crate::element::{ElementStateCustomizer, ELEMENT_NODE};

/// Name of the plugin's root container.
pub const ROOT_NODE: &str = "sample-plugin-state";

/// `/sample-plugin-state`
pub fn root_path() -> SchemaPath {
    SchemaPath::root(ROOT_NODE)
}

/// `/sample-plugin-state/element`
pub fn element_path() -> SchemaPath {
    root_path().child(ELEMENT_NODE)
}

/// Registers the plugin's state container and its element list.
pub struct ModuleStateReaderFactory {
    service: Arc<dyn CrudService>,
}

impl ModuleStateReaderFactory {
    pub fn new(service: Arc<dyn CrudService>) -> Self {
        Self { service }
    }
}

impl ReaderFactory for ModuleStateReaderFactory {
    fn init(&self, registry: &mut ReaderRegistryBuilder) -> Result<()> {
        registry.add_structural(root_path())?;
        registry.add_list(
            element_path(),
            ElementStateCustomizer::new(Arc::clone(&self.service)),
        )?;
        Ok(())
    }
}
