//! Wizard definitions by builder key

use std::collections::HashMap;
use std::sync::Arc;

use chargen_domain::{BuilderKey, Wizard};

use crate::error::EngineError;

/// Registry of wizard definitions, populated at startup.
///
/// An unknown key is rejected here, synchronously, before any content load
/// or session work begins.
#[derive(Debug, Default)]
pub struct BuilderRegistry {
    wizards: HashMap<BuilderKey, Arc<Wizard>>,
}

impl BuilderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, wizard: Wizard) {
        self.wizards
            .insert(wizard.builder_key().clone(), Arc::new(wizard));
    }

    pub fn get(&self, builder_key: &BuilderKey) -> Result<Arc<Wizard>, EngineError> {
        self.wizards
            .get(builder_key)
            .cloned()
            .ok_or_else(|| EngineError::UnknownBuilder(builder_key.to_string()))
    }

    pub fn contains(&self, builder_key: &BuilderKey) -> bool {
        self.wizards.contains_key(builder_key)
    }

    pub fn builder_keys(&self) -> Vec<&BuilderKey> {
        self.wizards.keys().collect()
    }
}
