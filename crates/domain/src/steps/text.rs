//! Free-text entry step

use super::Eval;
use crate::data::{CharacterData, SourceData};
use crate::state::TextState;
use std::sync::Arc;

/// String entry. An untouched value (`None`) is filled from the default
/// closure once; a value the user has emptied stays empty.
#[derive(Clone, Default)]
pub struct TextStep {
    default: Option<Eval<String>>,
}

impl TextStep {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_with(
        mut self,
        default: impl Fn(&SourceData, &CharacterData) -> String + Send + Sync + 'static,
    ) -> Self {
        self.default = Some(Arc::new(default));
        self
    }

    pub fn default_to(self, value: impl Into<String>) -> Self {
        let value = value.into();
        self.default_with(move |_, _| value.clone())
    }

    pub(crate) fn update(
        &self,
        source: &SourceData,
        data: &CharacterData,
        state: &mut TextState,
        required: bool,
    ) -> bool {
        if state.value.is_none() {
            state.value = self.default.as_ref().map(|default| default(source, data));
        }
        !required || state.value.as_deref().is_some_and(|v| !v.is_empty())
    }
}
