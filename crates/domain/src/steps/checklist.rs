//! Multi-choice checklist step

use std::collections::HashSet;
use std::sync::Arc;

use super::{ChoiceOption, Eval};
use crate::data::{CharacterData, SourceData};
use crate::state::ChecklistState;

/// Multiple choice from an option list recomputed every pass.
///
/// Stored keys no longer present in the current list are filtered out, and
/// the selection is truncated when a shrunken maximum leaves it oversized.
#[derive(Clone)]
pub struct ChecklistStep {
    options: Eval<Vec<ChoiceOption>>,
    min: usize,
    max: Option<usize>,
}

impl ChecklistStep {
    pub fn new(
        options: impl Fn(&SourceData, &CharacterData) -> Vec<ChoiceOption> + Send + Sync + 'static,
    ) -> Self {
        Self {
            options: Arc::new(options),
            min: 1,
            max: None,
        }
    }

    /// Minimum selections needed for completion (default 1).
    pub fn min_required(mut self, min: usize) -> Self {
        self.min = min;
        self
    }

    pub fn max_selected(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    /// A checklist capped at one selection renders as a dropdown.
    pub fn renders_as_dropdown(&self) -> bool {
        self.max == Some(1)
    }

    pub(crate) fn update(
        &self,
        source: &SourceData,
        data: &CharacterData,
        state: &mut ChecklistState,
        required: bool,
    ) -> bool {
        let options = (self.options)(source, data);
        let mut seen = HashSet::new();
        state.values.retain(|value| {
            options.iter().any(|o| o.value == *value) && seen.insert(value.clone())
        });
        if let Some(max) = self.max {
            state.values.truncate(max);
        }
        state.options = options;
        !required || state.values.len() >= self.min
    }
}
