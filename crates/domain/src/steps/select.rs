//! Single-choice selection step

use super::{ChoiceOption, Eval};
use crate::data::{CharacterData, SourceData};
use crate::state::SelectState;
use std::sync::Arc;

/// Default-value closure for a select step, restricted to the freshly
/// computed option list.
pub type SelectDefault =
    Arc<dyn Fn(&SourceData, &CharacterData, &[ChoiceOption]) -> Option<String> + Send + Sync>;

/// Single choice from an option list recomputed every pass.
///
/// When an earlier step's change removes the stored value from the list, the
/// value is replaced through the default closure, which only ever sees the
/// new list.
#[derive(Clone)]
pub struct SelectStep {
    options: Eval<Vec<ChoiceOption>>,
    default: Option<SelectDefault>,
}

impl SelectStep {
    pub fn new(
        options: impl Fn(&SourceData, &CharacterData) -> Vec<ChoiceOption> + Send + Sync + 'static,
    ) -> Self {
        Self {
            options: Arc::new(options),
            default: None,
        }
    }

    pub fn default_with(
        mut self,
        default: impl Fn(&SourceData, &CharacterData, &[ChoiceOption]) -> Option<String>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.default = Some(Arc::new(default));
        self
    }

    /// Default to the first entry of the current option list.
    pub fn default_first(self) -> Self {
        self.default_with(|_, _, options| options.first().map(|o| o.value.clone()))
    }

    pub(crate) fn update(
        &self,
        source: &SourceData,
        data: &CharacterData,
        state: &mut SelectState,
        required: bool,
    ) -> bool {
        let options = (self.options)(source, data);
        let still_valid = state
            .value
            .as_ref()
            .is_some_and(|value| options.iter().any(|o| o.value == *value));
        if !still_valid {
            state.value = self
                .default
                .as_ref()
                .and_then(|default| default(source, data, &options))
                .filter(|value| options.iter().any(|o| o.value == *value));
        }
        state.options = options;
        state.value.is_some() || !required
    }
}
