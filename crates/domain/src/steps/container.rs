//! Container composite step

use crate::data::{CharacterData, SourceData};
use crate::error::DomainError;
use crate::runner::StepList;
use crate::state::{RunnerState, StepPatch};

/// Groups a fixed ordered list of child steps as one named sub-runner,
/// conditionally visible as a unit.
///
/// When visible, a pass delegates to the child list's full re-evaluation and
/// keeps the resulting child runner state as its own payload. When invisible,
/// the children are cleared but still written into the character document so
/// cleared values propagate.
#[derive(Clone)]
pub struct ContainerStep {
    steps: StepList,
}

impl ContainerStep {
    pub fn new(steps: StepList) -> Self {
        Self { steps }
    }

    pub fn steps(&self) -> &StepList {
        &self.steps
    }

    pub(crate) fn initialize_state(&self) -> RunnerState {
        self.steps.initialize_states()
    }

    pub(crate) fn clear(&self, state: &mut RunnerState) {
        self.steps.clear_states(state);
    }

    pub(crate) fn hydrate(&self, data: &CharacterData, state: &mut RunnerState) {
        self.steps.hydrate_states(data, state);
    }

    pub(crate) fn update(
        &self,
        source: &SourceData,
        data: &mut CharacterData,
        state: &mut RunnerState,
    ) -> bool {
        let prior = std::mem::take(&mut state.steps);
        *state = self.steps.evaluate(source, data, prior, None);
        state.is_settled()
    }

    pub(crate) fn update_character(
        &self,
        source: &SourceData,
        state: &RunnerState,
        data: &mut CharacterData,
    ) {
        self.steps.update_character_all(source, state, data);
    }

    pub(crate) fn apply_patch(
        &self,
        state: &mut RunnerState,
        child: usize,
        patch: &StepPatch,
    ) -> Result<(), DomainError> {
        let step = self
            .steps
            .get(child)
            .ok_or_else(|| DomainError::step_out_of_range(child, self.steps.len()))?;
        let tracked = state.steps.len();
        let child_state = state
            .steps
            .get_mut(child)
            .ok_or_else(|| DomainError::step_out_of_range(child, tracked))?;
        step.apply_patch(child_state, patch)
    }
}
