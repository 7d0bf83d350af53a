//! Step list orchestration and the recomputation pass
//!
//! [`StepList`] owns an ordered list of sibling steps and implements the
//! single-forward-pass update algorithm: a sliding re-evaluation window that
//! starts at the changed step and grows while steps complete, so one user
//! edit can unlock and pre-populate several subsequent steps in the same
//! pass. [`Wizard`] binds one step list to a builder key plus the session's
//! initial character-data factory.
//!
//! Dependencies are assumed to flow forward by index: a step whose
//! visibility or options read a later step's data sees stale values until the
//! next full pass. Wizard definitions are hand-ordered to respect this; the
//! runner does not validate it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::data::{CharacterData, SourceData};
use crate::error::DomainError;
use crate::state::{RunnerState, StepPatch, StepState};
use crate::steps::Step;
use crate::view::StepView;

// =============================================================================
// StepList
// =============================================================================

/// An ordered list of sibling steps. Indices are assigned at construction
/// and match each step's position in the list.
#[derive(Debug, Clone)]
pub struct StepList {
    steps: Vec<Step>,
}

impl StepList {
    pub fn new(steps: Vec<Step>) -> Self {
        let mut steps = steps;
        for (index, step) in steps.iter_mut().enumerate() {
            step.set_index(index);
        }
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Fresh state for every step, cursor at 0. A settle pass normally
    /// follows so always-complete steps advance the cursor immediately.
    pub fn initialize_states(&self) -> RunnerState {
        RunnerState {
            current_step: 0,
            steps: self.steps.iter().map(Step::initialize_state).collect(),
        }
    }

    /// Run one recomputation pass.
    ///
    /// `data` must already be the caller's clone of the committed character
    /// data; the pass mutates it in place. `changed` is the index of the
    /// step whose raw state update triggered the pass, or `None` for a full
    /// re-evaluation with nothing user-driven. `patch` is merged into the
    /// changed step's prior state before recomputation.
    pub fn run_update(
        &self,
        source: &SourceData,
        data: &mut CharacterData,
        prior: &RunnerState,
        changed: Option<usize>,
        patch: Option<&StepPatch>,
    ) -> Result<RunnerState, DomainError> {
        if let Some(index) = changed {
            if index >= self.steps.len() {
                return Err(DomainError::step_out_of_range(index, self.steps.len()));
            }
        }

        let mut states = prior.steps.clone();
        self.fit_states(&mut states);

        match (changed, patch) {
            (Some(index), Some(patch)) => {
                if let (Some(step), Some(state)) = (self.steps.get(index), states.get_mut(index)) {
                    step.apply_patch(state, patch)?;
                }
            }
            (None, Some(_)) => return Err(DomainError::PatchWithoutStep),
            _ => {}
        }

        debug!(changed = ?changed, steps = self.steps.len(), "step recomputation pass");
        let next = self.evaluate(source, data, states, changed);
        debug!(current_step = next.current_step, "pass settled");
        Ok(next)
    }

    /// The single forward pass over step indices.
    ///
    /// Only steps inside the sliding window `[changed, end]` are
    /// re-evaluated; everything else carries its prior state. `end` starts at
    /// `changed + 1` (or 0 for a full pass) and advances past each completed
    /// step, cascading into newly reachable steps within the same pass.
    /// `update_character` runs for every step regardless of the window.
    pub(crate) fn evaluate(
        &self,
        source: &SourceData,
        data: &mut CharacterData,
        mut states: Vec<StepState>,
        changed: Option<usize>,
    ) -> RunnerState {
        self.fit_states(&mut states);

        let mut end = changed.map_or(0, |c| c + 1);
        let mut first_incomplete = None;
        for (index, (step, state)) in self.steps.iter().zip(states.iter_mut()).enumerate() {
            let in_window = changed.map_or(true, |c| index >= c) && index <= end;
            if in_window {
                step.update_state(source, data, state);
            }
            step.update_character(source, state, data);

            if state.completed {
                if end <= index {
                    end = index + 1;
                }
            } else if first_incomplete.is_none() {
                first_incomplete = Some(index);
            }
        }

        RunnerState {
            current_step: first_incomplete.unwrap_or(self.steps.len()),
            steps: states,
        }
    }

    /// Write every step's current value into the character document without
    /// re-evaluating anything. Used by composites that are outside the
    /// window or invisible.
    pub(crate) fn update_character_all(
        &self,
        source: &SourceData,
        state: &RunnerState,
        data: &mut CharacterData,
    ) {
        for (step, state) in self.steps.iter().zip(state.steps.iter()) {
            step.update_character(source, state, data);
        }
    }

    /// Clear every step's value-bearing fields.
    pub(crate) fn clear_states(&self, state: &mut RunnerState) {
        for (step, state) in self.steps.iter().zip(state.steps.iter_mut()) {
            step.kind().clear(&mut state.kind);
        }
    }

    /// Fit a carried-over state vector to this list: surplus entries are
    /// dropped, missing ones freshly initialized.
    fn fit_states(&self, states: &mut Vec<StepState>) {
        states.truncate(self.steps.len());
        while states.len() < self.steps.len() {
            states.push(self.steps[states.len()].initialize_state());
        }
    }

    /// Seed step values from an existing character document (session start
    /// from imported or factory-prefilled data). The settle pass that
    /// follows clamps and validates whatever was read back.
    pub(crate) fn hydrate_states(&self, data: &CharacterData, state: &mut RunnerState) {
        for (step, state) in self.steps.iter().zip(state.steps.iter_mut()) {
            step.hydrate(data, state);
        }
    }

    /// Render models for every step, indexed like the list.
    pub fn views(&self, state: &RunnerState) -> Vec<StepView> {
        self.steps
            .iter()
            .zip(state.steps.iter())
            .map(|(step, state)| step.view(state))
            .collect()
    }
}

// =============================================================================
// Wizard (root step collection)
// =============================================================================

/// Key identifying one wizard definition (e.g. `"dnd5e"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuilderKey(String);

impl BuilderKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuilderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BuilderKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for BuilderKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Factory for a session's initial character data.
pub type CharacterFactory = Arc<dyn Fn(&SourceData) -> Value + Send + Sync>;

/// Projection of a finished character into PDF form fields.
pub type PdfFieldsFn =
    Arc<dyn Fn(&SourceData, &CharacterData) -> BTreeMap<String, String> + Send + Sync>;

/// Result of one recomputation pass: the replacement runner state and the
/// character data clone the pass wrote into.
#[derive(Debug, Clone, PartialEq)]
pub struct StepUpdateOutcome {
    pub state: RunnerState,
    pub character: CharacterData,
}

/// One wizard definition: a builder key bound to a root step list, the
/// initial character-data factory, and an optional PDF form-field
/// projection.
#[derive(Clone)]
pub struct Wizard {
    builder_key: BuilderKey,
    title: String,
    steps: StepList,
    initial_character: CharacterFactory,
    pdf_fields: Option<PdfFieldsFn>,
}

impl Wizard {
    pub fn new(builder_key: impl Into<BuilderKey>, steps: StepList) -> Self {
        let builder_key = builder_key.into();
        Self {
            title: builder_key.to_string(),
            builder_key,
            steps,
            initial_character: Arc::new(|_| Value::Object(serde_json::Map::new())),
            pdf_fields: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Initial character data for a fresh session (ignored when a session is
    /// started from imported data).
    pub fn with_initial_character(
        mut self,
        factory: impl Fn(&SourceData) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.initial_character = Arc::new(factory);
        self
    }

    pub fn with_pdf_fields(
        mut self,
        fields: impl Fn(&SourceData, &CharacterData) -> BTreeMap<String, String>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        self.pdf_fields = Some(Arc::new(fields));
        self
    }

    pub fn builder_key(&self) -> &BuilderKey {
        &self.builder_key
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn steps(&self) -> &StepList {
        &self.steps
    }

    /// Build a session's first state: fresh step states plus a settle pass
    /// over the initial character data (the factory's output, or externally
    /// imported data of the wizard's shape).
    pub fn initialize(&self, source: &SourceData, initial: Option<Value>) -> StepUpdateOutcome {
        let mut data = match initial {
            Some(value) => CharacterData::new(value),
            None => CharacterData::new((self.initial_character)(source)),
        };
        let mut fresh = self.steps.initialize_states();
        self.steps.hydrate_states(&data, &mut fresh);
        let state = self.steps.evaluate(source, &mut data, fresh.steps, None);
        StepUpdateOutcome {
            state,
            character: data,
        }
    }

    /// The update entry point the session layer calls and persists the
    /// result of. Clones the committed character data, runs one pass, and
    /// returns the replacement state plus the new canonical data.
    pub fn on_step_updated(
        &self,
        source: &SourceData,
        character: &CharacterData,
        prior: &RunnerState,
        changed: Option<usize>,
        patch: Option<&StepPatch>,
    ) -> Result<StepUpdateOutcome, DomainError> {
        let mut data = character.clone();
        let state = self
            .steps
            .run_update(source, &mut data, prior, changed, patch)?;
        Ok(StepUpdateOutcome {
            state,
            character: data,
        })
    }

    /// PDF form fields for the external fill service, if this wizard
    /// supports PDF export.
    pub fn pdf_fields(
        &self,
        source: &SourceData,
        data: &CharacterData,
    ) -> Option<BTreeMap<String, String>> {
        self.pdf_fields.as_ref().map(|fields| fields(source, data))
    }

    pub fn views(&self, state: &RunnerState) -> Vec<StepView> {
        self.steps.views(state)
    }
}

impl fmt::Debug for Wizard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wizard")
            .field("builder_key", &self.builder_key)
            .field("title", &self.title)
            .field("steps", &self.steps.len())
            .field("pdf", &self.pdf_fields.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{StepPatch, StepStateKind};
    use crate::steps::{
        ChecklistStep, ChoiceOption, ContainerStep, ForEachStep, NoteStep, NumericStep,
        SelectStep, Step, TextStep,
    };
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn source() -> SourceData {
        SourceData::new(json!({
            "templates": [
                {"value": "X", "label": "Template X"},
                {"value": "Y", "label": "Template Y"}
            ],
            "gear": {
                "X": [{"value": "sword", "label": "Sword"}, {"value": "bow", "label": "Bow"}],
                "Y": [{"value": "staff", "label": "Staff"}]
            }
        }))
    }

    fn source_options(path: &'static str) -> impl Fn(&SourceData, &CharacterData) -> Vec<ChoiceOption>
    {
        move |source: &SourceData, _: &CharacterData| {
            source
                .array_at(path)
                .map(|items| {
                    items
                        .iter()
                        .filter_map(|item| {
                            Some(ChoiceOption::new(
                                item.get("value")?.as_str()?,
                                item.get("label")?.as_str()?,
                            ))
                        })
                        .collect()
                })
                .unwrap_or_default()
        }
    }

    /// Step 1's options depend on step 0's stored template choice.
    fn gear_options(source: &SourceData, data: &CharacterData) -> Vec<ChoiceOption> {
        let template = data.str_at("template").unwrap_or_default();
        source
            .array_at(&format!("gear.{template}"))
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| {
                        Some(ChoiceOption::new(
                            item.get("value")?.as_str()?,
                            item.get("label")?.as_str()?,
                        ))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn settle(list: &StepList, source: &SourceData, data: &mut CharacterData) -> RunnerState {
        let fresh = list.initialize_states();
        list.evaluate(source, data, fresh.steps, None)
    }

    #[test]
    fn cascading_defaults_settle_in_one_pass() {
        let list = StepList::new(vec![
            Step::new("intro", NoteStep::fixed("Welcome")),
            Step::new(
                "template",
                SelectStep::new(|_, _| vec![ChoiceOption::new("only", "Only")]).default_first(),
            )
            .writes_to("template"),
            Step::new("name", TextStep::new()).writes_to("identity.name"),
        ]);
        let source = source();
        let mut data = CharacterData::empty();
        let state = settle(&list, &source, &mut data);

        // Static text and the single-option dropdown auto-complete in the
        // same pass, not one per round trip.
        assert_eq!(state.current_step, 2);
        assert_eq!(data.str_at("template"), Some("only"));
    }

    #[test]
    fn settle_is_idempotent() {
        let list = StepList::new(vec![
            Step::new("template", SelectStep::new(source_options("templates")).default_first())
                .writes_to("template"),
            Step::new("gear", SelectStep::new(gear_options).default_first()).writes_to("gear"),
            Step::new("level", NumericStep::fixed(1, 10).default_to(1)).writes_to("level"),
        ]);
        let source = source();
        let mut data = CharacterData::empty();
        let settled = settle(&list, &source, &mut data);

        let mut again = data.clone();
        let resettled = list
            .run_update(&source, &mut again, &settled, None, None)
            .unwrap();
        assert_eq!(resettled, settled);
        assert_eq!(again, data);
    }

    #[test]
    fn numeric_patch_clamps_before_storage() {
        let list = StepList::new(vec![
            Step::new("level", NumericStep::fixed(1, 10)).writes_to("level")
        ]);
        let source = source();
        let mut data = CharacterData::empty();
        let state = settle(&list, &source, &mut data);

        let next = list
            .run_update(
                &source,
                &mut data,
                &state,
                Some(0),
                Some(&StepPatch::Numeric { value: Some(15) }),
            )
            .unwrap();
        match &next.steps[0].kind {
            StepStateKind::Numeric(s) => assert_eq!(s.value, Some(10)),
            other => panic!("unexpected state kind {}", other.name()),
        }
        assert_eq!(data.i64_at("level"), Some(10));
    }

    #[test]
    fn checklist_truncates_after_maximum_shrinks() {
        let list = StepList::new(vec![Step::new(
            "skills",
            ChecklistStep::new(|_, _| {
                ["a", "b", "c"]
                    .iter()
                    .map(|k| ChoiceOption::new(*k, *k))
                    .collect()
            })
            .max_selected(2),
        )
        .writes_to("skills")]);
        let source = source();
        let mut data = CharacterData::empty();

        // Stored selection predates the maximum of 2.
        let mut state = list.initialize_states();
        if let StepStateKind::Checklist(s) = &mut state.steps[0].kind {
            s.values = vec!["a".into(), "b".into(), "c".into()];
        }
        let next = list.evaluate(&source, &mut data, state.steps, None);
        match &next.steps[0].kind {
            StepStateKind::Checklist(s) => {
                assert_eq!(s.values, vec!["a".to_string(), "b".to_string()])
            }
            other => panic!("unexpected state kind {}", other.name()),
        }
        assert_eq!(data.root()["skills"], json!(["a", "b"]));
    }

    #[test]
    fn dependent_dropdown_invalidated_by_upstream_change() {
        let list = StepList::new(vec![
            Step::new("template", SelectStep::new(source_options("templates")).default_first())
                .writes_to("template"),
            Step::new("gear", SelectStep::new(gear_options).default_first()).writes_to("gear"),
        ]);
        let source = source();
        let mut data = CharacterData::empty();
        let state = settle(&list, &source, &mut data);
        assert_eq!(data.str_at("template"), Some("X"));
        assert_eq!(data.str_at("gear"), Some("sword"));

        let next = list
            .run_update(
                &source,
                &mut data,
                &state,
                Some(0),
                Some(&StepPatch::Select {
                    value: Some("Y".to_string()),
                }),
            )
            .unwrap();
        // "sword" is not in template Y's gear list; the new list's default
        // replaces it in the same pass.
        assert_eq!(data.str_at("gear"), Some("staff"));
        assert!(next.is_settled());
    }

    #[test]
    fn invisible_step_clears_state_and_output() {
        let list = StepList::new(vec![
            Step::new("template", SelectStep::new(source_options("templates")).default_first())
                .writes_to("template"),
            Step::new("bow_draw", NumericStep::fixed(10, 80).default_to(40))
                .visible_if(|_, data| data.str_at("template") == Some("X"))
                .writes_to("bowDraw"),
        ]);
        let source = source();
        let mut data = CharacterData::empty();
        let state = settle(&list, &source, &mut data);
        assert_eq!(data.i64_at("bowDraw"), Some(40));

        let next = list
            .run_update(
                &source,
                &mut data,
                &state,
                Some(0),
                Some(&StepPatch::Select {
                    value: Some("Y".to_string()),
                }),
            )
            .unwrap();
        let hidden = &next.steps[1];
        assert!(!hidden.visible);
        assert!(hidden.completed);
        match &hidden.kind {
            StepStateKind::Numeric(s) => assert_eq!(s.value, None),
            other => panic!("unexpected state kind {}", other.name()),
        }
        // The cleared value still propagates into the output document.
        assert_eq!(data.root()["bowDraw"], Value::Null);
    }

    #[test]
    fn conditional_step_starts_invisible() {
        let step = Step::new("maybe", TextStep::new()).visible_if(|_, _| true);
        assert!(!step.initialize_state().visible);
        assert!(Step::new("always", TextStep::new()).initialize_state().visible);
    }

    #[test]
    fn steps_before_changed_are_not_reevaluated() {
        static EVALS: AtomicUsize = AtomicUsize::new(0);
        let list = StepList::new(vec![
            Step::new(
                "counted",
                SelectStep::new(|_, _| {
                    EVALS.fetch_add(1, Ordering::SeqCst);
                    vec![ChoiceOption::new("a", "A")]
                })
                .default_first(),
            )
            .writes_to("counted"),
            Step::new("level", NumericStep::fixed(1, 10)).writes_to("level"),
        ]);
        let source = source();
        let mut data = CharacterData::empty();
        let state = settle(&list, &source, &mut data);
        let before = EVALS.load(Ordering::SeqCst);

        list.run_update(
            &source,
            &mut data,
            &state,
            Some(1),
            Some(&StepPatch::Numeric { value: Some(3) }),
        )
        .unwrap();
        // Step 0 sits before the window; its option closure must not rerun.
        assert_eq!(EVALS.load(Ordering::SeqCst), before);
        // But its value is still written into the fresh data clone.
        assert_eq!(data.str_at("counted"), Some("a"));
    }

    #[test]
    fn completed_steps_stay_completed_when_downstream_changes() {
        let list = StepList::new(vec![
            Step::new("name", TextStep::new().default_to("Brynn")).writes_to("name"),
            Step::new("level", NumericStep::fixed(1, 10).default_to(1)).writes_to("level"),
            Step::new("motto", TextStep::new()).writes_to("motto"),
        ]);
        let source = source();
        let mut data = CharacterData::empty();
        let state = settle(&list, &source, &mut data);
        assert!(state.steps[0].completed);
        assert!(state.steps[1].completed);

        let next = list
            .run_update(
                &source,
                &mut data,
                &state,
                Some(2),
                Some(&StepPatch::Text {
                    value: Some("Onward".to_string()),
                }),
            )
            .unwrap();
        assert!(next.steps[0].completed);
        assert!(next.steps[1].completed);
        assert!(next.is_settled());
    }

    #[test]
    fn out_of_range_changed_step_is_rejected() {
        let list = StepList::new(vec![Step::new("name", TextStep::new())]);
        let source = source();
        let mut data = CharacterData::empty();
        let state = list.initialize_states();
        let err = list
            .run_update(&source, &mut data, &state, Some(5), None)
            .unwrap_err();
        assert_eq!(err, DomainError::step_out_of_range(5, 1));
    }

    #[test]
    fn patch_without_changed_step_is_rejected() {
        let list = StepList::new(vec![Step::new("name", TextStep::new())]);
        let source = source();
        let mut data = CharacterData::empty();
        let state = list.initialize_states();
        let err = list
            .run_update(
                &source,
                &mut data,
                &state,
                None,
                Some(&StepPatch::Text { value: None }),
            )
            .unwrap_err();
        assert_eq!(err, DomainError::PatchWithoutStep);
    }

    #[test]
    fn mismatched_patch_is_rejected() {
        let list = StepList::new(vec![Step::new("level", NumericStep::fixed(1, 10))]);
        let source = source();
        let mut data = CharacterData::empty();
        let state = list.initialize_states();
        let err = list
            .run_update(
                &source,
                &mut data,
                &state,
                Some(0),
                Some(&StepPatch::Text {
                    value: Some("nope".to_string()),
                }),
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::PatchMismatch { .. }));
    }

    // =========================================================================
    // Composites
    // =========================================================================

    fn companion_steps() -> StepList {
        StepList::new(vec![
            Step::new("companion_name", TextStep::new()).writes_to("item.name"),
            Step::new("loyalty", NumericStep::fixed(1, 5).default_to(3)).writes_to("item.loyalty"),
        ])
    }

    fn companion_wizard() -> StepList {
        StepList::new(vec![
            Step::new("companion_count", NumericStep::fixed(0, 4).default_to(0))
                .writes_to("companionCount"),
            Step::new(
                "companions",
                ForEachStep::new(
                    "companions",
                    |_, data| data.i64_at("companionCount").unwrap_or(0).max(0) as usize,
                    companion_steps(),
                )
                .labeled_by(|_, item, index| {
                    item.get("name")
                        .and_then(Value::as_str)
                        .filter(|name| !name.is_empty())
                        .map(String::from)
                        .unwrap_or_else(|| format!("Companion {}", index + 1))
                }),
            ),
        ])
    }

    #[test]
    fn for_each_resize_down_truncates_state_and_data() {
        let list = companion_wizard();
        let source = source();
        let mut data = CharacterData::empty();
        let state = settle(&list, &source, &mut data);

        // Grow to 3 companions and name them all.
        let state = list
            .run_update(
                &source,
                &mut data,
                &state,
                Some(0),
                Some(&StepPatch::Numeric { value: Some(3) }),
            )
            .unwrap();
        assert_eq!(data.array_at("companions").map(Vec::len), Some(3));

        let mut state = state;
        for (iteration, name) in ["Ash", "Bram", "Cole"].iter().enumerate() {
            state = list
                .run_update(
                    &source,
                    &mut data,
                    &state,
                    Some(1),
                    Some(&StepPatch::ForEach {
                        iteration,
                        child: 0,
                        patch: Box::new(StepPatch::Text {
                            value: Some(name.to_string()),
                        }),
                    }),
                )
                .unwrap();
        }
        assert!(state.is_settled());
        assert_eq!(data.str_at("companions.2.name"), Some("Cole"));

        // Shrink to 1: surplus iteration state and data both go away.
        let state = list
            .run_update(
                &source,
                &mut data,
                &state,
                Some(0),
                Some(&StepPatch::Numeric { value: Some(1) }),
            )
            .unwrap();
        match &state.steps[1].kind {
            StepStateKind::Iterations(s) => {
                assert_eq!(s.runners.len(), 1);
                assert_eq!(s.labels, vec!["Ash".to_string()]);
            }
            other => panic!("unexpected state kind {}", other.name()),
        }
        assert_eq!(data.array_at("companions").map(Vec::len), Some(1));
        assert_eq!(data.str_at("companions.0.name"), Some("Ash"));
    }

    #[test]
    fn for_each_children_see_index_and_parent() {
        let steps = StepList::new(vec![Step::new(
            "title",
            NoteStep::new(|_, data| {
                format!(
                    "{} of {}",
                    data.i64_at("index").map(|i| i + 1).unwrap_or(0),
                    data.i64_at("parent.companionCount").unwrap_or(0)
                )
            }),
        )
        .writes_to("item.title")]);
        let list = StepList::new(vec![
            Step::new("companion_count", NumericStep::fixed(0, 4).default_to(2))
                .writes_to("companionCount"),
            Step::new(
                "companions",
                ForEachStep::new(
                    "companions",
                    |_, data| data.i64_at("companionCount").unwrap_or(0).max(0) as usize,
                    steps,
                ),
            ),
        ]);
        let source = source();
        let mut data = CharacterData::empty();
        let state = settle(&list, &source, &mut data);
        assert!(state.is_settled());
        assert_eq!(data.str_at("companions.1.title"), Some("2 of 2"));
    }

    #[test]
    fn invisible_container_clears_children_and_still_writes() {
        let children = StepList::new(vec![
            Step::new("school", TextStep::new().default_to("evocation")).writes_to("magic.school"),
        ]);
        let list = StepList::new(vec![
            Step::new("template", SelectStep::new(source_options("templates")).default_first())
                .writes_to("template"),
            Step::new("magic", ContainerStep::new(children))
                .visible_if(|_, data| data.str_at("template") == Some("X")),
        ]);
        let source = source();
        let mut data = CharacterData::empty();
        let state = settle(&list, &source, &mut data);
        assert_eq!(data.str_at("magic.school"), Some("evocation"));
        assert!(state.is_settled());

        let next = list
            .run_update(
                &source,
                &mut data,
                &state,
                Some(0),
                Some(&StepPatch::Select {
                    value: Some("Y".to_string()),
                }),
            )
            .unwrap();
        assert!(next.steps[1].completed);
        assert!(!next.steps[1].visible);
        assert_eq!(data.root()["magic"]["school"], Value::Null);
    }

    #[test]
    fn container_patch_reaches_nested_child() {
        let children = StepList::new(vec![
            Step::new("school", TextStep::new()).writes_to("magic.school"),
            Step::new("rank", NumericStep::fixed(1, 3).default_to(1)).writes_to("magic.rank"),
        ]);
        let list = StepList::new(vec![Step::new("magic", ContainerStep::new(children))]);
        let source = source();
        let mut data = CharacterData::empty();
        let state = settle(&list, &source, &mut data);
        assert_eq!(state.current_step, 0);

        let next = list
            .run_update(
                &source,
                &mut data,
                &state,
                Some(0),
                Some(&StepPatch::Container {
                    child: 0,
                    patch: Box::new(StepPatch::Text {
                        value: Some("abjuration".to_string()),
                    }),
                }),
            )
            .unwrap();
        assert!(next.is_settled());
        assert_eq!(data.str_at("magic.school"), Some("abjuration"));
        assert_eq!(data.i64_at("magic.rank"), Some(1));
    }

    #[test]
    fn wizard_initializes_from_imported_data() {
        let list = StepList::new(vec![
            Step::new("name", TextStep::new()).writes_to("identity.name"),
            Step::new("level", NumericStep::fixed(1, 10).default_to(1)).writes_to("level"),
        ]);
        let wizard = Wizard::new("swordsman", list)
            .with_title("Swordsman Builder")
            .with_initial_character(|_| json!({"identity": {}}));
        let source = source();

        let fresh = wizard.initialize(&source, None);
        assert_eq!(fresh.state.current_step, 0);

        let imported = wizard.initialize(
            &source,
            Some(json!({"identity": {"name": "Brynn"}, "level": 7})),
        );
        assert!(imported.state.is_settled());
        assert_eq!(imported.character.i64_at("level"), Some(7));
    }

    #[test]
    fn on_step_updated_leaves_committed_data_untouched() {
        let list =
            StepList::new(vec![Step::new("name", TextStep::new()).writes_to("identity.name")]);
        let wizard = Wizard::new("swordsman", list);
        let source = source();
        let committed = wizard.initialize(&source, None);

        let outcome = wizard
            .on_step_updated(
                &source,
                &committed.character,
                &committed.state,
                Some(0),
                Some(&StepPatch::Text {
                    value: Some("Brynn".to_string()),
                }),
            )
            .unwrap();
        assert_eq!(outcome.character.str_at("identity.name"), Some("Brynn"));
        // The previous snapshot is only replaced when the caller commits.
        assert_eq!(committed.character.str_at("identity.name"), None);
    }
}
