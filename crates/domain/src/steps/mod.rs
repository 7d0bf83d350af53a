//! Step nodes and the closed step-kind variant model
//!
//! A wizard is a tree of [`Step`] nodes. Instead of a subclass hierarchy,
//! every behavioral variant is one arm of the closed [`StepKind`] enum, and
//! all dispatch happens in this module: state initialization, visibility,
//! recomputation, character writes, and patch merging. Hoisting the
//! "always write the character, visible or not" rule into [`Step`] keeps it
//! out of the individual variants, where it would be easy to forget.
//!
//! Variant-specific recompute rules live in the sibling modules, one per kind.

mod checklist;
mod container;
mod for_each;
mod note;
mod numeric;
mod pool;
mod select;
mod stats;
mod text;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::data::{CharacterData, DataPath, SourceData};
use crate::error::DomainError;
use crate::state::{StepPatch, StepState, StepStateKind};
use crate::view::StepView;

pub use checklist::ChecklistStep;
pub use container::ContainerStep;
pub use for_each::ForEachStep;
pub use note::NoteStep;
pub use numeric::NumericStep;
pub use pool::{PoolDef, PoolStep};
pub use select::SelectStep;
pub use stats::{SlotDef, StatAssignStep};
pub use text::TextStep;

// =============================================================================
// Shared closure seams
// =============================================================================

/// Visibility predicate over source + character data.
pub type Predicate = Arc<dyn Fn(&SourceData, &CharacterData) -> bool + Send + Sync>;

/// A value derived from source + character data, recomputed every pass.
pub type Eval<T> = Arc<dyn Fn(&SourceData, &CharacterData) -> T + Send + Sync>;

/// Custom character-data writer, for steps whose output is not a single path.
pub type CustomWriter = Arc<dyn Fn(&SourceData, &StepState, &mut CharacterData) + Send + Sync>;

/// One selectable option for select and checklist steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceOption {
    /// Internal key stored in step state and character data.
    pub value: String,
    /// Display label.
    pub label: String,
}

impl ChoiceOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Where a step's current value is written on every pass.
#[derive(Clone, Default)]
pub enum DataTarget {
    /// Write the variant's canonical JSON projection at a path.
    Path(DataPath),
    /// Caller-supplied writer.
    Custom(CustomWriter),
    /// No character output (static text, purely informational steps).
    #[default]
    None,
}

// =============================================================================
// Step
// =============================================================================

/// One node of the wizard graph.
#[derive(Clone)]
pub struct Step {
    name: String,
    label: String,
    index: usize,
    required: bool,
    visible_if: Option<Predicate>,
    target: DataTarget,
    kind: StepKind,
}

impl Step {
    /// Create a step. The index is assigned when the step joins a
    /// [`crate::runner::StepList`].
    pub fn new(name: impl Into<String>, kind: impl Into<StepKind>) -> Self {
        let name = name.into();
        Self {
            label: name.clone(),
            name,
            index: 0,
            required: true,
            visible_if: None,
            target: DataTarget::None,
            kind: kind.into(),
        }
    }

    /// Display label shown by the renderer; defaults to the step name.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Optional steps never gate the current-step cursor on their own value.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Conditionally show this step. Absent predicate means always visible.
    pub fn visible_if(
        mut self,
        predicate: impl Fn(&SourceData, &CharacterData) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.visible_if = Some(Arc::new(predicate));
        self
    }

    /// Write this step's value at a dotted path in the character document.
    pub fn writes_to(mut self, path: impl Into<DataPath>) -> Self {
        self.target = DataTarget::Path(path.into());
        self
    }

    /// Write this step's value through a caller-supplied writer.
    pub fn writes_with(
        mut self,
        writer: impl Fn(&SourceData, &StepState, &mut CharacterData) + Send + Sync + 'static,
    ) -> Self {
        self.target = DataTarget::Custom(Arc::new(writer));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn required(&self) -> bool {
        self.required
    }

    pub fn kind(&self) -> &StepKind {
        &self.kind
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    /// Fresh default state. `visible` starts `false` when a visibility
    /// predicate exists, so conditional steps do not flash default content
    /// before their first evaluation.
    pub fn initialize_state(&self) -> StepState {
        StepState {
            completed: false,
            visible: self.visible_if.is_none(),
            kind: self.kind.initial_state(),
        }
    }

    /// Recompute this step's state against current source + character data.
    ///
    /// Evaluates the visibility predicate first; an invisible step has its
    /// value fields cleared and is forced complete without running the
    /// variant recompute.
    pub fn update_state(&self, source: &SourceData, data: &mut CharacterData, state: &mut StepState) {
        let visible = self
            .visible_if
            .as_ref()
            .map_or(true, |predicate| predicate(source, data));
        state.visible = visible;
        if !visible {
            self.kind.clear(&mut state.kind);
            state.completed = true;
            return;
        }
        self.kind.update(source, data, state, self.required);
    }

    /// Write this step's current value into the character document.
    ///
    /// Called by the runner for every step on every pass, visible or not,
    /// inside or outside the re-evaluation window, so cleared values keep
    /// propagating into the output document.
    pub fn update_character(&self, source: &SourceData, state: &StepState, data: &mut CharacterData) {
        match (&self.kind, &state.kind) {
            (StepKind::Container(step), StepStateKind::Runner(runner)) => {
                step.update_character(source, runner, data);
            }
            (StepKind::ForEach(step), StepStateKind::Iterations(iterations)) => {
                step.update_character(source, iterations, data);
            }
            (kind, payload) => match &self.target {
                DataTarget::Path(path) => {
                    if let Some(value) = kind.value_json(payload) {
                        data.set(path, value);
                    }
                }
                DataTarget::Custom(write) => write(source, state, data),
                DataTarget::None => {}
            },
        }
    }

    /// Seed this step's state value from an existing character document.
    ///
    /// Only runs at session start, so externally supplied character data of
    /// the wizard's shape shows up in the wizard instead of being overwritten
    /// by defaults. Reads invert the `Path` target; custom writers cannot be
    /// inverted and are skipped. The settle pass afterwards clamps and
    /// filters whatever was read.
    pub(crate) fn hydrate(&self, data: &CharacterData, state: &mut StepState) {
        match (&self.kind, &mut state.kind) {
            (StepKind::Container(step), StepStateKind::Runner(runner)) => {
                step.hydrate(data, runner);
            }
            (StepKind::ForEach(step), StepStateKind::Iterations(iterations)) => {
                step.hydrate(data, iterations);
            }
            (_, payload) => {
                let DataTarget::Path(path) = &self.target else {
                    return;
                };
                let Some(value) = data.get(path) else {
                    return;
                };
                match payload {
                    StepStateKind::Numeric(s) => s.value = value.as_i64(),
                    StepStateKind::Text(s) => s.value = value.as_str().map(String::from),
                    StepStateKind::Select(s) => s.value = value.as_str().map(String::from),
                    StepStateKind::Checklist(s) => {
                        s.values = value
                            .as_array()
                            .map(|items| {
                                items
                                    .iter()
                                    .filter_map(|v| v.as_str().map(String::from))
                                    .collect()
                            })
                            .unwrap_or_default();
                    }
                    StepStateKind::Pool(s) => {
                        s.allocations = value
                            .as_object()
                            .map(|map| {
                                map.iter()
                                    .filter_map(|(k, v)| v.as_i64().map(|v| (k.clone(), v)))
                                    .collect()
                            })
                            .unwrap_or_default();
                    }
                    StepStateKind::Stats(s) => {
                        s.assignments = value
                            .as_object()
                            .map(|map| {
                                map.iter()
                                    .filter(|(_, v)| !v.is_null())
                                    .map(|(k, v)| (k.clone(), v.clone()))
                                    .collect()
                            })
                            .unwrap_or_default();
                    }
                    _ => {}
                }
            }
        }
    }

    /// Merge a field-level patch into this step's state.
    ///
    /// Clamping and validation happen in the recomputation that follows, not
    /// here; a patch whose shape does not match the step is rejected.
    pub fn apply_patch(&self, state: &mut StepState, patch: &StepPatch) -> Result<(), DomainError> {
        match (&self.kind, &mut state.kind, patch) {
            (_, StepStateKind::Numeric(s), StepPatch::Numeric { value }) => {
                s.value = *value;
                Ok(())
            }
            (_, StepStateKind::Text(s), StepPatch::Text { value }) => {
                s.value = value.clone();
                Ok(())
            }
            (_, StepStateKind::Select(s), StepPatch::Select { value }) => {
                s.value = value.clone();
                Ok(())
            }
            (_, StepStateKind::Checklist(s), StepPatch::Checklist { values }) => {
                s.values = values.clone();
                Ok(())
            }
            (_, StepStateKind::Pool(s), StepPatch::Pool { pool, value }) => {
                s.allocations.insert(pool.clone(), *value);
                Ok(())
            }
            (StepKind::Stats(step), StepStateKind::Stats(s), StepPatch::Stats { slot, choice }) => {
                step.apply(s, slot, choice);
                Ok(())
            }
            (
                StepKind::Container(step),
                StepStateKind::Runner(runner),
                StepPatch::Container { child, patch },
            ) => step.apply_patch(runner, *child, patch),
            (
                StepKind::ForEach(step),
                StepStateKind::Iterations(iterations),
                StepPatch::ForEach {
                    iteration,
                    child,
                    patch,
                },
            ) => step.apply_patch(iterations, *iteration, *child, patch),
            (_, payload, patch) => Err(DomainError::patch_mismatch(
                payload.name(),
                patch.kind_name(),
            )),
        }
    }

    /// Project the render model for this step. The engine never draws
    /// anything; this is the full render contract.
    pub fn view(&self, state: &StepState) -> StepView {
        crate::view::project_step(self, state)
    }
}

// The visibility predicate and data target hold closures, so Debug is manual.
impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("index", &self.index)
            .field("kind", &self.kind.name())
            .field("required", &self.required)
            .field("conditional", &self.visible_if.is_some())
            .finish()
    }
}

// =============================================================================
// StepKind dispatch
// =============================================================================

/// Closed set of step behaviors.
#[derive(Clone)]
pub enum StepKind {
    Numeric(NumericStep),
    Text(TextStep),
    Select(SelectStep),
    Checklist(ChecklistStep),
    Note(NoteStep),
    Pool(PoolStep),
    Stats(StatAssignStep),
    Container(ContainerStep),
    ForEach(ForEachStep),
}

impl StepKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Numeric(_) => "numeric",
            Self::Text(_) => "text",
            Self::Select(_) => "select",
            Self::Checklist(_) => "checklist",
            Self::Note(_) => "note",
            Self::Pool(_) => "pool",
            Self::Stats(_) => "stats",
            Self::Container(_) => "container",
            Self::ForEach(_) => "for_each",
        }
    }

    pub(crate) fn initial_state(&self) -> StepStateKind {
        match self {
            Self::Numeric(_) => StepStateKind::Numeric(Default::default()),
            Self::Text(_) => StepStateKind::Text(Default::default()),
            Self::Select(_) => StepStateKind::Select(Default::default()),
            Self::Checklist(_) => StepStateKind::Checklist(Default::default()),
            Self::Note(_) => StepStateKind::Note(Default::default()),
            Self::Pool(_) => StepStateKind::Pool(Default::default()),
            Self::Stats(_) => StepStateKind::Stats(Default::default()),
            Self::Container(step) => StepStateKind::Runner(step.initialize_state()),
            Self::ForEach(_) => StepStateKind::Iterations(Default::default()),
        }
    }

    fn matches_state(&self, payload: &StepStateKind) -> bool {
        matches!(
            (self, payload),
            (Self::Numeric(_), StepStateKind::Numeric(_))
                | (Self::Text(_), StepStateKind::Text(_))
                | (Self::Select(_), StepStateKind::Select(_))
                | (Self::Checklist(_), StepStateKind::Checklist(_))
                | (Self::Note(_), StepStateKind::Note(_))
                | (Self::Pool(_), StepStateKind::Pool(_))
                | (Self::Stats(_), StepStateKind::Stats(_))
                | (Self::Container(_), StepStateKind::Runner(_))
                | (Self::ForEach(_), StepStateKind::Iterations(_))
        )
    }

    /// Reset value-bearing fields to their empty representation. Does not
    /// touch the universal `completed`/`visible` flags.
    pub(crate) fn clear(&self, payload: &mut StepStateKind) {
        match (self, payload) {
            (_, StepStateKind::Numeric(s)) => s.value = None,
            (_, StepStateKind::Text(s)) => s.value = None,
            (_, StepStateKind::Select(s)) => s.value = None,
            (_, StepStateKind::Checklist(s)) => s.values.clear(),
            (_, StepStateKind::Note(s)) => s.text.clear(),
            (_, StepStateKind::Pool(s)) => {
                s.allocations.clear();
                s.remaining = s.total;
            }
            (_, StepStateKind::Stats(s)) => {
                s.assignments.clear();
                s.available.clear();
            }
            (Self::Container(step), StepStateKind::Runner(runner)) => step.clear(runner),
            (Self::ForEach(step), StepStateKind::Iterations(iterations)) => step.clear(iterations),
            _ => {}
        }
    }

    /// Variant-specific recompute: determine selectable options, clamp the
    /// current value against source and sibling data, compute completion.
    pub(crate) fn update(
        &self,
        source: &SourceData,
        data: &mut CharacterData,
        state: &mut StepState,
        required: bool,
    ) {
        if !self.matches_state(&state.kind) {
            state.kind = self.initial_state();
        }
        state.completed = match (self, &mut state.kind) {
            (Self::Numeric(step), StepStateKind::Numeric(s)) => {
                step.update(source, data, s, required)
            }
            (Self::Text(step), StepStateKind::Text(s)) => step.update(source, data, s, required),
            (Self::Select(step), StepStateKind::Select(s)) => {
                step.update(source, data, s, required)
            }
            (Self::Checklist(step), StepStateKind::Checklist(s)) => {
                step.update(source, data, s, required)
            }
            (Self::Note(step), StepStateKind::Note(s)) => step.update(source, data, s),
            (Self::Pool(step), StepStateKind::Pool(s)) => step.update(source, data, s, required),
            (Self::Stats(step), StepStateKind::Stats(s)) => step.update(source, data, s, required),
            (Self::Container(step), StepStateKind::Runner(s)) => step.update(source, data, s),
            (Self::ForEach(step), StepStateKind::Iterations(s)) => step.update(source, data, s),
            // Rebuilt above; kinds always match by this point.
            (_, _) => state.completed,
        };
    }

    /// Canonical JSON projection of a leaf value, written by `Path` targets.
    fn value_json(&self, payload: &StepStateKind) -> Option<Value> {
        match (self, payload) {
            (_, StepStateKind::Numeric(s)) => Some(s.value.map_or(Value::Null, Value::from)),
            (_, StepStateKind::Text(s)) => {
                Some(s.value.clone().map_or(Value::Null, Value::String))
            }
            (_, StepStateKind::Select(s)) => {
                Some(s.value.clone().map_or(Value::Null, Value::String))
            }
            (_, StepStateKind::Checklist(s)) => Some(Value::Array(
                s.values.iter().cloned().map(Value::String).collect(),
            )),
            (_, StepStateKind::Note(s)) => Some(Value::String(s.text.clone())),
            (_, StepStateKind::Pool(s)) => Some(Value::Object(
                s.allocations
                    .iter()
                    .map(|(k, v)| (k.clone(), Value::from(*v)))
                    .collect(),
            )),
            (_, StepStateKind::Stats(s)) => {
                // Assignments first, so values survive even before the first
                // evaluation computes the slot list; then Null for every
                // still-unassigned slot.
                let mut fields: serde_json::Map<String, Value> = s
                    .assignments
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                for slot in &s.slots {
                    fields.entry(slot.key.clone()).or_insert(Value::Null);
                }
                Some(Value::Object(fields))
            }
            _ => None,
        }
    }
}

impl From<NumericStep> for StepKind {
    fn from(step: NumericStep) -> Self {
        Self::Numeric(step)
    }
}

impl From<TextStep> for StepKind {
    fn from(step: TextStep) -> Self {
        Self::Text(step)
    }
}

impl From<SelectStep> for StepKind {
    fn from(step: SelectStep) -> Self {
        Self::Select(step)
    }
}

impl From<ChecklistStep> for StepKind {
    fn from(step: ChecklistStep) -> Self {
        Self::Checklist(step)
    }
}

impl From<NoteStep> for StepKind {
    fn from(step: NoteStep) -> Self {
        Self::Note(step)
    }
}

impl From<PoolStep> for StepKind {
    fn from(step: PoolStep) -> Self {
        Self::Pool(step)
    }
}

impl From<StatAssignStep> for StepKind {
    fn from(step: StatAssignStep) -> Self {
        Self::Stats(step)
    }
}

impl From<ContainerStep> for StepKind {
    fn from(step: ContainerStep) -> Self {
        Self::Container(step)
    }
}

impl From<ForEachStep> for StepKind {
    fn from(step: ForEachStep) -> Self {
        Self::ForEach(step)
    }
}
