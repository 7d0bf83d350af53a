//! Per-step state records and field-level patches
//!
//! Every step owns one [`StepState`]: the two universal flags plus a payload
//! matching its step kind. State is replaced wholesale on every recomputation
//! pass; the prior vector is cloned, the incoming [`StepPatch`] (if any) is
//! merged into the changed step's entry, and then recomputation runs.
//!
//! State carries everything a renderer needs (current options, bounds, labels)
//! so that projecting a view requires no further access to source or character
//! data.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::steps::{ChoiceOption, PoolDef, SlotDef};

// =============================================================================
// Runner state
// =============================================================================

/// State of one ordered step list: the cursor plus one entry per step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerState {
    /// Index of the first not-yet-completed step; equals `steps.len()` when
    /// every step is complete. Recomputed every pass, never carried over.
    pub current_step: usize,
    /// One entry per step, indexed identically to the owning step list.
    pub steps: Vec<StepState>,
}

impl RunnerState {
    pub fn is_settled(&self) -> bool {
        self.current_step == self.steps.len()
    }
}

// =============================================================================
// Step state
// =============================================================================

/// State of a single step: the universal flags plus the per-kind payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepState {
    /// Whether this step currently satisfies its completion rule.
    pub completed: bool,
    /// Whether this step is currently shown. Invisible steps are forced
    /// completed and their value fields cleared.
    pub visible: bool,
    pub kind: StepStateKind,
}

/// Per-kind state payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepStateKind {
    Numeric(NumericState),
    Text(TextState),
    Select(SelectState),
    Checklist(ChecklistState),
    Note(NoteState),
    Pool(PoolState),
    Stats(StatsState),
    /// Container: the child runner's full state.
    Runner(RunnerState),
    /// ForEach: one child runner per iteration.
    Iterations(IterationsState),
}

impl StepStateKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Numeric(_) => "numeric",
            Self::Text(_) => "text",
            Self::Select(_) => "select",
            Self::Checklist(_) => "checklist",
            Self::Note(_) => "note",
            Self::Pool(_) => "pool",
            Self::Stats(_) => "stats",
            Self::Runner(_) => "container",
            Self::Iterations(_) => "for_each",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericState {
    pub value: Option<i64>,
    /// Inclusive bounds, recomputed from source + data every pass.
    pub min: i64,
    pub max: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextState {
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectState {
    pub value: Option<String>,
    /// Current option list, recomputed every pass.
    pub options: Vec<ChoiceOption>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistState {
    pub values: Vec<String>,
    pub options: Vec<ChoiceOption>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteState {
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolState {
    /// Allocated points per pool key; keys always match `pools`.
    pub allocations: BTreeMap<String, i64>,
    pub pools: Vec<PoolDef>,
    pub total: i64,
    pub remaining: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsState {
    /// Slot key to assigned choice; unassigned slots are absent.
    pub assignments: BTreeMap<String, Value>,
    /// Choices not currently assigned to any slot.
    pub available: Vec<Value>,
    pub slots: Vec<SlotDef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationsState {
    /// One child runner state per iteration, kept equal in length to the
    /// iteration-data array every pass.
    pub runners: Vec<RunnerState>,
    /// Per-iteration display labels.
    pub labels: Vec<String>,
}

// =============================================================================
// Patches
// =============================================================================

/// A field-level edit from the UI, merged into the changed step's prior state
/// before recomputation runs.
///
/// Composite variants recurse: a `Container` patch addresses a child step, a
/// `ForEach` patch addresses a child step within one iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepPatch {
    Numeric {
        value: Option<i64>,
    },
    Text {
        value: Option<String>,
    },
    Select {
        value: Option<String>,
    },
    Checklist {
        values: Vec<String>,
    },
    /// Set the allocation for one named pool. Clamping happens during the
    /// recomputation that follows, not here.
    Pool {
        pool: String,
        value: i64,
    },
    /// Assign a choice to one slot (`None` unassigns). Assigning a choice
    /// already held by another slot moves it.
    Stats {
        slot: String,
        choice: Option<Value>,
    },
    Container {
        child: usize,
        patch: Box<StepPatch>,
    },
    ForEach {
        iteration: usize,
        child: usize,
        patch: Box<StepPatch>,
    },
}

impl StepPatch {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Numeric { .. } => "numeric",
            Self::Text { .. } => "text",
            Self::Select { .. } => "select",
            Self::Checklist { .. } => "checklist",
            Self::Pool { .. } => "pool",
            Self::Stats { .. } => "stats",
            Self::Container { .. } => "container",
            Self::ForEach { .. } => "for_each",
        }
    }
}
