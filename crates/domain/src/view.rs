//! Render-model projection
//!
//! The engine never draws anything. Each step projects a [`StepView`]
//! carrying everything a renderer needs: current value, options, bounds,
//! labels, child views. Edits travel back as `(step_index, StepPatch)`
//! through the session layer.
//!
//! Views are pure projections of step state; no source or character data is
//! consulted, because recomputation already stored options and labels in the
//! state.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::runner::StepList;
use crate::state::{RunnerState, StepState, StepStateKind};
use crate::steps::{ChoiceOption, SlotDef, Step, StepKind};

/// Render model for one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepView {
    pub name: String,
    pub label: String,
    pub index: usize,
    pub required: bool,
    pub visible: bool,
    pub completed: bool,
    pub body: StepViewBody,
}

/// Per-kind render payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepViewBody {
    Numeric {
        value: Option<i64>,
        min: i64,
        max: i64,
    },
    Text {
        value: Option<String>,
    },
    Select {
        value: Option<String>,
        options: Vec<ChoiceOption>,
    },
    Checklist {
        values: Vec<String>,
        options: Vec<ChoiceOption>,
        /// Render hint: a checklist capped at one selection draws as a
        /// dropdown.
        as_dropdown: bool,
    },
    Note {
        text: String,
    },
    Pool {
        total: i64,
        remaining: i64,
        pools: Vec<PoolView>,
    },
    Stats {
        slots: Vec<SlotView>,
        available: Vec<Value>,
    },
    Container {
        current_step: usize,
        children: Vec<StepView>,
    },
    ForEach {
        iterations: Vec<IterationView>,
    },
}

/// One pool row: definition plus the current allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolView {
    pub key: String,
    pub label: String,
    pub max: Option<i64>,
    pub allocated: i64,
}

/// One assignment slot: definition plus the currently held choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotView {
    pub key: String,
    pub label: String,
    pub locked: bool,
    pub assigned: Option<Value>,
}

/// One ForEach iteration: label plus child step views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationView {
    pub label: String,
    pub current_step: usize,
    pub children: Vec<StepView>,
}

pub(crate) fn project_step(step: &Step, state: &StepState) -> StepView {
    let body = body_of(step, &state.kind)
        .or_else(|| body_of(step, &step.kind().initial_state()))
        .unwrap_or(StepViewBody::Note {
            text: String::new(),
        });
    StepView {
        name: step.name().to_string(),
        label: step.label().to_string(),
        index: step.index(),
        required: step.required(),
        visible: state.visible,
        completed: state.completed,
        body,
    }
}

fn project_children(steps: &StepList, state: &RunnerState) -> Vec<StepView> {
    steps
        .steps()
        .iter()
        .zip(state.steps.iter())
        .map(|(step, state)| project_step(step, state))
        .collect()
}

fn slot_view(def: &SlotDef, assigned: Option<&Value>) -> SlotView {
    SlotView {
        key: def.key.clone(),
        label: def.label.clone(),
        locked: def.locked.is_some(),
        assigned: assigned.cloned(),
    }
}

fn body_of(step: &Step, payload: &StepStateKind) -> Option<StepViewBody> {
    match (step.kind(), payload) {
        (_, StepStateKind::Numeric(s)) => Some(StepViewBody::Numeric {
            value: s.value,
            min: s.min,
            max: s.max,
        }),
        (_, StepStateKind::Text(s)) => Some(StepViewBody::Text {
            value: s.value.clone(),
        }),
        (_, StepStateKind::Select(s)) => Some(StepViewBody::Select {
            value: s.value.clone(),
            options: s.options.clone(),
        }),
        (StepKind::Checklist(cfg), StepStateKind::Checklist(s)) => Some(StepViewBody::Checklist {
            values: s.values.clone(),
            options: s.options.clone(),
            as_dropdown: cfg.renders_as_dropdown(),
        }),
        (_, StepStateKind::Note(s)) => Some(StepViewBody::Note {
            text: s.text.clone(),
        }),
        (_, StepStateKind::Pool(s)) => Some(StepViewBody::Pool {
            total: s.total,
            remaining: s.remaining,
            pools: s
                .pools
                .iter()
                .map(|def| PoolView {
                    key: def.key.clone(),
                    label: def.label.clone(),
                    max: def.max,
                    allocated: s.allocations.get(&def.key).copied().unwrap_or(0),
                })
                .collect(),
        }),
        (_, StepStateKind::Stats(s)) => Some(StepViewBody::Stats {
            slots: s
                .slots
                .iter()
                .map(|def| slot_view(def, s.assignments.get(&def.key)))
                .collect(),
            available: s.available.clone(),
        }),
        (StepKind::Container(cfg), StepStateKind::Runner(rs)) => Some(StepViewBody::Container {
            current_step: rs.current_step,
            children: project_children(cfg.steps(), rs),
        }),
        (StepKind::ForEach(cfg), StepStateKind::Iterations(s)) => Some(StepViewBody::ForEach {
            iterations: s
                .runners
                .iter()
                .enumerate()
                .map(|(index, runner)| IterationView {
                    label: s
                        .labels
                        .get(index)
                        .cloned()
                        .unwrap_or_else(|| format!("Entry {}", index + 1)),
                    current_step: runner.current_step,
                    children: project_children(cfg.steps(), runner),
                })
                .collect(),
        }),
        _ => None,
    }
}
