//! Stat/die assignment step

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Eval;
use crate::data::{CharacterData, SourceData};
use crate::state::StatsState;

/// Equality over interchangeable choice objects, supplied by the wizard
/// definition (e.g. compare rolled dice by their face value only).
pub type ChoiceEq = Arc<dyn Fn(&Value, &Value) -> bool + Send + Sync>;

/// One assignable slot (e.g. an ability-score name).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotDef {
    pub key: String,
    pub label: String,
    /// A locked slot always holds this value; patches against it are
    /// overridden on the next pass.
    #[serde(default)]
    pub locked: Option<Value>,
}

impl SlotDef {
    pub fn new(key: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            locked: None,
        }
    }

    pub fn locked_to(mut self, value: Value) -> Self {
        self.locked = Some(value);
        self
    }
}

/// Assign each slot one item from a pool of interchangeable choices.
///
/// Each assignment consumes one pool item, so no two unlocked slots can hold
/// the same choice; whatever is left over is exposed as `available`.
#[derive(Clone)]
pub struct StatAssignStep {
    slots: Eval<Vec<SlotDef>>,
    choices: Eval<Vec<Value>>,
    matches: ChoiceEq,
}

impl StatAssignStep {
    pub fn new(
        slots: impl Fn(&SourceData, &CharacterData) -> Vec<SlotDef> + Send + Sync + 'static,
        choices: impl Fn(&SourceData, &CharacterData) -> Vec<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            slots: Arc::new(slots),
            choices: Arc::new(choices),
            matches: Arc::new(|a, b| a == b),
        }
    }

    /// Replace structural equality with a caller-supplied match function.
    pub fn matched_by(
        mut self,
        matches: impl Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.matches = Arc::new(matches);
        self
    }

    /// Patch entry point: assign `choice` to `slot`, or unassign on `None`.
    /// A choice already held by another slot moves rather than duplicating.
    pub(crate) fn apply(&self, state: &mut StatsState, slot: &str, choice: &Option<Value>) {
        match choice {
            Some(choice) => {
                state.assignments.retain(|_, held| !(self.matches)(held, choice));
                state.assignments.insert(slot.to_string(), choice.clone());
            }
            None => {
                state.assignments.remove(slot);
            }
        }
    }

    pub(crate) fn update(
        &self,
        source: &SourceData,
        data: &CharacterData,
        state: &mut StatsState,
        required: bool,
    ) -> bool {
        let slots = (self.slots)(source, data);
        let mut pool = (self.choices)(source, data);

        let mut assignments = BTreeMap::new();
        for slot in &slots {
            let wanted = slot
                .locked
                .clone()
                .or_else(|| state.assignments.get(&slot.key).cloned());
            let Some(wanted) = wanted else { continue };

            let in_pool = pool.iter().position(|choice| (self.matches)(choice, &wanted));
            match (in_pool, slot.locked.is_some()) {
                (Some(i), _) => {
                    assignments.insert(slot.key.clone(), pool.remove(i));
                }
                // Locked slots hold their forced value even when the pool
                // does not offer it.
                (None, true) => {
                    assignments.insert(slot.key.clone(), wanted);
                }
                // Stale unlocked assignment; the choice is gone.
                (None, false) => {}
            }
        }

        state.assignments = assignments;
        state.available = pool;
        state.slots = slots;
        !required || state.available.is_empty()
    }
}
