//! ForEach composite step

use std::sync::Arc;

use serde_json::Value;

use super::Eval;
use crate::data::{CharacterData, DataPath, SourceData};
use crate::error::DomainError;
use crate::runner::StepList;
use crate::state::{IterationsState, StepPatch};

/// Factory for the data slice of a freshly created iteration.
pub type ItemFactory = Arc<dyn Fn(&SourceData, &CharacterData, usize) -> Value + Send + Sync>;

/// Per-iteration display label.
pub type ItemLabel = Arc<dyn Fn(&SourceData, &Value, usize) -> String + Send + Sync>;

/// Repeats a child step sequence once per element of a dynamically sized
/// collection in the character document.
///
/// Every pass resizes both the iteration-data array and the iteration-state
/// vector to the runner-computed count: surplus entries are truncated,
/// missing ones are freshly initialized through the item factory. Each
/// iteration's children run against a synthetic `{ item, index, parent }`
/// document so they can read sibling iterations and the parent, and the
/// resulting `item` is written back into the array.
#[derive(Clone)]
pub struct ForEachStep {
    collection: DataPath,
    count: Eval<usize>,
    item_factory: ItemFactory,
    item_label: ItemLabel,
    steps: StepList,
}

impl ForEachStep {
    pub fn new(
        collection: impl Into<DataPath>,
        count: impl Fn(&SourceData, &CharacterData) -> usize + Send + Sync + 'static,
        steps: StepList,
    ) -> Self {
        Self {
            collection: collection.into(),
            count: Arc::new(count),
            item_factory: Arc::new(|_, _, _| Value::Object(serde_json::Map::new())),
            item_label: Arc::new(|_, _, index| format!("Entry {}", index + 1)),
            steps,
        }
    }

    /// Initial data slice for a newly created iteration.
    pub fn item_factory(
        mut self,
        factory: impl Fn(&SourceData, &CharacterData, usize) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.item_factory = Arc::new(factory);
        self
    }

    /// Display label for one iteration.
    pub fn labeled_by(
        mut self,
        label: impl Fn(&SourceData, &Value, usize) -> String + Send + Sync + 'static,
    ) -> Self {
        self.item_label = Arc::new(label);
        self
    }

    pub fn steps(&self) -> &StepList {
        &self.steps
    }

    pub(crate) fn clear(&self, state: &mut IterationsState) {
        for runner in &mut state.runners {
            self.steps.clear_states(runner);
        }
    }

    /// Seed one child runner per element already present in the imported
    /// array; the next evaluation resizes to the computed count.
    pub(crate) fn hydrate(&self, data: &CharacterData, state: &mut IterationsState) {
        let Some(items) = data.get(&self.collection).and_then(Value::as_array) else {
            return;
        };
        state.runners = items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let scoped = CharacterData::for_iteration(
                    item.clone(),
                    index,
                    data.clone().into_value(),
                );
                let mut runner = self.steps.initialize_states();
                self.steps.hydrate_states(&scoped, &mut runner);
                runner
            })
            .collect();
        state.labels.clear();
    }

    /// Parent document as seen by iteration children: the current character
    /// data with the iteration array swapped in, so earlier siblings already
    /// reflect this pass.
    fn parent_view(&self, data: &CharacterData, items: &[Value]) -> Value {
        let mut parent = data.clone();
        parent.set(&self.collection, Value::Array(items.to_vec()));
        parent.into_value()
    }

    pub(crate) fn update(
        &self,
        source: &SourceData,
        data: &mut CharacterData,
        state: &mut IterationsState,
    ) -> bool {
        let count = (self.count)(source, data);

        let mut items = data
            .get(&self.collection)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        items.truncate(count);
        while items.len() < count {
            let index = items.len();
            items.push((self.item_factory)(source, data, index));
        }

        state.runners.truncate(count);
        while state.runners.len() < count {
            state.runners.push(self.steps.initialize_states());
        }

        state.labels.clear();
        let mut all_complete = true;
        for index in 0..count {
            let parent = self.parent_view(data, &items);
            let mut scoped = CharacterData::for_iteration(items[index].clone(), index, parent);
            let prior = std::mem::take(&mut state.runners[index].steps);
            state.runners[index] = self.steps.evaluate(source, &mut scoped, prior, None);
            all_complete &= state.runners[index].is_settled();
            items[index] = scoped.into_iteration_item();
            state.labels.push((self.item_label)(source, &items[index], index));
        }

        data.set(&self.collection, Value::Array(items));
        all_complete
    }

    /// Write every tracked iteration back into the parent array. Length
    /// management happens only during `update`; here surplus array entries
    /// are left alone so data imported ahead of the first evaluation
    /// survives.
    pub(crate) fn update_character(
        &self,
        source: &SourceData,
        state: &IterationsState,
        data: &mut CharacterData,
    ) {
        let Some(items) = data.get(&self.collection).and_then(Value::as_array) else {
            return;
        };
        let mut items = items.clone();
        let tracked = state.runners.len().min(items.len());
        for index in 0..tracked {
            let parent = self.parent_view(data, &items);
            let mut scoped = CharacterData::for_iteration(items[index].clone(), index, parent);
            self.steps
                .update_character_all(source, &state.runners[index], &mut scoped);
            items[index] = scoped.into_iteration_item();
        }
        data.set(&self.collection, Value::Array(items));
    }

    pub(crate) fn apply_patch(
        &self,
        state: &mut IterationsState,
        iteration: usize,
        child: usize,
        patch: &StepPatch,
    ) -> Result<(), DomainError> {
        let iterations = state.runners.len();
        let runner = state
            .runners
            .get_mut(iteration)
            .ok_or_else(|| DomainError::iteration_out_of_range(iteration, iterations))?;
        let step = self
            .steps
            .get(child)
            .ok_or_else(|| DomainError::step_out_of_range(child, self.steps.len()))?;
        let tracked = runner.steps.len();
        let child_state = runner
            .steps
            .get_mut(child)
            .ok_or_else(|| DomainError::step_out_of_range(child, tracked))?;
        step.apply_patch(child_state, patch)
    }
}
