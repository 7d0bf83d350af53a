//! Numeric entry step

use super::Eval;
use crate::data::{CharacterData, SourceData};
use crate::state::NumericState;
use std::sync::Arc;

/// Numeric entry, clamped to inclusive bounds computed from source +
/// character data every pass.
#[derive(Clone)]
pub struct NumericStep {
    bounds: Eval<(i64, i64)>,
    default: Option<Eval<i64>>,
}

impl NumericStep {
    pub fn new(
        bounds: impl Fn(&SourceData, &CharacterData) -> (i64, i64) + Send + Sync + 'static,
    ) -> Self {
        Self {
            bounds: Arc::new(bounds),
            default: None,
        }
    }

    /// Fixed bounds independent of wizard state.
    pub fn fixed(min: i64, max: i64) -> Self {
        Self::new(move |_, _| (min, max))
    }

    /// Snap an empty value to a computed default (clamped to the current
    /// bounds) when the step is evaluated.
    pub fn default_with(
        mut self,
        default: impl Fn(&SourceData, &CharacterData) -> i64 + Send + Sync + 'static,
    ) -> Self {
        self.default = Some(Arc::new(default));
        self
    }

    /// Snap an empty value to a fixed default.
    pub fn default_to(self, value: i64) -> Self {
        self.default_with(move |_, _| value)
    }

    pub(crate) fn update(
        &self,
        source: &SourceData,
        data: &CharacterData,
        state: &mut NumericState,
        required: bool,
    ) -> bool {
        let (min, max) = (self.bounds)(source, data);
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        state.min = min;
        state.max = max;
        state.value = match state.value {
            Some(value) => Some(value.clamp(min, max)),
            None => self
                .default
                .as_ref()
                .map(|default| default(source, data).clamp(min, max)),
        };
        state.value.is_some() || !required
    }
}
