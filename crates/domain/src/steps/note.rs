//! Static/computed text step

use super::Eval;
use crate::data::{CharacterData, SourceData};
use crate::state::NoteState;
use std::sync::Arc;

/// Pure projection of source + character data into display text. Takes no
/// user input and is always complete.
#[derive(Clone)]
pub struct NoteStep {
    text: Eval<String>,
}

impl NoteStep {
    pub fn new(
        text: impl Fn(&SourceData, &CharacterData) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            text: Arc::new(text),
        }
    }

    pub fn fixed(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(move |_, _| text.clone())
    }

    pub(crate) fn update(
        &self,
        source: &SourceData,
        data: &CharacterData,
        state: &mut NoteState,
    ) -> bool {
        state.text = (self.text)(source, data);
        true
    }
}
