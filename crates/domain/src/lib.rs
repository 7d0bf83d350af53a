//! Chargen Domain - Step-graph evaluation core for character-builder wizards
//!
//! Models a wizard as a tree of composable step nodes (simple fields,
//! containers, repeated groups, point pools, conditionally visible steps),
//! recomputes affected downstream state whenever one step changes, and tracks
//! which step the user is currently allowed to be on.
//!
//! # Design Philosophy
//!
//! - **Closed variant model**: every step behavior is one arm of
//!   [`steps::StepKind`]; dispatch lives in one place instead of a subclass
//!   hierarchy.
//! - **Pure core**: no I/O, no async. A recomputation pass is a total
//!   function from `(source, data, prior state, edit)` to
//!   `(new state, new data)`; errors exist only for malformed calls.
//! - **State replaced wholesale**: step state is cloned, patched, and
//!   recomputed each pass, never mutated across passes. The caller commits
//!   the returned clone.

pub mod data;
pub mod error;
pub mod runner;
pub mod state;
pub mod steps;
pub mod view;

pub use data::{CharacterData, DataPath, SourceData};
pub use error::DomainError;
pub use runner::{
    BuilderKey, CharacterFactory, PdfFieldsFn, StepList, StepUpdateOutcome, Wizard,
};
pub use state::{
    ChecklistState, IterationsState, NoteState, NumericState, PoolState, RunnerState, SelectState,
    StatsState, StepPatch, StepState, StepStateKind, TextState,
};
pub use steps::{
    ChecklistStep, ChoiceOption, ContainerStep, DataTarget, ForEachStep, NoteStep, NumericStep,
    PoolDef, PoolStep, Predicate, SelectStep, SlotDef, StatAssignStep, Step, StepKind, TextStep,
};
pub use view::{IterationView, PoolView, SlotView, StepView, StepViewBody};
