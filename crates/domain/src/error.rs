//! Unified error type for the domain layer
//!
//! The recompute pass itself is total: invalid field input is clamped or
//! filtered during recomputation and never surfaces as an error. Errors exist
//! only for malformed engine calls, such as an out-of-range step index or a
//! patch whose shape does not match the step it targets.

use thiserror::Error;

/// Unified error type for domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The changed-step index does not address a step in the runner
    #[error("Step index {index} out of range: runner has {len} steps")]
    StepOutOfRange { index: usize, len: usize },

    /// The iteration index does not address a ForEach iteration
    #[error("Iteration {index} out of range: step has {len} iterations")]
    IterationOutOfRange { index: usize, len: usize },

    /// A patch was supplied whose shape does not match the targeted step
    #[error("Patch kind '{patch}' does not match step state kind '{step}'")]
    PatchMismatch {
        step: &'static str,
        patch: &'static str,
    },

    /// A patch was supplied without naming the step it applies to
    #[error("Patch supplied without a changed step index")]
    PatchWithoutStep,
}

impl DomainError {
    /// Create a step-out-of-range error
    pub fn step_out_of_range(index: usize, len: usize) -> Self {
        Self::StepOutOfRange { index, len }
    }

    /// Create an iteration-out-of-range error
    pub fn iteration_out_of_range(index: usize, len: usize) -> Self {
        Self::IterationOutOfRange { index, len }
    }

    /// Creates a patch-mismatch error.
    ///
    /// Use this when a field-level patch targets a step whose state payload
    /// has a different shape (e.g. a numeric patch sent to a checklist step).
    /// The stored state is left untouched in that case.
    pub fn patch_mismatch(step: &'static str, patch: &'static str) -> Self {
        Self::PatchMismatch { step, patch }
    }
}
