use thiserror::Error;

/// Errors raised when a data contract of the training core is violated.
///
/// None of these are transient: they abort the current call instead of
/// substituting defaults.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("action mask allows no actions")]
    InvalidMask,
    #[error("transition batch is empty")]
    EmptyBatch,
    #[error("field `{field}` has length {found}, expected {expected}")]
    ShapeMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("gradients do not match the network's parameter structure")]
    StructureMismatch,
}
