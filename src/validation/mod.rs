pub mod structural;
pub mod temporal;

pub use structural::*;
pub use temporal::*;

/// Outcome of validating one alignment attempt.
///
/// Errors are plain feedback sentences meant to be shown to the model;
/// validation never fails with an `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    /// Whether the attempt passed
    pub is_valid: bool,
    /// One feedback sentence per violation
    pub errors: Vec<String>,
}

impl Validation {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: vec![],
        }
    }

    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }

    /// Concatenated feedback text; empty when the attempt passed
    pub fn feedback(&self) -> String {
        self.errors.join("\n")
    }
}
