use thiserror::Error;

/// Every way a formula can fail to parse or evaluate. All variants are
/// plain values — nothing in this crate panics on user input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormulaError {
    #[error("Syntax error at position {position}: {message}")]
    Syntax { position: usize, message: String },

    #[error("Unknown identifier: {0}")]
    UnknownIdentifier(String),

    #[error("Disallowed construct: {0}")]
    DisallowedConstruct(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Arithmetic overflow: result is not a finite number")]
    Overflow,

    #[error("Evaluation exceeded the step budget of {0}")]
    Timeout(usize),
}

impl FormulaError {
    pub(crate) fn syntax(position: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            position,
            message: message.into(),
        }
    }
}
