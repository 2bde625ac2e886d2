use thiserror::Error;

use crate::frontend::lexer::Span;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("{span}: undeclared identifier '{name}'")]
    Undeclared { name: String, span: Span },

    #[error("{span}: '{name}' is already declared in this {scope} scope")]
    Duplicate {
        name: String,
        span: Span,
        scope: &'static str,
    },

    #[error("{span}: too many local variables, '{name}' would need slot {slot} (at most 255)")]
    TooManyLocals {
        name: String,
        span: Span,
        slot: usize,
    },

    #[error("internal: identifier '{name}' at {span} resolved twice")]
    ResolvedTwice { name: String, span: Span },
}
