use crate::bytecode::AssembleError;
use crate::frontend::lexer::Span;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// An identifier without a resolution entry
    Unresolved { name: String, span: Span },
    /// Assignment to a binding that cannot be written (a built-in function)
    NotAssignable {
        name: String,
        span: Span,
        hint: Option<String>,
    },
    /// Assembling the generated code failed
    Assemble(AssembleError),
    /// Internal compiler error (shouldn't happen in normal use)
    Internal(String),
}

impl CompileError {
    /// Create an error for an identifier the resolver never saw
    pub fn unresolved(name: &str, span: Span) -> Self {
        CompileError::Unresolved {
            name: name.to_string(),
            span,
        }
    }

    /// Create an error for assigning to a built-in function
    pub fn assign_to_builtin(name: &str, span: Span) -> Self {
        CompileError::NotAssignable {
            name: name.to_string(),
            span,
            hint: Some(format!(
                "'{}' is a built-in function; declare a new variable with 'var' instead",
                name
            )),
        }
    }

    /// Create an internal compiler error
    pub fn internal(msg: impl Into<String>) -> Self {
        CompileError::Internal(msg.into())
    }
}

impl From<AssembleError> for CompileError {
    fn from(err: AssembleError) -> Self {
        CompileError::Assemble(err)
    }
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::Unresolved { name, span } => {
                write!(
                    f,
                    "compile error: internal error: identifier '{}' at {} was not resolved",
                    name, span
                )
            }
            CompileError::NotAssignable { name, span, hint } => {
                write!(f, "compile error: {}: cannot assign to '{}'", span, name)?;
                if let Some(h) = hint {
                    write!(f, "\n  hint: {}", h)?;
                }
                Ok(())
            }
            CompileError::Assemble(err) => write!(f, "compile error: {}", err),
            CompileError::Internal(msg) => {
                write!(f, "compile error: internal error: {}", msg)
            }
        }
    }
}

impl std::error::Error for CompileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CompileError::Assemble(err) => Some(err),
            _ => None,
        }
    }
}
