use thiserror::Error;

use crate::frontend::lexer::LexerError;

/// A parsing error with source location.
///
/// `line` and `col` are 1-based positions coming from the lexer spans.
/// For EOF-ish errors (e.g. missing `}` or `;`), the parser will use the
/// last consumed token's span as a fallback so locations are never `0:0`.
#[derive(Debug, Clone, Error)]
#[error("{line}:{col}: {message}")]
pub struct ParserError {
    pub message: String,
    pub line: usize,
    pub col: usize,
}

impl From<LexerError> for ParserError {
    fn from(e: LexerError) -> Self {
        ParserError {
            message: e.message,
            line: e.line,
            col: e.col,
        }
    }
}

/// Every syntax error found in one source file.
///
/// Reported as a single failure; later stages never see a program that
/// produced one of these.
#[derive(Debug, Clone)]
pub struct SyntaxErrors {
    pub errors: Vec<ParserError>,
}

impl SyntaxErrors {
    pub fn first(&self) -> Option<&ParserError> {
        self.errors.first()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl From<LexerError> for SyntaxErrors {
    fn from(e: LexerError) -> Self {
        SyntaxErrors {
            errors: vec![e.into()],
        }
    }
}

impl std::fmt::Display for SyntaxErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "syntax error at {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for SyntaxErrors {}
