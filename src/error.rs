use thiserror::Error;

use crate::bytecode::AssembleError;
use crate::codegen::CompileError;
use crate::frontend::parser_error::SyntaxErrors;
use crate::resolve::ResolveError;

/// Any failure of the compilation pipeline.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Syntax(#[from] SyntaxErrors),

    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("{0}")]
    Compile(#[from] CompileError),

    #[error("failed to encode bytecode IR: {0}")]
    Ir(#[from] postcard::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<AssembleError> for Error {
    fn from(err: AssembleError) -> Self {
        Error::Compile(CompileError::Assemble(err))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
