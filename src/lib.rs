//! # simplec
//!
//! Compiler for a small dynamically typed scripting language. Source text is
//! tokenized, parsed into an AST, every identifier is resolved to its
//! storage, and the code generator emits one bytecode chunk per function
//! (plus the main chunk) through the assembler in [`bytecode`].
//!
//! ```text
//! source -> frontend (tokens, AST) -> resolve -> codegen -> bytecode
//! ```

pub mod bytecode;
pub mod codegen;
pub mod error;
pub mod frontend;
pub mod lang;
pub mod resolve;
pub mod stdlib;

use std::path::PathBuf;

use tracing::{debug, info};

use crate::bytecode::Bytecode;
use crate::frontend::lexer::Lexer;
use crate::frontend::token_dumper::TokenDumper;
use crate::stdlib::BuiltInFunction;

pub use error::{Error, Result};

/// What the command line asked for.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Print the assembly listing after compiling.
    pub asm: bool,
    /// Dump the token stream and stop.
    pub tokens: bool,
    pub no_color: bool,
    /// Token dump shows source text instead of Debug form.
    pub pretty: bool,
    /// Print the parsed AST as an indented tree and stop.
    pub ast: bool,
    /// Also write the structured (postcard) form of the bytecode here.
    pub emit_ir: Option<PathBuf>,
}

/// Result of compiling one source file.
#[derive(Debug, Clone)]
pub struct Compilation {
    pub bytecode: Bytecode,
    pub assembly: String,
}

/// Runs the whole pipeline over `source` with the given built-in functions.
pub fn compile_source(source: &str, builtins: &[BuiltInFunction]) -> Result<Compilation> {
    let program = frontend::parse_source(source)?;
    debug!(statements = program.statements.len(), "parsed program");

    let resolution = resolve::resolve(builtins, &program)?;
    debug!(
        identifiers = resolution.identifiers.len(),
        blocks = resolution.block_sizes.len(),
        "resolved identifiers"
    );

    let builder = codegen::generate(builtins, &resolution, &program)?;
    let bytecode = builder.finalize()?;
    let assembly = builder.assembly()?;
    debug!(chunks = bytecode.chunks.len(), "generated bytecode");

    Ok(Compilation { bytecode, assembly })
}

/// Executes one command-line invocation. Listings go to stdout.
pub fn run(options: &CompileOptions) -> Result<()> {
    info!(input = %options.input.display(), "reading source");
    let source = std::fs::read_to_string(&options.input)?;

    if options.tokens {
        let tokens = Lexer::new(&source)
            .tokenize()
            .map_err(frontend::parser_error::SyntaxErrors::from)?;
        let mut dumper = TokenDumper::new();
        if options.no_color {
            dumper = dumper.no_color();
        }
        if options.pretty {
            dumper = dumper.pretty();
        }
        dumper.dump(&tokens);
        return Ok(());
    }

    if options.ast {
        let program = frontend::parse_source(&source)?;
        print!("{}", lang::walk::render_tree(&program));
        return Ok(());
    }

    let compilation = compile_source(&source, &stdlib::builtins())?;
    if options.asm {
        print!("{}", compilation.assembly);
    }

    compilation.bytecode.write(&options.output)?;
    info!(output = %options.output.display(), "wrote bytecode");

    if let Some(path) = &options.emit_ir {
        std::fs::write(path, compilation.bytecode.to_ir_bytes()?)?;
        info!(path = %path.display(), "wrote bytecode IR");
    }
    Ok(())
}
