//! Bytecode model and assembler.
//!
//! Code generation produces [`Code`] fragments; a [`BytecodeBuilder`] applies
//! them to per-chunk builders, resolves labels into jump offsets and
//! finalizes everything into a [`Bytecode`] value with a fixed binary form.

pub mod assemble_error;
pub mod builder;
pub mod chunk;
pub mod code;
pub mod constant;
pub mod disasm;
pub mod dsl;
pub mod ir;
pub mod op;

pub use assemble_error::AssembleError;
pub use builder::{BytecodeBuilder, ChunkRef};
pub use chunk::{ChunkBuilder, Label};
pub use code::{ChunkEmitter, Code};
pub use ir::{Bytecode, Chunk, Constant, DecodeError};
pub use op::{Instruction, Opcode};
