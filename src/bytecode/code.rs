//! Deferred code fragments.
//!
//! A [`Code`] value is a piece of code generation that has not happened yet.
//! Applying it to a [`ChunkEmitter`] appends its instructions to the chunk the
//! emitter is building. Control-flow lowering relies on this: a combinator
//! receives its operands as fragments and decides where they land.

use crate::bytecode::assemble_error::AssembleError;
use crate::bytecode::builder::{BytecodeBuilder, ChunkRef};
use crate::bytecode::chunk::{ChunkBuilder, Directive, Label};
use crate::bytecode::constant::ConstantValue;
use crate::bytecode::op::{Instruction, Opcode};

pub type EmitResult = Result<(), AssembleError>;

type EmitFn<'a> = dyn FnOnce(&mut ChunkEmitter<'_>) -> EmitResult + 'a;

/// A deferred emission into a chunk.
pub struct Code<'a>(Box<EmitFn<'a>>);

impl<'a> Code<'a> {
    pub fn new(f: impl FnOnce(&mut ChunkEmitter<'_>) -> EmitResult + 'a) -> Self {
        Code(Box::new(f))
    }

    /// A fragment that emits nothing.
    pub fn empty() -> Self {
        Code::new(|_| Ok(()))
    }

    pub fn emit_into(self, emitter: &mut ChunkEmitter<'_>) -> EmitResult {
        (self.0)(emitter)
    }
}

impl std::fmt::Debug for Code<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Code(..)")
    }
}

/// Write access to the chunk under construction plus the program around it.
///
/// The chunk is held apart from the `BytecodeBuilder` while it is being built,
/// so fragments can add nested chunks (function bodies) mid-emission.
pub struct ChunkEmitter<'b> {
    bytecode: &'b mut BytecodeBuilder,
    chunk: &'b mut ChunkBuilder,
}

impl<'b> ChunkEmitter<'b> {
    pub fn new(bytecode: &'b mut BytecodeBuilder, chunk: &'b mut ChunkBuilder) -> Self {
        ChunkEmitter { bytecode, chunk }
    }

    pub fn chunk(&self) -> &ChunkBuilder {
        self.chunk
    }

    /// Applies a fragment at the current position.
    pub fn add(&mut self, code: Code<'_>) -> EmitResult {
        code.emit_into(self)
    }

    pub fn emit(&mut self, instruction: Instruction) {
        self.chunk.push(Directive::Instr(instruction));
    }

    pub fn op(&mut self, opcode: Opcode) {
        self.emit(Instruction::simple(opcode));
    }

    pub fn op_with(&mut self, opcode: Opcode, argument: u8) {
        self.emit(Instruction::with_argument(opcode, argument));
    }

    pub fn store_constant(&mut self, constant: ConstantValue) -> Result<u8, AssembleError> {
        self.chunk.store_constant(constant)
    }

    /// Emits `opcode @index` where `index` is the pooled `constant`.
    pub fn op_constant(&mut self, opcode: Opcode, constant: ConstantValue) -> EmitResult {
        let index = self.store_constant(constant)?;
        self.op_with(opcode, index);
        Ok(())
    }

    pub fn loose_label(&mut self, name: &'static str) -> Label {
        self.chunk.loose_label(Some(name))
    }

    pub fn place_label(&mut self, label: Label) -> EmitResult {
        self.chunk.place_label(label)
    }

    /// Jump to `dest`, forward or backward depending on where it ends up.
    pub fn jump_to(&mut self, dest: Label) -> EmitResult {
        let this = self.chunk.loose_label(None);
        self.chunk.push(Directive::Jump { dest, this });
        self.chunk.place_label(this)
    }

    pub fn jump_forward_if_false(&mut self, dest: Label) -> EmitResult {
        let this = self.chunk.loose_label(None);
        self.chunk.push(Directive::JumpIfFalse { dest, this });
        self.chunk.place_label(this)
    }

    /// Reference to the chunk being built.
    pub fn self_ref(&self) -> ChunkRef {
        self.chunk.self_ref()
    }

    pub fn chunk_named(&self, name: &str) -> Option<ChunkRef> {
        self.bytecode.chunk_named(name)
    }

    /// Builds a function chunk now; see [`BytecodeBuilder::add_function`].
    pub fn add_function(&mut self, name: &str, arity: u8, body: Code<'_>) -> Result<ChunkRef, AssembleError> {
        self.bytecode.add_function(name, arity, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragments_run_in_application_order() {
        let mut builder = BytecodeBuilder::new();
        let first = Code::new(|e| {
            e.op(Opcode::True);
            Ok(())
        });
        let second = Code::new(|e| {
            e.op(Opcode::Pop);
            Ok(())
        });
        // applied in reverse of creation order
        builder
            .main(Code::new(move |e| {
                e.add(second)?;
                e.add(first)
            }))
            .unwrap();
        let bytecode = builder.finalize().unwrap();
        assert_eq!(bytecode.chunks[0].code, vec![0x04, 0x02]);
    }

    #[test]
    fn test_empty_fragment() {
        let mut builder = BytecodeBuilder::new();
        builder.main(Code::empty()).unwrap();
        let bytecode = builder.finalize().unwrap();
        assert!(bytecode.chunks[0].code.is_empty());
    }

    #[test]
    fn test_error_stops_emission() {
        let mut builder = BytecodeBuilder::new();
        let err = builder
            .main(Code::new(|e| {
                let label = e.loose_label("twice");
                e.place_label(label)?;
                e.place_label(label)?;
                e.op(Opcode::Pop);
                Ok(())
            }))
            .unwrap_err();
        assert!(matches!(err, AssembleError::LabelPlacedTwice { .. }));
    }

    #[test]
    fn test_nested_chunk_from_fragment() {
        let mut builder = BytecodeBuilder::new();
        builder
            .main(Code::new(|e| {
                let inner = e.add_function(
                    "inner",
                    0,
                    Code::new(|e| {
                        e.op(Opcode::Null);
                        e.op(Opcode::Return);
                        Ok(())
                    }),
                )?;
                e.op_constant(Opcode::Constant, inner.into())
            }))
            .unwrap();
        let bytecode = builder.finalize().unwrap();
        assert_eq!(bytecode.chunks.len(), 2);
        assert_eq!(bytecode.chunks[1].name.as_deref(), Some("inner"));
    }
}
