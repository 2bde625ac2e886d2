//! In-progress chunk: constant pool, directive stream and labels.

use tracing::trace;

use crate::bytecode::assemble_error::AssembleError;
use crate::bytecode::builder::ChunkRef;
use crate::bytecode::constant::{ConstantPool, ConstantValue};
use crate::bytecode::ir::{Chunk, Constant};
use crate::bytecode::op::{Instruction, Opcode};

/// Largest encodable chunk code length (u16 length prefix).
pub const MAX_CODE_LEN: usize = u16::MAX as usize;

/// A jump target inside one chunk.
///
/// Created loose, placed at most once. Labels never reach the encoded form;
/// jumps carry resolved byte offsets instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(usize);

#[derive(Debug, Clone)]
struct LabelSlot {
    name: Option<&'static str>,
    position: Option<usize>,
}

/// One entry of a chunk's instruction stream.
///
/// Each directive knows its encoded length up front. Jumps are resolved to
/// concrete instructions only once every label is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Instr(Instruction),
    /// Unconditional jump; direction is decided from the label positions.
    Jump { dest: Label, this: Label },
    /// `JumpForwardIfFalse`; `dest` must not lie behind the jump.
    JumpIfFalse { dest: Label, this: Label },
}

impl Directive {
    pub fn byte_len(&self) -> usize {
        match self {
            Directive::Instr(instruction) => instruction.byte_len(),
            Directive::Jump { .. } | Directive::JumpIfFalse { .. } => 2,
        }
    }
}

#[derive(Debug)]
pub struct ChunkBuilder {
    name: Option<String>,
    self_ref: ChunkRef,
    constants: ConstantPool,
    directives: Vec<Directive>,
    /// Byte offset where the next directive will start.
    position: usize,
    labels: Vec<LabelSlot>,
}

impl ChunkBuilder {
    /// `name` is `None` for the main chunk.
    pub fn new(name: Option<String>, self_ref: ChunkRef) -> Self {
        ChunkBuilder {
            name,
            self_ref,
            constants: ConstantPool::new(),
            directives: Vec::new(),
            position: 0,
            labels: Vec::new(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name used in listings and error messages.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<main>")
    }

    pub fn self_ref(&self) -> ChunkRef {
        self.self_ref
    }

    pub fn constants(&self) -> &ConstantPool {
        &self.constants
    }

    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn store_constant(&mut self, constant: ConstantValue) -> Result<u8, AssembleError> {
        let chunk = self.display_name().to_string();
        self.constants.store(constant, &chunk)
    }

    pub fn push(&mut self, directive: Directive) {
        self.position += directive.byte_len();
        self.directives.push(directive);
    }

    pub fn loose_label(&mut self, name: Option<&'static str>) -> Label {
        self.labels.push(LabelSlot {
            name,
            position: None,
        });
        Label(self.labels.len() - 1)
    }

    /// Places `label` at the current byte offset.
    pub fn place_label(&mut self, label: Label) -> Result<(), AssembleError> {
        let position = self.position;
        let name = self.label_name(label);
        let slot = self
            .labels
            .get_mut(label.0)
            .ok_or_else(|| AssembleError::LabelNotPlaced {
                label: name.clone(),
            })?;
        if let Some(first) = slot.position {
            return Err(AssembleError::LabelPlacedTwice {
                label: name,
                first,
                second: position,
            });
        }
        slot.position = Some(position);
        trace!(chunk = %self.display_name(), label = %name, position, "label placed");
        Ok(())
    }

    pub fn label_position(&self, label: Label) -> Result<usize, AssembleError> {
        self.labels
            .get(label.0)
            .and_then(|slot| slot.position)
            .ok_or_else(|| AssembleError::LabelNotPlaced {
                label: self.label_name(label),
            })
    }

    /// `"<name> <id>"` for named labels, `"L<id>"` otherwise.
    pub fn label_name(&self, label: Label) -> String {
        match self.labels.get(label.0).and_then(|slot| slot.name) {
            Some(name) => format!("{} {}", name, label.0),
            None => format!("L{}", label.0),
        }
    }

    /// Named labels placed at `position`, in creation order.
    pub fn named_labels_at(&self, position: usize) -> Vec<Label> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.name.is_some() && slot.position == Some(position))
            .map(|(i, _)| Label(i))
            .collect()
    }

    /// Turns a directive into the instruction that will be encoded.
    pub fn resolve(&self, directive: &Directive) -> Result<Instruction, AssembleError> {
        match *directive {
            Directive::Instr(instruction) => Ok(instruction),
            Directive::Jump { dest, this } => {
                let dest_pos = self.label_position(dest)?;
                let this_pos = self.label_position(this)?;
                if dest_pos > this_pos {
                    self.jump(Opcode::JumpForward, dest, dest_pos - this_pos)
                } else {
                    self.jump(Opcode::JumpBackward, dest, this_pos - dest_pos)
                }
            }
            Directive::JumpIfFalse { dest, this } => {
                let dest_pos = self.label_position(dest)?;
                let this_pos = self.label_position(this)?;
                if dest_pos < this_pos {
                    return Err(AssembleError::JumpNotForward {
                        label: self.label_name(dest),
                    });
                }
                self.jump(Opcode::JumpForwardIfFalse, dest, dest_pos - this_pos)
            }
        }
    }

    /// The argument byte is a signed offset; the opcode gives the direction,
    /// so only 0..=127 is reachable.
    fn jump(&self, opcode: Opcode, dest: Label, distance: usize) -> Result<Instruction, AssembleError> {
        let offset = i8::try_from(distance).map_err(|_| AssembleError::JumpOutOfRange {
            label: self.label_name(dest),
            distance,
        })?;
        Ok(Instruction::with_argument(opcode, offset as u8))
    }

    /// Concatenated encoding of every directive.
    pub fn code(&self) -> Result<Vec<u8>, AssembleError> {
        if self.position > MAX_CODE_LEN {
            return Err(AssembleError::CodeTooLong {
                chunk: self.display_name().to_string(),
                len: self.position,
            });
        }
        let mut code = Vec::with_capacity(self.position);
        for directive in &self.directives {
            self.resolve(directive)?.encode(&mut code);
        }
        Ok(code)
    }

    /// Produces the finished chunk, mapping chunk references to ids.
    pub fn finish(
        &self,
        chunk_id: &dyn Fn(ChunkRef) -> Result<u8, AssembleError>,
    ) -> Result<Chunk, AssembleError> {
        let constants = self
            .constants
            .constants()
            .iter()
            .map(|constant| {
                Ok(match constant {
                    ConstantValue::Int(value) => Constant::Int(*value),
                    ConstantValue::String(value) => Constant::String(value.clone()),
                    ConstantValue::Function(chunk) => Constant::Function(chunk_id(*chunk)?),
                })
            })
            .collect::<Result<Vec<_>, AssembleError>>()?;

        Ok(Chunk {
            name: self.name.clone(),
            constants,
            code: self.code()?,
        })
    }
}
