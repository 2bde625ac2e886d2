use rustc_hash::FxHashMap;
use tracing::debug;

use crate::bytecode::assemble_error::AssembleError;
use crate::bytecode::chunk::ChunkBuilder;
use crate::bytecode::code::{ChunkEmitter, Code};
use crate::bytecode::ir::Bytecode;

/// Handle to a chunk of the program being built.
///
/// Stable from the moment the chunk is started; the numeric chunk id used in
/// the encoded form is only known after [`BytecodeBuilder::finalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkRef(pub(crate) usize);

/// Most chunks a program can have: function constants hold a one-byte id.
pub const MAX_CHUNKS: usize = 256;

/// Accumulates the chunks of one program.
///
/// Exactly one unnamed main chunk plus any number of uniquely named chunks.
/// The main chunk gets id 0; the others follow in the order they were started.
#[derive(Debug, Default)]
pub struct BytecodeBuilder {
    /// `None` while the chunk is still being built.
    chunks: Vec<Option<ChunkBuilder>>,
    names: FxHashMap<String, ChunkRef>,
    main: Option<ChunkRef>,
}

impl BytecodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the program entry chunk from `code`.
    pub fn main(&mut self, code: Code<'_>) -> Result<ChunkRef, AssembleError> {
        if self.main.is_some() {
            return Err(AssembleError::DuplicateChunk("<main>".to_string()));
        }
        let chunk_ref = self.reserve(None);
        self.main = Some(chunk_ref);
        self.build(chunk_ref, None, code)
    }

    /// Builds a named chunk from `code`. Names are unique per program.
    pub fn add_chunk(&mut self, name: &str, code: Code<'_>) -> Result<ChunkRef, AssembleError> {
        if self.names.contains_key(name) {
            return Err(AssembleError::DuplicateChunk(name.to_string()));
        }
        let chunk_ref = self.reserve(Some(name));
        self.build(chunk_ref, Some(name.to_string()), code)
    }

    /// Builds a function chunk.
    ///
    /// The function's name and arity are stored as its first two constants,
    /// then `body` is emitted. `body` is responsible for returning.
    pub fn add_function(
        &mut self,
        name: &str,
        arity: u8,
        body: Code<'_>,
    ) -> Result<ChunkRef, AssembleError> {
        let function_name = name.to_string();
        self.add_chunk(
            name,
            Code::new(move |e| {
                e.store_constant(function_name.into())?;
                e.store_constant(i32::from(arity).into())?;
                e.add(body)
            }),
        )
    }

    fn reserve(&mut self, name: Option<&str>) -> ChunkRef {
        let chunk_ref = ChunkRef(self.chunks.len());
        self.chunks.push(None);
        if let Some(name) = name {
            self.names.insert(name.to_string(), chunk_ref);
        }
        chunk_ref
    }

    fn build(
        &mut self,
        chunk_ref: ChunkRef,
        name: Option<String>,
        code: Code<'_>,
    ) -> Result<ChunkRef, AssembleError> {
        let mut chunk = ChunkBuilder::new(name, chunk_ref);
        debug!(chunk = %chunk.display_name(), "building chunk");
        code.emit_into(&mut ChunkEmitter::new(self, &mut chunk))?;
        debug!(
            chunk = %chunk.display_name(),
            constants = chunk.constants().len(),
            bytes = chunk.position(),
            "chunk built"
        );
        self.chunks[chunk_ref.0] = Some(chunk);
        Ok(chunk_ref)
    }

    pub fn chunk_named(&self, name: &str) -> Option<ChunkRef> {
        self.names.get(name).copied()
    }

    /// The finished chunk behind `chunk_ref`, if it is complete.
    pub fn chunk(&self, chunk_ref: ChunkRef) -> Option<&ChunkBuilder> {
        self.chunks.get(chunk_ref.0).and_then(Option::as_ref)
    }

    /// Encoded chunk id of `chunk_ref`: main is 0, the rest in start order.
    pub fn chunk_id(&self, chunk_ref: ChunkRef) -> Result<u8, AssembleError> {
        let main = self.main.ok_or(AssembleError::MissingMain)?;
        if chunk_ref.0 >= self.chunks.len() {
            return Err(AssembleError::UnknownChunk(format!("#{}", chunk_ref.0)));
        }
        let id = if chunk_ref == main {
            0
        } else if chunk_ref.0 < main.0 {
            chunk_ref.0 + 1
        } else {
            chunk_ref.0
        };
        u8::try_from(id).map_err(|_| AssembleError::TooManyChunks(self.chunks.len()))
    }

    /// Every chunk in id order.
    pub fn ordered_chunks(&self) -> Result<Vec<&ChunkBuilder>, AssembleError> {
        let main = self.main.ok_or(AssembleError::MissingMain)?;
        if self.chunks.len() > MAX_CHUNKS {
            return Err(AssembleError::TooManyChunks(self.chunks.len()));
        }
        let order = std::iter::once(main).chain(
            (0..self.chunks.len())
                .map(ChunkRef)
                .filter(|chunk_ref| *chunk_ref != main),
        );
        order
            .map(|chunk_ref| {
                self.chunk(chunk_ref)
                    .ok_or_else(|| AssembleError::UnknownChunk(format!("#{}", chunk_ref.0)))
            })
            .collect()
    }

    /// Resolves every chunk into its final form.
    pub fn finalize(&self) -> Result<Bytecode, AssembleError> {
        let chunks = self
            .ordered_chunks()?
            .into_iter()
            .map(|chunk| chunk.finish(&|chunk_ref| self.chunk_id(chunk_ref)))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(chunks = chunks.len(), "bytecode finalized");
        Ok(Bytecode { chunks })
    }

    /// Human-readable listing of every chunk, in id order.
    pub fn assembly(&self) -> Result<String, AssembleError> {
        crate::bytecode::disasm::render(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::ir::Constant;
    use crate::bytecode::op::Opcode;

    fn ret_null() -> Code<'static> {
        Code::new(|e| {
            e.op(Opcode::Null);
            e.op(Opcode::Return);
            Ok(())
        })
    }

    #[test]
    fn test_main_is_chunk_zero() {
        let mut builder = BytecodeBuilder::new();
        let f = builder.add_function("f", 0, ret_null()).unwrap();
        let g = builder.add_function("g", 2, ret_null()).unwrap();
        let main = builder.main(Code::empty()).unwrap();

        assert_eq!(builder.chunk_id(main), Ok(0));
        assert_eq!(builder.chunk_id(f), Ok(1));
        assert_eq!(builder.chunk_id(g), Ok(2));

        let bytecode = builder.finalize().unwrap();
        let names: Vec<Option<&str>> = bytecode.chunks.iter().map(|c| c.name.as_deref()).collect();
        assert_eq!(names, vec![None, Some("f"), Some("g")]);
    }

    #[test]
    fn test_function_header_constants() {
        let mut builder = BytecodeBuilder::new();
        builder.add_function("add", 2, ret_null()).unwrap();
        builder.main(Code::empty()).unwrap();
        let bytecode = builder.finalize().unwrap();
        assert_eq!(
            bytecode.chunks[1].constants,
            vec![Constant::String("add".to_string()), Constant::Int(2)]
        );
        assert_eq!(bytecode.chunks[1].code, vec![0x01, 0x1A]);
    }

    #[test]
    fn test_function_constant_uses_final_id() {
        let mut builder = BytecodeBuilder::new();
        builder
            .main(Code::new(|e| {
                let f = e.add_function("f", 0, ret_null())?;
                e.op_constant(Opcode::Constant, f.into())
            }))
            .unwrap();
        let bytecode = builder.finalize().unwrap();
        assert_eq!(bytecode.chunks[0].constants, vec![Constant::Function(1)]);
    }

    #[test]
    fn test_self_reference() {
        let mut builder = BytecodeBuilder::new();
        builder.main(Code::empty()).unwrap();
        builder
            .add_chunk(
                "loop",
                Code::new(|e| {
                    let me = e.self_ref();
                    e.op_constant(Opcode::Constant, me.into())
                }),
            )
            .unwrap();
        let bytecode = builder.finalize().unwrap();
        assert_eq!(bytecode.chunks[1].constants, vec![Constant::Function(1)]);
    }

    #[test]
    fn test_duplicate_chunk_name() {
        let mut builder = BytecodeBuilder::new();
        builder.add_chunk("f", Code::empty()).unwrap();
        assert_eq!(
            builder.add_chunk("f", Code::empty()),
            Err(AssembleError::DuplicateChunk("f".to_string()))
        );
    }

    #[test]
    fn test_second_main_is_rejected() {
        let mut builder = BytecodeBuilder::new();
        builder.main(Code::empty()).unwrap();
        assert!(matches!(
            builder.main(Code::empty()),
            Err(AssembleError::DuplicateChunk(_))
        ));
    }

    #[test]
    fn test_missing_main() {
        let mut builder = BytecodeBuilder::new();
        builder.add_chunk("f", Code::empty()).unwrap();
        assert_eq!(builder.finalize().unwrap_err(), AssembleError::MissingMain);
    }

    #[test]
    fn test_chunk_named() {
        let mut builder = BytecodeBuilder::new();
        let f = builder.add_chunk("f", Code::empty()).unwrap();
        assert_eq!(builder.chunk_named("f"), Some(f));
        assert_eq!(builder.chunk_named("g"), None);
    }
}
