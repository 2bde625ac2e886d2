use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bytecode::assemble_error::AssembleError;

const TAG_INT: u8 = 0x00;
const TAG_STRING: u8 = 0x01;
const TAG_FUNCTION: u8 = 0x02;

/// A compiled program.
///
/// Convention: `chunks[0]` is always `main`. The binary form is the
/// concatenation of every chunk's encoding in this order, with no header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bytecode {
    pub chunks: Vec<Chunk>,
}

/// One function body (or the main program) with its own constant pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Not part of the binary form; `None` for main and for decoded chunks.
    pub name: Option<String>,
    pub constants: Vec<Constant>,
    pub code: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Constant {
    Int(i32),
    String(String),
    /// Chunk id of a function.
    Function(u8),
}

impl std::fmt::Display for Constant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Constant::Int(n) => write!(f, "{}", n),
            Constant::String(s) => write!(f, "{:?}", s),
            Constant::Function(id) => write!(f, "<fn #{}>", id),
        }
    }
}

impl Constant {
    pub fn encode(&self, out: &mut Vec<u8>) -> Result<(), AssembleError> {
        match self {
            Constant::Int(value) => {
                out.push(TAG_INT);
                out.extend_from_slice(&value.to_le_bytes());
            }
            Constant::String(value) => {
                let bytes = value.as_bytes();
                let len = u16::try_from(bytes.len())
                    .map_err(|_| AssembleError::StringTooLong { len: bytes.len() })?;
                out.push(TAG_STRING);
                out.extend_from_slice(&len.to_le_bytes());
                out.extend_from_slice(bytes);
            }
            Constant::Function(chunk_id) => {
                out.push(TAG_FUNCTION);
                out.push(*chunk_id);
            }
        }
        Ok(())
    }
}

impl Chunk {
    /// `n_constants:u8 constants* code_len:u16le code`
    pub fn encode(&self, out: &mut Vec<u8>) -> Result<(), AssembleError> {
        let chunk = self.name.as_deref().unwrap_or("<main>");
        let count = u8::try_from(self.constants.len()).map_err(|_| {
            AssembleError::ConstantPoolFull {
                chunk: chunk.to_string(),
                limit: u8::MAX as usize,
            }
        })?;
        let code_len = u16::try_from(self.code.len()).map_err(|_| AssembleError::CodeTooLong {
            chunk: chunk.to_string(),
            len: self.code.len(),
        })?;

        out.push(count);
        for constant in &self.constants {
            constant.encode(out)?;
        }
        out.extend_from_slice(&code_len.to_le_bytes());
        out.extend_from_slice(&self.code);
        Ok(())
    }
}

impl Bytecode {
    /// The binary program, chunks in id order.
    pub fn to_bytes(&self) -> Result<Vec<u8>, AssembleError> {
        let mut out = Vec::new();
        for chunk in &self.chunks {
            chunk.encode(&mut out)?;
        }
        Ok(out)
    }

    /// Writes the binary program to `path`.
    pub fn write(&self, path: impl AsRef<std::path::Path>) -> Result<(), crate::error::Error> {
        let bytes = self.to_bytes().map_err(crate::codegen::CompileError::from)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Structured form (names included) for tooling, via postcard.
    pub fn to_ir_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    pub fn from_ir_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }

    /// Reads a binary program back. Chunk names are not recoverable.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut reader = Reader { bytes, pos: 0 };
        let mut chunks = Vec::new();
        while !reader.at_end() {
            chunks.push(reader.chunk()?);
        }
        Ok(Bytecode { chunks })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unexpected end of input at byte {0}")]
    UnexpectedEnd(usize),

    #[error("unknown constant tag {tag:#04x} at byte {pos}")]
    UnknownTag { tag: u8, pos: usize },

    #[error("string constant at byte {0} is not valid UTF-8")]
    InvalidUtf8(usize),
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn take(&mut self, n: usize) -> Result<&[u8], DecodeError> {
        let end = self.pos + n;
        let slice = self
            .bytes
            .get(self.pos..end)
            .ok_or(DecodeError::UnexpectedEnd(self.pos))?;
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, DecodeError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn constant(&mut self) -> Result<Constant, DecodeError> {
        let pos = self.pos;
        match self.u8()? {
            TAG_INT => {
                let b = self.take(4)?;
                Ok(Constant::Int(i32::from_le_bytes([b[0], b[1], b[2], b[3]])))
            }
            TAG_STRING => {
                let len = self.u16()? as usize;
                let start = self.pos;
                let bytes = self.take(len)?.to_vec();
                String::from_utf8(bytes)
                    .map(Constant::String)
                    .map_err(|_| DecodeError::InvalidUtf8(start))
            }
            TAG_FUNCTION => Ok(Constant::Function(self.u8()?)),
            tag => Err(DecodeError::UnknownTag { tag, pos }),
        }
    }

    fn chunk(&mut self) -> Result<Chunk, DecodeError> {
        let count = self.u8()?;
        let constants = (0..count)
            .map(|_| self.constant())
            .collect::<Result<Vec<_>, _>>()?;
        let code_len = self.u16()? as usize;
        let code = self.take(code_len)?.to_vec();
        Ok(Chunk {
            name: None,
            constants,
            code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Bytecode {
        Bytecode {
            chunks: vec![
                Chunk {
                    name: None,
                    constants: vec![Constant::Int(1), Constant::Function(1)],
                    code: vec![0x00, 0x00, 0x04],
                },
                Chunk {
                    name: Some("f".to_string()),
                    constants: vec![Constant::String("f".to_string()), Constant::Int(0)],
                    code: vec![0x01, 0x1A],
                },
            ],
        }
    }

    #[test]
    fn test_int_constant_encoding() {
        let mut out = Vec::new();
        Constant::Int(1).encode(&mut out).unwrap();
        assert_eq!(out, vec![0x00, 1, 0, 0, 0]);

        let mut out = Vec::new();
        Constant::Int(-2).encode(&mut out).unwrap();
        assert_eq!(out, vec![0x00, 0xFE, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_string_constant_encoding() {
        let mut out = Vec::new();
        Constant::String("hé".to_string()).encode(&mut out).unwrap();
        assert_eq!(out, vec![0x01, 3, 0, b'h', 0xC3, 0xA9]);
    }

    #[test]
    fn test_function_constant_encoding() {
        let mut out = Vec::new();
        Constant::Function(7).encode(&mut out).unwrap();
        assert_eq!(out, vec![0x02, 7]);
    }

    #[test]
    fn test_chunk_layout() {
        let bytes = sample().to_bytes().unwrap();
        #[rustfmt::skip]
        let expected = vec![
            // main
            2, 0x00, 1, 0, 0, 0, 0x02, 1,
            3, 0, 0x00, 0x00, 0x04,
            // f
            2, 0x01, 1, 0, b'f', 0x00, 0, 0, 0, 0,
            2, 0, 0x01, 0x1A,
        ];
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_decode_recovers_chunks() {
        let bytecode = sample();
        let decoded = Bytecode::decode(&bytecode.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded.chunks.len(), 2);
        assert_eq!(decoded.chunks[0].constants, bytecode.chunks[0].constants);
        assert_eq!(decoded.chunks[1].code, bytecode.chunks[1].code);
        assert_eq!(decoded.chunks[1].name, None);
    }

    #[test]
    fn test_decode_truncated() {
        let mut bytes = sample().to_bytes().unwrap();
        bytes.pop();
        assert!(matches!(
            Bytecode::decode(&bytes),
            Err(DecodeError::UnexpectedEnd(_))
        ));
    }

    #[test]
    fn test_decode_unknown_tag() {
        assert_eq!(
            Bytecode::decode(&[1, 0x09]),
            Err(DecodeError::UnknownTag { tag: 0x09, pos: 1 })
        );
    }

    #[test]
    fn test_too_long_string() {
        let mut out = Vec::new();
        let err = Constant::String("x".repeat(70_000)).encode(&mut out).unwrap_err();
        assert_eq!(err, AssembleError::StringTooLong { len: 70_000 });
    }

    #[test]
    fn test_ir_keeps_names() {
        let bytecode = sample();
        let ir = bytecode.to_ir_bytes().unwrap();
        let back = Bytecode::from_ir_bytes(&ir).unwrap();
        assert_eq!(back, bytecode);
        assert_eq!(back.chunks[1].name.as_deref(), Some("f"));
    }
}
