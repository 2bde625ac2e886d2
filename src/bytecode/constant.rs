//! Per-chunk constant pool.
//!
//! Constants are stored once: storing an equal value again returns the
//! index it already has. Indices are single bytes in the encoded form.

use rustc_hash::FxHashMap;

use crate::bytecode::assemble_error::AssembleError;
use crate::bytecode::builder::ChunkRef;

/// Largest number of constants one chunk can hold.
///
/// The encoded chunk starts with a one-byte constant count.
pub const MAX_CONSTANTS: usize = 255;

/// A constant as stored while a chunk is being built.
///
/// Function constants still point at a `ChunkRef`; chunk ids are only
/// assigned when the whole program is finalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConstantValue {
    Int(i32),
    String(String),
    Function(ChunkRef),
}

impl From<i32> for ConstantValue {
    fn from(value: i32) -> Self {
        ConstantValue::Int(value)
    }
}

impl From<&str> for ConstantValue {
    fn from(value: &str) -> Self {
        ConstantValue::String(value.to_string())
    }
}

impl From<String> for ConstantValue {
    fn from(value: String) -> Self {
        ConstantValue::String(value)
    }
}

impl From<ChunkRef> for ConstantValue {
    fn from(value: ChunkRef) -> Self {
        ConstantValue::Function(value)
    }
}

/// Insertion-ordered, deduplicated constant pool.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    constants: Vec<ConstantValue>,
    /// Deduplication index: maps constant to its index.
    index: FxHashMap<ConstantValue, u8>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or get existing constant, returns index.
    ///
    /// `chunk` only names the owner in the error when the pool is full.
    pub fn store(&mut self, constant: ConstantValue, chunk: &str) -> Result<u8, AssembleError> {
        if let Some(&idx) = self.index.get(&constant) {
            return Ok(idx);
        }

        if self.constants.len() >= MAX_CONSTANTS {
            return Err(AssembleError::ConstantPoolFull {
                chunk: chunk.to_string(),
                limit: MAX_CONSTANTS,
            });
        }

        let idx = self.constants.len() as u8;
        self.constants.push(constant.clone());
        self.index.insert(constant, idx);
        Ok(idx)
    }

    pub fn get(&self, index: u8) -> Option<&ConstantValue> {
        self.constants.get(index as usize)
    }

    pub fn constants(&self) -> &[ConstantValue] {
        &self.constants
    }

    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_pool_is_empty() {
        let pool = ConstantPool::new();
        assert!(pool.is_empty());
        assert_eq!(pool.len(), 0);
    }

    #[test]
    fn test_deduplication() {
        let mut pool = ConstantPool::new();

        let a = pool.store(100.into(), "main").unwrap();
        let b = pool.store("x".into(), "main").unwrap();
        let c = pool.store(100.into(), "main").unwrap();
        let d = pool.store("x".into(), "main").unwrap();

        assert_eq!(a, c);
        assert_eq!(b, d);
        assert_ne!(a, b);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_structurally_different_constants_differ() {
        let mut pool = ConstantPool::new();
        let int = pool.store(1.into(), "main").unwrap();
        let string = pool.store("1".into(), "main").unwrap();
        let function = pool.store(ChunkRef(1).into(), "main").unwrap();
        assert_eq!((int, string, function), (0, 1, 2));
        assert_eq!(pool.get(2), Some(&ConstantValue::Function(ChunkRef(1))));
    }

    #[test]
    fn test_pool_full() {
        let mut pool = ConstantPool::new();
        for i in 0..MAX_CONSTANTS as i32 {
            pool.store(i.into(), "big").unwrap();
        }
        // existing constants are still found
        assert_eq!(pool.store(0.into(), "big"), Ok(0));

        let err = pool.store(1000.into(), "big").unwrap_err();
        assert!(matches!(err, AssembleError::ConstantPoolFull { ref chunk, .. } if chunk == "big"));
    }
}
