use crate::bytecode::dsl;
use crate::bytecode::{AssembleError, Code};

/// Storage an identifier resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Stack slot relative to the frame base; slot 0 holds the callee.
    UserLocalVariable { name: String, slot: u8 },
    /// Looked up by name at runtime.
    UserGlobalVariable { name: String },
    /// Pre-compiled function in its own chunk. Read-only.
    BuiltInFunction { name: String, arity: u8 },
}

impl Value {
    pub fn name(&self) -> &str {
        match self {
            Value::UserLocalVariable { name, .. }
            | Value::UserGlobalVariable { name }
            | Value::BuiltInFunction { name, .. } => name,
        }
    }

    pub fn is_settable(&self) -> bool {
        !matches!(self, Value::BuiltInFunction { .. })
    }

    /// Pushes the current value.
    pub fn get<'a>(&self) -> Code<'a> {
        match self {
            Value::UserLocalVariable { slot, .. } => dsl::get_local(*slot),
            Value::UserGlobalVariable { name } => dsl::get_global(name.clone()),
            Value::BuiltInFunction { name, .. } => {
                let name = name.clone();
                Code::new(move |e| {
                    let chunk = e
                        .chunk_named(&name)
                        .ok_or_else(|| AssembleError::UnknownChunk(name.clone()))?;
                    e.add(dsl::function(chunk))
                })
            }
        }
    }

    /// Stores `value`, consuming it. `None` when the value is read-only.
    pub fn set<'a>(&self, value: Code<'a>) -> Option<Code<'a>> {
        match self {
            Value::UserLocalVariable { slot, .. } => Some(dsl::set_local(*slot, value)),
            Value::UserGlobalVariable { name } => Some(dsl::set_global(name.clone(), value)),
            Value::BuiltInFunction { .. } => None,
        }
    }

    /// Introduces the binding with its initial `value`.
    ///
    /// A local is just left on the stack in its slot; a global is stored by name.
    pub fn declare<'a>(&self, value: Code<'a>) -> Option<Code<'a>> {
        match self {
            Value::UserLocalVariable { .. } => Some(value),
            Value::UserGlobalVariable { name } => Some(dsl::set_global(name.clone(), value)),
            Value::BuiltInFunction { .. } => None,
        }
    }
}
