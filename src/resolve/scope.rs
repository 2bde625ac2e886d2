//! Scope frames for identifier resolution.
//!
//! Scopes form an explicit stack owned by the resolver. Frame 0 is always the
//! global scope. Lookup walks from the top frame down, except that a function
//! frame only sees the global frame below it: functions do not capture the
//! locals of enclosing blocks.

use rustc_hash::FxHashMap;

use crate::frontend::lexer::Span;
use crate::resolve::resolve_error::ResolveError;
use crate::resolve::value::Value;
use crate::stdlib::BuiltInFunction;

/// First local slot; slot 0 belongs to the callee.
pub const FIRST_LOCAL_SLOT: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Block,
    Function,
}

impl ScopeKind {
    pub fn name(self) -> &'static str {
        match self {
            ScopeKind::Global => "global",
            ScopeKind::Block => "block",
            ScopeKind::Function => "function",
        }
    }
}

#[derive(Debug)]
pub struct Scope {
    kind: ScopeKind,
    values: FxHashMap<String, Value>,
    /// Slot of the first local declared in this frame.
    base_slot: usize,
    locals: usize,
}

impl Scope {
    fn new(kind: ScopeKind, base_slot: usize) -> Self {
        Scope {
            kind,
            values: FxHashMap::default(),
            base_slot,
            locals: 0,
        }
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    /// Number of stack slots this frame's declarations occupy.
    pub fn local_count(&self) -> usize {
        self.locals
    }

    /// Slot the next local of this frame would get.
    ///
    /// The global frame holds no locals, so its next slot stays fixed.
    pub fn next_slot(&self) -> usize {
        self.base_slot + self.locals
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }
}

#[derive(Debug)]
pub struct ScopeStack {
    frames: Vec<Scope>,
}

impl ScopeStack {
    /// A stack holding just the global frame, pre-bound with `builtins`.
    pub fn new(builtins: &[BuiltInFunction]) -> Self {
        let mut global = Scope::new(ScopeKind::Global, FIRST_LOCAL_SLOT);
        for builtin in builtins {
            global.values.insert(
                builtin.name.to_string(),
                Value::BuiltInFunction {
                    name: builtin.name.to_string(),
                    arity: builtin.arity,
                },
            );
        }
        ScopeStack {
            frames: vec![global],
        }
    }

    fn top(&self) -> &Scope {
        // frame 0 is never popped
        &self.frames[self.frames.len() - 1]
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn push_block(&mut self) {
        let base = self.top().next_slot();
        self.frames.push(Scope::new(ScopeKind::Block, base));
    }

    /// Function frames sit directly on the global frame's slot numbering.
    pub fn push_function(&mut self) {
        let base = self.frames[0].next_slot();
        self.frames.push(Scope::new(ScopeKind::Function, base));
    }

    /// Pops the top frame. The global frame stays.
    pub fn pop(&mut self) -> Option<Scope> {
        if self.frames.len() > 1 {
            self.frames.pop()
        } else {
            None
        }
    }

    /// Declares `name` in the top frame.
    pub fn declare(&mut self, name: &str, span: Span) -> Result<Value, ResolveError> {
        let last = self.frames.len() - 1;
        let top = &mut self.frames[last];

        if top.values.contains_key(name) {
            return Err(ResolveError::Duplicate {
                name: name.to_string(),
                span,
                scope: top.kind.name(),
            });
        }

        let value = match top.kind {
            ScopeKind::Global => Value::UserGlobalVariable {
                name: name.to_string(),
            },
            ScopeKind::Block | ScopeKind::Function => {
                let slot = top.next_slot();
                let slot = u8::try_from(slot).map_err(|_| ResolveError::TooManyLocals {
                    name: name.to_string(),
                    span,
                    slot,
                })?;
                top.locals += 1;
                Value::UserLocalVariable {
                    name: name.to_string(),
                    slot,
                }
            }
        };

        top.values.insert(name.to_string(), value.clone());
        Ok(value)
    }

    /// Finds the binding `name` refers to from the top frame.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        for frame in self.frames.iter().rev() {
            if let Some(value) = frame.get(name) {
                return Some(value);
            }
            if frame.kind == ScopeKind::Function {
                return self.frames[0].get(name);
            }
        }
        None
    }
}
