//! Identifier resolution.
//!
//! One depth-first pass over the AST assigns every identifier occurrence its
//! storage ([`Value`]) and records how many locals each block declares, so
//! the generator can pop them when the block closes.

pub mod resolve_error;
pub mod scope;
pub mod value;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::lang::{Assignee, Block, BlockId, Expr, IdentId, Identifier, Program, Stmt};
use crate::stdlib::BuiltInFunction;

pub use resolve_error::ResolveError;
pub use scope::{ScopeKind, ScopeStack};
pub use value::Value;

/// Output of [`resolve`]: identifier table plus block sizes.
#[derive(Debug, Clone, Default)]
pub struct ResolutionResult {
    pub identifiers: FxHashMap<IdentId, Value>,
    pub block_sizes: FxHashMap<BlockId, usize>,
}

impl ResolutionResult {
    pub fn value(&self, identifier: &Identifier) -> Option<&Value> {
        self.identifiers.get(&identifier.id)
    }

    pub fn block_size(&self, block: BlockId) -> Option<usize> {
        self.block_sizes.get(&block).copied()
    }
}

/// Resolves every identifier of `program`.
///
/// Fails on the first undeclared identifier or duplicate declaration.
pub fn resolve(
    builtins: &[BuiltInFunction],
    program: &Program,
) -> Result<ResolutionResult, ResolveError> {
    let mut resolver = Resolver {
        scopes: ScopeStack::new(builtins),
        result: ResolutionResult::default(),
    };
    for statement in &program.statements {
        resolver.statement(statement)?;
    }
    debug!(
        identifiers = resolver.result.identifiers.len(),
        blocks = resolver.result.block_sizes.len(),
        "resolution finished"
    );
    Ok(resolver.result)
}

struct Resolver {
    scopes: ScopeStack,
    result: ResolutionResult,
}

impl Resolver {
    fn record(&mut self, identifier: &Identifier, value: Value) -> Result<(), ResolveError> {
        if self.result.identifiers.contains_key(&identifier.id) {
            return Err(ResolveError::ResolvedTwice {
                name: identifier.name.clone(),
                span: identifier.span,
            });
        }
        self.result.identifiers.insert(identifier.id, value);
        Ok(())
    }

    fn declare(&mut self, identifier: &Identifier) -> Result<(), ResolveError> {
        let value = self.scopes.declare(&identifier.name, identifier.span)?;
        self.record(identifier, value)
    }

    fn reference(&mut self, identifier: &Identifier) -> Result<(), ResolveError> {
        let value = self
            .scopes
            .lookup(&identifier.name)
            .cloned()
            .ok_or_else(|| ResolveError::Undeclared {
                name: identifier.name.clone(),
                span: identifier.span,
            })?;
        self.record(identifier, value)
    }

    fn block(&mut self, block: &Block) -> Result<(), ResolveError> {
        self.scopes.push_block();
        for statement in &block.statements {
            self.statement(statement)?;
        }
        let locals = self.scopes.pop().map_or(0, |scope| scope.local_count());
        self.result.block_sizes.insert(block.id, locals);
        Ok(())
    }

    fn statement(&mut self, statement: &Stmt) -> Result<(), ResolveError> {
        match statement {
            Stmt::VariableDeclaration { name, value } => {
                // the initializer cannot see the name it initializes
                self.expression(value)?;
                self.declare(name)
            }
            Stmt::Assignment { assignee, value } => {
                match assignee {
                    Assignee::Identifier(identifier) => self.reference(identifier)?,
                    Assignee::FieldAccess(access) => self.expression(&access.receiver)?,
                }
                self.expression(value)
            }
            Stmt::FunctionDeclaration { name, params, body } => {
                self.declare(name)?;
                debug!(function = %name.name, params = params.len(), "resolving function");
                self.scopes.push_function();
                for param in params {
                    self.declare(param)?;
                }
                for statement in body {
                    self.statement(statement)?;
                }
                self.scopes.pop();
                Ok(())
            }
            Stmt::If(if_stmt) => {
                for (condition, body) in &if_stmt.branches {
                    self.expression(condition)?;
                    self.block(body)?;
                }
                if let Some(else_block) = &if_stmt.else_block {
                    self.block(else_block)?;
                }
                Ok(())
            }
            Stmt::While { condition, body } => {
                self.expression(condition)?;
                self.block(body)
            }
            Stmt::Return { value, .. } => self.expression(value),
            Stmt::Expression(expr) => self.expression(expr),
            Stmt::Block(block) => self.block(block),
        }
    }

    fn expression(&mut self, expr: &Expr) -> Result<(), ResolveError> {
        match expr {
            Expr::Call {
                callee, arguments, ..
            } => {
                self.expression(callee)?;
                for argument in arguments {
                    self.expression(argument)?;
                }
                Ok(())
            }
            Expr::Unary { operand, .. } => self.expression(operand),
            Expr::Binary { left, right, .. } => {
                self.expression(left)?;
                self.expression(right)
            }
            Expr::String(_) | Expr::Number(_) | Expr::Boolean(_) | Expr::Null => Ok(()),
            Expr::Identifier(identifier) => self.reference(identifier),
            // the field name is a runtime key, not a binding
            Expr::FieldAccess(access) => self.expression(&access.receiver),
        }
    }
}
