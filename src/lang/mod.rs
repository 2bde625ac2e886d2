//! # Abstract Syntax Tree
//!
//! Produced by `frontend::parser`, consumed by the resolver and the code
//! generator. Each node owns its children; there is no sharing between nodes.
//!
//! Identifiers and blocks carry parse-time ids (`IdentId`, `BlockId`) so the
//! later passes can attach information to a specific node without pointers.

pub mod node;
pub mod walk;

pub use node::{
    Assignee, BinaryOp, Block, BlockId, Expr, FieldAccess, IdentId, Identifier, IfStatement,
    Program, Stmt, UnaryOp,
};
