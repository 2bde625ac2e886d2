use crate::frontend::lexer::Span;

/// Identity of a `{ ... }` block, unique within one parsed program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

/// Identity of one identifier occurrence, unique within one parsed program.
///
/// Two occurrences of the same name get different ids; the resolver keys its
/// output on these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentId(pub u32);

/// A name as written in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub id: IdentId,
    pub name: String,
    pub span: Span,
}

/// Root of a parsed source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

/// Braced statement list that opens a lexical scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: BlockId,
    pub statements: Vec<Stmt>,
}

/// `receiver.field`
#[derive(Debug, Clone, PartialEq)]
pub struct FieldAccess {
    pub receiver: Box<Expr>,
    /// Field key. Not a binding: it is never resolved.
    pub field: Identifier,
}

/// Left-hand side of an assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum Assignee {
    Identifier(Identifier),
    FieldAccess(FieldAccess),
}

/// `if (c0) {..} else if (c1) {..} ... else {..}`
///
/// `branches` holds at least one `(condition, body)` pair, in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStatement {
    pub branches: Vec<(Expr, Block)>,
    pub else_block: Option<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `var name = value;`
    VariableDeclaration { name: Identifier, value: Expr },

    /// `assignee = value;`
    Assignment { assignee: Assignee, value: Expr },

    /// `fn name(params) { body }`
    ///
    /// The body is a plain statement list: its locals live in the function's
    /// own scope, next to the parameters.
    FunctionDeclaration {
        name: Identifier,
        params: Vec<Identifier>,
        body: Vec<Stmt>,
    },

    If(IfStatement),

    While { condition: Expr, body: Block },

    /// `return value;` (a bare `return;` is parsed with a null value)
    Return { value: Expr, span: Span },

    /// `expr;` (the value is discarded)
    Expression(Expr),

    /// A nested `{ ... }` used as a statement.
    Block(Block),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `!`
    Not,
    /// `-`
    Negate,
}

impl UnaryOp {
    pub fn text(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Negate => "-",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Greater,
    Less,
    GreaterEqual,
    LessEqual,
    Equal,
    NotEqual,
    And,
    Or,
}

impl BinaryOp {
    pub fn text(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Greater => ">",
            BinaryOp::Less => "<",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `callee(arguments...)`
    Call {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
        span: Span,
    },

    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },

    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },

    String(String),
    Number(i32),
    Boolean(bool),
    Null,

    /// A bare name used as a value.
    Identifier(Identifier),

    /// `receiver.field` used as a value.
    FieldAccess(FieldAccess),
}
