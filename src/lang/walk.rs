//! Generic traversal over the AST.
//!
//! The compiler passes match on `Stmt`/`Expr` directly. This borrowed view
//! exists for code that only needs "every node, in order": the `--ast` tree
//! dump and tests.

use super::node::{Assignee, Block, Expr, FieldAccess, Identifier, Program, Stmt};

/// Borrowed reference to any AST node.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Program(&'a Program),
    Block(&'a Block),
    Stmt(&'a Stmt),
    Expr(&'a Expr),
    Identifier(&'a Identifier),
}

impl<'a> Node<'a> {
    /// Direct children in source order.
    pub fn children(self) -> Vec<Node<'a>> {
        match self {
            Node::Program(program) => program.statements.iter().map(Node::Stmt).collect(),
            Node::Block(block) => block.statements.iter().map(Node::Stmt).collect(),
            Node::Identifier(_) => Vec::new(),
            Node::Stmt(stmt) => match stmt {
                Stmt::VariableDeclaration { name, value } => {
                    vec![Node::Identifier(name), Node::Expr(value)]
                }
                Stmt::Assignment { assignee, value } => {
                    let mut children = match assignee {
                        Assignee::Identifier(identifier) => vec![Node::Identifier(identifier)],
                        Assignee::FieldAccess(access) => field_access_children(access),
                    };
                    children.push(Node::Expr(value));
                    children
                }
                Stmt::FunctionDeclaration { name, params, body } => {
                    let mut children = vec![Node::Identifier(name)];
                    children.extend(params.iter().map(Node::Identifier));
                    children.extend(body.iter().map(Node::Stmt));
                    children
                }
                Stmt::If(if_stmt) => {
                    let mut children = Vec::new();
                    for (condition, body) in &if_stmt.branches {
                        children.push(Node::Expr(condition));
                        children.push(Node::Block(body));
                    }
                    if let Some(else_block) = &if_stmt.else_block {
                        children.push(Node::Block(else_block));
                    }
                    children
                }
                Stmt::While { condition, body } => vec![Node::Expr(condition), Node::Block(body)],
                Stmt::Return { value, .. } => vec![Node::Expr(value)],
                Stmt::Expression(expr) => vec![Node::Expr(expr)],
                Stmt::Block(block) => vec![Node::Block(block)],
            },
            Node::Expr(expr) => match expr {
                Expr::Call {
                    callee, arguments, ..
                } => {
                    let mut children = vec![Node::Expr(callee.as_ref())];
                    children.extend(arguments.iter().map(Node::Expr));
                    children
                }
                Expr::Unary { operand, .. } => vec![Node::Expr(operand.as_ref())],
                Expr::Binary { left, right, .. } => {
                    vec![Node::Expr(left.as_ref()), Node::Expr(right.as_ref())]
                }
                Expr::String(_) | Expr::Number(_) | Expr::Boolean(_) | Expr::Null => Vec::new(),
                Expr::Identifier(identifier) => vec![Node::Identifier(identifier)],
                Expr::FieldAccess(access) => field_access_children(access),
            },
        }
    }

    /// Short description of the node itself, without its children.
    pub fn label(self) -> String {
        match self {
            Node::Program(_) => "Program".to_string(),
            Node::Block(block) => format!("Block #{}", block.id.0),
            Node::Identifier(identifier) => format!("Identifier '{}'", identifier.name),
            Node::Stmt(stmt) => match stmt {
                Stmt::VariableDeclaration { .. } => "VariableDeclaration".to_string(),
                Stmt::Assignment { .. } => "Assignment".to_string(),
                Stmt::FunctionDeclaration { params, .. } => {
                    format!("FunctionDeclaration/{}", params.len())
                }
                Stmt::If(if_stmt) => format!("If ({} branches)", if_stmt.branches.len()),
                Stmt::While { .. } => "While".to_string(),
                Stmt::Return { .. } => "Return".to_string(),
                Stmt::Expression(_) => "ExpressionStatement".to_string(),
                Stmt::Block(_) => "BlockStatement".to_string(),
            },
            Node::Expr(expr) => match expr {
                Expr::Call { arguments, .. } => format!("Call/{}", arguments.len()),
                Expr::Unary { op, .. } => format!("Unary {}", op.text()),
                Expr::Binary { op, .. } => format!("Binary {}", op.text()),
                Expr::String(value) => format!("String {:?}", value),
                Expr::Number(value) => format!("Number {}", value),
                Expr::Boolean(value) => format!("Boolean {}", value),
                Expr::Null => "Null".to_string(),
                Expr::Identifier(_) => "Reference".to_string(),
                Expr::FieldAccess(access) => format!("FieldAccess .{}", access.field.name),
            },
        }
    }

    /// Depth-first, pre-order walk calling `visit` on this node and every descendant.
    pub fn walk(self, visit: &mut impl FnMut(Node<'a>)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }
}

/// Indented tree of `program`, one node per line, children inside braces.
pub fn render_tree(program: &Program) -> String {
    let mut out = String::new();
    render_node(Node::Program(program), 0, &mut out);
    out
}

fn render_node(node: Node<'_>, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let children = node.children();
    if children.is_empty() {
        out.push_str(&format!("{}{}\n", indent, node.label()));
        return;
    }
    out.push_str(&format!("{}{} {{\n", indent, node.label()));
    for child in children {
        render_node(child, depth + 1, out);
    }
    out.push_str(&format!("{}}}\n", indent));
}

// The field name is a key, not a binding, so only the receiver is a child.
fn field_access_children(access: &FieldAccess) -> Vec<Node<'_>> {
    vec![Node::Expr(access.receiver.as_ref())]
}

/// Every identifier that must resolve to a binding, in source order.
pub fn binding_identifiers(program: &Program) -> Vec<&Identifier> {
    let mut identifiers = Vec::new();
    Node::Program(program).walk(&mut |node| {
        if let Node::Identifier(identifier) = node {
            identifiers.push(identifier);
        }
    });
    identifiers
}
