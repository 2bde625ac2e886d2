//! AST to bytecode.
//!
//! The generator turns every AST node into a [`Code`] fragment, consulting
//! the resolution table for identifiers and block sizes. Fragments are then
//! applied to a [`BytecodeBuilder`]: built-in functions first, each in its own
//! chunk, then the program as the main chunk. User function chunks are
//! created as their declarations are emitted.
//!
//! Stack discipline: an expression fragment leaves exactly one value, a
//! statement fragment leaves the stack as it found it (block locals are popped
//! when the block closes).

pub mod compile_error;

use tracing::debug;

use crate::bytecode::dsl;
use crate::bytecode::{BytecodeBuilder, Code};
use crate::lang::{
    Assignee, BinaryOp, Block, Expr, Identifier, IfStatement, Program, Stmt, UnaryOp,
};
use crate::resolve::{ResolutionResult, Value};
use crate::stdlib::BuiltInFunction;

pub use compile_error::CompileError;

type GenResult = Result<Code<'static>, CompileError>;

/// Generates the bytecode of `program`.
///
/// Returns the builder so callers can both finalize it and render the
/// assembly listing.
pub fn generate(
    builtins: &[BuiltInFunction],
    resolution: &ResolutionResult,
    program: &Program,
) -> Result<BytecodeBuilder, CompileError> {
    let mut builder = BytecodeBuilder::new();
    for builtin in builtins {
        debug!(builtin = builtin.name, "adding built-in function");
        builder.add_function(builtin.name, builtin.arity, (builtin.code)())?;
    }

    let generator = Generator { resolution };
    let main = generator.statements(&program.statements)?;
    builder.main(main)?;
    Ok(builder)
}

struct Generator<'r> {
    resolution: &'r ResolutionResult,
}

impl Generator<'_> {
    fn value(&self, identifier: &Identifier) -> Result<&Value, CompileError> {
        self.resolution
            .value(identifier)
            .ok_or_else(|| CompileError::unresolved(&identifier.name, identifier.span))
    }

    fn declare(&self, identifier: &Identifier, initial: Code<'static>) -> GenResult {
        self.value(identifier)?.declare(initial).ok_or_else(|| {
            CompileError::internal(format!("'{}' cannot be declared", identifier.name))
        })
    }

    fn statements(&self, statements: &[Stmt]) -> GenResult {
        let codes = statements
            .iter()
            .map(|statement| self.statement(statement))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(dsl::sequence(codes))
    }

    fn block(&self, block: &Block) -> GenResult {
        let locals = self.resolution.block_size(block.id).ok_or_else(|| {
            CompileError::internal(format!("size of block {:?} was not calculated", block.id))
        })?;
        Ok(dsl::sequence(vec![
            self.statements(&block.statements)?,
            dsl::pops(locals),
        ]))
    }

    fn statement(&self, statement: &Stmt) -> GenResult {
        match statement {
            Stmt::VariableDeclaration { name, value } => {
                let initial = self.expression(value)?;
                self.declare(name, initial)
            }
            Stmt::Assignment { assignee, value } => {
                let value = self.expression(value)?;
                match assignee {
                    Assignee::Identifier(identifier) => self
                        .value(identifier)?
                        .set(value)
                        .ok_or_else(|| CompileError::assign_to_builtin(&identifier.name, identifier.span)),
                    Assignee::FieldAccess(access) => Ok(dsl::set_field(
                        self.expression(&access.receiver)?,
                        access.field.name.clone(),
                        value,
                    )),
                }
            }
            Stmt::FunctionDeclaration { name, params, body } => self.function(name, params, body),
            Stmt::If(if_stmt) => self.if_statement(if_stmt),
            Stmt::While { condition, body } => {
                Ok(dsl::while_loop(self.expression(condition)?, self.block(body)?))
            }
            Stmt::Return { value, .. } => Ok(dsl::ret(self.expression(value)?)),
            Stmt::Expression(expr) => Ok(dsl::sequence(vec![self.expression(expr)?, dsl::pop()])),
            Stmt::Block(block) => self.block(block),
        }
    }

    /// The function body goes into its own chunk; the enclosing chunk declares
    /// the name with a reference to that chunk.
    fn function(&self, name: &Identifier, params: &[Identifier], body: &[Stmt]) -> GenResult {
        let arity = u8::try_from(params.len()).map_err(|_| {
            CompileError::internal(format!(
                "function '{}' has {} parameters",
                name.name,
                params.len()
            ))
        })?;
        // falling off the end returns null
        let body = dsl::sequence(vec![self.statements(body)?, dsl::ret(dsl::null())]);

        let function_name = name.name.clone();
        let reference = Code::new(move |e| {
            debug!(function = %function_name, arity, "generating function chunk");
            let chunk = e.add_function(&function_name, arity, body)?;
            e.add(dsl::function(chunk))
        });
        self.declare(name, reference)
    }

    fn if_statement(&self, if_stmt: &IfStatement) -> GenResult {
        let branches = if_stmt
            .branches
            .iter()
            .map(|(condition, body)| -> Result<_, CompileError> {
                Ok((self.expression(condition)?, self.block(body)?))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let otherwise = match &if_stmt.else_block {
            Some(block) => self.block(block)?,
            None => Code::empty(),
        };
        Ok(dsl::if_chain(branches, otherwise))
    }

    fn expression(&self, expr: &Expr) -> GenResult {
        Ok(match expr {
            Expr::Call {
                callee, arguments, ..
            } => {
                let arguments = arguments
                    .iter()
                    .map(|argument| self.expression(argument))
                    .collect::<Result<Vec<_>, _>>()?;
                dsl::call(self.expression(callee)?, arguments)
            }
            Expr::Unary { op, operand, .. } => {
                let operand = self.expression(operand)?;
                match op {
                    UnaryOp::Not => dsl::not(operand),
                    UnaryOp::Negate => dsl::negate(operand),
                }
            }
            Expr::Binary {
                op, left, right, ..
            } => {
                let left = self.expression(left)?;
                let right = self.expression(right)?;
                match op {
                    BinaryOp::Add => dsl::add(left, right),
                    BinaryOp::Subtract => dsl::subtract(left, right),
                    BinaryOp::Multiply => dsl::multiply(left, right),
                    BinaryOp::Divide => dsl::divide(left, right),
                    BinaryOp::Greater => dsl::greater(left, right),
                    BinaryOp::Less => dsl::less(left, right),
                    BinaryOp::GreaterEqual => dsl::not(dsl::less(left, right)),
                    BinaryOp::LessEqual => dsl::not(dsl::greater(left, right)),
                    BinaryOp::Equal => dsl::equal(left, right),
                    BinaryOp::NotEqual => dsl::not(dsl::equal(left, right)),
                    BinaryOp::And => dsl::and(left, right),
                    BinaryOp::Or => dsl::or(left, right),
                }
            }
            Expr::String(value) => dsl::string(value.clone()),
            Expr::Number(value) => dsl::int(*value),
            Expr::Boolean(value) => dsl::boolean(*value),
            Expr::Null => dsl::null(),
            Expr::Identifier(identifier) => self.value(identifier)?.get(),
            Expr::FieldAccess(access) => {
                dsl::get_field(self.expression(&access.receiver)?, access.field.name.clone())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{AssembleError, Bytecode, Constant};
    use crate::frontend::parse_source;
    use crate::resolve::resolve;
    use crate::stdlib;

    fn generate_src(source: &str) -> Result<Bytecode, CompileError> {
        let program = parse_source(source).unwrap();
        let builtins = stdlib::builtins();
        let resolution = resolve(&builtins, &program).unwrap();
        Ok(generate(&builtins, &resolution, &program)?.finalize()?)
    }

    fn main_chunk(source: &str) -> crate::bytecode::Chunk {
        generate_src(source).unwrap().chunks.remove(0)
    }

    #[test]
    fn test_global_round_trip() {
        let main = main_chunk("var x = 1; x = x + 1; return x;");
        assert_eq!(
            main.constants,
            vec![Constant::Int(1), Constant::String("x".to_string())]
        );
        #[rustfmt::skip]
        let expected = vec![
            0x00, 0, 0x08, 1,             // var x = 1
            0x07, 1, 0x00, 0, 0x0F, 0x08, 1, // x = x + 1
            0x07, 1, 0x1A,                // return x
        ];
        assert_eq!(main.code, expected);
    }

    #[test]
    fn test_builtins_take_the_first_chunks() {
        let bytecode = generate_src("").unwrap();
        let names: Vec<Option<&str>> = bytecode.chunks.iter().map(|c| c.name.as_deref()).collect();
        assert_eq!(names, vec![None, Some("fact"), Some("println"), Some("object")]);
        // no implicit return in main
        assert!(bytecode.chunks[0].code.is_empty());
    }

    #[test]
    fn test_block_pops_its_locals() {
        let main = main_chunk("{ var a = 1; var b = 2; { var c = 3; } }");
        assert_eq!(
            main.code,
            vec![0x00, 0, 0x00, 1, 0x00, 2, 0x04, 0x04, 0x04]
        );
    }

    #[test]
    fn test_locals_use_slots() {
        let main = main_chunk("{ var a = 1; a = a; }");
        assert_eq!(main.code, vec![0x00, 0, 0x05, 1, 0x06, 1, 0x04]);
    }

    #[test]
    fn test_expression_statement_pops() {
        let main = main_chunk("println(1);");
        assert_eq!(main.constants, vec![Constant::Function(2), Constant::Int(1)]);
        assert_eq!(main.code, vec![0x00, 0, 0x00, 1, 0x19, 1, 0x04]);
    }

    #[test]
    fn test_function_declaration() {
        let bytecode = generate_src("fn add(a, b) { return a + b; }").unwrap();
        let main = &bytecode.chunks[0];
        assert_eq!(
            main.constants,
            vec![Constant::Function(4), Constant::String("add".to_string())]
        );
        assert_eq!(main.code, vec![0x00, 0, 0x08, 1]);

        let add = &bytecode.chunks[4];
        assert_eq!(add.name.as_deref(), Some("add"));
        assert_eq!(
            add.constants,
            vec![Constant::String("add".to_string()), Constant::Int(2)]
        );
        // body, then the implicit `return null`
        assert_eq!(add.code, vec![0x05, 1, 0x05, 2, 0x0F, 0x1A, 0x01, 0x1A]);
    }

    #[test]
    fn test_function_declared_in_block() {
        let main = main_chunk("{ fn f() { } f(); }");
        // declaring a local leaves the function on the stack in slot 1
        assert_eq!(
            main.code,
            vec![0x00, 0, 0x05, 1, 0x19, 0, 0x04, 0x04]
        );
    }

    #[test]
    fn test_nested_functions_get_consecutive_ids() {
        let bytecode = generate_src("fn outer() { fn inner() { } return inner; }").unwrap();
        assert_eq!(bytecode.chunks[4].name.as_deref(), Some("outer"));
        assert_eq!(bytecode.chunks[5].name.as_deref(), Some("inner"));
        assert!(bytecode.chunks[4].constants.contains(&Constant::Function(5)));
    }

    #[test]
    fn test_negated_comparisons() {
        let main = main_chunk("1 >= 2; 1 <= 2; 1 != 2;");
        #[rustfmt::skip]
        let expected = vec![
            0x00, 0, 0x00, 1, 0x0E, 0x13, 0x04, // !(1 < 2)
            0x00, 0, 0x00, 1, 0x0D, 0x13, 0x04, // !(1 > 2)
            0x00, 0, 0x00, 1, 0x0C, 0x13, 0x04, // !(1 == 2)
        ];
        assert_eq!(main.code, expected);
    }

    #[test]
    fn test_unary_and_literals() {
        let main = main_chunk("-5; !true; null; \"s\";");
        assert_eq!(
            main.code,
            vec![0x00, 0, 0x14, 0x04, 0x02, 0x13, 0x04, 0x01, 0x04, 0x00, 1, 0x04]
        );
    }

    #[test]
    fn test_fields() {
        let bytecode = generate_src("var o = object(); o.x = 1; return o.x;").unwrap();
        let main = &bytecode.chunks[0];
        #[rustfmt::skip]
        let expected = vec![
            0x00, 0, 0x19, 0, 0x08, 1,       // var o = object()
            0x07, 1, 0x00, 2, 0x0A, 3,       // o.x = 1
            0x07, 1, 0x09, 3, 0x1A,          // return o.x
        ];
        assert_eq!(main.code, expected);
    }

    #[test]
    fn test_while_loop() {
        let main = main_chunk("var i = 0; while (i < 3) { i = i + 1; }");
        #[rustfmt::skip]
        let expected = vec![
            0x00, 0, 0x08, 1,               // var i = 0
            0x07, 1, 0x00, 2, 0x0E,         // before: i < 3
            0x17, 10,                       // JIF -> after (at 21)
            0x04,                           // pop
            0x07, 1, 0x00, 3, 0x0F, 0x08, 1, // i = i + 1
            0x18, 17,                       // jump -> before (at 4)
            0x04,                           // after: pop
        ];
        assert_eq!(main.code, expected);
    }

    #[test]
    fn test_assign_to_builtin_fails() {
        let err = generate_src("fact = 1;").unwrap_err();
        assert!(matches!(err, CompileError::NotAssignable { ref name, .. } if name == "fact"));
    }

    #[test]
    fn test_unresolved_identifier_is_internal() {
        let program = parse_source("x;").unwrap();
        let err = generate(&[], &ResolutionResult::default(), &program).unwrap_err();
        assert!(matches!(err, CompileError::Unresolved { ref name, .. } if name == "x"));
    }

    #[test]
    fn test_user_function_clashing_with_builtin_chunk() {
        let err = generate_src("{ fn fact(n) { return n; } }").unwrap_err();
        assert_eq!(
            err,
            CompileError::Assemble(AssembleError::DuplicateChunk("fact".to_string()))
        );
    }
}
