//! Built-in functions.
//!
//! Each built-in is authored directly as a fragment and compiled into its own
//! chunk ahead of user code. Its name is pre-bound in the global scope.

use crate::bytecode::Code;
use crate::bytecode::dsl::*;

/// A function provided by the compiler rather than the program.
#[derive(Debug, Clone, Copy)]
pub struct BuiltInFunction {
    pub name: &'static str,
    pub arity: u8,
    /// Body of the function chunk; arguments are in slots `1..=arity`.
    pub code: fn() -> Code<'static>,
}

pub const FACT: BuiltInFunction = BuiltInFunction {
    name: "fact",
    arity: 1,
    code: fact,
};

pub const PRINTLN: BuiltInFunction = BuiltInFunction {
    name: "println",
    arity: 1,
    code: println,
};

pub const OBJECT: BuiltInFunction = BuiltInFunction {
    name: "object",
    arity: 0,
    code: object,
};

/// The default registry.
pub fn builtins() -> Vec<BuiltInFunction> {
    vec![FACT, PRINTLN, OBJECT]
}

/// `fact(n)`: 1 when n == 1, else n * fact(n - 1)
fn fact() -> Code<'static> {
    sequence(vec![
        if_then(equal(get_local(1), int(1)), ret(int(1))),
        ret(multiply(
            get_local(1),
            call(self_function(), vec![subtract(get_local(1), int(1))]),
        )),
    ])
}

/// `println(x)`: prints x, returns null
fn println() -> Code<'static> {
    sequence(vec![print(get_local(1)), ret(null())])
}

/// `object()`: a fresh instance with no fields
fn object() -> Code<'static> {
    ret(new_instance())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::{BytecodeBuilder, Constant};

    fn compile(builtin: BuiltInFunction) -> crate::bytecode::Chunk {
        let mut builder = BytecodeBuilder::new();
        builder.main(Code::empty()).unwrap();
        builder
            .add_function(builtin.name, builtin.arity, (builtin.code)())
            .unwrap();
        builder.finalize().unwrap().chunks.remove(1)
    }

    #[test]
    fn test_registry_names_are_unique() {
        let names: Vec<&str> = builtins().iter().map(|b| b.name).collect();
        assert_eq!(names, vec!["fact", "println", "object"]);
    }

    #[test]
    fn test_fact_chunk() {
        let chunk = compile(FACT);
        assert_eq!(
            chunk.constants,
            vec![
                Constant::String("fact".to_string()),
                Constant::Int(1),
                Constant::Function(1),
            ]
        );
        #[rustfmt::skip]
        let expected = vec![
            0x05, 1, 0x00, 1, 0x0C,  // n == 1
            0x17, 6,                 // JIF -> next
            0x04, 0x00, 1, 0x1A,     // pop, return 1
            0x16, 1,                 // jump -> after
            0x04,                    // next: pop
            0x05, 1,                 // n
            0x00, 2,                 // self
            0x05, 1, 0x00, 1, 0x10,  // n - 1
            0x19, 1,                 // call
            0x11, 0x1A,              // multiply, return
        ];
        assert_eq!(chunk.code, expected);
    }

    #[test]
    fn test_println_chunk() {
        let chunk = compile(PRINTLN);
        assert_eq!(chunk.code, vec![0x05, 1, 0x15, 0x01, 0x1A]);
    }

    #[test]
    fn test_object_chunk() {
        let chunk = compile(OBJECT);
        assert_eq!(chunk.constants[1], Constant::Int(0));
        assert_eq!(chunk.code, vec![0x0B, 0x1A]);
    }
}
