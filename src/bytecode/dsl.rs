//! Fragment combinators.
//!
//! Each function returns a [`Code`] fragment. Operands are fragments too, so
//! a combinator decides where (and whether) its operands are emitted.
//! Every expression fragment leaves exactly one value on the stack.

use crate::bytecode::assemble_error::AssembleError;
use crate::bytecode::builder::ChunkRef;
use crate::bytecode::code::Code;
use crate::bytecode::op::Opcode;

fn op<'a>(opcode: Opcode) -> Code<'a> {
    Code::new(move |e| {
        e.op(opcode);
        Ok(())
    })
}

fn unary<'a>(operand: Code<'a>, opcode: Opcode) -> Code<'a> {
    Code::new(move |e| {
        e.add(operand)?;
        e.op(opcode);
        Ok(())
    })
}

fn binary<'a>(left: Code<'a>, right: Code<'a>, opcode: Opcode) -> Code<'a> {
    Code::new(move |e| {
        e.add(left)?;
        e.add(right)?;
        e.op(opcode);
        Ok(())
    })
}

// -----------------------------------------------------------------------------
// literals
// -----------------------------------------------------------------------------

pub fn int<'a>(value: i32) -> Code<'a> {
    Code::new(move |e| e.op_constant(Opcode::Constant, value.into()))
}

pub fn string<'a>(value: impl Into<String>) -> Code<'a> {
    let value = value.into();
    Code::new(move |e| e.op_constant(Opcode::Constant, value.into()))
}

pub fn null<'a>() -> Code<'a> {
    op(Opcode::Null)
}

pub fn boolean<'a>(value: bool) -> Code<'a> {
    op(if value { Opcode::True } else { Opcode::False })
}

/// Pushes a reference to `chunk` as a function value.
pub fn function<'a>(chunk: ChunkRef) -> Code<'a> {
    Code::new(move |e| e.op_constant(Opcode::Constant, chunk.into()))
}

/// Pushes a reference to the chunk being built (for recursion).
pub fn self_function<'a>() -> Code<'a> {
    Code::new(|e| {
        let me = e.self_ref();
        e.op_constant(Opcode::Constant, me.into())
    })
}

// -----------------------------------------------------------------------------
// stack and variables
// -----------------------------------------------------------------------------

pub fn pop<'a>() -> Code<'a> {
    op(Opcode::Pop)
}

pub fn pops<'a>(count: usize) -> Code<'a> {
    Code::new(move |e| {
        for _ in 0..count {
            e.op(Opcode::Pop);
        }
        Ok(())
    })
}

pub fn get_local<'a>(slot: u8) -> Code<'a> {
    Code::new(move |e| {
        e.op_with(Opcode::GetLocal, slot);
        Ok(())
    })
}

/// Stores `value` into `slot`, consuming it.
pub fn set_local<'a>(slot: u8, value: Code<'a>) -> Code<'a> {
    Code::new(move |e| {
        e.add(value)?;
        e.op_with(Opcode::SetLocal, slot);
        Ok(())
    })
}

pub fn get_global<'a>(name: impl Into<String>) -> Code<'a> {
    let name = name.into();
    Code::new(move |e| e.op_constant(Opcode::GetGlobal, name.into()))
}

/// Stores `value` into the global `name`, consuming it.
pub fn set_global<'a>(name: impl Into<String>, value: Code<'a>) -> Code<'a> {
    let name = name.into();
    Code::new(move |e| {
        e.add(value)?;
        e.op_constant(Opcode::SetGlobal, name.into())
    })
}

// -----------------------------------------------------------------------------
// objects
// -----------------------------------------------------------------------------

pub fn new_instance<'a>() -> Code<'a> {
    op(Opcode::NewInstance)
}

pub fn get_field<'a>(receiver: Code<'a>, field: impl Into<String>) -> Code<'a> {
    let field = field.into();
    Code::new(move |e| {
        e.add(receiver)?;
        e.op_constant(Opcode::GetField, field.into())
    })
}

pub fn set_field<'a>(receiver: Code<'a>, field: impl Into<String>, value: Code<'a>) -> Code<'a> {
    let field = field.into();
    Code::new(move |e| {
        e.add(receiver)?;
        e.add(value)?;
        e.op_constant(Opcode::SetField, field.into())
    })
}

// -----------------------------------------------------------------------------
// operators
// -----------------------------------------------------------------------------

pub fn add<'a>(left: Code<'a>, right: Code<'a>) -> Code<'a> {
    binary(left, right, Opcode::Add)
}

pub fn subtract<'a>(left: Code<'a>, right: Code<'a>) -> Code<'a> {
    binary(left, right, Opcode::Subtract)
}

pub fn multiply<'a>(left: Code<'a>, right: Code<'a>) -> Code<'a> {
    binary(left, right, Opcode::Multiply)
}

pub fn divide<'a>(left: Code<'a>, right: Code<'a>) -> Code<'a> {
    binary(left, right, Opcode::Divide)
}

pub fn equal<'a>(left: Code<'a>, right: Code<'a>) -> Code<'a> {
    binary(left, right, Opcode::Equal)
}

pub fn greater<'a>(left: Code<'a>, right: Code<'a>) -> Code<'a> {
    binary(left, right, Opcode::Greater)
}

pub fn less<'a>(left: Code<'a>, right: Code<'a>) -> Code<'a> {
    binary(left, right, Opcode::Less)
}

pub fn not<'a>(operand: Code<'a>) -> Code<'a> {
    unary(operand, Opcode::Not)
}

pub fn negate<'a>(operand: Code<'a>) -> Code<'a> {
    unary(operand, Opcode::Negate)
}

/// Short-circuit `&&`: a false left operand is the result.
pub fn and<'a>(left: Code<'a>, right: Code<'a>) -> Code<'a> {
    Code::new(move |e| {
        let after = e.loose_label("after and");
        e.add(left)?;
        e.jump_forward_if_false(after)?;
        e.op(Opcode::Pop);
        e.add(right)?;
        e.place_label(after)
    })
}

/// Short-circuit `||`: a true left operand is the result.
pub fn or<'a>(left: Code<'a>, right: Code<'a>) -> Code<'a> {
    Code::new(move |e| {
        let right_side = e.loose_label("or right");
        let after = e.loose_label("after or");
        e.add(left)?;
        e.jump_forward_if_false(right_side)?;
        e.jump_to(after)?;
        e.place_label(right_side)?;
        e.op(Opcode::Pop);
        e.add(right)?;
        e.place_label(after)
    })
}

// -----------------------------------------------------------------------------
// functions and I/O
// -----------------------------------------------------------------------------

/// `callee(arguments...)`
pub fn call<'a>(callee: Code<'a>, arguments: Vec<Code<'a>>) -> Code<'a> {
    Code::new(move |e| {
        let count = u8::try_from(arguments.len()).map_err(|_| AssembleError::ArgumentOutOfRange {
            what: "argument count",
            value: arguments.len(),
        })?;
        e.add(callee)?;
        for argument in arguments {
            e.add(argument)?;
        }
        e.op_with(Opcode::Call, count);
        Ok(())
    })
}

pub fn ret<'a>(value: Code<'a>) -> Code<'a> {
    unary(value, Opcode::Return)
}

/// Prints `value`, consuming it.
pub fn print<'a>(value: Code<'a>) -> Code<'a> {
    unary(value, Opcode::Print)
}

// -----------------------------------------------------------------------------
// statements
// -----------------------------------------------------------------------------

pub fn sequence<'a>(codes: Vec<Code<'a>>) -> Code<'a> {
    Code::new(move |e| {
        for code in codes {
            e.add(code)?;
        }
        Ok(())
    })
}

pub fn if_then<'a>(condition: Code<'a>, then: Code<'a>) -> Code<'a> {
    if_chain(vec![(condition, then)], Code::empty())
}

/// `if (c0) {b0} else if (c1) {b1} ... else {otherwise}`
///
/// A taken branch pops its condition before the body; the fall-through path
/// pops the last condition it evaluated.
pub fn if_chain<'a>(branches: Vec<(Code<'a>, Code<'a>)>, otherwise: Code<'a>) -> Code<'a> {
    Code::new(move |e| {
        let after_all = e.loose_label("after if");
        for (condition, body) in branches {
            let next = e.loose_label("next branch");
            e.add(condition)?;
            e.jump_forward_if_false(next)?;
            e.op(Opcode::Pop);
            e.add(body)?;
            e.jump_to(after_all)?;
            e.place_label(next)?;
            e.op(Opcode::Pop);
        }
        e.add(otherwise)?;
        e.place_label(after_all)
    })
}

pub fn while_loop<'a>(condition: Code<'a>, body: Code<'a>) -> Code<'a> {
    Code::new(move |e| {
        let before = e.loose_label("before loop");
        let after = e.loose_label("after body");
        e.place_label(before)?;
        e.add(condition)?;
        e.jump_forward_if_false(after)?;
        e.op(Opcode::Pop);
        e.add(body)?;
        e.jump_to(before)?;
        e.place_label(after)?;
        e.op(Opcode::Pop);
        Ok(())
    })
}
