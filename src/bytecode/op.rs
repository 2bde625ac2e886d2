// =============================================================================
// OP - Bytecode instructions
// =============================================================================

/// One-byte opcodes understood by the runtime.
///
/// Every opcode is followed by a fixed number of argument bytes (0 or 1), see
/// [`Opcode::argument_bytes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    // literals
    Constant = 0x00, // @pool
    Null = 0x01,
    True = 0x02,
    False = 0x03,

    // stack
    Pop = 0x04,

    // variables
    GetLocal = 0x05,  // slot
    SetLocal = 0x06,  // slot
    GetGlobal = 0x07, // @pool (name)
    SetGlobal = 0x08, // @pool (name)

    // objects
    GetField = 0x09, // @pool (field name)
    SetField = 0x0A, // @pool (field name)
    NewInstance = 0x0B,

    // comparison
    Equal = 0x0C,
    Greater = 0x0D,
    Less = 0x0E,

    // arithmetic
    Add = 0x0F,
    Subtract = 0x10,
    Multiply = 0x11,
    Divide = 0x12,

    // unary
    Not = 0x13,
    Negate = 0x14,

    // I/O
    Print = 0x15,

    // ==========================================================================
    // Control flow
    // ==========================================================================
    /// Skip `offset` bytes forward, counted from the byte after the jump.
    JumpForward = 0x16,

    /// Like `JumpForward`, but only when the top of stack is false.
    /// The condition is peeked, not popped.
    JumpForwardIfFalse = 0x17,

    /// Move `offset` bytes backward, counted from the byte after the jump.
    JumpBackward = 0x18,

    /// ( callee args... -- result ), argument is the argument count.
    Call = 0x19,
    Return = 0x1A,
}

impl Opcode {
    pub const ALL: [Opcode; 27] = [
        Opcode::Constant,
        Opcode::Null,
        Opcode::True,
        Opcode::False,
        Opcode::Pop,
        Opcode::GetLocal,
        Opcode::SetLocal,
        Opcode::GetGlobal,
        Opcode::SetGlobal,
        Opcode::GetField,
        Opcode::SetField,
        Opcode::NewInstance,
        Opcode::Equal,
        Opcode::Greater,
        Opcode::Less,
        Opcode::Add,
        Opcode::Subtract,
        Opcode::Multiply,
        Opcode::Divide,
        Opcode::Not,
        Opcode::Negate,
        Opcode::Print,
        Opcode::JumpForward,
        Opcode::JumpForwardIfFalse,
        Opcode::JumpBackward,
        Opcode::Call,
        Opcode::Return,
    ];

    pub fn byte(self) -> u8 {
        self as u8
    }

    pub fn from_byte(byte: u8) -> Option<Opcode> {
        Opcode::ALL.get(byte as usize).copied()
    }

    /// Number of argument bytes following the opcode byte.
    pub fn argument_bytes(self) -> usize {
        match self {
            Opcode::Constant
            | Opcode::GetLocal
            | Opcode::SetLocal
            | Opcode::GetGlobal
            | Opcode::SetGlobal
            | Opcode::GetField
            | Opcode::SetField
            | Opcode::JumpForward
            | Opcode::JumpForwardIfFalse
            | Opcode::JumpBackward
            | Opcode::Call => 1,
            _ => 0,
        }
    }

    /// True when the argument byte indexes the chunk's constant pool.
    pub fn takes_constant(self) -> bool {
        matches!(
            self,
            Opcode::Constant
                | Opcode::GetGlobal
                | Opcode::SetGlobal
                | Opcode::GetField
                | Opcode::SetField
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Opcode::Constant => "Constant",
            Opcode::Null => "Null",
            Opcode::True => "True",
            Opcode::False => "False",
            Opcode::Pop => "Pop",
            Opcode::GetLocal => "GetLocal",
            Opcode::SetLocal => "SetLocal",
            Opcode::GetGlobal => "GetGlobal",
            Opcode::SetGlobal => "SetGlobal",
            Opcode::GetField => "GetField",
            Opcode::SetField => "SetField",
            Opcode::NewInstance => "NewInstance",
            Opcode::Equal => "Equal",
            Opcode::Greater => "Greater",
            Opcode::Less => "Less",
            Opcode::Add => "Add",
            Opcode::Subtract => "Subtract",
            Opcode::Multiply => "Multiply",
            Opcode::Divide => "Divide",
            Opcode::Not => "Not",
            Opcode::Negate => "Negate",
            Opcode::Print => "Print",
            Opcode::JumpForward => "JumpForward",
            Opcode::JumpForwardIfFalse => "JumpForwardIfFalse",
            Opcode::JumpBackward => "JumpBackward",
            Opcode::Call => "Call",
            Opcode::Return => "Return",
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A concrete instruction: opcode plus its argument byte, if it takes one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub argument: Option<u8>,
}

impl Instruction {
    pub fn simple(opcode: Opcode) -> Self {
        debug_assert_eq!(opcode.argument_bytes(), 0);
        Instruction {
            opcode,
            argument: None,
        }
    }

    pub fn with_argument(opcode: Opcode, argument: u8) -> Self {
        debug_assert_eq!(opcode.argument_bytes(), 1);
        Instruction {
            opcode,
            argument: Some(argument),
        }
    }

    /// Encoded size in bytes.
    pub fn byte_len(&self) -> usize {
        1 + self.opcode.argument_bytes()
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        out.push(self.opcode.byte());
        if let Some(argument) = self.argument {
            out.push(argument);
        }
    }
}

impl std::fmt::Display for Instruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.argument {
            Some(arg) if self.opcode.takes_constant() => write!(f, "{} @{}", self.opcode, arg),
            Some(arg) => write!(f, "{} {}", self.opcode, arg),
            None => write!(f, "{}", self.opcode),
        }
    }
}
