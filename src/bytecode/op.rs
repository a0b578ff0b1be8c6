use serde::{Deserialize, Serialize};

/// Bytecode instruction opcodes.
///
/// Discriminants are stable small integers so serialized program images
/// stay readable across builds. Each opcode carries a fixed number of
/// value-pool operands (see `operand_count`); the image builder rejects
/// instructions with a mismatched operand list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OpCode {
    /// Write the pool operand to the output sink, followed by a newline.
    Print = 0,

    /// Push the pool operand onto the current frame's stack.
    Push = 1,

    /// Pop two numbers, combine, push the result.
    Add = 2,
    Sub = 3,
    Mul = 4,
    Div = 5,

    /// Pop one value and bind it to the operand name in the current frame.
    StoreLocal = 6,

    /// Look up the operand name in the current frame and push its value.
    LoadLocal = 7,

    /// Resolve the operand name in the function registry, move the
    /// callee's arguments off the caller's stack, and enter a new frame.
    Call = 8,

    /// Pop the current frame; an operand-stack top, if any, becomes the
    /// return value on the caller's stack.
    Return = 9,

    /// Pop two numbers and push 1.0 or 0.0.
    Equal = 10,
    BangEqual = 11,
    LessEqual = 12,
    GreaterEqual = 13,
    Less = 14,
    Greater = 15,

    /// Pop two numbers, treat non-zero as true, push 1.0 or 0.0.
    And = 16,
    Or = 17,

    /// Pop one number and jump to the first label operand when it is
    /// non-zero, to the second otherwise.
    Branch = 18,
}

impl OpCode {
    /// Number of value-pool operands the opcode carries.
    pub fn operand_count(self) -> usize {
        match self {
            OpCode::Print
            | OpCode::Push
            | OpCode::StoreLocal
            | OpCode::LoadLocal
            | OpCode::Call => 1,
            OpCode::Branch => 2,
            _ => 0,
        }
    }

    /// Mnemonic used by the disassembler and runtime diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            OpCode::Print => "PRINT",
            OpCode::Push => "PUSH",
            OpCode::Add => "ADD",
            OpCode::Sub => "SUB",
            OpCode::Mul => "MUL",
            OpCode::Div => "DIV",
            OpCode::StoreLocal => "STORE_LOCAL",
            OpCode::LoadLocal => "LOAD_LOCAL",
            OpCode::Call => "CALL",
            OpCode::Return => "RETURN",
            OpCode::Equal => "EQUAL",
            OpCode::BangEqual => "BANG_EQUAL",
            OpCode::LessEqual => "LESS_EQUAL",
            OpCode::GreaterEqual => "GREATER_EQUAL",
            OpCode::Less => "LESS",
            OpCode::Greater => "GREATER",
            OpCode::And => "AND",
            OpCode::Or => "OR",
            OpCode::Branch => "BRANCH",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: &[OpCode] = &[
        OpCode::Print,
        OpCode::Push,
        OpCode::Add,
        OpCode::Sub,
        OpCode::Mul,
        OpCode::Div,
        OpCode::StoreLocal,
        OpCode::LoadLocal,
        OpCode::Call,
        OpCode::Return,
        OpCode::Equal,
        OpCode::BangEqual,
        OpCode::LessEqual,
        OpCode::GreaterEqual,
        OpCode::Less,
        OpCode::Greater,
        OpCode::And,
        OpCode::Or,
        OpCode::Branch,
    ];

    #[test]
    fn test_operand_counts() {
        assert_eq!(OpCode::Push.operand_count(), 1);
        assert_eq!(OpCode::Print.operand_count(), 1);
        assert_eq!(OpCode::StoreLocal.operand_count(), 1);
        assert_eq!(OpCode::LoadLocal.operand_count(), 1);
        assert_eq!(OpCode::Call.operand_count(), 1);
        assert_eq!(OpCode::Branch.operand_count(), 2);
        assert_eq!(OpCode::Add.operand_count(), 0);
        assert_eq!(OpCode::Return.operand_count(), 0);
        assert_eq!(OpCode::Equal.operand_count(), 0);
    }

    #[test]
    fn test_discriminants_are_distinct() {
        for (i, a) in ALL.iter().enumerate() {
            for b in &ALL[i + 1..] {
                assert_ne!(*a as u8, *b as u8);
            }
        }
    }

    #[test]
    fn test_names_are_distinct() {
        for (i, a) in ALL.iter().enumerate() {
            for b in &ALL[i + 1..] {
                assert_ne!(a.name(), b.name());
            }
        }
    }
}
