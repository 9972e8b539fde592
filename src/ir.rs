//! Three-address intermediate representation.
//!
//! The IR is a flat, ordered sequence of [`Instr`] values. No basic-block
//! structure is materialized: label markers and control instructions delimit
//! blocks implicitly. Typed opcodes carry their operand type as a suffix
//! (`add_int`, `store_float`, `literal_char`), rendered by the [`Display`]
//! impls here; [`render`] turns a whole instruction sequence into text.
//!
//! [`Display`]: std::fmt::Display

use serde::Serialize;
use std::fmt;
use std::fmt::Write;

use crate::ast::nodes::{BinOp, UnOp};
use crate::ast::{Literal, Symbol};

pub mod error;
pub mod generator;
#[cfg(test)]
mod tests_generator;

pub use error::IrGenError;
pub use generator::IrGenerator;

/// Primitive operand types of uC; the `_<type>` suffix on typed opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PrimType {
    Void,
    Int,
    Float,
    Char,
    String,
}

impl PrimType {
    pub fn suffix(self) -> &'static str {
        match self {
            PrimType::Void => "void",
            PrimType::Int => "int",
            PrimType::Float => "float",
            PrimType::Char => "char",
            PrimType::String => "string",
        }
    }
}

impl fmt::Display for PrimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// A value location: a per-function virtual register or a symbolic
/// global address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    /// Virtual register, rendered `%n`. Numbering is per function and
    /// monotone; never reused.
    Temp(u32),
    /// Symbolic global address, rendered `@name`.
    Global(Symbol),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Temp(n) => write!(f, "%{}", n),
            Value::Global(name) => write!(f, "@{}", name),
        }
    }
}

/// A jump target. Labels draw from the same counter as temporaries, so a
/// minted number is used as a register or as a label, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(pub u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One IR instruction. Three shapes recur: value-producing (operands then
/// destination), control (`Jump`/`CBranch`), and the bare label marker.
#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    /// Label marker, rendered `n:`.
    Label(Label),
    Jump(Label),
    CBranch {
        cond: Value,
        true_target: Label,
        false_target: Label,
    },
    /// Start-of-function marker.
    Define { name: Symbol },
    /// Global variable pseudo-instruction, with the initializer's value
    /// location when one exists.
    Global {
        ty: PrimType,
        addr: Value,
        init: Option<Value>,
    },
    /// Stack allocation for a named local; `dest` is the slot's address.
    Alloc {
        ty: PrimType,
        name: Symbol,
        dest: Value,
    },
    Load {
        ty: PrimType,
        src: Value,
        dest: Value,
    },
    Store {
        ty: PrimType,
        src: Value,
        dest: Value,
    },
    /// Materialize a literal into a fresh register.
    Literal {
        ty: PrimType,
        value: Literal,
        dest: Value,
    },
    Binary {
        op: BinOp,
        ty: PrimType,
        left: Value,
        right: Value,
        dest: Value,
    },
    Unary {
        op: UnOp,
        ty: PrimType,
        operand: Value,
        dest: Value,
    },
    /// One argument of an imminent `Call`, typed by the argument itself.
    Param { ty: PrimType, value: Value },
    /// `dest` is `None` for calls whose checked type is void.
    Call { name: Symbol, dest: Option<Value> },
    Return { ty: PrimType, value: Value },
    ReturnVoid,
    /// `value` is `None` for a bare `print;`, which renders `print_void`.
    Print { ty: PrimType, value: Option<Value> },
    Read { ty: PrimType, value: Value },
    /// Float-to-int conversion, in place on the operand's location.
    FpToSi { value: Value },
    /// Int-to-float conversion, in place on the operand's location.
    SiToFp { value: Value },
    /// Runtime diagnostic carrying a fixed message (assertion failures).
    PrintString { message: String },
}

impl fmt::Display for Instr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instr::Label(label) => write!(f, "{}:", label),
            Instr::Jump(target) => write!(f, "jump {}", target),
            Instr::CBranch {
                cond,
                true_target,
                false_target,
            } => write!(f, "cbranch {} {} {}", cond, true_target, false_target),
            Instr::Define { name } => write!(f, "define {}", name),
            Instr::Global { ty, addr, init } => {
                write!(f, "global_{} {}", ty, addr)?;
                if let Some(init) = init {
                    write!(f, " {}", init)?;
                }
                Ok(())
            }
            Instr::Alloc { ty, name, dest } => write!(f, "alloc_{} {} {}", ty, name, dest),
            Instr::Load { ty, src, dest } => write!(f, "load_{} {} {}", ty, src, dest),
            Instr::Store { ty, src, dest } => write!(f, "store_{} {} {}", ty, src, dest),
            Instr::Literal { ty, value, dest } => write!(f, "literal_{} {} {}", ty, value, dest),
            Instr::Binary {
                op,
                ty,
                left,
                right,
                dest,
            } => write!(f, "{}_{} {} {} {}", op.opcode(), ty, left, right, dest),
            Instr::Unary {
                op,
                ty,
                operand,
                dest,
            } => write!(f, "{}_{} {} {}", op.opcode(), ty, operand, dest),
            Instr::Param { ty, value } => write!(f, "param_{} {}", ty, value),
            Instr::Call { name, dest } => match dest {
                Some(dest) => write!(f, "call {} {}", name, dest),
                None => write!(f, "call {}", name),
            },
            Instr::Return { ty, value } => write!(f, "return_{} {}", ty, value),
            Instr::ReturnVoid => f.write_str("return_void"),
            Instr::Print { ty, value } => match value {
                Some(value) => write!(f, "print_{} {}", ty, value),
                None => f.write_str("print_void"),
            },
            Instr::Read { ty, value } => write!(f, "read_{} {}", ty, value),
            Instr::FpToSi { value } => write!(f, "fptosi {}", value),
            Instr::SiToFp { value } => write!(f, "sitofp {}", value),
            Instr::PrintString { message } => write!(f, "print_string \"{}\"", message),
        }
    }
}

/// Render an instruction sequence as text, one instruction per line.
pub fn render(code: &[Instr]) -> String {
    let mut out = String::new();
    for instr in code {
        let _ = writeln!(out, "{}", instr);
    }
    out
}
