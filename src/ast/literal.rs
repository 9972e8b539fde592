//! Constant literal values.

use serde::Serialize;
use std::fmt;

use crate::ir::PrimType;

/// A literal constant carried by a `Constant` node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Char(char),
    Str(String),
}

impl Literal {
    /// The primitive type implied by the literal's own shape.
    /// The checker's side-table annotation takes precedence during lowering.
    pub fn prim_type(&self) -> PrimType {
        match self {
            Literal::Int(_) => PrimType::Int,
            Literal::Float(_) => PrimType::Float,
            Literal::Char(_) => PrimType::Char,
            Literal::Str(_) => PrimType::String,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{}", v),
            Literal::Float(v) => write!(f, "{}", v),
            Literal::Char(c) => write!(f, "'{}'", c),
            Literal::Str(s) => write!(f, "\"{}\"", s),
        }
    }
}
