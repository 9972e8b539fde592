//! IR generation errors.
//!
//! Every variant is a fatal internal invariant violation: lowering aborts on
//! the first one, since subsequent instructions would reference undefined
//! locations. Source-level assertion failures are not errors here; they are
//! emitted as IR and evaluated at the generated program's runtime.

use std::fmt;

use thiserror::Error;

use crate::ast::Coord;
use crate::scopes::ScopeError;

/// Wrapper so error messages render ` at line:column` when a coordinate is
/// recorded and nothing when it is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaybeCoord(pub Option<Coord>);

impl fmt::Display for MaybeCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(coord) => write!(f, " at {}", coord),
            None => Ok(()),
        }
    }
}

impl From<Option<Coord>> for MaybeCoord {
    fn from(coord: Option<Coord>) -> Self {
        MaybeCoord(coord)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum IrGenError {
    #[error(transparent)]
    Scope(#[from] ScopeError),

    #[error("no lowering rule for {kind} node{coord}")]
    UnhandledNode { kind: &'static str, coord: MaybeCoord },

    #[error("missing resolved type for {kind} node{coord}")]
    MissingType { kind: &'static str, coord: MaybeCoord },

    #[error("no value location recorded for {kind} node{coord}")]
    MissingLocation { kind: &'static str, coord: MaybeCoord },

    #[error("break outside of a loop{coord}")]
    BreakOutsideLoop { coord: MaybeCoord },

    #[error("malformed function node{coord}")]
    MalformedFunction { coord: MaybeCoord },

    #[error("{construct} outside of a function{coord}")]
    OutsideFunction {
        construct: &'static str,
        coord: MaybeCoord,
    },
}
