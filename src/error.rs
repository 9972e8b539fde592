//! Crate-level error type aggregating the per-component errors.

use thiserror::Error;

use crate::ir::IrGenError;
use crate::scopes::ScopeError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Scope(#[from] ScopeError),

    #[error(transparent)]
    IrGen(#[from] IrGenError),
}
