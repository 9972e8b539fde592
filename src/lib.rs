//! Three-address IR generation for the uC language.
//!
//! This crate is the middle stage of a uC compiler: it lowers a parsed,
//! type-checked AST into a linear three-address intermediate representation.
//! Parsing and semantic checking happen upstream; code generation from the
//! IR happens downstream.
//!
//! The pipeline surface is small: build an [`Ast`] (normally done by the
//! front end), attach the checker's [`SemanticInfo`], then run
//! [`IrGenerator::generate`] and render the result with [`ir::render`].
//!
//! ```no_run
//! use ucir::{Ast, IrGenerator, NodeRef};
//!
//! fn lower(ast: &Ast, root: NodeRef) -> Result<String, ucir::Error> {
//!     let code = IrGenerator::new(ast).generate(root)?;
//!     Ok(ucir::ir::render(&code))
//! }
//! ```

pub mod ast;
pub mod error;
pub mod ir;
pub mod scopes;

pub use ast::{Ast, Coord, NodeRef, SemanticInfo, Symbol};
pub use error::Error;
pub use ir::{Instr, IrGenError, IrGenerator, Label, PrimType, Value};
pub use scopes::{ScopeError, ScopeStack};
