//! Abstract Syntax Tree (AST) for the uC language.
//!
//! This module provides the core AST data structures for representing a
//! parsed, checked uC program. The AST is designed as a flattened storage
//! system for efficiency, with index-based references to child nodes.
//!
//! ## Architecture
//!
//! - [`nodes`]: Node definitions and data structures for all uC node kinds
//! - [`literal`]: Constant literal values and their primitive types
//! - [`visitor`]: Ordered child enumeration and generic preorder traversal
//! - [`dumper`]: Debug pretty-printer for AST trees
//!
//! ## Key Features
//!
//! - **Flattened Storage**: All AST nodes are stored in contiguous vectors
//!   with index-based references, so the tree is a strict single-parent
//!   structure by construction
//! - **Side Annotations**: Checker-resolved types live in a [`SemanticInfo`]
//!   side table keyed by node identity; the tree itself stays immutable and
//!   reusable across lowering runs

use serde::Serialize;
use std::fmt;
use std::num::NonZeroU32;

use crate::ir::PrimType;

/// Represents an interned string using the symbol_table crate.
pub type Symbol = symbol_table::GlobalSymbol;

pub mod dumper;
pub mod literal;
pub mod nodes;
pub mod visitor;

pub use literal::Literal;
pub use nodes::*;
pub use visitor::{children, walk, AstVisitor, ChildLabel};

/// The flattened AST storage.
/// All nodes live in contiguous vectors addressed by [`NodeRef`].
#[derive(Debug, Default)]
pub struct Ast {
    pub kinds: Vec<NodeKind>,
    pub coords: Vec<Option<Coord>>,
    pub semantic_info: Option<SemanticInfo>, // Populated by the external checker
}

impl Ast {
    /// Create a new empty AST
    pub fn new() -> Self {
        Ast::default()
    }

    /// Add a node to the AST and return its reference.
    /// Called by the external front end while building the tree.
    pub fn push_node(&mut self, kind: NodeKind, coord: Option<Coord>) -> NodeRef {
        let index = self.kinds.len() as u32 + 1; // Start from 1 for NonZeroU32
        self.kinds.push(kind);
        self.coords.push(coord);
        NodeRef::new(index).expect("NodeRef overflow")
    }

    /// Get node kind by reference
    pub fn get_kind(&self, node_ref: NodeRef) -> &NodeKind {
        &self.kinds[node_ref.index()]
    }

    /// Get node source coordinate by reference
    pub fn get_coord(&self, node_ref: NodeRef) -> Option<Coord> {
        self.coords[node_ref.index()]
    }

    /// Attach the semantic info side table (populated by the external checker)
    pub fn attach_semantic_info(&mut self, semantic_info: SemanticInfo) {
        self.semantic_info = Some(semantic_info);
    }

    /// Get the checker-resolved primitive type for a node
    pub fn get_resolved_type(&self, node_ref: NodeRef) -> Option<PrimType> {
        self.semantic_info.as_ref()?.type_of(node_ref)
    }
}

/// Node reference type for referencing child nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(NonZeroU32);

impl NodeRef {
    pub fn new(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(Self)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }

    pub fn index(self) -> usize {
        (self.get() - 1) as usize
    }
}

/// Source coordinate of a syntactic element: line and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Coord {
    pub line: u32,
    pub column: u32,
}

impl Coord {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Side table of checker-resolved types, indexed by node identity.
/// Produced by the external checker and attached to the [`Ast`] before
/// IR generation runs.
#[derive(Debug, Default)]
pub struct SemanticInfo {
    types: Vec<Option<PrimType>>,
}

impl SemanticInfo {
    pub fn new() -> Self {
        SemanticInfo::default()
    }

    /// Record the resolved primitive type of a node
    pub fn set_type(&mut self, node_ref: NodeRef, ty: PrimType) {
        let index = node_ref.index();
        if index >= self.types.len() {
            self.types.resize(index + 1, None);
        }
        self.types[index] = Some(ty);
    }

    /// Look up the resolved primitive type of a node
    pub fn type_of(&self, node_ref: NodeRef) -> Option<PrimType> {
        self.types.get(node_ref.index()).copied().flatten()
    }
}
