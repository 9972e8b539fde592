//! Debug pretty-printer for AST trees.
//!
//! Renders a tree rooted at a node as indented text, one node per line:
//! the child label, the variant name, the node-local attributes, and the
//! source coordinate when one is recorded.

use std::fmt::Write;

use crate::ast::nodes::NodeKind;
use crate::ast::{children, Ast, ChildLabel, NodeRef};

const INDENT: usize = 4;

pub struct AstDumper<'a> {
    ast: &'a Ast,
    out: String,
}

impl<'a> AstDumper<'a> {
    pub fn new(ast: &'a Ast) -> Self {
        Self {
            ast,
            out: String::new(),
        }
    }

    /// Render the tree rooted at `root` into a string.
    pub fn dump(mut self, root: NodeRef) -> String {
        self.dump_node(root, None, 0);
        self.out
    }

    fn dump_node(&mut self, node_ref: NodeRef, label: Option<ChildLabel>, depth: usize) {
        for _ in 0..depth * INDENT {
            self.out.push(' ');
        }
        if let Some(label) = label {
            let _ = write!(self.out, "{}: ", label);
        }
        self.out.push_str(&self.header(node_ref));
        self.out.push('\n');
        for (label, child) in children(self.ast, node_ref) {
            self.dump_node(child, Some(label), depth + 1);
        }
    }

    /// One line for the node itself: variant name, attributes, coordinate.
    fn header(&self, node_ref: NodeRef) -> String {
        let kind = self.ast.get_kind(node_ref);
        let mut line = kind.name().to_string();
        match kind {
            NodeKind::Identifier(name) => {
                let _ = write!(line, "({})", name);
            }
            NodeKind::Constant(lit) => {
                let _ = write!(line, "({})", lit);
            }
            NodeKind::TypeSpec(ty) => {
                let _ = write!(line, "({})", ty);
            }
            NodeKind::Decl(data) => {
                let _ = write!(line, "(name={})", data.name);
            }
            NodeKind::VarDecl { name, .. } => {
                let _ = write!(line, "({})", name);
            }
            NodeKind::Assignment(op, ..) => {
                let _ = write!(line, "({})", op.symbol());
            }
            NodeKind::BinaryOp(op, ..) => {
                let _ = write!(line, "({})", op.symbol());
            }
            NodeKind::UnaryOp(op, _) => {
                let _ = write!(line, "({})", op.symbol());
            }
            _ => {}
        }
        if let Some(coord) = self.ast.get_coord(node_ref) {
            let _ = write!(line, " (at {})", coord);
        }
        line
    }
}

/// Convenience wrapper over [`AstDumper`].
pub fn dump(ast: &Ast, root: NodeRef) -> String {
    AstDumper::new(ast).dump(root)
}
