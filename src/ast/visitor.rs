//! Ordered child enumeration and generic AST traversal.
//!
//! [`children`] returns, for every node kind, exactly the non-null structural
//! children in a fixed declared order; list-valued fields expand to indexed
//! labels such as `gdecls[0]`. [`walk`] is a generic preorder traversal over
//! that enumeration, and [`AstVisitor`] lets a pass override the handling of
//! individual node kinds while falling back to the generic recursion for the
//! rest.

use std::fmt;

use crate::ast::nodes::*;
use crate::ast::{Ast, NodeRef};

/// The label a child is exposed under during generic traversal,
/// e.g. `cond`, `gdecls[0]`, `stats[2]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildLabel {
    pub name: &'static str,
    pub index: Option<usize>,
}

impl ChildLabel {
    fn named(name: &'static str) -> Self {
        Self { name, index: None }
    }

    fn indexed(name: &'static str, index: usize) -> Self {
        Self {
            name,
            index: Some(index),
        }
    }
}

impl fmt::Display for ChildLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(i) => write!(f, "{}[{}]", self.name, i),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Enumerate the structural children of a node in declared order.
/// Leaf kinds (Break, Constant, Identifier, EmptyStatement, TypeSpec)
/// yield an empty sequence; `None` children are omitted.
pub fn children(ast: &Ast, node_ref: NodeRef) -> Vec<(ChildLabel, NodeRef)> {
    let mut out = Vec::new();
    let mut named = |name: &'static str, child: NodeRef| {
        out.push((ChildLabel::named(name), child));
    };
    match ast.get_kind(node_ref) {
        NodeKind::Program(data) => {
            return indexed_children("gdecls", &data.gdecls);
        }
        NodeKind::GlobalDecl(decls) => {
            return indexed_children("decls", decls);
        }
        NodeKind::Decl(data) => {
            named("type", data.ty);
            if let Some(init) = data.init {
                named("init", init);
            }
        }
        NodeKind::DeclList(decls) => {
            return indexed_children("decls", decls);
        }
        NodeKind::VarDecl { ty, .. } => named("type", *ty),
        NodeKind::ArrayDecl { ty, dims } => {
            named("type", *ty);
            if let Some(dims) = dims {
                named("dims", *dims);
            }
        }
        NodeKind::FuncDecl { ty, params } => {
            named("type", *ty);
            if let Some(params) = params {
                named("params", *params);
            }
        }
        NodeKind::FuncDef(data) => {
            named("type", data.ty);
            named("decl", data.decl);
            if let Some(params) = data.params {
                named("params", params);
            }
            if let Some(body) = data.body {
                named("body", body);
            }
        }
        NodeKind::ParamList(params) => {
            return indexed_children("params", params);
        }
        NodeKind::InitList(exprs) => {
            return indexed_children("exprs", exprs);
        }
        NodeKind::ArrayRef { name, subscript } => {
            named("name", *name);
            named("subscript", *subscript);
        }
        NodeKind::Assignment(_, lvalue, rvalue) => {
            named("lvalue", *lvalue);
            named("rvalue", *rvalue);
        }
        NodeKind::BinaryOp(_, lvalue, rvalue) => {
            named("lvalue", *lvalue);
            named("rvalue", *rvalue);
        }
        NodeKind::UnaryOp(_, expr) => named("expr", *expr),
        NodeKind::Cast { ty, expr } => {
            named("type", *ty);
            named("expr", *expr);
        }
        NodeKind::FuncCall { name, args } => {
            named("name", *name);
            if let Some(args) = args {
                named("args", *args);
            }
        }
        NodeKind::ExprList(exprs) => {
            return indexed_children("exprs", exprs);
        }
        NodeKind::Compound(data) => {
            let mut out = indexed_children("decls", &data.decls);
            out.extend(indexed_children("stats", &data.stats));
            return out;
        }
        NodeKind::If(stmt) => {
            named("cond", stmt.cond);
            if let Some(if_stat) = stmt.if_stat {
                named("if_stat", if_stat);
            }
            if let Some(else_stat) = stmt.else_stat {
                named("else_stat", else_stat);
            }
        }
        NodeKind::While(stmt) => {
            named("cond", stmt.cond);
            if let Some(body) = stmt.body {
                named("body", body);
            }
        }
        NodeKind::For(stmt) => {
            if let Some(init) = stmt.init {
                named("init", init);
            }
            if let Some(cond) = stmt.cond {
                named("cond", cond);
            }
            if let Some(next) = stmt.next {
                named("next", next);
            }
            if let Some(body) = stmt.body {
                named("body", body);
            }
        }
        NodeKind::Assert { expr } => named("expr", *expr),
        NodeKind::Return { expr } => {
            if let Some(expr) = expr {
                named("expr", *expr);
            }
        }
        NodeKind::Print { expr } => {
            if let Some(expr) = expr {
                named("expr", *expr);
            }
        }
        NodeKind::Read { expr } => named("expr", *expr),
        // Leaf kinds
        NodeKind::Identifier(_)
        | NodeKind::Constant(_)
        | NodeKind::TypeSpec(_)
        | NodeKind::Break
        | NodeKind::EmptyStatement => {}
    }
    out
}

fn indexed_children(name: &'static str, refs: &[NodeRef]) -> Vec<(ChildLabel, NodeRef)> {
    refs.iter()
        .enumerate()
        .map(|(i, &child)| (ChildLabel::indexed(name, i), child))
        .collect()
}

/// Generic preorder walk: applies `f` to the node, then recurses into its
/// children in declared order.
pub fn walk(ast: &Ast, node_ref: NodeRef, f: &mut impl FnMut(NodeRef)) {
    f(node_ref);
    for (_, child) in children(ast, node_ref) {
        walk(ast, child, f);
    }
}

/// Trait for passes that handle some node kinds specially and fall back to
/// generic recursion for the rest. Every method defaults to
/// [`AstVisitor::generic_visit`], which recurses into the node's children.
pub trait AstVisitor {
    fn visit(&mut self, ast: &Ast, node_ref: NodeRef) {
        dispatch(self, ast, node_ref);
    }

    /// Preorder recursion into children, used when no kind-specific
    /// handler is overridden.
    fn generic_visit(&mut self, ast: &Ast, node_ref: NodeRef) {
        for (_, child) in children(ast, node_ref) {
            self.visit(ast, child);
        }
    }

    fn visit_program(&mut self, ast: &Ast, node_ref: NodeRef, _data: &ProgramData) {
        self.generic_visit(ast, node_ref);
    }
    fn visit_global_decl(&mut self, ast: &Ast, node_ref: NodeRef, _decls: &[NodeRef]) {
        self.generic_visit(ast, node_ref);
    }
    fn visit_decl(&mut self, ast: &Ast, node_ref: NodeRef, _data: &DeclData) {
        self.generic_visit(ast, node_ref);
    }
    fn visit_decl_list(&mut self, ast: &Ast, node_ref: NodeRef, _decls: &[NodeRef]) {
        self.generic_visit(ast, node_ref);
    }
    fn visit_var_decl(&mut self, ast: &Ast, node_ref: NodeRef) {
        self.generic_visit(ast, node_ref);
    }
    fn visit_array_decl(&mut self, ast: &Ast, node_ref: NodeRef) {
        self.generic_visit(ast, node_ref);
    }
    fn visit_func_decl(&mut self, ast: &Ast, node_ref: NodeRef) {
        self.generic_visit(ast, node_ref);
    }
    fn visit_func_def(&mut self, ast: &Ast, node_ref: NodeRef, _data: &FuncDefData) {
        self.generic_visit(ast, node_ref);
    }
    fn visit_param_list(&mut self, ast: &Ast, node_ref: NodeRef, _params: &[NodeRef]) {
        self.generic_visit(ast, node_ref);
    }
    fn visit_init_list(&mut self, ast: &Ast, node_ref: NodeRef, _exprs: &[NodeRef]) {
        self.generic_visit(ast, node_ref);
    }
    fn visit_type_spec(&mut self, ast: &Ast, node_ref: NodeRef) {
        self.generic_visit(ast, node_ref);
    }
    fn visit_identifier(&mut self, ast: &Ast, node_ref: NodeRef) {
        self.generic_visit(ast, node_ref);
    }
    fn visit_constant(&mut self, ast: &Ast, node_ref: NodeRef) {
        self.generic_visit(ast, node_ref);
    }
    fn visit_array_ref(&mut self, ast: &Ast, node_ref: NodeRef) {
        self.generic_visit(ast, node_ref);
    }
    fn visit_assignment(&mut self, ast: &Ast, node_ref: NodeRef) {
        self.generic_visit(ast, node_ref);
    }
    fn visit_binary_op(&mut self, ast: &Ast, node_ref: NodeRef) {
        self.generic_visit(ast, node_ref);
    }
    fn visit_unary_op(&mut self, ast: &Ast, node_ref: NodeRef) {
        self.generic_visit(ast, node_ref);
    }
    fn visit_cast(&mut self, ast: &Ast, node_ref: NodeRef) {
        self.generic_visit(ast, node_ref);
    }
    fn visit_func_call(&mut self, ast: &Ast, node_ref: NodeRef) {
        self.generic_visit(ast, node_ref);
    }
    fn visit_expr_list(&mut self, ast: &Ast, node_ref: NodeRef, _exprs: &[NodeRef]) {
        self.generic_visit(ast, node_ref);
    }
    fn visit_compound(&mut self, ast: &Ast, node_ref: NodeRef, _data: &CompoundData) {
        self.generic_visit(ast, node_ref);
    }
    fn visit_if(&mut self, ast: &Ast, node_ref: NodeRef, _stmt: &IfStmt) {
        self.generic_visit(ast, node_ref);
    }
    fn visit_while(&mut self, ast: &Ast, node_ref: NodeRef, _stmt: &WhileStmt) {
        self.generic_visit(ast, node_ref);
    }
    fn visit_for(&mut self, ast: &Ast, node_ref: NodeRef, _stmt: &ForStmt) {
        self.generic_visit(ast, node_ref);
    }
    fn visit_assert(&mut self, ast: &Ast, node_ref: NodeRef) {
        self.generic_visit(ast, node_ref);
    }
    fn visit_break(&mut self, ast: &Ast, node_ref: NodeRef) {
        self.generic_visit(ast, node_ref);
    }
    fn visit_return(&mut self, ast: &Ast, node_ref: NodeRef) {
        self.generic_visit(ast, node_ref);
    }
    fn visit_print(&mut self, ast: &Ast, node_ref: NodeRef) {
        self.generic_visit(ast, node_ref);
    }
    fn visit_read(&mut self, ast: &Ast, node_ref: NodeRef) {
        self.generic_visit(ast, node_ref);
    }
    fn visit_empty_statement(&mut self, ast: &Ast, node_ref: NodeRef) {
        self.generic_visit(ast, node_ref);
    }
}

/// Dispatch a node to the matching visitor method; exhaustive over
/// [`NodeKind`] so an unhandled variant is a compile error, not a silent
/// fallback.
pub fn dispatch<V: AstVisitor + ?Sized>(visitor: &mut V, ast: &Ast, node_ref: NodeRef) {
    match ast.get_kind(node_ref) {
        NodeKind::Program(data) => {
            let data = data.clone();
            visitor.visit_program(ast, node_ref, &data);
        }
        NodeKind::GlobalDecl(decls) => {
            let decls: Vec<NodeRef> = decls.to_vec();
            visitor.visit_global_decl(ast, node_ref, &decls);
        }
        NodeKind::Decl(data) => {
            let data = data.clone();
            visitor.visit_decl(ast, node_ref, &data);
        }
        NodeKind::DeclList(decls) => {
            let decls: Vec<NodeRef> = decls.to_vec();
            visitor.visit_decl_list(ast, node_ref, &decls);
        }
        NodeKind::VarDecl { .. } => visitor.visit_var_decl(ast, node_ref),
        NodeKind::ArrayDecl { .. } => visitor.visit_array_decl(ast, node_ref),
        NodeKind::FuncDecl { .. } => visitor.visit_func_decl(ast, node_ref),
        NodeKind::FuncDef(data) => {
            let data = data.clone();
            visitor.visit_func_def(ast, node_ref, &data);
        }
        NodeKind::ParamList(params) => {
            let params: Vec<NodeRef> = params.to_vec();
            visitor.visit_param_list(ast, node_ref, &params);
        }
        NodeKind::InitList(exprs) => {
            let exprs: Vec<NodeRef> = exprs.to_vec();
            visitor.visit_init_list(ast, node_ref, &exprs);
        }
        NodeKind::TypeSpec(_) => visitor.visit_type_spec(ast, node_ref),
        NodeKind::Identifier(_) => visitor.visit_identifier(ast, node_ref),
        NodeKind::Constant(_) => visitor.visit_constant(ast, node_ref),
        NodeKind::ArrayRef { .. } => visitor.visit_array_ref(ast, node_ref),
        NodeKind::Assignment(..) => visitor.visit_assignment(ast, node_ref),
        NodeKind::BinaryOp(..) => visitor.visit_binary_op(ast, node_ref),
        NodeKind::UnaryOp(..) => visitor.visit_unary_op(ast, node_ref),
        NodeKind::Cast { .. } => visitor.visit_cast(ast, node_ref),
        NodeKind::FuncCall { .. } => visitor.visit_func_call(ast, node_ref),
        NodeKind::ExprList(exprs) => {
            let exprs: Vec<NodeRef> = exprs.to_vec();
            visitor.visit_expr_list(ast, node_ref, &exprs);
        }
        NodeKind::Compound(data) => {
            let data = data.clone();
            visitor.visit_compound(ast, node_ref, &data);
        }
        NodeKind::If(stmt) => {
            let stmt = stmt.clone();
            visitor.visit_if(ast, node_ref, &stmt);
        }
        NodeKind::While(stmt) => {
            let stmt = stmt.clone();
            visitor.visit_while(ast, node_ref, &stmt);
        }
        NodeKind::For(stmt) => {
            let stmt = stmt.clone();
            visitor.visit_for(ast, node_ref, &stmt);
        }
        NodeKind::Assert { .. } => visitor.visit_assert(ast, node_ref),
        NodeKind::Break => visitor.visit_break(ast, node_ref),
        NodeKind::Return { .. } => visitor.visit_return(ast, node_ref),
        NodeKind::Print { .. } => visitor.visit_print(ast, node_ref),
        NodeKind::Read { .. } => visitor.visit_read(ast, node_ref),
        NodeKind::EmptyStatement => visitor.visit_empty_statement(ast, node_ref),
    }
}
