//! AST node definitions and data structures.
//!
//! This module contains the core AST node types: the [`NodeKind`] enum with
//! one variant per uC construct, plus the data structs backing the larger
//! variants. Child arity is enforced by construction: required children are
//! plain [`NodeRef`] fields, optional children are `Option<NodeRef>`, and
//! list-valued children are `ThinVec<NodeRef>` — a node with a missing
//! required child is unrepresentable.

use serde::Serialize;
use thin_vec::ThinVec;

use crate::ast::{Literal, NodeRef, Symbol};
use crate::ir::PrimType;

/// The core enum defining all possible AST node types for uC.
/// Variants use NodeRef for child references, enabling flattened storage.
#[derive(Debug, Clone)]
pub enum NodeKind {
    // --- Top level ---
    Program(ProgramData),
    GlobalDecl(ThinVec<NodeRef>),

    // --- Declarations ---
    Decl(DeclData),
    DeclList(ThinVec<NodeRef>),
    VarDecl { name: Symbol, ty: NodeRef },
    ArrayDecl { ty: NodeRef, dims: Option<NodeRef> },
    FuncDecl { ty: NodeRef, params: Option<NodeRef> },
    FuncDef(FuncDefData),
    ParamList(ThinVec<NodeRef>),
    InitList(ThinVec<NodeRef>),
    TypeSpec(PrimType),

    // --- Expressions ---
    Identifier(Symbol),
    Constant(Literal),
    ArrayRef { name: NodeRef, subscript: NodeRef },
    Assignment(AssignOp, NodeRef /* lvalue */, NodeRef /* rvalue */),
    BinaryOp(BinOp, NodeRef, NodeRef),
    UnaryOp(UnOp, NodeRef),
    Cast { ty: NodeRef, expr: NodeRef },
    FuncCall { name: NodeRef, args: Option<NodeRef> },
    ExprList(ThinVec<NodeRef>),

    // --- Statements ---
    Compound(CompoundData),
    If(IfStmt),
    While(WhileStmt),
    For(ForStmt),
    Assert { expr: NodeRef },
    Break,
    Return { expr: Option<NodeRef> },
    Print { expr: Option<NodeRef> },
    Read { expr: NodeRef },
    EmptyStatement,
}

impl NodeKind {
    /// The variant name, used by the dumper and by diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Program(_) => "Program",
            NodeKind::GlobalDecl(_) => "GlobalDecl",
            NodeKind::Decl(_) => "Decl",
            NodeKind::DeclList(_) => "DeclList",
            NodeKind::VarDecl { .. } => "VarDecl",
            NodeKind::ArrayDecl { .. } => "ArrayDecl",
            NodeKind::FuncDecl { .. } => "FuncDecl",
            NodeKind::FuncDef(_) => "FuncDef",
            NodeKind::ParamList(_) => "ParamList",
            NodeKind::InitList(_) => "InitList",
            NodeKind::TypeSpec(_) => "TypeSpec",
            NodeKind::Identifier(_) => "Identifier",
            NodeKind::Constant(_) => "Constant",
            NodeKind::ArrayRef { .. } => "ArrayRef",
            NodeKind::Assignment(..) => "Assignment",
            NodeKind::BinaryOp(..) => "BinaryOp",
            NodeKind::UnaryOp(..) => "UnaryOp",
            NodeKind::Cast { .. } => "Cast",
            NodeKind::FuncCall { .. } => "FuncCall",
            NodeKind::ExprList(_) => "ExprList",
            NodeKind::Compound(_) => "Compound",
            NodeKind::If(_) => "If",
            NodeKind::While(_) => "While",
            NodeKind::For(_) => "For",
            NodeKind::Assert { .. } => "Assert",
            NodeKind::Break => "Break",
            NodeKind::Return { .. } => "Return",
            NodeKind::Print { .. } => "Print",
            NodeKind::Read { .. } => "Read",
            NodeKind::EmptyStatement => "EmptyStatement",
        }
    }
}

// Structs for the larger variants, kept separate so NodeKind stays small.

/// Top of the AST: a uC translation unit, a list of global declarations
/// and function definitions.
#[derive(Debug, Clone)]
pub struct ProgramData {
    pub gdecls: ThinVec<NodeRef>,
}

/// A single declaration: name, declarator chain, optional initializer.
#[derive(Debug, Clone)]
pub struct DeclData {
    pub name: Symbol,
    pub ty: NodeRef, // VarDecl, ArrayDecl, or FuncDecl
    pub init: Option<NodeRef>,
}

#[derive(Debug, Clone)]
pub struct FuncDefData {
    pub ty: NodeRef,   // TypeSpec of the return type
    pub decl: NodeRef, // Decl whose chain ends in FuncDecl -> VarDecl
    pub params: Option<NodeRef>,
    pub body: Option<NodeRef>,
}

/// A block: declarations first, then statements.
#[derive(Debug, Clone)]
pub struct CompoundData {
    pub decls: ThinVec<NodeRef>,
    pub stats: ThinVec<NodeRef>,
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub cond: NodeRef,
    pub if_stat: Option<NodeRef>,
    pub else_stat: Option<NodeRef>,
}

#[derive(Debug, Clone)]
pub struct WhileStmt {
    pub cond: NodeRef,
    pub body: Option<NodeRef>,
}

#[derive(Debug, Clone)]
pub struct ForStmt {
    pub init: Option<NodeRef>,
    pub cond: Option<NodeRef>,
    pub next: Option<NodeRef>,
    pub body: Option<NodeRef>,
}

/// Binary operators, arithmetic and relational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinOp {
    /// The IR opcode stem for this operator (type suffix added at emission).
    pub fn opcode(self) -> &'static str {
        match self {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::Div => "div",
            BinOp::Mod => "mod",
            BinOp::Lt => "lt",
            BinOp::Gt => "gt",
            BinOp::Le => "le",
            BinOp::Ge => "ge",
            BinOp::Eq => "eq",
            BinOp::Ne => "ne",
            BinOp::And => "and",
            BinOp::Or => "or",
        }
    }

    /// The source-level operator symbol, used by the dumper.
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnOp {
    Plus,
    Minus,
}

impl UnOp {
    pub fn opcode(self) -> &'static str {
        match self {
            UnOp::Plus => "uadd",
            UnOp::Minus => "uneg",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            UnOp::Plus => "+",
            UnOp::Minus => "-",
        }
    }
}

/// Assignment operators. The lowering treats every form as a plain store;
/// compound forms are desugared by the front end before checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
}

impl AssignOp {
    pub fn symbol(self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::AddAssign => "+=",
            AssignOp::SubAssign => "-=",
            AssignOp::MulAssign => "*=",
            AssignOp::DivAssign => "/=",
            AssignOp::ModAssign => "%=",
        }
    }
}
