//! Tree-to-linear lowering of a checked AST into three-address code.
//!
//! [`IrGenerator`] walks the tree depth-first with one rule per node kind and
//! appends instructions to a single ordered buffer. The emitted sequence is
//! exactly the left-to-right, depth-first evaluation order of the source, so
//! lowering the same tree twice yields byte-identical code.
//!
//! Three allocators cut across the rules:
//!
//! - temporaries: one monotone counter per function name, never reused;
//! - labels: drawn from the same counter, so a minted number is a register
//!   or a label, never both;
//! - return sites: one return slot and one return label minted up front per
//!   function, so every `return` statement is a store plus a jump and the
//!   epilogue is the only real return.

use hashbrown::HashMap;
use log::debug;

use crate::ast::nodes::*;
use crate::ast::{Ast, NodeRef, Symbol};
use crate::ir::error::{IrGenError, MaybeCoord};
use crate::ir::{Instr, Label, PrimType, Value};
use crate::scopes::ScopeStack;

/// Lowering context threaded through the recursive calls: the current
/// function's temporary namespace, its return site, and the innermost
/// loop's exit label.
#[derive(Debug, Clone, Copy)]
struct FuncCtx {
    fname: Option<Symbol>,
    ret: Option<RetSite>,
    break_target: Option<Label>,
}

impl FuncCtx {
    fn toplevel() -> Self {
        FuncCtx {
            fname: None,
            ret: None,
            break_target: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct RetSite {
    /// Slot every `return` stores into.
    value: Value,
    /// Label of the single epilogue.
    label: Label,
}

/// The lowering engine. One-shot: build with [`IrGenerator::new`], consume
/// with [`IrGenerator::generate`]. The tree is only borrowed; all lowering
/// state lives here and is torn down with the generator.
pub struct IrGenerator<'a> {
    ast: &'a Ast,
    scopes: ScopeStack,
    /// Temporary counters, one per function name (`None` = global namespace).
    versions: HashMap<Option<Symbol>, u32>,
    /// Value locations of lowered expressions, keyed by node identity.
    locations: HashMap<NodeRef, Value>,
    code: Vec<Instr>,
}

impl<'a> IrGenerator<'a> {
    pub fn new(ast: &'a Ast) -> Self {
        IrGenerator {
            ast,
            scopes: ScopeStack::new(),
            versions: HashMap::new(),
            locations: HashMap::new(),
            code: Vec::new(),
        }
    }

    /// Lower the tree rooted at `root` and return the instruction sequence.
    pub fn generate(mut self, root: NodeRef) -> Result<Vec<Instr>, IrGenError> {
        self.lower(root, FuncCtx::toplevel())?;
        debug!("lowering finished: {} instructions", self.code.len());
        Ok(self.code)
    }

    // --- allocators ---

    fn next_number(&mut self, ctx: FuncCtx) -> u32 {
        let counter = self.versions.entry(ctx.fname).or_insert(0);
        let number = *counter;
        *counter += 1;
        number
    }

    fn new_temp(&mut self, ctx: FuncCtx) -> Value {
        Value::Temp(self.next_number(ctx))
    }

    fn new_label(&mut self, ctx: FuncCtx) -> Label {
        Label(self.next_number(ctx))
    }

    // --- lookups ---

    fn emit(&mut self, instr: Instr) {
        self.code.push(instr);
    }

    fn coord_of(&self, node_ref: NodeRef) -> MaybeCoord {
        MaybeCoord(self.ast.get_coord(node_ref))
    }

    /// The checked type of an expression node. Constants fall back to the
    /// type implied by their own shape; everything else must have been
    /// annotated by the checker.
    fn expr_type(&self, node_ref: NodeRef) -> Result<PrimType, IrGenError> {
        if let Some(ty) = self.ast.get_resolved_type(node_ref) {
            return Ok(ty);
        }
        if let NodeKind::Constant(lit) = self.ast.get_kind(node_ref) {
            return Ok(lit.prim_type());
        }
        Err(IrGenError::MissingType {
            kind: self.ast.get_kind(node_ref).name(),
            coord: self.coord_of(node_ref),
        })
    }

    /// The value location a previous rule recorded for `node_ref`.
    fn location_of(&self, node_ref: NodeRef) -> Result<Value, IrGenError> {
        self.locations
            .get(&node_ref)
            .copied()
            .ok_or(IrGenError::MissingLocation {
                kind: self.ast.get_kind(node_ref).name(),
                coord: self.coord_of(node_ref),
            })
    }

    fn type_spec(&self, node_ref: NodeRef) -> Result<PrimType, IrGenError> {
        match self.ast.get_kind(node_ref) {
            NodeKind::TypeSpec(ty) => Ok(*ty),
            kind => Err(IrGenError::MissingType {
                kind: kind.name(),
                coord: self.coord_of(node_ref),
            }),
        }
    }

    /// The primitive type at the bottom of a declarator chain.
    fn declarator_type(&self, node_ref: NodeRef) -> Result<PrimType, IrGenError> {
        match self.ast.get_kind(node_ref) {
            NodeKind::VarDecl { ty, .. } => self.type_spec(*ty),
            NodeKind::ArrayDecl { ty, .. } => self.declarator_type(*ty),
            NodeKind::TypeSpec(ty) => Ok(*ty),
            kind => Err(IrGenError::MissingType {
                kind: kind.name(),
                coord: self.coord_of(node_ref),
            }),
        }
    }

    /// The declared type of a parameter, which is either a full `Decl` or a
    /// bare declarator.
    fn param_type(&self, node_ref: NodeRef) -> Result<PrimType, IrGenError> {
        match self.ast.get_kind(node_ref) {
            NodeKind::Decl(data) => self.declarator_type(data.ty),
            _ => self.declarator_type(node_ref),
        }
    }

    /// Walk a function `Decl`'s declarator chain down to its `VarDecl`,
    /// collecting the declared name, the return type, and the parameter
    /// count along the way.
    fn func_signature(&self, decl: NodeRef) -> Result<(Symbol, PrimType, u32), IrGenError> {
        let malformed = || IrGenError::MalformedFunction {
            coord: self.coord_of(decl),
        };
        let mut cursor = match self.ast.get_kind(decl) {
            NodeKind::Decl(data) => data.ty,
            _ => return Err(malformed()),
        };
        let mut param_count = 0;
        loop {
            match self.ast.get_kind(cursor) {
                NodeKind::FuncDecl { ty, params } => {
                    if let Some(params) = params {
                        match self.ast.get_kind(*params) {
                            NodeKind::ParamList(list) => param_count = list.len() as u32,
                            _ => return Err(malformed()),
                        }
                    }
                    cursor = *ty;
                }
                NodeKind::ArrayDecl { ty, .. } => cursor = *ty,
                NodeKind::VarDecl { name, ty } => {
                    let ret_ty = self.type_spec(*ty)?;
                    return Ok((*name, ret_ty, param_count));
                }
                _ => return Err(malformed()),
            }
        }
    }

    // --- lowering rules, one per node kind ---

    fn lower(&mut self, node_ref: NodeRef, ctx: FuncCtx) -> Result<(), IrGenError> {
        let kind = self.ast.get_kind(node_ref).clone();
        match kind {
            NodeKind::Program(data) => {
                self.scopes.push_function_scope(None);
                for gdecl in &data.gdecls {
                    self.lower(*gdecl, ctx)?;
                }
                self.scopes.pop_scope()?;
            }

            NodeKind::GlobalDecl(decls) | NodeKind::DeclList(decls) => {
                for decl in &decls {
                    self.lower(*decl, ctx)?;
                }
            }

            NodeKind::Decl(data) => self.lower_decl(node_ref, &data, ctx)?,

            NodeKind::VarDecl { name, ty } => {
                let prim = self.type_spec(ty)?;
                if ctx.fname.is_none() {
                    // Global scope: bind to a symbolic address, no allocation.
                    let addr = Value::Global(name);
                    self.scopes.bind(name, addr)?;
                    self.locations.insert(node_ref, addr);
                } else {
                    let dest = self.new_temp(ctx);
                    self.emit(Instr::Alloc {
                        ty: prim,
                        name,
                        dest,
                    });
                    self.scopes.bind(name, dest)?;
                    self.locations.insert(node_ref, dest);
                }
            }

            NodeKind::ArrayDecl { ty, .. } => {
                self.lower(ty, ctx)?;
                let location = self.location_of(ty)?;
                self.locations.insert(node_ref, location);
            }

            NodeKind::FuncDecl { params, .. } => {
                // Parameters are lowered inside a function definition only;
                // the inner declarator carries the name, not storage.
                if ctx.fname.is_some() {
                    if let Some(params) = params {
                        self.lower(params, ctx)?;
                    }
                }
            }

            NodeKind::FuncDef(data) => self.lower_func_def(node_ref, &data, ctx)?,

            NodeKind::ParamList(params) => {
                // Allocate every parameter first, then copy the reserved
                // positional temporaries %0..%n-1 into the fresh slots.
                for par in &params {
                    self.lower(*par, ctx)?;
                }
                for (i, par) in params.iter().enumerate() {
                    let ty = self.param_type(*par)?;
                    let dest = self.location_of(*par)?;
                    self.emit(Instr::Store {
                        ty,
                        src: Value::Temp(i as u32),
                        dest,
                    });
                }
            }

            NodeKind::InitList(exprs) | NodeKind::ExprList(exprs) => {
                for expr in &exprs {
                    self.lower(*expr, ctx)?;
                }
            }

            NodeKind::TypeSpec(_) => {
                // Type nodes are consumed by their declarators, never
                // lowered on their own.
                return Err(IrGenError::UnhandledNode {
                    kind: "TypeSpec",
                    coord: self.coord_of(node_ref),
                });
            }

            NodeKind::Identifier(name) => {
                let ty = self.expr_type(node_ref)?;
                let src = self.scopes.resolve(name)?;
                let dest = self.new_temp(ctx);
                self.emit(Instr::Load { ty, src, dest });
                self.locations.insert(node_ref, dest);
            }

            NodeKind::Constant(value) => {
                let ty = self.expr_type(node_ref)?;
                let dest = self.new_temp(ctx);
                self.emit(Instr::Literal { ty, value, dest });
                self.locations.insert(node_ref, dest);
            }

            NodeKind::ArrayRef { name, .. } => {
                self.lower(name, ctx)?;
                let location = self.location_of(name)?;
                self.locations.insert(node_ref, location);
            }

            NodeKind::Assignment(_, lvalue, rvalue) => {
                self.lower(rvalue, ctx)?;
                let src = self.location_of(rvalue)?;
                let ty = self.expr_type(rvalue)?;
                let dest = match self.ast.get_kind(lvalue) {
                    NodeKind::Identifier(name) => self.scopes.resolve(*name)?,
                    kind => {
                        return Err(IrGenError::UnhandledNode {
                            kind: kind.name(),
                            coord: self.coord_of(lvalue),
                        })
                    }
                };
                self.emit(Instr::Store { ty, src, dest });
                // An assignment's value is the stored-into location.
                self.locations.insert(node_ref, dest);
            }

            NodeKind::BinaryOp(op, left, right) => {
                self.lower(left, ctx)?;
                self.lower(right, ctx)?;
                let ty = self.expr_type(left)?;
                let left_val = self.location_of(left)?;
                let right_val = self.location_of(right)?;
                let dest = self.new_temp(ctx);
                self.emit(Instr::Binary {
                    op,
                    ty,
                    left: left_val,
                    right: right_val,
                    dest,
                });
                self.locations.insert(node_ref, dest);
            }

            NodeKind::UnaryOp(op, expr) => {
                self.lower(expr, ctx)?;
                let ty = self.expr_type(expr)?;
                let operand = self.location_of(expr)?;
                let dest = self.new_temp(ctx);
                self.emit(Instr::Unary {
                    op,
                    ty,
                    operand,
                    dest,
                });
                self.locations.insert(node_ref, dest);
            }

            NodeKind::Cast { ty, expr } => {
                self.lower(expr, ctx)?;
                let value = self.location_of(expr)?;
                match self.type_spec(ty)? {
                    PrimType::Int => self.emit(Instr::FpToSi { value }),
                    _ => self.emit(Instr::SiToFp { value }),
                }
                // Conversion happens in place; no new temporary.
                self.locations.insert(node_ref, value);
            }

            NodeKind::FuncCall { name, args } => self.lower_call(node_ref, name, args, ctx)?,

            NodeKind::Compound(data) => {
                let scoped = !data.decls.is_empty();
                if scoped {
                    self.scopes.push_block_scope();
                }
                for decl in &data.decls {
                    self.lower(*decl, ctx)?;
                }
                for stat in &data.stats {
                    self.lower(*stat, ctx)?;
                }
                if scoped {
                    self.scopes.pop_scope()?;
                }
            }

            NodeKind::If(stmt) => {
                self.lower(stmt.cond, ctx)?;
                let cond = self.location_of(stmt.cond)?;
                let then_label = self.new_label(ctx);
                let else_label = self.new_label(ctx);
                self.emit(Instr::CBranch {
                    cond,
                    true_target: then_label,
                    false_target: else_label,
                });
                self.emit(Instr::Label(then_label));
                if let Some(if_stat) = stmt.if_stat {
                    self.lower(if_stat, ctx)?;
                }
                // No merge label: control falls through after each branch.
                self.emit(Instr::Label(else_label));
                if let Some(else_stat) = stmt.else_stat {
                    self.lower(else_stat, ctx)?;
                }
            }

            NodeKind::While(stmt) => {
                let top = self.new_label(ctx);
                self.emit(Instr::Label(top));
                self.lower(stmt.cond, ctx)?;
                let cond = self.location_of(stmt.cond)?;
                let body_label = self.new_label(ctx);
                let exit_label = self.new_label(ctx);
                self.emit(Instr::CBranch {
                    cond,
                    true_target: body_label,
                    false_target: exit_label,
                });
                self.emit(Instr::Label(body_label));
                let loop_ctx = FuncCtx {
                    break_target: Some(exit_label),
                    ..ctx
                };
                if let Some(body) = stmt.body {
                    self.lower(body, loop_ctx)?;
                }
                self.emit(Instr::Jump(top));
                self.emit(Instr::Label(exit_label));
            }

            NodeKind::For(stmt) => {
                if let Some(init) = stmt.init {
                    self.lower(init, ctx)?;
                }
                let top = self.new_label(ctx);
                self.emit(Instr::Label(top));
                let exit_label = match stmt.cond {
                    Some(cond_node) => {
                        self.lower(cond_node, ctx)?;
                        let cond = self.location_of(cond_node)?;
                        let body_label = self.new_label(ctx);
                        let exit_label = self.new_label(ctx);
                        self.emit(Instr::CBranch {
                            cond,
                            true_target: body_label,
                            false_target: exit_label,
                        });
                        self.emit(Instr::Label(body_label));
                        exit_label
                    }
                    // No condition: always-true loop, exit only via break.
                    None => self.new_label(ctx),
                };
                let loop_ctx = FuncCtx {
                    break_target: Some(exit_label),
                    ..ctx
                };
                if let Some(body) = stmt.body {
                    self.lower(body, loop_ctx)?;
                }
                if let Some(next) = stmt.next {
                    self.lower(next, loop_ctx)?;
                }
                self.emit(Instr::Jump(top));
                self.emit(Instr::Label(exit_label));
            }

            NodeKind::Assert { expr } => {
                let ret = ctx.ret.ok_or(IrGenError::OutsideFunction {
                    construct: "assert",
                    coord: self.coord_of(node_ref),
                })?;
                self.lower(expr, ctx)?;
                let cond = self.location_of(expr)?;
                let pass_label = self.new_label(ctx);
                let fail_label = self.new_label(ctx);
                let rest_label = self.new_label(ctx);
                self.emit(Instr::CBranch {
                    cond,
                    true_target: pass_label,
                    false_target: fail_label,
                });
                self.emit(Instr::Label(pass_label));
                self.emit(Instr::Jump(rest_label));
                self.emit(Instr::Label(fail_label));
                let message = match self.ast.get_coord(expr) {
                    Some(coord) => format!("assertion_fail on {}", coord),
                    None => "assertion_fail".to_string(),
                };
                self.emit(Instr::PrintString { message });
                // A failed assertion short-circuits the function.
                self.emit(Instr::Jump(ret.label));
                self.emit(Instr::Label(rest_label));
            }

            NodeKind::Break => {
                let target = ctx.break_target.ok_or(IrGenError::BreakOutsideLoop {
                    coord: self.coord_of(node_ref),
                })?;
                self.emit(Instr::Jump(target));
            }

            NodeKind::Return { expr } => {
                let ret = ctx.ret.ok_or(IrGenError::OutsideFunction {
                    construct: "return",
                    coord: self.coord_of(node_ref),
                })?;
                if let Some(expr) = expr {
                    self.lower(expr, ctx)?;
                    let src = self.location_of(expr)?;
                    let ty = self.expr_type(expr)?;
                    self.emit(Instr::Store {
                        ty,
                        src,
                        dest: ret.value,
                    });
                }
                self.emit(Instr::Jump(ret.label));
                self.scopes.mark_returned();
            }

            NodeKind::Print { expr } => match expr {
                Some(expr) => {
                    self.lower(expr, ctx)?;
                    let ty = self.expr_type(expr)?;
                    let value = self.location_of(expr)?;
                    self.emit(Instr::Print {
                        ty,
                        value: Some(value),
                    });
                }
                None => self.emit(Instr::Print {
                    ty: PrimType::Void,
                    value: None,
                }),
            },

            NodeKind::Read { expr } => {
                self.lower(expr, ctx)?;
                let ty = self.expr_type(expr)?;
                let value = self.location_of(expr)?;
                self.emit(Instr::Read { ty, value });
            }

            NodeKind::EmptyStatement => {}
        }
        Ok(())
    }

    /// Declaration with an optional initializer. Function declarators only
    /// contribute their parameters; variable declarators get their storage
    /// from the chain and, at global scope, a `global_<ty>` pseudo-instruction
    /// instead of a store.
    fn lower_decl(
        &mut self,
        node_ref: NodeRef,
        data: &DeclData,
        ctx: FuncCtx,
    ) -> Result<(), IrGenError> {
        self.lower(data.ty, ctx)?;
        if matches!(self.ast.get_kind(data.ty), NodeKind::FuncDecl { .. }) {
            return Ok(());
        }

        let storage = self.location_of(data.ty)?;
        self.locations.insert(node_ref, storage);
        let ty = self.declarator_type(data.ty)?;

        if ctx.fname.is_none() {
            let init = match data.init {
                Some(init) => {
                    self.lower(init, ctx)?;
                    Some(self.location_of(init)?)
                }
                None => None,
            };
            self.emit(Instr::Global {
                ty,
                addr: storage,
                init,
            });
        } else if let Some(init) = data.init {
            self.lower(init, ctx)?;
            let src = self.location_of(init)?;
            self.emit(Instr::Store {
                ty,
                src,
                dest: storage,
            });
        }
        Ok(())
    }

    /// Function definition: reserve the first N temporaries for parameters,
    /// mint the return slot before and the return label after the declarator,
    /// lower the body, then emit the single epilogue.
    fn lower_func_def(
        &mut self,
        node_ref: NodeRef,
        data: &FuncDefData,
        _outer: FuncCtx,
    ) -> Result<(), IrGenError> {
        let (name, ret_ty, param_count) = self.func_signature(data.decl)?;
        debug!("lowering function `{}`", name);

        self.scopes.push_function_scope(Some(node_ref));
        self.emit(Instr::Define { name });

        let fctx = FuncCtx {
            fname: Some(name),
            ret: None,
            break_target: None,
        };
        // Parameters occupy %0..%n-1 so call sites can address them
        // positionally; the counter starts past them.
        self.versions.insert(Some(name), param_count);
        let ret_value = self.new_temp(fctx);

        self.lower(data.decl, fctx)?;

        let ret_label = self.new_label(fctx);
        let body_ctx = FuncCtx {
            fname: Some(name),
            ret: Some(RetSite {
                value: ret_value,
                label: ret_label,
            }),
            break_target: None,
        };
        if let Some(body) = data.body {
            self.lower(body, body_ctx)?;
        }

        self.emit(Instr::Label(ret_label));
        if ret_ty == PrimType::Void {
            self.emit(Instr::ReturnVoid);
        } else {
            let out = self.new_temp(body_ctx);
            self.emit(Instr::Load {
                ty: ret_ty,
                src: ret_value,
                dest: out,
            });
            self.emit(Instr::Return {
                ty: ret_ty,
                value: out,
            });
        }

        debug!("scopes after `{}`:\n{}", name, self.scopes);
        self.scopes.pop_scope()?;
        Ok(())
    }

    /// Call: evaluate every argument first, then one `param_<ty>` per
    /// argument in order, then the call itself. Calls whose checked type is
    /// void produce no result temporary.
    fn lower_call(
        &mut self,
        node_ref: NodeRef,
        name: NodeRef,
        args: Option<NodeRef>,
        ctx: FuncCtx,
    ) -> Result<(), IrGenError> {
        let callee = match self.ast.get_kind(name) {
            NodeKind::Identifier(sym) => *sym,
            _ => {
                return Err(IrGenError::MalformedFunction {
                    coord: self.coord_of(node_ref),
                })
            }
        };

        if let Some(args) = args {
            self.lower(args, ctx)?;
            let arg_nodes: Vec<NodeRef> = match self.ast.get_kind(args) {
                NodeKind::ExprList(exprs) => exprs.to_vec(),
                _ => vec![args],
            };
            for arg in arg_nodes {
                let ty = self.expr_type(arg)?;
                let value = self.location_of(arg)?;
                self.emit(Instr::Param { ty, value });
            }
        }

        let ret_ty = self.expr_type(node_ref)?;
        if ret_ty == PrimType::Void {
            self.emit(Instr::Call {
                name: callee,
                dest: None,
            });
        } else {
            let dest = self.new_temp(ctx);
            self.emit(Instr::Call {
                name: callee,
                dest: Some(dest),
            });
            self.locations.insert(node_ref, dest);
        }
        Ok(())
    }
}
