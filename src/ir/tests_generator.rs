//! Lowering tests. Trees are built programmatically (the front end is an
//! external collaborator) and checker annotations are supplied through
//! [`SemanticInfo`] before lowering runs.

use insta::assert_snapshot;
use thin_vec::ThinVec;

use crate::ast::nodes::*;
use crate::ast::{Ast, Coord, Literal, NodeRef, SemanticInfo, Symbol};
use crate::ir::{render, Instr, IrGenError, IrGenerator, Label, PrimType, Value};
use crate::scopes::ScopeError;

struct Builder {
    ast: Ast,
    info: SemanticInfo,
}

impl Builder {
    fn new() -> Self {
        Builder {
            ast: Ast::new(),
            info: SemanticInfo::new(),
        }
    }

    fn push(&mut self, kind: NodeKind) -> NodeRef {
        self.ast.push_node(kind, None)
    }

    fn push_at(&mut self, kind: NodeKind, line: u32, column: u32) -> NodeRef {
        self.ast.push_node(kind, Some(Coord::new(line, column)))
    }

    fn typed(&mut self, kind: NodeKind, ty: PrimType) -> NodeRef {
        let node = self.push(kind);
        self.info.set_type(node, ty);
        node
    }

    fn int_const(&mut self, value: i64) -> NodeRef {
        self.push(NodeKind::Constant(Literal::Int(value)))
    }

    fn float_const(&mut self, value: f64) -> NodeRef {
        self.push(NodeKind::Constant(Literal::Float(value)))
    }

    fn ident(&mut self, name: &str, ty: PrimType) -> NodeRef {
        self.typed(NodeKind::Identifier(Symbol::new(name)), ty)
    }

    fn type_spec(&mut self, ty: PrimType) -> NodeRef {
        self.push(NodeKind::TypeSpec(ty))
    }

    fn var_decl(&mut self, name: &str, ty: PrimType) -> NodeRef {
        let spec = self.type_spec(ty);
        self.push(NodeKind::VarDecl {
            name: Symbol::new(name),
            ty: spec,
        })
    }

    fn decl(&mut self, name: &str, ty: PrimType, init: Option<NodeRef>) -> NodeRef {
        let declarator = self.var_decl(name, ty);
        self.push(NodeKind::Decl(DeclData {
            name: Symbol::new(name),
            ty: declarator,
            init,
        }))
    }

    fn compound(&mut self, decls: Vec<NodeRef>, stats: Vec<NodeRef>) -> NodeRef {
        self.push(NodeKind::Compound(CompoundData {
            decls: decls.into_iter().collect(),
            stats: stats.into_iter().collect(),
        }))
    }

    /// A full function definition: declarator chain, parameter list, body.
    fn func_def(
        &mut self,
        name: &str,
        ret: PrimType,
        params: &[(&str, PrimType)],
        body: NodeRef,
    ) -> NodeRef {
        let ret_spec = self.type_spec(ret);
        let inner = self.var_decl(name, ret);
        let param_list = if params.is_empty() {
            None
        } else {
            let decls: Vec<NodeRef> = params
                .iter()
                .map(|(pname, pty)| self.decl(pname, *pty, None))
                .collect();
            Some(self.push(NodeKind::ParamList(decls.into_iter().collect())))
        };
        let func_decl = self.push(NodeKind::FuncDecl {
            ty: inner,
            params: param_list,
        });
        let decl = self.push(NodeKind::Decl(DeclData {
            name: Symbol::new(name),
            ty: func_decl,
            init: None,
        }));
        self.push(NodeKind::FuncDef(FuncDefData {
            ty: ret_spec,
            decl,
            params: None,
            body: Some(body),
        }))
    }

    fn program(&mut self, gdecls: Vec<NodeRef>) -> NodeRef {
        self.push(NodeKind::Program(ProgramData {
            gdecls: gdecls.into_iter().collect(),
        }))
    }

    fn build(mut self) -> Ast {
        self.ast.attach_semantic_info(self.info);
        self.ast
    }
}

fn lower(ast: &Ast, root: NodeRef) -> Vec<Instr> {
    IrGenerator::new(ast).generate(root).unwrap()
}

fn lower_err(ast: &Ast, root: NodeRef) -> IrGenError {
    IrGenerator::new(ast).generate(root).unwrap_err()
}

/// `int x; x = 3 + 4;` at global scope.
fn global_assign_tree() -> (Ast, NodeRef) {
    let mut b = Builder::new();
    let decl = b.decl("x", PrimType::Int, None);
    let gdecl = b.push(NodeKind::GlobalDecl(ThinVec::from_iter([decl])));
    let lhs = b.ident("x", PrimType::Int);
    let three = b.int_const(3);
    let four = b.int_const(4);
    let sum = b.typed(NodeKind::BinaryOp(BinOp::Add, three, four), PrimType::Int);
    let assign = b.push(NodeKind::Assignment(AssignOp::Assign, lhs, sum));
    let root = b.program(vec![gdecl, assign]);
    (b.build(), root)
}

#[test]
fn global_decl_then_assignment() {
    let (ast, root) = global_assign_tree();
    let code = lower(&ast, root);
    assert_snapshot!(render(&code), @r"
    global_int @x
    literal_int 3 %0
    literal_int 4 %1
    add_int %0 %1 %2
    store_int %2 @x
    ");
}

#[test]
fn lowering_is_deterministic() {
    let (ast, root) = global_assign_tree();
    let first = lower(&ast, root);
    let second = lower(&ast, root);
    assert_eq!(render(&first), render(&second));
}

#[test]
fn global_decl_with_initializer_carries_the_value() {
    let mut b = Builder::new();
    let init = b.float_const(1.5);
    let decl = b.decl("y", PrimType::Float, Some(init));
    let gdecl = b.push(NodeKind::GlobalDecl(ThinVec::from_iter([decl])));
    let root = b.program(vec![gdecl]);
    let ast = b.build();

    let code = lower(&ast, root);
    assert_eq!(
        render(&code),
        "literal_float 1.5 %0\nglobal_float @y %0\n"
    );
}

/// `int f(int a, int b) { if (a < b) { return a; } else { return b; } }`
fn branching_max_tree() -> (Ast, NodeRef) {
    let mut b = Builder::new();
    let a1 = b.ident("a", PrimType::Int);
    let b1 = b.ident("b", PrimType::Int);
    let cmp = b.typed(NodeKind::BinaryOp(BinOp::Lt, a1, b1), PrimType::Int);
    let a2 = b.ident("a", PrimType::Int);
    let ret_a = b.push(NodeKind::Return { expr: Some(a2) });
    let b2 = b.ident("b", PrimType::Int);
    let ret_b = b.push(NodeKind::Return { expr: Some(b2) });
    let cond = b.push(NodeKind::If(IfStmt {
        cond: cmp,
        if_stat: Some(ret_a),
        else_stat: Some(ret_b),
    }));
    let body = b.compound(vec![], vec![cond]);
    let func = b.func_def(
        "f",
        PrimType::Int,
        &[("a", PrimType::Int), ("b", PrimType::Int)],
        body,
    );
    let root = b.program(vec![func]);
    (b.build(), root)
}

#[test]
fn two_way_branch_with_early_returns() {
    let (ast, root) = branching_max_tree();
    let code = lower(&ast, root);
    assert_snapshot!(render(&code), @r"
    define f
    alloc_int a %3
    alloc_int b %4
    store_int %0 %3
    store_int %1 %4
    load_int %3 %6
    load_int %4 %7
    lt_int %6 %7 %8
    cbranch %8 9 10
    9:
    load_int %3 %11
    store_int %11 %2
    jump 5
    10:
    load_int %4 %12
    store_int %12 %2
    jump 5
    5:
    load_int %2 %13
    return_int %13
    ");
}

#[test]
fn single_return_label_and_instruction_per_function() {
    let (ast, root) = branching_max_tree();
    let code = lower(&ast, root);

    let returns = code
        .iter()
        .filter(|i| matches!(i, Instr::Return { .. } | Instr::ReturnVoid))
        .count();
    assert_eq!(returns, 1);

    // The return label is the jump target of both source returns and
    // appears exactly once as a marker.
    let ret_label = code
        .iter()
        .find_map(|i| match i {
            Instr::Jump(target) => Some(*target),
            _ => None,
        })
        .unwrap();
    let markers = code
        .iter()
        .filter(|i| matches!(i, Instr::Label(l) if *l == ret_label))
        .count();
    assert_eq!(markers, 1);
}

#[test]
fn minted_numbers_are_never_reused_within_a_function() {
    let (ast, root) = branching_max_tree();
    let code = lower(&ast, root);

    let mut minted = Vec::new();
    for instr in &code {
        match instr {
            Instr::Alloc {
                dest: Value::Temp(n),
                ..
            }
            | Instr::Load {
                dest: Value::Temp(n),
                ..
            }
            | Instr::Literal {
                dest: Value::Temp(n),
                ..
            }
            | Instr::Binary {
                dest: Value::Temp(n),
                ..
            }
            | Instr::Unary {
                dest: Value::Temp(n),
                ..
            }
            | Instr::Call {
                dest: Some(Value::Temp(n)),
                ..
            }
            | Instr::Label(Label(n)) => minted.push(*n),
            _ => {}
        }
    }
    let mut deduped = minted.clone();
    deduped.sort_unstable();
    deduped.dedup();
    assert_eq!(minted.len(), deduped.len());
}

#[test]
fn every_cbranch_target_appears_exactly_once_as_a_marker() {
    for (ast, root) in [branching_max_tree(), empty_while_tree()] {
        let code = lower(&ast, root);
        for instr in &code {
            if let Instr::CBranch {
                true_target,
                false_target,
                ..
            } = instr
            {
                for target in [true_target, false_target] {
                    let markers = code
                        .iter()
                        .filter(|i| matches!(i, Instr::Label(l) if l == target))
                        .count();
                    assert_eq!(markers, 1, "label {} marked {} times", target, markers);
                }
            }
        }
    }
}

#[test]
fn temporary_namespaces_are_independent_across_functions() {
    let mut b = Builder::new();
    let one = b.int_const(1);
    let ret1 = b.push(NodeKind::Return { expr: Some(one) });
    let body1 = b.compound(vec![], vec![ret1]);
    let f = b.func_def("f", PrimType::Int, &[], body1);
    let two = b.int_const(2);
    let ret2 = b.push(NodeKind::Return { expr: Some(two) });
    let body2 = b.compound(vec![], vec![ret2]);
    let g = b.func_def("g", PrimType::Int, &[], body2);
    let root = b.program(vec![f, g]);
    let ast = b.build();

    let code = lower(&ast, root);
    // Both functions start their numbering at %0 (the return slot).
    assert_snapshot!(render(&code), @r"
    define f
    literal_int 1 %2
    store_int %2 %0
    jump 1
    1:
    load_int %0 %3
    return_int %3
    define g
    literal_int 2 %2
    store_int %2 %0
    jump 1
    1:
    load_int %0 %3
    return_int %3
    ");
}

/// `void g() { int x; assert x > 0; }` with the comparison at 2:11.
#[test]
fn assert_embeds_the_coordinate_and_jumps_to_the_return_label() {
    let mut b = Builder::new();
    let decl = b.decl("x", PrimType::Int, None);
    let x = b.ident("x", PrimType::Int);
    let zero = b.int_const(0);
    let cmp = b.ast.push_node(
        NodeKind::BinaryOp(BinOp::Gt, x, zero),
        Some(Coord::new(2, 11)),
    );
    b.info.set_type(cmp, PrimType::Int);
    let assert_stat = b.push(NodeKind::Assert { expr: cmp });
    let body = b.compound(vec![decl], vec![assert_stat]);
    let func = b.func_def("g", PrimType::Void, &[], body);
    let root = b.program(vec![func]);
    let ast = b.build();

    let code = lower(&ast, root);
    assert_snapshot!(render(&code), @r#"
    define g
    alloc_int x %2
    load_int %2 %3
    literal_int 0 %4
    gt_int %3 %4 %5
    cbranch %5 6 7
    6:
    jump 8
    7:
    print_string "assertion_fail on 2:11"
    jump 1
    8:
    1:
    return_void
    "#);
}

/// `void h() { int c; while (c) { } }`
fn empty_while_tree() -> (Ast, NodeRef) {
    let mut b = Builder::new();
    let decl = b.decl("c", PrimType::Int, None);
    let cond = b.ident("c", PrimType::Int);
    let empty = b.compound(vec![], vec![]);
    let while_stat = b.push(NodeKind::While(WhileStmt {
        cond,
        body: Some(empty),
    }));
    let body = b.compound(vec![decl], vec![while_stat]);
    let func = b.func_def("h", PrimType::Void, &[], body);
    let root = b.program(vec![func]);
    (b.build(), root)
}

#[test]
fn empty_while_still_emits_the_full_loop_skeleton() {
    let (ast, root) = empty_while_tree();
    let code = lower(&ast, root);
    assert_snapshot!(render(&code), @r"
    define h
    alloc_int c %2
    3:
    load_int %2 %4
    cbranch %4 5 6
    5:
    jump 3
    6:
    1:
    return_void
    ");
}

#[test]
fn break_jumps_to_the_enclosing_loop_exit() {
    let mut b = Builder::new();
    let decl = b.decl("c", PrimType::Int, None);
    let cond = b.ident("c", PrimType::Int);
    let brk = b.push(NodeKind::Break);
    let loop_body = b.compound(vec![], vec![brk]);
    let while_stat = b.push(NodeKind::While(WhileStmt {
        cond,
        body: Some(loop_body),
    }));
    let body = b.compound(vec![decl], vec![while_stat]);
    let func = b.func_def("h", PrimType::Void, &[], body);
    let root = b.program(vec![func]);
    let ast = b.build();

    let code = lower(&ast, root);
    // The exit label is 6; break jumps there before the loop-back jump.
    let jumps: Vec<_> = code
        .iter()
        .filter_map(|i| match i {
            Instr::Jump(target) => Some(target.0),
            _ => None,
        })
        .collect();
    assert_eq!(jumps, [6, 3]);
}

#[test]
fn break_outside_a_loop_is_rejected() {
    let mut b = Builder::new();
    let brk = b.push_at(NodeKind::Break, 4, 5);
    let body = b.compound(vec![], vec![brk]);
    let func = b.func_def("f", PrimType::Void, &[], body);
    let root = b.program(vec![func]);
    let ast = b.build();

    match lower_err(&ast, root) {
        IrGenError::BreakOutsideLoop { coord } => {
            assert_eq!(coord.to_string(), " at 4:5");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn condition_less_for_loops_exit_only_through_break() {
    let mut b = Builder::new();
    let brk = b.push(NodeKind::Break);
    let loop_body = b.compound(vec![], vec![brk]);
    let for_stat = b.push(NodeKind::For(ForStmt {
        init: None,
        cond: None,
        next: None,
        body: Some(loop_body),
    }));
    let body = b.compound(vec![], vec![for_stat]);
    let func = b.func_def("k", PrimType::Void, &[], body);
    let root = b.program(vec![func]);
    let ast = b.build();

    let code = lower(&ast, root);
    assert_snapshot!(render(&code), @r"
    define k
    2:
    jump 3
    jump 2
    3:
    1:
    return_void
    ");
}

#[test]
fn for_loop_with_condition_and_increment() {
    // void m() { int i; for (i = 0; i < 2; i = i + 1) { } }
    let mut b = Builder::new();
    let decl = b.decl("i", PrimType::Int, None);

    let i_init = b.ident("i", PrimType::Int);
    let zero = b.int_const(0);
    let init = b.push(NodeKind::Assignment(AssignOp::Assign, i_init, zero));

    let i_cond = b.ident("i", PrimType::Int);
    let two = b.int_const(2);
    let cond = b.typed(NodeKind::BinaryOp(BinOp::Lt, i_cond, two), PrimType::Int);

    let i_next_read = b.ident("i", PrimType::Int);
    let one = b.int_const(1);
    let sum = b.typed(
        NodeKind::BinaryOp(BinOp::Add, i_next_read, one),
        PrimType::Int,
    );
    let i_next_write = b.ident("i", PrimType::Int);
    let next = b.push(NodeKind::Assignment(AssignOp::Assign, i_next_write, sum));

    let loop_body = b.compound(vec![], vec![]);
    let for_stat = b.push(NodeKind::For(ForStmt {
        init: Some(init),
        cond: Some(cond),
        next: Some(next),
        body: Some(loop_body),
    }));
    let body = b.compound(vec![decl], vec![for_stat]);
    let func = b.func_def("m", PrimType::Void, &[], body);
    let root = b.program(vec![func]);
    let ast = b.build();

    let code = lower(&ast, root);
    assert_snapshot!(render(&code), @r"
    define m
    alloc_int i %2
    literal_int 0 %3
    store_int %3 %2
    4:
    load_int %2 %5
    literal_int 2 %6
    lt_int %5 %6 %7
    cbranch %7 8 9
    8:
    load_int %2 %10
    literal_int 1 %11
    add_int %10 %11 %12
    store_int %12 %2
    jump 4
    9:
    1:
    return_void
    ");
}

#[test]
fn calls_evaluate_arguments_then_emit_params_then_call() {
    // void caller() { int x; use(x, 2.5); }  -- use returns int
    let mut b = Builder::new();
    let decl = b.decl("x", PrimType::Int, None);
    let x = b.ident("x", PrimType::Int);
    let half = b.float_const(2.5);
    let args = b.push(NodeKind::ExprList(ThinVec::from_iter([x, half])));
    let callee = b.ident("use", PrimType::Int);
    let call = b.typed(
        NodeKind::FuncCall {
            name: callee,
            args: Some(args),
        },
        PrimType::Int,
    );
    let body = b.compound(vec![decl], vec![call]);
    let func = b.func_def("caller", PrimType::Void, &[], body);
    let root = b.program(vec![func]);
    let ast = b.build();

    let code = lower(&ast, root);
    assert_snapshot!(render(&code), @r"
    define caller
    alloc_int x %2
    load_int %2 %3
    literal_float 2.5 %4
    param_int %3
    param_float %4
    call use %5
    1:
    return_void
    ");
}

#[test]
fn void_calls_mint_no_result_temporary() {
    let mut b = Builder::new();
    let callee = b.ident("tick", PrimType::Void);
    let call = b.typed(
        NodeKind::FuncCall {
            name: callee,
            args: None,
        },
        PrimType::Void,
    );
    let after = b.int_const(7);
    let print = b.push(NodeKind::Print { expr: Some(after) });
    let body = b.compound(vec![], vec![call, print]);
    let func = b.func_def("caller", PrimType::Void, &[], body);
    let root = b.program(vec![func]);
    let ast = b.build();

    let code = lower(&ast, root);
    // The literal after the call still gets %2: the call consumed no number.
    assert_snapshot!(render(&code), @r"
    define caller
    call tick
    literal_int 7 %2
    print_int %2
    1:
    return_void
    ");
}

#[test]
fn cast_converts_in_place_without_a_new_temporary() {
    // void p() { float x; print (int)x; }
    let mut b = Builder::new();
    let decl = b.decl("x", PrimType::Float, None);
    let x = b.ident("x", PrimType::Float);
    let int_spec = b.type_spec(PrimType::Int);
    let cast = b.typed(
        NodeKind::Cast {
            ty: int_spec,
            expr: x,
        },
        PrimType::Int,
    );
    let print = b.push(NodeKind::Print { expr: Some(cast) });
    let body = b.compound(vec![decl], vec![print]);
    let func = b.func_def("p", PrimType::Void, &[], body);
    let root = b.program(vec![func]);
    let ast = b.build();

    let code = lower(&ast, root);
    assert_snapshot!(render(&code), @r"
    define p
    alloc_float x %2
    load_float %2 %3
    fptosi %3
    print_int %3
    1:
    return_void
    ");
}

#[test]
fn print_without_expression_lowers_to_print_void() {
    let mut b = Builder::new();
    let print = b.push(NodeKind::Print { expr: None });
    let body = b.compound(vec![], vec![print]);
    let func = b.func_def("p", PrimType::Void, &[], body);
    let root = b.program(vec![func]);
    let ast = b.build();

    let code = lower(&ast, root);
    assert!(code.contains(&Instr::Print {
        ty: PrimType::Void,
        value: None
    }));
}

#[test]
fn read_targets_the_lowered_operand() {
    let mut b = Builder::new();
    let decl = b.decl("x", PrimType::Int, None);
    let x = b.ident("x", PrimType::Int);
    let read = b.push(NodeKind::Read { expr: x });
    let body = b.compound(vec![decl], vec![read]);
    let func = b.func_def("r", PrimType::Void, &[], body);
    let root = b.program(vec![func]);
    let ast = b.build();

    let code = lower(&ast, root);
    assert_snapshot!(render(&code), @r"
    define r
    alloc_int x %2
    load_int %2 %3
    read_int %3
    1:
    return_void
    ");
}

#[test]
fn block_declarations_shadow_parameters() {
    // void s(int a) { int a; a = 1; }
    let mut b = Builder::new();
    let inner_decl = b.decl("a", PrimType::Int, None);
    let a = b.ident("a", PrimType::Int);
    let one = b.int_const(1);
    let assign = b.push(NodeKind::Assignment(AssignOp::Assign, a, one));
    let body = b.compound(vec![inner_decl], vec![assign]);
    let func = b.func_def("s", PrimType::Void, &[("a", PrimType::Int)], body);
    let root = b.program(vec![func]);
    let ast = b.build();

    let code = lower(&ast, root);
    // Parameter slot is %2; the shadowing local is %4 and receives the store.
    assert_snapshot!(render(&code), @r"
    define s
    alloc_int a %2
    store_int %0 %2
    alloc_int a %4
    literal_int 1 %5
    store_int %5 %4
    3:
    return_void
    ");
}

#[test]
fn unary_minus_uses_the_uneg_opcode() {
    let mut b = Builder::new();
    let five = b.int_const(5);
    let neg = b.typed(NodeKind::UnaryOp(UnOp::Minus, five), PrimType::Int);
    let print = b.push(NodeKind::Print { expr: Some(neg) });
    let body = b.compound(vec![], vec![print]);
    let func = b.func_def("u", PrimType::Void, &[], body);
    let root = b.program(vec![func]);
    let ast = b.build();

    let code = lower(&ast, root);
    assert!(render(&code).contains("uneg_int %2 %3"));
}

#[test]
fn unbound_identifier_is_a_fatal_scope_error() {
    let mut b = Builder::new();
    let ghost = b.ident("ghost", PrimType::Int);
    let print = b.push(NodeKind::Print { expr: Some(ghost) });
    let body = b.compound(vec![], vec![print]);
    let func = b.func_def("f", PrimType::Void, &[], body);
    let root = b.program(vec![func]);
    let ast = b.build();

    assert_eq!(
        lower_err(&ast, root),
        IrGenError::Scope(ScopeError::UnboundName {
            name: Symbol::new("ghost")
        })
    );
}

#[test]
fn type_spec_has_no_lowering_rule() {
    let mut b = Builder::new();
    let spec = b.push_at(NodeKind::TypeSpec(PrimType::Int), 1, 1);
    let ast = b.build();

    match lower_err(&ast, spec) {
        IrGenError::UnhandledNode { kind, .. } => assert_eq!(kind, "TypeSpec"),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn return_outside_a_function_is_rejected() {
    let mut b = Builder::new();
    let ret = b.push(NodeKind::Return { expr: None });
    let root = b.program(vec![ret]);
    let ast = b.build();

    match lower_err(&ast, root) {
        IrGenError::OutsideFunction { construct, .. } => assert_eq!(construct, "return"),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn missing_checker_annotation_is_reported() {
    let mut b = Builder::new();
    // Identifier with no resolved type recorded.
    let x = b.push(NodeKind::Identifier(Symbol::new("x")));
    let decl = b.decl("x", PrimType::Int, None);
    let print = b.push(NodeKind::Print { expr: Some(x) });
    let body = b.compound(vec![decl], vec![print]);
    let func = b.func_def("f", PrimType::Void, &[], body);
    let root = b.program(vec![func]);
    let ast = b.build();

    match lower_err(&ast, root) {
        IrGenError::MissingType { kind, .. } => assert_eq!(kind, "Identifier"),
        other => panic!("unexpected error: {}", other),
    }
}
