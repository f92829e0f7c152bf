// Resolution + inference + checking over hand-built modules.

use phi_ast::build::*;
use phi_ast::{BuiltinTy, Expr, ExprKind, Item, Module, SelfKind, Stmt, TyId};
use phi_compiler::Compilation;

fn analyze(module: Module) -> (bool, Compilation) {
    let mut compilation = Compilation::new(module, "test.phi");
    let ok = compilation.analyze();
    (ok, compilation)
}

fn expect_error(compilation: &Compilation, needle: &str) {
    let found = compilation
        .diagnostics
        .diagnostics()
        .iter()
        .any(|d| d.message.contains(needle));
    assert!(
        found,
        "expected a diagnostic containing {:?}, got: {:#?}",
        needle,
        compilation
            .diagnostics
            .diagnostics()
            .iter()
            .map(|d| d.message.clone())
            .collect::<Vec<_>>()
    );
}

/// The type of `let <name>` in the first function of the module.
fn let_ty(compilation: &Compilation, name: &str) -> Option<TyId> {
    for item in &compilation.module.items {
        let Item::Fun(f) = item else { continue };
        for stmt in &f.body.stmts {
            if let Stmt::Let(var) = stmt {
                if var.name == name {
                    return var.ty;
                }
            }
        }
    }
    None
}

#[test]
fn integer_literals_default_to_i32() {
    // let x = 1; let y = x + 2;
    let module = module(
        "defaulting",
        vec![Item::Fun(fun(
            "main",
            vec![],
            None,
            block(
                vec![
                    Stmt::Let(let_("x", None, Some(int(1)))),
                    Stmt::Let(let_(
                        "y",
                        None,
                        Some(binary(phi_ast::BinOp::Add, ident("x"), int(2))),
                    )),
                ],
                None,
            ),
        ))],
    );

    let (ok, compilation) = analyze(module);
    assert!(ok, "{:#?}", compilation.diagnostics.diagnostics());

    let i32_ty = compilation.types.builtin(BuiltinTy::I32);
    assert_eq!(let_ty(&compilation, "x"), Some(i32_ty));
    assert_eq!(let_ty(&compilation, "y"), Some(i32_ty));
}

#[test]
fn float_literals_default_to_f32() {
    let module = module(
        "floats",
        vec![Item::Fun(fun(
            "main",
            vec![],
            None,
            block(vec![Stmt::Let(let_("x", None, Some(float(1.5))))], None),
        ))],
    );
    let (ok, compilation) = analyze(module);
    assert!(ok);
    let f32_ty = compilation.types.builtin(BuiltinTy::F32);
    assert_eq!(let_ty(&compilation, "x"), Some(f32_ty));
}

#[test]
fn annotation_drives_literal_types() {
    let module = module(
        "annotated",
        vec![Item::Fun(fun(
            "main",
            vec![],
            None,
            block(
                vec![Stmt::Let(let_("x", Some(named_ty("i64")), Some(int(7))))],
                None,
            ),
        ))],
    );
    let (ok, compilation) = analyze(module);
    assert!(ok);
    let i64_ty = compilation.types.builtin(BuiltinTy::I64);
    assert_eq!(let_ty(&compilation, "x"), Some(i64_ty));
}

#[test]
fn polymorphic_identity_instantiates_per_call() {
    // fun id<T>(x: T) -> T { return x }
    let id = generic_fun(
        "id",
        vec![type_param("T")],
        vec![param("x", named_ty("T"))],
        Some(named_ty("T")),
        block(vec![ret(Some(ident("x")))], None),
    );
    let main = fun(
        "main",
        vec![],
        None,
        block(
            vec![
                Stmt::Let(let_("a", None, Some(call(ident("id"), vec![int(1)])))),
                Stmt::Let(let_("b", None, Some(call(ident("id"), vec![boolean(true)])))),
            ],
            None,
        ),
    );
    let (ok, compilation) = analyze(module("poly", vec![Item::Fun(id), Item::Fun(main)]));
    assert!(ok, "{:#?}", compilation.diagnostics.diagnostics());

    let i32_ty = compilation.types.builtin(BuiltinTy::I32);
    let bool_ty = compilation.types.builtin(BuiltinTy::Bool);
    assert_eq!(let_ty(&compilation, "a"), Some(i32_ty));
    assert_eq!(let_ty(&compilation, "b"), Some(bool_ty));
}

#[test]
fn annotation_conflict_is_a_unification_error() {
    let module = module(
        "conflict",
        vec![Item::Fun(fun(
            "main",
            vec![],
            None,
            block(
                vec![Stmt::Let(let_(
                    "x",
                    Some(named_ty("i32")),
                    Some(boolean(true)),
                ))],
                None,
            ),
        ))],
    );
    let (ok, compilation) = analyze(module);
    assert!(!ok);
    expect_error(&compilation, "cannot unify");
}

#[test]
fn return_type_mismatch_is_reported() {
    let module = module(
        "badret",
        vec![Item::Fun(fun(
            "answer",
            vec![],
            Some(named_ty("i32")),
            block(vec![ret(Some(boolean(true)))], None),
        ))],
    );
    let (ok, compilation) = analyze(module);
    assert!(!ok);
    expect_error(&compilation, "cannot unify");
}

#[test]
fn one_bad_item_does_not_hide_errors_in_another() {
    let bad1 = fun(
        "first",
        vec![],
        Some(named_ty("i32")),
        block(vec![ret(Some(boolean(true)))], None),
    );
    let bad2 = fun(
        "second",
        vec![],
        Some(named_ty("bool")),
        block(vec![ret(Some(int(0)))], None),
    );
    let (ok, compilation) = analyze(module("multi", vec![Item::Fun(bad1), Item::Fun(bad2)]));
    assert!(!ok);
    assert!(
        compilation.diagnostics.error_count() >= 2,
        "expected both items to report, got {:#?}",
        compilation.diagnostics.diagnostics()
    );
}

#[test]
fn redefinition_reports_first_definition() {
    let module = module(
        "redef",
        vec![
            Item::Fun(fun("twice", vec![], None, block(vec![], None))),
            Item::Fun(fun("twice", vec![], None, block(vec![], None))),
        ],
    );
    let (ok, compilation) = analyze(module);
    assert!(!ok);
    expect_error(&compilation, "`twice` is defined multiple times");
    let diag = compilation
        .diagnostics
        .diagnostics()
        .iter()
        .find(|d| d.message.contains("defined multiple times"))
        .unwrap();
    assert!(diag.notes.iter().any(|(n, _)| n == "first defined here"));
}

#[test]
fn unknown_name_suggests_the_closest_binding() {
    let module = module(
        "typo",
        vec![Item::Fun(fun(
            "main",
            vec![],
            None,
            block(
                vec![
                    Stmt::Let(let_("length", None, Some(int(1)))),
                    Stmt::Expr(ident("lenght")),
                ],
                None,
            ),
        ))],
    );
    let (ok, compilation) = analyze(module);
    assert!(!ok);
    let diag = compilation
        .diagnostics
        .diagnostics()
        .iter()
        .find(|d| d.message.contains("lenght"))
        .unwrap();
    assert_eq!(diag.help.as_deref(), Some("did you mean `length`?"));
}

#[test]
fn unknown_type_suggests_primitives() {
    let module = module(
        "typo2",
        vec![Item::Fun(fun(
            "main",
            vec![],
            None,
            block(
                vec![Stmt::Let(let_("x", Some(named_ty("i23")), Some(int(1))))],
                None,
            ),
        ))],
    );
    let (ok, compilation) = analyze(module);
    assert!(!ok);
    let diag = compilation
        .diagnostics
        .diagnostics()
        .iter()
        .find(|d| d.message.contains("i23"))
        .unwrap();
    assert_eq!(diag.help.as_deref(), Some("did you mean `i32`?"));
}

#[test]
fn break_outside_loop_is_rejected() {
    let module = module(
        "stray",
        vec![Item::Fun(fun(
            "main",
            vec![],
            None,
            block(
                vec![Stmt::Break {
                    loc: phi_ast::SrcLoc::default(),
                }],
                None,
            ),
        ))],
    );
    let (ok, compilation) = analyze(module);
    assert!(!ok);
    expect_error(&compilation, "break outside of loop");
}

#[test]
fn constrained_type_parameter_rejects_floats() {
    // fun only_ints<T: Int>(x: T) -> T { return x }  called with 1.5
    let f = generic_fun(
        "only_ints",
        vec![constrained_type_param("T", "Int")],
        vec![param("x", named_ty("T"))],
        Some(named_ty("T")),
        block(vec![ret(Some(ident("x")))], None),
    );
    let main = fun(
        "main",
        vec![],
        None,
        block(
            vec![Stmt::Expr(call(ident("only_ints"), vec![float(1.5)]))],
            None,
        ),
    );
    let (ok, compilation) = analyze(module("constrained", vec![Item::Fun(f), Item::Fun(main)]));
    assert!(!ok);
    expect_error(&compilation, "cannot unify");
}

#[test]
fn enum_patterns_bind_payload_types() {
    // enum Opt<T> { Some(T), None }
    let opt = generic_enum(
        "Opt",
        vec![type_param("T")],
        vec![
            variant("Some", vec![named_ty("T")]),
            variant("None", vec![]),
        ],
        vec![],
    );
    // fun unwrap_or_zero(o: Opt<i32>) -> i32 { return match o { Some(x) -> x + 1, None -> 0 } }
    let f = fun(
        "unwrap_or_zero",
        vec![param("o", applied_ty("Opt", vec![named_ty("i32")]))],
        Some(named_ty("i32")),
        block(
            vec![ret(Some(match_expr(
                ident("o"),
                vec![
                    arm_value(
                        variant_pattern("Some", vec!["x"]),
                        binary(phi_ast::BinOp::Add, ident("x"), int(1)),
                    ),
                    arm_value(variant_pattern("None", vec![]), int(0)),
                ],
            )))],
            None,
        ),
    );
    let (ok, compilation) = analyze(module("opt", vec![Item::Enum(opt), Item::Fun(f)]));
    assert!(ok, "{:#?}", compilation.diagnostics.diagnostics());

    // The binding took the payload type under the instantiation.
    let i32_ty = compilation.types.builtin(BuiltinTy::I32);
    let Item::Fun(f) = &compilation.module.items[1] else {
        panic!("expected function");
    };
    let Some(Stmt::Return {
        value: Some(ret_expr),
        ..
    }) = f.body.stmts.first()
    else {
        panic!("expected return");
    };
    let ExprKind::Match { arms, .. } = &ret_expr.kind else {
        panic!("expected match");
    };
    let phi_ast::PatternKind::Variant { bindings, .. } = &arms[0].patterns[0].kind else {
        panic!("expected variant pattern");
    };
    assert_eq!(bindings[0].ty, Some(i32_ty));
}

#[test]
fn variant_payload_arity_mismatch_is_reported() {
    let opt = generic_enum(
        "Opt",
        vec![type_param("T")],
        vec![
            variant("Some", vec![named_ty("T")]),
            variant("None", vec![]),
        ],
        vec![],
    );
    let f = fun(
        "bad",
        vec![param("o", applied_ty("Opt", vec![named_ty("i32")]))],
        Some(named_ty("i32")),
        block(
            vec![ret(Some(match_expr(
                ident("o"),
                vec![
                    arm_value(variant_pattern("Some", vec!["x", "y"]), int(1)),
                    arm_value(wildcard(), int(0)),
                ],
            )))],
            None,
        ),
    );
    let (ok, compilation) = analyze(module("arity", vec![Item::Enum(opt), Item::Fun(f)]));
    assert!(!ok);
    expect_error(&compilation, "the pattern binds 2");
}

#[test]
fn alternation_patterns_are_unimplemented() {
    let f = fun(
        "alt",
        vec![param("n", named_ty("i32"))],
        Some(named_ty("i32")),
        block(
            vec![ret(Some(match_expr(
                ident("n"),
                vec![
                    arm(
                        vec![lit_pattern(int(1)), lit_pattern(int(2))],
                        block(vec![], Some(int(1))),
                    ),
                    arm_value(wildcard(), int(0)),
                ],
            )))],
            None,
        ),
    );
    let (ok, compilation) = analyze(module("alt", vec![Item::Fun(f)]));
    assert!(!ok);
    expect_error(&compilation, "alternation patterns are not implemented");
}

#[test]
fn struct_initializers_must_cover_required_fields() {
    let point = struct_decl(
        "Point",
        vec![field("x", named_ty("i32")), field("y", named_ty("i32"))],
        vec![],
    );
    let main = fun(
        "main",
        vec![],
        None,
        block(
            vec![Stmt::Let(let_(
                "p",
                None,
                Some(adt_init("Point", vec![("x", int(1))])),
            ))],
            None,
        ),
    );
    let (ok, compilation) = analyze(module("init", vec![Item::Struct(point), Item::Fun(main)]));
    assert!(!ok);
    expect_error(&compilation, "missing field `y`");
}

#[test]
fn fields_with_defaults_may_be_omitted() {
    let point = struct_decl(
        "Point",
        vec![
            field("x", named_ty("i32")),
            field_with_default("y", named_ty("i32"), int(0)),
        ],
        vec![],
    );
    let main = fun(
        "main",
        vec![],
        None,
        block(
            vec![Stmt::Let(let_(
                "p",
                None,
                Some(adt_init("Point", vec![("x", int(1))])),
            ))],
            None,
        ),
    );
    let (ok, compilation) = analyze(module("defaults", vec![Item::Struct(point), Item::Fun(main)]));
    assert!(ok, "{:#?}", compilation.diagnostics.diagnostics());
}

#[test]
fn anonymous_initializers_take_their_struct_from_context() {
    let point = struct_decl(
        "Point",
        vec![field("x", named_ty("i32")), field("y", named_ty("i32"))],
        vec![],
    );
    let main = fun(
        "main",
        vec![],
        None,
        block(
            vec![Stmt::Let(let_(
                "p",
                Some(named_ty("Point")),
                Some(anon_init(vec![("x", int(1)), ("y", int(2))])),
            ))],
            None,
        ),
    );
    let (ok, compilation) = analyze(module("anon", vec![Item::Struct(point), Item::Fun(main)]));
    assert!(ok, "{:#?}", compilation.diagnostics.diagnostics());

    // The initializer resolved to the annotated struct.
    let Item::Fun(f) = &compilation.module.items[1] else {
        panic!("expected function");
    };
    let Stmt::Let(var) = &f.body.stmts[0] else {
        panic!("expected let");
    };
    let Some(init) = &var.init else {
        panic!("expected initializer");
    };
    let ExprKind::AdtInit { def, fields, .. } = &init.kind else {
        panic!("expected struct literal");
    };
    assert!(def.is_some());
    assert_eq!(fields[0].index, Some(0));
    assert_eq!(fields[1].index, Some(1));
}

#[test]
fn method_calls_auto_deref_references() {
    // struct Point { x: i32, fun get(self) -> i32 { return self.x } }
    let point = struct_decl(
        "Point",
        vec![field("x", named_ty("i32"))],
        vec![method(
            "get",
            SelfKind::Ref,
            vec![],
            Some(named_ty("i32")),
            block(vec![ret(Some(field_access(ident("self"), "x")))], None),
        )],
    );
    // fun read(p: &Point) -> i32 { return p.get() }
    let read = fun(
        "read",
        vec![param("p", ref_ty(named_ty("Point")))],
        Some(named_ty("i32")),
        block(
            vec![ret(Some(method_call(ident("p"), "get", vec![])))],
            None,
        ),
    );
    let (ok, compilation) = analyze(module("deref", vec![Item::Struct(point), Item::Fun(read)]));
    assert!(ok, "{:#?}", compilation.diagnostics.diagnostics());
}

#[test]
fn every_expression_is_typed_after_inference() {
    fn assert_typed(e: &Expr) {
        assert!(e.ty.is_some(), "untyped expression: {:?}", e.kind);
        match &e.kind {
            ExprKind::Binary { lhs, rhs, .. } => {
                assert_typed(lhs);
                assert_typed(rhs);
            }
            ExprKind::FunCall { callee, args, .. } => {
                assert_typed(callee);
                for a in args {
                    assert_typed(a);
                }
            }
            _ => {}
        }
    }

    let id = generic_fun(
        "id",
        vec![type_param("T")],
        vec![param("x", named_ty("T"))],
        Some(named_ty("T")),
        block(vec![ret(Some(ident("x")))], None),
    );
    let main = fun(
        "main",
        vec![],
        None,
        block(
            vec![Stmt::Let(let_(
                "a",
                None,
                Some(binary(
                    phi_ast::BinOp::Add,
                    call(ident("id"), vec![int(1)]),
                    int(2),
                )),
            ))],
            None,
        ),
    );
    let (ok, compilation) = analyze(module("typed", vec![Item::Fun(id), Item::Fun(main)]));
    assert!(ok);

    for item in &compilation.module.items {
        let Item::Fun(f) = item else { continue };
        for stmt in &f.body.stmts {
            match stmt {
                Stmt::Let(var) => {
                    assert!(var.ty.is_some());
                    if let Some(init) = &var.init {
                        assert_typed(init);
                    }
                }
                Stmt::Return { value: Some(v), .. } => assert_typed(v),
                _ => {}
            }
        }
    }
}

#[test]
fn every_reference_is_resolved_after_resolution() {
    let main = fun(
        "main",
        vec![],
        None,
        block(
            vec![
                Stmt::Let(let_("x", None, Some(int(1)))),
                Stmt::Expr(ident("x")),
            ],
            None,
        ),
    );
    let mut compilation = Compilation::new(module("resolved", vec![Item::Fun(main)]), "t.phi");
    assert!(compilation.resolve_names());

    let Item::Fun(f) = &compilation.module.items[0] else {
        panic!("expected function");
    };
    assert!(f.def.is_some());
    let Stmt::Expr(e) = &f.body.stmts[1] else {
        panic!("expected expression statement");
    };
    let ExprKind::DeclRef { def, .. } = &e.kind else {
        panic!("expected reference");
    };
    assert!(def.is_some());
}
