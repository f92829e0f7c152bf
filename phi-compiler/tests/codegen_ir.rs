// IR-shape tests: the module is compiled, verified, and printed, and the
// assertions look at the textual IR.

use inkwell::context::Context;
use phi_ast::build::*;
use phi_ast::{Item, Module, SelfKind, SrcLoc, Stmt};
use phi_compiler::{CodeGen, Compilation};

fn compile_ir(module: Module) -> String {
    let mut compilation = Compilation::new(module, "test.phi");
    assert!(
        compilation.analyze(),
        "analysis failed: {:#?}",
        compilation.diagnostics.diagnostics()
    );
    let context = Context::create();
    let mut codegen = CodeGen::new(&context, &compilation);
    codegen.compile().expect("code generation failed");
    codegen
        .module
        .verify()
        .map_err(|e| e.to_string())
        .expect("emitted module does not verify");
    codegen.print_ir()
}

fn count(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}

#[test]
fn polymorphic_identity_emits_one_symbol_per_instantiation() {
    let my_struct = struct_decl("MyStruct", vec![field("v", named_ty("i32"))], vec![]);
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
                Stmt::Let(let_(
                    "b",
                    None,
                    Some(call(ident("id"), vec![int(2)])),
                )),
                Stmt::Let(let_(
                    "c",
                    None,
                    Some(call(
                        ident("id"),
                        vec![adt_init("MyStruct", vec![("v", int(3))])],
                    )),
                )),
            ],
            None,
        ),
    );

    let ir = compile_ir(module(
        "poly",
        vec![Item::Struct(my_struct), Item::Fun(id), Item::Fun(main)],
    ));

    // Two call sites with i32 share one symbol; the struct gets its own.
    assert_eq!(count(&ir, "define i32 @id_i32("), 1, "{}", ir);
    assert_eq!(count(&ir, "define %MyStruct @id_MyStruct("), 1, "{}", ir);
}

#[test]
fn recursive_struct_lowers_through_an_opaque_pointer() {
    let node = struct_decl(
        "Node",
        vec![
            field("value", named_ty("i32")),
            field("next", ptr_ty(named_ty("Node"))),
        ],
        vec![],
    );
    let reader = fun(
        "value_of",
        vec![param("n", named_ty("Node"))],
        Some(named_ty("i32")),
        block(vec![ret(Some(field_access(ident("n"), "value")))], None),
    );

    let ir = compile_ir(module("rec", vec![Item::Struct(node), Item::Fun(reader)]));
    assert!(ir.contains("%Node = type { i32, ptr }"), "{}", ir);
}

#[test]
fn enum_payload_match_takes_the_switch_fast_path() {
    let opt = generic_enum(
        "Opt",
        vec![type_param("T")],
        vec![
            variant("Some", vec![named_ty("T")]),
            variant("None", vec![]),
        ],
        vec![],
    );
    let unwrap = fun(
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
    let main = fun(
        "main",
        vec![],
        None,
        block(
            vec![
                Stmt::Let(let_(
                    "o",
                    Some(applied_ty("Opt", vec![named_ty("i32")])),
                    Some(variant_init("Opt", "Some", vec![int(41)])),
                )),
                Stmt::Expr(println(vec![call(ident("unwrap_or_zero"), vec![ident("o")])])),
            ],
            None,
        ),
    );

    let ir = compile_ir(module(
        "opt",
        vec![Item::Enum(opt), Item::Fun(unwrap), Item::Fun(main)],
    ));

    // Discriminant + 4-byte payload, and a real switch over the tag.
    assert!(ir.contains("%Opt_i32 = type { i32, [4 x i8] }"), "{}", ir);
    assert!(ir.contains("switch i32"), "{}", ir);
}

#[test]
fn dense_integer_match_lowers_to_a_switch() {
    let classify = fun(
        "classify",
        vec![param("n", named_ty("i32"))],
        Some(named_ty("string")),
        block(
            vec![ret(Some(match_expr(
                ident("n"),
                vec![
                    arm_value(lit_pattern(int(0)), string("zero")),
                    arm_value(lit_pattern(int(1)), string("one")),
                    arm_value(wildcard(), string("many")),
                ],
            )))],
            None,
        ),
    );

    let ir = compile_ir(module("dense", vec![Item::Fun(classify)]));
    assert!(ir.contains("switch i32"), "{}", ir);
    assert!(ir.contains("i32 0, label"), "{}", ir);
    assert!(ir.contains("i32 1, label"), "{}", ir);
}

#[test]
fn break_and_continue_target_the_innermost_loop() {
    // while true { for i in 0..10 { if i == 3 { break } else { continue } } break }
    let body = block(
        vec![Stmt::If {
            cond: binary(phi_ast::BinOp::Eq, ident("i"), int(3)),
            then_block: block(vec![Stmt::Break { loc: SrcLoc::default() }], None),
            else_block: Some(block(
                vec![Stmt::Continue {
                    loc: SrcLoc::default(),
                }],
                None,
            )),
        }],
        None,
    );
    let loops = fun(
        "loops",
        vec![],
        None,
        block(
            vec![Stmt::While {
                cond: boolean(true),
                body: block(
                    vec![
                        for_in("i", range(int(0), int(10), false), body),
                        Stmt::Break {
                            loc: SrcLoc::default(),
                        },
                    ],
                    None,
                ),
            }],
            None,
        ),
    );

    let ir = compile_ir(module("loops", vec![Item::Fun(loops)]));
    // The for loop keeps its increment block; continue routes through it.
    assert!(ir.contains("for.inc"), "{}", ir);
    assert!(ir.contains("while.end"), "{}", ir);
}

#[test]
fn deferred_expressions_run_in_reverse_order() {
    let first = fun("first", vec![], None, block(vec![], None));
    let second = fun("second", vec![], None, block(vec![], None));
    let run = fun(
        "run",
        vec![],
        None,
        block(
            vec![
                Stmt::Defer(call(ident("first"), vec![])),
                Stmt::Defer(call(ident("second"), vec![])),
                ret(None),
            ],
            None,
        ),
    );

    let ir = compile_ir(module(
        "defers",
        vec![Item::Fun(first), Item::Fun(second), Item::Fun(run)],
    ));
    let second_at = ir.find("call void @second").expect("second never called");
    let first_at = ir.find("call void @first").expect("first never called");
    assert!(
        second_at < first_at,
        "defers must run LIFO:\n{}",
        ir
    );
}

#[test]
fn user_main_is_wrapped_by_a_c_entry_point() {
    let main = fun(
        "main",
        vec![],
        None,
        block(vec![Stmt::Expr(println(vec![int(42)]))], None),
    );
    let ir = compile_ir(module("entry", vec![Item::Fun(main)]));
    assert!(ir.contains("define void @__builtin_main()"), "{}", ir);
    assert!(ir.contains("define i32 @main()"), "{}", ir);
    assert!(ir.contains("ret i32 0"), "{}", ir);
}

#[test]
fn methods_monomorphize_as_free_functions() {
    let point = struct_decl(
        "Point",
        vec![field("x", named_ty("i32")), field("y", named_ty("i32"))],
        vec![
            method(
                "get_x",
                SelfKind::Ref,
                vec![],
                Some(named_ty("i32")),
                block(vec![ret(Some(field_access(ident("self"), "x")))], None),
            ),
            fun(
                "make",
                vec![],
                Some(named_ty("Point")),
                block(
                    vec![ret(Some(adt_init(
                        "Point",
                        vec![("x", int(1)), ("y", int(2))],
                    )))],
                    None,
                ),
            ),
        ],
    );
    let main = fun(
        "main",
        vec![],
        None,
        block(
            vec![
                Stmt::Let(let_("p", None, Some(assoc_call("Point", "make", vec![])))),
                Stmt::Expr(println(vec![method_call(ident("p"), "get_x", vec![])])),
            ],
            None,
        ),
    );

    let ir = compile_ir(module("methods", vec![Item::Struct(point), Item::Fun(main)]));
    assert!(ir.contains("define i32 @Point_get_x(ptr"), "{}", ir);
    assert!(ir.contains("define %Point @Point_make()"), "{}", ir);
}

#[test]
fn generic_struct_methods_mangle_with_the_parent() {
    let pair = generic_struct(
        "Holder",
        vec![type_param("T")],
        vec![field("value", named_ty("T"))],
        vec![method(
            "get",
            SelfKind::Ref,
            vec![],
            Some(named_ty("T")),
            block(vec![ret(Some(field_access(ident("self"), "value")))], None),
        )],
    );
    let main = fun(
        "main",
        vec![],
        None,
        block(
            vec![
                Stmt::Let(let_(
                    "h",
                    None,
                    Some(adt_init("Holder", vec![("value", int(9))])),
                )),
                Stmt::Expr(println(vec![method_call(ident("h"), "get", vec![])])),
            ],
            None,
        ),
    );

    let ir = compile_ir(module("generic", vec![Item::Struct(pair), Item::Fun(main)]));
    assert!(ir.contains("%Holder_i32 = type { i32 }"), "{}", ir);
    assert!(ir.contains("define i32 @Holder_i32_get(ptr"), "{}", ir);
}

#[test]
fn ir_serializes_to_a_ll_file() {
    let main = fun(
        "main",
        vec![],
        None,
        block(vec![Stmt::Expr(println(vec![string("hello")]))], None),
    );
    let mut compilation = Compilation::new(module("serialize", vec![Item::Fun(main)]), "t.phi");
    assert!(compilation.analyze());
    let context = Context::create();
    let mut codegen = CodeGen::new(&context, &compilation);
    codegen.compile().expect("code generation failed");

    let dir = tempfile::tempdir().expect("no temp dir");
    let path = dir.path().join("serialize.ll");
    codegen.write_ir_to_file(&path).expect("failed to write IR");
    let text = std::fs::read_to_string(&path).expect("unreadable IR file");
    assert!(text.contains("@__builtin_main"));
}

#[test]
fn array_literals_get_a_stack_backing_store() {
    let main = fun(
        "main",
        vec![],
        None,
        block(
            vec![
                Stmt::Let(let_(
                    "xs",
                    None,
                    Some(expr(phi_ast::ExprKind::ArrayLit(vec![
                        int(1),
                        int(2),
                        int(3),
                    ]))),
                )),
                Stmt::Expr(println(vec![array_index(ident("xs"), int(0))])),
            ],
            None,
        ),
    );
    let ir = compile_ir(module("arrays", vec![Item::Fun(main)]));
    assert!(ir.contains("array.backing"), "{}", ir);
    assert!(ir.contains("{ ptr, i64 }"), "{}", ir);
}
