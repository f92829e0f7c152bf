//! Construction helpers.
//!
//! The parser lives in another process, so drivers and tests assemble
//! `Module` values directly; these shorthands keep that assembly readable.
//! Every node starts unresolved (no ids, no defs, no types).

use crate::*;

pub fn expr(kind: ExprKind) -> Expr {
    Expr {
        id: ExprId::UNASSIGNED,
        kind,
        ty: None,
        loc: SrcLoc::default(),
    }
}

pub fn int(value: i64) -> Expr {
    expr(ExprKind::IntLit(value))
}

pub fn float(value: f64) -> Expr {
    expr(ExprKind::FloatLit(value))
}

pub fn string(value: &str) -> Expr {
    expr(ExprKind::StrLit(value.to_string()))
}

pub fn chr(value: char) -> Expr {
    expr(ExprKind::CharLit(value))
}

pub fn boolean(value: bool) -> Expr {
    expr(ExprKind::BoolLit(value))
}

pub fn ident(name: &str) -> Expr {
    expr(ExprKind::DeclRef {
        name: name.to_string(),
        def: None,
    })
}

pub fn range(start: Expr, end: Expr, inclusive: bool) -> Expr {
    expr(ExprKind::Range {
        start: Box::new(start),
        end: Box::new(end),
        inclusive,
    })
}

pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    expr(ExprKind::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    })
}

pub fn unary(op: UnOp, operand: Expr) -> Expr {
    expr(ExprKind::Unary {
        op,
        operand: Box::new(operand),
    })
}

pub fn call(callee: Expr, args: Vec<Expr>) -> Expr {
    expr(ExprKind::FunCall {
        callee: Box::new(callee),
        type_args: vec![],
        args,
    })
}

pub fn call_generic(callee: Expr, type_args: Vec<TypeExpr>, args: Vec<Expr>) -> Expr {
    expr(ExprKind::FunCall {
        callee: Box::new(callee),
        type_args,
        args,
    })
}

pub fn method_call(base: Expr, method: &str, args: Vec<Expr>) -> Expr {
    expr(ExprKind::MethodCall {
        base: Box::new(base),
        method: method.to_string(),
        args,
        def: None,
    })
}

pub fn assoc_call(adt: &str, method: &str, args: Vec<Expr>) -> Expr {
    expr(ExprKind::AssocCall {
        adt: adt.to_string(),
        adt_def: None,
        method: method.to_string(),
        type_args: vec![],
        args,
        def: None,
    })
}

pub fn field_access(base: Expr, field: &str) -> Expr {
    expr(ExprKind::FieldAccess {
        base: Box::new(base),
        field: field.to_string(),
        index: None,
    })
}

pub fn tuple_index(base: Expr, index: usize) -> Expr {
    expr(ExprKind::TupleIndex {
        base: Box::new(base),
        index,
    })
}

pub fn array_index(base: Expr, index: Expr) -> Expr {
    expr(ExprKind::ArrayIndex {
        base: Box::new(base),
        index: Box::new(index),
    })
}

pub fn adt_init(name: &str, fields: Vec<(&str, Expr)>) -> Expr {
    expr(ExprKind::AdtInit {
        name: Some(name.to_string()),
        type_args: vec![],
        fields: fields
            .into_iter()
            .map(|(name, value)| FieldInit {
                name: name.to_string(),
                value,
                index: None,
            })
            .collect(),
        def: None,
    })
}

/// Anonymous struct literal; the target type comes from context.
pub fn anon_init(fields: Vec<(&str, Expr)>) -> Expr {
    expr(ExprKind::AdtInit {
        name: None,
        type_args: vec![],
        fields: fields
            .into_iter()
            .map(|(name, value)| FieldInit {
                name: name.to_string(),
                value,
                index: None,
            })
            .collect(),
        def: None,
    })
}

pub fn adt_init_generic(name: &str, type_args: Vec<TypeExpr>, fields: Vec<(&str, Expr)>) -> Expr {
    let mut init = adt_init(name, fields);
    if let ExprKind::AdtInit { type_args: ta, .. } = &mut init.kind {
        *ta = type_args;
    }
    init
}

pub fn variant_init(enum_name: &str, variant: &str, args: Vec<Expr>) -> Expr {
    expr(ExprKind::VariantInit {
        enum_name: enum_name.to_string(),
        variant: variant.to_string(),
        args,
        def: None,
        variant_index: None,
    })
}

pub fn match_expr(scrutinee: Expr, arms: Vec<MatchArm>) -> Expr {
    expr(ExprKind::Match {
        scrutinee: Box::new(scrutinee),
        arms,
    })
}

pub fn builtin(builtin: BuiltinFn, args: Vec<Expr>) -> Expr {
    expr(ExprKind::Builtin { builtin, args })
}

pub fn println(args: Vec<Expr>) -> Expr {
    // The resolver would rewrite a `println` call anyway; building the
    // Builtin node directly keeps hand-made trees equivalent.
    call(ident("println"), args)
}

// ---------------------------------------------------------------------------
// Patterns and arms
// ---------------------------------------------------------------------------

pub fn arm(patterns: Vec<Pattern>, body: Block) -> MatchArm {
    MatchArm { patterns, body }
}

/// Arm whose body is a single value expression.
pub fn arm_value(pattern: Pattern, value: Expr) -> MatchArm {
    arm(vec![pattern], block(vec![], Some(value)))
}

pub fn wildcard() -> Pattern {
    Pattern {
        kind: PatternKind::Wildcard,
        loc: SrcLoc::default(),
    }
}

pub fn lit_pattern(value: Expr) -> Pattern {
    Pattern {
        kind: PatternKind::Literal(value),
        loc: SrcLoc::default(),
    }
}

pub fn variant_pattern(name: &str, bindings: Vec<&str>) -> Pattern {
    Pattern {
        kind: PatternKind::Variant {
            name: name.to_string(),
            bindings: bindings
                .into_iter()
                .map(|b| PatternBinding {
                    name: b.to_string(),
                    def: None,
                    ty: None,
                    loc: SrcLoc::default(),
                })
                .collect(),
            variant_index: None,
        },
        loc: SrcLoc::default(),
    }
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

pub fn ty(kind: TypeExprKind) -> TypeExpr {
    TypeExpr {
        kind,
        res: None,
        loc: SrcLoc::default(),
    }
}

pub fn named_ty(name: &str) -> TypeExpr {
    ty(TypeExprKind::Named {
        name: name.to_string(),
        args: vec![],
    })
}

pub fn applied_ty(name: &str, args: Vec<TypeExpr>) -> TypeExpr {
    ty(TypeExprKind::Named {
        name: name.to_string(),
        args,
    })
}

pub fn tuple_ty(elems: Vec<TypeExpr>) -> TypeExpr {
    ty(TypeExprKind::Tuple(elems))
}

pub fn array_ty(elem: TypeExpr) -> TypeExpr {
    ty(TypeExprKind::Array(Box::new(elem)))
}

pub fn ptr_ty(inner: TypeExpr) -> TypeExpr {
    ty(TypeExprKind::Ptr(Box::new(inner)))
}

pub fn ref_ty(inner: TypeExpr) -> TypeExpr {
    ty(TypeExprKind::Ref(Box::new(inner)))
}

pub fn type_param(name: &str) -> TypeParam {
    TypeParam {
        name: name.to_string(),
        constraint: None,
        def: None,
        loc: SrcLoc::default(),
    }
}

pub fn constrained_type_param(name: &str, constraint: &str) -> TypeParam {
    TypeParam {
        name: name.to_string(),
        constraint: Some(constraint.to_string()),
        def: None,
        loc: SrcLoc::default(),
    }
}

// ---------------------------------------------------------------------------
// Statements and declarations
// ---------------------------------------------------------------------------

pub fn block(stmts: Vec<Stmt>, tail: Option<Expr>) -> Block {
    Block {
        stmts,
        tail: tail.map(Box::new),
    }
}

pub fn let_(name: &str, annotation: Option<TypeExpr>, init: Option<Expr>) -> VarDecl {
    VarDecl {
        name: name.to_string(),
        annotation,
        init,
        def: None,
        ty: None,
        loc: SrcLoc::default(),
    }
}

pub fn ret(value: Option<Expr>) -> Stmt {
    Stmt::Return {
        value,
        loc: SrcLoc::default(),
    }
}

pub fn for_in(var: &str, iter: Expr, body: Block) -> Stmt {
    Stmt::For {
        var: LoopVar {
            name: var.to_string(),
            def: None,
            ty: None,
            loc: SrcLoc::default(),
        },
        iter,
        body,
    }
}

pub fn param(name: &str, ty: TypeExpr) -> ParamDecl {
    ParamDecl {
        name: name.to_string(),
        ty,
        def: None,
        loc: SrcLoc::default(),
    }
}

pub fn fun(name: &str, params: Vec<ParamDecl>, return_type: Option<TypeExpr>, body: Block) -> FunDecl {
    FunDecl {
        name: name.to_string(),
        type_params: vec![],
        self_kind: None,
        self_def: None,
        params,
        return_type,
        body,
        def: None,
        loc: SrcLoc::default(),
    }
}

pub fn generic_fun(
    name: &str,
    type_params: Vec<TypeParam>,
    params: Vec<ParamDecl>,
    return_type: Option<TypeExpr>,
    body: Block,
) -> FunDecl {
    let mut f = fun(name, params, return_type, body);
    f.type_params = type_params;
    f
}

pub fn method(
    name: &str,
    self_kind: SelfKind,
    params: Vec<ParamDecl>,
    return_type: Option<TypeExpr>,
    body: Block,
) -> FunDecl {
    let mut f = fun(name, params, return_type, body);
    f.self_kind = Some(self_kind);
    f
}

pub fn field(name: &str, ty: TypeExpr) -> FieldDecl {
    FieldDecl {
        name: name.to_string(),
        ty,
        default: None,
        def: None,
        loc: SrcLoc::default(),
    }
}

pub fn field_with_default(name: &str, ty: TypeExpr, default: Expr) -> FieldDecl {
    let mut f = field(name, ty);
    f.default = Some(default);
    f
}

pub fn struct_decl(name: &str, fields: Vec<FieldDecl>, methods: Vec<FunDecl>) -> StructDecl {
    StructDecl {
        name: name.to_string(),
        type_params: vec![],
        fields,
        methods,
        def: None,
        loc: SrcLoc::default(),
    }
}

pub fn generic_struct(
    name: &str,
    type_params: Vec<TypeParam>,
    fields: Vec<FieldDecl>,
    methods: Vec<FunDecl>,
) -> StructDecl {
    let mut s = struct_decl(name, fields, methods);
    s.type_params = type_params;
    s
}

pub fn variant(name: &str, payload: Vec<TypeExpr>) -> VariantDecl {
    VariantDecl {
        name: name.to_string(),
        payload,
        def: None,
        loc: SrcLoc::default(),
    }
}

pub fn enum_decl(name: &str, variants: Vec<VariantDecl>, methods: Vec<FunDecl>) -> EnumDecl {
    EnumDecl {
        name: name.to_string(),
        type_params: vec![],
        variants,
        methods,
        def: None,
        loc: SrcLoc::default(),
    }
}

pub fn generic_enum(
    name: &str,
    type_params: Vec<TypeParam>,
    variants: Vec<VariantDecl>,
    methods: Vec<FunDecl>,
) -> EnumDecl {
    let mut e = enum_decl(name, variants, methods);
    e.type_params = type_params;
    e
}

pub fn module(name: &str, items: Vec<Item>) -> Module {
    Module {
        name: name.to_string(),
        items,
    }
}
