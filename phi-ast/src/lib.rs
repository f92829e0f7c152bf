//! AST data model for the Phi language.
//!
//! The tree is produced untyped by an external parser (serde-JSON is the
//! interchange format) and then mutated in place by the semantic pipeline:
//! name resolution fills every `def` link and numbers expressions, type
//! inference fills every `ty` slot. There is no separate "resolved AST".

use serde::{Deserialize, Serialize};

pub mod build;
pub mod types;

pub use types::{BuiltinTy, TyId, TyKind, TypeInterner};

/// Stable identity of a declaration, allocated during name resolution.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct DefId(pub u32);

/// Stable identity of an expression node, assigned by the resolver (the
/// first stage to visit every node). `UNASSIGNED` is what the parser leaves.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct ExprId(pub u32);

impl ExprId {
    pub const UNASSIGNED: ExprId = ExprId(0);
}

/// Source position of a node. The parser fills this; `0:0` means unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SrcLoc {
    pub line: u32,
    pub col: u32,
}

/// Root of one translation unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub items: Vec<Item>,
}

/// Top-level items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Item {
    Fun(FunDecl),
    Struct(StructDecl),
    Enum(EnumDecl),
}

impl Item {
    pub fn name(&self) -> &str {
        match self {
            Item::Fun(f) => &f.name,
            Item::Struct(s) => &s.name,
            Item::Enum(e) => &e.name,
        }
    }
}

/// Generic type parameter, optionally constrained to a defaulting domain:
/// `T`, `T: Int`, `T: Float`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeParam {
    pub name: String,
    pub constraint: Option<String>,
    #[serde(default)]
    pub def: Option<DefId>,
    #[serde(default)]
    pub loc: SrcLoc,
}

/// How a method takes its receiver. Methods without a receiver are static.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelfKind {
    Value,
    Ref,
}

/// Function or method definition. Methods additionally know their parent
/// ADT through the definition table once resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunDecl {
    pub name: String,
    pub type_params: Vec<TypeParam>,
    /// `Some` for instance methods; decides by-value vs by-address receivers.
    #[serde(default)]
    pub self_kind: Option<SelfKind>,
    /// The definition backing `self` inside the body, filled by resolution.
    #[serde(default)]
    pub self_def: Option<DefId>,
    pub params: Vec<ParamDecl>,
    /// `None` means the `null` (void) return type.
    pub return_type: Option<TypeExpr>,
    pub body: Block,
    #[serde(default)]
    pub def: Option<DefId>,
    #[serde(default)]
    pub loc: SrcLoc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDecl {
    pub name: String,
    pub ty: TypeExpr,
    #[serde(default)]
    pub def: Option<DefId>,
    #[serde(default)]
    pub loc: SrcLoc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDecl {
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<FunDecl>,
    #[serde(default)]
    pub def: Option<DefId>,
    #[serde(default)]
    pub loc: SrcLoc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeExpr,
    /// Default initializer; fields with one may be omitted from literals.
    pub default: Option<Expr>,
    #[serde(default)]
    pub def: Option<DefId>,
    #[serde(default)]
    pub loc: SrcLoc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDecl {
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub variants: Vec<VariantDecl>,
    pub methods: Vec<FunDecl>,
    #[serde(default)]
    pub def: Option<DefId>,
    #[serde(default)]
    pub loc: SrcLoc,
}

/// Enum variant; the payload list is empty for unit variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantDecl {
    pub name: String,
    pub payload: Vec<TypeExpr>,
    #[serde(default)]
    pub def: Option<DefId>,
    #[serde(default)]
    pub loc: SrcLoc,
}

// ============================================================================
// Type references (syntactic)
// ============================================================================

/// A type as written in the source; resolution fills `res`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    #[serde(default)]
    pub res: Option<TypeRes>,
    #[serde(default)]
    pub loc: SrcLoc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeExprKind {
    /// Primitive names, type parameters, ADTs, and generic applications all
    /// arrive as `Named`; the resolver decides which one it is.
    Named { name: String, args: Vec<TypeExpr> },
    Tuple(Vec<TypeExpr>),
    Array(Box<TypeExpr>),
    Ptr(Box<TypeExpr>),
    Ref(Box<TypeExpr>),
    Fun {
        params: Vec<TypeExpr>,
        ret: Box<TypeExpr>,
    },
}

/// What a `Named` type reference resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeRes {
    Prim(BuiltinTy),
    /// The `range<elem>` primitive.
    Range,
    Adt(DefId),
    TypeParam(DefId),
}

// ============================================================================
// Statements
// ============================================================================

/// Statement list with an optional trailing value expression (match arm
/// bodies use the trailing position).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub tail: Option<Box<Expr>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    pub name: String,
    pub annotation: Option<TypeExpr>,
    pub init: Option<Expr>,
    #[serde(default)]
    pub def: Option<DefId>,
    #[serde(default)]
    pub ty: Option<TyId>,
    #[serde(default)]
    pub loc: SrcLoc,
}

/// The `for x in range` loop variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopVar {
    pub name: String,
    #[serde(default)]
    pub def: Option<DefId>,
    #[serde(default)]
    pub ty: Option<TyId>,
    #[serde(default)]
    pub loc: SrcLoc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Let(VarDecl),
    Assign {
        target: Expr,
        value: Expr,
    },
    CompoundAssign {
        target: Expr,
        op: BinOp,
        value: Expr,
    },
    Return {
        value: Option<Expr>,
        #[serde(default)]
        loc: SrcLoc,
    },
    Break {
        #[serde(default)]
        loc: SrcLoc,
    },
    Continue {
        #[serde(default)]
        loc: SrcLoc,
    },
    /// Run the expression on function exit, LIFO across all exit paths.
    Defer(Expr),
    If {
        cond: Expr,
        then_block: Block,
        else_block: Option<Block>,
    },
    While {
        cond: Expr,
        body: Block,
    },
    For {
        var: LoopVar,
        iter: Expr,
        body: Block,
    },
    Expr(Expr),
}

// ============================================================================
// Expressions
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    #[serde(default)]
    pub id: ExprId,
    pub kind: ExprKind,
    /// Filled by inference; concrete (Var-free) after defaulting.
    #[serde(default)]
    pub ty: Option<TyId>,
    #[serde(default)]
    pub loc: SrcLoc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    IntLit(i64),
    FloatLit(f64),
    StrLit(String),
    CharLit(char),
    BoolLit(bool),
    Range {
        start: Box<Expr>,
        end: Box<Expr>,
        inclusive: bool,
    },
    TupleLit(Vec<Expr>),
    ArrayLit(Vec<Expr>),
    DeclRef {
        name: String,
        #[serde(default)]
        def: Option<DefId>,
    },
    FunCall {
        callee: Box<Expr>,
        type_args: Vec<TypeExpr>,
        args: Vec<Expr>,
    },
    MethodCall {
        base: Box<Expr>,
        method: String,
        args: Vec<Expr>,
        /// The resolved method, filled during inference once the receiver
        /// type is known.
        #[serde(default)]
        def: Option<DefId>,
    },
    /// Static method call: `Point.origin()`.
    AssocCall {
        adt: String,
        #[serde(default)]
        adt_def: Option<DefId>,
        method: String,
        type_args: Vec<TypeExpr>,
        args: Vec<Expr>,
        #[serde(default)]
        def: Option<DefId>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },
    /// Struct literal; `name` is `None` for the anonymous form whose target
    /// type comes from the surrounding context.
    AdtInit {
        name: Option<String>,
        type_args: Vec<TypeExpr>,
        fields: Vec<FieldInit>,
        #[serde(default)]
        def: Option<DefId>,
    },
    /// Enum constructor: `Opt.Some(x)`.
    VariantInit {
        enum_name: String,
        variant: String,
        args: Vec<Expr>,
        #[serde(default)]
        def: Option<DefId>,
        #[serde(default)]
        variant_index: Option<usize>,
    },
    FieldAccess {
        base: Box<Expr>,
        field: String,
        #[serde(default)]
        index: Option<usize>,
    },
    TupleIndex {
        base: Box<Expr>,
        index: usize,
    },
    ArrayIndex {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    Match {
        scrutinee: Box<Expr>,
        arms: Vec<MatchArm>,
    },
    /// Compiler builtins, recognized by name during resolution.
    Builtin {
        builtin: BuiltinFn,
        args: Vec<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldInit {
    pub name: String,
    pub value: Expr,
    #[serde(default)]
    pub index: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuiltinFn {
    Println,
    Panic,
    Assert,
    Unreachable,
    TypeOf,
}

impl BuiltinFn {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "println" => BuiltinFn::Println,
            "panic" => BuiltinFn::Panic,
            "assert" => BuiltinFn::Assert,
            "unreachable" => BuiltinFn::Unreachable,
            "typeOf" => BuiltinFn::TypeOf,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            BuiltinFn::Println => "println",
            BuiltinFn::Panic => "panic",
            BuiltinFn::Assert => "assert",
            BuiltinFn::Unreachable => "unreachable",
            BuiltinFn::TypeOf => "typeOf",
        }
    }
}

/// Match arm: one or more patterns and a body whose trailing expression is
/// the arm's value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchArm {
    pub patterns: Vec<Pattern>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub kind: PatternKind,
    #[serde(default)]
    pub loc: SrcLoc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PatternKind {
    Wildcard,
    Literal(Expr),
    Variant {
        name: String,
        bindings: Vec<PatternBinding>,
        #[serde(default)]
        variant_index: Option<usize>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternBinding {
    pub name: String,
    #[serde(default)]
    pub def: Option<DefId>,
    #[serde(default)]
    pub ty: Option<TyId>,
    #[serde(default)]
    pub loc: SrcLoc,
}

// ============================================================================
// Operators
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

impl BinOp {
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }

    /// Integer-only operators.
    pub fn is_bitwise(self) -> bool {
        matches!(
            self,
            BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor | BinOp::Shl | BinOp::Shr
        )
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnOp {
    Neg,
    Not,
    /// Take the address of an l-value: `&x`.
    Ref,
    /// Load through a pointer or reference: `*p`.
    Deref,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build;

    #[test]
    fn serialization_round_trips() {
        let module = Module {
            name: "unit".to_string(),
            items: vec![Item::Fun(build::fun(
                "main",
                vec![],
                None,
                build::block(
                    vec![Stmt::Let(build::let_("x", None, Some(build::int(1))))],
                    None,
                ),
            ))],
        };

        let json = serde_json::to_string(&module).unwrap();
        let back: Module = serde_json::from_str(&json).unwrap();
        assert_eq!(module, back);
    }

    #[test]
    fn parser_output_without_analysis_fields_deserializes() {
        // An external parser serializes no `def`/`ty`/`id` fields; they must
        // default to the unresolved state.
        let json = r#"{
            "id": 0,
            "kind": { "DeclRef": { "name": "x" } }
        }"#;
        let expr: Expr = serde_json::from_str(json).unwrap();
        assert_eq!(expr.id, ExprId::UNASSIGNED);
        assert_eq!(expr.ty, None);
        match expr.kind {
            ExprKind::DeclRef { ref name, def } => {
                assert_eq!(name, "x");
                assert_eq!(def, None);
            }
            _ => panic!("expected DeclRef"),
        }
    }
}
