//! Hindley-Milner type inference with extensions: defaulting domains on
//! integer/float literals, rigid type parameters with polymorphic
//! instantiation at use sites, and pattern-matching scrutinees.
//!
//! The engine accumulates one global substitution and a side table mapping
//! every expression to its monotype. Finalization applies the substitution
//! to the side table and writes interned, Var-free types back into the AST.
//! A unification failure aborts inference for the enclosing top-level item;
//! later items still run, so one compilation reports errors from several
//! items.

pub mod env;
pub mod monotype;
pub mod subst;
pub mod unify;

mod expr;
mod stmt;

use std::collections::{HashMap, HashSet};

use phi_ast::{
    Block, DefId, Expr, ExprId, ExprKind, FunDecl, Item, Module, PatternKind, SrcLoc, Stmt,
    TyId, TypeExpr, TypeExprKind, TypeInterner, TypeParam, TypeRes,
};
use phi_diagnostics::{codes, Diagnostic, DiagnosticEngine, Span};

use crate::defs::{DeclIndex, DefTable};
use env::{Polytype, TypeEnv};
use monotype::{Domain, Monotype, TypeVar, VarFactory};
use subst::Substitution;
use unify::{unify, UnifyError};

/// Inference failure inside one item.
pub(crate) enum InferError {
    /// A unification conflict not yet shown to the user.
    Unify { error: UnifyError, loc: SrcLoc },
    /// A diagnostic was already emitted; just abort the item.
    Reported,
}

pub(crate) type IResult<T> = Result<T, InferError>;

/// An anonymous struct literal whose target type is only known once the
/// enclosing constraints are solved.
struct PendingInit {
    expr: ExprId,
    var: TypeVar,
    fields: Vec<(String, Monotype, SrcLoc)>,
    loc: SrcLoc,
}

pub struct Inferencer<'a> {
    types: &'a TypeInterner,
    defs: &'a DefTable,
    decls: &'a DeclIndex,
    diags: &'a mut DiagnosticEngine,
    file: &'a str,
    pub(crate) subst: Substitution,
    table: HashMap<ExprId, Monotype>,
    locals: HashMap<DefId, Monotype>,
    env: TypeEnv,
    pub(crate) vars: VarFactory,
    current_ret: Monotype,
    pending_anon: Vec<PendingInit>,
    anon_defs: HashMap<ExprId, DefId>,
    reported_vars: HashSet<u32>,
}

impl<'a> Inferencer<'a> {
    /// Infer the whole module in place. Returns false when errors were
    /// reported.
    pub fn run(
        module: &mut Module,
        types: &'a TypeInterner,
        defs: &'a DefTable,
        decls: &'a DeclIndex,
        diags: &'a mut DiagnosticEngine,
        file: &'a str,
    ) -> bool {
        let errors_before = diags.error_count();
        let mut inf = Inferencer {
            types,
            defs,
            decls,
            diags,
            file,
            subst: Substitution::new(),
            table: HashMap::new(),
            locals: HashMap::new(),
            env: TypeEnv::new(),
            vars: VarFactory::new(),
            current_ret: Monotype::null(),
            pending_anon: Vec::new(),
            anon_defs: HashMap::new(),
            reported_vars: HashSet::new(),
        };
        inf.register_items();
        inf.infer_module(module);
        inf.resolve_pending();
        inf.default_unsolved();
        inf.finalize(module);
        inf.diags.error_count() == errors_before
    }

    pub(crate) fn span(&self, loc: SrcLoc) -> Span {
        if loc.line == 0 {
            Span::unknown()
        } else {
            Span::new(self.file.to_string(), loc.line as usize, loc.col as usize, 1)
        }
    }

    pub(crate) fn name_of(&self, def: DefId) -> String {
        self.defs.name(def).to_string()
    }

    pub(crate) fn display(&self, t: &Monotype) -> String {
        let defs = self.defs;
        t.display(&|d| defs.name(d).to_string())
    }

    /// Apply the accumulated substitution.
    pub(crate) fn resolved(&self, t: &Monotype) -> Monotype {
        self.subst.apply(t)
    }

    /// Unify under the global substitution and fold the result back in.
    pub(crate) fn unify_at(&mut self, a: &Monotype, b: &Monotype, loc: SrcLoc) -> IResult<()> {
        let a = self.subst.apply(a);
        let b = self.subst.apply(b);
        let defs = self.defs;
        match unify(&a, &b, &|d| defs.name(d).to_string()) {
            Ok(step) => {
                self.subst.compose(step);
                Ok(())
            }
            Err(error) => Err(InferError::Unify { error, loc }),
        }
    }

    fn report(&mut self, err: InferError) {
        let InferError::Unify { error, loc } = err else {
            return;
        };
        let span = self.span(loc);
        let code = match &error {
            UnifyError::Mismatch { .. } => codes::TYPE_MISMATCH,
            UnifyError::Occurs { .. } => codes::OCCURS_CHECK,
            UnifyError::Constraint { .. } => codes::CONSTRAINT_VIOLATION,
            UnifyError::Arity { .. } => codes::ARGUMENT_COUNT,
        };
        self.diags
            .emit(Diagnostic::error(code, error.to_string(), span));
    }

    // ------------------------------------------------------------------
    // Item registration: polytypes for every function
    // ------------------------------------------------------------------

    fn register_items(&mut self) {
        let decls = self.decls;
        let mut schemes = Vec::new();
        for (def, fun) in &decls.funs {
            schemes.push((*def, self.fn_polytype(fun, None)));
        }
        for (def, scheme) in schemes {
            self.env.insert(def, scheme);
        }
    }

    fn domain_of(tp: &TypeParam) -> Domain {
        match tp.constraint.as_deref() {
            Some("Int") => Domain::Int,
            Some("Float") => Domain::Float,
            _ => Domain::Any,
        }
    }

    /// Polytype of a function or method: the declared type parameters (the
    /// parent ADT's first, then the item's own) become quantified variables
    /// carrying their constraint domains.
    pub(crate) fn fn_polytype(
        &mut self,
        f: &FunDecl,
        parent: Option<DefId>,
    ) -> Polytype {
        let decls = self.decls;
        let mut qvars = Vec::new();
        let mut map: HashMap<DefId, Monotype> = HashMap::new();

        let parent_tps: &[TypeParam] = match parent {
            Some(p) => decls.adt(p).type_params(),
            None => &[],
        };
        for tp in parent_tps.iter().chain(f.type_params.iter()) {
            let v = self.vars.fresh(Self::domain_of(tp));
            map.insert(tp.def.expect("unresolved type parameter"), Monotype::Var(v.clone()));
            qvars.push(v);
        }

        let mut params = Vec::new();
        if f.self_kind.is_some() {
            let parent = parent.expect("method without a parent ADT");
            let args: Vec<Monotype> = parent_tps
                .iter()
                .map(|tp| map[&tp.def.expect("unresolved type parameter")].clone())
                .collect();
            params.push(if args.is_empty() {
                Monotype::Adt(parent)
            } else {
                Monotype::Applied { def: parent, args }
            });
        }
        for p in &f.params {
            params.push(self.lower_type(&p.ty, &map));
        }
        let ret = f
            .return_type
            .as_ref()
            .map(|t| self.lower_type(t, &map))
            .unwrap_or_else(Monotype::null);

        Polytype {
            vars: qvars,
            ty: Monotype::Fun {
                params,
                ret: Box::new(ret),
            },
        }
    }

    /// Lower a resolved type reference; type parameters present in `map` are
    /// substituted, the rest stay rigid.
    pub(crate) fn lower_type(
        &self,
        t: &TypeExpr,
        map: &HashMap<DefId, Monotype>,
    ) -> Monotype {
        match &t.kind {
            TypeExprKind::Named { args, .. } => {
                match t.res.expect("unresolved type reference survived resolution") {
                    TypeRes::Prim(b) => Monotype::Builtin(b),
                    TypeRes::Range => {
                        Monotype::Range(Box::new(self.lower_type(&args[0], map)))
                    }
                    TypeRes::Adt(def) => {
                        if args.is_empty() {
                            Monotype::Adt(def)
                        } else {
                            Monotype::Applied {
                                def,
                                args: args.iter().map(|a| self.lower_type(a, map)).collect(),
                            }
                        }
                    }
                    TypeRes::TypeParam(def) => map
                        .get(&def)
                        .cloned()
                        .unwrap_or(Monotype::Generic(def)),
                }
            }
            TypeExprKind::Tuple(elems) => {
                Monotype::Tuple(elems.iter().map(|e| self.lower_type(e, map)).collect())
            }
            TypeExprKind::Array(elem) => {
                Monotype::Array(Box::new(self.lower_type(elem, map)))
            }
            TypeExprKind::Ptr(inner) => Monotype::Ptr(Box::new(self.lower_type(inner, map))),
            TypeExprKind::Ref(inner) => Monotype::Ref(Box::new(self.lower_type(inner, map))),
            TypeExprKind::Fun { params, ret } => Monotype::Fun {
                params: params.iter().map(|p| self.lower_type(p, map)).collect(),
                ret: Box::new(self.lower_type(ret, map)),
            },
        }
    }

    /// The receiver type seen from inside a method body: the parent ADT
    /// applied to its own rigid type parameters.
    fn rigid_self_ty(&self, parent: DefId) -> Monotype {
        let tps = self.decls.adt(parent).type_params();
        if tps.is_empty() {
            Monotype::Adt(parent)
        } else {
            Monotype::Applied {
                def: parent,
                args: tps
                    .iter()
                    .map(|tp| Monotype::Generic(tp.def.expect("unresolved type parameter")))
                    .collect(),
            }
        }
    }

    // ------------------------------------------------------------------
    // Items
    // ------------------------------------------------------------------

    fn infer_module(&mut self, module: &mut Module) {
        for item in &mut module.items {
            match item {
                Item::Fun(f) => {
                    if let Err(err) = self.infer_fun(f, None) {
                        self.report(err);
                    }
                }
                Item::Struct(s) => {
                    let parent = s.def.expect("unresolved struct");
                    for field in &mut s.fields {
                        let declared = self.lower_type(&field.ty, &HashMap::new());
                        if let Some(default) = &mut field.default {
                            let result = self.infer_expr(default).and_then(|t| {
                                self.unify_at(&t, &declared, default.loc)
                            });
                            if let Err(err) = result {
                                self.report(err);
                            }
                        }
                    }
                    for m in &mut s.methods {
                        if let Err(err) = self.infer_fun(m, Some(parent)) {
                            self.report(err);
                        }
                    }
                }
                Item::Enum(e) => {
                    let parent = e.def.expect("unresolved enum");
                    for m in &mut e.methods {
                        if let Err(err) = self.infer_fun(m, Some(parent)) {
                            self.report(err);
                        }
                    }
                }
            }
        }
    }

    fn infer_fun(&mut self, f: &mut FunDecl, parent: Option<DefId>) -> IResult<()> {
        // Inside the body, the item's type parameters are rigid.
        for p in &f.params {
            let def = p.def.expect("unresolved parameter");
            let t = self.lower_type(&p.ty, &HashMap::new());
            self.locals.insert(def, t.clone());
            self.env.insert_mono(def, t);
        }
        if let Some(self_def) = f.self_def {
            let parent = parent.expect("method without a parent ADT");
            let t = self.rigid_self_ty(parent);
            self.locals.insert(self_def, t.clone());
            self.env.insert_mono(self_def, t);
        }

        self.current_ret = f
            .return_type
            .as_ref()
            .map(|t| self.lower_type(t, &HashMap::new()))
            .unwrap_or_else(Monotype::null);

        let tail_ty = self.infer_block(&mut f.body)?;
        // A trailing expression is the function's result.
        if f.body.tail.is_some() {
            let ret = self.current_ret.clone();
            let loc = f.body.tail.as_ref().map(|t| t.loc).unwrap_or(f.loc);
            self.unify_at(&tail_ty, &ret, loc)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Deferred anonymous initializers
    // ------------------------------------------------------------------

    fn resolve_pending(&mut self) {
        let pending = std::mem::take(&mut self.pending_anon);
        for init in pending {
            let target = self.subst.apply(&Monotype::Var(init.var));
            let (def, args) = match target {
                Monotype::Adt(def) => (def, vec![]),
                Monotype::Applied { def, args } => (def, args),
                Monotype::Var(_) => {
                    let span = self.span(init.loc);
                    self.diags.emit(Diagnostic::error(
                        codes::CANNOT_INFER,
                        "cannot infer the struct type of this initializer".to_string(),
                        span,
                    ));
                    continue;
                }
                other => {
                    let rendered = self.display(&other);
                    let span = self.span(init.loc);
                    self.diags.emit(Diagnostic::error(
                        codes::TYPE_MISMATCH,
                        format!("expected a struct type, found `{}`", rendered),
                        span,
                    ));
                    continue;
                }
            };

            let decls = self.decls;
            let Some(decl) = decls.adt(def).as_struct() else {
                let span = self.span(init.loc);
                let name = self.name_of(def);
                self.diags.emit(Diagnostic::error(
                    codes::TYPE_MISMATCH,
                    format!("`{}` is an enum; use a variant constructor instead", name),
                    span,
                ));
                continue;
            };

            let map: HashMap<DefId, Monotype> = decl
                .type_params
                .iter()
                .zip(args)
                .map(|(tp, arg)| (tp.def.expect("unresolved type parameter"), arg))
                .collect();

            for (name, found, loc) in &init.fields {
                match decl.fields.iter().find(|f| &f.name == name) {
                    Some(field) => {
                        let declared = self.lower_type(&field.ty, &map);
                        if let Err(err) = self.unify_at(found, &declared, *loc) {
                            self.report(err);
                        }
                    }
                    None => {
                        let span = self.span(*loc);
                        let adt = decl.name.clone();
                        self.diags.emit(Diagnostic::error(
                            codes::UNKNOWN_FIELD,
                            format!("struct `{}` has no field named `{}`", adt, name),
                            span,
                        ));
                    }
                }
            }
            self.anon_defs.insert(init.expr, def);
        }
    }

    pub(crate) fn push_pending(
        &mut self,
        expr: ExprId,
        var: TypeVar,
        fields: Vec<(String, Monotype, SrcLoc)>,
        loc: SrcLoc,
    ) {
        self.pending_anon.push(PendingInit {
            expr,
            var,
            fields,
            loc,
        });
    }

    // ------------------------------------------------------------------
    // Defaulting and finalization
    // ------------------------------------------------------------------

    /// Default remaining numeric variables: Int (and bare Num) to i32,
    /// Float to f32. Anything else stays unsolved and is reported during
    /// finalization, where a source location is at hand.
    fn default_unsolved(&mut self) {
        let mut unsolved: HashMap<u32, TypeVar> = HashMap::new();
        for t in self.table.values().chain(self.locals.values()) {
            collect_vars(&self.subst.apply(t), &mut unsolved);
        }

        let mut defaults = Substitution::new();
        for (id, var) in unsolved {
            match var.domain {
                Domain::Int | Domain::Num => {
                    defaults.bind(id, Monotype::Builtin(phi_ast::BuiltinTy::I32));
                }
                Domain::Float => {
                    defaults.bind(id, Monotype::Builtin(phi_ast::BuiltinTy::F32));
                }
                Domain::Any | Domain::Adt => {}
            }
        }
        self.subst.compose(defaults);
    }

    fn finalize(&mut self, module: &mut Module) {
        for item in &mut module.items {
            match item {
                Item::Fun(f) => self.finalize_fun(f),
                Item::Struct(s) => {
                    for field in &mut s.fields {
                        if let Some(default) = &mut field.default {
                            self.finalize_expr(default);
                        }
                    }
                    for m in &mut s.methods {
                        self.finalize_fun(m);
                    }
                }
                Item::Enum(e) => {
                    for m in &mut e.methods {
                        self.finalize_fun(m);
                    }
                }
            }
        }
    }

    fn finalize_fun(&mut self, f: &mut FunDecl) {
        self.finalize_block(&mut f.body);
    }

    fn finalize_block(&mut self, block: &mut Block) {
        for stmt in &mut block.stmts {
            self.finalize_stmt(stmt);
        }
        if let Some(tail) = &mut block.tail {
            self.finalize_expr(tail);
        }
    }

    fn finalize_stmt(&mut self, stmt: &mut Stmt) {
        match stmt {
            Stmt::Let(var) => {
                if let Some(init) = &mut var.init {
                    self.finalize_expr(init);
                }
                if let Some(def) = var.def {
                    var.ty = self.finalize_local(def, var.loc);
                }
            }
            Stmt::Assign { target, value } | Stmt::CompoundAssign { target, value, .. } => {
                self.finalize_expr(target);
                self.finalize_expr(value);
            }
            Stmt::Return { value, .. } => {
                if let Some(value) = value {
                    self.finalize_expr(value);
                }
            }
            Stmt::Break { .. } | Stmt::Continue { .. } => {}
            Stmt::Defer(expr) => self.finalize_expr(expr),
            Stmt::If {
                cond,
                then_block,
                else_block,
            } => {
                self.finalize_expr(cond);
                self.finalize_block(then_block);
                if let Some(else_block) = else_block {
                    self.finalize_block(else_block);
                }
            }
            Stmt::While { cond, body } => {
                self.finalize_expr(cond);
                self.finalize_block(body);
            }
            Stmt::For { var, iter, body } => {
                self.finalize_expr(iter);
                if let Some(def) = var.def {
                    var.ty = self.finalize_local(def, var.loc);
                }
                self.finalize_block(body);
            }
            Stmt::Expr(expr) => self.finalize_expr(expr),
        }
    }

    fn finalize_local(&mut self, def: DefId, loc: SrcLoc) -> Option<TyId> {
        let t = self.subst.apply(self.locals.get(&def)?);
        match t.to_ty(self.types) {
            Some(ty) => Some(ty),
            None => {
                self.report_unsolved(&t, loc);
                None
            }
        }
    }

    fn report_unsolved(&mut self, t: &Monotype, loc: SrcLoc) {
        let mut vars = HashMap::new();
        collect_vars(t, &mut vars);
        // One report per variable, not per mention.
        if vars.keys().all(|id| self.reported_vars.contains(id)) {
            return;
        }
        self.reported_vars.extend(vars.keys().copied());
        let span = self.span(loc);
        self.diags.emit(Diagnostic::error(
            codes::CANNOT_INFER,
            "cannot infer the type of this expression; a type annotation is needed"
                .to_string(),
            span,
        ));
    }

    fn finalize_expr(&mut self, e: &mut Expr) {
        if let Some(t) = self.table.get(&e.id) {
            let t = self.subst.apply(t);
            match t.to_ty(self.types) {
                Some(ty) => e.ty = Some(ty),
                None => self.report_unsolved(&t, e.loc),
            }
        }

        // Anonymous initializers learned their struct late.
        if let ExprKind::AdtInit {
            name: None,
            def,
            fields,
            ..
        } = &mut e.kind
        {
            if let Some(found) = self.anon_defs.get(&e.id) {
                *def = Some(*found);
                if let Some(decl) = self.decls.adts.get(found).and_then(|a| a.as_struct()) {
                    for init in fields.iter_mut() {
                        init.index = decl
                            .fields
                            .iter()
                            .position(|f| f.name == init.name);
                    }
                }
            }
        }

        match &mut e.kind {
            ExprKind::IntLit(_)
            | ExprKind::FloatLit(_)
            | ExprKind::StrLit(_)
            | ExprKind::CharLit(_)
            | ExprKind::BoolLit(_)
            | ExprKind::DeclRef { .. } => {}
            ExprKind::Range { start, end, .. } => {
                self.finalize_expr(start);
                self.finalize_expr(end);
            }
            ExprKind::TupleLit(elems) | ExprKind::ArrayLit(elems) => {
                for elem in elems {
                    self.finalize_expr(elem);
                }
            }
            ExprKind::FunCall { callee, args, .. } => {
                self.finalize_expr(callee);
                for arg in args {
                    self.finalize_expr(arg);
                }
            }
            ExprKind::MethodCall { base, args, .. } => {
                self.finalize_expr(base);
                for arg in args {
                    self.finalize_expr(arg);
                }
            }
            ExprKind::AssocCall { args, .. } => {
                for arg in args {
                    self.finalize_expr(arg);
                }
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                self.finalize_expr(lhs);
                self.finalize_expr(rhs);
            }
            ExprKind::Unary { operand, .. } => self.finalize_expr(operand),
            ExprKind::AdtInit { fields, .. } => {
                for field in fields {
                    self.finalize_expr(&mut field.value);
                }
            }
            ExprKind::VariantInit { args, .. } => {
                for arg in args {
                    self.finalize_expr(arg);
                }
            }
            ExprKind::FieldAccess { base, .. } | ExprKind::TupleIndex { base, .. } => {
                self.finalize_expr(base)
            }
            ExprKind::ArrayIndex { base, index } => {
                self.finalize_expr(base);
                self.finalize_expr(index);
            }
            ExprKind::Match { scrutinee, arms } => {
                self.finalize_expr(scrutinee);
                for arm in arms {
                    for pattern in &mut arm.patterns {
                        match &mut pattern.kind {
                            PatternKind::Wildcard => {}
                            PatternKind::Literal(expr) => self.finalize_expr(expr),
                            PatternKind::Variant { bindings, .. } => {
                                for binding in bindings {
                                    if let Some(def) = binding.def {
                                        binding.ty = self.finalize_local(def, binding.loc);
                                    }
                                }
                            }
                        }
                    }
                    self.finalize_block(&mut arm.body);
                }
            }
            ExprKind::Builtin { args, .. } => {
                for arg in args {
                    self.finalize_expr(arg);
                }
            }
        }
    }
}

fn collect_vars(t: &Monotype, acc: &mut HashMap<u32, TypeVar>) {
    match t {
        Monotype::Var(v) => {
            acc.entry(v.id).or_insert_with(|| v.clone());
        }
        Monotype::Builtin(_) | Monotype::Adt(_) | Monotype::Generic(_) => {}
        Monotype::Range(inner)
        | Monotype::Array(inner)
        | Monotype::Ptr(inner)
        | Monotype::Ref(inner) => collect_vars(inner, acc),
        Monotype::Applied { args, .. } => {
            for a in args {
                collect_vars(a, acc);
            }
        }
        Monotype::Tuple(elems) => {
            for e in elems {
                collect_vars(e, acc);
            }
        }
        Monotype::Fun { params, ret } => {
            for p in params {
                collect_vars(p, acc);
            }
            collect_vars(ret, acc);
        }
    }
}
