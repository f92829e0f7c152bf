//! Post-inference type checking.
//!
//! A defensive sweep over the fully-typed tree. Inference has already
//! solved and written every type; this pass validates the structural rules
//! that unification does not encode directly, and reports each violation as
//! its own diagnostic.

use std::collections::{HashMap, HashSet};

use phi_ast::{
    Block, BuiltinFn, BuiltinTy, Expr, ExprKind, FunDecl, Item, Module, PatternKind, SrcLoc,
    Stmt, TyId, TypeInterner,
};
use phi_diagnostics::{codes, Diagnostic, DiagnosticEngine, Span};

use crate::defs::{DeclIndex, DefKind, DefTable};
use crate::lower::lower_type_expr;

pub struct TypeChecker<'a> {
    types: &'a TypeInterner,
    defs: &'a DefTable,
    decls: &'a DeclIndex,
    diags: &'a mut DiagnosticEngine,
    file: &'a str,
    current_ret: TyId,
}

impl<'a> TypeChecker<'a> {
    /// Check the whole module; true means no violations.
    pub fn run(
        module: &Module,
        types: &'a TypeInterner,
        defs: &'a DefTable,
        decls: &'a DeclIndex,
        diags: &'a mut DiagnosticEngine,
        file: &'a str,
    ) -> bool {
        let errors_before = diags.error_count();
        let null = types.null();
        let mut checker = TypeChecker {
            types,
            defs,
            decls,
            diags,
            file,
            current_ret: null,
        };
        for item in &module.items {
            match item {
                Item::Fun(f) => checker.check_fun(f),
                Item::Struct(s) => {
                    for field in &s.fields {
                        if let Some(default) = &field.default {
                            checker.check_expr(default);
                        }
                    }
                    for m in &s.methods {
                        checker.check_fun(m);
                    }
                }
                Item::Enum(e) => {
                    for m in &e.methods {
                        checker.check_fun(m);
                    }
                }
            }
        }
        checker.diags.error_count() == errors_before
    }

    fn span(&self, loc: SrcLoc) -> Span {
        if loc.line == 0 {
            Span::unknown()
        } else {
            Span::new(self.file.to_string(), loc.line as usize, loc.col as usize, 1)
        }
    }

    fn display(&self, ty: TyId) -> String {
        let defs = self.defs;
        self.types.display(ty, &|d| defs.name(d).to_string())
    }

    fn is_null(&self, ty: TyId) -> bool {
        self.types.is_builtin(ty, BuiltinTy::Null)
    }

    fn check_fun(&mut self, f: &FunDecl) {
        self.current_ret = f
            .return_type
            .as_ref()
            .map(|t| lower_type_expr(self.types, t, &HashMap::new()))
            .unwrap_or_else(|| self.types.null());

        self.check_block(&f.body);

        // Non-void functions must return on the fall-through path.
        if !self.is_null(self.current_ret)
            && f.body.tail.is_none()
            && !block_diverges(&f.body)
        {
            let span = self.span(f.loc);
            let rendered = self.display(self.current_ret);
            self.diags.emit(Diagnostic::error(
                codes::RETURN_MISMATCH,
                format!(
                    "function `{}` returns `{}` but not on every path",
                    f.name, rendered
                ),
                span,
            ));
        }
    }

    fn check_block(&mut self, block: &Block) {
        for stmt in &block.stmts {
            self.check_stmt(stmt);
        }
        if let Some(tail) = &block.tail {
            self.check_expr(tail);
        }
    }

    fn check_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Let(var) => {
                if let Some(init) = &var.init {
                    self.check_expr(init);
                }
                // Annotation and initializer must agree exactly.
                if let (Some(annotation), Some(init)) = (&var.annotation, &var.init) {
                    let declared = lower_type_expr(self.types, annotation, &HashMap::new());
                    if let Some(found) = init.ty {
                        if found != declared {
                            let span = self.span(init.loc);
                            let expected = self.display(declared);
                            let got = self.display(found);
                            self.diags.emit(Diagnostic::error(
                                codes::TYPE_MISMATCH,
                                format!(
                                    "initializer has type `{}` but `{}` was annotated `{}`",
                                    got, var.name, expected
                                ),
                                span,
                            ));
                        }
                    }
                }
            }

            Stmt::Assign { target, value } | Stmt::CompoundAssign { target, value, .. } => {
                self.check_expr(target);
                self.check_expr(value);
                self.check_assign_target(target);
            }

            Stmt::Return { value, loc } => {
                if let Some(value) = value {
                    self.check_expr(value);
                }
                let expected = self.current_ret;
                match value {
                    Some(value) => {
                        if self.is_null(expected) {
                            let span = self.span(value.loc);
                            self.diags.emit(Diagnostic::error(
                                codes::RETURN_MISMATCH,
                                "this function returns no value".to_string(),
                                span,
                            ));
                        } else if let Some(found) = value.ty {
                            if found != expected {
                                let span = self.span(value.loc);
                                let got = self.display(found);
                                let want = self.display(expected);
                                self.diags.emit(Diagnostic::error(
                                    codes::RETURN_MISMATCH,
                                    format!(
                                        "return type `{}` does not match expected `{}`",
                                        got, want
                                    ),
                                    span,
                                ));
                            }
                        }
                    }
                    None => {
                        if !self.is_null(expected) {
                            let span = self.span(*loc);
                            let want = self.display(expected);
                            self.diags.emit(Diagnostic::error(
                                codes::RETURN_MISMATCH,
                                format!("expected a return value of type `{}`", want),
                                span,
                            ));
                        }
                    }
                }
            }

            Stmt::Break { .. } | Stmt::Continue { .. } => {}
            Stmt::Defer(expr) => self.check_expr(expr),

            Stmt::If {
                cond,
                then_block,
                else_block,
            } => {
                self.check_expr(cond);
                self.check_block(then_block);
                if let Some(else_block) = else_block {
                    self.check_block(else_block);
                }
            }

            Stmt::While { cond, body } => {
                self.check_expr(cond);
                self.check_block(body);
            }

            Stmt::For { iter, body, .. } => {
                self.check_expr(iter);
                self.check_block(body);
            }

            Stmt::Expr(expr) => self.check_expr(expr),
        }
    }

    fn check_assign_target(&mut self, target: &Expr) {
        let assignable = match &target.kind {
            ExprKind::DeclRef { def, .. } => def.is_some_and(|d| {
                matches!(
                    self.defs.kind(d),
                    DefKind::Local | DefKind::Param | DefKind::Binding
                )
            }),
            ExprKind::FieldAccess { .. }
            | ExprKind::TupleIndex { .. }
            | ExprKind::ArrayIndex { .. } => true,
            ExprKind::Unary {
                op: phi_ast::UnOp::Deref,
                ..
            } => true,
            _ => false,
        };
        if !assignable {
            let span = self.span(target.loc);
            self.diags.emit(Diagnostic::error(
                codes::INVALID_ASSIGN_TARGET,
                "this expression is not assignable".to_string(),
                span,
            ));
        }
    }

    fn check_expr(&mut self, e: &Expr) {
        match &e.kind {
            ExprKind::IntLit(_)
            | ExprKind::FloatLit(_)
            | ExprKind::StrLit(_)
            | ExprKind::CharLit(_)
            | ExprKind::BoolLit(_)
            | ExprKind::DeclRef { .. } => {}
            ExprKind::Range { start, end, .. } => {
                self.check_expr(start);
                self.check_expr(end);
            }
            ExprKind::TupleLit(elems) | ExprKind::ArrayLit(elems) => {
                for elem in elems {
                    self.check_expr(elem);
                }
            }
            ExprKind::FunCall { callee, args, .. } => {
                self.check_expr(callee);
                for arg in args {
                    self.check_expr(arg);
                }
            }
            ExprKind::MethodCall { base, args, .. } => {
                self.check_expr(base);
                for arg in args {
                    self.check_expr(arg);
                }
            }
            ExprKind::AssocCall { args, .. } => {
                for arg in args {
                    self.check_expr(arg);
                }
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                self.check_expr(lhs);
                self.check_expr(rhs);
            }
            ExprKind::Unary { operand, .. } => self.check_expr(operand),
            ExprKind::AdtInit { fields, .. } => {
                for field in fields {
                    self.check_expr(&field.value);
                }
                self.check_adt_init(e);
            }
            ExprKind::VariantInit { args, .. } => {
                for arg in args {
                    self.check_expr(arg);
                }
            }
            ExprKind::FieldAccess { base, .. } | ExprKind::TupleIndex { base, .. } => {
                self.check_expr(base)
            }
            ExprKind::ArrayIndex { base, index } => {
                self.check_expr(base);
                self.check_expr(index);
            }
            ExprKind::Match { .. } => self.check_match(e),
            ExprKind::Builtin { args, .. } => {
                for arg in args {
                    self.check_expr(arg);
                }
            }
        }
    }

    /// Struct initializers must cover exactly the required fields.
    fn check_adt_init(&mut self, e: &Expr) {
        let ExprKind::AdtInit { def, fields, .. } = &e.kind else {
            return;
        };
        let Some(def) = def else { return };
        let Some(decl) = self.decls.adts.get(def).and_then(|a| a.as_struct()) else {
            return;
        };

        let mut seen = HashSet::new();
        for init in fields {
            if !seen.insert(init.name.as_str()) {
                let span = self.span(init.value.loc);
                self.diags.emit(Diagnostic::error(
                    codes::UNKNOWN_FIELD,
                    format!("field `{}` specified more than once", init.name),
                    span,
                ));
            }
        }

        let missing: Vec<&str> = decl
            .fields
            .iter()
            .filter(|f| f.default.is_none() && !seen.contains(f.name.as_str()))
            .map(|f| f.name.as_str())
            .collect();
        if !missing.is_empty() {
            let span = self.span(e.loc);
            self.diags.emit(Diagnostic::error(
                codes::MISSING_FIELD,
                format!(
                    "missing field{} {} in initializer of `{}`",
                    if missing.len() == 1 { "" } else { "s" },
                    missing
                        .iter()
                        .map(|f| format!("`{}`", f))
                        .collect::<Vec<_>>()
                        .join(", "),
                    decl.name
                ),
                span,
            ));
        }
    }

    fn check_match(&mut self, e: &Expr) {
        let ExprKind::Match { scrutinee, arms } = &e.kind else {
            return;
        };
        self.check_expr(scrutinee);

        if arms.is_empty() {
            let span = self.span(e.loc);
            self.diags.emit(Diagnostic::error(
                codes::INVALID_PATTERN,
                "match expression has no arms".to_string(),
                span,
            ));
            return;
        }

        let result_ty = e.ty;
        for arm in arms {
            if arm.patterns.len() > 1 {
                let span = self.span(arm.patterns[1].loc);
                self.diags.emit(Diagnostic::error(
                    codes::NOT_IMPLEMENTED,
                    "alternation patterns are not implemented".to_string(),
                    span,
                ));
            }

            for pattern in &arm.patterns {
                match &pattern.kind {
                    PatternKind::Wildcard => {}
                    PatternKind::Literal(lit) => {
                        self.check_expr(lit);
                        if let (Some(pt), Some(st)) = (lit.ty, scrutinee.ty) {
                            if pt != st {
                                let span = self.span(lit.loc);
                                let got = self.display(pt);
                                let want = self.display(st);
                                self.diags.emit(Diagnostic::error(
                                    codes::INVALID_PATTERN,
                                    format!(
                                        "pattern has type `{}` but the scrutinee is `{}`",
                                        got, want
                                    ),
                                    span,
                                ));
                            }
                        }
                    }
                    PatternKind::Variant {
                        bindings,
                        variant_index,
                        name,
                    } => {
                        if variant_index.is_none() {
                            let span = self.span(pattern.loc);
                            self.diags.emit(Diagnostic::error(
                                codes::INVALID_PATTERN,
                                format!("unresolved variant pattern `{}`", name),
                                span,
                            ));
                        }
                        for binding in bindings {
                            if binding.ty.is_none() {
                                let span = self.span(binding.loc);
                                self.diags.emit(Diagnostic::error(
                                    codes::CANNOT_INFER,
                                    format!("binding `{}` has no type", binding.name),
                                    span,
                                ));
                            }
                        }
                    }
                }
            }

            self.check_block(&arm.body);

            // Every arm yields the match's result type.
            let arm_ty = arm
                .body
                .tail
                .as_ref()
                .and_then(|t| t.ty)
                .unwrap_or_else(|| self.types.null());
            if let Some(expected) = result_ty {
                if arm_ty != expected {
                    let loc = arm
                        .body
                        .tail
                        .as_ref()
                        .map(|t| t.loc)
                        .unwrap_or(e.loc);
                    let span = self.span(loc);
                    let got = self.display(arm_ty);
                    let want = self.display(expected);
                    self.diags.emit(Diagnostic::error(
                        codes::TYPE_MISMATCH,
                        format!("this arm has type `{}`, expected `{}`", got, want),
                        span,
                    ));
                }
            }
        }
    }
}

/// Conservative "this block cannot fall through" analysis: a trailing
/// return, or an if/else (or terminal panic/unreachable) on every path.
fn block_diverges(block: &Block) -> bool {
    match block.stmts.last() {
        Some(Stmt::Return { .. }) => true,
        Some(Stmt::If {
            then_block,
            else_block: Some(else_block),
            ..
        }) => block_diverges(then_block) && block_diverges(else_block),
        Some(Stmt::Expr(e)) => matches!(
            e.kind,
            ExprKind::Builtin {
                builtin: BuiltinFn::Panic | BuiltinFn::Unreachable,
                ..
            }
        ),
        _ => false,
    }
}
