//! Pass 2: function, method, and initializer bodies.

use phi_ast::{
    Block, BuiltinFn, Expr, ExprId, ExprKind, FunDecl, Item, Module, Pattern, PatternKind,
    Stmt,
};
use phi_diagnostics::{codes, Diagnostic};

use super::NameResolver;
use crate::defs::DefKind;
use crate::symbols::Namespace;

impl<'a> NameResolver<'a> {
    pub(crate) fn resolve_bodies(&mut self, module: &mut Module) {
        for item in &mut module.items {
            match item {
                Item::Fun(f) => self.resolve_fun_body(f),
                Item::Struct(s) => self.scoped(|this| {
                    this.bind_type_params(&s.type_params);
                    for field in &mut s.fields {
                        if let Some(default) = &mut field.default {
                            this.resolve_expr(default);
                        }
                    }
                    for m in &mut s.methods {
                        this.resolve_fun_body(m);
                    }
                }),
                Item::Enum(e) => self.scoped(|this| {
                    this.bind_type_params(&e.type_params);
                    for m in &mut e.methods {
                        this.resolve_fun_body(m);
                    }
                }),
            }
        }
    }

    fn resolve_fun_body(&mut self, f: &mut FunDecl) {
        self.scoped(|this| {
            this.bind_type_params(&f.type_params);
            if f.self_kind.is_some() && f.self_def.is_none() {
                let def = this.defs.alloc("self", DefKind::Param, f.loc);
                f.self_def = Some(def);
                // `self` can never collide: it is not a declarable name.
                let _ = this.symbols.insert(Namespace::Values, "self", def);
            }
            for p in &f.params {
                let def = p.def.expect("parameter not declared");
                if let Err(first) = this.symbols.insert(Namespace::Values, &p.name, def) {
                    this.redefinition(&p.name, p.loc, first);
                }
            }
            this.resolve_block(&mut f.body);
        });
    }

    fn resolve_block(&mut self, block: &mut Block) {
        self.scoped(|this| {
            for stmt in &mut block.stmts {
                this.resolve_stmt(stmt);
            }
            if let Some(tail) = &mut block.tail {
                this.resolve_expr(tail);
            }
        });
    }

    fn resolve_stmt(&mut self, stmt: &mut Stmt) {
        match stmt {
            Stmt::Let(var) => {
                // The initializer sees the outer binding, not the new one.
                if let Some(init) = &mut var.init {
                    self.resolve_expr(init);
                }
                if let Some(annotation) = &mut var.annotation {
                    self.resolve_type(annotation);
                }
                let def = self.defs.alloc(&var.name, DefKind::Local, var.loc);
                var.def = Some(def);
                if let Err(first) = self.symbols.insert(Namespace::Values, &var.name, def) {
                    self.redefinition(&var.name, var.loc, first);
                }
            }
            Stmt::Assign { target, value } => {
                self.resolve_expr(target);
                self.resolve_expr(value);
            }
            Stmt::CompoundAssign { target, value, .. } => {
                self.resolve_expr(target);
                self.resolve_expr(value);
            }
            Stmt::Return { value, .. } => {
                if let Some(value) = value {
                    self.resolve_expr(value);
                }
            }
            Stmt::Break { loc } => {
                if self.loop_depth == 0 {
                    let span = self.span(*loc);
                    self.diags.emit(Diagnostic::error(
                        codes::BREAK_OUTSIDE_LOOP,
                        "break outside of loop".to_string(),
                        span,
                    ));
                }
            }
            Stmt::Continue { loc } => {
                if self.loop_depth == 0 {
                    let span = self.span(*loc);
                    self.diags.emit(Diagnostic::error(
                        codes::BREAK_OUTSIDE_LOOP,
                        "continue outside of loop".to_string(),
                        span,
                    ));
                }
            }
            Stmt::Defer(expr) => self.resolve_expr(expr),
            Stmt::If {
                cond,
                then_block,
                else_block,
            } => {
                self.resolve_expr(cond);
                self.resolve_block(then_block);
                if let Some(else_block) = else_block {
                    self.resolve_block(else_block);
                }
            }
            Stmt::While { cond, body } => {
                self.resolve_expr(cond);
                self.loop_depth += 1;
                self.resolve_block(body);
                self.loop_depth -= 1;
            }
            Stmt::For { var, iter, body } => {
                self.resolve_expr(iter);
                self.scoped(|this| {
                    let def = this.defs.alloc(&var.name, DefKind::Local, var.loc);
                    var.def = Some(def);
                    if let Err(first) = this.symbols.insert(Namespace::Values, &var.name, def) {
                        this.redefinition(&var.name, var.loc, first);
                    }
                    this.loop_depth += 1;
                    this.resolve_block(body);
                    this.loop_depth -= 1;
                });
            }
            Stmt::Expr(expr) => self.resolve_expr(expr),
        }
    }

    pub(crate) fn resolve_expr(&mut self, e: &mut Expr) {
        e.id = ExprId(self.next_expr_id);
        self.next_expr_id += 1;

        // Calls to builtin names become Builtin nodes before the walk.
        let builtin = match &e.kind {
            ExprKind::FunCall { callee, .. } => match &callee.kind {
                ExprKind::DeclRef { name, .. } => BuiltinFn::from_name(name),
                _ => None,
            },
            _ => None,
        };
        if let Some(builtin) = builtin {
            let old = std::mem::replace(&mut e.kind, ExprKind::BoolLit(false));
            let ExprKind::FunCall { args, .. } = old else {
                unreachable!("checked above");
            };
            e.kind = ExprKind::Builtin { builtin, args };
        }

        match &mut e.kind {
            ExprKind::IntLit(_)
            | ExprKind::FloatLit(_)
            | ExprKind::StrLit(_)
            | ExprKind::CharLit(_)
            | ExprKind::BoolLit(_) => {}
            ExprKind::Range { start, end, .. } => {
                self.resolve_expr(start);
                self.resolve_expr(end);
            }
            ExprKind::TupleLit(elems) | ExprKind::ArrayLit(elems) => {
                for elem in elems {
                    self.resolve_expr(elem);
                }
            }
            ExprKind::DeclRef { name, def } => {
                if let Some(found) = self
                    .symbols
                    .lookup(Namespace::Values, name)
                    .or_else(|| self.symbols.lookup(Namespace::Functions, name))
                {
                    *def = Some(found);
                } else if BuiltinFn::from_name(name).is_some() {
                    let span = self.span(e.loc);
                    self.diags.emit(Diagnostic::error(
                        codes::UNDEFINED_NAME,
                        format!("builtin `{}` must be called directly", name),
                        span,
                    ));
                } else {
                    let suggestion = self
                        .symbols
                        .suggest(Namespace::Values, name)
                        .or_else(|| self.symbols.suggest(Namespace::Functions, name));
                    let span = self.span(e.loc);
                    self.diags.unknown_name("value", name, span, suggestion);
                }
            }
            ExprKind::FunCall {
                callee,
                type_args,
                args,
            } => {
                self.resolve_expr(callee);
                for t in type_args {
                    self.resolve_type(t);
                }
                for arg in args {
                    self.resolve_expr(arg);
                }
            }
            ExprKind::MethodCall { base, args, .. } => {
                self.resolve_expr(base);
                for arg in args {
                    self.resolve_expr(arg);
                }
            }
            ExprKind::AssocCall {
                adt,
                adt_def,
                type_args,
                args,
                ..
            } => {
                if let Some(def) = self.symbols.lookup(Namespace::Adts, adt) {
                    *adt_def = Some(def);
                } else {
                    let suggestion = self.symbols.suggest_type(adt);
                    let span = self.span(e.loc);
                    self.diags.unknown_type(adt, span, suggestion);
                }
                for t in type_args {
                    self.resolve_type(t);
                }
                for arg in args {
                    self.resolve_expr(arg);
                }
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                self.resolve_expr(lhs);
                self.resolve_expr(rhs);
            }
            ExprKind::Unary { operand, .. } => self.resolve_expr(operand),
            ExprKind::AdtInit {
                name,
                type_args,
                fields,
                def,
            } => {
                if let Some(name) = name {
                    match self.symbols.lookup(Namespace::Adts, name) {
                        Some(found) => {
                            if matches!(self.defs.kind(found), DefKind::Enum { .. }) {
                                let span = self.span(e.loc);
                                self.diags.emit(Diagnostic::error(
                                    codes::UNDEFINED_TYPE,
                                    format!(
                                        "`{}` is an enum; use a variant constructor instead",
                                        name
                                    ),
                                    span,
                                ));
                            } else {
                                *def = Some(found);
                            }
                        }
                        None => {
                            let suggestion = self.symbols.suggest_type(name);
                            let span = self.span(e.loc);
                            self.diags.unknown_type(name, span, suggestion);
                        }
                    }
                }
                for t in type_args {
                    self.resolve_type(t);
                }
                for field in fields {
                    self.resolve_expr(&mut field.value);
                }
            }
            ExprKind::VariantInit {
                enum_name,
                variant,
                args,
                def,
                variant_index,
            } => {
                match self.symbols.lookup(Namespace::Adts, enum_name) {
                    Some(found) if matches!(self.defs.kind(found), DefKind::Enum { .. }) => {
                        *def = Some(found);
                        match self.variants.get(&(found, variant.clone())) {
                            Some((_, index)) => *variant_index = Some(*index),
                            None => {
                                let span = self.span(e.loc);
                                self.diags.emit(Diagnostic::error(
                                    codes::INVALID_PATTERN,
                                    format!(
                                        "`{}` is not a variant of enum `{}`",
                                        variant, enum_name
                                    ),
                                    span,
                                ));
                            }
                        }
                    }
                    Some(_) => {
                        let span = self.span(e.loc);
                        self.diags.emit(Diagnostic::error(
                            codes::UNDEFINED_TYPE,
                            format!("`{}` is not an enum", enum_name),
                            span,
                        ));
                    }
                    None => {
                        let suggestion = self.symbols.suggest_type(enum_name);
                        let span = self.span(e.loc);
                        self.diags.unknown_type(enum_name, span, suggestion);
                    }
                }
                for arg in args {
                    self.resolve_expr(arg);
                }
            }
            ExprKind::FieldAccess { base, .. } => self.resolve_expr(base),
            ExprKind::TupleIndex { base, .. } => self.resolve_expr(base),
            ExprKind::ArrayIndex { base, index } => {
                self.resolve_expr(base);
                self.resolve_expr(index);
            }
            ExprKind::Match { scrutinee, arms } => {
                self.resolve_expr(scrutinee);
                for arm in arms.iter_mut() {
                    self.scoped(|this| {
                        for pattern in &mut arm.patterns {
                            this.resolve_pattern(pattern);
                        }
                        this.resolve_block(&mut arm.body);
                    });
                }
            }
            ExprKind::Builtin { args, .. } => {
                for arg in args {
                    self.resolve_expr(arg);
                }
            }
        }
    }

    fn resolve_pattern(&mut self, pattern: &mut Pattern) {
        match &mut pattern.kind {
            PatternKind::Wildcard => {}
            PatternKind::Literal(expr) => self.resolve_expr(expr),
            PatternKind::Variant { bindings, .. } => {
                // The variant name is checked against the scrutinee's enum
                // during inference; only the bindings exist at this point.
                for binding in bindings {
                    let def = self.defs.alloc(&binding.name, DefKind::Binding, binding.loc);
                    binding.def = Some(def);
                    if let Err(first) =
                        self.symbols.insert(Namespace::Values, &binding.name, def)
                    {
                        self.redefinition(&binding.name, binding.loc, first);
                    }
                }
            }
        }
    }
}
