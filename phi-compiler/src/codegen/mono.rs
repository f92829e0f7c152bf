//! Monomorphization: stamping out concrete functions and methods.
//!
//! Every queued body is a clone of the generic declaration with all type
//! parameters substituted through, so later phases only ever see concrete
//! types. Substitution of nested `Applied` types records further
//! instantiations through `scan_ty`, closing the worklist transitively.

use std::collections::HashMap;

use phi_ast::{
    Block, BuiltinTy, DefId, Expr, ExprKind, FunDecl, PatternKind, Stmt, TyId, TyKind,
};

use super::{CodeGen, MonoFun};

impl<'ctx, 'a> CodeGen<'ctx, 'a> {
    /// Queue a concrete instance of a top-level function.
    pub(crate) fn queue_function(&mut self, def: DefId, args: &[TyId]) -> Result<String, String> {
        let decl = self
            .decls
            .funs
            .get(&def)
            .expect("unknown function definition")
            .clone();
        let mangled = self.mangle(&decl.name, args);
        let seen_key = format!("fun:{}", mangled);
        if self.seen.contains(&seen_key) {
            return Ok(mangled);
        }
        self.seen.insert(seen_key);
        log::debug!("instantiating function {}", mangled);

        let map = type_param_map(&decl.type_params, args);
        self.push_mono_fun(mangled.clone(), decl, &map, None)?;
        Ok(mangled)
    }

    /// Queue a concrete instance of a method. The mangled name is the
    /// parent's mangled name joined with the method name, plus the method's
    /// own type arguments when it is generic itself.
    pub(crate) fn queue_method(
        &mut self,
        mdef: DefId,
        parent: DefId,
        parent_args: &[TyId],
        own_args: &[TyId],
    ) -> Result<String, String> {
        let info = self
            .decls
            .methods
            .get(&mdef)
            .expect("unknown method definition")
            .clone();
        let parent_mangled = self.ensure_adt(parent, parent_args)?;
        let base = format!("{}_{}", parent_mangled, info.decl.name);
        let mangled = self.mangle(&base, own_args);
        let seen_key = format!("fun:{}", mangled);
        if self.seen.contains(&seen_key) {
            return Ok(mangled);
        }
        self.seen.insert(seen_key);
        log::debug!("instantiating method {}", mangled);

        let parent_tps = self.decls.adt(parent).type_params().to_vec();
        let mut map = type_param_map(&parent_tps, parent_args);
        map.extend(type_param_map(&info.decl.type_params, own_args));

        let self_ty = if parent_args.is_empty() {
            self.sess.types.intern(TyKind::Adt(parent))
        } else {
            self.sess.types.intern(TyKind::Applied {
                def: parent,
                args: parent_args.to_vec(),
            })
        };
        self.push_mono_fun(mangled.clone(), info.decl, &map, Some(self_ty))?;
        Ok(mangled)
    }

    fn push_mono_fun(
        &mut self,
        mangled: String,
        decl: FunDecl,
        map: &HashMap<DefId, TyId>,
        self_ty: Option<TyId>,
    ) -> Result<(), String> {
        let mut param_tys = Vec::with_capacity(decl.params.len());
        for p in &decl.params {
            let ty = crate::lower::lower_type_expr(&self.sess.types, &p.ty, map);
            self.scan_ty(ty)?;
            param_tys.push(ty);
        }
        let ret_ty = match &decl.return_type {
            Some(ret) => {
                let ty = crate::lower::lower_type_expr(&self.sess.types, ret, map);
                self.scan_ty(ty)?;
                if self.sess.types.is_builtin(ty, BuiltinTy::Null) {
                    None
                } else {
                    Some(ty)
                }
            }
            None => None,
        };
        if let Some(self_ty) = self_ty {
            self.scan_ty(self_ty)?;
        }

        let mut concrete = decl;
        self.subst_block_types(&mut concrete.body, map);

        self.fn_queue.push(MonoFun {
            mangled,
            decl: concrete,
            param_tys,
            ret_ty,
            self_ty,
        });
        Ok(())
    }

    /// Substitute through a cloned expression (field defaults in generic
    /// structs use this).
    pub(crate) fn substitute_expr(&self, e: &Expr, map: &HashMap<DefId, TyId>) -> Expr {
        let mut e = e.clone();
        self.subst_expr_types(&mut e, map);
        e
    }

    pub(crate) fn subst_block_types(&self, block: &mut Block, map: &HashMap<DefId, TyId>) {
        for stmt in &mut block.stmts {
            self.subst_stmt_types(stmt, map);
        }
        if let Some(tail) = &mut block.tail {
            self.subst_expr_types(tail, map);
        }
    }

    fn subst_stmt_types(&self, stmt: &mut Stmt, map: &HashMap<DefId, TyId>) {
        match stmt {
            Stmt::Let(var) => {
                if let Some(ty) = var.ty {
                    var.ty = Some(self.subst_ty(ty, map));
                }
                if let Some(init) = &mut var.init {
                    self.subst_expr_types(init, map);
                }
            }
            Stmt::Assign { target, value } | Stmt::CompoundAssign { target, value, .. } => {
                self.subst_expr_types(target, map);
                self.subst_expr_types(value, map);
            }
            Stmt::Return { value, .. } => {
                if let Some(value) = value {
                    self.subst_expr_types(value, map);
                }
            }
            Stmt::Break { .. } | Stmt::Continue { .. } => {}
            Stmt::Defer(expr) => self.subst_expr_types(expr, map),
            Stmt::If {
                cond,
                then_block,
                else_block,
            } => {
                self.subst_expr_types(cond, map);
                self.subst_block_types(then_block, map);
                if let Some(else_block) = else_block {
                    self.subst_block_types(else_block, map);
                }
            }
            Stmt::While { cond, body } => {
                self.subst_expr_types(cond, map);
                self.subst_block_types(body, map);
            }
            Stmt::For { var, iter, body } => {
                if let Some(ty) = var.ty {
                    var.ty = Some(self.subst_ty(ty, map));
                }
                self.subst_expr_types(iter, map);
                self.subst_block_types(body, map);
            }
            Stmt::Expr(expr) => self.subst_expr_types(expr, map),
        }
    }

    fn subst_expr_types(&self, e: &mut Expr, map: &HashMap<DefId, TyId>) {
        if let Some(ty) = e.ty {
            e.ty = Some(self.subst_ty(ty, map));
        }
        match &mut e.kind {
            ExprKind::IntLit(_)
            | ExprKind::FloatLit(_)
            | ExprKind::StrLit(_)
            | ExprKind::CharLit(_)
            | ExprKind::BoolLit(_)
            | ExprKind::DeclRef { .. } => {}
            ExprKind::Range { start, end, .. } => {
                self.subst_expr_types(start, map);
                self.subst_expr_types(end, map);
            }
            ExprKind::TupleLit(elems) | ExprKind::ArrayLit(elems) => {
                for elem in elems {
                    self.subst_expr_types(elem, map);
                }
            }
            ExprKind::FunCall { callee, args, .. } => {
                self.subst_expr_types(callee, map);
                for arg in args {
                    self.subst_expr_types(arg, map);
                }
            }
            ExprKind::MethodCall { base, args, .. } => {
                self.subst_expr_types(base, map);
                for arg in args {
                    self.subst_expr_types(arg, map);
                }
            }
            ExprKind::AssocCall { args, .. } => {
                for arg in args {
                    self.subst_expr_types(arg, map);
                }
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                self.subst_expr_types(lhs, map);
                self.subst_expr_types(rhs, map);
            }
            ExprKind::Unary { operand, .. } => self.subst_expr_types(operand, map),
            ExprKind::AdtInit { fields, .. } => {
                for field in fields {
                    self.subst_expr_types(&mut field.value, map);
                }
            }
            ExprKind::VariantInit { args, .. } => {
                for arg in args {
                    self.subst_expr_types(arg, map);
                }
            }
            ExprKind::FieldAccess { base, .. } | ExprKind::TupleIndex { base, .. } => {
                self.subst_expr_types(base, map)
            }
            ExprKind::ArrayIndex { base, index } => {
                self.subst_expr_types(base, map);
                self.subst_expr_types(index, map);
            }
            ExprKind::Match { scrutinee, arms } => {
                self.subst_expr_types(scrutinee, map);
                for arm in arms {
                    for pattern in &mut arm.patterns {
                        match &mut pattern.kind {
                            PatternKind::Wildcard => {}
                            PatternKind::Literal(expr) => self.subst_expr_types(expr, map),
                            PatternKind::Variant { bindings, .. } => {
                                for binding in bindings {
                                    if let Some(ty) = binding.ty {
                                        binding.ty = Some(self.subst_ty(ty, map));
                                    }
                                }
                            }
                        }
                    }
                    self.subst_block_types(&mut arm.body, map);
                }
            }
            ExprKind::Builtin { args, .. } => {
                for arg in args {
                    self.subst_expr_types(arg, map);
                }
            }
        }
    }
}

fn type_param_map(params: &[phi_ast::TypeParam], args: &[TyId]) -> HashMap<DefId, TyId> {
    params
        .iter()
        .zip(args.iter().copied())
        .map(|(tp, arg)| (tp.def.expect("unresolved type parameter"), arg))
        .collect()
}
