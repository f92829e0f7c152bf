//! Phase 1: discovery of generic instantiations.
//!
//! Walks concrete bodies only. A generic body never reaches this walk; it
//! is substituted first, so the instantiations inside it surface with
//! concrete arguments. Argument lists are recovered by matching the
//! declaration's signature against the concrete types inference wrote into
//! the call site.

use std::collections::HashMap;

use phi_ast::{
    Block, DefId, Expr, ExprKind, FunDecl, PatternKind, Stmt, TyId, TyKind, TypeExpr,
    TypeExprKind, TypeRes,
};

use super::CodeGen;
use crate::defs::DefKind;

impl<'ctx, 'a> CodeGen<'ctx, 'a> {
    pub(crate) fn discover_in_fun(&mut self, decl: &FunDecl) -> Result<(), String> {
        self.discover_block(&decl.body)
    }

    fn discover_block(&mut self, block: &Block) -> Result<(), String> {
        for stmt in &block.stmts {
            self.discover_stmt(stmt)?;
        }
        if let Some(tail) = &block.tail {
            self.discover_expr(tail)?;
        }
        Ok(())
    }

    fn discover_stmt(&mut self, stmt: &Stmt) -> Result<(), String> {
        match stmt {
            Stmt::Let(var) => {
                if let Some(ty) = var.ty {
                    self.scan_ty(ty)?;
                }
                if let Some(init) = &var.init {
                    self.discover_expr(init)?;
                }
                Ok(())
            }
            Stmt::Assign { target, value } | Stmt::CompoundAssign { target, value, .. } => {
                self.discover_expr(target)?;
                self.discover_expr(value)
            }
            Stmt::Return { value, .. } => match value {
                Some(value) => self.discover_expr(value),
                None => Ok(()),
            },
            Stmt::Break { .. } | Stmt::Continue { .. } => Ok(()),
            Stmt::Defer(expr) => self.discover_expr(expr),
            Stmt::If {
                cond,
                then_block,
                else_block,
            } => {
                self.discover_expr(cond)?;
                self.discover_block(then_block)?;
                match else_block {
                    Some(else_block) => self.discover_block(else_block),
                    None => Ok(()),
                }
            }
            Stmt::While { cond, body } => {
                self.discover_expr(cond)?;
                self.discover_block(body)
            }
            Stmt::For { var, iter, body } => {
                if let Some(ty) = var.ty {
                    self.scan_ty(ty)?;
                }
                self.discover_expr(iter)?;
                self.discover_block(body)
            }
            Stmt::Expr(expr) => self.discover_expr(expr),
        }
    }

    fn discover_expr(&mut self, e: &Expr) -> Result<(), String> {
        if let Some(ty) = e.ty {
            self.scan_ty(ty)?;
        }

        match &e.kind {
            ExprKind::IntLit(_)
            | ExprKind::FloatLit(_)
            | ExprKind::StrLit(_)
            | ExprKind::CharLit(_)
            | ExprKind::BoolLit(_)
            | ExprKind::DeclRef { .. } => Ok(()),

            ExprKind::Range { start, end, .. } => {
                self.discover_expr(start)?;
                self.discover_expr(end)
            }

            ExprKind::TupleLit(elems) | ExprKind::ArrayLit(elems) => {
                for elem in elems {
                    self.discover_expr(elem)?;
                }
                Ok(())
            }

            ExprKind::FunCall { callee, args, .. } => {
                self.discover_expr(callee)?;
                for arg in args {
                    self.discover_expr(arg)?;
                }
                if let ExprKind::DeclRef { def: Some(def), .. } = &callee.kind {
                    if let DefKind::Fun { type_params } = self.sess.defs.kind(*def) {
                        if *type_params > 0 {
                            let args = self.fn_type_args(*def, callee)?;
                            self.queue_function(*def, &args)?;
                        }
                    }
                }
                Ok(())
            }

            ExprKind::MethodCall {
                base,
                args,
                def,
                method,
            } => {
                self.discover_expr(base)?;
                for arg in args {
                    self.discover_expr(arg)?;
                }
                let mdef = def.unwrap_or_else(|| panic!("unresolved method `{}`", method));
                let receiver = self.deref_ty(base.ty.expect("untyped receiver"));
                let (parent, parent_args) = self
                    .adt_parts(receiver)
                    .ok_or_else(|| format!("method call on non-ADT receiver `{}`", method))?;
                let own_args = self.method_own_args(mdef, e, args)?;
                self.queue_method(mdef, parent, &parent_args, &own_args)?;
                Ok(())
            }

            ExprKind::AssocCall {
                adt_def,
                def,
                args,
                method,
                ..
            } => {
                for arg in args {
                    self.discover_expr(arg)?;
                }
                let mdef = def.unwrap_or_else(|| panic!("unresolved method `{}`", method));
                let parent = adt_def.expect("unresolved static call target");
                let (parent_args, own_args) = self.assoc_call_args(mdef, parent, e, args)?;
                self.queue_method(mdef, parent, &parent_args, &own_args)?;
                Ok(())
            }

            ExprKind::Binary { lhs, rhs, .. } => {
                self.discover_expr(lhs)?;
                self.discover_expr(rhs)
            }
            ExprKind::Unary { operand, .. } => self.discover_expr(operand),

            ExprKind::AdtInit { fields, .. } => {
                for field in fields {
                    self.discover_expr(&field.value)?;
                }
                Ok(())
            }
            ExprKind::VariantInit { args, .. } => {
                for arg in args {
                    self.discover_expr(arg)?;
                }
                Ok(())
            }

            ExprKind::FieldAccess { base, .. } | ExprKind::TupleIndex { base, .. } => {
                self.discover_expr(base)
            }
            ExprKind::ArrayIndex { base, index } => {
                self.discover_expr(base)?;
                self.discover_expr(index)
            }

            ExprKind::Match { scrutinee, arms } => {
                self.discover_expr(scrutinee)?;
                for arm in arms {
                    for pattern in &arm.patterns {
                        match &pattern.kind {
                            PatternKind::Wildcard => {}
                            PatternKind::Literal(expr) => self.discover_expr(expr)?,
                            PatternKind::Variant { bindings, .. } => {
                                for binding in bindings {
                                    if let Some(ty) = binding.ty {
                                        self.scan_ty(ty)?;
                                    }
                                }
                            }
                        }
                    }
                    self.discover_block(&arm.body)?;
                }
                Ok(())
            }

            ExprKind::Builtin { args, .. } => {
                for arg in args {
                    self.discover_expr(arg)?;
                }
                Ok(())
            }
        }
    }

    /// A static call names no receiver; both the parent's and the method's
    /// own type arguments come out of signature matching.
    pub(crate) fn assoc_call_args(
        &self,
        mdef: DefId,
        parent: DefId,
        call: &Expr,
        args: &[Expr],
    ) -> Result<(Vec<TyId>, Vec<TyId>), String> {
        let parent_tps = self.decls.adt(parent).type_params();
        let info = self.decls.methods.get(&mdef).expect("unknown method");
        let mut map = HashMap::new();
        self.match_fn_sig(mdef, call, args, &mut map)?;
        let parent_args = lookup_args(parent_tps, &map, &info.decl.name)?;
        let own_args = lookup_args(&info.decl.type_params, &map, &info.decl.name)?;
        Ok((parent_args, own_args))
    }

    /// Recover a generic function's type arguments from a call site: match
    /// the declared signature against the instantiated function type that
    /// inference wrote on the callee.
    pub(crate) fn fn_type_args(&self, def: DefId, callee: &Expr) -> Result<Vec<TyId>, String> {
        let decl = self.decls.funs.get(&def).expect("unknown function");
        let callee_ty = callee.ty.expect("untyped callee");
        let TyKind::Fun { params, ret } = self.sess.types.kind(callee_ty) else {
            return Err(format!("callee `{}` is not a function type", decl.name));
        };

        let mut map = HashMap::new();
        for (sig, concrete) in decl.params.iter().zip(params) {
            self.match_type(&sig.ty, concrete, &mut map);
        }
        if let Some(sig_ret) = &decl.return_type {
            self.match_type(sig_ret, ret, &mut map);
        }
        lookup_args(&decl.type_params, &map, &decl.name)
    }

    /// Method-level type arguments, recovered the same way.
    pub(crate) fn method_own_args(
        &self,
        mdef: DefId,
        call: &Expr,
        args: &[Expr],
    ) -> Result<Vec<TyId>, String> {
        let info = self.decls.methods.get(&mdef).expect("unknown method");
        if info.decl.type_params.is_empty() {
            return Ok(vec![]);
        }
        let mut map = HashMap::new();
        for (sig, arg) in info.decl.params.iter().zip(args) {
            self.match_type(&sig.ty, arg.ty.expect("untyped argument"), &mut map);
        }
        if let Some(sig_ret) = &info.decl.return_type {
            self.match_type(sig_ret, call.ty.expect("untyped call"), &mut map);
        }
        lookup_args(&info.decl.type_params, &map, &info.decl.name)
    }

    fn match_fn_sig(
        &self,
        mdef: DefId,
        call: &Expr,
        args: &[Expr],
        map: &mut HashMap<DefId, TyId>,
    ) -> Result<(), String> {
        let info = self.decls.methods.get(&mdef).expect("unknown method");
        for (sig, arg) in info.decl.params.iter().zip(args) {
            self.match_type(&sig.ty, arg.ty.expect("untyped argument"), map);
        }
        if let Some(sig_ret) = &info.decl.return_type {
            self.match_type(sig_ret, call.ty.expect("untyped call"), map);
        }
        Ok(())
    }

    /// Structurally align a signature type with a concrete type, binding
    /// every type parameter it mentions. Mismatches are ignored; inference
    /// already guaranteed the shapes agree.
    fn match_type(&self, sig: &TypeExpr, concrete: TyId, map: &mut HashMap<DefId, TyId>) {
        let kind = self.sess.types.kind(concrete);
        match &sig.kind {
            TypeExprKind::Named { args, .. } => {
                match sig.res.expect("unresolved signature type") {
                    TypeRes::TypeParam(def) => {
                        map.entry(def).or_insert(concrete);
                    }
                    TypeRes::Adt(_) => {
                        if let TyKind::Applied { args: cargs, .. } = kind {
                            for (s, c) in args.iter().zip(cargs) {
                                self.match_type(s, c, map);
                            }
                        }
                    }
                    TypeRes::Range => {
                        if let TyKind::Range(elem) = kind {
                            self.match_type(&args[0], elem, map);
                        }
                    }
                    TypeRes::Prim(_) => {}
                }
            }
            TypeExprKind::Tuple(elems) => {
                if let TyKind::Tuple(celems) = kind {
                    for (s, c) in elems.iter().zip(celems) {
                        self.match_type(s, c, map);
                    }
                }
            }
            TypeExprKind::Array(elem) => {
                if let TyKind::Array(celem) = kind {
                    self.match_type(elem, celem, map);
                }
            }
            TypeExprKind::Ptr(inner) => {
                if let TyKind::Ptr(cinner) = kind {
                    self.match_type(inner, cinner, map);
                }
            }
            TypeExprKind::Ref(inner) => {
                if let TyKind::Ref(cinner) = kind {
                    self.match_type(inner, cinner, map);
                }
            }
            TypeExprKind::Fun { params, ret } => {
                if let TyKind::Fun {
                    params: cparams,
                    ret: cret,
                } = kind
                {
                    for (s, c) in params.iter().zip(cparams) {
                        self.match_type(s, c, map);
                    }
                    self.match_type(ret, cret, map);
                }
            }
        }
    }
}

fn lookup_args(
    params: &[phi_ast::TypeParam],
    map: &HashMap<DefId, TyId>,
    owner: &str,
) -> Result<Vec<TyId>, String> {
    params
        .iter()
        .map(|tp| {
            map.get(&tp.def.expect("unresolved type parameter"))
                .copied()
                .ok_or_else(|| {
                    format!(
                        "cannot determine the type argument `{}` of `{}`",
                        tp.name, owner
                    )
                })
        })
        .collect()
}
