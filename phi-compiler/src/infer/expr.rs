//! Inference rules for expressions.

use std::collections::HashMap;

use phi_ast::{BuiltinFn, BuiltinTy, DefId, Expr, ExprKind, Pattern, PatternKind, SrcLoc};
use phi_diagnostics::{codes, suggest, Diagnostic};

use super::monotype::{Domain, Monotype};
use super::unify::UnifyError;
use super::{IResult, InferError, Inferencer};
use crate::defs::DefKind;

impl<'a> Inferencer<'a> {
    /// Infer one expression and record its monotype in the side table.
    pub(crate) fn infer_expr(&mut self, e: &mut Expr) -> IResult<Monotype> {
        let t = self.infer_expr_kind(e)?;
        self.table.insert(e.id, t.clone());
        Ok(t)
    }

    /// Strip references and pointers, following the substitution.
    fn autoderef(&self, t: &Monotype) -> Monotype {
        let mut t = self.resolved(t);
        loop {
            match t {
                Monotype::Ptr(inner) | Monotype::Ref(inner) => t = self.resolved(&inner),
                other => return other,
            }
        }
    }

    fn infer_expr_kind(&mut self, e: &mut Expr) -> IResult<Monotype> {
        let loc = e.loc;
        let id = e.id;
        match &mut e.kind {
            ExprKind::IntLit(_) => Ok(Monotype::Var(self.vars.fresh(Domain::Int))),
            ExprKind::FloatLit(_) => Ok(Monotype::Var(self.vars.fresh(Domain::Float))),
            ExprKind::StrLit(_) => Ok(Monotype::Builtin(BuiltinTy::Str)),
            ExprKind::CharLit(_) => Ok(Monotype::Builtin(BuiltinTy::Char)),
            ExprKind::BoolLit(_) => Ok(Monotype::bool()),

            ExprKind::Range { start, end, .. } => {
                let elem = Monotype::Var(self.vars.fresh(Domain::Int));
                let start_t = self.infer_expr(start)?;
                self.unify_at(&start_t, &elem, start.loc)?;
                let end_t = self.infer_expr(end)?;
                self.unify_at(&end_t, &elem, end.loc)?;
                Ok(Monotype::Range(Box::new(elem)))
            }

            ExprKind::TupleLit(elems) => {
                let mut ts = Vec::with_capacity(elems.len());
                for elem in elems {
                    ts.push(self.infer_expr(elem)?);
                }
                Ok(Monotype::Tuple(ts))
            }

            ExprKind::ArrayLit(elems) => {
                let elem_t = Monotype::Var(self.vars.fresh(Domain::Any));
                for elem in elems {
                    let t = self.infer_expr(elem)?;
                    self.unify_at(&t, &elem_t, elem.loc)?;
                }
                Ok(Monotype::Array(Box::new(elem_t)))
            }

            ExprKind::DeclRef { def, .. } => {
                let Some(def) = *def else {
                    return Err(InferError::Reported);
                };
                let scheme = self
                    .env
                    .get(def)
                    .cloned()
                    .expect("resolved name without a type scheme");
                Ok(scheme.instantiate(&mut self.vars))
            }

            ExprKind::FunCall {
                callee,
                type_args,
                args,
            } => {
                let callee_t = if type_args.is_empty() {
                    self.infer_expr(callee)?
                } else {
                    self.instantiate_explicit(callee, type_args, loc)?
                };
                let mut arg_ts = Vec::with_capacity(args.len());
                for arg in args.iter_mut() {
                    arg_ts.push(self.infer_expr(arg)?);
                }
                let ret = Monotype::Var(self.vars.fresh(Domain::Any));
                let expected = Monotype::Fun {
                    params: arg_ts,
                    ret: Box::new(ret.clone()),
                };
                self.unify_at(&callee_t, &expected, loc)?;
                Ok(ret)
            }

            ExprKind::MethodCall {
                base,
                method,
                args,
                def,
            } => {
                let base_t = self.infer_expr(base)?;
                let receiver = self.autoderef(&base_t);
                let parent = self.adt_of(&receiver, base.loc)?;

                let decls = self.decls;
                let Some((mdef, mdecl)) = decls.find_method(parent, method) else {
                    return Err(self.no_such_method(parent, method, loc));
                };
                if mdecl.self_kind.is_none() {
                    let parent_name = self.name_of(parent);
                    let span = self.span(loc);
                    self.diags.emit(Diagnostic::error(
                        codes::NO_SUCH_METHOD,
                        format!(
                            "`{}` is a static method; call it as `{}.{}(...)`",
                            method, parent_name, method
                        ),
                        span,
                    ));
                    return Err(InferError::Reported);
                }
                *def = Some(mdef);

                let scheme = self.fn_polytype(mdecl, Some(parent));
                let inst = scheme.instantiate(&mut self.vars);
                let Monotype::Fun { params, ret } = inst else {
                    panic!("method scheme is not a function type");
                };
                if params.len() - 1 != args.len() {
                    return Err(InferError::Unify {
                        error: UnifyError::Arity {
                            expected: params.len() - 1,
                            found: args.len(),
                        },
                        loc,
                    });
                }
                self.unify_at(&receiver, &params[0], base.loc)?;
                for (param, arg) in params[1..].iter().zip(args.iter_mut()) {
                    let arg_t = self.infer_expr(arg)?;
                    self.unify_at(&arg_t, param, arg.loc)?;
                }
                Ok(*ret)
            }

            ExprKind::AssocCall {
                adt_def,
                method,
                type_args,
                args,
                def,
                ..
            } => {
                let Some(parent) = *adt_def else {
                    return Err(InferError::Reported);
                };
                let decls = self.decls;
                let Some((mdef, mdecl)) = decls.find_method(parent, method) else {
                    return Err(self.no_such_method(parent, method, loc));
                };
                if mdecl.self_kind.is_some() {
                    let span = self.span(loc);
                    self.diags.emit(Diagnostic::error(
                        codes::NO_SUCH_METHOD,
                        format!("`{}` is an instance method and needs a receiver", method),
                        span,
                    ));
                    return Err(InferError::Reported);
                }
                *def = Some(mdef);

                let scheme = self.fn_polytype(mdecl, Some(parent));
                let inst = if type_args.is_empty() {
                    scheme.instantiate(&mut self.vars)
                } else {
                    let lowered: Vec<Monotype> = type_args
                        .iter()
                        .map(|t| self.lower_type(t, &HashMap::new()))
                        .collect();
                    match scheme.instantiate_with(&lowered) {
                        Some(t) => t,
                        None => {
                            let span = self.span(loc);
                            self.diags.emit(Diagnostic::error(
                                codes::ARGUMENT_COUNT,
                                format!(
                                    "expected {} type arguments, got {}",
                                    scheme.vars.len(),
                                    lowered.len()
                                ),
                                span,
                            ));
                            return Err(InferError::Reported);
                        }
                    }
                };
                let Monotype::Fun { params, ret } = inst else {
                    panic!("method scheme is not a function type");
                };
                if params.len() != args.len() {
                    return Err(InferError::Unify {
                        error: UnifyError::Arity {
                            expected: params.len(),
                            found: args.len(),
                        },
                        loc,
                    });
                }
                for (param, arg) in params.iter().zip(args.iter_mut()) {
                    let arg_t = self.infer_expr(arg)?;
                    self.unify_at(&arg_t, param, arg.loc)?;
                }
                Ok(*ret)
            }

            ExprKind::Binary { op, lhs, rhs } => {
                let lhs_t = self.infer_expr(lhs)?;
                let rhs_t = self.infer_expr(rhs)?;
                if op.is_arithmetic() {
                    let alpha = Monotype::Var(self.vars.fresh(Domain::Num));
                    self.unify_at(&lhs_t, &alpha, lhs.loc)?;
                    self.unify_at(&rhs_t, &alpha, rhs.loc)?;
                    Ok(alpha)
                } else if op.is_bitwise() {
                    let alpha = Monotype::Var(self.vars.fresh(Domain::Int));
                    self.unify_at(&lhs_t, &alpha, lhs.loc)?;
                    self.unify_at(&rhs_t, &alpha, rhs.loc)?;
                    Ok(alpha)
                } else if op.is_comparison() {
                    self.unify_at(&lhs_t, &rhs_t, loc)?;
                    Ok(Monotype::bool())
                } else {
                    self.unify_at(&lhs_t, &Monotype::bool(), lhs.loc)?;
                    self.unify_at(&rhs_t, &Monotype::bool(), rhs.loc)?;
                    Ok(Monotype::bool())
                }
            }

            ExprKind::Unary { op, operand } => {
                let t = self.infer_expr(operand)?;
                match op {
                    phi_ast::UnOp::Neg => {
                        let alpha = Monotype::Var(self.vars.fresh(Domain::Num));
                        self.unify_at(&t, &alpha, operand.loc)?;
                        Ok(alpha)
                    }
                    phi_ast::UnOp::Not => {
                        self.unify_at(&t, &Monotype::bool(), operand.loc)?;
                        Ok(Monotype::bool())
                    }
                    phi_ast::UnOp::Ref => Ok(Monotype::Ref(Box::new(t))),
                    phi_ast::UnOp::Deref => match self.resolved(&t) {
                        Monotype::Ptr(inner) | Monotype::Ref(inner) => Ok(*inner),
                        Monotype::Var(_) => {
                            let span = self.span(loc);
                            self.diags.emit(Diagnostic::error(
                                codes::CANNOT_INFER,
                                "the pointee type of this dereference is not known yet"
                                    .to_string(),
                                span,
                            ));
                            Err(InferError::Reported)
                        }
                        other => {
                            let rendered = self.display(&other);
                            let span = self.span(loc);
                            self.diags.emit(Diagnostic::error(
                                codes::TYPE_MISMATCH,
                                format!("type `{}` cannot be dereferenced", rendered),
                                span,
                            ));
                            Err(InferError::Reported)
                        }
                    },
                }
            }

            ExprKind::AdtInit {
                name,
                type_args,
                fields,
                def,
            } => {
                if name.is_none() {
                    // Anonymous form: the target struct comes out of the
                    // surrounding constraints once the item is solved.
                    let var = self.vars.fresh(Domain::Adt);
                    let mut recorded = Vec::with_capacity(fields.len());
                    for init in fields.iter_mut() {
                        let t = self.infer_expr(&mut init.value)?;
                        recorded.push((init.name.clone(), t, init.value.loc));
                    }
                    self.push_pending(id, var.clone(), recorded, loc);
                    return Ok(Monotype::Var(var));
                }

                let Some(sdef) = *def else {
                    return Err(InferError::Reported);
                };
                let decls = self.decls;
                let decl = decls
                    .adt(sdef)
                    .as_struct()
                    .expect("struct literal resolved to a non-struct");

                let args: Vec<Monotype> = if type_args.is_empty() {
                    decl.type_params
                        .iter()
                        .map(|tp| Monotype::Var(self.vars.fresh(Self::domain_of(tp))))
                        .collect()
                } else {
                    type_args
                        .iter()
                        .map(|t| self.lower_type(t, &HashMap::new()))
                        .collect()
                };
                let map: HashMap<DefId, Monotype> = decl
                    .type_params
                    .iter()
                    .zip(args.iter().cloned())
                    .map(|(tp, arg)| (tp.def.expect("unresolved type parameter"), arg))
                    .collect();

                for init in fields.iter_mut() {
                    let found = self.infer_expr(&mut init.value)?;
                    match decl.fields.iter().position(|f| f.name == init.name) {
                        Some(index) => {
                            init.index = Some(index);
                            let declared = self.lower_type(&decl.fields[index].ty, &map);
                            self.unify_at(&found, &declared, init.value.loc)?;
                        }
                        None => {
                            let span = self.span(init.value.loc);
                            let adt = decl.name.clone();
                            self.diags.emit(Diagnostic::error(
                                codes::UNKNOWN_FIELD,
                                format!(
                                    "struct `{}` has no field named `{}`",
                                    adt, init.name
                                ),
                                span,
                            ));
                            return Err(InferError::Reported);
                        }
                    }
                }

                Ok(if args.is_empty() {
                    Monotype::Adt(sdef)
                } else {
                    Monotype::Applied { def: sdef, args }
                })
            }

            ExprKind::VariantInit {
                args,
                def,
                variant_index,
                ..
            } => {
                let (Some(edef), Some(index)) = (*def, *variant_index) else {
                    return Err(InferError::Reported);
                };
                let decls = self.decls;
                let decl = decls
                    .adt(edef)
                    .as_enum()
                    .expect("variant constructor resolved to a non-enum");
                let variant = &decl.variants[index];

                if variant.payload.len() != args.len() {
                    return Err(InferError::Unify {
                        error: UnifyError::Arity {
                            expected: variant.payload.len(),
                            found: args.len(),
                        },
                        loc,
                    });
                }

                let targs: Vec<Monotype> = decl
                    .type_params
                    .iter()
                    .map(|tp| Monotype::Var(self.vars.fresh(Self::domain_of(tp))))
                    .collect();
                let map: HashMap<DefId, Monotype> = decl
                    .type_params
                    .iter()
                    .zip(targs.iter().cloned())
                    .map(|(tp, arg)| (tp.def.expect("unresolved type parameter"), arg))
                    .collect();

                for (payload, arg) in variant.payload.iter().zip(args.iter_mut()) {
                    let found = self.infer_expr(arg)?;
                    let declared = self.lower_type(payload, &map);
                    self.unify_at(&found, &declared, arg.loc)?;
                }

                Ok(if targs.is_empty() {
                    Monotype::Adt(edef)
                } else {
                    Monotype::Applied {
                        def: edef,
                        args: targs,
                    }
                })
            }

            ExprKind::FieldAccess { base, field, index } => {
                let base_t = self.infer_expr(base)?;
                let receiver = self.autoderef(&base_t);
                let parent = self.adt_of(&receiver, base.loc)?;

                let decls = self.decls;
                let Some(decl) = decls.adt(parent).as_struct() else {
                    let name = self.name_of(parent);
                    let span = self.span(loc);
                    self.diags.emit(Diagnostic::error(
                        codes::NO_SUCH_FIELD,
                        format!("enum `{}` has no fields", name),
                        span,
                    ));
                    return Err(InferError::Reported);
                };

                let Some(found) = decl.fields.iter().position(|f| &f.name == field) else {
                    let span = self.span(loc);
                    let suggestion = suggest::closest_match(
                        field,
                        decl.fields.iter().map(|f| f.name.as_str()),
                    );
                    let mut diag = Diagnostic::error(
                        codes::NO_SUCH_FIELD,
                        format!("no field `{}` on type `{}`", field, decl.name),
                        span,
                    );
                    if let Some(candidate) = suggestion {
                        diag = diag.with_help(format!("did you mean `{}`?", candidate));
                    }
                    self.diags.emit(diag);
                    return Err(InferError::Reported);
                };
                *index = Some(found);

                let args = match receiver {
                    Monotype::Applied { args, .. } => args,
                    _ => vec![],
                };
                let map: HashMap<DefId, Monotype> = decl
                    .type_params
                    .iter()
                    .zip(args)
                    .map(|(tp, arg)| (tp.def.expect("unresolved type parameter"), arg))
                    .collect();
                Ok(self.lower_type(&decl.fields[found].ty, &map))
            }

            ExprKind::TupleIndex { base, index } => {
                let base_t = self.infer_expr(base)?;
                match self.autoderef(&base_t) {
                    Monotype::Tuple(elems) => {
                        if *index >= elems.len() {
                            let span = self.span(loc);
                            self.diags.emit(Diagnostic::error(
                                codes::NO_SUCH_FIELD,
                                format!(
                                    "tuple of {} elements has no index {}",
                                    elems.len(),
                                    index
                                ),
                                span,
                            ));
                            return Err(InferError::Reported);
                        }
                        Ok(elems[*index].clone())
                    }
                    Monotype::Var(_) => {
                        let span = self.span(loc);
                        self.diags.emit(Diagnostic::error(
                            codes::CANNOT_INFER,
                            "the tuple type of this expression is not known yet".to_string(),
                            span,
                        ));
                        Err(InferError::Reported)
                    }
                    other => {
                        let rendered = self.display(&other);
                        let span = self.span(loc);
                        self.diags.emit(Diagnostic::error(
                            codes::TYPE_MISMATCH,
                            format!("type `{}` is not a tuple", rendered),
                            span,
                        ));
                        Err(InferError::Reported)
                    }
                }
            }

            ExprKind::ArrayIndex { base, index } => {
                let base_t = self.infer_expr(base)?;
                let elem = Monotype::Var(self.vars.fresh(Domain::Any));
                let expected = Monotype::Array(Box::new(elem.clone()));
                self.unify_at(&base_t, &expected, base.loc)?;
                let index_t = self.infer_expr(index)?;
                let int_index = Monotype::Var(self.vars.fresh(Domain::Int));
                self.unify_at(&index_t, &int_index, index.loc)?;
                Ok(elem)
            }

            ExprKind::Match { scrutinee, arms } => {
                let scrut_t = self.infer_expr(scrutinee)?;
                let result = Monotype::Var(self.vars.fresh(Domain::Any));
                for arm in arms.iter_mut() {
                    for pattern in &mut arm.patterns {
                        self.infer_pattern(pattern, &scrut_t)?;
                    }
                    let body_t = self.infer_block(&mut arm.body)?;
                    let body_loc = arm
                        .body
                        .tail
                        .as_ref()
                        .map(|t| t.loc)
                        .unwrap_or(loc);
                    self.unify_at(&body_t, &result, body_loc)?;
                }
                Ok(result)
            }

            ExprKind::Builtin { builtin, args } => self.infer_builtin(*builtin, args, loc),
        }
    }

    /// Explicit instantiation of a generic function reference:
    /// `id<i32>(x)`.
    fn instantiate_explicit(
        &mut self,
        callee: &mut Expr,
        type_args: &[phi_ast::TypeExpr],
        loc: SrcLoc,
    ) -> IResult<Monotype> {
        let ExprKind::DeclRef { def: Some(def), .. } = &callee.kind else {
            let span = self.span(loc);
            self.diags.emit(Diagnostic::error(
                codes::ARGUMENT_COUNT,
                "type arguments are only allowed on generic functions".to_string(),
                span,
            ));
            return Err(InferError::Reported);
        };
        let def = *def;
        if !matches!(self.defs.kind(def), DefKind::Fun { .. }) {
            let span = self.span(loc);
            self.diags.emit(Diagnostic::error(
                codes::ARGUMENT_COUNT,
                "type arguments are only allowed on generic functions".to_string(),
                span,
            ));
            return Err(InferError::Reported);
        }

        let scheme = self
            .env
            .get(def)
            .cloned()
            .expect("function without a type scheme");
        let lowered: Vec<Monotype> = type_args
            .iter()
            .map(|t| self.lower_type(t, &HashMap::new()))
            .collect();
        match scheme.instantiate_with(&lowered) {
            Some(t) => {
                self.table.insert(callee.id, t.clone());
                Ok(t)
            }
            None => {
                let span = self.span(loc);
                self.diags.emit(Diagnostic::error(
                    codes::ARGUMENT_COUNT,
                    format!(
                        "expected {} type arguments, got {}",
                        scheme.vars.len(),
                        lowered.len()
                    ),
                    span,
                ));
                Err(InferError::Reported)
            }
        }
    }

    fn infer_builtin(
        &mut self,
        builtin: BuiltinFn,
        args: &mut [Expr],
        loc: SrcLoc,
    ) -> IResult<Monotype> {
        let arity_ok = match builtin {
            BuiltinFn::Println => true,
            BuiltinFn::Panic | BuiltinFn::TypeOf => args.len() == 1,
            BuiltinFn::Assert => args.len() == 1 || args.len() == 2,
            BuiltinFn::Unreachable => args.is_empty(),
        };
        if !arity_ok {
            let expected = match builtin {
                BuiltinFn::Panic | BuiltinFn::TypeOf | BuiltinFn::Assert => 1,
                _ => 0,
            };
            let span = self.span(loc);
            self.diags.arity_mismatch(expected, args.len(), span);
            return Err(InferError::Reported);
        }

        let mut arg_ts = Vec::with_capacity(args.len());
        for arg in args.iter_mut() {
            arg_ts.push(self.infer_expr(arg)?);
        }

        match builtin {
            BuiltinFn::Println => {
                // Multi-argument form: the first argument is a format string.
                if args.len() > 1 {
                    self.unify_at(&arg_ts[0], &Monotype::Builtin(BuiltinTy::Str), args[0].loc)?;
                }
            }
            BuiltinFn::Panic => {
                self.unify_at(&arg_ts[0], &Monotype::Builtin(BuiltinTy::Str), args[0].loc)?;
            }
            BuiltinFn::Assert => {
                self.unify_at(&arg_ts[0], &Monotype::bool(), args[0].loc)?;
                if args.len() == 2 {
                    self.unify_at(
                        &arg_ts[1],
                        &Monotype::Builtin(BuiltinTy::Str),
                        args[1].loc,
                    )?;
                }
            }
            BuiltinFn::Unreachable | BuiltinFn::TypeOf => {}
        }
        Ok(Monotype::null())
    }

    fn infer_pattern(&mut self, pattern: &mut Pattern, scrut: &Monotype) -> IResult<()> {
        let loc = pattern.loc;
        match &mut pattern.kind {
            PatternKind::Wildcard => Ok(()),
            PatternKind::Literal(expr) => {
                let t = self.infer_expr(expr)?;
                self.unify_at(&t, scrut, expr.loc)
            }
            PatternKind::Variant {
                name,
                bindings,
                variant_index,
            } => {
                let (parent, args) = match self.resolved(scrut) {
                    Monotype::Adt(def) => (def, vec![]),
                    Monotype::Applied { def, args } => (def, args),
                    other => {
                        let rendered = self.display(&other);
                        let span = self.span(loc);
                        self.diags.emit(Diagnostic::error(
                            codes::INVALID_PATTERN,
                            format!(
                                "variant patterns cannot match a value of type `{}`",
                                rendered
                            ),
                            span,
                        ));
                        return Err(InferError::Reported);
                    }
                };

                let decls = self.decls;
                let Some(decl) = decls.adt(parent).as_enum() else {
                    let adt = self.name_of(parent);
                    let span = self.span(loc);
                    self.diags.emit(Diagnostic::error(
                        codes::INVALID_PATTERN,
                        format!("`{}` is a struct, not an enum", adt),
                        span,
                    ));
                    return Err(InferError::Reported);
                };

                let Some((index, variant)) = decls.find_variant(decl, name) else {
                    let span = self.span(loc);
                    self.diags.emit(Diagnostic::error(
                        codes::INVALID_PATTERN,
                        format!("`{}` is not a variant of enum `{}`", name, decl.name),
                        span,
                    ));
                    return Err(InferError::Reported);
                };
                *variant_index = Some(index);

                if variant.payload.len() != bindings.len() {
                    let span = self.span(loc);
                    self.diags.emit(Diagnostic::error(
                        codes::PAYLOAD_ARITY,
                        format!(
                            "variant `{}` carries {} value{}, but the pattern binds {}",
                            variant.name,
                            variant.payload.len(),
                            if variant.payload.len() == 1 { "" } else { "s" },
                            bindings.len()
                        ),
                        span,
                    ));
                    return Err(InferError::Reported);
                }

                let map: HashMap<DefId, Monotype> = decl
                    .type_params
                    .iter()
                    .zip(args)
                    .map(|(tp, arg)| (tp.def.expect("unresolved type parameter"), arg))
                    .collect();
                for (binding, payload) in bindings.iter().zip(&variant.payload) {
                    let def = binding.def.expect("unresolved pattern binding");
                    let t = self.lower_type(payload, &map);
                    self.locals.insert(def, t.clone());
                    self.env.insert_mono(def, t);
                }
                Ok(())
            }
        }
    }

    /// The ADT behind a receiver type, or a diagnostic.
    fn adt_of(&mut self, t: &Monotype, loc: SrcLoc) -> IResult<DefId> {
        match t {
            Monotype::Adt(def) | Monotype::Applied { def, .. } => Ok(*def),
            Monotype::Var(_) => {
                let span = self.span(loc);
                self.diags.emit(Diagnostic::error(
                    codes::CANNOT_INFER,
                    "the type of this expression must be known at this point".to_string(),
                    span,
                ));
                Err(InferError::Reported)
            }
            other => {
                let rendered = self.display(other);
                let span = self.span(loc);
                self.diags.emit(Diagnostic::error(
                    codes::NO_SUCH_FIELD,
                    format!("type `{}` is not a struct or enum", rendered),
                    span,
                ));
                Err(InferError::Reported)
            }
        }
    }

    fn no_such_method(&mut self, parent: DefId, method: &str, loc: SrcLoc) -> InferError {
        let decls = self.decls;
        let pool = decls.adt(parent).methods().iter().map(|m| m.name.as_str());
        let suggestion = suggest::closest_match(method, pool).map(str::to_string);
        let adt = self.name_of(parent);
        let span = self.span(loc);
        let mut diag = Diagnostic::error(
            codes::NO_SUCH_METHOD,
            format!("no method named `{}` found on type `{}`", method, adt),
            span,
        );
        if let Some(candidate) = suggestion {
            diag = diag.with_help(format!("did you mean `{}`?", candidate));
        }
        self.diags.emit(diag);
        InferError::Reported
    }
}
