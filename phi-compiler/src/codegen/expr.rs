//! Expression emission.

use inkwell::values::{BasicMetadataValueEnum, BasicValueEnum, PointerValue};
use inkwell::{FloatPredicate, IntPredicate};

use phi_ast::{BinOp, BuiltinTy, Expr, ExprKind, TyId, TyKind, UnOp};

use super::CodeGen;

impl<'ctx, 'a> CodeGen<'ctx, 'a> {
    /// Compile an expression; value-less expressions yield `None`.
    pub(crate) fn compile_expr(
        &mut self,
        e: &Expr,
    ) -> Result<Option<BasicValueEnum<'ctx>>, String> {
        match &e.kind {
            ExprKind::IntLit(value) => {
                let ty = e.ty.expect("untyped literal");
                let int_ty = self.llvm_type(ty)?.into_int_type();
                let signed = matches!(
                    self.sess.types.kind(ty),
                    TyKind::Builtin(b) if b.is_signed()
                );
                Ok(Some(int_ty.const_int(*value as u64, signed).into()))
            }
            ExprKind::FloatLit(value) => {
                let ty = e.ty.expect("untyped literal");
                let float_ty = self.llvm_type(ty)?.into_float_type();
                Ok(Some(float_ty.const_float(*value).into()))
            }
            ExprKind::StrLit(value) => {
                let global = self
                    .builder
                    .build_global_string_ptr(value, "str")
                    .map_err(|e| format!("failed to build string: {}", e))?;
                Ok(Some(global.as_pointer_value().into()))
            }
            ExprKind::CharLit(value) => {
                Ok(Some(self.context.i8_type().const_int(*value as u64, false).into()))
            }
            ExprKind::BoolLit(value) => {
                Ok(Some(self.context.bool_type().const_int(*value as u64, false).into()))
            }

            ExprKind::Range { start, end, .. } => {
                let elem_signed = match self.sess.types.kind(e.ty.expect("untyped range")) {
                    TyKind::Range(elem) => matches!(
                        self.sess.types.kind(elem),
                        TyKind::Builtin(b) if b.is_signed()
                    ),
                    _ => true,
                };
                let i64_ty = self.context.i64_type();
                let s = self.compile_value(start)?.into_int_value();
                let s = self.int_resize(s, i64_ty, elem_signed)?;
                let en = self.compile_value(end)?.into_int_value();
                let en = self.int_resize(en, i64_ty, elem_signed)?;

                let mut agg = self.range_struct().get_undef().into();
                agg = self.insert_field(agg, s.into(), 0, "range.start")?;
                agg = self.insert_field(agg, en.into(), 1, "range.end")?;
                Ok(Some(agg.into_struct_value().into()))
            }

            ExprKind::TupleLit(elems) => {
                let st = self.llvm_struct(e.ty.expect("untyped tuple"))?;
                let mut agg = st.get_undef().into();
                for (i, elem) in elems.iter().enumerate() {
                    let value = self.compile_value(elem)?;
                    agg = self.insert_field(agg, value, i as u32, "tuple.elem")?;
                }
                Ok(Some(agg.into_struct_value().into()))
            }

            ExprKind::ArrayLit(elems) => {
                let TyKind::Array(elem_ty) = self.sess.types.kind(e.ty.expect("untyped array"))
                else {
                    return Err("array literal without array type".to_string());
                };
                let elem_llvm = self.llvm_type(elem_ty)?;
                let backing_ty = match elem_llvm {
                    inkwell::types::BasicTypeEnum::IntType(t) => {
                        t.array_type(elems.len() as u32)
                    }
                    inkwell::types::BasicTypeEnum::FloatType(t) => {
                        t.array_type(elems.len() as u32)
                    }
                    inkwell::types::BasicTypeEnum::PointerType(t) => {
                        t.array_type(elems.len() as u32)
                    }
                    inkwell::types::BasicTypeEnum::StructType(t) => {
                        t.array_type(elems.len() as u32)
                    }
                    inkwell::types::BasicTypeEnum::ArrayType(t) => {
                        t.array_type(elems.len() as u32)
                    }
                    other => return Err(format!("unsupported array element: {:?}", other)),
                };

                // Stack-allocated backing store; it lives for the enclosing
                // function.
                let backing = self
                    .builder
                    .build_alloca(backing_ty, "array.backing")
                    .map_err(|e| format!("failed to alloca array: {}", e))?;
                let i64_ty = self.context.i64_type();
                for (i, elem) in elems.iter().enumerate() {
                    let value = self.compile_value(elem)?;
                    let slot = unsafe {
                        self.builder.build_in_bounds_gep(
                            backing_ty,
                            backing,
                            &[i64_ty.const_zero(), i64_ty.const_int(i as u64, false)],
                            "array.slot",
                        )
                    }
                    .map_err(|e| format!("failed to index array: {}", e))?;
                    self.builder
                        .build_store(slot, value)
                        .map_err(|e| format!("failed to store element: {}", e))?;
                }

                let mut agg = self.slice_struct().get_undef().into();
                agg = self.insert_field(agg, backing.into(), 0, "slice.ptr")?;
                let len = i64_ty.const_int(elems.len() as u64, false);
                agg = self.insert_field(agg, len.into(), 1, "slice.len")?;
                Ok(Some(agg.into_struct_value().into()))
            }

            ExprKind::DeclRef { def, name } => {
                let def = def.expect("unresolved reference");
                if let Some(slot) = self.locals.get(&def).copied() {
                    let ty = self.local_tys[&def];
                    let loaded = self
                        .builder
                        .build_load(self.llvm_type(ty)?, slot, name)
                        .map_err(|e| format!("failed to load `{}`: {}", name, e))?;
                    return Ok(Some(loaded));
                }
                // A function reference becomes a function pointer; generic
                // functions have no single address.
                let function = self
                    .functions
                    .get(name)
                    .copied()
                    .ok_or_else(|| {
                        format!("generic function `{}` cannot be used as a value", name)
                    })?;
                Ok(Some(function.as_global_value().as_pointer_value().into()))
            }

            ExprKind::FunCall { callee, args, .. } => self.compile_fun_call(callee, args),

            ExprKind::MethodCall {
                base,
                method,
                args,
                def,
            } => self.compile_method_call(e, base, method, args, *def),

            ExprKind::AssocCall {
                adt_def,
                method,
                args,
                def,
                ..
            } => self.compile_assoc_call(e, *adt_def, method, args, *def),

            ExprKind::Binary { op, lhs, rhs } => {
                if op.is_logical() {
                    return self.compile_logical(*op, lhs, rhs).map(Some);
                }
                let operand_ty = lhs.ty.expect("untyped operand");
                let lv = self.compile_value(lhs)?;
                let rv = self.compile_value(rhs)?;
                self.compile_binop_values(*op, operand_ty, lv, rv).map(Some)
            }

            ExprKind::Unary { op, operand } => match op {
                UnOp::Neg => {
                    let value = self.compile_value(operand)?;
                    match value {
                        BasicValueEnum::IntValue(v) => Ok(Some(
                            self.builder
                                .build_int_neg(v, "neg")
                                .map_err(|e| format!("failed to negate: {}", e))?
                                .into(),
                        )),
                        BasicValueEnum::FloatValue(v) => Ok(Some(
                            self.builder
                                .build_float_neg(v, "neg")
                                .map_err(|e| format!("failed to negate: {}", e))?
                                .into(),
                        )),
                        other => Err(format!("cannot negate {:?}", other)),
                    }
                }
                UnOp::Not => {
                    let value = self.compile_value(operand)?.into_int_value();
                    Ok(Some(
                        self.builder
                            .build_not(value, "not")
                            .map_err(|e| format!("failed to build not: {}", e))?
                            .into(),
                    ))
                }
                UnOp::Ref => {
                    let (ptr, _) = self.compile_lvalue(operand)?;
                    Ok(Some(ptr.into()))
                }
                UnOp::Deref => {
                    let ptr = self.compile_value(operand)?.into_pointer_value();
                    let pointee = e.ty.expect("untyped dereference");
                    let loaded = self
                        .builder
                        .build_load(self.llvm_type(pointee)?, ptr, "deref")
                        .map_err(|e| format!("failed to load: {}", e))?;
                    Ok(Some(loaded))
                }
            },

            ExprKind::AdtInit { fields, .. } => {
                self.compile_adt_init(e, fields).map(Some)
            }

            ExprKind::VariantInit {
                args,
                variant_index,
                ..
            } => self
                .compile_variant_init(e, args, variant_index.expect("unresolved variant"))
                .map(Some),

            ExprKind::FieldAccess { base, field, index } => {
                let index = index.expect("unresolved field access") as u32;
                let field_ty = e.ty.expect("untyped field access");
                let base_ty = base.ty.expect("untyped receiver");
                if self.is_indirect(base_ty) {
                    let ptr = self.compile_value(base)?.into_pointer_value();
                    let inner = self.deref_ty(base_ty);
                    let st = self.llvm_struct(inner)?;
                    let slot = self
                        .builder
                        .build_struct_gep(st, ptr, index, field)
                        .map_err(|e| format!("failed to access `{}`: {}", field, e))?;
                    let loaded = self
                        .builder
                        .build_load(self.llvm_type(field_ty)?, slot, field)
                        .map_err(|e| format!("failed to load `{}`: {}", field, e))?;
                    Ok(Some(loaded))
                } else {
                    let value = self.compile_value(base)?.into_struct_value();
                    let extracted = self
                        .builder
                        .build_extract_value(value, index, field)
                        .map_err(|e| format!("failed to access `{}`: {}", field, e))?;
                    Ok(Some(extracted))
                }
            }

            ExprKind::TupleIndex { base, index } => {
                let base_ty = base.ty.expect("untyped tuple index");
                if self.is_indirect(base_ty) {
                    let ptr = self.compile_value(base)?.into_pointer_value();
                    let st = self.llvm_struct(self.deref_ty(base_ty))?;
                    let slot = self
                        .builder
                        .build_struct_gep(st, ptr, *index as u32, "tuple.slot")
                        .map_err(|e| format!("failed to index tuple: {}", e))?;
                    let elem_ty = e.ty.expect("untyped tuple index");
                    let loaded = self
                        .builder
                        .build_load(self.llvm_type(elem_ty)?, slot, "tuple.get")
                        .map_err(|e| format!("failed to load element: {}", e))?;
                    return Ok(Some(loaded));
                }
                let value = self.compile_value(base)?.into_struct_value();
                let extracted = self
                    .builder
                    .build_extract_value(value, *index as u32, "tuple.get")
                    .map_err(|e| format!("failed to index tuple: {}", e))?;
                Ok(Some(extracted))
            }

            ExprKind::ArrayIndex { base, index } => {
                let elem_ty = e.ty.expect("untyped array index");
                let slot = self.array_element_ptr(base, index, elem_ty)?;
                let loaded = self
                    .builder
                    .build_load(self.llvm_type(elem_ty)?, slot, "elem")
                    .map_err(|e| format!("failed to load element: {}", e))?;
                Ok(Some(loaded))
            }

            ExprKind::Match { scrutinee, arms } => self.compile_match(e, scrutinee, arms),

            ExprKind::Builtin { builtin, args } => self.compile_builtin(*builtin, args),
        }
    }

    /// Compile an expression that must produce a value.
    pub(crate) fn compile_value(&mut self, e: &Expr) -> Result<BasicValueEnum<'ctx>, String> {
        self.compile_expr(e)?
            .ok_or_else(|| "expression produces no value".to_string())
    }

    fn is_indirect(&self, ty: TyId) -> bool {
        matches!(
            self.sess.types.kind(ty),
            TyKind::Ptr(_) | TyKind::Ref(_)
        )
    }

    pub(crate) fn insert_field(
        &self,
        agg: inkwell::values::AggregateValueEnum<'ctx>,
        value: BasicValueEnum<'ctx>,
        index: u32,
        name: &str,
    ) -> Result<inkwell::values::AggregateValueEnum<'ctx>, String> {
        self.builder
            .build_insert_value(agg, value, index, name)
            .map_err(|e| format!("failed to build {}: {}", name, e))
    }

    // ------------------------------------------------------------------
    // l-values
    // ------------------------------------------------------------------

    /// Address of a storage location: DeclRef, FieldAccess, TupleIndex,
    /// ArrayIndex, and explicit dereferences qualify.
    pub(crate) fn compile_lvalue(
        &mut self,
        e: &Expr,
    ) -> Result<(PointerValue<'ctx>, TyId), String> {
        match &e.kind {
            ExprKind::DeclRef { def, name } => {
                let def = def.expect("unresolved reference");
                let slot = self
                    .locals
                    .get(&def)
                    .copied()
                    .ok_or_else(|| format!("`{}` is not assignable", name))?;
                Ok((slot, self.local_tys[&def]))
            }
            ExprKind::FieldAccess { base, field, index } => {
                let index = index.expect("unresolved field access") as u32;
                let base_ty = base.ty.expect("untyped receiver");
                let (ptr, struct_ty) = if self.is_indirect(base_ty) {
                    let ptr = self.compile_value(base)?.into_pointer_value();
                    (ptr, self.deref_ty(base_ty))
                } else {
                    let (ptr, ty) = self.compile_lvalue(base)?;
                    (ptr, ty)
                };
                let st = self.llvm_struct(struct_ty)?;
                let slot = self
                    .builder
                    .build_struct_gep(st, ptr, index, field)
                    .map_err(|e| format!("failed to access `{}`: {}", field, e))?;
                Ok((slot, e.ty.expect("untyped field access")))
            }
            ExprKind::TupleIndex { base, index } => {
                let (ptr, base_ty) = self.compile_lvalue(base)?;
                let st = self.llvm_struct(base_ty)?;
                let slot = self
                    .builder
                    .build_struct_gep(st, ptr, *index as u32, "tuple.slot")
                    .map_err(|e| format!("failed to index tuple: {}", e))?;
                Ok((slot, e.ty.expect("untyped tuple index")))
            }
            ExprKind::ArrayIndex { base, index } => {
                let elem_ty = e.ty.expect("untyped array index");
                let slot = self.array_element_ptr(base, index, elem_ty)?;
                Ok((slot, elem_ty))
            }
            ExprKind::Unary {
                op: UnOp::Deref,
                operand,
            } => {
                let ptr = self.compile_value(operand)?.into_pointer_value();
                Ok((ptr, e.ty.expect("untyped dereference")))
            }
            _ => Err("expression is not assignable".to_string()),
        }
    }

    fn array_element_ptr(
        &mut self,
        base: &Expr,
        index: &Expr,
        elem_ty: TyId,
    ) -> Result<PointerValue<'ctx>, String> {
        let slice = self.compile_value(base)?.into_struct_value();
        let data = self
            .builder
            .build_extract_value(slice, 0, "slice.ptr")
            .map_err(|e| format!("failed to read slice: {}", e))?
            .into_pointer_value();

        let index_ty = index.ty.expect("untyped index");
        let signed = matches!(
            self.sess.types.kind(index_ty),
            TyKind::Builtin(b) if b.is_signed()
        );
        let idx = self.compile_value(index)?.into_int_value();
        let idx = self.int_resize(idx, self.context.i64_type(), signed)?;

        let elem_llvm = self.llvm_type(elem_ty)?;
        unsafe {
            self.builder
                .build_in_bounds_gep(elem_llvm, data, &[idx], "elem.ptr")
        }
        .map_err(|e| format!("failed to index: {}", e))
    }

    // ------------------------------------------------------------------
    // Calls
    // ------------------------------------------------------------------

    fn compile_fun_call(
        &mut self,
        callee: &Expr,
        args: &[Expr],
    ) -> Result<Option<BasicValueEnum<'ctx>>, String> {
        let mut compiled: Vec<BasicMetadataValueEnum> = Vec::with_capacity(args.len());
        for arg in args {
            compiled.push(self.compile_value(arg)?.into());
        }

        if let ExprKind::DeclRef { def: Some(def), name } = &callee.kind {
            if let crate::defs::DefKind::Fun { type_params } = self.sess.defs.kind(*def) {
                let mangled = if *type_params == 0 {
                    name.clone()
                } else {
                    let type_args = self.fn_type_args(*def, callee)?;
                    self.mangle(name, &type_args)
                };
                let function = self
                    .functions
                    .get(&mangled)
                    .copied()
                    .ok_or_else(|| format!("function `{}` was never declared", mangled))?;
                let call = self
                    .builder
                    .build_call(function, &compiled, "call")
                    .map_err(|e| format!("failed to call `{}`: {}", mangled, e))?;
                return Ok(call.try_as_basic_value().left());
            }
        }

        // Indirect call through a function pointer.
        let TyKind::Fun { params, ret } =
            self.sess.types.kind(callee.ty.expect("untyped callee"))
        else {
            return Err("call target is not a function".to_string());
        };
        let mut param_types: Vec<inkwell::types::BasicMetadataTypeEnum> =
            Vec::with_capacity(params.len());
        for p in &params {
            param_types.push(self.llvm_type(*p)?.into());
        }
        let fn_type = if self.sess.types.is_builtin(ret, BuiltinTy::Null) {
            self.context.void_type().fn_type(&param_types, false)
        } else {
            use inkwell::types::BasicType;
            self.llvm_type(ret)?.fn_type(&param_types, false)
        };
        let ptr = self.compile_value(callee)?.into_pointer_value();
        let call = self
            .builder
            .build_indirect_call(fn_type, ptr, &compiled, "call")
            .map_err(|e| format!("failed to build call: {}", e))?;
        Ok(call.try_as_basic_value().left())
    }

    fn compile_method_call(
        &mut self,
        call: &Expr,
        base: &Expr,
        method: &str,
        args: &[Expr],
        def: Option<phi_ast::DefId>,
    ) -> Result<Option<BasicValueEnum<'ctx>>, String> {
        let mdef = def.expect("unresolved method call");
        let base_ty = base.ty.expect("untyped receiver");
        let receiver_ty = self.deref_ty(base_ty);
        let (parent, parent_args) = self
            .adt_parts(receiver_ty)
            .ok_or_else(|| format!("method `{}` on a non-ADT receiver", method))?;

        let own_args = self.method_own_args(mdef, call, args)?;
        let parent_mangled = self.mangle_adt(parent, &parent_args);
        let mangled = self.mangle(&format!("{}_{}", parent_mangled, method), &own_args);
        let function = self
            .functions
            .get(&mangled)
            .copied()
            .ok_or_else(|| format!("method `{}` was never declared", mangled))?;

        let self_kind = {
            let info = self.decls.methods.get(&mdef).expect("unknown method");
            info.decl.self_kind.expect("instance method without self")
        };

        // The declared receiver kind decides pass-by-value vs
        // pass-by-address; a value receiver behind a pointer is loaded, and
        // an address-taking receiver of a temporary gets a stack slot.
        let self_arg: BasicMetadataValueEnum = match self_kind {
            phi_ast::SelfKind::Ref => {
                if self.is_indirect(base_ty) {
                    self.compile_value(base)?.into_pointer_value().into()
                } else {
                    self.base_address(base, receiver_ty)?.into()
                }
            }
            phi_ast::SelfKind::Value => {
                if self.is_indirect(base_ty) {
                    let ptr = self.compile_value(base)?.into_pointer_value();
                    self.builder
                        .build_load(self.llvm_type(receiver_ty)?, ptr, "self.load")
                        .map_err(|e| format!("failed to load receiver: {}", e))?
                        .into()
                } else {
                    self.compile_value(base)?.into()
                }
            }
        };

        let mut compiled: Vec<BasicMetadataValueEnum> = Vec::with_capacity(args.len() + 1);
        compiled.push(self_arg);
        for arg in args {
            compiled.push(self.compile_value(arg)?.into());
        }

        let result = self
            .builder
            .build_call(function, &compiled, "call")
            .map_err(|e| format!("failed to call `{}`: {}", mangled, e))?;
        Ok(result.try_as_basic_value().left())
    }

    /// Address of a receiver: its storage slot when it has one, otherwise a
    /// temporary stack slot holding the computed value.
    fn base_address(
        &mut self,
        base: &Expr,
        receiver_ty: TyId,
    ) -> Result<PointerValue<'ctx>, String> {
        let addressable = matches!(
            &base.kind,
            ExprKind::DeclRef { .. }
                | ExprKind::FieldAccess { .. }
                | ExprKind::TupleIndex { .. }
                | ExprKind::ArrayIndex { .. }
                | ExprKind::Unary {
                    op: UnOp::Deref,
                    ..
                }
        );
        if addressable {
            if let Ok((ptr, _)) = self.compile_lvalue(base) {
                return Ok(ptr);
            }
        }
        let value = self.compile_value(base)?;
        let slot = self
            .builder
            .build_alloca(self.llvm_type(receiver_ty)?, "self.tmp")
            .map_err(|e| format!("failed to alloca receiver: {}", e))?;
        self.builder
            .build_store(slot, value)
            .map_err(|e| format!("failed to store receiver: {}", e))?;
        Ok(slot)
    }

    fn compile_assoc_call(
        &mut self,
        call: &Expr,
        adt_def: Option<phi_ast::DefId>,
        method: &str,
        args: &[Expr],
        def: Option<phi_ast::DefId>,
    ) -> Result<Option<BasicValueEnum<'ctx>>, String> {
        let mdef = def.expect("unresolved static call");
        let parent = adt_def.expect("unresolved static call target");

        let (parent_args, own_args) = self.assoc_call_args(mdef, parent, call, args)?;
        let parent_mangled = self.mangle_adt(parent, &parent_args);
        let mangled = self.mangle(&format!("{}_{}", parent_mangled, method), &own_args);
        let function = self
            .functions
            .get(&mangled)
            .copied()
            .ok_or_else(|| format!("method `{}` was never declared", mangled))?;

        let mut compiled: Vec<BasicMetadataValueEnum> = Vec::with_capacity(args.len());
        for arg in args {
            compiled.push(self.compile_value(arg)?.into());
        }
        let result = self
            .builder
            .build_call(function, &compiled, "call")
            .map_err(|e| format!("failed to call `{}`: {}", mangled, e))?;
        Ok(result.try_as_basic_value().left())
    }

    // ------------------------------------------------------------------
    // Struct and enum construction
    // ------------------------------------------------------------------

    fn compile_adt_init(
        &mut self,
        e: &Expr,
        inits: &[phi_ast::FieldInit],
    ) -> Result<BasicValueEnum<'ctx>, String> {
        let ty = e.ty.expect("untyped struct literal");
        let (def, args) = self
            .adt_parts(ty)
            .ok_or_else(|| "struct literal without a struct type".to_string())?;
        let mangled = self.mangle_adt(def, &args);
        let super::MonoAdt::Struct { fields } = self.layouts[&mangled].clone() else {
            return Err(format!("`{}` is not a struct", mangled));
        };
        let st = self.struct_types[&mangled];

        let slot = self
            .builder
            .build_alloca(st, "struct.init")
            .map_err(|e| format!("failed to alloca struct: {}", e))?;

        for (index, field) in fields.iter().enumerate() {
            let value = match inits.iter().find(|i| i.index == Some(index)) {
                Some(init) => self.compile_value(&init.value)?,
                None => {
                    let default = field.default.as_ref().ok_or_else(|| {
                        format!("missing initializer for field `{}`", field.name)
                    })?;
                    self.compile_value(default)?
                }
            };
            let field_ptr = self
                .builder
                .build_struct_gep(st, slot, index as u32, &field.name)
                .map_err(|e| format!("failed to access `{}`: {}", field.name, e))?;
            self.builder
                .build_store(field_ptr, value)
                .map_err(|e| format!("failed to store `{}`: {}", field.name, e))?;
        }

        self.builder
            .build_load(st, slot, "struct.value")
            .map_err(|e| format!("failed to load struct: {}", e))
    }

    fn compile_variant_init(
        &mut self,
        e: &Expr,
        args: &[Expr],
        variant_index: usize,
    ) -> Result<BasicValueEnum<'ctx>, String> {
        let ty = e.ty.expect("untyped enum constructor");
        let (def, targs) = self
            .adt_parts(ty)
            .ok_or_else(|| "enum constructor without an enum type".to_string())?;
        let mangled = self.mangle_adt(def, &targs);
        let super::MonoAdt::Enum { variants, .. } = self.layouts[&mangled].clone() else {
            return Err(format!("`{}` is not an enum", mangled));
        };
        let st = self.struct_types[&mangled];
        let variant = &variants[variant_index];

        let slot = self
            .builder
            .build_alloca(st, "enum.init")
            .map_err(|e| format!("failed to alloca enum: {}", e))?;

        // Discriminants are dense zero-based integers in declaration order.
        let disc_ptr = self
            .builder
            .build_struct_gep(st, slot, 0, "enum.disc")
            .map_err(|e| format!("failed to access discriminant: {}", e))?;
        let disc = self.context.i32_type().const_int(variant_index as u64, false);
        self.builder
            .build_store(disc_ptr, disc)
            .map_err(|e| format!("failed to store discriminant: {}", e))?;

        if !variant.payload.is_empty() {
            let payload_ptr = self
                .builder
                .build_struct_gep(st, slot, 1, "enum.payload")
                .map_err(|e| format!("failed to access payload: {}", e))?;
            let payload_st = self.payload_struct(&variant.payload)?;
            for (i, arg) in args.iter().enumerate() {
                let value = self.compile_value(arg)?;
                let field_ptr = self
                    .builder
                    .build_struct_gep(payload_st, payload_ptr, i as u32, "payload.field")
                    .map_err(|e| format!("failed to access payload: {}", e))?;
                let store = self
                    .builder
                    .build_store(field_ptr, value)
                    .map_err(|e| format!("failed to store payload: {}", e))?;
                // The payload slot is an i8 array; byte alignment keeps the
                // store valid regardless of the payload's natural alignment.
                let _ = store.set_alignment(1);
            }
        }

        self.builder
            .build_load(st, slot, "enum.value")
            .map_err(|e| format!("failed to load enum: {}", e))
    }

    // ------------------------------------------------------------------
    // Operators
    // ------------------------------------------------------------------

    fn compile_logical(
        &mut self,
        op: BinOp,
        lhs: &Expr,
        rhs: &Expr,
    ) -> Result<BasicValueEnum<'ctx>, String> {
        let function = self.current_fn.ok_or("no current function")?;
        let lhs_val = self.compile_value(lhs)?.into_int_value();
        let lhs_end = self
            .builder
            .get_insert_block()
            .ok_or("builder is not positioned")?;

        let rhs_bb = self.context.append_basic_block(function, "logic.rhs");
        let merge_bb = self.context.append_basic_block(function, "logic.end");

        match op {
            // && only evaluates the right side when the left is true;
            // || only when it is false.
            BinOp::And => self
                .builder
                .build_conditional_branch(lhs_val, rhs_bb, merge_bb)
                .map_err(|e| format!("failed to build branch: {}", e))?,
            _ => self
                .builder
                .build_conditional_branch(lhs_val, merge_bb, rhs_bb)
                .map_err(|e| format!("failed to build branch: {}", e))?,
        };

        self.builder.position_at_end(rhs_bb);
        let rhs_val = self.compile_value(rhs)?.into_int_value();
        let rhs_end = self
            .builder
            .get_insert_block()
            .ok_or("builder is not positioned")?;
        self.builder
            .build_unconditional_branch(merge_bb)
            .map_err(|e| format!("failed to build branch: {}", e))?;

        self.builder.position_at_end(merge_bb);
        let phi = self
            .builder
            .build_phi(self.context.bool_type(), "logic.result")
            .map_err(|e| format!("failed to build phi: {}", e))?;
        phi.add_incoming(&[(&lhs_val, lhs_end), (&rhs_val, rhs_end)]);
        Ok(phi.as_basic_value())
    }

    /// Arithmetic, comparison, and bitwise operators over already-compiled
    /// operands. `operand_ty` is the operands' type (not the result's).
    pub(crate) fn compile_binop_values(
        &mut self,
        op: BinOp,
        operand_ty: TyId,
        lhs: BasicValueEnum<'ctx>,
        rhs: BasicValueEnum<'ctx>,
    ) -> Result<BasicValueEnum<'ctx>, String> {
        let kind = self.sess.types.kind(operand_ty);
        let is_float = matches!(kind, TyKind::Builtin(b) if b.is_float());
        let is_signed = matches!(kind, TyKind::Builtin(b) if b.is_signed());
        let is_string = matches!(kind, TyKind::Builtin(BuiltinTy::Str));

        if is_string && op.is_comparison() {
            return self.compile_string_compare(op, lhs, rhs);
        }

        if is_float {
            let l = lhs.into_float_value();
            let r = rhs.into_float_value();
            let b = &self.builder;
            let err = |e| format!("failed to build float op: {}", e);
            return Ok(match op {
                BinOp::Add => b.build_float_add(l, r, "fadd").map_err(err)?.into(),
                BinOp::Sub => b.build_float_sub(l, r, "fsub").map_err(err)?.into(),
                BinOp::Mul => b.build_float_mul(l, r, "fmul").map_err(err)?.into(),
                BinOp::Div => b.build_float_div(l, r, "fdiv").map_err(err)?.into(),
                BinOp::Rem => b.build_float_rem(l, r, "frem").map_err(err)?.into(),
                BinOp::Eq => b
                    .build_float_compare(FloatPredicate::OEQ, l, r, "fcmp")
                    .map_err(err)?
                    .into(),
                BinOp::Ne => b
                    .build_float_compare(FloatPredicate::ONE, l, r, "fcmp")
                    .map_err(err)?
                    .into(),
                BinOp::Lt => b
                    .build_float_compare(FloatPredicate::OLT, l, r, "fcmp")
                    .map_err(err)?
                    .into(),
                BinOp::Le => b
                    .build_float_compare(FloatPredicate::OLE, l, r, "fcmp")
                    .map_err(err)?
                    .into(),
                BinOp::Gt => b
                    .build_float_compare(FloatPredicate::OGT, l, r, "fcmp")
                    .map_err(err)?
                    .into(),
                BinOp::Ge => b
                    .build_float_compare(FloatPredicate::OGE, l, r, "fcmp")
                    .map_err(err)?
                    .into(),
                other => return Err(format!("`{}` is not a float operator", other.symbol())),
            });
        }

        let (BasicValueEnum::IntValue(l), BasicValueEnum::IntValue(r)) = (lhs, rhs) else {
            return Err(format!(
                "operator `{}` is not supported on `{}`",
                op.symbol(),
                self.ty_name(operand_ty)
            ));
        };
        let b = &self.builder;
        let err = |e| format!("failed to build int op: {}", e);
        Ok(match op {
            BinOp::Add => b.build_int_add(l, r, "add").map_err(err)?.into(),
            BinOp::Sub => b.build_int_sub(l, r, "sub").map_err(err)?.into(),
            BinOp::Mul => b.build_int_mul(l, r, "mul").map_err(err)?.into(),
            BinOp::Div if is_signed => {
                b.build_int_signed_div(l, r, "sdiv").map_err(err)?.into()
            }
            BinOp::Div => b.build_int_unsigned_div(l, r, "udiv").map_err(err)?.into(),
            BinOp::Rem if is_signed => {
                b.build_int_signed_rem(l, r, "srem").map_err(err)?.into()
            }
            BinOp::Rem => b.build_int_unsigned_rem(l, r, "urem").map_err(err)?.into(),
            BinOp::BitAnd => b.build_and(l, r, "and").map_err(err)?.into(),
            BinOp::BitOr => b.build_or(l, r, "or").map_err(err)?.into(),
            BinOp::BitXor => b.build_xor(l, r, "xor").map_err(err)?.into(),
            BinOp::Shl => b.build_left_shift(l, r, "shl").map_err(err)?.into(),
            BinOp::Shr => b
                .build_right_shift(l, r, is_signed, "shr")
                .map_err(err)?
                .into(),
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                let predicate = match (op, is_signed) {
                    (BinOp::Eq, _) => IntPredicate::EQ,
                    (BinOp::Ne, _) => IntPredicate::NE,
                    (BinOp::Lt, true) => IntPredicate::SLT,
                    (BinOp::Lt, false) => IntPredicate::ULT,
                    (BinOp::Le, true) => IntPredicate::SLE,
                    (BinOp::Le, false) => IntPredicate::ULE,
                    (BinOp::Gt, true) => IntPredicate::SGT,
                    (BinOp::Gt, false) => IntPredicate::UGT,
                    (BinOp::Ge, true) => IntPredicate::SGE,
                    _ => IntPredicate::UGE,
                };
                b.build_int_compare(predicate, l, r, "cmp").map_err(err)?.into()
            }
            other => return Err(format!("`{}` is not an integer operator", other.symbol())),
        })
    }

    fn compile_string_compare(
        &mut self,
        op: BinOp,
        lhs: BasicValueEnum<'ctx>,
        rhs: BasicValueEnum<'ctx>,
    ) -> Result<BasicValueEnum<'ctx>, String> {
        let strcmp = self.declare_strcmp();
        let call = self
            .builder
            .build_call(strcmp, &[lhs.into(), rhs.into()], "strcmp")
            .map_err(|e| format!("failed to call strcmp: {}", e))?;
        let cmp = call
            .try_as_basic_value()
            .left()
            .ok_or("strcmp returned void")?
            .into_int_value();
        let zero = self.context.i32_type().const_zero();
        let predicate = match op {
            BinOp::Eq => IntPredicate::EQ,
            BinOp::Ne => IntPredicate::NE,
            BinOp::Lt => IntPredicate::SLT,
            BinOp::Le => IntPredicate::SLE,
            BinOp::Gt => IntPredicate::SGT,
            BinOp::Ge => IntPredicate::SGE,
            other => return Err(format!("`{}` is not a string operator", other.symbol())),
        };
        Ok(self
            .builder
            .build_int_compare(predicate, cmp, zero, "strcmp.result")
            .map_err(|e| format!("failed to compare: {}", e))?
            .into())
    }
}
