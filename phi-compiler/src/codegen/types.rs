//! Type lowering, name mangling, and ADT monomorphization.

use std::collections::HashMap;

use inkwell::types::{BasicTypeEnum, StructType};

use phi_ast::{DefId, TyId, TyKind};

use super::{CodeGen, MonoAdt, MonoField, MonoVariant};
use crate::defs::AdtDecl;
use crate::lower::lower_type_expr;

impl<'ctx, 'a> CodeGen<'ctx, 'a> {
    pub(crate) fn ty_name(&self, ty: TyId) -> String {
        self.sess.display_ty(ty)
    }

    /// Mangle one symbol: `Base_Arg1_Arg2...` with every non-alphanumeric
    /// character of an argument's rendering replaced by `_`.
    pub(crate) fn mangle(&self, base: &str, args: &[TyId]) -> String {
        let mut out = base.to_string();
        for arg in args {
            out.push('_');
            out.push_str(&sanitize(&self.ty_name(*arg)));
        }
        out
    }

    pub(crate) fn mangle_adt(&self, def: DefId, args: &[TyId]) -> String {
        self.mangle(self.sess.defs.name(def), args)
    }

    /// Split an ADT type into its definition and argument list.
    pub(crate) fn adt_parts(&self, ty: TyId) -> Option<(DefId, Vec<TyId>)> {
        match self.sess.types.kind(ty) {
            TyKind::Adt(def) => Some((def, vec![])),
            TyKind::Applied { def, args } => Some((def, args)),
            _ => None,
        }
    }

    /// Strip pointers and references.
    pub(crate) fn deref_ty(&self, ty: TyId) -> TyId {
        let mut ty = ty;
        loop {
            match self.sess.types.kind(ty) {
                TyKind::Ptr(inner) | TyKind::Ref(inner) => ty = inner,
                _ => return ty,
            }
        }
    }

    pub(crate) fn ty_contains_generic(&self, ty: TyId) -> bool {
        match self.sess.types.kind(ty) {
            TyKind::Generic(_) => true,
            TyKind::Builtin(_) | TyKind::Adt(_) => false,
            TyKind::Range(inner)
            | TyKind::Array(inner)
            | TyKind::Ptr(inner)
            | TyKind::Ref(inner) => self.ty_contains_generic(inner),
            TyKind::Applied { args, .. } => {
                args.iter().any(|a| self.ty_contains_generic(*a))
            }
            TyKind::Tuple(elems) => elems.iter().any(|e| self.ty_contains_generic(*e)),
            TyKind::Fun { params, ret } => {
                params.iter().any(|p| self.ty_contains_generic(*p))
                    || self.ty_contains_generic(ret)
            }
        }
    }

    /// Rewrite type parameters to concrete types, re-interning the result.
    pub(crate) fn subst_ty(&self, ty: TyId, map: &HashMap<DefId, TyId>) -> TyId {
        if map.is_empty() {
            return ty;
        }
        let types = &self.sess.types;
        match types.kind(ty) {
            TyKind::Generic(def) => map.get(&def).copied().unwrap_or(ty),
            TyKind::Builtin(_) | TyKind::Adt(_) => ty,
            TyKind::Range(inner) => {
                let inner = self.subst_ty(inner, map);
                types.intern(TyKind::Range(inner))
            }
            TyKind::Array(inner) => {
                let inner = self.subst_ty(inner, map);
                types.intern(TyKind::Array(inner))
            }
            TyKind::Ptr(inner) => {
                let inner = self.subst_ty(inner, map);
                types.intern(TyKind::Ptr(inner))
            }
            TyKind::Ref(inner) => {
                let inner = self.subst_ty(inner, map);
                types.intern(TyKind::Ref(inner))
            }
            TyKind::Applied { def, args } => {
                let args = args.iter().map(|a| self.subst_ty(*a, map)).collect();
                types.intern(TyKind::Applied { def, args })
            }
            TyKind::Tuple(elems) => {
                let elems = elems.iter().map(|e| self.subst_ty(*e, map)).collect();
                types.intern(TyKind::Tuple(elems))
            }
            TyKind::Fun { params, ret } => {
                let params = params.iter().map(|p| self.subst_ty(*p, map)).collect();
                let ret = self.subst_ty(ret, map);
                types.intern(TyKind::Fun { params, ret })
            }
        }
    }

    // ------------------------------------------------------------------
    // ADT instantiation
    // ------------------------------------------------------------------

    /// Make sure the ADT instantiation exists: register its layout, create
    /// the named opaque LLVM struct (the body is set later so recursive
    /// types work), queue its concrete methods, and recurse into the field
    /// types. Idempotent per mangled name.
    pub(crate) fn ensure_adt(&mut self, def: DefId, args: &[TyId]) -> Result<String, String> {
        let mangled = self.mangle_adt(def, args);
        // Types and functions mangle in separate symbol spaces.
        let seen_key = format!("type:{}", mangled);
        if self.seen.contains(&seen_key) {
            return Ok(mangled);
        }
        self.seen.insert(seen_key);
        log::debug!("instantiating type {}", mangled);

        let opaque = self.context.opaque_struct_type(&mangled);
        self.struct_types.insert(mangled.clone(), opaque);
        self.adt_order.push(mangled.clone());

        let decl = self.decls.adt(def).clone();
        let map: HashMap<DefId, TyId> = decl
            .type_params()
            .iter()
            .zip(args.iter().copied())
            .map(|(tp, arg)| (tp.def.expect("unresolved type parameter"), arg))
            .collect();

        let layout = match &decl {
            AdtDecl::Struct(s) => {
                let mut fields = Vec::with_capacity(s.fields.len());
                for field in &s.fields {
                    let ty = lower_type_expr(&self.sess.types, &field.ty, &map);
                    self.scan_ty(ty)?;
                    let default = field
                        .default
                        .as_ref()
                        .map(|d| self.substitute_expr(d, &map));
                    fields.push(MonoField {
                        name: field.name.clone(),
                        ty,
                        default,
                    });
                }
                MonoAdt::Struct { fields }
            }
            AdtDecl::Enum(e) => {
                let mut variants = Vec::with_capacity(e.variants.len());
                for variant in &e.variants {
                    let mut payload = Vec::with_capacity(variant.payload.len());
                    for p in &variant.payload {
                        let ty = lower_type_expr(&self.sess.types, p, &map);
                        self.scan_ty(ty)?;
                        payload.push(ty);
                    }
                    variants.push(MonoVariant {
                        name: variant.name.clone(),
                        payload,
                    });
                }
                MonoAdt::Enum {
                    variants,
                    payload_size: 0,
                }
            }
        };
        self.layouts.insert(mangled.clone(), layout);

        // Methods without their own type parameters are instantiated with
        // their parent; method-level generics wait for a call site.
        for method in decl.methods() {
            if method.type_params.is_empty() {
                let mdef = method.def.expect("unresolved method");
                self.queue_method(mdef, def, args, &[])?;
            }
        }

        Ok(mangled)
    }

    /// Ensure every ADT instantiation mentioned inside a concrete type.
    pub(crate) fn scan_ty(&mut self, ty: TyId) -> Result<(), String> {
        match self.sess.types.kind(ty) {
            TyKind::Builtin(_) | TyKind::Generic(_) => Ok(()),
            TyKind::Adt(def) => {
                self.ensure_adt(def, &[])?;
                Ok(())
            }
            TyKind::Applied { def, args } => {
                // Instantiations with generic arguments belong to another
                // generic's body; they surface once that body is stamped out.
                if args.iter().any(|a| self.ty_contains_generic(*a)) {
                    return Ok(());
                }
                for arg in &args {
                    self.scan_ty(*arg)?;
                }
                self.ensure_adt(def, &args)?;
                Ok(())
            }
            TyKind::Range(inner)
            | TyKind::Array(inner)
            | TyKind::Ptr(inner)
            | TyKind::Ref(inner) => self.scan_ty(inner),
            TyKind::Tuple(elems) => {
                for elem in elems {
                    self.scan_ty(elem)?;
                }
                Ok(())
            }
            TyKind::Fun { params, ret } => {
                for p in params {
                    self.scan_ty(p)?;
                }
                self.scan_ty(ret)
            }
        }
    }

    /// Second visit: set the body of every opaque struct declared by
    /// `ensure_adt`, now that all instantiations are known.
    pub(crate) fn set_adt_bodies(&mut self) -> Result<(), String> {
        let order = self.adt_order.clone();

        // Enum payload slots are sized before any body is set.
        for name in &order {
            if let MonoAdt::Enum { variants, .. } = self.layouts[name].clone() {
                let mut max = 0u64;
                for variant in &variants {
                    let size = self.payload_layout(&variant.payload)?.0;
                    max = max.max(size);
                }
                if let Some(MonoAdt::Enum { payload_size, .. }) = self.layouts.get_mut(name) {
                    *payload_size = max;
                }
            }
        }

        for name in &order {
            let layout = self.layouts[name].clone();
            let st = self.struct_types[name];
            match layout {
                MonoAdt::Struct { fields } => {
                    let mut lltypes = Vec::with_capacity(fields.len());
                    for field in &fields {
                        lltypes.push(self.llvm_type(field.ty)?);
                    }
                    st.set_body(&lltypes, false);
                }
                MonoAdt::Enum { payload_size, .. } => {
                    let disc = self.context.i32_type();
                    let payload = self.context.i8_type().array_type(payload_size as u32);
                    st.set_body(&[disc.into(), payload.into()], false);
                }
            }
        }

        // Reject by-value type recursion: sizing every ADT walks the graph
        // with a cycle guard.
        for name in &order {
            self.sized_layout(name)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // AST type -> LLVM type
    // ------------------------------------------------------------------

    pub(crate) fn range_struct(&self) -> StructType<'ctx> {
        let i64t = self.context.i64_type();
        self.context.struct_type(&[i64t.into(), i64t.into()], false)
    }

    pub(crate) fn slice_struct(&self) -> StructType<'ctx> {
        let ptr = self.context.ptr_type(inkwell::AddressSpace::default());
        let i64t = self.context.i64_type();
        self.context.struct_type(&[ptr.into(), i64t.into()], false)
    }

    /// The payload of a variant as an LLVM struct (single payloads are a
    /// one-field struct for a uniform access path).
    pub(crate) fn payload_struct(&self, payload: &[TyId]) -> Result<StructType<'ctx>, String> {
        let mut lltypes = Vec::with_capacity(payload.len());
        for ty in payload {
            lltypes.push(self.llvm_type(*ty)?);
        }
        Ok(self.context.struct_type(&lltypes, false))
    }

    pub(crate) fn llvm_type(&self, ty: TyId) -> Result<BasicTypeEnum<'ctx>, String> {
        use phi_ast::BuiltinTy;
        Ok(match self.sess.types.kind(ty) {
            TyKind::Builtin(b) => match b {
                BuiltinTy::I8 | BuiltinTy::U8 => self.context.i8_type().into(),
                BuiltinTy::I16 | BuiltinTy::U16 => self.context.i16_type().into(),
                BuiltinTy::I32 | BuiltinTy::U32 => self.context.i32_type().into(),
                BuiltinTy::I64 | BuiltinTy::U64 => self.context.i64_type().into(),
                BuiltinTy::F32 => self.context.f32_type().into(),
                BuiltinTy::F64 => self.context.f64_type().into(),
                BuiltinTy::Bool => self.context.bool_type().into(),
                BuiltinTy::Char => self.context.i8_type().into(),
                BuiltinTy::Str => self
                    .context
                    .ptr_type(inkwell::AddressSpace::default())
                    .into(),
                BuiltinTy::Null => {
                    return Err("the null type has no value representation".to_string())
                }
            },
            TyKind::Range(_) => self.range_struct().into(),
            TyKind::Array(_) => self.slice_struct().into(),
            TyKind::Ptr(_) | TyKind::Ref(_) | TyKind::Fun { .. } => self
                .context
                .ptr_type(inkwell::AddressSpace::default())
                .into(),
            TyKind::Tuple(elems) => {
                let mut lltypes = Vec::with_capacity(elems.len());
                for elem in elems {
                    lltypes.push(self.llvm_type(elem)?);
                }
                self.context.struct_type(&lltypes, false).into()
            }
            TyKind::Adt(_) | TyKind::Applied { .. } => {
                let (def, args) = self.adt_parts(ty).expect("checked above");
                let mangled = self.mangle_adt(def, &args);
                self.struct_types
                    .get(&mangled)
                    .copied()
                    .ok_or_else(|| format!("type `{}` was never instantiated", mangled))?
                    .into()
            }
            TyKind::Generic(def) => {
                panic!(
                    "unsubstituted type parameter `{}` reached emission",
                    self.sess.defs.name(def)
                )
            }
        })
    }

    pub(crate) fn llvm_struct(&self, ty: TyId) -> Result<StructType<'ctx>, String> {
        match self.llvm_type(ty)? {
            BasicTypeEnum::StructType(st) => Ok(st),
            other => Err(format!("expected an aggregate type, found `{:?}`", other)),
        }
    }

    /// Is the lowered type an enum?
    pub(crate) fn is_enum_ty(&self, ty: TyId) -> bool {
        self.adt_parts(ty)
            .map(|(def, _)| self.decls.adt(def).as_enum().is_some())
            .unwrap_or(false)
    }
}

pub(crate) fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::sanitize;

    #[test]
    fn sanitize_replaces_punctuation() {
        assert_eq!(sanitize("List<i32>"), "List_i32_");
        assert_eq!(sanitize("*Node"), "_Node");
        assert_eq!(sanitize("plain"), "plain");
    }
}
