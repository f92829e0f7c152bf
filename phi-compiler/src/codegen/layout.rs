//! Deterministic size/alignment model of the lowered representation.
//!
//! Used to size enum payload slots and to reject by-value type recursion.
//! Mirrors the LLVM lowering: C-style struct layout, pointers are 8 bytes,
//! enums are `{i32, [N x i8]}`.

use phi_ast::{BuiltinTy, TyId, TyKind};

use super::{CodeGen, MonoAdt};

fn align_to(offset: u64, align: u64) -> u64 {
    debug_assert!(align > 0);
    offset.div_ceil(align) * align
}

/// C layout of a field list: (size, align).
fn struct_layout(fields: &[(u64, u64)]) -> (u64, u64) {
    let mut offset = 0;
    let mut align = 1;
    for (fsize, falign) in fields {
        offset = align_to(offset, *falign) + fsize;
        align = align.max(*falign);
    }
    (align_to(offset, align), align)
}

impl<'ctx, 'a> CodeGen<'ctx, 'a> {
    /// (size, align) of a variant payload laid out as a struct.
    pub(crate) fn payload_layout(&self, payload: &[TyId]) -> Result<(u64, u64), String> {
        let mut visiting = Vec::new();
        self.payload_layout_inner(payload, &mut visiting)
    }

    fn payload_layout_inner(
        &self,
        payload: &[TyId],
        visiting: &mut Vec<String>,
    ) -> Result<(u64, u64), String> {
        let mut fields = Vec::with_capacity(payload.len());
        for ty in payload {
            fields.push(self.size_align(*ty, visiting)?);
        }
        Ok(struct_layout(&fields))
    }

    /// Size an instantiated ADT by mangled name, rejecting cycles.
    pub(crate) fn sized_layout(&self, mangled: &str) -> Result<(u64, u64), String> {
        let mut visiting = Vec::new();
        self.adt_size_align(mangled, &mut visiting)
    }

    fn adt_size_align(
        &self,
        mangled: &str,
        visiting: &mut Vec<String>,
    ) -> Result<(u64, u64), String> {
        if visiting.iter().any(|v| v == mangled) {
            return Err(format!(
                "recursive type `{}` has infinite size; add a pointer indirection",
                mangled
            ));
        }
        visiting.push(mangled.to_string());

        let layout = self
            .layouts
            .get(mangled)
            .ok_or_else(|| format!("type `{}` was never instantiated", mangled))?;
        let result = match layout {
            MonoAdt::Struct { fields } => {
                let mut parts = Vec::with_capacity(fields.len());
                for field in fields {
                    parts.push(self.size_align(field.ty, visiting)?);
                }
                struct_layout(&parts)
            }
            MonoAdt::Enum { variants, .. } => {
                let mut max = 0;
                for variant in variants {
                    max = max.max(self.payload_layout_inner(&variant.payload, visiting)?.0);
                }
                // {i32 disc, [N x i8]} rounded to the discriminant's align.
                (align_to(4 + max, 4), 4)
            }
        };

        visiting.pop();
        Ok(result)
    }

    fn size_align(&self, ty: TyId, visiting: &mut Vec<String>) -> Result<(u64, u64), String> {
        Ok(match self.sess.types.kind(ty) {
            TyKind::Builtin(b) => match b {
                BuiltinTy::I8 | BuiltinTy::U8 | BuiltinTy::Bool | BuiltinTy::Char => (1, 1),
                BuiltinTy::I16 | BuiltinTy::U16 => (2, 2),
                BuiltinTy::I32 | BuiltinTy::U32 | BuiltinTy::F32 => (4, 4),
                BuiltinTy::I64 | BuiltinTy::U64 | BuiltinTy::F64 => (8, 8),
                BuiltinTy::Str => (8, 8),
                BuiltinTy::Null => (0, 1),
            },
            TyKind::Range(_) => (16, 8),
            TyKind::Array(_) => (16, 8),
            TyKind::Ptr(_) | TyKind::Ref(_) | TyKind::Fun { .. } => (8, 8),
            TyKind::Tuple(elems) => {
                let mut parts = Vec::with_capacity(elems.len());
                for elem in elems {
                    parts.push(self.size_align(elem, visiting)?);
                }
                struct_layout(&parts)
            }
            TyKind::Adt(_) | TyKind::Applied { .. } => {
                let (def, args) = self.adt_parts(ty).expect("checked above");
                let mangled = self.mangle_adt(def, &args);
                self.adt_size_align(&mangled, visiting)?
            }
            TyKind::Generic(def) => {
                panic!(
                    "unsubstituted type parameter `{}` reached layout",
                    self.sess.defs.name(def)
                )
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{align_to, struct_layout};

    #[test]
    fn struct_layout_pads_like_c() {
        // { i8, i64 } -> 16 bytes, align 8
        assert_eq!(struct_layout(&[(1, 1), (8, 8)]), (16, 8));
        // { i32 } -> 4 bytes
        assert_eq!(struct_layout(&[(4, 4)]), (4, 4));
        // empty struct
        assert_eq!(struct_layout(&[]), (0, 1));
    }

    #[test]
    fn align_to_rounds_up() {
        assert_eq!(align_to(5, 4), 8);
        assert_eq!(align_to(8, 4), 8);
        assert_eq!(align_to(0, 8), 0);
    }
}
