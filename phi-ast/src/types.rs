//! The interned type arena.
//!
//! Structurally identical types receive the same `TyId`, so type equality
//! downstream is `TyId` equality and `TyId` is the map key used everywhere.
//! Unification variables never enter the arena; the inference engine keeps
//! its own mirror of these constructors plus `Var`.

use std::sync::RwLock;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::DefId;

/// Handle to an interned type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TyId(pub u32);

/// Primitive types of the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuiltinTy {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Bool,
    Char,
    Str,
    /// The empty type of value-less expressions and void returns.
    Null,
}

impl BuiltinTy {
    pub fn name(self) -> &'static str {
        match self {
            BuiltinTy::I8 => "i8",
            BuiltinTy::I16 => "i16",
            BuiltinTy::I32 => "i32",
            BuiltinTy::I64 => "i64",
            BuiltinTy::U8 => "u8",
            BuiltinTy::U16 => "u16",
            BuiltinTy::U32 => "u32",
            BuiltinTy::U64 => "u64",
            BuiltinTy::F32 => "f32",
            BuiltinTy::F64 => "f64",
            BuiltinTy::Bool => "bool",
            BuiltinTy::Char => "char",
            BuiltinTy::Str => "string",
            BuiltinTy::Null => "null",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "i8" => BuiltinTy::I8,
            "i16" => BuiltinTy::I16,
            "i32" => BuiltinTy::I32,
            "i64" => BuiltinTy::I64,
            "u8" => BuiltinTy::U8,
            "u16" => BuiltinTy::U16,
            "u32" => BuiltinTy::U32,
            "u64" => BuiltinTy::U64,
            "f32" => BuiltinTy::F32,
            "f64" => BuiltinTy::F64,
            "bool" => BuiltinTy::Bool,
            "char" => BuiltinTy::Char,
            "string" => BuiltinTy::Str,
            "null" => BuiltinTy::Null,
            _ => return None,
        })
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            BuiltinTy::I8
                | BuiltinTy::I16
                | BuiltinTy::I32
                | BuiltinTy::I64
                | BuiltinTy::U8
                | BuiltinTy::U16
                | BuiltinTy::U32
                | BuiltinTy::U64
        )
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            BuiltinTy::I8 | BuiltinTy::I16 | BuiltinTy::I32 | BuiltinTy::I64
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, BuiltinTy::F32 | BuiltinTy::F64)
    }

    /// Width in bits for integer and float types.
    pub fn bit_width(self) -> u32 {
        match self {
            BuiltinTy::I8 | BuiltinTy::U8 => 8,
            BuiltinTy::I16 | BuiltinTy::U16 => 16,
            BuiltinTy::I32 | BuiltinTy::U32 | BuiltinTy::F32 => 32,
            BuiltinTy::I64 | BuiltinTy::U64 | BuiltinTy::F64 => 64,
            BuiltinTy::Bool => 1,
            BuiltinTy::Char => 8,
            BuiltinTy::Str | BuiltinTy::Null => 0,
        }
    }
}

/// One interned type constructor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TyKind {
    Builtin(BuiltinTy),
    /// `range<elem>`; elem is an integer type.
    Range(TyId),
    /// A non-generic struct or enum.
    Adt(DefId),
    /// A generic instantiation, e.g. `List<i32>`.
    Applied { def: DefId, args: Vec<TyId> },
    Tuple(Vec<TyId>),
    /// Runtime-length array, lowered as a `{ptr, i64}` slice.
    Array(TyId),
    Ptr(TyId),
    /// Like `Ptr` but auto-dereferenced in method dispatch and field access.
    Ref(TyId),
    Fun { params: Vec<TyId>, ret: TyId },
    /// A type parameter, rigid inside its declaring item.
    Generic(DefId),
}

/// Interner for types. Shared handles, lock-free lookups on the hot path.
pub struct TypeInterner {
    ids: DashMap<TyKind, TyId>,
    kinds: RwLock<Vec<TyKind>>,
}

impl Default for TypeInterner {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeInterner {
    pub fn new() -> Self {
        Self {
            ids: DashMap::new(),
            kinds: RwLock::new(Vec::new()),
        }
    }

    /// Intern a type, returning its stable id.
    pub fn intern(&self, kind: TyKind) -> TyId {
        if let Some(id) = self.ids.get(&kind) {
            return *id;
        }
        *self.ids.entry(kind.clone()).or_insert_with(|| {
            let mut kinds = self.kinds.write().unwrap_or_else(|e| e.into_inner());
            let id = TyId(kinds.len() as u32);
            kinds.push(kind);
            id
        })
    }

    pub fn builtin(&self, b: BuiltinTy) -> TyId {
        self.intern(TyKind::Builtin(b))
    }

    /// The `null` type of value-less expressions.
    pub fn null(&self) -> TyId {
        self.builtin(BuiltinTy::Null)
    }

    /// Look up the constructor behind an id.
    pub fn kind(&self, id: TyId) -> TyKind {
        let kinds = self.kinds.read().unwrap_or_else(|e| e.into_inner());
        kinds[id.0 as usize].clone()
    }

    pub fn len(&self) -> usize {
        self.kinds.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_builtin(&self, id: TyId, b: BuiltinTy) -> bool {
        matches!(self.kind(id), TyKind::Builtin(found) if found == b)
    }

    /// Render a type for diagnostics and mangling. ADT names are supplied by
    /// the caller since declaration names live outside the arena.
    pub fn display(&self, id: TyId, names: &dyn Fn(DefId) -> String) -> String {
        match self.kind(id) {
            TyKind::Builtin(b) => b.name().to_string(),
            TyKind::Range(elem) => format!("range<{}>", self.display(elem, names)),
            TyKind::Adt(def) | TyKind::Generic(def) => names(def),
            TyKind::Applied { def, args } => {
                let args: Vec<String> =
                    args.iter().map(|a| self.display(*a, names)).collect();
                format!("{}<{}>", names(def), args.join(", "))
            }
            TyKind::Tuple(elems) => {
                let elems: Vec<String> =
                    elems.iter().map(|e| self.display(*e, names)).collect();
                format!("({})", elems.join(", "))
            }
            TyKind::Array(elem) => format!("[{}]", self.display(elem, names)),
            TyKind::Ptr(inner) => format!("*{}", self.display(inner, names)),
            TyKind::Ref(inner) => format!("&{}", self.display(inner, names)),
            TyKind::Fun { params, ret } => {
                let params: Vec<String> =
                    params.iter().map(|p| self.display(*p, names)).collect();
                format!("fun({}) -> {}", params.join(", "), self.display(ret, names))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_structural() {
        let interner = TypeInterner::new();
        let a = interner.intern(TyKind::Builtin(BuiltinTy::I32));
        let b = interner.intern(TyKind::Builtin(BuiltinTy::I32));
        assert_eq!(a, b);

        let t1 = interner.intern(TyKind::Tuple(vec![a, b]));
        let t2 = interner.intern(TyKind::Tuple(vec![a, a]));
        assert_eq!(t1, t2);

        let p = interner.intern(TyKind::Ptr(a));
        assert_ne!(p, a);
        assert_eq!(interner.kind(p), TyKind::Ptr(a));
    }

    #[test]
    fn distinct_constructors_get_distinct_ids() {
        let interner = TypeInterner::new();
        let i32_ty = interner.builtin(BuiltinTy::I32);
        let i64_ty = interner.builtin(BuiltinTy::I64);
        assert_ne!(i32_ty, i64_ty);

        let adt = interner.intern(TyKind::Adt(DefId(7)));
        let applied = interner.intern(TyKind::Applied {
            def: DefId(7),
            args: vec![i32_ty],
        });
        assert_ne!(adt, applied);
    }

    #[test]
    fn display_renders_nested_types() {
        let interner = TypeInterner::new();
        let names = |def: DefId| format!("Adt{}", def.0);
        let i32_ty = interner.builtin(BuiltinTy::I32);
        let list = interner.intern(TyKind::Applied {
            def: DefId(3),
            args: vec![i32_ty],
        });
        let ptr = interner.intern(TyKind::Ptr(list));
        assert_eq!(interner.display(ptr, &names), "*Adt3<i32>");

        let fun = interner.intern(TyKind::Fun {
            params: vec![i32_ty],
            ret: interner.null(),
        });
        assert_eq!(interner.display(fun, &names), "fun(i32) -> null");
    }
}
