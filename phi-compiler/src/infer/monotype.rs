//! Monotypes: the inference engine's mirror of the type arena, extended with
//! unification variables.

use std::collections::{BTreeSet, HashSet};

use phi_ast::{BuiltinTy, DefId, TyId, TyKind, TypeInterner};

/// What a unification variable is allowed to become. Domains only ever
/// narrow: unifying two vars intersects them, and an empty intersection is a
/// failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Any,
    /// Integer or float; produced by arithmetic operators.
    Num,
    Int,
    Float,
    Adt,
}

impl Domain {
    pub fn intersect(self, other: Domain) -> Option<Domain> {
        use Domain::*;
        match (self, other) {
            (Any, d) | (d, Any) => Some(d),
            (Num, Int) | (Int, Num) => Some(Int),
            (Num, Float) | (Float, Num) => Some(Float),
            (a, b) if a == b => Some(a),
            _ => None,
        }
    }

    /// Does a concrete head constructor fall inside the domain?
    pub fn admits(self, t: &Monotype) -> bool {
        match self {
            Domain::Any => true,
            Domain::Num => matches!(t, Monotype::Builtin(b) if b.is_integer() || b.is_float()),
            Domain::Int => matches!(t, Monotype::Builtin(b) if b.is_integer()),
            Domain::Float => matches!(t, Monotype::Builtin(b) if b.is_float()),
            Domain::Adt => matches!(t, Monotype::Adt(_) | Monotype::Applied { .. }),
        }
    }
}

/// A unification variable. Identity is the id; the domain and the optional
/// named constraint set ride along every copy.
#[derive(Debug, Clone)]
pub struct TypeVar {
    pub id: u32,
    pub domain: Domain,
    pub constraints: Option<BTreeSet<String>>,
}

impl PartialEq for TypeVar {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeVar {}

impl std::hash::Hash for TypeVar {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Source of fresh variables for one inference run.
#[derive(Debug, Default)]
pub struct VarFactory {
    next: u32,
}

impl VarFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self, domain: Domain) -> TypeVar {
        let id = self.next;
        self.next += 1;
        TypeVar {
            id,
            domain,
            constraints: None,
        }
    }

    pub fn fresh_like(&mut self, proto: &TypeVar) -> TypeVar {
        let id = self.next;
        self.next += 1;
        TypeVar {
            id,
            domain: proto.domain,
            constraints: proto.constraints.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Monotype {
    Builtin(BuiltinTy),
    Range(Box<Monotype>),
    Adt(DefId),
    Applied { def: DefId, args: Vec<Monotype> },
    Tuple(Vec<Monotype>),
    Array(Box<Monotype>),
    Ptr(Box<Monotype>),
    Ref(Box<Monotype>),
    Fun { params: Vec<Monotype>, ret: Box<Monotype> },
    /// Rigid type parameter: only equal to itself.
    Generic(DefId),
    Var(TypeVar),
}

impl Monotype {
    pub fn null() -> Monotype {
        Monotype::Builtin(BuiltinTy::Null)
    }

    pub fn bool() -> Monotype {
        Monotype::Builtin(BuiltinTy::Bool)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Monotype::Builtin(BuiltinTy::Null))
    }

    /// Collect free variable ids.
    pub fn free_vars(&self, acc: &mut HashSet<u32>) {
        match self {
            Monotype::Var(v) => {
                acc.insert(v.id);
            }
            Monotype::Builtin(_) | Monotype::Adt(_) | Monotype::Generic(_) => {}
            Monotype::Range(inner)
            | Monotype::Array(inner)
            | Monotype::Ptr(inner)
            | Monotype::Ref(inner) => inner.free_vars(acc),
            Monotype::Applied { args, .. } => {
                for a in args {
                    a.free_vars(acc);
                }
            }
            Monotype::Tuple(elems) => {
                for e in elems {
                    e.free_vars(acc);
                }
            }
            Monotype::Fun { params, ret } => {
                for p in params {
                    p.free_vars(acc);
                }
                ret.free_vars(acc);
            }
        }
    }

    pub fn contains_var(&self, id: u32) -> bool {
        let mut acc = HashSet::new();
        self.free_vars(&mut acc);
        acc.contains(&id)
    }

    pub fn has_vars(&self) -> bool {
        let mut acc = HashSet::new();
        self.free_vars(&mut acc);
        !acc.is_empty()
    }

    /// Lift an interned type into the monotype world.
    pub fn from_ty(types: &TypeInterner, ty: TyId) -> Monotype {
        match types.kind(ty) {
            TyKind::Builtin(b) => Monotype::Builtin(b),
            TyKind::Range(elem) => Monotype::Range(Box::new(Self::from_ty(types, elem))),
            TyKind::Adt(def) => Monotype::Adt(def),
            TyKind::Applied { def, args } => Monotype::Applied {
                def,
                args: args.iter().map(|a| Self::from_ty(types, *a)).collect(),
            },
            TyKind::Tuple(elems) => {
                Monotype::Tuple(elems.iter().map(|e| Self::from_ty(types, *e)).collect())
            }
            TyKind::Array(elem) => Monotype::Array(Box::new(Self::from_ty(types, elem))),
            TyKind::Ptr(inner) => Monotype::Ptr(Box::new(Self::from_ty(types, inner))),
            TyKind::Ref(inner) => Monotype::Ref(Box::new(Self::from_ty(types, inner))),
            TyKind::Fun { params, ret } => Monotype::Fun {
                params: params.iter().map(|p| Self::from_ty(types, *p)).collect(),
                ret: Box::new(Self::from_ty(types, ret)),
            },
            TyKind::Generic(def) => Monotype::Generic(def),
        }
    }

    /// Intern a fully-solved monotype. `None` when a variable remains.
    pub fn to_ty(&self, types: &TypeInterner) -> Option<TyId> {
        Some(match self {
            Monotype::Var(_) => return None,
            Monotype::Builtin(b) => types.builtin(*b),
            Monotype::Range(inner) => {
                let inner = inner.to_ty(types)?;
                types.intern(TyKind::Range(inner))
            }
            Monotype::Adt(def) => types.intern(TyKind::Adt(*def)),
            Monotype::Applied { def, args } => {
                let args = args
                    .iter()
                    .map(|a| a.to_ty(types))
                    .collect::<Option<Vec<_>>>()?;
                types.intern(TyKind::Applied { def: *def, args })
            }
            Monotype::Tuple(elems) => {
                let elems = elems
                    .iter()
                    .map(|e| e.to_ty(types))
                    .collect::<Option<Vec<_>>>()?;
                types.intern(TyKind::Tuple(elems))
            }
            Monotype::Array(elem) => {
                let elem = elem.to_ty(types)?;
                types.intern(TyKind::Array(elem))
            }
            Monotype::Ptr(inner) => {
                let inner = inner.to_ty(types)?;
                types.intern(TyKind::Ptr(inner))
            }
            Monotype::Ref(inner) => {
                let inner = inner.to_ty(types)?;
                types.intern(TyKind::Ref(inner))
            }
            Monotype::Fun { params, ret } => {
                let params = params
                    .iter()
                    .map(|p| p.to_ty(types))
                    .collect::<Option<Vec<_>>>()?;
                let ret = ret.to_ty(types)?;
                types.intern(TyKind::Fun { params, ret })
            }
            Monotype::Generic(def) => types.intern(TyKind::Generic(*def)),
        })
    }

    /// Render for error messages; `names` supplies declaration names.
    pub fn display(&self, names: &dyn Fn(DefId) -> String) -> String {
        match self {
            Monotype::Builtin(b) => b.name().to_string(),
            Monotype::Range(inner) => format!("range<{}>", inner.display(names)),
            Monotype::Adt(def) | Monotype::Generic(def) => names(*def),
            Monotype::Applied { def, args } => {
                let args: Vec<String> = args.iter().map(|a| a.display(names)).collect();
                format!("{}<{}>", names(*def), args.join(", "))
            }
            Monotype::Tuple(elems) => {
                let elems: Vec<String> = elems.iter().map(|e| e.display(names)).collect();
                format!("({})", elems.join(", "))
            }
            Monotype::Array(elem) => format!("[{}]", elem.display(names)),
            Monotype::Ptr(inner) => format!("*{}", inner.display(names)),
            Monotype::Ref(inner) => format!("&{}", inner.display(names)),
            Monotype::Fun { params, ret } => {
                let params: Vec<String> = params.iter().map(|p| p.display(names)).collect();
                format!("fun({}) -> {}", params.join(", "), ret.display(names))
            }
            Monotype::Var(v) => match v.domain {
                Domain::Int => "{integer}".to_string(),
                Domain::Float => "{float}".to_string(),
                Domain::Num => "{number}".to_string(),
                _ => format!("?{}", v.id),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_intersection_narrows_monotonically() {
        assert_eq!(Domain::Any.intersect(Domain::Int), Some(Domain::Int));
        assert_eq!(Domain::Num.intersect(Domain::Float), Some(Domain::Float));
        assert_eq!(Domain::Int.intersect(Domain::Float), None);
        assert_eq!(Domain::Adt.intersect(Domain::Int), None);
        assert_eq!(Domain::Num.intersect(Domain::Num), Some(Domain::Num));
    }

    #[test]
    fn domain_admits_matching_heads() {
        assert!(Domain::Int.admits(&Monotype::Builtin(BuiltinTy::U16)));
        assert!(!Domain::Int.admits(&Monotype::Builtin(BuiltinTy::F32)));
        assert!(Domain::Float.admits(&Monotype::Builtin(BuiltinTy::F64)));
        assert!(Domain::Adt.admits(&Monotype::Adt(DefId(0))));
        assert!(!Domain::Adt.admits(&Monotype::Builtin(BuiltinTy::I32)));
    }

    #[test]
    fn round_trip_through_the_interner() {
        let types = TypeInterner::new();
        let i32_ty = types.builtin(BuiltinTy::I32);
        let fun = types.intern(TyKind::Fun {
            params: vec![i32_ty],
            ret: i32_ty,
        });
        let mono = Monotype::from_ty(&types, fun);
        assert_eq!(mono.to_ty(&types), Some(fun));
    }

    #[test]
    fn vars_block_interning() {
        let types = TypeInterner::new();
        let mut vars = VarFactory::new();
        let t = Monotype::Tuple(vec![
            Monotype::Builtin(BuiltinTy::Bool),
            Monotype::Var(vars.fresh(Domain::Any)),
        ]);
        assert_eq!(t.to_ty(&types), None);
        assert!(t.has_vars());
    }
}
