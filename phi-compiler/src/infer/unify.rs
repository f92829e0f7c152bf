//! Unification with occurs check, domains, and named constraint sets.

use thiserror::Error;

use super::monotype::{Monotype, TypeVar};
use super::subst::Substitution;
use phi_ast::DefId;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum UnifyError {
    #[error("cannot unify `{left}` with `{right}`")]
    Mismatch { left: String, right: String },

    #[error("cannot construct the infinite type: `{var}` occurs in `{ty}`")]
    Occurs { var: String, ty: String },

    #[error("type `{ty}` violates constraint {{{constraints}}}")]
    Constraint { ty: String, constraints: String },

    #[error("expected {expected} arguments, got {found}")]
    Arity { expected: usize, found: usize },
}

fn mismatch(a: &Monotype, b: &Monotype, names: &dyn Fn(DefId) -> String) -> UnifyError {
    UnifyError::Mismatch {
        left: a.display(names),
        right: b.display(names),
    }
}

fn bind_var(
    v: &TypeVar,
    t: &Monotype,
    names: &dyn Fn(DefId) -> String,
) -> Result<Substitution, UnifyError> {
    if let Monotype::Var(other) = t {
        if other.id == v.id {
            return Ok(Substitution::new());
        }
        // Var with var: the domains must intersect and the constraint sets
        // must stay satisfiable; the merged view is what the binding target
        // carries forward.
        let domain = v.domain.intersect(other.domain).ok_or_else(|| {
            mismatch(&Monotype::Var(v.clone()), t, names)
        })?;
        let constraints = match (&v.constraints, &other.constraints) {
            (Some(a), Some(b)) => {
                let common: std::collections::BTreeSet<String> =
                    a.intersection(b).cloned().collect();
                if common.is_empty() {
                    return Err(UnifyError::Constraint {
                        ty: t.display(names),
                        constraints: a.iter().cloned().collect::<Vec<_>>().join(", "),
                    });
                }
                Some(common)
            }
            (Some(a), None) => Some(a.clone()),
            (None, b) => b.clone(),
        };
        let merged = TypeVar {
            id: other.id,
            domain,
            constraints,
        };
        return Ok(Substitution::singleton(v.id, Monotype::Var(merged)));
    }

    if t.contains_var(v.id) {
        return Err(UnifyError::Occurs {
            var: Monotype::Var(v.clone()).display(names),
            ty: t.display(names),
        });
    }

    if !v.domain.admits(t) {
        return Err(mismatch(&Monotype::Var(v.clone()), t, names));
    }

    if let Some(constraints) = &v.constraints {
        let head = t.display(names);
        let admitted = match t {
            Monotype::Builtin(b) => constraints.contains(b.name()),
            Monotype::Adt(def) | Monotype::Applied { def, .. } => {
                constraints.contains(&names(*def))
            }
            _ => false,
        };
        if !admitted {
            return Err(UnifyError::Constraint {
                ty: head,
                constraints: constraints.iter().cloned().collect::<Vec<_>>().join(", "),
            });
        }
    }

    Ok(Substitution::singleton(v.id, t.clone()))
}

fn unify_all(
    left: &[Monotype],
    right: &[Monotype],
    names: &dyn Fn(DefId) -> String,
) -> Result<Substitution, UnifyError> {
    let mut s = Substitution::new();
    for (a, b) in left.iter().zip(right) {
        let step = unify(&s.apply(a), &s.apply(b), names)?;
        s.compose(step);
    }
    Ok(s)
}

/// Solve `a = b`. Returns the most general unifier or the first conflict.
pub fn unify(
    a: &Monotype,
    b: &Monotype,
    names: &dyn Fn(DefId) -> String,
) -> Result<Substitution, UnifyError> {
    match (a, b) {
        (Monotype::Var(v), _) => bind_var(v, b, names),
        (_, Monotype::Var(v)) => bind_var(v, a, names),

        (Monotype::Builtin(x), Monotype::Builtin(y)) if x == y => Ok(Substitution::new()),
        (Monotype::Adt(x), Monotype::Adt(y)) if x == y => Ok(Substitution::new()),
        (Monotype::Generic(x), Monotype::Generic(y)) if x == y => Ok(Substitution::new()),

        (Monotype::Range(x), Monotype::Range(y))
        | (Monotype::Array(x), Monotype::Array(y))
        | (Monotype::Ptr(x), Monotype::Ptr(y))
        | (Monotype::Ref(x), Monotype::Ref(y)) => unify(x, y, names),

        (
            Monotype::Applied { def: da, args: xs },
            Monotype::Applied { def: db, args: ys },
        ) if da == db && xs.len() == ys.len() => unify_all(xs, ys, names),

        (Monotype::Tuple(xs), Monotype::Tuple(ys)) if xs.len() == ys.len() => {
            unify_all(xs, ys, names)
        }

        (
            Monotype::Fun { params: pa, ret: ra },
            Monotype::Fun { params: pb, ret: rb },
        ) => {
            if pa.len() != pb.len() {
                return Err(UnifyError::Arity {
                    expected: pa.len(),
                    found: pb.len(),
                });
            }
            let mut s = unify_all(pa, pb, names)?;
            let step = unify(&s.apply(ra), &s.apply(rb), names)?;
            s.compose(step);
            Ok(s)
        }

        _ => Err(mismatch(a, b, names)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infer::monotype::{Domain, VarFactory};
    use phi_ast::BuiltinTy;
    use std::collections::BTreeSet;

    fn names(def: DefId) -> String {
        format!("Adt{}", def.0)
    }

    fn i32_t() -> Monotype {
        Monotype::Builtin(BuiltinTy::I32)
    }

    fn f64_t() -> Monotype {
        Monotype::Builtin(BuiltinTy::F64)
    }

    #[test]
    fn unifies_equal_constructors() {
        assert!(unify(&i32_t(), &i32_t(), &names).is_ok());
        assert!(matches!(
            unify(&i32_t(), &f64_t(), &names),
            Err(UnifyError::Mismatch { .. })
        ));
    }

    #[test]
    fn var_binds_and_respects_domain() {
        let mut vars = VarFactory::new();
        let v = Monotype::Var(vars.fresh(Domain::Int));

        let s = unify(&v, &i32_t(), &names).unwrap();
        assert_eq!(s.apply(&v), i32_t());

        let w = Monotype::Var(vars.fresh(Domain::Int));
        assert!(unify(&w, &f64_t(), &names).is_err());
    }

    #[test]
    fn var_var_intersects_domains() {
        let mut vars = VarFactory::new();
        let num = Monotype::Var(vars.fresh(Domain::Num));
        let flt = Monotype::Var(vars.fresh(Domain::Float));

        let s = unify(&num, &flt, &names).unwrap();
        match s.apply(&num) {
            Monotype::Var(v) => assert_eq!(v.domain, Domain::Float),
            other => panic!("expected a variable, got {:?}", other),
        }

        let int = Monotype::Var(vars.fresh(Domain::Int));
        let flt2 = Monotype::Var(vars.fresh(Domain::Float));
        assert!(unify(&int, &flt2, &names).is_err());
    }

    #[test]
    fn occurs_check_rejects_infinite_types() {
        let mut vars = VarFactory::new();
        let v = vars.fresh(Domain::Any);
        let inner = Monotype::Tuple(vec![Monotype::Var(v.clone()), i32_t()]);
        assert!(matches!(
            unify(&Monotype::Var(v), &inner, &names),
            Err(UnifyError::Occurs { .. })
        ));
    }

    #[test]
    fn unification_is_symmetric() {
        let mut vars = VarFactory::new();
        let v = Monotype::Var(vars.fresh(Domain::Any));
        let pair = Monotype::Tuple(vec![i32_t(), f64_t()]);

        let left = unify(&v, &pair, &names).unwrap();
        let right = unify(&pair, &v, &names).unwrap();
        assert_eq!(left.apply(&v), right.apply(&v));

        // Failure is symmetric too.
        assert!(unify(&i32_t(), &f64_t(), &names).is_err());
        assert!(unify(&f64_t(), &i32_t(), &names).is_err());
    }

    #[test]
    fn fun_arity_mismatch_is_reported() {
        let f1 = Monotype::Fun {
            params: vec![i32_t()],
            ret: Box::new(i32_t()),
        };
        let f2 = Monotype::Fun {
            params: vec![i32_t(), i32_t()],
            ret: Box::new(i32_t()),
        };
        assert!(matches!(
            unify(&f1, &f2, &names),
            Err(UnifyError::Arity {
                expected: 1,
                found: 2
            })
        ));
    }

    #[test]
    fn constraint_sets_gate_concrete_bindings() {
        let mut vars = VarFactory::new();
        let mut v = vars.fresh(Domain::Any);
        v.constraints = Some(BTreeSet::from(["i32".to_string(), "i64".to_string()]));

        assert!(unify(&Monotype::Var(v.clone()), &i32_t(), &names).is_ok());
        assert!(matches!(
            unify(&Monotype::Var(v), &f64_t(), &names),
            Err(UnifyError::Constraint { .. })
        ));
    }

    #[test]
    fn rigid_generics_only_unify_with_themselves() {
        let g0 = Monotype::Generic(DefId(0));
        let g1 = Monotype::Generic(DefId(1));
        assert!(unify(&g0, &g0, &names).is_ok());
        assert!(unify(&g0, &g1, &names).is_err());
        assert!(unify(&g0, &i32_t(), &names).is_err());
    }
}
