//! Type environment, polytypes, generalization, and instantiation.

use std::collections::{HashMap, HashSet};

use phi_ast::DefId;

use super::monotype::{Monotype, TypeVar, VarFactory};
use super::subst::Substitution;

/// A type scheme: `∀ vars. ty`. Locals are monomorphic (empty quantifier);
/// functions and methods quantify the variables standing for their declared
/// type parameters.
#[derive(Debug, Clone)]
pub struct Polytype {
    pub vars: Vec<TypeVar>,
    pub ty: Monotype,
}

impl Polytype {
    pub fn mono(ty: Monotype) -> Self {
        Self { vars: vec![], ty }
    }

    /// Replace every quantified variable with a fresh one. The fresh vars
    /// keep the quantified var's domain and constraint set.
    pub fn instantiate(&self, factory: &mut VarFactory) -> Monotype {
        if self.vars.is_empty() {
            return self.ty.clone();
        }
        let mut s = Substitution::new();
        for v in &self.vars {
            s.bind(v.id, Monotype::Var(factory.fresh_like(v)));
        }
        s.apply(&self.ty)
    }

    /// Instantiate with explicitly chosen types, positionally.
    pub fn instantiate_with(&self, args: &[Monotype]) -> Option<Monotype> {
        if args.len() != self.vars.len() {
            return None;
        }
        let mut s = Substitution::new();
        for (v, arg) in self.vars.iter().zip(args) {
            s.bind(v.id, arg.clone());
        }
        Some(s.apply(&self.ty))
    }
}

/// Γ: what each value definition is known to be.
#[derive(Debug, Default)]
pub struct TypeEnv {
    bindings: HashMap<DefId, Polytype>,
}

impl TypeEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, def: DefId, scheme: Polytype) {
        self.bindings.insert(def, scheme);
    }

    pub fn insert_mono(&mut self, def: DefId, ty: Monotype) {
        self.insert(def, Polytype::mono(ty));
    }

    pub fn get(&self, def: DefId) -> Option<&Polytype> {
        self.bindings.get(&def)
    }

    /// Free variables of the whole environment (quantified vars excluded).
    pub fn free_vars(&self) -> HashSet<u32> {
        let mut acc = HashSet::new();
        for scheme in self.bindings.values() {
            let mut vars = HashSet::new();
            scheme.ty.free_vars(&mut vars);
            for q in &scheme.vars {
                vars.remove(&q.id);
            }
            acc.extend(vars);
        }
        acc
    }

    /// Generalize: quantify the variables free in `ty` but not in Γ.
    pub fn generalize(&self, ty: &Monotype, prototypes: &HashMap<u32, TypeVar>) -> Polytype {
        let env_vars = self.free_vars();
        let mut ty_vars = HashSet::new();
        ty.free_vars(&mut ty_vars);

        let mut vars: Vec<TypeVar> = ty_vars
            .difference(&env_vars)
            .map(|id| {
                prototypes.get(id).cloned().unwrap_or(TypeVar {
                    id: *id,
                    domain: super::monotype::Domain::Any,
                    constraints: None,
                })
            })
            .collect();
        vars.sort_by_key(|v| v.id);

        Polytype {
            vars,
            ty: ty.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infer::monotype::Domain;
    use phi_ast::BuiltinTy;
    use std::collections::BTreeSet;

    #[test]
    fn instantiation_produces_fresh_vars_with_same_domain() {
        let mut factory = VarFactory::new();
        let mut q = factory.fresh(Domain::Int);
        q.constraints = Some(BTreeSet::from(["i32".to_string()]));

        let scheme = Polytype {
            vars: vec![q.clone()],
            ty: Monotype::Fun {
                params: vec![Monotype::Var(q.clone())],
                ret: Box::new(Monotype::Var(q.clone())),
            },
        };

        let inst = scheme.instantiate(&mut factory);
        match inst {
            Monotype::Fun { params, ret } => {
                let p = match &params[0] {
                    Monotype::Var(v) => v.clone(),
                    other => panic!("expected var, got {:?}", other),
                };
                let r = match *ret {
                    Monotype::Var(v) => v,
                    other => panic!("expected var, got {:?}", other),
                };
                // Fresh identity, same shape within the instantiation.
                assert_ne!(p.id, q.id);
                assert_eq!(p.id, r.id);
                // Domain and constraints survive instantiation.
                assert_eq!(p.domain, Domain::Int);
                assert_eq!(p.constraints, q.constraints);
            }
            other => panic!("expected fun, got {:?}", other),
        }
    }

    #[test]
    fn generalize_skips_env_vars() {
        let mut factory = VarFactory::new();
        let bound = factory.fresh(Domain::Any);
        let free = factory.fresh(Domain::Any);

        let mut env = TypeEnv::new();
        env.insert_mono(DefId(0), Monotype::Var(bound.clone()));

        let ty = Monotype::Tuple(vec![
            Monotype::Var(bound.clone()),
            Monotype::Var(free.clone()),
        ]);
        let prototypes = HashMap::from([(bound.id, bound.clone()), (free.id, free.clone())]);
        let scheme = env.generalize(&ty, &prototypes);

        assert_eq!(scheme.vars.len(), 1);
        assert_eq!(scheme.vars[0].id, free.id);
    }

    #[test]
    fn mono_schemes_instantiate_to_themselves() {
        let mut factory = VarFactory::new();
        let scheme = Polytype::mono(Monotype::Builtin(BuiltinTy::Bool));
        assert_eq!(
            scheme.instantiate(&mut factory),
            Monotype::Builtin(BuiltinTy::Bool)
        );
    }
}
