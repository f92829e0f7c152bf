//! Substitutions: finite maps from unification variables to monotypes.

use std::collections::HashMap;

use super::monotype::Monotype;

#[derive(Debug, Clone, Default)]
pub struct Substitution {
    map: HashMap<u32, Monotype>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singleton(var: u32, ty: Monotype) -> Self {
        let mut map = HashMap::new();
        map.insert(var, ty);
        Self { map }
    }

    pub fn bind(&mut self, var: u32, ty: Monotype) {
        self.map.insert(var, ty);
    }

    pub fn get(&self, var: u32) -> Option<&Monotype> {
        self.map.get(&var)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Apply the substitution. Images may themselves mention bound
    /// variables, so variable lookups recurse; the occurs check keeps the
    /// chain finite.
    pub fn apply(&self, t: &Monotype) -> Monotype {
        match t {
            Monotype::Var(v) => match self.map.get(&v.id) {
                Some(image) => self.apply(image),
                None => t.clone(),
            },
            Monotype::Builtin(_) | Monotype::Adt(_) | Monotype::Generic(_) => t.clone(),
            Monotype::Range(inner) => Monotype::Range(Box::new(self.apply(inner))),
            Monotype::Applied { def, args } => Monotype::Applied {
                def: *def,
                args: args.iter().map(|a| self.apply(a)).collect(),
            },
            Monotype::Tuple(elems) => {
                Monotype::Tuple(elems.iter().map(|e| self.apply(e)).collect())
            }
            Monotype::Array(elem) => Monotype::Array(Box::new(self.apply(elem))),
            Monotype::Ptr(inner) => Monotype::Ptr(Box::new(self.apply(inner))),
            Monotype::Ref(inner) => Monotype::Ref(Box::new(self.apply(inner))),
            Monotype::Fun { params, ret } => Monotype::Fun {
                params: params.iter().map(|p| self.apply(p)).collect(),
                ret: Box::new(self.apply(ret)),
            },
        }
    }

    /// Compose with a newer substitution: `newer ∘ self`. The newer map is
    /// applied to every image of `self`, then its own bindings are added,
    /// winning on conflicts.
    pub fn compose(&mut self, newer: Substitution) {
        for image in self.map.values_mut() {
            *image = newer.apply(image);
        }
        for (var, image) in newer.map {
            self.map.insert(var, image);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infer::monotype::{Domain, TypeVar, VarFactory};
    use phi_ast::BuiltinTy;

    fn var(v: &TypeVar) -> Monotype {
        Monotype::Var(v.clone())
    }

    #[test]
    fn apply_follows_chains() {
        let mut vars = VarFactory::new();
        let a = vars.fresh(Domain::Any);
        let b = vars.fresh(Domain::Any);

        let mut s = Substitution::new();
        s.bind(a.id, var(&b));
        s.bind(b.id, Monotype::Builtin(BuiltinTy::I32));

        assert_eq!(s.apply(&var(&a)), Monotype::Builtin(BuiltinTy::I32));
    }

    #[test]
    fn compose_applies_newer_to_older_images() {
        let mut vars = VarFactory::new();
        let a = vars.fresh(Domain::Any);
        let b = vars.fresh(Domain::Any);

        // σ₁ = { a ↦ (b, bool) }
        let mut s1 = Substitution::new();
        s1.bind(
            a.id,
            Monotype::Tuple(vec![var(&b), Monotype::Builtin(BuiltinTy::Bool)]),
        );

        // σ₂ = { b ↦ i64 }
        let s2 = Substitution::singleton(b.id, Monotype::Builtin(BuiltinTy::I64));

        s1.compose(s2);
        assert_eq!(
            s1.apply(&var(&a)),
            Monotype::Tuple(vec![
                Monotype::Builtin(BuiltinTy::I64),
                Monotype::Builtin(BuiltinTy::Bool)
            ])
        );
    }

    #[test]
    fn compose_newer_wins_on_conflict() {
        let mut vars = VarFactory::new();
        let a = vars.fresh(Domain::Any);

        let mut s1 = Substitution::singleton(a.id, Monotype::Builtin(BuiltinTy::I32));
        let s2 = Substitution::singleton(a.id, Monotype::Builtin(BuiltinTy::I64));
        s1.compose(s2);

        assert_eq!(s1.apply(&var(&a)), Monotype::Builtin(BuiltinTy::I64));
    }
}
