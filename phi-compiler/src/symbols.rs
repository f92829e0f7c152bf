//! Symbol table: a stack of scopes, six disjoint namespaces per scope.
//!
//! The language disallows shadowing, so `insert` checks every live scope of
//! the target namespace, not just the innermost one. Scope entry/exit goes
//! through `with_scope`, which closes the scope on every exit path.

use phi_ast::DefId;
use phi_diagnostics::suggest;

/// The six namespaces of one scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    /// Local variables, parameters, and pattern bindings.
    Values,
    Functions,
    StaticMethods,
    /// Structs and enums.
    Adts,
    /// Fields and instance methods, inside a struct or enum scope.
    Members,
    TypeParams,
}

const NAMESPACE_COUNT: usize = 6;

impl Namespace {
    fn index(self) -> usize {
        match self {
            Namespace::Values => 0,
            Namespace::Functions => 1,
            Namespace::StaticMethods => 2,
            Namespace::Adts => 3,
            Namespace::Members => 4,
            Namespace::TypeParams => 5,
        }
    }
}

#[derive(Debug, Default)]
struct Scope {
    names: [Vec<(String, DefId)>; NAMESPACE_COUNT],
}

/// Primitive names take part in type suggestions alongside user ADTs.
const PRIMITIVE_NAMES: &[&str] = &[
    "i8", "i16", "i32", "i64", "u8", "u16", "u32", "u64", "f32", "f64", "string", "char",
    "bool", "range",
];

#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
        }
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Run `f` inside a fresh scope. The scope is closed exactly once no
    /// matter how `f` returns.
    pub fn with_scope<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.push_scope();
        let out = f(self);
        self.pop_scope();
        out
    }

    /// Prefer `with_scope`; these exist so walkers that thread more state
    /// than the table itself can build their own scoped wrapper.
    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Insert a name. Fails with the previous definition when the name is
    /// already bound in any live scope of the namespace.
    pub fn insert(&mut self, ns: Namespace, name: &str, def: DefId) -> Result<(), DefId> {
        if let Some(existing) = self.lookup(ns, name) {
            return Err(existing);
        }
        let scope = self.scopes.last_mut().expect("symbol table has no scope");
        scope.names[ns.index()].push((name.to_string(), def));
        Ok(())
    }

    /// Innermost-out search.
    pub fn lookup(&self, ns: Namespace, name: &str) -> Option<DefId> {
        for scope in self.scopes.iter().rev() {
            if let Some((_, def)) = scope.names[ns.index()].iter().find(|(n, _)| n == name) {
                return Some(*def);
            }
        }
        None
    }

    fn live_names<'a>(&'a self, ns: Namespace) -> impl Iterator<Item = &'a str> {
        self.scopes
            .iter()
            .rev()
            .flat_map(move |scope| scope.names[ns.index()].iter().map(|(n, _)| n.as_str()))
    }

    /// Closest live name in the namespace, for "did you mean" help.
    pub fn suggest(&self, ns: Namespace, name: &str) -> Option<String> {
        suggest::closest_match(name, self.live_names(ns)).map(str::to_string)
    }

    /// Like `suggest`, but for type positions: ADTs, type parameters, and
    /// the primitive type names all take part.
    pub fn suggest_type(&self, name: &str) -> Option<String> {
        let pool = self
            .live_names(Namespace::Adts)
            .chain(self.live_names(Namespace::TypeParams))
            .chain(PRIMITIVE_NAMES.iter().copied());
        suggest::closest_match(name, pool).map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(n: u32) -> DefId {
        DefId(n)
    }

    #[test]
    fn lookup_searches_outward() {
        let mut table = SymbolTable::new();
        table.insert(Namespace::Values, "x", d(0)).unwrap();
        table.with_scope(|table| {
            table.insert(Namespace::Values, "y", d(1)).unwrap();
            assert_eq!(table.lookup(Namespace::Values, "x"), Some(d(0)));
            assert_eq!(table.lookup(Namespace::Values, "y"), Some(d(1)));
        });
        assert_eq!(table.lookup(Namespace::Values, "y"), None);
    }

    #[test]
    fn shadowing_across_scopes_is_rejected() {
        let mut table = SymbolTable::new();
        table.insert(Namespace::Values, "x", d(0)).unwrap();
        table.with_scope(|table| {
            assert_eq!(table.insert(Namespace::Values, "x", d(1)), Err(d(0)));
        });
    }

    #[test]
    fn namespaces_are_disjoint() {
        let mut table = SymbolTable::new();
        table.insert(Namespace::Values, "point", d(0)).unwrap();
        table.insert(Namespace::Adts, "point", d(1)).unwrap();
        assert_eq!(table.lookup(Namespace::Values, "point"), Some(d(0)));
        assert_eq!(table.lookup(Namespace::Adts, "point"), Some(d(1)));
    }

    #[test]
    fn scope_closes_on_every_exit_path() {
        let mut table = SymbolTable::new();
        let depth = table.depth();

        // Normal exit.
        table.with_scope(|table| {
            table.insert(Namespace::Values, "a", d(0)).unwrap();
        });
        assert_eq!(table.depth(), depth);

        // Early error return from inside the closure.
        let result: Result<(), ()> = table.with_scope(|table| {
            table.insert(Namespace::Values, "b", d(1)).unwrap();
            Err(())
        });
        assert!(result.is_err());
        assert_eq!(table.depth(), depth);
        assert_eq!(table.lookup(Namespace::Values, "b"), None);
    }

    #[test]
    fn suggestions_prefer_close_names() {
        let mut table = SymbolTable::new();
        table.insert(Namespace::Values, "length", d(0)).unwrap();
        table.insert(Namespace::Values, "height", d(1)).unwrap();
        assert_eq!(
            table.suggest(Namespace::Values, "lenght"),
            Some("length".to_string())
        );
        assert_eq!(table.suggest(Namespace::Values, "zzzzzz"), None);
    }

    #[test]
    fn type_suggestions_include_primitives() {
        let table = SymbolTable::new();
        assert_eq!(table.suggest_type("i23"), Some("i32".to_string()));
        assert_eq!(table.suggest_type("strng"), Some("string".to_string()));
    }
}
