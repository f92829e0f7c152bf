//! The definition table and declaration index.
//!
//! Name resolution allocates a `DefId` for every declaration it encounters;
//! the `DefTable` keeps the name/kind/location facts behind those ids for
//! the rest of the pipeline. The `DeclIndex` snapshots the declarations
//! themselves (signatures and bodies) out of the module tree so that later
//! stages can look them up by id while the tree is being mutated.

use std::collections::HashMap;

use phi_ast::{EnumDecl, FunDecl, Item, Module, SrcLoc, StructDecl, TypeParam};
use phi_ast::{DefId, FieldDecl, VariantDecl};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefKind {
    Fun { type_params: usize },
    Struct { type_params: usize },
    Enum { type_params: usize },
    Method { parent: DefId },
    Variant { parent: DefId, index: usize },
    Field { parent: DefId, index: usize },
    TypeParam { index: usize, constraint: Option<String> },
    Local,
    Param,
    /// A match-arm pattern binding.
    Binding,
}

impl DefKind {
    pub fn describes(&self) -> &'static str {
        match self {
            DefKind::Fun { .. } => "function",
            DefKind::Struct { .. } => "struct",
            DefKind::Enum { .. } => "enum",
            DefKind::Method { .. } => "method",
            DefKind::Variant { .. } => "variant",
            DefKind::Field { .. } => "field",
            DefKind::TypeParam { .. } => "type parameter",
            DefKind::Local => "variable",
            DefKind::Param => "parameter",
            DefKind::Binding => "binding",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DefInfo {
    pub name: String,
    pub kind: DefKind,
    pub loc: SrcLoc,
}

/// Append-only table of every definition in the translation unit.
#[derive(Debug, Default)]
pub struct DefTable {
    defs: Vec<DefInfo>,
}

impl DefTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, name: &str, kind: DefKind, loc: SrcLoc) -> DefId {
        let id = DefId(self.defs.len() as u32);
        self.defs.push(DefInfo {
            name: name.to_string(),
            kind,
            loc,
        });
        id
    }

    pub fn name(&self, def: DefId) -> &str {
        &self.defs[def.0 as usize].name
    }

    pub fn kind(&self, def: DefId) -> &DefKind {
        &self.defs[def.0 as usize].kind
    }

    pub fn loc(&self, def: DefId) -> SrcLoc {
        self.defs[def.0 as usize].loc
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

/// A method together with its parent ADT.
#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub parent: DefId,
    pub decl: FunDecl,
}

/// Either kind of ADT declaration, looked up uniformly.
#[derive(Debug, Clone)]
pub enum AdtDecl {
    Struct(StructDecl),
    Enum(EnumDecl),
}

impl AdtDecl {
    pub fn name(&self) -> &str {
        match self {
            AdtDecl::Struct(s) => &s.name,
            AdtDecl::Enum(e) => &e.name,
        }
    }

    pub fn type_params(&self) -> &[TypeParam] {
        match self {
            AdtDecl::Struct(s) => &s.type_params,
            AdtDecl::Enum(e) => &e.type_params,
        }
    }

    pub fn methods(&self) -> &[FunDecl] {
        match self {
            AdtDecl::Struct(s) => &s.methods,
            AdtDecl::Enum(e) => &e.methods,
        }
    }

    pub fn as_struct(&self) -> Option<&StructDecl> {
        match self {
            AdtDecl::Struct(s) => Some(s),
            AdtDecl::Enum(_) => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumDecl> {
        match self {
            AdtDecl::Enum(e) => Some(e),
            AdtDecl::Struct(_) => None,
        }
    }
}

/// Snapshot of all declarations, keyed by `DefId`. Built after name
/// resolution (ids present) and rebuilt after inference (types present) so
/// the code generator sees fully-typed bodies.
#[derive(Debug, Default)]
pub struct DeclIndex {
    pub funs: HashMap<DefId, FunDecl>,
    pub adts: HashMap<DefId, AdtDecl>,
    pub methods: HashMap<DefId, MethodInfo>,
}

impl DeclIndex {
    /// Requires every declaration's `def` to be filled.
    pub fn build(module: &Module) -> Self {
        let mut index = Self::default();
        for item in &module.items {
            match item {
                Item::Fun(f) => {
                    let def = f.def.expect("unresolved function declaration");
                    index.funs.insert(def, f.clone());
                }
                Item::Struct(s) => {
                    let def = s.def.expect("unresolved struct declaration");
                    index.register_methods(def, &s.methods);
                    index.adts.insert(def, AdtDecl::Struct(s.clone()));
                }
                Item::Enum(e) => {
                    let def = e.def.expect("unresolved enum declaration");
                    index.register_methods(def, &e.methods);
                    index.adts.insert(def, AdtDecl::Enum(e.clone()));
                }
            }
        }
        index
    }

    fn register_methods(&mut self, parent: DefId, methods: &[FunDecl]) {
        for method in methods {
            let def = method.def.expect("unresolved method declaration");
            self.methods.insert(
                def,
                MethodInfo {
                    parent,
                    decl: method.clone(),
                },
            );
        }
    }

    pub fn adt(&self, def: DefId) -> &AdtDecl {
        self.adts.get(&def).expect("unknown ADT definition")
    }

    pub fn find_method(&self, adt: DefId, name: &str) -> Option<(DefId, &FunDecl)> {
        self.adt(adt)
            .methods()
            .iter()
            .find(|m| m.name == name)
            .and_then(|m| m.def.map(|d| (d, m)))
    }

    pub fn find_field<'a>(&'a self, s: &'a StructDecl, name: &str) -> Option<(usize, &'a FieldDecl)> {
        s.fields.iter().enumerate().find(|(_, f)| f.name == name)
    }

    pub fn find_variant<'a>(
        &'a self,
        e: &'a EnumDecl,
        name: &str,
    ) -> Option<(usize, &'a VariantDecl)> {
        e.variants.iter().enumerate().find(|(_, v)| v.name == name)
    }
}
