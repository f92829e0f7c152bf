//! Name resolution.
//!
//! Two passes over the item list. Pass 1 registers item headers and resolves
//! every type appearing in a signature, so items can reference each other in
//! any order. Pass 2 walks bodies, binding each `DeclRef` to a definition
//! and numbering every expression on the way (later stages key their side
//! tables by `ExprId`).

mod body;
mod types;

use std::collections::HashMap;

use phi_ast::{
    BuiltinFn, DefId, EnumDecl, FunDecl, Item, Module, SrcLoc, StructDecl, TypeParam,
};
use phi_diagnostics::{codes, Diagnostic, DiagnosticEngine, Span};

use crate::defs::{DefKind, DefTable};
use crate::symbols::{Namespace, SymbolTable};

pub struct NameResolver<'a> {
    defs: &'a mut DefTable,
    diags: &'a mut DiagnosticEngine,
    file: &'a str,
    symbols: SymbolTable,
    /// (enum def, variant name) -> (variant def, index); filled in pass 1 so
    /// constructors in bodies resolve without touching the tree again.
    variants: HashMap<(DefId, String), (DefId, usize)>,
    next_expr_id: u32,
    loop_depth: usize,
}

impl<'a> NameResolver<'a> {
    /// Resolve the whole module. Returns false when any error was reported.
    pub fn run(
        module: &mut Module,
        defs: &mut DefTable,
        diags: &mut DiagnosticEngine,
        file: &str,
    ) -> bool {
        let errors_before = diags.error_count();
        let mut resolver = NameResolver {
            defs,
            diags,
            file,
            symbols: SymbolTable::new(),
            variants: HashMap::new(),
            next_expr_id: 1,
            loop_depth: 0,
        };
        resolver.declare_items(module);
        resolver.resolve_signatures(module);
        resolver.resolve_bodies(module);
        resolver.diags.error_count() == errors_before
    }

    /// Scoped acquisition for the symbol table: the scope closes on every
    /// exit path out of `f`.
    fn scoped<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.symbols.push_scope();
        let out = f(self);
        self.symbols.pop_scope();
        out
    }

    pub(crate) fn span(&self, loc: SrcLoc) -> Span {
        if loc.line == 0 {
            Span::unknown()
        } else {
            Span::new(self.file.to_string(), loc.line as usize, loc.col as usize, 1)
        }
    }

    fn redefinition(&mut self, name: &str, loc: SrcLoc, first: DefId) {
        let first_span = self.span(self.defs.loc(first));
        let span = self.span(loc);
        self.diags.redefinition(name, span, first_span);
    }

    // ------------------------------------------------------------------
    // Pass 1a: register item headers
    // ------------------------------------------------------------------

    fn declare_items(&mut self, module: &mut Module) {
        for item in &mut module.items {
            match item {
                Item::Fun(f) => self.declare_fun(f),
                Item::Struct(s) => self.declare_struct(s),
                Item::Enum(e) => self.declare_enum(e),
            }
        }
    }

    fn declare_fun(&mut self, f: &mut FunDecl) {
        if BuiltinFn::from_name(&f.name).is_some() {
            let span = self.span(f.loc);
            self.diags.emit(Diagnostic::error(
                codes::DUPLICATE_DEFINITION,
                format!("`{}` is a compiler builtin and cannot be redefined", f.name),
                span,
            ));
        }
        let def = self.defs.alloc(
            &f.name,
            DefKind::Fun {
                type_params: f.type_params.len(),
            },
            f.loc,
        );
        f.def = Some(def);
        self.declare_type_params(&mut f.type_params);
        self.declare_params(f);
        if let Err(first) = self.symbols.insert(Namespace::Functions, &f.name, def) {
            self.redefinition(&f.name, f.loc, first);
        }
    }

    fn declare_params(&mut self, f: &mut FunDecl) {
        for p in &mut f.params {
            p.def = Some(self.defs.alloc(&p.name, DefKind::Param, p.loc));
        }
    }

    fn declare_struct(&mut self, s: &mut StructDecl) {
        let def = self.defs.alloc(
            &s.name,
            DefKind::Struct {
                type_params: s.type_params.len(),
            },
            s.loc,
        );
        s.def = Some(def);
        self.declare_type_params(&mut s.type_params);
        if let Err(first) = self.symbols.insert(Namespace::Adts, &s.name, def) {
            self.redefinition(&s.name, s.loc, first);
        }

        // Member uniqueness lives in the struct's own scope.
        self.scoped(|this| {
            for (index, field) in s.fields.iter_mut().enumerate() {
                let fdef =
                    this.defs
                        .alloc(&field.name, DefKind::Field { parent: def, index }, field.loc);
                field.def = Some(fdef);
                if let Err(first) = this.symbols.insert(Namespace::Members, &field.name, fdef) {
                    this.redefinition(&field.name, field.loc, first);
                }
            }
            this.declare_methods(def, &mut s.methods);
        });
    }

    fn declare_enum(&mut self, e: &mut EnumDecl) {
        let def = self.defs.alloc(
            &e.name,
            DefKind::Enum {
                type_params: e.type_params.len(),
            },
            e.loc,
        );
        e.def = Some(def);
        self.declare_type_params(&mut e.type_params);
        if let Err(first) = self.symbols.insert(Namespace::Adts, &e.name, def) {
            self.redefinition(&e.name, e.loc, first);
        }

        self.scoped(|this| {
            for (index, variant) in e.variants.iter_mut().enumerate() {
                let vdef = this.defs.alloc(
                    &variant.name,
                    DefKind::Variant { parent: def, index },
                    variant.loc,
                );
                variant.def = Some(vdef);
                this.variants
                    .insert((def, variant.name.clone()), (vdef, index));
                if let Err(first) = this.symbols.insert(Namespace::Members, &variant.name, vdef)
                {
                    this.redefinition(&variant.name, variant.loc, first);
                }
            }
            this.declare_methods(def, &mut e.methods);
        });
    }

    fn declare_methods(&mut self, parent: DefId, methods: &mut [FunDecl]) {
        for m in methods {
            let mdef = self.defs.alloc(&m.name, DefKind::Method { parent }, m.loc);
            m.def = Some(mdef);
            self.declare_type_params(&mut m.type_params);
            self.declare_params(m);
            // Instance methods share the member namespace with fields;
            // static methods get their own.
            let ns = if m.self_kind.is_some() {
                Namespace::Members
            } else {
                Namespace::StaticMethods
            };
            if let Err(first) = self.symbols.insert(ns, &m.name, mdef) {
                self.redefinition(&m.name, m.loc, first);
            }
        }
    }

    fn declare_type_params(&mut self, tps: &mut [TypeParam]) {
        for (index, tp) in tps.iter_mut().enumerate() {
            if let Some(constraint) = &tp.constraint {
                if constraint != "Int" && constraint != "Float" {
                    let span = self.span(tp.loc);
                    self.diags.emit(Diagnostic::error(
                        codes::CONSTRAINT_VIOLATION,
                        format!(
                            "unknown constraint `{}` on type parameter `{}`",
                            constraint, tp.name
                        ),
                        span,
                    ));
                }
            }
            tp.def = Some(self.defs.alloc(
                &tp.name,
                DefKind::TypeParam {
                    index,
                    constraint: tp.constraint.clone(),
                },
                tp.loc,
            ));
        }
    }

    // ------------------------------------------------------------------
    // Pass 1b: resolve signature types
    // ------------------------------------------------------------------

    fn resolve_signatures(&mut self, module: &mut Module) {
        for item in &mut module.items {
            match item {
                Item::Fun(f) => self.resolve_fun_signature(f),
                Item::Struct(s) => self.scoped(|this| {
                    this.bind_type_params(&s.type_params);
                    for field in &mut s.fields {
                        this.resolve_type(&mut field.ty);
                    }
                    for m in &mut s.methods {
                        this.resolve_fun_signature(m);
                    }
                }),
                Item::Enum(e) => self.scoped(|this| {
                    this.bind_type_params(&e.type_params);
                    for variant in &mut e.variants {
                        for payload in &mut variant.payload {
                            this.resolve_type(payload);
                        }
                    }
                    for m in &mut e.methods {
                        this.resolve_fun_signature(m);
                    }
                }),
            }
        }
    }

    fn resolve_fun_signature(&mut self, f: &mut FunDecl) {
        self.scoped(|this| {
            this.bind_type_params(&f.type_params);
            for p in &mut f.params {
                this.resolve_type(&mut p.ty);
            }
            if let Some(ret) = &mut f.return_type {
                this.resolve_type(ret);
            }
        });
    }

    /// Bring already-allocated type parameters into scope.
    fn bind_type_params(&mut self, tps: &[TypeParam]) {
        for tp in tps {
            let def = tp.def.expect("type parameter not declared");
            if let Err(first) = self.symbols.insert(Namespace::TypeParams, &tp.name, def) {
                self.redefinition(&tp.name, tp.loc, first);
            }
        }
    }
}
