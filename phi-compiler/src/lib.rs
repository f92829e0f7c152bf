//! Semantic analysis and code generation core for the Phi language.
//!
//! The pipeline is `AST -> NameResolver -> Inferencer -> TypeChecker ->
//! CodeGen -> IR`. Every stage mutates the AST in place; the `Compilation`
//! state object owns the tree, the type interner, the definition table, and
//! the diagnostic sink, and is threaded through each stage. A failing stage
//! blocks the stages after it, but within a stage every item is attempted
//! so one run surfaces as many errors as possible.

pub mod check;
pub mod codegen;
pub mod defs;
pub mod infer;
pub mod lower;
pub mod resolver;
pub mod symbols;

// Re-export diagnostics from phi-diagnostics.
pub use phi_diagnostics as diagnostics;

pub use check::TypeChecker;
pub use codegen::CodeGen;
pub use defs::{DeclIndex, DefKind, DefTable};
pub use resolver::NameResolver;
pub use symbols::{Namespace, SymbolTable};

use anyhow::Context as _;
use phi_ast::{Module, TyId, TypeInterner};
use phi_diagnostics::DiagnosticEngine;

/// Everything one translation unit's compilation owns.
pub struct Compilation {
    pub module: Module,
    pub types: TypeInterner,
    pub defs: DefTable,
    pub diagnostics: DiagnosticEngine,
    pub source_file: String,
}

impl Compilation {
    pub fn new(module: Module, source_file: &str) -> Self {
        Self {
            module,
            types: TypeInterner::new(),
            defs: DefTable::new(),
            diagnostics: DiagnosticEngine::new(),
            source_file: source_file.to_string(),
        }
    }

    /// Bind every name to a definition. False when errors were reported.
    pub fn resolve_names(&mut self) -> bool {
        log::info!("resolving names in `{}`", self.module.name);
        NameResolver::run(
            &mut self.module,
            &mut self.defs,
            &mut self.diagnostics,
            &self.source_file,
        )
    }

    /// Infer and write back every type.
    pub fn infer_types(&mut self) -> bool {
        log::info!("inferring types in `{}`", self.module.name);
        let decls = DeclIndex::build(&self.module);
        infer::Inferencer::run(
            &mut self.module,
            &self.types,
            &self.defs,
            &decls,
            &mut self.diagnostics,
            &self.source_file,
        )
    }

    /// Post-inference structural validation.
    pub fn check_types(&mut self) -> bool {
        log::info!("checking types in `{}`", self.module.name);
        let decls = DeclIndex::build(&self.module);
        TypeChecker::run(
            &self.module,
            &self.types,
            &self.defs,
            &decls,
            &mut self.diagnostics,
            &self.source_file,
        )
    }

    /// The full semantic pipeline; a failing stage blocks the next.
    pub fn analyze(&mut self) -> bool {
        self.resolve_names() && self.infer_types() && self.check_types()
    }

    pub fn display_ty(&self, ty: TyId) -> String {
        let defs = &self.defs;
        self.types.display(ty, &|d| defs.name(d).to_string())
    }
}

/// Convenience entry point: analyze and lower one module, returning the
/// textual IR. Diagnostics stay on the `Compilation`; they are printed here
/// only on failure.
pub fn compile_module(module: Module, source_file: &str) -> anyhow::Result<String> {
    let mut compilation = Compilation::new(module, source_file);
    if !compilation.analyze() {
        compilation.diagnostics.print_all();
        compilation.diagnostics.print_summary();
        anyhow::bail!(
            "compilation failed with {} error(s)",
            compilation.diagnostics.error_count()
        );
    }

    let context = inkwell::context::Context::create();
    let mut codegen = CodeGen::new(&context, &compilation);
    codegen
        .compile()
        .map_err(anyhow::Error::msg)
        .context("code generation failed")?;
    Ok(codegen.print_ir())
}
