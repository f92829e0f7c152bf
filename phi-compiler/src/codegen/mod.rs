//! LLVM IR generation.
//!
//! Four phases over the analyzed module:
//!   1. discovery    - find every (generic decl, concrete args) pair used
//!   2. monomorphize - drain the worklist into concrete types and bodies
//!   3. desugar      - method calls become calls to mangled free functions
//!   4. emission     - declare ADTs opaque-first, declare signatures, emit
//!
//! Builder-level failures propagate as `Result<_, String>`; genuinely
//! impossible states (a missing def after resolution, an untyped node after
//! inference) are compiler bugs and panic.

mod builtins;
mod declare;
mod discover;
mod expr;
mod functions;
mod layout;
mod matching;
mod mono;
mod types;

use std::collections::{HashMap, HashSet};

use inkwell::basic_block::BasicBlock;
use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::Module;
use inkwell::types::StructType;
use inkwell::values::{FunctionValue, PointerValue};

use phi_ast::{DefId, Expr, FunDecl, Item, TyId};

use crate::defs::DeclIndex;
use crate::Compilation;

/// A monomorphized ADT: the concrete field or variant layout behind one
/// mangled name.
#[derive(Debug, Clone)]
pub(crate) enum MonoAdt {
    Struct {
        fields: Vec<MonoField>,
    },
    Enum {
        variants: Vec<MonoVariant>,
        /// Size in bytes of the `[N x i8]` payload slot; filled when bodies
        /// are set.
        payload_size: u64,
    },
}

#[derive(Debug, Clone)]
pub(crate) struct MonoField {
    pub name: String,
    pub ty: TyId,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone)]
pub(crate) struct MonoVariant {
    pub name: String,
    pub payload: Vec<TyId>,
}

/// A concrete function awaiting emission: the declaration with every type
/// substituted, plus its lowered signature.
#[derive(Debug, Clone)]
pub(crate) struct MonoFun {
    pub mangled: String,
    pub decl: FunDecl,
    pub param_tys: Vec<TyId>,
    /// `None` lowers to void.
    pub ret_ty: Option<TyId>,
    /// The receiver's concrete ADT type for methods.
    pub self_ty: Option<TyId>,
}

pub struct CodeGen<'ctx, 'a> {
    pub context: &'ctx Context,
    pub module: Module<'ctx>,
    pub builder: Builder<'ctx>,
    pub(crate) sess: &'a Compilation,
    pub(crate) decls: DeclIndex,

    // Monomorphization registries, keyed by mangled name.
    pub(crate) struct_types: HashMap<String, StructType<'ctx>>,
    pub(crate) layouts: HashMap<String, MonoAdt>,
    pub(crate) adt_order: Vec<String>,
    pub(crate) functions: HashMap<String, FunctionValue<'ctx>>,
    pub(crate) fn_queue: Vec<MonoFun>,
    pub(crate) seen: HashSet<String>,

    // Per-function state.
    pub(crate) locals: HashMap<DefId, PointerValue<'ctx>>,
    pub(crate) local_tys: HashMap<DefId, TyId>,
    pub(crate) current_fn: Option<FunctionValue<'ctx>>,
    pub(crate) current_ret: Option<TyId>,
    /// (continue target, break target) per enclosing loop.
    pub(crate) loop_stack: Vec<(BasicBlock<'ctx>, BasicBlock<'ctx>)>,
    /// Function-scoped defer stack, executed LIFO on every exit path.
    pub(crate) deferred: Vec<Expr>,

    // Lazily declared C runtime hooks.
    pub(crate) printf_fn: Option<FunctionValue<'ctx>>,
    pub(crate) abort_fn: Option<FunctionValue<'ctx>>,
    pub(crate) strcmp_fn: Option<FunctionValue<'ctx>>,
}

impl<'ctx, 'a> CodeGen<'ctx, 'a> {
    pub fn new(context: &'ctx Context, sess: &'a Compilation) -> Self {
        let module = context.create_module(&sess.module.name);
        let builder = context.create_builder();
        let decls = DeclIndex::build(&sess.module);
        Self {
            context,
            module,
            builder,
            sess,
            decls,
            struct_types: HashMap::new(),
            layouts: HashMap::new(),
            adt_order: Vec::new(),
            functions: HashMap::new(),
            fn_queue: Vec::new(),
            seen: HashSet::new(),
            locals: HashMap::new(),
            local_tys: HashMap::new(),
            current_fn: None,
            current_ret: None,
            loop_stack: Vec::new(),
            deferred: Vec::new(),
            printf_fn: None,
            abort_fn: None,
            strcmp_fn: None,
        }
    }

    /// Run all four phases and leave the finished module in `self.module`.
    pub fn compile(&mut self) -> Result<(), String> {
        // Roots: every non-generic item. Generic declarations only exist
        // through the instantiations discovered below.
        let mut adt_roots = Vec::new();
        let mut fun_roots = Vec::new();
        for item in &self.sess.module.items {
            match item {
                Item::Struct(s) if s.type_params.is_empty() => {
                    adt_roots.push(s.def.expect("unresolved struct"));
                }
                Item::Enum(e) if e.type_params.is_empty() => {
                    adt_roots.push(e.def.expect("unresolved enum"));
                }
                Item::Fun(f) if f.type_params.is_empty() => {
                    fun_roots.push(f.def.expect("unresolved function"));
                }
                _ => {}
            }
        }
        for def in adt_roots {
            self.ensure_adt(def, &[])?;
        }
        for def in fun_roots {
            self.queue_function(def, &[])?;
        }

        // Drain to fixed point: walking a concrete body can enqueue more
        // instantiations, whose bodies are walked in turn.
        let mut next = 0;
        while next < self.fn_queue.len() {
            let decl = self.fn_queue[next].decl.clone();
            self.discover_in_fun(&decl)?;
            next += 1;
        }

        self.set_adt_bodies()?;

        let queue = std::mem::take(&mut self.fn_queue);
        for f in &queue {
            self.declare_function(f)?;
        }
        for f in &queue {
            self.emit_function(f)?;
        }
        self.emit_entry_shim()?;

        log::debug!(
            "emitted {} types and {} functions",
            self.adt_order.len(),
            queue.len()
        );
        Ok(())
    }

    /// Textual IR of the finished module.
    pub fn print_ir(&self) -> String {
        self.module.print_to_string().to_string()
    }

    /// Verify and serialize to a `.ll` file.
    pub fn write_ir_to_file(&self, path: &std::path::Path) -> Result<(), String> {
        self.module
            .verify()
            .map_err(|e| format!("invalid module: {}", e.to_string()))?;
        self.module
            .print_to_file(path)
            .map_err(|e| format!("cannot write `{}`: {}", path.display(), e.to_string()))
    }

    // ------------------------------------------------------------------
    // C runtime hooks
    // ------------------------------------------------------------------

    pub(crate) fn declare_printf(&mut self) -> FunctionValue<'ctx> {
        if let Some(printf) = self.printf_fn {
            return printf;
        }
        let ptr = self.context.ptr_type(inkwell::AddressSpace::default());
        let printf_type = self.context.i32_type().fn_type(&[ptr.into()], true);
        let printf = self.module.add_function("printf", printf_type, None);
        self.printf_fn = Some(printf);
        printf
    }

    pub(crate) fn declare_abort(&mut self) -> FunctionValue<'ctx> {
        if let Some(abort) = self.abort_fn {
            return abort;
        }
        let abort_type = self.context.void_type().fn_type(&[], false);
        let abort = self.module.add_function("abort", abort_type, None);
        self.abort_fn = Some(abort);
        abort
    }

    pub(crate) fn declare_strcmp(&mut self) -> FunctionValue<'ctx> {
        if let Some(strcmp) = self.strcmp_fn {
            return strcmp;
        }
        let ptr = self.context.ptr_type(inkwell::AddressSpace::default());
        let strcmp_type = self
            .context
            .i32_type()
            .fn_type(&[ptr.into(), ptr.into()], false);
        let strcmp = self.module.add_function("strcmp", strcmp_type, None);
        self.strcmp_fn = Some(strcmp);
        strcmp
    }

    /// Is the builder's current block already terminated?
    pub(crate) fn block_terminated(&self) -> bool {
        self.builder
            .get_insert_block()
            .and_then(|b| b.get_terminator())
            .is_some()
    }
}
