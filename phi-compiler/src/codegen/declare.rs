//! Function signature declaration and the entry-point shim.

use inkwell::types::{BasicMetadataTypeEnum, BasicType};

use phi_ast::SelfKind;

use super::{CodeGen, MonoFun};

impl<'ctx, 'a> CodeGen<'ctx, 'a> {
    pub(crate) fn declare_function(&mut self, mono: &MonoFun) -> Result<(), String> {
        // The user's entry point is renamed; a real C `main` shim calls it.
        let llvm_name = if mono.mangled == "main" {
            "__builtin_main"
        } else {
            mono.mangled.as_str()
        };

        let mut param_types: Vec<BasicMetadataTypeEnum> = Vec::new();
        if let Some(self_ty) = mono.self_ty {
            match mono.decl.self_kind {
                Some(SelfKind::Ref) => {
                    param_types.push(
                        self.context
                            .ptr_type(inkwell::AddressSpace::default())
                            .into(),
                    );
                }
                Some(SelfKind::Value) => {
                    param_types.push(self.llvm_type(self_ty)?.into());
                }
                None => {}
            }
        }
        for ty in &mono.param_tys {
            param_types.push(self.llvm_type(*ty)?.into());
        }

        let fn_type = match mono.ret_ty {
            Some(ret) => self.llvm_type(ret)?.fn_type(&param_types, false),
            None => self.context.void_type().fn_type(&param_types, false),
        };

        let function = self.module.add_function(llvm_name, fn_type, None);
        self.functions.insert(mono.mangled.clone(), function);
        Ok(())
    }

    /// Emit `i32 main()` calling the renamed user entry point, so a void
    /// user `main` still satisfies the C runtime.
    pub(crate) fn emit_entry_shim(&mut self) -> Result<(), String> {
        let Some(user_main) = self.functions.get("main").copied() else {
            return Ok(());
        };
        if user_main.count_params() != 0 {
            return Err("`main` must take no parameters".to_string());
        }

        let i32_type = self.context.i32_type();
        let main_type = i32_type.fn_type(&[], false);
        let main_fn = self.module.add_function("main", main_type, None);
        let entry = self.context.append_basic_block(main_fn, "entry");
        self.builder.position_at_end(entry);

        self.builder
            .build_call(user_main, &[], "user_main")
            .map_err(|e| format!("failed to call user main: {}", e))?;
        let zero = i32_type.const_int(0, false);
        self.builder
            .build_return(Some(&zero))
            .map_err(|e| format!("failed to build return: {}", e))?;
        Ok(())
    }
}
