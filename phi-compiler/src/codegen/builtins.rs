//! Compiler builtins: println, panic, assert, unreachable, typeOf.

use inkwell::values::{BasicMetadataValueEnum, BasicValueEnum};

use phi_ast::{BuiltinFn, BuiltinTy, Expr, TyKind};

use super::CodeGen;

impl<'ctx, 'a> CodeGen<'ctx, 'a> {
    pub(crate) fn compile_builtin(
        &mut self,
        builtin: BuiltinFn,
        args: &[Expr],
    ) -> Result<Option<BasicValueEnum<'ctx>>, String> {
        match builtin {
            BuiltinFn::Println => self.compile_println(args).map(|_| None),
            BuiltinFn::Panic => self.compile_panic(args).map(|_| None),
            BuiltinFn::Assert => self.compile_assert(args).map(|_| None),
            BuiltinFn::Unreachable => {
                self.builder
                    .build_unreachable()
                    .map_err(|e| format!("failed to build unreachable: {}", e))?;
                Ok(None)
            }
            // Compile-time only; nothing to emit.
            BuiltinFn::TypeOf => Ok(None),
        }
    }

    pub(crate) fn build_printf(
        &mut self,
        format: &str,
        args: &[BasicMetadataValueEnum<'ctx>],
    ) -> Result<(), String> {
        let printf = self.declare_printf();
        let format_str = self
            .builder
            .build_global_string_ptr(format, "fmt")
            .map_err(|e| format!("failed to build format string: {}", e))?;
        let mut printf_args: Vec<BasicMetadataValueEnum> =
            vec![format_str.as_pointer_value().into()];
        printf_args.extend_from_slice(args);
        self.builder
            .build_call(printf, &printf_args, "printf")
            .map_err(|e| format!("failed to call printf: {}", e))?;
        Ok(())
    }

    /// The single-argument form picks a printf format from the argument's
    /// static type; the multi-argument form treats the first argument as
    /// the format and applies C vararg promotions to the rest.
    fn compile_println(&mut self, args: &[Expr]) -> Result<(), String> {
        match args {
            [] => self.build_printf("\n", &[]),
            [arg] => {
                let ty = arg.ty.expect("untyped println argument");
                let value = self.compile_value(arg)?;
                match self.sess.types.kind(ty) {
                    TyKind::Builtin(b) if b.is_integer() => {
                        let wide = self.int_resize(
                            value.into_int_value(),
                            self.context.i64_type(),
                            b.is_signed(),
                        )?;
                        let format = if b.is_signed() { "%lld\n" } else { "%llu\n" };
                        self.build_printf(format, &[wide.into()])
                    }
                    TyKind::Builtin(b) if b.is_float() => {
                        let wide = self.promote_float(value)?;
                        self.build_printf("%g\n", &[wide])
                    }
                    TyKind::Builtin(BuiltinTy::Bool) => {
                        let wide = self.int_resize(
                            value.into_int_value(),
                            self.context.i32_type(),
                            false,
                        )?;
                        self.build_printf("%d\n", &[wide.into()])
                    }
                    TyKind::Builtin(BuiltinTy::Char) => {
                        let wide = self.int_resize(
                            value.into_int_value(),
                            self.context.i32_type(),
                            false,
                        )?;
                        self.build_printf("%c\n", &[wide.into()])
                    }
                    TyKind::Builtin(BuiltinTy::Str) => {
                        self.build_printf("%s\n", &[value.into()])
                    }
                    _ => Err(format!(
                        "cannot print a value of type `{}`",
                        self.ty_name(ty)
                    )),
                }
            }
            [format, rest @ ..] => {
                let format_val = self.compile_value(format)?;
                let printf = self.declare_printf();
                let mut printf_args: Vec<BasicMetadataValueEnum> = vec![format_val.into()];
                for arg in rest {
                    printf_args.push(self.promote_vararg(arg)?);
                }
                self.builder
                    .build_call(printf, &printf_args, "printf")
                    .map_err(|e| format!("failed to call printf: {}", e))?;
                Ok(())
            }
        }
    }

    /// C default argument promotions for varargs.
    fn promote_vararg(&mut self, arg: &Expr) -> Result<BasicMetadataValueEnum<'ctx>, String> {
        let ty = arg.ty.expect("untyped println argument");
        let value = self.compile_value(arg)?;
        Ok(match self.sess.types.kind(ty) {
            TyKind::Builtin(b) if b.is_float() => self.promote_float(value)?,
            TyKind::Builtin(b) if b.is_integer() && b.bit_width() < 32 => self
                .int_resize(value.into_int_value(), self.context.i32_type(), b.is_signed())?
                .into(),
            TyKind::Builtin(BuiltinTy::Bool | BuiltinTy::Char) => self
                .int_resize(value.into_int_value(), self.context.i32_type(), false)?
                .into(),
            _ => value.into(),
        })
    }

    fn promote_float(
        &mut self,
        value: BasicValueEnum<'ctx>,
    ) -> Result<BasicMetadataValueEnum<'ctx>, String> {
        let fv = value.into_float_value();
        if fv.get_type() == self.context.f64_type() {
            return Ok(fv.into());
        }
        Ok(self
            .builder
            .build_float_ext(fv, self.context.f64_type(), "fpext")
            .map_err(|e| format!("failed to extend float: {}", e))?
            .into())
    }

    fn compile_panic(&mut self, args: &[Expr]) -> Result<(), String> {
        let message = self.compile_value(&args[0])?;
        self.build_printf("Panic: %s\n", &[message.into()])?;
        let abort = self.declare_abort();
        self.builder
            .build_call(abort, &[], "")
            .map_err(|e| format!("failed to call abort: {}", e))?;
        self.builder
            .build_unreachable()
            .map_err(|e| format!("failed to build unreachable: {}", e))?;
        Ok(())
    }

    fn compile_assert(&mut self, args: &[Expr]) -> Result<(), String> {
        let function = self.current_fn.ok_or("no current function")?;
        let cond = self.compile_value(&args[0])?.into_int_value();

        let fail_bb = self.context.append_basic_block(function, "assert.fail");
        let pass_bb = self.context.append_basic_block(function, "assert.pass");
        self.builder
            .build_conditional_branch(cond, pass_bb, fail_bb)
            .map_err(|e| format!("failed to build branch: {}", e))?;

        self.builder.position_at_end(fail_bb);
        match args.get(1) {
            Some(message) => {
                let message = self.compile_value(message)?;
                self.build_printf("Assertion failed: %s\n", &[message.into()])?;
            }
            None => self.build_printf("Assertion failed\n", &[])?,
        }
        let abort = self.declare_abort();
        self.builder
            .build_call(abort, &[], "")
            .map_err(|e| format!("failed to call abort: {}", e))?;
        self.builder
            .build_unreachable()
            .map_err(|e| format!("failed to build unreachable: {}", e))?;

        self.builder.position_at_end(pass_bb);
        Ok(())
    }
}
