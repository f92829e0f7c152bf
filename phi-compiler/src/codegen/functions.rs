//! Phase 4: body emission for statements and control flow.

use inkwell::values::BasicValueEnum;
use inkwell::IntPredicate;

use phi_ast::{Block, BuiltinTy, ExprKind, SelfKind, Stmt, TyKind};

use super::{CodeGen, MonoFun};

impl<'ctx, 'a> CodeGen<'ctx, 'a> {
    pub(crate) fn emit_function(&mut self, mono: &MonoFun) -> Result<(), String> {
        let function = self.functions[&mono.mangled];
        self.current_fn = Some(function);
        self.current_ret = mono.ret_ty;
        self.locals.clear();
        self.local_tys.clear();
        self.loop_stack.clear();
        self.deferred.clear();

        let entry = self.context.append_basic_block(function, "entry");
        self.builder.position_at_end(entry);

        let mut param_index = 0u32;
        if let (Some(self_ty), Some(kind)) = (mono.self_ty, mono.decl.self_kind) {
            let self_def = mono.decl.self_def.expect("method without a self binding");
            let param = function
                .get_nth_param(param_index)
                .expect("missing self parameter");
            param_index += 1;
            match kind {
                // A by-reference receiver's incoming pointer doubles as the
                // variable slot, so mutations reach the caller's object.
                SelfKind::Ref => {
                    self.locals.insert(self_def, param.into_pointer_value());
                }
                SelfKind::Value => {
                    let slot = self
                        .builder
                        .build_alloca(self.llvm_type(self_ty)?, "self")
                        .map_err(|e| format!("failed to alloca self: {}", e))?;
                    self.builder
                        .build_store(slot, param)
                        .map_err(|e| format!("failed to store self: {}", e))?;
                    self.locals.insert(self_def, slot);
                }
            }
            self.local_tys.insert(self_def, self_ty);
        }

        for (p, ty) in mono.decl.params.iter().zip(&mono.param_tys) {
            let def = p.def.expect("unresolved parameter");
            let param = function
                .get_nth_param(param_index)
                .expect("missing parameter");
            param_index += 1;
            let slot = self
                .builder
                .build_alloca(self.llvm_type(*ty)?, &p.name)
                .map_err(|e| format!("failed to alloca parameter: {}", e))?;
            self.builder
                .build_store(slot, param)
                .map_err(|e| format!("failed to store parameter: {}", e))?;
            self.locals.insert(def, slot);
            self.local_tys.insert(def, *ty);
        }

        let tail = self.compile_block(&mono.decl.body)?;

        if !self.block_terminated() {
            self.run_deferred()?;
            match (tail, self.current_ret) {
                (Some(value), Some(_)) => {
                    self.builder
                        .build_return(Some(&value))
                        .map_err(|e| format!("failed to build return: {}", e))?;
                }
                (_, None) => {
                    self.builder
                        .build_return(None)
                        .map_err(|e| format!("failed to build return: {}", e))?;
                }
                (None, Some(_)) => {
                    // The checker proved every path returns; this block is
                    // unreachable.
                    self.builder
                        .build_unreachable()
                        .map_err(|e| format!("failed to build unreachable: {}", e))?;
                }
            }
        }
        Ok(())
    }

    /// Execute the defer stack in LIFO order. Called on every exit path;
    /// the stack itself stays intact so later exits replay it too.
    pub(crate) fn run_deferred(&mut self) -> Result<(), String> {
        let deferred = self.deferred.clone();
        for expr in deferred.iter().rev() {
            self.compile_expr(expr)?;
        }
        Ok(())
    }

    /// Compile a block's statements; the returned value is the trailing
    /// expression's, if any. Statements after a terminator are dead and
    /// skipped.
    pub(crate) fn compile_block(
        &mut self,
        block: &Block,
    ) -> Result<Option<BasicValueEnum<'ctx>>, String> {
        for stmt in &block.stmts {
            self.compile_stmt(stmt)?;
            if self.block_terminated() {
                return Ok(None);
            }
        }
        match &block.tail {
            Some(tail) => self.compile_expr(tail),
            None => Ok(None),
        }
    }

    fn compile_stmt(&mut self, stmt: &Stmt) -> Result<(), String> {
        match stmt {
            Stmt::Let(var) => {
                let def = var.def.expect("unresolved let binding");
                let ty = var.ty.expect("untyped let binding");
                if self.sess.types.is_builtin(ty, BuiltinTy::Null) {
                    if let Some(init) = &var.init {
                        self.compile_expr(init)?;
                    }
                    return Ok(());
                }
                let slot = self
                    .builder
                    .build_alloca(self.llvm_type(ty)?, &var.name)
                    .map_err(|e| format!("failed to alloca `{}`: {}", var.name, e))?;
                if let Some(init) = &var.init {
                    let value = self.compile_value(init)?;
                    self.builder
                        .build_store(slot, value)
                        .map_err(|e| format!("failed to store `{}`: {}", var.name, e))?;
                }
                self.locals.insert(def, slot);
                self.local_tys.insert(def, ty);
                Ok(())
            }

            Stmt::Assign { target, value } => {
                let (ptr, _) = self.compile_lvalue(target)?;
                let value = self.compile_value(value)?;
                self.builder
                    .build_store(ptr, value)
                    .map_err(|e| format!("failed to store: {}", e))?;
                Ok(())
            }

            Stmt::CompoundAssign { target, op, value } => {
                let (ptr, ty) = self.compile_lvalue(target)?;
                let current = self
                    .builder
                    .build_load(self.llvm_type(ty)?, ptr, "current")
                    .map_err(|e| format!("failed to load: {}", e))?;
                let rhs = self.compile_value(value)?;
                let updated = self.compile_binop_values(*op, ty, current, rhs)?;
                self.builder
                    .build_store(ptr, updated)
                    .map_err(|e| format!("failed to store: {}", e))?;
                Ok(())
            }

            Stmt::Return { value, .. } => {
                let computed = match value {
                    Some(value) => Some(self.compile_value(value)?),
                    None => None,
                };
                self.run_deferred()?;
                match (computed, self.current_ret) {
                    (Some(v), Some(_)) => self
                        .builder
                        .build_return(Some(&v))
                        .map(|_| ())
                        .map_err(|e| format!("failed to build return: {}", e)),
                    _ => self
                        .builder
                        .build_return(None)
                        .map(|_| ())
                        .map_err(|e| format!("failed to build return: {}", e)),
                }
            }

            Stmt::Break { .. } => {
                let (_, break_target) = *self
                    .loop_stack
                    .last()
                    .ok_or_else(|| "break outside of loop".to_string())?;
                self.builder
                    .build_unconditional_branch(break_target)
                    .map_err(|e| format!("failed to build branch: {}", e))?;
                Ok(())
            }

            Stmt::Continue { .. } => {
                let (continue_target, _) = *self
                    .loop_stack
                    .last()
                    .ok_or_else(|| "continue outside of loop".to_string())?;
                self.builder
                    .build_unconditional_branch(continue_target)
                    .map_err(|e| format!("failed to build branch: {}", e))?;
                Ok(())
            }

            Stmt::Defer(expr) => {
                self.deferred.push(expr.clone());
                Ok(())
            }

            Stmt::If {
                cond,
                then_block,
                else_block,
            } => self.compile_if(cond, then_block, else_block.as_ref()),

            Stmt::While { cond, body } => self.compile_while(cond, body),

            Stmt::For { var, iter, body } => self.compile_for(var, iter, body),

            Stmt::Expr(expr) => {
                self.compile_expr(expr)?;
                Ok(())
            }
        }
    }

    fn compile_if(
        &mut self,
        cond: &phi_ast::Expr,
        then_block: &Block,
        else_block: Option<&Block>,
    ) -> Result<(), String> {
        let function = self.current_fn.ok_or("no current function")?;
        let cond_val = self.compile_value(cond)?.into_int_value();

        let then_bb = self.context.append_basic_block(function, "if.then");
        let else_bb = self.context.append_basic_block(function, "if.else");
        let merge_bb = self.context.append_basic_block(function, "if.end");

        self.builder
            .build_conditional_branch(cond_val, then_bb, else_bb)
            .map_err(|e| format!("failed to build branch: {}", e))?;

        self.builder.position_at_end(then_bb);
        self.compile_block(then_block)?;
        let then_terminated = self.block_terminated();
        if !then_terminated {
            self.builder
                .build_unconditional_branch(merge_bb)
                .map_err(|e| format!("failed to build branch: {}", e))?;
        }

        self.builder.position_at_end(else_bb);
        if let Some(else_block) = else_block {
            self.compile_block(else_block)?;
        }
        let else_terminated = self.block_terminated();
        if !else_terminated {
            self.builder
                .build_unconditional_branch(merge_bb)
                .map_err(|e| format!("failed to build branch: {}", e))?;
        }

        self.builder.position_at_end(merge_bb);
        if then_terminated && else_terminated {
            self.builder
                .build_unreachable()
                .map_err(|e| format!("failed to build unreachable: {}", e))?;
        }
        Ok(())
    }

    fn compile_while(&mut self, cond: &phi_ast::Expr, body: &Block) -> Result<(), String> {
        let function = self.current_fn.ok_or("no current function")?;

        let cond_bb = self.context.append_basic_block(function, "while.cond");
        let body_bb = self.context.append_basic_block(function, "while.body");
        let end_bb = self.context.append_basic_block(function, "while.end");

        self.builder
            .build_unconditional_branch(cond_bb)
            .map_err(|e| format!("failed to build branch: {}", e))?;

        self.builder.position_at_end(cond_bb);
        let cond_val = self.compile_value(cond)?.into_int_value();
        self.builder
            .build_conditional_branch(cond_val, body_bb, end_bb)
            .map_err(|e| format!("failed to build branch: {}", e))?;

        self.builder.position_at_end(body_bb);
        // continue re-tests the condition, break leaves the loop.
        self.loop_stack.push((cond_bb, end_bb));
        let result = self.compile_block(body);
        self.loop_stack.pop();
        result?;

        if !self.block_terminated() {
            self.builder
                .build_unconditional_branch(cond_bb)
                .map_err(|e| format!("failed to build branch: {}", e))?;
        }

        self.builder.position_at_end(end_bb);
        Ok(())
    }

    fn compile_for(
        &mut self,
        var: &phi_ast::LoopVar,
        iter: &phi_ast::Expr,
        body: &Block,
    ) -> Result<(), String> {
        let function = self.current_fn.ok_or("no current function")?;
        let def = var.def.expect("unresolved loop variable");
        let elem_ty = var.ty.expect("untyped loop variable");
        let elem_llvm = self.llvm_type(elem_ty)?.into_int_type();
        let signed = matches!(
            self.sess.types.kind(elem_ty),
            TyKind::Builtin(b) if b.is_signed()
        );

        // Literal ranges keep their inclusivity; a range value that arrives
        // any other way is half-open.
        let (start_val, end_val, inclusive) = match &iter.kind {
            ExprKind::Range {
                start,
                end,
                inclusive,
            } => {
                let s = self.compile_value(start)?.into_int_value();
                let e = self.compile_value(end)?.into_int_value();
                (s, e, *inclusive)
            }
            _ => {
                let range_val = self.compile_value(iter)?.into_struct_value();
                let s = self
                    .builder
                    .build_extract_value(range_val, 0, "range.start")
                    .map_err(|e| format!("failed to read range: {}", e))?
                    .into_int_value();
                let e = self
                    .builder
                    .build_extract_value(range_val, 1, "range.end")
                    .map_err(|e| format!("failed to read range: {}", e))?
                    .into_int_value();
                let s = self.int_resize(s, elem_llvm, signed)?;
                let e = self.int_resize(e, elem_llvm, signed)?;
                (s, e, false)
            }
        };

        let slot = self
            .builder
            .build_alloca(elem_llvm, &var.name)
            .map_err(|e| format!("failed to alloca loop variable: {}", e))?;
        self.builder
            .build_store(slot, start_val)
            .map_err(|e| format!("failed to store loop variable: {}", e))?;
        self.locals.insert(def, slot);
        self.local_tys.insert(def, elem_ty);

        let cond_bb = self.context.append_basic_block(function, "for.cond");
        let body_bb = self.context.append_basic_block(function, "for.body");
        let inc_bb = self.context.append_basic_block(function, "for.inc");
        let end_bb = self.context.append_basic_block(function, "for.end");

        self.builder
            .build_unconditional_branch(cond_bb)
            .map_err(|e| format!("failed to build branch: {}", e))?;

        self.builder.position_at_end(cond_bb);
        let current = self
            .builder
            .build_load(elem_llvm, slot, &var.name)
            .map_err(|e| format!("failed to load loop variable: {}", e))?
            .into_int_value();
        let predicate = match (inclusive, signed) {
            (false, true) => IntPredicate::SLT,
            (false, false) => IntPredicate::ULT,
            (true, true) => IntPredicate::SLE,
            (true, false) => IntPredicate::ULE,
        };
        let keep_going = self
            .builder
            .build_int_compare(predicate, current, end_val, "for.cmp")
            .map_err(|e| format!("failed to build compare: {}", e))?;
        self.builder
            .build_conditional_branch(keep_going, body_bb, end_bb)
            .map_err(|e| format!("failed to build branch: {}", e))?;

        self.builder.position_at_end(body_bb);
        // continue still runs the increment.
        self.loop_stack.push((inc_bb, end_bb));
        let result = self.compile_block(body);
        self.loop_stack.pop();
        result?;
        if !self.block_terminated() {
            self.builder
                .build_unconditional_branch(inc_bb)
                .map_err(|e| format!("failed to build branch: {}", e))?;
        }

        self.builder.position_at_end(inc_bb);
        let current = self
            .builder
            .build_load(elem_llvm, slot, &var.name)
            .map_err(|e| format!("failed to load loop variable: {}", e))?
            .into_int_value();
        let one = elem_llvm.const_int(1, false);
        let next = self
            .builder
            .build_int_add(current, one, "for.next")
            .map_err(|e| format!("failed to build add: {}", e))?;
        self.builder
            .build_store(slot, next)
            .map_err(|e| format!("failed to store loop variable: {}", e))?;
        self.builder
            .build_unconditional_branch(cond_bb)
            .map_err(|e| format!("failed to build branch: {}", e))?;

        self.builder.position_at_end(end_bb);
        Ok(())
    }

    /// Adjust an integer value's width.
    pub(crate) fn int_resize(
        &self,
        value: inkwell::values::IntValue<'ctx>,
        target: inkwell::types::IntType<'ctx>,
        signed: bool,
    ) -> Result<inkwell::values::IntValue<'ctx>, String> {
        let from = value.get_type().get_bit_width();
        let to = target.get_bit_width();
        if from == to {
            Ok(value)
        } else if from < to {
            if signed {
                self.builder
                    .build_int_s_extend(value, target, "sext")
                    .map_err(|e| format!("failed to extend: {}", e))
            } else {
                self.builder
                    .build_int_z_extend(value, target, "zext")
                    .map_err(|e| format!("failed to extend: {}", e))
            }
        } else {
            self.builder
                .build_int_truncate(value, target, "trunc")
                .map_err(|e| format!("failed to truncate: {}", e))
        }
    }
}
