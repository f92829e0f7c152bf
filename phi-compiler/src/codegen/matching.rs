//! Match lowering.
//!
//! Two strategies. The fast path emits one LLVM `switch` when the scrutinee
//! is an integer or an enum and every arm is a single literal pattern, a
//! single variant pattern, or a trailing wildcard. Everything else takes
//! the slow path: a linear chain of test blocks, each branching to its arm
//! body or to the next test. Either way a merge block with a phi collects
//! the arm values; void matches skip the phi.

use inkwell::basic_block::BasicBlock;
use inkwell::values::{BasicValue, BasicValueEnum, IntValue, PointerValue};
use inkwell::IntPredicate;

use phi_ast::{BuiltinTy, Expr, ExprKind, MatchArm, PatternBinding, PatternKind, TyKind};

use super::{CodeGen, MonoAdt, MonoVariant};

impl<'ctx, 'a> CodeGen<'ctx, 'a> {
    pub(crate) fn compile_match(
        &mut self,
        e: &Expr,
        scrutinee: &Expr,
        arms: &[MatchArm],
    ) -> Result<Option<BasicValueEnum<'ctx>>, String> {
        if arms.is_empty() {
            return Err("match expression has no arms".to_string());
        }
        let function = self.current_fn.ok_or("no current function")?;

        let result_ty = e.ty.expect("untyped match");
        let produces_value = !self.sess.types.is_builtin(result_ty, BuiltinTy::Null);

        let scrut_ty = scrutinee.ty.expect("untyped scrutinee");
        let scrut_val = self.compile_value(scrutinee)?;

        // Enum scrutinees get a stack slot so variant arms can read the
        // payload through it.
        let enum_info = if self.is_enum_ty(scrut_ty) {
            let (def, args) = self.adt_parts(scrut_ty).expect("enum type");
            let mangled = self.mangle_adt(def, &args);
            let slot = self
                .builder
                .build_alloca(self.struct_types[&mangled], "match.scrut")
                .map_err(|e| format!("failed to alloca scrutinee: {}", e))?;
            self.builder
                .build_store(slot, scrut_val)
                .map_err(|e| format!("failed to store scrutinee: {}", e))?;
            Some((mangled, slot))
        } else {
            None
        };

        let is_int_scrut = matches!(
            self.sess.types.kind(scrut_ty),
            TyKind::Builtin(b) if b.is_integer()
        );

        let merge_bb = self.context.append_basic_block(function, "match.end");
        let mut incoming: Vec<(BasicValueEnum<'ctx>, BasicBlock<'ctx>)> = Vec::new();

        if self.switchable(arms, is_int_scrut, enum_info.is_some()) {
            self.compile_switch_match(
                arms,
                scrut_val,
                &enum_info,
                merge_bb,
                &mut incoming,
            )?;
        } else {
            self.compile_linear_match(
                arms,
                scrut_val,
                scrutinee,
                &enum_info,
                merge_bb,
                &mut incoming,
            )?;
        }

        self.builder.position_at_end(merge_bb);
        if !produces_value {
            return Ok(None);
        }
        if incoming.is_empty() {
            // Every arm diverged; the merge block is unreachable.
            self.builder
                .build_unreachable()
                .map_err(|e| format!("failed to build unreachable: {}", e))?;
            return Ok(None);
        }
        let phi = self
            .builder
            .build_phi(self.llvm_type(result_ty)?, "match.result")
            .map_err(|e| format!("failed to build phi: {}", e))?;
        let refs: Vec<(&dyn BasicValue<'ctx>, BasicBlock<'ctx>)> = incoming
            .iter()
            .map(|(v, b)| (v as &dyn BasicValue<'ctx>, *b))
            .collect();
        phi.add_incoming(&refs);
        Ok(Some(phi.as_basic_value()))
    }

    /// Fast-path applicability: integer scrutinee with single integer
    /// literal patterns, or enum scrutinee with single variant patterns; a
    /// wildcard is allowed only as the trailing arm.
    fn switchable(&self, arms: &[MatchArm], is_int: bool, is_enum: bool) -> bool {
        if !is_int && !is_enum {
            return false;
        }
        for (i, arm) in arms.iter().enumerate() {
            if arm.patterns.len() != 1 {
                return false;
            }
            match &arm.patterns[0].kind {
                PatternKind::Wildcard => {
                    if i + 1 != arms.len() {
                        return false;
                    }
                }
                PatternKind::Literal(lit) => {
                    if !is_int || !matches!(lit.kind, ExprKind::IntLit(_)) {
                        return false;
                    }
                }
                PatternKind::Variant { .. } => {
                    if !is_enum {
                        return false;
                    }
                }
            }
        }
        true
    }

    fn compile_switch_match(
        &mut self,
        arms: &[MatchArm],
        scrut_val: BasicValueEnum<'ctx>,
        enum_info: &Option<(String, PointerValue<'ctx>)>,
        merge_bb: BasicBlock<'ctx>,
        incoming: &mut Vec<(BasicValueEnum<'ctx>, BasicBlock<'ctx>)>,
    ) -> Result<(), String> {
        let function = self.current_fn.ok_or("no current function")?;

        // The switch operand: the integer itself, or the discriminant.
        let switch_val: IntValue = match enum_info {
            Some(_) => self
                .builder
                .build_extract_value(scrut_val.into_struct_value(), 0, "match.disc")
                .map_err(|e| format!("failed to read discriminant: {}", e))?
                .into_int_value(),
            None => scrut_val.into_int_value(),
        };

        let mut arm_blocks = Vec::with_capacity(arms.len());
        for i in 0..arms.len() {
            arm_blocks.push(
                self.context
                    .append_basic_block(function, &format!("match.arm.{}", i)),
            );
        }

        let mut default_bb = None;
        let mut cases: Vec<(IntValue<'ctx>, BasicBlock<'ctx>)> = Vec::new();
        let mut seen_values = Vec::new();
        // An arm shadowed by an earlier equal case never runs; its block
        // must not feed the merge phi.
        let mut reachable = vec![true; arms.len()];
        for (i, (arm, block)) in arms.iter().zip(&arm_blocks).enumerate() {
            match &arm.patterns[0].kind {
                PatternKind::Wildcard => default_bb = Some(*block),
                PatternKind::Literal(lit) => {
                    let ExprKind::IntLit(value) = lit.kind else {
                        unreachable!("switchable() admits only integer literals");
                    };
                    // The first arm wins on duplicate case values.
                    if seen_values.contains(&value) {
                        reachable[i] = false;
                        continue;
                    }
                    seen_values.push(value);
                    let case = switch_val.get_type().const_int(value as u64, true);
                    cases.push((case, *block));
                }
                PatternKind::Variant { variant_index, .. } => {
                    let index = variant_index.expect("unresolved variant pattern") as i64;
                    if seen_values.contains(&index) {
                        reachable[i] = false;
                        continue;
                    }
                    seen_values.push(index);
                    let case = self.context.i32_type().const_int(index as u64, false);
                    cases.push((case, *block));
                }
            }
        }

        // Without a wildcard, an unmatched value is a compiler-proven
        // impossibility; the default traps as unreachable.
        let origin = self
            .builder
            .get_insert_block()
            .ok_or("builder is not positioned")?;
        let default = match default_bb {
            Some(block) => block,
            None => {
                let fail = self.context.append_basic_block(function, "match.fail");
                self.builder.position_at_end(fail);
                self.builder
                    .build_unreachable()
                    .map_err(|e| format!("failed to build unreachable: {}", e))?;
                fail
            }
        };

        self.builder.position_at_end(origin);
        self.builder
            .build_switch(switch_val, default, &cases)
            .map_err(|e| format!("failed to build switch: {}", e))?;

        for (i, (arm, block)) in arms.iter().zip(&arm_blocks).enumerate() {
            self.builder.position_at_end(*block);
            if !reachable[i] {
                self.builder
                    .build_unreachable()
                    .map_err(|e| format!("failed to build unreachable: {}", e))?;
                continue;
            }
            if let PatternKind::Variant {
                bindings,
                variant_index,
                ..
            } = &arm.patterns[0].kind
            {
                let (mangled, slot) = enum_info.as_ref().expect("variant arm without enum");
                let variant =
                    self.enum_variant(mangled, variant_index.expect("unresolved variant"))?;
                self.bind_variant_payload(*slot, mangled, &variant, bindings)?;
            }
            let value = self.compile_block(&arm.body)?;
            if !self.block_terminated() {
                if let Some(value) = value {
                    let end = self
                        .builder
                        .get_insert_block()
                        .ok_or("builder is not positioned")?;
                    incoming.push((value, end));
                }
                self.builder
                    .build_unconditional_branch(merge_bb)
                    .map_err(|e| format!("failed to build branch: {}", e))?;
            }
        }
        Ok(())
    }

    fn compile_linear_match(
        &mut self,
        arms: &[MatchArm],
        scrut_val: BasicValueEnum<'ctx>,
        scrutinee: &Expr,
        enum_info: &Option<(String, PointerValue<'ctx>)>,
        merge_bb: BasicBlock<'ctx>,
        incoming: &mut Vec<(BasicValueEnum<'ctx>, BasicBlock<'ctx>)>,
    ) -> Result<(), String> {
        let function = self.current_fn.ok_or("no current function")?;
        let scrut_ty = scrutinee.ty.expect("untyped scrutinee");

        for (i, arm) in arms.iter().enumerate() {
            let body_bb = self
                .context
                .append_basic_block(function, &format!("match.arm.{}", i));
            let next_bb = self
                .context
                .append_basic_block(function, &format!("match.test.{}", i + 1));

            // Alternations are rejected by the checker; the first pattern
            // is the arm's pattern.
            let pattern = &arm.patterns[0];
            match &pattern.kind {
                PatternKind::Wildcard => {
                    self.builder
                        .build_unconditional_branch(body_bb)
                        .map_err(|e| format!("failed to build branch: {}", e))?;
                }
                PatternKind::Literal(lit) => {
                    let lit_val = self.compile_value(lit)?;
                    let matched = self
                        .compile_binop_values(phi_ast::BinOp::Eq, scrut_ty, scrut_val, lit_val)?
                        .into_int_value();
                    self.builder
                        .build_conditional_branch(matched, body_bb, next_bb)
                        .map_err(|e| format!("failed to build branch: {}", e))?;
                }
                PatternKind::Variant { variant_index, .. } => {
                    let index = variant_index.expect("unresolved variant pattern");
                    let disc = self
                        .builder
                        .build_extract_value(scrut_val.into_struct_value(), 0, "match.disc")
                        .map_err(|e| format!("failed to read discriminant: {}", e))?
                        .into_int_value();
                    let expected = self.context.i32_type().const_int(index as u64, false);
                    let matched = self
                        .builder
                        .build_int_compare(IntPredicate::EQ, disc, expected, "match.cmp")
                        .map_err(|e| format!("failed to build compare: {}", e))?;
                    self.builder
                        .build_conditional_branch(matched, body_bb, next_bb)
                        .map_err(|e| format!("failed to build branch: {}", e))?;
                }
            }

            self.builder.position_at_end(body_bb);
            if let PatternKind::Variant {
                bindings,
                variant_index,
                ..
            } = &pattern.kind
            {
                let (mangled, slot) = enum_info
                    .as_ref()
                    .ok_or("variant pattern on a non-enum scrutinee")?;
                let variant =
                    self.enum_variant(mangled, variant_index.expect("unresolved variant"))?;
                self.bind_variant_payload(*slot, mangled, &variant, bindings)?;
            }
            let value = self.compile_block(&arm.body)?;
            if !self.block_terminated() {
                if let Some(value) = value {
                    let end = self
                        .builder
                        .get_insert_block()
                        .ok_or("builder is not positioned")?;
                    incoming.push((value, end));
                }
                self.builder
                    .build_unconditional_branch(merge_bb)
                    .map_err(|e| format!("failed to build branch: {}", e))?;
            }

            self.builder.position_at_end(next_bb);
        }

        // Fell off the last test: no pattern matched.
        self.builder
            .build_unreachable()
            .map_err(|e| format!("failed to build unreachable: {}", e))?;
        Ok(())
    }

    fn enum_variant(&self, mangled: &str, index: usize) -> Result<MonoVariant, String> {
        match &self.layouts[mangled] {
            MonoAdt::Enum { variants, .. } => Ok(variants[index].clone()),
            MonoAdt::Struct { .. } => Err(format!("`{}` is not an enum", mangled)),
        }
    }

    /// Load a matched variant's payload into freshly allocated local slots
    /// for the arm's bindings.
    fn bind_variant_payload(
        &mut self,
        scrut_slot: PointerValue<'ctx>,
        mangled: &str,
        variant: &MonoVariant,
        bindings: &[PatternBinding],
    ) -> Result<(), String> {
        if bindings.is_empty() {
            return Ok(());
        }
        let st = self.struct_types[mangled];
        let payload_ptr = self
            .builder
            .build_struct_gep(st, scrut_slot, 1, "match.payload")
            .map_err(|e| format!("failed to access payload: {}", e))?;
        let payload_st = self.payload_struct(&variant.payload)?;

        for (i, binding) in bindings.iter().enumerate() {
            let def = binding.def.expect("unresolved pattern binding");
            let ty = binding.ty.expect("untyped pattern binding");
            let llty = self.llvm_type(ty)?;

            let field_ptr = self
                .builder
                .build_struct_gep(payload_st, payload_ptr, i as u32, &binding.name)
                .map_err(|e| format!("failed to access payload: {}", e))?;
            let loaded = self
                .builder
                .build_load(llty, field_ptr, &binding.name)
                .map_err(|e| format!("failed to load payload: {}", e))?;
            // The slot is an i8 array; byte alignment keeps the load valid.
            if let Some(inst) = loaded.as_instruction_value() {
                let _ = inst.set_alignment(1);
            }

            let slot = self
                .builder
                .build_alloca(llty, &binding.name)
                .map_err(|e| format!("failed to alloca binding: {}", e))?;
            self.builder
                .build_store(slot, loaded)
                .map_err(|e| format!("failed to store binding: {}", e))?;
            self.locals.insert(def, slot);
            self.local_tys.insert(def, ty);
        }
        Ok(())
    }
}
