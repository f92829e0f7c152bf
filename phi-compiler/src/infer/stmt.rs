//! Inference rules for statements and blocks.

use std::collections::HashMap;

use phi_ast::{Block, Stmt};

use super::monotype::{Domain, Monotype};
use super::{IResult, Inferencer};

impl<'a> Inferencer<'a> {
    /// Infer a block; the result is the trailing expression's type, or
    /// `null` when there is none.
    pub(crate) fn infer_block(&mut self, block: &mut Block) -> IResult<Monotype> {
        for stmt in &mut block.stmts {
            self.infer_stmt(stmt)?;
        }
        match &mut block.tail {
            Some(tail) => self.infer_expr(tail),
            None => Ok(Monotype::null()),
        }
    }

    fn infer_stmt(&mut self, stmt: &mut Stmt) -> IResult<()> {
        match stmt {
            Stmt::Let(var) => {
                let declared = var
                    .annotation
                    .as_ref()
                    .map(|t| self.lower_type(t, &HashMap::new()));
                let init_t = match &mut var.init {
                    Some(init) => Some(self.infer_expr(init)?),
                    None => None,
                };

                let t = match (declared, init_t) {
                    (Some(declared), Some(found)) => {
                        let loc = var.init.as_ref().map(|i| i.loc).unwrap_or(var.loc);
                        self.unify_at(&found, &declared, loc)?;
                        declared
                    }
                    (Some(declared), None) => declared,
                    (None, Some(found)) => found,
                    (None, None) => Monotype::Var(self.vars.fresh(Domain::Any)),
                };

                let def = var.def.expect("unresolved let binding");
                self.locals.insert(def, t.clone());
                self.env.insert_mono(def, t);
                Ok(())
            }

            Stmt::Assign { target, value } => {
                let target_t = self.infer_expr(target)?;
                let value_t = self.infer_expr(value)?;
                self.unify_at(&value_t, &target_t, value.loc)
            }

            Stmt::CompoundAssign { target, op, value } => {
                let domain = if op.is_bitwise() { Domain::Int } else { Domain::Num };
                let alpha = Monotype::Var(self.vars.fresh(domain));
                let target_t = self.infer_expr(target)?;
                self.unify_at(&target_t, &alpha, target.loc)?;
                let value_t = self.infer_expr(value)?;
                self.unify_at(&value_t, &alpha, value.loc)
            }

            Stmt::Return { value, loc } => {
                let found = match value {
                    Some(value) => self.infer_expr(value)?,
                    None => Monotype::null(),
                };
                let expected = self.current_ret.clone();
                let loc = value.as_ref().map(|v| v.loc).unwrap_or(*loc);
                self.unify_at(&found, &expected, loc)
            }

            Stmt::Break { .. } | Stmt::Continue { .. } => Ok(()),

            Stmt::Defer(expr) => {
                self.infer_expr(expr)?;
                Ok(())
            }

            Stmt::If {
                cond,
                then_block,
                else_block,
            } => {
                let cond_t = self.infer_expr(cond)?;
                self.unify_at(&cond_t, &Monotype::bool(), cond.loc)?;
                self.infer_block(then_block)?;
                if let Some(else_block) = else_block {
                    self.infer_block(else_block)?;
                }
                Ok(())
            }

            Stmt::While { cond, body } => {
                let cond_t = self.infer_expr(cond)?;
                self.unify_at(&cond_t, &Monotype::bool(), cond.loc)?;
                self.infer_block(body)?;
                Ok(())
            }

            Stmt::For { var, iter, body } => {
                // The loop variable takes the range's element type.
                let elem = Monotype::Var(self.vars.fresh(Domain::Int));
                let iter_t = self.infer_expr(iter)?;
                self.unify_at(&iter_t, &Monotype::Range(Box::new(elem.clone())), iter.loc)?;

                let def = var.def.expect("unresolved loop variable");
                self.locals.insert(def, elem.clone());
                self.env.insert_mono(def, elem);

                self.infer_block(body)?;
                Ok(())
            }

            Stmt::Expr(expr) => {
                self.infer_expr(expr)?;
                Ok(())
            }
        }
    }
}
