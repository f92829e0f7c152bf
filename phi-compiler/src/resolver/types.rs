//! Resolution of type references appearing in signatures, annotations, and
//! explicit type-argument lists.

use phi_ast::{BuiltinTy, TypeExpr, TypeExprKind, TypeRes};
use phi_diagnostics::{codes, Diagnostic};

use super::NameResolver;
use crate::defs::DefKind;
use crate::symbols::Namespace;

impl<'a> NameResolver<'a> {
    pub(crate) fn resolve_type(&mut self, ty: &mut TypeExpr) {
        match &mut ty.kind {
            TypeExprKind::Named { name, args } => {
                for arg in args.iter_mut() {
                    self.resolve_type(arg);
                }
                let arg_count = args.len();
                let loc = ty.loc;

                if let Some(prim) = BuiltinTy::from_name(name) {
                    if arg_count != 0 {
                        let span = self.span(loc);
                        self.diags.emit(Diagnostic::error(
                            codes::ARGUMENT_COUNT,
                            format!("primitive type `{}` takes no type arguments", name),
                            span,
                        ));
                    }
                    ty.res = Some(TypeRes::Prim(prim));
                    return;
                }

                if name == "range" {
                    if arg_count != 1 {
                        let span = self.span(loc);
                        self.diags.emit(Diagnostic::error(
                            codes::ARGUMENT_COUNT,
                            format!("`range` takes 1 type argument, got {}", arg_count),
                            span,
                        ));
                    }
                    ty.res = Some(TypeRes::Range);
                    return;
                }

                if let Some(def) = self.symbols.lookup(Namespace::TypeParams, name) {
                    if arg_count != 0 {
                        let span = self.span(loc);
                        self.diags.emit(Diagnostic::error(
                            codes::ARGUMENT_COUNT,
                            format!("type parameter `{}` takes no type arguments", name),
                            span,
                        ));
                    }
                    ty.res = Some(TypeRes::TypeParam(def));
                    return;
                }

                if let Some(def) = self.symbols.lookup(Namespace::Adts, name) {
                    let expected = match self.defs.kind(def) {
                        DefKind::Struct { type_params } | DefKind::Enum { type_params } => {
                            *type_params
                        }
                        _ => 0,
                    };
                    if arg_count != expected {
                        let span = self.span(loc);
                        self.diags.emit(Diagnostic::error(
                            codes::ARGUMENT_COUNT,
                            format!(
                                "`{}` takes {} type argument{}, got {}",
                                name,
                                expected,
                                if expected == 1 { "" } else { "s" },
                                arg_count
                            ),
                            span,
                        ));
                    }
                    ty.res = Some(TypeRes::Adt(def));
                    return;
                }

                let suggestion = self.symbols.suggest_type(name);
                let span = self.span(loc);
                self.diags.unknown_type(name, span, suggestion);
            }
            TypeExprKind::Tuple(elems) => {
                for elem in elems {
                    self.resolve_type(elem);
                }
            }
            TypeExprKind::Array(elem) => self.resolve_type(elem),
            TypeExprKind::Ptr(inner) | TypeExprKind::Ref(inner) => self.resolve_type(inner),
            TypeExprKind::Fun { params, ret } => {
                for p in params {
                    self.resolve_type(p);
                }
                self.resolve_type(ret);
            }
        }
    }
}
