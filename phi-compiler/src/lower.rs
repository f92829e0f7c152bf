//! Lowering of resolved type references into the interned arena.
//!
//! Used by the checker (type parameters stay rigid) and by the code
//! generator (type parameters are substituted through `map`).

use std::collections::HashMap;

use phi_ast::{DefId, TyId, TyKind, TypeExpr, TypeExprKind, TypeInterner, TypeRes};

pub fn lower_type_expr(
    types: &TypeInterner,
    t: &TypeExpr,
    map: &HashMap<DefId, TyId>,
) -> TyId {
    match &t.kind {
        TypeExprKind::Named { args, .. } => {
            match t.res.expect("unresolved type reference survived resolution") {
                TypeRes::Prim(b) => types.builtin(b),
                TypeRes::Range => {
                    let elem = lower_type_expr(types, &args[0], map);
                    types.intern(TyKind::Range(elem))
                }
                TypeRes::Adt(def) => {
                    if args.is_empty() {
                        types.intern(TyKind::Adt(def))
                    } else {
                        let args = args
                            .iter()
                            .map(|a| lower_type_expr(types, a, map))
                            .collect();
                        types.intern(TyKind::Applied { def, args })
                    }
                }
                TypeRes::TypeParam(def) => match map.get(&def) {
                    Some(ty) => *ty,
                    None => types.intern(TyKind::Generic(def)),
                },
            }
        }
        TypeExprKind::Tuple(elems) => {
            let elems = elems
                .iter()
                .map(|e| lower_type_expr(types, e, map))
                .collect();
            types.intern(TyKind::Tuple(elems))
        }
        TypeExprKind::Array(elem) => {
            let elem = lower_type_expr(types, elem, map);
            types.intern(TyKind::Array(elem))
        }
        TypeExprKind::Ptr(inner) => {
            let inner = lower_type_expr(types, inner, map);
            types.intern(TyKind::Ptr(inner))
        }
        TypeExprKind::Ref(inner) => {
            let inner = lower_type_expr(types, inner, map);
            types.intern(TyKind::Ref(inner))
        }
        TypeExprKind::Fun { params, ret } => {
            let params = params
                .iter()
                .map(|p| lower_type_expr(types, p, map))
                .collect();
            let ret = lower_type_expr(types, ret, map);
            types.intern(TyKind::Fun { params, ret })
        }
    }
}
