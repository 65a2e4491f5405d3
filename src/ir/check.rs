//! Pre-emission structural check of unit descriptions

use super::{Cond, Expr, MethodDecl, Stmt, UnitDescription};
use crate::error::{Error, Result};
use crate::model::TypeHierarchy;

struct Scope<'a> {
    method: &'a MethodDecl,
    locals: usize,
    hierarchy: &'a TypeHierarchy,
}

/// Reject descriptions the emitter would turn into malformed code:
/// dangling locals or arguments, unreachable handlers, mismatched returns
/// and non-void bodies that can fall off the end.
pub fn check_unit(unit: &UnitDescription, hierarchy: &TypeHierarchy) -> Result<()> {
    for method in &unit.methods {
        let Some(body) = &method.body else { continue };
        let scope = Scope { method, locals: body.locals.len(), hierarchy };
        check_stmts(&body.stmts, &scope).map_err(|msg| Error::structural(&unit.name, &method.name, msg))?;
        if !method.ret.is_void() && !terminates(&body.stmts) {
            return Err(Error::structural(&unit.name, &method.name, "non-void body can complete normally"));
        }
    }
    Ok(())
}

/// True when control cannot fall off the end of `stmts`.
pub fn terminates(stmts: &[Stmt]) -> bool {
    match stmts.last() {
        Some(Stmt::Return(_)) | Some(Stmt::Throw(_)) => true,
        Some(Stmt::If { then, otherwise, .. }) => terminates(then) && terminates(otherwise),
        Some(Stmt::Switch { cases, default, .. }) => {
            terminates(default) && cases.iter().all(|(_, body)| terminates(body))
        }
        Some(Stmt::Try(region)) => {
            let exit_ends = region.exit.as_ref().map(|e| terminates(&e.body)).unwrap_or(false);
            exit_ends || (terminates(&region.body) && region.handlers.iter().all(|h| terminates(&h.body)))
        }
        _ => false,
    }
}

fn check_stmts(stmts: &[Stmt], scope: &Scope<'_>) -> std::result::Result<(), String> {
    for stmt in stmts {
        match stmt {
            Stmt::Assign(id, expr) => {
                check_local(*id, scope)?;
                check_expr(expr, scope)?;
            }
            Stmt::SetField { target, value, .. } => {
                check_expr(target, scope)?;
                check_expr(value, scope)?;
            }
            Stmt::Eval(expr) | Stmt::Throw(expr) => check_expr(expr, scope)?,
            Stmt::If { cond, then, otherwise } => {
                match cond {
                    Cond::True(e) | Cond::False(e) | Cond::Null(e) | Cond::NotNull(e) | Cond::InstanceOf(e, _) => {
                        check_expr(e, scope)?
                    }
                    Cond::Same(a, b) => {
                        check_expr(a, scope)?;
                        check_expr(b, scope)?;
                    }
                }
                check_stmts(then, scope)?;
                check_stmts(otherwise, scope)?;
            }
            Stmt::Switch { key, cases, default } => {
                check_expr(key, scope)?;
                let mut keys: Vec<i32> = cases.iter().map(|(k, _)| *k).collect();
                keys.sort_unstable();
                if keys.windows(2).any(|w| w[0] == w[1]) {
                    return Err("duplicate switch key".to_string());
                }
                for (_, body) in cases {
                    check_stmts(body, scope)?;
                }
                check_stmts(default, scope)?;
            }
            Stmt::Return(value) => {
                match (value, scope.method.ret.is_void()) {
                    (Some(_), true) => return Err("value returned from void method".to_string()),
                    (None, false) => return Err("missing return value".to_string()),
                    _ => {}
                }
                if let Some(e) = value {
                    check_expr(e, scope)?;
                }
            }
            Stmt::Try(region) => {
                if region.handlers.is_empty() && region.exit.is_none() {
                    return Err("try region without handlers or exit region".to_string());
                }
                check_stmts(&region.body, scope)?;
                for (k, handler) in region.handlers.iter().enumerate() {
                    check_local(handler.binding, scope)?;
                    let earlier = &region.handlers[..k];
                    match &handler.catch {
                        None if k + 1 != region.handlers.len() => {
                            return Err("catch-all handler must be last".to_string())
                        }
                        None => {}
                        Some(ty) if ty.is_empty() => return Err("handler with empty catch type".to_string()),
                        Some(ty) => {
                            if let Some(prev) = earlier
                                .iter()
                                .filter_map(|h| h.catch.as_deref())
                                .find(|prev| scope.hierarchy.is_subtype(ty, prev))
                            {
                                return Err(format!("handler for {ty} unreachable after handler for {prev}"));
                            }
                        }
                    }
                    check_stmts(&handler.body, scope)?;
                }
                if let Some(exit) = &region.exit {
                    if let Some(id) = exit.in_flight {
                        check_local(id, scope)?;
                    }
                    check_stmts(&exit.body, scope)?;
                }
            }
        }
    }
    Ok(())
}

fn check_local(id: usize, scope: &Scope<'_>) -> std::result::Result<(), String> {
    if id >= scope.locals {
        return Err(format!("local #{id} is not declared"));
    }
    Ok(())
}

fn check_expr(expr: &Expr, scope: &Scope<'_>) -> std::result::Result<(), String> {
    match expr {
        Expr::Const(_) | Expr::ClassLiteral(_) => Ok(()),
        Expr::Local(id) => check_local(*id, scope),
        Expr::This if scope.method.is_static() => Err("'this' used in static method".to_string()),
        Expr::This => Ok(()),
        Expr::Arg(i) if *i >= scope.method.params.len() => Err(format!("argument #{i} out of range")),
        Expr::Arg(_) => Ok(()),
        Expr::GetField { target, .. } => check_expr(target, scope),
        Expr::New { params, args, .. } => {
            if params.len() != args.len() {
                return Err("constructor arity mismatch".to_string());
            }
            args.iter().try_for_each(|a| check_expr(a, scope))
        }
        Expr::NewArray(element, items) => {
            if element.primitive().is_some() || element.is_void() {
                return Err(format!("array of {element} cannot be built element-wise"));
            }
            items.iter().try_for_each(|a| check_expr(a, scope))
        }
        Expr::Index(array, index) => {
            if *index < 0 {
                return Err(format!("negative array index {index}"));
            }
            check_expr(array, scope)
        }
        Expr::Box(inner) | Expr::Unbox(_, inner) | Expr::Cast(_, inner) => check_expr(inner, scope),
        Expr::Call(call) => {
            if call.params.len() != call.args.len() {
                return Err(format!("call to {} with {} argument(s), expected {}", call.name, call.args.len(), call.params.len()));
            }
            if let Some(r) = &call.receiver {
                check_expr(r, scope)?;
            }
            call.args.iter().try_for_each(|a| check_expr(a, scope))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts;
    use crate::ir::{BodyBuilder, Handler, TryRegion};
    use crate::model::TypeRef;

    fn unit_with(body_stmts: impl FnOnce(&mut BodyBuilder) -> Vec<Stmt>, ret: TypeRef) -> UnitDescription {
        let mut b = BodyBuilder::new();
        let stmts = body_stmts(&mut b);
        let mut unit = UnitDescription::new("acme.W", consts::OBJECT);
        unit.methods.push(MethodDecl::new("m", vec![], ret).with_body(b.finish(stmts)));
        unit
    }

    #[test]
    fn shadowed_handler_is_rejected() {
        let unit = unit_with(
            |b| {
                let e = b.local_of("e", consts::THROWABLE);
                vec![Stmt::Try(TryRegion {
                    body: vec![],
                    handlers: vec![
                        Handler { catch: Some(consts::EXCEPTION.into()), binding: e, body: vec![] },
                        Handler { catch: Some(consts::CREATE_EXCEPTION.into()), binding: e, body: vec![] },
                    ],
                    exit: None,
                })]
            },
            TypeRef::void(),
        );
        let err = check_unit(&unit, TypeHierarchy::builtin()).unwrap_err().to_string();
        assert!(err.contains("unreachable"), "{err}");
    }

    #[test]
    fn non_void_fall_through_is_rejected() {
        let unit = unit_with(|_| vec![Stmt::Eval(Expr::int(1))], TypeRef::new("int"));
        assert!(check_unit(&unit, TypeHierarchy::builtin()).is_err());
    }

    #[test]
    fn undeclared_local_is_rejected() {
        let unit = unit_with(|_| vec![Stmt::Return(Some(Expr::local(3)))], TypeRef::new("int"));
        let err = check_unit(&unit, TypeHierarchy::builtin()).unwrap_err().to_string();
        assert!(err.contains("local #3"), "{err}");
    }
}
