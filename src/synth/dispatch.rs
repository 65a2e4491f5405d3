//! Dispatch Synthesizer
//!
//! Body of one generated business method:
//!
//! ```text
//! rv = zero; s = context; failed = false
//! try {
//!     args = null | boxed arguments
//!     bean = (Impl) preInvoke(base, id, s, args)
//!     rv = bean.m(..) | unbox(container.invoke(s, null))
//! } catch (RuntimeException | RemoteException | application.. | any) {
//!     record on s; rethrow or wrap
//! } exit {
//!     try { postInvoke(base, id, s) } catch (any) { record; rethrow if nothing in flight }
//!     exit { if (failed) failureCleanup(s) }
//! }
//! return rv
//! ```

use super::hooks::{self, Hook};
use super::{boxed_args, forward_args, from_object, ExposedMethod};
use crate::consts::*;
use crate::ir::{BodyBuilder, Body, Cond, ExitRegion, Expr, Handler, LocalId, MethodDecl, Stmt, TryRegion};
use crate::model::{TypeRef, WrapperKind};

/// Where a generated method sends its call.
#[derive(Debug, Clone)]
pub struct DispatchSite<'a> {
    /// The unit being generated.
    pub unit: &'a str,
    pub kind: WrapperKind,
    /// Class the container hands back from pre-invoke.
    pub implementation: &'a str,
    /// Method called on the implementation.
    pub target: String,
    /// Use the stateless-create hook pair.
    pub stateless_create: bool,
}

pub fn dispatch_method(site: &DispatchSite<'_>, exposed: &ExposedMethod) -> MethodDecl {
    let m = &exposed.descriptor;
    let body = if exposed.policy.asynchronous {
        async_body(site, exposed)
    } else if site.kind == WrapperKind::ManagedComponent {
        managed_body(site, exposed)
    } else {
        standard_body(site, exposed)
    };
    log::debug!("dispatch {} -> {}.{} (id {})", m, site.implementation, site.target, exposed.id);
    let mut decl = MethodDecl::new(m.name.clone(), m.params.clone(), m.return_type.clone())
        .with_throws(m.exceptions.clone())
        .with_body(body);
    decl.dispatch_id = Some(exposed.id);
    decl
}

fn wrap_failure(failure: Expr, message: String, rmi_remote: bool) -> Expr {
    if rmi_remote {
        Expr::new_object(
            REMOTE_EXCEPTION,
            &[TypeRef::string(), TypeRef::new(THROWABLE)],
            vec![Expr::str(message), failure],
        )
    } else {
        let ejb = Expr::new_object(EJB_EXCEPTION, &[TypeRef::string()], vec![Expr::str(message)]);
        Expr::invoke_virtual(ejb, THROWABLE, "initCause", &[TypeRef::new(THROWABLE)], TypeRef::new(THROWABLE), vec![failure])
    }
}

fn direct_call(site: &DispatchSite<'_>, exposed: &ExposedMethod, bean: Expr) -> Expr {
    let m = &exposed.descriptor;
    Expr::invoke_virtual(
        bean,
        site.implementation,
        &site.target,
        &m.params,
        m.return_type.clone(),
        forward_args(m.params.len()),
    )
}

fn store_result(rv: Option<LocalId>, value: Expr) -> Stmt {
    match rv {
        Some(rv) => Stmt::Assign(rv, value),
        None => Stmt::Eval(value),
    }
}

fn standard_body(site: &DispatchSite<'_>, exposed: &ExposedMethod) -> Body {
    let m = &exposed.descriptor;
    let kind = site.kind;
    let endpoint = kind.is_endpoint();
    let (pre, post): (Hook, Hook) = if site.stateless_create {
        (hooks::PRE_INVOKE_STATELESS_CREATE, hooks::POST_INVOKE_STATELESS_CREATE)
    } else {
        (hooks::PRE_INVOKE, hooks::POST_INVOKE)
    };
    let record_unchecked = hooks::set_unchecked(exposed.rmi_remote);
    let base = || hooks::wrapper_base(kind, site.unit);
    let container = || hooks::container(kind, site.unit);
    let id = exposed.id as i32;

    let mut b = BodyBuilder::new();
    let rv = (!m.return_type.is_void()).then(|| b.local("rv", m.return_type.clone()));
    let s = b.local_of("s", DEPLOYED_SUPPORT);
    let failed = b.local_of("failed", "boolean");
    let args = b.local("args", TypeRef::array(OBJECT, 1));
    let bean = b.local_of("bean", site.implementation);
    let in_flight = b.local_of("inFlight", THROWABLE);
    let post_failure = b.local_of("postFailure", THROWABLE);

    let mut stmts = Vec::new();
    if let Some(rv) = rv {
        stmts.push(Stmt::Assign(rv, Expr::zero(&m.return_type)));
    }
    if endpoint {
        stmts.push(Stmt::Eval(hooks::CHECK_STATE.invoke(
            base(),
            vec![Expr::int(id), Expr::null(), Expr::int(hooks::MDB_BUSINESS_METHOD)],
        )));
        stmts.push(Stmt::Assign(s, hooks::endpoint_support(kind, site.unit)));
    } else {
        stmts.push(Stmt::Assign(s, Expr::new_object(DEPLOYED_SUPPORT, &[], vec![])));
    }
    stmts.push(Stmt::Assign(failed, Expr::bool(false)));

    // Arguments are only boxed for a consumer that reads them.
    let mut guarded = vec![Stmt::Assign(args, Expr::null())];
    if exposed.policy.interceptors {
        guarded.push(Stmt::Assign(args, boxed_args(&m.params)));
    } else if !m.params.is_empty() {
        guarded.push(Stmt::If {
            cond: Cond::True(hooks::NEEDS_ARGUMENTS.invoke(container(), vec![base()])),
            then: vec![Stmt::Assign(args, boxed_args(&m.params))],
            otherwise: vec![],
        });
    }
    let target = if endpoint {
        hooks::MDB_PRE_INVOKE.invoke(base(), vec![Expr::int(id), Expr::local(args)])
    } else {
        pre.invoke(container(), vec![base(), Expr::int(id), Expr::local(s), Expr::local(args)])
    };
    guarded.push(Stmt::Assign(bean, Expr::cast(TypeRef::new(site.implementation), target)));
    if exposed.policy.interceptors {
        let chain = hooks::INVOKE_CHAIN.invoke(container(), vec![Expr::local(s), Expr::null()]);
        guarded.push(match rv {
            Some(rv) => Stmt::Assign(rv, from_object(chain, &m.return_type)),
            None => Stmt::Eval(chain),
        });
    } else {
        guarded.push(store_result(rv, direct_call(site, exposed, Expr::local(bean))));
    }

    let message = format!("{m} failed");
    let record = |e: LocalId| Stmt::Eval(record_unchecked.invoke(Expr::local(s), vec![Expr::local(e)]));
    let mut handlers = Vec::new();
    if exposed.failures.system_unchecked {
        let e = b.local_of("runtimeFailure", RUNTIME_EXCEPTION);
        handlers.push(Handler {
            catch: Some(RUNTIME_EXCEPTION.to_string()),
            binding: e,
            body: vec![
                Stmt::Assign(failed, Expr::bool(true)),
                record(e),
                Stmt::Throw(wrap_failure(Expr::local(e), message.clone(), exposed.rmi_remote)),
            ],
        });
    }
    if exposed.failures.protocol_native {
        let e = b.local_of("remoteFailure", REMOTE_EXCEPTION);
        let rethrow = if exposed.rmi_remote {
            Expr::local(e)
        } else {
            wrap_failure(Expr::local(e), message.clone(), false)
        };
        handlers.push(Handler {
            catch: Some(REMOTE_EXCEPTION.to_string()),
            binding: e,
            body: vec![Stmt::Assign(failed, Expr::bool(true)), record(e), Stmt::Throw(rethrow)],
        });
    }
    for failure in &exposed.failures.application_checked {
        let e = b.local("applicationFailure", failure.clone());
        handlers.push(Handler {
            catch: Some(failure.name.clone()),
            binding: e,
            body: vec![
                Stmt::Eval(hooks::SET_CHECKED.invoke(Expr::local(s), vec![Expr::local(e)])),
                Stmt::Throw(Expr::local(e)),
            ],
        });
    }
    let any = b.local_of("failure", THROWABLE);
    handlers.push(Handler {
        catch: None,
        binding: any,
        body: vec![
            Stmt::Assign(failed, Expr::bool(true)),
            record(any),
            Stmt::Throw(wrap_failure(Expr::local(any), message, exposed.rmi_remote)),
        ],
    });

    let post_call = if endpoint {
        hooks::MDB_POST_INVOKE.invoke(base(), vec![])
    } else {
        post.invoke(container(), vec![base(), Expr::int(id), Expr::local(s)])
    };
    let exit = vec![Stmt::Try(TryRegion {
        body: vec![Stmt::Eval(post_call)],
        handlers: vec![Handler {
            catch: None,
            binding: post_failure,
            body: vec![
                record(post_failure),
                Stmt::If {
                    cond: Cond::Null(Expr::local(in_flight)),
                    then: vec![Stmt::Throw(Expr::local(post_failure))],
                    otherwise: vec![],
                },
            ],
        }],
        exit: Some(ExitRegion {
            in_flight: None,
            body: vec![Stmt::If {
                cond: Cond::True(Expr::local(failed)),
                then: vec![Stmt::Eval(hooks::FAILURE_CLEANUP.invoke(container(), vec![Expr::local(s)]))],
                otherwise: vec![],
            }],
        }),
    })];

    stmts.push(Stmt::Try(TryRegion {
        body: guarded,
        handlers,
        exit: Some(ExitRegion { in_flight: Some(in_flight), body: exit }),
    }));
    stmts.push(Stmt::Return(rv.map(Expr::local)));
    b.finish(stmts)
}

/// Asynchronous methods hand the boxed arguments to the container and
/// return its Future.
fn async_body(site: &DispatchSite<'_>, exposed: &ExposedMethod) -> Body {
    let m = &exposed.descriptor;
    let scheduled = hooks::SCHEDULE_ASYNC.invoke(
        hooks::container(site.kind, site.unit),
        vec![hooks::wrapper_base(site.kind, site.unit), Expr::int(exposed.id as i32), boxed_args(&m.params)],
    );
    let stmts = if m.return_type.is_void() {
        vec![Stmt::Eval(scheduled), Stmt::Return(None)]
    } else if m.return_type.is_class(FUTURE) {
        vec![Stmt::Return(Some(scheduled))]
    } else {
        vec![Stmt::Return(Some(Expr::cast(m.return_type.clone(), scheduled)))]
    };
    BodyBuilder::new().finish(stmts)
}

/// Managed beans have no post-invoke to pair with, so there is no region.
fn managed_body(site: &DispatchSite<'_>, exposed: &ExposedMethod) -> Body {
    let m = &exposed.descriptor;
    let bean_o = || Expr::field(site.unit, MANAGED_BEAN_O_FIELD, BEAN_O, Expr::This);
    let mut b = BodyBuilder::new();
    if !exposed.policy.interceptors {
        let bean = Expr::cast(TypeRef::new(site.implementation), hooks::GET_BEAN_INSTANCE.invoke(bean_o(), vec![]));
        let call = direct_call(site, exposed, bean);
        let stmts = if m.return_type.is_void() {
            vec![Stmt::Eval(call), Stmt::Return(None)]
        } else {
            vec![Stmt::Return(Some(call))]
        };
        return b.finish(stmts);
    }

    let s = b.local_of("s", DEPLOYED_SUPPORT);
    let args = b.local("args", TypeRef::array(OBJECT, 1));
    let container = || hooks::container(site.kind, site.unit);
    let chain = hooks::INVOKE_CHAIN.invoke(container(), vec![Expr::local(s), Expr::null()]);
    let mut stmts = vec![
        Stmt::Assign(s, Expr::new_object(DEPLOYED_SUPPORT, &[], vec![])),
        Stmt::Assign(args, boxed_args(&m.params)),
        Stmt::Eval(hooks::PRE_INVOKE_MANAGED_BEAN.invoke(
            container(),
            vec![
                hooks::wrapper_base(site.kind, site.unit),
                Expr::int(exposed.id as i32),
                Expr::local(s),
                bean_o(),
                Expr::local(args),
            ],
        )),
    ];
    if m.return_type.is_void() {
        stmts.push(Stmt::Eval(chain));
        stmts.push(Stmt::Return(None));
    } else {
        stmts.push(Stmt::Return(Some(from_object(chain, &m.return_type))));
    }
    b.finish(stmts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;
    use crate::ir::{check_unit, UnitDescription};
    use crate::model::{MethodDescriptor, MethodPolicy, TypeHierarchy};

    fn exposed(m: MethodDescriptor, policy: MethodPolicy, remote: bool) -> ExposedMethod {
        let failures = classify(&m.exceptions, remote);
        ExposedMethod { descriptor: m, id: 4, policy, failures, rmi_remote: remote }
    }

    fn site(kind: WrapperKind) -> DispatchSite<'static> {
        DispatchSite {
            unit: "acme.Account_LocalWrapper",
            kind,
            implementation: "acme.AccountBean",
            target: "deposit".to_string(),
            stateless_create: false,
        }
    }

    fn handler_types(decl: &MethodDecl) -> Vec<Option<String>> {
        let body = decl.body.as_ref().unwrap();
        body.stmts
            .iter()
            .find_map(|s| match s {
                Stmt::Try(region) => Some(region.handlers.iter().map(|h| h.catch.clone()).collect()),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn exception_root_gets_three_handlers_and_catch_all() {
        let m = MethodDescriptor::new("deposit").param("long").throws(EXCEPTION).owned_by("acme.Account");
        let decl = dispatch_method(&site(WrapperKind::ComponentRemote), &exposed(m, MethodPolicy::default(), true));
        assert_eq!(
            handler_types(&decl),
            vec![
                Some(RUNTIME_EXCEPTION.to_string()),
                Some(REMOTE_EXCEPTION.to_string()),
                Some(EXCEPTION.to_string()),
                None
            ]
        );
        let mut unit = UnitDescription::new("acme.Account_LocalWrapper", EJS_WRAPPER);
        unit.methods.push(decl);
        check_unit(&unit, TypeHierarchy::builtin()).unwrap();
    }

    #[test]
    fn asynchronous_method_has_no_region() {
        let m = MethodDescriptor::new("deposit").param("long");
        let policy = MethodPolicy { interceptors: false, asynchronous: true };
        let decl = dispatch_method(&site(WrapperKind::BusinessLocal), &exposed(m, policy, false));
        let body = decl.body.unwrap();
        assert!(!body.stmts.iter().any(|s| matches!(s, Stmt::Try(_))));
        assert_eq!(body.stmts.len(), 2);
    }

    #[test]
    fn managed_bean_without_interceptors_calls_instance_directly() {
        let m = MethodDescriptor::new("deposit").param("long").returns("long");
        let decl = dispatch_method(&site(WrapperKind::ManagedComponent), &exposed(m, MethodPolicy::default(), false));
        let body = decl.body.unwrap();
        assert!(body.locals.is_empty());
        assert!(matches!(body.stmts.as_slice(), [Stmt::Return(Some(Expr::Call(_)))]));
    }
}
