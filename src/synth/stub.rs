//! Client-side stub of a remote interface
//!
//! Each method picks one of two paths:
//!
//! - remote: marshal the arguments onto a request, invoke, unmarshal the
//!   reply; an application failure reply is matched by repository id
//!   against the declared application failures, in classification order;
//! - local (colocated servant): call the servant directly, copying the
//!   by-value arguments, the result and any failure so that the caller
//!   observes the same values as through the marshalled path.

use super::marshal::{self, needs_copy};
use super::{constructor, forward_args, from_object, ExposedMethod};
use crate::consts::*;
use crate::ir::{BodyBuilder, Cond, ExitRegion, Expr, Handler, MethodDecl, Stmt, TryRegion, UnitDescription};
use crate::model::{InterfaceDescriptor, MethodDescriptor, TypeHierarchy, TypeRef};
use crate::naming::{repository_id, rmi_repository_id, WireName};

fn object_impl(name: &str, params: &[TypeRef], ret: TypeRef, args: Vec<Expr>) -> Expr {
    Expr::invoke_virtual(Expr::This, OBJECT_IMPL, name, params, ret, args)
}

fn orb() -> Expr {
    object_impl("_orb", &[], TypeRef::new(ORB), vec![])
}

/// `String[]` returned by `_ids()`: the interface and the remote
/// interfaces it extends.
pub fn type_ids(iface: &InterfaceDescriptor, h: &TypeHierarchy) -> Vec<String> {
    let mut ids = vec![rmi_repository_id(&iface.name)];
    for parent in &iface.extends {
        if parent != REMOTE && h.is_remote_interface(parent) {
            ids.push(rmi_repository_id(parent));
        }
    }
    ids
}

/// Method returning the unit's type ids.
pub fn ids_method(ids: &[String]) -> MethodDecl {
    let array = Expr::NewArray(TypeRef::string(), ids.iter().map(|id| Expr::str(id.clone())).collect());
    MethodDecl::new("_ids", vec![], TypeRef::array(STRING, 1))
        .with_body(BodyBuilder::new().finish(vec![Stmt::Return(Some(array))]))
}

pub fn build_stub(
    name: &str,
    iface: &InterfaceDescriptor,
    methods: &[(ExposedMethod, WireName)],
    h: &TypeHierarchy,
) -> UnitDescription {
    let mut unit = UnitDescription::new(name, CORBA_STUB);
    unit.interfaces.push(iface.name.clone());
    unit.methods.push(constructor(CORBA_STUB));
    unit.methods.push(ids_method(&type_ids(iface, h)));
    for (m, wire) in methods {
        let decl = stub_method(name, &iface.name, m, wire.as_str(), h);
        log::debug!("stub {}.{} as '{}'", name, decl.name, wire);
        unit.methods.push(decl);
    }
    unit
}

/// `this.m(args)`: start over after a remarshal or a vanished servant.
fn retry(unit: &str, d: &MethodDescriptor) -> Vec<Stmt> {
    let call = Expr::invoke_virtual(
        Expr::This,
        unit,
        &d.name,
        &d.params,
        d.return_type.clone(),
        forward_args(d.params.len()),
    );
    if d.return_type.is_void() {
        vec![Stmt::Eval(call), Stmt::Return(None)]
    } else {
        vec![Stmt::Return(Some(call))]
    }
}

fn stub_method(unit: &str, iface: &str, m: &ExposedMethod, wire: &str, h: &TypeHierarchy) -> MethodDecl {
    let d = &m.descriptor;
    let mut b = BodyBuilder::new();
    let remote = remote_path(&mut b, unit, m, wire, h);
    let local = local_path(&mut b, unit, iface, m, wire, h);
    let is_local = Expr::invoke_static(
        CORBA_UTIL,
        "isLocal",
        &[TypeRef::new(CORBA_STUB)],
        TypeRef::new("boolean"),
        vec![Expr::This],
    );
    let body = b.finish(vec![Stmt::If { cond: Cond::False(is_local), then: remote, otherwise: local }]);
    MethodDecl::new(d.name.clone(), d.params.clone(), d.return_type.clone())
        .with_throws(d.exceptions.clone())
        .with_body(body)
}

fn remote_path(b: &mut BodyBuilder, unit: &str, m: &ExposedMethod, wire: &str, h: &TypeHierarchy) -> Vec<Stmt> {
    let d = &m.descriptor;
    let input = b.local_of("in", INPUT_STREAM);
    let out = b.local_of("out", OUTPUT_STREAM);

    let request = object_impl(
        "_request",
        &[TypeRef::string(), TypeRef::new("boolean")],
        TypeRef::new(PORTABLE_OUTPUT_STREAM),
        vec![Expr::str(wire), Expr::bool(true)],
    );
    let mut body = vec![Stmt::Assign(out, Expr::cast(TypeRef::new(OUTPUT_STREAM), request))];
    for (i, ty) in d.params.iter().enumerate() {
        body.push(Stmt::Eval(marshal::write(ty, Expr::local(out), Expr::Arg(i), h)));
    }
    let reply = object_impl(
        "_invoke",
        &[TypeRef::new(PORTABLE_OUTPUT_STREAM)],
        TypeRef::new(PORTABLE_INPUT_STREAM),
        vec![Expr::local(out)],
    );
    body.push(Stmt::Assign(input, Expr::cast(TypeRef::new(INPUT_STREAM), reply)));
    if d.return_type.is_void() {
        body.push(Stmt::Return(None));
    } else {
        body.push(Stmt::Return(Some(marshal::read(&d.return_type, Expr::local(input), h))));
    }

    let application = b.local_of("ex", APPLICATION_EXCEPTION);
    let id = b.local_of("id", STRING);
    let reply_stream = Expr::invoke_virtual(
        Expr::local(application),
        APPLICATION_EXCEPTION,
        "getInputStream",
        &[],
        TypeRef::new(PORTABLE_INPUT_STREAM),
        vec![],
    );
    let mut decode = vec![
        Stmt::Assign(input, Expr::cast(TypeRef::new(INPUT_STREAM), reply_stream)),
        Stmt::Assign(
            id,
            Expr::invoke_virtual(Expr::local(input), PORTABLE_INPUT_STREAM, "read_string", &[], TypeRef::string(), vec![]),
        ),
    ];
    for failure in &m.failures.application_checked {
        let matches = Expr::invoke_virtual(
            Expr::local(id),
            STRING,
            "equals",
            &[TypeRef::object()],
            TypeRef::new("boolean"),
            vec![Expr::str(repository_id(failure))],
        );
        decode.push(Stmt::If {
            cond: Cond::True(matches),
            then: vec![Stmt::Throw(marshal::read(failure, Expr::local(input), h))],
            otherwise: vec![],
        });
    }
    decode.push(Stmt::Throw(Expr::new_object(UNEXPECTED_EXCEPTION, &[TypeRef::string()], vec![Expr::local(id)])));

    let remarshal = b.local_of("rm", REMARSHAL_EXCEPTION);
    let release = object_impl(
        "_releaseReply",
        &[TypeRef::new(PORTABLE_INPUT_STREAM)],
        TypeRef::void(),
        vec![Expr::local(input)],
    );
    let exchange = TryRegion {
        body,
        handlers: vec![
            Handler { catch: Some(APPLICATION_EXCEPTION.to_string()), binding: application, body: decode },
            Handler { catch: Some(REMARSHAL_EXCEPTION.to_string()), binding: remarshal, body: retry(unit, d) },
        ],
        exit: Some(ExitRegion { in_flight: None, body: vec![Stmt::Eval(release)] }),
    };

    let system = b.local_of("se", SYSTEM_EXCEPTION);
    let mapped = Expr::invoke_static(
        CORBA_UTIL,
        "mapSystemException",
        &[TypeRef::new(SYSTEM_EXCEPTION)],
        TypeRef::new(REMOTE_EXCEPTION),
        vec![Expr::local(system)],
    );
    vec![Stmt::Try(TryRegion {
        body: vec![Stmt::Assign(input, Expr::null()), Stmt::Try(exchange)],
        handlers: vec![Handler {
            catch: Some(SYSTEM_EXCEPTION.to_string()),
            binding: system,
            body: vec![Stmt::Throw(mapped)],
        }],
        exit: None,
    })]
}

fn local_path(
    b: &mut BodyBuilder,
    unit: &str,
    iface: &str,
    m: &ExposedMethod,
    wire: &str,
    h: &TypeHierarchy,
) -> Vec<Stmt> {
    let d = &m.descriptor;
    let servant = b.local_of("so", SERVANT_OBJECT);
    let preinvoke = object_impl(
        "_servant_preinvoke",
        &[TypeRef::string(), TypeRef::new(CLASS)],
        TypeRef::new(SERVANT_OBJECT),
        vec![Expr::str(wire), Expr::ClassLiteral(TypeRef::new(iface))],
    );
    let mut stmts = vec![
        Stmt::Assign(servant, preinvoke),
        Stmt::If { cond: Cond::Null(Expr::local(servant)), then: retry(unit, d), otherwise: vec![] },
    ];

    let copied: Vec<usize> = (0..d.params.len()).filter(|&i| needs_copy(&d.params[i], h)).collect();
    let mut body = Vec::new();
    let mut args = forward_args(d.params.len());
    match copied.len() {
        0 => {}
        1 => {
            let i = copied[0];
            args[i] = from_object(marshal::copy_object(Expr::Arg(i), orb()), &d.params[i]);
        }
        _ => {
            let copies = b.local("copies", TypeRef::array(OBJECT, 1));
            let originals = Expr::object_array(copied.iter().map(|&i| Expr::Arg(i)).collect());
            body.push(Stmt::Assign(copies, marshal::copy_objects(originals, orb())));
            for (k, &i) in copied.iter().enumerate() {
                args[i] = from_object(Expr::Index(Box::new(Expr::local(copies)), k as i32), &d.params[i]);
            }
        }
    }

    let target = Expr::cast(
        TypeRef::new(iface),
        Expr::field(SERVANT_OBJECT, "servant", OBJECT, Expr::local(servant)),
    );
    let call = Expr::invoke_interface(target, iface, &d.name, &d.params, d.return_type.clone(), args);
    if d.return_type.is_void() {
        body.push(Stmt::Eval(call));
        body.push(Stmt::Return(None));
    } else if needs_copy(&d.return_type, h) {
        let copy = from_object(marshal::copy_object(call, orb()), &d.return_type);
        body.push(Stmt::Return(Some(copy)));
    } else {
        body.push(Stmt::Return(Some(call)));
    }

    let failure = b.local_of("t", THROWABLE);
    let copy = b.local_of("tc", THROWABLE);
    let mut rethrow = vec![Stmt::Assign(
        copy,
        Expr::cast(TypeRef::new(THROWABLE), marshal::copy_object(Expr::local(failure), orb())),
    )];
    for app in &m.failures.application_checked {
        rethrow.push(Stmt::If {
            cond: Cond::InstanceOf(Expr::local(copy), app.name.clone()),
            then: vec![Stmt::Throw(Expr::cast(app.clone(), Expr::local(copy)))],
            otherwise: vec![],
        });
    }
    rethrow.push(Stmt::Throw(Expr::invoke_static(
        CORBA_UTIL,
        "wrapException",
        &[TypeRef::new(THROWABLE)],
        TypeRef::new(REMOTE_EXCEPTION),
        vec![Expr::local(copy)],
    )));

    let postinvoke = object_impl(
        "_servant_postinvoke",
        &[TypeRef::new(SERVANT_OBJECT)],
        TypeRef::void(),
        vec![Expr::local(servant)],
    );
    stmts.push(Stmt::Try(TryRegion {
        body,
        handlers: vec![Handler { catch: None, binding: failure, body: rethrow }],
        exit: Some(ExitRegion { in_flight: None, body: vec![Stmt::Eval(postinvoke)] }),
    }));
    stmts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Classifier;
    use crate::ir::check_unit;
    use crate::model::{ClassInfo, MethodPolicy};

    fn exposed(d: MethodDescriptor, h: &TypeHierarchy) -> ExposedMethod {
        let failures = Classifier::new(h).classify(&d.exceptions, true);
        ExposedMethod { descriptor: d, id: 0, policy: MethodPolicy::default(), failures, rmi_remote: true }
    }

    fn fixture() -> (InterfaceDescriptor, TypeHierarchy) {
        let iface = InterfaceDescriptor::new("acme.Account").extending(EJB_OBJECT);
        let h = TypeHierarchy::with_classes([
            iface.as_class_info(),
            ClassInfo::class("acme.LimitException", EXCEPTION),
            ClassInfo::class("acme.Item", OBJECT).implementing(&[SERIALIZABLE]),
        ]);
        (iface, h)
    }

    #[test]
    fn ids_include_remote_parents() {
        let (iface, h) = fixture();
        assert_eq!(
            type_ids(&iface, &h),
            vec!["RMI:acme.Account:0000000000000000", "RMI:javax.ejb.EJBObject:0000000000000000"]
        );
    }

    #[test]
    fn stub_methods_are_well_formed() {
        let (iface, h) = fixture();
        let deposit = MethodDescriptor::new("deposit")
            .param("acme.Item")
            .param("long")
            .returns("acme.Item")
            .throws("acme.LimitException")
            .throws(REMOTE_EXCEPTION)
            .owned_by("acme.Account");
        let name = WireName { name: "deposit".into(), alias: None, property: None };
        let unit = build_stub("acme._Account_Stub", &iface, &[(exposed(deposit, &h), name)], &h);
        assert_eq!(unit.ancestor, CORBA_STUB);
        assert_eq!(unit.interfaces, vec!["acme.Account".to_string()]);
        check_unit(&unit, &h).unwrap();
        let method = unit.method("deposit").unwrap();
        assert_eq!(method.throws.len(), 2);
    }

    #[test]
    fn two_copied_arguments_share_one_copy_call() {
        let (iface, h) = fixture();
        let swap = MethodDescriptor::new("swap")
            .param("acme.Item")
            .param("acme.Item")
            .throws(REMOTE_EXCEPTION)
            .owned_by("acme.Account");
        let name = WireName { name: "swap".into(), alias: None, property: None };
        let unit = build_stub("acme._Account_Stub", &iface, &[(exposed(swap, &h), name)], &h);
        let body = unit.method("swap").unwrap().body.as_ref().unwrap();
        assert!(body.locals.iter().any(|l| l.name == "copies"));
        check_unit(&unit, &h).unwrap();
    }
}
