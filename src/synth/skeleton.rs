//! Server-side skeleton (tie) of a remote interface
//!
//! `_invoke` switches on `method.hashCode()`; each bucket holds an `equals`
//! chain over the wire names that share the hash, so collisions fall back
//! to a linear comparison. Every operation has a private handler that
//! decodes the arguments, calls the target and encodes either the result
//! or a declared application failure preceded by its repository id.

use std::collections::BTreeMap;

use super::marshal;
use super::stub::ids_method;
use super::{constructor, ExposedMethod};
use crate::consts::*;
use crate::ir::{BodyBuilder, Cond, Expr, Handler, MethodDecl, Stmt, TryRegion, UnitDescription};
use crate::model::{Modifiers, TypeHierarchy, TypeRef};
use crate::naming::{java_string_hash, repository_id, rmi_repository_id, WireName};

/// Name of the private handler serving `wire`.
pub fn handler_name(wire: &str) -> String {
    format!("_op_{wire}")
}

/// `methods` holds (declaring interface, method, wire name). The tie's
/// target field is typed `target_iface`.
pub fn build_skeleton(
    name: &str,
    target_iface: &str,
    methods: &[(String, ExposedMethod, WireName)],
    h: &TypeHierarchy,
) -> UnitDescription {
    let mut unit = UnitDescription::new(name, OBJECT_IMPL);
    unit.interfaces.push(CORBA_TIE.to_string());
    unit.fields.push(crate::ir::FieldDecl {
        name: TIE_TARGET_FIELD.to_string(),
        ty: TypeRef::new(target_iface),
        access: Modifiers::PRIVATE,
    });
    unit.methods.push(constructor(OBJECT_IMPL));
    unit.methods.extend(tie_members(name, target_iface));

    let mut ids = vec![rmi_repository_id(target_iface)];
    for (iface, _, _) in methods {
        let id = rmi_repository_id(iface);
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    unit.methods.push(ids_method(&ids));

    // Operation names accepted by `_invoke`, first spelling wins.
    let mut routes: BTreeMap<String, String> = BTreeMap::new();
    for (_, _, wire) in methods {
        routes.entry(wire.name.clone()).or_insert_with(|| handler_name(&wire.name));
    }
    for (_, _, wire) in methods {
        if let Some(alias) = &wire.alias {
            routes.entry(alias.clone()).or_insert_with(|| handler_name(&wire.name));
        }
    }
    unit.methods.push(invoke_method(name, &routes));

    let mut served: Vec<&str> = Vec::new();
    for (iface, m, wire) in methods {
        if served.contains(&wire.name.as_str()) {
            continue;
        }
        served.push(&wire.name);
        unit.methods.push(operation_handler(name, target_iface, iface, m, &wire.name, h));
    }
    log::debug!("skeleton {} routes {} operation names", name, routes.len());
    unit
}

fn target(unit: &str, target_iface: &str) -> Expr {
    Expr::field(unit, TIE_TARGET_FIELD, target_iface, Expr::This)
}

fn orb() -> Expr {
    Expr::invoke_virtual(Expr::This, OBJECT_IMPL, "_orb", &[], TypeRef::new(ORB), vec![])
}

fn tie_members(unit: &str, target_iface: &str) -> Vec<MethodDecl> {
    let remote = TypeRef::new(REMOTE);
    let orb_ty = TypeRef::new(ORB);
    let this_object = TypeRef::new(CORBA_OBJECT);
    let set_target = vec![
        Stmt::SetField {
            owner: unit.to_string(),
            name: TIE_TARGET_FIELD.to_string(),
            ty: TypeRef::new(target_iface),
            target: Expr::This,
            value: Expr::cast(TypeRef::new(target_iface), Expr::Arg(0)),
        },
        Stmt::Return(None),
    ];
    let disconnect =
        Expr::invoke_virtual(orb(), ORB, "disconnect", &[this_object.clone()], TypeRef::void(), vec![Expr::This]);
    let connect =
        Expr::invoke_virtual(Expr::Arg(0), ORB, "connect", &[this_object.clone()], TypeRef::void(), vec![Expr::This]);
    let method = |name: &str, params: Vec<TypeRef>, ret: TypeRef, stmts: Vec<Stmt>| {
        MethodDecl::new(name, params, ret).with_body(BodyBuilder::new().finish(stmts))
    };
    vec![
        method("setTarget", vec![remote.clone()], TypeRef::void(), set_target),
        method("getTarget", vec![], remote, vec![Stmt::Return(Some(target(unit, target_iface)))]),
        method("thisObject", vec![], this_object, vec![Stmt::Return(Some(Expr::This))]),
        method("deactivate", vec![], TypeRef::void(), vec![Stmt::Eval(disconnect), Stmt::Return(None)]),
        method("orb", vec![], orb_ty.clone(), vec![Stmt::Return(Some(orb()))]),
        method("orb", vec![orb_ty], TypeRef::void(), vec![Stmt::Eval(connect), Stmt::Return(None)]),
    ]
}

fn invoke_method(unit: &str, routes: &BTreeMap<String, String>) -> MethodDecl {
    let input_ty = TypeRef::new(INPUT_STREAM);
    let reply_ty = TypeRef::new(RESPONSE_HANDLER);
    let out_ty = TypeRef::new(PORTABLE_OUTPUT_STREAM);
    let mut b = BodyBuilder::new();
    let input = b.local("in", input_ty.clone());

    let mut buckets: BTreeMap<i32, Vec<(&str, &str)>> = BTreeMap::new();
    for (op, handler) in routes {
        buckets.entry(java_string_hash(op)).or_default().push((op.as_str(), handler.as_str()));
    }
    let cases = buckets
        .into_iter()
        .map(|(hash, entries)| {
            let chain = entries
                .into_iter()
                .map(|(op, handler)| {
                    let matches = Expr::invoke_virtual(
                        Expr::Arg(0),
                        STRING,
                        "equals",
                        &[TypeRef::object()],
                        TypeRef::new("boolean"),
                        vec![Expr::str(op)],
                    );
                    let call = Expr::invoke_special(
                        Expr::This,
                        unit,
                        handler,
                        &[input_ty.clone(), reply_ty.clone()],
                        TypeRef::new(OUTPUT_STREAM),
                        vec![Expr::local(input), Expr::Arg(2)],
                    );
                    Stmt::If { cond: Cond::True(matches), then: vec![Stmt::Return(Some(call))], otherwise: vec![] }
                })
                .collect();
            (hash, chain)
        })
        .collect();

    let hash = Expr::invoke_virtual(Expr::Arg(0), STRING, "hashCode", &[], TypeRef::new("int"), vec![]);
    let body = vec![
        Stmt::Switch { key: hash, cases, default: vec![] },
        Stmt::Throw(Expr::new_object(BAD_OPERATION, &[], vec![])),
    ];

    let system = b.local_of("ex", SYSTEM_EXCEPTION);
    let unknown = b.local_of("t", THROWABLE);
    let stmts = vec![
        Stmt::Assign(input, Expr::cast(input_ty, Expr::Arg(1))),
        Stmt::Try(TryRegion {
            body,
            handlers: vec![
                Handler {
                    catch: Some(SYSTEM_EXCEPTION.to_string()),
                    binding: system,
                    body: vec![Stmt::Throw(Expr::local(system))],
                },
                Handler {
                    catch: None,
                    binding: unknown,
                    body: vec![Stmt::Throw(Expr::new_object(
                        UNKNOWN_EXCEPTION,
                        &[TypeRef::new(THROWABLE)],
                        vec![Expr::local(unknown)],
                    ))],
                },
            ],
            exit: None,
        }),
    ];
    MethodDecl::new("_invoke", vec![TypeRef::string(), TypeRef::new(PORTABLE_INPUT_STREAM), reply_ty], out_ty)
        .with_throws(vec![TypeRef::new(SYSTEM_EXCEPTION)])
        .with_body(b.finish(stmts))
}

fn operation_handler(
    unit: &str,
    target_iface: &str,
    iface: &str,
    m: &ExposedMethod,
    wire: &str,
    h: &TypeHierarchy,
) -> MethodDecl {
    let d = &m.descriptor;
    let mut b = BodyBuilder::new();
    let out = b.local_of("out", OUTPUT_STREAM);
    let reply = |kind: &str| {
        Expr::cast(
            TypeRef::new(OUTPUT_STREAM),
            Expr::invoke_interface(Expr::Arg(1), RESPONSE_HANDLER, kind, &[], TypeRef::new(PORTABLE_OUTPUT_STREAM), vec![]),
        )
    };

    let args = d.params.iter().map(|ty| marshal::read(ty, Expr::Arg(0), h)).collect();
    let receiver = Expr::cast(TypeRef::new(iface), target(unit, target_iface));
    let call = Expr::invoke_interface(receiver, iface, &d.name, &d.params, d.return_type.clone(), args);

    let mut body = Vec::new();
    if d.return_type.is_void() {
        body.push(Stmt::Eval(call));
        body.push(Stmt::Assign(out, reply("createReply")));
    } else {
        let result = b.local("result", d.return_type.clone());
        body.push(Stmt::Assign(result, call));
        body.push(Stmt::Assign(out, reply("createReply")));
        body.push(Stmt::Eval(marshal::write(&d.return_type, Expr::local(out), Expr::local(result), h)));
    }
    body.push(Stmt::Return(Some(Expr::local(out))));

    let handlers: Vec<Handler> = m
        .failures
        .application_checked
        .iter()
        .map(|failure| {
            let e = b.local("e", failure.clone());
            let id = Expr::invoke_virtual(
                Expr::local(out),
                PORTABLE_OUTPUT_STREAM,
                "write_string",
                &[TypeRef::string()],
                TypeRef::void(),
                vec![Expr::str(repository_id(failure))],
            );
            Handler {
                catch: Some(failure.name.clone()),
                binding: e,
                body: vec![
                    Stmt::Assign(out, reply("createExceptionReply")),
                    Stmt::Eval(id),
                    Stmt::Eval(marshal::write(failure, Expr::local(out), Expr::local(e), h)),
                    Stmt::Return(Some(Expr::local(out))),
                ],
            }
        })
        .collect();

    let stmts = if handlers.is_empty() {
        body
    } else {
        vec![Stmt::Try(TryRegion { body, handlers, exit: None })]
    };
    MethodDecl::new(
        handler_name(wire),
        vec![TypeRef::new(INPUT_STREAM), TypeRef::new(RESPONSE_HANDLER)],
        TypeRef::new(OUTPUT_STREAM),
    )
    .with_access(Modifiers::PRIVATE)
    .with_throws(vec![TypeRef::new(THROWABLE)])
    .with_body(b.finish(stmts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Classifier;
    use crate::ir::check_unit;
    use crate::model::{ClassInfo, MethodDescriptor, MethodPolicy};

    fn remote_method(d: MethodDescriptor, wire: WireName, h: &TypeHierarchy) -> (String, ExposedMethod, WireName) {
        let failures = Classifier::new(h).classify(&d.exceptions, true);
        let m = ExposedMethod { descriptor: d, id: 0, policy: MethodPolicy::default(), failures, rmi_remote: true };
        ("acme.Account".to_string(), m, wire)
    }

    fn wire(name: &str, alias: Option<&str>) -> WireName {
        WireName { name: name.to_string(), alias: alias.map(str::to_string), property: None }
    }

    #[test]
    fn colliding_hashes_share_a_bucket() {
        // "Aa" and "BB" have the same String.hashCode.
        assert_eq!(java_string_hash("Aa"), java_string_hash("BB"));
        let h = TypeHierarchy::with_classes([ClassInfo::interface("acme.Account", &[EJB_OBJECT])]);
        let methods = vec![
            remote_method(MethodDescriptor::new("Aa").throws(REMOTE_EXCEPTION), wire("Aa", None), &h),
            remote_method(MethodDescriptor::new("BB").throws(REMOTE_EXCEPTION), wire("BB", None), &h),
        ];
        let unit = build_skeleton("acme._Account_Tie", "acme.Account", &methods, &h);
        let invoke = unit.method("_invoke").unwrap();
        let Stmt::Try(region) = &invoke.body.as_ref().unwrap().stmts[1] else { panic!("expected a region") };
        let Stmt::Switch { cases, .. } = &region.body[0] else { panic!("expected a switch") };
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].1.len(), 2);
        check_unit(&unit, &h).unwrap();
    }

    #[test]
    fn aliases_route_to_the_same_handler() {
        let h = TypeHierarchy::with_classes([
            ClassInfo::interface("acme.Account", &[EJB_OBJECT]),
            ClassInfo::class("acme.LimitException", EXCEPTION),
        ]);
        let d = MethodDescriptor::new("account")
            .returns("long")
            .throws("acme.LimitException")
            .throws(REMOTE_EXCEPTION);
        let methods = vec![remote_method(d, wire("account_", Some("account")), &h)];
        let unit = build_skeleton("acme._Account_Tie", "acme.Account", &methods, &h);
        let handlers: Vec<&str> =
            unit.methods.iter().map(|m| m.name.as_str()).filter(|n| n.starts_with("_op_")).collect();
        assert_eq!(handlers, vec!["_op_account_"]);
        let op = unit.method("_op_account_").unwrap();
        assert_eq!(op.access, Modifiers::PRIVATE);
        check_unit(&unit, &h).unwrap();
    }
}
