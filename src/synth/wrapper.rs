//! Wrapper unit assembly: ancestry, fields, identity and delivery members

use super::dispatch::{dispatch_method, DispatchSite};
use super::hooks::{self, Hook};
use super::{constructor, forward_args, ExposedMethod};
use crate::codegen::access_flags::*;
use crate::consts::*;
use crate::ir::{BodyBuilder, Cond, Expr, FieldDecl, MethodDecl, Stmt, UnitDescription};
use crate::model::{ComponentType, GenerationRequest, MethodDescriptor, Modifiers, TypeRef, WrapperKind};

/// Method on the factory implementation a home wrapper method reaches.
pub fn factory_target(kind: WrapperKind, method: &str) -> String {
    let suffixed = method.starts_with("create") || method.starts_with("find");
    if kind == WrapperKind::FactoryLocal && suffixed {
        format!("{method}{LOCAL_SUFFIX}")
    } else {
        method.to_string()
    }
}

pub fn build_wrapper(request: &GenerationRequest, exposed: &[ExposedMethod]) -> UnitDescription {
    let kind = request.kind;
    let name = request.wrapper_unit_name();
    let implementation = if kind.is_factory() { request.factory_unit_name() } else { request.target.class_name.clone() };
    let ancestor = kind.ancestor(&request.target.class_name);

    let mut unit = UnitDescription::new(name.clone(), ancestor.clone());
    for iface in request.interfaces.iter().map(|i| i.name.as_str()).chain(kind.extra_interfaces().iter().copied()) {
        if !unit.interfaces.iter().any(|i| i == iface) {
            unit.interfaces.push(iface.to_string());
        }
    }
    unit.fields = kind
        .fields()
        .iter()
        .map(|(field, ty)| FieldDecl { name: field.to_string(), ty: TypeRef::new(*ty), access: ACC_PUBLIC })
        .collect();
    unit.methods.push(constructor(&ancestor));

    for m in exposed {
        let d = &m.descriptor;
        let site = DispatchSite {
            unit: &name,
            kind,
            implementation: &implementation,
            target: if kind.is_factory() { factory_target(kind, &d.name) } else { d.name.clone() },
            stateless_create: kind.is_factory()
                && request.component_type == ComponentType::Stateless
                && d.name == "create"
                && d.params.is_empty(),
        };
        unit.methods.push(dispatch_method(&site, m));
    }

    let mut extra = Vec::new();
    if kind.has_identity_members() {
        extra.extend(identity_members(kind, &name));
    }
    if kind == WrapperKind::EndpointProxyNoInterface {
        extra.extend(delivery_members(&name));
    }
    if kind.is_no_interface() {
        extra.extend(non_public_guards(request));
    }
    for decl in extra {
        if unit.find_method(&decl.name, &decl.params).is_none() {
            unit.methods.push(decl);
        }
    }
    log::debug!("wrapper {} extends {} ({} methods)", unit.name, unit.ancestor, unit.methods.len());
    unit
}

fn identity_members(kind: WrapperKind, unit: &str) -> Vec<MethodDecl> {
    let object = TypeRef::object();
    let boolean = TypeRef::new("boolean");
    let int = TypeRef::new("int");
    let (equals, hash_code) = if kind == WrapperKind::EndpointProxy {
        let equals = vec![Stmt::If {
            cond: Cond::Same(Expr::This, Expr::Arg(0)),
            then: vec![Stmt::Return(Some(Expr::bool(true)))],
            otherwise: vec![Stmt::Return(Some(Expr::bool(false)))],
        }];
        let hash = Expr::invoke_static(SYSTEM, "identityHashCode", &[object.clone()], int.clone(), vec![Expr::This]);
        (equals, vec![Stmt::Return(Some(hash))])
    } else {
        let base = |target: Expr| Expr::field(unit, WRAPPER_BASE_FIELD, BUSINESS_LOCAL_WRAPPER, target);
        let other = Expr::cast(TypeRef::new(unit), Expr::Arg(0));
        let same_base = Expr::invoke_virtual(
            base(Expr::This),
            OBJECT,
            "equals",
            &[object.clone()],
            boolean.clone(),
            vec![base(other)],
        );
        let equals = vec![Stmt::If {
            cond: Cond::InstanceOf(Expr::Arg(0), unit.to_string()),
            then: vec![Stmt::Return(Some(same_base))],
            otherwise: vec![Stmt::Return(Some(Expr::bool(false)))],
        }];
        let hash = Expr::invoke_virtual(base(Expr::This), OBJECT, "hashCode", &[], int.clone(), vec![]);
        (equals, vec![Stmt::Return(Some(hash))])
    };
    vec![
        MethodDecl::new("equals", vec![object], boolean).with_body(BodyBuilder::new().finish(equals)),
        MethodDecl::new("hashCode", vec![], int).with_body(BodyBuilder::new().finish(hash_code)),
    ]
}

fn delivery_members(unit: &str) -> Vec<MethodDecl> {
    let base = || Expr::field(unit, ENDPOINT_BASE_FIELD, MESSAGE_ENDPOINT_BASE, Expr::This);
    let delegate = |hook: Hook, throws: &[&str]| {
        let call = hook.invoke(base(), forward_args(hook.params.len()));
        MethodDecl::new(hook.name, hook.param_types(), TypeRef::void())
            .with_throws(throws.iter().map(|t| TypeRef::new(*t)).collect())
            .with_body(BodyBuilder::new().finish(vec![Stmt::Eval(call), Stmt::Return(None)]))
    };
    vec![
        delegate(hooks::BEFORE_DELIVERY, &[NO_SUCH_METHOD_EXCEPTION, RESOURCE_EXCEPTION]),
        delegate(hooks::AFTER_DELIVERY, &[RESOURCE_EXCEPTION]),
        delegate(hooks::RELEASE, &[]),
    ]
}

/// Non-public implementation methods must not be reachable through the view.
fn non_public_guards(request: &GenerationRequest) -> Vec<MethodDecl> {
    let guarded = |m: &MethodDescriptor| {
        !m.modifiers.is_public() && !m.modifiers.is_private() && !m.modifiers.is_static() && m.name != "<init>"
    };
    let mut out: Vec<MethodDecl> = Vec::new();
    for m in request.target.owned_methods().iter().filter(|m| guarded(m)) {
        if out.iter().any(|d| d.name == m.name && d.params == m.params) {
            continue;
        }
        let failure = Expr::new_object(EJB_EXCEPTION, &[TypeRef::string()], vec![Expr::str(NON_PUBLIC_METHOD_MESSAGE)]);
        let access = m.modifiers.bits() & Modifiers::PROTECTED;
        out.push(
            MethodDecl::new(m.name.clone(), m.params.clone(), m.return_type.clone())
                .with_access(access)
                .with_throws(m.exceptions.clone())
                .with_body(BodyBuilder::new().finish(vec![Stmt::Throw(failure)])),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{InterfaceDescriptor, TargetDescriptor};

    #[test]
    fn local_home_targets_suffixed_factory_methods() {
        assert_eq!(factory_target(WrapperKind::FactoryLocal, "createWithName"), "createWithName_Local");
        assert_eq!(factory_target(WrapperKind::FactoryLocal, "findByPrimaryKey"), "findByPrimaryKey_Local");
        assert_eq!(factory_target(WrapperKind::FactoryLocal, "totalBalance"), "totalBalance");
        assert_eq!(factory_target(WrapperKind::FactoryRemote, "create"), "create");
    }

    #[test]
    fn no_interface_view_guards_protected_methods() {
        let target = TargetDescriptor::new("acme.AccountBean")
            .method(MethodDescriptor::new("audit").modifiers(Modifiers(Modifiers::PROTECTED)))
            .method(MethodDescriptor::new("helper").modifiers(Modifiers(Modifiers::PRIVATE)))
            .method(MethodDescriptor::new("reset").modifiers(Modifiers(0)));
        let request = GenerationRequest::new("Account", WrapperKind::NoInterfaceView, target);
        let unit = build_wrapper(&request, &[]);
        assert_eq!(unit.ancestor, "acme.AccountBean");
        assert_eq!(unit.interfaces, vec![LOCAL_BEAN_WRAPPER.to_string()]);
        let audit = unit.method("audit").unwrap();
        assert_eq!(audit.access, ACC_PROTECTED);
        assert!(unit.method("helper").is_none());
        assert_eq!(unit.method("reset").unwrap().access, 0);
        assert!(unit.method("equals").is_some());
        assert_eq!(unit.fields[0].name, WRAPPER_BASE_FIELD);
    }

    #[test]
    fn endpoint_proxy_without_interface_delegates_delivery() {
        let request = GenerationRequest::new(
            "Listener",
            WrapperKind::EndpointProxyNoInterface,
            TargetDescriptor::new("acme.ListenerBean"),
        )
        .with_interface(InterfaceDescriptor::new("acme.Listener"));
        let unit = build_wrapper(&request, &[]);
        let before = unit.method("beforeDelivery").unwrap();
        assert_eq!(before.params, vec![TypeRef::new(METHOD)]);
        assert_eq!(before.throws.len(), 2);
        assert!(unit.method("release").is_some());
        assert!(unit.interfaces.contains(&MESSAGE_ENDPOINT.to_string()));
        assert!(unit.method("hashCode").is_none());
    }
}
