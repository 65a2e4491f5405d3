// Shared fixtures for the integration tests
#![allow(dead_code)]

use std::fmt::Debug;

use jitdeploy::consts::*;
use jitdeploy::ir::UnitDescription;
use jitdeploy::model::{ClassInfo, InterfaceDescriptor, MethodDescriptor, Modifiers, TargetDescriptor};
use jitdeploy::{GenerationRequest, Synthesis, WrapperKind};

pub const LIMIT_EXCEPTION: &str = "acme.LimitException";
pub const ITEM: &str = "acme.Item";

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn ok<T, E: Debug>(result: Result<T, E>) -> T {
    match result {
        Ok(v) => v,
        Err(e) => panic!("expected success, got {e:?}"),
    }
}

pub fn err_contains<T: Debug>(result: jitdeploy::Result<T>, needle: &str) -> jitdeploy::Error {
    match result {
        Ok(v) => panic!("expected an error containing '{needle}', got {v:?}"),
        Err(e) => {
            assert!(e.to_string().contains(needle), "'{e}' does not contain '{needle}'");
            e
        }
    }
}

fn bean_method(m: &MethodDescriptor) -> MethodDescriptor {
    MethodDescriptor { owner: String::new(), modifiers: Modifiers::public(), ..m.clone() }
}

/// A bean class implementing every method of `iface`.
pub fn bean_for(class: &str, iface: &InterfaceDescriptor) -> TargetDescriptor {
    iface.methods.iter().fold(TargetDescriptor::new(class), |t, m| t.method(bean_method(m)))
}

/// `deposit(Item, long) -> Item` and `balance() -> long`, both remote.
pub fn account_remote_interface() -> InterfaceDescriptor {
    InterfaceDescriptor::new("acme.Account")
        .extending(EJB_OBJECT)
        .method(
            MethodDescriptor::new("deposit")
                .param(ITEM)
                .param("long")
                .returns(ITEM)
                .throws(LIMIT_EXCEPTION)
                .throws(REMOTE_EXCEPTION),
        )
        .method(MethodDescriptor::new("balance").returns("long").throws(REMOTE_EXCEPTION))
}

pub fn account_types() -> Vec<ClassInfo> {
    vec![
        ClassInfo::class(LIMIT_EXCEPTION, EXCEPTION),
        ClassInfo::class(ITEM, OBJECT).implementing(&[SERIALIZABLE]),
    ]
}

pub fn with_types(request: GenerationRequest, types: Vec<ClassInfo>) -> GenerationRequest {
    types.into_iter().fold(request, |r, t| r.with_type(t))
}

pub fn account_remote_request() -> GenerationRequest {
    let iface = account_remote_interface();
    let target = bean_for("acme.AccountBean", &iface);
    with_types(GenerationRequest::new("Account", WrapperKind::ComponentRemote, target).with_interface(iface), account_types())
}

/// The same operations on a local business interface.
pub fn account_local_request() -> GenerationRequest {
    let iface = InterfaceDescriptor::new("acme.AccountLocal")
        .method(
            MethodDescriptor::new("deposit")
                .param(ITEM)
                .param("long")
                .returns(ITEM)
                .throws(LIMIT_EXCEPTION),
        )
        .method(MethodDescriptor::new("balance").returns("long"));
    let target = bean_for("acme.AccountBean", &iface);
    with_types(GenerationRequest::new("Account", WrapperKind::BusinessLocal, target).with_interface(iface), account_types())
}

pub fn unit<'a>(synthesis: &'a Synthesis, name: &str) -> &'a UnitDescription {
    match synthesis.module.units.iter().find(|u| u.name == name) {
        Some(u) => u,
        None => panic!(
            "no unit {name}; have {:?}",
            synthesis.module.units.iter().map(|u| u.name.as_str()).collect::<Vec<_>>()
        ),
    }
}
