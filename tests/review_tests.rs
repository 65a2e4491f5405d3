mod common;

use common::*;
use jitdeploy::consts::*;
use jitdeploy::model::{
    ComponentType, InterfaceDescriptor, MethodDescriptor, MethodPolicy, TargetDescriptor,
};
use jitdeploy::{Config, Error, GenerationRequest, WrapperKind};

fn rule_of(err: &Error) -> &'static str {
    match err {
        Error::Configuration { rule, .. } => *rule,
        other => panic!("expected a configuration error, got {other}"),
    }
}

fn rejected(request: &GenerationRequest, needle: &str) -> &'static str {
    rule_of(&err_contains(jitdeploy::synthesize(request, &Config::default()), needle))
}

fn local_request(iface: InterfaceDescriptor) -> GenerationRequest {
    let target = bean_for("acme.AccountBean", &iface);
    GenerationRequest::new("Account", WrapperKind::BusinessLocal, target).with_interface(iface)
}

#[test]
fn ejb_prefixed_business_method_is_rejected() {
    init_logger();
    let iface = InterfaceDescriptor::new("acme.AccountLocal").method(MethodDescriptor::new("ejbLoad"));
    assert_eq!(rejected(&local_request(iface), "ejbLoad"), "ejb-prefix");
}

#[test]
fn exposed_method_without_implementation_is_rejected() {
    init_logger();
    let iface = account_remote_interface();
    let target = TargetDescriptor::new("acme.AccountBean")
        .method(iface.methods[0].clone().modifiers(jitdeploy::model::Modifiers::public()));
    let request = with_types(
        GenerationRequest::new("Account", WrapperKind::ComponentRemote, target).with_interface(iface),
        account_types(),
    );
    assert_eq!(rejected(&request, "balance"), "implementation-method");
}

#[test]
fn component_view_must_extend_its_container_interface() {
    init_logger();
    let iface = InterfaceDescriptor::new("acme.Account")
        .extending(REMOTE)
        .method(MethodDescriptor::new("balance").returns("long").throws(REMOTE_EXCEPTION));
    let request = GenerationRequest::new("Account", WrapperKind::ComponentRemote, bean_for("acme.AccountBean", &iface))
        .with_interface(iface);
    assert_eq!(rejected(&request, EJB_OBJECT), "interface");
}

#[test]
fn local_business_interface_cannot_be_remote() {
    init_logger();
    let iface = InterfaceDescriptor::new("acme.AccountLocal")
        .extending(REMOTE)
        .method(MethodDescriptor::new("balance").returns("long"));
    assert_eq!(rejected(&local_request(iface), "java.rmi.Remote"), "interface");
}

#[test]
fn remote_views_expose_one_interface() {
    init_logger();
    let a = InterfaceDescriptor::new("acme.Audit").method(MethodDescriptor::new("audit").throws(REMOTE_EXCEPTION));
    let b = InterfaceDescriptor::new("acme.Ledger").method(MethodDescriptor::new("total").returns("long").throws(REMOTE_EXCEPTION));
    let target = bean_for("acme.AccountBean", &a).method(bean_for("acme.AccountBean", &b).methods[0].clone());
    let request = GenerationRequest::new("Account", WrapperKind::BusinessRemote, target)
        .with_interface(a)
        .with_interface(b);
    assert_eq!(rejected(&request, "2 interfaces"), "aggregate");
}

#[test]
fn asynchronous_method_must_return_void_or_future() {
    init_logger();
    let iface = InterfaceDescriptor::new("acme.AccountLocal").method(MethodDescriptor::new("total").returns("long"));
    let request = local_request(iface).with_policy("total", MethodPolicy { interceptors: false, asynchronous: true });
    assert_eq!(rejected(&request, "total"), "asynchronous");
}

fn home_request(component_type: ComponentType, creates: Vec<MethodDescriptor>) -> GenerationRequest {
    let home = creates
        .into_iter()
        .fold(InterfaceDescriptor::new("acme.AccountHome").extending(EJB_HOME), |i, m| i.method(m));
    GenerationRequest::new("Account", WrapperKind::FactoryRemote, TargetDescriptor::new("acme.AccountBean"))
        .with_component_type(component_type)
        .with_interface(home)
        .with_type(jitdeploy::model::ClassInfo::interface("acme.Account", &[EJB_OBJECT]))
}

fn create(params: &[&str]) -> MethodDescriptor {
    params
        .iter()
        .fold(MethodDescriptor::new("create"), |m, p| m.param(*p))
        .returns("acme.Account")
        .throws(CREATE_EXCEPTION)
        .throws(REMOTE_EXCEPTION)
}

#[test]
fn stateless_home_declares_a_single_no_argument_create() {
    init_logger();
    let request = home_request(ComponentType::Stateless, vec![create(&[]), create(&[STRING])]);
    assert_eq!(rejected(&request, "exactly one create"), "factory");

    let request = home_request(ComponentType::Stateless, vec![create(&[])]);
    let synthesis = ok(jitdeploy::synthesize(&request, &Config::default()));
    assert!(synthesis.module.units.iter().any(|u| u.name == request.factory_unit_name()));
}

#[test]
fn singleton_components_have_no_home() {
    init_logger();
    let request = home_request(ComponentType::Singleton, vec![create(&[])]);
    assert_eq!(rejected(&request, "Singleton"), "factory");
}

#[test]
fn create_must_return_the_component_view() {
    init_logger();
    let wrong = MethodDescriptor::new("create").returns(STRING).throws(CREATE_EXCEPTION);
    let request = home_request(ComponentType::Stateless, vec![wrong]);
    assert_eq!(rejected(&request, EJB_OBJECT), "factory");
}

#[test]
fn undescribed_failures_are_assumed_checked_with_a_warning() {
    init_logger();
    let iface = InterfaceDescriptor::new("acme.AccountLocal")
        .method(MethodDescriptor::new("close").throws("acme.MysteryException"));
    let request = local_request(iface);
    let synthesis = ok(jitdeploy::synthesize(&request, &Config::default()));
    let warnings: Vec<&String> = synthesis.warnings.iter().filter(|w| w.contains("acme.MysteryException")).collect();
    assert_eq!(warnings.len(), 1, "{:?}", synthesis.warnings);
}
