mod common;

use common::*;
use jitdeploy::classify::classify;
use jitdeploy::codegen::EmitResult;
use jitdeploy::consts::*;
use jitdeploy::ir::{LoadableUnit, MethodDecl, ModuleDescription, Stmt};
use jitdeploy::model::{ClassInfo, ComponentType, InterfaceDescriptor, MethodDescriptor, Modifiers, TargetDescriptor, TypeRef};
use jitdeploy::naming;
use jitdeploy::{Config, Error, GenerationRequest, ModuleEmitter, WrapperKind};

/// Records what it was handed instead of emitting class files.
#[derive(Default)]
struct CountingEmitter {
    calls: usize,
    units: Vec<String>,
}

impl ModuleEmitter for CountingEmitter {
    fn emit(&mut self, module: &ModuleDescription) -> EmitResult<Vec<LoadableUnit>> {
        self.calls += 1;
        self.units.extend(module.units.iter().map(|u| u.name.clone()));
        Ok(Vec::new())
    }
}

fn handler_types(decl: &MethodDecl) -> Vec<Option<String>> {
    let body = decl.body.as_ref().expect("dispatch body");
    body.stmts
        .iter()
        .find_map(|s| match s {
            Stmt::Try(region) => Some(region.handlers.iter().map(|h| h.catch.clone()).collect()),
            _ => None,
        })
        .expect("dispatch region")
}

fn has_exit_region(decl: &MethodDecl) -> bool {
    decl.body
        .as_ref()
        .map(|b| b.stmts.iter().any(|s| matches!(s, Stmt::Try(r) if r.exit.is_some())))
        .unwrap_or(false)
}

#[test]
fn accessors_fold_into_properties() {
    init_logger();
    let descriptors = vec![
        MethodDescriptor::new("getName").returns(STRING),
        MethodDescriptor::new("isActive").returns("boolean"),
        MethodDescriptor::new("setActive").param("boolean"),
    ];
    let names = ok(naming::map(&descriptors, None));
    let wire: Vec<&str> = names.iter().map(|n| n.as_str()).collect();
    assert_eq!(wire, vec!["get_name", "get_active", "set_active"]);
    assert_eq!(names[0].property.as_deref(), Some("name"));
    assert_eq!(names[1].property.as_deref(), Some("active"));
    assert_eq!(names[2].property.as_deref(), Some("active"));
}

fn stateful_home_request(target: TargetDescriptor) -> GenerationRequest {
    let create = |params: &[&str]| {
        params
            .iter()
            .fold(MethodDescriptor::new("create"), |m, p| m.param(*p))
            .returns("acme.Account")
            .throws(CREATE_EXCEPTION)
            .throws(REMOTE_EXCEPTION)
    };
    let home = InterfaceDescriptor::new("acme.AccountHome")
        .extending(EJB_HOME)
        .method(create(&[]))
        .method(create(&[STRING]));
    GenerationRequest::new("Account", WrapperKind::FactoryRemote, target)
        .with_component_type(ComponentType::Stateful)
        .with_interface(home)
        .with_type(ClassInfo::interface("acme.Account", &[EJB_OBJECT]))
}

#[test]
fn factory_creates_need_their_own_init_methods() {
    init_logger();
    let init = |params: &[&str]| {
        params
            .iter()
            .fold(MethodDescriptor::new("ejbCreate"), |m, p| m.param(*p))
            .throws(CREATE_EXCEPTION)
            .modifiers(Modifiers::public())
    };

    let partial = TargetDescriptor::new("acme.AccountBean").method(init(&[]));
    let err = err_contains(jitdeploy::synthesize(&stateful_home_request(partial), &Config::default()), "ejbCreate");
    assert!(matches!(err, Error::Configuration { rule: "factory", .. }), "{err}");

    let target = TargetDescriptor::new("acme.AccountBean").method(init(&[])).method(init(&[STRING]));
    let request = stateful_home_request(target);
    let synthesis = ok(jitdeploy::synthesize(&request, &Config::default()));

    let wrapper = unit(&synthesis, &request.wrapper_unit_name());
    let creates: Vec<&MethodDecl> = wrapper.methods.iter().filter(|m| m.name == "create").collect();
    assert_eq!(creates.len(), 2);
    assert!(creates.iter().all(|m| has_exit_region(m)));
    let ids: Vec<_> = creates.iter().map(|m| m.dispatch_id).collect();
    assert!(ids.iter().all(Option::is_some));
    assert_ne!(ids[0], ids[1]);

    let factory = unit(&synthesis, &request.factory_unit_name());
    assert_eq!(factory.methods.iter().filter(|m| m.name == "create").count(), 2);
}

#[test]
fn exception_root_gets_every_handler() {
    init_logger();
    let c = classify(&[TypeRef::new(EXCEPTION)], true);
    assert!(c.system_unchecked);
    assert!(c.protocol_native);
    assert_eq!(c.application_checked, vec![TypeRef::new(EXCEPTION)]);

    let iface = InterfaceDescriptor::new("acme.Ledger")
        .extending(EJB_OBJECT)
        .method(MethodDescriptor::new("audit").throws(EXCEPTION));
    let request = GenerationRequest::new("Ledger", WrapperKind::ComponentRemote, bean_for("acme.LedgerBean", &iface))
        .with_interface(iface);
    let synthesis = ok(jitdeploy::synthesize(&request, &Config::default()));
    let audit = unit(&synthesis, &request.wrapper_unit_name()).method("audit").expect("audit");
    assert_eq!(
        handler_types(audit),
        vec![
            Some(RUNTIME_EXCEPTION.to_string()),
            Some(REMOTE_EXCEPTION.to_string()),
            Some(EXCEPTION.to_string()),
            None,
        ]
    );
}

#[test]
fn case_variants_are_mangled_apart() {
    init_logger();
    let descriptors = vec![MethodDescriptor::new("Foo"), MethodDescriptor::new("foo")];
    let names = ok(naming::map(&descriptors, None));
    assert_eq!(names[0], "Foo_0");
    assert_eq!(names[1], "foo_");
    assert_ne!(names[0].as_str().to_lowercase(), names[1].as_str().to_lowercase());
}

#[test]
fn final_method_stops_no_interface_view_before_emission() {
    init_logger();
    let target = TargetDescriptor::new("acme.AccountBean")
        .method(MethodDescriptor::new("balance").returns("long").modifiers(Modifiers::public()))
        .method(
            MethodDescriptor::new("close").modifiers(Modifiers(Modifiers::PUBLIC | Modifiers::FINAL)),
        );
    let request = GenerationRequest::new("Account", WrapperKind::NoInterfaceView, target);
    let mut emitter = CountingEmitter::default();
    let err = err_contains(jitdeploy::generate_with(&request, &Config::default(), &mut emitter), "final");
    assert!(err.is_configuration());
    assert_eq!(emitter.calls, 0);
}

#[test]
fn substitute_emitter_receives_every_unit() {
    init_logger();
    let request = account_remote_request();
    let mut emitter = CountingEmitter::default();
    let output = ok(jitdeploy::generate_with(&request, &Config::default(), &mut emitter));
    assert_eq!(emitter.calls, 1);
    assert_eq!(
        emitter.units,
        vec![
            "acme.Account_RemoteWrapper".to_string(),
            "acme._Account_Stub".to_string(),
            "acme._Account_Tie".to_string(),
        ]
    );
    assert!(output.units.is_empty());
    assert_eq!(output.wire_names.len(), 2);
}
