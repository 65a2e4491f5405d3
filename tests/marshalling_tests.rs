mod common;

use common::*;
use jitdeploy::consts::*;
use jitdeploy::exec::{Interpreter, LoopbackRuntime, ObjectRef, Runtime, Servant, Thrown, Value};
use jitdeploy::ir::UnitDescription;
use jitdeploy::{request_hierarchy, Config};

struct Pair {
    stub: UnitDescription,
    runtime: LoopbackRuntime,
}

fn pair(servant: Servant, colocated: bool) -> Pair {
    let request = account_remote_request();
    let synthesis = ok(jitdeploy::synthesize(&request, &Config::default()));
    let stub = unit(&synthesis, "acme._Account_Stub").clone();
    let skeleton = unit(&synthesis, &request.skeleton_unit_name()).clone();
    let runtime = LoopbackRuntime::new(request_hierarchy(&request).0, skeleton, servant).colocated(colocated);
    Pair { stub, runtime }
}

/// Echoes the deposited item back, reports a fixed balance.
fn echo_servant() -> Servant {
    Box::new(|method: &str, args: &[Value]| match method {
        "deposit" => Ok(args[0].clone()),
        "balance" => Ok(Value::Long(42)),
        other => Err(format!("unexpected {other}")),
    })
}

fn deposit(p: &mut Pair, item: &ObjectRef, amount: i64) -> Result<Value, Thrown> {
    let args = vec![Value::Object(item.clone()), Value::Long(amount)];
    Interpreter::new(&p.stub, &mut p.runtime).call("deposit", args)
}

fn returned_object(result: Result<Value, Thrown>) -> ObjectRef {
    match ok(result) {
        Value::Object(o) => o,
        other => panic!("expected an object, got {other:?}"),
    }
}

#[test]
fn arguments_and_results_cross_the_wire() {
    init_logger();
    let mut p = pair(echo_servant(), false);
    let item = p.runtime.allocate(ITEM);
    p.runtime.set_field(&item, ITEM, "sku", Value::Str("A-17".to_string())).unwrap();
    p.runtime.set_field(&item, ITEM, "quantity", Value::Long(3)).unwrap();
    let result = returned_object(deposit(&mut p, &item, 5));

    assert_eq!(p.runtime.requests, vec!["deposit".to_string()]);
    let received = p.runtime.received[0].clone();
    assert_eq!(received[1], Value::Long(5));
    let sent = received[0].object().expect("item argument");
    assert_eq!(sent.class, ITEM);
    assert_ne!(sent.id, item.id, "by-value argument must be copied");
    assert_eq!(result.class, ITEM);
    assert_ne!(result.id, sent.id, "by-value result must be copied");
    for copy in [sent, &result] {
        assert_eq!(p.runtime.field(copy, "sku"), Some(&Value::Str("A-17".to_string())));
        assert_eq!(p.runtime.field(copy, "quantity"), Some(&Value::Long(3)));
    }

    p.runtime.set_field(&item, ITEM, "quantity", Value::Long(9)).unwrap();
    assert_eq!(p.runtime.field(&result, "quantity"), Some(&Value::Long(3)));
}

#[test]
fn primitive_result_is_decoded() {
    init_logger();
    let mut p = pair(echo_servant(), false);
    let result = Interpreter::new(&p.stub, &mut p.runtime).call("balance", vec![]);
    assert_eq!(result, Ok(Value::Long(42)));
    assert_eq!(p.runtime.requests, vec!["balance".to_string()]);
    assert!(p.runtime.received[0].is_empty());
}

#[test]
fn application_failure_is_rebuilt_on_the_caller_side() {
    init_logger();
    let servant: Servant = Box::new(|_: &str, _: &[Value]| Err(LIMIT_EXCEPTION.to_string()));
    let mut p = pair(servant, false);
    let item = p.runtime.allocate(ITEM);
    let thrown = deposit(&mut p, &item, 5).unwrap_err();
    assert_eq!(thrown.class(), LIMIT_EXCEPTION);
}

#[test]
fn undeclared_failure_reaches_the_caller_as_remote_exception() {
    init_logger();
    let servant: Servant = Box::new(|_: &str, _: &[Value]| Err("java.lang.IllegalStateException".to_string()));
    let mut p = pair(servant, false);
    let thrown = Interpreter::new(&p.stub, &mut p.runtime).call("balance", vec![]).unwrap_err();
    assert_eq!(thrown.class(), REMOTE_EXCEPTION);
}

#[test]
fn unknown_operation_is_rejected_by_the_skeleton() {
    init_logger();
    let request = account_remote_request();
    let synthesis = ok(jitdeploy::synthesize(&request, &Config::default()));
    let skeleton = unit(&synthesis, &request.skeleton_unit_name());
    let mut runtime = LoopbackRuntime::new(request_hierarchy(&request).0, skeleton.clone(), echo_servant());
    let input = runtime.allocate(INPUT_STREAM);
    let handler = runtime.allocate(RESPONSE_HANDLER);
    let args = vec![Value::Str("withdraw".to_string()), Value::Object(input), Value::Object(handler)];
    let thrown = Interpreter::new(skeleton, &mut runtime).call("_invoke", args).unwrap_err();
    assert_eq!(thrown.class(), BAD_OPERATION);
    assert!(runtime.received.is_empty());
}

#[test]
fn colocated_call_copies_without_marshalling() {
    init_logger();
    let mut p = pair(echo_servant(), true);
    let item = p.runtime.allocate(ITEM);
    let result = returned_object(deposit(&mut p, &item, 7));

    assert!(p.runtime.requests.is_empty());
    let received = &p.runtime.received[0];
    assert_eq!(received[1], Value::Long(7));
    let sent = received[0].object().expect("item argument");
    assert_ne!(sent.id, item.id);
    assert_eq!(result.class, ITEM);
    assert_ne!(result.id, sent.id);
}

#[test]
fn colocated_application_failure_keeps_its_type() {
    init_logger();
    let servant: Servant = Box::new(|_: &str, _: &[Value]| Err(LIMIT_EXCEPTION.to_string()));
    let mut p = pair(servant, true);
    let item = p.runtime.allocate(ITEM);
    let thrown = deposit(&mut p, &item, 7).unwrap_err();
    assert_eq!(thrown.class(), LIMIT_EXCEPTION);
    assert!(p.runtime.requests.is_empty());
}
