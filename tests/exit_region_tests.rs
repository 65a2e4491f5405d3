mod common;

use common::*;
use jitdeploy::consts::*;
use jitdeploy::exec::{Interpreter, RecordingRuntime, Thrown, Value};
use jitdeploy::{request_hierarchy, Config, GenerationRequest};

const UNKNOWN_FAILURE: &str = "java.lang.Error";

/// Run `method` of the request's wrapper with zero arguments.
fn run(request: &GenerationRequest, method: &str, runtime: &mut RecordingRuntime) -> Result<Value, Thrown> {
    let synthesis = ok(jitdeploy::synthesize(request, &Config::default()));
    let wrapper = unit(&synthesis, &request.wrapper_unit_name());
    let decl = wrapper.method(method).expect("dispatch method");
    let args = decl.params.iter().map(Value::zero).collect();
    Interpreter::new(wrapper, runtime).run(decl, args)
}

fn runtime(request: &GenerationRequest) -> RecordingRuntime {
    RecordingRuntime::new(request_hierarchy(request).0)
}

#[test]
fn every_path_runs_post_invoke_once() {
    init_logger();
    let failures = [None, Some(LIMIT_EXCEPTION), Some("java.lang.IllegalStateException"), Some(REMOTE_EXCEPTION), Some(UNKNOWN_FAILURE)];
    for request in [account_remote_request(), account_local_request()] {
        for failure in failures {
            let mut rt = runtime(&request);
            if let Some(failure) = failure {
                rt = rt.with_failure("deposit", failure);
            }
            let outcome = run(&request, "deposit", &mut rt);
            assert_eq!(rt.count("postInvoke"), 1, "{} with {failure:?}: {:?}", request.kind, rt.call_names());
            assert_eq!(rt.count("EjbPreInvoke"), 1);
            assert_eq!(outcome.is_err(), failure.is_some());
        }
    }
}

#[test]
fn successful_call_returns_implementation_result() {
    init_logger();
    let request = account_remote_request();
    let mut rt = runtime(&request).with_return("balance", Value::Long(42));
    let outcome = run(&request, "balance", &mut rt);
    assert_eq!(outcome, Ok(Value::Long(42)));
    assert_eq!(rt.call_names(), vec!["EjbPreInvoke", "balance", "postInvoke"]);
}

#[test]
fn arguments_are_offered_to_the_container_before_pre_invoke() {
    init_logger();
    let request = account_remote_request();
    let mut rt = runtime(&request);
    ok(run(&request, "deposit", &mut rt));
    assert_eq!(rt.call_names(), vec!["doesJaccNeedsEJBArguments", "EjbPreInvoke", "deposit", "postInvoke"]);
}

#[test]
fn application_failure_is_recorded_and_rethrown() {
    init_logger();
    let request = account_remote_request();
    let mut rt = runtime(&request).with_failure("deposit", LIMIT_EXCEPTION);
    let thrown = run(&request, "deposit", &mut rt).unwrap_err();
    assert_eq!(thrown.class(), LIMIT_EXCEPTION);
    assert_eq!(
        rt.call_names(),
        vec!["doesJaccNeedsEJBArguments", "EjbPreInvoke", "deposit", "setCheckedException", "postInvoke"]
    );
    assert_eq!(rt.count("failureCleanup"), 0);
}

#[test]
fn system_failure_is_wrapped_per_calling_convention() {
    init_logger();
    let remote = account_remote_request();
    let mut rt = runtime(&remote).with_failure("deposit", "java.lang.IllegalStateException");
    let thrown = run(&remote, "deposit", &mut rt).unwrap_err();
    assert_eq!(thrown.class(), REMOTE_EXCEPTION);
    let cause = rt.field(&thrown.0, "cause").and_then(Value::class_name).map(str::to_string);
    assert_eq!(cause.as_deref(), Some("java.lang.IllegalStateException"));
    assert_eq!(rt.count("setUncheckedException"), 1);
    assert_eq!(rt.count("failureCleanup"), 1);

    let local = account_local_request();
    let mut rt = runtime(&local).with_failure("deposit", "java.lang.IllegalStateException");
    let thrown = run(&local, "deposit", &mut rt).unwrap_err();
    assert_eq!(thrown.class(), EJB_EXCEPTION);
    assert_eq!(rt.count("setUncheckedLocalException"), 1);
    assert_eq!(rt.count("initCause"), 1);
    assert_eq!(rt.count("failureCleanup"), 1);
}

#[test]
fn failure_cleanup_follows_post_invoke() {
    init_logger();
    let request = account_remote_request();
    let mut rt = runtime(&request).with_failure("balance", UNKNOWN_FAILURE);
    let thrown = run(&request, "balance", &mut rt).unwrap_err();
    assert_eq!(thrown.class(), REMOTE_EXCEPTION);
    let names = rt.call_names();
    let post = names.iter().position(|n| *n == "postInvoke").expect("postInvoke");
    let cleanup = names.iter().position(|n| *n == "failureCleanup").expect("failureCleanup");
    assert!(post < cleanup, "{names:?}");
    assert_eq!(names.last(), Some(&"failureCleanup"));
}

#[test]
fn post_invoke_failure_surfaces_only_without_a_failure_in_flight() {
    init_logger();
    let request = account_remote_request();

    let mut rt = runtime(&request).with_failure("postInvoke", "java.lang.IllegalStateException");
    let thrown = run(&request, "balance", &mut rt).unwrap_err();
    assert_eq!(thrown.class(), "java.lang.IllegalStateException");
    assert_eq!(rt.count("postInvoke"), 1);
    assert_eq!(rt.count("setUncheckedException"), 1);
    assert_eq!(rt.count("failureCleanup"), 0);

    let mut rt = runtime(&request)
        .with_failure("deposit", LIMIT_EXCEPTION)
        .with_failure("postInvoke", "java.lang.IllegalStateException");
    let thrown = run(&request, "deposit", &mut rt).unwrap_err();
    assert_eq!(thrown.class(), LIMIT_EXCEPTION);
    assert_eq!(rt.count("postInvoke"), 1);
}

#[test]
fn pre_invoke_failure_still_reaches_the_exit_region() {
    init_logger();
    let request = account_local_request();
    let mut rt = runtime(&request).with_failure("EjbPreInvoke", "java.lang.IllegalStateException");
    let thrown = run(&request, "balance", &mut rt).unwrap_err();
    assert_eq!(thrown.class(), EJB_EXCEPTION);
    assert_eq!(rt.count("balance"), 0);
    assert_eq!(rt.count("postInvoke"), 1);
    assert_eq!(rt.count("failureCleanup"), 1);
}
