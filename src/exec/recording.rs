use std::collections::HashMap;

use super::{Heap, ObjectRef, Runtime, Thrown, Value};
use crate::consts::THROWABLE;
use crate::ir::Call;
use crate::model::{TypeHierarchy, TypeRef};

/// One call that left the interpreted unit.
#[derive(Debug, Clone, PartialEq)]
pub struct HookCall {
    pub owner: String,
    pub name: String,
    pub args: Vec<Value>,
}

/// Runtime answering every call with a made-up value of the declared
/// return type. Calls are recorded in order.
#[derive(Debug, Default)]
pub struct RecordingRuntime {
    hierarchy: TypeHierarchy,
    heap: Heap,
    failures: HashMap<String, String>,
    returns: HashMap<String, Value>,
    calls: Vec<HookCall>,
}

impl RecordingRuntime {
    pub fn new(hierarchy: TypeHierarchy) -> Self {
        Self { hierarchy, ..Self::default() }
    }

    /// Every call to a method named `method` throws a new `failure`.
    pub fn with_failure(mut self, method: &str, failure: &str) -> Self {
        self.failures.insert(method.to_string(), failure.to_string());
        self
    }

    /// Every call to a method named `method` returns `value`.
    pub fn with_return(mut self, method: &str, value: Value) -> Self {
        self.returns.insert(method.to_string(), value);
        self
    }

    pub fn calls(&self) -> &[HookCall] {
        &self.calls
    }

    pub fn call_names(&self) -> Vec<&str> {
        self.calls.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls.iter().filter(|c| c.name == method).count()
    }

    /// A field slot as last written or first read.
    pub fn field(&self, target: &ObjectRef, name: &str) -> Option<&Value> {
        self.heap.peek(target, name)
    }
}

impl Runtime for RecordingRuntime {
    fn allocate(&mut self, class: &str) -> ObjectRef {
        self.heap.allocate(class)
    }

    fn new_object(&mut self, class: &str, _params: &[TypeRef], args: &[Value]) -> Result<Value, Thrown> {
        let object = self.heap.allocate(class);
        if self.hierarchy.is_throwable(class) {
            for arg in args {
                match arg {
                    Value::Str(_) => self.heap.set_field(&object, "message", arg.clone()),
                    Value::Object(_) => self.heap.set_field(&object, "cause", arg.clone()),
                    _ => {}
                }
            }
        }
        Ok(Value::Object(object))
    }

    fn invoke(&mut self, call: &Call, receiver: Option<&Value>, args: &[Value]) -> Result<Value, Thrown> {
        self.calls.push(HookCall { owner: call.owner.clone(), name: call.name.clone(), args: args.to_vec() });
        if let Some(failure) = self.failures.get(&call.name) {
            log::trace!("scripted {failure} from {}", call.name);
            return Err(Thrown(self.heap.allocate(failure)));
        }
        if let Some(value) = self.returns.get(&call.name) {
            return Ok(value.clone());
        }
        if call.name == "initCause" && call.owner == THROWABLE {
            if let (Some(Value::Object(target)), Some(cause)) = (receiver, args.first()) {
                self.heap.set_field(target, "cause", cause.clone());
                return Ok(Value::Object(target.clone()));
            }
        }
        Ok(self.heap.fabricate(&call.ret))
    }

    fn get_field(&mut self, target: &ObjectRef, _owner: &str, name: &str, ty: &TypeRef) -> Result<Value, Thrown> {
        Ok(self.heap.field(target, name, ty))
    }

    fn set_field(&mut self, target: &ObjectRef, _owner: &str, name: &str, value: Value) -> Result<(), Thrown> {
        self.heap.set_field(target, name, value);
        Ok(())
    }

    fn is_subtype(&self, sub: &str, sup: &str) -> bool {
        self.hierarchy.is_subtype(sub, sup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::Interpreter;
    use crate::ir::{BodyBuilder, Expr, Handler, MethodDecl, Stmt, TryRegion, UnitDescription};
    use crate::consts::*;

    fn unit(stmts: Vec<Stmt>, b: BodyBuilder) -> UnitDescription {
        let mut unit = UnitDescription::new("acme.Probe", OBJECT);
        unit.methods.push(MethodDecl::new("run", vec![], TypeRef::void()).with_body(b.finish(stmts)));
        unit
    }

    fn hook(name: &str) -> Stmt {
        Stmt::Eval(Expr::invoke_static("acme.Hooks", name, &[], TypeRef::void(), vec![]))
    }

    #[test]
    fn scripted_failure_reaches_matching_handler() {
        let mut b = BodyBuilder::new();
        let e = b.local_of("e", RUNTIME_EXCEPTION);
        let stmts = vec![Stmt::Try(TryRegion {
            body: vec![hook("work"), hook("unreached")],
            handlers: vec![Handler { catch: Some(RUNTIME_EXCEPTION.into()), binding: e, body: vec![hook("recover")] }],
            exit: None,
        })];
        let unit = unit(stmts, b);
        let mut rt = RecordingRuntime::new(TypeHierarchy::default()).with_failure("work", "java.lang.IllegalStateException");
        let result = Interpreter::new(&unit, &mut rt).call("run", vec![]);
        assert_eq!(result, Ok(Value::Void));
        assert_eq!(rt.call_names(), vec!["work", "recover"]);
    }

    #[test]
    fn unmatched_failure_propagates() {
        let unit = unit(vec![hook("work")], BodyBuilder::new());
        let mut rt = RecordingRuntime::new(TypeHierarchy::default()).with_failure("work", REMOTE_EXCEPTION);
        let thrown = Interpreter::new(&unit, &mut rt).call("run", vec![]).unwrap_err();
        assert_eq!(thrown.class(), REMOTE_EXCEPTION);
    }
}
