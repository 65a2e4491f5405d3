use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use super::{Heap, Interpreter, ObjectRef, Runtime, Thrown, Value};
use crate::consts::*;
use crate::ir::{Call, UnitDescription};
use crate::model::{TypeHierarchy, TypeRef};

/// Implementation behind the skeleton: `(method, args)` to a result or the
/// class of a failure to throw.
pub type Servant = Box<dyn FnMut(&str, &[Value]) -> Result<Value, String>>;

/// In-memory ORB joining a stub to a skeleton.
///
/// By-value arguments, results and failures are copied when written to a
/// stream, remote references are not. The colocated path copies through
/// `Util.copyObject(s)` instead.
pub struct LoopbackRuntime {
    hierarchy: TypeHierarchy,
    heap: Heap,
    skeleton: Rc<UnitDescription>,
    tie: Option<ObjectRef>,
    servant: Servant,
    servant_object: Option<ObjectRef>,
    colocated: bool,
    streams: HashMap<u32, VecDeque<Value>>,
    operations: HashMap<u32, String>,
    exception_replies: HashSet<u32>,
    /// Operation names the skeleton was asked for, in order.
    pub requests: Vec<String>,
    /// Values the servant received, per call.
    pub received: Vec<Vec<Value>>,
}

impl LoopbackRuntime {
    pub fn new(hierarchy: TypeHierarchy, skeleton: UnitDescription, servant: Servant) -> Self {
        Self {
            hierarchy,
            heap: Heap::default(),
            skeleton: Rc::new(skeleton),
            tie: None,
            servant,
            servant_object: None,
            colocated: false,
            streams: HashMap::new(),
            operations: HashMap::new(),
            exception_replies: HashSet::new(),
            requests: Vec::new(),
            received: Vec::new(),
        }
    }

    /// Serve the stub through its local fast path.
    pub fn colocated(mut self, colocated: bool) -> Self {
        self.colocated = colocated;
        self
    }

    /// A field slot as last written or first read.
    pub fn field(&self, target: &ObjectRef, name: &str) -> Option<&Value> {
        self.heap.peek(target, name)
    }

    fn servant_object(&mut self, ty: &TypeRef) -> ObjectRef {
        if let Some(o) = &self.servant_object {
            return o.clone();
        }
        let o = self.heap.allocate(&ty.name);
        self.servant_object = Some(o.clone());
        o
    }

    fn stream(&mut self, class: &str, contents: VecDeque<Value>) -> ObjectRef {
        let s = self.heap.allocate(class);
        self.streams.insert(s.id, contents);
        s
    }

    fn push(&mut self, out: Option<&Value>, value: Value) -> Result<Value, Thrown> {
        let queue = out.and_then(Value::object).and_then(|o| self.streams.get_mut(&o.id));
        match queue {
            Some(queue) => {
                queue.push_back(value);
                Ok(Value::Void)
            }
            None => Err(Thrown(self.heap.allocate(MARSHAL))),
        }
    }

    fn pop(&mut self, input: Option<&Value>) -> Result<Value, Thrown> {
        let next = input
            .and_then(Value::object)
            .and_then(|o| self.streams.get_mut(&o.id))
            .and_then(VecDeque::pop_front);
        next.ok_or_else(|| Thrown(self.heap.allocate(MARSHAL)))
    }

    /// Hand the request on `out` to the skeleton and turn its reply into
    /// the stub's input stream.
    fn exchange(&mut self, out: Option<&Value>) -> Result<Value, Thrown> {
        let Some(out) = out.and_then(Value::object) else {
            return Err(Thrown(self.heap.allocate(MARSHAL)));
        };
        let operation = self.operations.remove(&out.id).unwrap_or_default();
        let payload = self.streams.remove(&out.id).unwrap_or_default();
        self.requests.push(operation.clone());
        let input = self.stream(INPUT_STREAM, payload);
        let handler = self.heap.allocate(RESPONSE_HANDLER);
        let tie = match &self.tie {
            Some(t) => t.clone(),
            None => {
                let t = self.heap.allocate(&self.skeleton.name);
                self.tie = Some(t.clone());
                t
            }
        };

        let skeleton = Rc::clone(&self.skeleton);
        let args = vec![Value::Str(operation), Value::Object(input), Value::Object(handler)];
        let reply = Interpreter::with_this(&skeleton, self, tie).call("_invoke", args)?;
        let Some(reply) = reply.object().cloned() else {
            return Err(Thrown(self.heap.allocate(MARSHAL)));
        };
        let contents = self.streams.remove(&reply.id).unwrap_or_default();
        let stream = self.stream(PORTABLE_INPUT_STREAM, contents);
        if self.exception_replies.remove(&reply.id) {
            let failure = self.heap.allocate(APPLICATION_EXCEPTION);
            self.heap.set_field(&failure, "stream", Value::Object(stream));
            return Err(Thrown(failure));
        }
        Ok(Value::Object(stream))
    }

    fn serve(&mut self, method: &str, args: &[Value]) -> Result<Value, Thrown> {
        self.received.push(args.to_vec());
        match (self.servant)(method, args) {
            Ok(v) => Ok(v),
            Err(failure) => Err(Thrown(self.heap.allocate(&failure))),
        }
    }
}

impl Runtime for LoopbackRuntime {
    fn allocate(&mut self, class: &str) -> ObjectRef {
        self.heap.allocate(class)
    }

    fn new_object(&mut self, class: &str, _params: &[TypeRef], args: &[Value]) -> Result<Value, Thrown> {
        let object = self.heap.allocate(class);
        if let Some(Value::Str(_)) = args.first() {
            self.heap.set_field(&object, "message", args[0].clone());
        }
        Ok(Value::Object(object))
    }

    fn invoke(&mut self, call: &Call, receiver: Option<&Value>, args: &[Value]) -> Result<Value, Thrown> {
        let receiver_id = receiver.and_then(Value::object).map(|o| o.id);
        if receiver_id.is_some() && receiver_id == self.servant_object.as_ref().map(|o| o.id) {
            return self.serve(&call.name, args);
        }
        let first = args.first();
        match call.name.as_str() {
            "isLocal" => Ok(Value::Bool(self.colocated)),
            "_request" => {
                let out = self.stream(PORTABLE_OUTPUT_STREAM, VecDeque::new());
                if let Some(Value::Str(op)) = first {
                    self.operations.insert(out.id, op.clone());
                }
                Ok(Value::Object(out))
            }
            "_invoke" => self.exchange(first),
            "createReply" | "createExceptionReply" => {
                let out = self.stream(OUTPUT_STREAM, VecDeque::new());
                if call.name == "createExceptionReply" {
                    self.exception_replies.insert(out.id);
                }
                Ok(Value::Object(out))
            }
            "getInputStream" => {
                let Some(failure) = receiver.and_then(Value::object) else {
                    return Err(Thrown(self.heap.allocate(MARSHAL)));
                };
                Ok(self.heap.field(failure, "stream", &TypeRef::new(PORTABLE_INPUT_STREAM)))
            }
            "writeAny" => {
                let copy = args.get(1).map(|v| self.heap.copy(v)).unwrap_or(Value::Null);
                self.push(first, copy)
            }
            "writeRemoteObject" => self.push(first, args.get(1).cloned().unwrap_or(Value::Null)),
            "write_value" => {
                let copy = first.map(|v| self.heap.copy(v)).unwrap_or(Value::Null);
                self.push(receiver, copy)
            }
            name if name.starts_with("write_") => self.push(receiver, first.cloned().unwrap_or(Value::Null)),
            "readAny" => self.pop(first),
            name if name.starts_with("read_") => self.pop(receiver),
            "narrow" => Ok(first.cloned().unwrap_or(Value::Null)),
            "copyObject" => Ok(first.map(|v| self.heap.copy(v)).unwrap_or(Value::Null)),
            "copyObjects" => Ok(first.map(|v| self.heap.copy(v)).unwrap_or(Value::Null)),
            "mapSystemException" | "wrapException" => self.new_object(REMOTE_EXCEPTION, &[], &[]),
            _ => Ok(self.heap.fabricate(&call.ret)),
        }
    }

    fn get_field(&mut self, target: &ObjectRef, owner: &str, name: &str, ty: &TypeRef) -> Result<Value, Thrown> {
        let is_target = (owner == self.skeleton.name && name == TIE_TARGET_FIELD)
            || (owner == SERVANT_OBJECT && name == "servant");
        if is_target {
            return Ok(Value::Object(self.servant_object(ty)));
        }
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
