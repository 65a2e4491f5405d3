//! Reference interpreter for generated units
//!
//! [`Interpreter`] walks the unit descriptions handed to the module emitter
//! and runs them against a [`Runtime`] standing in for the container and
//! the ORB. Two runtimes are bundled:
//!
//! - [`RecordingRuntime`] answers every call with a made-up value, records
//!   it, and throws scripted failures keyed by method name;
//! - [`LoopbackRuntime`] connects a stub to its skeleton through in-memory
//!   streams and serves the skeleton's target with a closure.

mod interpreter;
mod loopback;
mod recording;
mod value;

pub use interpreter::Interpreter;
pub use loopback::{LoopbackRuntime, Servant};
pub use recording::{HookCall, RecordingRuntime};
pub use value::{Heap, ObjectRef, Thrown, Value};

use crate::ir::Call;
use crate::model::TypeRef;

/// Everything generated code reaches outside its own unit.
pub trait Runtime {
    /// A new identity for an instance of `class`, without running a constructor.
    fn allocate(&mut self, class: &str) -> ObjectRef;

    fn new_object(&mut self, class: &str, params: &[TypeRef], args: &[Value]) -> Result<Value, Thrown>;

    /// `receiver` is `None` for static calls and never `Value::Null`.
    fn invoke(&mut self, call: &Call, receiver: Option<&Value>, args: &[Value]) -> Result<Value, Thrown>;

    fn get_field(&mut self, target: &ObjectRef, owner: &str, name: &str, ty: &TypeRef) -> Result<Value, Thrown>;

    fn set_field(&mut self, target: &ObjectRef, owner: &str, name: &str, value: Value) -> Result<(), Thrown>;

    /// Handler matching and `instanceof`.
    fn is_subtype(&self, sub: &str, sup: &str) -> bool;
}
