//! Descriptor data model
//!
//! Immutable inputs of a generation request: type references, the class
//! hierarchy they resolve against, method descriptors, the wrapper kind and
//! the request itself.

mod hierarchy;
mod kind;
mod method;
mod request;
mod types;

pub use hierarchy::{ClassInfo, TypeHierarchy};
pub use kind::{WrapperBaseAccess, WrapperKind};
pub use method::{MethodDescriptor, Modifiers};
pub use request::{
    stub_unit_name, ComponentType, FactoryBinding, GenerationRequest, InterfaceDescriptor, MethodPolicy,
    TargetDescriptor,
};
pub use types::{Primitive, TypeRef};

/// Dense per-request index of an exposed method.
pub type DispatchId = u32;
