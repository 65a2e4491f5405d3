//! Class file verifiers for emitted units
//!
//! Emitted bytes are read back into a [`ClassFile`](crate::codegen::ClassFile)
//! and checked for constant pool integrity, class linkage, method code shape
//! and exception table ranges.

pub mod constant_pool;
mod methods;
pub mod reader;
mod verifier;

pub use reader::read_class;
pub use verifier::{verify, verify_bytes, VerifyError, VerifyResult};
