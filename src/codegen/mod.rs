//! Module emitter: unit descriptions to JVM class files
//!
//! [`ClassFileEmitter`] turns every [`UnitDescription`] of a module into a
//! class file. Method bodies go through [`lower::Lowering`]; the result is
//! serialized with [`writer::ClassfileWritable`].

pub mod attribute;
pub mod bytecode;
pub mod class;
pub mod code;
pub mod constpool;
pub mod descriptor;
pub mod field;
pub mod lower;
pub mod method;
pub mod writer;

use std::collections::HashSet;

use thiserror::Error;

pub use bytecode::access_flags;
pub use class::ClassFile;
pub use constpool::{Constant, ConstantPool};
pub use writer::ClassfileWritable;

use crate::config::MAX_CLASS_FILE_MAJOR;
use crate::ir::{LoadableUnit, ModuleDescription, UnitDescription};
use attribute::{AttributeInfo, CodeAttribute, CODE, EXCEPTIONS};
use descriptor::type_to_descriptor;
use field::FieldInfo;
use lower::Lowering;
use method::MethodInfo;

/// The emitter rejected a unit description.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot emit {unit}{}: {message}", .method.as_ref().map(|m| format!(".{m}")).unwrap_or_default())]
pub struct EmitError {
    pub unit: String,
    /// Method name and descriptor, when the fault is inside a method.
    pub method: Option<String>,
    pub message: String,
}

impl EmitError {
    pub fn class(unit: &str, message: impl Into<String>) -> Self {
        Self { unit: unit.to_string(), method: None, message: message.into() }
    }

    pub fn method(unit: &str, method: impl Into<String>, message: impl Into<String>) -> Self {
        Self { unit: unit.to_string(), method: Some(method.into()), message: message.into() }
    }
}

pub type EmitResult<T> = Result<T, EmitError>;

/// Accepts a structured module description and produces loadable units.
pub trait ModuleEmitter {
    fn emit(&mut self, module: &ModuleDescription) -> EmitResult<Vec<LoadableUnit>>;
}

/// Production emitter producing class files without StackMapTable frames.
#[derive(Debug, Clone)]
pub struct ClassFileEmitter {
    major_version: u16,
}

impl Default for ClassFileEmitter {
    fn default() -> Self {
        Self::new(MAX_CLASS_FILE_MAJOR)
    }
}

impl ClassFileEmitter {
    pub fn new(major_version: u16) -> Self {
        Self { major_version }
    }

    /// Assemble the class file of one unit.
    pub fn build_class(&self, unit: &UnitDescription) -> EmitResult<ClassFile> {
        let overflow = |_| EmitError::class(&unit.name, "constant pool overflow");
        let mut cf = ClassFile::new();
        cf.major_version = self.major_version;
        cf.access_flags = unit.access;

        let mut cp = ConstantPool::new();
        cf.this_class = cp.add_class(&unit.name).map_err(overflow)?;
        cf.super_class = cp.add_class(&unit.ancestor).map_err(overflow)?;
        for iface in &unit.interfaces {
            let idx = cp.add_class(iface).map_err(overflow)?;
            if cf.interfaces.contains(&idx) {
                return Err(EmitError::class(&unit.name, format!("interface {iface} listed twice")));
            }
            cf.interfaces.push(idx);
        }

        let mut seen = HashSet::new();
        for field in &unit.fields {
            if !seen.insert(field.name.clone()) {
                return Err(EmitError::class(&unit.name, format!("duplicate field {}", field.name)));
            }
            let name = cp.add_utf8(&field.name).map_err(overflow)?;
            let desc = cp.add_utf8(&type_to_descriptor(&field.ty)).map_err(overflow)?;
            cf.fields.push(FieldInfo::new(field.access, name, desc));
        }

        let mut seen = HashSet::new();
        for m in &unit.methods {
            let descriptor = m.descriptor();
            let label = format!("{}{}", m.name, descriptor);
            if !seen.insert(label.clone()) {
                return Err(EmitError::method(&unit.name, label, "duplicate method"));
            }
            let fail = |message: String| EmitError::method(&unit.name, label.clone(), message);
            let name = cp.add_utf8(&m.name).map_err(|_| fail("constant pool overflow".into()))?;
            let desc = cp.add_utf8(&descriptor).map_err(|_| fail("constant pool overflow".into()))?;
            let mut info = MethodInfo::new(m.access, name, desc);

            if m.body.is_some() {
                let lowered = Lowering::new(&unit.name, m, &mut cp, self.major_version)
                    .lower()
                    .map_err(fail)?;
                let code = lowered.code;
                let mut attr = CodeAttribute::new(code.state.max_stacksize, code.max_locals, code.code);
                attr.exception_table = code.exception_table;
                let code_name = cp.add_utf8(CODE).map_err(|_| fail("constant pool overflow".into()))?;
                info.attributes.push(attr.into_attribute(code_name));
            }
            if !m.throws.is_empty() {
                let mut classes = Vec::with_capacity(m.throws.len());
                for t in &m.throws {
                    classes.push(cp.add_class(&t.name).map_err(|_| fail("constant pool overflow".into()))?);
                }
                let attr_name = cp.add_utf8(EXCEPTIONS).map_err(|_| fail("constant pool overflow".into()))?;
                info.attributes.push(AttributeInfo::exceptions(attr_name, &classes));
            }
            cf.methods.push(info);
        }

        cf.constant_pool = cp;
        log::debug!(
            "emitted {} ({} methods, {} constants)",
            unit.name,
            cf.methods.len(),
            cf.constant_pool.len()
        );
        Ok(cf)
    }
}

impl ModuleEmitter for ClassFileEmitter {
    fn emit(&mut self, module: &ModuleDescription) -> EmitResult<Vec<LoadableUnit>> {
        module
            .units
            .iter()
            .map(|unit| {
                let cf = self.build_class(unit)?;
                Ok(LoadableUnit { name: unit.name.clone(), bytes: cf.to_classfile_bytes() })
            })
            .collect()
    }
}
