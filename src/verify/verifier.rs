use crate::codegen::bytecode::JAVA_5;
use crate::codegen::class::ClassFile;
use crate::codegen::constpool::Constant;
use crate::config::MIN_CLASS_FILE_MAJOR;
use super::constant_pool::{self, ConstantPoolVerifyError};
use super::methods::{self, MethodVerifyError};
use super::reader::read_class;

pub type VerifyResult<T> = Result<T, VerifyError>;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum VerifyError {
    #[error("Class file truncated at offset {0}")]
    Truncated(usize),
    #[error("Bad magic 0x{0:08x}")]
    BadMagic(u32),
    #[error("Malformed modified UTF-8 at offset {0}")]
    MalformedUtf8(usize),
    #[error("Unknown constant tag {0} at offset {1}")]
    UnknownConstantTag(u8, usize),
    #[error("{0} trailing bytes after the class file")]
    TrailingBytes(usize),
    #[error("Unsupported class file version {0} (frames are not emitted past {JAVA_5})")]
    UnsupportedVersion(u16),
    #[error("Constant pool: {0}")]
    ConstantPool(#[from] ConstantPoolVerifyError),
    #[error("Invalid this_class index {0}")]
    InvalidThisClass(u16),
    #[error("Invalid super_class index {0}")]
    InvalidSuperClass(u16),
    #[error("Invalid interface index {0}")]
    InvalidInterface(u16),
    #[error("Invalid field: {0}")]
    InvalidField(String),
    #[error("Method {method}: {source}")]
    Method {
        method: String,
        #[source]
        source: MethodVerifyError,
    },
    #[error("Internal verifier error: {0}")]
    Internal(String),
}

/// Verify the ClassFile by orchestrating all sub-verifiers
pub fn verify(class_file: &ClassFile) -> VerifyResult<()> {
    if class_file.major_version > JAVA_5 || class_file.major_version < MIN_CLASS_FILE_MAJOR {
        return Err(VerifyError::UnsupportedVersion(class_file.major_version));
    }
    constant_pool::verify(class_file)?;
    verify_class_index(class_file, class_file.this_class).map_err(|_| VerifyError::InvalidThisClass(class_file.this_class))?;
    verify_class_index(class_file, class_file.super_class).map_err(|_| VerifyError::InvalidSuperClass(class_file.super_class))?;
    for &iface in &class_file.interfaces {
        verify_class_index(class_file, iface).map_err(|_| VerifyError::InvalidInterface(iface))?;
    }
    verify_fields(class_file)?;
    verify_methods(class_file)?;
    Ok(())
}

/// Read serialized bytes back and verify them.
pub fn verify_bytes(bytes: &[u8]) -> VerifyResult<ClassFile> {
    let class_file = read_class(bytes)?;
    verify(&class_file)?;
    Ok(class_file)
}

fn verify_class_index(class_file: &ClassFile, index: u16) -> Result<(), ()> {
    match class_file.constant_pool.get(index) {
        Some(Constant::Class(_)) => Ok(()),
        _ => Err(()),
    }
}

fn verify_fields(class_file: &ClassFile) -> VerifyResult<()> {
    let pool = &class_file.constant_pool;
    for field in &class_file.fields {
        let name = pool
            .utf8(field.name_index)
            .ok_or_else(|| VerifyError::InvalidField(format!("name index {}", field.name_index)))?;
        let descriptor = pool
            .utf8(field.descriptor_index)
            .ok_or_else(|| VerifyError::InvalidField(format!("{name}: descriptor index {}", field.descriptor_index)))?;
        if !constant_pool::is_field_descriptor(descriptor) {
            return Err(VerifyError::InvalidField(format!("{name}: malformed descriptor {descriptor}")));
        }
    }
    Ok(())
}

fn verify_methods(class_file: &ClassFile) -> VerifyResult<()> {
    let pool = &class_file.constant_pool;
    for method in &class_file.methods {
        methods::verify_method(class_file, method).map_err(|source| VerifyError::Method {
            method: format!(
                "{}{}",
                pool.utf8(method.name_index).unwrap_or("?"),
                pool.utf8(method.descriptor_index).unwrap_or("")
            ),
            source,
        })?;
    }
    Ok(())
}
