//! Trait-based serialization for classfile structures

use std::io::Write;

use super::attribute::{AttributeInfo, CodeAttribute, ExceptionTableEntry};
use super::bytecode::constant_tags::*;
use super::class::ClassFile;
use super::constpool::{modified_utf8, Constant, ConstantPool};
use super::field::FieldInfo;
use super::method::MethodInfo;

/// An object which can be written into a classfile.
pub trait ClassfileWritable {
    /// Writes the bytes of this object into the given buffer.
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> std::io::Result<()>;

    /// Writes the bytes of this object into a newly created buffer.
    fn to_classfile_bytes(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_to_classfile(&mut buffer);
        buffer
    }
}

fn write_u16<W: Write>(buffer: &mut W, value: u16) -> std::io::Result<()> {
    buffer.write_all(&value.to_be_bytes())
}

fn write_all<T: ClassfileWritable, W: Write>(items: &[T], buffer: &mut W) -> std::io::Result<()> {
    write_u16(buffer, items.len() as u16)?;
    for item in items {
        item.write_to_classfile(buffer)?;
    }
    Ok(())
}

impl ClassfileWritable for ClassFile {
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> std::io::Result<()> {
        buffer.write_all(&self.magic.to_be_bytes())?;
        write_u16(buffer, self.minor_version)?;
        write_u16(buffer, self.major_version)?;
        self.constant_pool.write_to_classfile(buffer)?;
        write_u16(buffer, self.access_flags)?;
        write_u16(buffer, self.this_class)?;
        write_u16(buffer, self.super_class)?;
        write_u16(buffer, self.interfaces.len() as u16)?;
        for interface in &self.interfaces {
            write_u16(buffer, *interface)?;
        }
        write_all(&self.fields, buffer)?;
        write_all(&self.methods, buffer)?;
        write_all(&self.attributes, buffer)
    }
}

impl ClassfileWritable for ConstantPool {
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> std::io::Result<()> {
        write_u16(buffer, (self.len() + 1) as u16)?;
        for (_, constant) in self.entries() {
            constant.write_to_classfile(buffer)?;
        }
        Ok(())
    }
}

impl ClassfileWritable for Constant {
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> std::io::Result<()> {
        match self {
            Constant::Utf8(s) => {
                let bytes = modified_utf8(s);
                buffer.write_all(&[CONSTANT_UTF8])?;
                write_u16(buffer, bytes.len() as u16)?;
                buffer.write_all(&bytes)
            }
            Constant::Integer(v) => {
                buffer.write_all(&[CONSTANT_INTEGER])?;
                buffer.write_all(&v.to_be_bytes())
            }
            Constant::Float(v) => {
                buffer.write_all(&[CONSTANT_FLOAT])?;
                buffer.write_all(&v.to_bits().to_be_bytes())
            }
            Constant::Long(v) => {
                buffer.write_all(&[CONSTANT_LONG])?;
                buffer.write_all(&v.to_be_bytes())
            }
            Constant::Double(v) => {
                buffer.write_all(&[CONSTANT_DOUBLE])?;
                buffer.write_all(&v.to_bits().to_be_bytes())
            }
            Constant::Class(i) => {
                buffer.write_all(&[CONSTANT_CLASS])?;
                write_u16(buffer, *i)
            }
            Constant::String(i) => {
                buffer.write_all(&[CONSTANT_STRING])?;
                write_u16(buffer, *i)
            }
            Constant::FieldRef(c, nt) | Constant::MethodRef(c, nt) | Constant::InterfaceMethodRef(c, nt) => {
                let tag = match self {
                    Constant::FieldRef(..) => CONSTANT_FIELDREF,
                    Constant::MethodRef(..) => CONSTANT_METHODREF,
                    _ => CONSTANT_INTERFACEMETHODREF,
                };
                buffer.write_all(&[tag])?;
                write_u16(buffer, *c)?;
                write_u16(buffer, *nt)
            }
            Constant::NameAndType(n, d) => {
                buffer.write_all(&[CONSTANT_NAMEANDTYPE])?;
                write_u16(buffer, *n)?;
                write_u16(buffer, *d)
            }
            // Occupies a slot index but has no bytes of its own.
            Constant::Unusable => Ok(()),
        }
    }
}

impl ClassfileWritable for FieldInfo {
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> std::io::Result<()> {
        write_u16(buffer, self.access_flags)?;
        write_u16(buffer, self.name_index)?;
        write_u16(buffer, self.descriptor_index)?;
        write_all(&self.attributes, buffer)
    }
}

impl ClassfileWritable for MethodInfo {
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> std::io::Result<()> {
        write_u16(buffer, self.access_flags)?;
        write_u16(buffer, self.name_index)?;
        write_u16(buffer, self.descriptor_index)?;
        write_all(&self.attributes, buffer)
    }
}

impl ClassfileWritable for AttributeInfo {
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> std::io::Result<()> {
        write_u16(buffer, self.name_index)?;
        buffer.write_all(&(self.info.len() as u32).to_be_bytes())?;
        buffer.write_all(&self.info)
    }
}

impl ClassfileWritable for CodeAttribute {
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> std::io::Result<()> {
        write_u16(buffer, self.max_stack)?;
        write_u16(buffer, self.max_locals)?;
        buffer.write_all(&(self.code.len() as u32).to_be_bytes())?;
        buffer.write_all(&self.code)?;
        write_all(&self.exception_table, buffer)?;
        write_all(&self.attributes, buffer)
    }
}

impl ClassfileWritable for ExceptionTableEntry {
    fn write_to_classfile<W: Write>(&self, buffer: &mut W) -> std::io::Result<()> {
        write_u16(buffer, self.start_pc)?;
        write_u16(buffer, self.end_pc)?;
        write_u16(buffer, self.handler_pc)?;
        write_u16(buffer, self.catch_type)
    }
}
