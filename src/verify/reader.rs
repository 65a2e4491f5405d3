//! Decoder for class files, the inverse of `codegen::writer`

use super::{VerifyError, VerifyResult};
use crate::codegen::attribute::AttributeInfo;
use crate::codegen::bytecode::{constant_tags::*, MAGIC};
use crate::codegen::field::FieldInfo;
use crate::codegen::method::MethodInfo;
use crate::codegen::{ClassFile, Constant, ConstantPool};

struct Cursor<'a> {
    bytes: &'a [u8],
    at: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize) -> VerifyResult<&'a [u8]> {
        let slice = self
            .bytes
            .get(self.at..self.at + n)
            .ok_or(VerifyError::Truncated(self.at))?;
        self.at += n;
        Ok(slice)
    }

    fn u8(&mut self) -> VerifyResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> VerifyResult<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> VerifyResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> VerifyResult<u64> {
        Ok(((self.u32()? as u64) << 32) | self.u32()? as u64)
    }

    fn attributes(&mut self) -> VerifyResult<Vec<AttributeInfo>> {
        let count = self.u16()?;
        let mut out = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let name_index = self.u16()?;
            let len = self.u32()? as usize;
            out.push(AttributeInfo::new(name_index, self.take(len)?.to_vec()));
        }
        Ok(out)
    }
}

/// Decode modified UTF-8. Invalid sequences are rejected.
fn decode_utf8(bytes: &[u8], at: usize) -> VerifyResult<String> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    let bad = || VerifyError::MalformedUtf8(at);
    while i < bytes.len() {
        let b = bytes[i] as u16;
        if b & 0x80 == 0 && b != 0 {
            units.push(b);
            i += 1;
        } else if b & 0xE0 == 0xC0 {
            let b2 = *bytes.get(i + 1).ok_or_else(bad)? as u16;
            units.push(((b & 0x1F) << 6) | (b2 & 0x3F));
            i += 2;
        } else if b & 0xF0 == 0xE0 {
            let b2 = *bytes.get(i + 1).ok_or_else(bad)? as u16;
            let b3 = *bytes.get(i + 2).ok_or_else(bad)? as u16;
            units.push(((b & 0x0F) << 12) | ((b2 & 0x3F) << 6) | (b3 & 0x3F));
            i += 3;
        } else {
            return Err(bad());
        }
    }
    String::from_utf16(&units).map_err(|_| bad())
}

/// Parse a class file. Only the constant kinds the emitter produces are accepted.
pub fn read_class(bytes: &[u8]) -> VerifyResult<ClassFile> {
    let mut c = Cursor { bytes, at: 0 };
    let mut cf = ClassFile::new();
    cf.magic = c.u32()?;
    if cf.magic != MAGIC {
        return Err(VerifyError::BadMagic(cf.magic));
    }
    cf.minor_version = c.u16()?;
    cf.major_version = c.u16()?;

    let count = c.u16()?;
    let mut constants = Vec::with_capacity(count as usize);
    while constants.len() + 1 < count as usize {
        let at = c.at;
        let tag = c.u8()?;
        let constant = match tag {
            CONSTANT_UTF8 => {
                let len = c.u16()? as usize;
                Constant::Utf8(decode_utf8(c.take(len)?, at)?)
            }
            CONSTANT_INTEGER => Constant::Integer(c.u32()? as i32),
            CONSTANT_FLOAT => Constant::Float(f32::from_bits(c.u32()?)),
            CONSTANT_LONG => Constant::Long(c.u64()? as i64),
            CONSTANT_DOUBLE => Constant::Double(f64::from_bits(c.u64()?)),
            CONSTANT_CLASS => Constant::Class(c.u16()?),
            CONSTANT_STRING => Constant::String(c.u16()?),
            CONSTANT_FIELDREF => Constant::FieldRef(c.u16()?, c.u16()?),
            CONSTANT_METHODREF => Constant::MethodRef(c.u16()?, c.u16()?),
            CONSTANT_INTERFACEMETHODREF => Constant::InterfaceMethodRef(c.u16()?, c.u16()?),
            CONSTANT_NAMEANDTYPE => Constant::NameAndType(c.u16()?, c.u16()?),
            other => return Err(VerifyError::UnknownConstantTag(other, at)),
        };
        let wide = matches!(constant, Constant::Long(_) | Constant::Double(_));
        constants.push(constant);
        if wide {
            constants.push(Constant::Unusable);
        }
    }
    if constants.len() + 1 != count as usize {
        return Err(VerifyError::Internal("wide constant overruns the pool".to_string()));
    }
    cf.constant_pool = ConstantPool::from_entries(constants);

    cf.access_flags = c.u16()?;
    cf.this_class = c.u16()?;
    cf.super_class = c.u16()?;
    let count = c.u16()?;
    for _ in 0..count {
        cf.interfaces.push(c.u16()?);
    }
    let count = c.u16()?;
    for _ in 0..count {
        let mut f = FieldInfo::new(c.u16()?, c.u16()?, c.u16()?);
        f.attributes = c.attributes()?;
        cf.fields.push(f);
    }
    let count = c.u16()?;
    for _ in 0..count {
        let mut m = MethodInfo::new(c.u16()?, c.u16()?, c.u16()?);
        m.attributes = c.attributes()?;
        cf.methods.push(m);
    }
    cf.attributes = c.attributes()?;
    if c.at != bytes.len() {
        return Err(VerifyError::TrailingBytes(bytes.len() - c.at));
    }
    Ok(cf)
}
