//! Attributes and exception table structures for Java class files

use super::writer::ClassfileWritable;

pub const CODE: &str = "Code";
pub const EXCEPTIONS: &str = "Exceptions";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeInfo {
    pub name_index: u16,
    pub info: Vec<u8>,
}

impl AttributeInfo {
    pub fn new(name_index: u16, info: Vec<u8>) -> Self {
        Self { name_index, info }
    }

    /// `Exceptions` attribute body for the given Class constant indices.
    pub fn exceptions(name_index: u16, classes: &[u16]) -> Self {
        let mut info = Vec::with_capacity(2 + classes.len() * 2);
        info.extend_from_slice(&(classes.len() as u16).to_be_bytes());
        for c in classes {
            info.extend_from_slice(&c.to_be_bytes());
        }
        Self { name_index, info }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeAttribute {
    pub max_stack: u16,
    pub max_locals: u16,
    pub code: Vec<u8>,
    pub exception_table: Vec<ExceptionTableEntry>,
    pub attributes: Vec<AttributeInfo>,
}

impl CodeAttribute {
    pub fn new(max_stack: u16, max_locals: u16, code: Vec<u8>) -> Self {
        Self {
            max_stack,
            max_locals,
            code,
            exception_table: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub fn into_attribute(self, name_index: u16) -> AttributeInfo {
        AttributeInfo::new(name_index, self.to_classfile_bytes())
    }

    /// Decode an attribute body. `None` when it is truncated.
    pub fn parse(info: &[u8]) -> Option<Self> {
        let u16_at = |at: usize| info.get(at..at + 2).map(|b| u16::from_be_bytes([b[0], b[1]]));
        let max_stack = u16_at(0)?;
        let max_locals = u16_at(2)?;
        let len = u32::from_be_bytes(info.get(4..8)?.try_into().ok()?) as usize;
        let code = info.get(8..8 + len)?.to_vec();
        let mut at = 8 + len;
        let count = u16_at(at)? as usize;
        at += 2;
        let mut exception_table = Vec::with_capacity(count);
        for _ in 0..count {
            exception_table.push(ExceptionTableEntry::new(
                u16_at(at)?,
                u16_at(at + 2)?,
                u16_at(at + 4)?,
                u16_at(at + 6)?,
            ));
            at += 8;
        }
        let count = u16_at(at)? as usize;
        at += 2;
        let mut attributes = Vec::with_capacity(count);
        for _ in 0..count {
            let name_index = u16_at(at)?;
            let len = u32::from_be_bytes(info.get(at + 2..at + 6)?.try_into().ok()?) as usize;
            attributes.push(AttributeInfo::new(name_index, info.get(at + 6..at + 6 + len)?.to_vec()));
            at += 6 + len;
        }
        Some(Self { max_stack, max_locals, code, exception_table, attributes })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionTableEntry {
    pub start_pc: u16,
    pub end_pc: u16,
    pub handler_pc: u16,
    /// Class constant of the caught type; 0 catches everything.
    pub catch_type: u16,
}

impl ExceptionTableEntry {
    pub fn new(start_pc: u16, end_pc: u16, handler_pc: u16, catch_type: u16) -> Self {
        Self { start_pc, end_pc, handler_pc, catch_type }
    }

    pub fn covers(&self, pc: u16) -> bool {
        self.start_pc <= pc && pc < self.end_pc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_attribute_survives_encoding() {
        let mut code = CodeAttribute::new(2, 3, vec![0x2a, 0xb0]);
        code.exception_table.push(ExceptionTableEntry::new(0, 1, 1, 0));
        let parsed = CodeAttribute::parse(&code.to_classfile_bytes()).unwrap();
        assert_eq!(parsed, code);
        assert!(CodeAttribute::parse(&[0, 1]).is_none());
    }
}
