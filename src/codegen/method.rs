//! MethodInfo structure

use super::attribute::{AttributeInfo, CodeAttribute, CODE, EXCEPTIONS};
use super::constpool::ConstantPool;

#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub access_flags: u16,
    pub name_index: u16,
    pub descriptor_index: u16,
    pub attributes: Vec<AttributeInfo>,
}

impl MethodInfo {
    pub fn new(access_flags: u16, name_index: u16, descriptor_index: u16) -> Self {
        Self { access_flags, name_index, descriptor_index, attributes: Vec::new() }
    }

    fn attribute(&self, pool: &ConstantPool, name: &str) -> Option<&AttributeInfo> {
        self.attributes.iter().find(|a| pool.utf8(a.name_index) == Some(name))
    }

    /// Decoded Code attribute, if present and well formed.
    pub fn code(&self, pool: &ConstantPool) -> Option<CodeAttribute> {
        self.attribute(pool, CODE).and_then(|a| CodeAttribute::parse(&a.info))
    }

    /// Class constant indices of the Exceptions attribute.
    pub fn exceptions(&self, pool: &ConstantPool) -> Vec<u16> {
        let Some(attr) = self.attribute(pool, EXCEPTIONS) else { return Vec::new() };
        attr.info
            .get(2..)
            .unwrap_or_default()
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect()
    }
}
