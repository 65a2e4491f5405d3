//! Constant pool and constants for Java class files

use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(u16),
    String(u16),
    FieldRef(u16, u16),
    MethodRef(u16, u16),
    InterfaceMethodRef(u16, u16),
    NameAndType(u16, u16),
    /// Second slot of a Long or Double entry.
    Unusable,
}

/// Dedup key. Floats are keyed by bit pattern so NaN and -0.0 stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Key {
    Utf8(String),
    Integer(i32),
    Float(u32),
    Long(i64),
    Double(u64),
    Class(u16),
    String(u16),
    FieldRef(u16, u16),
    MethodRef(u16, u16),
    InterfaceMethodRef(u16, u16),
    NameAndType(u16, u16),
}

/// Constant pool with 1-based indices. Equal constants share one entry.
#[derive(Debug, Default, Clone)]
pub struct ConstantPool {
    constants: Vec<Constant>,
    index: HashMap<Key, u16>,
}

/// The pool ran past 65535 slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOverflow;

pub type PoolResult = Result<u16, PoolOverflow>;

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pool read back from a class file. Entries are not deduplicated.
    pub fn from_entries(constants: Vec<Constant>) -> Self {
        Self { constants, index: HashMap::new() }
    }

    /// Entry at a 1-based index.
    pub fn get(&self, index: u16) -> Option<&Constant> {
        (index as usize).checked_sub(1).and_then(|i| self.constants.get(i))
    }

    /// Number of slots used, as written into `constant_pool_count - 1`.
    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (u16, &Constant)> {
        self.constants.iter().enumerate().map(|(i, c)| ((i + 1) as u16, c))
    }

    fn intern(&mut self, key: Key, constant: Constant) -> PoolResult {
        if let Some(&idx) = self.index.get(&key) {
            return Ok(idx);
        }
        let wide = matches!(constant, Constant::Long(_) | Constant::Double(_));
        let needed = self.constants.len() + if wide { 2 } else { 1 };
        if needed > u16::MAX as usize - 1 {
            return Err(PoolOverflow);
        }
        self.constants.push(constant);
        let idx = self.constants.len() as u16;
        if wide {
            self.constants.push(Constant::Unusable);
        }
        self.index.insert(key, idx);
        Ok(idx)
    }

    pub fn add_utf8(&mut self, value: &str) -> PoolResult {
        self.intern(Key::Utf8(value.to_string()), Constant::Utf8(value.to_string()))
    }

    /// Class entry; dotted names are stored in internal form.
    pub fn add_class(&mut self, name: &str) -> PoolResult {
        let name_index = self.add_utf8(&name.replace('.', "/"))?;
        self.intern(Key::Class(name_index), Constant::Class(name_index))
    }

    pub fn add_name_and_type(&mut self, name: &str, descriptor: &str) -> PoolResult {
        let name_index = self.add_utf8(name)?;
        let descriptor_index = self.add_utf8(descriptor)?;
        self.intern(
            Key::NameAndType(name_index, descriptor_index),
            Constant::NameAndType(name_index, descriptor_index),
        )
    }

    pub fn add_field_ref(&mut self, class: &str, name: &str, descriptor: &str) -> PoolResult {
        let class_index = self.add_class(class)?;
        let nat = self.add_name_and_type(name, descriptor)?;
        self.intern(Key::FieldRef(class_index, nat), Constant::FieldRef(class_index, nat))
    }

    pub fn add_method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> PoolResult {
        let class_index = self.add_class(class)?;
        let nat = self.add_name_and_type(name, descriptor)?;
        self.intern(Key::MethodRef(class_index, nat), Constant::MethodRef(class_index, nat))
    }

    pub fn add_interface_method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> PoolResult {
        let class_index = self.add_class(class)?;
        let nat = self.add_name_and_type(name, descriptor)?;
        self.intern(
            Key::InterfaceMethodRef(class_index, nat),
            Constant::InterfaceMethodRef(class_index, nat),
        )
    }

    pub fn add_string(&mut self, value: &str) -> PoolResult {
        let utf8_index = self.add_utf8(value)?;
        self.intern(Key::String(utf8_index), Constant::String(utf8_index))
    }

    pub fn add_integer(&mut self, value: i32) -> PoolResult {
        self.intern(Key::Integer(value), Constant::Integer(value))
    }

    pub fn add_float(&mut self, value: f32) -> PoolResult {
        self.intern(Key::Float(value.to_bits()), Constant::Float(value))
    }

    pub fn add_long(&mut self, value: i64) -> PoolResult {
        self.intern(Key::Long(value), Constant::Long(value))
    }

    pub fn add_double(&mut self, value: f64) -> PoolResult {
        self.intern(Key::Double(value.to_bits()), Constant::Double(value))
    }

    /// Utf8 text at `index`, if that entry is a Utf8 constant.
    pub fn utf8(&self, index: u16) -> Option<&str> {
        match self.get(index) {
            Some(Constant::Utf8(s)) => Some(s),
            _ => None,
        }
    }

    /// Internal name of the Class entry at `index`.
    pub fn class_name(&self, index: u16) -> Option<&str> {
        match self.get(index) {
            Some(Constant::Class(name)) => self.utf8(*name),
            _ => None,
        }
    }
}

/// Modified UTF-8 as used by class files: NUL and supplementary
/// characters are encoded differently from standard UTF-8.
pub fn modified_utf8(value: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    for unit in value.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push((0xC0 | ((unit >> 6) & 0x1F)) as u8);
                out.push((0x80 | (unit & 0x3F)) as u8);
            }
            _ => {
                out.push((0xE0 | ((unit >> 12) & 0x0F)) as u8);
                out.push((0x80 | ((unit >> 6) & 0x3F)) as u8);
                out.push((0x80 | (unit & 0x3F)) as u8);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_are_one_based_and_shared() {
        let mut cp = ConstantPool::new();
        let a = cp.add_class("java.lang.Object").unwrap();
        let b = cp.add_class("java/lang/Object").unwrap();
        assert_eq!(a, b);
        assert_eq!(cp.class_name(a), Some("java/lang/Object"));
        assert_eq!(cp.get(1), Some(&Constant::Utf8("java/lang/Object".to_string())));
    }

    #[test]
    fn wide_constants_take_two_slots() {
        let mut cp = ConstantPool::new();
        let l = cp.add_long(7).unwrap();
        let next = cp.add_integer(1).unwrap();
        assert_eq!(l, 1);
        assert_eq!(next, 3);
        assert_eq!(cp.get(2), Some(&Constant::Unusable));
    }

    #[test]
    fn modified_utf8_encodes_nul_in_two_bytes() {
        assert_eq!(modified_utf8("a\0"), vec![b'a', 0xC0, 0x80]);
    }
}
