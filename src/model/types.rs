//! Type references used by descriptors and unit descriptions

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::consts;

/// Java primitive types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Primitive {
    Boolean,
    Char,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl Primitive {
    pub const ALL: [Primitive; 8] = [
        Primitive::Boolean,
        Primitive::Char,
        Primitive::Byte,
        Primitive::Short,
        Primitive::Int,
        Primitive::Long,
        Primitive::Float,
        Primitive::Double,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "boolean" => Primitive::Boolean,
            "char" => Primitive::Char,
            "byte" => Primitive::Byte,
            "short" => Primitive::Short,
            "int" => Primitive::Int,
            "long" => Primitive::Long,
            "float" => Primitive::Float,
            "double" => Primitive::Double,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Primitive::Boolean => "boolean",
            Primitive::Char => "char",
            Primitive::Byte => "byte",
            Primitive::Short => "short",
            Primitive::Int => "int",
            Primitive::Long => "long",
            Primitive::Float => "float",
            Primitive::Double => "double",
        }
    }

    pub fn descriptor(self) -> char {
        match self {
            Primitive::Boolean => 'Z',
            Primitive::Char => 'C',
            Primitive::Byte => 'B',
            Primitive::Short => 'S',
            Primitive::Int => 'I',
            Primitive::Long => 'J',
            Primitive::Float => 'F',
            Primitive::Double => 'D',
        }
    }

    /// Wrapper class used when the value is boxed into an argument array.
    pub fn box_class(self) -> &'static str {
        match self {
            Primitive::Boolean => "java.lang.Boolean",
            Primitive::Char => "java.lang.Character",
            Primitive::Byte => "java.lang.Byte",
            Primitive::Short => "java.lang.Short",
            Primitive::Int => "java.lang.Integer",
            Primitive::Long => "java.lang.Long",
            Primitive::Float => "java.lang.Float",
            Primitive::Double => "java.lang.Double",
        }
    }

    /// Accessor on the wrapper class that yields the primitive value.
    pub fn unbox_method(self) -> &'static str {
        match self {
            Primitive::Boolean => "booleanValue",
            Primitive::Char => "charValue",
            Primitive::Byte => "byteValue",
            Primitive::Short => "shortValue",
            Primitive::Int => "intValue",
            Primitive::Long => "longValue",
            Primitive::Float => "floatValue",
            Primitive::Double => "doubleValue",
        }
    }

    /// Local variable / operand stack slots.
    pub fn slots(self) -> u16 {
        match self {
            Primitive::Long | Primitive::Double => 2,
            _ => 1,
        }
    }
}

/// A (possibly array) type, named by its dotted binary name or primitive keyword.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TypeRef {
    pub name: String,
    pub array_dims: usize,
}

impl TypeRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), array_dims: 0 }
    }

    pub fn array(name: impl Into<String>, dims: usize) -> Self {
        Self { name: name.into(), array_dims: dims }
    }

    pub fn void() -> Self {
        Self::new("void")
    }

    pub fn object() -> Self {
        Self::new(consts::OBJECT)
    }

    pub fn string() -> Self {
        Self::new(consts::STRING)
    }

    pub fn prim(p: Primitive) -> Self {
        Self::new(p.name())
    }

    /// Parse `int`, `java.lang.String[][]` or a descriptor-free spelling of either.
    pub fn parse(text: &str) -> Option<Self> {
        let mut base = text.trim();
        let mut dims = 0;
        while let Some(stripped) = base.strip_suffix("[]") {
            base = stripped.trim_end();
            dims += 1;
        }
        if base.is_empty() || base.contains(|c: char| c.is_whitespace() || c == '[' || c == ']') {
            return None;
        }
        if base == "void" && dims > 0 {
            return None;
        }
        Some(Self::array(base, dims))
    }

    pub fn primitive(&self) -> Option<Primitive> {
        if self.array_dims == 0 {
            Primitive::from_name(&self.name)
        } else {
            None
        }
    }

    pub fn is_void(&self) -> bool {
        self.array_dims == 0 && self.name == "void"
    }

    pub fn is_array(&self) -> bool {
        self.array_dims > 0
    }

    pub fn is_reference(&self) -> bool {
        !self.is_void() && self.primitive().is_none()
    }

    pub fn is_boolean(&self) -> bool {
        self.primitive() == Some(Primitive::Boolean)
    }

    /// Element type of an array, one dimension down.
    pub fn component(&self) -> Option<TypeRef> {
        (self.array_dims > 0).then(|| TypeRef::array(self.name.clone(), self.array_dims - 1))
    }

    /// Innermost element type of an array; the type itself otherwise.
    pub fn element(&self) -> TypeRef {
        TypeRef::new(self.name.clone())
    }

    pub fn is_class(&self, name: &str) -> bool {
        self.array_dims == 0 && self.name == name
    }

    /// Stack / local slots taken by a value of this type.
    pub fn slots(&self) -> u16 {
        if self.is_void() {
            0
        } else {
            self.primitive().map(Primitive::slots).unwrap_or(1)
        }
    }

    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    pub fn package(&self) -> Option<&str> {
        self.name.rfind('.').map(|i| &self.name[..i])
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for _ in 0..self.array_dims {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

impl From<&str> for TypeRef {
    fn from(text: &str) -> Self {
        TypeRef::parse(text).unwrap_or_else(|| TypeRef::new(text))
    }
}

impl TryFrom<String> for TypeRef {
    type Error = String;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        TypeRef::parse(&text).ok_or_else(|| format!("malformed type '{text}'"))
    }
}

impl From<TypeRef> for String {
    fn from(ty: TypeRef) -> Self {
        ty.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_arrays_and_primitives() {
        let t = TypeRef::parse("java.lang.String[][]").unwrap();
        assert_eq!(t.name, "java.lang.String");
        assert_eq!(t.array_dims, 2);
        assert_eq!(t.component().unwrap().to_string(), "java.lang.String[]");
        assert_eq!(TypeRef::parse("long").unwrap().slots(), 2);
        assert!(TypeRef::parse("void[]").is_none());
        assert!(TypeRef::parse("a b").is_none());
    }

    #[test]
    fn array_of_primitive_is_reference() {
        let t = TypeRef::array("int", 1);
        assert!(t.primitive().is_none());
        assert!(t.is_reference());
        assert_eq!(t.slots(), 1);
    }
}
