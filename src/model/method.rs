//! Reflected method descriptors

use std::fmt;

use serde::{Deserialize, Serialize};

use super::TypeRef;

/// Java modifier bits, as they appear in class file access flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Modifiers(pub u16);

impl Modifiers {
    pub const PUBLIC: u16 = 0x0001;
    pub const PRIVATE: u16 = 0x0002;
    pub const PROTECTED: u16 = 0x0004;
    pub const STATIC: u16 = 0x0008;
    pub const FINAL: u16 = 0x0010;
    pub const SYNCHRONIZED: u16 = 0x0020;
    pub const NATIVE: u16 = 0x0100;
    pub const ABSTRACT: u16 = 0x0400;

    const NAMES: [(&'static str, u16); 8] = [
        ("public", Self::PUBLIC),
        ("private", Self::PRIVATE),
        ("protected", Self::PROTECTED),
        ("static", Self::STATIC),
        ("final", Self::FINAL),
        ("synchronized", Self::SYNCHRONIZED),
        ("native", Self::NATIVE),
        ("abstract", Self::ABSTRACT),
    ];

    pub fn public() -> Self {
        Self(Self::PUBLIC)
    }

    /// Interface methods are implicitly public abstract.
    pub fn interface_method() -> Self {
        Self(Self::PUBLIC | Self::ABSTRACT)
    }

    pub fn with(self, bits: u16) -> Self {
        Self(self.0 | bits)
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn is_public(self) -> bool {
        self.0 & Self::PUBLIC != 0
    }

    pub fn is_private(self) -> bool {
        self.0 & Self::PRIVATE != 0
    }

    pub fn is_static(self) -> bool {
        self.0 & Self::STATIC != 0
    }

    pub fn is_final(self) -> bool {
        self.0 & Self::FINAL != 0
    }
}

impl TryFrom<Vec<String>> for Modifiers {
    type Error = String;

    fn try_from(words: Vec<String>) -> Result<Self, Self::Error> {
        let mut bits = 0;
        for word in &words {
            let (_, bit) = Self::NAMES
                .iter()
                .find(|(name, _)| *name == word.as_str())
                .ok_or_else(|| format!("unknown modifier '{word}'"))?;
            bits |= bit;
        }
        Ok(Modifiers(bits))
    }
}

impl From<Modifiers> for Vec<String> {
    fn from(m: Modifiers) -> Self {
        Modifiers::NAMES
            .iter()
            .filter(|(_, bit)| m.0 & bit != 0)
            .map(|(name, _)| name.to_string())
            .collect()
    }
}

fn default_return() -> TypeRef {
    TypeRef::void()
}

fn default_modifiers() -> Modifiers {
    Modifiers::interface_method()
}

/// One operation on an exposed interface or implementation class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodDescriptor {
    pub name: String,
    #[serde(default)]
    pub params: Vec<TypeRef>,
    #[serde(default = "default_return", rename = "returns")]
    pub return_type: TypeRef,
    #[serde(default, rename = "throws")]
    pub exceptions: Vec<TypeRef>,
    /// Interface or class declaring the method. Filled in from the
    /// enclosing descriptor when left empty.
    #[serde(default)]
    pub owner: String,
    #[serde(default = "default_modifiers")]
    pub modifiers: Modifiers,
}

impl MethodDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            return_type: TypeRef::void(),
            exceptions: Vec::new(),
            owner: String::new(),
            modifiers: Modifiers::interface_method(),
        }
    }

    pub fn param(mut self, ty: impl Into<TypeRef>) -> Self {
        self.params.push(ty.into());
        self
    }

    pub fn returns(mut self, ty: impl Into<TypeRef>) -> Self {
        self.return_type = ty.into();
        self
    }

    pub fn throws(mut self, ty: impl Into<TypeRef>) -> Self {
        self.exceptions.push(ty.into());
        self
    }

    pub fn owned_by(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    pub fn modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Parameter part of the JVM descriptor, e.g. `(ILjava/lang/String;)`.
    pub fn param_descriptor(&self) -> String {
        let mut d = String::from("(");
        for p in &self.params {
            d.push_str(&crate::codegen::descriptor::type_to_descriptor(p));
        }
        d.push(')');
        d
    }

    pub fn descriptor(&self) -> String {
        crate::codegen::descriptor::method_descriptor(&self.params, &self.return_type)
    }

    /// Name plus parameter descriptor. Two descriptors with the same key
    /// are the same operation for dispatch purposes.
    pub fn signature_key(&self) -> String {
        format!("{}{}", self.name, self.param_descriptor())
    }

    pub fn declares(&self, failure: &str) -> bool {
        self.exceptions.iter().any(|e| e.is_class(failure))
    }

    /// Same name and parameter types.
    pub fn same_signature(&self, other: &MethodDescriptor) -> bool {
        self.name == other.name && self.params == other.params
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.owner.is_empty() {
            write!(f, "{}.", self.owner)?;
        }
        write!(f, "{}(", self.name)?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{p}")?;
        }
        f.write_str(")")
    }
}
