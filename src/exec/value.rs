use std::collections::HashMap;

use crate::consts::{OBJECT, STRING};
use crate::ir::Constant;
use crate::model::{Primitive, TypeRef};

/// Handle to an object owned by a runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub id: u32,
    /// Class the object is known as. Objects a runtime makes up for a
    /// declared type carry that type.
    pub class: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Result of a void call.
    Void,
    Null,
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Str(String),
    Object(ObjectRef),
    Array(Vec<Value>),
    Class(TypeRef),
}

impl Value {
    /// Default value of a local or field of type `ty`.
    pub fn zero(ty: &TypeRef) -> Self {
        match ty.primitive() {
            Some(Primitive::Boolean) => Value::Bool(false),
            Some(Primitive::Long) => Value::Long(0),
            Some(Primitive::Float) => Value::Float(0.0),
            Some(Primitive::Double) => Value::Double(0.0),
            Some(_) => Value::Int(0),
            None if ty.is_void() => Value::Void,
            None => Value::Null,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Value::Bool(_) | Value::Int(_) | Value::Long(_) | Value::Float(_) | Value::Double(_))
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            _ => false,
        }
    }

    pub fn object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Runtime class of a reference value.
    pub fn class_name(&self) -> Option<&str> {
        match self {
            Value::Object(o) => Some(&o.class),
            Value::Str(_) => Some(STRING),
            Value::Array(_) | Value::Class(_) => Some(OBJECT),
            _ => None,
        }
    }

    /// Reference identity, `==` on primitives.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Object(a), Value::Object(b)) => a.id == b.id,
            (a, b) => a == b,
        }
    }
}

impl From<&Constant> for Value {
    fn from(c: &Constant) -> Self {
        match c {
            Constant::Null => Value::Null,
            Constant::Bool(b) => Value::Bool(*b),
            Constant::Int(i) => Value::Int(*i),
            Constant::Long(l) => Value::Long(*l),
            Constant::Float(f) => Value::Float(*f),
            Constant::Double(d) => Value::Double(*d),
            Constant::Str(s) => Value::Str(s.clone()),
        }
    }
}

/// A failure propagating out of generated code.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{} thrown (object {})", .0.class, .0.id)]
pub struct Thrown(pub ObjectRef);

impl Thrown {
    pub fn class(&self) -> &str {
        &self.0.class
    }

    pub fn value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

/// Object store shared by the bundled runtimes: identities and field slots.
#[derive(Debug, Default)]
pub struct Heap {
    next_id: u32,
    fields: HashMap<(u32, String), Value>,
}

impl Heap {
    pub fn allocate(&mut self, class: &str) -> ObjectRef {
        self.next_id += 1;
        ObjectRef { id: self.next_id, class: class.to_string() }
    }

    /// Field slot, filled on first read with a made-up object of the
    /// declared type (or the type's zero value).
    pub fn field(&mut self, target: &ObjectRef, name: &str, ty: &TypeRef) -> Value {
        let key = (target.id, name.to_string());
        if let Some(v) = self.fields.get(&key) {
            return v.clone();
        }
        let v = self.fabricate(ty);
        self.fields.insert(key, v.clone());
        v
    }

    pub fn peek(&self, target: &ObjectRef, name: &str) -> Option<&Value> {
        self.fields.get(&(target.id, name.to_string()))
    }

    pub fn set_field(&mut self, target: &ObjectRef, name: &str, value: Value) {
        self.fields.insert((target.id, name.to_string()), value);
    }

    /// A value standing in for an unknown result of type `ty`.
    pub fn fabricate(&mut self, ty: &TypeRef) -> Value {
        if ty.is_array() {
            Value::Array(Vec::new())
        } else if ty.is_reference() {
            Value::Object(self.allocate(&ty.name))
        } else {
            Value::zero(ty)
        }
    }

    /// Shallow copy with a fresh identity. Field slots are copied too.
    pub fn copy(&mut self, value: &Value) -> Value {
        match value {
            Value::Object(o) => {
                let copy = self.allocate(&o.class);
                let slots: Vec<(String, Value)> = self
                    .fields
                    .iter()
                    .filter(|((id, _), _)| *id == o.id)
                    .map(|((_, name), v)| (name.clone(), v.clone()))
                    .collect();
                for (name, v) in slots {
                    self.fields.insert((copy.id, name), v);
                }
                Value::Object(copy)
            }
            Value::Array(items) => Value::Array(items.iter().map(|v| self.copy(v)).collect()),
            other => other.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fabricated_fields_are_stable() {
        let mut heap = Heap::default();
        let this = heap.allocate("acme.W");
        let ty = TypeRef::new("com.ibm.ejs.container.EJSContainer");
        let first = heap.field(&this, "container", &ty);
        assert_eq!(heap.field(&this, "container", &ty), first);
        assert_eq!(heap.field(&this, "count", &TypeRef::new("int")), Value::Int(0));
    }

    #[test]
    fn copies_get_new_identity() {
        let mut heap = Heap::default();
        let item = heap.allocate("acme.Item");
        heap.set_field(&item, "qty", Value::Int(3));
        let copy = heap.copy(&Value::Object(item.clone()));
        let copied = copy.object().unwrap();
        assert_ne!(copied.id, item.id);
        assert_eq!(copied.class, "acme.Item");
        assert_eq!(heap.peek(copied, "qty"), Some(&Value::Int(3)));
        assert!(!copy.same(&Value::Object(item)));
    }
}
