//! Class hierarchy facts needed for failure classification and marshalling
//!
//! A request carries the classes it references (custom exceptions, value
//! types, remote interfaces). They are layered over a fixed set of JDK,
//! javax.ejb and CORBA types. Each request works on its own copy.

use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::consts;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub name: String,
    #[serde(default)]
    pub superclass: Option<String>,
    #[serde(default)]
    pub interfaces: Vec<String>,
    #[serde(default)]
    pub is_interface: bool,
}

impl ClassInfo {
    pub fn class(name: &str, superclass: &str) -> Self {
        Self {
            name: name.to_string(),
            superclass: Some(superclass.to_string()),
            interfaces: Vec::new(),
            is_interface: false,
        }
    }

    pub fn interface(name: &str, extends: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            superclass: None,
            interfaces: extends.iter().map(|s| s.to_string()).collect(),
            is_interface: true,
        }
    }

    pub fn implementing(mut self, interfaces: &[&str]) -> Self {
        self.interfaces.extend(interfaces.iter().map(|s| s.to_string()));
        self
    }
}

static BUILTINS: Lazy<TypeHierarchy> = Lazy::new(|| {
    let mut h = TypeHierarchy { classes: BTreeMap::new() };
    h.insert(ClassInfo {
        name: consts::OBJECT.to_string(),
        superclass: None,
        interfaces: Vec::new(),
        is_interface: false,
    });
    h.insert(ClassInfo::interface(consts::SERIALIZABLE, &[]));
    h.insert(ClassInfo::interface(consts::EXTERNALIZABLE, &[consts::SERIALIZABLE]));
    h.insert(ClassInfo::class(consts::STRING, consts::OBJECT).implementing(&[consts::SERIALIZABLE]));
    h.insert(ClassInfo::class(consts::THROWABLE, consts::OBJECT).implementing(&[consts::SERIALIZABLE]));
    h.insert(ClassInfo::class(consts::EXCEPTION, consts::THROWABLE));
    h.insert(ClassInfo::class(consts::ERROR, consts::THROWABLE));
    h.insert(ClassInfo::class(consts::RUNTIME_EXCEPTION, consts::EXCEPTION));
    h.insert(ClassInfo::class("java.lang.IllegalArgumentException", consts::RUNTIME_EXCEPTION));
    h.insert(ClassInfo::class("java.lang.IllegalStateException", consts::RUNTIME_EXCEPTION));
    h.insert(ClassInfo::class(consts::NULL_POINTER_EXCEPTION, consts::RUNTIME_EXCEPTION));
    h.insert(ClassInfo::class(consts::CLASS_CAST_EXCEPTION, consts::RUNTIME_EXCEPTION));
    h.insert(ClassInfo::class(consts::INDEX_OUT_OF_BOUNDS, consts::RUNTIME_EXCEPTION));
    h.insert(ClassInfo::class(consts::ABSTRACT_METHOD_ERROR, consts::ERROR));
    h.insert(ClassInfo::class(consts::STACK_OVERFLOW_ERROR, consts::ERROR));
    h.insert(ClassInfo::class(consts::NO_SUCH_METHOD_EXCEPTION, "java.lang.ReflectiveOperationException"));
    h.insert(ClassInfo::class("java.lang.ReflectiveOperationException", consts::EXCEPTION));
    h.insert(ClassInfo::class(consts::IO_EXCEPTION, consts::EXCEPTION));
    h.insert(ClassInfo::class(consts::REMOTE_EXCEPTION, consts::IO_EXCEPTION));
    h.insert(ClassInfo::class(consts::UNEXPECTED_EXCEPTION, consts::REMOTE_EXCEPTION));
    h.insert(ClassInfo::class("java.rmi.NoSuchObjectException", consts::REMOTE_EXCEPTION));
    h.insert(ClassInfo::class("java.rmi.AccessException", consts::REMOTE_EXCEPTION));
    h.insert(ClassInfo::interface(consts::REMOTE, &[]));
    h.insert(ClassInfo::interface(consts::COLLECTION, &[consts::ITERABLE]));
    h.insert(ClassInfo::interface(consts::ITERABLE, &[]));
    h.insert(ClassInfo::interface(consts::ENUMERATION, &[]));
    h.insert(ClassInfo::interface(consts::FUTURE, &[]));
    h.insert(ClassInfo::interface(consts::EJB_OBJECT, &[consts::REMOTE]));
    h.insert(ClassInfo::interface(consts::EJB_HOME, &[consts::REMOTE]));
    h.insert(ClassInfo::interface(consts::EJB_LOCAL_OBJECT, &[]));
    h.insert(ClassInfo::interface(consts::EJB_LOCAL_HOME, &[]));
    h.insert(ClassInfo::class(consts::EJB_EXCEPTION, consts::RUNTIME_EXCEPTION));
    h.insert(ClassInfo::class(consts::CREATE_EXCEPTION, consts::EXCEPTION));
    h.insert(ClassInfo::class("javax.ejb.DuplicateKeyException", consts::CREATE_EXCEPTION));
    h.insert(ClassInfo::class(consts::FINDER_EXCEPTION, consts::EXCEPTION));
    h.insert(ClassInfo::class("javax.ejb.ObjectNotFoundException", consts::FINDER_EXCEPTION));
    h.insert(ClassInfo::class(consts::REMOVE_EXCEPTION, consts::EXCEPTION));
    h.insert(ClassInfo::class(consts::RESOURCE_EXCEPTION, consts::EXCEPTION));
    h.insert(ClassInfo::class(consts::CREATE_FAILURE_EXCEPTION, consts::CREATE_EXCEPTION));
    h.insert(ClassInfo::class(consts::SYSTEM_EXCEPTION, consts::RUNTIME_EXCEPTION));
    h.insert(ClassInfo::class(consts::BAD_OPERATION, consts::SYSTEM_EXCEPTION));
    h.insert(ClassInfo::class(consts::MARSHAL, consts::SYSTEM_EXCEPTION));
    h.insert(ClassInfo::class(consts::UNKNOWN_EXCEPTION, consts::SYSTEM_EXCEPTION));
    h.insert(ClassInfo::class(consts::APPLICATION_EXCEPTION, consts::EXCEPTION));
    h.insert(ClassInfo::class(consts::REMARSHAL_EXCEPTION, consts::EXCEPTION));
    h.insert(ClassInfo::interface(consts::CORBA_OBJECT, &[]));
    h.insert(ClassInfo::class(consts::PORTABLE_INPUT_STREAM, consts::OBJECT));
    h.insert(ClassInfo::class(consts::INPUT_STREAM, consts::PORTABLE_INPUT_STREAM));
    h.insert(ClassInfo::class(consts::PORTABLE_OUTPUT_STREAM, consts::OBJECT));
    h.insert(ClassInfo::class(consts::OUTPUT_STREAM, consts::PORTABLE_OUTPUT_STREAM));
    h.insert(ClassInfo::class(consts::OBJECT_IMPL, consts::OBJECT).implementing(&[consts::CORBA_OBJECT]));
    h.insert(ClassInfo::class(consts::CORBA_STUB, consts::OBJECT_IMPL));
    for p in crate::model::Primitive::ALL {
        let parent = match p {
            crate::model::Primitive::Boolean | crate::model::Primitive::Char => consts::OBJECT,
            _ => "java.lang.Number",
        };
        h.insert(ClassInfo::class(p.box_class(), parent).implementing(&[consts::SERIALIZABLE]));
    }
    h.insert(ClassInfo::class("java.lang.Number", consts::OBJECT).implementing(&[consts::SERIALIZABLE]));
    h
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeHierarchy {
    classes: BTreeMap<String, ClassInfo>,
}

impl Default for TypeHierarchy {
    fn default() -> Self {
        Self::builtin().clone()
    }
}

impl TypeHierarchy {
    /// Shared read-only hierarchy of the well-known types.
    pub fn builtin() -> &'static TypeHierarchy {
        &BUILTINS
    }

    /// Well-known types plus `extra`. Entries in `extra` replace built-ins of the same name.
    pub fn with_classes(extra: impl IntoIterator<Item = ClassInfo>) -> Self {
        let mut h = Self::default();
        for info in extra {
            h.insert(info);
        }
        h
    }

    pub fn insert(&mut self, info: ClassInfo) {
        self.classes.insert(info.name.clone(), info);
    }

    pub fn get(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn is_interface(&self, name: &str) -> bool {
        self.get(name).map(|c| c.is_interface).unwrap_or(false)
    }

    /// Reflexive subtype test over superclass and interface edges.
    /// Every class is a subtype of `java.lang.Object`.
    pub fn is_subtype(&self, sub: &str, sup: &str) -> bool {
        if sub == sup || sup == consts::OBJECT {
            return true;
        }
        let mut seen = BTreeSet::new();
        let mut work = vec![sub];
        while let Some(name) = work.pop() {
            if !seen.insert(name) {
                continue;
            }
            let Some(info) = self.classes.get(name) else { continue };
            for parent in info.superclass.iter().chain(info.interfaces.iter()) {
                if parent == sup {
                    return true;
                }
                work.push(parent.as_str());
            }
        }
        false
    }

    pub fn is_strict_subtype(&self, sub: &str, sup: &str) -> bool {
        sub != sup && self.is_subtype(sub, sup)
    }

    pub fn is_throwable(&self, name: &str) -> bool {
        self.is_subtype(name, consts::THROWABLE)
    }

    /// RuntimeException and Error subtypes.
    pub fn is_unchecked(&self, name: &str) -> bool {
        self.is_subtype(name, consts::RUNTIME_EXCEPTION) || self.is_subtype(name, consts::ERROR)
    }

    /// RemoteException or any of its subtypes.
    pub fn is_protocol_native(&self, name: &str) -> bool {
        self.is_subtype(name, consts::REMOTE_EXCEPTION)
    }

    pub fn is_remote_interface(&self, name: &str) -> bool {
        name != consts::OBJECT && self.is_subtype(name, consts::REMOTE)
    }

    /// Superclass chain, nearest first.
    pub fn superclasses(&self, name: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut current = self.get(name).and_then(|c| c.superclass.clone());
        while let Some(next) = current {
            if out.contains(&next) {
                break;
            }
            current = self.get(&next).and_then(|c| c.superclass.clone());
            out.push(next);
        }
        out
    }

    /// Register a failure type the request did not describe as a direct
    /// `java.lang.Exception` subclass. Returns true when it was unknown.
    pub fn assume_checked_failure(&mut self, name: &str) -> bool {
        if self.contains(name) {
            return false;
        }
        log::debug!("assuming {name} extends {}", consts::EXCEPTION);
        self.insert(ClassInfo::class(name, consts::EXCEPTION));
        true
    }
}
