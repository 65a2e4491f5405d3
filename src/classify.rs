//! Failure classification of a method's declared failure set

use serde::Serialize;

use crate::config::Config;
use crate::consts;
use crate::model::{TypeHierarchy, TypeRef};

/// Which handlers a dispatch method needs besides the catch-all.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FailureClassification {
    /// A dedicated RuntimeException handler must precede the application ones.
    pub system_unchecked: bool,
    /// A dedicated RemoteException handler must precede the application ones.
    pub protocol_native: bool,
    /// Application failures, subtypes before supertypes.
    pub application_checked: Vec<TypeRef>,
    /// Declared RemoteException subtypes, kept for validation rules.
    pub declared_protocol_native: Vec<TypeRef>,
}

impl FailureClassification {
    /// Handler types in emission order, without the catch-all.
    pub fn handler_types(&self) -> Vec<TypeRef> {
        let mut out = Vec::new();
        if self.system_unchecked {
            out.push(TypeRef::new(consts::RUNTIME_EXCEPTION));
        }
        if self.protocol_native {
            out.push(TypeRef::new(consts::REMOTE_EXCEPTION));
        }
        out.extend(self.application_checked.iter().cloned());
        out
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Classifier<'h> {
    hierarchy: &'h TypeHierarchy,
    unchecked_are_system: bool,
    remote_are_application: bool,
}

impl<'h> Classifier<'h> {
    pub fn new(hierarchy: &'h TypeHierarchy) -> Self {
        Self { hierarchy, unchecked_are_system: true, remote_are_application: false }
    }

    pub fn with_config(hierarchy: &'h TypeHierarchy, config: &Config) -> Self {
        Self {
            hierarchy,
            unchecked_are_system: config.declared_unchecked_are_system_exceptions,
            remote_are_application: config.declared_remote_are_application_exceptions,
        }
    }

    pub fn classify(&self, declared: &[TypeRef], is_remote_style: bool) -> FailureClassification {
        let h = self.hierarchy;
        let mut checked: Vec<TypeRef> = Vec::new();
        let mut protocol: Vec<TypeRef> = Vec::new();
        for ty in declared {
            if checked.contains(ty) || protocol.contains(ty) {
                continue;
            }
            if h.is_unchecked(&ty.name) {
                continue;
            }
            if h.is_protocol_native(&ty.name) {
                protocol.push(ty.clone());
                if !self.remote_are_application {
                    continue;
                }
            }
            checked.push(ty.clone());
        }

        // A declared supertype of RuntimeException / RemoteException would
        // swallow those failures as application payload.
        let system_unchecked = self.unchecked_are_system
            && checked.iter().any(|c| h.is_strict_subtype(consts::RUNTIME_EXCEPTION, &c.name));
        let protocol_native = is_remote_style
            && !self.remote_are_application
            && checked.iter().any(|c| h.is_strict_subtype(consts::REMOTE_EXCEPTION, &c.name));

        FailureClassification {
            system_unchecked,
            protocol_native,
            application_checked: order_subtypes_first(checked, h),
            declared_protocol_native: protocol,
        }
    }
}

/// Stable topological order: repeatedly take the first remaining entry that
/// has no remaining strict subtype.
pub fn order_subtypes_first(mut remaining: Vec<TypeRef>, h: &TypeHierarchy) -> Vec<TypeRef> {
    let mut out = Vec::with_capacity(remaining.len());
    while !remaining.is_empty() {
        let next = remaining
            .iter()
            .position(|c| !remaining.iter().any(|o| h.is_strict_subtype(&o.name, &c.name)))
            .unwrap_or(0);
        out.push(remaining.remove(next));
    }
    out
}

/// No entry is a supertype of an entry after it.
pub fn is_subtype_ordered(list: &[TypeRef], h: &TypeHierarchy) -> bool {
    list.iter()
        .enumerate()
        .all(|(i, sup)| list[i + 1..].iter().all(|sub| !h.is_strict_subtype(&sub.name, &sup.name)))
}

/// Classify against the well-known hierarchy with default settings.
pub fn classify(declared: &[TypeRef], is_remote_style: bool) -> FailureClassification {
    Classifier::new(TypeHierarchy::builtin()).classify(declared, is_remote_style)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_exception_needs_remote_handler_only_for_remote_style() {
        let declared = [TypeRef::new(consts::IO_EXCEPTION)];
        let remote = classify(&declared, true);
        assert!(remote.protocol_native);
        assert!(!remote.system_unchecked);
        assert!(!classify(&declared, false).protocol_native);
    }

    #[test]
    fn unchecked_and_remote_types_are_not_application() {
        let declared = [
            TypeRef::new(consts::REMOTE_EXCEPTION),
            TypeRef::new(consts::EJB_EXCEPTION),
            TypeRef::new(consts::CREATE_EXCEPTION),
        ];
        let c = classify(&declared, true);
        assert_eq!(c.application_checked, vec![TypeRef::new(consts::CREATE_EXCEPTION)]);
        assert_eq!(c.declared_protocol_native, vec![TypeRef::new(consts::REMOTE_EXCEPTION)]);
        assert!(!c.protocol_native);
    }

    #[test]
    fn remote_as_application_when_configured() {
        let config = Config::default().with_declared_remote_are_application_exceptions(true);
        let h = TypeHierarchy::builtin();
        let c = Classifier::with_config(h, &config)
            .classify(&[TypeRef::new(consts::EXCEPTION), TypeRef::new(consts::REMOTE_EXCEPTION)], true);
        assert!(!c.protocol_native);
        assert_eq!(c.application_checked[0], TypeRef::new(consts::REMOTE_EXCEPTION));
    }
}
