use super::{ReviewError, ReviewResult};
use crate::consts::FUTURE;
use crate::model::{GenerationRequest, MethodDescriptor, TypeHierarchy};

pub(crate) fn review_methods(request: &GenerationRequest, h: &TypeHierarchy) -> ReviewResult<()> {
    let kind = request.kind;
    let exposed: Vec<MethodDescriptor> = if request.interfaces.is_empty() {
        request.target.owned_methods().into_iter().filter(|m| m.modifiers.is_public()).collect()
    } else {
        request.interfaces.iter().flat_map(|i| i.owned_methods()).collect()
    };

    if kind.checks_ejb_prefix() {
        if let Some(m) = exposed.iter().find(|m| m.name.starts_with("ejb")) {
            return Err(ReviewError::ReservedPrefix(m.to_string()));
        }
    }

    for m in &exposed {
        let policy = request.policy_for(m);
        if policy.asynchronous && !m.return_type.is_void() && !m.return_type.is_class(FUTURE) {
            return Err(ReviewError::AsyncReturnType(m.to_string()));
        }
    }

    if kind.is_no_interface() {
        review_no_interface(request, h)?;
    }
    Ok(())
}

/// The view subclasses the bean: every overridable method is overridden,
/// so none may be final, and public ones are local-only.
fn review_no_interface(request: &GenerationRequest, h: &TypeHierarchy) -> ReviewResult<()> {
    for m in request.target.owned_methods() {
        if m.modifiers.is_private() || m.modifiers.is_static() || m.name == "<init>" {
            continue;
        }
        if m.modifiers.is_final() {
            return Err(ReviewError::FinalMethod(m.to_string()));
        }
        if m.modifiers.is_public() && m.exceptions.iter().any(|e| h.is_protocol_native(&e.name)) {
            return Err(ReviewError::RemoteFailureOnNoInterface(m.to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::REMOTE_EXCEPTION;
    use crate::model::{InterfaceDescriptor, MethodPolicy, Modifiers, TargetDescriptor, WrapperKind};

    fn run(r: &GenerationRequest) -> ReviewResult<()> {
        review_methods(r, &r.hierarchy())
    }

    #[test]
    fn final_method_rejects_no_interface_view() {
        let target = TargetDescriptor::new("acme.AccountBean")
            .method(MethodDescriptor::new("balance").returns("long").modifiers(Modifiers::public()))
            .method(MethodDescriptor::new("audit").modifiers(Modifiers(Modifiers::PROTECTED | Modifiers::FINAL)));
        let r = GenerationRequest::new("Account", WrapperKind::NoInterfaceView, target);
        assert!(matches!(run(&r), Err(ReviewError::FinalMethod(_))));
    }

    #[test]
    fn private_final_method_is_not_overridden() {
        let target = TargetDescriptor::new("acme.AccountBean")
            .method(MethodDescriptor::new("helper").modifiers(Modifiers(Modifiers::PRIVATE | Modifiers::FINAL)));
        let r = GenerationRequest::new("Account", WrapperKind::NoInterfaceView, target);
        assert_eq!(run(&r), Ok(()));
    }

    #[test]
    fn public_remote_failure_rejects_no_interface_view() {
        let target = TargetDescriptor::new("acme.AccountBean")
            .method(MethodDescriptor::new("balance").throws(REMOTE_EXCEPTION).modifiers(Modifiers::public()));
        let r = GenerationRequest::new("Account", WrapperKind::NoInterfaceView, target);
        assert!(matches!(run(&r), Err(ReviewError::RemoteFailureOnNoInterface(_))));
    }

    #[test]
    fn ejb_prefix_is_reserved_for_business_views() {
        let iface = InterfaceDescriptor::new("acme.Account").method(MethodDescriptor::new("ejbLoad"));
        let target = TargetDescriptor::new("acme.AccountBean");
        let r = GenerationRequest::new("Account", WrapperKind::BusinessLocal, target.clone()).with_interface(iface.clone());
        assert!(matches!(run(&r), Err(ReviewError::ReservedPrefix(_))));
        let r = GenerationRequest::new("Account", WrapperKind::EndpointProxy, target).with_interface(iface);
        assert_eq!(run(&r), Ok(()));
    }

    #[test]
    fn asynchronous_methods_return_void_or_future() {
        let iface = InterfaceDescriptor::new("acme.Account").method(MethodDescriptor::new("total").returns("long"));
        let r = GenerationRequest::new("Account", WrapperKind::BusinessLocal, TargetDescriptor::new("acme.AccountBean"))
            .with_interface(iface)
            .with_policy("total", MethodPolicy { interceptors: false, asynchronous: true });
        assert!(matches!(run(&r), Err(ReviewError::AsyncReturnType(_))));
    }
}
