use super::{ReviewError, ReviewResult};
use crate::consts::*;
use crate::model::{GenerationRequest, TypeHierarchy, WrapperKind};

const COMPONENT_VIEWS: [&str; 4] = [EJB_OBJECT, EJB_LOCAL_OBJECT, EJB_HOME, EJB_LOCAL_HOME];

pub(crate) fn review_interfaces(request: &GenerationRequest, h: &TypeHierarchy) -> ReviewResult<()> {
    let kind = request.kind;
    if request.interfaces.is_empty() && !kind.is_no_interface() {
        return Err(ReviewError::MissingInterface { kind: kind.to_string() });
    }
    if request.interfaces.len() > 1 && !kind.supports_aggregate() {
        return Err(ReviewError::AggregateNotAllowed { kind: kind.to_string(), count: request.interfaces.len() });
    }

    for iface in &request.interfaces {
        match kind.required_super_interface() {
            Some(required) => {
                if !h.is_subtype(&iface.name, required) {
                    return Err(ReviewError::MissingSuperInterface {
                        interface: iface.name.clone(),
                        required: required.to_string(),
                    });
                }
            }
            None => {
                if let Some(parent) = COMPONENT_VIEWS.iter().find(|v| h.is_subtype(&iface.name, v)) {
                    return Err(ReviewError::ForbiddenSuperInterface {
                        interface: iface.name.clone(),
                        parent: parent.to_string(),
                    });
                }
            }
        }
        if kind == WrapperKind::BusinessLocal && h.is_remote_interface(&iface.name) {
            return Err(ReviewError::RemoteLocalInterface(iface.name.clone()));
        }
    }

    if kind.requires_implementation_methods() {
        for m in request.interfaces.iter().flat_map(|i| i.owned_methods()) {
            if request.target.find(&m.name, &m.params).is_none() {
                return Err(ReviewError::MissingImplementationMethod(m.to_string()));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{InterfaceDescriptor, MethodDescriptor, TargetDescriptor};

    fn request(kind: WrapperKind, ifaces: Vec<InterfaceDescriptor>) -> GenerationRequest {
        let target = TargetDescriptor::new("acme.AccountBean").method(MethodDescriptor::new("balance").returns("long"));
        ifaces.into_iter().fold(GenerationRequest::new("Account", kind, target), |r, i| r.with_interface(i))
    }

    fn run(r: &GenerationRequest) -> ReviewResult<()> {
        review_interfaces(r, &r.hierarchy())
    }

    #[test]
    fn component_view_must_extend_ejb_object() {
        let r = request(WrapperKind::ComponentRemote, vec![InterfaceDescriptor::new("acme.Account").extending(REMOTE)]);
        assert!(matches!(run(&r), Err(ReviewError::MissingSuperInterface { .. })));
        let r = request(WrapperKind::ComponentRemote, vec![InterfaceDescriptor::new("acme.Account").extending(EJB_OBJECT)]);
        assert_eq!(run(&r), Ok(()));
    }

    #[test]
    fn business_interfaces_stay_out_of_component_views() {
        let r = request(
            WrapperKind::BusinessRemote,
            vec![InterfaceDescriptor::new("acme.Account").extending(EJB_OBJECT)],
        );
        assert!(matches!(run(&r), Err(ReviewError::ForbiddenSuperInterface { .. })));
        let r = request(WrapperKind::BusinessLocal, vec![InterfaceDescriptor::new("acme.Account").extending(REMOTE)]);
        assert!(matches!(run(&r), Err(ReviewError::RemoteLocalInterface(_))));
    }

    #[test]
    fn aggregation_is_limited_to_local_views() {
        let two = vec![InterfaceDescriptor::new("acme.A"), InterfaceDescriptor::new("acme.B")];
        assert!(matches!(
            run(&request(WrapperKind::BusinessRemote, two.clone())),
            Err(ReviewError::AggregateNotAllowed { count: 2, .. })
        ));
        assert_eq!(run(&request(WrapperKind::BusinessLocal, two)), Ok(()));
    }

    #[test]
    fn exposed_method_must_exist_on_bean() {
        let iface = InterfaceDescriptor::new("acme.Account").method(MethodDescriptor::new("close"));
        let err = run(&request(WrapperKind::BusinessLocal, vec![iface])).unwrap_err();
        assert_eq!(err.rule(), "implementation-method");
    }
}
