//! Calling-convention variants of a generated unit

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::consts;

/// The closed set of calling conventions a generated unit can implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WrapperKind {
    ComponentLocal,
    ComponentRemote,
    BusinessLocal,
    BusinessRemote,
    NoInterfaceView,
    ManagedComponent,
    EndpointProxy,
    EndpointProxyNoInterface,
    FactoryLocal,
    FactoryRemote,
    ServiceEndpoint,
}

/// How generated code reaches the `EJSWrapperBase` the container hooks expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapperBaseAccess {
    /// The unit itself extends the wrapper base.
    This,
    /// The unit extends the implementation class and holds the base in a field.
    Field(&'static str, &'static str),
}

impl WrapperKind {
    pub const ALL: [WrapperKind; 11] = [
        WrapperKind::ComponentLocal,
        WrapperKind::ComponentRemote,
        WrapperKind::BusinessLocal,
        WrapperKind::BusinessRemote,
        WrapperKind::NoInterfaceView,
        WrapperKind::ManagedComponent,
        WrapperKind::EndpointProxy,
        WrapperKind::EndpointProxyNoInterface,
        WrapperKind::FactoryLocal,
        WrapperKind::FactoryRemote,
        WrapperKind::ServiceEndpoint,
    ];

    /// Short tag used in generated unit names.
    pub fn tag(self) -> &'static str {
        match self {
            WrapperKind::ComponentLocal => "Local",
            WrapperKind::ComponentRemote => "Remote",
            WrapperKind::BusinessLocal => "BusinessLocal",
            WrapperKind::BusinessRemote => "BusinessRemote",
            WrapperKind::NoInterfaceView => "LocalBean",
            WrapperKind::ManagedComponent => "ManagedBean",
            WrapperKind::EndpointProxy => "MessageEndpoint",
            WrapperKind::EndpointProxyNoInterface => "NoMethodMessageEndpoint",
            WrapperKind::FactoryLocal => "LocalHome",
            WrapperKind::FactoryRemote => "RemoteHome",
            WrapperKind::ServiceEndpoint => "ServiceEndpoint",
        }
    }

    /// Ancestor class of the generated wrapper.
    pub fn ancestor(self, implementation: &str) -> String {
        match self {
            WrapperKind::ComponentRemote | WrapperKind::FactoryRemote => consts::EJS_WRAPPER.to_string(),
            WrapperKind::ComponentLocal | WrapperKind::FactoryLocal => consts::EJS_LOCAL_WRAPPER.to_string(),
            WrapperKind::BusinessLocal => consts::BUSINESS_LOCAL_WRAPPER.to_string(),
            WrapperKind::BusinessRemote | WrapperKind::ServiceEndpoint => {
                consts::BUSINESS_REMOTE_WRAPPER.to_string()
            }
            WrapperKind::EndpointProxy => consts::MESSAGE_ENDPOINT_BASE.to_string(),
            WrapperKind::NoInterfaceView
            | WrapperKind::ManagedComponent
            | WrapperKind::EndpointProxyNoInterface => implementation.to_string(),
        }
    }

    /// Interfaces the unit implements beyond the exposed ones.
    pub fn extra_interfaces(self) -> &'static [&'static str] {
        match self {
            WrapperKind::NoInterfaceView | WrapperKind::ManagedComponent => &[consts::LOCAL_BEAN_WRAPPER],
            WrapperKind::EndpointProxyNoInterface => &[consts::MESSAGE_ENDPOINT],
            _ => &[],
        }
    }

    /// Fields declared on the unit, as (name, type).
    pub fn fields(self) -> &'static [(&'static str, &'static str)] {
        match self {
            WrapperKind::NoInterfaceView => &[(consts::WRAPPER_BASE_FIELD, consts::BUSINESS_LOCAL_WRAPPER)],
            WrapperKind::ManagedComponent => &[
                (consts::WRAPPER_BASE_FIELD, consts::BUSINESS_LOCAL_WRAPPER),
                (consts::MANAGED_BEAN_O_FIELD, consts::BEAN_O),
            ],
            WrapperKind::EndpointProxyNoInterface => &[(consts::ENDPOINT_BASE_FIELD, consts::MESSAGE_ENDPOINT_BASE)],
            _ => &[],
        }
    }

    pub fn wrapper_base(self) -> WrapperBaseAccess {
        match self {
            WrapperKind::NoInterfaceView | WrapperKind::ManagedComponent => {
                WrapperBaseAccess::Field(consts::WRAPPER_BASE_FIELD, consts::BUSINESS_LOCAL_WRAPPER)
            }
            WrapperKind::EndpointProxyNoInterface => {
                WrapperBaseAccess::Field(consts::ENDPOINT_BASE_FIELD, consts::MESSAGE_ENDPOINT_BASE)
            }
            _ => WrapperBaseAccess::This,
        }
    }

    pub fn is_factory(self) -> bool {
        matches!(self, WrapperKind::FactoryLocal | WrapperKind::FactoryRemote)
    }

    pub fn is_endpoint(self) -> bool {
        matches!(self, WrapperKind::EndpointProxy | WrapperKind::EndpointProxyNoInterface)
    }

    /// The unit extends the implementation class instead of a container base.
    pub fn extends_implementation(self) -> bool {
        matches!(
            self,
            WrapperKind::NoInterfaceView | WrapperKind::ManagedComponent | WrapperKind::EndpointProxyNoInterface
        )
    }

    /// Kinds callers reach through the remote protocol. These get IME names
    /// and a stub/skeleton pair.
    pub fn is_remote(self) -> bool {
        matches!(
            self,
            WrapperKind::ComponentRemote | WrapperKind::FactoryRemote | WrapperKind::BusinessRemote
        )
    }

    /// EJB 2.x component and home views.
    pub fn is_component_view(self) -> bool {
        matches!(
            self,
            WrapperKind::ComponentLocal
                | WrapperKind::ComponentRemote
                | WrapperKind::FactoryLocal
                | WrapperKind::FactoryRemote
        )
    }

    /// Only these kinds may fold several interfaces into one unit.
    pub fn supports_aggregate(self) -> bool {
        matches!(self, WrapperKind::BusinessLocal | WrapperKind::NoInterfaceView)
    }

    /// Business method names starting with `ejb` are reserved for these kinds.
    pub fn checks_ejb_prefix(self) -> bool {
        !(self.is_factory() || self.is_endpoint() || self == WrapperKind::ManagedComponent)
    }

    /// No-interface style views: `final` methods and public RemoteException
    /// declarations are rejected, non-public methods are guarded.
    pub fn is_no_interface(self) -> bool {
        self.extends_implementation()
    }

    /// The implementation must provide every exposed method itself.
    pub fn requires_implementation_methods(self) -> bool {
        !(self.is_factory() || self.is_endpoint())
    }

    /// Unit overrides `equals`/`hashCode`.
    pub fn has_identity_members(self) -> bool {
        matches!(
            self,
            WrapperKind::NoInterfaceView | WrapperKind::ManagedComponent | WrapperKind::EndpointProxy
        )
    }

    /// Interface an exposed component or home interface must extend.
    pub fn required_super_interface(self) -> Option<&'static str> {
        match self {
            WrapperKind::ComponentLocal => Some(consts::EJB_LOCAL_OBJECT),
            WrapperKind::ComponentRemote => Some(consts::EJB_OBJECT),
            WrapperKind::FactoryLocal => Some(consts::EJB_LOCAL_HOME),
            WrapperKind::FactoryRemote => Some(consts::EJB_HOME),
            _ => None,
        }
    }
}

impl fmt::Display for WrapperKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
