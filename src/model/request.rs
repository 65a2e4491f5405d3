//! Generation request: everything a front-end supplies for one component view

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{ClassInfo, MethodDescriptor, TypeHierarchy, TypeRef, WrapperKind};

/// Component flavour behind the view. Factory rules depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ComponentType {
    #[default]
    Stateless,
    Stateful,
    Singleton,
    BeanManagedEntity,
    MessageDriven,
    Managed,
}

impl ComponentType {
    pub fn is_session(self) -> bool {
        matches!(self, ComponentType::Stateless | ComponentType::Stateful | ComponentType::Singleton)
    }
}

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceDescriptor {
    pub name: String,
    #[serde(default)]
    pub extends: Vec<String>,
    /// False when a front-end hands over a class where an interface was expected.
    #[serde(default = "yes")]
    pub is_interface: bool,
    #[serde(default)]
    pub methods: Vec<MethodDescriptor>,
}

impl InterfaceDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), extends: Vec::new(), is_interface: true, methods: Vec::new() }
    }

    pub fn extending(mut self, parent: impl Into<String>) -> Self {
        self.extends.push(parent.into());
        self
    }

    pub fn method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    /// Methods with their owner filled in.
    pub fn owned_methods(&self) -> Vec<MethodDescriptor> {
        self.methods
            .iter()
            .map(|m| {
                let mut m = m.clone();
                if m.owner.is_empty() {
                    m.owner = self.name.clone();
                }
                m
            })
            .collect()
    }

    pub fn as_class_info(&self) -> ClassInfo {
        ClassInfo {
            name: self.name.clone(),
            superclass: None,
            interfaces: self.extends.clone(),
            is_interface: self.is_interface,
        }
    }
}

/// The implementation class the unit dispatches to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDescriptor {
    pub class_name: String,
    #[serde(default)]
    pub superclass: Option<String>,
    /// Methods declared by the implementation and its ancestors.
    #[serde(default)]
    pub methods: Vec<MethodDescriptor>,
}

impl TargetDescriptor {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self { class_name: class_name.into(), superclass: None, methods: Vec::new() }
    }

    pub fn method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    pub fn find(&self, name: &str, params: &[TypeRef]) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|m| m.name == name && m.params == params)
    }

    pub fn owned_methods(&self) -> Vec<MethodDescriptor> {
        self.methods
            .iter()
            .map(|m| {
                let mut m = m.clone();
                if m.owner.is_empty() {
                    m.owner = self.class_name.clone();
                }
                m
            })
            .collect()
    }
}

/// Per-method dispatch policy supplied by the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MethodPolicy {
    /// Around-invoke interceptors are configured for the method.
    #[serde(default)]
    pub interceptors: bool,
    #[serde(default)]
    pub asynchronous: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FactoryBinding {
    /// Factory method signature key (or bare name) to the implementation's
    /// post-construction method name.
    #[serde(default)]
    pub init_methods: BTreeMap<String, String>,
    /// Primary key type of entity-like components.
    #[serde(default)]
    pub key_type: Option<TypeRef>,
    /// The other home of the component. The factory implementation serves both.
    #[serde(default)]
    pub companion: Option<InterfaceDescriptor>,
    /// Emit the factory implementation unit along with the home wrapper.
    #[serde(default = "yes")]
    pub emit_implementation: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Component (bean) name, used for generated unit names.
    pub component: String,
    pub kind: WrapperKind,
    #[serde(default)]
    pub component_type: ComponentType,
    #[serde(default)]
    pub interfaces: Vec<InterfaceDescriptor>,
    pub target: TargetDescriptor,
    /// Classes referenced by descriptors (custom failures, value types, remote types).
    #[serde(default)]
    pub types: Vec<ClassInfo>,
    /// Keyed by method signature key or bare method name.
    #[serde(default)]
    pub policies: BTreeMap<String, MethodPolicy>,
    /// The container's method table for the component. When present,
    /// DispatchIds are indices into it.
    #[serde(default)]
    pub all_methods: Vec<MethodDescriptor>,
    #[serde(default)]
    pub name_compat: Option<bool>,
    #[serde(default)]
    pub factory: Option<FactoryBinding>,
}

impl GenerationRequest {
    pub fn new(component: impl Into<String>, kind: WrapperKind, target: TargetDescriptor) -> Self {
        Self {
            component: component.into(),
            kind,
            component_type: ComponentType::default(),
            interfaces: Vec::new(),
            target,
            types: Vec::new(),
            policies: BTreeMap::new(),
            all_methods: Vec::new(),
            name_compat: None,
            factory: None,
        }
    }

    pub fn from_json(text: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn with_component_type(mut self, component_type: ComponentType) -> Self {
        self.component_type = component_type;
        self
    }

    pub fn with_interface(mut self, interface: InterfaceDescriptor) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn with_type(mut self, info: ClassInfo) -> Self {
        self.types.push(info);
        self
    }

    pub fn with_policy(mut self, key: impl Into<String>, policy: MethodPolicy) -> Self {
        self.policies.insert(key.into(), policy);
        self
    }

    pub fn with_factory(mut self, factory: FactoryBinding) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn with_name_compat(mut self, enabled: bool) -> Self {
        self.name_compat = Some(enabled);
        self
    }

    pub fn with_all_methods(mut self, methods: Vec<MethodDescriptor>) -> Self {
        self.all_methods = methods;
        self
    }

    pub fn policy_for(&self, method: &MethodDescriptor) -> MethodPolicy {
        self.policies
            .get(&method.signature_key())
            .or_else(|| self.policies.get(&method.name))
            .copied()
            .unwrap_or_default()
    }

    /// Hierarchy for this request: well-known types, request types, exposed
    /// interfaces and the implementation class.
    pub fn hierarchy(&self) -> TypeHierarchy {
        let mut extra: Vec<ClassInfo> = self.types.clone();
        for iface in &self.interfaces {
            extra.push(iface.as_class_info());
        }
        if let Some(companion) = self.factory.as_ref().and_then(|f| f.companion.as_ref()) {
            extra.push(companion.as_class_info());
        }
        extra.push(ClassInfo {
            name: self.target.class_name.clone(),
            superclass: Some(
                self.target
                    .superclass
                    .clone()
                    .unwrap_or_else(|| crate::consts::OBJECT.to_string()),
            ),
            interfaces: self.interfaces.iter().map(|i| i.name.clone()).collect(),
            is_interface: false,
        });
        TypeHierarchy::with_classes(extra)
    }

    /// Package of the implementation class, used for generated unit names.
    pub fn package(&self) -> Option<&str> {
        self.target.class_name.rfind('.').map(|i| &self.target.class_name[..i])
    }

    pub fn qualify(&self, simple: &str) -> String {
        match self.package() {
            Some(pkg) => format!("{pkg}.{simple}"),
            None => simple.to_string(),
        }
    }

    fn component_simple(&self) -> &str {
        self.component.rsplit('.').next().unwrap_or(&self.component)
    }

    pub fn wrapper_unit_name(&self) -> String {
        self.qualify(&format!("{}_{}Wrapper", self.component_simple(), self.kind.tag()))
    }

    pub fn factory_unit_name(&self) -> String {
        self.qualify(&format!("{}_HomeImpl", self.component_simple()))
    }

    /// Home skeletons carry a `Home` infix so both ties of one component can
    /// live in the same package.
    pub fn skeleton_unit_name(&self) -> String {
        let infix = if self.kind.is_factory() { "Home" } else { "" };
        self.qualify(&format!("_{}{}_Tie", self.component_simple(), infix))
    }
}

/// Stub names follow the interface they implement, in the interface's package.
pub fn stub_unit_name(interface: &str) -> String {
    match interface.rfind('.') {
        Some(i) => format!("{}._{}_Stub", &interface[..i], &interface[i + 1..]),
        None => format!("_{interface}_Stub"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_request_fills_defaults() {
        let text = r#"{
            "component": "Account",
            "kind": "BusinessLocal",
            "interfaces": [{ "name": "acme.Account", "methods": [
                { "name": "deposit", "params": ["long"], "throws": ["acme.LimitException"] }
            ]}],
            "target": { "class_name": "acme.AccountBean" }
        }"#;
        let req = GenerationRequest::from_json(text).unwrap();
        assert_eq!(req.component_type, ComponentType::Stateless);
        let m = &req.interfaces[0].owned_methods()[0];
        assert_eq!(m.owner, "acme.Account");
        assert!(m.return_type.is_void());
        assert!(m.modifiers.is_public());
        assert_eq!(req.wrapper_unit_name(), "acme.Account_BusinessLocalWrapper");
        assert_eq!(stub_unit_name("acme.Account"), "acme._Account_Stub");
    }

    #[test]
    fn policy_lookup_prefers_signature_key() {
        let m = MethodDescriptor::new("deposit").param("long");
        let req = GenerationRequest::new("A", WrapperKind::BusinessLocal, TargetDescriptor::new("a.B"))
            .with_policy("deposit", MethodPolicy { interceptors: false, asynchronous: true })
            .with_policy("deposit(J)", MethodPolicy { interceptors: true, asynchronous: false });
        assert!(req.policy_for(&m).interceptors);
        assert!(req.policy_for(&MethodDescriptor::new("deposit")).asynchronous);
    }
}
