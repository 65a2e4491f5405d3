//! Unit synthesis
//!
//! Turns a validated [`GenerationRequest`] into a [`ModuleDescription`]:
//!
//! ```text
//! exposed methods ─┬─ DispatchTable ──┐
//!                  ├─ Classifier ─────┼─ wrapper (dispatch bodies)
//!                  │                  ├─ factory implementation
//!                  └─ NameMapper ─────┴─ stub / skeleton (remote kinds)
//! ```
//!
//! Classification and naming are computed once and shared, so the wrapper,
//! the stub and the skeleton of one request always agree.

pub mod dispatch;
pub mod dispatch_table;
pub mod factory;
pub mod hooks;
pub mod marshal;
pub mod skeleton;
pub mod stub;
pub mod wrapper;

use std::collections::BTreeMap;

use crate::classify::{Classifier, FailureClassification};
use crate::config::Config;
use crate::error::Result;
use crate::ir::{BodyBuilder, Expr, MethodDecl, ModuleDescription, Stmt};
use crate::model::{
    stub_unit_name, DispatchId, GenerationRequest, MethodDescriptor, MethodPolicy, Modifiers, TypeHierarchy,
    TypeRef, WrapperKind,
};
use crate::naming::{NameMapper, WireName};

pub use dispatch_table::DispatchTable;
pub use factory::FactorySynthesizer;

/// One business method as every synthesizer sees it.
#[derive(Debug, Clone)]
pub struct ExposedMethod {
    pub descriptor: MethodDescriptor,
    pub id: DispatchId,
    pub policy: MethodPolicy,
    pub failures: FailureClassification,
    /// Failures cross the RMI boundary: unchecked ones are wrapped in
    /// RemoteException rather than EJBException.
    pub rmi_remote: bool,
}

/// Everything synthesized for one request, ready for the module emitter.
#[derive(Debug, Clone, Default)]
pub struct Synthesis {
    pub module: ModuleDescription,
    /// (signature key, wire name) for remote kinds, in exposure order.
    pub wire_names: Vec<(String, WireName)>,
    pub dispatch_ids: Vec<(String, DispatchId)>,
    pub warnings: Vec<String>,
}

pub struct Synthesizer<'a> {
    request: &'a GenerationRequest,
    config: &'a Config,
    hierarchy: &'a TypeHierarchy,
    warnings: Vec<String>,
}

impl<'a> Synthesizer<'a> {
    pub fn new(request: &'a GenerationRequest, config: &'a Config, hierarchy: &'a TypeHierarchy) -> Self {
        Self { request, config, hierarchy, warnings: Vec::new() }
    }

    pub fn run(mut self) -> Result<Synthesis> {
        let request = self.request;
        let descriptors = self.exposed_descriptors();
        let table = DispatchTable::build(
            &request.component,
            &descriptors,
            &request.target.methods,
            &request.all_methods,
        )?;
        log::debug!("synth: {} exposed methods, {} dispatch ids", descriptors.len(), table.len());

        let classifier = Classifier::with_config(self.hierarchy, self.config);
        let mut exposed = Vec::with_capacity(descriptors.len());
        for d in descriptors {
            let id = table
                .id_of(&d)
                .ok_or_else(|| crate::Error::internal(format!("no dispatch id for {d}")))?;
            let (rmi_remote, is_remote_style) = call_style(request.kind, &d.owner, self.hierarchy);
            let failures = classifier.classify(&d.exceptions, is_remote_style);
            exposed.push(ExposedMethod { policy: request.policy_for(&d), descriptor: d, id, failures, rmi_remote });
        }

        let mut module = ModuleDescription::default();
        module.units.push(wrapper::build_wrapper(request, &exposed));

        if request.kind.is_factory() && request.factory.as_ref().map_or(true, |f| f.emit_implementation) {
            let (unit, warnings) = FactorySynthesizer::new(request, self.config, self.hierarchy).build();
            self.warnings.extend(warnings);
            module.units.push(unit);
        }

        let mut wire_names = Vec::new();
        if request.kind.is_remote() {
            let compat = request.name_compat.unwrap_or(self.config.name_compat);
            let mapper = NameMapper::new(self.hierarchy).with_compat(compat);
            let mut remote_methods = Vec::new();
            for iface in &request.interfaces {
                let methods: Vec<ExposedMethod> =
                    exposed.iter().filter(|m| m.descriptor.owner == iface.name).cloned().collect();
                let simple = TypeRef::new(iface.name.clone()).simple_name().to_string();
                let descriptors: Vec<MethodDescriptor> = methods.iter().map(|m| m.descriptor.clone()).collect();
                let names = mapper.map(&descriptors, Some(&simple))?;
                for (m, name) in methods.iter().zip(&names) {
                    log::debug!("wire name {} -> {}", m.descriptor, name);
                    wire_names.push((m.descriptor.signature_key(), name.clone()));
                }
                let remote: Vec<(ExposedMethod, WireName)> = methods.into_iter().zip(names).collect();
                module.units.push(stub::build_stub(&stub_unit_name(&iface.name), iface, &remote, self.hierarchy));
                remote_methods.extend(remote.into_iter().map(|(m, n)| (iface.name.clone(), m, n)));
            }
            if let Some(first) = request.interfaces.first() {
                module.units.push(skeleton::build_skeleton(
                    &request.skeleton_unit_name(),
                    &first.name,
                    &remote_methods,
                    self.hierarchy,
                ));
            }
        }

        let dispatch_ids = table.entries().map(|(k, id)| (k.to_string(), id)).collect();
        Ok(Synthesis { module, wire_names, dispatch_ids, warnings: self.warnings })
    }

    /// Union of the exposed interfaces' methods, one per signature. When
    /// interfaces disagree on the failures of a shared signature, the
    /// implementation's own declaration wins and a warning is recorded.
    /// No-interface kinds without interfaces expose the implementation's
    /// public instance methods.
    fn exposed_descriptors(&mut self) -> Vec<MethodDescriptor> {
        let request = self.request;
        let candidates: Vec<MethodDescriptor> = if request.interfaces.is_empty() && request.kind.is_no_interface() {
            request
                .target
                .owned_methods()
                .into_iter()
                .filter(|m| m.modifiers.is_public() && !m.modifiers.is_static() && m.name != "<init>")
                .collect()
        } else {
            request.interfaces.iter().flat_map(|i| i.owned_methods()).collect()
        };

        let mut index: BTreeMap<String, usize> = BTreeMap::new();
        let mut out: Vec<MethodDescriptor> = Vec::new();
        for m in candidates {
            let key = m.signature_key();
            let Some(&at) = index.get(&key) else {
                index.insert(key, out.len());
                out.push(m);
                continue;
            };
            if same_exceptions(&out[at], &m) {
                continue;
            }
            let chosen = request
                .target
                .find(&m.name, &m.params)
                .map(|t| t.exceptions.clone())
                .unwrap_or_else(|| out[at].exceptions.clone());
            let warning = format!(
                "{}: {} and {} declare different failures; using {:?}",
                request.component,
                out[at],
                m,
                chosen.iter().map(|t| t.name.as_str()).collect::<Vec<_>>()
            );
            log::warn!("{warning}");
            self.warnings.push(warning);
            out[at].exceptions = chosen;
        }
        out
    }
}

/// `(rmi_remote, is_remote_style)` of a method declared by `owner`.
/// Component views classify remote-style even when local.
pub fn call_style(kind: WrapperKind, owner: &str, hierarchy: &TypeHierarchy) -> (bool, bool) {
    let rmi_remote = hierarchy.is_remote_interface(owner)
        || matches!(kind, WrapperKind::ComponentRemote | WrapperKind::FactoryRemote);
    (rmi_remote, rmi_remote || kind.is_component_view())
}

fn same_exceptions(a: &MethodDescriptor, b: &MethodDescriptor) -> bool {
    let mut x = a.exceptions.clone();
    let mut y = b.exceptions.clone();
    x.sort();
    y.sort();
    x == y
}

/// Public no-arg constructor chaining to the ancestor's.
pub fn constructor(ancestor: &str) -> MethodDecl {
    let call = Expr::invoke_special(Expr::This, ancestor, "<init>", &[], TypeRef::void(), vec![]);
    MethodDecl::new("<init>", vec![], TypeRef::void())
        .with_access(Modifiers::PUBLIC)
        .with_body(BodyBuilder::new().finish(vec![Stmt::Eval(call), Stmt::Return(None)]))
}

/// The method's own arguments, in order.
pub fn forward_args(n: usize) -> Vec<Expr> {
    (0..n).map(Expr::Arg).collect()
}

/// `new Object[] { box(a0), box(a1), .. }`
pub fn boxed_args(params: &[TypeRef]) -> Expr {
    Expr::object_array(
        params
            .iter()
            .enumerate()
            .map(|(i, _)| Expr::Box(Box::new(Expr::Arg(i))))
            .collect(),
    )
}

/// Convert a value typed `Object` back to `ty`.
pub fn from_object(expr: Expr, ty: &TypeRef) -> Expr {
    if let Some(p) = ty.primitive() {
        Expr::Unbox(p, Box::new(expr))
    } else if ty.is_class(crate::consts::OBJECT) {
        expr
    } else {
        Expr::cast(ty.clone(), expr)
    }
}
