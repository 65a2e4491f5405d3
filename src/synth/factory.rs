//! Factory Synthesizer: the home implementation unit
//!
//! The unit extends `EJSHome` and serves the component's local and remote
//! homes. Local variants of `create*`/`find*` carry the `_Local` suffix.
//! Three body shapes are produced:
//!
//! - stateless `create()`: ask the home for a wrapper, nothing else;
//! - general create: `createBeanO`, `preEjbCreate`, the post-construction
//!   method, `postCreate`, with an exit region that calls `createFailure` or
//!   `afterPostCreateCompletion` depending on two flags;
//! - finders and home methods: acquire a worker bean, call it, release it on
//!   success and discard it from the exit region on failure.

use std::collections::BTreeMap;

use super::hooks::{self, Hook};
use super::{constructor, forward_args};
use crate::classify::Classifier;
use crate::config::Config;
use crate::consts::*;
use crate::ir::{BodyBuilder, Body, Cond, ExitRegion, Expr, Handler, LocalId, MethodDecl, Stmt, TryRegion, UnitDescription};
use crate::model::{ComponentType, GenerationRequest, MethodDescriptor, TypeHierarchy, TypeRef, WrapperKind};

/// Home operation category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactoryOp {
    Create,
    FindByPrimaryKey,
    Find,
    Home,
}

impl FactoryOp {
    pub fn of(method: &str) -> Self {
        if method == "findByPrimaryKey" {
            FactoryOp::FindByPrimaryKey
        } else if method.starts_with("create") {
            FactoryOp::Create
        } else if method.starts_with("find") {
            FactoryOp::Find
        } else {
            FactoryOp::Home
        }
    }
}

/// `createX` -> `X`, `findByName` -> `ByName`, `total` -> `Total`.
pub fn operation_suffix(method: &str) -> String {
    for prefix in ["create", "find"] {
        if let Some(rest) = method.strip_prefix(prefix) {
            return rest.to_string();
        }
    }
    capitalize(method)
}

/// Post-construction method bound to a factory create method.
pub fn init_method(request: &GenerationRequest, method: &MethodDescriptor) -> String {
    request
        .factory
        .as_ref()
        .and_then(|f| f.init_methods.get(&method.signature_key()).or_else(|| f.init_methods.get(&method.name)))
        .cloned()
        .unwrap_or_else(|| format!("ejbCreate{}", operation_suffix(&method.name)))
}

/// Implementation method an entity finder or home method delegates to.
pub fn entity_method(method: &str) -> String {
    match FactoryOp::of(method) {
        FactoryOp::Create => format!("ejbCreate{}", operation_suffix(method)),
        FactoryOp::FindByPrimaryKey | FactoryOp::Find => format!("ejb{}", capitalize(method)),
        FactoryOp::Home => format!("ejbHome{}", operation_suffix(method)),
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// A home method together with the home it was declared on.
#[derive(Debug, Clone)]
struct HomeMethod {
    descriptor: MethodDescriptor,
    local: bool,
}

/// EJSHome methods that hand out, return and throw away a worker bean.
struct Worker {
    acquire: &'static str,
    release: &'static str,
    discard: &'static str,
}

const FINDER: Worker = Worker {
    acquire: "getFinderEntityBeanO",
    release: "releaseFinderEntityBeanO",
    discard: "discardFinderEntityBeanO",
};

const FIND_BY_PRIMARY_KEY: Worker = Worker { acquire: "getFindByPrimaryKeyEntityBeanO", ..FINDER };

const HOME_METHOD: Worker = Worker {
    acquire: "getHomeMethodEntityBeanO",
    release: "releaseHomeMethodEntityBeanO",
    discard: "discardHomeMethodEntityBeanO",
};

pub struct FactorySynthesizer<'a> {
    request: &'a GenerationRequest,
    classifier: Classifier<'a>,
    unit: String,
    implementation: String,
    warnings: Vec<String>,
}

impl<'a> FactorySynthesizer<'a> {
    pub fn new(request: &'a GenerationRequest, config: &Config, hierarchy: &'a TypeHierarchy) -> Self {
        Self {
            request,
            classifier: Classifier::with_config(hierarchy, config),
            unit: request.factory_unit_name(),
            implementation: request.target.class_name.clone(),
            warnings: Vec::new(),
        }
    }

    /// Build the unit. Warnings about divergent duplicate home methods are
    /// returned alongside it.
    pub fn build(mut self) -> (UnitDescription, Vec<String>) {
        let mut unit = UnitDescription::new(self.unit.clone(), EJS_HOME);
        unit.methods.push(constructor(EJS_HOME));
        for home in self.home_methods() {
            let decl = self.factory_method(&home);
            log::debug!("factory {}.{}{}", self.unit, decl.name, decl.descriptor());
            unit.methods.push(decl);
        }
        (unit, self.warnings)
    }

    /// Methods of the primary homes and the companion, deduplicated by the
    /// generated method signature. The first declaration wins.
    fn home_methods(&mut self) -> Vec<HomeMethod> {
        let primary_local = self.request.kind == WrapperKind::FactoryLocal;
        let mut sources: Vec<(bool, Vec<MethodDescriptor>)> =
            self.request.interfaces.iter().map(|i| (primary_local, i.owned_methods())).collect();
        if let Some(companion) = self.request.factory.as_ref().and_then(|f| f.companion.as_ref()) {
            sources.push((!primary_local, companion.owned_methods()));
        }

        let mut seen: BTreeMap<String, MethodDescriptor> = BTreeMap::new();
        let mut out = Vec::new();
        for (local, methods) in sources {
            for descriptor in methods {
                let key = format!("{}{}", self.generated_name(&descriptor.name, local), descriptor.param_descriptor());
                if let Some(first) = seen.get(&key) {
                    if !same_failures(first, &descriptor) {
                        let warning = format!(
                            "home method {} declares different failures than {}; keeping the first",
                            descriptor, first
                        );
                        log::warn!("{warning}");
                        self.warnings.push(warning);
                    }
                    continue;
                }
                seen.insert(key, descriptor.clone());
                out.push(HomeMethod { descriptor, local });
            }
        }
        out
    }

    fn generated_name(&self, name: &str, local: bool) -> String {
        let kind = if local { WrapperKind::FactoryLocal } else { WrapperKind::FactoryRemote };
        super::wrapper::factory_target(kind, name)
    }

    fn factory_method(&self, home: &HomeMethod) -> MethodDecl {
        let m = &home.descriptor;
        let op = FactoryOp::of(&m.name);
        let entity = self.request.component_type == ComponentType::BeanManagedEntity;
        let body = match op {
            FactoryOp::Create if self.request.component_type == ComponentType::Stateless => {
                self.stateless_create(home)
            }
            FactoryOp::Create => self.create(home, entity),
            FactoryOp::FindByPrimaryKey => self.find_by_primary_key(home),
            FactoryOp::Find => self.finder(home),
            FactoryOp::Home => self.home_method(home),
        };
        MethodDecl::new(self.generated_name(&m.name, home.local), m.params.clone(), m.return_type.clone())
            .with_throws(m.exceptions.clone())
            .with_body(body)
    }

    fn inherited(&self, name: &str, local: bool, params: &[&str], ret: &str, args: Vec<Expr>) -> Expr {
        let name = if local { format!("{name}{LOCAL_SUFFIX}") } else { name.to_string() };
        let params: Vec<TypeRef> = params.iter().map(|p| TypeRef::from(*p)).collect();
        Expr::invoke_special(Expr::This, EJS_HOME, &name, &params, TypeRef::from(ret), args)
    }

    fn home_hook(&self, name: &'static str, params: &'static [&'static str], ret: &'static str) -> Hook {
        Hook { owner: EJS_HOME, name, params, ret }
    }

    fn application_failures(&self, m: &MethodDescriptor) -> Vec<TypeRef> {
        self.classifier.classify(&m.exceptions, true).application_checked
    }

    fn implementation_call(&self, bean: LocalId, name: &str, m: &MethodDescriptor, ret: TypeRef) -> Expr {
        Expr::invoke_virtual(
            Expr::local(bean),
            &self.implementation,
            name,
            &m.params,
            ret,
            forward_args(m.params.len()),
        )
    }

    fn implementation_return(&self, name: &str, m: &MethodDescriptor) -> TypeRef {
        self.request.target.find(name, &m.params).map(|t| t.return_type.clone()).unwrap_or_else(TypeRef::void)
    }

    fn key_type(&self) -> TypeRef {
        self.request
            .factory
            .as_ref()
            .and_then(|f| f.key_type.clone())
            .unwrap_or_else(TypeRef::object)
    }

    /// Rethrow handlers for the declared application failures, each running
    /// `before` first.
    fn rethrow_handlers(&self, b: &mut BodyBuilder, m: &MethodDescriptor, before: &[Stmt]) -> Vec<Handler> {
        self.application_failures(m)
            .into_iter()
            .map(|failure| {
                let e = b.local("createFailure", failure.clone());
                let mut body = before.to_vec();
                body.push(Stmt::Throw(Expr::local(e)));
                Handler { catch: Some(failure.name), binding: e, body }
            })
            .collect()
    }

    fn create_failure(&self, local: bool, cause: Expr) -> Expr {
        if local {
            self.inherited("newCreateFailureException", true, &[THROWABLE], EJB_EXCEPTION, vec![cause])
        } else {
            Expr::new_object(CREATE_FAILURE_EXCEPTION, &[TypeRef::new(THROWABLE)], vec![cause])
        }
    }

    fn stateless_create(&self, home: &HomeMethod) -> Body {
        let m = &home.descriptor;
        let wrapper = if home.local { EJS_LOCAL_WRAPPER } else { EJS_WRAPPER };
        let mut b = BodyBuilder::new();
        let handlers = {
            let mut h = self.rethrow_handlers(&mut b, m, &[]);
            let t = b.local_of("failure", THROWABLE);
            h.push(Handler {
                catch: None,
                binding: t,
                body: vec![Stmt::Throw(Expr::new_object(
                    CREATE_FAILURE_EXCEPTION,
                    &[TypeRef::new(THROWABLE)],
                    vec![Expr::local(t)],
                ))],
            });
            h
        };
        let created = self.inherited("createWrapper", home.local, &[BEAN_ID], wrapper, vec![Expr::null()]);
        b.finish(vec![Stmt::Try(TryRegion {
            body: vec![Stmt::Return(Some(Expr::cast(m.return_type.clone(), created)))],
            handlers,
            exit: None,
        })])
    }

    fn create(&self, home: &HomeMethod, entity: bool) -> Body {
        let m = &home.descriptor;
        let local = home.local;
        let object = if local { EJB_LOCAL_OBJECT } else { EJB_OBJECT };
        let mut b = BodyBuilder::new();
        let rv = b.local("rv", m.return_type.clone());
        let bean_o = b.local_of("beanO", BEAN_O);
        let bean = b.local_of("bean", &self.implementation);
        let exception_occurred = b.local_of("exceptionOccurred", "boolean");
        let pre_create_called = b.local_of("preEjbCreateCalled", "boolean");

        let mut body = vec![
            Stmt::Assign(bean_o, self.inherited("createBeanO", false, &[], BEAN_O, vec![])),
            Stmt::Assign(
                bean,
                Expr::cast(TypeRef::new(self.implementation.clone()), hooks::GET_BEAN_INSTANCE.invoke(Expr::local(bean_o), vec![])),
            ),
            Stmt::Assign(
                pre_create_called,
                self.inherited("preEjbCreate", false, &[BEAN_O], "boolean", vec![Expr::local(bean_o)]),
            ),
        ];
        if entity {
            let key = self.key_type();
            let pkey = b.local("pkey", key.clone());
            let post_name = format!("ejbPostCreate{}", operation_suffix(&m.name));
            body.push(Stmt::Assign(pkey, self.implementation_call(bean, &entity_method(&m.name), m, key)));
            body.push(Stmt::Assign(
                rv,
                Expr::cast(
                    m.return_type.clone(),
                    self.inherited(
                        "postCreate",
                        local,
                        &[BEAN_O, OBJECT, "boolean"],
                        object,
                        vec![Expr::local(bean_o), Expr::local(pkey), Expr::bool(true)],
                    ),
                ),
            ));
            body.push(Stmt::Eval(self.implementation_call(bean, &post_name, m, TypeRef::void())));
            body.push(Stmt::Eval(self.inherited(
                "afterPostCreate",
                false,
                &[BEAN_O, OBJECT],
                "void",
                vec![Expr::local(bean_o), Expr::local(pkey)],
            )));
        } else {
            let init = init_method(self.request, m);
            let ret = self.implementation_return(&init, m);
            body.push(Stmt::Eval(self.implementation_call(bean, &init, m, ret)));
            body.push(Stmt::Assign(
                rv,
                Expr::cast(
                    m.return_type.clone(),
                    self.inherited("postCreate", local, &[BEAN_O], object, vec![Expr::local(bean_o)]),
                ),
            ));
        }

        let flag = Stmt::Assign(exception_occurred, Expr::bool(true));
        let mut handlers = self.rethrow_handlers(&mut b, m, std::slice::from_ref(&flag));
        let t = b.local_of("failure", THROWABLE);
        handlers.push(Handler {
            catch: None,
            binding: t,
            body: vec![flag, Stmt::Throw(self.create_failure(local, Expr::local(t)))],
        });

        let exit = vec![Stmt::If {
            cond: Cond::True(Expr::local(exception_occurred)),
            then: vec![Stmt::Eval(self.inherited("createFailure", false, &[BEAN_O], "void", vec![Expr::local(bean_o)]))],
            otherwise: vec![Stmt::If {
                cond: Cond::True(Expr::local(pre_create_called)),
                then: vec![Stmt::Eval(self.inherited(
                    "afterPostCreateCompletion",
                    false,
                    &[BEAN_O],
                    "void",
                    vec![Expr::local(bean_o)],
                ))],
                otherwise: vec![],
            }],
        }];

        b.finish(vec![
            Stmt::Assign(rv, Expr::null()),
            Stmt::Assign(bean_o, Expr::null()),
            Stmt::Assign(exception_occurred, Expr::bool(false)),
            Stmt::Assign(pre_create_called, Expr::bool(false)),
            Stmt::Try(TryRegion { body, handlers, exit: Some(ExitRegion { in_flight: None, body: exit }) }),
            Stmt::Return(Some(Expr::local(rv))),
        ])
    }

    /// Acquire a worker, call `method` on it and release it. On a declared
    /// failure the worker is released before rethrowing; on anything else
    /// the exit region discards it.
    fn worker_sequence(
        &self,
        b: &mut BodyBuilder,
        m: &MethodDescriptor,
        worker: &Worker,
        method: &str,
        result: Option<LocalId>,
        result_type: TypeRef,
    ) -> Vec<Stmt> {
        let bean_o = b.local_of("beanO", ENTITY_BEAN_O);
        let bean = b.local_of("bean", &self.implementation);
        let acquire = self.home_hook(worker.acquire, &[], ENTITY_BEAN_O);
        let release_call =
            self.home_hook(worker.release, &[ENTITY_BEAN_O], "void").invoke_inherited(vec![Expr::local(bean_o)]);
        let discard_call =
            self.home_hook(worker.discard, &[ENTITY_BEAN_O], "void").invoke_inherited(vec![Expr::local(bean_o)]);

        let call = self.implementation_call(bean, method, m, result_type);
        let body = vec![
            Stmt::Assign(bean_o, acquire.invoke_inherited(vec![])),
            Stmt::Assign(
                bean,
                Expr::cast(
                    TypeRef::new(self.implementation.clone()),
                    hooks::GET_BEAN_INSTANCE.invoke(Expr::local(bean_o), vec![]),
                ),
            ),
            match result {
                Some(r) => Stmt::Assign(r, call),
                None => Stmt::Eval(call),
            },
            Stmt::Eval(release_call.clone()),
            Stmt::Assign(bean_o, Expr::null()),
        ];
        let handlers = self.rethrow_handlers(b, m, &[Stmt::Eval(release_call), Stmt::Assign(bean_o, Expr::null())]);
        let exit = vec![Stmt::If {
            cond: Cond::NotNull(Expr::local(bean_o)),
            then: vec![Stmt::Eval(discard_call)],
            otherwise: vec![],
        }];
        vec![
            Stmt::Assign(bean_o, Expr::null()),
            Stmt::Try(TryRegion { body, handlers, exit: Some(ExitRegion { in_flight: None, body: exit }) }),
        ]
    }

    fn activate(&self, local: bool, key: Expr, ret: &TypeRef) -> Expr {
        let object = if local { EJB_LOCAL_OBJECT } else { EJB_OBJECT };
        Expr::cast(ret.clone(), self.inherited("activateBean", local, &[OBJECT], object, vec![key]))
    }

    fn find_by_primary_key(&self, home: &HomeMethod) -> Body {
        let m = &home.descriptor;
        let object = if home.local { EJB_LOCAL_OBJECT } else { EJB_OBJECT };
        let mut b = BodyBuilder::new();
        let rv = b.local("rv", m.return_type.clone());
        let key = self.key_type();
        let pkey = b.local("pkey", key.clone());
        let mut then =
            self.worker_sequence(&mut b, m, &FIND_BY_PRIMARY_KEY, &entity_method(&m.name), Some(pkey), key);
        then.push(Stmt::Assign(rv, self.activate(home.local, Expr::local(pkey), &m.return_type)));
        let cached = self.inherited("getBean", home.local, &[OBJECT], object, forward_args(m.params.len().min(1)));
        b.finish(vec![
            Stmt::Assign(rv, Expr::cast(m.return_type.clone(), cached)),
            Stmt::If { cond: Cond::Null(Expr::local(rv)), then, otherwise: vec![] },
            Stmt::Return(Some(Expr::local(rv))),
        ])
    }

    fn finder(&self, home: &HomeMethod) -> Body {
        let m = &home.descriptor;
        let ret = &m.return_type;
        let (result_type, conversion) = if ret.is_class(COLLECTION) {
            (TypeRef::new(COLLECTION), Some("getCMP20Collection"))
        } else if ret.is_class(ENUMERATION) {
            (TypeRef::new(ENUMERATION), Some("getCMP20Enumeration"))
        } else {
            (self.key_type(), None)
        };
        let mut b = BodyBuilder::new();
        let result = b.local("result", result_type.clone());
        let mapped = match conversion {
            Some(name) => {
                let ty = result_type.name.as_str();
                self.inherited(name, home.local, &[ty], ty, vec![Expr::local(result)])
            }
            None => self.activate(home.local, Expr::local(result), ret),
        };
        let mut stmts = vec![Stmt::Assign(result, Expr::null())];
        stmts.extend(self.worker_sequence(
            &mut b,
            m,
            &FINDER,
            &entity_method(&m.name),
            Some(result),
            result_type.clone(),
        ));
        stmts.push(Stmt::Return(Some(mapped)));
        b.finish(stmts)
    }

    fn home_method(&self, home: &HomeMethod) -> Body {
        let m = &home.descriptor;
        let mut b = BodyBuilder::new();
        let result = (!m.return_type.is_void()).then(|| b.local("result", m.return_type.clone()));
        let mut stmts = Vec::new();
        if let Some(r) = result {
            stmts.push(Stmt::Assign(r, Expr::zero(&m.return_type)));
        }
        stmts.extend(self.worker_sequence(
            &mut b,
            m,
            &HOME_METHOD,
            &entity_method(&m.name),
            result,
            m.return_type.clone(),
        ));
        stmts.push(Stmt::Return(result.map(Expr::local)));
        b.finish(stmts)
    }
}

fn same_failures(a: &MethodDescriptor, b: &MethodDescriptor) -> bool {
    let mut x: Vec<&TypeRef> = a.exceptions.iter().collect();
    let mut y: Vec<&TypeRef> = b.exceptions.iter().collect();
    x.sort();
    x.dedup();
    y.sort();
    y.dedup();
    x == y
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::check_unit;
    use crate::model::{FactoryBinding, InterfaceDescriptor, TargetDescriptor};

    fn home_request(component_type: ComponentType, home: InterfaceDescriptor) -> GenerationRequest {
        GenerationRequest::new("Account", WrapperKind::FactoryRemote, TargetDescriptor::new("acme.AccountBean"))
            .with_component_type(component_type)
            .with_interface(home.extending(EJB_HOME))
    }

    #[test]
    fn names_of_bound_methods() {
        assert_eq!(entity_method("createWithOwner"), "ejbCreateWithOwner");
        assert_eq!(entity_method("findByPrimaryKey"), "ejbFindByPrimaryKey");
        assert_eq!(entity_method("findLarge"), "ejbFindLarge");
        assert_eq!(entity_method("totalBalance"), "ejbHomeTotalBalance");
        assert_eq!(operation_suffix("create"), "");
    }

    #[test]
    fn init_method_map_takes_precedence() {
        let m = MethodDescriptor::new("create").param(STRING);
        let mut binding = FactoryBinding::default();
        binding.init_methods.insert("create(Ljava/lang/String;)".into(), "init".into());
        let request = home_request(ComponentType::Stateful, InterfaceDescriptor::new("acme.AccountHome"))
            .with_factory(binding);
        assert_eq!(init_method(&request, &m), "init");
        assert_eq!(init_method(&request, &MethodDescriptor::new("createNamed")), "ejbCreateNamed");
    }

    #[test]
    fn companion_home_gets_local_variants() {
        let remote = InterfaceDescriptor::new("acme.AccountHome")
            .method(MethodDescriptor::new("create").returns("acme.Account").throws(CREATE_EXCEPTION))
            .method(MethodDescriptor::new("totalBalance").returns("long"));
        let local = InterfaceDescriptor::new("acme.AccountLocalHome")
            .extending(EJB_LOCAL_HOME)
            .method(MethodDescriptor::new("create").returns("acme.AccountLocal").throws(CREATE_EXCEPTION))
            .method(MethodDescriptor::new("totalBalance").returns("long").throws(FINDER_EXCEPTION));
        let binding = FactoryBinding { companion: Some(local), emit_implementation: true, ..Default::default() };
        let request = home_request(ComponentType::BeanManagedEntity, remote).with_factory(binding);
        let h = request.hierarchy();
        let (unit, warnings) = FactorySynthesizer::new(&request, &Config::default(), &h).build();
        let names: Vec<&str> = unit.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["<init>", "create", "totalBalance", "create_Local"]);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("totalBalance"), "{warnings:?}");
        check_unit(&unit, &h).unwrap();
    }

    #[test]
    fn stateless_create_asks_for_a_wrapper() {
        let home = InterfaceDescriptor::new("acme.AccountHome")
            .method(MethodDescriptor::new("create").returns("acme.Account").throws(CREATE_EXCEPTION));
        let request = home_request(ComponentType::Stateless, home);
        let h = request.hierarchy();
        let (unit, _) = FactorySynthesizer::new(&request, &Config::default(), &h).build();
        let create = unit.method("create").unwrap();
        let body = create.body.as_ref().unwrap();
        let Stmt::Try(region) = &body.stmts[0] else { panic!("expected a region") };
        assert!(region.exit.is_none());
        assert_eq!(region.handlers.len(), 2);
        check_unit(&unit, &h).unwrap();
    }
}
