use super::{ReviewError, ReviewResult};
use crate::consts::*;
use crate::model::{ComponentType, GenerationRequest, MethodDescriptor, TypeHierarchy, TypeRef, WrapperKind};
use crate::synth::factory::{entity_method, init_method, operation_suffix, FactoryOp};

fn invalid(m: &MethodDescriptor, message: impl Into<String>) -> ReviewError {
    ReviewError::InvalidFactoryMethod { method: m.to_string(), message: message.into() }
}

pub(crate) fn review_factory(request: &GenerationRequest, h: &TypeHierarchy) -> ReviewResult<()> {
    match request.component_type {
        ComponentType::Singleton | ComponentType::MessageDriven | ComponentType::Managed => {
            return Err(ReviewError::UnsupportedFactory(format!("{:?}", request.component_type)));
        }
        _ => {}
    }
    let primary_local = request.kind == WrapperKind::FactoryLocal;
    let mut homes: Vec<(bool, Vec<MethodDescriptor>)> =
        request.interfaces.iter().map(|i| (primary_local, i.owned_methods())).collect();
    if let Some(companion) = request.factory.as_ref().and_then(|f| f.companion.as_ref()) {
        homes.push((!primary_local, companion.owned_methods()));
    }

    let reviewer = FactoryReview { request, h };
    for (local, methods) in &homes {
        match request.component_type {
            ComponentType::Stateless => reviewer.stateless(*local, methods)?,
            ComponentType::Stateful => {
                for m in methods {
                    reviewer.session_create(*local, m)?;
                }
            }
            _ => {
                for m in methods {
                    reviewer.entity(*local, m)?;
                }
            }
        }
    }
    Ok(())
}

struct FactoryReview<'a> {
    request: &'a GenerationRequest,
    h: &'a TypeHierarchy,
}

impl<'a> FactoryReview<'a> {
    fn view_type(&self, local: bool) -> &'static str {
        if local {
            EJB_LOCAL_OBJECT
        } else {
            EJB_OBJECT
        }
    }

    fn returns_view(&self, local: bool, m: &MethodDescriptor) -> ReviewResult<()> {
        let view = self.view_type(local);
        if m.return_type.is_array() || !self.h.is_strict_subtype(&m.return_type.name, view) {
            return Err(invalid(m, format!("must return a {view} view")));
        }
        Ok(())
    }

    /// CreateException itself or one of its supertypes is declared.
    fn declares_create_failure(&self, m: &MethodDescriptor) -> ReviewResult<()> {
        if !m.exceptions.iter().any(|e| self.h.is_subtype(CREATE_EXCEPTION, &e.name)) {
            return Err(invalid(m, format!("must declare {CREATE_EXCEPTION}")));
        }
        Ok(())
    }

    fn bound(&self, m: &MethodDescriptor, name: &str) -> ReviewResult<&'a MethodDescriptor> {
        self.request.target.find(name, &m.params).ok_or_else(|| ReviewError::MissingBoundMethod {
            method: m.to_string(),
            required: format!("{}({})", name, m.params.iter().map(|p| p.to_string()).collect::<Vec<_>>().join(", ")),
        })
    }

    fn key_type_ok(&self, ty: &TypeRef) -> bool {
        match self.request.factory.as_ref().and_then(|f| f.key_type.as_ref()) {
            Some(key) => ty == key,
            None => ty.is_reference(),
        }
    }

    fn stateless(&self, local: bool, methods: &[MethodDescriptor]) -> ReviewResult<()> {
        match methods {
            [m] if m.name == "create" && m.params.is_empty() => {
                self.returns_view(local, m)?;
                self.declares_create_failure(m)
            }
            [m, ..] => Err(invalid(m, "a stateless home has exactly one create() method")),
            [] => Ok(()),
        }
    }

    fn session_create(&self, local: bool, m: &MethodDescriptor) -> ReviewResult<()> {
        if FactoryOp::of(&m.name) != FactoryOp::Create {
            return Err(invalid(m, "a stateful home only declares create methods"));
        }
        self.returns_view(local, m)?;
        self.declares_create_failure(m)?;
        self.bound(m, &init_method(self.request, m))?;
        Ok(())
    }

    fn entity(&self, local: bool, m: &MethodDescriptor) -> ReviewResult<()> {
        if m.name.starts_with("remove") {
            return Err(invalid(m, "remove methods are inherited from the home interface"));
        }
        match FactoryOp::of(&m.name) {
            FactoryOp::Create => {
                self.returns_view(local, m)?;
                self.declares_create_failure(m)?;
                let create = self.bound(m, &entity_method(&m.name))?;
                if !self.key_type_ok(&create.return_type) {
                    return Err(invalid(m, format!("{} must return the primary key type", create.name)));
                }
                let post = self.bound(m, &format!("ejbPostCreate{}", operation_suffix(&m.name)))?;
                if !post.return_type.is_void() {
                    return Err(invalid(m, format!("{} must return void", post.name)));
                }
            }
            FactoryOp::FindByPrimaryKey => {
                self.returns_view(local, m)?;
                self.bound(m, &entity_method(&m.name))?;
            }
            FactoryOp::Find => {
                let finder = self.bound(m, &entity_method(&m.name))?;
                let ret = &m.return_type;
                let expected_ok = if ret.is_class(COLLECTION) || ret.is_class(ENUMERATION) {
                    &finder.return_type == ret
                } else {
                    self.returns_view(local, m)?;
                    self.key_type_ok(&finder.return_type)
                };
                if !expected_ok {
                    return Err(invalid(m, format!("{} returns {}", finder.name, finder.return_type)));
                }
            }
            FactoryOp::Home => {
                let bound = self.bound(m, &entity_method(&m.name))?;
                if bound.return_type != m.return_type {
                    return Err(invalid(m, format!("{} must return {}", bound.name, m.return_type)));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ClassInfo, FactoryBinding, InterfaceDescriptor, TargetDescriptor};

    fn home(methods: Vec<MethodDescriptor>) -> InterfaceDescriptor {
        methods
            .into_iter()
            .fold(InterfaceDescriptor::new("acme.AccountHome").extending(EJB_HOME), |i, m| i.method(m))
    }

    fn request(component_type: ComponentType, target: TargetDescriptor, methods: Vec<MethodDescriptor>) -> GenerationRequest {
        GenerationRequest::new("Account", WrapperKind::FactoryRemote, target)
            .with_component_type(component_type)
            .with_interface(home(methods))
            .with_type(ClassInfo::interface("acme.Account", &[EJB_OBJECT]))
    }

    fn run(r: &GenerationRequest) -> ReviewResult<()> {
        review_factory(r, &r.hierarchy())
    }

    fn create(params: &[&str]) -> MethodDescriptor {
        params
            .iter()
            .fold(MethodDescriptor::new("create"), |m, p| m.param(*p))
            .returns("acme.Account")
            .throws(CREATE_EXCEPTION)
    }

    #[test]
    fn stateless_home_has_one_create() {
        let target = TargetDescriptor::new("acme.AccountBean");
        assert_eq!(run(&request(ComponentType::Stateless, target.clone(), vec![create(&[])])), Ok(()));
        let err = run(&request(ComponentType::Stateless, target, vec![create(&[STRING])])).unwrap_err();
        assert_eq!(err.rule(), "factory");
    }

    #[test]
    fn stateful_create_needs_init_method() {
        let target = TargetDescriptor::new("acme.AccountBean")
            .method(MethodDescriptor::new("ejbCreate"))
            .method(MethodDescriptor::new("ejbCreate").param(STRING));
        let r = request(ComponentType::Stateful, target.clone(), vec![create(&[]), create(&[STRING])]);
        assert_eq!(run(&r), Ok(()));

        let r = request(ComponentType::Stateful, target, vec![create(&["int"])]);
        assert!(matches!(run(&r), Err(ReviewError::MissingBoundMethod { .. })));
    }

    #[test]
    fn stateful_create_uses_init_method_map() {
        let target = TargetDescriptor::new("acme.AccountBean").method(MethodDescriptor::new("initialize"));
        let mut binding = FactoryBinding::default();
        binding.init_methods.insert("create".into(), "initialize".into());
        let r = request(ComponentType::Stateful, target, vec![create(&[])]).with_factory(binding);
        assert_eq!(run(&r), Ok(()));
    }

    #[test]
    fn entity_finders_bind_to_bean_methods() {
        let target = TargetDescriptor::new("acme.AccountBean")
            .method(MethodDescriptor::new("ejbFindByPrimaryKey").param(STRING).returns(STRING))
            .method(MethodDescriptor::new("ejbFindLarge").returns(COLLECTION))
            .method(MethodDescriptor::new("ejbHomeTotal").returns("long"));
        let methods = vec![
            MethodDescriptor::new("findByPrimaryKey").param(STRING).returns("acme.Account"),
            MethodDescriptor::new("findLarge").returns(COLLECTION),
            MethodDescriptor::new("total").returns("long"),
        ];
        assert_eq!(run(&request(ComponentType::BeanManagedEntity, target.clone(), methods)), Ok(()));

        let wrong = vec![MethodDescriptor::new("findLarge").returns(ENUMERATION)];
        assert!(run(&request(ComponentType::BeanManagedEntity, target.clone(), wrong)).is_err());
        let remove = vec![MethodDescriptor::new("removeAll")];
        assert!(run(&request(ComponentType::BeanManagedEntity, target, remove)).is_err());
    }

    #[test]
    fn entity_create_needs_key_and_post_create() {
        let target = TargetDescriptor::new("acme.AccountBean")
            .method(MethodDescriptor::new("ejbCreate").param(STRING).returns(STRING));
        let r = request(ComponentType::BeanManagedEntity, target.clone(), vec![create(&[STRING])]);
        assert!(matches!(run(&r), Err(ReviewError::MissingBoundMethod { .. })));

        let target = target.method(MethodDescriptor::new("ejbPostCreate").param(STRING));
        let r = request(ComponentType::BeanManagedEntity, target, vec![create(&[STRING])]);
        assert_eq!(run(&r), Ok(()));
    }

    #[test]
    fn singletons_have_no_home() {
        let r = request(ComponentType::Singleton, TargetDescriptor::new("acme.AccountBean"), vec![]);
        assert!(matches!(run(&r), Err(ReviewError::UnsupportedFactory(_))));
    }
}
