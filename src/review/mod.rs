//! Request review before any synthesis
//!
//! Every rule here rejects the whole request. Nothing is synthesized or
//! emitted for a request that fails review.

mod factory;
mod interfaces;
mod methods;

use crate::error::Error;
use crate::model::{GenerationRequest, TypeHierarchy};

pub type ReviewResult<T> = Result<T, ReviewError>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ReviewError {
    #[error("{kind} view requires at least one interface")]
    MissingInterface { kind: String },
    #[error("interface {interface} must extend {required}")]
    MissingSuperInterface { interface: String, required: String },
    #[error("business interface {interface} must not extend {parent}")]
    ForbiddenSuperInterface { interface: String, parent: String },
    #[error("local business interface {0} must not extend java.rmi.Remote")]
    RemoteLocalInterface(String),
    #[error("{kind} view cannot aggregate {count} interfaces")]
    AggregateNotAllowed { kind: String, count: usize },
    #[error("method {0} is not implemented by the bean class")]
    MissingImplementationMethod(String),
    #[error("method {0} must not start with 'ejb'")]
    ReservedPrefix(String),
    #[error("method {0} of a no-interface view must not be final")]
    FinalMethod(String),
    #[error("public method {0} of a no-interface view must not declare java.rmi.RemoteException")]
    RemoteFailureOnNoInterface(String),
    #[error("asynchronous method {0} must return void or java.util.concurrent.Future")]
    AsyncReturnType(String),
    #[error("{0} components cannot have a home interface")]
    UnsupportedFactory(String),
    #[error("home method {method}: {message}")]
    InvalidFactoryMethod { method: String, message: String },
    #[error("home method {method} requires {required} on the bean class")]
    MissingBoundMethod { method: String, required: String },
}

impl ReviewError {
    /// Short rule tag carried by the configuration error.
    pub fn rule(&self) -> &'static str {
        match self {
            ReviewError::MissingInterface { .. }
            | ReviewError::MissingSuperInterface { .. }
            | ReviewError::ForbiddenSuperInterface { .. }
            | ReviewError::RemoteLocalInterface(_) => "interface",
            ReviewError::AggregateNotAllowed { .. } => "aggregate",
            ReviewError::MissingImplementationMethod(_) => "implementation-method",
            ReviewError::ReservedPrefix(_) => "ejb-prefix",
            ReviewError::FinalMethod(_) | ReviewError::RemoteFailureOnNoInterface(_) => "no-interface",
            ReviewError::AsyncReturnType(_) => "asynchronous",
            ReviewError::UnsupportedFactory(_)
            | ReviewError::InvalidFactoryMethod { .. }
            | ReviewError::MissingBoundMethod { .. } => "factory",
        }
    }

    pub fn into_error(self, component: &str) -> Error {
        Error::configuration(component, self.rule(), self.to_string())
    }
}

/// Check `request` against every structural rule of its kind.
pub fn review(request: &GenerationRequest, hierarchy: &TypeHierarchy) -> ReviewResult<()> {
    log::debug!("review start: {} {} ({} interfaces)", request.component, request.kind, request.interfaces.len());
    interfaces::review_interfaces(request, hierarchy)?;
    methods::review_methods(request, hierarchy)?;
    if request.kind.is_factory() {
        factory::review_factory(request, hierarchy)?;
    }
    log::debug!("review end: ok");
    Ok(())
}
