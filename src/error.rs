use thiserror::Error;

use crate::codegen::EmitError;
use crate::naming::NamingError;

/// Result type for jitdeploy operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for generation requests
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The descriptor set violates a structural rule; nothing was emitted.
    #[error("Configuration error in {component} ({rule}): {message}")]
    Configuration {
        component: String,
        rule: &'static str,
        message: String,
    },

    #[error("Naming conflict between '{first}' and '{second}': {reason}")]
    NamingConflict {
        first: String,
        second: String,
        reason: String,
    },

    #[error("Structural encoding error in {component}.{method}: {message}")]
    StructuralEncoding {
        component: String,
        method: String,
        message: String,
    },

    #[error("Invalid configuration: {message}")]
    Config { message: String },

    #[error("Internal generator error: {message}")]
    Internal { message: String },
}

impl Error {
    pub fn configuration(
        component: impl Into<String>,
        rule: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::Configuration {
            component: component.into(),
            rule,
            message: message.into(),
        }
    }

    pub fn structural(
        component: impl Into<String>,
        method: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::StructuralEncoding {
            component: component.into(),
            method: method.into(),
            message: message.into(),
        }
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    /// True for the ConfigurationError class of failures.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }
}

impl From<NamingError> for Error {
    fn from(err: NamingError) -> Self {
        match err {
            NamingError::Conflict { first, second, reason } => {
                Self::NamingConflict { first, second, reason }
            }
        }
    }
}

impl From<EmitError> for Error {
    fn from(err: EmitError) -> Self {
        Self::StructuralEncoding {
            component: err.unit,
            method: err.method.unwrap_or_else(|| "<class>".to_string()),
            message: err.message,
        }
    }
}
