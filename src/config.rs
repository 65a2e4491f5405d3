//! Generator configuration
//!
//! Built with chained `with_*` calls or loaded from a TOML file:
//!
//! ```toml
//! class_file_major = 49
//! name_compat = false
//! declared_unchecked_are_system_exceptions = true
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Lowest class file major version the emitter will produce (Java 1.1).
pub const MIN_CLASS_FILE_MAJOR: u16 = 45;
/// Highest class file major version that does not require StackMapTable frames.
pub const MAX_CLASS_FILE_MAJOR: u16 = 49;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Class file major version of emitted units.
    pub class_file_major: u16,
    /// Keep both the legacy and the corrected wire name when an owner-name
    /// collision cannot be resolved. A request-level flag overrides this.
    pub name_compat: bool,
    /// A declared `java.lang.Exception` gets a dedicated RuntimeException handler.
    pub declared_unchecked_are_system_exceptions: bool,
    /// Declared RemoteException subtypes are application exceptions.
    pub declared_remote_are_application_exceptions: bool,
    /// Run the class file verifier over every emitted unit.
    pub verify_output: bool,
    /// Directory the CLI writes emitted units to.
    pub dump_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            class_file_major: MAX_CLASS_FILE_MAJOR,
            name_compat: false,
            declared_unchecked_are_system_exceptions: true,
            declared_remote_are_application_exceptions: false,
            verify_output: true,
            dump_dir: None,
        }
    }
}

impl Config {
    pub fn with_class_file_major(mut self, major: u16) -> Self {
        self.class_file_major = major;
        self
    }

    pub fn with_name_compat(mut self, enabled: bool) -> Self {
        self.name_compat = enabled;
        self
    }

    pub fn with_declared_unchecked_are_system_exceptions(mut self, enabled: bool) -> Self {
        self.declared_unchecked_are_system_exceptions = enabled;
        self
    }

    pub fn with_declared_remote_are_application_exceptions(mut self, enabled: bool) -> Self {
        self.declared_remote_are_application_exceptions = enabled;
        self
    }

    pub fn with_verify_output(mut self, enabled: bool) -> Self {
        self.verify_output = enabled;
        self
    }

    pub fn with_dump_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dump_dir = Some(dir.into());
        self
    }

    /// Parse a configuration from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(text).map_err(|e| Error::config_error(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_CLASS_FILE_MAJOR..=MAX_CLASS_FILE_MAJOR).contains(&self.class_file_major) {
            return Err(Error::config_error(format!(
                "class_file_major {} outside supported range {}..={}",
                self.class_file_major, MIN_CLASS_FILE_MAJOR, MAX_CLASS_FILE_MAJOR
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = Config::default()
            .with_name_compat(true)
            .with_class_file_major(46)
            .with_verify_output(false);
        assert!(config.name_compat);
        assert_eq!(config.class_file_major, 46);
        assert!(!config.verify_output);
        assert!(config.declared_unchecked_are_system_exceptions);
    }

    #[test]
    fn toml_partial_keys_keep_defaults() {
        let config = Config::from_toml_str("name_compat = true\n").unwrap();
        assert!(config.name_compat);
        assert_eq!(config.class_file_major, MAX_CLASS_FILE_MAJOR);
    }

    #[test]
    fn toml_rejects_frame_requiring_versions() {
        let err = Config::from_toml_str("class_file_major = 52\n").unwrap_err();
        assert!(err.to_string().contains("class_file_major 52"), "{err}");
    }
}
