#![forbid(unsafe_code)]

//! Context configuration.
//!
//! [`ContextConfig`] is a plain struct with `Default` and `with_*` builders.
//! With the `config-file` feature it can also be loaded from TOML or JSON;
//! missing keys take their defaults and the result is validated.
//!
//! ```toml
//! max_path_depth = 4
//! auto_register_instantiated = false
//! coerce_control_values = true
//! ```

use tether_core::{Error, Result};

/// Default limit on the number of hops in a property path.
pub const DEFAULT_MAX_PATH_DEPTH: usize = 8;

/// Settings shared by everything built on a [`Context`](crate::Context).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "config-file",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, deny_unknown_fields)
)]
pub struct ContextConfig {
    /// Maximum number of segments in a dotted property path.
    pub max_path_depth: usize,
    /// Register entities rebuilt by `Context::instantiate` automatically.
    pub auto_register_instantiated: bool,
    /// Coerce control values to the bound property's type. When off, a
    /// control value of the wrong type is a `TypeMismatch`.
    pub coerce_control_values: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_path_depth: DEFAULT_MAX_PATH_DEPTH,
            auto_register_instantiated: true,
            coerce_control_values: true,
        }
    }
}

impl ContextConfig {
    #[must_use]
    pub fn with_max_path_depth(mut self, depth: usize) -> Self {
        self.max_path_depth = depth;
        self
    }

    #[must_use]
    pub fn with_auto_register_instantiated(mut self, enabled: bool) -> Self {
        self.auto_register_instantiated = enabled;
        self
    }

    #[must_use]
    pub fn with_coerce_control_values(mut self, enabled: bool) -> Self {
        self.coerce_control_values = enabled;
        self
    }

    /// Reject settings no context can work with.
    pub fn validate(&self) -> Result<()> {
        if self.max_path_depth == 0 {
            return Err(Error::Config("max_path_depth must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(feature = "config-file")]
impl ContextConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(input: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(input).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file; `.json` files are parsed as JSON, anything else as
    /// TOML.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_toml_str(&text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ContextConfig::default();
        assert_eq!(config.max_path_depth, 8);
        assert!(config.auto_register_instantiated);
        assert!(config.coerce_control_values);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builders_chain() {
        let config = ContextConfig::default()
            .with_max_path_depth(2)
            .with_auto_register_instantiated(false)
            .with_coerce_control_values(false);
        assert_eq!(config.max_path_depth, 2);
        assert!(!config.auto_register_instantiated);
        assert!(!config.coerce_control_values);
    }

    #[test]
    fn zero_depth_is_rejected() {
        let err = ContextConfig::default()
            .with_max_path_depth(0)
            .validate()
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[cfg(feature = "config-file")]
    mod file {
        use std::io::Write;

        use super::*;

        #[test]
        fn toml_fills_missing_keys() {
            let config = ContextConfig::from_toml_str("max_path_depth = 3").unwrap();
            assert_eq!(config.max_path_depth, 3);
            assert!(config.coerce_control_values);
        }

        #[test]
        fn json_is_validated() {
            let err = ContextConfig::from_json_str(r#"{"max_path_depth": 0}"#).unwrap_err();
            assert!(matches!(err, Error::Config(_)));
        }

        #[test]
        fn unknown_keys_are_rejected() {
            assert!(ContextConfig::from_toml_str("depth = 3").is_err());
        }

        #[test]
        fn load_picks_format_by_extension() {
            let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
            write!(file, r#"{{"auto_register_instantiated": false}}"#).unwrap();
            let config = ContextConfig::load(file.path()).unwrap();
            assert!(!config.auto_register_instantiated);
        }
    }
}
