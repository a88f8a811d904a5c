//! Store configuration
//!
//! Loaded from YAML. Every field has a default, so an empty document is a
//! valid configuration:
//!
//! ```yaml
//! logging:
//!   enabled: true
//!   name: blog-api
//!   include_payload: false
//!   include_stack: true
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DispatchError, Result};

/// Top-level store configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Options for the logging plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Install the logging plugin in [`Store::from_config`](crate::Store::from_config)
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Value of the `app` field on every dispatch span
    #[serde(default = "default_name")]
    pub name: String,

    /// Attach the payload to `before_<method>` events
    #[serde(default)]
    pub include_payload: bool,

    /// Record the full call stack on each span
    #[serde(default = "default_include_stack")]
    pub include_stack: bool,
}

fn default_enabled() -> bool {
    true
}

fn default_name() -> String {
    "app".to_string()
}

fn default_include_stack() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            name: default_name(),
            include_payload: false,
            include_stack: default_include_stack(),
        }
    }
}

impl StoreConfig {
    /// Parse configuration from YAML content
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed or the logging name is empty.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        // serde_yaml rejects an empty document, treat it as all defaults
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: StoreConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or its content is invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&content)?;
        debug!(path = %path.display(), "Loaded store configuration");
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.logging.name.trim().is_empty() {
            return Err(DispatchError::ValidationError(
                "logging.name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
