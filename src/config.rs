//! Configuration for the stub server.
//!
//! Defines the raw stub shape accepted from callers and config files, plus
//! global settings. Raw definitions are validated into [`crate::stub::Stub`].

use crate::stub::Stub;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// A parameter payload: field name to arbitrary nested value.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Main configuration for the stub server.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct StubServerConfig {
    /// Stubs preloaded at startup, in registration order
    #[serde(default)]
    pub stubs: Vec<StubDefinition>,

    /// Global settings
    #[serde(default)]
    pub settings: GlobalSettings,
}

impl StubServerConfig {
    /// Load configuration from a YAML (or JSON) file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", path.display(), e))?;
        Self::from_yaml(&content)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (i, stub) in self.stubs.iter().enumerate() {
            stub.validate()
                .map_err(|e| anyhow::anyhow!("Stub {}: {}", i, e))?;
        }
        Ok(())
    }
}

/// A stub as submitted for registration.
///
/// Every field of `input` and `output` is optional here; validation picks the
/// active one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StubDefinition {
    /// Service name
    #[serde(default)]
    pub service: String,

    /// Method name (canonicalized on validation)
    #[serde(default)]
    pub method: String,

    /// Input matching rule
    #[serde(default)]
    pub input: InputDefinition,

    /// Response to synthesize
    #[serde(default)]
    pub output: OutputDefinition,
}

impl StubDefinition {
    /// Validate the stub definition.
    pub fn validate(&self) -> Result<(), crate::error::StubError> {
        Stub::try_from(self.clone()).map(|_| ())
    }
}

/// Input matching configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct InputDefinition {
    /// Payload must equal this mapping exactly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equals: Option<Payload>,

    /// Payload must contain these entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<Payload>,

    /// Payload values must match these patterns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matches: Option<Payload>,
}

/// Output configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct OutputDefinition {
    /// Response body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Payload>,

    /// Failure message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Failure status code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeDefinition>,
}

/// Status code as a number or canonical name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CodeDefinition {
    Number(u32),
    Name(String),
}

impl fmt::Display for CodeDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeDefinition::Number(n) => write!(f, "{}", n),
            CodeDefinition::Name(name) => f.write_str(name),
        }
    }
}

/// Global settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalSettings {
    /// Log all matched stubs
    #[serde(default = "default_true")]
    pub log_matches: bool,

    /// Log unmatched lookups
    #[serde(default = "default_true")]
    pub log_unmatched: bool,
}

fn default_true() -> bool {
    true
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            log_matches: true,
            log_unmatched: true,
        }
    }
}
