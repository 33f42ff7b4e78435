//! Training configuration loading
//!
//! The training configuration is an arbitrary YAML mapping. Only the
//! parallelism keys are interpreted; everything else is carried through
//! untouched for display.

use crate::{Error, Result};
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::path::Path;
use tracing::debug;

/// Key holding the pipeline-parallel degree
pub const PIPE_PARALLEL_KEY: &str = "pipe_parallel_size";

/// Key holding the model-parallel degree
pub const MODEL_PARALLEL_KEY: &str = "model_parallel_size";

/// Section holding ZeRO optimizer settings
pub const ZERO_OPTIMIZATION_KEY: &str = "zero_optimization";

/// Raw training configuration, passed through unmodified
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RawConfig(Mapping);

impl RawConfig {
    /// Wrap an already parsed mapping
    pub fn new(mapping: Mapping) -> Self {
        Self(mapping)
    }

    /// Load a configuration file from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config_load(format!("{}: {}", path.display(), e)))?;

        let config = Self::parse(&content)
            .map_err(|e| Error::config_load(format!("{}: {}", path.display(), e)))?;

        debug!("Loaded {} top-level keys from {}", config.len(), path.display());
        Ok(config)
    }

    /// Parse a configuration document
    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let value: Value = serde_yaml::from_str(content)?;
        match value {
            Value::Mapping(mapping) => {
                check_keys(&mapping)?;
                Ok(Self(mapping))
            }
            Value::Null => Ok(Self::default()),
            other => Err(Error::config_load(format!(
                "expected a mapping at the top level, found {}",
                value_kind(&other)
            ))),
        }
    }

    /// Look up a top-level key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Number of top-level keys
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the configuration has no keys at all
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying mapping
    pub fn as_mapping(&self) -> &Mapping {
        &self.0
    }

    /// Read a parallelism degree, defaulting to 1 when the key is absent
    pub fn parallel_degree(&self, key: &str) -> Result<u32> {
        let Some(value) = self.get(key) else {
            return Ok(1);
        };

        value
            .as_u64()
            .filter(|v| *v > 0)
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| {
                Error::invalid_setting(format!(
                    "{} must be a positive integer, found {}",
                    key,
                    render_scalar(value)
                ))
            })
    }

    /// ZeRO optimization stage, 0 when not configured
    pub fn zero_stage(&self) -> u64 {
        self.get(ZERO_OPTIMIZATION_KEY)
            .and_then(|zero| zero.get("stage"))
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }
}

impl From<Mapping> for RawConfig {
    fn from(mapping: Mapping) -> Self {
        Self(mapping)
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Reject keys the JSON document cannot represent, at any depth
fn check_keys(mapping: &Mapping) -> Result<()> {
    for (key, value) in mapping {
        match key {
            Value::Bool(_) | Value::Number(_) | Value::String(_) => {}
            other => {
                return Err(Error::config_load(format!(
                    "mapping keys must be strings, numbers or booleans, found {}",
                    value_kind(other)
                )))
            }
        }
        check_nested_keys(value)?;
    }
    Ok(())
}

fn check_nested_keys(value: &Value) -> Result<()> {
    match value {
        Value::Mapping(mapping) => check_keys(mapping),
        Value::Sequence(items) => items.iter().try_for_each(check_nested_keys),
        Value::Tagged(tagged) => check_nested_keys(&tagged.value),
        _ => Ok(()),
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("{:?}", s),
        other => value_kind(other).to_string(),
    }
}
