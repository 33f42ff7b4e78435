//! Error handling for the topology tooling
//!
//! Provides a unified error type and result type shared by the extractor,
//! the builder and the orchestration around them.

/// Result type alias for topology operations
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The training configuration file is missing or not well-formed
    #[error("Config load error: {0}")]
    ConfigLoad(String),

    /// A parallelism setting has an unusable value
    #[error("Invalid setting: {0}")]
    InvalidSetting(String),

    /// The device product exceeds the device count and the caller asked to reject it
    #[error(
        "Degenerate topology: pipe_parallel_size ({pipe}) * model_parallel_size ({model}) exceeds {total} devices"
    )]
    DegenerateTopology { pipe: u32, model: u32, total: u32 },

    /// Device telemetry could not be queried
    #[error("Telemetry error: {0}")]
    Telemetry(String),

    /// Operation timed out
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Output target could not be written
    #[error("Output write error: {0}")]
    OutputWrite(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create a config load error
    pub fn config_load(msg: impl Into<String>) -> Self {
        Self::ConfigLoad(msg.into())
    }

    /// Create an invalid setting error
    pub fn invalid_setting(msg: impl Into<String>) -> Self {
        Self::InvalidSetting(msg.into())
    }

    /// Create a telemetry error
    pub fn telemetry(msg: impl Into<String>) -> Self {
        Self::Telemetry(msg.into())
    }

    /// Create a timeout error
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Create an output write error
    pub fn output_write(msg: impl Into<String>) -> Self {
        Self::OutputWrite(msg.into())
    }

    /// Check if the next polling cycle may succeed where this one failed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Telemetry(_) | Error::Timeout(_) | Error::OutputWrite(_) | Error::Io(_)
        )
    }

    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Error::ConfigLoad(_) => "config_load",
            Error::InvalidSetting(_) => "invalid_setting",
            Error::DegenerateTopology { .. } => "degenerate_topology",
            Error::Telemetry(_) => "telemetry",
            Error::Timeout(_) => "timeout",
            Error::OutputWrite(_) => "output_write",
            Error::Io(_) => "io",
            Error::Json(_) => "json",
            Error::Yaml(_) => "yaml",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = Error::config_load("20B.yml: not found");
        assert!(matches!(err, Error::ConfigLoad(_)));
        assert_eq!(err.to_string(), "Config load error: 20B.yml: not found");
    }

    #[test]
    fn test_degenerate_display() {
        let err = Error::DegenerateTopology {
            pipe: 4,
            model: 4,
            total: 8,
        };
        assert_eq!(
            err.to_string(),
            "Degenerate topology: pipe_parallel_size (4) * model_parallel_size (4) exceeds 8 devices"
        );
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(Error::config_load("x").category(), "config_load");
        assert_eq!(Error::telemetry("x").category(), "telemetry");
        assert_eq!(Error::output_write("x").category(), "output_write");
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::telemetry("nvml gone").is_retryable());
        assert!(Error::timeout("query").is_retryable());
        assert!(!Error::invalid_setting("pipe").is_retryable());
    }
}
