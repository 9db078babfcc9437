//! Error types for the OBD kernel.
//!
//! Routing and admission failures are not errors: they degrade to dropped
//! messages and counters. `ObdError` covers the real fallible boundaries
//! (node initialization hooks, configuration files, the run loop).

use thiserror::Error;

/// Errors raised by the kernel and its configuration layer
#[derive(Debug, Error)]
pub enum ObdError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Node '{node}' failed to initialize: {reason}")]
    NodeInit { node: String, reason: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ObdError {
    /// Shorthand for a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        ObdError::Config(msg.into())
    }

    /// Shorthand for a node initialization failure
    pub fn node_init(node: impl Into<String>, reason: impl Into<String>) -> Self {
        ObdError::NodeInit {
            node: node.into(),
            reason: reason.into(),
        }
    }
}

impl From<toml::de::Error> for ObdError {
    fn from(err: toml::de::Error) -> Self {
        ObdError::Config(format!("invalid TOML: {}", err))
    }
}

impl From<toml::ser::Error> for ObdError {
    fn from(err: toml::ser::Error) -> Self {
        ObdError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for ObdError {
    fn from(err: serde_yaml::Error) -> Self {
        ObdError::Serialization(err.to_string())
    }
}

/// Result alias used across the kernel
pub type ObdResult<T> = Result<T, ObdError>;
