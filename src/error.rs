//! Error types shared by every framework component.

use std::path::PathBuf;
use thiserror::Error;

/// Framework error
#[derive(Debug, Error)]
pub enum Error {
    /// No handler for the action/method pair and no not-found handler.
    #[error("No action defined: {action} ({method})")]
    NoAction { action: String, method: String },

    /// Actions are registered under a non-empty name.
    #[error("Need to set an action name")]
    EmptyActionName,

    /// A bound argument the handler requires was not supplied.
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    /// A bound argument could not be parsed into the requested type.
    #[error("Invalid value for parameter {name}: {value}")]
    InvalidParameter { name: String, value: String },

    /// Forwarding nested deeper than the configured limit.
    #[error("Forward depth limit of {0} exceeded")]
    ForwardLimit(usize),

    #[error("Directory does not exist: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("No layout file provided")]
    NoLayout,

    #[error("Script file does not exist: {0}")]
    ScriptNotFound(String),

    /// Template includes nested deeper than the renderer allows.
    #[error("Include depth exceeded while rendering {0}")]
    IncludeDepth(String),

    #[error("No component under the name: {0}")]
    ComponentNotFound(String),

    #[error("The name: {0} is already in use")]
    NameInUse(String),

    #[error("Cannot instantiate {name}: unsatisfied dependency {dependency}")]
    UnsatisfiedDependency { name: String, dependency: String },

    #[error("Dependency cycle: {0}")]
    DependencyCycle(String),

    /// The registered component is not of the requested type.
    #[error("Component {0} has a different type than requested")]
    ComponentType(String),

    /// A handler produced a header value HTTP cannot carry.
    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    #[error("Unsupported hash algorithm: {0}")]
    UnknownAlgorithm(String),

    #[error("Invalid HMAC key")]
    HmacKey,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the failure means "nothing to route to" rather than a fault.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NoAction { .. })
    }
}

/// Result alias used across the crate
pub type Result<T, E = Error> = std::result::Result<T, E>;
