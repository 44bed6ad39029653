//! Unified error types for the Snapbox workspace.
//!
//! Every failure surfaces as one of the categories below. The CLI maps
//! each category to a stable process exit code via [`SnapboxError::exit_code`].

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum SnapboxError {
    /// A named image or container does not exist.
    #[error("no {kind} named '{id}' exists")]
    NotFound {
        /// Type of the missing object.
        kind: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// An operation refused to overwrite an existing object.
    #[error("{kind} '{id}' already exists")]
    Exists {
        /// Type of the colliding object.
        kind: &'static str,
        /// Identifier that collided.
        id: String,
    },

    /// External state the engine depends on is missing.
    #[error("precondition failed: {message}")]
    Precondition {
        /// Description of the missing precondition.
        message: String,
    },

    /// The target container has no live init process.
    #[error("container '{id}' exists but is not running")]
    NotRunning {
        /// Identifier of the stopped container.
        id: String,
    },

    /// A syscall on a critical path was refused by the kernel.
    #[error("{op} failed: {message}")]
    Kernel {
        /// Operation that failed.
        op: &'static str,
        /// Kernel-reported reason.
        message: String,
    },

    /// An external tool invocation failed.
    #[error("{program} failed: {stderr}")]
    External {
        /// Program that was invoked.
        program: &'static str,
        /// Captured standard error of the failed invocation.
        stderr: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A registry download failed.
    #[error("fetch failed for {url}: {message}")]
    Fetch {
        /// URL that could not be fetched.
        url: String,
        /// Transport-level reason.
        message: String,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl SnapboxError {
    /// Returns the process exit code for this error's category.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } => 2,
            Self::Exists { .. } => 3,
            Self::Precondition { .. } => 4,
            Self::NotRunning { .. } => 5,
            Self::Kernel { .. } | Self::External { .. } => 6,
            Self::Io { .. } | Self::Fetch { .. } | Self::Serialization { .. } => 7,
            Self::Config { .. } => 1,
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, SnapboxError>;
