//! Error types for Gantry
//!
//! Uses `thiserror` for library errors; the binary wraps these in `anyhow`.

use std::path::PathBuf;
use thiserror::Error;

use crate::host::{HostError, ServiceState};

/// Result type alias for Gantry operations
pub type GantryResult<T> = Result<T, GantryError>;

/// Main error type for Gantry operations
#[derive(Error, Debug)]
pub enum GantryError {
    /// A file named on the command line does not exist
    #[error("required file not found: {path}")]
    MissingFile { path: PathBuf },

    /// No certificate with the requested thumbprint in the machine store
    #[error("no certificate with thumbprint '{thumbprint}' in the machine store")]
    MissingCertificate { thumbprint: String },

    /// Web server too old for endpoint provisioning
    #[error("web server version {major}.{minor} is not supported (7.0 or later required)")]
    UnsupportedPlatform { major: u32, minor: u32 },

    /// Publishing service is not installed on this host
    #[error("web publishing service '{service}' is not installed")]
    ServiceMissing { service: String },

    /// Publishing service exists but is not running
    #[error("web publishing service '{service}' is {state}, expected running")]
    ServiceNotRunning {
        service: String,
        state: ServiceState,
    },

    /// Settings document could not be read or rewritten
    #[error("could not update {path}: {message}")]
    ConfigWrite { path: PathBuf, message: String },

    /// Tool configuration file failed to parse
    #[error("invalid configuration in {path}: {message}")]
    InvalidConfig { path: PathBuf, message: String },

    /// A required argument was given as an empty string
    #[error("argument '{name}' must not be empty")]
    EmptyArgument { name: &'static str },

    /// A source path has no final component to deploy under
    #[error("path has no file name: {path}")]
    InvalidPath { path: PathBuf },

    /// Removal was aborted by user in interactive mode
    #[error("removal aborted by user")]
    RemovalAborted,

    /// Host adapter error (management tools or simulated store)
    #[error(transparent)]
    Host(#[from] HostError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
