//! Web host abstraction for testability.
//!
//! Provisioning talks to the host exclusively through the [`WebHost`] port.
//! Two adapters implement it: [`AppCmdHost`] drives the real management
//! tools (`appcmd.exe`, `netsh.exe`, `sc.exe`, ...) and [`StateFileHost`]
//! records the same operations in a JSON file so the full pipeline can run
//! on any platform.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod appcmd;
pub mod statefile;

pub use appcmd::AppCmdHost;
pub use statefile::StateFileHost;

/// Result type for host adapter operations
pub type HostResult<T> = Result<T, HostError>;

/// Errors surfaced by host adapters
#[derive(Error, Debug)]
pub enum HostError {
    /// A management tool exited with a failure status
    #[error("{program} failed: {message}")]
    Tool { program: String, message: String },

    /// The recorded host state could not be read or written
    #[error("host state error: {message}")]
    State { message: String },

    /// Creating an object that is already present
    #[error("{kind} '{name}' already exists")]
    Exists { kind: &'static str, name: String },

    /// Operating on an object that is not present
    #[error("no {kind} named '{name}'")]
    Missing { kind: &'static str, name: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Web server version as reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerVersion {
    pub major: u32,
    pub minor: u32,
}

impl std::fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Lifecycle state of a host service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceState {
    Running,
    Stopped,
    StartPending,
    StopPending,
    Paused,
    Other(String),
}

impl ServiceState {
    /// Parse the state word used by the service control tool.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "RUNNING" => ServiceState::Running,
            "STOPPED" => ServiceState::Stopped,
            "START_PENDING" => ServiceState::StartPending,
            "STOP_PENDING" => ServiceState::StopPending,
            "PAUSED" => ServiceState::Paused,
            _ => ServiceState::Other(raw.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ServiceState::Running => "running",
            ServiceState::Stopped => "stopped",
            ServiceState::StartPending => "start pending",
            ServiceState::StopPending => "stop pending",
            ServiceState::Paused => "paused",
            ServiceState::Other(raw) => raw,
        }
    }
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pool settings applied right after pool creation.
///
/// `identity_code` uses the host numbering: 0 = LocalSystem,
/// 1 = LocalService, 2 = NetworkService, 3 = per-pool identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSettings {
    pub identity_code: u32,
    pub runtime_version: String,
    pub enable_32bit: bool,
}

/// Protocol binding requested for a new site
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteBinding {
    Http { port: u16 },
    Https { port: u16 },
}

impl SiteBinding {
    pub fn port(&self) -> u16 {
        match self {
            SiteBinding::Http { port } | SiteBinding::Https { port } => *port,
        }
    }

    pub fn protocol(&self) -> &'static str {
        match self {
            SiteBinding::Http { .. } => "http",
            SiteBinding::Https { .. } => "https",
        }
    }
}

/// Start/stop request for an existing site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteAction {
    Start,
    Stop,
}

/// Run state of a site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteState {
    Started,
    Stopped,
}

/// One site as listed by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteEntry {
    pub id: u32,
    pub name: String,
    pub state: SiteState,
}

/// A certificate found in the machine store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    pub thumbprint: String,
    pub subject: Option<String>,
}

/// Inbound allow rule for the host firewall
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirewallRule {
    pub name: String,
    pub port: u16,
}

/// Management operations against a web host.
///
/// Deletion methods succeed when the object is already absent, so callers
/// can tear down unconditionally. Creation methods fail with
/// [`HostError::Exists`] when the name is taken.
pub trait WebHost {
    /// Version of the installed web server
    fn server_version(&self) -> HostResult<ServerVersion>;

    /// State of the named publishing service, `None` when not installed
    fn publishing_service(&self, name: &str) -> HostResult<Option<ServiceState>>;

    /// Root directory the host serves site content from
    fn web_root(&self) -> HostResult<PathBuf>;

    /// Look up a certificate by thumbprint in the machine store
    fn find_certificate(&self, thumbprint: &str) -> HostResult<Option<Certificate>>;

    /// Whether an application pool with this name exists
    fn pool_exists(&self, name: &str) -> HostResult<bool>;

    /// Create an application pool
    fn create_pool(&self, name: &str) -> HostResult<()>;

    /// Apply identity and runtime settings to an existing pool
    fn configure_pool(&self, name: &str, settings: &PoolSettings) -> HostResult<()>;

    /// Delete an application pool if present
    fn delete_pool(&self, name: &str) -> HostResult<()>;

    /// All sites currently registered on the host
    fn sites(&self) -> HostResult<Vec<SiteEntry>>;

    /// Whether a site with this name exists
    fn site_exists(&self, name: &str) -> HostResult<bool> {
        Ok(self.sites()?.iter().any(|site| site.name == name))
    }

    /// Create a site with the given numeric id, content path and binding
    fn create_site(
        &self,
        name: &str,
        id: u32,
        path: &Path,
        pool: &str,
        binding: &SiteBinding,
    ) -> HostResult<()>;

    /// Delete a site if present
    fn delete_site(&self, name: &str) -> HostResult<()>;

    /// Start or stop an existing site
    fn control_site(&self, name: &str, action: SiteAction) -> HostResult<()>;

    /// Whether the named application exists under a site
    fn application_exists(&self, site: &str, app: &str) -> HostResult<bool>;

    /// Create an application under a site
    fn create_application(&self, site: &str, app: &str, path: &Path, pool: &str) -> HostResult<()>;

    /// Delete an application under a site if present
    fn delete_application(&self, site: &str, app: &str) -> HostResult<()>;

    /// Remove any certificate bound to 0.0.0.0 on this port
    fn clear_tls_binding(&self, port: u16) -> HostResult<()>;

    /// Bind a store certificate to 0.0.0.0 on this port
    fn bind_tls(&self, port: u16, thumbprint: &str) -> HostResult<()>;

    /// Turn off firewall prompts for newly allowed programs
    fn disable_inbound_notifications(&self) -> HostResult<()>;

    /// Add an inbound TCP allow rule. Duplicate rules are permitted.
    fn add_firewall_rule(&self, rule: &FirewallRule) -> HostResult<()>;

    /// Enable or disable an event trace channel
    fn set_trace_channel(&self, channel: &str, enabled: bool) -> HostResult<()>;

    /// Clear all events from a trace channel
    fn clear_trace_channel(&self, channel: &str) -> HostResult<()>;
}
