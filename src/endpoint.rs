//! Endpoint request vocabulary.
//!
//! An [`EndpointSpec`] captures everything one `provision` run needs: names,
//! port, source files and the certificate selection. It is built from the
//! command line, with tool configuration filling the gaps.

use std::path::{Path, PathBuf};

use clap::ValueEnum;

/// Certificate argument value that asks for a plain HTTP endpoint.
///
/// Matched case-insensitively, so `allowunencryptedtraffic` works too.
pub const UNENCRYPTED_SENTINEL: &str = "AllowUnencryptedTraffic";

/// Identity an application pool runs under.
///
/// `host_code` follows the host numbering for pool process models, and
/// `ApplicationPool` (the per-pool identity) is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PoolIdentity {
    LocalSystem,
    LocalService,
    NetworkService,
    #[default]
    ApplicationPool,
}

impl PoolIdentity {
    /// Numeric process model code used by the management tools.
    pub fn host_code(self) -> u32 {
        match self {
            PoolIdentity::LocalSystem => 0,
            PoolIdentity::LocalService => 1,
            PoolIdentity::NetworkService => 2,
            PoolIdentity::ApplicationPool => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PoolIdentity::LocalSystem => "local-system",
            PoolIdentity::LocalService => "local-service",
            PoolIdentity::NetworkService => "network-service",
            PoolIdentity::ApplicationPool => "application-pool",
        }
    }
}

impl std::fmt::Display for PoolIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the endpoint should be secured
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertSelector {
    /// Plain HTTP, requested with the sentinel thumbprint value
    Unencrypted,
    /// TLS with the machine store certificate matching this thumbprint
    Thumbprint(String),
}

impl CertSelector {
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case(UNENCRYPTED_SENTINEL) {
            CertSelector::Unencrypted
        } else {
            CertSelector::Thumbprint(raw.to_string())
        }
    }

    pub fn wants_tls(&self) -> bool {
        matches!(self, CertSelector::Thumbprint(_))
    }

    pub fn thumbprint(&self) -> Option<&str> {
        match self {
            CertSelector::Unencrypted => None,
            CertSelector::Thumbprint(value) => Some(value),
        }
    }
}

/// One endpoint provisioning request
#[derive(Debug, Clone)]
pub struct EndpointSpec {
    /// Site name, also used as the application pool name
    pub site: String,
    /// Application name under the site
    pub app: String,
    /// Listen port for the site binding
    pub port: u16,
    /// Site content directory, `None` for `<web root>/<site>`
    pub path: Option<PathBuf>,
    /// Source settings document, deployed as `web.config`
    pub config_file: PathBuf,
    /// Service descriptor file
    pub service_file: PathBuf,
    /// Schema file describing the endpoint
    pub schema_file: PathBuf,
    /// Optional request dispatch descriptor
    pub dispatch_file: Option<PathBuf>,
    /// Optional application bootstrap file
    pub bootstrap_file: Option<PathBuf>,
    /// Dependent binaries, deployed under `bin/`
    pub binaries: Vec<PathBuf>,
    /// Locale folder name for localized binaries
    pub locale: Option<String>,
    /// Localized binaries, deployed under `bin/<locale>/`
    pub localized_files: Vec<PathBuf>,
    /// Auxiliary scripts, deployed next to the descriptors
    pub scripts: Vec<PathBuf>,
    /// Pool process identity
    pub identity: PoolIdentity,
    /// HTTP or TLS selection
    pub cert: CertSelector,
    /// Delete existing site directory contents before staging
    pub wipe_site_dir: bool,
    /// Add an inbound firewall allow rule for the port
    pub open_firewall: bool,
    /// Enable the management service trace channels
    pub enable_tracing: bool,
}

impl EndpointSpec {
    /// The application pool backing this endpoint, named after the site.
    pub fn pool_name(&self) -> &str {
        &self.site
    }

    /// Content directory, defaulting to a folder named after the site
    /// under the host web root.
    pub fn resolve_path(&self, web_root: &Path) -> PathBuf {
        match &self.path {
            Some(path) => path.clone(),
            None => web_root.join(&self.site),
        }
    }

    /// Files that must exist before anything on the host is touched,
    /// in the order they are checked and reported.
    pub fn required_files(&self) -> Vec<&Path> {
        let mut files: Vec<&Path> = vec![
            self.config_file.as_path(),
            self.service_file.as_path(),
            self.schema_file.as_path(),
        ];
        if let Some(bootstrap) = &self.bootstrap_file {
            files.push(bootstrap.as_path());
        }
        files.extend(self.binaries.iter().map(PathBuf::as_path));
        files.extend(self.localized_files.iter().map(PathBuf::as_path));
        files.extend(self.scripts.iter().map(PathBuf::as_path));
        files
    }
}
