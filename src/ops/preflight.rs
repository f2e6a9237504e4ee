//! Pre-mutation checks.
//!
//! Everything here runs before the host is touched: source files, the
//! certificate selection, then platform support. The first failure is
//! reported and nothing on the host changes.

use serde::Serialize;

use crate::config::{MIN_SERVER_VERSION, PUBLISHING_SERVICE};
use crate::endpoint::{CertSelector, EndpointSpec};
use crate::error::{GantryError, GantryResult};
use crate::host::{Certificate, ServerVersion, ServiceState, WebHost};

/// Readiness summary for the `check` command
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub files_checked: usize,
    pub server_version: ServerVersion,
    pub service_state: String,
    pub tls: bool,
    pub certificate: Option<String>,
}

/// Fail on the first named file that does not exist, in argument order.
pub fn validate_files(spec: &EndpointSpec) -> GantryResult<()> {
    for path in spec.required_files() {
        if !path.exists() {
            return Err(GantryError::MissingFile {
                path: path.to_path_buf(),
            });
        }
    }
    Ok(())
}

/// Resolve the certificate selection against the machine store.
///
/// The unencrypted sentinel skips the store entirely and yields `None`.
pub fn validate_certificate<H: WebHost + ?Sized>(
    host: &H,
    cert: &CertSelector,
) -> GantryResult<Option<Certificate>> {
    match cert.thumbprint() {
        None => Ok(None),
        Some(thumbprint) => match host.find_certificate(thumbprint)? {
            Some(found) => Ok(Some(found)),
            None => Err(GantryError::MissingCertificate {
                thumbprint: thumbprint.to_string(),
            }),
        },
    }
}

/// Require a web server new enough for endpoint provisioning.
pub fn check_platform<H: WebHost + ?Sized>(host: &H) -> GantryResult<ServerVersion> {
    let version = host.server_version()?;
    if (version.major, version.minor) < MIN_SERVER_VERSION {
        return Err(GantryError::UnsupportedPlatform {
            major: version.major,
            minor: version.minor,
        });
    }
    Ok(version)
}

/// Require the publishing service to be installed and running.
pub fn check_service<H: WebHost + ?Sized>(host: &H) -> GantryResult<ServiceState> {
    match host.publishing_service(PUBLISHING_SERVICE)? {
        None => Err(GantryError::ServiceMissing {
            service: PUBLISHING_SERVICE.to_string(),
        }),
        Some(ServiceState::Running) => Ok(ServiceState::Running),
        Some(state) => Err(GantryError::ServiceNotRunning {
            service: PUBLISHING_SERVICE.to_string(),
            state,
        }),
    }
}

/// Run every preflight check in order and summarize the result.
pub fn run<H: WebHost + ?Sized>(host: &H, spec: &EndpointSpec) -> GantryResult<CheckReport> {
    validate_files(spec)?;
    let certificate = validate_certificate(host, &spec.cert)?;
    let server_version = check_platform(host)?;
    let service_state = check_service(host)?;

    Ok(CheckReport {
        files_checked: spec.required_files().len(),
        server_version,
        service_state: service_state.to_string(),
        tls: spec.cert.wants_tls(),
        certificate: certificate.map(|c| c.thumbprint),
    })
}
