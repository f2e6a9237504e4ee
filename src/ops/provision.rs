//! Host-side provisioning.
//!
//! Creates the pool, site, TLS binding and application, then starts the
//! site. The firewall opening and trace channel setup that can follow are
//! best-effort: their failures become warnings on the outcome instead of
//! failing a run that has already built a working endpoint.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::{
    POOL_ENABLE_32BIT, POOL_RUNTIME_VERSION, TRACE_CLEAR_CHANNEL, TRACE_PROVIDER,
    TRACE_TUNING_CHANNELS,
};
use crate::endpoint::EndpointSpec;
use crate::error::GantryResult;
use crate::host::{Certificate, FirewallRule, PoolSettings, SiteAction, SiteBinding, WebHost};

/// End state of a provisioning run
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionOutcome {
    pub site: String,
    pub site_id: u32,
    pub pool: String,
    pub identity: String,
    pub port: u16,
    pub tls: bool,
    pub path: PathBuf,
    pub started: bool,
    pub firewall_rule: Option<String>,
    pub tracing_enabled: bool,
    pub warnings: Vec<String>,
}

/// Next free numeric site id: one past the highest id in use.
pub fn next_site_id<H: WebHost + ?Sized>(host: &H) -> GantryResult<u32> {
    Ok(host.sites()?.iter().map(|s| s.id).max().unwrap_or(0) + 1)
}

/// Register the endpoint on the host.
///
/// Callers are expected to have run teardown for the same site name, so
/// pool and site creation start from a clean slate. `certificate` comes
/// from the preflight lookup; `None` provisions plain HTTP.
pub fn provision_site<H: WebHost + ?Sized>(
    host: &H,
    spec: &EndpointSpec,
    path: &Path,
    certificate: Option<&Certificate>,
) -> GantryResult<ProvisionOutcome> {
    let pool = spec.pool_name().to_string();
    let site_id = next_site_id(host)?;

    host.create_pool(&pool)?;
    host.configure_pool(
        &pool,
        &PoolSettings {
            identity_code: spec.identity.host_code(),
            runtime_version: POOL_RUNTIME_VERSION.to_string(),
            enable_32bit: POOL_ENABLE_32BIT,
        },
    )?;

    let binding = match certificate {
        None => SiteBinding::Http { port: spec.port },
        Some(_) => SiteBinding::Https { port: spec.port },
    };
    host.create_site(&spec.site, site_id, path, &pool, &binding)?;

    if let Some(certificate) = certificate {
        host.clear_tls_binding(spec.port)?;
        host.bind_tls(spec.port, &certificate.thumbprint)?;
    }

    if host.application_exists(&spec.site, &spec.app)? {
        host.delete_application(&spec.site, &spec.app)?;
    }
    host.create_application(&spec.site, &spec.app, path, &pool)?;

    host.control_site(&spec.site, SiteAction::Start)?;

    let mut warnings = Vec::new();
    let firewall_rule = if spec.open_firewall {
        open_firewall(host, &spec.site, spec.port, &mut warnings)
    } else {
        None
    };
    let tracing_enabled = spec.enable_tracing && enable_tracing(host, &mut warnings);

    Ok(ProvisionOutcome {
        site: spec.site.clone(),
        site_id,
        pool,
        identity: spec.identity.to_string(),
        port: spec.port,
        tls: certificate.is_some(),
        path: path.to_path_buf(),
        started: true,
        firewall_rule,
        tracing_enabled,
        warnings,
    })
}

/// Allow inbound traffic on the endpoint port. Failures become warnings.
fn open_firewall<H: WebHost + ?Sized>(
    host: &H,
    site: &str,
    port: u16,
    warnings: &mut Vec<String>,
) -> Option<String> {
    if let Err(e) = host.disable_inbound_notifications() {
        warnings.push(format!("could not disable inbound notifications: {e}"));
    }

    let rule = FirewallRule {
        name: format!("{site} (port {port})"),
        port,
    };
    match host.add_firewall_rule(&rule) {
        Ok(()) => Some(rule.name),
        Err(e) => {
            warnings.push(format!("could not open port {port}: {e}"));
            None
        }
    }
}

/// Cycle the tuning channels and clear the operational one. Failures
/// become warnings.
fn enable_tracing<H: WebHost + ?Sized>(host: &H, warnings: &mut Vec<String>) -> bool {
    let mut enabled = true;

    for name in TRACE_TUNING_CHANNELS {
        let channel = format!("{TRACE_PROVIDER}/{name}");
        for state in [false, true] {
            if let Err(e) = host.set_trace_channel(&channel, state) {
                warnings.push(format!("could not configure trace channel {channel}: {e}"));
                enabled = false;
            }
        }
    }

    let operational = format!("{TRACE_PROVIDER}/{TRACE_CLEAR_CHANNEL}");
    if let Err(e) = host.clear_trace_channel(&operational) {
        warnings.push(format!("could not clear trace channel {operational}: {e}"));
        enabled = false;
    }

    enabled
}
