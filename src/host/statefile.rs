//! JSON-backed simulated web host.
//!
//! Selected via `GANTRY_HOST_STATE=<path>`. The file records every object
//! the native adapter would create on a real server, which makes the whole
//! pipeline observable in tests and in rehearsals on non-Windows machines.
//!
//! A missing file reads as a fresh host: web server 10.0, publishing
//! service installed and running, no sites, no pools, no certificates.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{
    Certificate, FirewallRule, HostError, HostResult, PoolSettings, ServerVersion, ServiceState,
    SiteAction, SiteBinding, SiteEntry, SiteState, WebHost,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ServiceRecord {
    name: String,
    installed: bool,
    state: String,
}

impl Default for ServiceRecord {
    fn default() -> Self {
        Self {
            name: "W3SVC".to_string(),
            installed: true,
            state: "running".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CertRecord {
    thumbprint: String,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    added_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PoolRecord {
    name: String,
    identity_code: u32,
    runtime_version: String,
    enable_32bit: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AppRecord {
    name: String,
    path: PathBuf,
    pool: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SiteRecord {
    id: u32,
    name: String,
    path: PathBuf,
    pool: String,
    protocol: String,
    port: u16,
    state: String,
    #[serde(default)]
    applications: Vec<AppRecord>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TlsBindingRecord {
    port: u16,
    thumbprint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FirewallRuleRecord {
    name: String,
    port: u16,
    protocol: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FirewallState {
    inbound_notifications: bool,
    #[serde(default)]
    rules: Vec<FirewallRuleRecord>,
}

impl Default for FirewallState {
    fn default() -> Self {
        Self {
            inbound_notifications: true,
            rules: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct TraceChannelRecord {
    enabled: bool,
    clears: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct HostState {
    version: ServerVersion,
    service: ServiceRecord,
    web_root: Option<PathBuf>,
    certificates: Vec<CertRecord>,
    pools: Vec<PoolRecord>,
    sites: Vec<SiteRecord>,
    tls_bindings: Vec<TlsBindingRecord>,
    firewall: FirewallState,
    trace_channels: BTreeMap<String, TraceChannelRecord>,
}

impl Default for HostState {
    fn default() -> Self {
        Self {
            version: ServerVersion {
                major: 10,
                minor: 0,
            },
            service: ServiceRecord::default(),
            web_root: None,
            certificates: Vec::new(),
            pools: Vec::new(),
            sites: Vec::new(),
            tls_bindings: Vec::new(),
            firewall: FirewallState::default(),
            trace_channels: BTreeMap::new(),
        }
    }
}

/// Web host adapter that records operations in a JSON state file.
pub struct StateFileHost {
    path: PathBuf,
}

impl StateFileHost {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    fn load(&self) -> HostResult<HostState> {
        if !self.path.exists() {
            return Ok(HostState::default());
        }

        let content = fs::read_to_string(&self.path)?;
        serde_json::from_str(&content).map_err(|e| HostError::State {
            message: format!("{}: {e}", self.path.display()),
        })
    }

    fn save(&self, state: &HostState) -> HostResult<()> {
        let parent = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let json = serde_json::to_string_pretty(state).map_err(|e| HostError::State {
            message: e.to_string(),
        })?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(json.as_bytes())?;
        tmp.write_all(b"\n")?;
        tmp.persist(&self.path).map_err(|e| HostError::Io(e.error))?;
        Ok(())
    }

    fn mutate<T>(&self, apply: impl FnOnce(&mut HostState) -> HostResult<T>) -> HostResult<T> {
        let lock_path = self.lock_path();
        if let Some(parent) = lock_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let lock_file = fs::File::create(&lock_path)?;
        lock_file.lock_exclusive()?;

        let result = (|| {
            let mut state = self.load()?;
            let value = apply(&mut state)?;
            self.save(&state)?;
            Ok(value)
        })();

        let _ = FileExt::unlock(&lock_file);
        result
    }

    /// Record a certificate in the simulated machine store.
    ///
    /// The thumbprint is derived from the subject, so seeding is
    /// deterministic across runs.
    pub fn import_certificate(&self, subject: &str) -> HostResult<String> {
        let digest = Sha256::digest(subject.as_bytes());
        let mut thumbprint = String::with_capacity(40);
        for byte in digest.iter().take(20) {
            thumbprint.push_str(&format!("{byte:02X}"));
        }

        let record = CertRecord {
            thumbprint: thumbprint.clone(),
            subject: Some(subject.to_string()),
            added_at: Some(Utc::now()),
        };
        self.mutate(|state| {
            state
                .certificates
                .retain(|c| !c.thumbprint.eq_ignore_ascii_case(&record.thumbprint));
            state.certificates.push(record);
            Ok(())
        })?;
        Ok(thumbprint)
    }

    /// Override the reported web server version.
    pub fn set_server_version(&self, major: u32, minor: u32) -> HostResult<()> {
        self.mutate(|state| {
            state.version = ServerVersion { major, minor };
            Ok(())
        })
    }

    /// Override the publishing service record.
    pub fn set_service(&self, installed: bool, state_word: &str) -> HostResult<()> {
        self.mutate(|state| {
            state.service.installed = installed;
            state.service.state = state_word.to_string();
            Ok(())
        })
    }
}

impl WebHost for StateFileHost {
    fn server_version(&self) -> HostResult<ServerVersion> {
        Ok(self.load()?.version)
    }

    fn publishing_service(&self, name: &str) -> HostResult<Option<ServiceState>> {
        let state = self.load()?;
        if !state.service.installed || !state.service.name.eq_ignore_ascii_case(name) {
            return Ok(None);
        }
        Ok(Some(ServiceState::parse(&state.service.state)))
    }

    fn web_root(&self) -> HostResult<PathBuf> {
        let state = self.load()?;
        if let Some(root) = state.web_root {
            return Ok(root);
        }
        let base = self.path.parent().unwrap_or_else(|| Path::new("."));
        Ok(base.join("wwwroot"))
    }

    fn find_certificate(&self, thumbprint: &str) -> HostResult<Option<Certificate>> {
        let state = self.load()?;
        Ok(state
            .certificates
            .iter()
            .find(|c| c.thumbprint.eq_ignore_ascii_case(thumbprint))
            .map(|c| Certificate {
                thumbprint: c.thumbprint.clone(),
                subject: c.subject.clone(),
            }))
    }

    fn pool_exists(&self, name: &str) -> HostResult<bool> {
        Ok(self.load()?.pools.iter().any(|p| p.name == name))
    }

    fn create_pool(&self, name: &str) -> HostResult<()> {
        self.mutate(|state| {
            if state.pools.iter().any(|p| p.name == name) {
                return Err(HostError::Exists {
                    kind: "application pool",
                    name: name.to_string(),
                });
            }
            state.pools.push(PoolRecord {
                name: name.to_string(),
                identity_code: 3,
                runtime_version: "v4.0".to_string(),
                enable_32bit: false,
                created_at: Utc::now(),
            });
            Ok(())
        })
    }

    fn configure_pool(&self, name: &str, settings: &PoolSettings) -> HostResult<()> {
        self.mutate(|state| {
            let pool = state
                .pools
                .iter_mut()
                .find(|p| p.name == name)
                .ok_or_else(|| HostError::Missing {
                    kind: "application pool",
                    name: name.to_string(),
                })?;
            pool.identity_code = settings.identity_code;
            pool.runtime_version = settings.runtime_version.clone();
            pool.enable_32bit = settings.enable_32bit;
            Ok(())
        })
    }

    fn delete_pool(&self, name: &str) -> HostResult<()> {
        self.mutate(|state| {
            state.pools.retain(|p| p.name != name);
            Ok(())
        })
    }

    fn sites(&self) -> HostResult<Vec<SiteEntry>> {
        Ok(self
            .load()?
            .sites
            .iter()
            .map(|s| SiteEntry {
                id: s.id,
                name: s.name.clone(),
                state: if s.state == "started" {
                    SiteState::Started
                } else {
                    SiteState::Stopped
                },
            })
            .collect())
    }

    fn create_site(
        &self,
        name: &str,
        id: u32,
        path: &Path,
        pool: &str,
        binding: &SiteBinding,
    ) -> HostResult<()> {
        self.mutate(|state| {
            if state.sites.iter().any(|s| s.name == name) {
                return Err(HostError::Exists {
                    kind: "site",
                    name: name.to_string(),
                });
            }
            state.sites.push(SiteRecord {
                id,
                name: name.to_string(),
                path: path.to_path_buf(),
                pool: pool.to_string(),
                protocol: binding.protocol().to_string(),
                port: binding.port(),
                state: "stopped".to_string(),
                applications: Vec::new(),
                created_at: Utc::now(),
            });
            Ok(())
        })
    }

    fn delete_site(&self, name: &str) -> HostResult<()> {
        self.mutate(|state| {
            state.sites.retain(|s| s.name != name);
            Ok(())
        })
    }

    fn control_site(&self, name: &str, action: SiteAction) -> HostResult<()> {
        self.mutate(|state| {
            let site = state
                .sites
                .iter_mut()
                .find(|s| s.name == name)
                .ok_or_else(|| HostError::Missing {
                    kind: "site",
                    name: name.to_string(),
                })?;
            site.state = match action {
                SiteAction::Start => "started".to_string(),
                SiteAction::Stop => "stopped".to_string(),
            };
            Ok(())
        })
    }

    fn application_exists(&self, site: &str, app: &str) -> HostResult<bool> {
        let state = self.load()?;
        Ok(state
            .sites
            .iter()
            .find(|s| s.name == site)
            .map(|s| s.applications.iter().any(|a| a.name == app))
            .unwrap_or(false))
    }

    fn create_application(&self, site: &str, app: &str, path: &Path, pool: &str) -> HostResult<()> {
        self.mutate(|state| {
            let record = state
                .sites
                .iter_mut()
                .find(|s| s.name == site)
                .ok_or_else(|| HostError::Missing {
                    kind: "site",
                    name: site.to_string(),
                })?;
            if record.applications.iter().any(|a| a.name == app) {
                return Err(HostError::Exists {
                    kind: "application",
                    name: app.to_string(),
                });
            }
            record.applications.push(AppRecord {
                name: app.to_string(),
                path: path.to_path_buf(),
                pool: pool.to_string(),
            });
            Ok(())
        })
    }

    fn delete_application(&self, site: &str, app: &str) -> HostResult<()> {
        self.mutate(|state| {
            if let Some(record) = state.sites.iter_mut().find(|s| s.name == site) {
                record.applications.retain(|a| a.name != app);
            }
            Ok(())
        })
    }

    fn clear_tls_binding(&self, port: u16) -> HostResult<()> {
        self.mutate(|state| {
            state.tls_bindings.retain(|b| b.port != port);
            Ok(())
        })
    }

    fn bind_tls(&self, port: u16, thumbprint: &str) -> HostResult<()> {
        self.mutate(|state| {
            if !state
                .certificates
                .iter()
                .any(|c| c.thumbprint.eq_ignore_ascii_case(thumbprint))
            {
                return Err(HostError::Missing {
                    kind: "certificate",
                    name: thumbprint.to_string(),
                });
            }
            if state.tls_bindings.iter().any(|b| b.port == port) {
                return Err(HostError::Exists {
                    kind: "tls binding",
                    name: format!("0.0.0.0:{port}"),
                });
            }
            state.tls_bindings.push(TlsBindingRecord {
                port,
                thumbprint: thumbprint.to_string(),
            });
            Ok(())
        })
    }

    fn disable_inbound_notifications(&self) -> HostResult<()> {
        self.mutate(|state| {
            state.firewall.inbound_notifications = false;
            Ok(())
        })
    }

    fn add_firewall_rule(&self, rule: &FirewallRule) -> HostResult<()> {
        self.mutate(|state| {
            state.firewall.rules.push(FirewallRuleRecord {
                name: rule.name.clone(),
                port: rule.port,
                protocol: "tcp".to_string(),
            });
            Ok(())
        })
    }

    fn set_trace_channel(&self, channel: &str, enabled: bool) -> HostResult<()> {
        self.mutate(|state| {
            state.trace_channels.entry(channel.to_string()).or_default().enabled = enabled;
            Ok(())
        })
    }

    fn clear_trace_channel(&self, channel: &str) -> HostResult<()> {
        self.mutate(|state| {
            state.trace_channels.entry(channel.to_string()).or_default().clears += 1;
            Ok(())
        })
    }
}
