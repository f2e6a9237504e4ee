//! Native web host adapter.
//!
//! Shells out to the host management tools: `appcmd.exe` for pools, sites
//! and applications, `netsh.exe` for TLS bindings and the firewall,
//! `reg.exe` and `sc.exe` for platform facts, `certutil.exe` for the
//! machine store and `wevtutil.exe` for trace channels. Results are parsed
//! from the text the tools print.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use super::{
    Certificate, FirewallRule, HostError, HostResult, PoolSettings, ServerVersion, ServiceState,
    SiteAction, SiteBinding, SiteEntry, SiteState, WebHost,
};

const INETSTP_KEY: &str = r"HKLM\SOFTWARE\Microsoft\InetStp";

/// Application id recorded on TLS port bindings created by this tool.
const TLS_APP_ID: &str = "{d847518a-3b4e-4c0f-9a33-5f2e80217b75}";

/// Web host adapter that drives the local management tools.
pub struct AppCmdHost;

impl AppCmdHost {
    pub fn new() -> Self {
        Self
    }

    fn appcmd(&self, args: &[&str]) -> HostResult<String> {
        run_tool(&appcmd_path(), args)
    }
}

impl Default for AppCmdHost {
    fn default() -> Self {
        Self::new()
    }
}

/// `appcmd.exe` lives under the server install, not on PATH.
fn appcmd_path() -> PathBuf {
    let windir = std::env::var_os("windir")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(r"C:\Windows"));
    windir.join(r"system32\inetsrv\appcmd.exe")
}

fn tool_name(program: &Path) -> String {
    program
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| program.display().to_string())
}

fn spawn(program: &Path, args: &[&str]) -> HostResult<Output> {
    Command::new(program)
        .args(args)
        .output()
        .map_err(|e| HostError::Tool {
            program: tool_name(program),
            message: e.to_string(),
        })
}

fn run_tool(program: &Path, args: &[&str]) -> HostResult<String> {
    let output = spawn(program, args)?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let message = if stderr.trim().is_empty() {
            stdout.trim().to_string()
        } else {
            stderr.trim().to_string()
        };
        return Err(HostError::Tool {
            program: tool_name(program),
            message,
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn query_registry_value(name: &str) -> HostResult<String> {
    run_tool(Path::new("reg"), &["query", INETSTP_KEY, "/v", name])
}

/// Value of a `REG_DWORD` line, `reg` prints them as `0x` hex.
fn parse_reg_dword(output: &str) -> Option<u32> {
    for line in output.lines() {
        if let Some(position) = line.find("REG_DWORD") {
            let raw = line[position + "REG_DWORD".len()..].trim();
            return match raw.strip_prefix("0x") {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => raw.parse().ok(),
            };
        }
    }
    None
}

fn parse_reg_sz(output: &str) -> Option<String> {
    for line in output.lines() {
        for kind in ["REG_EXPAND_SZ", "REG_SZ"] {
            if let Some(position) = line.find(kind) {
                let value = line[position + kind.len()..].trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}

/// State word from an `sc query` block, e.g. `STATE : 4  RUNNING`.
fn parse_service_state(output: &str) -> Option<ServiceState> {
    for line in output.lines() {
        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix("STATE") {
            let word = rest.split_whitespace().last()?;
            return Some(ServiceState::parse(word));
        }
    }
    None
}

/// One site from an `appcmd list sites` line:
/// `SITE "Default Web Site" (id:1,bindings:http/*:80:,state:Started)`
fn parse_site_line(line: &str) -> Option<SiteEntry> {
    let rest = line.strip_prefix("SITE \"")?;
    let (name, meta) = rest.split_once('"')?;
    let id = list_field(meta, "id:")?.parse().ok()?;
    let state = match list_field(meta, "state:") {
        Some(word) if word.eq_ignore_ascii_case("Started") => SiteState::Started,
        _ => SiteState::Stopped,
    };
    Some(SiteEntry {
        id,
        name: name.to_string(),
        state,
    })
}

fn list_field<'a>(meta: &'a str, key: &str) -> Option<&'a str> {
    let start = meta.find(key)? + key.len();
    let rest = &meta[start..];
    let end = rest.find([',', ')']).unwrap_or(rest.len());
    Some(rest[..end].trim())
}

/// Whether an `appcmd list` dump names this exact object.
fn object_listed(listing: &str, kind: &str, name: &str) -> bool {
    let needle = format!("{kind} \"{name}\"");
    listing.lines().any(|line| line.starts_with(&needle))
}

fn parse_cert_subject(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        line.trim()
            .strip_prefix("Subject:")
            .map(|subject| subject.trim().to_string())
    })
}

fn parse_cert_thumbprint(output: &str) -> Option<String> {
    output.lines().find_map(|line| {
        let rest = line.trim().strip_prefix("Cert Hash(sha1):")?;
        let hex: String = rest
            .chars()
            .filter(|c| c.is_ascii_hexdigit())
            .collect::<String>()
            .to_uppercase();
        if hex.is_empty() {
            None
        } else {
            Some(hex)
        }
    })
}

fn identity_name(code: u32) -> &'static str {
    match code {
        0 => "LocalSystem",
        1 => "LocalService",
        2 => "NetworkService",
        _ => "ApplicationPoolIdentity",
    }
}

impl WebHost for AppCmdHost {
    fn server_version(&self) -> HostResult<ServerVersion> {
        let major = parse_reg_dword(&query_registry_value("MajorVersion")?).ok_or_else(|| {
            HostError::Tool {
                program: "reg".to_string(),
                message: "no MajorVersion value under InetStp".to_string(),
            }
        })?;
        let minor = parse_reg_dword(&query_registry_value("MinorVersion")?).ok_or_else(|| {
            HostError::Tool {
                program: "reg".to_string(),
                message: "no MinorVersion value under InetStp".to_string(),
            }
        })?;
        Ok(ServerVersion { major, minor })
    }

    fn publishing_service(&self, name: &str) -> HostResult<Option<ServiceState>> {
        let output = spawn(Path::new("sc"), &["query", name])?;
        let stdout = String::from_utf8_lossy(&output.stdout);

        if !output.status.success() {
            // 1060: the specified service does not exist
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stdout.contains("1060") || stderr.contains("1060") {
                return Ok(None);
            }
            return Err(HostError::Tool {
                program: "sc".to_string(),
                message: stdout.trim().to_string(),
            });
        }

        match parse_service_state(&stdout) {
            Some(state) => Ok(Some(state)),
            None => Err(HostError::Tool {
                program: "sc".to_string(),
                message: "no STATE line in query output".to_string(),
            }),
        }
    }

    fn web_root(&self) -> HostResult<PathBuf> {
        parse_reg_sz(&query_registry_value("PathWWWRoot")?)
            .map(PathBuf::from)
            .ok_or_else(|| HostError::Tool {
                program: "reg".to_string(),
                message: "no PathWWWRoot value under InetStp".to_string(),
            })
    }

    fn find_certificate(&self, thumbprint: &str) -> HostResult<Option<Certificate>> {
        // certutil exits nonzero when the store has no match
        let output = spawn(Path::new("certutil"), &["-store", "My", thumbprint])?;
        if !output.status.success() {
            return Ok(None);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(Some(Certificate {
            thumbprint: parse_cert_thumbprint(&stdout)
                .unwrap_or_else(|| thumbprint.to_uppercase()),
            subject: parse_cert_subject(&stdout),
        }))
    }

    fn pool_exists(&self, name: &str) -> HostResult<bool> {
        let listing = self.appcmd(&["list", "apppools"])?;
        Ok(object_listed(&listing, "APPPOOL", name))
    }

    fn create_pool(&self, name: &str) -> HostResult<()> {
        self.appcmd(&["add", "apppool", &format!("/name:{name}")])?;
        Ok(())
    }

    fn configure_pool(&self, name: &str, settings: &PoolSettings) -> HostResult<()> {
        self.appcmd(&[
            "set",
            "apppool",
            name,
            &format!(
                "/processModel.identityType:{}",
                identity_name(settings.identity_code)
            ),
            &format!("/managedRuntimeVersion:{}", settings.runtime_version),
            &format!("/enable32BitAppOnWin64:{}", settings.enable_32bit),
        ])?;
        Ok(())
    }

    fn delete_pool(&self, name: &str) -> HostResult<()> {
        if !self.pool_exists(name)? {
            return Ok(());
        }
        self.appcmd(&["delete", "apppool", name])?;
        Ok(())
    }

    fn sites(&self) -> HostResult<Vec<SiteEntry>> {
        let listing = self.appcmd(&["list", "sites"])?;
        Ok(listing.lines().filter_map(parse_site_line).collect())
    }

    fn create_site(
        &self,
        name: &str,
        id: u32,
        path: &Path,
        pool: &str,
        binding: &SiteBinding,
    ) -> HostResult<()> {
        self.appcmd(&[
            "add",
            "site",
            &format!("/name:{name}"),
            &format!("/id:{id}"),
            &format!("/physicalPath:{}", path.display()),
            &format!("/bindings:{}/*:{}:", binding.protocol(), binding.port()),
        ])?;
        // The root application inherits the endpoint pool.
        self.appcmd(&[
            "set",
            "app",
            &format!("{name}/"),
            &format!("/applicationPool:{pool}"),
        ])?;
        Ok(())
    }

    fn delete_site(&self, name: &str) -> HostResult<()> {
        if !self.site_exists(name)? {
            return Ok(());
        }
        self.appcmd(&["delete", "site", name])?;
        Ok(())
    }

    fn control_site(&self, name: &str, action: SiteAction) -> HostResult<()> {
        let verb = match action {
            SiteAction::Start => "start",
            SiteAction::Stop => "stop",
        };
        self.appcmd(&[verb, "site", name])?;
        Ok(())
    }

    fn application_exists(&self, site: &str, app: &str) -> HostResult<bool> {
        let listing = self.appcmd(&["list", "apps"])?;
        Ok(object_listed(&listing, "APP", &format!("{site}/{app}")))
    }

    fn create_application(&self, site: &str, app: &str, path: &Path, pool: &str) -> HostResult<()> {
        self.appcmd(&[
            "add",
            "app",
            &format!("/site.name:{site}"),
            &format!("/path:/{app}"),
            &format!("/physicalPath:{}", path.display()),
        ])?;
        self.appcmd(&[
            "set",
            "app",
            &format!("{site}/{app}"),
            &format!("/applicationPool:{pool}"),
        ])?;
        Ok(())
    }

    fn delete_application(&self, site: &str, app: &str) -> HostResult<()> {
        if !self.application_exists(site, app)? {
            return Ok(());
        }
        self.appcmd(&["delete", "app", &format!("{site}/{app}")])?;
        Ok(())
    }

    fn clear_tls_binding(&self, port: u16) -> HostResult<()> {
        // Nonzero exit just means no binding was present on the port.
        let _ = spawn(
            Path::new("netsh"),
            &["http", "delete", "sslcert", &format!("ipport=0.0.0.0:{port}")],
        )?;
        Ok(())
    }

    fn bind_tls(&self, port: u16, thumbprint: &str) -> HostResult<()> {
        run_tool(
            Path::new("netsh"),
            &[
                "http",
                "add",
                "sslcert",
                &format!("ipport=0.0.0.0:{port}"),
                &format!("certhash={thumbprint}"),
                &format!("appid={TLS_APP_ID}"),
                "certstorename=MY",
            ],
        )?;
        Ok(())
    }

    fn disable_inbound_notifications(&self) -> HostResult<()> {
        run_tool(
            Path::new("netsh"),
            &[
                "advfirewall",
                "set",
                "allprofiles",
                "settings",
                "inboundusernotification",
                "disable",
            ],
        )?;
        Ok(())
    }

    fn add_firewall_rule(&self, rule: &FirewallRule) -> HostResult<()> {
        run_tool(
            Path::new("netsh"),
            &[
                "advfirewall",
                "firewall",
                "add",
                "rule",
                &format!("name={}", rule.name),
                "dir=in",
                "action=allow",
                "protocol=TCP",
                &format!("localport={}", rule.port),
            ],
        )?;
        Ok(())
    }

    fn set_trace_channel(&self, channel: &str, enabled: bool) -> HostResult<()> {
        run_tool(
            Path::new("wevtutil"),
            &["sl", channel, &format!("/e:{enabled}"), "/q:true"],
        )?;
        Ok(())
    }

    fn clear_trace_channel(&self, channel: &str) -> HostResult<()> {
        run_tool(Path::new("wevtutil"), &["cl", channel])?;
        Ok(())
    }
}
