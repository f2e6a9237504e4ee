//! Tool configuration and endpoint defaults.
//!
//! Settings load from `gantry.toml` in the working directory, then from the
//! user config directory, then fall back to built-in defaults. Environment
//! variables with the `GANTRY_` prefix override any file value.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GantryError, GantryResult};

/// Default site name, shared with the application pool
pub const DEFAULT_SITE: &str = "PSWS";
/// Default application name under the site
pub const DEFAULT_APP: &str = "PSWS";
/// Default listen port
pub const DEFAULT_PORT: u16 = 8080;
/// Default source settings document
pub const DEFAULT_CONFIG_FILE: &str = "web.config";
/// Default service descriptor
pub const DEFAULT_SERVICE_FILE: &str = "PSWS.svc";
/// Name the settings document is deployed under
pub const DEPLOYED_CONFIG_NAME: &str = "web.config";
/// Publishing service the endpoint depends on
pub const PUBLISHING_SERVICE: &str = "W3SVC";
/// Oldest web server version provisioning supports
pub const MIN_SERVER_VERSION: (u32, u32) = (7, 0);
/// Runtime version applied to new application pools
pub const POOL_RUNTIME_VERSION: &str = "v4.0";
/// 32-bit emulation setting applied to new application pools
pub const POOL_ENABLE_32BIT: bool = false;
/// Event provider whose channels carry endpoint traces
pub const TRACE_PROVIDER: &str = "Microsoft-Windows-ManagementOdataService";
/// Channels cycled off and back on when tracing is enabled
pub const TRACE_TUNING_CHANNELS: [&str; 2] = ["Analytic", "Debug"];
/// Channel cleared when tracing is enabled
pub const TRACE_CLEAR_CHANNEL: &str = "Operational";

/// Non-fatal configuration warning surfaced to CLI users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub key: String,
    pub file: PathBuf,
}

/// Defaults applied when the matching flags are omitted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointDefaults {
    #[serde(default = "default_site")]
    pub site: String,

    #[serde(default = "default_app")]
    pub app: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for EndpointDefaults {
    fn default() -> Self {
        Self {
            site: default_site(),
            app: default_app(),
            port: default_port(),
        }
    }
}

fn default_site() -> String {
    DEFAULT_SITE.to_string()
}

fn default_app() -> String {
    DEFAULT_APP.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Host-related overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostConfig {
    /// Content root used instead of the one the host reports
    #[serde(default)]
    pub web_root: Option<PathBuf>,
}

/// Tool configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub endpoint: EndpointDefaults,

    #[serde(default)]
    pub host: HostConfig,
}

impl Config {
    pub fn load(path: &Path) -> GantryResult<Config> {
        let (config, _) = load_with_warnings(path)?;
        Ok(config)
    }
}

/// Load configuration and collect non-fatal warnings (e.g. unknown keys).
pub fn load_with_warnings(path: &Path) -> GantryResult<(Config, Vec<ConfigWarning>)> {
    let content = fs::read_to_string(path)?;

    let mut unknown_paths: Vec<String> = Vec::new();
    let deserializer = toml::de::Deserializer::new(&content);

    let config: Config = serde_ignored::deserialize(deserializer, |p| {
        unknown_paths.push(p.to_string());
    })
    .map_err(|e| GantryError::InvalidConfig {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let warnings = unknown_paths
        .into_iter()
        .map(|path_str| {
            let key = path_str
                .split('.')
                .next_back()
                .unwrap_or(path_str.as_str())
                .to_string();
            ConfigWarning {
                key,
                file: path.to_path_buf(),
            }
        })
        .collect();

    Ok((config, warnings))
}

/// Load from the working directory, the user config dir, or defaults
pub fn load_or_default(cwd: Option<&Path>) -> Config {
    if let Some(root) = cwd {
        let local = root.join("gantry.toml");
        if local.exists() {
            if let Ok(config) = Config::load(&local) {
                return with_env_overrides(config);
            }
        }
    }

    if let Some(user_config_dir) = dirs::config_dir() {
        let user_config = user_config_dir.join("gantry/config.toml");
        if user_config.exists() {
            if let Ok(config) = Config::load(&user_config) {
                return with_env_overrides(config);
            }
        }
    }

    with_env_overrides(Config::default())
}

/// Apply environment variable overrides (GANTRY_* prefix)
pub fn with_env_overrides(mut config: Config) -> Config {
    if let Ok(site) = std::env::var("GANTRY_SITE") {
        if !site.is_empty() {
            config.endpoint.site = site;
        }
    }

    if let Ok(app) = std::env::var("GANTRY_APP") {
        if !app.is_empty() {
            config.endpoint.app = app;
        }
    }

    if let Ok(port) = std::env::var("GANTRY_PORT") {
        if let Ok(parsed) = port.parse::<u16>() {
            config.endpoint.port = parsed;
        }
    }

    if let Ok(root) = std::env::var("GANTRY_WEB_ROOT") {
        if !root.is_empty() {
            config.host.web_root = Some(PathBuf::from(root));
        }
    }

    config
}
