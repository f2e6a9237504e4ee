//! Gantry CLI - web endpoint provisioning tool
//!
//! Usage: gantry <COMMAND>
//!
//! Commands:
//!   provision   Validate the host, stage endpoint files, register the endpoint
//!   check       Run the preflight checks without touching the host
//!   remove      Remove the endpoint's pool, site, and optionally its files
//!   set-config  Set one appSettings entry in a deployed settings document

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use gantry::config::{self, Config, DEFAULT_CONFIG_FILE, DEFAULT_SERVICE_FILE};
use gantry::endpoint::{CertSelector, EndpointSpec, PoolIdentity, UNENCRYPTED_SENTINEL};
use gantry::host::{AppCmdHost, StateFileHost, WebHost};
use gantry::report::Style;

/// Gantry - web endpoint provisioning tool
#[derive(Parser, Debug)]
#[command(name = "gantry")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Output format for CI
    #[arg(long, default_value = "false")]
    json: bool,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Endpoint flags shared by `provision` and `check`
#[derive(Args, Debug)]
struct EndpointArgs {
    /// Site name, also used as the application pool name
    #[arg(long)]
    site: Option<String>,

    /// Application name under the site
    #[arg(long)]
    app: Option<String>,

    /// Listen port for the endpoint binding
    #[arg(long)]
    port: Option<u16>,

    /// Site directory (defaults to a site-named folder under the web root)
    #[arg(long)]
    path: Option<PathBuf>,

    /// Settings document, deployed as web.config
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config_file: PathBuf,

    /// Service descriptor file
    #[arg(long, default_value = DEFAULT_SERVICE_FILE)]
    service_file: PathBuf,

    /// Schema file describing the endpoint
    #[arg(long)]
    schema_file: PathBuf,

    /// Request dispatch descriptor
    #[arg(long)]
    dispatch_file: Option<PathBuf>,

    /// Application bootstrap file
    #[arg(long)]
    bootstrap_file: Option<PathBuf>,

    /// Dependent binary, staged under bin (repeatable)
    #[arg(long = "binary")]
    binaries: Vec<PathBuf>,

    /// Locale folder name for localized binaries
    #[arg(long)]
    locale: Option<String>,

    /// Localized binary, staged under the locale folder (repeatable)
    #[arg(long = "localized-file", requires = "locale")]
    localized_files: Vec<PathBuf>,

    /// Auxiliary script, staged next to the descriptors (repeatable)
    #[arg(long = "script")]
    scripts: Vec<PathBuf>,

    /// Identity the application pool runs under
    #[arg(long, value_enum, default_value_t = PoolIdentity::ApplicationPool)]
    pool_identity: PoolIdentity,

    /// Certificate thumbprint, or AllowUnencryptedTraffic for plain HTTP
    #[arg(long, default_value = UNENCRYPTED_SENTINEL)]
    thumbprint: String,
}

impl EndpointArgs {
    fn into_spec(
        self,
        config: &Config,
        wipe_site_dir: bool,
        open_firewall: bool,
        enable_tracing: bool,
    ) -> EndpointSpec {
        EndpointSpec {
            site: self.site.unwrap_or_else(|| config.endpoint.site.clone()),
            app: self.app.unwrap_or_else(|| config.endpoint.app.clone()),
            port: self.port.unwrap_or(config.endpoint.port),
            path: self.path,
            config_file: self.config_file,
            service_file: self.service_file,
            schema_file: self.schema_file,
            dispatch_file: self.dispatch_file,
            bootstrap_file: self.bootstrap_file,
            binaries: self.binaries,
            locale: self.locale,
            localized_files: self.localized_files,
            scripts: self.scripts,
            identity: self.pool_identity,
            cert: CertSelector::parse(&self.thumbprint),
            wipe_site_dir,
            open_firewall,
            enable_tracing,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Provision the endpoint: check, clean up, stage files, register
    Provision {
        #[command(flatten)]
        endpoint: EndpointArgs,

        /// Delete the existing site directory before staging
        #[arg(long)]
        wipe_site_dir: bool,

        /// Add an inbound firewall allow rule for the port
        #[arg(long)]
        open_firewall: bool,

        /// Enable the management service trace channels
        #[arg(long)]
        enable_tracing: bool,
    },

    /// Run the preflight checks without touching the host
    Check {
        #[command(flatten)]
        endpoint: EndpointArgs,
    },

    /// Remove the endpoint's pool, site, and optionally its files
    Remove {
        /// Site name to remove
        #[arg(long)]
        site: Option<String>,

        /// Site directory (defaults to a site-named folder under the web root)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Also delete the site directory and its contents
        #[arg(long)]
        delete_files: bool,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Set one appSettings entry in a deployed settings document
    SetConfig {
        /// Site directory holding the deployed web.config
        #[arg(long)]
        path: PathBuf,

        /// Setting key to add or update
        #[arg(long)]
        key: String,

        /// Value to store under the key
        #[arg(long)]
        value: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Provision { endpoint, wipe_site_dir, open_firewall, enable_tracing } => {
            cmd_provision(endpoint, wipe_site_dir, open_firewall, enable_tracing, cli.json, cli.verbose)
        }
        Commands::Check { endpoint } => {
            cmd_check(endpoint, cli.json)
        }
        Commands::Remove { site, path, delete_files, yes } => {
            cmd_remove(site, path, delete_files, yes, cli.json)
        }
        Commands::SetConfig { path, key, value } => {
            cmd_set_config(&path, &key, &value, cli.json)
        }
    }
}

/// The web host every command talks to. `GANTRY_HOST_STATE` selects the
/// state-file host, the local management tools are used otherwise.
fn connect_host() -> Box<dyn WebHost> {
    match std::env::var_os("GANTRY_HOST_STATE") {
        Some(path) => Box::new(StateFileHost::new(PathBuf::from(path))),
        None => Box::new(AppCmdHost::new()),
    }
}

/// A `gantry.toml` in the working directory wins and is parsed strictly,
/// otherwise the user configuration applies.
fn load_config(style: &Style) -> Result<Config> {
    let cwd = std::env::current_dir()?;
    let local = cwd.join("gantry.toml");
    if local.exists() {
        let (loaded, warnings) = config::load_with_warnings(&local)?;
        for warning in &warnings {
            eprintln!(
                "{} unknown configuration key '{}' in {}",
                style.warn(),
                warning.key,
                warning.file.display()
            );
        }
        return Ok(config::with_env_overrides(loaded));
    }
    Ok(config::load_or_default(None))
}

/// Site directory override passed to teardown and staging. `None` lets
/// the pipeline resolve a site-named folder under the host web root.
fn site_path_override(spec: &EndpointSpec, config: &Config) -> Option<PathBuf> {
    spec.path
        .clone()
        .or_else(|| config.host.web_root.as_ref().map(|root| root.join(&spec.site)))
}

fn cmd_provision(
    endpoint: EndpointArgs,
    wipe_site_dir: bool,
    open_firewall: bool,
    enable_tracing: bool,
    json: bool,
    verbose: u8,
) -> Result<()> {
    use gantry::ops::{preflight, provision, stage, teardown};

    let style = Style::detect();
    let config = load_config(&style)?;
    let spec = endpoint.into_spec(&config, wipe_site_dir, open_firewall, enable_tracing);
    let host = connect_host();

    if !json {
        println!("{}", style.header("📦", &format!("Gantry Provision: {}", spec.site)));
        println!(
            "Binding: {}://*:{}",
            if spec.cert.wants_tls() { "https" } else { "http" },
            spec.port
        );
        println!("Identity: {}", spec.identity);
        if spec.wipe_site_dir {
            println!("Option: Wipe site directory");
        }
        if spec.open_firewall {
            println!("Option: Open firewall");
        }
        if spec.enable_tracing {
            println!("Option: Enable tracing");
        }
    }

    preflight::validate_files(&spec)?;
    let certificate = preflight::validate_certificate(host.as_ref(), &spec.cert)?;
    let version = preflight::check_platform(host.as_ref())?;
    preflight::check_service(host.as_ref())?;

    if !json {
        println!(
            "\n{} Preflight passed (server {}, {} files)",
            style.ok(),
            version,
            spec.required_files().len()
        );
    }

    let removal = teardown::remove_endpoint(
        host.as_ref(),
        &teardown::TeardownRequest {
            site: spec.site.clone(),
            path: site_path_override(&spec, &config),
            delete_files: spec.wipe_site_dir,
        },
    )?;
    if !json && (removal.pool_removed || removal.site_removed || removal.files_removed) {
        println!("{} Cleaned up existing endpoint '{}'", style.ok(), removal.site);
    }

    let staged = stage::stage_files(&spec, &removal.path)?;
    if !json {
        println!(
            "{} Staged {} files to {}",
            style.ok(),
            staged.files.len(),
            staged.target.display()
        );
        if verbose > 0 {
            for file in &staged.files {
                println!("    - {} ({})", file.name, file.digest);
            }
        }
    }

    let outcome = provision::provision_site(host.as_ref(), &spec, &removal.path, certificate.as_ref())?;
    for warning in &outcome.warnings {
        eprintln!("{} {}", style.warn(), warning);
    }

    if json {
        let output = serde_json::json!({
            "event": "provision",
            "site": outcome.site,
            "site_id": outcome.site_id,
            "pool": outcome.pool,
            "identity": outcome.identity,
            "port": outcome.port,
            "tls": outcome.tls,
            "path": outcome.path.display().to_string(),
            "staged": staged.files.len(),
            "started": outcome.started,
            "firewall_rule": outcome.firewall_rule,
            "tracing": outcome.tracing_enabled,
            "warnings": outcome.warnings,
        });
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!();
        println!("{}", style.header("📊", "Endpoint:"));
        println!("  Site: {} (id {})", outcome.site, outcome.site_id);
        println!(
            "  Binding: {}://*:{}",
            if outcome.tls { "https" } else { "http" },
            outcome.port
        );
        println!("  Pool: {} ({})", outcome.pool, outcome.identity);
        println!("  Path: {}", outcome.path.display());
        if let Some(rule) = &outcome.firewall_rule {
            println!("  Firewall: {rule}");
        }
        if outcome.tracing_enabled {
            println!("  Tracing: enabled");
        }
        println!();
        println!(
            "{}",
            style.header("🟢", &format!("Endpoint '{}' is running", outcome.site))
        );
    }

    Ok(())
}

fn cmd_check(endpoint: EndpointArgs, json: bool) -> Result<()> {
    use gantry::ops::preflight;

    let style = Style::detect();
    let config = load_config(&style)?;
    let spec = endpoint.into_spec(&config, false, false, false);
    let host = connect_host();

    if !json {
        println!("{}", style.header("🔍", &format!("Gantry Check: {}", spec.site)));
    }

    let report = preflight::run(host.as_ref(), &spec)?;

    if json {
        let output = serde_json::json!({
            "event": "check",
            "site": spec.site,
            "files_checked": report.files_checked,
            "server_version": report.server_version.to_string(),
            "service_state": report.service_state,
            "tls": report.tls,
            "certificate": report.certificate,
        });
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("{} {} endpoint files present", style.ok(), report.files_checked);
        match &report.certificate {
            Some(thumbprint) => println!(
                "{} Certificate {} found in the machine store",
                style.ok(),
                thumbprint
            ),
            None => println!("{} Unencrypted endpoint, no certificate needed", style.ok()),
        }
        println!("{} Web server version {}", style.ok(), report.server_version);
        println!(
            "{} Publishing service {} is {}",
            style.ok(),
            config::PUBLISHING_SERVICE,
            report.service_state
        );
        println!();
        println!("{}", style.header("🟢", "All checks passed!"));
    }

    Ok(())
}

fn cmd_remove(
    site: Option<String>,
    path: Option<PathBuf>,
    delete_files: bool,
    yes: bool,
    json: bool,
) -> Result<()> {
    use std::io::IsTerminal;

    use dialoguer::Confirm;
    use gantry::error::GantryError;
    use gantry::ops::teardown;

    let style = Style::detect();
    let config = load_config(&style)?;
    let site = site.unwrap_or_else(|| config.endpoint.site.clone());
    let path = path.or_else(|| config.host.web_root.as_ref().map(|root| root.join(&site)));
    let host = connect_host();

    if !json {
        println!("{}", style.header("🧹", &format!("Gantry Remove: {site}")));
    }

    if delete_files && !yes {
        if !std::io::stdin().is_terminal() {
            anyhow::bail!("--delete-files needs --yes when running without a terminal");
        }
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Delete the site directory for '{site}' and everything in it?"
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            return Err(GantryError::RemovalAborted.into());
        }
    }

    let report = teardown::remove_endpoint(
        host.as_ref(),
        &teardown::TeardownRequest { site, path, delete_files },
    )?;

    if json {
        let output = serde_json::json!({
            "event": "remove",
            "site": report.site,
            "pool_removed": report.pool_removed,
            "site_removed": report.site_removed,
            "files_removed": report.files_removed,
            "path": report.path.display().to_string(),
        });
        println!("{}", serde_json::to_string(&output)?);
    } else {
        if report.pool_removed {
            println!("{} Removed application pool '{}'", style.ok(), report.site);
        }
        if report.site_removed {
            println!("{} Removed site '{}'", style.ok(), report.site);
        }
        if report.files_removed {
            println!("{} Removed {}", style.ok(), report.path.display());
        }
        if !report.pool_removed && !report.site_removed && !report.files_removed {
            println!("Nothing to remove.");
        }
    }

    Ok(())
}

fn cmd_set_config(path: &PathBuf, key: &str, value: &str, json: bool) -> Result<()> {
    use gantry::webconfig;

    let style = Style::detect();
    let outcome = webconfig::set_app_setting(path, key, value)?;

    if json {
        let output = serde_json::json!({
            "event": "set-config",
            "path": path.display().to_string(),
            "key": key,
            "outcome": outcome.as_str(),
        });
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!(
            "{} Setting '{}' {} in {}",
            style.ok(),
            key,
            outcome.as_str(),
            path.join(config::DEPLOYED_CONFIG_NAME).display()
        );
    }

    Ok(())
}
