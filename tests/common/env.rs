//! Test environment builder for isolated Gantry testing.
//!
//! Provides `TestEnv` - a project directory holding endpoint source files,
//! a simulated host behind a `GANTRY_HOST_STATE` file, plus helpers to run
//! Gantry CLI commands against both.

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use gantry::host::StateFileHost;
use tempfile::TempDir;

use super::fixtures;

/// Result of running a Gantry CLI command
#[derive(Debug)]
pub struct TestResult {
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl TestResult {
    /// Combine stdout and stderr
    pub fn combined_output(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// Isolated test environment.
///
/// Provides:
/// - A project directory with endpoint source files (the command cwd)
/// - A host directory holding the state file and the simulated web root
/// - An empty home directory so user configuration never leaks in
/// - CLI command execution helpers
pub struct TestEnv {
    /// Temporary directory the commands run from
    pub project_root: TempDir,
    /// Temporary directory holding host state and the web root
    pub host_root: TempDir,
    /// Temporary directory used as HOME
    pub home_dir: TempDir,
    /// Path to the gantry binary
    gantry_bin: PathBuf,
}

impl TestEnv {
    /// Create a new TestEnvBuilder
    pub fn builder() -> TestEnvBuilder {
        TestEnvBuilder::new()
    }

    /// Environment with the standard endpoint source files
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Get path relative to project root
    pub fn project_path(&self, relative: &str) -> PathBuf {
        self.project_root.path().join(relative)
    }

    /// The host state file handed to commands via `GANTRY_HOST_STATE`
    pub fn state_path(&self) -> PathBuf {
        self.host_root.path().join("host.json")
    }

    /// The web root the simulated host reports
    pub fn web_root(&self) -> PathBuf {
        self.host_root.path().join("wwwroot")
    }

    /// A site's content directory under the simulated web root
    pub fn site_dir(&self, site: &str) -> PathBuf {
        self.web_root().join(site)
    }

    /// Open the simulated host for seeding and assertions
    pub fn host(&self) -> StateFileHost {
        StateFileHost::new(self.state_path())
    }

    /// Parse the raw host state file
    pub fn read_state(&self) -> serde_json::Value {
        let raw = std::fs::read_to_string(self.state_path())
            .unwrap_or_else(|e| panic!("Failed to read host state: {}", e));
        serde_json::from_str(&raw).expect("host state is not valid JSON")
    }

    /// Run gantry CLI in this environment from the project root
    pub fn run(&self, args: &[&str]) -> TestResult {
        self.run_from(self.project_root.path(), args)
    }

    /// Run gantry CLI from the project root with extra env vars
    pub fn run_with_env(&self, args: &[&str], env_vars: &[(&str, &str)]) -> TestResult {
        self.run_from_with_env(self.project_root.path(), args, env_vars)
    }

    /// Run gantry CLI from a specific directory
    pub fn run_from(&self, cwd: &Path, args: &[&str]) -> TestResult {
        self.run_from_with_env(cwd, args, &[])
    }

    /// Run gantry CLI from a specific directory with extra env vars
    pub fn run_from_with_env(
        &self,
        cwd: &Path,
        args: &[&str],
        env_vars: &[(&str, &str)],
    ) -> TestResult {
        let mut cmd = Command::new(&self.gantry_bin);
        cmd.current_dir(cwd)
            .args(args)
            .stdin(Stdio::null())
            .env("GANTRY_HOST_STATE", self.state_path())
            .env("GANTRY_NO_COLOR", "1")
            .env("HOME", self.home_dir.path())
            .env("USERPROFILE", self.home_dir.path())
            .env("XDG_CONFIG_HOME", self.home_dir.path().join(".config"));

        for (key, value) in env_vars {
            cmd.env(key, value);
        }

        let output = cmd.output().expect("Failed to execute gantry");

        self.output_to_result(output)
    }

    /// Convert Command output to TestResult
    fn output_to_result(&self, output: Output) -> TestResult {
        TestResult {
            success: output.status.success(),
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }

    /// Write a file to the project directory
    pub fn write_project_file(&self, relative_path: &str, content: &str) {
        let full_path = self.project_path(relative_path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create directories");
        }
        std::fs::write(&full_path, content).expect("Failed to write file");
    }

    /// Write a file under the simulated web root
    pub fn write_site_file(&self, site: &str, relative_path: &str, content: &str) {
        let full_path = self.site_dir(site).join(relative_path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create directories");
        }
        std::fs::write(&full_path, content).expect("Failed to write file");
    }

    /// Read a staged file's content
    pub fn read_site_file(&self, site: &str, relative_path: &str) -> String {
        let full_path = self.site_dir(site).join(relative_path);
        std::fs::read_to_string(&full_path)
            .unwrap_or_else(|e| panic!("Failed to read staged file {}: {}", relative_path, e))
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for TestEnv with fluent API
pub struct TestEnvBuilder {
    source_files: Vec<(String, String)>,
    config: Option<String>,
    seed_default_sources: bool,
}

impl TestEnvBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self {
            source_files: Vec::new(),
            config: None,
            seed_default_sources: true,
        }
    }

    /// Add an endpoint source file to the project directory
    pub fn with_source_file(mut self, name: &str, content: &str) -> Self {
        self.source_files.push((name.to_string(), content.to_string()));
        self
    }

    /// Set gantry.toml content in the project directory
    pub fn with_config(mut self, toml: &str) -> Self {
        self.config = Some(toml.to_string());
        self
    }

    /// Skip the standard web.config / PSWS.svc / endpoint.mof trio
    pub fn without_default_sources(mut self) -> Self {
        self.seed_default_sources = false;
        self
    }

    /// Build the TestEnv
    pub fn build(self) -> TestEnv {
        let project_root = TempDir::new().expect("Failed to create project temp dir");
        let host_root = TempDir::new().expect("Failed to create host temp dir");
        let home_dir = TempDir::new().expect("Failed to create home temp dir");

        if self.seed_default_sources {
            std::fs::write(project_root.path().join("web.config"), fixtures::WEB_CONFIG)
                .expect("Failed to write web.config");
            std::fs::write(project_root.path().join("PSWS.svc"), fixtures::SERVICE_FILE)
                .expect("Failed to write PSWS.svc");
            std::fs::write(project_root.path().join("endpoint.mof"), fixtures::SCHEMA_FILE)
                .expect("Failed to write endpoint.mof");
        }

        for (name, content) in &self.source_files {
            let path = project_root.path().join(name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).expect("Failed to create source directory");
            }
            std::fs::write(&path, content).expect("Failed to write source file");
        }

        if let Some(config) = &self.config {
            std::fs::write(project_root.path().join("gantry.toml"), config)
                .expect("Failed to write gantry.toml");
        }

        TestEnv {
            project_root,
            host_root,
            home_dir,
            gantry_bin: PathBuf::from(env!("CARGO_BIN_EXE_gantry")),
        }
    }
}

impl Default for TestEnvBuilder {
    fn default() -> Self {
        Self::new()
    }
}
