//! Custom assertion macros for CLI tests.
//!
//! These macros provide descriptive failure messages to aid debugging.

use std::path::Path;

/// List all files in a directory recursively (for debugging)
pub fn list_all_files(dir: &Path) -> Vec<String> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                for sub in list_all_files(&path) {
                    files.push(sub);
                }
            } else {
                files.push(path.display().to_string());
            }
        }
    }
    files
}

/// Assert that a file was staged into the site directory.
///
/// # Example
/// ```ignore
/// assert_staged!(env, "PSWS", "bin/worker.dll");
/// ```
#[macro_export]
macro_rules! assert_staged {
    ($env:expr, $site:expr, $path:expr) => {
        let full_path = $env.site_dir($site).join($path);
        assert!(
            full_path.exists(),
            "Expected staged file at '{}', but it doesn't exist.\n\
             Web root: {:?}\n\
             Files found:\n  {}",
            $path,
            $env.web_root(),
            $crate::common::list_all_files(&$env.web_root()).join("\n  ")
        );
    };
}

/// Assert that a file was NOT staged (should not exist).
#[macro_export]
macro_rules! assert_not_staged {
    ($env:expr, $site:expr, $path:expr) => {
        let full_path = $env.site_dir($site).join($path);
        assert!(
            !full_path.exists(),
            "Expected '{}' to NOT exist, but it does.\n\
             Web root: {:?}",
            $path,
            $env.web_root()
        );
    };
}

/// Assert that output (stdout or stderr) contains expected pattern.
///
/// # Example
/// ```ignore
/// assert_output_contains!(result, "All checks passed");
/// ```
#[macro_export]
macro_rules! assert_output_contains {
    ($result:expr, $pattern:expr) => {
        assert!(
            $result.stdout.contains($pattern) || $result.stderr.contains($pattern),
            "Expected output to contain '{}'\n\
             stdout:\n{}\n\
             stderr:\n{}",
            $pattern,
            $result.stdout,
            $result.stderr
        );
    };
}

/// Assert that output does NOT contain a pattern.
#[macro_export]
macro_rules! assert_output_not_contains {
    ($result:expr, $pattern:expr) => {
        assert!(
            !$result.stdout.contains($pattern) && !$result.stderr.contains($pattern),
            "Expected output to NOT contain '{}'\n\
             stdout:\n{}\n\
             stderr:\n{}",
            $pattern,
            $result.stdout,
            $result.stderr
        );
    };
}
