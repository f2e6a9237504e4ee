//! Endpoint teardown.
//!
//! Removes the application pool, the site, and optionally the site
//! directory. Every step is quiet when its object is already gone, so the
//! same path serves both the `remove` command and the cleanup that runs
//! ahead of provisioning.

use std::fs;
use std::path::PathBuf;

use serde::Serialize;

use crate::error::GantryResult;
use crate::host::WebHost;

/// What to tear down
#[derive(Debug, Clone)]
pub struct TeardownRequest {
    /// Site name, also the name of the pool to remove
    pub site: String,
    /// Site directory override, `None` resolves under the host web root
    pub path: Option<PathBuf>,
    /// Also delete the site directory and its contents
    pub delete_files: bool,
}

/// What teardown actually removed
#[derive(Debug, Clone, Serialize)]
pub struct TeardownReport {
    pub site: String,
    pub pool_removed: bool,
    pub site_removed: bool,
    pub files_removed: bool,
    pub path: PathBuf,
}

/// Remove the endpoint's pool, site, and optionally its directory.
pub fn remove_endpoint<H: WebHost + ?Sized>(
    host: &H,
    request: &TeardownRequest,
) -> GantryResult<TeardownReport> {
    let path = match &request.path {
        Some(path) => path.clone(),
        None => host.web_root()?.join(&request.site),
    };

    let pool_removed = host.pool_exists(&request.site)?;
    if pool_removed {
        host.delete_pool(&request.site)?;
    }

    let site_removed = host.site_exists(&request.site)?;
    if site_removed {
        host.delete_site(&request.site)?;
    }

    let mut files_removed = false;
    if request.delete_files && path.exists() {
        fs::remove_dir_all(&path)?;
        files_removed = true;
    }

    Ok(TeardownReport {
        site: request.site.clone(),
        pool_removed,
        site_removed,
        files_removed,
        path,
    })
}
