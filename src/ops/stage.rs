//! Content staging.
//!
//! Lays the endpoint files out under the site directory: binaries in
//! `bin/` (localized ones in `bin/<locale>/`), scripts and descriptors at
//! the root, and the settings document renamed to `web.config`. Existing
//! files are overwritten; anything else already in the directory stays.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::DEPLOYED_CONFIG_NAME;
use crate::endpoint::EndpointSpec;
use crate::error::{GantryError, GantryResult};
use crate::ops::preflight;

/// One file placed into the site directory
#[derive(Debug, Clone, Serialize)]
pub struct StagedFile {
    /// Path relative to the site directory, `/`-separated
    pub name: String,
    pub digest: String,
}

/// Everything one staging pass wrote
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub target: PathBuf,
    pub files: Vec<StagedFile>,
}

/// Copy the endpoint content into `target`, creating the layout as needed.
pub fn stage_files(spec: &EndpointSpec, target: &Path) -> GantryResult<StageReport> {
    preflight::validate_files(spec)?;

    fs::create_dir_all(target)?;
    let bin = target.join("bin");
    fs::create_dir_all(&bin)?;

    let mut files = Vec::new();

    for binary in &spec.binaries {
        files.push(copy_into(binary, &bin, target)?);
    }

    if let Some(locale) = &spec.locale {
        let locale_dir = bin.join(locale);
        fs::create_dir_all(&locale_dir)?;
        for localized in &spec.localized_files {
            files.push(copy_into(localized, &locale_dir, target)?);
        }
    }

    for script in &spec.scripts {
        files.push(copy_into(script, target, target)?);
    }

    files.push(copy_as(
        &spec.config_file,
        &target.join(DEPLOYED_CONFIG_NAME),
        target,
    )?);
    files.push(copy_into(&spec.service_file, target, target)?);
    files.push(copy_into(&spec.schema_file, target, target)?);
    if let Some(dispatch) = &spec.dispatch_file {
        files.push(copy_into(dispatch, target, target)?);
    }
    if let Some(bootstrap) = &spec.bootstrap_file {
        files.push(copy_into(bootstrap, target, target)?);
    }

    Ok(StageReport {
        target: target.to_path_buf(),
        files,
    })
}

/// Copy `source` into `dir` under its own file name.
fn copy_into(source: &Path, dir: &Path, root: &Path) -> GantryResult<StagedFile> {
    let name = source.file_name().ok_or_else(|| GantryError::InvalidPath {
        path: source.to_path_buf(),
    })?;
    copy_as(source, &dir.join(name), root)
}

fn copy_as(source: &Path, dest: &Path, root: &Path) -> GantryResult<StagedFile> {
    if !source.exists() {
        return Err(GantryError::MissingFile {
            path: source.to_path_buf(),
        });
    }
    fs::copy(source, dest)?;

    let name = dest
        .strip_prefix(root)
        .unwrap_or(dest)
        .to_string_lossy()
        .replace('\\', "/");
    Ok(StagedFile {
        name,
        digest: file_digest(dest)?,
    })
}

fn file_digest(path: &Path) -> GantryResult<String> {
    let bytes = fs::read(path)?;
    Ok(format!("sha256:{:x}", Sha256::digest(&bytes)))
}
