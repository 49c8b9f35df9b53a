//! The asset model: a declarative description of every file that must
//! appear in the run directory, and the writer that materialises a sequence
//! of assets.
//!
//! Assets are written in emission order and later assets overwrite earlier
//! ones at the same target path; the patch-file overlay relies on this.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::location::{self, Location};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyMethod {
    Copy,
    Link,
}

impl Default for CopyMethod {
    fn default() -> Self {
        CopyMethod::Copy
    }
}

/// One file or directory to place in the run directory. Serialised untagged:
/// YAML asset mappings discriminate by shape (`source_location` vs `bytes`
/// vs `target_directory`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Asset {
    File {
        source_location: String,
        source_name: String,
        target_location: String,
        target_name: String,
        #[serde(default)]
        copy_method: CopyMethod,
    },
    Bytes {
        bytes: Vec<u8>,
        target_location: String,
        target_name: String,
    },
    Directory {
        target_directory: String,
    },
}

impl Asset {
    pub fn file(
        source_location: impl Into<String>,
        source_name: impl Into<String>,
        target_location: impl Into<String>,
        target_name: impl Into<String>,
        copy_method: CopyMethod,
    ) -> Asset {
        Asset::File {
            source_location: source_location.into(),
            source_name: source_name.into(),
            target_location: target_location.into(),
            target_name: target_name.into(),
            copy_method,
        }
    }

    pub fn bytes(
        bytes: Vec<u8>,
        target_location: impl Into<String>,
        target_name: impl Into<String>,
    ) -> Asset {
        Asset::Bytes {
            bytes,
            target_location: target_location.into(),
            target_name: target_name.into(),
        }
    }

    pub fn directory(target_directory: impl Into<String>) -> Asset {
        Asset::Directory {
            target_directory: target_directory.into(),
        }
    }

    /// Target path relative to the run directory.
    pub fn target_path(&self) -> PathBuf {
        match self {
            Asset::File {
                target_location,
                target_name,
                ..
            }
            | Asset::Bytes {
                target_location,
                target_name,
                ..
            } => {
                if target_location.is_empty() {
                    PathBuf::from(target_name)
                } else {
                    Path::new(target_location).join(target_name)
                }
            }
            Asset::Directory { target_directory } => PathBuf::from(target_directory),
        }
    }

    /// The source as a [`Location`], for file assets.
    pub fn source(&self) -> Option<Location> {
        match self {
            Asset::File {
                source_location,
                source_name,
                ..
            } => Some(Location::parse(source_location).join(source_name)),
            _ => None,
        }
    }

    /// Eagerly reject combinations the writer cannot honour: a symbolic link
    /// can only point at a local filesystem source.
    pub fn validate(&self) -> Result<()> {
        if let Asset::File {
            source_location,
            source_name,
            copy_method: CopyMethod::Link,
            ..
        } = self
        {
            if Location::path_is_remote(source_location) {
                return Err(Error::config(format!(
                    "cannot link remote source {source_location}/{source_name}, use copy_method \"copy\" instead"
                )));
            }
        }
        Ok(())
    }
}

/// Materialise one asset below `run_dir`.
pub async fn write_asset(asset: &Asset, run_dir: &Path) -> Result<()> {
    asset.validate()?;
    let target = run_dir.join(asset.target_path());
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    match asset {
        Asset::File {
            source_location,
            source_name,
            copy_method: CopyMethod::Copy,
            ..
        } => {
            remove_existing_link(&target)?;
            let source = Location::parse(source_location).join(source_name);
            if let Some(dir) = source.local_path().filter(|p| p.is_dir()) {
                Location::Local(dir.to_path_buf())
                    .copy_directory(&target)
                    .await?;
            } else {
                location::copy(&source, &Location::Local(target.clone())).await?;
            }
            debug!(target = %target.display(), "Copied asset");
        }
        Asset::File {
            source_location,
            source_name,
            copy_method: CopyMethod::Link,
            ..
        } => {
            let source = Location::parse(source_location).join(source_name);
            let source_path = match source.local_path() {
                Some(path) => path.to_path_buf(),
                None => {
                    return Err(Error::config(format!(
                        "cannot link remote source {source_location}/{source_name}, use copy_method \"copy\" instead"
                    )))
                }
            };
            if !source_path.exists() {
                return Err(Error::config(format!(
                    "missing source: {} does not exist",
                    source_path.display()
                )));
            }
            if target.symlink_metadata().is_ok() {
                std::fs::remove_file(&target)?;
            }
            std::os::unix::fs::symlink(&source_path, &target)?;
            debug!(target = %target.display(), source = %source_path.display(), "Linked asset");
        }
        Asset::Bytes { bytes, .. } => {
            remove_existing_link(&target)?;
            std::fs::write(&target, bytes)?;
            debug!(target = %target.display(), size = bytes.len(), "Wrote bytes asset");
        }
        Asset::Directory { .. } => {
            std::fs::create_dir_all(&target)?;
            debug!(target = %target.display(), "Created directory asset");
        }
    }
    Ok(())
}

/// Overwriting through an existing symlink would corrupt its source, so the
/// link itself is removed before the target is rewritten.
fn remove_existing_link(target: &Path) -> Result<()> {
    if let Ok(metadata) = target.symlink_metadata() {
        if metadata.file_type().is_symlink() {
            std::fs::remove_file(target)?;
        }
    }
    Ok(())
}

/// Materialise a sequence of assets in order below `run_dir`.
pub async fn write_assets<'a, I>(assets: I, run_dir: &Path) -> Result<()>
where
    I: IntoIterator<Item = &'a Asset>,
{
    std::fs::create_dir_all(run_dir)?;
    let mut count = 0usize;
    for asset in assets {
        write_asset(asset, run_dir).await?;
        count += 1;
    }
    info!(run_dir = %run_dir.display(), assets = count, "Wrote asset list");
    Ok(())
}

/// One file asset per file below `location`, preserving subdirectory
/// structure under `target_location`.
pub async fn asset_list_from_location(
    location: &Location,
    target_location: &str,
    copy_method: CopyMethod,
) -> Result<Vec<Asset>> {
    let names = location.list().await?;
    let mut assets = Vec::with_capacity(names.len());
    for name in names {
        let rel = Path::new(&name);
        let file_name = rel
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .ok_or_else(|| Error::config(format!("listed entry {name} has no file name")))?;
        let subdir = rel
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.to_string_lossy().into_owned());
        let source_location = match &subdir {
            Some(sub) => location.join(sub).describe(),
            None => location.describe(),
        };
        let target = match &subdir {
            Some(sub) if target_location.is_empty() => sub.clone(),
            Some(sub) => format!("{target_location}/{sub}"),
            None => target_location.to_string(),
        };
        assets.push(Asset::file(
            source_location,
            file_name.clone(),
            target,
            file_name,
            copy_method,
        ));
    }
    Ok(assets)
}
