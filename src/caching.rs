//! Process-wide cache settings for remote data.
//!
//! Remote locations are mirrored beneath `<cache_dir>/fv3config-cache/
//! <scheme>/<authority>/<path>` on first access. The cache directory comes
//! from `FV3CONFIG_CACHE_DIR` when set, otherwise the per-user cache
//! directory; both the directory and the caching toggle can be changed at
//! runtime.

use std::path::{Path, PathBuf};
use std::sync::{OnceLock, PoisonError, RwLock};

use tracing::debug;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub remote_caching_enabled: bool,
    pub cache_dir: PathBuf,
}

impl CacheSettings {
    fn from_env() -> CacheSettings {
        let cache_dir = std::env::var_os("FV3CONFIG_CACHE_DIR")
            .map(PathBuf::from)
            .or_else(dirs::cache_dir)
            .unwrap_or_else(std::env::temp_dir);
        CacheSettings {
            remote_caching_enabled: true,
            cache_dir,
        }
    }
}

fn settings() -> &'static RwLock<CacheSettings> {
    static SETTINGS: OnceLock<RwLock<CacheSettings>> = OnceLock::new();
    SETTINGS.get_or_init(|| RwLock::new(CacheSettings::from_env()))
}

pub fn get_cache_dir() -> PathBuf {
    settings()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .cache_dir
        .clone()
}

pub fn set_cache_dir(path: impl AsRef<Path>) {
    let path = path.as_ref().to_path_buf();
    debug!(cache_dir = %path.display(), "Cache directory changed");
    settings()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .cache_dir = path;
}

pub fn enable_remote_caching() {
    settings()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .remote_caching_enabled = true;
}

pub fn disable_remote_caching() {
    settings()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .remote_caching_enabled = false;
}

pub fn remote_caching_enabled() -> bool {
    settings()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .remote_caching_enabled
}

/// Root of the mirror tree beneath the cache directory.
pub fn internal_cache_dir() -> PathBuf {
    get_cache_dir().join("fv3config-cache")
}

/// Mirror path for a remote object. A bare `scheme://authority` has no
/// object path and cannot be cached.
pub fn cache_location(scheme: &str, authority: &str, path: &str) -> Result<PathBuf> {
    if path.is_empty() {
        return Err(Error::config(format!(
            "{scheme}://{authority} has no object path to cache"
        )));
    }
    let mut location = internal_cache_dir().join(scheme).join(authority);
    for part in path.split('/').filter(|part| !part.is_empty()) {
        location.push(part);
    }
    Ok(location)
}

pub(crate) fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}
