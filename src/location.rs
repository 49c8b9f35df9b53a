//! Uniform access to the places run-directory data can live: local paths,
//! `gs://` buckets, `http(s)://` URLs and the in-process `memory://` store.
//!
//! Remote reads go through the cache mirror when remote caching is enabled;
//! a cache hit never refetches and never touches the mirrored file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError};

use futures::future::try_join_all;
use serde::Deserialize;
use tracing::debug;

use crate::caching;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteScheme {
    Gs,
    Http,
    Https,
    Memory,
}

impl RemoteScheme {
    fn as_str(self) -> &'static str {
        match self {
            RemoteScheme::Gs => "gs",
            RemoteScheme::Http => "http",
            RemoteScheme::Https => "https",
            RemoteScheme::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLocation {
    pub scheme: RemoteScheme,
    pub authority: String,
    pub path: String,
}

impl RemoteLocation {
    fn url(&self) -> String {
        if self.path.is_empty() {
            format!("{}://{}", self.scheme.as_str(), self.authority)
        } else {
            format!("{}://{}/{}", self.scheme.as_str(), self.authority, self.path)
        }
    }
}

/// A place a file or directory can live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Local(PathBuf),
    Remote(RemoteLocation),
}

const REMOTE_PREFIXES: [(&str, RemoteScheme); 4] = [
    ("gs://", RemoteScheme::Gs),
    ("http://", RemoteScheme::Http),
    ("https://", RemoteScheme::Https),
    ("memory://", RemoteScheme::Memory),
];

impl Location {
    /// Classify a path string. `file://` prefixes are stripped; anything
    /// without a recognised remote scheme is a local path.
    pub fn parse(path: &str) -> Location {
        let path = path.strip_prefix("file://").unwrap_or(path);
        for (prefix, scheme) in REMOTE_PREFIXES {
            if let Some(rest) = path.strip_prefix(prefix) {
                let (authority, object) = rest.split_once('/').unwrap_or((rest, ""));
                return Location::Remote(RemoteLocation {
                    scheme,
                    authority: authority.to_string(),
                    path: object.trim_matches('/').to_string(),
                });
            }
        }
        Location::Local(PathBuf::from(path))
    }

    pub fn path_is_remote(path: &str) -> bool {
        REMOTE_PREFIXES
            .iter()
            .any(|(prefix, _)| path.starts_with(prefix))
    }

    /// Append a relative path component.
    pub fn join(&self, name: &str) -> Location {
        match self {
            Location::Local(path) => Location::Local(path.join(name)),
            Location::Remote(remote) => {
                let path = if remote.path.is_empty() {
                    name.to_string()
                } else {
                    format!("{}/{}", remote.path, name)
                };
                Location::Remote(RemoteLocation {
                    scheme: remote.scheme,
                    authority: remote.authority.clone(),
                    path,
                })
            }
        }
    }

    /// The printable form, suitable for re-parsing.
    pub fn describe(&self) -> String {
        match self {
            Location::Local(path) => path.display().to_string(),
            Location::Remote(remote) => remote.url(),
        }
    }

    pub fn local_path(&self) -> Option<&Path> {
        match self {
            Location::Local(path) => Some(path),
            Location::Remote(_) => None,
        }
    }

    pub async fn exists(&self) -> Result<bool> {
        match self {
            Location::Local(path) => Ok(path.exists()),
            Location::Remote(remote) => {
                if caching::remote_caching_enabled() {
                    if let Ok(mirror) =
                        caching::cache_location(remote.scheme.as_str(), &remote.authority, &remote.path)
                    {
                        if mirror.exists() {
                            return Ok(true);
                        }
                    }
                }
                remote_exists(remote).await
            }
        }
    }

    /// The full contents. Remote reads are served from the cache mirror
    /// when remote caching is enabled.
    pub async fn read(&self) -> Result<Vec<u8>> {
        match self {
            Location::Local(path) => Ok(std::fs::read(path)?),
            Location::Remote(remote) => {
                if caching::remote_caching_enabled() {
                    let mirror = mirror_remote(remote).await?;
                    Ok(std::fs::read(mirror)?)
                } else {
                    fetch(remote).await
                }
            }
        }
    }

    /// Materialise this location as a local file at `target`.
    pub async fn get_file(&self, target: &Path) -> Result<()> {
        caching::ensure_parent_dir(target)?;
        match self {
            Location::Local(path) => {
                if !path.exists() {
                    return Err(Error::config(format!(
                        "missing source: {} does not exist",
                        path.display()
                    )));
                }
                std::fs::copy(path, target)?;
                Ok(())
            }
            Location::Remote(remote) => {
                if caching::remote_caching_enabled() {
                    let mirror = mirror_remote(remote).await?;
                    std::fs::copy(mirror, target)?;
                } else {
                    let bytes = fetch(remote).await?;
                    std::fs::write(target, bytes)?;
                }
                Ok(())
            }
        }
    }

    /// Upload a local file to this location.
    pub async fn put_file(&self, source: &Path) -> Result<()> {
        let bytes = std::fs::read(source)?;
        match self {
            Location::Local(path) => {
                caching::ensure_parent_dir(path)?;
                std::fs::write(path, bytes)?;
                Ok(())
            }
            Location::Remote(remote) => match remote.scheme {
                RemoteScheme::Memory => {
                    memory_write(&remote.url(), bytes);
                    Ok(())
                }
                other => Err(Error::NotImplemented(format!(
                    "uploading to {}:// locations",
                    other.as_str()
                ))),
            },
        }
    }

    /// File paths below this location, relative to it, recursing into
    /// subdirectories.
    pub async fn list(&self) -> Result<Vec<String>> {
        match self {
            Location::Local(path) => list_local(path),
            Location::Remote(remote) => match remote.scheme {
                RemoteScheme::Gs => list_gs(remote).await,
                RemoteScheme::Memory => Ok(memory_list(&remote.url())),
                RemoteScheme::Http | RemoteScheme::Https => Err(Error::NotImplemented(
                    "listing the contents of http locations".to_string(),
                )),
            },
        }
    }

    /// Copy every file below this location into `target`, preserving the
    /// relative structure.
    pub async fn copy_directory(&self, target: &Path) -> Result<()> {
        let names = self.list().await?;
        let transfers = names.iter().map(|name| {
            let source = self.join(name);
            let dest = target.join(name);
            async move { source.get_file(&dest).await }
        });
        try_join_all(transfers).await?;
        Ok(())
    }
}

/// Copy a single file between two locations.
pub async fn copy(source: &Location, target: &Location) -> Result<()> {
    match target {
        Location::Local(dest) => source.get_file(dest).await,
        Location::Remote(_) => match source {
            Location::Local(path) => target.put_file(path).await,
            Location::Remote(_) => Err(Error::NotImplemented(
                "copying directly between two remote locations".to_string(),
            )),
        },
    }
}

fn list_local(root: &Path) -> Result<Vec<String>> {
    if !root.is_dir() {
        return Err(Error::config(format!(
            "missing source: {} is not a directory",
            root.display()
        )));
    }
    let mut names = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                stack.push(path);
            } else if let Ok(rel) = path.strip_prefix(root) {
                names.push(rel.to_string_lossy().into_owned());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Mirror a remote object under the cache directory, downloading it only
/// when the mirror is absent. A hit leaves the mirrored file untouched.
async fn mirror_remote(remote: &RemoteLocation) -> Result<PathBuf> {
    let mirror = caching::cache_location(remote.scheme.as_str(), &remote.authority, &remote.path)?;
    if mirror.exists() {
        debug!(url = %remote.url(), mirror = %mirror.display(), "Cache hit");
        return Ok(mirror);
    }
    let bytes = fetch(remote).await?;
    caching::ensure_parent_dir(&mirror)?;
    std::fs::write(&mirror, bytes)?;
    debug!(url = %remote.url(), mirror = %mirror.display(), "Cached remote object");
    Ok(mirror)
}

async fn fetch(remote: &RemoteLocation) -> Result<Vec<u8>> {
    match remote.scheme {
        RemoteScheme::Memory => memory_read(&remote.url()),
        RemoteScheme::Gs => http_fetch(&gs_media_url(remote)).await,
        RemoteScheme::Http | RemoteScheme::Https => http_fetch(&remote.url()).await,
    }
}

async fn remote_exists(remote: &RemoteLocation) -> Result<bool> {
    match remote.scheme {
        RemoteScheme::Memory => Ok(memory_contains(&remote.url())),
        RemoteScheme::Gs => http_exists(&gs_media_url(remote)).await,
        RemoteScheme::Http | RemoteScheme::Https => http_exists(&remote.url()).await,
    }
}

async fn http_fetch(url: &str) -> Result<Vec<u8>> {
    debug!(url, "Fetching remote object");
    let response = reqwest::get(url).await?.error_for_status()?;
    Ok(response.bytes().await?.to_vec())
}

async fn http_exists(url: &str) -> Result<bool> {
    let response = reqwest::Client::new().head(url).send().await?;
    Ok(response.status().is_success())
}

/// Public objects are served from the storage host without authentication.
fn gs_media_url(remote: &RemoteLocation) -> String {
    format!(
        "https://storage.googleapis.com/{}/{}",
        remote.authority, remote.path
    )
}

#[derive(Deserialize)]
struct GsListResponse {
    #[serde(default)]
    items: Vec<GsObject>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct GsObject {
    name: String,
}

/// List a bucket prefix through the JSON API, following page tokens.
async fn list_gs(remote: &RemoteLocation) -> Result<Vec<String>> {
    let client = reqwest::Client::new();
    let url = format!(
        "https://storage.googleapis.com/storage/v1/b/{}/o",
        remote.authority
    );
    let prefix = if remote.path.is_empty() {
        String::new()
    } else {
        format!("{}/", remote.path)
    };
    let mut names = Vec::new();
    let mut page_token: Option<String> = None;
    loop {
        let mut request = client.get(&url).query(&[("prefix", prefix.as_str())]);
        if let Some(token) = &page_token {
            request = request.query(&[("pageToken", token.as_str())]);
        }
        let page: GsListResponse = request.send().await?.error_for_status()?.json().await?;
        names.extend(page.items.into_iter().filter_map(|object| {
            object
                .name
                .strip_prefix(&prefix)
                .filter(|rest| !rest.is_empty() && !rest.ends_with('/'))
                .map(str::to_string)
        }));
        match page.next_page_token {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }
    names.sort();
    Ok(names)
}

fn memory_store() -> &'static Mutex<BTreeMap<String, Vec<u8>>> {
    static STORE: OnceLock<Mutex<BTreeMap<String, Vec<u8>>>> = OnceLock::new();
    STORE.get_or_init(|| Mutex::new(BTreeMap::new()))
}

/// Put bytes into the in-process `memory://` store.
pub fn memory_write(url: &str, bytes: Vec<u8>) {
    memory_store()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(url.to_string(), bytes);
}

/// Empty the in-process `memory://` store.
pub fn memory_clear() {
    memory_store()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clear();
}

fn memory_read(url: &str) -> Result<Vec<u8>> {
    memory_store()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get(url)
        .cloned()
        .ok_or_else(|| Error::config(format!("missing source: {url} is not in the memory store")))
}

fn memory_contains(url: &str) -> bool {
    let prefix = format!("{url}/");
    let store = memory_store().lock().unwrap_or_else(PoisonError::into_inner);
    store.contains_key(url) || store.keys().any(|key| key.starts_with(&prefix))
}

fn memory_list(url: &str) -> Vec<String> {
    let prefix = format!("{url}/");
    memory_store()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .keys()
        .filter_map(|key| key.strip_prefix(&prefix).map(str::to_string))
        .collect()
}
