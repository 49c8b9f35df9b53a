//! Resolve configuration options that name a data source: an absolute local
//! path, a remote URL, or one of the built-in option names.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{Error, Result};
use crate::location::Location;

/// Resolve `option` against a table of built-in names.
///
/// Remote URLs pass through unchecked; existence is only established when
/// the data is fetched. Absolute local paths must already exist. Anything
/// else is looked up as a built-in name, and relative paths are rejected
/// outright.
pub fn resolve_option(option: &str, built_ins: &BTreeMap<String, String>) -> Result<String> {
    if Location::path_is_remote(option) {
        return Ok(option.to_string());
    }
    if option.starts_with('/') {
        if !std::path::Path::new(option).exists() {
            return Err(Error::config(format!(
                "the provided path {option} does not exist"
            )));
        }
        return Ok(option.to_string());
    }
    if option.contains('/') {
        return Err(Error::config(format!(
            "{option} is a relative path; provide an absolute path, a remote URL, or a built-in option name"
        )));
    }
    match built_ins.get(option) {
        Some(resolved) => {
            debug!(option, resolved, "Resolved built-in option");
            Ok(resolved.clone())
        }
        None => {
            let valid: Vec<&str> = built_ins.keys().map(String::as_str).collect();
            Err(Error::config(format!(
                "{option} is not one of the valid options {valid:?}, an absolute path, or a remote URL"
            )))
        }
    }
}
