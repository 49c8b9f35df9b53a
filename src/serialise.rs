//! YAML load/dump of the configuration.
//!
//! A `diag_table` given as a mapping is upgraded to a typed [`DiagTable`]
//! on load and downgraded to its dictionary form on dump; both directions
//! go through the configuration's serde representation, so
//! `load_str(dump_str(c)) == c` for any valid configuration. Key order is
//! stable (struct declaration order, then sorted unknown keys).

use std::io::{Read, Write};
use std::path::Path;

use tracing::info;

use crate::config::Config;
use crate::error::Result;

pub fn load(reader: impl Read) -> Result<Config> {
    let config: Config = serde_yaml::from_reader(reader)?;
    config.trace_loaded();
    Ok(config)
}

pub fn load_str(contents: &str) -> Result<Config> {
    Ok(serde_yaml::from_str(contents)?)
}

pub fn load_file(path: &Path) -> Result<Config> {
    info!(path = %path.display(), "Loading configuration");
    load(std::fs::File::open(path)?)
}

pub fn dump(config: &Config, writer: impl Write) -> Result<()> {
    serde_yaml::to_writer(writer, config)?;
    Ok(())
}

pub fn dump_str(config: &Config) -> Result<String> {
    Ok(serde_yaml::to_string(config)?)
}

pub fn dump_file(config: &Config, path: &Path) -> Result<()> {
    info!(path = %path.display(), "Writing configuration");
    dump(config, std::fs::File::create(path)?)
}
