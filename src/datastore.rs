//! Built-in option names and where they live in the bundled-data archive.
//!
//! The archive sits beneath the cache directory; each table maps an option
//! name accepted in configurations to its path inside the archive.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::caching::internal_cache_dir;
use crate::config::Config;
use crate::error::{Error, Result};

/// Root of the bundled-data archive on the local filesystem.
pub fn local_archive_dir() -> PathBuf {
    internal_cache_dir().join("data")
}

fn archive_path(category: &str, name: &str) -> String {
    local_archive_dir().join(category).join(name).display().to_string()
}

fn table(category: &str, entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(option, name)| (option.to_string(), archive_path(category, name)))
        .collect()
}

pub fn diag_table_options() -> BTreeMap<String, String> {
    table(
        "diag_table",
        &[
            ("default", "diag_table_default"),
            ("grid_spec", "diag_table_grid_spec"),
            ("no_output", "diag_table_no_output"),
        ],
    )
}

pub fn data_table_options() -> BTreeMap<String, String> {
    table("data_table", &[("default", "data_table_default")])
}

pub fn initial_conditions_options() -> BTreeMap<String, String> {
    table(
        "initial_conditions",
        &[
            ("gfs_example", "gfs_initial_conditions"),
            ("restart_example", "restart_initial_conditions"),
        ],
    )
}

pub fn forcing_options() -> BTreeMap<String, String> {
    table("base_forcing", &[("default", "v1.1")])
}

pub fn orographic_forcing_options() -> BTreeMap<String, String> {
    table("orographic_data", &[("default", "v1.0")])
}

pub fn field_table_options() -> BTreeMap<String, String> {
    table(
        "field_table",
        &[
            ("GFDLMP", "field_table_GFDLMP"),
            ("ZhaoCarr", "field_table_ZhaoCarr"),
        ],
    )
}

/// Which field_table the namelist's microphysics scheme calls for.
pub fn microphysics_name(config: &Config) -> Result<&'static str> {
    let imp_physics = config.namelist_i64("gfs_physics_nml", "imp_physics");
    let ncld = config.namelist_i64("gfs_physics_nml", "ncld");
    match (imp_physics, ncld) {
        (Some(11), _) => Ok("GFDLMP"),
        (Some(99), Some(1)) => Ok("ZhaoCarr"),
        _ => Err(Error::config(format!(
            "no field_table known for imp_physics {imp_physics:?} and ncld {ncld:?} in gfs_physics_nml"
        ))),
    }
}
