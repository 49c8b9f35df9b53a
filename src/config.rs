//! The declarative run-directory configuration.
//!
//! Configurations are plain values: every alteration in this crate takes a
//! `&Config` and returns a fresh one. Unrecognised top-level keys are kept
//! in a flattened map so user configurations round-trip untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::info;

use crate::asset::Asset;
use crate::diag_table::DiagTable;
use crate::error::{Error, Result};

pub type NamelistGroup = BTreeMap<String, Value>;
pub type Namelist = BTreeMap<String, NamelistGroup>;

/// The `diag_table` key: a built-in name, a path, or an inline table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DiagTableSource {
    /// A built-in option name (e.g. `default`) or a path to a diag_table file.
    Name(String),
    /// A structured table carried inline in the configuration.
    Table(DiagTable),
}

impl Default for DiagTableSource {
    fn default() -> Self {
        DiagTableSource::Name("default".to_string())
    }
}

/// A directory reference, a single explicit asset, or a list of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssetSource {
    Path(String),
    One(Asset),
    Assets(Vec<Asset>),
}

impl AssetSource {
    pub fn as_path(&self) -> Option<&str> {
        match self {
            AssetSource::Path(p) => Some(p.as_str()),
            _ => None,
        }
    }

    /// The explicit assets, when this source is not a directory reference.
    pub fn explicit_assets(&self) -> Option<&[Asset]> {
        match self {
            AssetSource::Path(_) => None,
            AssetSource::One(asset) => Some(std::slice::from_ref(asset)),
            AssetSource::Assets(assets) => Some(assets),
        }
    }
}

/// The `patch_files` key accepts one asset or a list of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatchFiles {
    One(Asset),
    Many(Vec<Asset>),
}

impl PatchFiles {
    pub fn to_vec(&self) -> Vec<Asset> {
        match self {
            PatchFiles::One(asset) => vec![asset.clone()],
            PatchFiles::Many(assets) => assets.clone(),
        }
    }
}

/// Where nudging analyses come from and how their filenames are derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GfsAnalysisData {
    pub url: String,
    /// strftime-style pattern, e.g. `%Y%m%d_%HZ.nc`.
    pub filename_pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy_method: Option<crate::asset::CopyMethod>,
}

fn default_experiment_name() -> String {
    "default_experiment".to_string()
}

fn default_option() -> AssetSource {
    AssetSource::Path("default".to_string())
}

fn default_initial_conditions() -> AssetSource {
    AssetSource::Path("gfs_example".to_string())
}

fn default_data_table() -> String {
    "default".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Fortran namelist groups, rendered to `input.nml`.
    #[serde(default)]
    pub namelist: Namelist,
    #[serde(default = "default_experiment_name")]
    pub experiment_name: String,
    #[serde(default)]
    pub diag_table: DiagTableSource,
    #[serde(default = "default_data_table")]
    pub data_table: String,
    #[serde(default = "default_initial_conditions")]
    pub initial_conditions: AssetSource,
    #[serde(default = "default_option")]
    pub forcing: AssetSource,
    #[serde(default = "default_option")]
    pub orographic_forcing: AssetSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_files: Option<PatchFiles>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gfs_analysis_data: Option<GfsAnalysisData>,
    /// Keys this crate does not interpret, preserved across load/dump.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            namelist: Namelist::new(),
            experiment_name: default_experiment_name(),
            diag_table: DiagTableSource::default(),
            data_table: default_data_table(),
            initial_conditions: default_initial_conditions(),
            forcing: default_option(),
            orographic_forcing: default_option(),
            patch_files: None,
            gfs_analysis_data: None,
            extra: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn namelist_value(&self, group: &str, name: &str) -> Option<&Value> {
        self.namelist.get(group).and_then(|g| g.get(name))
    }

    pub fn namelist_i64(&self, group: &str, name: &str) -> Option<i64> {
        self.namelist_value(group, name).and_then(Value::as_i64)
    }

    pub fn namelist_bool(&self, group: &str, name: &str) -> Option<bool> {
        self.namelist_value(group, name).and_then(Value::as_bool)
    }

    /// Set a namelist entry, creating the group if needed.
    pub fn set_namelist_value(&mut self, group: &str, name: &str, value: Value) {
        self.namelist
            .entry(group.to_string())
            .or_default()
            .insert(name.to_string(), value);
    }

    pub fn patch_file_assets(&self) -> Vec<Asset> {
        self.patch_files
            .as_ref()
            .map(PatchFiles::to_vec)
            .unwrap_or_default()
    }

    pub fn trace_loaded(&self) {
        info!(
            experiment_name = %self.experiment_name,
            namelist_groups = self.namelist.len(),
            "Loaded configuration"
        );
    }
}

/// Decode a six-integer date sequence (`[Y, M, D, h, m, s]`).
pub fn date_from_value(value: &Value) -> Result<[i32; 6]> {
    let items = value
        .as_sequence()
        .ok_or_else(|| Error::config(format!("expected a six-integer date, got {value:?}")))?;
    if items.len() != 6 {
        return Err(Error::config(format!(
            "expected a six-integer date, got {} values",
            items.len()
        )));
    }
    let mut date = [0i32; 6];
    for (slot, item) in date.iter_mut().zip(items) {
        *slot = item
            .as_i64()
            .ok_or_else(|| Error::config(format!("non-integer value {item:?} in date")))?
            as i32;
    }
    Ok(date)
}

/// Encode a six-integer date as a YAML sequence.
pub fn date_to_value(date: [i32; 6]) -> Value {
    Value::Sequence(date.iter().map(|&part| Value::from(part as i64)).collect())
}
