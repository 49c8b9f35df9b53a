//! The run-directory orchestrator: turn a configuration into the full
//! ordered asset list and write it.
//!
//! Emission order is fixed: initial conditions, base forcing, orographic
//! forcing, patch files, field_table, diag_table, data_table, the
//! round-trippable configuration copy, input.nml, and finally the RESTART
//! directory. The writer honours this order, so patch files overlay
//! everything emitted before them at the same target.

use std::path::Path;

use tracing::info;

use crate::asset::{self, Asset, CopyMethod};
use crate::config::{AssetSource, Config, DiagTableSource};
use crate::datastore;
use crate::error::{Error, Result};
use crate::location::Location;
use crate::namelist;
use crate::nudging::enable_nudging;
use crate::resolver::resolve_option;
use crate::serialise;
use crate::time_config::{get_time_configuration, DateTuple};

/// The complete asset list for a configuration.
///
/// When `fv_core_nml.nudge` is set the configuration is first transformed by
/// [`enable_nudging`]; the emitted `fv3config.yml` reflects that transformed
/// configuration.
pub async fn generate_asset_list(config: &Config) -> Result<Vec<Asset>> {
    if config.namelist_bool("fv_core_nml", "nudge").unwrap_or(false) {
        let nudged = enable_nudging(config).await?;
        generate(&nudged).await
    } else {
        generate(config).await
    }
}

async fn generate(config: &Config) -> Result<Vec<Asset>> {
    let mut assets = Vec::new();
    assets.extend(source_assets(&config.initial_conditions, &datastore::initial_conditions_options(), "INPUT", CopyMethod::Copy).await?);
    assets.extend(source_assets(&config.forcing, &datastore::forcing_options(), "", CopyMethod::Link).await?);
    assets.extend(source_assets(&config.orographic_forcing, &datastore::orographic_forcing_options(), "INPUT", CopyMethod::Link).await?);
    assets.extend(config.patch_file_assets());
    assets.push(field_table_asset(config)?);
    assets.push(diag_table_asset(config).await?);
    assets.push(data_table_asset(config)?);
    assets.push(Asset::bytes(
        serialise::dump_str(config)?.into_bytes(),
        "",
        "fv3config.yml",
    ));
    assets.push(Asset::bytes(
        namelist::render(&config.namelist)?.into_bytes(),
        "",
        "input.nml",
    ));
    assets.push(Asset::directory("RESTART"));
    for asset in &assets {
        asset.validate()?;
    }
    Ok(assets)
}

/// Assets for a directory-or-explicit-list configuration value.
async fn source_assets(
    source: &AssetSource,
    built_ins: &std::collections::BTreeMap<String, String>,
    target_location: &str,
    copy_method: CopyMethod,
) -> Result<Vec<Asset>> {
    match source {
        AssetSource::One(asset) => Ok(vec![asset.clone()]),
        AssetSource::Assets(assets) => Ok(assets.clone()),
        AssetSource::Path(path) => {
            let directory = resolve_option(path, built_ins)?;
            let location = Location::parse(&directory);
            if built_ins.values().any(|option| option == &directory) && !location.exists().await? {
                return Err(Error::DataMissing(format!(
                    "{path} resolves to {directory}, which is absent; \
                     the bundled data archive has not been downloaded"
                )));
            }
            asset::asset_list_from_location(&location, target_location, copy_method).await
        }
    }
}

/// Split a resolved path into a file asset pointing at its directory and
/// file name.
fn file_asset_from_path(path: &str, target_name: &str) -> Result<Asset> {
    let (source_location, source_name) = path.rsplit_once('/').ok_or_else(|| {
        Error::config(format!("resolved path {path} has no directory component"))
    })?;
    Ok(Asset::file(
        source_location,
        source_name,
        "",
        target_name,
        CopyMethod::Copy,
    ))
}

fn field_table_asset(config: &Config) -> Result<Asset> {
    let name = datastore::microphysics_name(config)?;
    let path = resolve_option(name, &datastore::field_table_options())?;
    file_asset_from_path(&path, "field_table")
}

fn data_table_asset(config: &Config) -> Result<Asset> {
    let path = resolve_option(&config.data_table, &datastore::data_table_options())?;
    file_asset_from_path(&path, "data_table")
}

/// The diag_table bytes, with the experiment name and initialisation date
/// substituted on the first two lines.
async fn diag_table_asset(config: &Config) -> Result<Asset> {
    if config.experiment_name.contains(' ') {
        return Err(Error::config(format!(
            "experiment name {:?} may not contain a space",
            config.experiment_name
        )));
    }
    let (initialisation_date, _) = get_time_configuration(config).await?;
    let text = match &config.diag_table {
        DiagTableSource::Table(table) => {
            let mut table = table.clone();
            table.name = config.experiment_name.clone();
            table.base_time = initialisation_date;
            table.to_string()
        }
        DiagTableSource::Name(name) => {
            let path = resolve_option(name, &datastore::diag_table_options())?;
            let bytes = Location::parse(&path).read().await?;
            let text = String::from_utf8_lossy(&bytes).into_owned();
            substitute_header(&text, &config.experiment_name, initialisation_date)?
        }
    };
    Ok(Asset::bytes(text.into_bytes(), "", "diag_table"))
}

fn substitute_header(text: &str, experiment_name: &str, date: DateTuple) -> Result<String> {
    let mut lines: Vec<String> = text.lines().map(str::to_string).collect();
    if lines.len() < 2 {
        return Err(Error::config(
            "diag_table file has fewer than two lines".to_string(),
        ));
    }
    let [y, mo, d, h, mi, s] = date;
    lines[0] = experiment_name.to_string();
    lines[1] = format!("{y} {mo} {d} {h} {mi} {s}");
    Ok(lines.join("\n") + "\n")
}

/// Assemble a ready-to-run working directory for the model.
pub async fn write_run_directory(config: &Config, target: &Path) -> Result<()> {
    info!(target = %target.display(), "Writing run directory");
    let assets = generate_asset_list(config).await?;
    asset::write_assets(&assets, target).await
}
