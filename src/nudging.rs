//! Nudging support: fetch 6-hourly analysis files covering the run window
//! and point `fv_nwp_nudge_nml` at them.

use chrono::format::{parse, Item, Parsed, StrftimeItems};
use chrono::{Duration, NaiveDateTime, Timelike};
use serde_yaml::Value;
use tracing::info;

use crate::asset::{Asset, CopyMethod};
use crate::config::{Config, PatchFiles};
use crate::error::{Error, Result};
use crate::time_config::{datetime_from_date, get_run_duration, get_time_configuration};

/// Rewrite a configuration for nudged operation: analysis-file assets are
/// appended to `patch_files` (replacing any from a previous invocation) and
/// `fv_nwp_nudge_nml.file_names` lists their target paths in order.
pub async fn enable_nudging(config: &Config) -> Result<Config> {
    let analysis = config.gfs_analysis_data.as_ref().ok_or_else(|| {
        Error::config("nudging requires a gfs_analysis_data entry in the configuration".to_string())
    })?;
    let (_, current_date) = get_time_configuration(config).await?;
    let duration = get_run_duration(config)?;
    let current = datetime_from_date(current_date)?;

    let copy_method = analysis.copy_method.unwrap_or(CopyMethod::Copy);
    let assets = get_nudging_assets(
        duration,
        current,
        &analysis.url,
        &analysis.filename_pattern,
        copy_method,
    )?;

    let file_names: Vec<Value> = assets
        .iter()
        .map(|asset| Value::String(asset.target_path().to_string_lossy().into_owned()))
        .collect();

    let mut updated = config.clone();
    // drop nudging assets from a previous enable_nudging pass
    let mut patch_files: Vec<Asset> = updated
        .patch_file_assets()
        .into_iter()
        .filter(|asset| !is_nudging_asset(asset, &analysis.filename_pattern))
        .collect();
    patch_files.extend(assets.iter().cloned());

    updated.set_namelist_value("fv_nwp_nudge_nml", "file_names", Value::Sequence(file_names));
    updated.patch_files = Some(PatchFiles::Many(patch_files));
    info!(analyses = assets.len(), "Enabled nudging");
    Ok(updated)
}

/// File assets for every 6-hourly analysis time covering the run.
pub fn get_nudging_assets(
    duration: Duration,
    current: NaiveDateTime,
    url: &str,
    filename_pattern: &str,
    copy_method: CopyMethod,
) -> Result<Vec<Asset>> {
    validate_pattern(filename_pattern)?;
    let mut assets = Vec::new();
    for time in nudging_file_times(current, duration)? {
        let name = time.format(filename_pattern).to_string();
        let asset = Asset::file(url, name.clone(), "INPUT", name, copy_method);
        asset.validate()?;
        assets.push(asset);
    }
    Ok(assets)
}

/// Analysis times at 6-hour spacing, from the most recent synoptic hour
/// (00/06/12/18Z) at or before the run start, through the run window plus
/// one extra step.
fn nudging_file_times(current: NaiveDateTime, duration: Duration) -> Result<Vec<NaiveDateTime>> {
    let window_start = current
        .date()
        .and_hms_opt(6 * (current.hour() / 6), 0, 0)
        .ok_or_else(|| Error::config(format!("invalid nudging start time from {current}")))?;
    let covered = duration + (current - window_start);
    let seconds = covered.num_seconds();
    if seconds < 0 {
        return Err(Error::config(format!(
            "nudging window has negative duration {covered:?}"
        )));
    }
    let whole_hours = (seconds + 3_599) / 3_600;
    let times = (0..whole_hours + 6)
        .step_by(6)
        .map(|hour| window_start + Duration::hours(hour))
        .collect();
    Ok(times)
}

/// Whether a patch-file asset's target name was generated from this
/// filename pattern.
fn is_nudging_asset(asset: &Asset, filename_pattern: &str) -> bool {
    let target_name = match asset {
        Asset::File { target_name, .. } | Asset::Bytes { target_name, .. } => target_name,
        Asset::Directory { .. } => return false,
    };
    let mut parsed = Parsed::new();
    parse(
        &mut parsed,
        target_name,
        StrftimeItems::new(filename_pattern),
    )
    .is_ok()
}

/// Reject strftime patterns chrono cannot format; formatting them later
/// would abort mid-write instead.
fn validate_pattern(pattern: &str) -> Result<()> {
    if StrftimeItems::new(pattern).any(|item| item == Item::Error) {
        return Err(Error::config(format!(
            "invalid filename_pattern {pattern:?} in gfs_analysis_data"
        )));
    }
    Ok(())
}
