//! Pure configuration alterations. Each returns a fresh configuration; the
//! input is never mutated.

use chrono::Duration;
use serde_yaml::Value;
use tracing::info;

use crate::config::Config;
use crate::error::{Error, Result};

/// Flip the namelist into restart mode: no cold-start initialisation, warm
/// start from restart files.
pub fn enable_restart(config: &Config) -> Result<Config> {
    if !config.namelist.contains_key("fv_core_nml") {
        return Err(Error::config(
            "enable_restart requires an fv_core_nml namelist group".to_string(),
        ));
    }
    let mut updated = config.clone();
    for (name, value) in [
        ("external_ic", false),
        ("nggps_ic", false),
        ("make_nh", false),
        ("mountain", true),
        ("warm_start", true),
    ] {
        updated.set_namelist_value("fv_core_nml", name, Value::Bool(value));
    }
    updated.set_namelist_value("fv_core_nml", "na_init", Value::from(0));
    info!("Enabled restart mode");
    Ok(updated)
}

/// Replace the run duration in `coupler_nml`, zeroing `months`.
pub fn set_run_duration(config: &Config, duration: Duration) -> Config {
    let mut remainder = duration.num_seconds();
    let days = remainder / 86_400;
    remainder -= days * 86_400;
    let hours = remainder / 3_600;
    remainder -= hours * 3_600;
    let minutes = remainder / 60;
    let seconds = remainder - minutes * 60;

    let mut updated = config.clone();
    updated.set_namelist_value("coupler_nml", "months", Value::from(0));
    updated.set_namelist_value("coupler_nml", "days", Value::from(days));
    updated.set_namelist_value("coupler_nml", "hours", Value::from(hours));
    updated.set_namelist_value("coupler_nml", "minutes", Value::from(minutes));
    updated.set_namelist_value("coupler_nml", "seconds", Value::from(seconds));
    updated
}
