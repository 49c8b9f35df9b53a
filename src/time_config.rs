//! Derive the simulation's initialisation and current dates from a
//! configuration, and the related namelist-derived quantities.
//!
//! Precedence for the time configuration:
//! 1. `coupler_nml.force_date_from_namelist` wins outright.
//! 2. Otherwise a `coupler.res` restart file is consulted, whether it lives
//!    next to the initial conditions (locally or remotely) or inside an
//!    explicit asset list.
//! 3. Otherwise both dates fall back to `coupler_nml.current_date`.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::{debug, info};

use crate::asset::Asset;
use crate::config::{date_from_value, AssetSource, Config};
use crate::datastore;
use crate::error::{Error, Result};
use crate::location::Location;
use crate::resolver::resolve_option;

pub type DateTuple = [i32; 6];

/// `(initialisation_date, current_date)` for a configuration.
pub async fn get_time_configuration(config: &Config) -> Result<(DateTuple, DateTuple)> {
    if config
        .namelist_bool("coupler_nml", "force_date_from_namelist")
        .unwrap_or(false)
    {
        let date = namelist_current_date(config)?;
        debug!(?date, "Dates forced from namelist");
        return Ok((date, date));
    }
    if let Some(contents) = read_coupler_res(config).await? {
        let dates = parse_coupler_res(&contents)?;
        info!(
            initialisation_date = ?dates.0,
            current_date = ?dates.1,
            "Dates taken from coupler.res"
        );
        return Ok(dates);
    }
    let date = namelist_current_date(config)?;
    debug!(?date, "No coupler.res found, dates taken from namelist");
    Ok((date, date))
}

fn namelist_current_date(config: &Config) -> Result<DateTuple> {
    match config.namelist_value("coupler_nml", "current_date") {
        Some(value) => date_from_value(value),
        None => Ok([0; 6]),
    }
}

/// Find and read a `coupler.res` for this configuration, if one exists.
async fn read_coupler_res(config: &Config) -> Result<Option<String>> {
    let assets = match &config.initial_conditions {
        AssetSource::Path(path) => {
            let directory = resolve_option(path, &datastore::initial_conditions_options())?;
            let location = Location::parse(&directory).join("coupler.res");
            return if location.exists().await? {
                let bytes = location.read().await?;
                Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
            } else {
                Ok(None)
            };
        }
        source => source.explicit_assets().unwrap_or(&[]),
    };
    for asset in assets {
        match asset {
            Asset::File {
                source_location,
                source_name,
                target_location,
                target_name,
                ..
            } if target_location == "INPUT" && target_name == "coupler.res" => {
                let location = Location::parse(source_location).join(source_name);
                let bytes = location.read().await?;
                return Ok(Some(String::from_utf8_lossy(&bytes).into_owned()));
            }
            Asset::Bytes {
                target_location,
                target_name,
                ..
            } if target_location == "INPUT" && target_name == "coupler.res" => {
                return Err(Error::NotImplemented(
                    "deriving the time configuration from a bytes coupler.res asset".to_string(),
                ));
            }
            _ => {}
        }
    }
    Ok(None)
}

fn six_integers(line: &str, what: &str) -> Result<DateTuple> {
    let tokens: Vec<&str> = line.split_whitespace().take(6).collect();
    if tokens.len() != 6 {
        return Err(Error::config(format!(
            "{what} of coupler.res must begin with six integers, got {line:?}"
        )));
    }
    let mut date = [0i32; 6];
    for (slot, token) in date.iter_mut().zip(&tokens) {
        *slot = token.parse().map_err(|_| {
            Error::config(format!(
                "{what} of coupler.res must begin with six integers, got {line:?}"
            ))
        })?;
    }
    Ok(date)
}

/// Parse `coupler.res` text: line 2 is the model start time and line 3 the
/// current model time, each six integers (trailing commentary is ignored).
pub fn parse_coupler_res(contents: &str) -> Result<(DateTuple, DateTuple)> {
    let mut lines = contents.lines();
    let _calendar = lines
        .next()
        .ok_or_else(|| Error::config("coupler.res is empty".to_string()))?;
    let start_line = lines
        .next()
        .ok_or_else(|| Error::config("coupler.res is missing its model start time".to_string()))?;
    let current_line = lines.next().ok_or_else(|| {
        Error::config("coupler.res is missing its current model time".to_string())
    })?;
    let initialisation_date = six_integers(start_line, "line 2")?;
    let current_date = six_integers(current_line, "line 3")?;
    Ok((initialisation_date, current_date))
}

/// Total run duration from `coupler_nml`. Months are rejected: they have no
/// fixed duration.
pub fn get_run_duration(config: &Config) -> Result<Duration> {
    let months = config.namelist_i64("coupler_nml", "months").unwrap_or(0);
    if months != 0 {
        return Err(Error::config(format!(
            "coupler_nml months must be 0, got {months}: months have no fixed duration"
        )));
    }
    let part = |name| config.namelist_i64("coupler_nml", name).unwrap_or(0);
    Ok(Duration::days(part("days"))
        + Duration::hours(part("hours"))
        + Duration::minutes(part("minutes"))
        + Duration::seconds(part("seconds")))
}

/// Number of MPI ranks: tiles times the per-tile layout decomposition.
pub fn get_n_processes(config: &Config) -> i64 {
    let ntiles = config.namelist_i64("fv_core_nml", "ntiles").unwrap_or(6);
    let layout = config
        .namelist_value("fv_core_nml", "layout")
        .and_then(|v| v.as_sequence())
        .map(|seq| {
            seq.iter()
                .filter_map(serde_yaml::Value::as_i64)
                .product::<i64>()
        })
        .unwrap_or(1);
    ntiles * layout
}

/// Cubed-sphere resolution label, e.g. `C48` for `npx = npy = 49`.
pub fn get_resolution(config: &Config) -> Result<String> {
    let require = |name: &str| {
        config.namelist_i64("fv_core_nml", name).ok_or_else(|| {
            Error::config(format!(
                "fv_core_nml {name} is required to determine the resolution"
            ))
        })
    };
    let npx = require("npx")?;
    let npy = require("npy")?;
    if npx != npy {
        return Err(Error::config(format!(
            "npx and npy in fv_core_nml must be equal, got {npx} and {npy}"
        )));
    }
    Ok(format!("C{}", npx - 1))
}

/// Convert a six-integer date tuple to a chrono date-time.
pub fn datetime_from_date(date: DateTuple) -> Result<NaiveDateTime> {
    let [year, month, day, hour, minute, second] = date;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
        .and_then(|d| d.and_hms_opt(hour as u32, minute as u32, second as u32))
        .ok_or_else(|| Error::config(format!("invalid date {date:?}")))
}

/// Convert a chrono date-time back to a six-integer tuple.
pub fn date_from_datetime(datetime: NaiveDateTime) -> DateTuple {
    use chrono::{Datelike, Timelike};
    [
        datetime.year(),
        datetime.month() as i32,
        datetime.day() as i32,
        datetime.hour() as i32,
        datetime.minute() as i32,
        datetime.second() as i32,
    ]
}
