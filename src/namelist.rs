//! Fortran namelist rendering and reading.
//!
//! The run directory's `input.nml` is rendered from the configuration's
//! nested `namelist` mapping: each group becomes an `&group … /` block,
//! booleans become `.true.`/`.false.`, strings are single-quoted and
//! sequences are comma-separated. An empty namelist renders to an empty
//! file.

use std::path::Path;

use serde_yaml::Value;
use tracing::debug;

use crate::config::{Config, Namelist, NamelistGroup};
use crate::error::{Error, Result};

/// Render a namelist mapping to `input.nml` text.
pub fn render(namelist: &Namelist) -> Result<String> {
    let mut out = String::new();
    for (group, entries) in namelist {
        out.push('&');
        out.push_str(group);
        out.push('\n');
        for (name, value) in entries {
            if value.is_null() {
                continue;
            }
            out.push_str(&format!("    {} = {}\n", name, render_value(value)?));
        }
        out.push_str("/\n");
    }
    Ok(out)
}

fn render_value(value: &Value) -> Result<String> {
    match value {
        Value::Bool(true) => Ok(".true.".to_string()),
        Value::Bool(false) => Ok(".false.".to_string()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i.to_string())
            } else {
                match n.as_f64() {
                    // Debug keeps the decimal point f90 expects
                    Some(f) => Ok(format!("{f:?}")),
                    None => Err(Error::config(format!(
                        "cannot render number {n} as a namelist value"
                    ))),
                }
            }
        }
        Value::String(s) => Ok(format!("'{}'", s.replace('\'', "''"))),
        Value::Sequence(items) => {
            let rendered: Result<Vec<String>> = items.iter().map(render_value).collect();
            Ok(rendered?.join(", "))
        }
        other => Err(Error::config(format!(
            "cannot render {other:?} as a namelist value"
        ))),
    }
}

/// Read a namelist file into the nested mapping form.
pub fn read_namelist(path: &Path) -> Result<Namelist> {
    if !path.exists() {
        return Err(Error::InvalidFile {
            path: path.to_path_buf(),
            reason: "file does not exist".to_string(),
        });
    }
    let contents = std::fs::read_to_string(path)?;
    parse(&contents).map_err(|e| Error::InvalidFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// A configuration whose only content is the namelist read from `path`.
pub fn config_from_namelist(path: &Path) -> Result<Config> {
    let namelist = read_namelist(path)?;
    debug!(path = %path.display(), groups = namelist.len(), "Read namelist file");
    Ok(Config {
        namelist,
        ..Config::default()
    })
}

fn parse(contents: &str) -> Result<Namelist> {
    let mut namelist = Namelist::new();
    let mut current: Option<(String, NamelistGroup)> = None;
    for raw_line in contents.lines() {
        let line = match raw_line.find('!') {
            Some(idx) => raw_line[..idx].trim(),
            None => raw_line.trim(),
        };
        if line.is_empty() {
            continue;
        }
        if let Some(group) = line.strip_prefix('&') {
            if current.is_some() {
                return Err(Error::config(format!(
                    "namelist group {group:?} starts before the previous group ends"
                )));
            }
            current = Some((group.trim().to_string(), NamelistGroup::new()));
        } else if line == "/" {
            let (name, entries) = current.take().ok_or_else(|| {
                Error::config("namelist group terminator with no open group".to_string())
            })?;
            namelist.insert(name, entries);
        } else {
            let (_, entries) = current.as_mut().ok_or_else(|| {
                Error::config(format!("namelist entry {line:?} outside any group"))
            })?;
            let (name, value) = line.split_once('=').ok_or_else(|| {
                Error::config(format!("namelist line {line:?} is not a name = value pair"))
            })?;
            entries.insert(
                name.trim().to_string(),
                parse_value(value.trim().trim_end_matches(','))?,
            );
        }
    }
    if let Some((name, _)) = current {
        return Err(Error::config(format!(
            "namelist group {name:?} is not terminated"
        )));
    }
    Ok(namelist)
}

fn parse_value(raw: &str) -> Result<Value> {
    if raw.contains(',') {
        let items: Result<Vec<Value>> = raw
            .split(',')
            .map(|item| parse_scalar(item.trim()))
            .collect();
        return Ok(Value::Sequence(items?));
    }
    parse_scalar(raw)
}

fn parse_scalar(raw: &str) -> Result<Value> {
    match raw.to_ascii_lowercase().as_str() {
        ".true." | ".t." => return Ok(Value::Bool(true)),
        ".false." | ".f." => return Ok(Value::Bool(false)),
        _ => {}
    }
    if (raw.starts_with('\'') && raw.ends_with('\'') && raw.len() >= 2)
        || (raw.starts_with('"') && raw.ends_with('"') && raw.len() >= 2)
    {
        return Ok(Value::String(raw[1..raw.len() - 1].to_string()));
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Ok(Value::from(i));
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Ok(Value::from(f));
    }
    Err(Error::config(format!(
        "cannot parse namelist value {raw:?}"
    )))
}
