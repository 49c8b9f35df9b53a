//! The diagnostics control file: parser, typed model, emitter and the
//! structured (dictionary) codec.
//!
//! The textual form is the Fortran model's line-oriented format: `#` starts
//! a comment, blank lines are ignored, the first two significant lines are
//! the experiment name and the base time, and every other line is a
//! comma-separated token list. Six tokens make a file line, eight tokens a
//! field line; any other length is ignored with a warning.
//!
//! Round-trip laws: `DiagTable::from_str(x.to_string()) == x` and
//! `DiagTable::from_dict(x.asdict()) == x`.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrequencyUnits {
    Years,
    Months,
    Days,
    Hours,
    Minutes,
    Seconds,
}

impl FrequencyUnits {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrequencyUnits::Years => "years",
            FrequencyUnits::Months => "months",
            FrequencyUnits::Days => "days",
            FrequencyUnits::Hours => "hours",
            FrequencyUnits::Minutes => "minutes",
            FrequencyUnits::Seconds => "seconds",
        }
    }
}

impl FromStr for FrequencyUnits {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "years" => Ok(FrequencyUnits::Years),
            "months" => Ok(FrequencyUnits::Months),
            "days" => Ok(FrequencyUnits::Days),
            "hours" => Ok(FrequencyUnits::Hours),
            "minutes" => Ok(FrequencyUnits::Minutes),
            "seconds" => Ok(FrequencyUnits::Seconds),
            other => Err(Error::config(format!("invalid frequency units {other:?}"))),
        }
    }
}

/// Output precision. Serialised as its integer value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packing {
    DoublePrecision,
    SinglePrecision,
}

impl Packing {
    pub fn as_int(&self) -> i64 {
        match self {
            Packing::DoublePrecision => 1,
            Packing::SinglePrecision => 2,
        }
    }

    pub fn from_int(value: i64) -> Result<Self> {
        match value {
            1 => Ok(Packing::DoublePrecision),
            2 => Ok(Packing::SinglePrecision),
            other => Err(Error::config(format!("invalid packing value {other}"))),
        }
    }
}

impl Serialize for Packing {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_int())
    }
}

impl<'de> Deserialize<'de> for Packing {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = i64::deserialize(deserializer)?;
        Packing::from_int(value).map_err(D::Error::custom)
    }
}

/// Output file format. NETCDF is the only supported value; serialised as 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileFormat {
    #[default]
    NetCDF,
}

impl FileFormat {
    pub fn as_int(&self) -> i64 {
        1
    }

    pub fn from_int(value: i64) -> Result<Self> {
        match value {
            1 => Ok(FileFormat::NetCDF),
            other => Err(Error::config(format!(
                "invalid file_format value {other}, only 1 (NETCDF) is supported"
            ))),
        }
    }
}

impl Serialize for FileFormat {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_int())
    }
}

impl<'de> Deserialize<'de> for FileFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = i64::deserialize(deserializer)?;
        FileFormat::from_int(value).map_err(D::Error::custom)
    }
}

fn default_time_sampling() -> String {
    "all".to_string()
}

fn default_none() -> String {
    "none".to_string()
}

fn default_packing() -> Packing {
    Packing::SinglePrecision
}

/// One diagnostic field within an output file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagFieldConfig {
    pub module_name: String,
    pub field_name: String,
    pub output_name: String,
    #[serde(default = "default_time_sampling")]
    pub time_sampling: String,
    #[serde(default = "default_none")]
    pub reduction_method: String,
    #[serde(default = "default_none")]
    pub regional_section: String,
    #[serde(default = "default_packing")]
    pub packing: Packing,
}

impl DiagFieldConfig {
    pub fn new(
        module_name: impl Into<String>,
        field_name: impl Into<String>,
        output_name: impl Into<String>,
        reduction_method: impl Into<String>,
    ) -> Self {
        DiagFieldConfig {
            module_name: module_name.into(),
            field_name: field_name.into(),
            output_name: output_name.into(),
            time_sampling: default_time_sampling(),
            reduction_method: reduction_method.into(),
            regional_section: default_none(),
            packing: default_packing(),
        }
    }
}

/// One output file and the fields written into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagFileConfig {
    pub name: String,
    pub frequency: i64,
    pub frequency_units: FrequencyUnits,
    #[serde(default)]
    pub field_configs: Vec<DiagFieldConfig>,
    #[serde(default)]
    pub file_format: FileFormat,
    pub time_axis_units: FrequencyUnits,
    #[serde(default = "default_time_axis_name")]
    pub time_axis_name: String,
}

fn default_time_axis_name() -> String {
    "time".to_string()
}

/// The diagnostics table: experiment name, base time, and the ordered
/// output files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagTable {
    pub name: String,
    /// Six integers `[Y, M, D, h, m, s]`.
    pub base_time: [i32; 6],
    #[serde(default)]
    pub file_configs: Vec<DiagFileConfig>,
}

impl DiagTable {
    pub fn new(
        name: impl Into<String>,
        base_time: [i32; 6],
        file_configs: Vec<DiagFileConfig>,
    ) -> Result<Self> {
        let table = DiagTable {
            name: name.into(),
            base_time,
            file_configs,
        };
        table.validate()?;
        Ok(table)
    }

    fn validate(&self) -> Result<()> {
        if self.name.contains(' ') {
            return Err(Error::config(format!(
                "diag_table name {:?} may not contain a space",
                self.name
            )));
        }
        Ok(())
    }

    /// The structured form: a plain mapping tree with enumerations as their
    /// integer values.
    pub fn asdict(&self) -> serde_yaml::Value {
        serde_yaml::to_value(self).expect("a DiagTable always serialises")
    }

    /// Inverse of [`DiagTable::asdict`], coercing enumerations from
    /// integers.
    pub fn from_dict(value: serde_yaml::Value) -> Result<Self> {
        let table: DiagTable = serde_yaml::from_value(value)
            .map_err(|e| Error::config(format!("invalid diag_table mapping: {e}")))?;
        table.validate()?;
        Ok(table)
    }
}

/// One decoded token of a comma-separated table line.
#[derive(Debug, Clone, PartialEq)]
enum Token {
    Str(String),
    Int(i64),
}

impl Token {
    fn parse(raw: &str) -> Result<Token> {
        let trimmed = raw.trim();
        if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
            return Ok(Token::Str(trimmed[1..trimmed.len() - 1].to_string()));
        }
        // legacy spelling of the reduction method
        match trimmed {
            ".true." => return Ok(Token::Str("average".to_string())),
            ".false." => return Ok(Token::Str("none".to_string())),
            _ => {}
        }
        trimmed
            .parse::<i64>()
            .map(Token::Int)
            .map_err(|_| Error::config(format!("unrecognised diag_table token {trimmed:?}")))
    }

    fn expect_str(&self, what: &str) -> Result<&str> {
        match self {
            Token::Str(s) => Ok(s.as_str()),
            Token::Int(i) => Err(Error::config(format!(
                "expected a quoted string for {what}, got {i}"
            ))),
        }
    }

    fn expect_int(&self, what: &str) -> Result<i64> {
        match self {
            Token::Int(i) => Ok(*i),
            Token::Str(s) => Err(Error::config(format!(
                "expected an integer for {what}, got {s:?}"
            ))),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Str(s) => write!(f, "\"{s}\""),
            Token::Int(i) => write!(f, "{i}"),
        }
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn parse_base_time(line: &str) -> Result<[i32; 6]> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() != 6 {
        return Err(Error::config(format!(
            "diag_table base time must be six integers, got {line:?}"
        )));
    }
    let mut date = [0i32; 6];
    for (slot, part) in date.iter_mut().zip(&parts) {
        *slot = part.parse().map_err(|_| {
            Error::config(format!("non-integer {part:?} in diag_table base time"))
        })?;
    }
    Ok(date)
}

fn parse_file_line(tokens: &[Token]) -> Result<DiagFileConfig> {
    let name = tokens[0].expect_str("file name")?.to_string();
    let frequency = tokens[1].expect_int("frequency")?;
    let frequency_units = tokens[2].expect_str("frequency units")?.parse()?;
    let file_format = FileFormat::from_int(tokens[3].expect_int("file format")?)?;
    let time_axis_units = tokens[4].expect_str("time axis units")?.parse()?;
    let time_axis_name = tokens[5].expect_str("time axis name")?.to_string();
    Ok(DiagFileConfig {
        name,
        frequency,
        frequency_units,
        field_configs: Vec::new(),
        file_format,
        time_axis_units,
        time_axis_name,
    })
}

fn parse_field_line(tokens: &[Token]) -> Result<(String, DiagFieldConfig)> {
    let module_name = tokens[0].expect_str("module name")?.to_string();
    let field_name = tokens[1].expect_str("field name")?.to_string();
    let output_name = tokens[2].expect_str("output name")?.to_string();
    let file_name = tokens[3].expect_str("file name")?.to_string();
    let time_sampling = tokens[4].expect_str("time sampling")?.to_string();
    let reduction_method = tokens[5].expect_str("reduction method")?.to_string();
    let regional_section = tokens[6].expect_str("regional section")?.to_string();
    let packing = Packing::from_int(tokens[7].expect_int("packing")?)?;
    Ok((
        file_name,
        DiagFieldConfig {
            module_name,
            field_name,
            output_name,
            time_sampling,
            reduction_method,
            regional_section,
            packing,
        },
    ))
}

impl FromStr for DiagTable {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut significant = s
            .lines()
            .enumerate()
            .map(|(number, line)| (number + 1, strip_comment(line).trim()))
            .filter(|(_, line)| !line.is_empty());

        let (_, name_line) = significant
            .next()
            .ok_or_else(|| Error::config("diag_table is empty".to_string()))?;
        let name = name_line.to_string();
        let (_, time_line) = significant
            .next()
            .ok_or_else(|| Error::config("diag_table is missing its base time".to_string()))?;
        let base_time = parse_base_time(time_line)?;

        let mut file_configs: Vec<DiagFileConfig> = Vec::new();
        for (number, line) in significant {
            let tokens = line
                .split(',')
                .map(Token::parse)
                .collect::<Result<Vec<Token>>>()?;
            match tokens.len() {
                6 => file_configs.push(parse_file_line(&tokens)?),
                8 => {
                    let (file_name, field) = parse_field_line(&tokens)?;
                    let file = file_configs
                        .iter_mut()
                        .find(|f| f.name == file_name)
                        .ok_or_else(|| {
                            Error::config(format!(
                                "line {number} of diag_table references file {file_name:?} \
                                 before any file line declares it"
                            ))
                        })?;
                    file.field_configs.push(field);
                }
                count => {
                    warn!(
                        line = number,
                        tokens = count,
                        "Ignoring diag_table line with unexpected token count"
                    );
                }
            }
        }

        DiagTable::new(name, base_time, file_configs)
    }
}

impl fmt::Display for DiagTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        let [y, mo, d, h, mi, s] = self.base_time;
        writeln!(f, "{y} {mo} {d} {h} {mi} {s}")?;
        for file in &self.file_configs {
            let tokens = [
                Token::Str(file.name.clone()),
                Token::Int(file.frequency),
                Token::Str(file.frequency_units.as_str().to_string()),
                Token::Int(file.file_format.as_int()),
                Token::Str(file.time_axis_units.as_str().to_string()),
                Token::Str(file.time_axis_name.clone()),
            ];
            writeln!(f, "{}", join_tokens(&tokens))?;
        }
        for file in &self.file_configs {
            for field in &file.field_configs {
                let tokens = [
                    Token::Str(field.module_name.clone()),
                    Token::Str(field.field_name.clone()),
                    Token::Str(field.output_name.clone()),
                    Token::Str(file.name.clone()),
                    Token::Str(field.time_sampling.clone()),
                    Token::Str(field.reduction_method.clone()),
                    Token::Str(field.regional_section.clone()),
                    Token::Int(field.packing.as_int()),
                ];
                writeln!(f, "{}", join_tokens(&tokens))?;
            }
        }
        Ok(())
    }
}

fn join_tokens(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(Token::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
