use fv3config::config::Namelist;
use fv3config::error::Error;
use fv3config::namelist::{config_from_namelist, read_namelist, render};
use serde_yaml::Value;
use tempfile::tempdir;

fn sample_namelist() -> Namelist {
    let mut namelist = Namelist::new();
    let coupler = namelist.entry("coupler_nml".to_string()).or_default();
    coupler.insert(
        "current_date".to_string(),
        Value::Sequence(
            [2016, 8, 1, 0, 0, 0]
                .iter()
                .map(|&i| Value::from(i))
                .collect(),
        ),
    );
    coupler.insert("days".to_string(), Value::from(1));
    coupler.insert("dt_atmos".to_string(), Value::from(900));
    let core = namelist.entry("fv_core_nml".to_string()).or_default();
    core.insert("warm_start".to_string(), Value::Bool(true));
    core.insert("external_ic".to_string(), Value::Bool(false));
    core.insert("res_latlon_dynamics".to_string(), Value::from("fv_rst.res.nc"));
    core.insert("consv_te".to_string(), Value::from(1.0));
    namelist
}

#[test]
fn renders_groups_and_typed_entries() {
    let text = render(&sample_namelist()).unwrap();
    assert!(text.contains("&coupler_nml\n"));
    assert!(text.contains("&fv_core_nml\n"));
    assert!(text.contains("    current_date = 2016, 8, 1, 0, 0, 0\n"));
    assert!(text.contains("    warm_start = .true.\n"));
    assert!(text.contains("    external_ic = .false.\n"));
    assert!(text.contains("    res_latlon_dynamics = 'fv_rst.res.nc'\n"));
    assert!(text.contains("    consv_te = 1.0\n"));
    assert!(text.ends_with("/\n"));
}

#[test]
fn empty_namelist_renders_to_an_empty_file() {
    assert_eq!(render(&Namelist::new()).unwrap(), "");
}

#[test]
fn rendered_namelist_parses_back() {
    let namelist = sample_namelist();
    let dir = tempdir().unwrap();
    let path = dir.path().join("input.nml");
    std::fs::write(&path, render(&namelist).unwrap()).unwrap();
    let reread = read_namelist(&path).unwrap();
    assert_eq!(reread, namelist);
}

#[test]
fn missing_namelist_file_is_an_invalid_file_error() {
    let dir = tempdir().unwrap();
    let err = read_namelist(&dir.path().join("absent.nml")).unwrap_err();
    assert!(matches!(err, Error::InvalidFile { .. }), "got {err:?}");
}

#[test]
fn config_from_namelist_wraps_the_parsed_groups() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("input.nml");
    std::fs::write(
        &path,
        "&fv_core_nml\n    npx = 13  ! grid points\n    nudge = .true.\n/\n",
    )
    .unwrap();
    let config = config_from_namelist(&path).unwrap();
    assert_eq!(config.namelist_i64("fv_core_nml", "npx"), Some(13));
    assert_eq!(config.namelist_bool("fv_core_nml", "nudge"), Some(true));
}
