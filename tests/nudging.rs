use chrono::{Duration, NaiveDate};
use fv3config::asset::{Asset, CopyMethod};
use fv3config::config::{date_to_value, Config, GfsAnalysisData, PatchFiles};
use fv3config::error::Error;
use fv3config::nudging::{enable_nudging, get_nudging_assets};
use serde_yaml::Value;

fn nudged_config() -> Config {
    let mut config = Config::default();
    config.set_namelist_value("fv_core_nml", "nudge", Value::Bool(true));
    config.set_namelist_value(
        "coupler_nml",
        "current_date",
        date_to_value([2016, 1, 1, 1, 0, 0]),
    );
    config.set_namelist_value("coupler_nml", "seconds", Value::from(3600 * 6));
    config.gfs_analysis_data = Some(GfsAnalysisData {
        url: "/a/b".to_string(),
        filename_pattern: "%Y%m%d_%HZ.nc".to_string(),
        copy_method: None,
    });
    config
}

#[tokio::test]
async fn enable_nudging_sets_file_names_and_patch_files() {
    let config = nudged_config();
    let nudged = enable_nudging(&config).await.unwrap();

    let file_names = nudged
        .namelist_value("fv_nwp_nudge_nml", "file_names")
        .expect("file_names should be set");
    let expected = vec![
        "INPUT/20160101_00Z.nc",
        "INPUT/20160101_06Z.nc",
        "INPUT/20160101_12Z.nc",
    ];
    let names: Vec<&str> = file_names
        .as_sequence()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(names, expected);

    let patch_files = nudged.patch_file_assets();
    assert_eq!(patch_files.len(), 3);
    for (asset, expected_name) in patch_files.iter().zip([
        "20160101_00Z.nc",
        "20160101_06Z.nc",
        "20160101_12Z.nc",
    ]) {
        match asset {
            Asset::File {
                source_location,
                source_name,
                target_location,
                target_name,
                copy_method,
            } => {
                assert_eq!(source_location, "/a/b");
                assert_eq!(source_name, expected_name);
                assert_eq!(target_location, "INPUT");
                assert_eq!(target_name, expected_name);
                assert_eq!(*copy_method, CopyMethod::Copy);
            }
            other => panic!("expected a file asset, got {other:?}"),
        }
    }
    // input untouched
    assert!(config.patch_files.is_none());
}

#[tokio::test]
async fn enable_nudging_twice_does_not_duplicate_assets() {
    let config = nudged_config();
    let once = enable_nudging(&config).await.unwrap();
    let twice = enable_nudging(&once).await.unwrap();
    assert_eq!(twice.patch_file_assets().len(), 3);
}

#[tokio::test]
async fn enable_nudging_keeps_unrelated_patch_files() {
    let mut config = nudged_config();
    let unrelated = Asset::file("/tmp", "empty_file", "", "empty_file", CopyMethod::Copy);
    config.patch_files = Some(PatchFiles::One(unrelated.clone()));
    let nudged = enable_nudging(&config).await.unwrap();
    let patch_files = nudged.patch_file_assets();
    assert_eq!(patch_files.len(), 4);
    assert_eq!(patch_files[0], unrelated);
}

#[tokio::test]
async fn linking_from_a_remote_url_is_rejected() {
    let mut config = nudged_config();
    config.gfs_analysis_data = Some(GfsAnalysisData {
        url: "gs://bucket/analyses".to_string(),
        filename_pattern: "%Y%m%d_%HZ.nc".to_string(),
        copy_method: Some(CopyMethod::Link),
    });
    let err = enable_nudging(&config).await.unwrap_err();
    assert!(matches!(err, Error::Config(_)), "got {err:?}");
}

#[test]
fn window_enumeration_covers_run_plus_one_step() {
    let start = NaiveDate::from_ymd_opt(2016, 1, 1)
        .unwrap()
        .and_hms_opt(1, 0, 0)
        .unwrap();
    // 7 hours beyond the 00Z window start: analyses at 00, 06 and 12Z
    let assets = get_nudging_assets(
        Duration::hours(6),
        start,
        "/a/b",
        "%Y%m%d_%HZ.nc",
        CopyMethod::Copy,
    )
    .unwrap();
    assert_eq!(assets.len(), 3);

    // an exact 6-hour window starting on a synoptic hour needs two analyses
    let synoptic = NaiveDate::from_ymd_opt(2016, 1, 1)
        .unwrap()
        .and_hms_opt(6, 0, 0)
        .unwrap();
    let assets = get_nudging_assets(
        Duration::hours(6),
        synoptic,
        "/a/b",
        "%Y%m%d_%HZ.nc",
        CopyMethod::Copy,
    )
    .unwrap();
    let names: Vec<String> = assets
        .iter()
        .map(|asset| asset.target_path().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["INPUT/20160101_06Z.nc", "INPUT/20160101_12Z.nc"]);
}

#[tokio::test]
async fn nudging_requires_gfs_analysis_data() {
    let mut config = nudged_config();
    config.gfs_analysis_data = None;
    let err = enable_nudging(&config).await.unwrap_err();
    assert!(matches!(err, Error::Config(_)), "got {err:?}");
}
