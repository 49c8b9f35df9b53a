use std::path::Path;

use fv3config::caching::{enable_remote_caching, set_cache_dir};
use fv3config::config::{date_to_value, AssetSource, Config, PatchFiles};
use fv3config::asset::{Asset, CopyMethod};
use fv3config::datastore::local_archive_dir;
use fv3config::rundir::{generate_asset_list, write_run_directory};
use fv3config::time_config::get_n_processes;
use serde_yaml::Value;
use serial_test::serial;
use tempfile::{tempdir, TempDir};

const DIAG_TABLE_DEFAULT: &str = "\
placeholder_name
0 0 0 0 0 0
\"atmos_dt_atmos\", 2, \"hours\", 1, \"hours\", \"time\"
\"dynamics\", \"u850\", \"UGRD850\", \"atmos_dt_atmos\", \"all\", .false., \"none\", 2
";

/// Lay out a minimal bundled-data archive beneath a temporary cache
/// directory so the built-in option names resolve.
fn seed_archive(cache: &TempDir) {
    set_cache_dir(cache.path());
    enable_remote_caching();
    let archive = local_archive_dir();
    let write = |relative: &str, contents: &str| {
        let path = archive.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    };
    write("diag_table/diag_table_default", DIAG_TABLE_DEFAULT);
    write("data_table/data_table_default", "data table contents\n");
    write("field_table/field_table_GFDLMP", "gfdl field table\n");
    write(
        "initial_conditions/gfs_initial_conditions/gfs_data.tile1.nc",
        "ic tile 1\n",
    );
    write(
        "initial_conditions/gfs_initial_conditions/sfc_data.tile1.nc",
        "sfc tile 1\n",
    );
    write("base_forcing/v1.1/grb/global_albedo.grb", "albedo\n");
    write("base_forcing/v1.1/aerosol.dat", "aerosol\n");
    write("orographic_data/v1.0/oro_data.tile1.nc", "oro tile 1\n");
}

fn default_config() -> Config {
    let mut config = Config::default();
    config.experiment_name = "default_experiment".to_string();
    config.set_namelist_value("fv_core_nml", "npx", Value::from(13));
    config.set_namelist_value("fv_core_nml", "npy", Value::from(13));
    config.set_namelist_value("fv_core_nml", "ntiles", Value::from(6));
    config.set_namelist_value(
        "fv_core_nml",
        "layout",
        Value::Sequence(vec![Value::from(1), Value::from(1)]),
    );
    config.set_namelist_value("gfs_physics_nml", "imp_physics", Value::from(11));
    config.set_namelist_value("gfs_physics_nml", "ncld", Value::from(5));
    config.set_namelist_value(
        "coupler_nml",
        "current_date",
        date_to_value([2016, 8, 1, 0, 0, 0]),
    );
    config
}

fn assert_default_layout(run_dir: &Path) {
    for name in [
        "input.nml",
        "data_table",
        "diag_table",
        "field_table",
        "fv3config.yml",
    ] {
        assert!(run_dir.join(name).is_file(), "{name} should exist");
    }
    assert!(run_dir.join("INPUT").is_dir());
    let restart = run_dir.join("RESTART");
    assert!(restart.is_dir());
    assert_eq!(
        std::fs::read_dir(&restart).unwrap().count(),
        0,
        "RESTART should be empty"
    );
}

#[tokio::test]
#[serial]
async fn minimal_default_build_produces_the_expected_layout() {
    let cache = tempdir().unwrap();
    seed_archive(&cache);
    let config = default_config();
    let run_dir = tempdir().unwrap();

    write_run_directory(&config, run_dir.path()).await.unwrap();
    assert_default_layout(run_dir.path());

    let diag_table = std::fs::read_to_string(run_dir.path().join("diag_table")).unwrap();
    let mut lines = diag_table.lines();
    assert_eq!(lines.next(), Some("default_experiment"));
    assert_eq!(lines.next(), Some("2016 8 1 0 0 0"));

    // initial conditions are copied below INPUT, orographic data linked there
    assert!(run_dir.path().join("INPUT/gfs_data.tile1.nc").is_file());
    let oro = run_dir.path().join("INPUT/oro_data.tile1.nc");
    assert!(oro.symlink_metadata().unwrap().file_type().is_symlink());

    // base forcing is linked at the top level, preserving subdirectories
    let albedo = run_dir.path().join("grb/global_albedo.grb");
    assert!(albedo.symlink_metadata().unwrap().file_type().is_symlink());
    assert!(run_dir.path().join("aerosol.dat").exists());

    let input_nml = std::fs::read_to_string(run_dir.path().join("input.nml")).unwrap();
    assert!(input_nml.contains("&fv_core_nml"));
    assert!(input_nml.contains("npx = 13"));

    assert_eq!(get_n_processes(&config), 6);
}

#[tokio::test]
#[serial]
async fn patch_files_overlay_the_assembled_directory() {
    let cache = tempdir().unwrap();
    seed_archive(&cache);
    let patch_source = tempdir().unwrap();
    std::fs::write(patch_source.path().join("empty_file"), b"").unwrap();

    let mut config = default_config();
    config.patch_files = Some(PatchFiles::Many(vec![Asset::file(
        patch_source.path().display().to_string(),
        "empty_file",
        "",
        "empty_file",
        CopyMethod::Copy,
    )]));
    let run_dir = tempdir().unwrap();

    write_run_directory(&config, run_dir.path()).await.unwrap();
    assert_default_layout(run_dir.path());
    assert!(run_dir.path().join("empty_file").is_file());
}

#[tokio::test]
#[serial]
async fn patch_files_override_earlier_assets_at_the_same_target() {
    let cache = tempdir().unwrap();
    seed_archive(&cache);
    let patch_source = tempdir().unwrap();
    std::fs::write(patch_source.path().join("aerosol.dat"), b"patched aerosol").unwrap();

    let mut config = default_config();
    config.patch_files = Some(PatchFiles::One(Asset::file(
        patch_source.path().display().to_string(),
        "aerosol.dat",
        "",
        "aerosol.dat",
        CopyMethod::Copy,
    )));
    let run_dir = tempdir().unwrap();

    // two assets share the aerosol.dat target: the base-forcing link and the
    // patch emitted after it
    let assets = generate_asset_list(&config).await.unwrap();
    let positions: Vec<usize> = assets
        .iter()
        .enumerate()
        .filter(|(_, asset)| asset.target_path() == Path::new("aerosol.dat"))
        .map(|(index, _)| index)
        .collect();
    assert_eq!(positions.len(), 2);

    write_run_directory(&config, run_dir.path()).await.unwrap();
    let target = run_dir.path().join("aerosol.dat");
    assert_eq!(std::fs::read(&target).unwrap(), b"patched aerosol");
    assert!(!target.symlink_metadata().unwrap().file_type().is_symlink());
}

#[tokio::test]
#[serial]
async fn generated_config_copy_round_trips() {
    let cache = tempdir().unwrap();
    seed_archive(&cache);
    let config = default_config();
    let run_dir = tempdir().unwrap();

    write_run_directory(&config, run_dir.path()).await.unwrap();
    let copied = std::fs::read_to_string(run_dir.path().join("fv3config.yml")).unwrap();
    let reloaded = fv3config::serialise::load_str(&copied).unwrap();
    assert_eq!(reloaded, config);
}

#[tokio::test]
#[serial]
async fn single_asset_initial_conditions_yield_that_asset() {
    let cache = tempdir().unwrap();
    seed_archive(&cache);
    let source = tempdir().unwrap();
    std::fs::write(source.path().join("gfs_data.nc"), b"custom ic").unwrap();

    let mut config = default_config();
    config.initial_conditions = AssetSource::One(Asset::file(
        source.path().display().to_string(),
        "gfs_data.nc",
        "INPUT",
        "gfs_data.nc",
        CopyMethod::Copy,
    ));
    let run_dir = tempdir().unwrap();

    write_run_directory(&config, run_dir.path()).await.unwrap();
    assert_eq!(
        std::fs::read(run_dir.path().join("INPUT/gfs_data.nc")).unwrap(),
        b"custom ic"
    );
}

#[tokio::test]
#[serial]
async fn built_in_options_without_the_archive_report_missing_data() {
    let cache = tempdir().unwrap();
    set_cache_dir(cache.path());
    enable_remote_caching();

    let config = default_config();
    let err = generate_asset_list(&config).await.unwrap_err();
    assert!(
        matches!(err, fv3config::error::Error::DataMissing(_)),
        "got {err:?}"
    );
}

#[tokio::test]
#[serial]
async fn unknown_microphysics_scheme_is_rejected() {
    let cache = tempdir().unwrap();
    seed_archive(&cache);
    let mut config = default_config();
    config.set_namelist_value("gfs_physics_nml", "imp_physics", Value::from(42));
    let err = generate_asset_list(&config).await.unwrap_err();
    assert!(matches!(err, fv3config::error::Error::Config(_)), "got {err:?}");
}
