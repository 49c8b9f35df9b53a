pub mod alterations;
pub mod asset;
pub mod caching;
pub mod config;
pub mod datastore;
pub mod diag_table;
pub mod error;
pub mod location;
pub mod namelist;
pub mod nudging;
pub mod resolver;
pub mod rundir;
pub mod serialise;
pub mod time_config;

pub use alterations::{enable_restart, set_run_duration};
pub use asset::{write_asset, write_assets, Asset, CopyMethod};
pub use caching::{
    disable_remote_caching, enable_remote_caching, get_cache_dir, set_cache_dir, CacheSettings,
};
pub use config::{AssetSource, Config, DiagTableSource, GfsAnalysisData, PatchFiles};
pub use diag_table::{DiagFieldConfig, DiagFileConfig, DiagTable, FrequencyUnits, Packing};
pub use error::{Error, Result};
pub use location::Location;
pub use nudging::{enable_nudging, get_nudging_assets};
pub use rundir::{generate_asset_list, write_run_directory};
pub use serialise::{dump, dump_file, dump_str, load, load_file, load_str};
pub use time_config::{
    get_n_processes, get_resolution, get_run_duration, get_time_configuration,
};
