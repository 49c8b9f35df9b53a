use fv3config::caching::{
    disable_remote_caching, enable_remote_caching, internal_cache_dir, set_cache_dir,
};
use fv3config::error::Error;
use fv3config::location::{memory_clear, memory_write, Location};
use serial_test::serial;
use tempfile::tempdir;

#[tokio::test]
#[serial]
async fn cached_read_is_stable_across_source_changes() {
    let cache = tempdir().unwrap();
    set_cache_dir(cache.path());
    enable_remote_caching();
    memory_clear();
    memory_write("memory://store/analysis.nc", b"original".to_vec());

    let location = Location::parse("memory://store/analysis.nc");
    let first = location.read().await.unwrap();
    assert_eq!(first, b"original");

    let mirror = internal_cache_dir()
        .join("memory")
        .join("store")
        .join("analysis.nc");
    assert!(mirror.exists());
    let mtime = mirror.metadata().unwrap().modified().unwrap();

    // the source changes, but a cache hit must not refetch or touch the mirror
    memory_write("memory://store/analysis.nc", b"changed".to_vec());
    let second = location.read().await.unwrap();
    assert_eq!(second, b"original");
    assert_eq!(mirror.metadata().unwrap().modified().unwrap(), mtime);
}

#[tokio::test]
#[serial]
async fn disabled_caching_passes_every_read_through() {
    let cache = tempdir().unwrap();
    set_cache_dir(cache.path());
    disable_remote_caching();
    memory_clear();
    memory_write("memory://store/analysis.nc", b"original".to_vec());

    let location = Location::parse("memory://store/analysis.nc");
    assert_eq!(location.read().await.unwrap(), b"original");
    memory_write("memory://store/analysis.nc", b"changed".to_vec());
    assert_eq!(location.read().await.unwrap(), b"changed");
    assert!(!internal_cache_dir().exists());

    enable_remote_caching();
}

#[tokio::test]
#[serial]
async fn bare_scheme_paths_cannot_be_cached() {
    let cache = tempdir().unwrap();
    set_cache_dir(cache.path());
    enable_remote_caching();
    memory_clear();

    let location = Location::parse("memory://store");
    let err = location.read().await.unwrap_err();
    assert!(matches!(err, Error::Config(_)), "got {err:?}");
}

#[tokio::test]
#[serial]
async fn get_file_reuses_the_mirror() {
    let cache = tempdir().unwrap();
    set_cache_dir(cache.path());
    enable_remote_caching();
    memory_clear();
    memory_write("memory://store/data.bin", b"bytes".to_vec());

    let target = tempdir().unwrap();
    let location = Location::parse("memory://store/data.bin");
    location
        .get_file(&target.path().join("data.bin"))
        .await
        .unwrap();
    memory_write("memory://store/data.bin", b"different".to_vec());
    location
        .get_file(&target.path().join("again.bin"))
        .await
        .unwrap();
    assert_eq!(
        std::fs::read(target.path().join("again.bin")).unwrap(),
        b"bytes"
    );
}
