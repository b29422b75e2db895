extern crate crucible;

use std::sync::Arc;

use crucible::prelude::*;

#[test]
fn driver() {
    let driver = FsDriver::new();

    {
        assert!(!driver.exists("/res/foo/mock.prefab"));
        assert!(!driver.exists("/res//foo/mock.prefab"));
        assert!(!driver.exists("/res/./foo/mock.prefab"));

        let fs = ZipFs::new("tests/assets/mock.zip").unwrap();
        driver.mount("res", fs).unwrap();

        // canonicalized
        assert!(driver.exists("/res/foo/mock.prefab"));
        assert!(driver.exists("/res//foo/mock.prefab"));
        assert!(driver.exists("/res/./foo/mock.prefab"));

        driver.unmount("res");
        assert!(!driver.exists("/res/foo/mock.prefab"));
    }

    let fs = DirectoryFs::new("tests/assets").unwrap();
    driver.mount("res", fs).unwrap();

    let mut buf = Vec::new();
    driver.load_into("/res/mock.txt", &mut buf).unwrap();
    assert_eq!(String::from_utf8(buf).unwrap(), "Hello, World!");
}

#[test]
fn duplicated_mounts_are_rejected() {
    let driver = FsDriver::new();
    driver.mount("res", DirectoryFs::new("tests/assets").unwrap()).unwrap();
    assert!(driver.mount("res", DirectoryFs::new("tests/assets").unwrap()).is_err());
}

#[test]
fn dir() {
    assert!(DirectoryFs::new("tests/_invalid_path_").is_err());

    let fs = DirectoryFs::new("tests/assets").unwrap();
    assert!(fs.exists("mock.zip".as_ref()));
    assert!(fs.exists("mock.txt".as_ref()));

    let mut buf = Vec::new();
    fs.load_into("mock.txt".as_ref(), &mut buf).unwrap();
    assert_eq!(String::from_utf8(buf).unwrap(), "Hello, World!");
}

#[test]
fn zip() {
    assert!(ZipFs::new("tests/_invalid_path_").is_err());

    let fs = ZipFs::new("tests/assets/mock.zip").unwrap();
    assert!(fs.exists("foo/mock.prefab".as_ref()));
    assert!(!fs.is_empty());

    let mut buf = Vec::new();
    fs.load_into("foo/mock.prefab".as_ref(), &mut buf).unwrap();
    assert_eq!(String::from_utf8(buf).unwrap(), "mock");
}

#[test]
fn items_describe_their_probe() {
    let driver = FsDriver::new();
    driver.mount("res", DirectoryFs::new("tests/assets").unwrap()).unwrap();

    let item = driver.item("/res/mock.txt").unwrap();
    assert_eq!(item.path(), "res/mock.txt");
    assert_eq!(item.mount(), "res");
    assert!(item.exists());

    let missing = driver.item("res/absent.txt").unwrap();
    assert!(!missing.exists());

    assert!(driver.item("unmounted/mock.txt").is_none());
}

#[test]
fn archives_are_cached_process_wide() {
    let cache = Cache::new(&CacheSettings::default());

    let opened = cache
        .archives
        .get_or_compute_if_absent("tests/assets/mock.zip", || {
            ZipFs::new("tests/assets/mock.zip").ok().map(Arc::new)
        })
        .unwrap();

    let shared = cache.archives.get("tests/assets/mock.zip").unwrap();
    assert!(Arc::ptr_eq(&opened, &shared));
    assert_eq!(cache.archives.count(), 1);
}
