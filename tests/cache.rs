extern crate crucible;
extern crate env_logger;
extern crate rand;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use crucible::prelude::*;

fn cache() -> Arc<Cache> {
    let _ = env_logger::try_init();
    Cache::new(&CacheSettings::default())
}

#[test]
fn supplier_runs_once_across_threads() {
    let store: Arc<PathStore<u32>> = Arc::new(PathStore::cloning(1));
    let calls = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = store.clone();
        let calls = calls.clone();
        handles.push(thread::spawn(move || {
            store
                .get_or_compute_if_absent("a/b/c/res", || {
                    thread::sleep(Duration::from_millis(50));
                    Some(calls.fetch_add(1, Ordering::SeqCst) as u32 + 1)
                })
                .unwrap()
        }));
    }

    let values: Vec<u32> = handles.into_iter().map(|v| v.join().unwrap()).collect();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(values.iter().all(|v| *v == values[0]));
    assert_eq!(store.count(), 1);
}

#[test]
fn distinct_paths_do_not_serialize() {
    // A slow computation of one path must not block another path: the slow
    // supplier holds its per-path lock while the fast path completes.
    let store: Arc<PathStore<u32>> = Arc::new(PathStore::cloning(1));
    let (tx, rx) = mpsc::channel();

    let slow = {
        let store = store.clone();
        thread::spawn(move || {
            store.get_or_compute_if_absent("a/b/slow", || {
                thread::sleep(Duration::from_millis(300));
                Some(1)
            })
        })
    };

    // Give the slow supplier a head start so it is holding its lock.
    thread::sleep(Duration::from_millis(50));

    {
        let store = store.clone();
        let tx = tx.clone();
        thread::spawn(move || {
            store.get_or_compute_if_absent("x/y/fast", || Some(2));
            tx.send(()).unwrap();
        });
    }

    rx.recv_timeout(Duration::from_millis(200))
        .expect("computing x/y/fast was blocked by a/b/slow");
    slow.join().unwrap();
}

#[test]
fn remove_forgets_and_recomputes() {
    let store: PathStore<u32> = PathStore::cloning(1);

    assert_eq!(store.get_or_compute_if_absent("a/b/res", || Some(1)), Some(1));
    assert_eq!(store.remove("a/b/res"), Some(1));
    assert_eq!(store.get("a/b/res"), None);

    let recomputed = AtomicUsize::new(0);
    let value = store.get_or_compute_if_absent("a/b/res", || {
        recomputed.fetch_add(1, Ordering::SeqCst);
        Some(2)
    });
    assert_eq!(value, Some(2));
    assert_eq!(recomputed.load(Ordering::SeqCst), 1);
}

#[test]
fn contents_store_shares_views() {
    let cache = cache();

    let loaded = cache
        .contents
        .get_or_compute_if_absent("res/data.bin", || Some(SharedBytes::from(vec![1u8, 2, 3, 4])))
        .unwrap();

    // Narrowing one view leaves the cached contents untouched.
    let narrowed = loaded.slice(0, 2);
    assert_eq!(narrowed.as_slice(), &[1, 2]);

    let again = cache.contents.get("res/data.bin").unwrap();
    assert_eq!(again.as_slice(), &[1, 2, 3, 4]);
}

#[test]
fn clear_excluding_preserves_named_stores() {
    let cache = cache();

    cache.contents.get_or_compute_if_absent("a/res", || Some(SharedBytes::from(vec![1u8])));
    cache
        .file_items
        .get_or_compute_if_absent("a/res", || Some(Arc::new(FileItem::new("a", "a/res", false))));

    cache.clear_excluding(&[StoreId::Contents]);
    assert_eq!(cache.contents.count(), 1);
    assert_eq!(cache.file_items.count(), 0);

    cache.close();
    assert_eq!(cache.contents.count(), 0);
}

#[test]
fn stress_random_churn() {
    let cache = cache();

    let (tx, rx) = mpsc::channel();
    let mut handles = Vec::new();
    for _ in 0..8 {
        let cache = cache.clone();
        let tx = tx.clone();
        let t = thread::spawn(move || {
            for i in 0..(rand::random::<usize>() % 512) {
                let path = format!("res/{}/item", i % 16);
                cache
                    .contents
                    .get_or_compute_if_absent(&path, || Some(SharedBytes::from(vec![i as u8])));

                if i % 7 == 0 {
                    cache.contents.remove(&path);
                }
            }

            tx.send(()).unwrap();
        });

        handles.push(t);
    }

    for _ in handles {
        rx.recv_timeout(Duration::from_secs(5)).expect("deadlock found!");
    }
}
