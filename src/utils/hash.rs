use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{BuildHasherDefault, Hash, Hasher};

/// Fast hash map for internal usages.
pub type FastHashMap<K, V> = HashMap<K, V, BuildHasherDefault<DefaultHasher>>;

/// Fast hash set for internal usages.
pub type FastHashSet<K> = HashSet<K, BuildHasherDefault<DefaultHasher>>;

pub fn hash<T: Hash + ?Sized>(t: &T) -> u64 {
    let mut s = DefaultHasher::new();
    t.hash(&mut s);
    s.finish()
}
