//! Path normalization for cache keys.
//!
//! Every store normalizes incoming paths before using them as keys, so the
//! same resource addressed as `a//b/./res`, `a\b\res` or `/a/b/res` always
//! lands on one cache entry. Normalization is idempotent: cleaning a cleaned
//! path returns it unchanged.

use smallvec::SmallVec;

/// Normalizes a resource path: backslashes become separators, duplicate
/// separators and `.` components collapse, and leading/trailing separators
/// are stripped.
pub fn clean_path(path: &str) -> String {
    let mut components: SmallVec<[&str; 8]> = SmallVec::new();
    for component in path.split(|c| c == '/' || c == '\\') {
        if !component.is_empty() && component != "." {
            components.push(component);
        }
    }

    components.join("/")
}

/// Counts the separators of a cleaned path.
#[inline]
pub fn separators(path: &str) -> u64 {
    path.bytes().filter(|c| *c == b'/').count() as u64
}

/// Returns the name of the component containing the final component, if the
/// path nests deep enough to have one.
pub fn parent_component(path: &str) -> Option<&str> {
    let parent = &path[..path.rfind('/')?];
    parent.rsplit('/').next()
}
