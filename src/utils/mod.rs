//! Commonly used utilities: fast hash collections, hashed string keys,
//! shared byte buffers and path normalization.

pub mod bytes;
pub mod hash;
pub mod hash_value;
pub mod path;

pub mod prelude {
    pub use super::bytes::SharedBytes;
    pub use super::hash::{hash, FastHashMap, FastHashSet};
    pub use super::hash_value::HashValue;
    pub use super::path::clean_path;
}

pub use self::bytes::SharedBytes;
pub use self::hash::{hash, FastHashMap, FastHashSet};
pub use self::hash_value::HashValue;
pub use self::path::clean_path;
