//! Crucible is a runtime substrate for toolkits that generate, compile and
//! discard classes while the process is running. It solves two coupled
//! problems: loading every path-addressable resource at most once while
//! sharing the materialized value across threads, and tearing down
//! dynamically created class namespaces without pulling them out from under
//! live users.
//!
//! # Resources
//!
//! A _resource_ is any value addressed by a path: the raw contents of a file,
//! a descriptor of a virtual filesystem entry, an opened archive container,
//! or a reflective member looked up against a loader. Resources are held in
//! lazy stores that compute each value at most once and hand every reader a
//! shared view of the same materialization. The stores are partitioned by
//! path depth and lock-striped by path, so loading `a/b/texture` never waits
//! on a slow computation of `x/y/mesh`.
//!
//! # Loaders
//!
//! An [`IsolatedLoader`](loader::IsolatedLoader) is a disposable class
//! namespace. Compiled bytecode is staged into it, classes are defined
//! lazily on first load, and the namespace refuses to close while registered
//! clients still hold a claim on it. Ownership is explicit: callers register
//! themselves as clients and unregister when done, which gives deterministic
//! and observable teardown instead of relying on garbage collection.
//!
//! # Lifecycle
//!
//! The process-wide [`Cache`](cache::Cache) is created explicitly and passed
//! to every component that needs it. There are no hidden singletons: when a
//! loader closes, it purges its own entries from every loader-keyed store of
//! the cache it was created with, and nothing else.

#[macro_use]
extern crate failure;
#[macro_use]
extern crate log;

pub mod errors;

pub mod cache;
pub mod concurrent;
pub mod loader;
pub mod settings;
pub mod utils;
pub mod vfs;

pub mod prelude;
