//! Concurrency primitives: the per-key mutex registry used to stripe cache
//! locks, panic containment for background tasks, and the dedicated worker
//! thread that drains deferred cleanup work.

pub mod mutexes;
pub mod unwind;
pub mod worker;

pub mod prelude {
    pub use super::mutexes::MutexRegistry;
    pub use super::worker::AsyncWorker;
}

pub use self::mutexes::MutexRegistry;
pub use self::worker::AsyncWorker;
