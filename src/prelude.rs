pub use crate::cache::{Cache, CacheStats, KeyedStore, PathStore, Sharer, StoreId};
pub use crate::concurrent::{AsyncWorker, MutexRegistry};
pub use crate::errors::Result;
pub use crate::loader::{
    BasicDefiner, Binding, ClassEntry, ClientId, DefineError, Definer, IsolatedLoader, LoaderError,
    LoaderId, MasterReset, Member, MemberHandle, MemberKind,
};
pub use crate::settings::{CacheSettings, Settings, WorkerSettings};
pub use crate::utils::{clean_path, SharedBytes};
pub use crate::vfs::{DirectoryFs, FileItem, Filesystem, FsDriver, ZipFs};
