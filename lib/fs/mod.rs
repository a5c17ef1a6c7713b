//! Remote-file namespace and its FUSE surface.
/// Per-file read coordination over the block cache.
pub mod file;
/// FUSE adapter: maps [`fuser::Filesystem`] callbacks to [`namespace::Namespace`].
pub mod fuser;
/// Flat namespace of remote files under a single root.
pub mod namespace;

pub use file::RemoteFile;
pub use namespace::{AssembleError, FileSpec, Namespace, ROOT_INO, RootEntry};

/// Type representing an inode identifier.
pub type InodeAddr = u64;
