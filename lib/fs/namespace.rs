//! Flat namespace: every configured remote file sits under one root.

use std::collections::HashMap;

use range_client::{RangeError, RangeSource};
use tracing::{debug, info};

use super::InodeAddr;
use super::file::RemoteFile;

/// Inode address of the mount root directory.
pub const ROOT_INO: InodeAddr = 1;

/// One configured file: its name under the root and its remote URL.
#[derive(Debug, Clone)]
pub struct FileSpec {
    /// Name of the entry within the mount root.
    pub name: String,
    /// Remote range-addressable URL backing the entry.
    pub url: String,
}

/// A directory entry of the root, with its stable listing offset.
#[derive(Debug, Clone)]
pub struct RootEntry {
    /// Resume offset of the entry after this one (1-based position).
    pub offset: u64,
    /// Inode address of the entry.
    pub ino: InodeAddr,
    /// Entry name.
    pub name: String,
}

/// Failure to assemble the namespace at startup.
#[derive(Debug, thiserror::Error)]
pub enum AssembleError {
    /// Size discovery failed for a configured file.
    ///
    /// Fatal: the filesystem cannot report accurate attributes without
    /// knowing every file's size up front.
    #[error("failed to discover size of {name:?}")]
    SizeDiscovery {
        /// Name of the file whose size could not be resolved.
        name: String,
        #[source]
        source: RangeError,
    },

    /// Two configured files share the same name.
    #[error("duplicate file name {0:?}")]
    DuplicateName(String),
}

/// The assembled table of inodes: name and inode lookups plus the root
/// listing, all immutable after [`Namespace::assemble`].
pub struct Namespace<S: RangeSource> {
    by_name: HashMap<String, InodeAddr>,
    by_ino: HashMap<InodeAddr, RemoteFile<S>>,
    entries: Vec<RootEntry>,
}

impl<S: RangeSource> std::fmt::Debug for Namespace<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Namespace")
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

impl<S: RangeSource> Namespace<S> {
    /// Resolve every file's size through `source` and build the inode table.
    ///
    /// Inode addresses are assigned densely starting right after
    /// [`ROOT_INO`], in configuration order. Any size-discovery failure
    /// aborts the whole assembly.
    pub async fn assemble(
        source: S,
        specs: Vec<FileSpec>,
        block_size: u64,
    ) -> Result<Self, AssembleError> {
        let mut by_name = HashMap::with_capacity(specs.len());
        let mut by_ino = HashMap::with_capacity(specs.len());
        let mut entries = Vec::with_capacity(specs.len());

        for (i, spec) in specs.into_iter().enumerate() {
            let size = source.discover_size(&spec.url).await.map_err(|source| {
                AssembleError::SizeDiscovery {
                    name: spec.name.clone(),
                    source,
                }
            })?;
            debug!(name = %spec.name, size, "discovered file size");

            let ino = ROOT_INO + 1 + i as u64;
            if by_name.insert(spec.name.clone(), ino).is_some() {
                return Err(AssembleError::DuplicateName(spec.name));
            }
            entries.push(RootEntry {
                offset: i as u64 + 1,
                ino,
                name: spec.name.clone(),
            });
            by_ino.insert(
                ino,
                RemoteFile::new(spec.name, spec.url, size, block_size, source.clone()),
            );
        }

        info!(files = entries.len(), "namespace assembled");
        Ok(Self {
            by_name,
            by_ino,
            entries,
        })
    }

    /// Look up a file by name under the root.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<(InodeAddr, &RemoteFile<S>)> {
        let ino = *self.by_name.get(name)?;
        Some((ino, self.by_ino.get(&ino)?))
    }

    /// Look up a file by inode address.
    #[must_use]
    pub fn file(&self, ino: InodeAddr) -> Option<&RemoteFile<S>> {
        self.by_ino.get(&ino)
    }

    /// Root entries at and after `resume_offset`, in listing order.
    ///
    /// An offset at or past the end yields an empty slice, which is how a
    /// directory stream signals completion.
    #[must_use]
    pub fn entries_from(&self, resume_offset: u64) -> &[RootEntry] {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "entry counts fit in usize on supported 64-bit platforms"
        )]
        let skip = (resume_offset as usize).min(self.entries.len());
        &self.entries[skip..]
    }

    /// Number of files in the namespace.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.entries.len()
    }
}
