//! FUSE adapter: maps [`fuser::Filesystem`] callbacks to [`Namespace`](super::namespace::Namespace).

use std::ffi::OsStr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use range_client::RangeSource;
use tracing::{debug, error, instrument, warn};

use super::namespace::{Namespace, ROOT_INO};

/// Convert an I/O error to the corresponding errno value for FUSE replies.
#[expect(
    clippy::wildcard_enum_match_arm,
    reason = "ErrorKind is non_exhaustive; EIO is the safe default"
)]
fn io_to_errno(e: &std::io::Error) -> i32 {
    e.raw_os_error().unwrap_or_else(|| match e.kind() {
        std::io::ErrorKind::NotFound => libc::ENOENT,
        std::io::ErrorKind::PermissionDenied => libc::EACCES,
        std::io::ErrorKind::IsADirectory => libc::EISDIR,
        _ => libc::EIO,
    })
}

/// Trait abstracting the `.error(errno)` method common to all fuser reply types.
trait FuseReply {
    fn error(self, errno: i32);
}

macro_rules! impl_fuse_reply {
    ($($ty:ty),* $(,)?) => {
        $(impl FuseReply for $ty {
            fn error(self, errno: i32) {
                // Calls the inherent fuser method (not this trait method).
                self.error(errno);
            }
        })*
    };
}

// ReplyEmpty and ReplyStatfs are excluded: release and statfs
// cannot fail here.
impl_fuse_reply!(
    fuser::ReplyEntry,
    fuser::ReplyAttr,
    fuser::ReplyOpen,
    fuser::ReplyData,
);

/// Extension trait on `Result<T, std::io::Error>` for FUSE reply handling.
///
/// Centralizes the error-logging + errno-reply path so each FUSE callback
/// only has to express its success path.
trait FuseResultExt<T> {
    fn fuse_reply<R: FuseReply>(self, reply: R, on_ok: impl FnOnce(T, R));
}

impl<T> FuseResultExt<T> for Result<T, std::io::Error> {
    fn fuse_reply<R: FuseReply>(self, reply: R, on_ok: impl FnOnce(T, R)) {
        match self {
            Ok(val) => on_ok(val, reply),
            Err(e) => {
                debug!(error = %e, "replying error");
                reply.error(io_to_errno(&e));
            }
        }
    }
}

fn not_found() -> std::io::Error {
    std::io::Error::from_raw_os_error(libc::ENOENT)
}

/// All files are presented world-readable and owned by the default
/// unprivileged user; the remote objects carry no ownership of their own.
const FS_OWNER: (u32, u32) = (1000, 1000);
const FILE_MODE: u16 = 0o777;
const BLOCK_SIZE_HINT: u32 = 4096;
const ATTR_TTL: Duration = Duration::from_secs(1);

fn file_attr(ino: u64, size: u64) -> fuser::FileAttr {
    let now = SystemTime::now();
    fuser::FileAttr {
        ino,
        size,
        blocks: size.div_ceil(512),
        atime: now,
        mtime: now,
        ctime: now,
        crtime: now,
        kind: fuser::FileType::RegularFile,
        perm: FILE_MODE,
        nlink: 1,
        uid: FS_OWNER.0,
        gid: FS_OWNER.1,
        rdev: 0,
        blksize: BLOCK_SIZE_HINT,
        flags: 0,
    }
}

fn dir_attr() -> fuser::FileAttr {
    let now = SystemTime::now();
    fuser::FileAttr {
        ino: ROOT_INO,
        size: 0,
        blocks: 0,
        atime: now,
        mtime: now,
        ctime: now,
        crtime: now,
        kind: fuser::FileType::Directory,
        perm: FILE_MODE,
        nlink: 1,
        uid: FS_OWNER.0,
        gid: FS_OWNER.1,
        rdev: 0,
        blksize: BLOCK_SIZE_HINT,
        flags: 0,
    }
}

/// Bridges an assembled [`Namespace`] to the [`fuser::Filesystem`] trait.
///
/// The namespace is immutable after assembly, so callbacks only need shared
/// access; reads block on the runtime handle until the async side produces
/// the bytes. Mutating operations are left to fuser's defaults, which reply
/// `ENOSYS`.
pub struct FuserAdapter<S: RangeSource> {
    namespace: Arc<Namespace<S>>,
    runtime: tokio::runtime::Handle,
}

impl<S: RangeSource> FuserAdapter<S> {
    /// Create a new adapter over an assembled namespace.
    pub fn new(namespace: Arc<Namespace<S>>, runtime: tokio::runtime::Handle) -> Self {
        Self { namespace, runtime }
    }
}

impl<S: RangeSource> fuser::Filesystem for FuserAdapter<S> {
    #[instrument(name = "FuserAdapter::lookup", skip(self, _req, reply))]
    fn lookup(
        &mut self,
        _req: &fuser::Request<'_>,
        parent: u64,
        name: &OsStr,
        reply: fuser::ReplyEntry,
    ) {
        let found = (parent == ROOT_INO)
            .then(|| name.to_str())
            .flatten()
            .and_then(|name| self.namespace.lookup(name))
            .ok_or_else(not_found);

        found.fuse_reply(reply, |(ino, file), reply| {
            let attr = file_attr(ino, file.size());
            debug!(?attr, "replying...");
            reply.entry(&ATTR_TTL, &attr, 0);
        });
    }

    #[instrument(name = "FuserAdapter::getattr", skip(self, _req, _fh, reply))]
    fn getattr(
        &mut self,
        _req: &fuser::Request<'_>,
        ino: u64,
        _fh: Option<u64>,
        reply: fuser::ReplyAttr,
    ) {
        let attr = if ino == ROOT_INO {
            Ok(dir_attr())
        } else {
            self.namespace
                .file(ino)
                .map(|file| file_attr(ino, file.size()))
                .ok_or_else(not_found)
        };

        attr.fuse_reply(reply, |attr, reply| {
            debug!(?attr, "replying...");
            reply.attr(&ATTR_TTL, &attr);
        });
    }

    #[instrument(name = "FuserAdapter::readdir", skip(self, _req, _fh, offset, reply))]
    fn readdir(
        &mut self,
        _req: &fuser::Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: fuser::ReplyDirectory,
    ) {
        if ino != ROOT_INO {
            let errno = if self.namespace.file(ino).is_some() {
                libc::ENOTDIR
            } else {
                libc::ENOENT
            };
            debug!(errno, "replying error");
            reply.error(errno);
            return;
        }

        for entry in self.namespace.entries_from(offset.cast_unsigned()) {
            let Ok(next_offset) = i64::try_from(entry.offset) else {
                error!(offset = entry.offset, "directory offset too large for fuser");
                reply.error(libc::EIO);
                return;
            };

            debug!(name = %entry.name, ino = entry.ino, "adding entry to reply...");
            if reply.add(
                entry.ino,
                next_offset,
                fuser::FileType::RegularFile,
                &entry.name,
            ) {
                debug!("buffer full for now, stopping readdir");
                break;
            }
        }

        debug!("finalizing reply...");
        reply.ok();
    }

    #[instrument(name = "FuserAdapter::open", skip(self, _req, _flags, reply))]
    fn open(&mut self, _req: &fuser::Request<'_>, ino: u64, _flags: i32, reply: fuser::ReplyOpen) {
        let openable = if ino == ROOT_INO {
            Err(std::io::Error::from_raw_os_error(libc::EISDIR))
        } else if self.namespace.file(ino).is_none() {
            Err(not_found())
        } else {
            Ok(())
        };

        // Stateless handles: reads resolve the inode on every call, so
        // there is nothing to track per open.
        openable.fuse_reply(reply, |(), reply| {
            debug!("replying...");
            reply.opened(0, 0);
        });
    }

    #[instrument(
        name = "FuserAdapter::read",
        skip(self, _req, ino, _fh, offset, size, _flags, _lock_owner, reply)
    )]
    fn read(
        &mut self,
        _req: &fuser::Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: fuser::ReplyData,
    ) {
        let result = self.namespace.file(ino).ok_or_else(not_found).and_then(|file| {
            let offset = offset.cast_unsigned();
            let len = u64::from(size).min(file.size().saturating_sub(offset));
            self.runtime.block_on(file.read(offset, len)).map_err(|e| {
                warn!(ino, offset, error = %e, "remote read failed");
                std::io::Error::other(e)
            })
        });

        result.fuse_reply(reply, |data, reply| {
            debug!(read_bytes = data.len(), "replying...");
            reply.data(&data);
        });
    }

    #[instrument(
        name = "FuserAdapter::release",
        skip(self, _req, _ino, _fh, _flags, _lock_owner, _flush, reply)
    )]
    fn release(
        &mut self,
        _req: &fuser::Request<'_>,
        _ino: u64,
        _fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: fuser::ReplyEmpty,
    ) {
        debug!("replying ok");
        reply.ok();
    }

    #[instrument(name = "FuserAdapter::statfs", skip(self, _req, _ino, reply))]
    fn statfs(&mut self, _req: &fuser::Request<'_>, _ino: u64, reply: fuser::ReplyStatfs) {
        let total_blocks: u64 = 0;
        let files = self.namespace.file_count() as u64;
        debug!(files, "replying...");
        reply.statfs(
            total_blocks,
            0,
            0,
            files,
            0,
            BLOCK_SIZE_HINT,
            u32::try_from(libc::PATH_MAX).unwrap_or(255),
            0,
        );
    }
}
