//! rangefs shared library.

/// Caching primitives for rangefs.
pub mod cache;
/// Filesystem namespace, read coordination, and the FUSE surface.
pub mod fs;
