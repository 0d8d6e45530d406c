//! Virtual filesystem boundary.
//!
//! The interpreter only ever talks to [`VirtualFs`]; the bundled
//! [`MemFs`] keeps everything in memory. Paths are POSIX-like and
//! `/`-rooted; callers resolve relative paths against the shell cwd
//! before crossing this boundary.

pub mod mem;
pub mod path;

use async_trait::async_trait;
use thiserror::Error;

pub use mem::MemFs;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VfsError {
    #[error("ENOENT: no such file or directory: {0}")]
    NotFound(String),
    #[error("EEXIST: file exists: {0}")]
    Exists(String),
    #[error("EISDIR: is a directory: {0}")]
    IsDirectory(String),
    #[error("ENOTDIR: not a directory: {0}")]
    NotDirectory(String),
    #[error("ENOTEMPTY: directory not empty: {0}")]
    NotEmpty(String),
    #[error("ELOOP: too many levels of symbolic links: {0}")]
    SymlinkLoop(String),
    #[error("EACCES: permission denied: {0}")]
    Denied(String),
    #[error("EINVAL: invalid argument: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    File,
    Dir,
    Symlink,
}

#[derive(Debug, Clone)]
pub struct Metadata {
    pub kind: FileKind,
    pub mode: u32,
    pub size: u64,
    /// Seconds since the epoch; virtual time, monotonic per mutation.
    pub mtime: u64,
}

impl Metadata {
    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Dir
    }

    pub fn is_symlink(&self) -> bool {
        self.kind == FileKind::Symlink
    }
}

/// Byte-level filesystem operations consumed by the shell core.
///
/// All paths must be absolute. Operations that open an existing object
/// follow symlinks; `lstat`, `readlink`, `unlink` and `symlink` operate
/// on the link itself.
#[async_trait]
pub trait VirtualFs: Send + Sync {
    async fn read(&self, path: &str) -> Result<Vec<u8>, VfsError>;
    /// Create or truncate. Parent directories are not created implicitly.
    async fn write(&self, path: &str, data: &[u8], mode: Option<u32>) -> Result<(), VfsError>;
    async fn append(&self, path: &str, data: &[u8]) -> Result<(), VfsError>;
    async fn stat(&self, path: &str) -> Result<Metadata, VfsError>;
    async fn lstat(&self, path: &str) -> Result<Metadata, VfsError>;
    async fn readdir(&self, path: &str) -> Result<Vec<String>, VfsError>;
    async fn mkdir(&self, path: &str, mode: u32, recursive: bool) -> Result<(), VfsError>;
    async fn rmdir(&self, path: &str) -> Result<(), VfsError>;
    async fn unlink(&self, path: &str) -> Result<(), VfsError>;
    async fn rename(&self, src: &str, dst: &str) -> Result<(), VfsError>;
    async fn chmod(&self, path: &str, mode: u32) -> Result<(), VfsError>;
    async fn symlink(&self, target: &str, link: &str) -> Result<(), VfsError>;
    async fn readlink(&self, path: &str) -> Result<String, VfsError>;
    /// Resolve symlinks in every component; errors with `SymlinkLoop`
    /// after the loop-protection cap.
    async fn canonicalize(&self, path: &str) -> Result<String, VfsError>;
}
