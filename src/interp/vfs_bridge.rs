//! Sync facade over the async filesystem and command registry.
//!
//! The walker runs synchronously; every async call crosses here via
//! `tokio::task::block_in_place` + `Handle::block_on`, which requires the
//! multi-thread runtime the crate is built with.

use std::future::Future;
use std::sync::Arc;

use crate::commands::{CommandContext, CommandRegistry};
use crate::interp::flow::ExecOutcome;
use crate::vfs::{Metadata, VfsError, VirtualFs};

pub struct Host {
    pub fs: Arc<dyn VirtualFs>,
    pub commands: CommandRegistry,
    handle: tokio::runtime::Handle,
}

impl Host {
    pub fn new(
        fs: Arc<dyn VirtualFs>,
        commands: CommandRegistry,
        handle: tokio::runtime::Handle,
    ) -> Self {
        Host { fs, commands, handle }
    }

    pub fn block_on<F: Future>(&self, fut: F) -> F::Output {
        tokio::task::block_in_place(|| self.handle.block_on(fut))
    }

    // -- sync filesystem facade --------------------------------------------

    pub fn read(&self, path: &str) -> Result<Vec<u8>, VfsError> {
        self.block_on(self.fs.read(path))
    }

    pub fn read_to_string(&self, path: &str) -> Result<String, VfsError> {
        self.read(path).map(|b| String::from_utf8_lossy(&b).into_owned())
    }

    pub fn write(&self, path: &str, data: &[u8]) -> Result<(), VfsError> {
        self.block_on(self.fs.write(path, data, None))
    }

    pub fn append(&self, path: &str, data: &[u8]) -> Result<(), VfsError> {
        self.block_on(self.fs.append(path, data))
    }

    pub fn stat(&self, path: &str) -> Result<Metadata, VfsError> {
        self.block_on(self.fs.stat(path))
    }

    pub fn lstat(&self, path: &str) -> Result<Metadata, VfsError> {
        self.block_on(self.fs.lstat(path))
    }

    pub fn readdir(&self, path: &str) -> Result<Vec<String>, VfsError> {
        self.block_on(self.fs.readdir(path))
    }

    pub fn mkdir(&self, path: &str, recursive: bool) -> Result<(), VfsError> {
        self.block_on(self.fs.mkdir(path, 0o755, recursive))
    }

    pub fn unlink(&self, path: &str) -> Result<(), VfsError> {
        self.block_on(self.fs.unlink(path))
    }

    pub fn canonicalize(&self, path: &str) -> Result<String, VfsError> {
        self.block_on(self.fs.canonicalize(path))
    }

    pub fn exists(&self, path: &str) -> bool {
        self.stat(path).is_ok()
    }

    pub fn is_dir(&self, path: &str) -> bool {
        self.stat(path).map(|m| m.is_dir()).unwrap_or(false)
    }

    pub fn is_file(&self, path: &str) -> bool {
        self.stat(path).map(|m| m.is_file()).unwrap_or(false)
    }

    // -- external commands --------------------------------------------------

    /// Run a registered command; None when the name is unknown.
    pub fn run_command(&self, name: &str, ctx: CommandContext) -> Option<ExecOutcome> {
        let cmd = self.commands.get(name)?;
        Some(self.block_on(cmd.execute(ctx)))
    }
}
