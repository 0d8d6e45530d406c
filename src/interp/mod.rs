//! Tree-walking interpreter.
//!
//! The walker itself is synchronous; all async edges (virtual filesystem,
//! external commands) go through [`vfs_bridge::Host`]. One [`Interp`] is
//! borrowed per execution and carries the limits and the host; all shell
//! state lives in [`state::ShellState`] and is passed explicitly.

pub mod arith;
pub mod compound;
pub mod cond;
pub mod exec;
pub mod flow;
pub mod funcs;
pub mod redirect;
pub mod simple;
pub mod state;
pub mod traps;
pub mod vfs_bridge;

use std::time::Instant;

use self::state::ExecLimits;
use self::vfs_bridge::Host;

pub struct Interp<'h> {
    pub host: &'h Host,
    pub limits: &'h ExecLimits,
    pub deadline: Option<Instant>,
}

impl<'h> Interp<'h> {
    pub fn new(host: &'h Host, limits: &'h ExecLimits) -> Self {
        let deadline = limits
            .timeout_ms
            .map(|ms| Instant::now() + std::time::Duration::from_millis(ms));
        Interp { host, limits, deadline }
    }
}
