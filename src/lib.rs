//! shellbox - a sandboxed, in-process bash emulation.
//!
//! Scripts are parsed to an AST and evaluated against an in-memory virtual
//! filesystem; execution returns a captured `{stdout, stderr, exit code}`
//! triple. No processes are spawned and no host files are touched, which
//! makes executions deterministic and replayable.

pub mod ast;
pub mod builtins;
pub mod commands;
pub mod expand;
pub mod interp;
pub mod lexer;
pub mod parser;
pub mod shell;
pub mod vfs;

pub use interp::flow::{ExecOutcome, Interrupt};
pub use interp::state::{ExecLimits, ShellState};
pub use parser::{parse, SyntaxError};
pub use shell::{Shell, ShellConfig};
pub use vfs::{MemFs, VfsError, VirtualFs};
pub use commands::{Command, CommandContext, CommandRegistry};
