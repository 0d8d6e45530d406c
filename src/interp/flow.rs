//! Control-flow signals and captured output.
//!
//! `break`, `continue`, `return` and `exit` unwind the tree walker as an
//! [`Interrupt`] carrying whatever output the aborted construct had
//! already produced; the handler that stops the unwind stitches those
//! streams back in. Hard faults (arithmetic, substitution, limits) ride
//! the same channel.

use thiserror::Error;

/// The captured triple every execution returns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExecOutcome {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ExecOutcome {
    pub fn ok() -> Self {
        ExecOutcome::default()
    }

    pub fn success(stdout: impl Into<String>) -> Self {
        ExecOutcome { stdout: stdout.into(), stderr: String::new(), exit_code: 0 }
    }

    pub fn failure(stderr: impl Into<String>, exit_code: i32) -> Self {
        ExecOutcome { stdout: String::new(), stderr: stderr.into(), exit_code }
    }

    pub fn code(exit_code: i32) -> Self {
        ExecOutcome { exit_code, ..Default::default() }
    }

    /// Fold another outcome's streams into this one, keeping its exit code.
    pub fn absorb(&mut self, other: ExecOutcome) {
        self.stdout.push_str(&other.stdout);
        self.stderr.push_str(&other.stderr);
        self.exit_code = other.exit_code;
    }
}

/// Output accumulated by a construct that was cut short.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Streams {
    pub stdout: String,
    pub stderr: String,
}

impl Streams {
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Streams { stdout: stdout.into(), stderr: stderr.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    Arith,
    BadSubst,
    Brace,
    Glob,
    Param,
    Redirect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    Commands,
    LoopIterations,
    Recursion,
    WallClock,
    OutputSize,
}

impl LimitKind {
    pub fn describe(&self) -> &'static str {
        match self {
            LimitKind::Commands => "maximum command count exceeded",
            LimitKind::LoopIterations => "maximum loop iterations exceeded",
            LimitKind::Recursion => "maximum recursion depth exceeded",
            LimitKind::WallClock => "execution timed out",
            LimitKind::OutputSize => "maximum output size exceeded",
        }
    }
}

/// Exit code for any exhausted execution limit.
pub const LIMIT_EXIT_CODE: i32 = 124;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Interrupt {
    #[error("break")]
    Break { levels: u32, streams: Streams },
    #[error("continue")]
    Continue { levels: u32, streams: Streams },
    #[error("return")]
    Return { code: i32, streams: Streams },
    #[error("exit")]
    Exit { code: i32, streams: Streams },
    #[error("errexit")]
    Errexit { code: i32, streams: Streams },
    #[error("{name}: unbound variable")]
    Unbound { name: String, streams: Streams },
    #[error("{message}")]
    Fault { kind: FaultKind, message: String, streams: Streams },
    #[error("{}", .kind.describe())]
    Limit { kind: LimitKind, streams: Streams },
}

impl Interrupt {
    pub fn unbound(name: impl Into<String>) -> Self {
        let name = name.into();
        let streams = Streams::new("", format!("bash: {name}: unbound variable\n"));
        Interrupt::Unbound { name, streams }
    }

    pub fn fault(kind: FaultKind, message: impl Into<String>) -> Self {
        let message = message.into();
        let streams = Streams::new("", format!("bash: {message}\n"));
        Interrupt::Fault { kind, message, streams }
    }

    pub fn limit(kind: LimitKind) -> Self {
        let streams = Streams::new("", format!("bash: {}\n", kind.describe()));
        Interrupt::Limit { kind, streams }
    }

    pub fn streams(&self) -> &Streams {
        match self {
            Interrupt::Break { streams, .. }
            | Interrupt::Continue { streams, .. }
            | Interrupt::Return { streams, .. }
            | Interrupt::Exit { streams, .. }
            | Interrupt::Errexit { streams, .. }
            | Interrupt::Unbound { streams, .. }
            | Interrupt::Fault { streams, .. }
            | Interrupt::Limit { streams, .. } => streams,
        }
    }

    pub fn streams_mut(&mut self) -> &mut Streams {
        match self {
            Interrupt::Break { streams, .. }
            | Interrupt::Continue { streams, .. }
            | Interrupt::Return { streams, .. }
            | Interrupt::Exit { streams, .. }
            | Interrupt::Errexit { streams, .. }
            | Interrupt::Unbound { streams, .. }
            | Interrupt::Fault { streams, .. }
            | Interrupt::Limit { streams, .. } => streams,
        }
    }

    /// Stitch output produced before the signal in front of whatever the
    /// signal already carries, then pass it along.
    pub fn prepend(mut self, stdout: &str, stderr: &str) -> Self {
        let s = self.streams_mut();
        s.stdout = format!("{stdout}{}", s.stdout);
        s.stderr = format!("{stderr}{}", s.stderr);
        self
    }

    /// The exit code this signal resolves to when it stops unwinding.
    pub fn exit_code(&self) -> i32 {
        match self {
            Interrupt::Break { .. } | Interrupt::Continue { .. } => 0,
            Interrupt::Return { code, .. }
            | Interrupt::Exit { code, .. }
            | Interrupt::Errexit { code, .. } => *code,
            Interrupt::Unbound { .. } | Interrupt::Fault { .. } => 1,
            Interrupt::Limit { .. } => LIMIT_EXIT_CODE,
        }
    }

    /// Convert into a final outcome (used when the signal reaches the top).
    pub fn into_outcome(self) -> ExecOutcome {
        let code = self.exit_code();
        let streams = match self {
            Interrupt::Break { streams, .. }
            | Interrupt::Continue { streams, .. }
            | Interrupt::Return { streams, .. }
            | Interrupt::Exit { streams, .. }
            | Interrupt::Errexit { streams, .. }
            | Interrupt::Unbound { streams, .. }
            | Interrupt::Fault { streams, .. }
            | Interrupt::Limit { streams, .. } => streams,
        };
        ExecOutcome { stdout: streams.stdout, stderr: streams.stderr, exit_code: code }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepend_keeps_order() {
        let i = Interrupt::Exit { code: 3, streams: Streams::new("late", "") };
        let i = i.prepend("early ", "");
        assert_eq!(i.streams().stdout, "early late");
        assert_eq!(i.exit_code(), 3);
    }

    #[test]
    fn limit_exit_code_is_124() {
        assert_eq!(Interrupt::limit(LimitKind::Commands).exit_code(), 124);
    }

    #[test]
    fn unbound_message_format() {
        let i = Interrupt::unbound("foo");
        assert_eq!(i.streams().stderr, "bash: foo: unbound variable\n");
    }
}
