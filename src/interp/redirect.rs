//! Redirection frames over the fd table.
//!
//! Applying a redirection list saves the previous handle of every touched
//! fd; the frame restores them on every exit path. Files are opened
//! (created/truncated) at apply time; captured output is routed to the
//! final handles after the command ran.

use crate::ast::{Redir, RedirOp, RedirTarget};
use crate::interp::flow::Interrupt;
use crate::interp::state::{FdHandle, ShellState};
use crate::interp::Interp;
use crate::vfs::path as vpath;

/// Saved fd bindings to reinstate when the command ends.
#[derive(Debug, Default)]
pub struct FdFrame {
    saved: Vec<(i32, Option<FdHandle>)>,
}

impl FdFrame {
    fn save(&mut self, st: &mut ShellState, fd: i32, handle: FdHandle) {
        if !self.saved.iter().any(|(n, _)| *n == fd) {
            self.saved.push((fd, st.fds.get(&fd).cloned()));
        }
        st.fds.insert(fd, handle);
    }

    pub fn restore(self, st: &mut ShellState) {
        for (fd, old) in self.saved.into_iter().rev() {
            match old {
                Some(h) => {
                    st.fds.insert(fd, h);
                }
                None => {
                    st.fds.remove(&fd);
                }
            }
        }
    }
}

/// How a redirection list landed: applied, or failed with the message for
/// stderr (the frame still carries whatever was applied before the
/// failure, so the caller can unwind).
pub(crate) enum RedirOutcome {
    Applied(FdFrame),
    Failed { frame: FdFrame, message: String },
}

enum ApplyErr {
    Fail(String),
    Signal(Interrupt),
}

impl From<Interrupt> for ApplyErr {
    fn from(i: Interrupt) -> Self {
        ApplyErr::Signal(i)
    }
}

impl Interp<'_> {
    pub(crate) fn apply_redirs(
        &self,
        st: &mut ShellState,
        redirs: &[Redir],
    ) -> Result<RedirOutcome, Interrupt> {
        let mut frame = FdFrame::default();
        for redir in redirs {
            match self.apply_one(st, &mut frame, redir) {
                Ok(()) => {}
                Err(ApplyErr::Fail(message)) => {
                    return Ok(RedirOutcome::Failed { frame, message });
                }
                Err(ApplyErr::Signal(int)) => {
                    frame.restore(st);
                    return Err(int);
                }
            }
        }
        Ok(RedirOutcome::Applied(frame))
    }

    fn apply_one(
        &self,
        st: &mut ShellState,
        frame: &mut FdFrame,
        redir: &Redir,
    ) -> Result<(), ApplyErr> {
        let fd = match (redir.fd, &redir.fd_var) {
            (Some(n), _) => n,
            (None, Some(var)) => {
                let n = st.next_fd;
                st.next_fd += 1;
                st.set_cell(var.clone(), n.to_string());
                n
            }
            (None, None) => default_fd(redir.op),
        };

        let target_text = |interp: &Interp<'_>, st: &mut ShellState| -> Result<String, ApplyErr> {
            match &redir.target {
                RedirTarget::Word(w) => Ok(interp.expand_word_single(st, w)?),
                RedirTarget::HereDoc(_) => Ok(String::new()),
            }
        };

        match redir.op {
            RedirOp::In => {
                let raw = target_text(self, st)?;
                let path = vpath::absolutize(&st.cwd, &raw);
                match self.host.read_to_string(&path) {
                    Ok(content) => {
                        frame.save(st, fd, FdHandle::ReadBuf(content));
                        Ok(())
                    }
                    Err(_) => Err(ApplyErr::Fail(format!("bash: {raw}: No such file or directory\n"))),
                }
            }
            RedirOp::Out | RedirOp::Clobber | RedirOp::Append => {
                let raw = target_text(self, st)?;
                let path = vpath::absolutize(&st.cwd, &raw);
                if path == "/dev/null" {
                    frame.save(st, fd, FdHandle::Null);
                    return Ok(());
                }
                if self.host.is_dir(&path) {
                    return Err(ApplyErr::Fail(format!("bash: {raw}: Is a directory\n")));
                }
                let append = redir.op == RedirOp::Append;
                if !append {
                    if st.opts.noclobber
                        && redir.op != RedirOp::Clobber
                        && self.host.exists(&path)
                    {
                        return Err(ApplyErr::Fail(format!(
                            "bash: {raw}: cannot overwrite existing file\n"
                        )));
                    }
                    if let Err(e) = self.host.write(&path, b"") {
                        return Err(ApplyErr::Fail(format!("bash: {raw}: {e}\n")));
                    }
                } else if !self.host.exists(&path) {
                    if let Err(e) = self.host.write(&path, b"") {
                        return Err(ApplyErr::Fail(format!("bash: {raw}: {e}\n")));
                    }
                }
                frame.save(st, fd, FdHandle::File { path, append: true });
                Ok(())
            }
            RedirOp::OutErr | RedirOp::AppendErr => {
                let raw = target_text(self, st)?;
                let path = vpath::absolutize(&st.cwd, &raw);
                if path == "/dev/null" {
                    frame.save(st, 1, FdHandle::Null);
                    frame.save(st, 2, FdHandle::Null);
                    return Ok(());
                }
                if redir.op == RedirOp::OutErr {
                    if let Err(e) = self.host.write(&path, b"") {
                        return Err(ApplyErr::Fail(format!("bash: {raw}: {e}\n")));
                    }
                } else if !self.host.exists(&path) {
                    if let Err(e) = self.host.write(&path, b"") {
                        return Err(ApplyErr::Fail(format!("bash: {raw}: {e}\n")));
                    }
                }
                frame.save(st, 1, FdHandle::File { path: path.clone(), append: true });
                frame.save(st, 2, FdHandle::File { path, append: true });
                Ok(())
            }
            RedirOp::OutDup | RedirOp::InDup => {
                let raw = target_text(self, st)?;
                let spec = raw.trim();
                if spec == "-" {
                    frame.save(st, fd, FdHandle::Closed);
                    return Ok(());
                }
                if let Ok(src) = spec.parse::<i32>() {
                    let handle = match st.fds.get(&src) {
                        Some(h) => h.clone(),
                        None => {
                            return Err(ApplyErr::Fail(format!(
                                "bash: {src}: bad file descriptor\n"
                            )))
                        }
                    };
                    frame.save(st, fd, handle);
                    return Ok(());
                }
                if redir.op == RedirOp::OutDup {
                    // `>&file` legacy form: both streams to the file.
                    let path = vpath::absolutize(&st.cwd, spec);
                    if let Err(e) = self.host.write(&path, b"") {
                        return Err(ApplyErr::Fail(format!("bash: {spec}: {e}\n")));
                    }
                    frame.save(st, 1, FdHandle::File { path: path.clone(), append: true });
                    frame.save(st, 2, FdHandle::File { path, append: true });
                    Ok(())
                } else {
                    Err(ApplyErr::Fail(format!("bash: {spec}: ambiguous redirect\n")))
                }
            }
            RedirOp::ReadWrite => {
                let raw = target_text(self, st)?;
                let path = vpath::absolutize(&st.cwd, &raw);
                if !self.host.exists(&path) {
                    if let Err(e) = self.host.write(&path, b"") {
                        return Err(ApplyErr::Fail(format!("bash: {raw}: {e}\n")));
                    }
                }
                frame.save(st, fd, FdHandle::ReadWrite { path });
                Ok(())
            }
            RedirOp::HereString => {
                let raw = target_text(self, st)?;
                frame.save(st, fd, FdHandle::ReadBuf(format!("{raw}\n")));
                Ok(())
            }
            RedirOp::HereDoc | RedirOp::HereDocDash => {
                let body = match &redir.target {
                    RedirTarget::HereDoc(h) => {
                        if h.quoted {
                            match &h.body.parts.first() {
                                Some(crate::ast::WordPart::Literal(s)) => s.clone(),
                                _ => String::new(),
                            }
                        } else {
                            self.expand_word_single(st, &h.body)?
                        }
                    }
                    RedirTarget::Word(_) => String::new(),
                };
                frame.save(st, fd, FdHandle::ReadBuf(body));
                Ok(())
            }
        }
    }

    /// What the current fd 0 reads as.
    pub(crate) fn current_stdin(&self, st: &ShellState) -> String {
        match st.fds.get(&0) {
            Some(FdHandle::ReadBuf(s)) => s.clone(),
            Some(FdHandle::Stdin) => st.stdin.clone(),
            Some(FdHandle::ReadWrite { path }) => {
                self.host.read_to_string(path).unwrap_or_default()
            }
            _ => String::new(),
        }
    }

    /// Route captured output through fds 1 and 2; returns the text that
    /// continues to the outer captures.
    pub(crate) fn route_output(
        &self,
        st: &mut ShellState,
        stdout_text: String,
        stderr_text: String,
    ) -> (String, String) {
        let mut out = String::new();
        let mut err = String::new();
        for (text, fd) in [(stdout_text, 1), (stderr_text, 2)] {
            if text.is_empty() {
                continue;
            }
            match st.fds.get(&fd).cloned() {
                None | Some(FdHandle::Closed) | Some(FdHandle::Null) => {}
                Some(FdHandle::Stdout) => out.push_str(&text),
                Some(FdHandle::Stderr) => err.push_str(&text),
                Some(FdHandle::File { path, .. }) | Some(FdHandle::ReadWrite { path }) => {
                    let _ = self.host.append(&path, text.as_bytes());
                }
                Some(FdHandle::ReadBuf(_)) | Some(FdHandle::Stdin) => {}
            }
        }
        (out, err)
    }
}

fn default_fd(op: RedirOp) -> i32 {
    match op {
        RedirOp::In
        | RedirOp::InDup
        | RedirOp::ReadWrite
        | RedirOp::HereString
        | RedirOp::HereDoc
        | RedirOp::HereDocDash => 0,
        _ => 1,
    }
}
