//! Script, statement and pipeline execution.
//!
//! `run_program` is the top boundary (converts every signal into an
//! outcome and fires the EXIT trap); `run_subshell` is the subshell
//! boundary (contains everything except execution limits). Pipelines
//! materialize each stage's stdout and feed it to the next stage, every
//! stage running on a cloned state.

use crate::ast::*;
use crate::interp::flow::{ExecOutcome, Interrupt, LimitKind};
use crate::interp::state::ShellState;
use crate::interp::Interp;

impl Interp<'_> {
    /// Run a whole program and always come back with a captured triple.
    pub fn run_program(&self, st: &mut ShellState, script: &Script) -> ExecOutcome {
        let mut outcome = match self.run_script(st, script) {
            Ok(out) => out,
            Err(int) => int.into_outcome(),
        };
        st.last_exit = outcome.exit_code;
        let (t_out, t_err) = self.fire_trap(st, "EXIT");
        outcome.stdout.push_str(&t_out);
        outcome.stderr.push_str(&t_err);
        outcome
    }

    pub(crate) fn run_script(
        &self,
        st: &mut ShellState,
        script: &Script,
    ) -> Result<ExecOutcome, Interrupt> {
        self.run_body(st, &script.statements)
    }

    pub(crate) fn run_body(
        &self,
        st: &mut ShellState,
        statements: &[Statement],
    ) -> Result<ExecOutcome, Interrupt> {
        let mut out = ExecOutcome::ok();
        for stmt in statements {
            match self.run_statement(st, stmt) {
                Ok(r) => {
                    out.absorb(r);
                    st.last_exit = out.exit_code;
                }
                Err(int) => return Err(int.prepend(&out.stdout, &out.stderr)),
            }
            if out.stdout.len() + out.stderr.len() > self.limits.max_output_bytes {
                return Err(
                    Interrupt::limit(LimitKind::OutputSize).prepend(&out.stdout, &out.stderr)
                );
            }
        }
        Ok(out)
    }

    /// Subshell boundary: state is already a clone; every signal except a
    /// limit resolves to an exit code here.
    pub(crate) fn run_subshell(
        &self,
        st: &mut ShellState,
        script: &Script,
    ) -> Result<ExecOutcome, Interrupt> {
        match self.run_script(st, script) {
            Ok(out) => Ok(out),
            Err(int @ Interrupt::Limit { .. }) => Err(int),
            Err(int) => Ok(int.into_outcome()),
        }
    }

    pub(crate) fn run_statement(
        &self,
        st: &mut ShellState,
        stmt: &Statement,
    ) -> Result<ExecOutcome, Interrupt> {
        let mut out = ExecOutcome::ok();
        if st.opts.verbose {
            if let Some(src) = &stmt.source {
                out.stderr.push_str(src);
                out.stderr.push('\n');
            }
        }
        if st.opts.noexec {
            return Ok(out);
        }

        if stmt.background {
            return self.run_background(st, stmt, out);
        }

        let mut code = 0;
        for (i, pipeline) in stmt.pipelines.iter().enumerate() {
            if i > 0 {
                let take = match stmt.connectors[i - 1] {
                    Connector::AndIf => code == 0,
                    Connector::OrIf => code != 0,
                    Connector::Seq => true,
                };
                if !take {
                    continue;
                }
            }
            // Everything left of a connector is an errexit guard.
            let guarded = i < stmt.connectors.len();
            let was_suspended = st.errexit_suspended;
            if guarded {
                st.errexit_suspended = true;
            }
            let result = self.run_pipeline(st, pipeline);
            st.errexit_suspended = was_suspended;
            let r = match result {
                Ok(r) => r,
                Err(int) => return Err(int.prepend(&out.stdout, &out.stderr)),
            };
            code = r.exit_code;
            out.absorb(r);
            st.last_exit = code;

            // `!` inverts the exit code (applied in run_pipeline) but does
            // not itself exempt the pipeline from errexit.
            if code != 0 && !guarded {
                let errexit_live = st.opts.errexit && !st.errexit_suspended;
                if st.traps.contains_key("ERR") && errexit_live {
                    let (t_out, t_err) = self.fire_trap(st, "ERR");
                    out.stdout.push_str(&t_out);
                    out.stderr.push_str(&t_err);
                }
                if errexit_live {
                    return Err(Interrupt::Errexit {
                        code,
                        streams: crate::interp::flow::Streams::new(out.stdout, out.stderr),
                    });
                }
            }
        }
        out.exit_code = code;
        Ok(out)
    }

    /// `cmd &` runs to completion now, but records a synthetic pid in
    /// `$!` and reports success for the statement itself.
    fn run_background(
        &self,
        st: &mut ShellState,
        stmt: &Statement,
        mut out: ExecOutcome,
    ) -> Result<ExecOutcome, Interrupt> {
        let pid = st.fresh_pid();
        st.last_bg_pid = pid;
        let mut sub = st.clone();
        sub.bash_pid = pid;
        let fg = Statement { background: false, ..stmt.clone() };
        let body = Script { statements: vec![fg] };
        let r = self.run_subshell(&mut sub, &body)?;
        st.next_pid = sub.next_pid;
        out.stdout.push_str(&r.stdout);
        out.stderr.push_str(&r.stderr);
        out.exit_code = 0;
        Ok(out)
    }

    pub(crate) fn run_pipeline(
        &self,
        st: &mut ShellState,
        pl: &Pipeline,
    ) -> Result<ExecOutcome, Interrupt> {
        let mut out = if pl.commands.len() == 1 {
            let r = self.run_command(st, &pl.commands[0])?;
            st.pipestatus = vec![r.exit_code];
            self.publish_pipestatus(st);
            r
        } else {
            self.run_staged_pipeline(st, pl)?
        };
        if pl.negated {
            out.exit_code = i32::from(out.exit_code == 0);
        }
        Ok(out)
    }

    fn run_staged_pipeline(
        &self,
        st: &mut ShellState,
        pl: &Pipeline,
    ) -> Result<ExecOutcome, Interrupt> {
        let mut carried_stdin = self.current_stdin(st);
        let mut stderr_acc = String::new();
        let mut codes = Vec::with_capacity(pl.commands.len());
        let mut final_stdout = String::new();

        for (i, cmd) in pl.commands.iter().enumerate() {
            let last = i == pl.commands.len() - 1;
            if last {
                // The final stage runs in the current shell, so its
                // assignments persist; only the pipe stdin and a fresh fd
                // table are scoped to it.
                let saved_stdin = std::mem::replace(&mut st.stdin, carried_stdin.clone());
                let saved_fds =
                    std::mem::replace(&mut st.fds, ShellState::default_fds());
                let result = self.run_command(st, cmd);
                st.fds = saved_fds;
                st.stdin = saved_stdin;
                let r = match result {
                    Ok(r) => r,
                    Err(int) => {
                        return Err(int.prepend("", &stderr_acc));
                    }
                };
                codes.push(r.exit_code);
                final_stdout = r.stdout;
                stderr_acc.push_str(&r.stderr);
                continue;
            }

            let mut stage = st.clone();
            stage.bash_pid = stage.fresh_pid();
            stage.stdin = carried_stdin.clone();
            stage.fds = ShellState::default_fds();

            let r = match self.run_command(&mut stage, cmd) {
                Ok(r) => r,
                Err(int @ Interrupt::Limit { .. }) => return Err(int),
                Err(int) => int.into_outcome(),
            };
            st.next_pid = stage.next_pid;

            codes.push(r.exit_code);
            let next_pipes_err = pl.stderr_pipes.get(i).copied().unwrap_or(false);
            if next_pipes_err {
                carried_stdin = format!("{}{}", r.stdout, r.stderr);
            } else {
                stderr_acc.push_str(&r.stderr);
                carried_stdin = r.stdout;
            }
        }

        let exit_code = if st.opts.pipefail {
            codes.iter().rev().find(|c| **c != 0).copied().unwrap_or(0)
        } else {
            *codes.last().unwrap_or(&0)
        };
        st.pipestatus = codes;
        self.publish_pipestatus(st);
        Ok(ExecOutcome { stdout: final_stdout, stderr: stderr_acc, exit_code })
    }

    fn publish_pipestatus(&self, st: &mut ShellState) {
        crate::expand::arrays::clear(st, "PIPESTATUS");
        let codes = st.pipestatus.clone();
        for (i, code) in codes.iter().enumerate() {
            crate::expand::arrays::set_indexed(st, "PIPESTATUS", i as i64, code.to_string());
        }
    }

    pub(crate) fn run_command(
        &self,
        st: &mut ShellState,
        cmd: &Command,
    ) -> Result<ExecOutcome, Interrupt> {
        self.charge_command(st)?;
        match cmd {
            Command::Simple(simple) => self.run_simple(st, simple),
            Command::Compound(compound) => self.run_compound(st, compound),
            Command::FuncDef(def) => {
                st.functions.insert(def.name.clone(), def.clone());
                Ok(ExecOutcome::ok())
            }
        }
    }

    /// Per-command limit accounting: command count and wall clock.
    pub(crate) fn charge_command(&self, st: &mut ShellState) -> Result<(), Interrupt> {
        st.command_count += 1;
        if st.command_count > self.limits.max_commands {
            return Err(Interrupt::limit(LimitKind::Commands));
        }
        if let Some(deadline) = self.deadline {
            if std::time::Instant::now() >= deadline {
                return Err(Interrupt::limit(LimitKind::WallClock));
            }
        }
        Ok(())
    }
}
