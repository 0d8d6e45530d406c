//! Compound command execution: control flow, grouping, subshells.

use crate::ast::*;
use crate::interp::flow::{ExecOutcome, Interrupt, LimitKind, Streams};
use crate::interp::redirect::RedirOutcome;
use crate::interp::state::ShellState;
use crate::interp::Interp;

impl Interp<'_> {
    pub(crate) fn run_compound(
        &self,
        st: &mut ShellState,
        c: &Compound,
    ) -> Result<ExecOutcome, Interrupt> {
        let frame = match self.apply_redirs(st, redirs_of(c)) {
            Ok(RedirOutcome::Applied(frame)) => frame,
            Ok(RedirOutcome::Failed { frame, message }) => {
                frame.restore(st);
                return Ok(ExecOutcome::failure(message, 1));
            }
            Err(int) => return Err(int),
        };

        let result = self.compound_body(st, c);

        let routed = match result {
            Ok(r) => {
                let code = r.exit_code;
                let (o, e) = self.route_output(st, r.stdout, r.stderr);
                Ok(ExecOutcome { stdout: o, stderr: e, exit_code: code })
            }
            Err(mut int) => {
                let streams = int.streams_mut();
                let (o, e) = self.route_output(
                    st,
                    std::mem::take(&mut streams.stdout),
                    std::mem::take(&mut streams.stderr),
                );
                streams.stdout = o;
                streams.stderr = e;
                Err(int)
            }
        };
        frame.restore(st);
        let soft = std::mem::take(&mut st.expansion_stderr);

        match routed {
            // Hard expansion faults stop this command but not the script.
            Err(Interrupt::Fault { streams, .. }) => Ok(ExecOutcome {
                stdout: streams.stdout,
                stderr: format!("{soft}{}", streams.stderr),
                exit_code: 1,
            }),
            Ok(mut r) => {
                if !soft.is_empty() {
                    r.stderr = format!("{soft}{}", r.stderr);
                }
                Ok(r)
            }
            Err(int) => Err(int.prepend("", &soft)),
        }
    }

    fn compound_body(
        &self,
        st: &mut ShellState,
        c: &Compound,
    ) -> Result<ExecOutcome, Interrupt> {
        match c {
            Compound::If { arms, orelse, .. } => self.run_if(st, arms, orelse.as_deref()),
            Compound::For { var, words, body, .. } => {
                let items = match words {
                    Some(ws) => self.expand_words(st, ws)?,
                    None => st.positional.clone(),
                };
                self.run_for(st, var, &items, body)
            }
            Compound::ForArith { init, cond, step, body, .. } => {
                self.run_for_arith(st, init.as_ref(), cond.as_ref(), step.as_ref(), body)
            }
            Compound::While { cond, body, until, .. } => self.run_while(st, cond, body, *until),
            Compound::Case { word, items, .. } => self.run_case(st, word, items),
            Compound::Subshell { body, .. } => self.run_subshell_compound(st, body),
            Compound::Group { body, .. } => self.run_body(st, body),
            Compound::Arith { expr, line, .. } => {
                st.line = *line;
                match self.eval_arith(st, expr) {
                    Ok(v) => Ok(ExecOutcome::code(i32::from(v == 0))),
                    Err(Interrupt::Fault { streams, .. }) => Ok(ExecOutcome {
                        stdout: streams.stdout,
                        stderr: streams.stderr,
                        exit_code: 1,
                    }),
                    Err(other) => Err(other),
                }
            }
            Compound::Cond { expr, line, .. } => {
                st.line = *line;
                match self.eval_cond(st, expr) {
                    Ok(truth) => Ok(ExecOutcome::code(i32::from(!truth))),
                    Err(Interrupt::Fault { streams, .. }) => Ok(ExecOutcome {
                        stdout: streams.stdout,
                        stderr: streams.stderr,
                        exit_code: 1,
                    }),
                    Err(other) => Err(other),
                }
            }
        }
    }

    /// Condition lists run with errexit suspended.
    pub(crate) fn run_condition(
        &self,
        st: &mut ShellState,
        stmts: &[Statement],
    ) -> Result<ExecOutcome, Interrupt> {
        let saved = st.errexit_suspended;
        st.errexit_suspended = true;
        let r = self.run_body(st, stmts);
        st.errexit_suspended = saved;
        r
    }

    fn run_if(
        &self,
        st: &mut ShellState,
        arms: &[IfArm],
        orelse: Option<&[Statement]>,
    ) -> Result<ExecOutcome, Interrupt> {
        let mut out = ExecOutcome::ok();
        for arm in arms {
            let cond = match self.run_condition(st, &arm.cond) {
                Ok(r) => r,
                Err(int) => return Err(int.prepend(&out.stdout, &out.stderr)),
            };
            let took = cond.exit_code == 0;
            out.stdout.push_str(&cond.stdout);
            out.stderr.push_str(&cond.stderr);
            if took {
                match self.run_body(st, &arm.body) {
                    Ok(r) => {
                        out.absorb(r);
                        return Ok(out);
                    }
                    Err(int) => return Err(int.prepend(&out.stdout, &out.stderr)),
                }
            }
        }
        if let Some(body) = orelse {
            match self.run_body(st, body) {
                Ok(r) => out.absorb(r),
                Err(int) => return Err(int.prepend(&out.stdout, &out.stderr)),
            }
        } else {
            out.exit_code = 0;
        }
        Ok(out)
    }

    fn run_for(
        &self,
        st: &mut ShellState,
        var: &str,
        items: &[String],
        body: &[Statement],
    ) -> Result<ExecOutcome, Interrupt> {
        let mut out = ExecOutcome::ok();
        st.loop_depth += 1;
        let mut iterations = 0u64;
        let result = (|| -> Result<(), Interrupt> {
            for item in items {
                self.charge_iteration(&mut iterations)?;
                self.set_scalar(st, var, item.clone());
                st.last_arg = item.clone();
                match self.run_body(st, body) {
                    Ok(r) => out.absorb(r),
                    Err(int) => match self.loop_signal(st, int, &mut out)? {
                        LoopFlow::Break => break,
                        LoopFlow::Continue => continue,
                    },
                }
            }
            Ok(())
        })();
        st.loop_depth -= 1;
        result.map_err(|int| int.prepend(&out.stdout, &out.stderr))?;
        Ok(out)
    }

    fn run_for_arith(
        &self,
        st: &mut ShellState,
        init: Option<&ArithExpr>,
        cond: Option<&ArithExpr>,
        step: Option<&ArithExpr>,
        body: &[Statement],
    ) -> Result<ExecOutcome, Interrupt> {
        let mut out = ExecOutcome::ok();
        if let Some(e) = init {
            self.eval_arith(st, e)?;
        }
        st.loop_depth += 1;
        let mut iterations = 0u64;
        let result = (|| -> Result<(), Interrupt> {
            loop {
                let go = match cond {
                    Some(e) => self.eval_arith(st, e)? != 0,
                    None => true,
                };
                if !go {
                    break;
                }
                self.charge_iteration(&mut iterations)?;
                match self.run_body(st, body) {
                    Ok(r) => out.absorb(r),
                    Err(int) => match self.loop_signal(st, int, &mut out)? {
                        LoopFlow::Break => break,
                        LoopFlow::Continue => {}
                    },
                }
                if let Some(e) = step {
                    self.eval_arith(st, e)?;
                }
            }
            Ok(())
        })();
        st.loop_depth -= 1;
        result.map_err(|int| int.prepend(&out.stdout, &out.stderr))?;
        Ok(out)
    }

    fn run_while(
        &self,
        st: &mut ShellState,
        cond: &[Statement],
        body: &[Statement],
        until: bool,
    ) -> Result<ExecOutcome, Interrupt> {
        let mut out = ExecOutcome::ok();
        st.loop_depth += 1;
        let mut iterations = 0u64;
        let result = (|| -> Result<(), Interrupt> {
            loop {
                self.charge_iteration(&mut iterations)?;
                let c = self.run_condition(st, cond)?;
                let go = (c.exit_code == 0) != until;
                out.stdout.push_str(&c.stdout);
                out.stderr.push_str(&c.stderr);
                if !go {
                    break;
                }
                match self.run_body(st, body) {
                    Ok(r) => out.absorb(r),
                    Err(int) => match self.loop_signal(st, int, &mut out)? {
                        LoopFlow::Break => break,
                        LoopFlow::Continue => continue,
                    },
                }
            }
            Ok(())
        })();
        st.loop_depth -= 1;
        result.map_err(|int| int.prepend(&out.stdout, &out.stderr))?;
        // The loop itself succeeds unless the body's last run failed.
        Ok(out)
    }

    fn run_case(
        &self,
        st: &mut ShellState,
        word: &Word,
        items: &[CaseItem],
    ) -> Result<ExecOutcome, Interrupt> {
        let subject = self.expand_word_single(st, word)?;
        let opts = crate::expand::pattern::PatternOpts {
            extglob: st.shopts.extglob,
            nocase: st.shopts.nocasematch,
        };
        let mut out = ExecOutcome::ok();
        let mut fell_through = false;
        for (i, item) in items.iter().enumerate() {
            let matched = fell_through
                || {
                    let mut hit = false;
                    for pat in &item.patterns {
                        let text = self.expand_word_pattern(st, pat)?;
                        if crate::expand::pattern::matches(&text, &subject, opts) {
                            hit = true;
                            break;
                        }
                    }
                    hit
                };
            if !matched {
                continue;
            }
            match self.run_body(st, &item.body) {
                Ok(r) => out.absorb(r),
                Err(int) => return Err(int.prepend(&out.stdout, &out.stderr)),
            }
            match item.terminator {
                CaseTerm::Break => return Ok(out),
                CaseTerm::Fallthrough => {
                    fell_through = true;
                    if i == items.len() - 1 {
                        return Ok(out);
                    }
                }
                CaseTerm::Continue => {
                    fell_through = false;
                }
            }
        }
        Ok(out)
    }

    fn run_subshell_compound(
        &self,
        st: &mut ShellState,
        body: &[Statement],
    ) -> Result<ExecOutcome, Interrupt> {
        let mut sub = st.clone();
        sub.bash_pid = sub.fresh_pid();
        let script = Script { statements: body.to_vec() };
        let r = self.run_subshell(&mut sub, &script)?;
        st.next_pid = sub.next_pid;
        Ok(r)
    }

    fn charge_iteration(&self, iterations: &mut u64) -> Result<(), Interrupt> {
        *iterations += 1;
        if *iterations > self.limits.max_loop_iterations {
            return Err(Interrupt::limit(LimitKind::LoopIterations));
        }
        Ok(())
    }

    /// Translate a signal inside a loop body; rethrows anything that must
    /// unwind further (multi-level break, return, exit, limits).
    fn loop_signal(
        &self,
        _st: &mut ShellState,
        int: Interrupt,
        out: &mut ExecOutcome,
    ) -> Result<LoopFlow, Interrupt> {
        match int {
            Interrupt::Break { levels, streams } => {
                out.stdout.push_str(&streams.stdout);
                out.stderr.push_str(&streams.stderr);
                if levels > 1 {
                    Err(Interrupt::Break {
                        levels: levels - 1,
                        streams: Streams::new(
                            std::mem::take(&mut out.stdout),
                            std::mem::take(&mut out.stderr),
                        ),
                    })
                } else {
                    Ok(LoopFlow::Break)
                }
            }
            Interrupt::Continue { levels, streams } => {
                out.stdout.push_str(&streams.stdout);
                out.stderr.push_str(&streams.stderr);
                if levels > 1 {
                    Err(Interrupt::Continue {
                        levels: levels - 1,
                        streams: Streams::new(
                            std::mem::take(&mut out.stdout),
                            std::mem::take(&mut out.stderr),
                        ),
                    })
                } else {
                    Ok(LoopFlow::Continue)
                }
            }
            other => Err(other.prepend(&out.stdout, &out.stderr)),
        }
    }
}

enum LoopFlow {
    Break,
    Continue,
}

fn redirs_of(c: &Compound) -> &[Redir] {
    match c {
        Compound::If { redirs, .. }
        | Compound::For { redirs, .. }
        | Compound::ForArith { redirs, .. }
        | Compound::While { redirs, .. }
        | Compound::Case { redirs, .. }
        | Compound::Subshell { redirs, .. }
        | Compound::Group { redirs, .. }
        | Compound::Arith { redirs, .. }
        | Compound::Cond { redirs, .. } => redirs,
    }
}
