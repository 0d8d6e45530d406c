//! Function invocation: scope frames, positional binding, call stacks.

use crate::ast::FuncDef;
use crate::expand::arrays;
use crate::interp::flow::{ExecOutcome, Interrupt, LimitKind};
use crate::interp::redirect::RedirOutcome;
use crate::interp::state::{ScopeFrame, ShellState};
use crate::interp::Interp;

impl Interp<'_> {
    pub(crate) fn call_function(
        &self,
        st: &mut ShellState,
        def: &FuncDef,
        args: &[String],
    ) -> Result<ExecOutcome, Interrupt> {
        if st.call_depth + 1 > self.limits.max_depth {
            return Err(Interrupt::limit(LimitKind::Recursion));
        }
        st.call_depth += 1;
        st.scopes.push(ScopeFrame {
            saved: Default::default(),
            positional: std::mem::replace(&mut st.positional, args.to_vec()),
        });
        st.func_stack.push(def.name.clone());
        st.call_lines.push(st.line);
        st.source_stack.push(st.script_name.clone());
        publish_call_stack(st);

        // Function-level redirections apply around the whole body.
        let frame = match self.apply_redirs(st, &def.redirs) {
            Ok(RedirOutcome::Applied(frame)) => Some(frame),
            Ok(RedirOutcome::Failed { frame, message }) => {
                frame.restore(st);
                self.unwind_function(st);
                return Ok(ExecOutcome::failure(message, 1));
            }
            Err(int) => {
                self.unwind_function(st);
                return Err(int);
            }
        };

        let result = self.run_compound(st, &def.body);

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
        if let Some(frame) = frame {
            frame.restore(st);
        }

        let mut outcome = match routed {
            Ok(out) => Ok(out),
            Err(Interrupt::Return { code, streams }) => Ok(ExecOutcome {
                stdout: streams.stdout,
                stderr: streams.stderr,
                exit_code: code,
            }),
            Err(other) => Err(other),
        };

        if outcome.is_ok() && st.traps.contains_key("RETURN") {
            let (o, e) = self.fire_trap(st, "RETURN");
            if let Ok(out) = &mut outcome {
                out.stdout.push_str(&o);
                out.stderr.push_str(&e);
            }
        }

        self.unwind_function(st);
        outcome
    }

    /// Pop one function frame: locals restored, stacks shortened.
    fn unwind_function(&self, st: &mut ShellState) {
        if let Some(frame) = st.scopes.pop() {
            st.restore_scope(frame);
        }
        st.func_stack.pop();
        st.call_lines.pop();
        st.source_stack.pop();
        st.call_depth = st.call_depth.saturating_sub(1);
        publish_call_stack(st);
    }
}

/// Mirror the call stacks into FUNCNAME / BASH_LINENO / BASH_SOURCE.
pub(crate) fn publish_call_stack(st: &mut ShellState) {
    for name in ["FUNCNAME", "BASH_LINENO", "BASH_SOURCE"] {
        arrays::clear(st, name);
    }
    // FUNCNAME[0] is the innermost function.
    for (slot, idx) in (0..st.func_stack.len()).rev().enumerate() {
        let func = st.func_stack[idx].clone();
        let line = st.call_lines.get(idx).copied().unwrap_or(0).to_string();
        let source = st.source_stack.get(idx).cloned().unwrap_or_default();
        arrays::set_indexed(st, "FUNCNAME", slot as i64, func);
        arrays::set_indexed(st, "BASH_LINENO", slot as i64, line);
        arrays::set_indexed(st, "BASH_SOURCE", slot as i64, source);
    }
    if !st.func_stack.is_empty() {
        let slot = st.func_stack.len() as i64;
        let script = st.script_name.clone();
        arrays::set_indexed(st, "FUNCNAME", slot, "main".to_string());
        arrays::set_indexed(st, "BASH_SOURCE", slot, script);
    }
}
