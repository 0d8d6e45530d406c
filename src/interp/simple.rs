//! Simple command execution: assignments, name resolution, dispatch.
//!
//! Resolution order is functions, then builtins, then the external
//! registry; a name containing `/` runs as a script file from the vfs.
//! Expansion faults are contained here: the command fails, the script
//! goes on.

use crate::ast::*;
use crate::commands::CommandContext;
use crate::expand::arrays;
use crate::interp::flow::{ExecOutcome, FaultKind, Interrupt};
use crate::interp::redirect::RedirOutcome;
use crate::interp::state::ShellState;
use crate::interp::Interp;
use crate::vfs::path as vpath;

impl Interp<'_> {
    pub(crate) fn run_simple(
        &self,
        st: &mut ShellState,
        cmd: &SimpleCmd,
    ) -> Result<ExecOutcome, Interrupt> {
        st.line = cmd.line;
        st.expansion_exit = None;

        let mut pre = ExecOutcome::ok();
        if st.traps.contains_key("DEBUG") {
            let (o, e) = self.fire_trap(st, "DEBUG");
            pre.stdout.push_str(&o);
            pre.stderr.push_str(&e);
        }

        // Expand the command name and arguments.
        let mut argv: Vec<String> = Vec::new();
        if let Some(name) = &cmd.name {
            let expanded = (|| -> Result<(), Interrupt> {
                argv.extend(self.expand_word_fields(st, name)?);
                for arg in &cmd.args {
                    argv.extend(self.expand_word_fields(st, arg)?);
                }
                Ok(())
            })();
            if let Err(int) = expanded {
                return self.contain_fault(st, int, pre);
            }
        }

        if argv.is_empty() {
            return self.run_assignments_only(st, cmd, pre);
        }

        if st.opts.xtrace {
            pre.stderr.push_str(&xtrace_line(&argv));
        }

        // Prefix assignments become temporary bindings for this command.
        let mut temp_saves: Vec<(String, Option<String>, bool)> = Vec::new();
        for a in &cmd.assignments {
            temp_saves.push((
                a.name.clone(),
                st.cell(&a.name).map(str::to_string),
                st.exported.contains(&a.name),
            ));
            if let Err(int) = self.apply_assignment(st, a) {
                restore_temp_env(st, temp_saves);
                return self.contain_fault(st, int, pre);
            }
            st.exported.insert(a.name.clone());
        }

        let frame = match self.apply_redirs(st, &cmd.redirs) {
            Ok(RedirOutcome::Applied(frame)) => frame,
            Ok(RedirOutcome::Failed { frame, message }) => {
                frame.restore(st);
                restore_temp_env(st, temp_saves);
                let mut out = self.drain_expansion(st, pre);
                out.stderr.push_str(&message);
                out.exit_code = 1;
                return Ok(out);
            }
            Err(int) => {
                restore_temp_env(st, temp_saves);
                return self.contain_fault(st, int, pre);
            }
        };

        let name = argv[0].clone();
        let args: Vec<String> = argv[1..].to_vec();
        st.last_arg = argv.last().cloned().unwrap_or_default();

        let result = self.dispatch_command(st, &name, &args);

        // Route captured output through the fd table, then unwind.
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
        restore_temp_env(st, temp_saves);
        let procsub_err = self.drain_procsubs(st);

        match routed {
            Ok(r) => {
                let mut out = self.drain_expansion(st, pre);
                out.absorb(r);
                out.stderr.push_str(&procsub_err);
                Ok(out)
            }
            Err(int) => {
                let drained = self.drain_expansion(st, pre);
                Err(int.prepend(&drained.stdout, &drained.stderr))
            }
        }
    }

    fn dispatch_command(
        &self,
        st: &mut ShellState,
        name: &str,
        args: &[String],
    ) -> Result<ExecOutcome, Interrupt> {
        if let Some(def) = st.functions.get(name).cloned() {
            return self.call_function(st, &def, args);
        }
        if let Some(result) = crate::builtins::dispatch(self, st, name, args) {
            return result;
        }
        if name.contains('/') {
            return self.run_script_file(st, name, args);
        }
        self.run_external(st, name, args)
    }

    pub(crate) fn run_external(
        &self,
        st: &mut ShellState,
        name: &str,
        args: &[String],
    ) -> Result<ExecOutcome, Interrupt> {
        let mut argv = vec![name.to_string()];
        argv.extend(args.iter().cloned());
        let ctx = CommandContext {
            argv,
            stdin: self.current_stdin(st),
            cwd: st.cwd.clone(),
            env: st.exported_env(),
            fs: self.host.fs.clone(),
        };
        match self.host.run_command(name, ctx) {
            Some(out) => Ok(out),
            None => Ok(ExecOutcome::failure(
                format!("bash: {name}: command not found\n"),
                127,
            )),
        }
    }

    /// `./script.sh args...` runs a file from the vfs as a child
    /// shell: own positionals, nothing leaks back.
    fn run_script_file(
        &self,
        st: &mut ShellState,
        name: &str,
        args: &[String],
    ) -> Result<ExecOutcome, Interrupt> {
        let path = vpath::absolutize(&st.cwd, name);
        let meta = match self.host.stat(&path) {
            Ok(m) => m,
            Err(_) => {
                return Ok(ExecOutcome::failure(
                    format!("bash: {name}: No such file or directory\n"),
                    127,
                ))
            }
        };
        if meta.is_dir() {
            return Ok(ExecOutcome::failure(format!("bash: {name}: Is a directory\n"), 126));
        }
        if meta.mode & 0o111 == 0 {
            return Ok(ExecOutcome::failure(
                format!("bash: {name}: Permission denied\n"),
                126,
            ));
        }
        let source = match self.host.read_to_string(&path) {
            Ok(s) => s,
            Err(e) => return Ok(ExecOutcome::failure(format!("bash: {name}: {e}\n"), 126)),
        };
        let script = match crate::parser::parse(&source) {
            Ok(s) => s,
            Err(e) => {
                return Ok(ExecOutcome::failure(
                    format!("bash: {name}: line {}: {}\n", e.line, e.message),
                    2,
                ))
            }
        };
        let mut sub = st.clone();
        sub.script_name = name.to_string();
        sub.positional = args.to_vec();
        sub.bash_pid = sub.fresh_pid();
        sub.stdin = self.current_stdin(st);
        sub.call_depth += 1;
        if sub.call_depth > self.limits.max_depth {
            return Err(Interrupt::limit(crate::interp::flow::LimitKind::Recursion));
        }
        let r = self.run_subshell(&mut sub, &script)?;
        st.next_pid = sub.next_pid;
        Ok(r)
    }

    fn run_assignments_only(
        &self,
        st: &mut ShellState,
        cmd: &SimpleCmd,
        pre: ExecOutcome,
    ) -> Result<ExecOutcome, Interrupt> {
        for a in &cmd.assignments {
            if let Err(int) = self.apply_assignment(st, a) {
                return self.contain_fault(st, int, pre);
            }
        }
        // Redirections alone still open/create their targets.
        let frame = match self.apply_redirs(st, &cmd.redirs) {
            Ok(RedirOutcome::Applied(frame)) => frame,
            Ok(RedirOutcome::Failed { frame, message }) => {
                frame.restore(st);
                let mut out = self.drain_expansion(st, pre);
                out.stderr.push_str(&message);
                out.exit_code = 1;
                return Ok(out);
            }
            Err(int) => return self.contain_fault(st, int, pre),
        };
        frame.restore(st);
        let code = st.expansion_exit.take().unwrap_or(0);
        let mut out = self.drain_expansion(st, pre);
        out.exit_code = code;
        Ok(out)
    }

    /// Contained failure: faults stop the command, not the script.
    pub(crate) fn contain_fault(
        &self,
        st: &mut ShellState,
        int: Interrupt,
        pre: ExecOutcome,
    ) -> Result<ExecOutcome, Interrupt> {
        match int {
            Interrupt::Fault { streams, .. } => {
                let mut out = self.drain_expansion(st, pre);
                out.stdout.push_str(&streams.stdout);
                out.stderr.push_str(&streams.stderr);
                out.exit_code = 1;
                Ok(out)
            }
            other => {
                let drained = self.drain_expansion(st, pre);
                Err(other.prepend(&drained.stdout, &drained.stderr))
            }
        }
    }

    /// Move accumulated soft-expansion stderr into the command's capture.
    pub(crate) fn drain_expansion(&self, st: &mut ShellState, pre: ExecOutcome) -> ExecOutcome {
        let mut out = pre;
        let soft = std::mem::take(&mut st.expansion_stderr);
        out.stderr.push_str(&soft);
        out
    }

    /// Feed files written by `>(cmd)` substitutions to their scripts.
    fn drain_procsubs(&self, st: &mut ShellState) -> String {
        let pending = std::mem::take(&mut st.pending_procsubs);
        let mut err = String::new();
        for (path, script) in pending {
            let content = self.host.read_to_string(&path).unwrap_or_default();
            let mut sub = st.clone();
            sub.stdin = content;
            sub.fds = ShellState::default_fds();
            if let Ok(r) = self.run_subshell(&mut sub, &script) {
                err.push_str(&r.stderr);
            }
            st.next_pid = sub.next_pid;
            let _ = self.host.unlink(&path);
        }
        err
    }

    /// One assignment, with attribute, nameref, append and array handling.
    pub(crate) fn apply_assignment(
        &self,
        st: &mut ShellState,
        a: &Assignment,
    ) -> Result<(), Interrupt> {
        let name = st
            .resolve_nameref(&a.name)
            .map_err(|m| Interrupt::fault(FaultKind::Param, m))?;
        // The nameref target may itself be an element reference.
        let (name, subscript) = match (name.find('['), &a.subscript) {
            (Some(i), None) => {
                let sub = name[i + 1..name.len() - 1].to_string();
                (name[..i].to_string(), Some(sub))
            }
            _ => (name, a.subscript.clone()),
        };
        if st.readonly.contains(&name) {
            return Err(Interrupt::fault(
                FaultKind::Param,
                format!("{name}: readonly variable"),
            ));
        }

        match (&a.value, &subscript) {
            (AssignValue::Array(elems), _) => {
                if !a.append {
                    let was_assoc = st.assoc.contains(&name);
                    arrays::clear(st, &name);
                    if was_assoc {
                        st.assoc.insert(name.clone());
                    }
                }
                self.assign_array_elems(st, &name, elems)?;
            }
            (value, Some(sub)) => {
                let text = self.assign_value_text(st, value)?;
                self.assign_element(st, &name, sub, text, a.append)?;
            }
            (value, None) => {
                let mut text = self.assign_value_text(st, value)?;
                if st.integers.contains(&name) {
                    let n = self.eval_text_arith(st, &text)?;
                    text = n.to_string();
                }
                if a.append {
                    if st.is_array(&name) {
                        // `arr+=x` appends to element 0.
                        let old = arrays::get_indexed(st, &name, 0).unwrap_or_default();
                        arrays::set_indexed(st, &name, 0, format!("{old}{text}"));
                        return Ok(());
                    }
                    let old = st.cell(&name).unwrap_or("").to_string();
                    text = if st.integers.contains(&name) {
                        let sum = self
                            .eval_text_arith(st, &old)?
                            .wrapping_add(self.eval_text_arith(st, &text)?);
                        sum.to_string()
                    } else {
                        format!("{old}{text}")
                    };
                }
                self.set_scalar(st, &name, text);
            }
        }
        if st.opts.allexport {
            st.exported.insert(name);
        }
        Ok(())
    }

    fn assign_array_elems(
        &self,
        st: &mut ShellState,
        name: &str,
        elems: &[ArrayElem],
    ) -> Result<(), Interrupt> {
        let assoc = st.assoc.contains(name);
        let mut next_index = arrays::max_index(st, name).map(|m| m + 1).unwrap_or(0);
        for elem in elems {
            match (&elem.key, assoc) {
                (Some(key), true) => {
                    let key = self.expand_subscript_text(st, key)?;
                    let value = self.expand_word_single(st, &elem.value)?;
                    arrays::set_assoc(st, name, &key, value);
                }
                (Some(key), false) => {
                    let idx = self.eval_subscript(st, key)?;
                    let value = self.expand_word_single(st, &elem.value)?;
                    arrays::set_indexed(st, name, idx, value);
                    next_index = idx + 1;
                }
                (None, true) => {
                    st.expansion_stderr.push_str(&format!(
                        "bash: {name}: assignment to associative array requires a subscript\n"
                    ));
                }
                (None, false) => {
                    // Unkeyed elements expand with splitting and globbing.
                    for field in self.expand_word_fields(st, &elem.value)? {
                        arrays::set_indexed(st, name, next_index, field);
                        next_index += 1;
                    }
                }
            }
        }
        if !assoc {
            st.indexed.insert(name.to_string());
        }
        Ok(())
    }

    fn assign_element(
        &self,
        st: &mut ShellState,
        name: &str,
        sub: &str,
        mut text: String,
        append: bool,
    ) -> Result<(), Interrupt> {
        if st.integers.contains(name) {
            let n = self.eval_text_arith(st, &text)?;
            text = n.to_string();
        }
        if st.assoc.contains(name) {
            let key = self.expand_subscript_text(st, sub)?;
            if append {
                let old = st
                    .cell(&arrays::assoc_cell(name, &key))
                    .unwrap_or("")
                    .to_string();
                text = format!("{old}{text}");
            }
            arrays::set_assoc(st, name, &key, text);
            return Ok(());
        }
        let idx = self.eval_subscript(st, sub)?;
        let idx = match arrays::resolve_index(st, name, idx) {
            Some(i) => i,
            None => {
                return Err(Interrupt::fault(
                    FaultKind::Param,
                    format!("{name}: bad array subscript"),
                ))
            }
        };
        if append {
            let old = arrays::get_indexed(st, name, idx).unwrap_or_default();
            text = format!("{old}{text}");
        }
        arrays::set_indexed(st, name, idx, text);
        Ok(())
    }

    fn assign_value_text(
        &self,
        st: &mut ShellState,
        value: &AssignValue,
    ) -> Result<String, Interrupt> {
        match value {
            AssignValue::Empty => Ok(String::new()),
            AssignValue::Scalar(w) => self.expand_word_single(st, w),
            AssignValue::Array(_) => Ok(String::new()),
        }
    }

    pub(crate) fn eval_text_arith(
        &self,
        st: &mut ShellState,
        text: &str,
    ) -> Result<i64, Interrupt> {
        let expr = crate::parser::arith::parse_arith(text).unwrap_or(ArithExpr::Num(0));
        self.eval_arith(st, &expr)
    }

    /// Scalar write with the dynamic-variable side effects.
    pub(crate) fn set_scalar(&self, st: &mut ShellState, name: &str, value: String) {
        match name {
            "SECONDS" => {
                let base: i64 = value.parse().unwrap_or(0);
                st.seconds_offset = base - st.started.elapsed().as_secs() as i64;
            }
            "RANDOM" => {
                use rand::SeedableRng;
                let seed: u64 = value.parse().unwrap_or(0);
                st.rng = rand::rngs::SmallRng::seed_from_u64(seed);
            }
            _ => {}
        }
        st.set_cell(name.to_string(), value);
    }
}

fn restore_temp_env(st: &mut ShellState, saves: Vec<(String, Option<String>, bool)>) {
    for (name, old, was_exported) in saves.into_iter().rev() {
        match old {
            Some(v) => st.set_cell(name.clone(), v),
            None => {
                st.vars.shift_remove(&name);
            }
        }
        if !was_exported {
            st.exported.remove(&name);
        }
    }
}

fn xtrace_line(argv: &[String]) -> String {
    let mut line = String::from("+");
    for arg in argv {
        line.push(' ');
        if arg.is_empty() || arg.chars().any(|c| c.is_whitespace()) {
            line.push_str(&crate::expand::quote::shell_quote(arg));
        } else {
            line.push_str(arg);
        }
    }
    line.push('\n');
    line
}
