//! Control-flow builtins: break, continue, return, exit, shift, eval,
//! source, trap.

use crate::interp::flow::{ExecOutcome, Interrupt, Streams};
use crate::interp::state::ShellState;
use crate::interp::traps::canonical_signal;
use crate::interp::Interp;
use crate::vfs::path as vpath;

fn count_arg(args: &[String], what: &str) -> Result<u32, ExecOutcome> {
    match args.first() {
        None => Ok(1),
        Some(s) => match s.parse::<i64>() {
            Ok(n) if n >= 1 => Ok(n as u32),
            Ok(n) => Err(ExecOutcome::failure(
                format!("bash: {what}: {n}: loop count out of range\n"),
                1,
            )),
            Err(_) => Err(ExecOutcome::failure(
                format!("bash: {what}: {s}: numeric argument required\n"),
                1,
            )),
        },
    }
}

pub fn break_cmd(st: &mut ShellState, args: &[String]) -> Result<ExecOutcome, Interrupt> {
    if st.loop_depth == 0 {
        return Ok(ExecOutcome {
            stdout: String::new(),
            stderr: "bash: break: only meaningful in a `for', `while', or `until' loop\n"
                .to_string(),
            exit_code: 0,
        });
    }
    match count_arg(args, "break") {
        Ok(levels) => Err(Interrupt::Break { levels, streams: Streams::default() }),
        Err(out) => Ok(out),
    }
}

pub fn continue_cmd(st: &mut ShellState, args: &[String]) -> Result<ExecOutcome, Interrupt> {
    if st.loop_depth == 0 {
        return Ok(ExecOutcome {
            stdout: String::new(),
            stderr: "bash: continue: only meaningful in a `for', `while', or `until' loop\n"
                .to_string(),
            exit_code: 0,
        });
    }
    match count_arg(args, "continue") {
        Ok(levels) => Err(Interrupt::Continue { levels, streams: Streams::default() }),
        Err(out) => Ok(out),
    }
}

pub fn return_cmd(st: &mut ShellState, args: &[String]) -> Result<ExecOutcome, Interrupt> {
    if st.func_stack.is_empty() && st.source_stack.is_empty() {
        return Ok(ExecOutcome::failure(
            "bash: return: can only `return' from a function or sourced script\n",
            1,
        ));
    }
    let code = match args.first() {
        None => st.last_exit,
        Some(s) => match s.parse::<i64>() {
            Ok(n) => (n.rem_euclid(256)) as i32,
            Err(_) => {
                return Ok(ExecOutcome::failure(
                    format!("bash: return: {s}: numeric argument required\n"),
                    2,
                ))
            }
        },
    };
    Err(Interrupt::Return { code, streams: Streams::default() })
}

pub fn exit_cmd(st: &mut ShellState, args: &[String]) -> Result<ExecOutcome, Interrupt> {
    let code = match args.first() {
        None => st.last_exit,
        Some(s) => match s.parse::<i64>() {
            Ok(n) => (n.rem_euclid(256)) as i32,
            Err(_) => {
                return Err(Interrupt::Exit {
                    code: 2,
                    streams: Streams::new(
                        "",
                        format!("bash: exit: {s}: numeric argument required\n"),
                    ),
                })
            }
        },
    };
    Err(Interrupt::Exit { code, streams: Streams::default() })
}

pub fn shift(st: &mut ShellState, args: &[String]) -> Result<ExecOutcome, Interrupt> {
    let n = match args.first() {
        None => 1usize,
        Some(s) => match s.parse::<i64>() {
            Ok(n) if n >= 0 => n as usize,
            _ => {
                return Ok(ExecOutcome::failure(
                    format!("bash: shift: {s}: shift count out of range\n"),
                    1,
                ))
            }
        },
    };
    if n > st.positional.len() {
        return Ok(ExecOutcome::code(1));
    }
    st.positional.drain(..n);
    Ok(ExecOutcome::ok())
}

pub fn eval_cmd(
    interp: &Interp<'_>,
    st: &mut ShellState,
    args: &[String],
) -> Result<ExecOutcome, Interrupt> {
    let source = args.join(" ");
    if source.trim().is_empty() {
        return Ok(ExecOutcome::ok());
    }
    let script = match crate::parser::parse(&source) {
        Ok(s) => s,
        Err(e) => {
            return Ok(ExecOutcome::failure(format!("bash: eval: {}\n", e.message), 2));
        }
    };
    interp.run_script(st, &script)
}

pub fn source(
    interp: &Interp<'_>,
    st: &mut ShellState,
    args: &[String],
) -> Result<ExecOutcome, Interrupt> {
    let Some(name) = args.first() else {
        return Ok(ExecOutcome::failure(
            "bash: source: filename argument required\n",
            2,
        ));
    };
    let path = vpath::absolutize(&st.cwd, name);
    let text = match interp.host.read_to_string(&path) {
        Ok(t) => t,
        Err(_) => {
            return Ok(ExecOutcome::failure(
                format!("bash: source: {name}: No such file or directory\n"),
                1,
            ))
        }
    };
    let script = match crate::parser::parse(&text) {
        Ok(s) => s,
        Err(e) => {
            return Ok(ExecOutcome::failure(
                format!("bash: {name}: line {}: {}\n", e.line, e.message),
                2,
            ))
        }
    };
    // Runs in the current shell; extra arguments become positionals for
    // the duration of the sourced file.
    let saved_positional = if args.len() > 1 {
        Some(std::mem::replace(&mut st.positional, args[1..].to_vec()))
    } else {
        None
    };
    st.source_stack.push(name.clone());
    let result = interp.run_script(st, &script);
    st.source_stack.pop();
    if let Some(saved) = saved_positional {
        st.positional = saved;
    }
    match result {
        Ok(out) => Ok(out),
        // `return` ends the sourced file, not the caller.
        Err(Interrupt::Return { code, streams }) => Ok(ExecOutcome {
            stdout: streams.stdout,
            stderr: streams.stderr,
            exit_code: code,
        }),
        Err(other) => Err(other),
    }
}

pub fn trap_cmd(st: &mut ShellState, args: &[String]) -> Result<ExecOutcome, Interrupt> {
    if args.is_empty() || args[0] == "-p" {
        let mut names: Vec<&String> = st.traps.keys().collect();
        names.sort();
        let mut out = String::new();
        for name in names {
            let body = &st.traps[name];
            out.push_str(&format!(
                "trap -- {} {name}\n",
                crate::expand::quote::shell_quote(body)
            ));
        }
        return Ok(ExecOutcome::success(out));
    }

    let (action, signals) = if args[0] == "-" {
        (None, &args[1..])
    } else if args.len() == 1 {
        // A single operand is a signal spec to reset.
        (None, &args[..])
    } else {
        (Some(args[0].clone()), &args[1..])
    };

    let mut out = ExecOutcome::ok();
    for sig in signals {
        let Some(name) = canonical_signal(sig) else {
            out.stderr
                .push_str(&format!("bash: trap: {sig}: invalid signal specification\n"));
            out.exit_code = 1;
            continue;
        };
        match &action {
            None => {
                st.traps.remove(&name);
            }
            Some(body) => {
                st.traps.insert(name, body.clone());
            }
        }
    }
    Ok(out)
}
