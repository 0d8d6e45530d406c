//! Working-directory builtins: cd, pushd, popd, dirs.

use crate::interp::flow::{ExecOutcome, Interrupt};
use crate::interp::state::ShellState;
use crate::interp::Interp;
use crate::vfs::path as vpath;

/// Change directory; returns the new absolute cwd.
fn chdir(
    interp: &Interp<'_>,
    st: &mut ShellState,
    target: &str,
) -> Result<String, String> {
    let resolved = vpath::absolutize(&st.cwd, target);
    let real = interp
        .host
        .canonicalize(&resolved)
        .map_err(|_| format!("bash: cd: {target}: No such file or directory\n"))?;
    match interp.host.stat(&real) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return Err(format!("bash: cd: {target}: Not a directory\n")),
        Err(_) => return Err(format!("bash: cd: {target}: No such file or directory\n")),
    }
    st.prev_dir = st.cwd.clone();
    st.cwd = real.clone();
    let prev = st.prev_dir.clone();
    st.set_cell("OLDPWD", prev);
    st.set_cell("PWD", real.clone());
    Ok(real)
}

pub fn cd(
    interp: &Interp<'_>,
    st: &mut ShellState,
    args: &[String],
) -> Result<ExecOutcome, Interrupt> {
    let operands: Vec<&String> = args.iter().filter(|a| !a.starts_with('-') || *a == "-").collect();
    let target = match operands.first() {
        None => match st.cell("HOME") {
            Some(h) => h.to_string(),
            None => return Ok(ExecOutcome::failure("bash: cd: HOME not set\n", 1)),
        },
        Some(s) if *s == "-" => {
            let prev = st.prev_dir.clone();
            return match chdir(interp, st, &prev) {
                Ok(new) => Ok(ExecOutcome::success(format!("{new}\n"))),
                Err(msg) => Ok(ExecOutcome::failure(msg, 1)),
            };
        }
        Some(s) => s.to_string(),
    };
    match chdir(interp, st, &target) {
        Ok(_) => Ok(ExecOutcome::ok()),
        Err(msg) => Ok(ExecOutcome::failure(msg, 1)),
    }
}

fn stack_line(st: &ShellState) -> String {
    let mut parts = vec![display_dir(st, &st.cwd)];
    for d in st.dir_stack.iter().rev() {
        parts.push(display_dir(st, d));
    }
    format!("{}\n", parts.join(" "))
}

fn display_dir(st: &ShellState, dir: &str) -> String {
    match st.cell("HOME") {
        Some(home) if !home.is_empty() && dir.starts_with(home) => {
            format!("~{}", &dir[home.len()..])
        }
        _ => dir.to_string(),
    }
}

pub fn pushd(
    interp: &Interp<'_>,
    st: &mut ShellState,
    args: &[String],
) -> Result<ExecOutcome, Interrupt> {
    match args.first() {
        None => {
            // Swap the two top entries.
            let Some(top) = st.dir_stack.pop() else {
                return Ok(ExecOutcome::failure("bash: pushd: no other directory\n", 1));
            };
            let here = st.cwd.clone();
            match chdir(interp, st, &top) {
                Ok(_) => {
                    st.dir_stack.push(here);
                    Ok(ExecOutcome::success(stack_line(st)))
                }
                Err(msg) => {
                    st.dir_stack.push(top);
                    Ok(ExecOutcome::failure(msg, 1))
                }
            }
        }
        Some(dir) => {
            let here = st.cwd.clone();
            match chdir(interp, st, dir) {
                Ok(_) => {
                    st.dir_stack.push(here);
                    Ok(ExecOutcome::success(stack_line(st)))
                }
                Err(msg) => Ok(ExecOutcome::failure(msg, 1)),
            }
        }
    }
}

pub fn popd(
    interp: &Interp<'_>,
    st: &mut ShellState,
    _args: &[String],
) -> Result<ExecOutcome, Interrupt> {
    let Some(top) = st.dir_stack.pop() else {
        return Ok(ExecOutcome::failure("bash: popd: directory stack empty\n", 1));
    };
    match chdir(interp, st, &top) {
        Ok(_) => Ok(ExecOutcome::success(stack_line(st))),
        Err(msg) => Ok(ExecOutcome::failure(msg, 1)),
    }
}

pub fn dirs_cmd(st: &mut ShellState, args: &[String]) -> Result<ExecOutcome, Interrupt> {
    if args.iter().any(|a| a == "-c") {
        st.dir_stack.clear();
        return Ok(ExecOutcome::ok());
    }
    Ok(ExecOutcome::success(stack_line(st)))
}
