//! Shell builtins.
//!
//! Builtins run inside the interpreter and may mutate shell state, which
//! is what separates them from the external-command registry. Dispatch is
//! a plain match; each family lives in its own module.

pub mod compgen;
pub mod dirs;
pub mod flow_ctl;
pub mod misc;
pub mod options;
pub mod printf;
pub mod read_cmd;
pub mod test_cmd;
pub mod vars;

use crate::interp::flow::{ExecOutcome, Interrupt};
use crate::interp::state::ShellState;
use crate::interp::Interp;

pub const BUILTIN_NAMES: &[&str] = &[
    ":", ".", "[", "break", "builtin", "cd", "command", "compgen", "continue", "declare",
    "dirs", "echo", "eval", "exit", "export", "false", "getopts", "hash", "let", "local",
    "mapfile", "popd", "printf", "pushd", "pwd", "read", "readarray", "readonly", "return",
    "set", "shift", "shopt", "source", "test", "times", "trap", "true", "type", "typeset",
    "umask", "unset", "wait",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_NAMES.contains(&name)
}

/// Run a builtin; None when `name` is not one.
pub fn dispatch(
    interp: &Interp<'_>,
    st: &mut ShellState,
    name: &str,
    args: &[String],
) -> Option<Result<ExecOutcome, Interrupt>> {
    Some(match name {
        ":" | "true" => Ok(ExecOutcome::ok()),
        "false" => Ok(ExecOutcome::code(1)),
        "echo" => misc::echo(args),
        "printf" => printf::printf_cmd(interp, st, args),
        "pwd" => Ok(ExecOutcome::success(format!("{}\n", st.cwd))),
        "cd" => dirs::cd(interp, st, args),
        "pushd" => dirs::pushd(interp, st, args),
        "popd" => dirs::popd(interp, st, args),
        "dirs" => dirs::dirs_cmd(st, args),
        "read" => read_cmd::read_cmd(interp, st, args),
        "mapfile" | "readarray" => read_cmd::mapfile(interp, st, args),
        "declare" | "typeset" => vars::declare(interp, st, args, vars::DeclareMode::Declare),
        "local" => vars::declare(interp, st, args, vars::DeclareMode::Local),
        "export" => vars::declare(interp, st, args, vars::DeclareMode::Export),
        "readonly" => vars::declare(interp, st, args, vars::DeclareMode::Readonly),
        "unset" => vars::unset(interp, st, args),
        "let" => vars::let_cmd(interp, st, args),
        "getopts" => vars::getopts(interp, st, args),
        "shift" => flow_ctl::shift(st, args),
        "set" => options::set_cmd(st, args),
        "shopt" => options::shopt_cmd(st, args),
        "eval" => flow_ctl::eval_cmd(interp, st, args),
        "source" | "." => flow_ctl::source(interp, st, args),
        "test" => test_cmd::test_cmd(interp, st, args, false),
        "[" => test_cmd::test_cmd(interp, st, args, true),
        "trap" => flow_ctl::trap_cmd(st, args),
        "break" => flow_ctl::break_cmd(st, args),
        "continue" => flow_ctl::continue_cmd(st, args),
        "return" => flow_ctl::return_cmd(st, args),
        "exit" => flow_ctl::exit_cmd(st, args),
        "compgen" => compgen::compgen(interp, st, args),
        "type" => misc::type_cmd(interp, st, args),
        "command" => misc::command_cmd(interp, st, args),
        "builtin" => misc::builtin_cmd(interp, st, args),
        "hash" => Ok(ExecOutcome::ok()),
        "umask" => misc::umask(st, args),
        "wait" => Ok(ExecOutcome::ok()),
        "times" => Ok(ExecOutcome::success(
            "0m0.000s 0m0.000s\n0m0.000s 0m0.000s\n",
        )),
        _ => return None,
    })
}
