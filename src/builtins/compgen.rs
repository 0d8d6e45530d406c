//! `compgen`: completion candidate generation against shell state and the
//! virtual filesystem.

use crate::interp::flow::{ExecOutcome, Interrupt};
use crate::interp::state::ShellState;
use crate::interp::Interp;

pub fn compgen(
    interp: &Interp<'_>,
    st: &mut ShellState,
    args: &[String],
) -> Result<ExecOutcome, Interrupt> {
    let mut wordlist: Option<String> = None;
    let mut want_vars = false;
    let mut want_files = false;
    let mut want_dirs = false;
    let mut want_commands = false;
    let mut want_functions = false;
    let mut prefix = String::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-W" => {
                i += 1;
                wordlist = args.get(i).cloned();
            }
            "-v" => want_vars = true,
            "-f" => want_files = true,
            "-d" => want_dirs = true,
            "-c" => want_commands = true,
            "-A" => {
                i += 1;
                match args.get(i).map(String::as_str) {
                    Some("function") => want_functions = true,
                    Some("variable") => want_vars = true,
                    Some("file") => want_files = true,
                    Some("directory") => want_dirs = true,
                    Some("command") => want_commands = true,
                    _ => {}
                }
            }
            s if !s.starts_with('-') => prefix = s.to_string(),
            _ => {}
        }
        i += 1;
    }

    let mut candidates: Vec<String> = Vec::new();
    if let Some(list) = wordlist {
        candidates.extend(list.split_whitespace().map(str::to_string));
    }
    if want_vars {
        candidates.extend(
            st.vars
                .keys()
                .filter(|k| crate::parser::is_valid_name(k))
                .cloned(),
        );
        candidates.extend(st.indexed.iter().cloned());
        candidates.extend(st.assoc.iter().cloned());
    }
    if want_functions {
        candidates.extend(st.functions.keys().cloned());
    }
    if want_commands {
        candidates.extend(crate::builtins::BUILTIN_NAMES.iter().map(|s| s.to_string()));
        candidates.extend(interp.host.commands.names().iter().map(|s| s.to_string()));
        candidates.extend(st.functions.keys().cloned());
    }
    if want_files || want_dirs {
        if let Ok(names) = interp.host.readdir(&st.cwd) {
            for name in names {
                let path = crate::vfs::path::join(&st.cwd, &name);
                let is_dir = interp.host.is_dir(&path);
                if want_files || (want_dirs && is_dir) {
                    candidates.push(name);
                }
            }
        }
    }

    candidates.retain(|c| c.starts_with(&prefix));
    candidates.sort();
    candidates.dedup();
    if candidates.is_empty() {
        return Ok(ExecOutcome::code(1));
    }
    let mut out = String::new();
    for c in candidates {
        out.push_str(&c);
        out.push('\n');
    }
    Ok(ExecOutcome::success(out))
}
