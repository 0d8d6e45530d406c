//! `set` and `shopt`.

use crate::expand::quote;
use crate::interp::flow::{ExecOutcome, Interrupt};
use crate::interp::state::{ShellState, ShoptFlags};

const SET_O_NAMES: &[&str] = &[
    "allexport", "errexit", "noclobber", "noexec", "noglob", "nounset", "pipefail",
    "verbose", "xtrace",
];

fn set_o(st: &mut ShellState, name: &str, value: bool) -> bool {
    match name {
        "allexport" => st.opts.allexport = value,
        "errexit" => st.opts.errexit = value,
        "noclobber" => st.opts.noclobber = value,
        "noexec" => st.opts.noexec = value,
        "noglob" => st.opts.noglob = value,
        "nounset" => st.opts.nounset = value,
        "pipefail" => st.opts.pipefail = value,
        "verbose" => st.opts.verbose = value,
        "xtrace" => st.opts.xtrace = value,
        _ => return false,
    }
    true
}

fn get_o(st: &ShellState, name: &str) -> Option<bool> {
    Some(match name {
        "allexport" => st.opts.allexport,
        "errexit" => st.opts.errexit,
        "noclobber" => st.opts.noclobber,
        "noexec" => st.opts.noexec,
        "noglob" => st.opts.noglob,
        "nounset" => st.opts.nounset,
        "pipefail" => st.opts.pipefail,
        "verbose" => st.opts.verbose,
        "xtrace" => st.opts.xtrace,
        _ => return None,
    })
}

fn set_letter(st: &mut ShellState, c: char, value: bool) -> bool {
    match c {
        'a' => st.opts.allexport = value,
        'e' => st.opts.errexit = value,
        'f' => st.opts.noglob = value,
        'n' => st.opts.noexec = value,
        'u' => st.opts.nounset = value,
        'v' => st.opts.verbose = value,
        'x' => st.opts.xtrace = value,
        'C' => st.opts.noclobber = value,
        // Accepted and ignored, as in real scripts.
        'h' | 'B' | 'm' | 'b' | 'H' | 'P' | 'T' => {}
        _ => return false,
    }
    true
}

pub fn set_cmd(st: &mut ShellState, args: &[String]) -> Result<ExecOutcome, Interrupt> {
    if args.is_empty() {
        let mut names: Vec<&String> =
            st.vars.keys().filter(|k| crate::parser::is_valid_name(k)).collect();
        names.sort();
        let mut out = String::new();
        for name in names {
            out.push_str(&format!("{name}={}\n", quote::shell_quote(&st.vars[name.as_str()])));
        }
        return Ok(ExecOutcome::success(out));
    }

    let mut out = ExecOutcome::ok();
    let mut i = 0;
    let mut positional: Option<Vec<String>> = None;
    while i < args.len() {
        let arg = &args[i];
        match arg.as_str() {
            "--" => {
                positional = Some(args[i + 1..].to_vec());
                break;
            }
            "-o" | "+o" => {
                let enable = arg.starts_with('-');
                match args.get(i + 1) {
                    None => {
                        let mut text = String::new();
                        for name in SET_O_NAMES {
                            let on = get_o(st, name).unwrap_or(false);
                            text.push_str(&format!(
                                "{name}\t{}\n",
                                if on { "on" } else { "off" }
                            ));
                        }
                        out.stdout.push_str(&text);
                    }
                    Some(name) => {
                        if !set_o(st, name, enable) {
                            out.stderr.push_str(&format!(
                                "bash: set: {name}: invalid option name\n"
                            ));
                            out.exit_code = 2;
                        }
                        i += 1;
                    }
                }
            }
            s if s.starts_with('-') && s.len() > 1 => {
                for c in s[1..].chars() {
                    if !set_letter(st, c, true) {
                        out.stderr.push_str(&format!("bash: set: -{c}: invalid option\n"));
                        out.exit_code = 2;
                    }
                }
            }
            s if s.starts_with('+') && s.len() > 1 => {
                for c in s[1..].chars() {
                    if !set_letter(st, c, false) {
                        out.stderr.push_str(&format!("bash: set: +{c}: invalid option\n"));
                        out.exit_code = 2;
                    }
                }
            }
            _ => {
                positional = Some(args[i..].to_vec());
                break;
            }
        }
        i += 1;
    }
    if let Some(params) = positional {
        st.positional = params;
    }
    st.sync_option_vars();
    Ok(out)
}

pub fn shopt_cmd(st: &mut ShellState, args: &[String]) -> Result<ExecOutcome, Interrupt> {
    let mut enable = None;
    let mut quiet = false;
    let mut print = false;
    let mut names: Vec<&String> = Vec::new();
    for arg in args {
        match arg.as_str() {
            "-s" => enable = Some(true),
            "-u" => enable = Some(false),
            "-q" => quiet = true,
            "-p" => print = true,
            "-o" => {}
            _ => names.push(arg),
        }
    }

    let mut out = ExecOutcome::ok();
    if names.is_empty() {
        if let Some(value) = enable {
            // `shopt -s` with no names lists options in that state.
            for name in ShoptFlags::names() {
                if st.shopts.get(name) == Some(value) && !quiet {
                    out.stdout
                        .push_str(&format!("{name}\t{}\n", if value { "on" } else { "off" }));
                }
            }
            return Ok(out);
        }
        for name in ShoptFlags::names() {
            let on = st.shopts.get(name).unwrap_or(false);
            out.stdout
                .push_str(&format!("{name}\t{}\n", if on { "on" } else { "off" }));
        }
        return Ok(out);
    }

    for name in names {
        match enable {
            Some(value) => {
                if !st.shopts.set(name, value) {
                    out.stderr
                        .push_str(&format!("bash: shopt: {name}: invalid shell option name\n"));
                    out.exit_code = 1;
                }
            }
            None => match st.shopts.get(name) {
                Some(on) => {
                    let _ = print;
                    if !quiet {
                        out.stdout
                            .push_str(&format!("{name}\t{}\n", if on { "on" } else { "off" }));
                    }
                    if !on {
                        out.exit_code = 1;
                    }
                }
                None => {
                    out.stderr
                        .push_str(&format!("bash: shopt: {name}: invalid shell option name\n"));
                    out.exit_code = 1;
                }
            },
        }
    }
    st.sync_option_vars();
    Ok(out)
}
