//! Small builtins: echo, type, command, builtin, umask.

use crate::interp::flow::{ExecOutcome, Interrupt};
use crate::interp::state::ShellState;
use crate::interp::Interp;

pub fn echo(args: &[String]) -> Result<ExecOutcome, Interrupt> {
    let mut newline = true;
    let mut escapes = false;
    let mut idx = 0;
    while idx < args.len() {
        let arg = &args[idx];
        if !arg.starts_with('-') || arg.len() < 2 || !arg[1..].chars().all(|c| "neE".contains(c))
        {
            break;
        }
        for c in arg[1..].chars() {
            match c {
                'n' => newline = false,
                'e' => escapes = true,
                'E' => escapes = false,
                _ => unreachable!(),
            }
        }
        idx += 1;
    }
    let joined = args[idx..].join(" ");
    let mut text = if escapes {
        let (decoded, stop) = echo_escapes(&joined);
        if stop {
            return Ok(ExecOutcome::success(decoded));
        }
        decoded
    } else {
        joined
    };
    if newline {
        text.push('\n');
    }
    Ok(ExecOutcome::success(text))
}

/// `echo -e` escapes; returns (text, hit `\c`).
fn echo_escapes(s: &str) -> (String, bool) {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '\\' || i + 1 >= chars.len() {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        i += 1;
        let c = chars[i];
        i += 1;
        match c {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'e' | 'E' => out.push('\x1b'),
            'f' => out.push('\x0c'),
            'v' => out.push('\x0b'),
            '\\' => out.push('\\'),
            'c' => return (out, true),
            '0' => {
                let mut val = 0u32;
                let mut n = 0;
                while n < 3 && i < chars.len() && chars[i].is_digit(8) {
                    val = val * 8 + chars[i].to_digit(8).unwrap();
                    i += 1;
                    n += 1;
                }
                if let Some(ch) = char::from_u32(val) {
                    out.push(ch);
                }
            }
            'x' => {
                let mut val = 0u32;
                let mut n = 0;
                while n < 2 && i < chars.len() && chars[i].is_ascii_hexdigit() {
                    val = val * 16 + chars[i].to_digit(16).unwrap();
                    i += 1;
                    n += 1;
                }
                if n == 0 {
                    out.push_str("\\x");
                } else if let Some(ch) = char::from_u32(val) {
                    out.push(ch);
                }
            }
            'u' => {
                let mut val = 0u32;
                let mut n = 0;
                while n < 4 && i < chars.len() && chars[i].is_ascii_hexdigit() {
                    val = val * 16 + chars[i].to_digit(16).unwrap();
                    i += 1;
                    n += 1;
                }
                if let Some(ch) = char::from_u32(val) {
                    out.push(ch);
                }
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    (out, false)
}

const KEYWORDS: &[&str] = &[
    "if", "then", "else", "elif", "fi", "case", "esac", "for", "while", "until", "do",
    "done", "in", "function", "time", "{", "}", "!", "[[", "]]",
];

fn classify(interp: &Interp<'_>, st: &ShellState, name: &str) -> Option<&'static str> {
    if st.functions.contains_key(name) {
        Some("function")
    } else if KEYWORDS.contains(&name) {
        Some("keyword")
    } else if crate::builtins::is_builtin(name) {
        Some("builtin")
    } else if interp.host.commands.contains(name) {
        Some("file")
    } else {
        None
    }
}

pub fn type_cmd(
    interp: &Interp<'_>,
    st: &mut ShellState,
    args: &[String],
) -> Result<ExecOutcome, Interrupt> {
    let mut short = false;
    let mut names = args;
    if let Some(first) = args.first() {
        if first == "-t" {
            short = true;
            names = &args[1..];
        } else if first == "-a" || first == "-p" {
            names = &args[1..];
        }
    }
    let mut out = ExecOutcome::ok();
    for name in names {
        match classify(interp, st, name) {
            Some(kind) if short => out.stdout.push_str(&format!("{kind}\n")),
            Some("function") => out.stdout.push_str(&format!("{name} is a function\n")),
            Some("keyword") => out.stdout.push_str(&format!("{name} is a shell keyword\n")),
            Some("builtin") => out.stdout.push_str(&format!("{name} is a shell builtin\n")),
            Some(_) => out.stdout.push_str(&format!("{name} is /usr/bin/{name}\n")),
            None => {
                out.stderr.push_str(&format!("bash: type: {name}: not found\n"));
                out.exit_code = 1;
            }
        }
    }
    Ok(out)
}

/// `command [-v] name [args...]`: bypass function lookup.
pub fn command_cmd(
    interp: &Interp<'_>,
    st: &mut ShellState,
    args: &[String],
) -> Result<ExecOutcome, Interrupt> {
    let mut rest = args;
    let mut print_only = false;
    while let Some(first) = rest.first() {
        match first.as_str() {
            "-v" | "-V" => {
                print_only = true;
                rest = &rest[1..];
            }
            "-p" => rest = &rest[1..],
            _ => break,
        }
    }
    let Some(name) = rest.first() else {
        return Ok(ExecOutcome::ok());
    };
    if print_only {
        return match classify(interp, st, name) {
            Some("file") => Ok(ExecOutcome::success(format!("/usr/bin/{name}\n"))),
            Some(_) => Ok(ExecOutcome::success(format!("{name}\n"))),
            None => Ok(ExecOutcome::code(1)),
        };
    }
    let cmd_args = &rest[1..];
    if let Some(result) = crate::builtins::dispatch(interp, st, name, cmd_args) {
        return result;
    }
    interp.run_external(st, name, cmd_args)
}

pub fn builtin_cmd(
    interp: &Interp<'_>,
    st: &mut ShellState,
    args: &[String],
) -> Result<ExecOutcome, Interrupt> {
    let Some(name) = args.first() else {
        return Ok(ExecOutcome::ok());
    };
    match crate::builtins::dispatch(interp, st, name, &args[1..]) {
        Some(result) => result,
        None => Ok(ExecOutcome::failure(
            format!("bash: builtin: {name}: not a shell builtin\n"),
            1,
        )),
    }
}

pub fn umask(st: &mut ShellState, args: &[String]) -> Result<ExecOutcome, Interrupt> {
    match args.iter().find(|a| !a.starts_with('-')) {
        None => Ok(ExecOutcome::success(format!("{:04o}\n", st.umask))),
        Some(arg) => match u32::from_str_radix(arg, 8) {
            Ok(mask) if mask <= 0o777 => {
                st.umask = mask;
                Ok(ExecOutcome::ok())
            }
            _ => Ok(ExecOutcome::failure(
                format!("bash: umask: {arg}: octal number out of range\n"),
                1,
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_basics() {
        assert_eq!(echo(&["a".into(), "b".into()]).unwrap().stdout, "a b\n");
        assert_eq!(echo(&["-n".into(), "x".into()]).unwrap().stdout, "x");
        assert_eq!(echo(&[]).unwrap().stdout, "\n");
    }

    #[test]
    fn echo_escape_mode() {
        assert_eq!(echo(&["-e".into(), "a\\tb".into()]).unwrap().stdout, "a\tb\n");
        assert_eq!(echo(&["-e".into(), "x\\cy".into()]).unwrap().stdout, "x");
        // Without -e the backslashes stay.
        assert_eq!(echo(&["a\\tb".into()]).unwrap().stdout, "a\\tb\n");
    }

    #[test]
    fn echo_non_flag_dash() {
        assert_eq!(echo(&["-q".into()]).unwrap().stdout, "-q\n");
    }
}
