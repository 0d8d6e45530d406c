//! `read` and `mapfile`/`readarray`: consume from the command's stdin.

use crate::expand::arrays;
use crate::interp::flow::{ExecOutcome, Interrupt};
use crate::interp::state::{FdHandle, ShellState};
use crate::interp::Interp;

/// Pull up to `delim` (exclusive) out of fd 0, consuming what was read.
fn take_record(st: &mut ShellState, delim: char) -> Option<String> {
    if let Some(FdHandle::ReadBuf(buf)) = st.fds.get_mut(&0) {
        if buf.is_empty() {
            return None;
        }
        return Some(match buf.find(delim) {
            Some(pos) => {
                let record = buf[..pos].to_string();
                *buf = buf[pos + delim.len_utf8()..].to_string();
                record
            }
            None => std::mem::take(buf),
        });
    }
    // Inherited stdin: consume from the state's stdin string.
    let content = std::mem::take(&mut st.stdin);
    if content.is_empty() {
        return None;
    }
    Some(match content.find(delim) {
        Some(pos) => {
            st.stdin = content[pos + delim.len_utf8()..].to_string();
            content[..pos].to_string()
        }
        None => content,
    })
}

pub fn read_cmd(
    interp: &Interp<'_>,
    st: &mut ShellState,
    args: &[String],
) -> Result<ExecOutcome, Interrupt> {
    let mut raw = false;
    let mut array_name: Option<String> = None;
    let mut delim = '\n';
    let mut names: Vec<String> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-r" => raw = true,
            "-s" => {}
            "-a" => {
                i += 1;
                array_name = args.get(i).cloned();
            }
            "-d" => {
                i += 1;
                delim = args.get(i).and_then(|s| s.chars().next()).unwrap_or('\0');
            }
            "-p" | "-t" | "-n" | "-N" | "-u" => {
                // Operand consumed; prompts/timeouts have no effect here.
                i += 1;
            }
            "--" => {}
            other => names.push(other.to_string()),
        }
        i += 1;
    }

    let Some(mut record) = take_record(st, delim) else {
        // EOF: variables still get cleared.
        for name in &names {
            st.set_cell(name.clone(), String::new());
        }
        return Ok(ExecOutcome::code(1));
    };
    if !raw {
        record = strip_backslashes(&record);
    }

    let ifs = st.cell("IFS").map(str::to_string).unwrap_or_else(|| " \t\n".to_string());
    if let Some(arr) = array_name {
        arrays::clear(st, &arr);
        for (idx, field) in split_ifs(&record, &ifs).into_iter().enumerate() {
            arrays::set_indexed(st, &arr, idx as i64, field);
        }
        return Ok(ExecOutcome::ok());
    }

    if names.is_empty() {
        st.set_cell("REPLY", record);
        return Ok(ExecOutcome::ok());
    }

    let fields = split_ifs_bounded(&record, &ifs, names.len());
    for (i, name) in names.iter().enumerate() {
        let value = fields.get(i).cloned().unwrap_or_default();
        interp.set_scalar(st, name, value);
    }
    Ok(ExecOutcome::ok())
}

fn strip_backslashes(s: &str) -> String {
    let mut out = String::new();
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(n) = chars.next() {
                out.push(n);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn split_ifs(s: &str, ifs: &str) -> Vec<String> {
    if ifs.is_empty() {
        return vec![s.to_string()];
    }
    let ws: Vec<char> = ifs.chars().filter(|c| c.is_whitespace()).collect();
    let trimmed = s.trim_matches(|c| ws.contains(&c));
    if trimmed.is_empty() {
        return Vec::new();
    }
    let mut fields = vec![String::new()];
    for c in trimmed.chars() {
        if ifs.contains(c) {
            if !fields.last().map(|f| f.is_empty()).unwrap_or(false) || !c.is_whitespace() {
                fields.push(String::new());
            }
        } else {
            fields.last_mut().expect("nonempty").push(c);
        }
    }
    if fields.last().map(|f| f.is_empty()).unwrap_or(false) {
        fields.pop();
    }
    fields
}

/// IFS split, but the final name swallows the rest of the record.
fn split_ifs_bounded(s: &str, ifs: &str, max: usize) -> Vec<String> {
    if max <= 1 || ifs.is_empty() {
        let ws: Vec<char> = ifs.chars().filter(|c| c.is_whitespace()).collect();
        return vec![s.trim_matches(|c| ws.contains(&c)).to_string()];
    }
    let ws: Vec<char> = ifs.chars().filter(|c| c.is_whitespace()).collect();
    let trimmed = s.trim_matches(|c| ws.contains(&c));
    let mut fields: Vec<String> = Vec::new();
    let chars: Vec<char> = trimmed.chars().collect();
    let mut i = 0;
    while i < chars.len() && fields.len() < max - 1 {
        // Skip leading separators.
        while i < chars.len() && ifs.contains(chars[i]) {
            i += 1;
        }
        let mut field = String::new();
        while i < chars.len() && !ifs.contains(chars[i]) {
            field.push(chars[i]);
            i += 1;
        }
        fields.push(field);
    }
    while i < chars.len() && ifs.contains(chars[i]) && chars[i].is_whitespace() {
        i += 1;
    }
    if i < chars.len() {
        let rest: String = chars[i..].iter().collect();
        fields.push(rest);
    }
    fields
}

pub fn mapfile(
    interp: &Interp<'_>,
    st: &mut ShellState,
    args: &[String],
) -> Result<ExecOutcome, Interrupt> {
    let mut strip = false;
    let mut name = "MAPFILE".to_string();
    for arg in args {
        match arg.as_str() {
            "-t" => strip = true,
            s if !s.starts_with('-') => name = s.to_string(),
            _ => {}
        }
    }
    let content = interp.current_stdin(st);
    // Consume everything.
    if let Some(FdHandle::ReadBuf(buf)) = st.fds.get_mut(&0) {
        buf.clear();
    } else {
        st.stdin.clear();
    }
    arrays::clear(st, &name);
    let mut idx = 0i64;
    for line in content.split_inclusive('\n') {
        let value = if strip {
            line.strip_suffix('\n').unwrap_or(line).to_string()
        } else {
            line.to_string()
        };
        arrays::set_indexed(st, &name, idx, value);
        idx += 1;
    }
    Ok(ExecOutcome::ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ifs_split_defaults() {
        assert_eq!(split_ifs("a b  c", " \t\n"), vec!["a", "b", "c"]);
        assert_eq!(split_ifs("  x  ", " \t\n"), vec!["x"]);
    }

    #[test]
    fn bounded_split_keeps_rest() {
        let f = split_ifs_bounded("one two three four", " \t\n", 2);
        assert_eq!(f, vec!["one", "two three four"]);
        let f = split_ifs_bounded("a b", " \t\n", 3);
        assert_eq!(f, vec!["a", "b"]);
    }

    #[test]
    fn backslash_stripping() {
        assert_eq!(strip_backslashes("a\\ b"), "a b");
        assert_eq!(strip_backslashes("x\\\\y"), "x\\y");
    }
}
