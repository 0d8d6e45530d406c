//! Re-quoting and prompt expansion for the `@Q`/`@E`/`@P` transforms and
//! `declare -p` output.

use crate::interp::state::ShellState;

/// Quote a value so it reads back as the same word (`@Q`, `declare -p`).
pub fn shell_quote(s: &str) -> String {
    if s.is_empty() {
        return "''".to_string();
    }
    if s
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "_./:=+-%@^,".contains(c))
    {
        return s.to_string();
    }
    let mut out = String::from("'");
    for c in s.chars() {
        if c == '\'' {
            out.push_str("'\\''");
        } else {
            out.push(c);
        }
    }
    out.push('\'');
    out
}

/// `@P`: expand a prompt string (the useful escapes only).
pub fn prompt_expand(st: &ShellState, s: &str) -> String {
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
            'u' => out.push_str(st.cell("USER").unwrap_or("user")),
            'h' | 'H' => out.push_str(st.cell("HOSTNAME").unwrap_or("localhost")),
            'w' => {
                let home = st.cell("HOME").unwrap_or("");
                let cwd = &st.cwd;
                if !home.is_empty() && cwd.starts_with(home) {
                    out.push('~');
                    out.push_str(&cwd[home.len()..]);
                } else {
                    out.push_str(cwd);
                }
            }
            'W' => out.push_str(crate::vfs::path::file_name(&st.cwd)),
            '$' => out.push(if st.cell("UID").map(|u| u == "0").unwrap_or(false) {
                '#'
            } else {
                '$'
            }),
            'n' => out.push('\n'),
            't' => out.push_str("00:00:00"),
            's' => out.push_str("bash"),
            '\\' => out.push('\\'),
            '[' | ']' => {}
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_strings_pass_through() {
        assert_eq!(shell_quote("abc"), "abc");
        assert_eq!(shell_quote("a/b.c"), "a/b.c");
    }

    #[test]
    fn spaces_get_single_quotes() {
        assert_eq!(shell_quote("a b"), "'a b'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn embedded_single_quote() {
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
    }

    #[test]
    fn prompt_working_dir() {
        let mut st = ShellState::new();
        st.set_cell("HOME", "/home/user");
        st.cwd = "/home/user/project".to_string();
        assert_eq!(prompt_expand(&st, "\\w"), "~/project");
    }
}
