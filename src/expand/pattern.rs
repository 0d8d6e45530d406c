//! Shell pattern compilation: globs (and extglob) to `regex_lite` regexes.
//!
//! One translation serves `case`, `[[ == ]]`, parameter pattern operators
//! and pathname expansion; pathname matching applies it per component.
//! regex-lite has no look-around, so a pattern that is exactly `!(...)`
//! is matched by inversion in [`matches`]; an embedded `!(...)` falls back
//! to `.*`.

use regex_lite::Regex;

#[derive(Debug, Clone, Copy, Default)]
pub struct PatternOpts {
    pub extglob: bool,
    pub nocase: bool,
}

/// Does `text` match `pattern` completely?
pub fn matches(pattern: &str, text: &str, opts: PatternOpts) -> bool {
    if opts.extglob {
        if let Some(inner) = whole_negation(pattern) {
            let hit = inner
                .iter()
                .any(|alt| matches(alt, text, opts));
            return !hit;
        }
    }
    match compile_anchored(pattern, opts) {
        Some(re) => re.is_match(text),
        None => pattern == text,
    }
}

/// `!(a|b)` covering the whole pattern: returns the alternatives.
fn whole_negation(pattern: &str) -> Option<Vec<String>> {
    let rest = pattern.strip_prefix("!(")?;
    let chars: Vec<char> = rest.chars().collect();
    let mut depth = 1usize;
    for (i, c) in chars.iter().enumerate() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    if i != chars.len() - 1 {
                        return None;
                    }
                    let inner: String = chars[..i].iter().collect();
                    return Some(split_alternatives(&inner));
                }
            }
            _ => {}
        }
    }
    None
}

pub fn compile_anchored(pattern: &str, opts: PatternOpts) -> Option<Regex> {
    let body = translate(pattern, opts);
    let prefix = if opts.nocase { "(?is)" } else { "(?s)" };
    Regex::new(&format!("{prefix}^(?:{body})$")).ok()
}

/// Unanchored regex source for `pattern`.
pub fn translate(pattern: &str, opts: PatternOpts) -> String {
    let chars: Vec<char> = pattern.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if opts.extglob
            && matches!(c, '@' | '*' | '+' | '?' | '!')
            && chars.get(i + 1) == Some(&'(')
        {
            if let Some(close) = matching_paren(&chars, i + 1) {
                let inner: String = chars[i + 2..close].iter().collect();
                let alts: Vec<String> = split_alternatives(&inner)
                    .iter()
                    .map(|a| translate(a, opts))
                    .collect();
                let group = alts.join("|");
                match c {
                    '@' => out.push_str(&format!("(?:{group})")),
                    '*' => out.push_str(&format!("(?:{group})*")),
                    '+' => out.push_str(&format!("(?:{group})+")),
                    '?' => out.push_str(&format!("(?:{group})?")),
                    // No look-around in regex-lite; an embedded negation
                    // degrades to "anything".
                    '!' => out.push_str(".*"),
                    _ => {}
                }
                i = close + 1;
                continue;
            }
        }
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '\\' => {
                i += 1;
                match chars.get(i) {
                    Some(&n) => push_literal(&mut out, n),
                    None => out.push_str("\\\\"),
                }
            }
            '[' => match bracket_end(&chars, i) {
                Some(end) => {
                    let inner: String = chars[i + 1..end].iter().collect();
                    out.push_str(&translate_class(&inner));
                    i = end;
                }
                None => out.push_str("\\["),
            },
            other => push_literal(&mut out, other),
        }
        i += 1;
    }
    out
}

fn push_literal(out: &mut String, c: char) {
    if "\\.^$|()[]{}*+?".contains(c) {
        out.push('\\');
    }
    out.push(c);
}

fn matching_paren(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in chars.iter().enumerate().skip(open) {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// End index of a `[...]` class starting at `open` (glob rules: a `]`
/// right after the opening, or after `!`/`^`, is literal).
fn bracket_end(chars: &[char], open: usize) -> Option<usize> {
    let mut i = open + 1;
    if matches!(chars.get(i), Some('!') | Some('^')) {
        i += 1;
    }
    if chars.get(i) == Some(&']') {
        i += 1;
    }
    while i < chars.len() {
        match chars[i] {
            ']' => return Some(i),
            '[' if chars.get(i + 1) == Some(&':') => {
                let mut j = i + 2;
                while j + 1 < chars.len() && !(chars[j] == ':' && chars[j + 1] == ']') {
                    j += 1;
                }
                if j + 1 < chars.len() {
                    i = j + 2;
                    continue;
                }
                i += 1;
            }
            _ => i += 1,
        }
    }
    None
}

/// Translate a glob bracket class body to a regex class body.
fn translate_class(inner: &str) -> String {
    let chars: Vec<char> = inner.chars().collect();
    let mut out = String::from("[");
    let mut i = 0;
    if matches!(chars.first(), Some('!') | Some('^')) {
        out.push('^');
        i = 1;
    }
    while i < chars.len() {
        if chars[i] == '[' && chars.get(i + 1) == Some(&':') {
            let mut j = i + 2;
            let mut name = String::new();
            while j + 1 < chars.len() && !(chars[j] == ':' && chars[j + 1] == ']') {
                name.push(chars[j]);
                j += 1;
            }
            if j + 1 < chars.len() {
                out.push_str(posix_class(&name));
                i = j + 2;
                continue;
            }
        }
        let c = chars[i];
        if "\\^]".contains(c) {
            out.push('\\');
            out.push(c);
        } else {
            out.push(c);
        }
        i += 1;
    }
    out.push(']');
    out
}

fn posix_class(name: &str) -> &'static str {
    match name {
        "alpha" => "a-zA-Z",
        "digit" => "0-9",
        "alnum" => "a-zA-Z0-9",
        "upper" => "A-Z",
        "lower" => "a-z",
        "space" => " \\t\\n\\r\\x0b\\x0c",
        "blank" => " \\t",
        "xdigit" => "0-9a-fA-F",
        "punct" => "!-/:-@\\[-`{-~",
        "print" => " -~",
        "graph" => "!-~",
        "cntrl" => "\\x00-\\x1f\\x7f",
        "word" => "a-zA-Z0-9_",
        _ => "",
    }
}

/// Split extglob alternatives on top-level `|`.
pub fn split_alternatives(s: &str) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut depth = 0usize;
    for &c in &chars {
        match c {
            '(' => {
                depth += 1;
                cur.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                cur.push(c);
            }
            '|' if depth == 0 => out.push(std::mem::take(&mut cur)),
            _ => cur.push(c),
        }
    }
    out.push(cur);
    out
}

/// Does the string contain an unescaped glob metacharacter?
pub fn has_glob_chars(s: &str) -> bool {
    let chars: Vec<char> = s.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 1,
            '*' | '?' => return true,
            '[' => {
                if bracket_end(&chars, i).is_some() {
                    return true;
                }
            }
            _ => {}
        }
        i += 1;
    }
    false
}

/// Escape glob metacharacters so quoted text matches literally.
pub fn escape_glob(s: &str) -> String {
    let mut out = String::new();
    for c in s.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\' | '(' | ')' | '|' | '!' | '@' | '+') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(p: &str, t: &str) -> bool {
        matches(p, t, PatternOpts::default())
    }

    fn mx(p: &str, t: &str) -> bool {
        matches(p, t, PatternOpts { extglob: true, nocase: false })
    }

    #[test]
    fn basic_globs() {
        assert!(m("*", "anything"));
        assert!(m("a*", "apple"));
        assert!(!m("a*", "banana"));
        assert!(m("?.txt", "a.txt"));
        assert!(!m("?.txt", "ab.txt"));
    }

    #[test]
    fn bracket_classes() {
        assert!(m("[ab]c", "ac"));
        assert!(m("[ab]c", "bc"));
        assert!(!m("[!ab]c", "ac"));
        assert!(m("[0-9]*", "42x"));
        assert!(m("[[:digit:]][[:alpha:]]", "7q"));
    }

    #[test]
    fn literal_bracket_rules() {
        assert!(m("[]]", "]"));
        assert!(m("[!]]", "x"));
    }

    #[test]
    fn escaping() {
        assert!(m("\\*", "*"));
        assert!(!m("\\*", "x"));
    }

    #[test]
    fn nocase() {
        let opts = PatternOpts { extglob: false, nocase: true };
        assert!(matches("HELLO*", "hello world", opts));
    }

    #[test]
    fn extglob_groups() {
        assert!(mx("@(foo|bar)", "foo"));
        assert!(!mx("@(foo|bar)", "baz"));
        assert!(mx("+(ab)", "ababab"));
        assert!(mx("?(x)y", "y"));
        assert!(mx("*(a|b)", ""));
        assert!(mx("!(foo)", "bar"));
        assert!(!mx("!(foo)", "foo"));
        assert!(!mx("!(foo|bar)", "bar"));
    }

    #[test]
    fn glob_char_detection() {
        assert!(has_glob_chars("*.rs"));
        assert!(has_glob_chars("a[bc]"));
        assert!(!has_glob_chars("plain"));
        assert!(!has_glob_chars("esc\\*aped"));
        assert!(!has_glob_chars("a["));
    }

    #[test]
    fn dot_matches_newline() {
        assert!(m("a*b", "a\nb"));
    }
}
