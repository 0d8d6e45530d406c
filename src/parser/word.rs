//! Word parsing: raw token text to structured [`Word`] parts.
//!
//! The lexer hands over each word's raw text with quotes and nested
//! constructs intact; this module turns it into the ordered part list the
//! expander consumes. Three scanning modes share one scanner: normal,
//! double-quoted, and here-document bodies (expansion without quoting).

use crate::ast::*;
use crate::parser::{arith, SyntaxError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    Double,
    Heredoc,
}

/// Parse one word in normal mode.
pub fn parse_word(raw: &str, line: u32) -> Result<Word, SyntaxError> {
    let mut sc = Scanner::new(raw, line, false);
    let parts = sc.scan(Mode::Normal)?;
    Ok(Word { parts })
}

/// Parse the right-hand side of an assignment (tilde also expands after
/// unquoted colons).
pub fn parse_assign_rhs(raw: &str, line: u32) -> Result<Word, SyntaxError> {
    let mut sc = Scanner::new(raw, line, true);
    let parts = sc.scan(Mode::Normal)?;
    Ok(Word { parts })
}

/// Parse an unquoted here-document body: `$`, backquote and backslash are
/// live, everything else is literal.
pub fn parse_heredoc_body(text: &str, line: u32) -> Result<Word, SyntaxError> {
    let mut sc = Scanner::new(text, line, false);
    let parts = sc.scan(Mode::Heredoc)?;
    Ok(Word { parts })
}

/// Split `NAME[sub]+=value` raw text into an [`Assignment`].
pub fn parse_assignment(raw: &str, line: u32) -> Result<Assignment, SyntaxError> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
    }
    let name = raw[..i].to_string();
    let mut subscript = None;
    if i < bytes.len() && bytes[i] == b'[' {
        let mut depth = 1;
        let sub_start = i + 1;
        i += 1;
        while i < bytes.len() && depth > 0 {
            match bytes[i] {
                b'[' => depth += 1,
                b']' => depth -= 1,
                _ => {}
            }
            i += 1;
        }
        subscript = Some(raw[sub_start..i - 1].to_string());
    }
    let append = i < bytes.len() && bytes[i] == b'+';
    if append {
        i += 1;
    }
    debug_assert!(i < bytes.len() && bytes[i] == b'=');
    i += 1;
    let value_raw = &raw[i..];

    let value = if value_raw.starts_with('(') && value_raw.ends_with(')') {
        let inner = &value_raw[1..value_raw.len() - 1];
        AssignValue::Array(parse_array_elems(inner, line)?)
    } else if value_raw.is_empty() {
        AssignValue::Empty
    } else {
        AssignValue::Scalar(parse_assign_rhs(value_raw, line)?)
    };
    Ok(Assignment { name, subscript, append, value })
}

/// Split an array literal body into elements on unquoted whitespace,
/// honoring `[key]=value` element syntax.
fn parse_array_elems(inner: &str, line: u32) -> Result<Vec<ArrayElem>, SyntaxError> {
    let mut elems = Vec::new();
    for piece in split_unquoted_whitespace(inner) {
        let (key, value_raw) = match elem_key(&piece) {
            Some((k, rest)) => (Some(k), rest),
            None => (None, piece.clone()),
        };
        elems.push(ArrayElem { key, value: parse_assign_rhs(&value_raw, line)? });
    }
    Ok(elems)
}

fn elem_key(piece: &str) -> Option<(String, String)> {
    let bytes = piece.as_bytes();
    if bytes.first() != Some(&b'[') {
        return None;
    }
    let mut depth = 1;
    let mut i = 1;
    while i < bytes.len() && depth > 0 {
        match bytes[i] {
            b'[' => depth += 1,
            b']' => depth -= 1,
            _ => {}
        }
        i += 1;
    }
    if depth == 0 && i < bytes.len() && bytes[i] == b'=' {
        Some((piece[1..i - 1].to_string(), piece[i + 1..].to_string()))
    } else {
        None
    }
}

fn split_unquoted_whitespace(s: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b' ' | b'\t' | b'\n' => {
                if !cur.is_empty() {
                    out.push(std::mem::take(&mut cur));
                }
                i += 1;
            }
            b'\'' => {
                cur.push('\'');
                i += 1;
                while i < bytes.len() && bytes[i] != b'\'' {
                    cur.push(bytes[i] as char);
                    i += 1;
                }
                if i < bytes.len() {
                    cur.push('\'');
                    i += 1;
                }
            }
            b'"' => {
                cur.push('"');
                i += 1;
                while i < bytes.len() && bytes[i] != b'"' {
                    if bytes[i] == b'\\' && i + 1 < bytes.len() {
                        cur.push('\\');
                        i += 1;
                    }
                    cur.push(bytes[i] as char);
                    i += 1;
                }
                if i < bytes.len() {
                    cur.push('"');
                    i += 1;
                }
            }
            b'\\' => {
                cur.push('\\');
                i += 1;
                if i < bytes.len() {
                    cur.push(bytes[i] as char);
                    i += 1;
                }
            }
            b'$' | b'`' => {
                // Copy the whole construct so embedded spaces don't split.
                let len = construct_len(&s[i..]);
                cur.push_str(&s[i..i + len]);
                i += len;
            }
            c => {
                cur.push(c as char);
                i += 1;
            }
        }
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    out
}

/// Length of a `$`- or backquote-introduced construct at the start of `s`.
fn construct_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    if bytes[0] == b'`' {
        let mut i = 1;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' => i += 2,
                b'`' => return i + 1,
                _ => i += 1,
            }
        }
        return bytes.len();
    }
    match bytes.get(1) {
        Some(b'(') | Some(b'{') => {
            let (open, close) = if bytes[1] == b'(' { (b'(', b')') } else { (b'{', b'}') };
            let mut depth = 0usize;
            let mut i = 1;
            while i < bytes.len() {
                let b = bytes[i];
                if b == open {
                    depth += 1;
                } else if b == close {
                    depth -= 1;
                    if depth == 0 {
                        return i + 1;
                    }
                } else if b == b'\'' {
                    i += 1;
                    while i < bytes.len() && bytes[i] != b'\'' {
                        i += 1;
                    }
                } else if b == b'\\' {
                    i += 1;
                }
                i += 1;
            }
            bytes.len()
        }
        Some(b'\'') => {
            let mut i = 2;
            while i < bytes.len() {
                match bytes[i] {
                    b'\\' => i += 2,
                    b'\'' => return i + 1,
                    _ => i += 1,
                }
            }
            bytes.len()
        }
        _ => {
            let mut i = 1;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            i.max(1)
        }
    }
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    assign_mode: bool,
    lit: String,
}

impl Scanner {
    fn new(raw: &str, line: u32, assign_mode: bool) -> Self {
        Scanner { chars: raw.chars().collect(), pos: 0, line, assign_mode, lit: String::new() }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn flush_lit(&mut self, parts: &mut Vec<WordPart>) {
        if !self.lit.is_empty() {
            parts.push(WordPart::Literal(std::mem::take(&mut self.lit)));
        }
    }

    fn scan(&mut self, mode: Mode) -> Result<Vec<WordPart>, SyntaxError> {
        let mut parts = Vec::new();
        while let Some(c) = self.peek() {
            match (mode, c) {
                (Mode::Double, '"') => break,
                (Mode::Normal, '\'') => {
                    self.flush_lit(&mut parts);
                    self.bump();
                    let mut s = String::new();
                    loop {
                        match self.bump() {
                            Some('\'') => break,
                            Some(c) => s.push(c),
                            None => return Err(SyntaxError::unmatched("'", self.line)),
                        }
                    }
                    parts.push(WordPart::SingleQuoted(s));
                }
                (Mode::Normal, '"') => {
                    self.flush_lit(&mut parts);
                    self.bump();
                    let inner = self.scan(Mode::Double)?;
                    match self.bump() {
                        Some('"') => {}
                        _ => return Err(SyntaxError::unmatched("\"", self.line)),
                    }
                    parts.push(WordPart::DoubleQuoted(inner));
                }
                (Mode::Normal, '\\') => {
                    self.flush_lit(&mut parts);
                    self.bump();
                    match self.bump() {
                        Some(c) => parts.push(WordPart::Escaped(c.to_string())),
                        None => self.lit.push('\\'),
                    }
                }
                (Mode::Double, '\\') | (Mode::Heredoc, '\\') => {
                    let escapable: &[char] = if mode == Mode::Double {
                        &['$', '`', '"', '\\']
                    } else {
                        &['$', '`', '\\']
                    };
                    match self.peek_at(1) {
                        Some(c) if escapable.contains(&c) => {
                            self.flush_lit(&mut parts);
                            self.bump();
                            self.bump();
                            parts.push(WordPart::Escaped(c.to_string()));
                        }
                        _ => {
                            self.bump();
                            self.lit.push('\\');
                        }
                    }
                }
                (_, '$') => {
                    self.scan_dollar(mode, &mut parts)?;
                }
                (_, '`') => {
                    self.flush_lit(&mut parts);
                    self.bump();
                    let mut body = String::new();
                    loop {
                        match self.bump() {
                            Some('`') => break,
                            Some('\\') => match self.bump() {
                                Some(c @ ('$' | '`' | '\\')) => body.push(c),
                                Some(c) => {
                                    body.push('\\');
                                    body.push(c);
                                }
                                None => return Err(SyntaxError::unmatched("`", self.line)),
                            },
                            Some(c) => body.push(c),
                            None => return Err(SyntaxError::unmatched("`", self.line)),
                        }
                    }
                    let script = crate::parser::parse(&body)?;
                    parts.push(WordPart::CommandSub { script, backquoted: true });
                }
                (Mode::Normal, '~')
                    if self.lit.is_empty() && parts.is_empty()
                        || (self.assign_mode && self.lit.ends_with(':')) =>
                {
                    self.flush_lit(&mut parts);
                    self.bump();
                    let mut user = String::new();
                    while let Some(c) = self.peek() {
                        if c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-' {
                            user.push(c);
                            self.bump();
                        } else if (c == '+' || c == '-') && user.is_empty() {
                            user.push(c);
                            self.bump();
                            break;
                        } else {
                            break;
                        }
                    }
                    parts.push(WordPart::Tilde { user: if user.is_empty() { None } else { Some(user) } });
                }
                (Mode::Normal, '{') => {
                    if let Some(items) = self.try_brace(&mut parts)? {
                        parts.push(WordPart::Brace(items));
                    }
                }
                (Mode::Normal, '<') | (Mode::Normal, '>') if self.peek_at(1) == Some('(') => {
                    self.flush_lit(&mut parts);
                    let write = c == '>';
                    self.bump();
                    let body = self.balanced(b'(', b')')?;
                    let script = crate::parser::parse(&body)?;
                    parts.push(WordPart::ProcessSub { script, write });
                }
                (Mode::Normal, '*') | (Mode::Normal, '?') => {
                    self.flush_lit(&mut parts);
                    self.bump();
                    if self.peek() == Some('(') {
                        // extglob: ?(...) / *(...)
                        let body = self.balanced(b'(', b')')?;
                        parts.push(WordPart::Glob(format!("{c}({body})")));
                    } else {
                        parts.push(WordPart::Glob(c.to_string()));
                    }
                }
                (Mode::Normal, '@' | '+' | '!') if self.peek_at(1) == Some('(') => {
                    self.flush_lit(&mut parts);
                    self.bump();
                    let body = self.balanced(b'(', b')')?;
                    parts.push(WordPart::Glob(format!("{c}({body})")));
                }
                (Mode::Normal, '[') => {
                    if let Some(expr) = self.try_bracket_class() {
                        self.flush_lit(&mut parts);
                        parts.push(WordPart::Glob(expr));
                    } else {
                        self.bump();
                        self.lit.push('[');
                    }
                }
                (_, c) => {
                    self.bump();
                    self.lit.push(c);
                }
            }
        }
        self.flush_lit(&mut parts);
        Ok(parts)
    }

    /// Consume a balanced `open...close` region starting at `open`;
    /// returns the inner text.
    fn balanced(&mut self, open: u8, close: u8) -> Result<String, SyntaxError> {
        let (open, close) = (open as char, close as char);
        debug_assert_eq!(self.peek(), Some(open));
        self.bump();
        let mut depth = 1usize;
        let mut out = String::new();
        while let Some(c) = self.bump() {
            if c == open {
                depth += 1;
            } else if c == close {
                depth -= 1;
                if depth == 0 {
                    return Ok(out);
                }
            } else if c == '\'' {
                out.push('\'');
                loop {
                    match self.bump() {
                        Some('\'') => break,
                        Some(c) => out.push(c),
                        None => return Err(SyntaxError::unmatched("'", self.line)),
                    }
                }
                out.push('\'');
                continue;
            } else if c == '\\' {
                out.push('\\');
                if let Some(c2) = self.bump() {
                    out.push(c2);
                }
                continue;
            }
            out.push(c);
        }
        Err(SyntaxError::unmatched(&close.to_string(), self.line))
    }

    fn scan_dollar(&mut self, mode: Mode, parts: &mut Vec<WordPart>) -> Result<(), SyntaxError> {
        match self.peek_at(1) {
            Some('(') => {
                self.flush_lit(parts);
                self.bump(); // $
                if self.peek_at(1) == Some('(') {
                    if let Some(inner) = self.try_arith_expansion()? {
                        parts.push(WordPart::ArithSub(
                            arith::parse_arith(&inner).unwrap_or_else(|msg| ArithExpr::Invalid {
                                text: inner.clone(),
                                message: msg,
                            }),
                        ));
                        return Ok(());
                    }
                }
                let body = self.balanced(b'(', b')')?;
                let script = crate::parser::parse(&body)?;
                parts.push(WordPart::CommandSub { script, backquoted: false });
                Ok(())
            }
            Some('{') => {
                self.flush_lit(parts);
                self.bump(); // $
                let inner = self.balanced(b'{', b'}')?;
                parts.push(WordPart::Param(parse_param(&inner, self.line)?));
                Ok(())
            }
            Some('\'') if mode == Mode::Normal => {
                self.flush_lit(parts);
                self.bump(); // $
                self.bump(); // '
                let mut body = String::new();
                loop {
                    match self.bump() {
                        Some('\'') => break,
                        Some('\\') => {
                            body.push('\\');
                            if let Some(c) = self.bump() {
                                body.push(c);
                            }
                        }
                        Some(c) => body.push(c),
                        None => return Err(SyntaxError::unmatched("'", self.line)),
                    }
                }
                parts.push(WordPart::AnsiQuoted(decode_ansi_c(&body)));
                Ok(())
            }
            Some('"') if mode == Mode::Normal => {
                // $"..." locale string behaves like a plain double quote.
                self.bump();
                Ok(())
            }
            Some(c) if c.is_ascii_digit() => {
                self.flush_lit(parts);
                self.bump();
                let d = self.bump().unwrap();
                parts.push(WordPart::Param(ParamExp { name: d.to_string(), op: None }));
                Ok(())
            }
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                self.flush_lit(parts);
                self.bump();
                let mut name = String::new();
                while let Some(c) = self.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        name.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
                parts.push(WordPart::Param(ParamExp { name, op: None }));
                Ok(())
            }
            Some(c @ ('@' | '*' | '#' | '?' | '$' | '!' | '-')) => {
                self.flush_lit(parts);
                self.bump();
                self.bump();
                parts.push(WordPart::Param(ParamExp { name: c.to_string(), op: None }));
                Ok(())
            }
            _ => {
                self.bump();
                self.lit.push('$');
                Ok(())
            }
        }
    }

    /// At `((` after a consumed `$`: if the construct is arithmetic,
    /// consume it fully and return the inner text; otherwise leave the
    /// scanner at the first `(` so it re-reads as command substitution.
    fn try_arith_expansion(&mut self) -> Result<Option<String>, SyntaxError> {
        let start = self.pos; // at first '('
        let mut i = self.pos + 2;
        let mut depth = 1usize;
        while i < self.chars.len() {
            match self.chars[i] {
                '\'' => {
                    i += 1;
                    while i < self.chars.len() && self.chars[i] != '\'' {
                        i += 1;
                    }
                }
                '"' => {
                    i += 1;
                    while i < self.chars.len() && self.chars[i] != '"' {
                        if self.chars[i] == '\\' {
                            i += 1;
                        }
                        i += 1;
                    }
                }
                '\\' => i += 1,
                '(' => depth += 1,
                ')' => {
                    if depth == 1 {
                        if self.chars.get(i + 1) == Some(&')') {
                            let inner: String =
                                self.chars[start + 2..i].iter().collect();
                            self.pos = i + 2;
                            return Ok(Some(inner));
                        }
                        return Ok(None);
                    }
                    depth -= 1;
                }
                '|' | ';' | '\n' if depth == 1 => return Ok(None),
                '&' if depth == 1 && self.chars.get(i + 1) == Some(&'&') => return Ok(None),
                _ => {}
            }
            i += 1;
        }
        Err(SyntaxError::unmatched("))", self.line))
    }

    /// Brace expansion attempt. On success returns the item list with the
    /// scanner past the closing brace; on failure pushes a literal `{` and
    /// leaves the scanner just after it.
    fn try_brace(&mut self, parts: &mut Vec<WordPart>) -> Result<Option<Vec<BraceItem>>, SyntaxError> {
        let Some(inner_end) = self.find_brace_close() else {
            self.bump();
            self.lit.push('{');
            return Ok(None);
        };
        let inner: String = self.chars[self.pos + 1..inner_end].iter().collect();
        let pieces = split_brace_items(&inner);
        if pieces.len() > 1 {
            self.flush_lit(parts);
            let mut items = Vec::new();
            for piece in pieces {
                let word = parse_word(&piece, self.line)?;
                items.push(BraceItem::Word(word));
            }
            self.pos = inner_end + 1;
            return Ok(Some(items));
        }
        if let Some(range) = parse_brace_range(&inner) {
            self.flush_lit(parts);
            self.pos = inner_end + 1;
            return Ok(Some(vec![range]));
        }
        self.bump();
        self.lit.push('{');
        Ok(None)
    }

    /// Find the index of the matching `}` for the `{` at the current
    /// position, or None when unbalanced.
    fn find_brace_close(&self) -> Option<usize> {
        let mut depth = 0usize;
        let mut i = self.pos;
        while i < self.chars.len() {
            match self.chars[i] {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                '\'' => {
                    i += 1;
                    while i < self.chars.len() && self.chars[i] != '\'' {
                        i += 1;
                    }
                }
                '"' => {
                    i += 1;
                    while i < self.chars.len() && self.chars[i] != '"' {
                        if self.chars[i] == '\\' {
                            i += 1;
                        }
                        i += 1;
                    }
                }
                '\\' => i += 1,
                '$' => {
                    // Skip a whole construct so its braces don't count.
                    let rest: String = self.chars[i..].iter().collect();
                    let len = construct_len(&rest);
                    i += len;
                    continue;
                }
                _ => {}
            }
            i += 1;
        }
        None
    }

    /// `[...]` bracket expression: returns the whole text when a closing
    /// bracket exists (per glob rules, `]` first is literal).
    fn try_bracket_class(&mut self) -> Option<String> {
        let chars = &self.chars;
        let mut i = self.pos + 1;
        if matches!(chars.get(i), Some('!') | Some('^')) {
            i += 1;
        }
        if chars.get(i) == Some(&']') {
            i += 1;
        }
        let mut end = None;
        while i < chars.len() {
            match chars[i] {
                ']' => {
                    end = Some(i);
                    break;
                }
                '[' if chars.get(i + 1) == Some(&':') => {
                    // POSIX class [:alpha:]
                    let mut j = i + 2;
                    while j < chars.len() && chars[j] != ':' {
                        j += 1;
                    }
                    if chars.get(j) == Some(&':') && chars.get(j + 1) == Some(&']') {
                        i = j + 2;
                        continue;
                    }
                    i += 1;
                }
                _ => i += 1,
            }
        }
        let end = end?;
        let expr: String = chars[self.pos..=end].iter().collect();
        self.pos = end + 1;
        Some(expr)
    }
}

/// Split brace body on top-level commas; a single piece means "not a list".
fn split_brace_items(inner: &str) -> Vec<String> {
    let chars: Vec<char> = inner.chars().collect();
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut depth = 0usize;
    let mut i = 0;
    let mut found_comma = false;
    while i < chars.len() {
        match chars[i] {
            '{' => {
                depth += 1;
                cur.push('{');
            }
            '}' => {
                depth = depth.saturating_sub(1);
                cur.push('}');
            }
            ',' if depth == 0 => {
                found_comma = true;
                out.push(std::mem::take(&mut cur));
            }
            '\\' => {
                cur.push('\\');
                if i + 1 < chars.len() {
                    i += 1;
                    cur.push(chars[i]);
                }
            }
            '\'' => {
                cur.push('\'');
                i += 1;
                while i < chars.len() && chars[i] != '\'' {
                    cur.push(chars[i]);
                    i += 1;
                }
                if i < chars.len() {
                    cur.push('\'');
                }
            }
            c => cur.push(c),
        }
        i += 1;
    }
    out.push(cur);
    if !found_comma {
        // Collapse back to a single piece so the caller tries a range.
        let whole = out.join(",");
        return vec![whole];
    }
    out
}

/// `{1..5}`, `{a..f}`, `{01..10..2}` range forms.
fn parse_brace_range(inner: &str) -> Option<BraceItem> {
    let (head, step) = match inner.rfind("..") {
        Some(idx) if inner[..idx].contains("..") => {
            let step_txt = &inner[idx + 2..];
            let step: i64 = step_txt.parse().ok()?;
            (&inner[..idx], Some(step))
        }
        _ => (inner, None),
    };
    let (from_txt, to_txt) = head.split_once("..")?;
    if let (Ok(from), Ok(to)) = (from_txt.parse::<i64>(), to_txt.parse::<i64>()) {
        let pad = |s: &str| {
            let digits = s.strip_prefix('-').unwrap_or(s);
            digits.len() > 1 && digits.starts_with('0')
        };
        let width = if pad(from_txt) || pad(to_txt) {
            from_txt.trim_start_matches('-').len().max(to_txt.trim_start_matches('-').len())
        } else {
            0
        };
        return Some(BraceItem::NumRange { from, to, step, width });
    }
    let (mut fc, mut tc) = (from_txt.chars(), to_txt.chars());
    match (fc.next(), fc.next(), tc.next(), tc.next()) {
        (Some(f), None, Some(t), None) if f.is_ascii_alphabetic() && t.is_ascii_alphabetic() => {
            Some(BraceItem::CharRange { from: f, to: t, step })
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// ${...} operator parsing
// ---------------------------------------------------------------------------

fn parse_param(content: &str, line: u32) -> Result<ParamExp, SyntaxError> {
    if content.is_empty() {
        return Ok(ParamExp {
            name: String::new(),
            op: Some(ParamOp::BadSubst { text: "${}".to_string() }),
        });
    }

    // ${#...} length family. `${#}`, `${#?}` etc. are still parameters.
    if let Some(rest) = content.strip_prefix('#') {
        if rest.is_empty() {
            return Ok(ParamExp { name: "#".to_string(), op: None });
        }
        if let Some((name, remainder)) = take_param_name(rest) {
            if remainder.is_empty() {
                return Ok(ParamExp { name, op: Some(ParamOp::Length) });
            }
        }
        return Ok(ParamExp {
            name: String::new(),
            op: Some(ParamOp::BadSubst { text: format!("${{{content}}}") }),
        });
    }

    // ${!...} indirection / keys / name-prefix family.
    if let Some(rest) = content.strip_prefix('!') {
        if rest.is_empty() {
            return Ok(ParamExp { name: "!".to_string(), op: None });
        }
        if let Some(prefix) = rest.strip_suffix('*') {
            if is_name_like(prefix) {
                return Ok(ParamExp {
                    name: prefix.to_string(),
                    op: Some(ParamOp::NamePrefix { star: true }),
                });
            }
        }
        if let Some((name, remainder)) = take_param_name(rest) {
            if remainder.is_empty() {
                if let Some(base) = name.strip_suffix("[@]") {
                    return Ok(ParamExp {
                        name: base.to_string(),
                        op: Some(ParamOp::Keys { star: false }),
                    });
                }
                if let Some(base) = name.strip_suffix("[*]") {
                    return Ok(ParamExp {
                        name: base.to_string(),
                        op: Some(ParamOp::Keys { star: true }),
                    });
                }
                return Ok(ParamExp { name, op: Some(ParamOp::Indirect(None)) });
            }
            if remainder == "@" && !name.contains('[') {
                return Ok(ParamExp {
                    name,
                    op: Some(ParamOp::NamePrefix { star: false }),
                });
            }
            let inner = parse_param_op(&name, remainder, line)?;
            return Ok(ParamExp { name, op: Some(ParamOp::Indirect(inner.map(Box::new))) });
        }
        return Ok(ParamExp {
            name: String::new(),
            op: Some(ParamOp::BadSubst { text: format!("${{{content}}}") }),
        });
    }

    match take_param_name(content) {
        Some((name, remainder)) => {
            let op = parse_param_op(&name, remainder, line)?;
            Ok(ParamExp { name, op })
        }
        None => Ok(ParamExp {
            name: String::new(),
            op: Some(ParamOp::BadSubst { text: format!("${{{content}}}") }),
        }),
    }
}

fn is_name_like(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Take a parameter name (plain, special, positional, or with `[...]`
/// subscript) off the front; returns (name, rest).
fn take_param_name(s: &str) -> Option<(String, &str)> {
    let chars: Vec<char> = s.chars().collect();
    let first = *chars.first()?;
    let mut i = if first.is_ascii_digit() {
        let mut i = 0;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
        i
    } else if first.is_ascii_alphabetic() || first == '_' {
        let mut i = 0;
        while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
            i += 1;
        }
        i
    } else if matches!(first, '@' | '*' | '#' | '?' | '$' | '!' | '-') {
        1
    } else {
        return None;
    };

    // Optional subscript glues onto the name.
    if chars.get(i) == Some(&'[') {
        let mut depth = 0usize;
        let mut j = i;
        while j < chars.len() {
            match chars[j] {
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        j += 1;
                        break;
                    }
                }
                _ => {}
            }
            j += 1;
        }
        if depth == 0 {
            i = j;
        }
    }
    let name: String = chars[..i].iter().collect();
    let rest_start: usize = chars[..i].iter().map(|c| c.len_utf8()).sum();
    Some((name, &s[rest_start..]))
}

fn parse_param_op(
    _name: &str,
    rest: &str,
    line: u32,
) -> Result<Option<ParamOp>, SyntaxError> {
    if rest.is_empty() {
        return Ok(None);
    }
    let mut chars = rest.chars();
    let c0 = chars.next().unwrap();
    let after = &rest[c0.len_utf8()..];

    let op = match c0 {
        ':' => match after.chars().next() {
            Some('-') => ParamOp::Default { word: parse_assign_rhs(&after[1..], line)?, or_empty: true },
            Some('=') => ParamOp::Assign { word: parse_assign_rhs(&after[1..], line)?, or_empty: true },
            Some('?') => ParamOp::Error {
                word: nonempty_word(&after[1..], line)?,
                or_empty: true,
            },
            Some('+') => ParamOp::Alternative { word: parse_assign_rhs(&after[1..], line)?, or_empty: true },
            _ => {
                let (off_txt, len_txt) = split_top_level(after, ':');
                let offset = arith_or_invalid(&off_txt);
                let length = len_txt.map(|t| arith_or_invalid(&t));
                ParamOp::Substring { offset, length }
            }
        },
        '-' => ParamOp::Default { word: parse_assign_rhs(after, line)?, or_empty: false },
        '=' => ParamOp::Assign { word: parse_assign_rhs(after, line)?, or_empty: false },
        '?' => ParamOp::Error { word: nonempty_word(after, line)?, or_empty: false },
        '+' => ParamOp::Alternative { word: parse_assign_rhs(after, line)?, or_empty: false },
        '#' => {
            let (greedy, pat) = match after.strip_prefix('#') {
                Some(p) => (true, p),
                None => (false, after),
            };
            ParamOp::StripPattern { pattern: parse_word(pat, line)?, suffix: false, greedy }
        }
        '%' => {
            let (greedy, pat) = match after.strip_prefix('%') {
                Some(p) => (true, p),
                None => (false, after),
            };
            ParamOp::StripPattern { pattern: parse_word(pat, line)?, suffix: true, greedy }
        }
        '/' => {
            let (all, anchor, pat_start) = match after.chars().next() {
                Some('/') => (true, None, 1),
                Some('#') => (false, Some(ReplaceAnchor::Start), 1),
                Some('%') => (false, Some(ReplaceAnchor::End), 1),
                _ => (false, None, 0),
            };
            let body = &after[pat_start..];
            let (pat_txt, rep_txt) = split_top_level(body, '/');
            let pattern = parse_word(&pat_txt, line)?;
            let replacement = match rep_txt {
                Some(t) => Some(parse_assign_rhs(&t, line)?),
                None => None,
            };
            ParamOp::Replace { pattern, replacement, all, anchor }
        }
        '^' => {
            let (all, pat) = match after.strip_prefix('^') {
                Some(p) => (true, p),
                None => (false, after),
            };
            ParamOp::CaseMod { upper: true, all, pattern: nonempty_word(pat, line)? }
        }
        ',' => {
            let (all, pat) = match after.strip_prefix(',') {
                Some(p) => (true, p),
                None => (false, after),
            };
            ParamOp::CaseMod { upper: false, all, pattern: nonempty_word(pat, line)? }
        }
        '@' => match after {
            "Q" => ParamOp::Transform(TransformKind::Quote),
            "P" => ParamOp::Transform(TransformKind::Prompt),
            "a" => ParamOp::Transform(TransformKind::Attrs),
            "A" => ParamOp::Transform(TransformKind::Assignment),
            "E" => ParamOp::Transform(TransformKind::Escape),
            "K" => ParamOp::Transform(TransformKind::Keys),
            _ => ParamOp::BadSubst { text: format!("${{{_name}{rest}}}") },
        },
        _ => ParamOp::BadSubst { text: format!("${{{_name}{rest}}}") },
    };
    Ok(Some(op))
}

fn nonempty_word(s: &str, line: u32) -> Result<Option<Word>, SyntaxError> {
    if s.is_empty() {
        Ok(None)
    } else {
        Ok(Some(parse_assign_rhs(s, line)?))
    }
}

fn arith_or_invalid(text: &str) -> ArithExpr {
    arith::parse_arith(text).unwrap_or_else(|msg| ArithExpr::Invalid {
        text: text.to_string(),
        message: msg,
    })
}

/// Split `s` at the first `sep` that is outside quotes, escapes and
/// `${...}`/`$(...)` nesting.
fn split_top_level(s: &str, sep: char) -> (String, Option<String>) {
    let chars: Vec<char> = s.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            c if c == sep => {
                let head: String = chars[..i].iter().collect();
                let tail: String = chars[i + 1..].iter().collect();
                return (head, Some(tail));
            }
            '\\' => i += 1,
            '\'' => {
                i += 1;
                while i < chars.len() && chars[i] != '\'' {
                    i += 1;
                }
            }
            '"' => {
                i += 1;
                while i < chars.len() && chars[i] != '"' {
                    if chars[i] == '\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            '$' => {
                let rest: String = chars[i..].iter().collect();
                i += construct_len(&rest);
                continue;
            }
            _ => {}
        }
        i += 1;
    }
    (s.to_string(), None)
}

/// Parse one `$`-construct (or backquote) at the start of `s`; returns the
/// part and how many chars were consumed. Used by the arithmetic parser.
pub(crate) fn parse_dollar_construct(
    s: &str,
    line: u32,
) -> Result<(WordPart, usize), SyntaxError> {
    if s.starts_with('`') {
        // Reuse the scanner's backquote path via a full scan of just the
        // construct text.
        let len = construct_len(s);
        let mut inner = Scanner::new(&s[..len], line, false);
        let mut ps = inner.scan(Mode::Normal)?;
        return Ok((ps.remove(0), len));
    }
    let mut sc = Scanner::new(s, line, false);
    let mut parts = Vec::new();
    sc.scan_dollar(Mode::Normal, &mut parts)?;
    let consumed = sc.pos;
    match parts.pop() {
        Some(p) => Ok((p, consumed)),
        None => Ok((WordPart::Literal("$".to_string()), consumed.max(1))),
    }
}

/// Decode `$'...'` C-style escapes.
pub fn decode_ansi_c(s: &str) -> String {
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
            '\'' => out.push('\''),
            '"' => out.push('"'),
            '?' => out.push('?'),
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
                } else if let Some(c) = char::from_u32(val) {
                    out.push(c);
                }
            }
            'u' | 'U' => {
                let max = if c == 'u' { 4 } else { 8 };
                let mut val = 0u32;
                let mut n = 0;
                while n < max && i < chars.len() && chars[i].is_ascii_hexdigit() {
                    val = val * 16 + chars[i].to_digit(16).unwrap();
                    i += 1;
                    n += 1;
                }
                if n == 0 {
                    out.push('\\');
                    out.push(c);
                } else if let Some(c) = char::from_u32(val) {
                    out.push(c);
                }
            }
            'c' => {
                if i < chars.len() {
                    let ctl = chars[i].to_ascii_uppercase() as u32 ^ 0x40;
                    if let Some(c) = char::from_u32(ctl) {
                        out.push(c);
                    }
                    i += 1;
                }
            }
            '0'..='7' => {
                let mut val = c.to_digit(8).unwrap();
                let mut n = 1;
                while n < 3 && i < chars.len() && chars[i].is_digit(8) {
                    val = val * 8 + chars[i].to_digit(8).unwrap();
                    i += 1;
                    n += 1;
                }
                if let Some(c) = char::from_u32(val) {
                    out.push(c);
                }
            }
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
    fn plain_literal() {
        let w = parse_word("hello", 1).unwrap();
        assert_eq!(w.parts, vec![WordPart::Literal("hello".into())]);
    }

    #[test]
    fn quotes_and_escapes() {
        let w = parse_word("a'b c'\\ d", 1).unwrap();
        assert_eq!(
            w.parts,
            vec![
                WordPart::Literal("a".into()),
                WordPart::SingleQuoted("b c".into()),
                WordPart::Escaped(" ".into()),
                WordPart::Literal("d".into()),
            ]
        );
    }

    #[test]
    fn double_quotes_with_expansion() {
        let w = parse_word("\"x $y z\"", 1).unwrap();
        match &w.parts[0] {
            WordPart::DoubleQuoted(parts) => {
                assert_eq!(parts.len(), 3);
                assert!(matches!(&parts[1], WordPart::Param(p) if p.name == "y"));
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn simple_param_and_specials() {
        let w = parse_word("$foo$?$1", 1).unwrap();
        assert_eq!(w.parts.len(), 3);
        assert!(matches!(&w.parts[0], WordPart::Param(p) if p.name == "foo"));
        assert!(matches!(&w.parts[1], WordPart::Param(p) if p.name == "?"));
        assert!(matches!(&w.parts[2], WordPart::Param(p) if p.name == "1"));
    }

    #[test]
    fn multi_digit_positional_needs_braces() {
        let w = parse_word("$12", 1).unwrap();
        assert!(matches!(&w.parts[0], WordPart::Param(p) if p.name == "1"));
        assert!(matches!(&w.parts[1], WordPart::Literal(l) if l == "2"));
        let w = parse_word("${12}", 1).unwrap();
        assert!(matches!(&w.parts[0], WordPart::Param(p) if p.name == "12"));
    }

    #[test]
    fn param_default_ops() {
        let w = parse_word("${v:-fallback}", 1).unwrap();
        match &w.parts[0] {
            WordPart::Param(ParamExp { name, op: Some(ParamOp::Default { or_empty, .. }) }) => {
                assert_eq!(name, "v");
                assert!(*or_empty);
            }
            other => panic!("{other:?}"),
        }
        let w = parse_word("${v-fallback}", 1).unwrap();
        assert!(matches!(
            &w.parts[0],
            WordPart::Param(ParamExp { op: Some(ParamOp::Default { or_empty: false, .. }), .. })
        ));
    }

    #[test]
    fn param_length_and_keys() {
        let w = parse_word("${#arr[@]}", 1).unwrap();
        assert!(matches!(
            &w.parts[0],
            WordPart::Param(ParamExp { name, op: Some(ParamOp::Length) }) if name == "arr[@]"
        ));
        let w = parse_word("${!arr[@]}", 1).unwrap();
        assert!(matches!(
            &w.parts[0],
            WordPart::Param(ParamExp { name, op: Some(ParamOp::Keys { star: false }) }) if name == "arr"
        ));
    }

    #[test]
    fn param_substring() {
        let w = parse_word("${v:1:2}", 1).unwrap();
        match &w.parts[0] {
            WordPart::Param(ParamExp { op: Some(ParamOp::Substring { length, .. }), .. }) => {
                assert!(length.is_some());
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn param_strip_and_replace() {
        let w = parse_word("${path##*/}", 1).unwrap();
        assert!(matches!(
            &w.parts[0],
            WordPart::Param(ParamExp {
                op: Some(ParamOp::StripPattern { suffix: false, greedy: true, .. }),
                ..
            })
        ));
        let w = parse_word("${s//a/b}", 1).unwrap();
        assert!(matches!(
            &w.parts[0],
            WordPart::Param(ParamExp { op: Some(ParamOp::Replace { all: true, .. }), .. })
        ));
    }

    #[test]
    fn param_transform() {
        let w = parse_word("${v@Q}", 1).unwrap();
        assert!(matches!(
            &w.parts[0],
            WordPart::Param(ParamExp { op: Some(ParamOp::Transform(TransformKind::Quote)), .. })
        ));
    }

    #[test]
    fn command_substitution() {
        let w = parse_word("$(echo hi)", 1).unwrap();
        assert!(matches!(&w.parts[0], WordPart::CommandSub { backquoted: false, .. }));
        let w = parse_word("`echo hi`", 1).unwrap();
        assert!(matches!(&w.parts[0], WordPart::CommandSub { backquoted: true, .. }));
    }

    #[test]
    fn arith_vs_nested_subshell() {
        let w = parse_word("$((1+2))", 1).unwrap();
        assert!(matches!(&w.parts[0], WordPart::ArithSub(_)));
        let w = parse_word("$( (echo a) )", 1).unwrap();
        assert!(matches!(&w.parts[0], WordPart::CommandSub { .. }));
        let w = parse_word("$((echo a) | cat)", 1).unwrap();
        assert!(matches!(&w.parts[0], WordPart::CommandSub { .. }));
    }

    #[test]
    fn brace_list_and_range() {
        let w = parse_word("{a,b,c}", 1).unwrap();
        match &w.parts[0] {
            WordPart::Brace(items) => assert_eq!(items.len(), 3),
            other => panic!("{other:?}"),
        }
        let w = parse_word("{05..10}", 1).unwrap();
        assert!(matches!(
            &w.parts[0],
            WordPart::Brace(items) if matches!(items[0], BraceItem::NumRange { width: 2, .. })
        ));
        let w = parse_word("{abc}", 1).unwrap();
        assert_eq!(w.parts, vec![WordPart::Literal("{abc}".into())]);
    }

    #[test]
    fn tilde_only_at_start() {
        let w = parse_word("~/x", 1).unwrap();
        assert!(matches!(&w.parts[0], WordPart::Tilde { user: None }));
        let w = parse_word("a~b", 1).unwrap();
        assert_eq!(w.parts, vec![WordPart::Literal("a~b".into())]);
    }

    #[test]
    fn glob_parts() {
        let w = parse_word("*.txt", 1).unwrap();
        assert!(matches!(&w.parts[0], WordPart::Glob(g) if g == "*"));
        let w = parse_word("[ab]c", 1).unwrap();
        assert!(matches!(&w.parts[0], WordPart::Glob(g) if g == "[ab]"));
        let w = parse_word("a[", 1).unwrap();
        assert_eq!(w.parts, vec![WordPart::Literal("a[".into())]);
    }

    #[test]
    fn extglob_captured_whole() {
        let w = parse_word("@(foo|bar)", 1).unwrap();
        assert!(matches!(&w.parts[0], WordPart::Glob(g) if g == "@(foo|bar)"));
    }

    #[test]
    fn assignment_parsing() {
        let a = parse_assignment("x=1", 1).unwrap();
        assert_eq!(a.name, "x");
        assert!(!a.append);
        assert!(matches!(a.value, AssignValue::Scalar(_)));

        let a = parse_assignment("x+=y", 1).unwrap();
        assert!(a.append);

        let a = parse_assignment("a[2]=v", 1).unwrap();
        assert_eq!(a.subscript.as_deref(), Some("2"));

        let a = parse_assignment("arr=(1 2 3)", 1).unwrap();
        match a.value {
            AssignValue::Array(elems) => assert_eq!(elems.len(), 3),
            other => panic!("{other:?}"),
        }

        let a = parse_assignment("map=([k]=v [j]=w)", 1).unwrap();
        match a.value {
            AssignValue::Array(elems) => {
                assert_eq!(elems[0].key.as_deref(), Some("k"));
                assert_eq!(elems[1].key.as_deref(), Some("j"));
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn ansi_c_decoding() {
        assert_eq!(decode_ansi_c("a\\nb"), "a\nb");
        assert_eq!(decode_ansi_c("\\x41\\x42"), "AB");
        assert_eq!(decode_ansi_c("\\u00e9"), "é");
        assert_eq!(decode_ansi_c("\\101"), "A");
        assert_eq!(decode_ansi_c("\\cA"), "\u{1}");
    }

    #[test]
    fn heredoc_body_mode() {
        let w = parse_heredoc_body("line $x\n\"not quoted\"\n", 1).unwrap();
        assert!(w.parts.iter().any(|p| matches!(p, WordPart::Param(_))));
        assert!(w
            .parts
            .iter()
            .any(|p| matches!(p, WordPart::Literal(l) if l.contains("\"not quoted\""))));
    }

    #[test]
    fn bad_substitution_is_deferred() {
        let w = parse_word("${#v:1}", 1).unwrap();
        assert!(matches!(
            &w.parts[0],
            WordPart::Param(ParamExp { op: Some(ParamOp::BadSubst { .. }), .. })
        ));
    }
}
