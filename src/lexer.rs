//! Tokenizer for shell source.
//!
//! Words are accreted as raw text with quoting and nested constructs kept
//! intact; the word parser structures them later. The lexer owns the
//! context-sensitive pieces: here-document bodies, `(( ... ))` capture at
//! command position (with the subshell-vs-arithmetic heuristic), and the
//! `[[ ... ]]` mode where redirection characters become comparison
//! operators.

use crate::parser::SyntaxError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    /// `NAME=...`, `NAME+=...`, `NAME[sub]=...` at any position; the parser
    /// downgrades it to Word once a command name has been seen.
    AssignmentWord,
    /// Digits immediately followed by `<` or `>`.
    Number,
    /// `{name}` immediately followed by a redirection operator.
    FdVar,
    Newline,
    Semi,
    Amp,
    AndIf,     // &&
    OrIf,      // ||
    Pipe,      // |
    PipeAmp,   // |&
    DSemi,     // ;;
    SemiAnd,   // ;&
    DSemiAnd,  // ;;&
    LParen,
    RParen,
    Less,      // <
    Great,     // >
    DLess,     // <<
    DLessDash, // <<-
    DGreat,    // >>
    LessAnd,   // <&
    GreatAnd,  // >&
    LessGreat, // <>
    Clobber,   // >|
    TLess,     // <<<
    AndGreat,  // &>
    AndDGreat, // &>>
    /// `(( ... ))` at command position; `text` holds the inner expression.
    ArithCmd,
    CondStart, // [[
    CondEnd,   // ]]
    /// Operator token inside `[[ ]]`: `!`, `(`, `)`, `&&`, `||`, `<`, `>`.
    CondOp,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: u32,
    /// Byte offset of the token start in the original source.
    pub offset: usize,
    /// True when any character of the token came from a quoted region;
    /// quoted words are never keywords.
    pub quoted: bool,
}

impl Token {
    fn op(kind: TokenKind, text: &str, line: u32, offset: usize) -> Self {
        Token { kind, text: text.to_string(), line, offset, quoted: false }
    }
}

/// One collected here-document body, in order of `<<` appearance.
#[derive(Debug, Clone)]
pub struct HereDocText {
    pub delimiter: String,
    pub body: String,
    pub strip_tabs: bool,
    pub quoted: bool,
}

#[derive(Debug, Clone)]
struct PendingHereDoc {
    delimiter: String,
    strip_tabs: bool,
    quoted: bool,
}

pub struct LexOutput {
    pub tokens: Vec<Token>,
    pub heredocs: Vec<HereDocText>,
}

pub fn tokenize(src: &str) -> Result<LexOutput, SyntaxError> {
    Lexer::new(src).run()
}

struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: u32,
    tokens: Vec<Token>,
    pending: Vec<PendingHereDoc>,
    heredocs: Vec<HereDocText>,
    cond_depth: u32,
    /// Set right after an `=~` operator so the next word keeps regex
    /// metacharacters like parentheses.
    regex_rhs: bool,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Lexer {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            line: 1,
            tokens: Vec::new(),
            pending: Vec::new(),
            heredocs: Vec::new(),
            cond_depth: 0,
            regex_rhs: false,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
        }
        Some(b)
    }

    fn starts_with(&self, s: &str) -> bool {
        self.src[self.pos..].starts_with(s)
    }

    /// Is the next token in command position (where `((`, `[[` and
    /// keywords may appear)?
    fn at_command_start(&self) -> bool {
        match self.tokens.last() {
            None => true,
            Some(t) => match t.kind {
                TokenKind::Newline
                | TokenKind::Semi
                | TokenKind::Amp
                | TokenKind::AndIf
                | TokenKind::OrIf
                | TokenKind::Pipe
                | TokenKind::PipeAmp
                | TokenKind::DSemi
                | TokenKind::SemiAnd
                | TokenKind::DSemiAnd
                | TokenKind::LParen => true,
                // A prefix assignment demotes a following `((` or `[[`
                // to an ordinary command name.
                TokenKind::AssignmentWord => false,
                TokenKind::Word if !t.quoted => matches!(
                    t.text.as_str(),
                    "if" | "then" | "elif" | "else" | "while" | "until" | "do" | "{" | "!"
                        | "time" | "function"
                ),
                _ => false,
            },
        }
    }

    fn run(mut self) -> Result<LexOutput, SyntaxError> {
        loop {
            self.skip_blanks_and_comments();
            if self.cond_depth > 0 {
                if !self.next_cond_token()? {
                    break;
                }
                continue;
            }
            match self.peek() {
                None => break,
                Some(b'\n') => {
                    let (line, offset) = (self.line, self.pos);
                    self.bump();
                    self.tokens.push(Token::op(TokenKind::Newline, "\n", line, offset));
                    self.collect_heredocs()?;
                }
                Some(_) => {
                    if !self.next_operator()? {
                        self.next_word()?;
                    }
                }
            }
        }
        if !self.pending.is_empty() {
            let delim = self.pending[0].delimiter.clone();
            // A heredoc start on the final line with no trailing newline.
            self.collect_heredocs()?;
            if !self.pending.is_empty() {
                return Err(SyntaxError::unmatched(&delim, self.line));
            }
        }
        self.tokens.push(Token::op(TokenKind::Eof, "", self.line, self.pos));
        Ok(LexOutput { tokens: self.tokens, heredocs: self.heredocs })
    }

    fn skip_blanks_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\r') => {
                    self.bump();
                }
                Some(b'\\') if self.peek_at(1) == Some(b'\n') => {
                    self.bump();
                    self.bump();
                }
                Some(b'#') => {
                    while let Some(b) = self.peek() {
                        if b == b'\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => return,
            }
        }
    }

    /// Try to consume an operator; false means the caller should scan a word.
    fn next_operator(&mut self) -> Result<bool, SyntaxError> {
        let (line, offset) = (self.line, self.pos);
        let table: &[(&str, TokenKind)] = &[
            (";;&", TokenKind::DSemiAnd),
            (";;", TokenKind::DSemi),
            (";&", TokenKind::SemiAnd),
            (";", TokenKind::Semi),
            ("&&", TokenKind::AndIf),
            ("&>>", TokenKind::AndDGreat),
            ("&>", TokenKind::AndGreat),
            ("&", TokenKind::Amp),
            ("||", TokenKind::OrIf),
            ("|&", TokenKind::PipeAmp),
            ("|", TokenKind::Pipe),
            ("<<<", TokenKind::TLess),
            ("<<-", TokenKind::DLessDash),
            ("<<", TokenKind::DLess),
            ("<>", TokenKind::LessGreat),
            ("<&", TokenKind::LessAnd),
            ("<", TokenKind::Less),
            (">>", TokenKind::DGreat),
            (">&", TokenKind::GreatAnd),
            (">|", TokenKind::Clobber),
            (">", TokenKind::Great),
            (")", TokenKind::RParen),
        ];

        // Process substitution glues to a word, not an operator.
        if self.starts_with("<(") || self.starts_with(">(") {
            return Ok(false);
        }
        if self.starts_with("((") {
            // After `for`, the header is always arithmetic and may contain
            // top-level semicolons, so capture unconditionally.
            let after_for = matches!(
                self.tokens.last(),
                Some(t) if t.kind == TokenKind::Word && !t.quoted && t.text == "for"
            );
            if after_for {
                self.capture_double_paren(line, offset)?;
                return Ok(true);
            }
            if self.at_command_start() && self.try_arith_command(line, offset)? {
                return Ok(true);
            }
        }
        if self.starts_with("(") {
            self.bump();
            self.tokens.push(Token::op(TokenKind::LParen, "(", line, offset));
            return Ok(true);
        }
        if self.starts_with("[[") && self.at_command_start() {
            let next = self.peek_at(2);
            if next.is_none() || matches!(next, Some(b' ') | Some(b'\t') | Some(b'\n')) {
                self.bump();
                self.bump();
                self.tokens.push(Token::op(TokenKind::CondStart, "[[", line, offset));
                self.cond_depth = 1;
                return Ok(true);
            }
        }
        for (text, kind) in table {
            if self.starts_with(text) {
                for _ in 0..text.len() {
                    self.bump();
                }
                self.tokens.push(Token::op(*kind, text, line, offset));
                if matches!(kind, TokenKind::DLess | TokenKind::DLessDash) {
                    self.register_heredoc(*kind == TokenKind::DLessDash)?;
                }
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// At `((` in command position: capture balanced arithmetic text, or
    /// report false so the input re-lexes as a subshell. Command
    /// substitution's rule applies here too: two separated `)`s, or a
    /// top-level `|`, `||`, `&&`, `;` or newline, mean "not arithmetic".
    fn try_arith_command(&mut self, line: u32, offset: usize) -> Result<bool, SyntaxError> {
        let start = self.pos + 2;
        let mut i = start;
        let b = self.bytes;
        let mut depth = 1usize; // depth within the inner expression
        while i < b.len() {
            match b[i] {
                b'\'' => {
                    i += 1;
                    while i < b.len() && b[i] != b'\'' {
                        i += 1;
                    }
                }
                b'"' => {
                    i += 1;
                    while i < b.len() && b[i] != b'"' {
                        if b[i] == b'\\' {
                            i += 1;
                        }
                        i += 1;
                    }
                }
                b'\\' => i += 1,
                b'(' => depth += 1,
                b')' => {
                    if depth == 1 {
                        if i + 1 < b.len() && b[i + 1] == b')' {
                            let inner = self.src[start..i].to_string();
                            while self.pos < i + 2 {
                                self.bump();
                            }
                            self.tokens.push(Token {
                                kind: TokenKind::ArithCmd,
                                text: inner,
                                line,
                                offset,
                                quoted: false,
                            });
                            return Ok(true);
                        }
                        // Single close at depth 1: a subshell after all.
                        return Ok(false);
                    }
                    depth -= 1;
                }
                b'|' | b';' | b'\n' if depth == 1 => return Ok(false),
                b'&' if depth == 1 && i + 1 < b.len() && b[i + 1] == b'&' => return Ok(false),
                _ => {}
            }
            i += 1;
        }
        Err(SyntaxError::unmatched("))", self.line))
    }

    /// Capture `(( ... ))` to the matching close unconditionally (used for
    /// C-style `for` headers, where `;` is part of the content).
    fn capture_double_paren(&mut self, line: u32, offset: usize) -> Result<(), SyntaxError> {
        let start = self.pos + 2;
        let mut i = start;
        let b = self.bytes;
        let mut depth = 2usize;
        let mut inner_end = start;
        while i < b.len() {
            match b[i] {
                b'\'' => {
                    i += 1;
                    while i < b.len() && b[i] != b'\'' {
                        i += 1;
                    }
                }
                b'"' => {
                    i += 1;
                    while i < b.len() && b[i] != b'"' {
                        if b[i] == b'\\' {
                            i += 1;
                        }
                        i += 1;
                    }
                }
                b'\\' => i += 1,
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 1 {
                        inner_end = i;
                    }
                    if depth == 0 {
                        let inner = self.src[start..inner_end].to_string();
                        while self.pos <= i {
                            self.bump();
                        }
                        self.tokens.push(Token {
                            kind: TokenKind::ArithCmd,
                            text: inner,
                            line,
                            offset,
                            quoted: false,
                        });
                        return Ok(());
                    }
                }
                _ => {}
            }
            i += 1;
        }
        Err(SyntaxError::unmatched("))", self.line))
    }

    fn register_heredoc(&mut self, strip_tabs: bool) -> Result<(), SyntaxError> {
        // Scan the delimiter word immediately so the body reader knows it.
        while matches!(self.peek(), Some(b' ') | Some(b'\t')) {
            self.bump();
        }
        let (line, offset) = (self.line, self.pos);
        let raw = self.scan_word_raw(false)?;
        if raw.is_empty() {
            return Err(SyntaxError::near_token("newline", self.line));
        }
        let (delimiter, quoted) = unquote_delimiter(&raw);
        self.tokens.push(Token { kind: TokenKind::Word, text: raw, line, offset, quoted });
        self.pending.push(PendingHereDoc { delimiter, strip_tabs, quoted });
        Ok(())
    }

    fn collect_heredocs(&mut self) -> Result<(), SyntaxError> {
        let pending = std::mem::take(&mut self.pending);
        for here in pending {
            let mut body = String::new();
            loop {
                if self.pos >= self.bytes.len() {
                    return Err(SyntaxError::unmatched(&here.delimiter, self.line));
                }
                let line_start = self.pos;
                while self.pos < self.bytes.len() && self.bytes[self.pos] != b'\n' {
                    self.pos += 1;
                }
                let mut text = &self.src[line_start..self.pos];
                if self.pos < self.bytes.len() {
                    self.bump(); // consume the newline
                }
                if here.strip_tabs {
                    text = text.trim_start_matches('\t');
                }
                if text == here.delimiter {
                    break;
                }
                body.push_str(text);
                body.push('\n');
            }
            self.heredocs.push(HereDocText {
                delimiter: here.delimiter,
                body,
                strip_tabs: here.strip_tabs,
                quoted: here.quoted,
            });
        }
        Ok(())
    }

    fn next_word(&mut self) -> Result<(), SyntaxError> {
        let (line, offset) = (self.line, self.pos);
        let raw = self.scan_word_raw(true)?;
        if raw.is_empty() {
            // Unexpected byte that is neither operator nor word start.
            let ch = self.peek().map(|b| b as char).unwrap_or('\0');
            return Err(SyntaxError::near_token(&ch.to_string(), self.line));
        }
        let quoted = raw_has_quotes(&raw);
        let kind = if !quoted && is_assignment_prefix(&raw) {
            TokenKind::AssignmentWord
        } else if !raw.is_empty()
            && raw.bytes().all(|b| b.is_ascii_digit())
            && matches!(self.peek(), Some(b'<') | Some(b'>'))
        {
            TokenKind::Number
        } else if is_fd_var(&raw) && matches!(self.peek(), Some(b'<') | Some(b'>')) {
            TokenKind::FdVar
        } else {
            TokenKind::Word
        };
        self.tokens.push(Token { kind, text: raw, line, offset, quoted });
        Ok(())
    }

    /// Accrete one word's raw text. Quotes, expansions and nested balanced
    /// constructs are kept verbatim; a backslash always carries the next
    /// character along.
    fn scan_word_raw(&mut self, allow_array_assign: bool) -> Result<String, SyntaxError> {
        let mut out = String::new();
        loop {
            let Some(b) = self.peek() else { break };
            match b {
                b' ' | b'\t' | b'\n' | b'\r' | b';' | b'&' | b'|' => break,
                b'(' => {
                    // Extended glob operators glue their group on.
                    if matches!(out.chars().last(), Some('?' | '*' | '+' | '@' | '!')) {
                        self.consume_balanced_parens(&mut out)?;
                        continue;
                    }
                    break;
                }
                b')' => break,
                b'<' | b'>' => {
                    if self.peek_at(1) == Some(b'(') {
                        out.push(self.bump().unwrap() as char);
                        self.consume_balanced_parens(&mut out)?;
                        continue;
                    }
                    break;
                }
                b'\\' => {
                    self.bump();
                    match self.peek() {
                        Some(b'\n') => {
                            self.bump();
                        }
                        Some(_) => {
                            out.push('\\');
                            out.push(self.bump().unwrap() as char);
                        }
                        None => out.push('\\'),
                    }
                }
                b'\'' => {
                    out.push('\'');
                    self.bump();
                    loop {
                        match self.bump() {
                            Some(b'\'') => {
                                out.push('\'');
                                break;
                            }
                            Some(c) => out.push(c as char),
                            None => return Err(SyntaxError::unmatched("'", self.line)),
                        }
                    }
                }
                b'"' => {
                    self.consume_double_quoted(&mut out)?;
                }
                b'`' => {
                    self.consume_backquoted(&mut out)?;
                }
                b'$' => {
                    self.consume_dollar(&mut out)?;
                }
                b'=' if allow_array_assign
                    && self.peek_at(1) == Some(b'(')
                    && is_assignment_prefix(&format!("{out}=")) =>
                {
                    out.push('=');
                    self.bump();
                    self.consume_balanced_parens(&mut out)?;
                }
                _ => {
                    out.push(self.bump().unwrap() as char);
                }
            }
        }
        Ok(out)
    }

    fn consume_double_quoted(&mut self, out: &mut String) -> Result<(), SyntaxError> {
        out.push('"');
        self.bump();
        loop {
            match self.peek() {
                None => return Err(SyntaxError::unmatched("\"", self.line)),
                Some(b'"') => {
                    out.push('"');
                    self.bump();
                    return Ok(());
                }
                Some(b'\\') => {
                    self.bump();
                    match self.bump() {
                        Some(b'\n') => {}
                        Some(c) => {
                            out.push('\\');
                            out.push(c as char);
                        }
                        None => return Err(SyntaxError::unmatched("\"", self.line)),
                    }
                }
                Some(b'`') => self.consume_backquoted(out)?,
                Some(b'$') => self.consume_dollar(out)?,
                Some(_) => out.push(self.bump().unwrap() as char),
            }
        }
    }

    fn consume_backquoted(&mut self, out: &mut String) -> Result<(), SyntaxError> {
        out.push('`');
        self.bump();
        loop {
            match self.bump() {
                None => return Err(SyntaxError::unmatched("`", self.line)),
                Some(b'`') => {
                    out.push('`');
                    return Ok(());
                }
                Some(b'\\') => {
                    out.push('\\');
                    if let Some(c) = self.bump() {
                        out.push(c as char);
                    }
                }
                Some(c) => out.push(c as char),
            }
        }
    }

    /// Consume a `$`-introduced construct into `out`: `$(...)`, `$((...))`,
    /// `${...}`, `$'...'`, `$"..."`, or a lone `$`.
    fn consume_dollar(&mut self, out: &mut String) -> Result<(), SyntaxError> {
        out.push('$');
        self.bump();
        match self.peek() {
            Some(b'(') => self.consume_balanced_parens(out),
            Some(b'{') => self.consume_balanced_braces(out),
            Some(b'\'') => {
                out.push('\'');
                self.bump();
                loop {
                    match self.bump() {
                        None => return Err(SyntaxError::unmatched("'", self.line)),
                        Some(b'\'') => {
                            out.push('\'');
                            return Ok(());
                        }
                        Some(b'\\') => {
                            out.push('\\');
                            if let Some(c) = self.bump() {
                                out.push(c as char);
                            }
                        }
                        Some(c) => out.push(c as char),
                    }
                }
            }
            _ => Ok(()),
        }
    }

    /// Consume `(`...matching`)` with full quote awareness, appending
    /// verbatim. Handles `$((...))` since nested parens balance naturally.
    fn consume_balanced_parens(&mut self, out: &mut String) -> Result<(), SyntaxError> {
        let mut depth = 0usize;
        loop {
            match self.peek() {
                None => return Err(SyntaxError::unmatched(")", self.line)),
                Some(b'(') => {
                    depth += 1;
                    out.push('(');
                    self.bump();
                }
                Some(b')') => {
                    depth -= 1;
                    out.push(')');
                    self.bump();
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Some(b'\'') => {
                    out.push('\'');
                    self.bump();
                    loop {
                        match self.bump() {
                            None => return Err(SyntaxError::unmatched("'", self.line)),
                            Some(b'\'') => {
                                out.push('\'');
                                break;
                            }
                            Some(c) => out.push(c as char),
                        }
                    }
                }
                Some(b'"') => self.consume_double_quoted(out)?,
                Some(b'`') => self.consume_backquoted(out)?,
                Some(b'\\') => {
                    out.push('\\');
                    self.bump();
                    if let Some(c) = self.bump() {
                        out.push(c as char);
                    }
                }
                Some(b'#') => {
                    // Comments inside command substitution run to end of line.
                    out.push('#');
                    self.bump();
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        out.push(c as char);
                        self.bump();
                    }
                }
                Some(_) => {
                    out.push(self.bump().unwrap() as char);
                }
            }
        }
    }

    fn consume_balanced_braces(&mut self, out: &mut String) -> Result<(), SyntaxError> {
        let mut depth = 0usize;
        loop {
            match self.peek() {
                None => return Err(SyntaxError::unmatched("}", self.line)),
                Some(b'{') => {
                    depth += 1;
                    out.push('{');
                    self.bump();
                }
                Some(b'}') => {
                    depth -= 1;
                    out.push('}');
                    self.bump();
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Some(b'\'') => {
                    out.push('\'');
                    self.bump();
                    loop {
                        match self.bump() {
                            None => return Err(SyntaxError::unmatched("'", self.line)),
                            Some(b'\'') => {
                                out.push('\'');
                                break;
                            }
                            Some(c) => out.push(c as char),
                        }
                    }
                }
                Some(b'"') => self.consume_double_quoted(out)?,
                Some(b'`') => self.consume_backquoted(out)?,
                Some(b'$') => self.consume_dollar(out)?,
                Some(b'\\') => {
                    out.push('\\');
                    self.bump();
                    if let Some(c) = self.bump() {
                        out.push(c as char);
                    }
                }
                Some(_) => {
                    out.push(self.bump().unwrap() as char);
                }
            }
        }
    }

    /// Produce the next token inside `[[ ]]`. Returns false at EOF.
    fn next_cond_token(&mut self) -> Result<bool, SyntaxError> {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') => {
                    self.bump();
                }
                Some(b'\\') if self.peek_at(1) == Some(b'\n') => {
                    self.bump();
                    self.bump();
                }
                _ => break,
            }
        }
        let (line, offset) = (self.line, self.pos);
        match self.peek() {
            None => Err(SyntaxError::cond(self.line)),
            Some(_) if self.starts_with("]]") => {
                self.bump();
                self.bump();
                self.tokens.push(Token::op(TokenKind::CondEnd, "]]", line, offset));
                self.cond_depth = 0;
                self.regex_rhs = false;
                Ok(true)
            }
            Some(b) => {
                if self.regex_rhs {
                    self.regex_rhs = false;
                    let raw = self.scan_regex_raw()?;
                    self.tokens.push(Token {
                        kind: TokenKind::Word,
                        text: raw,
                        line,
                        offset,
                        quoted: false,
                    });
                    return Ok(true);
                }
                for op in ["&&", "||", "(", ")", "!", "<", ">"] {
                    if self.starts_with(op)
                        && !(op == "<" && self.peek_at(1) == Some(b'('))
                        && !(op == ">" && self.peek_at(1) == Some(b'('))
                        && !(op == "!" && !matches!(self.peek_at(1), None | Some(b' ') | Some(b'\t') | Some(b'\n')))
                    {
                        for _ in 0..op.len() {
                            self.bump();
                        }
                        self.tokens.push(Token::op(TokenKind::CondOp, op, line, offset));
                        return Ok(true);
                    }
                }
                let _ = b;
                let raw = self.scan_cond_word()?;
                if raw.is_empty() {
                    return Err(SyntaxError::cond(self.line));
                }
                if raw == "=~" {
                    self.regex_rhs = true;
                }
                let quoted = raw_has_quotes(&raw);
                self.tokens.push(Token { kind: TokenKind::Word, text: raw, line, offset, quoted });
                Ok(true)
            }
        }
    }

    /// A word inside `[[ ]]`: like normal accretion but `<`, `>`, `(`, `)`
    /// terminate it and pipes/semicolons do not.
    fn scan_cond_word(&mut self) -> Result<String, SyntaxError> {
        let mut out = String::new();
        loop {
            let Some(b) = self.peek() else { break };
            match b {
                b' ' | b'\t' | b'\n' | b'\r' => break,
                b'(' if matches!(out.chars().last(), Some('?' | '*' | '+' | '@' | '!')) => {
                    self.consume_balanced_parens(&mut out)?;
                    continue;
                }
                b'<' | b'>' | b'(' | b')' => {
                    if self.peek_at(1) == Some(b'(') && (b == b'<' || b == b'>') {
                        out.push(self.bump().unwrap() as char);
                        self.consume_balanced_parens(&mut out)?;
                        continue;
                    }
                    break;
                }
                b']' if self.starts_with("]]") => break,
                b'\\' => {
                    self.bump();
                    match self.peek() {
                        Some(b'\n') => {
                            self.bump();
                        }
                        Some(_) => {
                            out.push('\\');
                            out.push(self.bump().unwrap() as char);
                        }
                        None => out.push('\\'),
                    }
                }
                b'\'' => {
                    out.push('\'');
                    self.bump();
                    loop {
                        match self.bump() {
                            None => return Err(SyntaxError::unmatched("'", self.line)),
                            Some(b'\'') => {
                                out.push('\'');
                                break;
                            }
                            Some(c) => out.push(c as char),
                        }
                    }
                }
                b'"' => self.consume_double_quoted(&mut out)?,
                b'`' => self.consume_backquoted(&mut out)?,
                b'$' => self.consume_dollar(&mut out)?,
                _ => out.push(self.bump().unwrap() as char),
            }
        }
        Ok(out)
    }

    /// RHS of `=~`: parentheses and angle brackets are regex text; only
    /// whitespace and `]]` end the word. Parens nest.
    fn scan_regex_raw(&mut self) -> Result<String, SyntaxError> {
        let mut out = String::new();
        let mut depth = 0usize;
        loop {
            let Some(b) = self.peek() else { break };
            match b {
                b' ' | b'\t' | b'\n' | b'\r' if depth == 0 => break,
                b']' if depth == 0 && self.starts_with("]]") => break,
                b'(' => {
                    depth += 1;
                    out.push('(');
                    self.bump();
                }
                b')' => {
                    depth = depth.saturating_sub(1);
                    out.push(')');
                    self.bump();
                }
                b'\\' => {
                    self.bump();
                    out.push('\\');
                    if let Some(c) = self.bump() {
                        out.push(c as char);
                    }
                }
                b'\'' => {
                    out.push('\'');
                    self.bump();
                    loop {
                        match self.bump() {
                            None => return Err(SyntaxError::unmatched("'", self.line)),
                            Some(b'\'') => {
                                out.push('\'');
                                break;
                            }
                            Some(c) => out.push(c as char),
                        }
                    }
                }
                b'"' => self.consume_double_quoted(&mut out)?,
                b'$' => self.consume_dollar(&mut out)?,
                _ => out.push(self.bump().unwrap() as char),
            }
        }
        Ok(out)
    }
}

fn raw_has_quotes(raw: &str) -> bool {
    let b = raw.as_bytes();
    let mut i = 0;
    while i < b.len() {
        match b[i] {
            b'\'' | b'"' => return true,
            b'\\' => {
                i += 1;
                if i < b.len() {
                    return true;
                }
            }
            b'$' => {
                // `$(`, `${` keep their construct; `$'` counts as quoting.
                if b.get(i + 1) == Some(&b'\'') {
                    return true;
                }
            }
            _ => {}
        }
        i += 1;
    }
    false
}

/// `NAME=`, `NAME+=`, `NAME[sub]=` prefix test on raw text.
pub fn is_assignment_prefix(raw: &str) -> bool {
    let b = raw.as_bytes();
    let mut i = 0;
    if i >= b.len() || !(b[i].is_ascii_alphabetic() || b[i] == b'_') {
        return false;
    }
    while i < b.len() && (b[i].is_ascii_alphanumeric() || b[i] == b'_') {
        i += 1;
    }
    if i < b.len() && b[i] == b'[' {
        let mut depth = 1;
        i += 1;
        while i < b.len() && depth > 0 {
            match b[i] {
                b'[' => depth += 1,
                b']' => depth -= 1,
                _ => {}
            }
            i += 1;
        }
        if depth != 0 {
            return false;
        }
    }
    if i < b.len() && b[i] == b'+' {
        i += 1;
    }
    i < b.len() && b[i] == b'='
}

fn is_fd_var(raw: &str) -> bool {
    let b = raw.as_bytes();
    if b.len() < 3 || b[0] != b'{' || b[b.len() - 1] != b'}' {
        return false;
    }
    let name = &raw[1..raw.len() - 1];
    name.chars().enumerate().all(|(i, c)| {
        if i == 0 {
            c.is_ascii_alphabetic() || c == '_'
        } else {
            c.is_ascii_alphanumeric() || c == '_'
        }
    })
}

fn unquote_delimiter(raw: &str) -> (String, bool) {
    let mut out = String::new();
    let mut quoted = false;
    let b = raw.as_bytes();
    let mut i = 0;
    while i < b.len() {
        match b[i] {
            b'\'' => {
                quoted = true;
                i += 1;
                while i < b.len() && b[i] != b'\'' {
                    out.push(b[i] as char);
                    i += 1;
                }
                i += 1;
            }
            b'"' => {
                quoted = true;
                i += 1;
                while i < b.len() && b[i] != b'"' {
                    if b[i] == b'\\' && i + 1 < b.len() {
                        i += 1;
                    }
                    out.push(b[i] as char);
                    i += 1;
                }
                i += 1;
            }
            b'\\' => {
                quoted = true;
                i += 1;
                if i < b.len() {
                    out.push(b[i] as char);
                    i += 1;
                }
            }
            c => {
                out.push(c as char);
                i += 1;
            }
        }
    }
    (out, quoted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).unwrap().tokens.into_iter().map(|t| t.kind).collect()
    }

    fn texts(src: &str) -> Vec<String> {
        tokenize(src).unwrap().tokens.into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn simple_words_and_operators() {
        assert_eq!(
            kinds("echo hi | wc -l"),
            vec![
                TokenKind::Word,
                TokenKind::Word,
                TokenKind::Pipe,
                TokenKind::Word,
                TokenKind::Word,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn assignment_words() {
        let out = tokenize("FOO=bar baz=1 cmd x=1").unwrap();
        assert_eq!(out.tokens[0].kind, TokenKind::AssignmentWord);
        assert_eq!(out.tokens[1].kind, TokenKind::AssignmentWord);
        assert_eq!(out.tokens[2].kind, TokenKind::Word);
        // Lexer marks it; the parser downgrades post-name assignments.
        assert_eq!(out.tokens[3].kind, TokenKind::AssignmentWord);
    }

    #[test]
    fn array_assignment_keeps_parens() {
        assert_eq!(texts("a=(1 2 3)")[0], "a=(1 2 3)");
    }

    #[test]
    fn number_before_redirect() {
        let out = tokenize("cmd 2>err").unwrap();
        assert_eq!(out.tokens[1].kind, TokenKind::Number);
        assert_eq!(out.tokens[2].kind, TokenKind::Great);
    }

    #[test]
    fn fd_var_before_redirect() {
        let out = tokenize("exec {logfd}>log").unwrap();
        assert_eq!(out.tokens[1].kind, TokenKind::FdVar);
        assert_eq!(out.tokens[1].text, "{logfd}");
    }

    #[test]
    fn command_substitution_stays_in_word() {
        let t = texts("echo $(ls | wc -l)");
        assert_eq!(t[1], "$(ls | wc -l)");
    }

    #[test]
    fn arith_command_captured() {
        let out = tokenize("(( x = 1 + 2 ))").unwrap();
        assert_eq!(out.tokens[0].kind, TokenKind::ArithCmd);
        assert_eq!(out.tokens[0].text, " x = 1 + 2 ");
    }

    #[test]
    fn nested_subshell_not_arith() {
        let out = tokenize("( (echo a) )").unwrap();
        assert_eq!(out.tokens[0].kind, TokenKind::LParen);
        assert_eq!(out.tokens[1].kind, TokenKind::LParen);
    }

    #[test]
    fn cond_mode_tokens() {
        let out = tokenize("[[ -f x && $a == y* ]]").unwrap();
        let kinds: Vec<_> = out.tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds[0], TokenKind::CondStart);
        assert!(kinds.contains(&TokenKind::CondOp));
        assert_eq!(kinds[kinds.len() - 2], TokenKind::CondEnd);
    }

    #[test]
    fn regex_rhs_keeps_parens() {
        let out = tokenize("[[ $x =~ ^(a|b)+$ ]]").unwrap();
        let words: Vec<_> = out
            .tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Word)
            .map(|t| t.text.clone())
            .collect();
        assert!(words.contains(&"^(a|b)+$".to_string()));
    }

    #[test]
    fn heredoc_body_collected() {
        let out = tokenize("cat <<EOF\nline one\nline two\nEOF\necho done\n").unwrap();
        assert_eq!(out.heredocs.len(), 1);
        assert_eq!(out.heredocs[0].body, "line one\nline two\n");
        assert!(!out.heredocs[0].quoted);
    }

    #[test]
    fn quoted_heredoc_delimiter() {
        let out = tokenize("cat <<'EOF'\n$x\nEOF\n").unwrap();
        assert!(out.heredocs[0].quoted);
        assert_eq!(out.heredocs[0].body, "$x\n");
    }

    #[test]
    fn heredoc_dash_strips_tabs() {
        let out = tokenize("cat <<-EOF\n\tindented\n\tEOF\n").unwrap();
        assert_eq!(out.heredocs[0].body, "indented\n");
    }

    #[test]
    fn unterminated_quote_is_syntax_error() {
        assert!(tokenize("echo 'abc").is_err());
        assert!(tokenize("echo \"abc").is_err());
        assert!(tokenize("echo $(abc").is_err());
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("echo hi # trailing\n"),
            vec![TokenKind::Word, TokenKind::Word, TokenKind::Newline, TokenKind::Eof]
        );
    }

    #[test]
    fn line_continuation_joins_words() {
        assert_eq!(texts("ec\\\nho")[0], "echo");
    }

    #[test]
    fn process_substitution_is_a_word() {
        let t = texts("diff <(sort a) <(sort b)");
        assert_eq!(t[1], "<(sort a)");
        assert_eq!(t[2], "<(sort b)");
    }
}
