//! Recursive-descent parser.
//!
//! Consumes the token stream from [`crate::lexer`] and produces the AST.
//! Keywords are only recognized in command position; a word that looks like
//! `do` in argument position stays a word. Here-document bodies were
//! already collected by the lexer and are attached here, in `<<` order.

pub mod arith;
pub mod cond;
pub mod word;

use thiserror::Error;

use crate::ast::*;
use crate::lexer::{tokenize, HereDocText, Token, TokenKind};

/// Parse failure with the canonical bash-style message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct SyntaxError {
    pub message: String,
    pub line: u32,
}

impl SyntaxError {
    pub fn near_token(token: &str, line: u32) -> Self {
        SyntaxError {
            message: format!("syntax error near unexpected token `{token}'"),
            line,
        }
    }

    pub fn unexpected_eof(line: u32) -> Self {
        SyntaxError { message: "syntax error: unexpected end of file".to_string(), line }
    }

    pub fn unmatched(delim: &str, line: u32) -> Self {
        SyntaxError {
            message: format!("unexpected EOF while looking for matching `{delim}'"),
            line,
        }
    }

    pub fn cond(line: u32) -> Self {
        SyntaxError { message: "syntax error in conditional expression".to_string(), line }
    }

    pub fn other(message: impl Into<String>, line: u32) -> Self {
        SyntaxError { message: message.into(), line }
    }
}

/// Parse a complete script.
pub fn parse(src: &str) -> Result<Script, SyntaxError> {
    let lexed = tokenize(src)?;
    let mut parser = Parser {
        tokens: lexed.tokens,
        heredocs: lexed.heredocs,
        src,
        pos: 0,
        next_heredoc: 0,
        steps: 0,
    };
    parser.script()
}

/// Guard against runaway parse loops on pathological input.
const MAX_PARSE_STEPS: u32 = 2_000_000;

pub(crate) struct Parser<'a> {
    tokens: Vec<Token>,
    heredocs: Vec<HereDocText>,
    src: &'a str,
    pos: usize,
    next_heredoc: usize,
    steps: u32,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_at(&self, ahead: usize) -> &Token {
        &self.tokens[(self.pos + ahead).min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        t
    }

    fn step(&mut self) -> Result<(), SyntaxError> {
        self.steps += 1;
        if self.steps > MAX_PARSE_STEPS {
            Err(SyntaxError::other("parser step limit exceeded", self.peek().line))
        } else {
            Ok(())
        }
    }

    fn at_keyword(&self, kw: &str) -> bool {
        let t = self.peek();
        t.kind == TokenKind::Word && !t.quoted && t.text == kw
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        if self.at_keyword(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, kw: &str) -> Result<(), SyntaxError> {
        if self.eat_keyword(kw) {
            Ok(())
        } else {
            let t = self.peek().clone();
            if t.kind == TokenKind::Eof {
                Err(SyntaxError::unexpected_eof(t.line))
            } else {
                Err(SyntaxError::near_token(&display_token(&t), t.line))
            }
        }
    }

    fn skip_newlines(&mut self) {
        while self.peek().kind == TokenKind::Newline {
            self.advance();
        }
    }

    /// Skip over `;` and newlines (list separators before `do`, `then`...).
    fn skip_separators(&mut self) {
        while matches!(self.peek().kind, TokenKind::Newline | TokenKind::Semi) {
            self.advance();
        }
    }

    fn script(&mut self) -> Result<Script, SyntaxError> {
        let statements = self.statements_until(&[])?;
        let t = self.peek().clone();
        if t.kind != TokenKind::Eof {
            return Err(SyntaxError::near_token(&display_token(&t), t.line));
        }
        Ok(Script { statements })
    }

    /// Parse statements until EOF, a closing token, or one of `stops`
    /// (unquoted keywords in command position).
    fn statements_until(&mut self, stops: &[&str]) -> Result<Vec<Statement>, SyntaxError> {
        let mut out = Vec::new();
        loop {
            self.step()?;
            self.skip_newlines();
            let t = self.peek();
            match t.kind {
                TokenKind::Eof
                | TokenKind::RParen
                | TokenKind::DSemi
                | TokenKind::SemiAnd
                | TokenKind::DSemiAnd => break,
                TokenKind::Word if !t.quoted && stops.contains(&t.text.as_str()) => break,
                _ => out.push(self.statement()?),
            }
        }
        Ok(out)
    }

    fn statement(&mut self) -> Result<Statement, SyntaxError> {
        let start = self.peek().offset;
        let mut pipelines = vec![self.pipeline()?];
        let mut connectors = Vec::new();
        loop {
            self.step()?;
            match self.peek().kind {
                TokenKind::AndIf => {
                    self.advance();
                    self.skip_newlines();
                    connectors.push(Connector::AndIf);
                    pipelines.push(self.pipeline()?);
                }
                TokenKind::OrIf => {
                    self.advance();
                    self.skip_newlines();
                    connectors.push(Connector::OrIf);
                    pipelines.push(self.pipeline()?);
                }
                _ => break,
            }
        }
        let mut background = false;
        match self.peek().kind {
            TokenKind::Semi => {
                self.advance();
            }
            TokenKind::Amp => {
                self.advance();
                background = true;
            }
            _ => {}
        }
        let end = self.peek().offset.min(self.src.len());
        let source = self
            .src
            .get(start..end)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        Ok(Statement { pipelines, connectors, background, source })
    }

    fn pipeline(&mut self) -> Result<Pipeline, SyntaxError> {
        let mut negated = false;
        loop {
            if self.at_keyword("!") {
                self.advance();
                negated = !negated;
            } else if self.at_keyword("time") {
                // Timing is not captured; the pipeline still runs.
                self.advance();
                if self.at_keyword("-p") {
                    self.advance();
                }
            } else {
                break;
            }
        }
        let mut commands = vec![self.command()?];
        let mut stderr_pipes = Vec::new();
        loop {
            self.step()?;
            let kind = self.peek().kind;
            if kind == TokenKind::Pipe || kind == TokenKind::PipeAmp {
                self.advance();
                self.skip_newlines();
                stderr_pipes.push(kind == TokenKind::PipeAmp);
                commands.push(self.command()?);
            } else {
                break;
            }
        }
        Ok(Pipeline { commands, negated, stderr_pipes })
    }

    fn command(&mut self) -> Result<Command, SyntaxError> {
        let t = self.peek().clone();
        match t.kind {
            TokenKind::ArithCmd => {
                self.advance();
                let expr = arith::parse_arith(&t.text)
                    .unwrap_or_else(|msg| ArithExpr::Invalid { text: t.text.clone(), message: msg });
                let redirs = self.trailing_redirs()?;
                Ok(Command::Compound(Compound::Arith { expr, redirs, line: t.line }))
            }
            TokenKind::CondStart => {
                self.advance();
                let expr = cond::parse_cond(self)?;
                let redirs = self.trailing_redirs()?;
                Ok(Command::Compound(Compound::Cond { expr, redirs, line: t.line }))
            }
            TokenKind::LParen => {
                self.advance();
                let body = self.statements_until(&[])?;
                self.expect_close_paren()?;
                let redirs = self.trailing_redirs()?;
                Ok(Command::Compound(Compound::Subshell { body, redirs }))
            }
            TokenKind::Word if !t.quoted => match t.text.as_str() {
                "if" => self.if_command(),
                "while" => self.while_command(false),
                "until" => self.while_command(true),
                "for" => self.for_command(),
                "case" => self.case_command(),
                "{" => self.group_command(),
                "function" => self.function_def_keyword(),
                "}" | "then" | "elif" | "else" | "fi" | "do" | "done" | "esac" | "in" => {
                    Err(SyntaxError::near_token(&t.text, t.line))
                }
                _ => {
                    if self.peek_at(1).kind == TokenKind::LParen
                        && self.peek_at(2).kind == TokenKind::RParen
                    {
                        self.function_def_posix()
                    } else {
                        self.simple_command()
                    }
                }
            },
            _ => self.simple_command(),
        }
    }

    fn expect_close_paren(&mut self) -> Result<(), SyntaxError> {
        let t = self.peek().clone();
        if t.kind == TokenKind::RParen {
            self.advance();
            Ok(())
        } else if t.kind == TokenKind::Eof {
            Err(SyntaxError::unmatched(")", t.line))
        } else {
            Err(SyntaxError::near_token(&display_token(&t), t.line))
        }
    }

    // -- compound commands --------------------------------------------------

    fn if_command(&mut self) -> Result<Command, SyntaxError> {
        self.advance(); // if
        let mut arms = Vec::new();
        let cond = self.statements_until(&["then"])?;
        self.expect_keyword("then")?;
        let body = self.statements_until(&["elif", "else", "fi"])?;
        arms.push(IfArm { cond, body });
        let mut orelse = None;
        loop {
            self.step()?;
            if self.eat_keyword("elif") {
                let cond = self.statements_until(&["then"])?;
                self.expect_keyword("then")?;
                let body = self.statements_until(&["elif", "else", "fi"])?;
                arms.push(IfArm { cond, body });
            } else if self.eat_keyword("else") {
                orelse = Some(self.statements_until(&["fi"])?);
            } else {
                break;
            }
        }
        self.expect_keyword("fi")?;
        let redirs = self.trailing_redirs()?;
        Ok(Command::Compound(Compound::If { arms, orelse, redirs }))
    }

    fn while_command(&mut self, until: bool) -> Result<Command, SyntaxError> {
        self.advance(); // while / until
        let cond = self.statements_until(&["do"])?;
        self.expect_keyword("do")?;
        let body = self.statements_until(&["done"])?;
        self.expect_keyword("done")?;
        let redirs = self.trailing_redirs()?;
        Ok(Command::Compound(Compound::While { cond, body, until, redirs }))
    }

    fn for_command(&mut self) -> Result<Command, SyntaxError> {
        self.advance(); // for
        if self.peek().kind == TokenKind::ArithCmd {
            let t = self.advance();
            let (init, cond, step) = split_for_clauses(&t.text, t.line)?;
            self.skip_separators();
            self.expect_keyword("do")?;
            let body = self.statements_until(&["done"])?;
            self.expect_keyword("done")?;
            let redirs = self.trailing_redirs()?;
            return Ok(Command::Compound(Compound::ForArith { init, cond, step, body, redirs }));
        }

        let name_tok = self.advance();
        if name_tok.kind != TokenKind::Word || !is_valid_name(&name_tok.text) {
            return Err(SyntaxError::near_token(&display_token(&name_tok), name_tok.line));
        }
        let var = name_tok.text;
        self.skip_newlines();
        let words = if self.eat_keyword("in") {
            let mut list = Vec::new();
            loop {
                self.step()?;
                match self.peek().kind {
                    TokenKind::Word | TokenKind::AssignmentWord | TokenKind::Number => {
                        let t = self.advance();
                        list.push(word::parse_word(&t.text, t.line)?);
                    }
                    _ => break,
                }
            }
            Some(list)
        } else {
            None
        };
        self.skip_separators();
        self.expect_keyword("do")?;
        let body = self.statements_until(&["done"])?;
        self.expect_keyword("done")?;
        let redirs = self.trailing_redirs()?;
        Ok(Command::Compound(Compound::For { var, words, body, redirs }))
    }

    fn case_command(&mut self) -> Result<Command, SyntaxError> {
        self.advance(); // case
        let subj_tok = self.advance();
        if !matches!(subj_tok.kind, TokenKind::Word | TokenKind::AssignmentWord | TokenKind::Number)
        {
            return Err(SyntaxError::near_token(&display_token(&subj_tok), subj_tok.line));
        }
        let word = word::parse_word(&subj_tok.text, subj_tok.line)?;
        self.skip_newlines();
        self.expect_keyword("in")?;
        self.skip_newlines();

        let mut items = Vec::new();
        loop {
            self.step()?;
            if self.eat_keyword("esac") {
                break;
            }
            if self.peek().kind == TokenKind::Eof {
                return Err(SyntaxError::unexpected_eof(self.peek().line));
            }
            if self.peek().kind == TokenKind::LParen {
                self.advance();
            }
            let mut patterns = Vec::new();
            loop {
                let t = self.advance();
                if !matches!(
                    t.kind,
                    TokenKind::Word | TokenKind::AssignmentWord | TokenKind::Number
                ) {
                    return Err(SyntaxError::near_token(&display_token(&t), t.line));
                }
                patterns.push(word::parse_word(&t.text, t.line)?);
                if self.peek().kind == TokenKind::Pipe {
                    self.advance();
                } else {
                    break;
                }
            }
            let t = self.peek().clone();
            if t.kind != TokenKind::RParen {
                return Err(SyntaxError::near_token(&display_token(&t), t.line));
            }
            self.advance();
            let body = self.statements_until(&["esac"])?;
            let terminator = match self.peek().kind {
                TokenKind::DSemi => {
                    self.advance();
                    CaseTerm::Break
                }
                TokenKind::SemiAnd => {
                    self.advance();
                    CaseTerm::Fallthrough
                }
                TokenKind::DSemiAnd => {
                    self.advance();
                    CaseTerm::Continue
                }
                _ => CaseTerm::Break,
            };
            self.skip_newlines();
            items.push(CaseItem { patterns, body, terminator });
        }
        let redirs = self.trailing_redirs()?;
        Ok(Command::Compound(Compound::Case { word, items, redirs }))
    }

    fn group_command(&mut self) -> Result<Command, SyntaxError> {
        self.advance(); // {
        let body = self.statements_until(&["}"])?;
        self.expect_keyword("}")?;
        let redirs = self.trailing_redirs()?;
        Ok(Command::Compound(Compound::Group { body, redirs }))
    }

    fn function_def_keyword(&mut self) -> Result<Command, SyntaxError> {
        let line = self.peek().line;
        self.advance(); // function
        let name_tok = self.advance();
        if name_tok.kind != TokenKind::Word {
            return Err(SyntaxError::near_token(&display_token(&name_tok), name_tok.line));
        }
        if self.peek().kind == TokenKind::LParen && self.peek_at(1).kind == TokenKind::RParen {
            self.advance();
            self.advance();
        }
        self.finish_function_def(name_tok.text, line)
    }

    fn function_def_posix(&mut self) -> Result<Command, SyntaxError> {
        let name_tok = self.advance();
        let line = name_tok.line;
        self.advance(); // (
        self.advance(); // )
        self.finish_function_def(name_tok.text, line)
    }

    fn finish_function_def(&mut self, name: String, line: u32) -> Result<Command, SyntaxError> {
        self.skip_newlines();
        let body = match self.command()? {
            Command::Compound(c) => c,
            Command::Simple(_) | Command::FuncDef(_) => {
                return Err(SyntaxError::near_token(&display_token(self.peek()), line));
            }
        };
        // Redirections already consumed by the compound parser belong to
        // the body; function-level redirections apply at call time.
        let (body, redirs) = detach_redirs(body);
        Ok(Command::FuncDef(FuncDef { name, body: Box::new(body), redirs, line }))
    }

    // -- simple commands ----------------------------------------------------

    fn simple_command(&mut self) -> Result<Command, SyntaxError> {
        let line = self.peek().line;
        let mut assignments = Vec::new();
        let mut name: Option<Word> = None;
        let mut args = Vec::new();
        let mut redirs = Vec::new();
        let mut consumed = false;

        loop {
            self.step()?;
            let t = self.peek().clone();
            match t.kind {
                TokenKind::AssignmentWord if name.is_none() => {
                    self.advance();
                    assignments.push(word::parse_assignment(&t.text, t.line)?);
                    consumed = true;
                }
                TokenKind::AssignmentWord | TokenKind::Word => {
                    self.advance();
                    let w = word::parse_word(&t.text, t.line)?;
                    if name.is_none() {
                        name = Some(w);
                    } else {
                        args.push(w);
                    }
                    consumed = true;
                }
                TokenKind::Number | TokenKind::FdVar
                    if is_redir_op(self.peek_at(1).kind) =>
                {
                    redirs.push(self.redirection()?);
                    consumed = true;
                }
                TokenKind::Number => {
                    self.advance();
                    let w = word::parse_word(&t.text, t.line)?;
                    if name.is_none() {
                        name = Some(w);
                    } else {
                        args.push(w);
                    }
                    consumed = true;
                }
                k if is_redir_op(k) => {
                    redirs.push(self.redirection()?);
                    consumed = true;
                }
                _ => break,
            }
        }

        if !consumed {
            let t = self.peek().clone();
            return if t.kind == TokenKind::Eof {
                Err(SyntaxError::unexpected_eof(t.line))
            } else {
                Err(SyntaxError::near_token(&display_token(&t), t.line))
            };
        }
        Ok(Command::Simple(SimpleCmd { assignments, name, args, redirs, line }))
    }

    fn trailing_redirs(&mut self) -> Result<Vec<Redir>, SyntaxError> {
        let mut redirs = Vec::new();
        loop {
            self.step()?;
            let k = self.peek().kind;
            if is_redir_op(k)
                || (matches!(k, TokenKind::Number | TokenKind::FdVar)
                    && is_redir_op(self.peek_at(1).kind))
            {
                redirs.push(self.redirection()?);
            } else {
                break;
            }
        }
        Ok(redirs)
    }

    fn redirection(&mut self) -> Result<Redir, SyntaxError> {
        let mut fd = None;
        let mut fd_var = None;
        let t = self.peek().clone();
        match t.kind {
            TokenKind::Number => {
                self.advance();
                fd = t.text.parse::<i32>().ok();
            }
            TokenKind::FdVar => {
                self.advance();
                fd_var = Some(t.text[1..t.text.len() - 1].to_string());
            }
            _ => {}
        }
        let op_tok = self.advance();
        let op = match op_tok.kind {
            TokenKind::Less => RedirOp::In,
            TokenKind::Great => RedirOp::Out,
            TokenKind::DGreat => RedirOp::Append,
            TokenKind::GreatAnd => RedirOp::OutDup,
            TokenKind::LessAnd => RedirOp::InDup,
            TokenKind::LessGreat => RedirOp::ReadWrite,
            TokenKind::Clobber => RedirOp::Clobber,
            TokenKind::AndGreat => RedirOp::OutErr,
            TokenKind::AndDGreat => RedirOp::AppendErr,
            TokenKind::TLess => RedirOp::HereString,
            TokenKind::DLess => RedirOp::HereDoc,
            TokenKind::DLessDash => RedirOp::HereDocDash,
            _ => return Err(SyntaxError::near_token(&display_token(&op_tok), op_tok.line)),
        };

        if matches!(op, RedirOp::HereDoc | RedirOp::HereDocDash) {
            // The delimiter word follows; the body came from the lexer.
            let delim_tok = self.advance();
            if delim_tok.kind != TokenKind::Word {
                return Err(SyntaxError::near_token(&display_token(&delim_tok), delim_tok.line));
            }
            let here = self
                .heredocs
                .get(self.next_heredoc)
                .cloned()
                .ok_or_else(|| SyntaxError::unexpected_eof(delim_tok.line))?;
            self.next_heredoc += 1;
            let body = if here.quoted {
                Word { parts: vec![WordPart::Literal(here.body.clone())] }
            } else {
                word::parse_heredoc_body(&here.body, delim_tok.line)?
            };
            return Ok(Redir {
                fd,
                fd_var,
                op,
                target: RedirTarget::HereDoc(HereDoc {
                    delimiter: here.delimiter,
                    body,
                    strip_tabs: here.strip_tabs,
                    quoted: here.quoted,
                }),
            });
        }

        let target_tok = self.advance();
        if !matches!(
            target_tok.kind,
            TokenKind::Word | TokenKind::AssignmentWord | TokenKind::Number
        ) {
            let line = target_tok.line;
            return if target_tok.kind == TokenKind::Eof {
                Err(SyntaxError::unexpected_eof(line))
            } else {
                Err(SyntaxError::near_token(&display_token(&target_tok), line))
            };
        }
        let target = word::parse_word(&target_tok.text, target_tok.line)?;
        Ok(Redir { fd, fd_var, op, target: RedirTarget::Word(target) })
    }
}

fn is_redir_op(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Less
            | TokenKind::Great
            | TokenKind::DGreat
            | TokenKind::GreatAnd
            | TokenKind::LessAnd
            | TokenKind::LessGreat
            | TokenKind::Clobber
            | TokenKind::AndGreat
            | TokenKind::AndDGreat
            | TokenKind::TLess
            | TokenKind::DLess
            | TokenKind::DLessDash
    )
}

fn display_token(t: &Token) -> String {
    match t.kind {
        TokenKind::Newline => "newline".to_string(),
        TokenKind::Eof => "end of file".to_string(),
        _ if t.text.is_empty() => format!("{:?}", t.kind),
        _ => t.text.clone(),
    }
}

pub(crate) fn is_valid_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Split `init; cond; step` of a C-style for header.
fn split_for_clauses(
    text: &str,
    line: u32,
) -> Result<(Option<ArithExpr>, Option<ArithExpr>, Option<ArithExpr>), SyntaxError> {
    let mut clauses = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let bytes = text.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'(' | b'[' => depth += 1,
            b')' | b']' => depth = depth.saturating_sub(1),
            b';' if depth == 0 => {
                clauses.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    clauses.push(&text[start..]);
    if clauses.len() != 3 {
        return Err(SyntaxError::near_token("((", line));
    }
    let parse_clause = |s: &str| -> Result<Option<ArithExpr>, SyntaxError> {
        if s.trim().is_empty() {
            Ok(None)
        } else {
            Ok(Some(arith::parse_arith(s).unwrap_or_else(|msg| ArithExpr::Invalid {
                text: s.to_string(),
                message: msg,
            })))
        }
    };
    Ok((parse_clause(clauses[0])?, parse_clause(clauses[1])?, parse_clause(clauses[2])?))
}

/// Pull the redirections off a compound so they can live on the function
/// definition node instead.
fn detach_redirs(c: Compound) -> (Compound, Vec<Redir>) {
    match c {
        Compound::If { arms, orelse, redirs } => {
            (Compound::If { arms, orelse, redirs: Vec::new() }, redirs)
        }
        Compound::For { var, words, body, redirs } => {
            (Compound::For { var, words, body, redirs: Vec::new() }, redirs)
        }
        Compound::ForArith { init, cond, step, body, redirs } => (
            Compound::ForArith { init, cond, step, body, redirs: Vec::new() },
            redirs,
        ),
        Compound::While { cond, body, until, redirs } => {
            (Compound::While { cond, body, until, redirs: Vec::new() }, redirs)
        }
        Compound::Case { word, items, redirs } => {
            (Compound::Case { word, items, redirs: Vec::new() }, redirs)
        }
        Compound::Subshell { body, redirs } => {
            (Compound::Subshell { body, redirs: Vec::new() }, redirs)
        }
        Compound::Group { body, redirs } => (Compound::Group { body, redirs: Vec::new() }, redirs),
        Compound::Arith { expr, redirs, line } => {
            (Compound::Arith { expr, redirs: Vec::new(), line }, redirs)
        }
        Compound::Cond { expr, redirs, line } => {
            (Compound::Cond { expr, redirs: Vec::new(), line }, redirs)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(src: &str) -> Script {
        parse(src).unwrap_or_else(|e| panic!("parse {src:?}: {e}"))
    }

    fn first_simple(script: &Script) -> &SimpleCmd {
        match &script.statements[0].pipelines[0].commands[0] {
            Command::Simple(s) => s,
            other => panic!("expected simple command, got {other:?}"),
        }
    }

    #[test]
    fn simple_command_with_args() {
        let s = parse_ok("echo hello world");
        let cmd = first_simple(&s);
        assert!(cmd.name.as_ref().unwrap().is_literal("echo"));
        assert_eq!(cmd.args.len(), 2);
    }

    #[test]
    fn prefix_assignments() {
        let s = parse_ok("FOO=1 BAR=2 env");
        let cmd = first_simple(&s);
        assert_eq!(cmd.assignments.len(), 2);
        assert!(cmd.name.as_ref().unwrap().is_literal("env"));
    }

    #[test]
    fn assignment_after_name_is_an_argument() {
        let s = parse_ok("echo FOO=1");
        let cmd = first_simple(&s);
        assert!(cmd.assignments.is_empty());
        assert_eq!(cmd.args.len(), 1);
    }

    #[test]
    fn pipeline_and_connectors() {
        let s = parse_ok("a | b && c || d");
        let st = &s.statements[0];
        assert_eq!(st.pipelines.len(), 3);
        assert_eq!(st.connectors, vec![Connector::AndIf, Connector::OrIf]);
        assert_eq!(st.pipelines[0].commands.len(), 2);
    }

    #[test]
    fn negated_pipeline() {
        let s = parse_ok("! false");
        assert!(s.statements[0].pipelines[0].negated);
    }

    #[test]
    fn background_statement() {
        let s = parse_ok("sleep 5 &");
        assert!(s.statements[0].background);
    }

    #[test]
    fn if_elif_else() {
        let s = parse_ok("if a; then b; elif c; then d; else e; fi");
        match &s.statements[0].pipelines[0].commands[0] {
            Command::Compound(Compound::If { arms, orelse, .. }) => {
                assert_eq!(arms.len(), 2);
                assert!(orelse.is_some());
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn while_and_until() {
        parse_ok("while true; do x; done");
        let s = parse_ok("until false; do x; done");
        match &s.statements[0].pipelines[0].commands[0] {
            Command::Compound(Compound::While { until, .. }) => assert!(until),
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn for_in_words() {
        let s = parse_ok("for i in a b c; do echo $i; done");
        match &s.statements[0].pipelines[0].commands[0] {
            Command::Compound(Compound::For { var, words, .. }) => {
                assert_eq!(var, "i");
                assert_eq!(words.as_ref().unwrap().len(), 3);
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn for_without_in_iterates_positional() {
        let s = parse_ok("for x; do echo $x; done");
        match &s.statements[0].pipelines[0].commands[0] {
            Command::Compound(Compound::For { words, .. }) => assert!(words.is_none()),
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn c_style_for() {
        let s = parse_ok("for ((i=0; i<3; i++)); do echo $i; done");
        match &s.statements[0].pipelines[0].commands[0] {
            Command::Compound(Compound::ForArith { init, cond, step, .. }) => {
                assert!(init.is_some() && cond.is_some() && step.is_some());
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn c_style_for_empty_slots() {
        let s = parse_ok("for ((;;)); do break; done");
        match &s.statements[0].pipelines[0].commands[0] {
            Command::Compound(Compound::ForArith { init, cond, step, .. }) => {
                assert!(init.is_none() && cond.is_none() && step.is_none());
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn case_with_terminators() {
        let s = parse_ok("case $x in a) one;; b|c) two;& d) three;;& *) other;; esac");
        match &s.statements[0].pipelines[0].commands[0] {
            Command::Compound(Compound::Case { items, .. }) => {
                assert_eq!(items.len(), 4);
                assert_eq!(items[0].terminator, CaseTerm::Break);
                assert_eq!(items[1].patterns.len(), 2);
                assert_eq!(items[1].terminator, CaseTerm::Fallthrough);
                assert_eq!(items[2].terminator, CaseTerm::Continue);
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn subshell_and_group() {
        parse_ok("(cd /tmp; ls)");
        parse_ok("{ echo a; echo b; }");
    }

    #[test]
    fn function_definitions_both_forms() {
        let s = parse_ok("f() { echo hi; }");
        assert!(matches!(
            &s.statements[0].pipelines[0].commands[0],
            Command::FuncDef(FuncDef { name, .. }) if name == "f"
        ));
        let s = parse_ok("function g { echo hi; }");
        assert!(matches!(
            &s.statements[0].pipelines[0].commands[0],
            Command::FuncDef(FuncDef { name, .. }) if name == "g"
        ));
    }

    #[test]
    fn redirections_on_simple_command() {
        let s = parse_ok("cmd <in >out 2>>err");
        let cmd = first_simple(&s);
        assert_eq!(cmd.redirs.len(), 3);
        assert_eq!(cmd.redirs[2].fd, Some(2));
        assert_eq!(cmd.redirs[2].op, RedirOp::Append);
    }

    #[test]
    fn fd_dup_redirection() {
        let s = parse_ok("cmd 2>&1");
        let cmd = first_simple(&s);
        assert_eq!(cmd.redirs[0].op, RedirOp::OutDup);
        assert!(matches!(&cmd.redirs[0].target, RedirTarget::Word(w) if w.is_literal("1")));
    }

    #[test]
    fn fd_var_redirection() {
        let s = parse_ok("exec {fd}>log");
        let cmd = first_simple(&s);
        assert_eq!(cmd.redirs[0].fd_var.as_deref(), Some("fd"));
    }

    #[test]
    fn heredoc_attached() {
        let s = parse_ok("cat <<EOF\nhello\nEOF\n");
        let cmd = first_simple(&s);
        match &cmd.redirs[0].target {
            RedirTarget::HereDoc(h) => {
                assert_eq!(h.delimiter, "EOF");
                assert!(!h.quoted);
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn arithmetic_command() {
        let s = parse_ok("(( x = 1 + 2 ))");
        assert!(matches!(
            &s.statements[0].pipelines[0].commands[0],
            Command::Compound(Compound::Arith { .. })
        ));
    }

    #[test]
    fn conditional_command() {
        let s = parse_ok("[[ -n $x && $x == y* ]]");
        assert!(matches!(
            &s.statements[0].pipelines[0].commands[0],
            Command::Compound(Compound::Cond { .. })
        ));
    }

    #[test]
    fn syntax_errors_are_canonical() {
        let err = parse("if true; then").unwrap_err();
        assert_eq!(err.message, "syntax error: unexpected end of file");
        let err = parse("fi").unwrap_err();
        assert_eq!(err.message, "syntax error near unexpected token `fi'");
    }

    #[test]
    fn keyword_in_argument_position_is_a_word() {
        let s = parse_ok("echo done");
        let cmd = first_simple(&s);
        assert!(cmd.args[0].is_literal("done"));
    }
}
