//! Word expansion pipeline.
//!
//! Order per the shell rules: brace expansion, tilde, parameter/command/
//! arithmetic substitution, word splitting, pathname expansion, quote
//! removal. Expansion works over [`Seg`] runs so later stages still know
//! which characters came from quoted text (no splitting, no globbing) and
//! which came from expansion results (both).

pub mod arrays;
pub mod brace;
pub mod glob;
pub mod params;
pub mod pattern;
pub mod quote;
pub mod split;

use crate::ast::*;
use crate::interp::flow::{FaultKind, Interrupt};
use crate::interp::state::ShellState;
use crate::interp::Interp;
use self::params::ParamValue;

/// One run of expanded text with its quoting provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seg {
    pub text: String,
    /// Came from quoted source: exempt from splitting and globbing.
    pub quoted: bool,
    /// Expansion result: subject to word splitting when unquoted.
    pub splittable: bool,
}

impl Seg {
    pub fn lit(text: impl Into<String>) -> Self {
        Seg { text: text.into(), quoted: false, splittable: false }
    }

    pub fn quoted(text: impl Into<String>) -> Self {
        Seg { text: text.into(), quoted: true, splittable: false }
    }

    pub fn expansion(text: impl Into<String>, quoted: bool) -> Self {
        Seg { text: text.into(), quoted, splittable: !quoted }
    }
}

pub type FieldBuf = Vec<Seg>;

pub fn field_text(field: &FieldBuf) -> String {
    field.iter().map(|s| s.text.as_str()).collect()
}

fn field_has_quoted(field: &FieldBuf) -> bool {
    field.iter().any(|s| s.quoted)
}

impl Interp<'_> {
    /// Expand a word list into final argument strings (full pipeline).
    pub fn expand_words(
        &self,
        st: &mut ShellState,
        words: &[Word],
    ) -> Result<Vec<String>, Interrupt> {
        let mut out = Vec::new();
        for word in words {
            out.extend(self.expand_word_fields(st, word)?);
        }
        Ok(out)
    }

    /// Expand one word into zero or more fields.
    pub fn expand_word_fields(
        &self,
        st: &mut ShellState,
        word: &Word,
    ) -> Result<Vec<String>, Interrupt> {
        let mut results = Vec::new();
        for parts in brace::expand(st, &word.parts)? {
            let bufs = self.collect_fields(st, &parts)?;
            for buf in bufs {
                for field in split::split_field(st, buf) {
                    self.finish_field(st, field, &mut results)?;
                }
            }
        }
        Ok(results)
    }

    /// Pathname expansion + quote removal for one split field.
    fn finish_field(
        &self,
        st: &mut ShellState,
        field: FieldBuf,
        out: &mut Vec<String>,
    ) -> Result<(), Interrupt> {
        let text = field_text(&field);
        if text.is_empty() && !field_has_quoted(&field) {
            return Ok(());
        }
        if !st.opts.noglob {
            let pat: String = field
                .iter()
                .map(|s| {
                    if s.quoted {
                        pattern::escape_glob(&s.text)
                    } else {
                        s.text.clone()
                    }
                })
                .collect();
            if pattern::has_glob_chars(&pat) {
                let matches = glob::expand_glob(self.host, &st.cwd, &pat, &st.shopts);
                if matches.is_empty() {
                    if st.shopts.failglob {
                        return Err(Interrupt::fault(
                            FaultKind::Glob,
                            format!("no match: {text}"),
                        ));
                    }
                    if st.shopts.nullglob {
                        return Ok(());
                    }
                    out.push(text);
                } else {
                    out.extend(matches);
                }
                return Ok(());
            }
        }
        out.push(text);
        Ok(())
    }

    /// Expansion without splitting or globbing: assignments, redirection
    /// targets, here-strings, case subjects.
    pub fn expand_word_single(
        &self,
        st: &mut ShellState,
        word: &Word,
    ) -> Result<String, Interrupt> {
        let bufs = self.collect_fields(st, &word.parts)?;
        let texts: Vec<String> = bufs.iter().map(field_text).collect();
        Ok(texts.join(" "))
    }

    /// Expansion to pattern text: quoted pieces are glob-escaped so they
    /// match literally, unquoted pieces stay pattern-active.
    pub fn expand_word_pattern(
        &self,
        st: &mut ShellState,
        word: &Word,
    ) -> Result<String, Interrupt> {
        let bufs = self.collect_fields(st, &word.parts)?;
        let mut out = String::new();
        for (i, buf) in bufs.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            for seg in buf {
                if seg.quoted {
                    out.push_str(&pattern::escape_glob(&seg.text));
                } else {
                    out.push_str(&seg.text);
                }
            }
        }
        Ok(out)
    }

    /// Like [`expand_word_pattern`] but escaping for regex use (`=~`).
    pub fn expand_word_regex(
        &self,
        st: &mut ShellState,
        word: &Word,
    ) -> Result<String, Interrupt> {
        let bufs = self.collect_fields(st, &word.parts)?;
        let mut out = String::new();
        for buf in bufs {
            for seg in buf {
                if seg.quoted {
                    for c in seg.text.chars() {
                        if "\\.^$|()[]{}*+?".contains(c) {
                            out.push('\\');
                        }
                        out.push(c);
                    }
                } else {
                    out.push_str(&seg.text);
                }
            }
        }
        Ok(out)
    }

    /// Expand parts into field buffers. Only quoted `$@`-family expansions
    /// produce more than one buffer here.
    pub(crate) fn collect_fields(
        &self,
        st: &mut ShellState,
        parts: &[WordPart],
    ) -> Result<Vec<FieldBuf>, Interrupt> {
        let mut fields: Vec<FieldBuf> = Vec::new();
        let mut cur: FieldBuf = Vec::new();
        self.expand_parts(st, parts, false, &mut fields, &mut cur)?;
        fields.push(cur);
        Ok(fields)
    }

    fn expand_parts(
        &self,
        st: &mut ShellState,
        parts: &[WordPart],
        in_dq: bool,
        fields: &mut Vec<FieldBuf>,
        cur: &mut FieldBuf,
    ) -> Result<(), Interrupt> {
        for part in parts {
            match part {
                WordPart::Literal(s) => {
                    if in_dq {
                        cur.push(Seg::quoted(s.clone()));
                    } else {
                        cur.push(Seg::lit(s.clone()));
                    }
                }
                WordPart::Glob(p) => {
                    if in_dq {
                        cur.push(Seg::quoted(p.clone()));
                    } else {
                        cur.push(Seg::lit(p.clone()));
                    }
                }
                WordPart::SingleQuoted(s) | WordPart::AnsiQuoted(s) => {
                    cur.push(Seg::quoted(s.clone()));
                }
                WordPart::Escaped(s) => {
                    cur.push(Seg::quoted(s.clone()));
                }
                WordPart::DoubleQuoted(inner) => {
                    // An empty "" still marks the field as quoted.
                    if inner.is_empty() {
                        cur.push(Seg::quoted(""));
                    }
                    self.expand_parts(st, inner, true, fields, cur)?;
                }
                WordPart::Tilde { user } => {
                    let text = self.tilde_value(st, user.as_deref());
                    cur.push(Seg { text, quoted: true, splittable: false });
                }
                WordPart::Param(pe) => {
                    match self.expand_param(st, pe, in_dq)? {
                        ParamValue::Single(v) => cur.push(Seg::expansion(v, in_dq)),
                        ParamValue::Fields(items) => {
                            self.spread(items, in_dq, fields, cur);
                        }
                    }
                }
                WordPart::CommandSub { script, .. } => {
                    let text = self.command_substitution(st, script)?;
                    cur.push(Seg::expansion(text, in_dq));
                }
                WordPart::ArithSub(expr) => {
                    let n = self.eval_arith(st, expr)?;
                    cur.push(Seg::expansion(n.to_string(), in_dq));
                }
                WordPart::ProcessSub { script, write } => {
                    let path = self.process_substitution(st, script, *write)?;
                    cur.push(Seg { text: path, quoted: true, splittable: false });
                }
                WordPart::Brace(items) => {
                    // Reached only in single/pattern mode (no brace pass):
                    // render literally, expanding item words in place.
                    let mut text = String::from("{");
                    for (i, item) in items.iter().enumerate() {
                        if i > 0 {
                            text.push(',');
                        }
                        match item {
                            BraceItem::Word(w) => {
                                text.push_str(&self.expand_word_single(st, w)?)
                            }
                            BraceItem::NumRange { from, to, step, width } => {
                                let w = *width;
                                text.push_str(&format!("{from:0w$}..{to:0w$}"));
                                if let Some(s) = step {
                                    text.push_str(&format!("..{s}"));
                                }
                            }
                            BraceItem::CharRange { from, to, step } => {
                                text.push_str(&format!("{from}..{to}"));
                                if let Some(s) = step {
                                    text.push_str(&format!("..{s}"));
                                }
                            }
                        }
                    }
                    text.push('}');
                    cur.push(Seg::lit(text));
                }
            }
        }
        Ok(())
    }

    /// Distribute a multi-value expansion: the first value joins the
    /// current field, the last begins the next, middles stand alone.
    fn spread(
        &self,
        items: Vec<String>,
        in_dq: bool,
        fields: &mut Vec<FieldBuf>,
        cur: &mut FieldBuf,
    ) {
        if items.is_empty() {
            // "$@" with no positionals contributes nothing, and the word
            // disappears entirely if nothing else is quoted around it.
            return;
        }
        for (i, item) in items.into_iter().enumerate() {
            if i > 0 {
                fields.push(std::mem::take(cur));
            }
            cur.push(if in_dq { Seg::quoted(item) } else { Seg::expansion(item, false) });
        }
    }

    fn tilde_value(&self, st: &ShellState, user: Option<&str>) -> String {
        match user {
            None => st.cell("HOME").unwrap_or("~").to_string(),
            Some("+") => st.cwd.clone(),
            Some("-") => st.prev_dir.clone(),
            Some(name) => format!("/home/{name}"),
        }
    }

    /// Run a command substitution in a subshell clone, capture stdout
    /// with trailing newlines stripped.
    pub(crate) fn command_substitution(
        &self,
        st: &mut ShellState,
        script: &Script,
    ) -> Result<String, Interrupt> {
        let mut sub = st.clone();
        sub.bash_pid = sub.fresh_pid();
        let outcome = self.run_subshell(&mut sub, script)?;
        st.next_pid = sub.next_pid;
        st.last_exit = outcome.exit_code;
        st.expansion_exit = Some(outcome.exit_code);
        st.expansion_stderr.push_str(&outcome.stderr);
        let mut text = outcome.stdout;
        while text.ends_with('\n') {
            text.pop();
        }
        Ok(text)
    }

    /// Materialize a process substitution as a file on the vfs and return
    /// its path. `<(cmd)` runs now; `>(cmd)` records the script so the
    /// enclosing command's writes can be fed to it afterwards.
    fn process_substitution(
        &self,
        st: &mut ShellState,
        script: &Script,
        write: bool,
    ) -> Result<String, Interrupt> {
        let pid = st.fresh_pid();
        let path = format!("/tmp/.psub.{pid}");
        let _ = self.host.mkdir("/tmp", true);
        if write {
            let _ = self.host.write(&path, b"");
            st.pending_procsubs.push((path.clone(), script.clone()));
        } else {
            let mut sub = st.clone();
            sub.bash_pid = pid;
            let outcome = self.run_subshell(&mut sub, script)?;
            st.next_pid = sub.next_pid;
            st.expansion_stderr.push_str(&outcome.stderr);
            let _ = self.host.write(&path, outcome.stdout.as_bytes());
        }
        Ok(path)
    }
}
