//! Parameter expansion: every `${...}` operator.
//!
//! A parameter resolves to a target (special, positional, scalar, array
//! element, or whole array), the target reads to zero or more values, and
//! the operator transforms them. `[@]`-style targets stay multi-valued so
//! quoting can keep fields separate.

use crate::ast::*;
use crate::expand::{arrays, pattern, quote};
use crate::interp::flow::{FaultKind, Interrupt};
use crate::interp::state::ShellState;
use crate::interp::Interp;
use crate::parser::word as word_parser;

#[derive(Debug, Clone)]
pub(crate) enum ParamValue {
    Single(String),
    Fields(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
enum Target {
    Special(char),
    Positional(usize),
    Var(String),
    Elem { name: String, sub: String },
    AllElems { name: String, star: bool },
    AllPositional { star: bool },
}

fn classify(name: &str) -> Target {
    if name == "@" {
        return Target::AllPositional { star: false };
    }
    if name == "*" {
        return Target::AllPositional { star: true };
    }
    if name.len() == 1 {
        let c = name.chars().next().unwrap();
        if matches!(c, '?' | '$' | '!' | '#' | '-' | '_') {
            return Target::Special(c);
        }
    }
    if name.chars().all(|c| c.is_ascii_digit()) && !name.is_empty() {
        return Target::Positional(name.parse().unwrap_or(0));
    }
    if let Some(open) = name.find('[') {
        let base = &name[..open];
        let sub = &name[open + 1..name.len().saturating_sub(1)];
        if sub == "@" || sub == "*" {
            return Target::AllElems { name: base.to_string(), star: sub == "*" };
        }
        return Target::Elem { name: base.to_string(), sub: sub.to_string() };
    }
    Target::Var(name.to_string())
}

impl Interp<'_> {
    pub(crate) fn expand_param(
        &self,
        st: &mut ShellState,
        pe: &ParamExp,
        in_dq: bool,
    ) -> Result<ParamValue, Interrupt> {
        self.expand_param_depth(st, pe, in_dq, 0)
    }

    fn expand_param_depth(
        &self,
        st: &mut ShellState,
        pe: &ParamExp,
        in_dq: bool,
        depth: u32,
    ) -> Result<ParamValue, Interrupt> {
        if depth > 16 {
            return Err(Interrupt::fault(
                FaultKind::BadSubst,
                format!("{}: expansion recursion exceeded", pe.name),
            ));
        }
        match &pe.op {
            Some(ParamOp::BadSubst { text }) => Err(Interrupt::fault(
                FaultKind::BadSubst,
                format!("{text}: bad substitution"),
            )),
            Some(ParamOp::NamePrefix { star: _ }) => {
                let mut names: Vec<String> = st
                    .vars
                    .keys()
                    .filter(|k| crate::parser::is_valid_name(k))
                    .cloned()
                    .collect();
                for set in [&st.indexed, &st.assoc] {
                    names.extend(set.iter().cloned());
                }
                names.retain(|n| n.starts_with(&pe.name));
                names.sort();
                names.dedup();
                Ok(ParamValue::Fields(names))
            }
            Some(ParamOp::Keys { star: _ }) => {
                let name = self.resolved_name(st, &pe.name)?;
                if st.assoc.contains(&name) {
                    Ok(ParamValue::Fields(arrays::assoc_keys(st, &name)))
                } else {
                    let keys: Vec<String> = if arrays::indices(st, &name).is_empty() {
                        if st.cell(&name).is_some() {
                            vec!["0".to_string()]
                        } else {
                            Vec::new()
                        }
                    } else {
                        arrays::indices(st, &name).iter().map(i64::to_string).collect()
                    };
                    Ok(ParamValue::Fields(keys))
                }
            }
            Some(ParamOp::Indirect(inner)) => {
                self.expand_indirect(st, pe, inner.as_deref(), in_dq, depth)
            }
            Some(ParamOp::Length) => self.param_length(st, &pe.name),
            _ => self.expand_general(st, pe, in_dq, depth),
        }
    }

    /// Resolve namerefs on a (possibly subscripted) parameter name.
    fn resolved_name(&self, st: &ShellState, name: &str) -> Result<String, Interrupt> {
        let (base, suffix) = match name.find('[') {
            Some(i) => (&name[..i], &name[i..]),
            None => (name, ""),
        };
        if !st.namerefs.contains(base) {
            return Ok(name.to_string());
        }
        let target = st
            .resolve_nameref(base)
            .map_err(|msg| Interrupt::fault(FaultKind::BadSubst, msg))?;
        Ok(format!("{target}{suffix}"))
    }

    fn param_length(&self, st: &mut ShellState, name: &str) -> Result<ParamValue, Interrupt> {
        let name = self.resolved_name(st, name)?;
        match classify(&name) {
            Target::AllPositional { .. } => {
                Ok(ParamValue::Single(st.positional.len().to_string()))
            }
            Target::AllElems { name, .. } => {
                Ok(ParamValue::Single(arrays::len(st, &name).to_string()))
            }
            target => {
                let values = self.read_target(st, &target)?;
                match values {
                    Some(vs) => {
                        let joined = vs.join(" ");
                        Ok(ParamValue::Single(joined.chars().count().to_string()))
                    }
                    None => {
                        if st.opts.nounset {
                            return Err(Interrupt::unbound(name));
                        }
                        Ok(ParamValue::Single("0".to_string()))
                    }
                }
            }
        }
    }

    fn expand_indirect(
        &self,
        st: &mut ShellState,
        pe: &ParamExp,
        inner: Option<&ParamOp>,
        in_dq: bool,
        depth: u32,
    ) -> Result<ParamValue, Interrupt> {
        // A nameref answers with the name it points at.
        if st.namerefs.contains(&pe.name) {
            let target = st.cell(&pe.name).unwrap_or("").to_string();
            return Ok(ParamValue::Single(target));
        }
        let referent = match self.read_target(st, &classify(&pe.name))? {
            Some(vs) => vs.join(" "),
            None => {
                if st.opts.nounset {
                    return Err(Interrupt::unbound(pe.name.clone()));
                }
                return Ok(ParamValue::Single(String::new()));
            }
        };
        if referent.is_empty() {
            return Ok(ParamValue::Single(String::new()));
        }
        let valid = referent
            .chars()
            .enumerate()
            .all(|(i, c)| {
                c.is_ascii_alphanumeric()
                    || c == '_'
                    || c == '['
                    || c == ']'
                    || c == '@'
                    || c == '*'
                    || (i == 0 && c.is_ascii_digit())
            });
        if !valid {
            return Err(Interrupt::fault(
                FaultKind::BadSubst,
                format!("{referent}: bad substitution"),
            ));
        }
        let next = ParamExp { name: referent, op: inner.cloned() };
        self.expand_param_depth(st, &next, in_dq, depth + 1)
    }

    fn expand_general(
        &self,
        st: &mut ShellState,
        pe: &ParamExp,
        in_dq: bool,
        depth: u32,
    ) -> Result<ParamValue, Interrupt> {
        let name = self.resolved_name(st, &pe.name)?;
        // Nameref pointing at an array element: element reads through it
        // expand empty.
        if name.contains('[')
            && pe.name.contains('[')
            && st.namerefs.contains(pe.name.split('[').next().unwrap_or(""))
        {
            return Ok(ParamValue::Single(String::new()));
        }
        let target = classify(&name);
        let values = self.read_target(st, &target)?;

        let op = match &pe.op {
            None => {
                return self.finish_plain(st, &name, &target, values, in_dq);
            }
            Some(op) => op,
        };

        let is_set = values.is_some();
        let joined = values.clone().map(|vs| vs.join(" ")).unwrap_or_default();
        let is_empty = joined.is_empty();

        match op {
            ParamOp::Default { word, or_empty } => {
                if !is_set || (*or_empty && is_empty) {
                    Ok(ParamValue::Single(self.expand_word_single(st, word)?))
                } else {
                    self.finish_plain(st, &name, &target, values, in_dq)
                }
            }
            ParamOp::Assign { word, or_empty } => {
                if !is_set || (*or_empty && is_empty) {
                    let new = self.expand_word_single(st, word)?;
                    self.assign_target(st, &target, &name, new.clone())?;
                    Ok(ParamValue::Single(new))
                } else {
                    self.finish_plain(st, &name, &target, values, in_dq)
                }
            }
            ParamOp::Error { word, or_empty } => {
                if !is_set || (*or_empty && is_empty) {
                    let msg = match word {
                        Some(w) => self.expand_word_single(st, w)?,
                        None => {
                            if is_set {
                                "parameter null or not set".to_string()
                            } else {
                                "parameter not set".to_string()
                            }
                        }
                    };
                    Err(Interrupt::fault(FaultKind::Param, format!("{name}: {msg}")))
                } else {
                    self.finish_plain(st, &name, &target, values, in_dq)
                }
            }
            ParamOp::Alternative { word, or_empty } => {
                if is_set && !(*or_empty && is_empty) {
                    Ok(ParamValue::Single(self.expand_word_single(st, word)?))
                } else {
                    Ok(ParamValue::Single(String::new()))
                }
            }
            ParamOp::Substring { offset, length } => {
                self.nounset_guard(st, &name, &target, &values, depth)?;
                let off = self.eval_arith(st, offset)?;
                let len = match length {
                    Some(l) => Some(self.eval_arith(st, l)?),
                    None => None,
                };
                self.substring(st, &target, values, off, len)
            }
            ParamOp::StripPattern { pattern: pat, suffix, greedy } => {
                self.nounset_guard(st, &name, &target, &values, depth)?;
                let pat_text = self.expand_word_pattern(st, pat)?;
                let opts = pattern::PatternOpts { extglob: st.shopts.extglob, nocase: false };
                let apply = |v: &str| strip_match(v, &pat_text, *suffix, *greedy, opts);
                Ok(map_values(values, target_is_multi(&target), in_dq, apply))
            }
            ParamOp::Replace { pattern: pat, replacement, all, anchor } => {
                self.nounset_guard(st, &name, &target, &values, depth)?;
                let pat_text = self.expand_word_pattern(st, pat)?;
                let rep = match replacement {
                    Some(w) => self.expand_word_single(st, w)?,
                    None => String::new(),
                };
                let opts = pattern::PatternOpts { extglob: st.shopts.extglob, nocase: false };
                let apply =
                    |v: &str| replace_match(v, &pat_text, &rep, *all, *anchor, opts);
                Ok(map_values(values, target_is_multi(&target), in_dq, apply))
            }
            ParamOp::CaseMod { upper, all, pattern: pat } => {
                self.nounset_guard(st, &name, &target, &values, depth)?;
                let pat_text = match pat {
                    Some(w) => Some(self.expand_word_pattern(st, w)?),
                    None => None,
                };
                let opts = pattern::PatternOpts { extglob: st.shopts.extglob, nocase: false };
                let apply = |v: &str| case_mod(v, *upper, *all, pat_text.as_deref(), opts);
                Ok(map_values(values, target_is_multi(&target), in_dq, apply))
            }
            ParamOp::Transform(kind) => {
                self.nounset_guard(st, &name, &target, &values, depth)?;
                self.transform(st, &name, &target, values, *kind)
            }
            // Handled in expand_param_depth.
            ParamOp::Length
            | ParamOp::Indirect(_)
            | ParamOp::Keys { .. }
            | ParamOp::NamePrefix { .. }
            | ParamOp::BadSubst { .. } => unreachable!("routed earlier"),
        }
    }

    fn nounset_guard(
        &self,
        st: &ShellState,
        name: &str,
        target: &Target,
        values: &Option<Vec<String>>,
        _depth: u32,
    ) -> Result<(), Interrupt> {
        if values.is_none()
            && st.opts.nounset
            && matches!(target, Target::Var(_) | Target::Positional(_) | Target::Elem { .. })
        {
            return Err(Interrupt::unbound(name));
        }
        Ok(())
    }

    /// No-operator expansion, with nounset and `$*` joining rules.
    fn finish_plain(
        &self,
        st: &mut ShellState,
        name: &str,
        target: &Target,
        values: Option<Vec<String>>,
        in_dq: bool,
    ) -> Result<ParamValue, Interrupt> {
        match values {
            Some(vs) => match target {
                Target::AllPositional { star: true } | Target::AllElems { star: true, .. }
                    if in_dq =>
                {
                    Ok(ParamValue::Single(vs.join(&star_sep(st))))
                }
                Target::AllPositional { .. } | Target::AllElems { .. } => {
                    Ok(ParamValue::Fields(vs))
                }
                _ => Ok(ParamValue::Single(vs.join(" "))),
            },
            None => {
                if st.opts.nounset
                    && matches!(
                        target,
                        Target::Var(_) | Target::Positional(_) | Target::Elem { .. }
                    )
                {
                    return Err(Interrupt::unbound(name.to_string()));
                }
                Ok(ParamValue::Single(String::new()))
            }
        }
    }

    /// Read a target to its values; None means unset.
    fn read_target(
        &self,
        st: &mut ShellState,
        target: &Target,
    ) -> Result<Option<Vec<String>>, Interrupt> {
        Ok(match target {
            Target::Special('?') => Some(vec![st.last_exit.to_string()]),
            Target::Special('$') => Some(vec![st.shell_pid.to_string()]),
            Target::Special('!') => {
                if st.last_bg_pid == 0 {
                    None
                } else {
                    Some(vec![st.last_bg_pid.to_string()])
                }
            }
            Target::Special('#') => Some(vec![st.positional.len().to_string()]),
            Target::Special('-') => Some(vec![st.opts.flags()]),
            Target::Special('_') => Some(vec![st.last_arg.clone()]),
            Target::Special(_) => None,
            Target::Positional(0) => Some(vec![st.script_name.clone()]),
            Target::Positional(n) => st.positional.get(n - 1).map(|v| vec![v.clone()]),
            Target::Var(name) => self.read_scalar(st, name),
            Target::Elem { name, sub } => self.read_element(st, name, sub)?,
            Target::AllElems { name, .. } => {
                let vs = arrays::values(st, name);
                if vs.is_empty() {
                    None
                } else {
                    Some(vs)
                }
            }
            Target::AllPositional { .. } => {
                if st.positional.is_empty() {
                    None
                } else {
                    Some(st.positional.clone())
                }
            }
        })
    }

    fn read_scalar(&self, st: &mut ShellState, name: &str) -> Option<Vec<String>> {
        let dynamic = match name {
            "RANDOM" => Some(st.random().to_string()),
            "SECONDS" => Some(st.seconds().to_string()),
            "LINENO" => Some(st.line.to_string()),
            "BASHPID" => Some(st.bash_pid.to_string()),
            "EPOCHSECONDS" => Some(chrono::Utc::now().timestamp().to_string()),
            "PWD" => Some(st.cwd.clone()),
            "OLDPWD" => Some(st.prev_dir.clone()),
            _ => None,
        };
        if let Some(v) = dynamic {
            return Some(vec![v]);
        }
        if let Some(v) = st.cell(name) {
            return Some(vec![v.to_string()]);
        }
        // `$arr` is element zero.
        if st.is_array(name) {
            return arrays::get_indexed(st, name, 0).map(|v| vec![v]);
        }
        None
    }

    fn read_element(
        &self,
        st: &mut ShellState,
        name: &str,
        sub: &str,
    ) -> Result<Option<Vec<String>>, Interrupt> {
        if st.assoc.contains(name) {
            let key = self.expand_subscript_text(st, sub)?;
            return Ok(st.cell(&arrays::assoc_cell(name, &key)).map(|v| vec![v.to_string()]));
        }
        let idx = self.eval_subscript(st, sub)?;
        match arrays::resolve_index(st, name, idx) {
            Some(i) => Ok(arrays::get_indexed(st, name, i).map(|v| vec![v])),
            None => {
                st.expansion_stderr
                    .push_str(&format!("bash: {name}: bad array subscript\n"));
                Ok(None)
            }
        }
    }

    pub(crate) fn expand_subscript_text(
        &self,
        st: &mut ShellState,
        sub: &str,
    ) -> Result<String, Interrupt> {
        let word = word_parser::parse_word(sub, st.line)
            .map_err(|e| Interrupt::fault(FaultKind::BadSubst, e.message))?;
        self.expand_word_single(st, &word)
    }

    pub(crate) fn eval_subscript(
        &self,
        st: &mut ShellState,
        sub: &str,
    ) -> Result<i64, Interrupt> {
        let expr = crate::parser::arith::parse_arith(sub)
            .unwrap_or(ArithExpr::Invalid { text: sub.to_string(), message: "bad array subscript".into() });
        self.eval_arith(st, &expr)
    }

    fn assign_target(
        &self,
        st: &mut ShellState,
        target: &Target,
        name: &str,
        value: String,
    ) -> Result<(), Interrupt> {
        match target {
            Target::Var(n) => {
                st.set_cell(n.clone(), value);
                if st.opts.allexport {
                    st.exported.insert(n.clone());
                }
                Ok(())
            }
            Target::Elem { name: n, sub } => {
                if st.assoc.contains(n) {
                    let key = self.expand_subscript_text(st, sub)?;
                    arrays::set_assoc(st, n, &key, value);
                } else {
                    let idx = self.eval_subscript(st, sub)?;
                    match arrays::resolve_index(st, n, idx) {
                        Some(i) => arrays::set_indexed(st, n, i, value),
                        None => {
                            return Err(Interrupt::fault(
                                FaultKind::Param,
                                format!("{n}: bad array subscript"),
                            ))
                        }
                    }
                }
                Ok(())
            }
            _ => Err(Interrupt::fault(
                FaultKind::Param,
                format!("${name}: cannot assign in this way"),
            )),
        }
    }

    fn substring(
        &self,
        st: &mut ShellState,
        target: &Target,
        values: Option<Vec<String>>,
        off: i64,
        len: Option<i64>,
    ) -> Result<ParamValue, Interrupt> {
        if let Some(l) = len {
            if l < 0 && !matches!(target, Target::Var(_) | Target::Positional(_) | Target::Elem { .. }) {
                return Err(Interrupt::fault(
                    FaultKind::Param,
                    format!("{l}: substring expression < 0"),
                ));
            }
        }
        match target {
            Target::AllPositional { .. } => {
                // Offset counts from $0.
                let mut list = vec![st.script_name.clone()];
                list.extend(st.positional.iter().cloned());
                let total = list.len() as i64;
                let start = if off < 0 { (total + off).max(0) } else { off.min(total) };
                let mut slice: Vec<String> =
                    list.into_iter().skip(start as usize).collect();
                if let Some(l) = len {
                    slice.truncate(l.max(0) as usize);
                }
                Ok(ParamValue::Fields(slice))
            }
            Target::AllElems { name, .. } => {
                let start = if off < 0 {
                    arrays::resolve_index(st, name, off).unwrap_or(0)
                } else {
                    off
                };
                let mut out = Vec::new();
                if st.assoc.contains(name) {
                    let vs = arrays::values(st, name);
                    out = vs.into_iter().skip(start as usize).collect();
                } else {
                    for i in arrays::indices(st, name) {
                        if i >= start {
                            if let Some(v) = arrays::get_indexed(st, name, i) {
                                out.push(v);
                            }
                        }
                    }
                    if arrays::indices(st, name).is_empty() {
                        if let Some(v) = st.cell(name) {
                            if start <= 0 {
                                out.push(v.to_string());
                            }
                        }
                    }
                }
                if let Some(l) = len {
                    out.truncate(l.max(0) as usize);
                }
                Ok(ParamValue::Fields(out))
            }
            _ => {
                let s = values.map(|v| v.join(" ")).unwrap_or_default();
                let chars: Vec<char> = s.chars().collect();
                let n = chars.len() as i64;
                let start = if off < 0 { n + off } else { off };
                if start < 0 || start > n {
                    return Ok(ParamValue::Single(String::new()));
                }
                let end = match len {
                    None => n,
                    Some(l) if l < 0 => n + l,
                    Some(l) => (start + l).min(n),
                };
                if end <= start {
                    return Ok(ParamValue::Single(String::new()));
                }
                let out: String = chars[start as usize..end as usize].iter().collect();
                Ok(ParamValue::Single(out))
            }
        }
    }

    fn transform(
        &self,
        st: &mut ShellState,
        name: &str,
        target: &Target,
        values: Option<Vec<String>>,
        kind: TransformKind,
    ) -> Result<ParamValue, Interrupt> {
        let multi = target_is_multi(target);
        match kind {
            TransformKind::Quote => {
                let vs = values.unwrap_or_default();
                let quoted: Vec<String> = vs.iter().map(|v| quote::shell_quote(v)).collect();
                if multi {
                    Ok(ParamValue::Fields(quoted))
                } else {
                    Ok(ParamValue::Single(quoted.join(" ")))
                }
            }
            TransformKind::Escape => {
                let s = values.map(|v| v.join(" ")).unwrap_or_default();
                Ok(ParamValue::Single(word_parser::decode_ansi_c(&s)))
            }
            TransformKind::Prompt => {
                let s = values.map(|v| v.join(" ")).unwrap_or_default();
                Ok(ParamValue::Single(quote::prompt_expand(st, &s)))
            }
            TransformKind::Attrs => {
                let base = name.split('[').next().unwrap_or(name);
                let mut flags = String::new();
                if st.indexed.contains(base) {
                    flags.push('a');
                }
                if st.assoc.contains(base) {
                    flags.push('A');
                }
                if st.integers.contains(base) {
                    flags.push('i');
                }
                if st.namerefs.contains(base) {
                    flags.push('n');
                }
                if st.readonly.contains(base) {
                    flags.push('r');
                }
                if st.exported.contains(base) {
                    flags.push('x');
                }
                Ok(ParamValue::Single(flags))
            }
            TransformKind::Assignment => {
                let base = name.split('[').next().unwrap_or(name);
                if st.is_array(base) {
                    let flag = if st.assoc.contains(base) { "A" } else { "a" };
                    let body: Vec<String> = arrays::entries(st, base)
                        .into_iter()
                        .map(|(k, v)| format!("[{k}]={}", quote::shell_quote(&v)))
                        .collect();
                    Ok(ParamValue::Single(format!(
                        "declare -{flag} {base}=({})",
                        body.join(" ")
                    )))
                } else {
                    let v = values.map(|v| v.join(" ")).unwrap_or_default();
                    Ok(ParamValue::Single(format!("{base}={}", quote::shell_quote(&v))))
                }
            }
            TransformKind::Keys => {
                let base = name.split('[').next().unwrap_or(name);
                let pairs: Vec<String> = arrays::entries(st, base)
                    .into_iter()
                    .map(|(k, v)| format!("{k} {}", quote::shell_quote(&v)))
                    .collect();
                Ok(ParamValue::Single(pairs.join(" ")))
            }
        }
    }
}

fn target_is_multi(target: &Target) -> bool {
    matches!(target, Target::AllElems { .. } | Target::AllPositional { .. })
}

fn star_sep(st: &ShellState) -> String {
    st.cell("IFS")
        .map(|ifs| ifs.chars().next().map(|c| c.to_string()).unwrap_or_default())
        .unwrap_or_else(|| " ".to_string())
}

fn map_values(
    values: Option<Vec<String>>,
    multi: bool,
    _in_dq: bool,
    f: impl Fn(&str) -> String,
) -> ParamValue {
    match values {
        None => ParamValue::Single(String::new()),
        Some(vs) => {
            let mapped: Vec<String> = vs.iter().map(|v| f(v)).collect();
            if multi {
                ParamValue::Fields(mapped)
            } else {
                ParamValue::Single(mapped.join(" "))
            }
        }
    }
}

/// `${v#pat}` family: remove the shortest/longest matching prefix/suffix.
fn strip_match(
    s: &str,
    pat: &str,
    suffix: bool,
    greedy: bool,
    opts: pattern::PatternOpts,
) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut boundaries: Vec<usize> = vec![0];
    let mut byte = 0;
    for c in &chars {
        byte += c.len_utf8();
        boundaries.push(byte);
    }
    if suffix {
        // Candidate suffixes start at each boundary.
        let order: Vec<usize> = if greedy {
            boundaries.clone()
        } else {
            boundaries.iter().rev().copied().collect()
        };
        for b in order {
            if pattern::matches(pat, &s[b..], opts) {
                return s[..b].to_string();
            }
        }
    } else {
        let order: Vec<usize> = if greedy {
            boundaries.iter().rev().copied().collect()
        } else {
            boundaries.clone()
        };
        for b in order {
            if pattern::matches(pat, &s[..b], opts) {
                return s[b..].to_string();
            }
        }
    }
    s.to_string()
}

/// `${v/pat/rep}` family.
fn replace_match(
    s: &str,
    pat: &str,
    rep: &str,
    all: bool,
    anchor: Option<ReplaceAnchor>,
    opts: pattern::PatternOpts,
) -> String {
    if pat.is_empty() {
        return s.to_string();
    }
    match anchor {
        Some(ReplaceAnchor::Start) => {
            // Longest matching prefix.
            let stripped = strip_match(s, pat, false, true, opts);
            if stripped.len() == s.len() {
                s.to_string()
            } else {
                format!("{rep}{stripped}")
            }
        }
        Some(ReplaceAnchor::End) => {
            let stripped = strip_match(s, pat, true, true, opts);
            if stripped.len() == s.len() {
                s.to_string()
            } else {
                format!("{stripped}{rep}")
            }
        }
        None => {
            let src = format!("(?s){}", pattern::translate(pat, opts));
            let Ok(re) = regex_lite::Regex::new(&src) else {
                return s.to_string();
            };
            let mut out = String::new();
            let mut last = 0;
            for m in re.find_iter(s) {
                if m.start() < last {
                    continue;
                }
                // Skip empty matches to guarantee progress.
                if m.start() == m.end() {
                    continue;
                }
                out.push_str(&s[last..m.start()]);
                out.push_str(rep);
                last = m.end();
                if !all {
                    break;
                }
            }
            out.push_str(&s[last..]);
            out
        }
    }
}

fn case_mod(
    s: &str,
    upper: bool,
    all: bool,
    pat: Option<&str>,
    opts: pattern::PatternOpts,
) -> String {
    let flip = |c: char| -> String {
        if upper {
            c.to_uppercase().to_string()
        } else {
            c.to_lowercase().to_string()
        }
    };
    let matches_pat = |c: char| match pat {
        None | Some("") => true,
        Some(p) => pattern::matches(p, &c.to_string(), opts),
    };
    let mut out = String::new();
    for (i, c) in s.chars().enumerate() {
        if (all || i == 0) && matches_pat(c) {
            out.push_str(&flip(c));
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_shortest_and_longest() {
        let o = pattern::PatternOpts::default();
        assert_eq!(strip_match("a/b/c.txt", "*/", false, false, o), "b/c.txt");
        assert_eq!(strip_match("a/b/c.txt", "*/", false, true, o), "c.txt");
        assert_eq!(strip_match("file.tar.gz", ".*", true, false, o), "file.tar");
        assert_eq!(strip_match("file.tar.gz", ".*", true, true, o), "file");
        assert_eq!(strip_match("nomatch", "xyz", false, true, o), "nomatch");
    }

    #[test]
    fn replace_first_and_all() {
        let o = pattern::PatternOpts::default();
        assert_eq!(replace_match("banana", "an", "AN", false, None, o), "bANana");
        assert_eq!(replace_match("banana", "an", "AN", true, None, o), "bANANa");
        assert_eq!(
            replace_match("banana", "ba", "x", false, Some(ReplaceAnchor::Start), o),
            "xnana"
        );
        assert_eq!(
            replace_match("banana", "na", "x", false, Some(ReplaceAnchor::End), o),
            "banax"
        );
        assert_eq!(
            replace_match("banana", "zz", "x", true, None, o),
            "banana"
        );
    }

    #[test]
    fn case_modification() {
        let o = pattern::PatternOpts::default();
        assert_eq!(case_mod("hello", true, false, None, o), "Hello");
        assert_eq!(case_mod("hello", true, true, None, o), "HELLO");
        assert_eq!(case_mod("HELLO", false, true, None, o), "hello");
        assert_eq!(case_mod("hello", true, true, Some("l"), o), "heLLo");
    }

    #[test]
    fn classify_targets() {
        assert_eq!(classify("@"), Target::AllPositional { star: false });
        assert_eq!(classify("3"), Target::Positional(3));
        assert_eq!(classify("x"), Target::Var("x".into()));
        assert!(matches!(classify("a[1+1]"), Target::Elem { .. }));
        assert!(matches!(classify("a[@]"), Target::AllElems { star: false, .. }));
        assert!(matches!(classify("a[*]"), Target::AllElems { star: true, .. }));
        assert_eq!(classify("?"), Target::Special('?'));
    }
}
