//! `[[ ... ]]` evaluation: string/pattern/regex tests and file tests
//! against the virtual filesystem.

use regex_lite::Regex;

use crate::ast::*;
use crate::expand::{arrays, pattern};
use crate::interp::flow::{FaultKind, Interrupt};
use crate::interp::state::ShellState;
use crate::interp::Interp;
use crate::vfs::path as vpath;

impl Interp<'_> {
    pub(crate) fn eval_cond(
        &self,
        st: &mut ShellState,
        expr: &CondExpr,
    ) -> Result<bool, Interrupt> {
        match expr {
            CondExpr::Word(w) => Ok(!self.expand_word_single(st, w)?.is_empty()),
            CondExpr::Not(inner) => Ok(!self.eval_cond(st, inner)?),
            CondExpr::Group(inner) => self.eval_cond(st, inner),
            CondExpr::And(a, b) => {
                if !self.eval_cond(st, a)? {
                    return Ok(false);
                }
                self.eval_cond(st, b)
            }
            CondExpr::Or(a, b) => {
                if self.eval_cond(st, a)? {
                    return Ok(true);
                }
                self.eval_cond(st, b)
            }
            CondExpr::Unary { op, operand } => {
                let arg = self.expand_word_single(st, operand)?;
                self.eval_unary(st, *op, &arg)
            }
            CondExpr::Binary { op, lhs, rhs } => self.eval_binary_cond(st, *op, lhs, rhs),
        }
    }

    pub(crate) fn eval_unary(
        &self,
        st: &mut ShellState,
        op: CondUnary,
        arg: &str,
    ) -> Result<bool, Interrupt> {
        use CondUnary::*;
        let path = vpath::absolutize(&st.cwd, arg);
        Ok(match op {
            Exists => self.host.exists(&path),
            IsFile => self.host.is_file(&path),
            IsDir => self.host.is_dir(&path),
            IsSymlink => self
                .host
                .lstat(&path)
                .map(|m| m.is_symlink())
                .unwrap_or(false),
            IsReadable | IsWritable => self.host.exists(&path),
            IsExec => self
                .host
                .stat(&path)
                .map(|m| m.is_dir() || m.mode & 0o111 != 0)
                .unwrap_or(false),
            NonEmptyFile => self.host.stat(&path).map(|m| m.size > 0).unwrap_or(false),
            IsPipe | IsSocket | IsBlock | IsChar | IsTty | Modified => false,
            Setuid => self
                .host
                .stat(&path)
                .map(|m| m.mode & 0o4000 != 0)
                .unwrap_or(false),
            Setgid => self
                .host
                .stat(&path)
                .map(|m| m.mode & 0o2000 != 0)
                .unwrap_or(false),
            Sticky => self
                .host
                .stat(&path)
                .map(|m| m.mode & 0o1000 != 0)
                .unwrap_or(false),
            Owned | GroupOwned => self.host.exists(&path),
            ZeroLen => arg.is_empty(),
            NonZeroLen => !arg.is_empty(),
            VarSet => var_is_set(self, st, arg)?,
            VarNameref => st.namerefs.contains(arg),
            OptSet => match arg {
                "errexit" => st.opts.errexit,
                "nounset" => st.opts.nounset,
                "pipefail" => st.opts.pipefail,
                "xtrace" => st.opts.xtrace,
                "verbose" => st.opts.verbose,
                "noglob" => st.opts.noglob,
                "noclobber" => st.opts.noclobber,
                "noexec" => st.opts.noexec,
                "allexport" => st.opts.allexport,
                other => st.shopts.get(other).unwrap_or(false),
            },
        })
    }

    fn eval_binary_cond(
        &self,
        st: &mut ShellState,
        op: CondBinary,
        lhs: &Word,
        rhs: &Word,
    ) -> Result<bool, Interrupt> {
        use CondBinary::*;
        match op {
            StrEq | StrNe => {
                let left = self.expand_word_single(st, lhs)?;
                let pat = self.expand_word_pattern(st, rhs)?;
                let opts = pattern::PatternOpts {
                    extglob: st.shopts.extglob,
                    nocase: st.shopts.nocasematch,
                };
                let matched = pattern::matches(&pat, &left, opts);
                Ok(if op == StrEq { matched } else { !matched })
            }
            Regex => self.eval_regex(st, lhs, rhs),
            StrLt => {
                let l = self.expand_word_single(st, lhs)?;
                let r = self.expand_word_single(st, rhs)?;
                Ok(l < r)
            }
            StrGt => {
                let l = self.expand_word_single(st, lhs)?;
                let r = self.expand_word_single(st, rhs)?;
                Ok(l > r)
            }
            NumEq | NumNe | NumLt | NumLe | NumGt | NumGe => {
                let l = self.expand_word_single(st, lhs)?;
                let r = self.expand_word_single(st, rhs)?;
                let a = self.eval_text_arith(st, &l)?;
                let b = self.eval_text_arith(st, &r)?;
                Ok(match op {
                    NumEq => a == b,
                    NumNe => a != b,
                    NumLt => a < b,
                    NumLe => a <= b,
                    NumGt => a > b,
                    NumGe => a >= b,
                    _ => unreachable!(),
                })
            }
            Newer | Older => {
                let l_expanded = self.expand_word_single(st, lhs)?;
                let l = vpath::absolutize(&st.cwd, &l_expanded);
                let r_expanded = self.expand_word_single(st, rhs)?;
                let r = vpath::absolutize(&st.cwd, &r_expanded);
                let lm = self.host.stat(&l).ok().map(|m| m.mtime);
                let rm = self.host.stat(&r).ok().map(|m| m.mtime);
                Ok(match (op, lm, rm) {
                    (Newer, Some(a), Some(b)) => a > b,
                    (Newer, Some(_), None) => true,
                    (Older, Some(a), Some(b)) => a < b,
                    (Older, None, Some(_)) => true,
                    _ => false,
                })
            }
            SameFile => {
                let l_expanded = self.expand_word_single(st, lhs)?;
                let l = vpath::absolutize(&st.cwd, &l_expanded);
                let r_expanded = self.expand_word_single(st, rhs)?;
                let r = vpath::absolutize(&st.cwd, &r_expanded);
                match (self.host.canonicalize(&l), self.host.canonicalize(&r)) {
                    (Ok(a), Ok(b)) => Ok(a == b && self.host.exists(&a)),
                    _ => Ok(false),
                }
            }
        }
    }

    fn eval_regex(
        &self,
        st: &mut ShellState,
        lhs: &Word,
        rhs: &Word,
    ) -> Result<bool, Interrupt> {
        let text = self.expand_word_single(st, lhs)?;
        let pat = self.expand_word_regex(st, rhs)?;
        let src = if st.shopts.nocasematch {
            format!("(?is){pat}")
        } else {
            format!("(?s){pat}")
        };
        let re = Regex::new(&src).map_err(|_| {
            Interrupt::fault(FaultKind::Param, format!("{pat}: invalid regular expression"))
        })?;
        match re.captures(&text) {
            Some(caps) => {
                arrays::clear(st, "BASH_REMATCH");
                for (i, group) in caps.iter().enumerate() {
                    let s = group.map(|m| m.as_str()).unwrap_or("");
                    arrays::set_indexed(st, "BASH_REMATCH", i as i64, s.to_string());
                }
                Ok(true)
            }
            None => {
                arrays::clear(st, "BASH_REMATCH");
                Ok(false)
            }
        }
    }
}

fn var_is_set(
    interp: &Interp<'_>,
    st: &mut ShellState,
    name: &str,
) -> Result<bool, Interrupt> {
    if let Some(open) = name.find('[') {
        let base = &name[..open].to_string();
        let sub = &name[open + 1..name.len().saturating_sub(1)].to_string();
        if sub == "@" || sub == "*" {
            return Ok(arrays::len(st, base) > 0);
        }
        if st.assoc.contains(base) {
            let key = interp.expand_subscript_text(st, sub)?;
            return Ok(st.cell(&arrays::assoc_cell(base, &key)).is_some());
        }
        let idx = interp.eval_subscript(st, sub)?;
        let idx = match arrays::resolve_index(st, base, idx) {
            Some(i) => i,
            None => return Ok(false),
        };
        return Ok(arrays::get_indexed(st, base, idx).is_some());
    }
    Ok(st.cell(name).is_some() || arrays::get_indexed(st, name, 0).is_some())
}
