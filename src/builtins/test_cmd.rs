//! `test` / `[`: the classic word-based test evaluator.
//!
//! Unlike `[[ ]]` this is an ordinary builtin: operands arrive fully
//! expanded, `-a`/`-o` combine expressions, and `=` does literal string
//! comparison, not pattern matching.

use crate::ast::CondUnary;
use crate::interp::flow::{ExecOutcome, Interrupt};
use crate::interp::state::ShellState;
use crate::interp::Interp;

pub fn test_cmd(
    interp: &Interp<'_>,
    st: &mut ShellState,
    args: &[String],
    bracket: bool,
) -> Result<ExecOutcome, Interrupt> {
    let mut args: Vec<&str> = args.iter().map(String::as_str).collect();
    if bracket {
        match args.last() {
            Some(&"]") => {
                args.pop();
            }
            _ => return Ok(ExecOutcome::failure("bash: [: missing `]'\n", 2)),
        }
    }
    let mut p = TestParser { interp, st, args: &args, pos: 0 };
    match p.or_expr() {
        Ok(truth) if p.pos == args.len() => Ok(ExecOutcome::code(i32::from(!truth))),
        Ok(_) => Ok(ExecOutcome::failure("bash: test: too many arguments\n", 2)),
        Err(msg) => Ok(ExecOutcome::failure(format!("bash: test: {msg}\n"), 2)),
    }
}

struct TestParser<'a, 'h> {
    interp: &'a Interp<'h>,
    st: &'a mut ShellState,
    args: &'a [&'a str],
    pos: usize,
}

impl TestParser<'_, '_> {
    fn peek(&self) -> Option<&str> {
        self.args.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<&str> {
        let a = self.args.get(self.pos).copied();
        if a.is_some() {
            self.pos += 1;
        }
        a
    }

    fn or_expr(&mut self) -> Result<bool, String> {
        let mut v = self.and_expr()?;
        while self.peek() == Some("-o") {
            self.pos += 1;
            let rhs = self.and_expr()?;
            v = v || rhs;
        }
        Ok(v)
    }

    fn and_expr(&mut self) -> Result<bool, String> {
        let mut v = self.term()?;
        while self.peek() == Some("-a") {
            self.pos += 1;
            let rhs = self.term()?;
            v = v && rhs;
        }
        Ok(v)
    }

    fn term(&mut self) -> Result<bool, String> {
        match self.peek() {
            None => Ok(false),
            Some("!") => {
                self.pos += 1;
                Ok(!self.term()?)
            }
            Some("(") => {
                self.pos += 1;
                let v = self.or_expr()?;
                if self.next() != Some(")") {
                    return Err("`)' expected".to_string());
                }
                Ok(v)
            }
            Some(_) => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<bool, String> {
        let first = self.next().expect("peeked").to_string();

        // Binary operator between the next two words?
        if let Some(op) = self.peek().map(str::to_string) {
            if let Some(result) = self.try_binary(&first, &op)? {
                return Ok(result);
            }
        }

        // Unary operator with an operand.
        if first.len() == 2 && first.starts_with('-') {
            if let Some(operand) = self.peek() {
                let operand = operand.to_string();
                if let Some(u) = unary_of(&first) {
                    self.pos += 1;
                    return self
                        .interp
                        .eval_unary(self.st, u, &operand)
                        .map_err(|_| "test error".to_string());
                }
            }
        }

        // Bare word: true when non-empty.
        Ok(!first.is_empty())
    }

    fn try_binary(&mut self, lhs: &str, op: &str) -> Result<Option<bool>, String> {
        let verdict = match op {
            "=" | "==" => {
                let rhs = self.rhs()?;
                Some(lhs == rhs)
            }
            "!=" => {
                let rhs = self.rhs()?;
                Some(lhs != rhs)
            }
            "<" => {
                let rhs = self.rhs()?;
                Some(lhs < rhs.as_str())
            }
            ">" => {
                let rhs = self.rhs()?;
                Some(lhs > rhs.as_str())
            }
            "-eq" | "-ne" | "-lt" | "-le" | "-gt" | "-ge" => {
                let opname = op.to_string();
                let rhs = self.rhs()?;
                let a = int_operand(lhs)?;
                let b = int_operand(&rhs)?;
                Some(match opname.as_str() {
                    "-eq" => a == b,
                    "-ne" => a != b,
                    "-lt" => a < b,
                    "-le" => a <= b,
                    "-gt" => a > b,
                    _ => a >= b,
                })
            }
            "-nt" | "-ot" | "-ef" => {
                let opname = op.to_string();
                let rhs = self.rhs()?;
                let l = crate::vfs::path::absolutize(&self.st.cwd, lhs);
                let r = crate::vfs::path::absolutize(&self.st.cwd, &rhs);
                let lm = self.interp.host.stat(&l).ok().map(|m| m.mtime);
                let rm = self.interp.host.stat(&r).ok().map(|m| m.mtime);
                Some(match opname.as_str() {
                    "-nt" => matches!((lm, rm), (Some(a), Some(b)) if a > b)
                        || (lm.is_some() && rm.is_none()),
                    "-ot" => matches!((lm, rm), (Some(a), Some(b)) if a < b)
                        || (lm.is_none() && rm.is_some()),
                    _ => {
                        lm.is_some()
                            && self.interp.host.canonicalize(&l).ok()
                                == self.interp.host.canonicalize(&r).ok()
                    }
                })
            }
            _ => None,
        };
        Ok(verdict)
    }

    fn rhs(&mut self) -> Result<String, String> {
        self.pos += 1; // the operator
        self.next()
            .map(str::to_string)
            .ok_or_else(|| "argument expected".to_string())
    }
}

fn int_operand(s: &str) -> Result<i64, String> {
    s.trim()
        .parse::<i64>()
        .map_err(|_| format!("{s}: integer expression expected"))
}

fn unary_of(flag: &str) -> Option<CondUnary> {
    Some(match flag {
        "-a" | "-e" => CondUnary::Exists,
        "-f" => CondUnary::IsFile,
        "-d" => CondUnary::IsDir,
        "-h" | "-L" => CondUnary::IsSymlink,
        "-r" => CondUnary::IsReadable,
        "-w" => CondUnary::IsWritable,
        "-x" => CondUnary::IsExec,
        "-s" => CondUnary::NonEmptyFile,
        "-p" => CondUnary::IsPipe,
        "-S" => CondUnary::IsSocket,
        "-b" => CondUnary::IsBlock,
        "-c" => CondUnary::IsChar,
        "-t" => CondUnary::IsTty,
        "-u" => CondUnary::Setuid,
        "-g" => CondUnary::Setgid,
        "-k" => CondUnary::Sticky,
        "-O" => CondUnary::Owned,
        "-G" => CondUnary::GroupOwned,
        "-N" => CondUnary::Modified,
        "-z" => CondUnary::ZeroLen,
        "-n" => CondUnary::NonZeroLen,
        "-v" => CondUnary::VarSet,
        "-R" => CondUnary::VarNameref,
        "-o" => CondUnary::OptSet,
        _ => return None,
    })
}
