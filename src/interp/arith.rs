//! Arithmetic evaluation.
//!
//! Variables resolve recursively: a value that is itself an expression is
//! re-parsed and evaluated, with a depth cap standing in for bash's
//! expression-recursion guard. Assignments and `++`/`--` write straight
//! back into the flat variable store.

use crate::ast::*;
use crate::expand::arrays;
use crate::interp::flow::{FaultKind, Interrupt};
use crate::interp::state::ShellState;
use crate::interp::Interp;
use crate::parser::arith::{digits_in_base, parse_arith};

const MAX_ARITH_DEPTH: u32 = 64;

fn arith_err(message: impl Into<String>) -> Interrupt {
    Interrupt::fault(FaultKind::Arith, message.into())
}

impl Interp<'_> {
    pub fn eval_arith(&self, st: &mut ShellState, expr: &ArithExpr) -> Result<i64, Interrupt> {
        self.eval_depth(st, expr, 0)
    }

    fn eval_depth(
        &self,
        st: &mut ShellState,
        expr: &ArithExpr,
        depth: u32,
    ) -> Result<i64, Interrupt> {
        if depth > MAX_ARITH_DEPTH {
            return Err(arith_err("expression recursion level exceeded"));
        }
        match expr {
            ArithExpr::Num(n) => Ok(*n),
            ArithExpr::Var(name) => self.var_number(st, name, depth),
            ArithExpr::Elem { array, index, key } => {
                let value = self.read_elem_text(st, array, index, key.as_deref())?;
                self.string_number(st, &value, depth)
            }
            ArithExpr::Unary { op, operand } => {
                let v = self.eval_depth(st, operand, depth + 1)?;
                Ok(match op {
                    UnaryOp::Plus => v,
                    UnaryOp::Minus => v.wrapping_neg(),
                    UnaryOp::Not => i64::from(v == 0),
                    UnaryOp::BitNot => !v,
                })
            }
            ArithExpr::Step { inc, pre, target } => {
                let old = self.eval_depth(st, target, depth + 1)?;
                let new = if *inc { old.wrapping_add(1) } else { old.wrapping_sub(1) };
                self.write_lvalue(st, target, new)?;
                Ok(if *pre { new } else { old })
            }
            ArithExpr::Binary { op, lhs, rhs } => self.eval_binary(st, *op, lhs, rhs, depth),
            ArithExpr::Ternary { cond, then, other } => {
                if self.eval_depth(st, cond, depth + 1)? != 0 {
                    self.eval_depth(st, then, depth + 1)
                } else {
                    self.eval_depth(st, other, depth + 1)
                }
            }
            ArithExpr::Assign { op, target, value } => {
                let rhs = self.eval_depth(st, value, depth + 1)?;
                let result = match op {
                    AssignOp::Set => rhs,
                    _ => {
                        let old = self.eval_depth(st, target, depth + 1)?;
                        self.apply_binop(binop_of_assign(*op), old, rhs)?
                    }
                };
                self.write_lvalue(st, target, result)?;
                Ok(result)
            }
            ArithExpr::Group(inner) => self.eval_depth(st, inner, depth + 1),
            ArithExpr::CommandSub(script) => {
                let text = self.command_substitution(st, script)?;
                self.string_number(st, &text, depth)
            }
            ArithExpr::ParamSub(part) => {
                let word = Word { parts: vec![(**part).clone()] };
                let text = self.expand_word_single(st, &word)?;
                self.string_number(st, &text, depth)
            }
            ArithExpr::DynBase { base, digits } => {
                let b = self.eval_depth(st, base, depth + 1)?;
                if !(2..=64).contains(&b) {
                    return Err(arith_err(format!(
                        "invalid arithmetic base (error token is \"{b}\")"
                    )));
                }
                digits_in_base(digits, b, &format!("{b}#{digits}")).map_err(arith_err)
            }
            ArithExpr::Splice(pieces) => {
                let mut text = String::new();
                for piece in pieces {
                    text.push_str(&self.piece_text(st, piece, depth)?);
                }
                self.string_number(st, &text, depth)
            }
            ArithExpr::Invalid { message, .. } => Err(arith_err(message.clone())),
        }
    }

    fn eval_binary(
        &self,
        st: &mut ShellState,
        op: BinOp,
        lhs: &ArithExpr,
        rhs: &ArithExpr,
        depth: u32,
    ) -> Result<i64, Interrupt> {
        match op {
            BinOp::AndAnd => {
                if self.eval_depth(st, lhs, depth + 1)? == 0 {
                    return Ok(0);
                }
                Ok(i64::from(self.eval_depth(st, rhs, depth + 1)? != 0))
            }
            BinOp::OrOr => {
                if self.eval_depth(st, lhs, depth + 1)? != 0 {
                    return Ok(1);
                }
                Ok(i64::from(self.eval_depth(st, rhs, depth + 1)? != 0))
            }
            BinOp::Comma => {
                self.eval_depth(st, lhs, depth + 1)?;
                self.eval_depth(st, rhs, depth + 1)
            }
            _ => {
                let a = self.eval_depth(st, lhs, depth + 1)?;
                let b = self.eval_depth(st, rhs, depth + 1)?;
                self.apply_binop(op, a, b)
            }
        }
    }

    fn apply_binop(&self, op: BinOp, a: i64, b: i64) -> Result<i64, Interrupt> {
        Ok(match op {
            BinOp::Add => a.wrapping_add(b),
            BinOp::Sub => a.wrapping_sub(b),
            BinOp::Mul => a.wrapping_mul(b),
            BinOp::Div => {
                if b == 0 {
                    return Err(arith_err("division by 0 (error token is \"0\")"));
                }
                a.wrapping_div(b)
            }
            BinOp::Rem => {
                if b == 0 {
                    return Err(arith_err("division by 0 (error token is \"0\")"));
                }
                a.wrapping_rem(b)
            }
            BinOp::Pow => {
                if b < 0 {
                    return Err(arith_err(format!(
                        "exponent less than 0 (error token is \"{b}\")"
                    )));
                }
                let mut acc: i64 = 1;
                for _ in 0..b {
                    acc = acc.wrapping_mul(a);
                }
                acc
            }
            BinOp::Shl => a.wrapping_shl((b & 63) as u32),
            BinOp::Shr => a.wrapping_shr((b & 63) as u32),
            BinOp::Lt => i64::from(a < b),
            BinOp::Le => i64::from(a <= b),
            BinOp::Gt => i64::from(a > b),
            BinOp::Ge => i64::from(a >= b),
            BinOp::Eq => i64::from(a == b),
            BinOp::Ne => i64::from(a != b),
            BinOp::BitAnd => a & b,
            BinOp::BitXor => a ^ b,
            BinOp::BitOr => a | b,
            BinOp::AndAnd | BinOp::OrOr | BinOp::Comma => unreachable!("handled earlier"),
        })
    }

    /// Numeric value of a variable, following bash's recursive resolution.
    fn var_number(&self, st: &mut ShellState, name: &str, depth: u32) -> Result<i64, Interrupt> {
        let resolved = st
            .resolve_nameref(name)
            .map_err(|m| arith_err(m))?;
        let value = match resolved.as_str() {
            "RANDOM" => return Ok(st.random() as i64),
            "SECONDS" => return Ok(st.seconds()),
            "LINENO" => return Ok(st.line as i64),
            "BASHPID" => return Ok(st.bash_pid as i64),
            "#" => return Ok(st.positional.len() as i64),
            "?" => return Ok(st.last_exit as i64),
            other => match st.cell(other) {
                Some(v) => v.to_string(),
                None => {
                    if st.is_array(other) {
                        arrays::get_indexed(st, other, 0).unwrap_or_default()
                    } else if st.opts.nounset {
                        return Err(Interrupt::unbound(other.to_string()));
                    } else {
                        String::new()
                    }
                }
            },
        };
        self.string_number(st, &value, depth)
    }

    /// Re-parse a string as arithmetic (empty means zero).
    fn string_number(&self, st: &mut ShellState, s: &str, depth: u32) -> Result<i64, Interrupt> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(0);
        }
        if let Ok(n) = trimmed.parse::<i64>() {
            return Ok(n);
        }
        let expr = parse_arith(trimmed).map_err(arith_err)?;
        self.eval_depth(st, &expr, depth + 1)
    }

    fn read_elem_text(
        &self,
        st: &mut ShellState,
        array: &str,
        index: &ArithExpr,
        raw_key: Option<&str>,
    ) -> Result<String, Interrupt> {
        let name = st.resolve_nameref(array).map_err(|m| arith_err(m))?;
        if st.assoc.contains(&name) {
            // The unevaluated subscript text is the key.
            let key = raw_key.unwrap_or_default();
            return Ok(st
                .cell(&arrays::assoc_cell(&name, key))
                .unwrap_or_default()
                .to_string());
        }
        let idx = self.eval_arith(st, index)?;
        match arrays::resolve_index(st, &name, idx) {
            Some(i) => Ok(arrays::get_indexed(st, &name, i).unwrap_or_default()),
            None => {
                st.expansion_stderr
                    .push_str(&format!("bash: {name}: bad array subscript\n"));
                Ok(String::new())
            }
        }
    }

    fn write_lvalue(
        &self,
        st: &mut ShellState,
        target: &ArithExpr,
        value: i64,
    ) -> Result<(), Interrupt> {
        match target {
            ArithExpr::Var(name) => {
                let name = st.resolve_nameref(name).map_err(|m| arith_err(m))?;
                if st.readonly.contains(&name) {
                    return Err(arith_err(format!("{name}: readonly variable")));
                }
                st.set_cell(name, value.to_string());
                Ok(())
            }
            ArithExpr::Elem { array, index, key } => {
                let name = st.resolve_nameref(array).map_err(|m| arith_err(m))?;
                if st.readonly.contains(&name) {
                    return Err(arith_err(format!("{name}: readonly variable")));
                }
                if st.assoc.contains(&name) {
                    arrays::set_assoc(st, &name, key.as_deref().unwrap_or(""), value.to_string());
                    return Ok(());
                }
                let idx = self.eval_arith(st, index)?;
                match arrays::resolve_index(st, &name, idx) {
                    Some(i) => {
                        arrays::set_indexed(st, &name, i, value.to_string());
                        Ok(())
                    }
                    None => Err(arith_err(format!("{name}: bad array subscript"))),
                }
            }
            _ => Err(arith_err("attempted assignment to non-variable")),
        }
    }

    fn piece_text(
        &self,
        st: &mut ShellState,
        piece: &ArithExpr,
        depth: u32,
    ) -> Result<String, Interrupt> {
        Ok(match piece {
            ArithExpr::Num(n) => n.to_string(),
            ArithExpr::Var(name) => st.cell(name).unwrap_or_default().to_string(),
            ArithExpr::Elem { array, index, key } => {
                self.read_elem_text(st, array, index, key.as_deref())?
            }
            ArithExpr::CommandSub(script) => self.command_substitution(st, script)?,
            ArithExpr::ParamSub(part) => {
                let word = Word { parts: vec![(**part).clone()] };
                self.expand_word_single(st, &word)?
            }
            other => self.eval_depth(st, other, depth + 1)?.to_string(),
        })
    }
}

fn binop_of_assign(op: AssignOp) -> BinOp {
    match op {
        AssignOp::Set => BinOp::Add, // unreachable; Set handled by caller
        AssignOp::Add => BinOp::Add,
        AssignOp::Sub => BinOp::Sub,
        AssignOp::Mul => BinOp::Mul,
        AssignOp::Div => BinOp::Div,
        AssignOp::Rem => BinOp::Rem,
        AssignOp::Shl => BinOp::Shl,
        AssignOp::Shr => BinOp::Shr,
        AssignOp::And => BinOp::BitAnd,
        AssignOp::Xor => BinOp::BitXor,
        AssignOp::Or => BinOp::BitOr,
    }
}
