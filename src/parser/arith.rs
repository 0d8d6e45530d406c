//! Parser for the C-like arithmetic sub-language of `$((...))`, `(( ))`,
//! array subscripts and substring offsets.
//!
//! Produces [`ArithExpr`] trees; evaluation lives in the interpreter so it
//! can resolve variables recursively and run command substitutions.

use crate::ast::*;
use crate::parser::word;

/// Parse arithmetic text. The error string becomes a runtime arithmetic
/// error message when the expression is actually evaluated.
pub fn parse_arith(text: &str) -> Result<ArithExpr, String> {
    let toks = scan(text)?;
    if toks.is_empty() {
        return Ok(ArithExpr::Num(0));
    }
    let mut p = ArithParser { toks, pos: 0 };
    let expr = p.expr(0)?;
    if p.pos < p.toks.len() {
        return Err(format!(
            "syntax error in expression (error token is \"{}\")",
            p.toks[p.pos].display()
        ));
    }
    Ok(expr)
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Num(String),
    Name(String),
    /// A `$`/backquote construct carried through from word parsing.
    Sub(WordPart),
    /// `name[subscript]` with the raw subscript text.
    Subscripted { name: String, raw: String },
    Op(&'static str),
    Hash,
}

#[derive(Debug, Clone, PartialEq)]
struct SpannedTok {
    tok: Tok,
    /// True when no whitespace separated this token from the previous one.
    glued: bool,
}

impl SpannedTok {
    fn display(&self) -> String {
        match &self.tok {
            Tok::Num(s) | Tok::Name(s) => s.clone(),
            Tok::Subscripted { name, raw } => format!("{name}[{raw}]"),
            Tok::Sub(_) => "$".to_string(),
            Tok::Op(o) => o.to_string(),
            Tok::Hash => "#".to_string(),
        }
    }
}

const OPS: &[&str] = &[
    "<<=", ">>=", "**", "++", "--", "<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "+=",
    "-=", "*=", "/=", "%=", "&=", "^=", "|=", "=", "<", ">", "+", "-", "*", "/", "%", "&",
    "|", "^", "!", "~", "?", ":", ",", "(", ")",
];

fn scan(text: &str) -> Result<Vec<SpannedTok>, String> {
    let chars: Vec<char> = text.chars().collect();
    let mut out: Vec<SpannedTok> = Vec::new();
    let mut i = 0;
    let mut saw_space = true;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            saw_space = true;
            i += 1;
            continue;
        }
        let glued = !saw_space;
        saw_space = false;

        if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric()) {
                i += 1;
            }
            // base#digits literal: the alphabet includes @ and _.
            if chars.get(i) == Some(&'#') {
                i += 1;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || chars[i] == '@' || chars[i] == '_')
                {
                    i += 1;
                }
            }
            let txt: String = chars[start..i].iter().collect();
            out.push(SpannedTok { tok: Tok::Num(txt), glued });
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let name: String = chars[start..i].iter().collect();
            if chars.get(i) == Some(&'[') {
                let mut depth = 1usize;
                let sub_start = i + 1;
                i += 1;
                while i < chars.len() && depth > 0 {
                    match chars[i] {
                        '[' => depth += 1,
                        ']' => depth -= 1,
                        _ => {}
                    }
                    i += 1;
                }
                if depth != 0 {
                    return Err("bad array subscript".to_string());
                }
                let raw: String = chars[sub_start..i - 1].iter().collect();
                out.push(SpannedTok { tok: Tok::Subscripted { name, raw }, glued });
            } else {
                out.push(SpannedTok { tok: Tok::Name(name), glued });
            }
            continue;
        }

        if c == '$' || c == '`' {
            let rest: String = chars[i..].iter().collect();
            let (part, used) = word::parse_dollar_construct(&rest, 1)
                .map_err(|e| e.message)?;
            out.push(SpannedTok { tok: Tok::Sub(part), glued });
            i += used;
            continue;
        }

        if c == '#' {
            out.push(SpannedTok { tok: Tok::Hash, glued });
            i += 1;
            continue;
        }

        if c == '\'' {
            return Err("syntax error in expression (error token is \"'\")".to_string());
        }

        let rest: String = chars[i..].iter().collect();
        let mut matched = None;
        for op in OPS {
            if rest.starts_with(op) {
                matched = Some(*op);
                break;
            }
        }
        match matched {
            Some(op) => {
                out.push(SpannedTok { tok: Tok::Op(op), glued });
                i += op.len();
            }
            None => {
                return Err(format!(
                    "syntax error in expression (error token is \"{c}\")"
                ))
            }
        }
    }
    Ok(out)
}

struct ArithParser {
    toks: Vec<SpannedTok>,
    pos: usize,
}

impl ArithParser {
    fn peek_op(&self) -> Option<&'static str> {
        match self.toks.get(self.pos) {
            Some(SpannedTok { tok: Tok::Op(o), .. }) => Some(o),
            _ => None,
        }
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if self.peek_op() == Some(op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Precedence-climbing entry. Levels, lowest first:
    /// comma, assignment, ternary, `||`, `&&`, `|`, `^`, `&`, equality,
    /// relational, shift, additive, multiplicative, `**`, unary, postfix.
    fn expr(&mut self, min_level: u8) -> Result<ArithExpr, String> {
        let mut lhs = self.assignment()?;
        if min_level == 0 {
            while self.eat_op(",") {
                let rhs = self.assignment()?;
                lhs = ArithExpr::Binary {
                    op: BinOp::Comma,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                };
            }
        }
        Ok(lhs)
    }

    fn assignment(&mut self) -> Result<ArithExpr, String> {
        let lhs = self.ternary()?;
        let assign = match self.peek_op() {
            Some("=") => Some(AssignOp::Set),
            Some("+=") => Some(AssignOp::Add),
            Some("-=") => Some(AssignOp::Sub),
            Some("*=") => Some(AssignOp::Mul),
            Some("/=") => Some(AssignOp::Div),
            Some("%=") => Some(AssignOp::Rem),
            Some("<<=") => Some(AssignOp::Shl),
            Some(">>=") => Some(AssignOp::Shr),
            Some("&=") => Some(AssignOp::And),
            Some("^=") => Some(AssignOp::Xor),
            Some("|=") => Some(AssignOp::Or),
            _ => None,
        };
        if let Some(op) = assign {
            if !is_lvalue(&lhs) {
                return Err("attempted assignment to non-variable".to_string());
            }
            self.pos += 1;
            let value = self.assignment()?;
            return Ok(ArithExpr::Assign {
                op,
                target: Box::new(lhs),
                value: Box::new(value),
            });
        }
        Ok(lhs)
    }

    fn ternary(&mut self) -> Result<ArithExpr, String> {
        let cond = self.binary(0)?;
        if self.eat_op("?") {
            let then = self.assignment()?;
            if !self.eat_op(":") {
                return Err("expected `:' in conditional expression".to_string());
            }
            let other = self.assignment()?;
            return Ok(ArithExpr::Ternary {
                cond: Box::new(cond),
                then: Box::new(then),
                other: Box::new(other),
            });
        }
        Ok(cond)
    }

    /// Left-associative binary levels; `level` indexes BINARY_LEVELS.
    fn binary(&mut self, level: usize) -> Result<ArithExpr, String> {
        const LEVELS: &[&[(&str, BinOp)]] = &[
            &[("||", BinOp::OrOr)],
            &[("&&", BinOp::AndAnd)],
            &[("|", BinOp::BitOr)],
            &[("^", BinOp::BitXor)],
            &[("&", BinOp::BitAnd)],
            &[("==", BinOp::Eq), ("!=", BinOp::Ne)],
            &[("<=", BinOp::Le), (">=", BinOp::Ge), ("<", BinOp::Lt), (">", BinOp::Gt)],
            &[("<<", BinOp::Shl), (">>", BinOp::Shr)],
            &[("+", BinOp::Add), ("-", BinOp::Sub)],
            &[("*", BinOp::Mul), ("/", BinOp::Div), ("%", BinOp::Rem)],
        ];
        if level >= LEVELS.len() {
            return self.power();
        }
        let mut lhs = self.binary(level + 1)?;
        'outer: loop {
            for (text, op) in LEVELS[level] {
                if self.peek_op() == Some(*text) {
                    self.pos += 1;
                    let rhs = self.binary(level + 1)?;
                    lhs = ArithExpr::Binary {
                        op: *op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    };
                    continue 'outer;
                }
            }
            break;
        }
        Ok(lhs)
    }

    /// `**` binds tighter than unary minus on the left but is
    /// right-associative.
    fn power(&mut self) -> Result<ArithExpr, String> {
        let base = self.unary()?;
        if self.eat_op("**") {
            let exp = self.power()?;
            return Ok(ArithExpr::Binary {
                op: BinOp::Pow,
                lhs: Box::new(base),
                rhs: Box::new(exp),
            });
        }
        Ok(base)
    }

    fn unary(&mut self) -> Result<ArithExpr, String> {
        match self.peek_op() {
            Some("+") => {
                self.pos += 1;
                Ok(ArithExpr::Unary { op: UnaryOp::Plus, operand: Box::new(self.unary()?) })
            }
            Some("-") => {
                self.pos += 1;
                Ok(ArithExpr::Unary { op: UnaryOp::Minus, operand: Box::new(self.unary()?) })
            }
            Some("!") => {
                self.pos += 1;
                Ok(ArithExpr::Unary { op: UnaryOp::Not, operand: Box::new(self.unary()?) })
            }
            Some("~") => {
                self.pos += 1;
                Ok(ArithExpr::Unary { op: UnaryOp::BitNot, operand: Box::new(self.unary()?) })
            }
            Some("++") => {
                self.pos += 1;
                let target = self.unary()?;
                if !is_lvalue(&target) {
                    return Err("++: assignment requires a variable".to_string());
                }
                Ok(ArithExpr::Step { inc: true, pre: true, target: Box::new(target) })
            }
            Some("--") => {
                self.pos += 1;
                let target = self.unary()?;
                if !is_lvalue(&target) {
                    return Err("--: assignment requires a variable".to_string());
                }
                Ok(ArithExpr::Step { inc: false, pre: true, target: Box::new(target) })
            }
            _ => self.postfix(),
        }
    }

    fn postfix(&mut self) -> Result<ArithExpr, String> {
        let prim = self.primary()?;
        if is_lvalue(&prim) {
            if self.eat_op("++") {
                return Ok(ArithExpr::Step { inc: true, pre: false, target: Box::new(prim) });
            }
            if self.eat_op("--") {
                return Ok(ArithExpr::Step { inc: false, pre: false, target: Box::new(prim) });
            }
        }
        Ok(prim)
    }

    fn primary(&mut self) -> Result<ArithExpr, String> {
        if self.eat_op("(") {
            let inner = self.expr(0)?;
            if !self.eat_op(")") {
                return Err("missing `)'".to_string());
            }
            return Ok(ArithExpr::Group(Box::new(inner)));
        }

        let first = self.atom()?;
        // Adjacent atoms with no separating operator splice into one
        // value that is re-parsed after expansion: `1$x`, `$a$b`.
        let mut pieces = vec![first];
        while let Some(t) = self.toks.get(self.pos) {
            if !t.glued {
                break;
            }
            match &t.tok {
                Tok::Num(_) | Tok::Name(_) | Tok::Sub(_) => {
                    pieces.push(self.atom()?);
                }
                Tok::Hash => {
                    // Dynamic base: ${b}#digits
                    self.pos += 1;
                    let digits = match self.toks.get(self.pos) {
                        Some(SpannedTok { tok: Tok::Num(d), glued: true }) => d.clone(),
                        Some(SpannedTok { tok: Tok::Name(d), glued: true }) => d.clone(),
                        _ => return Err("missing digits after base".to_string()),
                    };
                    self.pos += 1;
                    let base = pieces.pop().unwrap();
                    pieces.push(ArithExpr::DynBase { base: Box::new(base), digits });
                }
                _ => break,
            }
        }
        if pieces.len() == 1 {
            Ok(pieces.pop().unwrap())
        } else {
            Ok(ArithExpr::Splice(pieces))
        }
    }

    fn atom(&mut self) -> Result<ArithExpr, String> {
        let t = self
            .toks
            .get(self.pos)
            .cloned()
            .ok_or_else(|| "unexpected end of expression".to_string())?;
        self.pos += 1;
        match t.tok {
            Tok::Num(txt) => match parse_number(&txt) {
                Ok(n) => Ok(ArithExpr::Num(n)),
                Err(msg) => Ok(ArithExpr::Invalid { text: txt, message: msg }),
            },
            Tok::Name(name) => Ok(ArithExpr::Var(name)),
            Tok::Subscripted { name, raw } => {
                let index = match parse_arith(&raw) {
                    Ok(e) => e,
                    Err(msg) => ArithExpr::Invalid { text: raw.clone(), message: msg },
                };
                Ok(ArithExpr::Elem { array: name, index: Box::new(index), key: Some(raw) })
            }
            Tok::Sub(part) => Ok(match part {
                WordPart::CommandSub { script, .. } => ArithExpr::CommandSub(script),
                WordPart::ArithSub(e) => ArithExpr::Group(Box::new(e)),
                other => ArithExpr::ParamSub(Box::new(other)),
            }),
            Tok::Op(o) => Err(format!(
                "syntax error: operand expected (error token is \"{o}\")"
            )),
            Tok::Hash => Err("syntax error: operand expected (error token is \"#\")".to_string()),
        }
    }
}

fn is_lvalue(e: &ArithExpr) -> bool {
    matches!(e, ArithExpr::Var(_) | ArithExpr::Elem { .. })
}

/// Parse an integer literal: decimal, `0` octal, `0x` hex, `base#value`.
pub fn parse_number(text: &str) -> Result<i64, String> {
    if let Some((base_txt, digits)) = text.split_once('#') {
        let base: i64 = base_txt
            .parse()
            .map_err(|_| format!("invalid arithmetic base (error token is \"{text}\")"))?;
        if !(2..=64).contains(&base) {
            return Err(format!("invalid arithmetic base (error token is \"{text}\")"));
        }
        return digits_in_base(digits, base, text);
    }
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return digits_in_base(hex, 16, text);
    }
    if text.len() > 1 && text.starts_with('0') {
        return digits_in_base(&text[1..], 8, text);
    }
    digits_in_base(text, 10, text)
}

/// Bash's base-64 digit alphabet: 0-9, a-z, A-Z, @, _.
pub fn digits_in_base(digits: &str, base: i64, whole: &str) -> Result<i64, String> {
    if digits.is_empty() {
        return Err(format!("value too great for base (error token is \"{whole}\")"));
    }
    let mut acc: i64 = 0;
    for c in digits.chars() {
        let v = match c {
            '0'..='9' => (c as i64) - ('0' as i64),
            'a'..='z' => (c as i64) - ('a' as i64) + 10,
            'A'..='Z' if base > 36 => (c as i64) - ('A' as i64) + 36,
            // In bases <= 36 upper and lower case are the same digit.
            'A'..='Z' => (c as i64) - ('A' as i64) + 10,
            '@' => 62,
            '_' => 63,
            _ => return Err(format!("value too great for base (error token is \"{whole}\")")),
        };
        if v >= base {
            return Err(format!("value too great for base (error token is \"{whole}\")"));
        }
        acc = acc.wrapping_mul(base).wrapping_add(v);
    }
    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_shapes() {
        let e = parse_arith("1 + 2 * 3").unwrap();
        match e {
            ArithExpr::Binary { op: BinOp::Add, rhs, .. } => {
                assert!(matches!(*rhs, ArithExpr::Binary { op: BinOp::Mul, .. }));
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn power_is_right_associative() {
        let e = parse_arith("2 ** 3 ** 2").unwrap();
        match e {
            ArithExpr::Binary { op: BinOp::Pow, rhs, .. } => {
                assert!(matches!(*rhs, ArithExpr::Binary { op: BinOp::Pow, .. }));
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn assignment_and_compound() {
        assert!(matches!(
            parse_arith("x = 5").unwrap(),
            ArithExpr::Assign { op: AssignOp::Set, .. }
        ));
        assert!(matches!(
            parse_arith("x += 2").unwrap(),
            ArithExpr::Assign { op: AssignOp::Add, .. }
        ));
        assert!(parse_arith("3 = 5").is_err());
    }

    #[test]
    fn increments() {
        assert!(matches!(
            parse_arith("++x").unwrap(),
            ArithExpr::Step { inc: true, pre: true, .. }
        ));
        assert!(matches!(
            parse_arith("x--").unwrap(),
            ArithExpr::Step { inc: false, pre: false, .. }
        ));
    }

    #[test]
    fn ternary_and_comma() {
        assert!(matches!(parse_arith("a ? 1 : 2").unwrap(), ArithExpr::Ternary { .. }));
        assert!(matches!(
            parse_arith("a = 1, b = 2").unwrap(),
            ArithExpr::Binary { op: BinOp::Comma, .. }
        ));
    }

    #[test]
    fn number_bases() {
        assert_eq!(parse_number("42").unwrap(), 42);
        assert_eq!(parse_number("0x1f").unwrap(), 31);
        assert_eq!(parse_number("010").unwrap(), 8);
        assert_eq!(parse_number("2#101").unwrap(), 5);
        assert_eq!(parse_number("16#ff").unwrap(), 255);
        assert_eq!(parse_number("64#@").unwrap(), 62);
        assert!(parse_number("8#9").unwrap_err().contains("value too great"));
    }

    #[test]
    fn array_elements() {
        let e = parse_arith("a[i+1]").unwrap();
        assert!(matches!(e, ArithExpr::Elem { .. }));
    }

    #[test]
    fn splice_of_adjacent_atoms() {
        assert!(matches!(parse_arith("1$x").unwrap(), ArithExpr::Splice(_)));
    }

    #[test]
    fn empty_is_zero() {
        assert!(matches!(parse_arith("  ").unwrap(), ArithExpr::Num(0)));
    }

    #[test]
    fn command_substitution_inside() {
        assert!(matches!(parse_arith("$(echo 3) + 1").unwrap(), ArithExpr::Binary { .. }));
    }

    /// Collapse parenthesization artifacts so un-parse round-trips can be
    /// compared structurally.
    fn strip_groups(e: ArithExpr) -> ArithExpr {
        match e {
            ArithExpr::Group(inner) => strip_groups(*inner),
            ArithExpr::Unary { op, operand } => ArithExpr::Unary {
                op,
                operand: Box::new(strip_groups(*operand)),
            },
            ArithExpr::Step { inc, pre, target } => ArithExpr::Step {
                inc,
                pre,
                target: Box::new(strip_groups(*target)),
            },
            ArithExpr::Binary { op, lhs, rhs } => ArithExpr::Binary {
                op,
                lhs: Box::new(strip_groups(*lhs)),
                rhs: Box::new(strip_groups(*rhs)),
            },
            ArithExpr::Ternary { cond, then, other } => ArithExpr::Ternary {
                cond: Box::new(strip_groups(*cond)),
                then: Box::new(strip_groups(*then)),
                other: Box::new(strip_groups(*other)),
            },
            ArithExpr::Assign { op, target, value } => ArithExpr::Assign {
                op,
                target: Box::new(strip_groups(*target)),
                value: Box::new(strip_groups(*value)),
            },
            other => other,
        }
    }

    #[test]
    fn unparse_reparses_to_equivalent_tree() {
        for src in [
            "1 + 2 * 3",
            "x = y + 1",
            "a ? b : c",
            "x << 2 | y & 3",
            "-n + ~m",
            "i++ + --j",
            "2 ** 3 ** 2",
            "arr[i+1] * 2",
        ] {
            let first = strip_groups(parse_arith(src).unwrap());
            let printed = first.to_string();
            let second = strip_groups(parse_arith(&printed).unwrap());
            assert_eq!(first, second, "round-trip of {src:?} via {printed:?}");
        }
    }

    #[test]
    fn trailing_garbage_is_an_error() {
        assert!(parse_arith("1 2").is_err() || matches!(parse_arith("1 2"), Ok(ArithExpr::Splice(_))));
        assert!(parse_arith("1 +").is_err());
    }
}
