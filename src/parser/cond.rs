//! `[[ ... ]]` conditional expression grammar.
//!
//! Operates on the token stream while the lexer is in conditional mode:
//! comparison characters arrive as `CondOp` tokens and words keep their
//! raw text for later expansion (no word splitting inside `[[ ]]`).

use crate::ast::*;
use crate::lexer::TokenKind;
use crate::parser::{word, Parser, SyntaxError};

pub(crate) fn parse_cond(p: &mut Parser<'_>) -> Result<CondExpr, SyntaxError> {
    let expr = or_expr(p)?;
    let t = p.peek().clone();
    if t.kind != TokenKind::CondEnd {
        return Err(SyntaxError::cond(t.line));
    }
    p.advance();
    Ok(expr)
}

fn or_expr(p: &mut Parser<'_>) -> Result<CondExpr, SyntaxError> {
    let mut lhs = and_expr(p)?;
    while is_cond_op(p, "||") {
        p.advance();
        let rhs = and_expr(p)?;
        lhs = CondExpr::Or(Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

fn and_expr(p: &mut Parser<'_>) -> Result<CondExpr, SyntaxError> {
    let mut lhs = not_expr(p)?;
    while is_cond_op(p, "&&") {
        p.advance();
        let rhs = not_expr(p)?;
        lhs = CondExpr::And(Box::new(lhs), Box::new(rhs));
    }
    Ok(lhs)
}

fn not_expr(p: &mut Parser<'_>) -> Result<CondExpr, SyntaxError> {
    if is_cond_op(p, "!") {
        p.advance();
        return Ok(CondExpr::Not(Box::new(not_expr(p)?)));
    }
    if is_cond_op(p, "(") {
        p.advance();
        let inner = or_expr(p)?;
        if !is_cond_op(p, ")") {
            return Err(SyntaxError::cond(p.peek().line));
        }
        p.advance();
        return Ok(CondExpr::Group(Box::new(inner)));
    }
    primary(p)
}

fn primary(p: &mut Parser<'_>) -> Result<CondExpr, SyntaxError> {
    let t = p.peek().clone();
    if t.kind != TokenKind::Word {
        return Err(SyntaxError::cond(t.line));
    }

    // Unary operator when a `-X` word has an operand after it.
    if !t.quoted {
        if let Some(op) = unary_op(&t.text) {
            let next = p.peek_at(1).clone();
            if next.kind == TokenKind::Word {
                p.advance();
                p.advance();
                let operand = word::parse_word(&next.text, next.line)?;
                return Ok(CondExpr::Unary { op, operand });
            }
        }
    }

    p.advance();
    let lhs = word::parse_word(&t.text, t.line)?;

    // Binary operator?
    let op_tok = p.peek().clone();
    let op = match op_tok.kind {
        TokenKind::CondOp if op_tok.text == "<" => Some(CondBinary::StrLt),
        TokenKind::CondOp if op_tok.text == ">" => Some(CondBinary::StrGt),
        TokenKind::Word if !op_tok.quoted => binary_op(&op_tok.text),
        _ => None,
    };
    if let Some(op) = op {
        p.advance();
        let rhs_tok = p.peek().clone();
        if rhs_tok.kind != TokenKind::Word {
            return Err(SyntaxError::cond(rhs_tok.line));
        }
        p.advance();
        let rhs = word::parse_word(&rhs_tok.text, rhs_tok.line)?;
        return Ok(CondExpr::Binary { op, lhs, rhs });
    }

    Ok(CondExpr::Word(lhs))
}

fn is_cond_op(p: &Parser<'_>, text: &str) -> bool {
    let t = p.peek();
    t.kind == TokenKind::CondOp && t.text == text
}

fn unary_op(s: &str) -> Option<CondUnary> {
    Some(match s {
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

fn binary_op(s: &str) -> Option<CondBinary> {
    Some(match s {
        "=" | "==" => CondBinary::StrEq,
        "!=" => CondBinary::StrNe,
        "=~" => CondBinary::Regex,
        "-eq" => CondBinary::NumEq,
        "-ne" => CondBinary::NumNe,
        "-lt" => CondBinary::NumLt,
        "-le" => CondBinary::NumLe,
        "-gt" => CondBinary::NumGt,
        "-ge" => CondBinary::NumGe,
        "-nt" => CondBinary::Newer,
        "-ot" => CondBinary::Older,
        "-ef" => CondBinary::SameFile,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::parser::parse;

    fn cond_of(src: &str) -> CondExpr {
        let script = parse(src).unwrap();
        match &script.statements[0].pipelines[0].commands[0] {
            Command::Compound(Compound::Cond { expr, .. }) => expr.clone(),
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn unary_file_test() {
        assert!(matches!(
            cond_of("[[ -f /etc/passwd ]]"),
            CondExpr::Unary { op: CondUnary::IsFile, .. }
        ));
    }

    #[test]
    fn binary_string_compare() {
        assert!(matches!(
            cond_of("[[ $a == b* ]]"),
            CondExpr::Binary { op: CondBinary::StrEq, .. }
        ));
        assert!(matches!(
            cond_of("[[ $a != b ]]"),
            CondExpr::Binary { op: CondBinary::StrNe, .. }
        ));
    }

    #[test]
    fn regex_match() {
        assert!(matches!(
            cond_of("[[ $x =~ ^[0-9]+$ ]]"),
            CondExpr::Binary { op: CondBinary::Regex, .. }
        ));
    }

    #[test]
    fn numeric_compare() {
        assert!(matches!(
            cond_of("[[ 3 -lt 5 ]]"),
            CondExpr::Binary { op: CondBinary::NumLt, .. }
        ));
    }

    #[test]
    fn string_ordering_via_angle_brackets() {
        assert!(matches!(
            cond_of("[[ abc < abd ]]"),
            CondExpr::Binary { op: CondBinary::StrLt, .. }
        ));
    }

    #[test]
    fn boolean_combinators_and_grouping() {
        assert!(matches!(cond_of("[[ -n $a && -n $b ]]"), CondExpr::And(..)));
        assert!(matches!(cond_of("[[ -n $a || -n $b ]]"), CondExpr::Or(..)));
        assert!(matches!(cond_of("[[ ! -e /x ]]"), CondExpr::Not(..)));
        assert!(matches!(cond_of("[[ ( -n $a ) ]]"), CondExpr::Group(..)));
    }

    #[test]
    fn bare_word_truthiness() {
        assert!(matches!(cond_of("[[ $x ]]"), CondExpr::Word(_)));
    }
}
